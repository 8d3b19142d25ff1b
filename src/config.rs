//! Configuração do jobmatch carregada a partir de `jobmatch.toml`.
//!
//! A struct [`JobmatchConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `JOBMATCH_API_URL` e `JOBMATCH_BIND` têm
//! precedência sobre o arquivo; flags da CLI têm precedência sobre ambos.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "jobmatch.toml";

/// Configuração de nível superior carregada de `jobmatch.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobmatchConfig {
    /// Endereço em que o servidor HTTP escuta.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// URL base da API usada pelos comandos cliente (inclui `/api`).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Espera, em milissegundos, entre disparar o matching e reler os jobs.
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// Timeout total de cada requisição HTTP do cliente.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Arquivo JSON opcional com agentes e jobs carregados na inicialização.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

// Valor padrão para o endereço do servidor: "127.0.0.1:3001".
fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

// Valor padrão para a URL da API: "http://localhost:3001/api".
fn default_api_base_url() -> String {
    "http://localhost:3001/api".to_string()
}

// Valor padrão para a espera antes de reler: 1000ms.
fn default_refresh_delay_ms() -> u64 {
    1000
}

// Valor padrão para o timeout das requisições: 30s.
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for JobmatchConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_base_url: default_api_base_url(),
            refresh_delay_ms: default_refresh_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            seed_file: None,
        }
    }
}

impl JobmatchConfig {
    /// Carrega a configuração de `jobmatch.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho explícito e aplica as variáveis de ambiente.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<JobmatchConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("JOBMATCH_API_URL")
            && !url.is_empty()
        {
            config.api_base_url = url;
        }
        if let Ok(bind) = std::env::var("JOBMATCH_BIND")
            && !bind.is_empty()
        {
            config.bind_addr = bind;
        }

        Ok(config)
    }

    /// Endereço de escuta já validado.
    pub fn bind_socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address `{}`", self.bind_addr))
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
