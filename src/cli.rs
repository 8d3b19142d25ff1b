//! Interface de linha de comando do jobmatch baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (serve, match, jobs,
//! status, candidates) e flags globais (--api-url, --verbose).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::JobStatus;

/// jobmatch: marketplace de jobs e agentes com matching automático.
#[derive(Debug, Parser)]
#[command(name = "jobmatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL base da API (ex.: http://localhost:3001/api).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Habilita saída detalhada (logs em nível debug).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Status aceito pela CLI, mapeado para [`JobStatus`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Running,
    Completed,
    Failed,
}

impl From<StatusArg> for JobStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => JobStatus::Pending,
            StatusArg::Running => JobStatus::Running,
            StatusArg::Completed => JobStatus::Completed,
            StatusArg::Failed => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sobe o servidor HTTP com registros em memória.
    Serve {
        /// Endereço de escuta (sobrepõe `bind_addr` do arquivo de configuração).
        #[arg(long)]
        bind: Option<String>,

        /// Arquivo JSON com agentes e jobs para carregar na inicialização.
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Dispara o matching e mostra quais jobs receberam um agente.
    Match {
        /// Jobs a observar; sem ids, observa os jobs elegíveis antes do disparo.
        #[arg(long = "job")]
        jobs: Vec<String>,
    },

    /// Lista os jobs.
    Jobs {
        /// Filtra por status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Sobrescreve o status de um job.
    Status {
        /// Id do job.
        id: String,

        /// Novo status.
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Mostra o ranking de agentes candidatos para um job.
    Candidates {
        /// Id do job.
        id: String,
    },
}
