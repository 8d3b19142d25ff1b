//! Tipos de erro para o cliente HTTP do marketplace.
//!
//! Define [`ClientError`] com variantes para erros retornados pela API
//! e erros de rede. Usa `thiserror` para derivar `Display` e `Error`
//! automaticamente a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao falar com a API REST do marketplace.
///
/// - [`ApiError`](ClientError::ApiError): o servidor respondeu com 4xx/5xx
/// - [`NetworkError`](ClientError::NetworkError): falha na camada de rede ou de decodificação
#[derive(Debug, Error)]
pub enum ClientError {
    /// Erro retornado pela API (ex.: 404 job inexistente, 400 validação).
    /// Contém o código de status HTTP e a mensagem do corpo da resposta.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    /// Encapsula o erro original do `reqwest` via `#[from]`.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl ClientError {
    /// Indica se o servidor respondeu 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::ApiError { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = ClientError::ApiError {
            status: 400,
            message: "budgetMin (1000) must not exceed budgetMax (100)".into(),
        };
        assert_eq!(
            err.to_string(),
            "API error (status 400): budgetMin (1000) must not exceed budgetMax (100)"
        );
    }

    #[test]
    fn not_found_detection() {
        let err = ClientError::ApiError {
            status: 404,
            message: "Job not found: x".into(),
        };
        assert!(err.is_not_found());
        let err = ClientError::ApiError {
            status: 500,
            message: "boom".into(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
