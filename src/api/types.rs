//! Tipos de dados trocados com a API REST que não pertencem ao modelo de domínio.
//!
//! Todas as structs derivam `Serialize` e `Deserialize`; o servidor as usa
//! para escrever respostas e o cliente para lê-las.

use serde::{Deserialize, Serialize};

/// Corpo JSON de toda resposta de erro da API.
///
/// Segue o formato `{ statusCode, message, error }` esperado pelo front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Código de status HTTP repetido no corpo.
    pub status_code: u16,
    /// Mensagem legível descrevendo a falha.
    pub message: String,
    /// Frase canônica do status (ex.: "Bad Request").
    pub error: String,
}

/// Resposta do endpoint de saúde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_uses_camel_case() {
        let body = ErrorBody {
            status_code: 404,
            message: "Job not found: abc".into(),
            error: "Not Found".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 404);
        assert!(json.get("status_code").is_none());
    }

    #[test]
    fn error_body_deserialize_from_api_format() {
        let api_json = r#"{"statusCode": 409, "message": "Job j is already assigned to agent a", "error": "Conflict"}"#;
        let body: ErrorBody = serde_json::from_str(api_json).unwrap();
        assert_eq!(body.status_code, 409);
        assert_eq!(body.error, "Conflict");
    }
}
