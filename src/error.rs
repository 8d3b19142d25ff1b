use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Job {job_id} is already assigned to agent {agent_id}")]
    AlreadyAssigned { job_id: String, agent_id: String },

    #[error("Job {job_id} is not eligible for matching: {reason}")]
    NotEligible { job_id: String, reason: String },

    #[allow(dead_code)]
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MarketError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MarketError::Validation(msg.into())
    }

    /// Whether the caller gave us something wrong, as opposed to the store failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MarketError::Validation(_)
                | MarketError::JobNotFound(_)
                | MarketError::AgentNotFound(_)
                | MarketError::AlreadyAssigned { .. }
                | MarketError::NotEligible { .. }
        )
    }
}
