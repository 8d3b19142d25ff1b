use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::error::ClientError;
use super::types::ErrorBody;
use crate::matching::Candidate;
use crate::model::{Job, JobFilter, JobStatus};
use crate::orchestrator::MatchAck;

/// The subset of the REST surface the observer and CLI depend on.
pub trait MarketApi {
    /// Ask the server to run a matching pass. Returns an acknowledgement only.
    async fn request_match(&self) -> Result<MatchAck, ClientError>;

    async fn get_job(&self, id: &str) -> Result<Job, ClientError>;

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, ClientError>;

    async fn set_job_status(&self, id: &str, status: JobStatus) -> Result<Job, ClientError>;

    async fn candidates(&self, id: &str) -> Result<Vec<Candidate>, ClientError>;
}

pub struct MarketClient {
    client: Client,
    base_url: String,
}

impl MarketClient {
    /// `base_url` includes the `/api` prefix, e.g. `http://localhost:3001/api`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

impl MarketApi for MarketClient {
    async fn request_match(&self) -> Result<MatchAck, ClientError> {
        self.send(self.client.post(self.url("/agents/match-jobs")))
            .await
    }

    async fn get_job(&self, id: &str) -> Result<Job, ClientError> {
        self.send(self.client.get(self.url(&format!("/jobs/{id}"))))
            .await
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, ClientError> {
        self.send(self.client.get(self.url("/jobs")).query(filter))
            .await
    }

    async fn set_job_status(&self, id: &str, status: JobStatus) -> Result<Job, ClientError> {
        let url = self.url(&format!("/jobs/{id}/status/{status}"));
        self.send(self.client.patch(url)).await
    }

    async fn candidates(&self, id: &str) -> Result<Vec<Candidate>, ClientError> {
        self.send(self.client.get(self.url(&format!("/jobs/{id}/candidates"))))
            .await
    }
}
