//! Client-side view of a matching pass.
//!
//! The server acknowledges a trigger without reporting results, so the
//! observer waits a fixed delay and re-reads the jobs it cares about. The
//! delay is a heuristic: a slow pass can look unfinished, and the user can
//! simply ask again.

use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::debug;

use crate::api::{ClientError, MarketApi};
use crate::model::{Job, JobFilter, JobStatus};
use crate::orchestrator::MatchAck;

/// What the observer saw for one job after the delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ObservedState {
    Matched {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
    StillPending,
    /// The job was deleted between the trigger and the refresh.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobObservation {
    pub job_id: String,
    pub title: Option<String>,
    #[serde(flatten)]
    pub state: ObservedState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub ack: MatchAck,
    pub jobs: Vec<JobObservation>,
}

impl Observation {
    pub fn matched(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| matches!(j.state, ObservedState::Matched { .. }))
            .count()
    }
}

pub struct MatchObserver<C> {
    api: C,
    refresh_delay: Duration,
}

impl<C: MarketApi> MatchObserver<C> {
    pub fn new(api: C, refresh_delay: Duration) -> Self {
        Self { api, refresh_delay }
    }

    /// Fire the trigger and return its acknowledgement without waiting.
    pub async fn request_match(&self) -> Result<MatchAck, ClientError> {
        self.api.request_match().await
    }

    /// Trigger a pass, wait the refresh delay, then re-read `job_ids`.
    ///
    /// With no ids, the jobs that were eligible just before the trigger are
    /// observed instead.
    pub async fn request_and_observe(
        &self,
        job_ids: &[String],
    ) -> Result<Observation, ClientError> {
        let watched: Vec<String> = if job_ids.is_empty() {
            self.api
                .list_jobs(&JobFilter::with_status(JobStatus::Pending))
                .await?
                .into_iter()
                .filter(Job::is_eligible)
                .map(|j| j.id)
                .collect()
        } else {
            job_ids.to_vec()
        };

        let ack = self.request_match().await?;
        debug!(run_id = %ack.run_id, watched = watched.len(), delay_ms = self.refresh_delay.as_millis() as u64, "match requested, waiting before refresh");
        sleep(self.refresh_delay).await;

        let mut jobs = Vec::with_capacity(watched.len());
        for id in watched {
            jobs.push(self.observe_job(id).await?);
        }
        Ok(Observation { ack, jobs })
    }

    async fn observe_job(&self, job_id: String) -> Result<JobObservation, ClientError> {
        match self.api.get_job(&job_id).await {
            Ok(job) => Ok(JobObservation {
                job_id,
                title: Some(job.title),
                state: match job.agent_id {
                    Some(agent_id) => ObservedState::Matched { agent_id },
                    None => ObservedState::StillPending,
                },
            }),
            Err(e) if e.is_not_found() => Ok(JobObservation {
                job_id,
                title: None,
                state: ObservedState::Missing,
            }),
            Err(e) => Err(e),
        }
    }
}
