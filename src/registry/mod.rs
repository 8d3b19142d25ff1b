//! Storage contracts for agents and jobs.
//!
//! Both registries are shared stores: callers read snapshots and must not
//! assume a snapshot is still current when they write. The only write the
//! matcher performs is [`JobRegistry::assign_if_unassigned`], a
//! compare-and-set on `agentId == null`.

mod memory;

use std::future::Future;

use tracing::info;

use crate::error::MarketError;
use crate::model::{Agent, AgentPatch, Job, JobFilter, JobPatch, JobStatus, NewAgent, NewJob, Page};

pub use memory::{MemoryAgentRegistry, MemoryJobRegistry, Seed, load_seed};

pub trait AgentRegistry: Send + Sync {
    fn create(&self, new: NewAgent) -> impl Future<Output = Result<Agent, MarketError>> + Send;

    /// All agents in registration order.
    fn list(&self) -> impl Future<Output = Result<Vec<Agent>, MarketError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Agent, MarketError>> + Send;

    fn update(
        &self,
        id: &str,
        patch: AgentPatch,
    ) -> impl Future<Output = Result<Agent, MarketError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), MarketError>> + Send;
}

pub trait JobRegistry: Send + Sync {
    fn create(&self, new: NewJob) -> impl Future<Output = Result<Job, MarketError>> + Send;

    /// Jobs matching `filter`, in creation order.
    fn list(&self, filter: &JobFilter) -> impl Future<Output = Result<Vec<Job>, MarketError>> + Send;

    fn page(
        &self,
        page: usize,
        page_size: usize,
        filter: &JobFilter,
    ) -> impl Future<Output = Result<Page<Job>, MarketError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Job, MarketError>> + Send;

    fn update(
        &self,
        id: &str,
        patch: JobPatch,
    ) -> impl Future<Output = Result<Job, MarketError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), MarketError>> + Send;

    /// Unconditional status overwrite.
    fn set_status(
        &self,
        id: &str,
        status: JobStatus,
    ) -> impl Future<Output = Result<Job, MarketError>> + Send;

    /// Set `agentId` only if the job is still unassigned at write time.
    ///
    /// Returns `Ok(false)` when another writer got there first; the existing
    /// assignment is left untouched.
    fn assign_if_unassigned(
        &self,
        job_id: &str,
        agent_id: &str,
    ) -> impl Future<Output = Result<bool, MarketError>> + Send;
}

/// Manually assign a job to a specific agent.
///
/// The agent must exist. Because `agentId` is set exactly once, assigning an
/// already assigned job is a conflict, even to the same agent.
pub async fn assign_manually<J, A>(
    jobs: &J,
    agents: &A,
    job_id: &str,
    agent_id: &str,
) -> Result<Job, MarketError>
where
    J: JobRegistry,
    A: AgentRegistry,
{
    let agent = agents.get(agent_id).await?;
    if jobs.assign_if_unassigned(job_id, &agent.id).await? {
        info!(job_id = %job_id, agent_id = %agent.id, "job assigned manually");
        return jobs.get(job_id).await;
    }

    let job = jobs.get(job_id).await?;
    Err(MarketError::AlreadyAssigned {
        job_id: job.id,
        agent_id: job.agent_id.unwrap_or_default(),
    })
}
