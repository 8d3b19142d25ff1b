use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{AgentRegistry, JobRegistry};
use crate::error::MarketError;
use crate::model::{
    Agent, AgentPatch, Job, JobFilter, JobPatch, JobStatus, NewAgent, NewJob, Page, StatusChange,
};

/// In-process agent store. Registration order is preserved.
#[derive(Debug, Default)]
pub struct MemoryAgentRegistry {
    agents: RwLock<Vec<Agent>>,
}

impl MemoryAgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgentRegistry for MemoryAgentRegistry {
    async fn create(&self, new: NewAgent) -> Result<Agent, MarketError> {
        let agent = Agent::from_new(new)?;
        self.agents.write().await.push(agent.clone());
        debug!(agent_id = %agent.id, classification = %agent.classification, "agent registered");
        Ok(agent)
    }

    async fn list(&self) -> Result<Vec<Agent>, MarketError> {
        Ok(self.agents.read().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Agent, MarketError> {
        self.agents
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| MarketError::AgentNotFound(id.to_string()))
    }

    async fn update(&self, id: &str, patch: AgentPatch) -> Result<Agent, MarketError> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| MarketError::AgentNotFound(id.to_string()))?;
        agent.apply_patch(patch)?;
        Ok(agent.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), MarketError> {
        let mut agents = self.agents.write().await;
        let before = agents.len();
        agents.retain(|a| a.id != id);
        if agents.len() == before {
            return Err(MarketError::AgentNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// In-process job store. Creation order is preserved.
#[derive(Debug, Default)]
pub struct MemoryJobRegistry {
    jobs: RwLock<Vec<Job>>,
}

impl MemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobRegistry for MemoryJobRegistry {
    async fn create(&self, new: NewJob) -> Result<Job, MarketError> {
        let job = Job::from_new(new)?;
        self.jobs.write().await.push(job.clone());
        debug!(job_id = %job.id, category = %job.category, auto_assign = job.auto_assign, "job created");
        Ok(job)
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, MarketError> {
        Ok(self
            .jobs
            .read()
            .await
            .iter()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect())
    }

    async fn page(
        &self,
        page: usize,
        page_size: usize,
        filter: &JobFilter,
    ) -> Result<Page<Job>, MarketError> {
        let jobs = self.list(filter).await?;
        Ok(Page::slice(&jobs, page, page_size))
    }

    async fn get(&self, id: &str) -> Result<Job, MarketError> {
        self.jobs
            .read()
            .await
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or_else(|| MarketError::JobNotFound(id.to_string()))
    }

    async fn update(&self, id: &str, patch: JobPatch) -> Result<Job, MarketError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| MarketError::JobNotFound(id.to_string()))?;
        job.apply_patch(patch)?;
        Ok(job.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), MarketError> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|j| j.id != id);
        if jobs.len() == before {
            return Err(MarketError::JobNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_status(&self, id: &str, status: JobStatus) -> Result<Job, MarketError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| MarketError::JobNotFound(id.to_string()))?;

        let change = StatusChange::new(job.status, status);
        if !change.is_conventional() {
            warn!(
                job_id = %id,
                from = %change.from,
                to = %change.to,
                from_terminal = change.from.is_terminal(),
                "unconventional status change"
            );
        }
        job.status = status;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn assign_if_unassigned(&self, job_id: &str, agent_id: &str) -> Result<bool, MarketError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| MarketError::JobNotFound(job_id.to_string()))?;

        if job.agent_id.is_some() {
            return Ok(false);
        }
        job.agent_id = Some(agent_id.to_string());
        job.updated_at = Utc::now();
        Ok(true)
    }
}

/// Start-up data: agents and jobs to register before serving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub agents: Vec<NewAgent>,
    #[serde(default)]
    pub jobs: Vec<NewJob>,
}

/// Load a JSON seed file into the registries. Every record is validated like
/// an API create; the first invalid record aborts the load.
pub async fn load_seed(
    path: &Path,
    jobs: &impl JobRegistry,
    agents: &impl AgentRegistry,
) -> Result<(usize, usize), MarketError> {
    let contents = tokio::fs::read_to_string(path).await?;
    let seed: Seed = serde_json::from_str(&contents)?;

    // Validate everything up front so a bad record leaves no partial state.
    for agent in &seed.agents {
        agent.validate()?;
    }
    for job in &seed.jobs {
        job.validate()?;
    }

    let agent_count = seed.agents.len();
    let job_count = seed.jobs.len();
    for agent in seed.agents {
        agents.create(agent).await?;
    }
    for job in seed.jobs {
        jobs.create(job).await?;
    }

    info!(path = %path.display(), agents = agent_count, jobs = job_count, "seed loaded");
    Ok((agent_count, job_count))
}
