use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::MarketError;
use crate::matching::MatchingEngine;
use crate::model::{Agent, Job, JobFilter, JobStatus};
use crate::registry::{AgentRegistry, JobRegistry};

/// Acknowledgement returned by a trigger. Carries no match results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAck {
    pub message: String,
    pub run_id: String,
}

/// One committed assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub job_id: String,
    pub agent_id: String,
    pub score: u32,
}

/// Summary of one matching pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub eligible: usize,
    pub assigned: usize,
    pub unmatched: usize,
    pub conflicts: usize,
    pub failed: usize,
    pub assignments: Vec<Assignment>,
}

/// What happened to a single job during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
enum JobOutcome {
    Assigned(Assignment),
    /// No agent scored above zero; the job stays in the pool.
    Unmatched,
    /// Another writer assigned the job first.
    Conflict,
    Failed(String),
}

/// Applies the matching engine to every eligible job and commits results.
pub struct MatchOrchestrator<J, A> {
    jobs: Arc<J>,
    agents: Arc<A>,
    last_report: RwLock<Option<MatchReport>>,
}

impl<J, A> MatchOrchestrator<J, A>
where
    J: JobRegistry,
    A: AgentRegistry,
{
    pub fn new(jobs: Arc<J>, agents: Arc<A>) -> Self {
        Self {
            jobs,
            agents,
            last_report: RwLock::new(None),
        }
    }

    /// Run one pass synchronously.
    ///
    /// Fails only if the registries cannot be read. Per-job problems are
    /// logged and counted in the report.
    pub async fn run_pass(&self) -> Result<MatchReport, MarketError> {
        self.run_pass_with_id(Uuid::new_v4().to_string()).await
    }

    async fn run_pass_with_id(&self, run_id: String) -> Result<MatchReport, MarketError> {
        let started_at = Utc::now();

        let pending = self.jobs.list(&JobFilter::with_status(JobStatus::Pending)).await?;
        let eligible: Vec<Job> = pending.into_iter().filter(Job::is_eligible).collect();
        let agents = self.agents.list().await?;
        info!(
            run_id = %run_id,
            eligible = eligible.len(),
            agents = agents.len(),
            "matching pass started"
        );

        let mut report = MatchReport {
            run_id,
            started_at,
            finished_at: started_at,
            eligible: eligible.len(),
            assigned: 0,
            unmatched: 0,
            conflicts: 0,
            failed: 0,
            assignments: Vec::new(),
        };

        for job in &eligible {
            match self.process_job(job, &agents).await {
                JobOutcome::Assigned(assignment) => {
                    report.assigned += 1;
                    report.assignments.push(assignment);
                }
                JobOutcome::Unmatched => report.unmatched += 1,
                JobOutcome::Conflict => report.conflicts += 1,
                JobOutcome::Failed(reason) => {
                    log_job_failure(&report.run_id, &job.id, &reason);
                    report.failed += 1;
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            run_id = %report.run_id,
            assigned = report.assigned,
            unmatched = report.unmatched,
            conflicts = report.conflicts,
            failed = report.failed,
            "matching pass finished"
        );
        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    async fn process_job(&self, job: &Job, agents: &[Agent]) -> JobOutcome {
        let best = match MatchingEngine::best_match(job, agents) {
            Ok(Some(best)) => best,
            Ok(None) => {
                debug!(job_id = %job.id, "no candidate scored above zero");
                return JobOutcome::Unmatched;
            }
            Err(e) => return JobOutcome::Failed(e.to_string()),
        };

        match self.jobs.assign_if_unassigned(&job.id, &best.agent_id).await {
            Ok(true) => {
                info!(job_id = %job.id, agent_id = %best.agent_id, score = best.score, "job assigned");
                JobOutcome::Assigned(Assignment {
                    job_id: job.id.clone(),
                    agent_id: best.agent_id,
                    score: best.score,
                })
            }
            Ok(false) => {
                debug!(job_id = %job.id, "job already assigned by a concurrent writer, discarding");
                JobOutcome::Conflict
            }
            Err(e) => JobOutcome::Failed(e.to_string()),
        }
    }

    /// The report of the most recently finished pass.
    pub async fn last_report(&self) -> Option<MatchReport> {
        self.last_report.read().await.clone()
    }
}

impl<J, A> MatchOrchestrator<J, A>
where
    J: JobRegistry + 'static,
    A: AgentRegistry + 'static,
{
    /// Start a pass in the background and return at once.
    ///
    /// The handle resolves to the pass result; dropping it does not cancel the pass.
    pub fn trigger_with_handle(
        self: &Arc<Self>,
    ) -> (MatchAck, JoinHandle<Result<MatchReport, MarketError>>) {
        let run_id = Uuid::new_v4().to_string();
        let ack = MatchAck {
            message: "Job matching triggered, pending jobs will be matched to suitable agents"
                .to_string(),
            run_id: run_id.clone(),
        };

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = this.run_pass_with_id(run_id.clone()).await;
            if let Err(e) = &result {
                error!(run_id = %run_id, error = %e, "matching pass aborted");
            }
            result
        });

        (ack, handle)
    }

    /// Fire-and-forget variant of [`trigger_with_handle`](Self::trigger_with_handle).
    pub fn trigger(self: &Arc<Self>) -> MatchAck {
        self.trigger_with_handle().0
    }
}

fn log_job_failure(run_id: &str, job_id: &str, reason: &str) {
    warn!(run_id = %run_id, job_id = %job_id, reason = %reason, "job skipped, stays eligible for the next pass");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{new_agent, new_job};
    use crate::model::{JobPatch, NewJob, Page};
    use crate::registry::{MemoryAgentRegistry, MemoryJobRegistry};

    type MemoryOrchestrator = MatchOrchestrator<MemoryJobRegistry, MemoryAgentRegistry>;

    fn setup() -> (Arc<MemoryJobRegistry>, Arc<MemoryAgentRegistry>, Arc<MemoryOrchestrator>) {
        let jobs = Arc::new(MemoryJobRegistry::new());
        let agents = Arc::new(MemoryAgentRegistry::new());
        let orch = Arc::new(MatchOrchestrator::new(Arc::clone(&jobs), Arc::clone(&agents)));
        (jobs, agents, orch)
    }

    #[tokio::test]
    async fn assigns_best_agent_to_eligible_job() {
        let (jobs, agents, orch) = setup();
        let agent = agents
            .create(new_agent("Data Processor", &["nlp", "ocr"], true))
            .await
            .unwrap();
        let job = jobs
            .create(new_job("Data Processor", &["nlp", "vision"], true))
            .await
            .unwrap();

        let report = orch.run_pass().await.unwrap();

        assert_eq!(report.eligible, 1);
        assert_eq!(report.assigned, 1);
        assert_eq!(
            report.assignments,
            vec![Assignment {
                job_id: job.id.clone(),
                agent_id: agent.id.clone(),
                score: 80,
            }]
        );
        let stored = jobs.get(&job.id).await.unwrap();
        assert_eq!(stored.agent_id, Some(agent.id));
        // Assignment never moves the status.
        assert_eq!(stored.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn auto_assign_disabled_jobs_are_never_selected() {
        let (jobs, agents, orch) = setup();
        agents
            .create(new_agent("Data Processor", &["nlp"], true))
            .await
            .unwrap();
        let job = jobs
            .create(new_job("Data Processor", &["nlp"], false))
            .await
            .unwrap();

        let report = orch.run_pass().await.unwrap();
        assert_eq!(report.eligible, 0);
        assert!(jobs.get(&job.id).await.unwrap().agent_id.is_none());
    }

    #[tokio::test]
    async fn non_pending_jobs_are_skipped() {
        let (jobs, agents, orch) = setup();
        agents.create(new_agent("X", &[], true)).await.unwrap();
        let job = jobs.create(new_job("X", &[], true)).await.unwrap();
        jobs.set_status(&job.id, JobStatus::Running).await.unwrap();

        let report = orch.run_pass().await.unwrap();
        assert_eq!(report.eligible, 0);
        assert!(jobs.get(&job.id).await.unwrap().agent_id.is_none());
    }

    #[tokio::test]
    async fn zero_scoring_sole_agent_leaves_job_unassigned() {
        let (jobs, agents, orch) = setup();
        agents
            .create(new_agent("Writer", &["copy"], false))
            .await
            .unwrap();
        let job = jobs
            .create(new_job("Data Processor", &["nlp"], true))
            .await
            .unwrap();

        let report = orch.run_pass().await.unwrap();
        assert_eq!(report.unmatched, 1);
        assert!(jobs.get(&job.id).await.unwrap().agent_id.is_none());

        // Still eligible on the next pass once a suitable agent shows up.
        agents
            .create(new_agent("Data Processor", &[], false))
            .await
            .unwrap();
        let report = orch.run_pass().await.unwrap();
        assert_eq!(report.assigned, 1);
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let (jobs, agents, orch) = setup();
        agents.create(new_agent("X", &["a"], true)).await.unwrap();
        agents.create(new_agent("Y", &["b"], true)).await.unwrap();
        for category in ["X", "Y", "X"] {
            jobs.create(new_job(category, &["a"], true)).await.unwrap();
        }

        orch.run_pass().await.unwrap();
        let after_first = jobs.list(&JobFilter::default()).await.unwrap();

        let second = orch.run_pass().await.unwrap();
        let after_second = jobs.list(&JobFilter::default()).await.unwrap();

        assert_eq!(second.eligible, 0);
        assert_eq!(second.assigned, 0);
        let first_ids: Vec<_> = after_first.iter().map(|j| j.agent_id.clone()).collect();
        let second_ids: Vec<_> = after_second.iter().map(|j| j.agent_id.clone()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[tokio::test]
    async fn concurrent_passes_assign_each_job_once() {
        let (jobs, agents, orch) = setup();
        agents.create(new_agent("X", &[], true)).await.unwrap();
        agents.create(new_agent("X", &[], true)).await.unwrap();
        for _ in 0..20 {
            jobs.create(new_job("X", &[], true)).await.unwrap();
        }

        let (a, b) = tokio::join!(orch.run_pass(), orch.run_pass());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.assigned + b.assigned, 20);
        let all = jobs.list(&JobFilter::default()).await.unwrap();
        assert!(all.iter().all(|j| j.agent_id.is_some()));
    }

    #[tokio::test]
    async fn tie_break_is_stable_across_runs() {
        let mut winners = Vec::new();
        for _ in 0..3 {
            let (jobs, agents, orch) = setup();
            let first = agents.create(new_agent("X", &[], true)).await.unwrap();
            let second = agents.create(new_agent("X", &[], true)).await.unwrap();
            let job = jobs.create(new_job("X", &["t"], true)).await.unwrap();

            orch.run_pass().await.unwrap();
            let expected = std::cmp::min(first.id, second.id);
            let assigned = jobs.get(&job.id).await.unwrap().agent_id.unwrap();
            assert_eq!(assigned, expected);
            winners.push(assigned);
        }
        assert_eq!(winners.len(), 3);
    }

    /// Delegates to an in-memory registry but can fail writes for one job and
    /// serve stale (pre-assignment) snapshots.
    #[derive(Default)]
    struct FlakyJobRegistry {
        inner: MemoryJobRegistry,
        fail_assign_for: Option<String>,
        stale_reads: bool,
        fail_reads: bool,
    }

    impl JobRegistry for FlakyJobRegistry {
        async fn create(&self, new: NewJob) -> Result<Job, MarketError> {
            self.inner.create(new).await
        }

        async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, MarketError> {
            if self.fail_reads {
                return Err(MarketError::Registry("connection refused".into()));
            }
            let mut jobs = self.inner.list(&JobFilter::default()).await?;
            if self.stale_reads {
                for job in &mut jobs {
                    job.agent_id = None;
                }
            }
            Ok(jobs.into_iter().filter(|j| filter.matches(j)).collect())
        }

        async fn page(
            &self,
            page: usize,
            page_size: usize,
            filter: &JobFilter,
        ) -> Result<Page<Job>, MarketError> {
            self.inner.page(page, page_size, filter).await
        }

        async fn get(&self, id: &str) -> Result<Job, MarketError> {
            self.inner.get(id).await
        }

        async fn update(&self, id: &str, patch: JobPatch) -> Result<Job, MarketError> {
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: &str) -> Result<(), MarketError> {
            self.inner.delete(id).await
        }

        async fn set_status(&self, id: &str, status: JobStatus) -> Result<Job, MarketError> {
            self.inner.set_status(id, status).await
        }

        async fn assign_if_unassigned(
            &self,
            job_id: &str,
            agent_id: &str,
        ) -> Result<bool, MarketError> {
            if self.fail_assign_for.as_deref() == Some(job_id) {
                return Err(MarketError::Registry("write timed out".into()));
            }
            self.inner.assign_if_unassigned(job_id, agent_id).await
        }
    }

    #[tokio::test]
    async fn one_failing_job_does_not_stop_the_pass() {
        let agents = Arc::new(MemoryAgentRegistry::new());
        agents.create(new_agent("X", &[], true)).await.unwrap();

        let mut registry = FlakyJobRegistry::default();
        let broken = registry.inner.create(new_job("X", &[], true)).await.unwrap();
        let healthy = registry.inner.create(new_job("X", &[], true)).await.unwrap();
        registry.fail_assign_for = Some(broken.id.clone());
        let jobs = Arc::new(registry);

        let orch = MatchOrchestrator::new(Arc::clone(&jobs), agents);
        let report = orch.run_pass().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.assigned, 1);
        assert!(jobs.get(&broken.id).await.unwrap().is_eligible());
        assert!(jobs.get(&healthy.id).await.unwrap().agent_id.is_some());
    }

    #[tokio::test]
    async fn stale_snapshot_loses_the_race_without_overwriting() {
        let agents = Arc::new(MemoryAgentRegistry::new());
        agents.create(new_agent("X", &[], true)).await.unwrap();

        let registry = FlakyJobRegistry {
            stale_reads: true,
            ..Default::default()
        };
        let job = registry.inner.create(new_job("X", &[], true)).await.unwrap();
        registry
            .inner
            .assign_if_unassigned(&job.id, "winner")
            .await
            .unwrap();
        let jobs = Arc::new(registry);

        let orch = MatchOrchestrator::new(Arc::clone(&jobs), agents);
        let report = orch.run_pass().await.unwrap();

        assert_eq!(report.conflicts, 1);
        assert_eq!(report.assigned, 0);
        assert_eq!(
            jobs.get(&job.id).await.unwrap().agent_id.as_deref(),
            Some("winner")
        );
    }

    #[tokio::test]
    async fn unreadable_registry_fails_the_whole_pass() {
        let agents = Arc::new(MemoryAgentRegistry::new());
        let jobs = Arc::new(FlakyJobRegistry {
            fail_reads: true,
            ..Default::default()
        });
        let orch = MatchOrchestrator::new(jobs, agents);
        assert!(matches!(
            orch.run_pass().await,
            Err(MarketError::Registry(_))
        ));
        assert!(orch.last_report().await.is_none());
    }

    #[tokio::test]
    async fn trigger_acknowledges_then_completes_in_background() {
        let (jobs, agents, orch) = setup();
        agents.create(new_agent("X", &[], true)).await.unwrap();
        let job = jobs.create(new_job("X", &[], true)).await.unwrap();

        let (ack, handle) = orch.trigger_with_handle();
        assert!(!ack.message.is_empty());

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.run_id, ack.run_id);
        assert_eq!(orch.last_report().await, Some(report));
        assert!(jobs.get(&job.id).await.unwrap().agent_id.is_some());
    }

    #[tokio::test]
    async fn deleted_agent_keeps_existing_assignment() {
        let (jobs, agents, orch) = setup();
        let agent = agents.create(new_agent("X", &[], true)).await.unwrap();
        let job = jobs.create(new_job("X", &[], true)).await.unwrap();
        orch.run_pass().await.unwrap();

        agents.delete(&agent.id).await.unwrap();
        agents.create(new_agent("X", &[], true)).await.unwrap();
        let report = orch.run_pass().await.unwrap();

        assert_eq!(report.eligible, 0);
        assert_eq!(jobs.get(&job.id).await.unwrap().agent_id, Some(agent.id));
    }
}
