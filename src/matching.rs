use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::model::{Agent, Job, JobStatus};

/// Points for an exact classification/category match.
pub const CATEGORY_POINTS: u32 = 50;
/// Points per distinct tag shared by agent and job.
pub const SHARED_TAG_POINTS: u32 = 10;
/// Points for agents that accept jobs unattended.
pub const AUTO_ACCEPT_POINTS: u32 = 20;

/// How a score was put together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub category: u32,
    pub shared_tags: u32,
    pub tags: u32,
    pub auto_accept: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.category + self.tags + self.auto_accept
    }
}

/// One entry of a ranked match attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub agent_id: String,
    pub agent_name: String,
    pub score: u32,
    pub breakdown: ScoreBreakdown,
}

/// Ranks agents against a job. Pure: nothing here touches a registry.
pub struct MatchingEngine;

impl MatchingEngine {
    /// Score one agent against one job.
    ///
    /// Classification must equal the job category exactly (case-sensitive).
    /// Tags are compared as sets, so duplicates on either side count once.
    pub fn score(agent: &Agent, job: &Job) -> ScoreBreakdown {
        let category = if agent.classification == job.category {
            CATEGORY_POINTS
        } else {
            0
        };

        let job_tags: HashSet<&str> = job.tags.iter().map(String::as_str).collect();
        let agent_tags: HashSet<&str> = agent.tags.iter().map(String::as_str).collect();
        let shared_tags = job_tags.intersection(&agent_tags).count() as u32;

        let auto_accept = if agent.auto_accept_jobs {
            AUTO_ACCEPT_POINTS
        } else {
            0
        };

        ScoreBreakdown {
            category,
            shared_tags,
            tags: shared_tags * SHARED_TAG_POINTS,
            auto_accept,
        }
    }

    /// Rank every agent with a positive score, best first.
    ///
    /// Equal scores are ordered by ascending agent id, so the head of the list
    /// is the same on every run over the same data.
    pub fn rank(job: &Job, agents: &[Agent]) -> Result<Vec<Candidate>, MarketError> {
        Self::check_matchable(job)?;

        let mut ranked: Vec<Candidate> = agents
            .iter()
            .filter_map(|agent| {
                let breakdown = Self::score(agent, job);
                let score = breakdown.total();
                (score > 0).then(|| Candidate {
                    agent_id: agent.id.clone(),
                    agent_name: agent.name.clone(),
                    score,
                    breakdown,
                })
            })
            .collect();

        ranked.sort_by(Self::by_rank);
        Ok(ranked)
    }

    /// The single best candidate, if any agent scored above zero.
    pub fn best_match(job: &Job, agents: &[Agent]) -> Result<Option<Candidate>, MarketError> {
        Ok(Self::rank(job, agents)?.into_iter().next())
    }

    fn by_rank(a: &Candidate, b: &Candidate) -> Ordering {
        b.score
            .cmp(&a.score)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    }

    fn check_matchable(job: &Job) -> Result<(), MarketError> {
        if job.status != JobStatus::Pending {
            return Err(MarketError::NotEligible {
                job_id: job.id.clone(),
                reason: format!("status is {}", job.status),
            });
        }
        if let Some(agent_id) = &job.agent_id {
            return Err(MarketError::NotEligible {
                job_id: job.id.clone(),
                reason: format!("already assigned to {agent_id}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{agent_with_id, job};

    #[test]
    fn score_formula_components() {
        let job = job("Data Processor", &["nlp", "vision"], true);

        let full = agent_with_id("a", "Data Processor", &["nlp", "ocr"], true);
        let b = MatchingEngine::score(&full, &job);
        assert_eq!(b.category, 50);
        assert_eq!(b.shared_tags, 1);
        assert_eq!(b.tags, 10);
        assert_eq!(b.auto_accept, 20);
        assert_eq!(b.total(), 80);

        let tags_only = agent_with_id("b", "Writer", &["nlp", "vision"], false);
        assert_eq!(MatchingEngine::score(&tags_only, &job).total(), 20);

        let auto_only = agent_with_id("c", "Writer", &[], true);
        assert_eq!(MatchingEngine::score(&auto_only, &job).total(), 20);
    }

    #[test]
    fn category_match_is_case_sensitive() {
        let job = job("Data Processor", &[], true);
        let agent = agent_with_id("a", "data processor", &[], false);
        assert_eq!(MatchingEngine::score(&agent, &job).total(), 0);
    }

    #[test]
    fn duplicate_tags_count_once() {
        let job = job("X", &["nlp", "nlp", "ocr"], true);
        let agent = agent_with_id("a", "Y", &["nlp", "nlp", "nlp"], false);
        let b = MatchingEngine::score(&agent, &job);
        assert_eq!(b.shared_tags, 1);
        assert_eq!(b.total(), 10);
    }

    #[test]
    fn zero_score_agents_are_excluded() {
        let job = job("Data Processor", &["nlp"], true);
        let stranger = agent_with_id("a", "Writer", &["copy"], false);
        let ranked = MatchingEngine::rank(&job, &[stranger]).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn empty_agent_set_is_not_an_error() {
        let job = job("Data Processor", &["nlp"], true);
        assert!(MatchingEngine::rank(&job, &[]).unwrap().is_empty());
        assert!(MatchingEngine::best_match(&job, &[]).unwrap().is_none());
    }

    #[test]
    fn ranking_is_descending_by_score() {
        let job = job("Data Processor", &["nlp", "ocr"], true);
        let agents = vec![
            agent_with_id("low", "Writer", &[], true),
            agent_with_id("high", "Data Processor", &["nlp", "ocr"], true),
            agent_with_id("mid", "Data Processor", &[], false),
        ];
        let ranked = MatchingEngine::rank(&job, &agents).unwrap();
        let order: Vec<_> = ranked.iter().map(|c| (c.agent_id.as_str(), c.score)).collect();
        assert_eq!(order, vec![("high", 90), ("mid", 50), ("low", 20)]);
    }

    #[test]
    fn ties_break_on_smallest_id() {
        let job = job("Data Processor", &["nlp"], true);
        // Both score 50 + 20 = 70.
        let agents = vec![
            agent_with_id("agent-b", "Data Processor", &[], true),
            agent_with_id("agent-a", "Data Processor", &[], true),
        ];
        for _ in 0..5 {
            let best = MatchingEngine::best_match(&job, &agents).unwrap().unwrap();
            assert_eq!(best.agent_id, "agent-a");
            assert_eq!(best.score, 70);
        }

        let reversed: Vec<_> = agents.iter().rev().cloned().collect();
        let best = MatchingEngine::best_match(&job, &reversed).unwrap().unwrap();
        assert_eq!(best.agent_id, "agent-a");
    }

    #[test]
    fn assigned_or_non_pending_jobs_are_rejected() {
        let agents = vec![agent_with_id("a", "X", &[], true)];

        let mut assigned = job("X", &[], true);
        assigned.agent_id = Some("a".into());
        assert!(matches!(
            MatchingEngine::rank(&assigned, &agents),
            Err(MarketError::NotEligible { .. })
        ));

        let mut running = job("X", &[], true);
        running.status = JobStatus::Running;
        assert!(matches!(
            MatchingEngine::rank(&running, &agents),
            Err(MarketError::NotEligible { .. })
        ));
    }

    #[test]
    fn ranking_does_not_mutate_inputs() {
        let job = job("X", &["t"], true);
        let agents = vec![agent_with_id("a", "X", &["t"], true)];
        let (job_before, agents_before) = (job.clone(), agents.clone());
        MatchingEngine::rank(&job, &agents).unwrap();
        assert_eq!(job, job_before);
        assert_eq!(agents, agents_before);
    }
}
