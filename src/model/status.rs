use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MarketError;

/// Lifecycle status of a job.
///
/// Conventional flow: PENDING → RUNNING → COMPLETED, with PENDING|RUNNING → FAILED.
/// COMPLETED and FAILED are terminal in the conventional flow, but the status
/// operation is a plain overwrite and accepts any value at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self → next` follows the conventional lifecycle.
    ///
    /// Setting a status to its current value counts as conventional.
    pub fn is_conventional_transition(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                MarketError::validation(format!(
                    "unknown job status `{s}`, expected one of PENDING, RUNNING, COMPLETED, FAILED"
                ))
            })
    }
}

/// The record of one status overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl StatusChange {
    pub fn new(from: JobStatus, to: JobStatus) -> Self {
        Self { from, to }
    }

    pub fn is_conventional(&self) -> bool {
        self.from.is_conventional_transition(self.to)
    }
}
