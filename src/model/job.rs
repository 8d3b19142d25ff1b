use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::JobStatus;
use crate::error::MarketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentType {
    #[default]
    Fixed,
    Hourly,
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobPriority {
    #[serde(rename = "Low Priority")]
    Low,
    #[default]
    #[serde(rename = "Medium Priority")]
    Medium,
    #[serde(rename = "High Priority")]
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

/// A unit of work posted to the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub budget_min: f64,
    pub budget_max: f64,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub priority: JobPriority,
    #[serde(default)]
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub deliverables: String,
    #[serde(default)]
    pub auto_assign: bool,
    #[serde(default)]
    pub allow_bidding: bool,
    #[serde(default)]
    pub enable_escrow: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a stored job from a creation payload. Always starts in `PENDING`.
    pub fn from_new(new: NewJob) -> Result<Self, MarketError> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            description: new.description,
            category: new.category,
            tags: new.tags,
            payment_type: new.payment_type,
            budget_min: new.budget_min,
            budget_max: new.budget_max,
            deadline: new.deadline,
            priority: new.priority,
            skill_level: new.skill_level,
            deliverables: new.deliverables,
            auto_assign: new.auto_assign,
            allow_bidding: new.allow_bidding,
            enable_escrow: new.enable_escrow,
            agent_id: None,
            status: JobStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_assigned(&self) -> bool {
        self.agent_id.is_some()
    }

    /// Pending, unassigned and opted in to automatic matching.
    pub fn is_eligible(&self) -> bool {
        self.status == JobStatus::Pending && !self.is_assigned() && self.auto_assign
    }

    /// Apply a partial update. The patch is validated against the merged
    /// result before anything on `self` changes.
    pub fn apply_patch(&mut self, patch: JobPatch) -> Result<(), MarketError> {
        if patch.status.is_some() {
            return Err(MarketError::validation(
                "status cannot be changed by a job update, use the status operation",
            ));
        }
        if let Some(requested) = &patch.agent_id
            && self.agent_id.as_ref() != Some(requested)
        {
            return Err(MarketError::validation(
                "agentId cannot be changed by a job update, use the assign operation",
            ));
        }

        let mut next = self.clone();
        if let Some(title) = patch.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(tags) = patch.tags {
            next.tags = tags;
        }
        if let Some(payment_type) = patch.payment_type {
            next.payment_type = payment_type;
        }
        if let Some(budget_min) = patch.budget_min {
            next.budget_min = budget_min;
        }
        if let Some(budget_max) = patch.budget_max {
            next.budget_max = budget_max;
        }
        if let Some(deadline) = patch.deadline {
            next.deadline = deadline;
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(skill_level) = patch.skill_level {
            next.skill_level = skill_level;
        }
        if let Some(deliverables) = patch.deliverables {
            next.deliverables = deliverables;
        }
        if let Some(auto_assign) = patch.auto_assign {
            next.auto_assign = auto_assign;
        }
        if let Some(allow_bidding) = patch.allow_bidding {
            next.allow_bidding = allow_bidding;
        }
        if let Some(enable_escrow) = patch.enable_escrow {
            next.enable_escrow = enable_escrow;
        }
        if let Some(result) = patch.result {
            next.result = Some(result);
        }

        validate_required("title", &next.title)?;
        validate_required("category", &next.category)?;
        validate_budget(next.budget_min, next.budget_max)?;

        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }
}

/// Payload accepted when posting a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub budget_min: f64,
    pub budget_max: f64,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub priority: JobPriority,
    #[serde(default)]
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub deliverables: String,
    #[serde(default)]
    pub auto_assign: bool,
    #[serde(default)]
    pub allow_bidding: bool,
    #[serde(default)]
    pub enable_escrow: bool,
    /// Accepted on the wire only so it can be rejected: new jobs start
    /// unassigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl NewJob {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.agent_id.is_some() {
            return Err(MarketError::validation(
                "agentId cannot be set on create, use the assign operation",
            ));
        }
        validate_required("title", &self.title)?;
        validate_required("category", &self.category)?;
        validate_budget(self.budget_min, self.budget_max)
    }
}

/// Partial job update. `status` and `agentId` are accepted on the wire only
/// so that attempts to change them can be rejected explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub payment_type: Option<PaymentType>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<JobPriority>,
    pub skill_level: Option<SkillLevel>,
    pub deliverables: Option<String>,
    pub auto_assign: Option<bool>,
    pub allow_bidding: Option<bool>,
    pub enable_escrow: Option<bool>,
    pub result: Option<serde_json::Value>,
    pub status: Option<JobStatus>,
    pub agent_id: Option<String>,
}

/// Filters for job listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub category: Option<String>,
    pub priority: Option<JobPriority>,
    pub skill_level: Option<SkillLevel>,
    pub search: Option<String>,
}

impl JobFilter {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        if self.status.is_some_and(|s| s != job.status) {
            return false;
        }
        if self.category.as_ref().is_some_and(|c| *c != job.category) {
            return false;
        }
        if self.priority.is_some_and(|p| p != job.priority) {
            return false;
        }
        if self.skill_level.is_some_and(|l| l != job.skill_level) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                job.title.to_lowercase().contains(&needle)
                    || job.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

pub const MAX_PAGE_SIZE: usize = 100;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T: Clone> Page<T> {
    /// Cut page `page` (1-based) out of `items`. Out-of-range pages are empty.
    pub fn slice(items: &[T], page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let total = items.len();
        let total_pages = total.div_ceil(page_size);
        let data = items
            .iter()
            .skip(page.saturating_sub(1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();
        Self {
            data,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

fn validate_required(field: &str, value: &str) -> Result<(), MarketError> {
    if value.trim().is_empty() {
        return Err(MarketError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_budget(min: f64, max: f64) -> Result<(), MarketError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(MarketError::validation("budget bounds must be finite numbers"));
    }
    if min < 0.0 || max < 0.0 {
        return Err(MarketError::validation("budget bounds must not be negative"));
    }
    if min > max {
        return Err(MarketError::validation(format!(
            "budgetMin ({min}) must not exceed budgetMax ({max})"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn new_job(category: &str, tags: &[&str], auto_assign: bool) -> NewJob {
        NewJob {
            title: format!("{category} job"),
            description: String::new(),
            category: category.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            payment_type: PaymentType::Fixed,
            budget_min: 100.0,
            budget_max: 1000.0,
            deadline: NaiveDate::from_ymd_opt(2030, 1, 31).unwrap(),
            priority: JobPriority::Medium,
            skill_level: SkillLevel::Intermediate,
            deliverables: String::new(),
            auto_assign,
            allow_bidding: false,
            enable_escrow: false,
            agent_id: None,
        }
    }

    pub fn job(category: &str, tags: &[&str], auto_assign: bool) -> Job {
        Job::from_new(new_job(category, tags, auto_assign)).unwrap()
    }
}
