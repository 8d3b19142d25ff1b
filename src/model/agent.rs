use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MarketError;

/// A registered worker that can take jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub classification: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub auto_accept_jobs: bool,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn from_new(new: NewAgent) -> Result<Self, MarketError> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            classification: new.classification,
            tags: new.tags,
            auto_accept_jobs: new.auto_accept_jobs,
            is_free: new.is_free,
            address: new.address,
            description: new.description,
            author_bio: new.author_bio,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: AgentPatch) -> Result<(), MarketError> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = name.trim().to_string();
        }
        if let Some(classification) = patch.classification {
            next.classification = classification;
        }
        if let Some(tags) = patch.tags {
            next.tags = tags;
        }
        if let Some(auto_accept_jobs) = patch.auto_accept_jobs {
            next.auto_accept_jobs = auto_accept_jobs;
        }
        if let Some(is_free) = patch.is_free {
            next.is_free = is_free;
        }
        if let Some(address) = patch.address {
            next.address = address;
        }
        if let Some(description) = patch.description {
            next.description = Some(description);
        }
        if let Some(author_bio) = patch.author_bio {
            next.author_bio = Some(author_bio);
        }
        validate_identity(&next.name, &next.classification)?;

        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }
}

/// Payload accepted when registering an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    pub name: String,
    pub classification: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub auto_accept_jobs: bool,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_bio: Option<String>,
}

impl NewAgent {
    pub fn validate(&self) -> Result<(), MarketError> {
        validate_identity(&self.name, &self.classification)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPatch {
    pub name: Option<String>,
    pub classification: Option<String>,
    pub tags: Option<Vec<String>>,
    pub auto_accept_jobs: Option<bool>,
    pub is_free: Option<bool>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub author_bio: Option<String>,
}

fn validate_identity(name: &str, classification: &str) -> Result<(), MarketError> {
    if name.trim().is_empty() {
        return Err(MarketError::validation("name must not be empty"));
    }
    if classification.trim().is_empty() {
        return Err(MarketError::validation("classification must not be empty"));
    }
    Ok(())
}
