mod agent;
mod job;
mod status;

pub use agent::{Agent, AgentPatch, NewAgent};
pub use job::{
    Job, JobFilter, JobPatch, JobPriority, MAX_PAGE_SIZE, NewJob, Page, PaymentType, SkillLevel,
};
pub use status::{JobStatus, StatusChange};
