pub mod client;
pub mod error;
pub mod types;

pub use client::{MarketApi, MarketClient};
pub use error::ClientError;
pub use types::{ErrorBody, HealthResponse};
