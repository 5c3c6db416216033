//! Apstra REST API client

pub mod agent_profiles;
pub mod client;
pub mod common;
pub mod connectivity_templates;
pub mod error;
pub mod resources;
pub mod system_agents;
pub mod systems;
pub mod transport;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, RetryConfig, AUTH_TOKEN_HEADER};
pub use common::ApiErrorDetails;
pub use error::ApiError;
