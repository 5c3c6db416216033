//! System agent API with agent jobs

use super::common::ObjectId;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const AGENTS_PATH: &str = "/api/system-agents";
const ASSIGN_PROFILE_PATH: &str = "/api/system-agent-profiles/assign";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Offbox,
    Onbox,
}

impl AgentType {
    pub fn from_off_box(off_box: bool) -> Self {
        if off_box {
            AgentType::Offbox
        } else {
            AgentType::Onbox
        }
    }

    pub fn is_off_box(&self) -> bool {
        matches!(self, AgentType::Offbox)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStatus {
    #[serde(default)]
    pub system_id: Option<String>,
    #[serde(default)]
    pub connection_state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemAgent {
    pub id: String,
    pub management_ip: String,
    #[serde(default)]
    pub profile: Option<String>,
    pub agent_type: AgentType,
    #[serde(default)]
    pub operation_mode: Option<String>,
    #[serde(default)]
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemAgentRequest {
    pub management_ip: String,
    pub profile: String,
    pub agent_type: AgentType,
    pub operation_mode: String,
}

impl SystemAgentRequest {
    pub fn full_control(management_ip: &str, profile: &str, agent_type: AgentType) -> Self {
        Self {
            management_ip: management_ip.to_string(),
            profile: profile.to_string(),
            agent_type,
            operation_mode: "full".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOperation {
    Install,
    Uninstall,
    Check,
}

impl std::fmt::Display for JobOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOperation::Install => write!(f, "install"),
            JobOperation::Uninstall => write!(f, "uninstall"),
            JobOperation::Check => write!(f, "check"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Init,
    InProgress,
    Success,
    Error,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentJob {
    pub id: String,
    pub state: JobState,
}

#[derive(Serialize)]
struct JobRequest {
    operation: JobOperation,
}

#[derive(Serialize)]
struct AssignProfileRequest<'a> {
    system_agents: &'a [String],
    profile_id: &'a str,
}

/// System agents API
pub struct SystemAgentsApi<'a> {
    client: &'a Client,
}

impl<'a> SystemAgentsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/system-agents/{id}
    pub async fn get(&self, id: &str) -> Result<SystemAgent, ApiError> {
        self.client.get(&format!("{}/{}", AGENTS_PATH, id)).await
    }

    /// POST /api/system-agents, returns the agent ID
    pub async fn create(&self, request: &SystemAgentRequest) -> Result<String, ApiError> {
        let created: ObjectId = self.client.post(AGENTS_PATH, request).await?;
        Ok(created.id)
    }

    /// DELETE /api/system-agents/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", AGENTS_PATH, id))
            .await
    }

    /// Moves agents onto another agent profile
    pub async fn assign_profile(&self, agent_ids: &[String], profile_id: &str) -> Result<(), ApiError> {
        let request = AssignProfileRequest {
            system_agents: agent_ids,
            profile_id,
        };
        self.client.post::<(), _>(ASSIGN_PROFILE_PATH, &request).await
    }

    /// POST /api/system-agents/{id}/jobs, returns the job ID
    pub async fn start_job(&self, id: &str, operation: JobOperation) -> Result<String, ApiError> {
        let created: ObjectId = self
            .client
            .post(
                &format!("{}/{}/jobs", AGENTS_PATH, id),
                &JobRequest { operation },
            )
            .await?;
        tracing::debug!("started {} job {} on agent {}", operation, created.id, id);
        Ok(created.id)
    }

    /// GET /api/system-agents/{id}/jobs/{job_id}
    pub async fn get_job(&self, id: &str, job_id: &str) -> Result<AgentJob, ApiError> {
        self.client
            .get(&format!("{}/{}/jobs/{}", AGENTS_PATH, id, job_id))
            .await
    }

    /// Polls a job every `interval` until it finishes. A job ending in the
    /// error state is `ApiError::JobFailed`; running past `timeout` is
    /// `ApiError::Timeout`.
    pub async fn wait_for_job(
        &self,
        id: &str,
        job_id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<AgentJob, ApiError> {
        let started = Instant::now();
        loop {
            let job = self.get_job(id, job_id).await?;
            match job.state {
                JobState::Success => return Ok(job),
                JobState::Error => {
                    return Err(ApiError::JobFailed {
                        job_id: job.id,
                        state: "error".to_string(),
                    })
                }
                JobState::Init | JobState::InProgress | JobState::Other => {}
            }
            if started.elapsed() + interval > timeout {
                return Err(ApiError::Timeout(timeout.as_secs()));
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Starts a job and waits for it to succeed
    pub async fn run_job(
        &self,
        id: &str,
        operation: JobOperation,
        interval: Duration,
        timeout: Duration,
    ) -> Result<AgentJob, ApiError> {
        let job_id = self.start_job(id, operation).await?;
        self.wait_for_job(id, &job_id, interval, timeout).await
    }
}
