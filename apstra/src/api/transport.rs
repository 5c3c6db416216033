//! reqwest client construction and per-client request accounting

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Every request carries this user agent
pub const USER_AGENT: &str = concat!("terraform-provider-apstra/", env!("CARGO_PKG_VERSION"));

pub struct TransportConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_idle_per_host: usize,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(90),
            max_idle_per_host: 10,
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

impl TransportConfig {
    /// Apstra ships with a self-signed certificate; `insecure` skips
    /// verification
    pub fn build_client(&self, insecure: bool) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(insecure)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.idle_timeout)
            .pool_max_idle_per_host(self.max_idle_per_host);

        if let Some(keepalive) = self.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder.build()
    }
}

/// What became of one attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attempt {
    Status(u16),
    /// No HTTP response at all
    Transport,
}

#[derive(Debug, Default, Clone)]
pub struct RequestStats {
    pub attempts: u64,
    pub retries: u64,
    pub transport_failures: u64,
    /// Responses seen, by status code
    pub statuses: BTreeMap<u16, u64>,
    pub last_attempt: Option<Instant>,
}

impl RequestStats {
    pub fn failures(&self) -> u64 {
        self.transport_failures
            + self
                .statuses
                .iter()
                .filter(|(status, _)| !(200..300).contains(*status))
                .map(|(_, count)| count)
                .sum::<u64>()
    }
}

#[derive(Clone, Default)]
pub struct StatsRecorder {
    stats: Arc<RwLock<RequestStats>>,
}

impl StatsRecorder {
    pub async fn record(&self, attempt: Attempt, retry: bool) {
        let mut stats = self.stats.write().await;
        stats.attempts += 1;
        if retry {
            stats.retries += 1;
        }
        match attempt {
            Attempt::Status(status) => *stats.statuses.entry(status).or_default() += 1,
            Attempt::Transport => stats.transport_failures += 1,
        }
        stats.last_attempt = Some(Instant::now());
    }

    pub async fn snapshot(&self) -> RequestStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_the_provider() {
        assert!(USER_AGENT.starts_with("terraform-provider-apstra/"));
        assert!(TransportConfig::default().build_client(true).is_ok());
    }

    #[tokio::test]
    async fn failures_count_non_success_statuses() {
        let recorder = StatsRecorder::default();
        recorder.record(Attempt::Status(503), false).await;
        recorder.record(Attempt::Transport, true).await;
        recorder.record(Attempt::Status(201), true).await;
        recorder.record(Attempt::Status(404), false).await;

        let stats = recorder.snapshot().await;
        assert_eq!(stats.attempts, 4);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.failures(), 3);
        assert_eq!(stats.statuses.get(&201), Some(&1));
        assert!(stats.last_attempt.is_some());
    }
}
