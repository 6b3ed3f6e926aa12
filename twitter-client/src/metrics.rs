use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// What one GET to the API produced.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub endpoint: &'static str,
    /// `None` when no response arrived (connect error, timeout).
    pub status: Option<u16>,
    pub latency: Duration,
    /// `ErrorExt::error_code` of the failure, `None` on success.
    pub error_code: Option<String>,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        self.error_code.is_none()
    }
}

/// Per-endpoint tallies. Endpoints are `home`, `user_lookup` and `search`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointStats {
    pub requests: u64,
    pub failures: u64,
    pub total_latency: Duration,
    pub last_status: Option<u16>,
    /// Failure counts keyed by error code.
    pub errors: BTreeMap<String, u64>,
}

impl EndpointStats {
    pub fn average_latency(&self) -> Duration {
        average(self.total_latency, self.requests)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiMetrics {
    pub endpoints: BTreeMap<&'static str, EndpointStats>,
}

impl ApiMetrics {
    pub fn total_requests(&self) -> u64 {
        self.endpoints.values().map(|s| s.requests).sum()
    }

    pub fn failed_requests(&self) -> u64 {
        self.endpoints.values().map(|s| s.failures).sum()
    }

    pub fn rate_limited_requests(&self) -> u64 {
        self.endpoints
            .values()
            .filter_map(|s| s.errors.get(RATE_LIMIT_CODE))
            .sum()
    }

    pub fn average_latency(&self) -> Duration {
        let total = self.endpoints.values().map(|s| s.total_latency).sum();
        average(total, self.total_requests())
    }

    /// Single log line, e.g.
    /// `3 requests, 1 failed, avg 120ms | home 1/1 ok | search 1/2 ok (TWITTER_SERVER_ERROR x1, last 503)`.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} requests, {} failed, avg {:?}",
            self.total_requests(),
            self.failed_requests(),
            self.average_latency()
        );

        for (endpoint, stats) in &self.endpoints {
            let _ = write!(
                line,
                " | {} {}/{} ok",
                endpoint,
                stats.requests - stats.failures,
                stats.requests
            );
            if !stats.errors.is_empty() {
                let errors: Vec<String> = stats
                    .errors
                    .iter()
                    .map(|(code, count)| format!("{code} x{count}"))
                    .collect();
                let _ = write!(line, " ({}", errors.join(", "));
                if let Some(status) = stats.last_status {
                    let _ = write!(line, ", last {status}");
                }
                line.push(')');
            }
        }
        line
    }
}

const RATE_LIMIT_CODE: &str = "TWITTER_RATE_LIMIT";

fn average(total: Duration, count: u64) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

/// Shared, append-only request statistics for one client.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<ApiMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, outcome: RequestOutcome) {
        let mut metrics = self.metrics.write().await;
        let stats = metrics.endpoints.entry(outcome.endpoint).or_default();

        stats.requests += 1;
        stats.total_latency += outcome.latency;
        if outcome.status.is_some() {
            stats.last_status = outcome.status;
        }
        if let Some(code) = outcome.error_code {
            stats.failures += 1;
            *stats.errors.entry(code).or_insert(0) += 1;
        }
    }

    pub async fn snapshot(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }
}
