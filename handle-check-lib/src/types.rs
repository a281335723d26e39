//! Core data types for handle availability checking.
//!
//! This module defines all the main data structures used throughout the library,
//! including handle statuses, per-run results, and configuration options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default service the checker polls. Handle pages live at `{base}/username/{name}`.
pub const DEFAULT_BASE_URL: &str = "https://fragment.com";

/// Browser identification sent with every request. The remote service serves
/// a challenge page to obvious non-browser clients, so this stays fixed.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) \
Chrome/58.0.3029.110 Safari/537.3";

/// Classified availability status of a single handle.
///
/// Produced once per handle per run by folding the fetch/retry outcome
/// through the classifier. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleStatus {
    /// The handle can be registered.
    Available,

    /// The handle is already taken.
    Taken,

    /// The handle is listed for sale / open to offers.
    /// Informational only: written to neither output partition.
    ForSale,

    /// The page served an anti-bot challenge instead of a status.
    /// A valid classification, but flagged for operator attention.
    CaptchaChallenge,

    /// The page loaded but carried no recognizable status phrasing.
    Undetermined,

    /// Every attempt failed with a transient cause (timeout, 429, ...).
    TransientError(String),

    /// A single attempt failed with a non-retryable cause.
    FatalError(String),
}

impl HandleStatus {
    /// Whether this status requires operator attention rather than a
    /// partition write (challenge pages and unresolved errors).
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            Self::CaptchaChallenge | Self::TransientError(_) | Self::FatalError(_)
        )
    }
}

impl std::fmt::Display for HandleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Taken => write!(f, "taken"),
            Self::ForSale => write!(f, "for sale"),
            Self::CaptchaChallenge => write!(f, "captcha challenge"),
            Self::Undetermined => write!(f, "undetermined"),
            Self::TransientError(cause) => write!(f, "transient error: {}", cause),
            Self::FatalError(cause) => write!(f, "fatal error: {}", cause),
        }
    }
}

/// Result of checking a single handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleResult {
    /// The handle that was checked, as supplied by the caller.
    pub name: String,

    /// Classified availability status.
    pub status: HandleStatus,

    /// Number of fetch attempts that were executed (1..=max_attempts).
    pub attempts: u32,

    /// How long the check took, including jitter and backoff sleeps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_duration: Option<Duration>,
}

/// A result requiring operator attention: a challenge page or an error that
/// survived the retry policy. Not written to either output partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    /// The handle the anomaly belongs to.
    pub name: String,

    /// The status that made it an anomaly.
    pub status: HandleStatus,
}

/// Aggregate accounting for a whole run.
///
/// Invariant: `available + taken + undetermined + for_sale + anomalies.len()`
/// equals the number of distinct handles processed (when not cancelled).
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Raw input count, before deduplication.
    pub total_input: usize,

    /// Distinct handles that formed the work set.
    pub distinct: usize,

    /// Duplicate occurrences dropped by deduplication.
    pub duplicates: usize,

    /// Handles written to the valid partition.
    pub available: usize,

    /// Handles written to the non-valid partition as taken.
    pub taken: usize,

    /// Handles written to the non-valid partition as undetermined.
    pub undetermined: usize,

    /// Handles classified as for-sale (displayed, persisted to neither file).
    pub for_sale: usize,

    /// Challenge pages and unresolved errors.
    pub anomalies: Vec<Anomaly>,

    /// Batches fully drained.
    pub batches_completed: usize,

    /// Highest number of fetches observed in flight at once.
    pub peak_in_flight: usize,

    /// Whether the run was interrupted before all batches drained.
    pub cancelled: bool,

    /// Wall time for the whole run.
    #[serde(skip)] // Don't serialize Duration directly
    pub elapsed: Duration,
}

/// Configuration options for handle checking operations.
///
/// This struct allows fine-tuning of the polling behavior: concurrency,
/// batch shape, retry policy, and the remote endpoint itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Maximum number of concurrent fetches
    /// Default: 20, Range: 1-100
    pub concurrency: usize,

    /// Handles per batch; batches run one after another with a pause between
    /// Default: 20
    pub chunk_size: usize,

    /// Base pause between batches; up to 2 extra seconds of jitter are added
    /// Default: 4 seconds
    #[serde(skip)] // Don't serialize Duration directly
    pub pause_between_chunks: Duration,

    /// Fetch attempts per handle before giving up
    /// Default: 3
    pub max_attempts: u32,

    /// Timeout for each individual HTTP request
    /// Default: 10 seconds
    #[serde(skip)] // Don't serialize Duration directly
    pub request_timeout: Duration,

    /// Base URL of the remote service
    pub base_url: String,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for CheckConfig {
    /// Create a sensible default configuration.
    ///
    /// These defaults match the remote service's observed tolerance:
    /// 20 concurrent fetches, batches of 20, a 4 second cooldown between
    /// batches, and 3 attempts per handle.
    fn default() -> Self {
        Self {
            concurrency: 20,
            chunk_size: 20,
            pause_between_chunks: Duration::from_secs(4),
            max_attempts: 3,
            request_timeout: Duration::from_secs(10),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CheckConfig {
    /// Create a new configuration with custom concurrency.
    ///
    /// Automatically caps concurrency at 100 to prevent resource exhaustion.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 100);
        self
    }

    /// Set the batch size. Zero is bumped to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the base pause between batches.
    pub fn with_pause_between_chunks(mut self, pause: Duration) -> Self {
        self.pause_between_chunks = pause;
        self
    }

    /// Set the per-handle attempt cap. Zero is bumped to one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set custom timeout for each HTTP request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Point the checker at a different base URL (testing, mirrors).
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the User-Agent header.
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CheckConfig::default();
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.chunk_size, 20);
        assert_eq!(config.pause_between_chunks, Duration::from_secs(4));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_concurrency_clamped() {
        let config = CheckConfig::default().with_concurrency(500);
        assert_eq!(config.concurrency, 100);

        let config = CheckConfig::default().with_concurrency(0);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_zero_values_bumped() {
        let config = CheckConfig::default()
            .with_chunk_size(0)
            .with_max_attempts(0);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_status_anomaly_partition() {
        assert!(!HandleStatus::Available.is_anomaly());
        assert!(!HandleStatus::Taken.is_anomaly());
        assert!(!HandleStatus::ForSale.is_anomaly());
        assert!(!HandleStatus::Undetermined.is_anomaly());
        assert!(HandleStatus::CaptchaChallenge.is_anomaly());
        assert!(HandleStatus::TransientError("timeout".into()).is_anomaly());
        assert!(HandleStatus::FatalError("boom".into()).is_anomaly());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&HandleStatus::ForSale).unwrap();
        assert_eq!(json, "\"for_sale\"");

        let json = serde_json::to_string(&HandleStatus::TransientError("429".into())).unwrap();
        assert_eq!(json, "{\"transient_error\":\"429\"}");
    }
}
