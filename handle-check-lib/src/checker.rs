//! Main handle checker implementation.
//!
//! This module provides the primary `HandleChecker` struct that orchestrates
//! availability checking: one-off single checks and full batched runs.

use crate::error::HandleCheckError;
use crate::fetcher::PageFetcher;
use crate::scheduler::BatchScheduler;
use crate::sink::ResultSink;
use crate::types::{CheckConfig, HandleResult, RunSummary};
use crate::utils::validate_handle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Main handle checker that coordinates availability checking operations.
///
/// The `HandleChecker` handles all aspects of a run:
/// - Concurrency limiting and batch scheduling
/// - Retry with exponential backoff and jitter
/// - Classification of response pages
/// - Result routing into the output partitions
///
/// # Example
///
/// ```rust,no_run
/// use handle_check_lib::HandleChecker;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = HandleChecker::new();
///     let result = checker.check_handle("alice").await?;
///     println!("{}: {}", result.name, result.status);
///     Ok(())
/// }
/// ```
pub struct HandleChecker {
    /// Configuration settings for this checker instance
    config: CheckConfig,
    /// Shared page fetcher (HTTP client + retry policy)
    fetcher: Arc<PageFetcher>,
}

impl HandleChecker {
    /// Create a new handle checker with default configuration.
    ///
    /// Default settings:
    /// - Concurrency: 20
    /// - Batch size: 20
    /// - Pause between batches: 4 seconds (+ jitter)
    /// - Attempts per handle: 3
    /// - Request timeout: 10 seconds
    pub fn new() -> Self {
        Self::with_config(CheckConfig::default())
    }

    /// Create a new handle checker with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use handle_check_lib::{HandleChecker, CheckConfig};
    /// use std::time::Duration;
    ///
    /// let config = CheckConfig::default()
    ///     .with_concurrency(10)
    ///     .with_request_timeout(Duration::from_secs(5));
    ///
    /// let checker = HandleChecker::with_config(config);
    /// ```
    pub fn with_config(config: CheckConfig) -> Self {
        let fetcher =
            Arc::new(PageFetcher::new(&config).expect("Failed to create HTTP client"));
        Self { config, fetcher }
    }

    /// Check availability of a single handle.
    ///
    /// This is the most basic operation: one handle, one classified result.
    /// Retries and backoff apply exactly as in a batched run; the result is
    /// never an error unless the handle itself is invalid.
    pub async fn check_handle(&self, name: &str) -> Result<HandleResult, HandleCheckError> {
        validate_handle(name)?;
        Ok(self.fetcher.fetch_status(name.trim()).await)
    }

    /// Check a list of handles and route every result into `sink`.
    ///
    /// The input is deduplicated, split into batches, and processed under
    /// the configured concurrency cap with an enforced pause between
    /// batches. Every distinct input handle is accounted for exactly once:
    /// in the valid partition, the non-valid partition, or the summary's
    /// anomaly list.
    ///
    /// `cancel` stops the run promptly: no new batches are submitted, and
    /// everything accepted so far is flushed before returning.
    pub async fn run(
        &self,
        names: &[String],
        sink: &mut ResultSink,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, HandleCheckError> {
        let scheduler = BatchScheduler::new(self.fetcher.clone(), self.config.clone());
        scheduler.run(names, sink, cancel).await
    }

    /// Get the current configuration for this checker.
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }
}

impl Default for HandleChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_creation() {
        let checker = HandleChecker::new();
        assert_eq!(checker.config().concurrency, 20);
    }

    #[tokio::test]
    async fn test_invalid_handle_rejected_before_any_request() {
        let checker = HandleChecker::new();
        let result = checker.check_handle("   ").await;
        assert!(matches!(
            result,
            Err(HandleCheckError::InvalidHandle { .. })
        ));
    }
}
