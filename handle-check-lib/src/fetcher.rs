//! Fetching and retrying of handle pages.
//!
//! `PageFetcher` owns the shared HTTP client and implements two layers:
//! a single-attempt executor that maps every outcome to a typed
//! [`FetchFailure`], and the retry state machine that folds attempts into a
//! final [`HandleResult`] with exponential backoff and jitter.

use crate::classify::classify;
use crate::error::{FetchFailure, HandleCheckError};
use crate::types::{CheckConfig, HandleResult, HandleStatus};
use rand::Rng;
use reqwest::header::USER_AGENT;
use std::time::{Duration, Instant};

/// Fetches handle pages from the remote service.
///
/// One instance is shared across all concurrent fetches of a run; reqwest's
/// client is internally reference-counted and reuses connections.
pub struct PageFetcher {
    /// Shared HTTP client with the configured request timeout
    client: reqwest::Client,
    /// Base URL of the remote service
    base_url: String,
    /// Browser identification sent with every request
    user_agent: String,
    /// Fetch attempts per handle before giving up
    max_attempts: u32,
}

impl PageFetcher {
    /// Create a fetcher from a checker configuration.
    pub fn new(config: &CheckConfig) -> Result<Self, HandleCheckError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                HandleCheckError::network_with_source("Failed to create HTTP client", e.to_string())
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Perform one GET for the handle's page. Single attempt, no retry.
    ///
    /// Non-2xx statuses are failures: 429 maps to `RateLimited`, everything
    /// else to `HttpStatus(code)`. Connection problems and deadline overruns
    /// map through `From<reqwest::Error>`.
    pub(crate) async fn execute(&self, name: &str) -> Result<String, FetchFailure> {
        let url = format!("{}/username/{}", self.base_url, name);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchFailure::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchFailure::HttpStatus(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// Fetch and classify one handle, retrying transient failures.
    ///
    /// State machine per handle:
    /// - a single start jitter of 0.1-0.3s desynchronizes a batch of
    ///   concurrent first attempts;
    /// - on success the body is classified and returned (a captcha page is a
    ///   valid classification, logged for operator visibility);
    /// - transient failures sleep `2^attempt + uniform(0,1)` seconds and try
    ///   again, up to the attempt cap, then settle as `TransientError`;
    /// - unexpected failures settle as `FatalError` immediately without
    ///   consuming further attempts.
    ///
    /// Never fails: every outcome folds into the returned status.
    pub async fn fetch_status(&self, name: &str) -> HandleResult {
        let started = Instant::now();

        tokio::time::sleep(start_jitter()).await;

        let mut attempt: u32 = 1;
        loop {
            match self.execute(name).await {
                Ok(body) => {
                    let status = classify(&body);
                    if status == HandleStatus::CaptchaChallenge {
                        tracing::warn!(handle = name, "captcha challenge detected");
                    }
                    return HandleResult {
                        name: name.to_string(),
                        status,
                        attempts: attempt,
                        check_duration: Some(started.elapsed()),
                    };
                }
                Err(failure) if failure.is_transient() => {
                    if failure == FetchFailure::RateLimited {
                        tracing::warn!(
                            handle = name,
                            attempt,
                            max_attempts = self.max_attempts,
                            "too many requests"
                        );
                    } else {
                        tracing::warn!(
                            handle = name,
                            attempt,
                            max_attempts = self.max_attempts,
                            error = %failure,
                            "fetch attempt failed"
                        );
                    }

                    if attempt >= self.max_attempts {
                        tracing::error!(
                            handle = name,
                            attempts = attempt,
                            "giving up after exhausting retries"
                        );
                        return HandleResult {
                            name: name.to_string(),
                            status: HandleStatus::TransientError(failure.to_string()),
                            attempts: attempt,
                            check_duration: Some(started.elapsed()),
                        };
                    }

                    let delay = backoff_delay(attempt);
                    tracing::debug!(
                        handle = name,
                        delay_ms = delay.as_millis() as u64,
                        "backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => {
                    tracing::error!(handle = name, error = %failure, "unexpected error, not retrying");
                    return HandleResult {
                        name: name.to_string(),
                        status: HandleStatus::FatalError(failure.to_string()),
                        attempts: attempt,
                        check_duration: Some(started.elapsed()),
                    };
                }
            }
        }
    }
}

/// Per-request start jitter: uniform in [0.1, 0.3) seconds.
fn start_jitter() -> Duration {
    let secs: f64 = rand::thread_rng().gen_range(0.1..0.3);
    Duration::from_secs_f64(secs)
}

/// Backoff before retry k+1: `2^k` seconds plus up to one second of jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let base = (1u64 << attempt.min(16)) as f64;
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    Duration::from_secs_f64(base + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_jitter_bounds() {
        for _ in 0..200 {
            let jitter = start_jitter();
            assert!(jitter >= Duration::from_millis(100));
            assert!(jitter < Duration::from_millis(300));
        }
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        for attempt in 1..=4u32 {
            let base = Duration::from_secs(1 << attempt);
            for _ in 0..50 {
                let delay = backoff_delay(attempt);
                assert!(delay >= base, "attempt {}: {:?} < {:?}", attempt, delay, base);
                assert!(
                    delay < base + Duration::from_secs(1),
                    "attempt {}: {:?} exceeds jitter window",
                    attempt,
                    delay
                );
            }
        }
    }

    #[test]
    fn test_backoff_shift_is_capped() {
        // Pathological attempt counts must not overflow the shift.
        let delay = backoff_delay(u32::MAX);
        assert!(delay >= Duration::from_secs(1 << 16));
    }

    #[tokio::test]
    async fn test_fetcher_creation() {
        let fetcher = PageFetcher::new(&CheckConfig::default());
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_base_url_is_fatal_not_retried() {
        // A URL reqwest cannot even build fails as Unexpected, which the
        // state machine converts to FatalError on the first attempt.
        let config = CheckConfig::default().with_base_url("not a url");
        let fetcher = PageFetcher::new(&config).unwrap();

        let result = fetcher.fetch_status("alice").await;
        assert_eq!(result.attempts, 1, "fatal failures must not retry");
        assert!(
            matches!(result.status, HandleStatus::FatalError(_)),
            "got {:?}",
            result.status
        );
    }
}
