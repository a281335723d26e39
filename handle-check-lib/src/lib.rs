//! # Handle Check Library
//!
//! A polite, concurrent library for checking username availability against
//! fragment.com.
//!
//! The library fetches one page per handle, classifies the response, and
//! partitions results into "available" and "not available" outputs while
//! keeping the remote service happy: bounded concurrency, per-request retry
//! with exponential backoff and jitter, HTTP 429 awareness, and chunked
//! batches with an enforced cooldown in between.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use handle_check_lib::{HandleChecker, ResultSink};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = HandleChecker::new();
//!     let names = vec!["alice".to_string(), "bob".to_string()];
//!
//!     let mut sink = ResultSink::create("valid.txt", "nonvalid.txt")?;
//!     let summary = checker.run(&names, &mut sink, &CancellationToken::new()).await?;
//!     sink.finish()?;
//!
//!     println!("{} available, {} anomalies", summary.available, summary.anomalies.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Exactly-once accounting**: every distinct input handle ends up in the
//!   valid partition, the non-valid partition, or the anomaly list.
//! - **Bounded load**: at most `concurrency` fetches are in flight at any
//!   point, backoff sleeps included.
//! - **Containment**: per-handle failures never cross a batch boundary; the
//!   run always completes and both partitions stay well-formed.

// Re-export main public API types and functions
// This makes them available as handle_check_lib::TypeName
pub use checker::HandleChecker;
pub use classify::classify;
pub use config::{
    load_env_config, parse_timeout_string, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
    OutputConfig,
};
pub use error::{FetchFailure, HandleCheckError};
pub use sink::{ResultSink, SinkReport};
pub use types::{
    Anomaly, CheckConfig, HandleResult, HandleStatus, RunSummary, DEFAULT_BASE_URL,
    DEFAULT_USER_AGENT,
};
pub use utils::{dedupe_counted, validate_handle};

// Internal modules - these are not part of the public API
mod checker;
mod classify;
mod config;
mod error;
mod fetcher;
mod limiter;
mod scheduler;
mod sink;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, HandleCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
