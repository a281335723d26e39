//! Display logic for the handle-check CLI.
//!
//! This module handles run headers, the spinner shown while batches drain,
//! the closing summary, and the anomaly report. Uses only the `console`
//! crate (already a dependency).

use console::{style, Term};
use handle_check_lib::{HandleStatus, RunSummary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a new spinner with the given message, or return `None` when
    /// stderr is not a terminal.
    pub fn start(message: String) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a run.
pub fn print_header(handle_count: usize, concurrency: usize, chunk_size: usize) {
    println!(
        "{} {} {}",
        style("handle-check").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "— Checking {} handle{}",
            handle_count,
            if handle_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );
    println!(
        "{}",
        style(format!(
            "Concurrency: {} | Batch size: {}",
            concurrency, chunk_size
        ))
        .dim()
    );
    println!();
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the closing summary for a completed (or cancelled) run.
pub fn print_summary(summary: &RunSummary, valid_path: &str, nonvalid_path: &str) {
    println!();
    if summary.cancelled {
        println!(
            "{} run interrupted after {} batch{}",
            style("!").yellow().bold(),
            summary.batches_completed,
            if summary.batches_completed == 1 { "" } else { "es" },
        );
    }

    println!(
        "{} {} checked ({} distinct, {} duplicate{} dropped) in {:.1}s",
        style("Summary:").bold(),
        summary.total_input,
        summary.distinct,
        summary.duplicates,
        if summary.duplicates == 1 { "" } else { "s" },
        summary.elapsed.as_secs_f64(),
    );
    println!(
        "  {} {}  →  {}",
        style(summary.available).green().bold(),
        style("available").green(),
        valid_path,
    );
    println!(
        "  {} {} / {} {}  →  {}",
        style(summary.taken).red().bold(),
        style("taken").red(),
        style(summary.undetermined).yellow().bold(),
        style("undetermined").yellow(),
        nonvalid_path,
    );
    if summary.for_sale > 0 {
        println!(
            "  {} {} (not persisted)",
            style(summary.for_sale).magenta().bold(),
            style("for sale").magenta(),
        );
    }
}

/// Print anomalies (challenge pages and unresolved errors), grouped by kind.
pub fn print_anomalies(summary: &RunSummary) {
    if summary.anomalies.is_empty() {
        return;
    }

    println!();
    println!(
        "{}  {} handle{} need attention:",
        style("⚠").yellow().bold(),
        summary.anomalies.len(),
        if summary.anomalies.len() == 1 { "" } else { "s" },
    );

    let mut captchas: Vec<&str> = Vec::new();
    for anomaly in &summary.anomalies {
        match &anomaly.status {
            HandleStatus::CaptchaChallenge => captchas.push(&anomaly.name),
            status => {
                println!("  {} {}  {}", style("✗").red(), anomaly.name, style(status).dim());
            }
        }
    }

    if !captchas.is_empty() {
        println!(
            "  {} captcha challenge{}: {}",
            style(captchas.len()).yellow().bold(),
            if captchas.len() == 1 { "" } else { "s" },
            format_list(&captchas, 5),
        );
    }
}

/// Join up to `max_show` items, then "... and N more".
fn format_list(items: &[&str], max_show: usize) -> String {
    if items.len() <= max_show {
        items.join(", ")
    } else {
        let shown = &items[..max_show];
        format!("{}, ... and {} more", shown.join(", "), items.len() - max_show)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_list_short() {
        assert_eq!(format_list(&["a", "b"], 5), "a, b");
    }

    #[test]
    fn test_format_list_truncated() {
        let items = ["a", "b", "c", "d", "e", "f", "g"];
        assert_eq!(format_list(&items, 5), "a, b, c, d, e, ... and 2 more");
    }
}
