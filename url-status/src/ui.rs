//! Progress display for the url-status CLI.
//!
//! Everything here writes to stderr so stdout stays a clean record stream.
//! Uses only the `console` crate.

use console::{style, Term};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url_status_lib::{Progress, RunSummary};

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner with live counts, drawn on stderr.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start the spinner. Returns `None` when stderr is not a terminal.
    pub fn start(progress: Arc<Progress>) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!(
                    "{} {}",
                    style(frame).cyan(),
                    progress_line(&progress)
                ));
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

fn progress_line(progress: &Progress) -> String {
    format!(
        "Checked {} URL{} ({} ok, {} failed)",
        progress.checked(),
        plural(progress.checked()),
        progress.succeeded(),
        progress.failed()
    )
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(summary: &RunSummary) {
    eprintln!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    eprintln!(
        "  {} URL{} in {:.1}s  {}  {}  {}  {}",
        style(summary.checked).bold(),
        plural(summary.checked),
        summary.duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} responded", summary.succeeded)).green(),
        style("|").dim(),
        style(format!("{} failed", summary.failed)).red(),
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────
