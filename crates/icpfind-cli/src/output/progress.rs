//! Progress display for retrieval runs

use std::time::Duration;

use icpfind_core::{RetrievalEvent, RetrievalObserver, TracingObserver};
use indicatif::{ProgressBar, ProgressStyle};

/// Renders retrieval events on a spinner and forwards them to `tracing`.
///
/// A hidden spinner still forwards events, so the same observer serves
/// terminals, pipes and `--quiet`.
pub struct SpinnerObserver {
    bar: ProgressBar,
    logs: TracingObserver,
}

impl SpinnerObserver {
    /// Create an observer; the spinner is drawn only when `visible`.
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            create_spinner("Starting...")
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            logs: TracingObserver,
        }
    }

    /// Handle to the underlying spinner, for clearing it when done.
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }
}

impl RetrievalObserver for SpinnerObserver {
    fn on_event(&self, event: &RetrievalEvent) {
        match event {
            RetrievalEvent::Started { entity, seeded } => {
                self.bar
                    .set_message(format!("{entity}: starting ({seeded} cached)"));
            },
            RetrievalEvent::IterationStarted {
                entity,
                iteration,
                max_iterations,
                excluded,
            } => {
                self.bar.set_message(format!(
                    "{entity}: page {iteration}/{max_iterations}, excluding {excluded} domain(s)"
                ));
            },
            RetrievalEvent::BatchProcessed {
                entity, records, ..
            } => {
                self.bar
                    .set_message(format!("{entity}: {records} filing(s) so far"));
            },
            RetrievalEvent::RateLimited {
                entity,
                attempt,
                delay,
                ..
            } => {
                self.bar.set_message(format!(
                    "{entity}: rate limited, retry {attempt} in {:.1}s",
                    delay.as_secs_f64()
                ));
            },
            _ => {},
        }
        self.bar.suspend(|| self.logs.on_event(event));
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
