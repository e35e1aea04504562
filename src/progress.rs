//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while tables load and compare
#[derive(Debug)]
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
    start_time: std::time::Instant,
}

impl ProgressReporter {
    pub fn new(message: &str) -> Self {
        Self {
            spinner: Some(create_spinner(message)),
            start_time: std::time::Instant::now(),
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            spinner: None,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.spinner.is_some()
    }

    /// Update the spinner message without finishing
    pub fn update(&self, message: &str) {
        if let Some(pb) = &self.spinner {
            pb.set_message(message.to_string());
        }
    }

    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_with_message(format!(
                "{} ({:.1}s)",
                message,
                self.start_time.elapsed().as_secs_f64()
            ));
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    match ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
    {
        Ok(style) => pb.set_style(style),
        Err(e) => log::debug!("Falling back to default spinner style: {}", e),
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
