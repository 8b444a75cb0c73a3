//! Terminal feedback: busy spinner while a capture is processing, banners for errors.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn parse(flag: Option<&str>) -> Self {
        match flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    fn pretty(&self) -> bool {
        match self.mode {
            UiMode::Pretty => true,
            UiMode::Auto => self.is_tty,
            UiMode::Plain => false,
        }
    }

    /// Busy indicator shown until the guard is dropped or finished.
    pub fn busy(&self, label: &str) -> BusyGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{label}…"));
            BusyGuard::new(label.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", label);
            BusyGuard::new(label.to_string(), None)
        }
    }

    /// Static error banner (camera errors, detection failures).
    pub fn banner(&self, message: &str) {
        if self.pretty() {
            eprintln!("\u{26a0} {}", message);
        } else {
            eprintln!("error: {}", message);
        }
    }
}

pub struct BusyGuard {
    label: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    failed: bool,
}

impl BusyGuard {
    fn new(label: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            label,
            start: Instant::now(),
            spinner,
            failed: false,
        }
    }

    /// Mark the step as failed; the closing line shows a cross instead of a tick.
    pub fn fail(mut self) {
        self.failed = true;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mark = if self.failed { '✘' } else { '✔' };
        let message = format!(
            "{} {} ({})",
            mark,
            self.label,
            format_duration(self.start.elapsed())
        );
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
