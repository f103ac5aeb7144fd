//! Spinner for long cache steps (lineage search, download, archive)

use super::context::UiContext;
use super::output::TAG;
use console::style;

/// Spinner in a terminal, a `[buildstash] wait ...` line in CI
///
/// Every `start` should be closed by one of the `stop*` methods or `clear`.
/// A spinner dropped while running leaves the terminal line behind.
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {:<4} {}", style(TAG).dim(), style("wait").dim(), message);
        }
    }

    /// Finish with the result, e.g. "Cached dev build available"
    pub fn stop(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {:<4} {}", style(TAG).dim(), style("done").green(), message),
        }
    }

    /// Finish without a usable cache (miss, stale lineage)
    pub fn stop_warn(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(style(message).yellow()),
            None => println!("{} {:<4} {}", style(TAG).dim(), style("warn").yellow(), message),
        }
    }

    /// Finish a step that failed; the error itself is printed by `main`
    pub fn stop_error(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {:<4} {}", style(TAG).dim(), style("fail").red(), message),
        }
    }

    /// Drop the spinner line when the caller reports the result itself
    pub fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.clear();
        }
    }
}
