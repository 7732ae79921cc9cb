//! Terminal progress helpers.
//!
//! Interactive runs get a spinner while collection is in flight; non-TTY
//! runs (cron, CI) get nothing on stderr and machine-readable records on
//! stdout instead. Progress always goes to stderr so stdout stays clean
//! for scripting.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Whether stdout is a terminal (drives human vs machine output).
pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal()
}

/// A stderr spinner for long-running work, or a hidden bar when stderr is
/// not a terminal.
pub fn progress_spinner(message: &str) -> ProgressBar {
    let spinner = if std::io::stderr().is_terminal() {
        ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr())
    } else {
        ProgressBar::hidden()
    };
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
