//! Cache step reporting
//!
//! Interactive terminals get cliclack log lines. Everywhere else each line
//! carries a `[buildstash]` tag and a status word so CI logs can be grepped
//! for cache hits and uploads.

use super::context::UiContext;
use console::style;
use std::time::Duration;

pub(super) const TAG: &str = "[buildstash]";

/// Status word printed in plain mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Done,
    Note,
    Warn,
}

impl Status {
    fn word(self) -> console::StyledObject<&'static str> {
        match self {
            Self::Done => style("done").green(),
            Self::Note => style("note").cyan(),
            Self::Warn => style("warn").yellow(),
        }
    }
}

fn plain_line(status: Status, message: &str) {
    println!("{} {:<4} {}", style(TAG).dim(), status.word(), message);
}

/// Banner for a command, e.g. `buildstash run (dev)`
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{} {}", style(TAG).dim(), style(title).bold());
    }
}

pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        plain_line(Status::Done, message);
    }
}

/// Heading for a group of lines, such as a status group in `changes`
pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!("{}", style(title).bold());
    }
}

/// A finished step: compiled, restored, uploaded. `detail` names what it
/// acted on (an artifact name, a remote path).
pub fn done(ctx: &UiContext, message: &str, detail: Option<&str>) {
    let line = match detail {
        Some(detail) if ctx.use_fancy_output() => format!("{} ({})", message, style(detail).dim()),
        Some(detail) => format!("{} ({})", message, detail),
        None => message.to_string(),
    };
    if ctx.use_fancy_output() {
        cliclack::log::success(line).ok();
    } else {
        plain_line(Status::Done, &line);
    }
}

/// Something the cache could not do, with the command that fixes it
pub fn warn_with_fix(ctx: &UiContext, message: &str, fix: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(format!("{}\n{}", message, style(fix).dim())).ok();
    } else {
        plain_line(Status::Warn, &format!("{} (try: {})", message, fix));
    }
}

pub fn note(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(message).ok();
    } else {
        plain_line(Status::Note, message);
    }
}

/// Dimmed follow-up to the previous line
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("{}      {}", style(TAG).dim(), style(message).dim());
    }
}

/// One fact about an artifact (commit, size, digest)
pub fn field(ctx: &UiContext, name: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(name).dim(), value);
    } else {
        println!("{}      {}: {}", style(TAG).dim(), name, value);
    }
}

/// Elapsed time of one phase (resolve, download, unpack)
pub fn timing(ctx: &UiContext, phase: &str, elapsed: Duration) {
    field(ctx, phase, &format_elapsed(elapsed));
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}
