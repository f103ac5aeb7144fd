//! Terminal output for cache commands
//!
//! A terminal gets `cliclack` spinners and log lines. CI, pipes and
//! `BUILDSTASH_PLAIN=1` get one `[buildstash] <status> <message>` line per
//! step instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use buildstash::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Searching lineage for a cached build...");
//! spinner.stop("Cached dev build available");
//!
//! ui::field(&ctx, "commit", &descriptor.commit);
//! ui::timing(&ctx, "download", report.download);
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    done, field, intro, note, outro_success, remark, section, timing, warn_with_fix,
};
pub use progress::TaskSpinner;
