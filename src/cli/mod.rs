//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init`, `range` |
//! | Task | Tasks, status changes, date edits | `task add`, `task status`, `task dates` |
//! | Dep | Dependency edges | `dep add`, `dep list`, `dep remove` |
//! | Validation | Dry runs and cascades | `check`, `reschedule` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logging on stderr, or set `RUST_LOG`:
//! ```bash
//! depgate --verbose check t-1a2b3c4 2025-01-10 2025-01-14
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod logging;
mod task;
mod dep;
mod check;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::domain::{parse_day, DateRange};

/// Parses a command-line date (YYYY-MM-DD or RFC 3339)
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    parse_day(raw).ok_or_else(|| anyhow!("Invalid date '{}': expected YYYY-MM-DD", raw))
}

/// Parses a start/end pair into a validated range
pub(crate) fn parse_range(start: &str, end: &str) -> Result<DateRange> {
    Ok(DateRange::new(parse_date(start)?, parse_date(end)?)?)
}
