//! # Storage Layer
//!
//! Persistence layer for depgate with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | `.depgate/tasks.jsonl` |
//! | Dependencies | JSONL (one JSON per line) | `.depgate/edges.jsonl` |
//! | Config | TOML | `.depgate/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`JsonlStore`] uses file locking (`fs2`) for concurrent access
//! - [`Project::lock`] serializes whole load-modify-save cycles
//! - [`Project::read_lock`] keeps readers out of a save in progress
//! - All full rewrites are atomic (temp file + rename)
//!
//! ## Project Structure
//!
//! ```text
//! .depgate/
//! ├── tasks.jsonl           # All tasks
//! ├── edges.jsonl           # All dependency edges
//! ├── config.toml           # Project range, policy, status aliases
//! ├── lock                  # Project lock file
//! └── .gitignore
//! ```

mod jsonl;
mod config;
mod project;

pub use jsonl::{EdgeStore, JsonlStore, Record, StagedWrite, TaskStore};
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, PolicyConfig, ProjectConfig, PROJECT_DIR};
pub use project::{Project, ProjectError, ProjectLock};
