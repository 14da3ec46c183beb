//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::{FixProposal, ResolutionOptions, Violation, ViolationReport};
use crate::storage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints a warning (text only, JSON callers read the structured data)
    pub fn warn(&self, message: &str) {
        if self.format == OutputFormat::Text {
            eprintln!("Warning: {}", message);
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                // Callers normally render text themselves; this is a fallback
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Prints a table row (text only, ignored in JSON mode)
    pub fn row(&self, columns: &[&str]) {
        if self.format == OutputFormat::Text {
            println!("{}", columns.join("\t"));
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints one violation with its suggestion underneath
    pub fn violation(&self, violation: &Violation) {
        if self.format != OutputFormat::Text {
            return;
        }
        let tag = match (violation.edge_id.as_ref(), violation.is_mandatory) {
            (None, _) => "project",
            (Some(_), Some(false)) => "optional",
            (Some(_), _) => "mandatory",
        };
        println!("  [{}] {}", tag, violation.message);
        if let Some(suggestion) = &violation.suggestion {
            println!("      -> {}", suggestion);
        }
    }

    /// Prints a report grouped by severity (text only)
    pub fn report(&self, report: &ViolationReport) {
        if self.format != OutputFormat::Text {
            return;
        }
        if report.is_empty() {
            println!("No violations");
            return;
        }
        let groups = [
            ("Outside project range", &report.date_validation),
            ("Mandatory dependencies", &report.mandatory),
            ("Optional dependencies", &report.optional),
        ];
        for (heading, violations) in groups {
            if violations.is_empty() {
                continue;
            }
            println!("{} ({}):", heading, violations.len());
            for violation in violations {
                self.violation(violation);
            }
        }
    }

    /// Prints the choices offered for a blocked edit (text only)
    pub fn options(&self, options: &ResolutionOptions) {
        if self.format != OutputFormat::Text || !options.manual_edit {
            return;
        }
        println!("Options:");
        if let Some(fix) = &options.auto_fix {
            println!("  --auto-fix   move to {} ({:+} days)", fix.to, fix.shift_days());
        }
        println!("  edit         choose other dates");
        if options.force {
            println!("  --force      keep these dates and override");
        }
    }

    /// Prints a list of date changes (text only)
    pub fn proposals(&self, proposals: &[FixProposal]) {
        if self.format != OutputFormat::Text {
            return;
        }
        for fix in proposals {
            println!("  {}: {} -> {} ({:+} days)", fix.task_id, fix.from, fix.to, fix.shift_days());
        }
    }
}
