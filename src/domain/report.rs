//! Violation reporting
//!
//! Sorts violations into the three buckets a caller presents differently and
//! answers whether an edit may go ahead. Authorization is not decided here:
//! `can_force` is whatever the caller's policy says.

use serde::Serialize;

use super::resolver::FixProposal;
use super::violation::{Violation, ViolationKind};

/// Violations partitioned for presentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViolationReport {
    /// Project-boundary problems
    pub date_validation: Vec<Violation>,
    /// Dependency violations that block unless forced
    pub mandatory: Vec<Violation>,
    /// Advisory dependency violations
    pub optional: Vec<Violation>,
    /// Caller policy: may mandatory violations be overridden
    pub can_force: bool,
}

/// What the caller may offer the user for a blocked edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_fix: Option<FixProposal>,
    pub manual_edit: bool,
    pub force: bool,
}

impl ViolationReport {
    /// Partitions `violations`; every one lands in exactly one bucket
    pub fn new(violations: impl IntoIterator<Item = Violation>, can_force: bool) -> Self {
        let mut report = Self {
            can_force,
            ..Self::default()
        };

        for violation in violations {
            match violation.kind {
                ViolationKind::DateValidation => report.date_validation.push(violation),
                ViolationKind::Dependency if violation.is_mandatory() => {
                    report.mandatory.push(violation)
                }
                ViolationKind::Dependency => report.optional.push(violation),
            }
        }

        report
    }

    pub fn len(&self) -> usize {
        self.date_validation.len() + self.mandatory.len() + self.optional.len()
    }

    /// Returns true when there is nothing to report at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the edit must not go ahead as is
    pub fn is_blocked(&self) -> bool {
        !self.date_validation.is_empty() || !self.mandatory.is_empty()
    }

    /// Returns true if the edit may go ahead, `force` included
    ///
    /// Forcing only bypasses mandatory dependency violations; dates outside
    /// the project range always have to be corrected.
    pub fn can_proceed(&self, force: bool) -> bool {
        if !self.date_validation.is_empty() {
            return false;
        }
        self.mandatory.is_empty() || (force && self.can_force)
    }

    /// Iterates over every violation, blocking ones first
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.date_validation
            .iter()
            .chain(self.mandatory.iter())
            .chain(self.optional.iter())
    }

    /// Offers auto-fix, manual edit and force as applicable
    pub fn options(&self, auto_fix: Option<FixProposal>) -> ResolutionOptions {
        let blocked = self.is_blocked();
        ResolutionOptions {
            auto_fix: if blocked { auto_fix } else { None },
            manual_edit: blocked,
            force: self.can_force && !self.mandatory.is_empty() && self.date_validation.is_empty(),
        }
    }
}
