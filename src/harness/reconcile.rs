//! Outcome reconciliation
//!
//! Legacy fixtures have no ground truth, so they pass on a clean result or a
//! page that never offers validation. Labeled fixtures encode an exact
//! contract in their folder name and get no such leniency.

use serde::Serialize;
use std::fmt;

use super::fixtures::{LabeledCase, LegacyCase};
use super::planner::PlannedCase;
use crate::gateway::Outcome;

/// Fixture suites the driver can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    Legacy,
    Labeled,
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suite::Legacy => write!(f, "legacy"),
            Suite::Labeled => write!(f, "labeled"),
        }
    }
}

/// The case a verdict is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseRef {
    Legacy(LegacyCase),
    Labeled(LabeledCase),
    /// Synthetic case standing in for a suite without fixtures
    NoFixtures { suite: Suite },
}

impl CaseRef {
    pub fn suite(&self) -> Suite {
        match self {
            CaseRef::Legacy(_) => Suite::Legacy,
            CaseRef::Labeled(_) => Suite::Labeled,
            CaseRef::NoFixtures { suite } => *suite,
        }
    }

    /// Folder the case is reported under, for labeled cases
    pub fn group(&self) -> Option<&str> {
        match self {
            CaseRef::Labeled(case) => Some(case.group()),
            _ => None,
        }
    }

    /// Human-readable title
    pub fn title(&self) -> String {
        match self {
            CaseRef::Legacy(case) => format!("Validates file: {}", case.path),
            CaseRef::Labeled(case) => format!(
                "Validates file: {} (expected errors: {})",
                case.path(),
                case.expected()
            ),
            CaseRef::NoFixtures { suite } => format!("No {} fixtures found", suite),
        }
    }
}

impl From<PlannedCase<'_>> for CaseRef {
    fn from(case: PlannedCase<'_>) -> Self {
        match case {
            PlannedCase::Legacy(c) => CaseRef::Legacy(c.clone()),
            PlannedCase::Labeled(c) => CaseRef::Labeled(c.clone()),
        }
    }
}

/// Final, immutable result for one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub case: CaseRef,
    pub observed: Option<Outcome>,
    pub passed: bool,
    pub message: String,
}

/// Reconciliation switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Fail legacy fixtures whose page never offered validation
    pub strict_legacy: bool,
}

/// Compare an observed outcome with a case's expectation
pub fn reconcile(case: PlannedCase<'_>, outcome: Outcome, options: &ReconcileOptions) -> Verdict {
    let (passed, message) = match case {
        PlannedCase::Legacy(legacy) => judge_legacy(legacy, &outcome, options),
        PlannedCase::Labeled(labeled) => judge_labeled(labeled, &outcome),
    };

    Verdict {
        case: case.into(),
        observed: Some(outcome),
        passed,
        message,
    }
}

/// Failing verdict for a suite that has nothing to run
pub fn no_fixtures(suite: Suite, location: &str) -> Verdict {
    Verdict {
        case: CaseRef::NoFixtures { suite },
        observed: None,
        passed: false,
        message: format!(
            "no fixtures found in {}: expected at least one XML file",
            location
        ),
    }
}

fn judge_legacy(case: &LegacyCase, outcome: &Outcome, options: &ReconcileOptions) -> (bool, String) {
    match outcome {
        Outcome::Valid => (true, format!("{}: document is valid", case.path)),
        Outcome::AffordanceAbsent if !options.strict_legacy => (
            true,
            format!(
                "{}: validation affordance absent; tolerated for legacy fixtures",
                case.path
            ),
        ),
        Outcome::Invalid { count } => (
            false,
            format!("{}: expected a valid document, observed {} errors", case.path, count),
        ),
        other => (false, format!("{}: {}", case.path, other)),
    }
}

fn judge_labeled(case: &LabeledCase, outcome: &Outcome) -> (bool, String) {
    let path = case.path();
    let expected = case.expected().get();

    if expected == 0 {
        return match outcome {
            Outcome::Valid => (true, format!("{}: document is valid", path)),
            Outcome::Invalid { count } => (
                false,
                format!("{}: expected 0 errors, observed {}", path, count),
            ),
            other => (false, format!("{}: expected 0 errors, {}", path, other)),
        };
    }

    match outcome {
        Outcome::Invalid { count } if *count == expected => (
            true,
            format!("{}: expected {} errors, observed {}", path, expected, count),
        ),
        Outcome::Invalid { count } => (
            false,
            format!("{}: expected {} errors, observed {}", path, expected, count),
        ),
        Outcome::Valid => (
            false,
            format!(
                "{}: expected {} errors, document reported valid",
                path, expected
            ),
        ),
        other => (
            false,
            format!("{}: expected {} errors, {}", path, expected, other),
        ),
    }
}
