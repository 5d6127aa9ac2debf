//! Validator gateways
//!
//! A gateway opens the editor on one document and reports what the editor
//! said about it. The harness only sees the [`ValidatorGateway`] trait; the
//! browser-backed and scripted implementations live in submodules.

mod protocol;
mod scripted;
mod webdriver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::harness::FixturePath;

pub use protocol::{run_protocol, EditorPage, PageError};
pub use scripted::ScriptedGateway;
pub use webdriver::WebDriverGateway;

/// Wait step that expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Loading the editor page
    Open,
    /// Waiting for the validation result after invoking the affordance
    Result,
    /// Outer ceiling around a whole adjudication
    Session,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Open => write!(f, "page load"),
            Stage::Result => write!(f, "validation result"),
            Stage::Session => write!(f, "session"),
        }
    }
}

/// What the validator reported for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The editor showed the "document is valid" indicator
    Valid,
    /// The editor reported `count` errors (always at least one)
    Invalid { count: u32 },
    /// The "run validation" affordance never appeared
    AffordanceAbsent,
    /// A bounded wait expired
    Timeout { stage: Stage, secs: u64 },
    /// The affordance was invoked but its result could not be read
    MalformedOutcome { detail: String },
    /// The gateway could not drive the editor at all
    SessionError { detail: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Valid => write!(f, "valid"),
            Outcome::Invalid { count } => write!(f, "invalid ({} errors)", count),
            Outcome::AffordanceAbsent => write!(f, "validation affordance absent"),
            Outcome::Timeout { stage, secs } => {
                write!(f, "timed out waiting for {} after {}s", stage, secs)
            }
            Outcome::MalformedOutcome { detail } => write!(f, "unreadable result: {}", detail),
            Outcome::SessionError { detail } => write!(f, "session error: {}", detail),
        }
    }
}

/// How to treat a page that never exposes the validation affordance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsencePolicy {
    /// Look for the "document is valid" indicator during the grace period
    ProbeValidIndicator,
    /// Report [`Outcome::AffordanceAbsent`] straight away
    Strict,
}

/// Bounds for each wait step of one adjudication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waits {
    pub page_load: Duration,
    pub affordance: Duration,
    pub grace: Duration,
    pub result: Duration,
}

impl Waits {
    /// Time a gateway may spend on the page before it must give up and close it
    pub fn budget(&self) -> Duration {
        self.page_load + self.affordance + self.grace + self.result + Duration::from_secs(1)
    }

    /// Upper bound for the whole adjudication, with slack for session setup
    /// and teardown
    pub fn ceiling(&self) -> Duration {
        self.budget() + Duration::from_secs(4)
    }
}

/// One request to adjudicate a document
#[derive(Debug, Clone)]
pub struct Adjudication {
    /// Editor URL with the document and doc root embedded
    pub session: String,
    /// The fixture being validated
    pub document: FixturePath,
    pub policy: AbsencePolicy,
    pub waits: Waits,
}

/// Capability to ask the editor about one document
#[async_trait]
pub trait ValidatorGateway: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Adjudicate one document; every failure is expressed as an [`Outcome`]
    async fn adjudicate(&self, request: &Adjudication) -> Outcome;
}
