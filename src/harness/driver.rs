//! Harness driver
//!
//! Runs every planned case through a [`ValidatorGateway`] and reconciles the
//! result. Each case yields exactly one verdict, even when the gateway hangs,
//! and a selected suite without fixtures yields a failing verdict instead of
//! nothing.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;

use super::locator::Locators;
use super::planner::{Plan, PlannedCase};
use super::reconcile::{no_fixtures, reconcile, ReconcileOptions, Suite, Verdict};
use crate::common::config::Timeouts;
use crate::gateway::{AbsencePolicy, Adjudication, Outcome, Stage, ValidatorGateway, Waits};

/// Which suites a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuiteSelection {
    #[default]
    All,
    Legacy,
    Labeled,
}

impl SuiteSelection {
    pub fn includes(self, suite: Suite) -> bool {
        match self {
            SuiteSelection::All => true,
            SuiteSelection::Legacy => suite == Suite::Legacy,
            SuiteSelection::Labeled => suite == Suite::Labeled,
        }
    }
}

/// Driver settings
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub suites: SuiteSelection,
    /// Maximum concurrent adjudications
    pub jobs: usize,
    pub reconcile: ReconcileOptions,
    pub timeouts: Timeouts,
    /// Legacy folder name, for "no fixtures" messages
    pub legacy_dir: String,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            suites: SuiteSelection::All,
            jobs: 1,
            reconcile: ReconcileOptions::default(),
            timeouts: Timeouts::default(),
            legacy_dir: "XML_files".to_string(),
        }
    }
}

/// All verdicts of one run, in plan order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub verdicts: Vec<Verdict>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.verdicts.iter().filter(|v| v.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.verdicts.len() - self.passed()
    }

    /// True iff there is no failing verdict
    pub fn success(&self) -> bool {
        self.verdicts.iter().all(|v| v.passed)
    }
}

/// Drives planned cases through a gateway
pub struct Driver<'g> {
    gateway: &'g dyn ValidatorGateway,
    locators: Locators,
    options: DriverOptions,
}

impl<'g> Driver<'g> {
    pub fn new(gateway: &'g dyn ValidatorGateway, locators: Locators, options: DriverOptions) -> Self {
        Self {
            gateway,
            locators,
            options,
        }
    }

    /// Build the gateway request for one case
    pub fn adjudication(&self, case: PlannedCase<'_>) -> Adjudication {
        let t = &self.options.timeouts;
        let (document, policy, affordance_secs) = match case {
            PlannedCase::Legacy(c) => (
                &c.path,
                AbsencePolicy::ProbeValidIndicator,
                t.legacy_affordance_secs,
            ),
            PlannedCase::Labeled(c) if c.expected().is_zero() => (
                c.path(),
                AbsencePolicy::ProbeValidIndicator,
                t.affordance_secs,
            ),
            PlannedCase::Labeled(c) => (c.path(), AbsencePolicy::Strict, t.affordance_secs),
        };

        Adjudication {
            session: self.locators.session(document),
            document: document.clone(),
            policy,
            waits: Waits {
                page_load: t.page_load(),
                affordance: Duration::from_secs(affordance_secs),
                grace: Duration::from_secs(t.valid_grace_secs),
                result: Duration::from_secs(t.result_secs),
            },
        }
    }

    /// Adjudicate and reconcile one case
    pub async fn run_case(&self, case: PlannedCase<'_>) -> Verdict {
        let request = self.adjudication(case);
        let ceiling = request.waits.ceiling();

        tracing::debug!(document = %request.document, gateway = self.gateway.name(), "Validating");
        let outcome = match tokio::time::timeout(ceiling, self.gateway.adjudicate(&request)).await {
            Ok(outcome) => outcome,
            Err(_) => Outcome::Timeout {
                stage: Stage::Session,
                secs: ceiling.as_secs(),
            },
        };
        tracing::debug!(document = %request.document, %outcome, "Observed");

        let verdict = reconcile(case, outcome, &self.options.reconcile);
        if !verdict.passed {
            tracing::warn!(document = %request.document, message = %verdict.message, "Case failed");
        }
        verdict
    }

    /// Number of verdicts [`Driver::run`] will produce for `plan`
    pub fn expected_verdicts(&self, plan: &Plan) -> usize {
        let suites = self.options.suites;
        let mut total = 0;
        if suites.includes(Suite::Legacy) {
            total += plan.legacy.len().max(1);
        }
        if suites.includes(Suite::Labeled) {
            total += plan.labeled_len().max(1);
        }
        total
    }

    /// Run the selected suites of `plan`
    ///
    /// `on_verdict` sees each verdict as soon as it exists, in completion
    /// order; the returned report is in plan order.
    pub async fn run<F>(&self, plan: &Plan, mut on_verdict: F) -> RunReport
    where
        F: FnMut(&Verdict),
    {
        let suites = self.options.suites;
        let mut verdicts = Vec::new();
        let mut labeled_marker = None;

        if suites.includes(Suite::Legacy) && plan.legacy.is_empty() {
            let marker = no_fixtures(
                Suite::Legacy,
                &format!("the '{}' folder", self.options.legacy_dir),
            );
            on_verdict(&marker);
            verdicts.push(marker);
        }
        if suites.includes(Suite::Labeled) && plan.labeled_len() == 0 {
            let marker = no_fixtures(Suite::Labeled, "error-count folders");
            on_verdict(&marker);
            labeled_marker = Some(marker);
        }

        let cases: Vec<PlannedCase<'_>> = plan
            .cases()
            .filter(|case| match case {
                PlannedCase::Legacy(_) => suites.includes(Suite::Legacy),
                PlannedCase::Labeled(_) => suites.includes(Suite::Labeled),
            })
            .collect();

        let mut slots: Vec<Option<Verdict>> = vec![None; cases.len()];
        let mut pending = stream::iter(cases.into_iter().enumerate())
            .map(|(i, case)| async move { (i, self.run_case(case).await) })
            .buffer_unordered(self.options.jobs.max(1));

        while let Some((i, verdict)) = pending.next().await {
            on_verdict(&verdict);
            slots[i] = Some(verdict);
        }

        verdicts.extend(slots.into_iter().flatten());
        // Only set when there are no labeled verdicts, so it lands after the legacy ones
        verdicts.extend(labeled_marker);

        RunReport { verdicts }
    }
}
