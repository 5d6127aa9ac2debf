//! Fixture discovery, planning, driving and reconciliation
//!
//! The pipeline is split so that every stage but the driver is pure data:
//! [`FixtureStore::index`] scans the file system, [`plan`] groups what it
//! found, [`Driver`] runs the plan through a gateway and [`reconcile`]
//! turns each observed outcome into a [`Verdict`].

mod driver;
mod fixtures;
mod locator;
mod planner;
mod reconcile;

pub use driver::{Driver, DriverOptions, RunReport, SuiteSelection};
pub use fixtures::{
    index, parse_label, ExpectedErrorCount, FixturePath, FixtureStore, LabeledCase, LegacyCase,
    Manifest,
};
pub use locator::Locators;
pub use planner::{plan, Group, Plan, PlannedCase};
pub use reconcile::{no_fixtures, reconcile, CaseRef, ReconcileOptions, Suite, Verdict};
