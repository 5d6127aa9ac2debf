//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::harness::SuiteSelection;

#[derive(Subcommand)]
pub enum Commands {
    /// Validate every fixture against the editor
    Run(RunArgs),

    /// Show the cases discovered in the fixture store
    List {
        #[command(flatten)]
        store: StoreArgs,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    InitConfig,
}

/// Where the fixtures live and how they are served
#[derive(Args, Default)]
pub struct StoreArgs {
    /// Configuration file (default: platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fixture store root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Name of the legacy fixture folder
    #[arg(long)]
    pub legacy_dir: Option<String>,

    /// Base URL the fixture store is served under
    #[arg(long)]
    pub base_url: Option<String>,

    /// Editor entry point URL
    #[arg(long)]
    pub editor_url: Option<String>,
}

#[derive(Args, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver: Option<String>,

    /// Use scripted outcomes from a YAML file instead of a browser
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Which fixture suites to run
    #[arg(long, value_enum, default_value_t = SuiteArg::All)]
    pub suite: SuiteArg,

    /// Number of cases validated concurrently
    #[arg(long, short)]
    pub jobs: Option<usize>,

    /// Fail legacy fixtures whose page offers no validation button
    #[arg(long)]
    pub strict_legacy: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuiteArg {
    #[default]
    All,
    Legacy,
    Labeled,
}

impl From<SuiteArg> for SuiteSelection {
    fn from(arg: SuiteArg) -> Self {
        match arg {
            SuiteArg::All => SuiteSelection::All,
            SuiteArg::Legacy => SuiteSelection::Legacy,
            SuiteArg::Labeled => SuiteSelection::Labeled,
        }
    }
}
