//! CLI command handling
//!
//! Resolves configuration, builds the pipeline and formats output.

mod report;

use std::path::Path;

use crate::commands::{Commands, RunArgs, StoreArgs};
use crate::common::config::Config;
use crate::common::paths;
use crate::common::{Error, Result};
use crate::gateway::{ScriptedGateway, ValidatorGateway, WebDriverGateway};
use crate::harness::{plan, Driver, DriverOptions, FixtureStore, Locators, ReconcileOptions};

/// Dispatch a CLI command
///
/// Returns whether the command succeeded; for `run` that means every
/// verdict passed.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run(args) => run(args).await,

        Commands::List { store, json } => {
            let config = resolve_config(&store)?;
            let fixture_store = FixtureStore::new(&config.store.root, &config.store.legacy_dir);
            let plan = plan(&fixture_store.index()?);
            let locators = Locators::new(&config.server.static_base, &config.editor.entry_point)?;

            if json {
                report::print_plan_json(&plan, &locators)?;
            } else {
                report::print_plan(&plan, &locators, &config.store.legacy_dir);
            }
            Ok(true)
        }

        Commands::InitConfig => {
            let dir = paths::ensure_config_dir()?
                .ok_or_else(|| Error::Config("No configuration directory on this platform".to_string()))?;
            let path = dir.join("config.toml");
            if path.exists() {
                return Err(Error::Config(format!(
                    "'{}' already exists; edit it or remove it first",
                    path.display()
                )));
            }
            std::fs::write(&path, Config::default().to_toml()?)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(true)
        }
    }
}

async fn run(args: RunArgs) -> Result<bool> {
    let mut config = resolve_config(&args.store)?;
    if let Some(url) = args.webdriver {
        config.webdriver.url = url;
    }
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(Error::Config("--jobs must be at least 1".to_string()));
        }
        config.run.jobs = jobs;
    }
    if args.strict_legacy {
        config.run.strict_legacy = true;
    }

    // Fatal problems surface before any case runs
    let fixture_store = FixtureStore::new(&config.store.root, &config.store.legacy_dir);
    let manifest = fixture_store.index()?;
    let plan = plan(&manifest);
    let locators = Locators::new(&config.server.static_base, &config.editor.entry_point)?;
    let gateway = build_gateway(&config, args.script.as_deref())?;

    tracing::info!(
        cases = plan.len(),
        gateway = gateway.name(),
        jobs = config.run.jobs,
        "Starting run"
    );

    let options = DriverOptions {
        suites: args.suite.into(),
        jobs: config.run.jobs,
        reconcile: ReconcileOptions {
            strict_legacy: config.run.strict_legacy,
        },
        timeouts: config.timeouts.clone(),
        legacy_dir: config.store.legacy_dir.clone(),
    };
    let driver = Driver::new(gateway.as_ref(), locators, options);

    let progress = report::progress(driver.expected_verdicts(&plan) as u64, args.json);
    let report = driver.run(&plan, |_| progress.inc(1)).await;
    progress.finish_and_clear();

    if args.json {
        report::print_report_json(&report)?;
    } else {
        report::print_report(&report, &config.store.legacy_dir);
    }

    Ok(report.success())
}

fn build_gateway(config: &Config, script: Option<&Path>) -> Result<Box<dyn ValidatorGateway>> {
    match script {
        Some(path) => Ok(Box::new(ScriptedGateway::from_file(path)?)),
        None => Ok(Box::new(WebDriverGateway::from_config(config)?)),
    }
}

/// Load the configuration file and apply command-line overrides
fn resolve_config(args: &StoreArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(root) = &args.root {
        config.store.root = root.clone();
    }
    if let Some(legacy_dir) = &args.legacy_dir {
        config.store.legacy_dir = legacy_dir.clone();
    }
    if let Some(base) = &args.base_url {
        config.server.static_base = base.clone();
    }
    if let Some(editor) = &args.editor_url {
        config.editor.entry_point = editor.clone();
    }

    Ok(config)
}
