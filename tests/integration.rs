//! End-to-end tests for the harness
//!
//! These tests build fixture stores in temporary directories and run them
//! through the scripted gateway, both via the library and via the compiled
//! `xml-harness` binary.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;
use xml_harness::gateway::ScriptedGateway;
use xml_harness::harness::{plan, Driver, DriverOptions, FixtureStore, Locators, RunReport};
use xml_harness::{Error, Outcome};

/// Test context with a fixture store and scratch files
struct TestContext {
    /// Temporary directory; removed on drop
    dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    /// Create an XML fixture at a store-relative path
    fn fixture(&self, rel: &str) -> &Self {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create fixture dir");
        fs::write(&path, "<?xml version=\"1.0\"?><dmodule/>").expect("Failed to write fixture");
        self
    }

    fn empty_store(&self) -> &Self {
        fs::create_dir_all(self.root()).expect("Failed to create store");
        self
    }

    /// Write a scratch file next to the store
    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    async fn run(&self, gateway: &ScriptedGateway) -> RunReport {
        let manifest = FixtureStore::new(self.root(), "XML_files")
            .index()
            .expect("Indexing failed");
        let locators = Locators::new("http://127.0.0.1:8080/", "https://editor.test/").unwrap();
        let driver = Driver::new(gateway, locators, DriverOptions::default());
        driver.run(&plan(&manifest), |_| {}).await
    }

    /// Run the binary with an isolated configuration file
    fn cli(&self, args: &[&str]) -> Output {
        let config = self.write(
            "config.toml",
            &format!(
                "[store]\nroot = {:?}\n\n[server]\nstatic_base = \"http://127.0.0.1:8080/\"\n",
                self.root().display().to_string()
            ),
        );
        Command::new(env!("CARGO_BIN_EXE_xml-harness"))
            .args(args)
            .arg("--config")
            .arg(&config)
            .env("RUST_LOG", "warn")
            .output()
            .expect("Failed to run xml-harness")
    }
}

fn verdict_for<'a>(report: &'a RunReport, path: &str) -> &'a xml_harness::Verdict {
    report
        .verdicts
        .iter()
        .find(|v| v.case.title().contains(path))
        .unwrap_or_else(|| panic!("no verdict for {}", path))
}

#[tokio::test]
async fn test_scenario_a_matching_error_count_passes() {
    let ctx = TestContext::new();
    ctx.fixture("2 errors/a.xml").fixture("XML_files/d.xml");
    let gateway = ScriptedGateway::new(Outcome::Valid).with("2 errors/a.xml", Outcome::Invalid { count: 2 });

    let report = ctx.run(&gateway).await;

    assert!(verdict_for(&report, "2 errors/a.xml").passed);
    assert!(report.success());
}

#[tokio::test]
async fn test_scenario_b_mismatched_error_count_fails() {
    let ctx = TestContext::new();
    ctx.fixture("2 errors/b.xml").fixture("XML_files/d.xml");
    let gateway = ScriptedGateway::new(Outcome::Valid).with("2 errors/b.xml", Outcome::Invalid { count: 3 });

    let report = ctx.run(&gateway).await;

    let verdict = verdict_for(&report, "2 errors/b.xml");
    assert!(!verdict.passed);
    assert!(verdict.message.contains("expected 2"));
    assert!(verdict.message.contains("observed 3"));
    assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn test_scenario_c_zero_errors_needs_valid_indicator() {
    let ctx = TestContext::new();
    ctx.fixture("0 errors/c.xml").fixture("XML_files/d.xml");

    let valid = ScriptedGateway::new(Outcome::Valid);
    assert!(verdict_for(&ctx.run(&valid).await, "0 errors/c.xml").passed);

    let absent = ScriptedGateway::new(Outcome::Valid).with("0 errors/c.xml", Outcome::AffordanceAbsent);
    assert!(!verdict_for(&ctx.run(&absent).await, "0 errors/c.xml").passed);
}

#[tokio::test]
async fn test_scenario_d_legacy_tolerates_absent_affordance() {
    let ctx = TestContext::new();
    ctx.fixture("XML_files/d.xml").fixture("1 error/e.xml");
    let gateway = ScriptedGateway::new(Outcome::Invalid { count: 1 })
        .with("XML_files/d.xml", Outcome::AffordanceAbsent);

    let report = ctx.run(&gateway).await;

    assert!(verdict_for(&report, "XML_files/d.xml").passed);
    assert!(report.success());
}

#[tokio::test]
async fn test_empty_store_fails_visibly() {
    let ctx = TestContext::new();
    ctx.empty_store();

    let report = ctx.run(&ScriptedGateway::new(Outcome::Valid)).await;

    assert!(!report.verdicts.is_empty());
    assert!(!report.success());
    assert!(report.verdicts.iter().all(|v| v.message.contains("no fixtures found")));
}

#[tokio::test]
async fn test_one_bad_fixture_does_not_stop_the_others() {
    let ctx = TestContext::new();
    ctx.fixture("XML_files/d.xml")
        .fixture("3 errors/a.xml")
        .fixture("3 errors/b.xml")
        .fixture("3 errors/c.xml");
    let gateway = ScriptedGateway::new(Outcome::Invalid { count: 3 }).with(
        "3 errors/b.xml",
        Outcome::MalformedOutcome {
            detail: "badge text \"?\"".to_string(),
        },
    );
    let gateway = gateway.with("XML_files/d.xml", Outcome::Valid);

    let report = ctx.run(&gateway).await;

    assert_eq!(report.verdicts.len(), 4);
    assert_eq!(report.failed(), 1);
    assert!(!verdict_for(&report, "3 errors/b.xml").passed);
    assert_eq!(gateway.requests().len(), 4);
}

#[test]
fn test_unreadable_store_is_fatal() {
    let ctx = TestContext::new();
    let err = FixtureStore::new(ctx.root(), "XML_files").index().unwrap_err();
    assert!(matches!(err, Error::Indexing { .. }));
}

#[tokio::test]
async fn test_sessions_point_the_editor_at_served_fixtures() {
    let ctx = TestContext::new();
    ctx.fixture("2 errors/a.xml");
    let gateway = ScriptedGateway::new(Outcome::Invalid { count: 2 });

    ctx.run(&gateway).await;

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    let session = reqwest::Url::parse(&requests[0].session).unwrap();
    let url = session
        .query_pairs()
        .find(|(k, _)| k == "url")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(url, "http://127.0.0.1:8080/2%20errors/a.xml");
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn script(ctx: &TestContext, body: &str) -> String {
    ctx.write("outcomes.yaml", body).display().to_string()
}

#[test]
fn test_cli_run_passes_with_matching_script() {
    let ctx = TestContext::new();
    ctx.fixture("XML_files/d.xml").fixture("2 errors/a.xml");
    let script = script(
        &ctx,
        "default: { kind: valid }\ndocuments:\n  \"2 errors/a.xml\": { kind: invalid, count: 2 }\n",
    );

    let output = ctx.cli(&["run", "--script", &script, "--json"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["passed"], 2);
    assert_eq!(json["failed"], 0);
}

#[test]
fn test_cli_run_exits_non_zero_on_mismatch() {
    let ctx = TestContext::new();
    ctx.fixture("XML_files/d.xml").fixture("2 errors/b.xml");
    let script = script(
        &ctx,
        "default: { kind: valid }\ndocuments:\n  \"2 errors/b.xml\": { kind: invalid, count: 3 }\n",
    );

    let output = ctx.cli(&["run", "--script", &script, "--json"]);

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["failed"], 1);
    let failed: Vec<&Value> = json["verdicts"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|v| v["passed"] == false)
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0]["message"].as_str().unwrap().contains("expected 2"));
}

#[test]
fn test_cli_run_fails_on_missing_store() {
    let ctx = TestContext::new();
    let script = script(&ctx, "default: { kind: valid }\n");

    let output = ctx.cli(&["run", "--script", &script]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Cannot read fixture store"));
}

#[test]
fn test_cli_list_shows_expectations() {
    let ctx = TestContext::new();
    ctx.fixture("XML_files/d.xml")
        .fixture("5 Errors/x.xml")
        .fixture("notes/readme.xml");

    let output = ctx.cli(&["list", "--json"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["suite"], "legacy");
    assert_eq!(rows[1]["group"], "5 Errors");
    assert_eq!(rows[1]["expected_errors"], 5);
}
