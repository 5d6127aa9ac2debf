//! Terminal and JSON output for runs and plans

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::common::Result;
use crate::harness::{CaseRef, FixturePath, Locators, Plan, RunReport, Suite, Verdict};

/// Progress bar ticking once per verdict; hidden for JSON output
pub fn progress(total: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template("  [{bar:40.cyan/blue}] {pos}/{len} cases ({elapsed})") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

pub fn print_report(report: &RunReport, legacy_dir: &str) {
    let mut current: Option<(Suite, Option<&str>)> = None;

    for verdict in &report.verdicts {
        let heading = (verdict.case.suite(), verdict.case.group());
        if current != Some(heading) {
            print_heading(heading.0, heading.1, legacy_dir);
            current = Some(heading);
        }
        print_verdict(verdict);
    }

    let passed = report.passed();
    let failed = report.failed();
    println!();
    if failed == 0 {
        println!(
            "{} {}",
            "✓".green().bold(),
            format!("{} passed", passed).green().bold()
        );
    } else {
        println!(
            "{} {}, {}",
            "✗".red().bold(),
            format!("{} failed", failed).red().bold(),
            format!("{} passed", passed).green()
        );
    }
}

fn print_heading(suite: Suite, group: Option<&str>, legacy_dir: &str) {
    match (suite, group) {
        (Suite::Legacy, _) => println!(
            "\n{} {}",
            "Legacy fixtures:".blue().bold(),
            legacy_dir.white().bold()
        ),
        (Suite::Labeled, Some(group)) => {
            println!("\n{} {}", "Folder:".blue().bold(), group.white().bold())
        }
        (Suite::Labeled, None) => println!("\n{}", "Error-count folders".blue().bold()),
    }
}

fn print_verdict(verdict: &Verdict) {
    if verdict.passed {
        println!("  {} {}", "✓".green(), verdict.case.title());
    } else {
        println!("  {} {}", "✗".red(), verdict.case.title());
        println!("      {}", verdict.message.dimmed());
    }
}

pub fn print_report_json(report: &RunReport) -> Result<()> {
    #[derive(Serialize)]
    struct Output<'a> {
        passed: usize,
        failed: usize,
        verdicts: &'a [Verdict],
    }

    let output = Output {
        passed: report.passed(),
        failed: report.failed(),
        verdicts: &report.verdicts,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One row of `list` output
#[derive(Serialize)]
struct ListedCase<'a> {
    suite: Suite,
    group: Option<&'a str>,
    path: &'a FixturePath,
    expected_errors: Option<u32>,
    session: String,
}

fn listed_cases<'a>(plan: &'a Plan, locators: &Locators) -> Vec<ListedCase<'a>> {
    let legacy = plan.legacy.iter().map(|case| ListedCase {
        suite: Suite::Legacy,
        group: None,
        path: &case.path,
        expected_errors: None,
        session: locators.session(&case.path),
    });
    let labeled = plan.groups.iter().flat_map(|group| {
        group.cases.iter().map(|case| ListedCase {
            suite: Suite::Labeled,
            group: Some(case.group()),
            path: case.path(),
            expected_errors: Some(case.expected().get()),
            session: locators.session(case.path()),
        })
    });
    legacy.chain(labeled).collect()
}

pub fn print_plan(plan: &Plan, locators: &Locators, legacy_dir: &str) {
    print_heading(Suite::Legacy, None, legacy_dir);
    if plan.legacy.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for case in &plan.legacy {
        println!("  {}", CaseRef::Legacy(case.clone()).title());
        println!("      {}", locators.session(&case.path).dimmed());
    }

    if plan.groups.is_empty() {
        print_heading(Suite::Labeled, None, legacy_dir);
        println!("  {}", "(none)".dimmed());
    }
    for group in &plan.groups {
        print_heading(Suite::Labeled, Some(&group.name), legacy_dir);
        for case in &group.cases {
            println!("  {}", CaseRef::Labeled(case.clone()).title());
            println!("      {}", locators.session(case.path()).dimmed());
        }
    }

    println!(
        "\n{} legacy, {} labeled in {} folders",
        plan.legacy.len(),
        plan.labeled_len(),
        plan.groups.len()
    );
}

pub fn print_plan_json(plan: &Plan, locators: &Locators) -> Result<()> {
    let cases = listed_cases(plan, locators);
    println!("{}", serde_json::to_string_pretty(&cases)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{plan, ExpectedErrorCount, LabeledCase, LegacyCase, Manifest};

    #[test]
    fn test_listed_cases_follow_plan_order() {
        let manifest = Manifest {
            legacy: vec![LegacyCase {
                path: FixturePath::parse("XML_files/d.xml"),
            }],
            labeled: vec![LabeledCase::new("2 errors", "a.xml", ExpectedErrorCount(2))],
        };
        let plan = plan(&manifest);
        let locators = Locators::new("http://127.0.0.1:8080/", "https://editor.test/").unwrap();

        let rows = listed_cases(&plan, &locators);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].expected_errors, None);
        assert_eq!(rows[1].group, Some("2 errors"));
        assert_eq!(rows[1].expected_errors, Some(2));
        assert!(rows[1].session.starts_with("https://editor.test/?url="));
    }
}
