//! Case planning
//!
//! Turns a [`Manifest`] into the ordered set of cases the driver executes,
//! with labeled cases grouped by their folder for reporting.

use serde::Serialize;

use super::fixtures::{LabeledCase, LegacyCase, Manifest};

/// Labeled cases that share a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub cases: Vec<LabeledCase>,
}

/// One executable test case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedCase<'a> {
    Legacy(&'a LegacyCase),
    Labeled(&'a LabeledCase),
}

/// Planned cases, legacy first, then labeled groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub legacy: Vec<LegacyCase>,
    pub groups: Vec<Group>,
}

impl Plan {
    /// Number of labeled cases across all groups
    pub fn labeled_len(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.legacy.len() + self.labeled_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate cases in execution order: legacy, then group by group
    pub fn cases(&self) -> impl Iterator<Item = PlannedCase<'_>> {
        self.legacy.iter().map(PlannedCase::Legacy).chain(
            self.groups
                .iter()
                .flat_map(|g| g.cases.iter().map(PlannedCase::Labeled)),
        )
    }
}

/// Group labeled cases by folder
///
/// Groups appear in the order their first case appears in the manifest and
/// each group keeps manifest order.
pub fn plan(manifest: &Manifest) -> Plan {
    let mut groups: Vec<Group> = Vec::new();

    for case in &manifest.labeled {
        match groups.iter_mut().find(|g| g.name == case.group()) {
            Some(group) => group.cases.push(case.clone()),
            None => groups.push(Group {
                name: case.group().to_string(),
                cases: vec![case.clone()],
            }),
        }
    }

    Plan {
        legacy: manifest.legacy.clone(),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::fixtures::{ExpectedErrorCount, FixturePath};

    fn labeled(group: &str, file: &str, n: u32) -> LabeledCase {
        LabeledCase::new(group, file, ExpectedErrorCount(n))
    }

    #[test]
    fn test_grouping_is_stable() {
        let manifest = Manifest {
            legacy: vec![LegacyCase {
                path: FixturePath::parse("XML_files/d.xml"),
            }],
            labeled: vec![
                labeled("2 errors", "z.xml", 2),
                labeled("0 errors", "c.xml", 0),
                labeled("2 errors", "a.xml", 2),
            ],
        };

        let plan = plan(&manifest);

        let names: Vec<_> = plan.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["2 errors", "0 errors"]);
        let files: Vec<_> = plan.groups[0]
            .cases
            .iter()
            .map(|c| c.path().file_name())
            .collect();
        assert_eq!(files, ["z.xml", "a.xml"]);
        assert_eq!(plan.labeled_len(), 3);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn test_cases_iterate_legacy_first() {
        let manifest = Manifest {
            legacy: vec![LegacyCase {
                path: FixturePath::parse("XML_files/d.xml"),
            }],
            labeled: vec![labeled("1 error", "a.xml", 1), labeled("3 errors", "b.xml", 3)],
        };
        let plan = plan(&manifest);

        let order: Vec<_> = plan
            .cases()
            .map(|c| match c {
                PlannedCase::Legacy(l) => l.path.to_string(),
                PlannedCase::Labeled(l) => l.path().to_string(),
            })
            .collect();
        assert_eq!(order, ["XML_files/d.xml", "1 error/a.xml", "3 errors/b.xml"]);
    }

    #[test]
    fn test_empty_manifest_plans_nothing() {
        let plan = plan(&Manifest::default());
        assert!(plan.is_empty());
        assert!(plan.groups.is_empty());
    }
}
