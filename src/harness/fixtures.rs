//! Fixture store indexing
//!
//! A fixture store is a directory with one legacy subfolder of flat `.xml`
//! files and any number of sibling folders named `<n> error` / `<n> errors`.
//! The folder name is the expectation: every `.xml` file inside it must make
//! the editor report exactly `n` validation errors.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// Forward-slash path of a fixture, relative to the store root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FixturePath(String);

impl FixturePath {
    /// Build a path from a folder name and a file name
    ///
    /// Both are single directory entries, taken verbatim; a `\` inside a
    /// Unix file name is part of the name, not a separator.
    pub fn join(dir: &str, file: &str) -> Self {
        Self(format!("{}/{}", dir, file))
    }

    /// Normalize a relative path string, accepting either separator
    pub fn parse(raw: &str) -> Self {
        let normalized = raw
            .replace('\\', "/")
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Segment before the first separator
    pub fn first_segment(&self) -> &str {
        self.0.split('/').next().unwrap_or("")
    }

    /// Last segment (the file name)
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }
}

impl fmt::Display for FixturePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of validation errors a labeled fixture must produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ExpectedErrorCount(pub u32);

impl ExpectedErrorCount {
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ExpectedErrorCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse an expectation folder name: `^(\d+)\s*errors?$`, case-insensitive
///
/// Returns `None` for anything else, including counts that overflow `u32`.
pub fn parse_label(name: &str) -> Option<ExpectedErrorCount> {
    let digits_end = name
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(name.len());
    if digits_end == 0 {
        return None;
    }

    let (digits, rest) = name.split_at(digits_end);
    let word = rest.trim_start();
    if !word.eq_ignore_ascii_case("error") && !word.eq_ignore_ascii_case("errors") {
        return None;
    }

    digits.parse::<u32>().ok().map(ExpectedErrorCount)
}

/// A fixture without a stated expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyCase {
    pub path: FixturePath,
}

/// A fixture whose folder name states how many errors it must produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledCase {
    path: FixturePath,
    expected: ExpectedErrorCount,
    group: String,
}

impl LabeledCase {
    /// The group is the folder name, so it is always the first path segment
    pub fn new(group: &str, file_name: &str, expected: ExpectedErrorCount) -> Self {
        Self {
            path: FixturePath::join(group, file_name),
            expected,
            group: group.to_string(),
        }
    }

    pub fn path(&self) -> &FixturePath {
        &self.path
    }

    pub fn expected(&self) -> ExpectedErrorCount {
        self.expected
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

/// Everything discovered in one scan of the fixture store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub legacy: Vec<LegacyCase>,
    pub labeled: Vec<LabeledCase>,
}

/// Location and layout of a fixture store
#[derive(Debug, Clone)]
pub struct FixtureStore {
    pub root: PathBuf,
    pub legacy_dir: String,
}

impl FixtureStore {
    pub fn new(root: impl Into<PathBuf>, legacy_dir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            legacy_dir: legacy_dir.into(),
        }
    }

    /// Scan the store and build its manifest
    ///
    /// Directories and files are visited in lexical order, so an unchanged
    /// store always yields the same manifest.
    pub fn index(&self) -> Result<Manifest> {
        let legacy = self.index_legacy()?;

        let mut labeled = Vec::new();
        for dir_name in list_dir(&self.root, EntryKind::Dir)? {
            if dir_name == self.legacy_dir {
                continue;
            }
            let Some(expected) = parse_label(&dir_name) else {
                tracing::debug!(dir = %dir_name, "Skipping folder without an error-count label");
                continue;
            };

            let dir = self.root.join(&dir_name);
            for file in list_dir(&dir, EntryKind::File)? {
                if is_xml(&file) {
                    labeled.push(LabeledCase::new(&dir_name, &file, expected));
                }
            }
        }

        tracing::info!(
            root = %self.root.display(),
            legacy = legacy.len(),
            labeled = labeled.len(),
            "Indexed fixture store"
        );

        Ok(Manifest { legacy, labeled })
    }

    fn index_legacy(&self) -> Result<Vec<LegacyCase>> {
        let dir = self.root.join(&self.legacy_dir);
        if !dir.is_dir() {
            // The root itself must still be readable
            fs::read_dir(&self.root).map_err(|e| Error::indexing(&self.root, e))?;
            tracing::warn!(dir = %dir.display(), "Legacy fixture folder not found");
            return Ok(Vec::new());
        }

        Ok(list_dir(&dir, EntryKind::File)?
            .into_iter()
            .filter(|name| is_xml(name))
            .map(|name| LegacyCase {
                path: FixturePath::join(&self.legacy_dir, &name),
            })
            .collect())
    }
}

/// Convenience wrapper for [`FixtureStore::index`]
pub fn index(root: &Path, legacy_dir: &str) -> Result<Manifest> {
    FixtureStore::new(root, legacy_dir).index()
}

fn is_xml(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".xml")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
}

/// Sorted UTF-8 names of the directory's entries of one kind
fn list_dir(dir: &Path, kind: EntryKind) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::indexing(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::indexing(dir, e))?;
        let path = entry.path();
        let matches = match kind {
            EntryKind::Dir => path.is_dir(),
            EntryKind::File => path.is_file(),
        };
        if !matches {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => {
                tracing::warn!(name = ?name, dir = %dir.display(), "Skipping non UTF-8 entry");
            }
        }
    }

    names.sort();
    Ok(names)
}
