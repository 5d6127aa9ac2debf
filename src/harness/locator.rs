//! Document and session locators
//!
//! The fixture store is served over HTTP by an external static server; the
//! editor is pointed at a document with `?url=<document>&docRoot=<base>/`.

use reqwest::Url;

use super::fixtures::FixturePath;
use crate::common::{Error, Result};

/// Builds the URLs the editor is opened with
#[derive(Debug, Clone)]
pub struct Locators {
    static_base: Url,
    entry_point: Url,
}

impl Locators {
    pub fn new(static_base: &str, entry_point: &str) -> Result<Self> {
        let mut base = Url::parse(static_base).map_err(|e| Error::invalid_url(static_base, e))?;
        if base.cannot_be_a_base() {
            return Err(Error::invalid_url(static_base, "not a hierarchical URL"));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let entry = Url::parse(entry_point).map_err(|e| Error::invalid_url(entry_point, e))?;

        Ok(Self {
            static_base: base,
            entry_point: entry,
        })
    }

    /// Static base, always ending with `/`; used as the editor's doc root
    pub fn doc_root(&self) -> &str {
        self.static_base.as_str()
    }

    /// `<static-base>/<fixture-path>`, segments percent-encoded
    pub fn document(&self, path: &FixturePath) -> String {
        let mut url = self.static_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.segments());
        }
        url.into()
    }

    /// `<entry-point>?url=<document>&docRoot=<static-base>/`
    pub fn session(&self, path: &FixturePath) -> String {
        let mut url = self.entry_point.clone();
        url.query_pairs_mut()
            .append_pair("url", &self.document(path))
            .append_pair("docRoot", self.doc_root());
        url.into()
    }
}
