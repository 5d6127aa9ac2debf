//! Scripted gateway
//!
//! Returns predetermined outcomes keyed by fixture path. Used for dry runs
//! of a fixture store (`run --script`) and for testing the harness without
//! a browser.
//!
//! Script files are YAML:
//!
//! ```yaml
//! default:
//!   kind: valid
//! documents:
//!   "2 errors/a.xml": { kind: invalid, count: 2 }
//!   "XML_files/d.xml": { kind: affordance_absent }
//! delays_ms:
//!   "2 errors/a.xml": 500
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::common::{Error, Result};
use crate::harness::FixturePath;

use super::{Adjudication, Outcome, ValidatorGateway};

/// On-disk form of a script
#[derive(Deserialize, Debug)]
struct Script {
    #[serde(default = "default_outcome")]
    default: Outcome,
    #[serde(default)]
    documents: HashMap<String, Outcome>,
    #[serde(default)]
    delays_ms: HashMap<String, u64>,
}

fn default_outcome() -> Outcome {
    Outcome::SessionError {
        detail: "no scripted outcome for this document".to_string(),
    }
}

/// Reject outcomes a validator can never report
fn check_outcome(key: &str, outcome: &Outcome) -> Result<()> {
    if let Outcome::Invalid { count: 0 } = outcome {
        return Err(Error::script(
            Path::new("<inline>"),
            format!("'{}': an invalid outcome needs a count of at least 1", key),
        ));
    }
    Ok(())
}

/// Gateway returning scripted outcomes
pub struct ScriptedGateway {
    default: Outcome,
    outcomes: HashMap<FixturePath, Outcome>,
    delays: HashMap<FixturePath, Duration>,
    seen: Mutex<Vec<Adjudication>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new(default_outcome())
    }
}

impl ScriptedGateway {
    /// Gateway answering `default` for every document
    pub fn new(default: Outcome) -> Self {
        Self {
            default,
            outcomes: HashMap::new(),
            delays: HashMap::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome for one document
    pub fn with(mut self, path: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(FixturePath::parse(path), outcome);
        self
    }

    /// Delay the answer for one document
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(FixturePath::parse(path), delay);
        self
    }

    /// Load a script file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Script { reason, .. } => Error::script(path, reason),
            other => other,
        })
    }

    /// Parse a script from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let script: Script =
            serde_yaml::from_str(content).map_err(|e| Error::script(Path::new("<inline>"), e))?;

        check_outcome("default", &script.default)?;
        let mut gateway = Self::new(script.default);
        for (path, outcome) in script.documents {
            check_outcome(&path, &outcome)?;
            gateway = gateway.with(&path, outcome);
        }
        for (path, ms) in script.delays_ms {
            gateway = gateway.with_delay(&path, Duration::from_millis(ms));
        }
        Ok(gateway)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<Adjudication> {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ValidatorGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn adjudicate(&self, request: &Adjudication) -> Outcome {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        if let Some(delay) = self.delays.get(&request.document) {
            tokio::time::sleep(*delay).await;
        }

        self.outcomes
            .get(&request.document)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
