//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Fixture store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Static file server that exposes the fixture store
    #[serde(default)]
    pub server: ServerConfig,

    /// Editor under test
    #[serde(default)]
    pub editor: EditorConfig,

    /// WebDriver endpoint used by the browser gateway
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Page selectors for the editor UI
    #[serde(default)]
    pub selectors: Selectors,

    /// Run settings
    #[serde(default)]
    pub run: RunConfig,
}

/// Fixture store settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// Root directory of the fixture store
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Name of the subfolder holding legacy fixtures
    #[serde(default = "default_legacy_dir")]
    pub legacy_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            legacy_dir: default_legacy_dir(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_legacy_dir() -> String {
    "XML_files".to_string()
}

/// Static file server settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Base URL under which the fixture store root is served
    #[serde(default = "default_static_base")]
    pub static_base: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            static_base: default_static_base(),
        }
    }
}

fn default_static_base() -> String {
    "http://127.0.0.1:8080/".to_string()
}

/// Editor settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EditorConfig {
    /// Editor entry point; `url` and `docRoot` are appended as query parameters
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            entry_point: default_entry_point(),
        }
    }
}

fn default_entry_point() -> String {
    "https://editor.mitim-s.com/".to_string()
}

/// WebDriver settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server URL (chromedriver, geckodriver, ...)
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Browser name sent in the session capabilities
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Run the browser headless
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            browser: default_browser(),
            headless: default_headless(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://127.0.0.1:9515".to_string()
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_headless() -> bool {
    true
}

/// Timeout settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Timeouts {
    /// Timeout for loading the editor page
    #[serde(default = "default_page_load")]
    pub page_load_secs: u64,

    /// Wait for the validation affordance on labeled fixtures
    #[serde(default = "default_affordance")]
    pub affordance_secs: u64,

    /// Wait for the validation affordance on legacy fixtures
    #[serde(default = "default_legacy_affordance")]
    pub legacy_affordance_secs: u64,

    /// Grace period for the "document is valid" indicator when the affordance is absent
    #[serde(default = "default_valid_grace")]
    pub valid_grace_secs: u64,

    /// Wait for the validation result after invoking the affordance
    #[serde(default = "default_result")]
    pub result_secs: u64,

    /// Interval between element lookups while waiting
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load_secs: default_page_load(),
            affordance_secs: default_affordance(),
            legacy_affordance_secs: default_legacy_affordance(),
            valid_grace_secs: default_valid_grace(),
            result_secs: default_result(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_page_load() -> u64 {
    60
}
fn default_affordance() -> u64 {
    30
}
fn default_legacy_affordance() -> u64 {
    10
}
fn default_valid_grace() -> u64 {
    10
}
fn default_result() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    250
}

/// Selectors used to locate the editor's validation UI
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Selectors {
    /// CSS selector of the "run validation" affordance
    #[serde(default = "default_affordance_css")]
    pub affordance: String,

    /// Text shown when the document validates cleanly
    #[serde(default = "default_valid_text")]
    pub valid_text: String,

    /// CSS selector of the badge carrying the error count
    #[serde(default = "default_error_badge")]
    pub error_badge: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            affordance: default_affordance_css(),
            valid_text: default_valid_text(),
            error_badge: default_error_badge(),
        }
    }
}

fn default_affordance_css() -> String {
    r#"div.toggle-button-div svg[data-testid="CheckCircleIcon"]"#.to_string()
}

fn default_valid_text() -> String {
    "The document is valid. There are no validation errors.".to_string()
}

fn default_error_badge() -> String {
    "span.MuiBadge-badge".to_string()
}

/// Run settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunConfig {
    /// Maximum number of cases adjudicated concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Fail legacy fixtures whose page never exposes the validation affordance
    #[serde(default)]
    pub strict_legacy: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            strict_legacy: false,
        }
    }
}

fn default_jobs() -> usize {
    1
}

impl Timeouts {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        if config.run.jobs == 0 {
            return Err(Error::Config("[run].jobs must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// Render this configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
