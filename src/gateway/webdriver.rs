//! Browser-backed gateway speaking the W3C WebDriver protocol
//!
//! Each adjudication gets its own browser session from a WebDriver server
//! (chromedriver, geckodriver, ...). The session is deleted when the case is
//! done, whatever the outcome.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;

use crate::common::config::{Config, Selectors};
use crate::common::{Error, Result};

use super::protocol::{run_protocol, EditorPage, PageError};
use super::{Adjudication, Outcome, ValidatorGateway};

/// Gateway that opens the editor in a real browser
pub struct WebDriverGateway {
    http: Client,
    endpoint: String,
    capabilities: Value,
    selectors: Selectors,
    poll_interval: Duration,
    page_load: Duration,
}

impl WebDriverGateway {
    /// Create a gateway from the `[webdriver]`, `[selectors]` and `[timeouts]` settings
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = config.webdriver.url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&endpoint).map_err(|e| Error::invalid_url(&endpoint, e))?;

        let page_load = config.timeouts.page_load();
        let http = Client::builder()
            .timeout(page_load + Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            capabilities: capabilities(&config.webdriver.browser, config.webdriver.headless),
            selectors: config.selectors.clone(),
            poll_interval: config.timeouts.poll_interval(),
            page_load,
        })
    }

    async fn new_session(&self) -> std::result::Result<WebDriverPage<'_>, PageError> {
        let body = json!({ "capabilities": { "alwaysMatch": self.capabilities } });
        let value = call(&self.http, Method::POST, &format!("{}/session", self.endpoint), Some(body)).await?;

        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| PageError::Session("WebDriver returned no sessionId".to_string()))?
            .to_string();
        tracing::debug!(session = %session_id, "WebDriver session created");

        let mut page = WebDriverPage {
            gateway: self,
            base: format!("{}/session/{}", self.endpoint, session_id),
            closed: false,
        };
        let timeouts = json!({ "pageLoad": self.page_load.as_millis() as u64 });
        if let Err(e) = page.command(Method::POST, "timeouts", Some(timeouts)).await {
            page.close().await;
            return Err(e);
        }
        Ok(page)
    }
}

#[async_trait]
impl ValidatorGateway for WebDriverGateway {
    fn name(&self) -> &str {
        "webdriver"
    }

    async fn adjudicate(&self, request: &Adjudication) -> Outcome {
        let mut page = match self.new_session().await {
            Ok(page) => page,
            Err(PageError::Timeout) => {
                return Outcome::SessionError {
                    detail: "timed out creating browser session".to_string(),
                }
            }
            Err(PageError::Session(detail)) => {
                return Outcome::SessionError {
                    detail: format!("cannot create browser session: {}", detail),
                }
            }
        };
        run_protocol(&mut page, request, self.poll_interval).await
    }
}

/// Session capabilities for the configured browser
fn capabilities(browser: &str, headless: bool) -> Value {
    match browser {
        "chrome" | "chromium" => {
            let mut args = vec!["--no-sandbox", "--disable-dev-shm-usage"];
            if headless {
                args.push("--headless=new");
            }
            json!({ "browserName": "chrome", "goog:chromeOptions": { "args": args } })
        }
        "firefox" => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { Vec::new() };
            json!({ "browserName": "firefox", "moz:firefoxOptions": { "args": args } })
        }
        other => json!({ "browserName": other }),
    }
}

/// Send one WebDriver command and unwrap its `value`
async fn call(
    http: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> std::result::Result<Value, PageError> {
    tracing::trace!(%method, %url, "WebDriver request");

    let mut req = http.request(method, url);
    // Only POST commands carry a body
    if let Some(body) = body {
        req = req.json(&body);
    }

    let response = req.send().await.map_err(|e| {
        if e.is_timeout() {
            PageError::Timeout
        } else {
            PageError::Session(format!("WebDriver request failed: {}", e))
        }
    })?;

    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|e| PageError::Session(format!("Invalid WebDriver response: {}", e)))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        tracing::trace!(%status, error, message, "WebDriver error");
        return Err(match error {
            "timeout" | "script timeout" => PageError::Timeout,
            _ => PageError::Session(format!("{}: {}", error, message)),
        });
    }

    Ok(value)
}

/// A live WebDriver session showing the editor
///
/// Dropping a page that was never closed deletes its session in the
/// background, so a cancelled adjudication does not leak a browser.
struct WebDriverPage<'a> {
    gateway: &'a WebDriverGateway,
    base: String,
    closed: bool,
}

impl WebDriverPage<'_> {
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> std::result::Result<Value, PageError> {
        call(
            &self.gateway.http,
            method,
            &format!("{}/{}", self.base, path),
            body,
        )
        .await
    }

    /// Element references matching a locator; empty when none are present
    async fn find_all(&self, using: &str, value: &str) -> std::result::Result<Vec<Value>, PageError> {
        let found = self
            .command(
                Method::POST,
                "elements",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        Ok(found.as_array().cloned().unwrap_or_default())
    }

    async fn text_of(&self, element: &Value) -> std::result::Result<String, PageError> {
        let id = element_id(element)?;
        let text = self
            .command(Method::GET, &format!("element/{}/text", id), None)
            .await?;
        Ok(text.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl<'a> EditorPage for WebDriverPage<'a> {
    async fn open(&mut self, url: &str) -> std::result::Result<(), PageError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn has_affordance(&mut self) -> std::result::Result<bool, PageError> {
        let found = self
            .find_all("css selector", &self.gateway.selectors.affordance)
            .await?;
        Ok(!found.is_empty())
    }

    async fn invoke_affordance(&mut self) -> std::result::Result<(), PageError> {
        let found = self
            .find_all("css selector", &self.gateway.selectors.affordance)
            .await?;
        let element = found
            .into_iter()
            .next()
            .ok_or_else(|| PageError::Session("validation affordance disappeared".to_string()))?;

        // SVG icons have no click(); dispatch the event directly, like a forced click
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({
                "script": "arguments[0].dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window }));",
                "args": [element],
            })),
        )
        .await
        .map(|_| ())
    }

    async fn has_valid_indicator(&mut self) -> std::result::Result<bool, PageError> {
        let xpath = format!(
            "//*[text()[contains(., {})]]",
            xpath_literal(&self.gateway.selectors.valid_text)
        );
        Ok(!self.find_all("xpath", &xpath).await?.is_empty())
    }

    async fn error_badge(&mut self) -> std::result::Result<Option<String>, PageError> {
        let found = self
            .find_all("css selector", &self.gateway.selectors.error_badge)
            .await?;
        match found.first() {
            Some(element) => Ok(Some(self.text_of(element).await?)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        delete_session(&self.gateway.http, &self.base).await;
        self.closed = true;
    }
}

impl Drop for WebDriverPage<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(session = %self.base, "WebDriver session left open");
            return;
        };
        tracing::debug!(session = %self.base, "Adjudication cancelled, deleting session");
        let http = self.gateway.http.clone();
        let base = std::mem::take(&mut self.base);
        handle.spawn(async move { delete_session(&http, &base).await });
    }
}

async fn delete_session(http: &Client, base: &str) {
    if let Err(e) = call(http, Method::DELETE, base, None).await {
        tracing::warn!(session = %base, error = ?e, "Failed to delete WebDriver session");
    }
}

/// The id inside a web element reference (`{"element-6066-...": "<id>"}`)
fn element_id(element: &Value) -> std::result::Result<&str, PageError> {
    element
        .as_object()
        .and_then(|obj| obj.values().find_map(Value::as_str))
        .ok_or_else(|| PageError::Session(format!("Malformed element reference: {}", element)))
}

/// Quote a string for use inside an XPath expression
fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        format!("\"{}\"", text)
    } else if !text.contains('\'') {
        format!("'{}'", text)
    } else {
        let parts: Vec<String> = text.split('"').map(|p| format!("\"{}\"", p)).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}
