//! Adjudication protocol shared by browser-backed gateways
//!
//! The protocol only needs a handful of instantaneous page probes; all
//! waiting happens here, so every backend gets the same bounded waits and
//! the same mapping from page state to [`Outcome`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use super::{AbsencePolicy, Adjudication, Outcome, Stage};

/// Failure of a single page operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// The backend gave up waiting (page load, script timeout)
    Timeout,
    /// The backend could not perform the operation
    Session(String),
}

/// One editor page, driven by a browser or a fake
#[async_trait]
pub trait EditorPage: Send {
    /// Navigate to the session locator
    async fn open(&mut self, url: &str) -> Result<(), PageError>;

    /// Whether the "run validation" affordance is on the page right now
    async fn has_affordance(&mut self) -> Result<bool, PageError>;

    /// Invoke the affordance
    async fn invoke_affordance(&mut self) -> Result<(), PageError>;

    /// Whether the "document is valid" indicator is on the page right now
    async fn has_valid_indicator(&mut self) -> Result<bool, PageError>;

    /// Text of the error-count badge, if one is displayed
    async fn error_badge(&mut self) -> Result<Option<String>, PageError>;

    /// Tear the page down; must not fail
    async fn close(&mut self);
}

/// Deadline-bounded polling; every wait probes at least once
struct Poller {
    deadline: Instant,
    interval: Duration,
}

impl Poller {
    fn new(within: Duration, interval: Duration) -> Self {
        Self {
            deadline: Instant::now() + within,
            interval,
        }
    }

    /// Sleep until the next probe; false once the deadline has passed
    async fn tick(&self) -> bool {
        let now = Instant::now();
        if now >= self.deadline {
            return false;
        }
        tokio::time::sleep(self.interval.min(self.deadline - now)).await;
        true
    }
}

/// Drive `page` through one adjudication and close it afterwards
///
/// The page work is bounded by [`Waits::budget`](super::Waits::budget), which
/// leaves time to close the page before the driver's outer ceiling.
pub async fn run_protocol<P: EditorPage>(
    page: &mut P,
    request: &Adjudication,
    interval: Duration,
) -> Outcome {
    let budget = request.waits.budget();
    let outcome = match tokio::time::timeout(budget, adjudicate_page(page, request, interval)).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(PageError::Timeout)) => Outcome::SessionError {
            detail: "browser command timed out".to_string(),
        },
        Ok(Err(PageError::Session(detail))) => Outcome::SessionError { detail },
        Err(_) => Outcome::Timeout {
            stage: Stage::Session,
            secs: budget.as_secs(),
        },
    };
    page.close().await;
    outcome
}

async fn adjudicate_page<P: EditorPage>(
    page: &mut P,
    request: &Adjudication,
    interval: Duration,
) -> Result<Outcome, PageError> {
    let waits = &request.waits;
    match page.open(&request.session).await {
        Err(PageError::Timeout) => {
            return Ok(Outcome::Timeout {
                stage: Stage::Open,
                secs: waits.page_load.as_secs(),
            })
        }
        other => other?,
    }

    let poll = Poller::new(waits.affordance, interval);
    let found = loop {
        if page.has_affordance().await? {
            break true;
        }
        if !poll.tick().await {
            break false;
        }
    };

    if !found {
        tracing::debug!(document = %request.document, "Validation affordance not found");
        return match request.policy {
            AbsencePolicy::Strict => Ok(Outcome::AffordanceAbsent),
            AbsencePolicy::ProbeValidIndicator => {
                let poll = Poller::new(waits.grace, interval);
                loop {
                    if page.has_valid_indicator().await? {
                        break Ok(Outcome::Valid);
                    }
                    if !poll.tick().await {
                        break Ok(Outcome::AffordanceAbsent);
                    }
                }
            }
        };
    }

    page.invoke_affordance().await?;

    let poll = Poller::new(waits.result, interval);
    let mut saw_empty_badge = false;
    loop {
        if page.has_valid_indicator().await? {
            return Ok(Outcome::Valid);
        }
        if let Some(text) = page.error_badge().await? {
            match read_badge(&text) {
                Some(count) => return Ok(Outcome::Invalid { count }),
                None if text.trim().is_empty() => saw_empty_badge = true,
                None => {
                    return Ok(Outcome::MalformedOutcome {
                        detail: format!("error badge text {:?} is not a positive count", text),
                    })
                }
            }
        }
        if !poll.tick().await {
            break;
        }
    }

    if saw_empty_badge {
        Ok(Outcome::MalformedOutcome {
            detail: "error badge stayed empty".to_string(),
        })
    } else {
        Ok(Outcome::Timeout {
            stage: Stage::Result,
            secs: waits.result.as_secs(),
        })
    }
}

/// Parse the error badge; only a positive integer counts as a reading
fn read_badge(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|count| *count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Waits;
    use crate::harness::FixturePath;

    /// Page whose state changes after a number of probes
    #[derive(Default)]
    struct FakePage {
        open_error: Option<PageError>,
        open_hangs: bool,
        affordance_after: Option<usize>,
        valid_without_click: bool,
        after_click: Option<AfterClick>,
        probes: usize,
        clicked: bool,
        closed: bool,
    }

    enum AfterClick {
        Valid,
        Badge(&'static str),
    }

    #[async_trait]
    impl EditorPage for FakePage {
        async fn open(&mut self, _url: &str) -> Result<(), PageError> {
            if self.open_hangs {
                std::future::pending::<()>().await;
            }
            match self.open_error.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn has_affordance(&mut self) -> Result<bool, PageError> {
            self.probes += 1;
            Ok(matches!(self.affordance_after, Some(n) if self.probes > n))
        }

        async fn invoke_affordance(&mut self) -> Result<(), PageError> {
            self.clicked = true;
            Ok(())
        }

        async fn has_valid_indicator(&mut self) -> Result<bool, PageError> {
            Ok(if self.clicked {
                matches!(self.after_click, Some(AfterClick::Valid))
            } else {
                self.valid_without_click
            })
        }

        async fn error_badge(&mut self) -> Result<Option<String>, PageError> {
            Ok(match (&self.after_click, self.clicked) {
                (Some(AfterClick::Badge(text)), true) => Some(text.to_string()),
                _ => None,
            })
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    fn request(policy: AbsencePolicy) -> Adjudication {
        Adjudication {
            session: "https://editor.test/?url=x".to_string(),
            document: FixturePath::parse("2 errors/a.xml"),
            policy,
            waits: Waits {
                page_load: Duration::from_secs(60),
                affordance: Duration::from_secs(30),
                grace: Duration::from_secs(10),
                result: Duration::from_secs(10),
            },
        }
    }

    async fn run(page: &mut FakePage, policy: AbsencePolicy) -> Outcome {
        run_protocol(page, &request(policy), Duration::from_millis(250)).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_badge_count_is_read_after_click() {
        let mut page = FakePage {
            affordance_after: Some(3),
            after_click: Some(AfterClick::Badge(" 2 ")),
            ..Default::default()
        };
        assert_eq!(
            run(&mut page, AbsencePolicy::Strict).await,
            Outcome::Invalid { count: 2 }
        );
        assert!(page.clicked);
        assert!(page.closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_indicator_after_click() {
        let mut page = FakePage {
            affordance_after: Some(0),
            after_click: Some(AfterClick::Valid),
            ..Default::default()
        };
        assert_eq!(
            run(&mut page, AbsencePolicy::ProbeValidIndicator).await,
            Outcome::Valid
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_affordance_strict() {
        let mut page = FakePage {
            valid_without_click: true,
            ..Default::default()
        };
        assert_eq!(
            run(&mut page, AbsencePolicy::Strict).await,
            Outcome::AffordanceAbsent
        );
        assert!(page.closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_affordance_probe_finds_valid_indicator() {
        let mut page = FakePage {
            valid_without_click: true,
            ..Default::default()
        };
        assert_eq!(
            run(&mut page, AbsencePolicy::ProbeValidIndicator).await,
            Outcome::Valid
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_affordance_probe_without_indicator() {
        let mut page = FakePage::default();
        assert_eq!(
            run(&mut page, AbsencePolicy::ProbeValidIndicator).await,
            Outcome::AffordanceAbsent
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_numeric_badge_is_malformed() {
        let mut page = FakePage {
            affordance_after: Some(0),
            after_click: Some(AfterClick::Badge("many")),
            ..Default::default()
        };
        assert!(matches!(
            run(&mut page, AbsencePolicy::Strict).await,
            Outcome::MalformedOutcome { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_badge_is_malformed() {
        let mut page = FakePage {
            affordance_after: Some(0),
            after_click: Some(AfterClick::Badge("0")),
            ..Default::default()
        };
        assert!(matches!(
            run(&mut page, AbsencePolicy::Strict).await,
            Outcome::MalformedOutcome { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_badge_until_deadline_is_malformed() {
        let mut page = FakePage {
            affordance_after: Some(0),
            after_click: Some(AfterClick::Badge("")),
            ..Default::default()
        };
        assert_eq!(
            run(&mut page, AbsencePolicy::Strict).await,
            Outcome::MalformedOutcome {
                detail: "error badge stayed empty".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_result_is_timeout() {
        let mut page = FakePage {
            affordance_after: Some(0),
            ..Default::default()
        };
        assert_eq!(
            run(&mut page, AbsencePolicy::Strict).await,
            Outcome::Timeout {
                stage: Stage::Result,
                secs: 10
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failures_map_to_outcomes() {
        let mut page = FakePage {
            open_error: Some(PageError::Timeout),
            ..Default::default()
        };
        assert_eq!(
            run(&mut page, AbsencePolicy::Strict).await,
            Outcome::Timeout {
                stage: Stage::Open,
                secs: 60
            }
        );
        assert!(page.closed);

        let mut page = FakePage {
            open_error: Some(PageError::Session("refused".to_string())),
            ..Default::default()
        };
        assert_eq!(
            run(&mut page, AbsencePolicy::Strict).await,
            Outcome::SessionError {
                detail: "refused".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_page_is_closed_within_budget() {
        let mut page = FakePage {
            open_hangs: true,
            ..Default::default()
        };
        let request = request(AbsencePolicy::Strict);

        let outcome = tokio::time::timeout(
            request.waits.ceiling(),
            run_protocol(&mut page, &request, Duration::from_millis(250)),
        )
        .await
        .expect("protocol must finish before the ceiling");

        assert_eq!(
            outcome,
            Outcome::Timeout {
                stage: Stage::Session,
                secs: request.waits.budget().as_secs()
            }
        );
        assert!(page.closed);
    }
}
