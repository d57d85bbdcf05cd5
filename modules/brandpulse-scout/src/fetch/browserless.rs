use std::time::Duration;

use async_trait::async_trait;
use browserless_client::{BrowserlessClient, BrowserlessError, ContentRequest};
use tracing::debug;

use super::traits::{PageRenderer, RenderRequest, RenderedPage, ScrollPlan};
use crate::error::FetchError;

/// Slack on top of navigation and settle time for the HTTP round trip.
const HTTP_SLACK: Duration = Duration::from_secs(30);

/// A hosted headless browser reached over the Browserless `/content` API.
///
/// Popup dismissal and scrolling run as an injected script, and the response
/// carries only HTML, so session cookies are sent but never read back.
pub struct BrowserlessRenderer {
    client: BrowserlessClient,
}

impl BrowserlessRenderer {
    /// `max_wait` bounds navigation plus scroll time of the longest request.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        max_wait: Duration,
    ) -> Result<Self, FetchError> {
        let client = BrowserlessClient::new(base_url, token, max_wait + HTTP_SLACK)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
        let mut body = ContentRequest::new(request.url)
            .network_idle(request.nav_timeout)
            .cookies(request.cookies.to_vec());

        let script = interaction_script(request.popup_selector, request.popup_wait, request.scroll);
        if let Some(script) = script {
            body = body
                .script(script)
                .settle_for(request.popup_wait + request.scroll.total());
        }

        let html = self
            .client
            .render(&body)
            .await
            .map_err(|e| to_fetch_error(e, request.url, request.nav_timeout))?;

        debug!(url = request.url, bytes = html.len(), "Rendered via Browserless");

        Ok(RenderedPage {
            url: request.url.to_string(),
            html,
            cookies: None,
        })
    }
}

/// An HTTP timeout is reported as a navigation timeout on `url`.
fn to_fetch_error(err: BrowserlessError, url: &str, nav_timeout: Duration) -> FetchError {
    match err {
        BrowserlessError::Timeout(_) => FetchError::Timeout {
            url: url.to_string(),
            after: nav_timeout,
        },
        other => FetchError::from(other),
    }
}

/// In-page script that closes the popup and scrolls. `None` when there is
/// nothing to do.
fn interaction_script(
    popup_selector: Option<&str>,
    popup_wait: Duration,
    scroll: ScrollPlan,
) -> Option<String> {
    if popup_selector.is_none() && scroll.steps == 0 {
        return None;
    }

    // JSON string literals are valid JS string literals.
    let selector = popup_selector
        .and_then(|s| serde_json::to_string(s).ok())
        .unwrap_or_else(|| "null".to_string());

    Some(format!(
        r#"(async () => {{
            const sleep = ms => new Promise(r => setTimeout(r, ms));
            const selector = {selector};
            if (selector) {{
                const deadline = Date.now() + {popup_ms};
                while (Date.now() < deadline) {{
                    const el = document.querySelector(selector);
                    if (el) {{ el.click(); break; }}
                    await sleep(250);
                }}
            }}
            for (let i = 0; i < {steps}; i++) {{
                window.scrollTo(0, document.body.scrollHeight);
                await sleep({pause_ms});
            }}
        }})();"#,
        popup_ms = popup_wait.as_millis(),
        steps = scroll.steps,
        pause_ms = scroll.pause.as_millis(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_timeout_becomes_navigation_timeout() {
        let err = to_fetch_error(
            BrowserlessError::Timeout("operation timed out".into()),
            "https://www.quora.com/search?q=Miniso",
            Duration::from_secs(60),
        );
        match err {
            FetchError::Timeout { url, after } => {
                assert_eq!(url, "https://www.quora.com/search?q=Miniso");
                assert_eq!(after, Duration::from_secs(60));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn api_error_becomes_browser_error() {
        let err = to_fetch_error(
            BrowserlessError::Api {
                status: 429,
                message: "Too many requests".into(),
            },
            "https://www.minisoindia.com/",
            Duration::from_secs(60),
        );
        assert!(matches!(err, FetchError::Browser(ref msg) if msg.contains("429")));
    }

    #[test]
    fn no_script_without_popup_or_scroll() {
        assert!(interaction_script(None, Duration::from_secs(5), ScrollPlan::none()).is_none());
    }

    #[test]
    fn script_escapes_selector_and_carries_scroll_plan() {
        let scroll = ScrollPlan {
            steps: 5,
            pause: Duration::from_millis(3000),
        };
        let script =
            interaction_script(Some(r#"[aria-label="Close"]"#), Duration::from_secs(5), scroll)
                .unwrap();

        assert!(script.contains(r#"const selector = "[aria-label=\"Close\"]";"#));
        assert!(script.contains("i < 5"));
        assert!(script.contains("await sleep(3000)"));
        assert!(script.contains("Date.now() + 5000"));
    }

    #[test]
    fn scroll_only_script_has_null_selector() {
        let scroll = ScrollPlan {
            steps: 2,
            pause: Duration::from_millis(100),
        };
        let script = interaction_script(None, Duration::ZERO, scroll).unwrap();
        assert!(script.contains("const selector = null;"));
    }
}
