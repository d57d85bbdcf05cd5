use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::traits::{PageRenderer, RenderRequest, RenderedPage};
use crate::error::FetchError;

const POPUP_POLL: Duration = Duration::from_millis(250);
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// A locally launched Chrome driven over CDP. One page is reused for every
/// navigation, so renders are serialized.
pub struct ChromeRenderer {
    page: Mutex<Page>,
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
}

impl ChromeRenderer {
    pub async fn launch(chrome_bin: Option<PathBuf>, headless: bool) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        if !headless {
            builder = builder.with_head();
        }
        if let Some(path) = chrome_bin {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(FetchError::Browser)?;
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        info!(headless, "Chrome launched");

        Ok(Self {
            page: Mutex::new(page),
            browser: Mutex::new(Some(browser)),
            handler,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
        let page = self.page.lock().await;

        let params = cookie_params(request.cookies);
        if !params.is_empty() {
            if let Err(e) = page.set_cookies(params).await {
                warn!(error = %e, "Failed to apply session cookies");
            }
        }

        match tokio::time::timeout(request.nav_timeout, page.goto(request.url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(FetchError::Navigation {
                    url: request.url.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: request.url.to_string(),
                    after: request.nav_timeout,
                })
            }
        }

        wait_for_network_idle(&page, request.nav_timeout).await;

        if let Some(selector) = request.popup_selector {
            close_popup(&page, selector, request.popup_wait).await;
        }

        for step in 1..=request.scroll.steps {
            if let Err(e) = page.evaluate(SCROLL_TO_BOTTOM).await {
                debug!(step, error = %e, "Scroll step failed");
            }
            debug!(step, of = request.scroll.steps, "Scrolled to bottom");
            tokio::time::sleep(request.scroll.pause).await;
        }

        let html = page.content().await?;
        let url = page
            .url()
            .await?
            .unwrap_or_else(|| request.url.to_string());

        let cookies = match page.get_cookies().await {
            Ok(cookies) => Some(
                cookies
                    .iter()
                    .filter_map(|c| serde_json::to_value(c).ok())
                    .collect(),
            ),
            Err(e) => {
                warn!(error = %e, "Failed to read session cookies");
                None
            }
        };

        Ok(RenderedPage { url, html, cookies })
    }

    async fn shutdown(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Failed to close Chrome");
            }
            if let Err(e) = browser.wait().await {
                debug!(error = %e, "Chrome process wait failed");
            }
        }
        self.handler.abort();
        info!("Chrome closed");
    }
}

fn cookie_params(cookies: &[Value]) -> Vec<CookieParam> {
    cookies
        .iter()
        .filter_map(|cookie| {
            let field = |key: &str| cookie.get(key).and_then(Value::as_str);
            let name = field("name")?;
            let domain = field("domain")?;

            CookieParam::builder()
                .name(name)
                .value(field("value").unwrap_or_default())
                .domain(domain)
                .path(field("path").unwrap_or("/"))
                .build()
                .map_err(|e| warn!(name, error = %e, "Skipping malformed cookie"))
                .ok()
        })
        .collect()
}

/// Wait until the document is complete and no new resources have loaded
/// for a second, or until `timeout`.
async fn wait_for_network_idle(page: &Page, timeout: Duration) {
    let timeout_ms = timeout.as_millis() as u64;
    let js = format!(
        r#"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = 1000;
            const interval = 250;
            const start = Date.now();
            const count = () => {{
                try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
            }};
            let last = count();
            let stable = 0;
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                const cur = count();
                if (document.readyState === 'complete' && cur === last) {{
                    stable += interval;
                    if (stable >= idleMs) return {{ ok: true, waitedMs: Date.now() - start }};
                }} else {{
                    stable = 0;
                }}
                last = cur;
            }}
            return {{ ok: false, waitedMs: Date.now() - start }};
        }})()"#
    );

    match page.evaluate(js).await {
        Ok(result) => {
            let info = result.into_value::<Value>().unwrap_or(Value::Null);
            let ok = info.get("ok").and_then(Value::as_bool).unwrap_or(false);
            let waited_ms = info.get("waitedMs").and_then(Value::as_u64).unwrap_or(0);
            if ok {
                debug!(waited_ms, "Network idle");
            } else {
                warn!(waited_ms, "Network idle wait timed out");
            }
        }
        Err(e) => warn!(error = %e, "Network idle wait failed"),
    }
}

/// Click the popup's close control if it shows up within `wait`. Absence is
/// not an error.
async fn close_popup(page: &Page, selector: &str, wait: Duration) {
    let found = tokio::time::timeout(wait, async {
        loop {
            if let Ok(el) = page.find_element(selector).await {
                return el;
            }
            tokio::time::sleep(POPUP_POLL).await;
        }
    })
    .await;

    match found {
        Ok(el) => match el.click().await {
            Ok(_) => debug!(selector, "Closed popup"),
            Err(e) => debug!(selector, error = %e, "Popup close click failed"),
        },
        Err(_) => debug!(selector, "No popup"),
    }
}
