pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Navigation options forwarded to the browser's `page.goto`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GotoOptions {
    pub wait_until: String,
    pub timeout: u64,
}

/// Inline script injected into the page after navigation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScriptTag {
    pub content: String,
}

/// Body of a `/content` request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goto_options: Option<GotoOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_script_tag: Vec<ScriptTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_timeout: Option<u64>,
}

impl ContentRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            goto_options: None,
            cookies: Vec::new(),
            add_script_tag: Vec::new(),
            wait_for_timeout: None,
        }
    }

    /// Wait for the network to settle (at most two open connections).
    pub fn network_idle(mut self, timeout: Duration) -> Self {
        self.goto_options = Some(GotoOptions {
            wait_until: "networkidle2".to_string(),
            timeout: timeout.as_millis() as u64,
        });
        self
    }

    pub fn cookies(mut self, cookies: Vec<serde_json::Value>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn script(mut self, content: impl Into<String>) -> Self {
        self.add_script_tag.push(ScriptTag {
            content: content.into(),
        });
        self
    }

    /// Extra time to wait after scripts are injected, before the DOM is read.
    pub fn settle_for(mut self, wait: Duration) -> Self {
        self.wait_for_timeout = Some(wait.as_millis() as u64);
        self
    }
}

impl BrowserlessClient {
    /// Build a client. `timeout` bounds the whole HTTP exchange, so it must
    /// cover navigation plus any settle time requested per call.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Render a page with navigation options, cookies and injected scripts.
    pub async fn render(&self, request: &ContentRequest) -> Result<String> {
        debug!(url = request.url.as_str(), cookies = request.cookies.len(), "Browserless render");

        let resp = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_request_only_carries_url() {
        let body = serde_json::to_value(ContentRequest::new("https://example.com")).unwrap();
        assert_eq!(body, serde_json::json!({ "url": "https://example.com" }));
    }

    #[test]
    fn full_request_uses_camel_case_fields() {
        let request = ContentRequest::new("https://example.com")
            .network_idle(Duration::from_secs(60))
            .cookies(vec![serde_json::json!({
                "name": "sid",
                "value": "1",
                "domain": ".example.com"
            })])
            .script("window.scrollTo(0, 0);")
            .settle_for(Duration::from_millis(1500));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["gotoOptions"]["waitUntil"], "networkidle2");
        assert_eq!(body["gotoOptions"]["timeout"], 60_000);
        assert_eq!(body["cookies"][0]["name"], "sid");
        assert_eq!(body["addScriptTag"][0]["content"], "window.scrollTo(0, 0);");
        assert_eq!(body["waitForTimeout"], 1500);
    }

    #[test]
    fn endpoint_appends_token() {
        let client =
            BrowserlessClient::new("http://localhost:3000/", Some("abc"), Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000/content?token=abc");

        let anonymous =
            BrowserlessClient::new("http://localhost:3000", None, Duration::from_secs(5)).unwrap();
        assert_eq!(anonymous.endpoint(), "http://localhost:3000/content");
    }
}
