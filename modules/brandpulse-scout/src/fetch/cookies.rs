use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info, warn};

/// Browser session cookies persisted between runs as a JSON array.
///
/// A missing or unreadable file starts an empty session; it is never fatal.
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
    cookies: Vec<Value>,
}

impl CookieJar {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cookies = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<Value>>(&raw) {
                Ok(cookies) => {
                    info!(path = %path.display(), count = cookies.len(), "Loaded session cookies");
                    cookies
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cookie file is not a JSON array, starting fresh");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cookie file yet");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cookie file, starting fresh");
                Vec::new()
            }
        };

        Self { path, cookies }
    }

    pub fn cookies(&self) -> &[Value] {
        &self.cookies
    }

    /// Replace the session with what the browser reported and write it out.
    /// Write failures are logged; the in-memory session is still updated.
    pub async fn replace_and_save(&mut self, cookies: Vec<Value>) {
        self.cookies = cookies;

        let body = match serde_json::to_string_pretty(&self.cookies) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to serialize session cookies");
                return;
            }
        };

        match tokio::fs::write(&self.path, body).await {
            Ok(()) => debug!(path = %self.path.display(), count = self.cookies.len(), "Saved session cookies"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to save session cookies"),
        }
    }
}
