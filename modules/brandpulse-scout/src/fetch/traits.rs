// Trait seams for the fetch stage.
//
// TargetFetcher is what the harvester consumes: one target in, records out.
// PageRenderer is the browser behind it: one URL in, rendered HTML out.
// Both have in-memory doubles in `crate::testing`.

use std::time::Duration;

use async_trait::async_trait;
use brandpulse_common::RawRecord;

use crate::error::FetchError;
use crate::sources::Target;

#[async_trait]
pub trait TargetFetcher: Send + Sync {
    /// Fetch and extract one target. A finite, possibly empty, sequence of
    /// records, or a terminal failure once the retry policy is exhausted.
    async fn fetch_target(&self, target: &Target) -> Result<Vec<RawRecord>, FetchError>;
}

/// Fixed number of scroll-to-bottom steps with a pause after each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPlan {
    pub steps: u32,
    pub pause: Duration,
}

impl ScrollPlan {
    pub fn none() -> Self {
        Self {
            steps: 0,
            pause: Duration::ZERO,
        }
    }

    pub fn total(&self) -> Duration {
        self.pause * self.steps
    }
}

/// One navigation as the renderer should perform it.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub url: &'a str,
    pub nav_timeout: Duration,
    pub popup_selector: Option<&'a str>,
    pub popup_wait: Duration,
    pub scroll: ScrollPlan,
    /// Cookies to present before navigating, in the browser protocol's shape.
    pub cookies: &'a [serde_json::Value],
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// Where the browser ended up after redirects.
    pub url: String,
    pub html: String,
    /// The session's cookies after navigation, when the backend can report them.
    pub cookies: Option<Vec<serde_json::Value>>,
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedPage, FetchError>;

    /// Release the browser session. Called once at the end of a run.
    async fn shutdown(&self) {}
}
