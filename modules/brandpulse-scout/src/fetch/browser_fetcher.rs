use std::time::Duration;

use async_trait::async_trait;
use brandpulse_common::RawRecord;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::cookies::CookieJar;
use super::retry::RetryPolicy;
use super::traits::{PageRenderer, RenderRequest, RenderedPage, ScrollPlan, TargetFetcher};
use crate::error::FetchError;
use crate::extract::{site, Extractor};
use crate::sources::{listing_page_url, SourceProfile, Target, POPUP_WAIT};

/// Navigation and retry settings shared by every target of a run.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub retry: RetryPolicy,
    pub scroll: ScrollPlan,
    pub nav_timeout: Duration,
}

/// Renders targets through a [`PageRenderer`] and runs the profile's
/// extractor over the HTML. Session cookies are carried across navigations
/// and saved after each one that reports them.
pub struct BrowserFetcher {
    renderer: Box<dyn PageRenderer>,
    cookies: Mutex<CookieJar>,
    options: FetchOptions,
    extractor: Extractor,
    popup_selector: Option<&'static str>,
}

impl BrowserFetcher {
    pub fn new(
        renderer: Box<dyn PageRenderer>,
        profile: &SourceProfile,
        cookies: CookieJar,
        options: FetchOptions,
    ) -> Self {
        Self {
            renderer,
            cookies: Mutex::new(cookies),
            options,
            extractor: profile.extractor,
            popup_selector: profile.popup_selector,
        }
    }

    /// Close the underlying browser session.
    pub async fn shutdown(&self) {
        self.renderer.shutdown().await;
    }

    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
        let mut jar = self.cookies.lock().await;

        let request = RenderRequest {
            url,
            nav_timeout: self.options.nav_timeout,
            popup_selector: self.popup_selector,
            popup_wait: POPUP_WAIT,
            scroll: self.options.scroll,
            cookies: jar.cookies(),
        };
        let page = self.renderer.render(&request).await?;

        if let Some(cookies) = page.cookies.clone() {
            jar.replace_and_save(cookies).await;
        }
        Ok(page)
    }

    async fn render_with_retry(&self, label: &str, url: &str) -> Result<RenderedPage, FetchError> {
        self.options
            .retry
            .run(label, move |attempt| {
                info!(target_label = label, url, attempt, "Scraping");
                self.render(url)
            })
            .await
    }

    async fn fetch_page(&self, label: &str, url: &str) -> Result<Vec<RawRecord>, FetchError> {
        let page = self.render_with_retry(label, url).await?;
        let records = self
            .extractor
            .extract(&page.html, &page.url, url, Utc::now());
        info!(target_label = label, count = records.len(), "Found records");
        Ok(records)
    }

    /// Follow a paginated listing. A failure on the first page fails the
    /// target; a later failure ends pagination and keeps what was collected.
    async fn fetch_listing(
        &self,
        label: &str,
        base_url: &str,
        max_pages: u32,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let mut records = Vec::new();

        for page_no in 1..=max_pages {
            let url = listing_page_url(base_url, page_no);
            let page = match self.render_with_retry(label, &url).await {
                Ok(page) => page,
                Err(e) if page_no == 1 => return Err(e),
                Err(e) => {
                    warn!(
                        target_label = label,
                        page = page_no,
                        error = %e,
                        "Listing page failed, keeping earlier pages"
                    );
                    break;
                }
            };

            let found = self
                .extractor
                .extract_listing(&page.html, &page.url, &url, Utc::now());
            info!(target_label = label, page = page_no, count = found.len(), "Found products");
            records.extend(found);

            if !site::has_next_page(&page.html, page_no + 1) {
                break;
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl TargetFetcher for BrowserFetcher {
    async fn fetch_target(&self, target: &Target) -> Result<Vec<RawRecord>, FetchError> {
        let label = target.to_string();
        match target {
            Target::Search { url, .. } | Target::Page { url } => self.fetch_page(&label, url).await,
            Target::Listing {
                base_url,
                max_pages,
            } => self.fetch_listing(&label, base_url, *max_pages).await,
        }
    }
}
