// Selector-based field extraction over rendered HTML.

pub mod quora;
pub mod site;

use brandpulse_common::RawRecord;
use chrono::{DateTime, Utc};
use scraper::ElementRef;

/// Which field-extraction routine runs against a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    Quora,
    MinisoSite,
}

impl Extractor {
    /// Extract records from a rendered page.
    ///
    /// `page_url` is where the browser ended up and picks the selector set;
    /// `source_url` is what was requested and becomes part of record identity.
    pub fn extract(
        &self,
        html: &str,
        page_url: &str,
        source_url: &str,
        scraped_at: DateTime<Utc>,
    ) -> Vec<RawRecord> {
        match self {
            Extractor::Quora => quora::extract_questions(html)
                .into_iter()
                .filter_map(|q| q.into_record())
                .collect(),
            Extractor::MinisoSite => site::extract_blocks(html, page_url, source_url, scraped_at)
                .into_iter()
                .filter_map(|b| b.into_record())
                .collect(),
        }
    }

    /// Extract records from one page of a product listing. Same URL split as
    /// [`Extractor::extract`].
    pub fn extract_listing(
        &self,
        html: &str,
        page_url: &str,
        source_url: &str,
        scraped_at: DateTime<Utc>,
    ) -> Vec<RawRecord> {
        match self {
            Extractor::Quora => Vec::new(),
            Extractor::MinisoSite => site::extract_products(html, page_url, source_url, scraped_at)
                .into_iter()
                .filter_map(|b| b.into_record())
                .collect(),
        }
    }
}

/// Text content of an element, trimmed.
pub(crate) fn inner_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Nearest element (the element itself included) matching `pred`, walking up
/// the tree.
pub(crate) fn closest<'a>(
    el: ElementRef<'a>,
    pred: impl Fn(&ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .find(|e| pred(e))
}

pub(crate) fn is_tag(name: &'static str) -> impl Fn(&ElementRef<'_>) -> bool {
    move |e| e.value().name() == name
}

pub(crate) fn has_class(class: &'static str) -> impl Fn(&ElementRef<'_>) -> bool {
    move |e| e.value().classes().any(|c| c == class)
}

/// Resolve an href against the page it appeared on.
pub(crate) fn absolutize(href: &str, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    url::Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .ok()
}
