// Compile-time source profiles: what to scrape, where it is stored, and how
// the pages are read.

use std::fmt;
use std::time::Duration;

use crate::extract::Extractor;

/// Cap on product listing pages followed per run.
pub const MAX_LISTING_PAGES: u32 = 7;

/// How long to look for a popup's close control after navigation.
pub const POPUP_WAIT: Duration = Duration::from_secs(5);

pub const QUORA_BASE: &str = "https://www.quora.com";
pub const MINISO_HOME: &str = "https://www.minisoindia.com/";

const QUORA_QUERIES: &[&str] = &[
    "Miniso",
    "Miniso earbuds",
    "Miniso skincare",
    "Miniso storage",
    "Miniso cosmetics",
    "Miniso stationery",
    "Miniso plushies",
];

const MINISO_PAGES: &[&str] = &[
    "https://www.minisoindia.com/our-blogs",
    "https://www.minisoindia.com/about-miniso",
    "https://www.minisoindia.com/store-locator",
    "https://www.minisoindia.com/",
];

const MINISO_PRODUCT_LISTING: &str =
    "https://www.minisoindia.com/category/top-categories/daily-life-products/";

/// One configured unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A search query, rendered through its results page.
    Search { query: String, url: String },
    /// A single page.
    Page { url: String },
    /// A paginated product listing, followed while a next-page link exists.
    Listing { base_url: String, max_pages: u32 },
}

impl Target {
    pub fn quora_search(query: &str) -> Self {
        let query = query.trim().to_string();
        let url = quora_search_url(&query);
        Target::Search { query, url }
    }

    pub fn page(url: &str) -> Self {
        Target::Page {
            url: url.trim().to_string(),
        }
    }

    pub fn listing(base_url: &str, max_pages: u32) -> Self {
        Target::Listing {
            base_url: base_url.trim().to_string(),
            max_pages: max_pages.min(MAX_LISTING_PAGES),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Search { query, .. } => write!(f, "search \"{query}\""),
            Target::Page { url } => write!(f, "{url}"),
            Target::Listing { base_url, .. } => write!(f, "listing {base_url}"),
        }
    }
}

/// URL of page `n` (1-based) of a product listing.
pub fn listing_page_url(base_url: &str, page: u32) -> String {
    if page > 1 {
        format!("{base_url}?page={page}")
    } else {
        base_url.to_string()
    }
}

pub fn quora_search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{QUORA_BASE}/search?q={encoded}&type=question")
}

/// Everything a pipeline needs to know about one source.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    /// Namespace tag for stored ids; also the `platform` of stored documents.
    pub namespace: &'static str,
    pub collection: &'static str,
    pub extractor: Extractor,
    /// Selector of a popup to close after navigation, if the site shows one.
    pub popup_selector: Option<&'static str>,
    pub targets: Vec<Target>,
}

/// Quora question search. Falls back to the built-in queries when `queries`
/// is empty.
pub fn quora_profile(queries: &[String]) -> SourceProfile {
    let targets = if queries.is_empty() {
        QUORA_QUERIES.iter().map(|q| Target::quora_search(q)).collect()
    } else {
        queries.iter().map(|q| Target::quora_search(q)).collect()
    };

    SourceProfile {
        namespace: "Quora",
        collection: "quora_data",
        extractor: Extractor::Quora,
        popup_selector: Some(r#"[aria-label="Close"]"#),
        targets,
    }
}

/// Retailer site pages plus the product listing. `max_pages == 0` skips the
/// listing.
pub fn miniso_site_profile(urls: &[String], max_pages: u32) -> SourceProfile {
    let mut targets: Vec<Target> = if urls.is_empty() {
        MINISO_PAGES.iter().map(|u| Target::page(u)).collect()
    } else {
        urls.iter().map(|u| Target::page(u)).collect()
    };

    if max_pages > 0 {
        targets.push(Target::listing(MINISO_PRODUCT_LISTING, max_pages));
    }

    SourceProfile {
        namespace: "MinisoIndia",
        collection: "miniso_raw_data",
        extractor: Extractor::MinisoSite,
        popup_selector: None,
        targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quora_search_url_encodes_query() {
        assert_eq!(
            quora_search_url("Miniso earbuds"),
            "https://www.quora.com/search?q=Miniso+earbuds&type=question"
        );
    }

    #[test]
    fn quora_profile_defaults_to_builtin_queries() {
        let profile = quora_profile(&[]);
        assert_eq!(profile.targets.len(), QUORA_QUERIES.len());
        assert_eq!(profile.namespace, "Quora");
        assert_eq!(profile.collection, "quora_data");
        assert!(matches!(
            &profile.targets[1],
            Target::Search { query, .. } if query == "Miniso earbuds"
        ));
    }

    #[test]
    fn custom_queries_are_trimmed_and_kept_in_order() {
        let profile = quora_profile(&["  b ".to_string(), "a".to_string()]);
        let queries: Vec<_> = profile
            .targets
            .iter()
            .map(|t| match t {
                Target::Search { query, .. } => query.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(queries, vec!["b", "a"]);
    }

    #[test]
    fn site_profile_appends_capped_listing() {
        let profile = miniso_site_profile(&[], 20);
        assert_eq!(profile.targets.len(), MINISO_PAGES.len() + 1);
        assert_eq!(
            profile.targets.last(),
            Some(&Target::Listing {
                base_url: MINISO_PRODUCT_LISTING.to_string(),
                max_pages: MAX_LISTING_PAGES,
            })
        );
    }

    #[test]
    fn site_profile_without_listing() {
        let profile = miniso_site_profile(&["https://www.minisoindia.com/our-blogs".into()], 0);
        assert_eq!(profile.targets, vec![Target::page("https://www.minisoindia.com/our-blogs")]);
    }

    #[test]
    fn listing_page_urls() {
        assert_eq!(listing_page_url("https://a.com/cat/", 1), "https://a.com/cat/");
        assert_eq!(listing_page_url("https://a.com/cat/", 3), "https://a.com/cat/?page=3");
    }
}
