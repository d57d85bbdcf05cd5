use std::sync::LazyLock;

use brandpulse_common::{BlockType, SiteBlock};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{absolutize, closest, has_class, inner_text};
use crate::sources::MINISO_HOME;

/// Blog and home-page blocks shorter than this are layout noise.
const MIN_BLOCK_CHARS: usize = 20;

static ABOUT_PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".tab-pane#brand_profile p").expect("valid selector"));
static STORE_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".store_locator").expect("valid selector"));
static STORE_OPTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#storelocation option").expect("valid selector"));
static SCRIPTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid selector"));
static STRONG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("strong").expect("valid selector"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));
static BLOG_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, .blog-post, .post, div").expect("valid selector"));
static HOME_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".category, .banner, .section").expect("valid selector"));
static PRODUCT_BOXES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".all-products-box").expect("valid selector"));
static PRODUCT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".shop-title a").expect("valid selector"));
static ANY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));

static STORE_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"store\['(\d+)'\]='([^']+)'").expect("valid regex"));

/// Extract content blocks from one page of the retailer's site. The selector
/// set is chosen from `page_url`; pages matching none of them yield nothing.
pub fn extract_blocks(
    html: &str,
    page_url: &str,
    source_url: &str,
    scraped_at: DateTime<Utc>,
) -> Vec<SiteBlock> {
    let doc = Html::parse_document(html);
    let block = |block_type: BlockType, content: String, html: String| SiteBlock {
        block_type,
        content,
        html,
        source_url: source_url.to_string(),
        scraped_at,
    };

    let mut blocks = Vec::new();

    if page_url.contains("about-miniso") {
        for p in doc.select(&ABOUT_PARAGRAPHS) {
            let content = inner_text(p);
            if !content.is_empty() {
                blocks.push(block(BlockType::General, content, p.html()));
            }
        }
    }

    if page_url.contains("store-locator") {
        for el in doc.select(&STORE_BLOCKS) {
            let (name, details) = store_name_and_details(el);
            if !name.is_empty() || !details.is_empty() {
                blocks.push(block(
                    BlockType::Location,
                    format!("{name}\n{details}"),
                    el.html(),
                ));
            }
        }

        for option in doc.select(&STORE_OPTIONS) {
            let name = inner_text(option);
            if !name.is_empty() {
                blocks.push(block(BlockType::Location, name, option.html()));
            }
        }

        for (id, map_url) in store_map_entries(&doc) {
            let store_el = Selector::parse(&format!(r#".storeloc[for="{id}"]"#))
                .ok()
                .and_then(|sel| doc.select(&sel).next())
                .and_then(|label| closest(label, has_class("store_locator")));

            let (name, details) = store_el.map(store_name_and_details).unwrap_or_default();
            blocks.push(block(
                BlockType::Location,
                format!("{name}\n{details}\nMap: {map_url}"),
                store_el.map(|el| el.html()).unwrap_or_default(),
            ));
        }
    }

    if page_url.contains("our-blogs") {
        for el in doc.select(&BLOG_BLOCKS) {
            let content = inner_text(el);
            if content.chars().count() > MIN_BLOCK_CHARS {
                blocks.push(block(BlockType::Blog, content, el.html()));
            }
        }
    }

    if is_home(page_url) {
        for el in doc.select(&HOME_BLOCKS) {
            let content = inner_text(el);
            if content.chars().count() > MIN_BLOCK_CHARS {
                blocks.push(block(BlockType::General, content, el.html()));
            }
        }
    }

    debug!(page_url, blocks = blocks.len(), "Extracted site blocks");
    blocks
}

/// Extract product cards from one page of a product listing. Each card becomes
/// a `product` block whose content is `{"name","url"}` JSON.
///
/// Hrefs resolve against `page_url`; `source_url` is the requested listing
/// page and is what the block's identity is keyed on.
pub fn extract_products(
    html: &str,
    page_url: &str,
    source_url: &str,
    scraped_at: DateTime<Utc>,
) -> Vec<SiteBlock> {
    let doc = Html::parse_document(html);

    doc.select(&PRODUCT_BOXES)
        .filter_map(|card| {
            let name = card.select(&PRODUCT_TITLE).next().map(inner_text)?;
            let href = card.select(&ANY_LINK).next()?.value().attr("href")?;
            let url = absolutize(href, page_url)?;
            if name.is_empty() {
                return None;
            }
            Some(SiteBlock {
                block_type: BlockType::Product,
                content: serde_json::json!({ "name": name, "url": url }).to_string(),
                html: String::new(),
                source_url: source_url.to_string(),
                scraped_at,
            })
        })
        .collect()
}

/// Whether the listing page links to page `next_page`.
pub fn has_next_page(html: &str, next_page: u32) -> bool {
    let doc = Html::parse_document(html);
    Selector::parse(&format!(r#"a[href*="?page={next_page}"]"#))
        .map(|sel| doc.select(&sel).next().is_some())
        .unwrap_or(false)
}

fn is_home(page_url: &str) -> bool {
    page_url.trim_end_matches('/') == MINISO_HOME.trim_end_matches('/')
}

fn store_name_and_details(el: ElementRef<'_>) -> (String, String) {
    let name = el.select(&STRONG).next().map(inner_text).unwrap_or_default();
    let details = el
        .select(&PARAGRAPH)
        .map(inner_text)
        .collect::<Vec<_>>()
        .join("\n");
    (name, details)
}

/// `store['<id>']='<map url>'` assignments found in inline scripts.
fn store_map_entries(doc: &Html) -> Vec<(String, String)> {
    doc.select(&SCRIPTS)
        .flat_map(|script| {
            let text = script.text().collect::<String>();
            STORE_ENTRY_RE
                .captures_iter(&text)
                .map(|c| (c[1].to_string(), c[2].to_string()))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn about_page_paragraphs() {
        let html = r#"
            <div class="tab-pane" id="brand_profile">
              <p>MINISO is a global value retailer.</p>
              <p>  </p>
              <p>Founded in 2013.</p>
            </div>
            <p>Outside the profile tab</p>
        "#;
        let url = "https://www.minisoindia.com/about-miniso";
        let blocks = extract_blocks(html, url, url, now());

        let contents: Vec<_> = blocks.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents, vec!["MINISO is a global value retailer.", "Founded in 2013."]);
        assert!(blocks.iter().all(|b| b.block_type == BlockType::General));
        assert!(blocks[0].html.starts_with("<p>"));
    }

    #[test]
    fn store_locator_blocks_options_and_script_entries() {
        let html = r#"
            <div class="store_locator">
              <label class="storeloc" for="17"></label>
              <strong>Phoenix Marketcity</strong>
              <p>Ground Floor</p>
              <p>Mumbai</p>
            </div>
            <select id="storelocation">
              <option>Mumbai</option>
              <option>  </option>
            </select>
            <script>var store = []; store['17']='https://maps.example/17';</script>
        "#;
        let url = "https://www.minisoindia.com/store-locator";
        let blocks = extract_blocks(html, url, url, now());
        let contents: Vec<_> = blocks.iter().map(|b| b.content.as_str()).collect();

        assert_eq!(
            contents,
            vec![
                "Phoenix Marketcity\nGround Floor\nMumbai",
                "Mumbai",
                "Phoenix Marketcity\nGround Floor\nMumbai\nMap: https://maps.example/17",
            ]
        );
        assert!(blocks.iter().all(|b| b.block_type == BlockType::Location));
        assert!(blocks[2].html.contains("store_locator"));
    }

    #[test]
    fn script_entry_without_block_keeps_map_url() {
        let html = r#"<script>store['99']='https://maps.example/99';</script>"#;
        let url = "https://www.minisoindia.com/store-locator";
        let blocks = extract_blocks(html, url, url, now());

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "\n\nMap: https://maps.example/99");
        assert!(blocks[0].html.is_empty());
    }

    #[test]
    fn blog_blocks_need_more_than_twenty_chars() {
        let html = r#"
            <article>Five ways to organise your desk this spring</article>
            <div>Too short</div>
        "#;
        let url = "https://www.minisoindia.com/our-blogs";
        let blocks = extract_blocks(html, url, url, now());

        assert!(blocks
            .iter()
            .any(|b| b.content == "Five ways to organise your desk this spring"));
        assert!(blocks.iter().all(|b| b.content.chars().count() > MIN_BLOCK_CHARS));
        assert!(blocks.iter().all(|b| b.block_type == BlockType::Blog));
    }

    #[test]
    fn home_page_matches_exact_url_only() {
        let html = r#"<div class="banner">New arrivals for the festive season</div>"#;

        let home = extract_blocks(html, "https://www.minisoindia.com/", MINISO_HOME, now());
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].block_type, BlockType::General);

        let other = extract_blocks(html, "https://www.minisoindia.com/offers", MINISO_HOME, now());
        assert!(other.is_empty());
    }

    #[test]
    fn source_url_is_the_requested_url() {
        let html = r#"<div class="tab-pane" id="brand_profile"><p>Profile</p></div>"#;
        let blocks = extract_blocks(
            html,
            "https://www.minisoindia.com/about-miniso?ref=nav",
            "https://www.minisoindia.com/about-miniso",
            now(),
        );
        assert_eq!(blocks[0].source_url, "https://www.minisoindia.com/about-miniso");
    }

    #[test]
    fn products_from_listing_page() {
        let html = r#"
            <div class="all-products-box">
              <a href="/product/plush-bear"><img src="bear.png"></a>
              <div class="shop-title"><a href="/product/plush-bear">Plush Bear</a></div>
            </div>
            <div class="all-products-box">
              <div class="shop-title"><a>   </a></div>
            </div>
            <a href="?page=2">Next</a>
        "#;
        let page = "https://www.minisoindia.com/category/top-categories/daily-life-products/";
        let products = extract_products(html, page, page, now());

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].block_type, BlockType::Product);
        assert_eq!(
            products[0].content,
            r#"{"name":"Plush Bear","url":"https://www.minisoindia.com/product/plush-bear"}"#
        );
        assert!(has_next_page(html, 2));
        assert!(!has_next_page(html, 3));
    }

    #[test]
    fn product_source_url_ignores_redirects() {
        let html = r#"
            <div class="all-products-box">
              <div class="shop-title"><a href="plush-bear">Plush Bear</a></div>
            </div>
        "#;
        let requested = "https://www.minisoindia.com/category/toys/?page=2";
        let landed = "https://www.minisoindia.com/category/toys/index.html?page=2&utm_source=x";
        let products = extract_products(html, landed, requested, now());

        assert_eq!(products[0].source_url, requested);
        assert!(products[0]
            .content
            .contains("https://www.minisoindia.com/category/toys/plush-bear"));
    }
}
