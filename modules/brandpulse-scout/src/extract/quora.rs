use std::sync::LazyLock;

use brandpulse_common::identity::UNKNOWN_TIME;
use brandpulse_common::QuoraQuestion;
use scraper::{Html, Selector};

use super::{absolutize, closest, inner_text, is_tag};
use crate::sources::QUORA_BASE;

static TITLE_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.q-box span").expect("valid selector"));
static VOTER_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span[class*='Voter']").expect("valid selector"));
static ANY_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("valid selector"));
static COMMENTS_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/comments/']").expect("valid selector"));
static TIME_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[aria-label]").expect("valid selector"));

/// Extract question rows from a rendered Quora search page.
///
/// Every `div.q-box span` is a candidate: its text is the title and its
/// nearest enclosing link is the question. Counters and the timestamp are read
/// from the nearest enclosing `div`. Rows without a title or link are dropped.
pub fn extract_questions(html: &str) -> Vec<QuoraQuestion> {
    let doc = Html::parse_document(html);

    doc.select(&TITLE_SPAN)
        .filter_map(|span| {
            let title = inner_text(span);
            if title.is_empty() {
                return None;
            }

            let href = closest(span, is_tag("a"))?.value().attr("href")?;
            let link = absolutize(href, QUORA_BASE)?;

            let container = closest(span, is_tag("div"));
            let text_of = |selector: &Selector| {
                container
                    .and_then(|div| div.select(selector).next())
                    .map(inner_text)
            };

            let upvotes = text_of(&VOTER_SPAN)
                .or_else(|| text_of(&ANY_SPAN))
                .unwrap_or_else(|| "0".to_string());
            let comments = text_of(&COMMENTS_LINK).unwrap_or_else(|| "0".to_string());
            let time = text_of(&TIME_LINK).unwrap_or_else(|| UNKNOWN_TIME.to_string());

            Some(QuoraQuestion {
                title,
                link,
                upvotes,
                comments,
                time,
            })
        })
        .collect()
}
