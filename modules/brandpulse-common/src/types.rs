use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::identity;

// --- Raw records ---

/// Which extractor produced a record. Decides the primary content field and
/// how the record is shaped when persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    QuoraQuestion,
    SiteBlock,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuoraQuestion => write!(f, "quora_question"),
            Self::SiteBlock => write!(f, "site_block"),
        }
    }
}

/// One extracted item before deduplication.
///
/// Only built through the typed constructors in [`crate::identity`], which
/// refuse items without a usable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub kind: RecordKind,
    pub identity_key: String,
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    /// Field value, or `""` when the extractor did not produce it.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// The record's primary content: the question title for Quora, the block
    /// text (falling back to its HTML) for site blocks.
    pub fn content(&self) -> &str {
        match self.kind {
            RecordKind::QuoraQuestion => self.field("title"),
            RecordKind::SiteBlock => {
                let content = self.field("content");
                if content.trim().is_empty() {
                    self.field("html")
                } else {
                    content
                }
            }
        }
    }

    pub fn has_content(&self) -> bool {
        !self.content().trim().is_empty()
    }

    /// Durable store id for this record under a source namespace.
    pub fn stored_id(&self, namespace: &str) -> StoredRecordId {
        identity::stored_record_id(self, namespace)
    }
}

// --- Store identifiers ---

/// Key the document store uses to recognise previously persisted records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredRecordId(String);

impl StoredRecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoredRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoredRecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// --- Persisted documents ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub upvotes: i64,
    pub comments: i64,
    pub shares: i64,
    pub likes: i64,
    pub follows: i64,
}

/// A record mapped into the shape written to the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub record_id: StoredRecordId,
    pub platform: String,
    pub content: String,
    pub url: String,
    pub timestamp: String,
    pub title: Option<String>,
    pub record_type: Option<String>,
    pub html: Option<String>,
    pub engagement_metrics: Option<EngagementMetrics>,
    pub platform_specific: serde_json::Value,
    pub raw_data: serde_json::Value,
}

impl StoredDocument {
    /// Map a record into its persisted form. `now` stands in for a Quora
    /// timestamp the page reported as unknown.
    pub fn from_record(
        id: StoredRecordId,
        record: &RawRecord,
        platform: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let raw_data = serde_json::to_value(&record.fields)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));

        match record.kind {
            RecordKind::QuoraQuestion => {
                let time = record.field("time");
                let timestamp = if time.is_empty() || time == identity::UNKNOWN_TIME {
                    now.to_rfc3339_opts(SecondsFormat::Millis, true)
                } else {
                    time.to_string()
                };
                Self {
                    record_id: id,
                    platform: platform.to_string(),
                    content: record.content().to_string(),
                    url: record.field("link").to_string(),
                    timestamp,
                    title: Some(record.field("title").to_string()),
                    record_type: None,
                    html: None,
                    engagement_metrics: Some(EngagementMetrics {
                        upvotes: leading_int(record.field("upvotes")),
                        comments: leading_int(record.field("comments")),
                        ..Default::default()
                    }),
                    platform_specific: serde_json::json!({}),
                    raw_data,
                }
            }
            RecordKind::SiteBlock => Self {
                record_id: id,
                platform: platform.to_string(),
                content: record.field("content").to_string(),
                url: record.field("source_url").to_string(),
                timestamp: record.field("timestamp").to_string(),
                title: None,
                record_type: Some(record.field("type").to_string()),
                html: Some(record.field("html").to_string()),
                engagement_metrics: None,
                platform_specific: serde_json::json!({}),
                raw_data,
            },
        }
    }
}

/// Parse the leading integer of a counter label ("12 upvotes" -> 12,
/// "1.2K" -> 1). Anything without leading digits counts as 0.
pub fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{BlockType, QuoraQuestion, SiteBlock};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn leading_int_matches_counter_labels() {
        assert_eq!(leading_int("12"), 12);
        assert_eq!(leading_int("  7 upvotes"), 7);
        assert_eq!(leading_int("1.2K"), 1);
        assert_eq!(leading_int("-3"), -3);
        assert_eq!(leading_int("Upvote"), 0);
        assert_eq!(leading_int(""), 0);
    }

    #[test]
    fn quora_document_substitutes_unknown_time() {
        let record = QuoraQuestion {
            title: "Is Miniso good?".into(),
            link: "https://www.quora.com/Is-Miniso-good".into(),
            upvotes: "4 upvotes".into(),
            comments: "2".into(),
            time: "Unknown".into(),
        }
        .into_record()
        .unwrap();

        let id = record.stored_id("Quora");
        let doc = StoredDocument::from_record(id, &record, "Quora", fixed_now());

        assert_eq!(doc.record_id.as_str(), "Quora-Is-Miniso-good");
        assert_eq!(doc.content, "Is Miniso good?");
        assert_eq!(doc.title.as_deref(), Some("Is Miniso good?"));
        assert_eq!(doc.url, "https://www.quora.com/Is-Miniso-good");
        assert_eq!(doc.timestamp, "2025-03-01T12:00:00.000Z");
        let metrics = doc.engagement_metrics.unwrap();
        assert_eq!(metrics.upvotes, 4);
        assert_eq!(metrics.comments, 2);
        assert_eq!(metrics.shares, 0);
        assert_eq!(doc.raw_data["time"], "Unknown");
    }

    #[test]
    fn quora_document_keeps_reported_time() {
        let record = QuoraQuestion {
            title: "Where is Miniso from?".into(),
            link: "https://www.quora.com/Where-is-Miniso-from".into(),
            upvotes: "0".into(),
            comments: "0".into(),
            time: "3y".into(),
        }
        .into_record()
        .unwrap();

        let id = record.stored_id("Quora");
        let doc = StoredDocument::from_record(id, &record, "Quora", fixed_now());
        assert_eq!(doc.timestamp, "3y");
    }

    #[test]
    fn site_document_carries_type_and_html() {
        let record = SiteBlock {
            block_type: BlockType::Location,
            content: "Phoenix Mall\nGround floor".into(),
            html: "<div class=\"store_locator\">...</div>".into(),
            source_url: "https://www.minisoindia.com/store-locator".into(),
            scraped_at: fixed_now(),
        }
        .into_record()
        .unwrap();

        let doc = StoredDocument::from_record(
            record.stored_id("MinisoIndia"),
            &record,
            "MinisoIndia",
            fixed_now(),
        );

        assert_eq!(doc.record_type.as_deref(), Some("location"));
        assert_eq!(doc.url, "https://www.minisoindia.com/store-locator");
        assert_eq!(doc.timestamp, "2025-03-01T12:00:00.000Z");
        assert!(doc.html.unwrap().contains("store_locator"));
        assert!(doc.engagement_metrics.is_none());
        assert_eq!(doc.raw_data["type"], "location");
    }

    #[test]
    fn site_content_falls_back_to_html() {
        let record = SiteBlock {
            block_type: BlockType::General,
            content: "   ".into(),
            html: "<p>banner</p>".into(),
            source_url: "https://www.minisoindia.com/".into(),
            scraped_at: fixed_now(),
        }
        .into_record()
        .unwrap();

        assert_eq!(record.content(), "<p>banner</p>");
        assert!(record.has_content());
    }
}
