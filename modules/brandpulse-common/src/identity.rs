// Identity derivation. One typed constructor per record kind; each is the
// only place that decides what "the same content" means for that kind.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::types::{RawRecord, RecordKind, StoredRecordId};

/// Placeholder the Quora page uses when a question has no link.
pub const MISSING_LINK: &str = "N/A";
/// Placeholder for a question whose timestamp could not be read.
pub const UNKNOWN_TIME: &str = "Unknown";

/// A question row scraped from Quora search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoraQuestion {
    pub title: String,
    pub link: String,
    pub upvotes: String,
    pub comments: String,
    pub time: String,
}

impl QuoraQuestion {
    /// The question link, or `None` when it is blank or a placeholder.
    pub fn identity_key(&self) -> Option<&str> {
        let link = self.link.trim();
        (!link.is_empty() && link != MISSING_LINK).then_some(link)
    }

    pub fn into_record(self) -> Option<RawRecord> {
        let identity_key = self.identity_key()?.to_string();
        let fields = BTreeMap::from([
            ("title".to_string(), self.title),
            ("link".to_string(), identity_key.clone()),
            ("upvotes".to_string(), self.upvotes),
            ("comments".to_string(), self.comments),
            ("time".to_string(), self.time),
        ]);
        Some(RawRecord {
            kind: RecordKind::QuoraQuestion,
            identity_key,
            fields,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    General,
    Location,
    Blog,
    Product,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Location => "location",
            Self::Blog => "blog",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content block scraped from a page of the retailer's site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteBlock {
    pub block_type: BlockType,
    pub content: String,
    pub html: String,
    /// The URL that was requested, not the one the browser ended up on.
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
}

impl SiteBlock {
    /// `{source_url}-{type}-{content or html}`. `None` without a source URL.
    pub fn identity_key(&self) -> Option<String> {
        let url = self.source_url.trim();
        if url.is_empty() {
            return None;
        }
        let body = if self.content.is_empty() {
            &self.html
        } else {
            &self.content
        };
        Some(format!("{url}-{}-{body}", self.block_type))
    }

    pub fn into_record(self) -> Option<RawRecord> {
        let identity_key = self.identity_key()?;
        let fields = BTreeMap::from([
            ("type".to_string(), self.block_type.as_str().to_string()),
            ("content".to_string(), self.content),
            ("html".to_string(), self.html),
            ("source_url".to_string(), self.source_url.trim().to_string()),
            (
                "timestamp".to_string(),
                self.scraped_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        ]);
        Some(RawRecord {
            kind: RecordKind::SiteBlock,
            identity_key,
            fields,
        })
    }
}

/// Derive the durable store id for a record under `namespace`.
///
/// Quora ids use the last path segment of the question link. Site ids use the
/// last path segment of the source URL plus a short hash of the identity key,
/// so the same block always lands on the same id.
pub fn stored_record_id(record: &RawRecord, namespace: &str) -> StoredRecordId {
    match record.kind {
        RecordKind::QuoraQuestion => {
            let slug = last_path_segment(&record.identity_key);
            if slug.is_empty() {
                StoredRecordId::new(format!("{namespace}-{}", short_hash(&record.identity_key)))
            } else {
                StoredRecordId::new(format!("{namespace}-{slug}"))
            }
        }
        RecordKind::SiteBlock => {
            let slug = last_path_segment(record.field("source_url"));
            let hash = short_hash(&record.identity_key);
            if slug.is_empty() {
                StoredRecordId::new(format!("{namespace}-{hash}"))
            } else {
                StoredRecordId::new(format!("{namespace}-{slug}-{hash}"))
            }
        }
    }
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
/// Empty for a bare origin.
pub fn last_path_segment(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        return parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or("")
            .to_string();
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_string()
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}
