use std::collections::HashSet;

use brandpulse_common::{RawRecord, StoredDocument, StoredRecordId};
use chrono::{DateTime, Utc};

/// Records that survived filtering, each paired with its store id. Ids are
/// pairwise distinct and absent from the store at lookup time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRecordSet {
    pub records: Vec<(StoredRecordId, RawRecord)>,
    /// Dropped because the store already holds their id.
    pub already_stored: u32,
    /// Dropped because their primary content was blank.
    pub blank: u32,
    /// Dropped because an earlier record in the batch took the same store id.
    pub collided: u32,
}

impl NewRecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &StoredRecordId> {
        self.records.iter().map(|(id, _)| id)
    }

    /// Persisted form of every record, stamped with `platform`.
    pub fn documents(&self, platform: &str, now: DateTime<Utc>) -> Vec<StoredDocument> {
        self.records
            .iter()
            .map(|(id, record)| StoredDocument::from_record(id.clone(), record, platform, now))
            .collect()
    }
}

/// Keep records whose store id is not in `existing` and whose primary content
/// is non-blank. When two records map to the same store id, the first wins.
pub fn filter_new<'a>(
    records: impl IntoIterator<Item = &'a RawRecord>,
    namespace: &str,
    existing: &HashSet<StoredRecordId>,
) -> NewRecordSet {
    let mut out = NewRecordSet::default();
    let mut taken: HashSet<StoredRecordId> = HashSet::new();

    for record in records {
        if !record.has_content() {
            out.blank += 1;
            continue;
        }
        let id = record.stored_id(namespace);
        if existing.contains(&id) {
            out.already_stored += 1;
            continue;
        }
        if !taken.insert(id.clone()) {
            out.collided += 1;
            continue;
        }
        out.records.push((id, record.clone()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dedupe::dedupe;
    use brandpulse_common::QuoraQuestion;

    fn question(link: &str, title: &str) -> RawRecord {
        QuoraQuestion {
            title: title.into(),
            link: link.into(),
            upvotes: "0".into(),
            comments: "0".into(),
            time: "Unknown".into(),
        }
        .into_record()
        .unwrap()
    }

    #[test]
    fn drops_existing_ids() {
        let set = dedupe(vec![
            question("https://www.quora.com/q1", "A"),
            question("https://www.quora.com/q1", "B"),
            question("https://www.quora.com/q2", "C"),
        ]);
        let existing: HashSet<_> = [StoredRecordId::from("Quora-q1")].into();

        let new = filter_new(&set, "Quora", &existing);

        assert_eq!(new.len(), 1);
        assert_eq!(new.records[0].0.as_str(), "Quora-q2");
        assert_eq!(new.records[0].1.field("title"), "C");
        assert_eq!(new.already_stored, 1);
    }

    #[test]
    fn blank_content_never_survives() {
        let set = dedupe(vec![
            question("https://www.quora.com/q1", "   "),
            question("https://www.quora.com/q2", ""),
        ]);

        let new = filter_new(&set, "Quora", &HashSet::new());
        assert!(new.is_empty());
        assert_eq!(new.blank, 2);
    }

    #[test]
    fn filtering_is_idempotent_once_stored() {
        let set = dedupe(vec![
            question("https://www.quora.com/q1", "A"),
            question("https://www.quora.com/q2", "B"),
        ]);
        let mut existing: HashSet<_> = [StoredRecordId::from("Quora-q1")].into();

        let first = filter_new(&set, "Quora", &existing);
        existing.extend(first.ids().cloned());
        let again = filter_new(first.records.iter().map(|(_, r)| r), "Quora", &existing);

        assert!(again.is_empty());
    }

    #[test]
    fn colliding_store_ids_keep_the_first() {
        // Distinct identity keys, same last path segment.
        let set = dedupe(vec![
            question("https://www.quora.com/q1", "A"),
            question("https://www.quora.com/q1/", "B"),
        ]);
        assert_eq!(set.len(), 2);

        let new = filter_new(&set, "Quora", &HashSet::new());
        assert_eq!(new.len(), 1);
        assert_eq!(new.collided, 1);
        assert_eq!(new.records[0].1.field("title"), "A");
    }

    #[test]
    fn documents_carry_platform() {
        let set = dedupe(vec![question("https://www.quora.com/q1", "A")]);
        let new = filter_new(&set, "Quora", &HashSet::new());

        let docs = new.documents("Quora", Utc::now());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].platform, "Quora");
        assert_eq!(docs[0].record_id.as_str(), "Quora-q1");
        assert_eq!(docs[0].url, "https://www.quora.com/q1");
    }
}
