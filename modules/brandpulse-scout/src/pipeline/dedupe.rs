use std::collections::HashSet;

use brandpulse_common::RawRecord;

/// Records with pairwise-distinct identity keys, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeduplicatedSet {
    records: Vec<RawRecord>,
}

impl DeduplicatedSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, identity_key: &str) -> Option<&RawRecord> {
        self.records.iter().find(|r| r.identity_key == identity_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a DeduplicatedSet {
    type Item = &'a RawRecord;
    type IntoIter = std::slice::Iter<'a, RawRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Collapse records sharing an identity key. The first occurrence wins; later
/// duplicates are dropped whole, never merged.
pub fn dedupe(records: impl IntoIterator<Item = RawRecord>) -> DeduplicatedSet {
    let mut seen = HashSet::new();
    let records = records
        .into_iter()
        .filter(|r| seen.insert(r.identity_key.clone()))
        .collect();
    DeduplicatedSet { records }
}
