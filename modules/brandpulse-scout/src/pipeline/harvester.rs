use brandpulse_common::{RawRecord, StoredRecordId};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::dedupe::dedupe;
use super::filter::filter_new;
use super::stats::HarvestStats;
use crate::error::PipelineError;
use crate::fetch::TargetFetcher;
use crate::sources::SourceProfile;
use crate::store::{DocumentStore, StoreConnector};

/// How a run ended. All three are successful runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No target produced any record; the store write was skipped.
    NothingFound,
    /// Everything found was already stored or blank.
    NothingNew,
    Stored(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub outcome: RunOutcome,
    pub stats: HarvestStats,
}

/// One run of one source profile: fetch every target in order, dedupe,
/// drop what the store already holds, insert the rest.
pub struct Harvester<'a> {
    profile: &'a SourceProfile,
    fetcher: &'a dyn TargetFetcher,
    connector: &'a dyn StoreConnector,
    run_id: Uuid,
}

impl<'a> Harvester<'a> {
    pub fn new(
        profile: &'a SourceProfile,
        fetcher: &'a dyn TargetFetcher,
        connector: &'a dyn StoreConnector,
    ) -> Self {
        Self {
            profile,
            fetcher,
            connector,
            run_id: Uuid::new_v4(),
        }
    }

    /// Run to completion. The store connection is opened before the first
    /// target and closed after the last step, whatever the outcome.
    pub async fn run(&self) -> Result<HarvestReport, PipelineError> {
        if self.profile.targets.is_empty() {
            return Err(PipelineError::Source(format!(
                "profile {} has no targets",
                self.profile.namespace
            )));
        }

        info!(
            run_id = %self.run_id,
            platform = self.profile.namespace,
            collection = self.profile.collection,
            targets = self.profile.targets.len(),
            "Harvest started"
        );

        let store = self.connector.connect().await?;
        let result = self.run_with(store.as_ref()).await;
        store.close().await;
        result
    }

    async fn run_with(&self, store: &dyn DocumentStore) -> Result<HarvestReport, PipelineError> {
        let mut stats = HarvestStats::default();
        let records = self.fetch_all(&mut stats).await;

        if records.is_empty() {
            info!("No records found");
            return Ok(HarvestReport {
                outcome: RunOutcome::NothingFound,
                stats,
            });
        }

        let unique = dedupe(records);
        stats.records_unique = unique.len() as u32;
        info!(count = unique.len(), "Deduplicated records");

        let candidates: Vec<StoredRecordId> = unique
            .iter()
            .filter(|r| r.has_content())
            .map(|r| r.stored_id(self.profile.namespace))
            .collect();
        let existing = store
            .existing_ids(self.profile.collection, &candidates)
            .await?;

        let new = filter_new(&unique, self.profile.namespace, &existing);
        stats.already_stored = new.already_stored;
        stats.blank = new.blank;
        stats.collided = new.collided;

        if new.is_empty() {
            info!(collection = self.profile.collection, "No new records to store");
            return Ok(HarvestReport {
                outcome: RunOutcome::NothingNew,
                stats,
            });
        }

        let documents = new.documents(self.profile.namespace, Utc::now());
        let stored = store
            .insert_all(self.profile.collection, self.run_id, &documents)
            .await?;
        stats.stored = stored;
        info!(collection = self.profile.collection, count = stored, "Stored new records");

        Ok(HarvestReport {
            outcome: RunOutcome::Stored(stored),
            stats,
        })
    }

    /// Fetch every target in order. A failed target is logged and skipped.
    async fn fetch_all(&self, stats: &mut HarvestStats) -> Vec<RawRecord> {
        let mut records = Vec::new();

        for target in &self.profile.targets {
            match self.fetcher.fetch_target(target).await {
                Ok(found) => {
                    stats.targets_ok += 1;
                    info!(target_label = %target, count = found.len(), "Target done");
                    records.extend(found);
                }
                Err(e) => {
                    stats.targets_failed += 1;
                    warn!(target_label = %target, error = %e, "Target failed, skipping");
                }
            }
        }

        stats.records_fetched = records.len() as u32;
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::quora_profile;
    use crate::testing::{MemoryStore, MockFetcher};
    use brandpulse_common::QuoraQuestion;

    fn question(link: &str, title: &str) -> RawRecord {
        QuoraQuestion {
            title: title.into(),
            link: link.into(),
            upvotes: "3".into(),
            comments: "1".into(),
            time: "Unknown".into(),
        }
        .into_record()
        .unwrap()
    }

    #[tokio::test]
    async fn failed_target_does_not_stop_the_run() {
        let profile = quora_profile(&["first".to_string(), "second".to_string()]);
        let fetcher = MockFetcher::new()
            .fail(&profile.targets[0])
            .on(&profile.targets[1], vec![question("https://www.quora.com/q2", "C")]);
        let store = MemoryStore::new();

        let report = Harvester::new(&profile, &fetcher, &store).run().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Stored(1));
        assert_eq!(report.stats.targets_failed, 1);
        assert_eq!(report.stats.targets_ok, 1);
        assert_eq!(store.closes(), 1);
    }

    #[tokio::test]
    async fn every_unique_record_is_accounted_for() {
        let profile = quora_profile(&["Miniso".to_string()]);
        let fetcher = MockFetcher::new().on(
            &profile.targets[0],
            vec![
                question("https://www.quora.com/q1", "A"),
                question("https://www.quora.com/q1/", "A again"),
                question("https://www.quora.com/q2", "B"),
                question("https://www.quora.com/q3", " "),
                question("https://www.quora.com/q4", "D"),
            ],
        );
        let store = MemoryStore::new().seed("quora_data", &["Quora-q2"]);

        let report = Harvester::new(&profile, &fetcher, &store).run().await.unwrap();
        let stats = &report.stats;

        assert_eq!(report.outcome, RunOutcome::Stored(2));
        assert_eq!(stats.collided, 1);
        assert_eq!(stats.already_stored, 1);
        assert_eq!(stats.blank, 1);
        assert_eq!(
            stats.records_unique as u64,
            stats.stored + (stats.already_stored + stats.blank + stats.collided) as u64
        );
    }

    #[tokio::test]
    async fn empty_profile_is_a_configuration_error() {
        let mut profile = quora_profile(&[]);
        profile.targets.clear();
        let store = MemoryStore::new();

        let result = Harvester::new(&profile, &MockFetcher::new(), &store).run().await;
        assert!(matches!(result, Err(PipelineError::Source(_))));
        assert_eq!(store.opens(), 0);
    }
}
