use std::collections::HashSet;

use async_trait::async_trait;
use brandpulse_common::{StoredDocument, StoredRecordId};
use uuid::Uuid;

use crate::error::StoreError;

/// An open connection to the document store. Obtained from a
/// [`StoreConnector`] once per run and closed once at the end.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The subset of `ids` already present in `collection`.
    async fn existing_ids(
        &self,
        collection: &str,
        ids: &[StoredRecordId],
    ) -> Result<HashSet<StoredRecordId>, StoreError>;

    /// Insert every document. All or nothing; no update path.
    async fn insert_all(
        &self,
        collection: &str,
        run_id: Uuid,
        documents: &[StoredDocument],
    ) -> Result<u64, StoreError>;

    async fn close(&self);
}

#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DocumentStore>, StoreError>;
}
