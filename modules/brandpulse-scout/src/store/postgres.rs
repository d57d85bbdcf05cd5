// Postgres-backed document store. One row per (collection, record_id).

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use brandpulse_common::{StoredDocument, StoredRecordId};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::{DocumentStore, StoreConnector};
use crate::error::StoreError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PgConnector {
    database_url: String,
}

impl PgConnector {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl StoreConnector for PgConnector {
    async fn connect(&self) -> Result<Box<dyn DocumentStore>, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(&self.database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = PgDocumentStore::new(pool);
        store.migrate().await?;
        info!("Connected to document store");
        Ok(Box::new(store))
    }
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn existing_ids(
        &self,
        collection: &str,
        ids: &[StoredRecordId],
    ) -> Result<HashSet<StoredRecordId>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let candidates: Vec<&str> = ids.iter().map(StoredRecordId::as_str).collect();
        let found = sqlx::query_scalar::<_, String>(
            "SELECT record_id FROM scraped_documents WHERE collection = $1 AND record_id = ANY($2)",
        )
        .bind(collection)
        .bind(&candidates)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            collection,
            candidates = ids.len(),
            existing = found.len(),
            "Looked up existing ids"
        );
        Ok(found.into_iter().map(StoredRecordId::new).collect())
    }

    async fn insert_all(
        &self,
        collection: &str,
        run_id: Uuid,
        documents: &[StoredDocument],
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for doc in documents {
            let metrics = doc
                .engagement_metrics
                .as_ref()
                .and_then(|m| serde_json::to_value(m).ok());

            let result = sqlx::query(
                r#"
                INSERT INTO scraped_documents
                    (collection, record_id, run_id, platform, content, url, timestamp,
                     title, record_type, html, engagement_metrics, platform_specific, raw_data)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(collection)
            .bind(doc.record_id.as_str())
            .bind(run_id)
            .bind(&doc.platform)
            .bind(&doc.content)
            .bind(&doc.url)
            .bind(&doc.timestamp)
            .bind(&doc.title)
            .bind(&doc.record_type)
            .bind(&doc.html)
            .bind(&metrics)
            .bind(&doc.platform_specific)
            .bind(&doc.raw_data)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("Document store closed");
    }
}
