// In-memory doubles for the fetch and store seams.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use brandpulse_common::{RawRecord, StoredDocument, StoredRecordId};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FetchError, StoreError};
use crate::fetch::{PageRenderer, RenderRequest, RenderedPage, ScrollPlan, TargetFetcher};
use crate::sources::Target;

// --- Fetcher ---

/// Canned results per target. Targets without an entry yield no records.
#[derive(Default)]
pub struct MockFetcher {
    results: HashMap<String, Option<Vec<RawRecord>>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, target: &Target, records: Vec<RawRecord>) -> Self {
        self.results.insert(target.to_string(), Some(records));
        self
    }

    pub fn fail(mut self, target: &Target) -> Self {
        self.results.insert(target.to_string(), None);
        self
    }

    /// Targets fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetFetcher for MockFetcher {
    async fn fetch_target(&self, target: &Target) -> Result<Vec<RawRecord>, FetchError> {
        let label = target.to_string();
        self.calls.lock().unwrap().push(label.clone());

        match self.results.get(&label) {
            Some(Some(records)) => Ok(records.clone()),
            Some(None) => Err(FetchError::Exhausted {
                target: label.clone(),
                attempts: 1,
                last: Box::new(FetchError::Navigation {
                    url: label,
                    message: "mock failure".into(),
                }),
            }),
            None => Ok(Vec::new()),
        }
    }
}

// --- Renderer ---

/// Serves fixed HTML per URL. Unknown URLs fail navigation.
#[derive(Default)]
pub struct StaticRenderer {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    failures: Mutex<HashMap<String, u32>>,
    cookies: Option<Vec<Value>>,
    calls: Arc<Mutex<Vec<String>>>,
    scrolls: Arc<Mutex<Vec<ScrollPlan>>>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Report `landed` as the final URL whenever `requested` is rendered.
    pub fn redirect(mut self, requested: &str, landed: &str) -> Self {
        self.redirects.insert(requested.to_string(), landed.to_string());
        self
    }

    /// Fail the first `times` navigations to `url`.
    pub fn fail_first(self, url: &str, times: u32) -> Self {
        self.failures.lock().unwrap().insert(url.to_string(), times);
        self
    }

    /// Report these cookies after every navigation.
    pub fn with_cookies(mut self, cookies: Vec<Value>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    /// Handle on the navigation log, usable after the renderer is boxed.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    /// Scroll plan of every navigation, in order.
    pub fn scrolls(&self) -> Arc<Mutex<Vec<ScrollPlan>>> {
        Arc::clone(&self.scrolls)
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
        self.calls.lock().unwrap().push(request.url.to_string());
        self.scrolls.lock().unwrap().push(request.scroll);

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(request.url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Timeout {
                    url: request.url.to_string(),
                    after: request.nav_timeout,
                });
            }
        }

        match self.pages.get(request.url) {
            Some(html) => Ok(RenderedPage {
                url: self
                    .redirects
                    .get(request.url)
                    .cloned()
                    .unwrap_or_else(|| request.url.to_string()),
                html: html.clone(),
                cookies: self.cookies.clone(),
            }),
            None => Err(FetchError::Navigation {
                url: request.url.to_string(),
                message: "no such page".into(),
            }),
        }
    }
}

// --- Store ---

#[derive(Default)]
struct MemoryState {
    opens: u32,
    closes: u32,
    documents: HashMap<String, Vec<StoredDocument>>,
    seeded: HashMap<String, HashSet<StoredRecordId>>,
    refuse_connect: bool,
    fail_lookup: bool,
    fail_insert: bool,
}

impl MemoryState {
    fn contains(&self, collection: &str, id: &StoredRecordId) -> bool {
        self.seeded.get(collection).is_some_and(|ids| ids.contains(id))
            || self
                .documents
                .get(collection)
                .is_some_and(|docs| docs.iter().any(|d| &d.record_id == id))
    }
}

/// Connector and store in one. Clones share state, so a test can keep a
/// handle while the harvester owns the connection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `ids` were stored by an earlier run.
    pub fn seed(self, collection: &str, ids: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .seeded
            .entry(collection.to_string())
            .or_default()
            .extend(ids.iter().map(|id| StoredRecordId::from(*id)));
        self
    }

    pub fn refuse_connect(self) -> Self {
        self.state.lock().unwrap().refuse_connect = true;
        self
    }

    pub fn fail_lookup(self) -> Self {
        self.state.lock().unwrap().fail_lookup = true;
        self
    }

    pub fn fail_insert(self) -> Self {
        self.state.lock().unwrap().fail_insert = true;
        self
    }

    pub fn opens(&self) -> u32 {
        self.state.lock().unwrap().opens
    }

    pub fn closes(&self) -> u32 {
        self.state.lock().unwrap().closes
    }

    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl crate::store::StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn crate::store::DocumentStore>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_connect {
            return Err(StoreError::Connection("connection refused".into()));
        }
        state.opens += 1;
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl crate::store::DocumentStore for MemoryStore {
    async fn existing_ids(
        &self,
        collection: &str,
        ids: &[StoredRecordId],
    ) -> Result<HashSet<StoredRecordId>, StoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_lookup {
            return Err(StoreError::Connection("lookup failed".into()));
        }
        Ok(ids
            .iter()
            .filter(|id| state.contains(collection, id))
            .cloned()
            .collect())
    }

    async fn insert_all(
        &self,
        collection: &str,
        _run_id: Uuid,
        documents: &[StoredDocument],
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_insert {
            return Err(StoreError::Connection("write failed".into()));
        }
        if let Some(dup) = documents
            .iter()
            .find(|d| state.contains(collection, &d.record_id))
        {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "duplicate key {}",
                dup.record_id
            ))));
        }
        state
            .documents
            .entry(collection.to_string())
            .or_default()
            .extend(documents.iter().cloned());
        Ok(documents.len() as u64)
    }

    async fn close(&self) {
        self.state.lock().unwrap().closes += 1;
    }
}
