//! In-memory catalog and index doubles for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::traits::{CatalogClient, CatalogClientFactory, IndexClient};
use crate::{AppError, CatalogNode, IndexQuery, Record, RecordSerializer, RepositoryType};

pub(crate) fn dataset(id: &str, name: &str) -> CatalogNode {
    CatalogNode {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

pub(crate) fn catalog(children: Vec<CatalogNode>) -> CatalogNode {
    CatalogNode {
        name: Some("root".to_string()),
        children,
        ..Default::default()
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockCatalogFactory {
    catalogs: Arc<Mutex<HashMap<String, CatalogNode>>>,
    fetched: Arc<Mutex<Vec<String>>>,
    created: Arc<Mutex<Vec<RepositoryType>>>,
}

impl MockCatalogFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_catalog(self, uri: &str, node: CatalogNode) -> Self {
        self.catalogs.lock().unwrap().insert(uri.to_string(), node);
        self
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub(crate) fn created(&self) -> Vec<RepositoryType> {
        self.created.lock().unwrap().clone()
    }
}

impl CatalogClient for MockCatalogFactory {
    async fn fetch(&self, uri: &str) -> Result<CatalogNode, AppError> {
        self.fetched.lock().unwrap().push(uri.to_string());
        self.catalogs
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| AppError::transport(format!("fetching {uri}"), "HTTP 404".to_string()))
    }
}

impl CatalogClientFactory for MockCatalogFactory {
    type Client = MockCatalogFactory;

    fn create(&self, repository_type: RepositoryType) -> Result<Self::Client, AppError> {
        self.created.lock().unwrap().push(repository_type);
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IndexCall {
    Add(String),
    Delete(String),
    Commit,
    Select(Vec<(&'static str, String)>),
}

#[derive(Clone, Default)]
pub(crate) struct MockIndex {
    calls: Arc<Mutex<Vec<IndexCall>>>,
    responses: Arc<Mutex<VecDeque<String>>>,
    fail: bool,
}

impl MockIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a transport error.
    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Queues a raw select response; selects without a queued response see no matches.
    pub(crate) fn with_response(self, xml: &str) -> Self {
        self.responses.lock().unwrap().push_back(xml.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&IndexCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn added_records(&self) -> Vec<Record> {
        let serializer = RecordSerializer::new();
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                IndexCall::Add(doc) => Some(serializer.deserialize_str(&doc).unwrap()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn added_ids(&self) -> Vec<String> {
        self.added_records()
            .iter()
            .map(|r| r.id().to_string())
            .collect()
    }

    pub(crate) fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                IndexCall::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: IndexCall) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::transport("index", "HTTP 503".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl IndexClient for MockIndex {
    async fn add(&self, document: &str) -> Result<(), AppError> {
        self.push(IndexCall::Add(document.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.push(IndexCall::Delete(id.to_string()))
    }

    async fn commit(&self) -> Result<(), AppError> {
        self.push(IndexCall::Commit)
    }

    async fn select(&self, query: &IndexQuery) -> Result<String, AppError> {
        self.push(IndexCall::Select(query.to_params()))?;
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                r#"<response><result name="response" numFound="0" start="0"/></response>"#
                    .to_string()
            }))
    }
}
