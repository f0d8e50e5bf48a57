//! Crawl statistics and batch publish summaries.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one crawl invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Catalog documents fetched.
    pub catalogs: usize,
    /// Top-level nodes handed to the parser.
    pub nodes: usize,
    /// Records published or unpublished.
    pub records: usize,
    /// Nodes skipped because they were invalid.
    pub skipped: usize,
    /// Catalogs or nodes already seen during this crawl.
    pub revisits: usize,
    /// Child catalogs left unvisited because of cancellation or the depth limit.
    pub pending: usize,
}

/// Outcome of one unit of crawl work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    CatalogFetched,
    NodeParsed,
    RecordProcessed,
    NodeSkipped,
    Revisit,
    Pending,
}

/// Thread-safe counterpart of [`CrawlStats`] shared by concurrent crawl tasks.
#[derive(Debug, Default)]
pub(crate) struct AtomicCrawlStats {
    catalogs: AtomicUsize,
    nodes: AtomicUsize,
    records: AtomicUsize,
    skipped: AtomicUsize,
    revisits: AtomicUsize,
    pending: AtomicUsize,
}

impl AtomicCrawlStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, outcome: CrawlOutcome) {
        self.record_n(outcome, 1);
    }

    pub(crate) fn record_n(&self, outcome: CrawlOutcome, n: usize) {
        let counter = match outcome {
            CrawlOutcome::CatalogFetched => &self.catalogs,
            CrawlOutcome::NodeParsed => &self.nodes,
            CrawlOutcome::RecordProcessed => &self.records,
            CrawlOutcome::NodeSkipped => &self.skipped,
            CrawlOutcome::Revisit => &self.revisits,
            CrawlOutcome::Pending => &self.pending,
        };
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn to_stats(&self) -> CrawlStats {
        CrawlStats {
            catalogs: self.catalogs.load(Ordering::Relaxed),
            nodes: self.nodes.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            revisits: self.revisits.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
        }
    }
}

/// Result of publishing a single configured catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPublishResult {
    pub name: String,
    pub uri: String,
    pub stats: Option<CrawlStats>,
    pub error: Option<String>,
}

impl CatalogPublishResult {
    pub fn success(name: String, uri: String, stats: CrawlStats) -> Self {
        Self {
            name,
            uri,
            stats: Some(stats),
            error: None,
        }
    }

    pub fn failure(name: String, uri: String, error: String) -> Self {
        Self {
            name,
            uri,
            stats: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated outcome of a batch publish over several catalogs.
#[derive(Debug, Clone, Serialize)]
pub struct BatchPublishSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<CatalogPublishResult>,
}

impl Default for BatchPublishSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchPublishSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: CatalogPublishResult) {
        self.results.push(result);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total_catalogs(&self) -> usize {
        self.results.len()
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// Records published across all successful catalogs.
    pub fn total_records(&self) -> usize {
        self.results
            .iter()
            .filter_map(|r| r.stats.as_ref())
            .map(|s| s.records)
            .sum()
    }
}
