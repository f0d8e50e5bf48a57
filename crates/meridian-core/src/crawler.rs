//! Catalog crawler shared by publishing and unpublishing.
//!
//! A crawl fetches the catalog at a URI, parses each top-level dataset with
//! the configured [`CatalogParser`], and applies the manager's action to
//! every derived record: publishing sends the serialized document to the
//! index, unpublishing deletes the record by id. With `recursive` set, child
//! catalogs referenced from the tree are crawled level by level, each level
//! fetched concurrently.
//!
//! Catalog URIs and node ids are tracked per crawl, so cyclic catalog graphs
//! terminate and a dataset reachable through several catalogs is processed
//! once.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::parser::CatalogParser;
use crate::progress::{CrawlEvent, ProgressReporter, SilentReporter};
use crate::serializer::RecordSerializer;
use crate::stats::{AtomicCrawlStats, CrawlOutcome};
use crate::traits::{CatalogClient, CatalogClientFactory, IndexClient};
use crate::{AppError, CrawlConfig, CrawlStats, Record, RepositoryType};

/// What a crawler does with the records it derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlAction {
    Publish,
    Unpublish,
}

impl fmt::Display for CrawlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlAction::Publish => f.write_str("publish"),
            CrawlAction::Unpublish => f.write_str("unpublish"),
        }
    }
}

/// Walks remote catalogs and publishes or unpublishes the records found.
///
/// # Type Parameters
///
/// * `F` - Catalog client factory (e.g. `DefaultCatalogClientFactory`)
/// * `I` - Index client (e.g. `SolrIndex`)
pub struct CrawlerManager<F, I>
where
    F: CatalogClientFactory,
    I: IndexClient,
{
    action: CrawlAction,
    catalogs: F,
    index: I,
    parser: CatalogParser,
    serializer: RecordSerializer,
    config: CrawlConfig,
}

impl<F, I> Clone for CrawlerManager<F, I>
where
    F: CatalogClientFactory + Clone,
    I: IndexClient + Clone,
{
    fn clone(&self) -> Self {
        Self {
            action: self.action,
            catalogs: self.catalogs.clone(),
            index: self.index.clone(),
            parser: self.parser,
            serializer: self.serializer,
            config: self.config.clone(),
        }
    }
}

impl<F, I> CrawlerManager<F, I>
where
    F: CatalogClientFactory,
    I: IndexClient,
{
    pub fn new(
        action: CrawlAction,
        catalogs: F,
        index: I,
        parser: CatalogParser,
        config: CrawlConfig,
    ) -> Self {
        Self {
            action,
            catalogs,
            index,
            parser,
            serializer: RecordSerializer::new(),
            config,
        }
    }

    /// Crawler that adds every derived record to the index.
    pub fn publisher(catalogs: F, index: I, parser: CatalogParser, config: CrawlConfig) -> Self {
        Self::new(CrawlAction::Publish, catalogs, index, parser, config)
    }

    /// Crawler that deletes every derived record from the index.
    pub fn unpublisher(catalogs: F, index: I, parser: CatalogParser, config: CrawlConfig) -> Self {
        Self::new(CrawlAction::Unpublish, catalogs, index, parser, config)
    }

    /// Crawls the catalog at `uri` without progress reporting or cancellation.
    pub async fn crawl(
        &self,
        uri: &str,
        recursive: bool,
        repository_type: RepositoryType,
    ) -> Result<CrawlStats, AppError> {
        self.crawl_with_progress(
            uri,
            recursive,
            repository_type,
            &SilentReporter,
            &CancellationToken::new(),
        )
        .await
    }

    /// Crawls the catalog at `uri`, reporting progress and honouring `cancel`.
    ///
    /// Cancellation lets the catalogs already being processed finish; child
    /// catalogs not yet started are counted as pending instead of fetched.
    /// The call still returns the stats gathered so far.
    ///
    /// # Errors
    ///
    /// Any fetch, parse (other than invalid nodes) or index failure aborts
    /// the crawl. Records already sent to the index are not rolled back.
    pub async fn crawl_with_progress<R: ProgressReporter>(
        &self,
        uri: &str,
        recursive: bool,
        repository_type: RepositoryType,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<CrawlStats, AppError> {
        let client = self.catalogs.create(repository_type)?;
        reporter.report(CrawlEvent::CrawlStarted {
            action: self.action,
            uri,
            recursive,
        });

        let state = CrawlState {
            stats: AtomicCrawlStats::new(),
            seen_nodes: Mutex::new(HashSet::new()),
            cancel,
        };
        let mut visited: HashSet<String> = HashSet::from([uri.to_string()]);
        let mut frontier = vec![uri.to_string()];
        let mut depth = 0usize;

        loop {
            let outcomes: Vec<Option<Vec<String>>> = stream::iter(frontier.iter())
                .map(|catalog_uri| self.crawl_catalog(&client, catalog_uri, depth, &state, reporter))
                .buffer_unordered(self.config.concurrency.max(1))
                .try_collect()
                .await?;

            let mut pending = outcomes.iter().filter(|o| o.is_none()).count();
            let mut next = Vec::new();
            if recursive {
                for child in outcomes.into_iter().flatten().flatten() {
                    if visited.insert(child.clone()) {
                        next.push(child);
                    } else {
                        state.stats.record(CrawlOutcome::Revisit);
                        reporter.report(CrawlEvent::RevisitSkipped { target: &child });
                    }
                }
            }

            let stop_reason = if cancel.is_cancelled() {
                Some("cancelled")
            } else if !next.is_empty() && self.config.max_depth.is_some_and(|max| depth >= max) {
                Some("depth limit reached")
            } else {
                None
            };
            if let Some(reason) = stop_reason {
                pending += next.len();
                if pending > 0 {
                    state.stats.record_n(CrawlOutcome::Pending, pending);
                    reporter.report(CrawlEvent::CrawlStopped { pending, reason });
                }
                break;
            }
            if next.is_empty() {
                break;
            }

            frontier = next;
            depth += 1;
        }

        if self.config.commit {
            self.index.commit().await?;
        }

        let stats = state.stats.to_stats();
        reporter.report(CrawlEvent::CrawlCompleted {
            action: self.action,
            uri,
            stats: &stats,
        });
        Ok(stats)
    }

    /// Processes one catalog document and returns its resolved child-catalog URIs.
    ///
    /// Child catalogs not yet started when the crawl is cancelled return `None`.
    async fn crawl_catalog<C, R>(
        &self,
        client: &C,
        uri: &str,
        depth: usize,
        state: &CrawlState<'_>,
        reporter: &R,
    ) -> Result<Option<Vec<String>>, AppError>
    where
        C: CatalogClient,
        R: ProgressReporter,
    {
        if depth > 0 && state.cancel.is_cancelled() {
            return Ok(None);
        }

        let stats = &state.stats;
        let root = client.fetch(uri).await?;
        stats.record(CrawlOutcome::CatalogFetched);
        reporter.report(CrawlEvent::CatalogFetched {
            uri,
            depth,
            datasets: root.children.len(),
        });

        for node in &root.children {
            let id = node.id();
            if let Some(id) = id {
                if state.is_seen(id)? {
                    stats.record(CrawlOutcome::Revisit);
                    reporter.report(CrawlEvent::RevisitSkipped { target: id });
                    continue;
                }
            }

            stats.record(CrawlOutcome::NodeParsed);
            let parsed = match self.parser.parse(uri, node) {
                Ok(parsed) => parsed,
                Err(e) if e.is_node_local() => {
                    skip_node(uri, &e, stats, reporter);
                    continue;
                }
                Err(e) => return Err(e),
            };
            // Another catalog of this level may have claimed the id meanwhile.
            if let Some(id) = id {
                if !state.mark_seen(id)? {
                    stats.record(CrawlOutcome::Revisit);
                    reporter.report(CrawlEvent::RevisitSkipped { target: id });
                    continue;
                }
            }
            for warning in &parsed.warnings {
                skip_node(uri, warning, stats, reporter);
            }

            let count = parsed.records.len();
            let _: Vec<()> = stream::iter(parsed.records.iter())
                .map(|record| self.apply(record))
                .buffer_unordered(self.config.concurrency.max(1))
                .try_collect()
                .await?;

            stats.record_n(CrawlOutcome::RecordProcessed, count);
            reporter.report(CrawlEvent::RecordsProcessed {
                action: self.action,
                node_id: node.id().unwrap_or_default(),
                count,
            });
        }

        Ok(Some(
            root.all_catalog_refs()
                .into_iter()
                .map(|href| resolve_catalog_ref(uri, href))
                .collect(),
        ))
    }

    async fn apply(&self, record: &Record) -> Result<(), AppError> {
        match self.action {
            CrawlAction::Publish => {
                let document = self.serializer.serialize(record, false)?;
                self.index.add(&document).await
            }
            CrawlAction::Unpublish => self.index.delete(record.id()).await,
        }
    }
}

/// Per-crawl bookkeeping shared by the catalogs of a level.
struct CrawlState<'a> {
    stats: AtomicCrawlStats,
    seen_nodes: Mutex<HashSet<String>>,
    cancel: &'a CancellationToken,
}

impl CrawlState<'_> {
    fn is_seen(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.seen_nodes()?.contains(id))
    }

    /// Records `id` as processed; false if it already was.
    fn mark_seen(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.seen_nodes()?.insert(id.to_string()))
    }

    fn seen_nodes(&self) -> Result<MutexGuard<'_, HashSet<String>>, AppError> {
        self.seen_nodes
            .lock()
            .map_err(|_| AppError::Generic("crawl node registry lock poisoned".to_string()))
    }
}

fn skip_node<R: ProgressReporter>(
    uri: &str,
    error: &AppError,
    stats: &AtomicCrawlStats,
    reporter: &R,
) {
    tracing::debug!(catalog = uri, error = %error, "Skipping catalog node");
    stats.record(CrawlOutcome::NodeSkipped);
    let reason = error.to_string();
    reporter.report(CrawlEvent::NodeSkipped {
        uri,
        reason: &reason,
    });
}

/// Resolves a child-catalog reference against the URI of the catalog declaring it.
///
/// Absolute URLs are returned unchanged; relative references are joined to
/// URL bases, or to the parent directory of filesystem paths.
pub fn resolve_catalog_ref(base: &str, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    if let Ok(base_url) = Url::parse(base) {
        if let Ok(joined) = base_url.join(href) {
            return joined.to_string();
        }
    }
    match Path::new(base).parent() {
        Some(dir) if Path::new(href).is_relative() => dir.join(href).to_string_lossy().into_owned(),
        _ => href.to_string(),
    }
}
