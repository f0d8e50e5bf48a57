//! Progress reporting for crawl operations.
//!
//! This module provides a trait-based abstraction for reporting progress during
//! publish and unpublish crawls, keeping logging and UI updates out of the
//! crawler itself.

use crate::crawler::CrawlAction;
use crate::{BatchPublishSummary, CrawlStats};

/// Events emitted while crawling.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    /// Batch publish starting.
    BatchStarted {
        /// Total number of catalogs to publish.
        total_catalogs: usize,
    },

    /// Crawl of one catalog tree starting.
    CrawlStarted {
        action: CrawlAction,
        uri: &'a str,
        recursive: bool,
    },

    /// A catalog document was fetched.
    CatalogFetched {
        uri: &'a str,
        /// Depth below the crawl root (0 for the root catalog).
        depth: usize,
        /// Number of top-level datasets in the document.
        datasets: usize,
    },

    /// A node was skipped because it was invalid.
    NodeSkipped { uri: &'a str, reason: &'a str },

    /// A catalog or node already seen during this crawl was skipped.
    RevisitSkipped { target: &'a str },

    /// Records derived from one node were published or unpublished.
    RecordsProcessed {
        action: CrawlAction,
        node_id: &'a str,
        count: usize,
    },

    /// Child catalogs were left unvisited.
    CrawlStopped {
        /// Number of child catalogs not fetched.
        pending: usize,
        reason: &'a str,
    },

    /// Crawl of one catalog tree completed.
    CrawlCompleted {
        action: CrawlAction,
        uri: &'a str,
        stats: &'a CrawlStats,
    },

    /// Single catalog in a batch failed.
    CatalogFailed {
        /// Zero-based index of the catalog in the batch.
        catalog_index: usize,
        total_catalogs: usize,
        catalog_name: &'a str,
        error: &'a str,
    },

    /// Batch publish completed.
    BatchCompleted {
        summary: &'a BatchPublishSummary,
    },
}

/// Trait for reporting crawl progress.
///
/// The default implementation does nothing, which suits library usage.
///
/// # Example
///
/// ```
/// use meridian_core::progress::{CrawlEvent, ProgressReporter};
///
/// struct MyReporter;
///
/// impl ProgressReporter for MyReporter {
///     fn report(&self, event: CrawlEvent<'_>) {
///         if let CrawlEvent::CatalogFetched { uri, .. } = event {
///             println!("Fetched: {}", uri);
///         }
///     }
/// }
/// ```
pub trait ProgressReporter: Send + Sync {
    /// Called when a crawl event occurs.
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// A no-op reporter that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// A reporter that logs events using the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        use tracing::{debug, error, info, warn};

        match event {
            CrawlEvent::BatchStarted { total_catalogs } => {
                info!("Starting batch publish of {} catalog(s)", total_catalogs);
            }
            CrawlEvent::CrawlStarted {
                action,
                uri,
                recursive,
            } => {
                info!(%action, recursive, "Crawling {}", uri);
            }
            CrawlEvent::CatalogFetched {
                uri,
                depth,
                datasets,
            } => {
                info!(depth, "Fetched {} ({} dataset(s))", uri, datasets);
            }
            CrawlEvent::NodeSkipped { uri, reason } => {
                warn!(catalog = uri, "Skipping invalid node: {}", reason);
            }
            CrawlEvent::RevisitSkipped { target } => {
                debug!("Already visited, skipping: {}", target);
            }
            CrawlEvent::RecordsProcessed {
                action,
                node_id,
                count,
            } => {
                debug!(%action, node = node_id, "{} record(s)", count);
            }
            CrawlEvent::CrawlStopped { pending, reason } => {
                warn!("Crawl stopped ({}): {} child catalog(s) not visited", reason, pending);
            }
            CrawlEvent::CrawlCompleted { action, uri, stats } => {
                info!(
                    "{} of {} complete: {} catalog(s), {} record(s), {} skipped node(s)",
                    action, uri, stats.catalogs, stats.records, stats.skipped
                );
            }
            CrawlEvent::CatalogFailed {
                catalog_index,
                total_catalogs,
                catalog_name,
                error,
            } => {
                error!(
                    "[Catalog {}/{}] {} failed: {}",
                    catalog_index + 1,
                    total_catalogs,
                    catalog_name,
                    error
                );
            }
            CrawlEvent::BatchCompleted { summary } => {
                info!(
                    "Batch complete: {} catalog(s), {} record(s) ({} successful, {} failed)",
                    summary.total_catalogs(),
                    summary.total_records(),
                    summary.successful_count(),
                    summary.failed_count()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_reporter_does_nothing() {
        let reporter = SilentReporter;
        reporter.report(CrawlEvent::BatchStarted { total_catalogs: 5 });
    }

    #[test]
    fn test_tracing_reporter_handles_all_events() {
        let reporter = TracingReporter;
        let stats = CrawlStats {
            catalogs: 2,
            records: 10,
            ..Default::default()
        };
        let summary = BatchPublishSummary::new();

        reporter.report(CrawlEvent::BatchStarted { total_catalogs: 2 });
        reporter.report(CrawlEvent::CrawlStarted {
            action: CrawlAction::Publish,
            uri: "http://example.com/catalog.json",
            recursive: true,
        });
        reporter.report(CrawlEvent::CatalogFetched {
            uri: "http://example.com/catalog.json",
            depth: 0,
            datasets: 3,
        });
        reporter.report(CrawlEvent::NodeSkipped {
            uri: "http://example.com/catalog.json",
            reason: "Dataset ID cannot be null",
        });
        reporter.report(CrawlEvent::RevisitSkipped {
            target: "http://example.com/catalog.json",
        });
        reporter.report(CrawlEvent::RecordsProcessed {
            action: CrawlAction::Unpublish,
            node_id: "ds1",
            count: 1,
        });
        reporter.report(CrawlEvent::CrawlStopped {
            pending: 4,
            reason: "cancelled",
        });
        reporter.report(CrawlEvent::CrawlCompleted {
            action: CrawlAction::Publish,
            uri: "http://example.com/catalog.json",
            stats: &stats,
        });
        reporter.report(CrawlEvent::CatalogFailed {
            catalog_index: 1,
            total_catalogs: 2,
            catalog_name: "broken",
            error: "connection refused",
        });
        reporter.report(CrawlEvent::BatchCompleted { summary: &summary });
    }
}
