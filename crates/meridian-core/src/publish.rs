//! Publishing façade over the catalog crawler and the index.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::crawler::{CrawlAction, CrawlerManager};
use crate::progress::{CrawlEvent, ProgressReporter, SilentReporter};
use crate::traits::{CatalogClientFactory, IndexClient};
use crate::{
    AppError, BatchPublishSummary, CatalogEntry, CatalogParser, CatalogPublishResult, CrawlConfig,
    CrawlStats, RepositoryType,
};

/// Publishes and unpublishes catalog trees, and removes records by id.
///
/// # Example
///
/// ```ignore
/// use meridian_core::{CatalogParser, CrawlConfig, PublishingService, RepositoryType};
///
/// let service = PublishingService::new(factory, index, CatalogParser::default(), CrawlConfig::default());
/// let stats = service
///     .publish("https://esg.example.org/thredds/catalog.json", true, RepositoryType::Thredds)
///     .await?;
/// println!("published {} record(s)", stats.records);
/// ```
pub struct PublishingService<F, I>
where
    F: CatalogClientFactory,
    I: IndexClient,
{
    publisher: CrawlerManager<F, I>,
    unpublisher: CrawlerManager<F, I>,
    index: I,
    commit: bool,
}

impl<F, I> Clone for PublishingService<F, I>
where
    F: CatalogClientFactory + Clone,
    I: IndexClient + Clone,
{
    fn clone(&self) -> Self {
        Self {
            publisher: self.publisher.clone(),
            unpublisher: self.unpublisher.clone(),
            index: self.index.clone(),
            commit: self.commit,
        }
    }
}

impl<F, I> PublishingService<F, I>
where
    F: CatalogClientFactory,
    I: IndexClient,
{
    pub fn new(catalogs: F, index: I, parser: CatalogParser, config: CrawlConfig) -> Self {
        let commit = config.commit;
        Self {
            publisher: CrawlerManager::publisher(
                catalogs.clone(),
                index.clone(),
                parser,
                config.clone(),
            ),
            unpublisher: CrawlerManager::unpublisher(catalogs, index.clone(), parser, config),
            index,
            commit,
        }
    }

    /// Publishes every record derived from the catalog at `uri`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::PublishFailed` wrapping the first fetch, parse or
    /// index failure. Records sent before the failure stay in the index.
    pub async fn publish(
        &self,
        uri: &str,
        recursive: bool,
        repository_type: RepositoryType,
    ) -> Result<CrawlStats, AppError> {
        self.publish_with_progress(
            uri,
            recursive,
            repository_type,
            &SilentReporter,
            &CancellationToken::new(),
        )
        .await
    }

    pub async fn publish_with_progress<R: ProgressReporter>(
        &self,
        uri: &str,
        recursive: bool,
        repository_type: RepositoryType,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<CrawlStats, AppError> {
        self.publisher
            .crawl_with_progress(uri, recursive, repository_type, reporter, cancel)
            .await
            .map_err(|e| failed(CrawlAction::Publish, uri, e))
    }

    /// Removes every record derived from the catalog at `uri`.
    ///
    /// The catalog is fetched and parsed again so the same record ids are
    /// derived as when it was published.
    pub async fn unpublish(
        &self,
        uri: &str,
        recursive: bool,
        repository_type: RepositoryType,
    ) -> Result<CrawlStats, AppError> {
        self.unpublish_with_progress(
            uri,
            recursive,
            repository_type,
            &SilentReporter,
            &CancellationToken::new(),
        )
        .await
    }

    pub async fn unpublish_with_progress<R: ProgressReporter>(
        &self,
        uri: &str,
        recursive: bool,
        repository_type: RepositoryType,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<CrawlStats, AppError> {
        self.unpublisher
            .crawl_with_progress(uri, recursive, repository_type, reporter, cancel)
            .await
            .map_err(|e| failed(CrawlAction::Unpublish, uri, e))
    }

    /// Removes records by identifier without contacting any catalog.
    ///
    /// Issues one delete per id, in order, then a commit if configured.
    /// Returns the number of deletes sent.
    ///
    /// # Errors
    ///
    /// Blank ids are rejected with `AppError::InvalidRecord` before any
    /// delete is sent. Index failures abort the remaining deletes.
    pub async fn unpublish_ids(&self, ids: &[String]) -> Result<usize, AppError> {
        if let Some(pos) = ids.iter().position(|id| id.trim().is_empty()) {
            return Err(AppError::InvalidRecord(format!(
                "blank record id at position {pos}"
            )));
        }

        match self.delete_all(ids).await {
            Ok(n) => {
                info!("Unpublished {} record(s) by id", n);
                Ok(n)
            }
            Err(e) => Err(failed(
                CrawlAction::Unpublish,
                &format!("{} record(s)", ids.len()),
                e,
            )),
        }
    }

    async fn delete_all(&self, ids: &[String]) -> Result<usize, AppError> {
        for id in ids {
            self.index.delete(id).await?;
        }
        if self.commit {
            self.index.commit().await?;
        }
        Ok(ids.len())
    }

    /// Publishes each catalog in turn; a failing catalog does not stop the batch.
    pub async fn batch_publish(&self, entries: &[&CatalogEntry]) -> BatchPublishSummary {
        self.batch_publish_with_progress(entries, &SilentReporter, &CancellationToken::new())
            .await
    }

    pub async fn batch_publish_with_progress<R: ProgressReporter>(
        &self,
        entries: &[&CatalogEntry],
        reporter: &R,
        cancel: &CancellationToken,
    ) -> BatchPublishSummary {
        let total = entries.len();
        let mut summary = BatchPublishSummary::new();
        reporter.report(CrawlEvent::BatchStarted {
            total_catalogs: total,
        });

        for (i, entry) in entries.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Batch cancelled, {} catalog(s) not published", total - i);
                break;
            }

            let result = self
                .publish_with_progress(
                    &entry.uri,
                    entry.recursive,
                    entry.repository_type,
                    reporter,
                    cancel,
                )
                .await;

            match result {
                Ok(stats) => summary.add(CatalogPublishResult::success(
                    entry.name.clone(),
                    entry.uri.clone(),
                    stats,
                )),
                Err(e) => {
                    let message = e.to_string();
                    reporter.report(CrawlEvent::CatalogFailed {
                        catalog_index: i,
                        total_catalogs: total,
                        catalog_name: &entry.name,
                        error: &message,
                    });
                    summary.add(CatalogPublishResult::failure(
                        entry.name.clone(),
                        entry.uri.clone(),
                        message,
                    ));
                }
            }
        }

        summary.finish();
        reporter.report(CrawlEvent::BatchCompleted { summary: &summary });
        summary
    }
}

fn failed(action: CrawlAction, target: &str, source: AppError) -> AppError {
    let operation = match action {
        CrawlAction::Publish => "publish",
        CrawlAction::Unpublish => "unpublish",
    };
    error!(operation, target, error = %source, "Operation failed");
    AppError::PublishFailed {
        operation,
        target: target.to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog, dataset, IndexCall, MockCatalogFactory, MockIndex};

    const ROOT: &str = "http://example.org/thredds/catalog.json";

    fn service(
        factory: &MockCatalogFactory,
        index: &MockIndex,
    ) -> PublishingService<MockCatalogFactory, MockIndex> {
        PublishingService::new(
            factory.clone(),
            index.clone(),
            CatalogParser::default(),
            CrawlConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_publish_then_unpublish_same_ids() {
        let factory = MockCatalogFactory::new().with_catalog(
            ROOT,
            catalog(vec![dataset("ds1", "One"), dataset("ds2", "Two")]),
        );
        let index = MockIndex::new();
        let service = service(&factory, &index);

        service.publish(ROOT, true, RepositoryType::Thredds).await.unwrap();
        service.unpublish(ROOT, true, RepositoryType::Thredds).await.unwrap();

        let mut added = index.added_ids();
        let mut deleted = index.deleted_ids();
        added.sort();
        deleted.sort();
        assert_eq!(added, deleted);
        assert_eq!(factory.created(), vec![RepositoryType::Thredds; 2]);
    }

    #[tokio::test]
    async fn test_publish_failure_is_wrapped() {
        let factory = MockCatalogFactory::new();
        let index = MockIndex::new();

        let err = service(&factory, &index)
            .publish("http://example.org/missing.json", false, RepositoryType::Thredds)
            .await
            .unwrap_err();

        match &err {
            AppError::PublishFailed {
                operation, target, ..
            } => {
                assert_eq!(*operation, "publish");
                assert_eq!(target, "http://example.org/missing.json");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_unpublish_ids_issues_one_delete_per_id() {
        let factory = MockCatalogFactory::new();
        let index = MockIndex::new();

        let n = service(&factory, &index)
            .unpublish_ids(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(n, 2);
        assert_eq!(
            index.calls(),
            vec![
                IndexCall::Delete("a".to_string()),
                IndexCall::Delete("b".to_string()),
                IndexCall::Commit,
            ]
        );
        assert!(factory.fetched().is_empty());
        assert!(factory.created().is_empty());
    }

    #[tokio::test]
    async fn test_unpublish_ids_rejects_blank_id() {
        let index = MockIndex::new();
        let err = service(&MockCatalogFactory::new(), &index)
            .unpublish_ids(&["a".to_string(), " ".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidRecord(_)));
        assert!(index.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unpublish_ids_empty_list_only_commits() {
        let index = MockIndex::new();
        let n = service(&MockCatalogFactory::new(), &index)
            .unpublish_ids(&[])
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(index.calls(), vec![IndexCall::Commit]);
    }

    #[tokio::test]
    async fn test_batch_publish_continues_after_failure() {
        let factory = MockCatalogFactory::new()
            .with_catalog("http://a.org/catalog.json", catalog(vec![dataset("a1", "A")]))
            .with_catalog(
                "http://c.org/catalog.json",
                catalog(vec![dataset("c1", "C1"), dataset("c2", "C2")]),
            );
        let index = MockIndex::new();
        let entries = [
            CatalogEntry {
                name: "a".to_string(),
                uri: "http://a.org/catalog.json".to_string(),
                recursive: true,
                repository_type: RepositoryType::Thredds,
                enabled: true,
            },
            CatalogEntry {
                name: "b".to_string(),
                uri: "http://b.org/catalog.json".to_string(),
                recursive: true,
                repository_type: RepositoryType::Thredds,
                enabled: true,
            },
            CatalogEntry {
                name: "c".to_string(),
                uri: "http://c.org/catalog.json".to_string(),
                recursive: false,
                repository_type: RepositoryType::Local,
                enabled: true,
            },
        ];
        let refs: Vec<&CatalogEntry> = entries.iter().collect();

        let summary = service(&factory, &index).batch_publish(&refs).await;

        assert_eq!(summary.total_catalogs(), 3);
        assert_eq!(summary.successful_count(), 2);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.total_records(), 3);
        assert!(!summary.results[1].is_success());
        assert!(summary.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_batch_publish_cancelled_before_start() {
        let factory = MockCatalogFactory::new()
            .with_catalog(ROOT, catalog(vec![dataset("ds1", "One")]));
        let index = MockIndex::new();
        let entry = CatalogEntry {
            name: "root".to_string(),
            uri: ROOT.to_string(),
            recursive: true,
            repository_type: RepositoryType::Thredds,
            enabled: true,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = service(&factory, &index)
            .batch_publish_with_progress(&[&entry], &SilentReporter, &cancel)
            .await;

        assert_eq!(summary.total_catalogs(), 0);
        assert!(factory.fetched().is_empty());
    }
}
