//! Trait definitions for external collaborators.
//!
//! The crawler and the façades only talk to catalogs and to the search index
//! through these traits, so tests can substitute in-memory implementations
//! and the concrete transports live in `meridian-client`.
//!
//! # Example
//!
//! ```
//! use meridian_core::traits::IndexClient;
//! use meridian_core::{query, AppError, IndexQuery, SearchInput, SearchOutput};
//!
//! async fn count_datasets<I: IndexClient>(index: &I) -> Result<u64, AppError> {
//!     let input = SearchInput::new().with_type("Dataset").with_limit(0);
//!     let raw = index.select(&IndexQuery::from_input(&input)?).await?;
//!     let output: SearchOutput = query::parse_response(&raw)?;
//!     Ok(output.counts)
//! }
//! ```

use std::future::Future;

use crate::{AppError, CatalogNode, IndexQuery, RepositoryType};

/// Client able to fetch catalog documents.
pub trait CatalogClient: Send + Sync + Clone {
    /// Fetches the catalog at `uri` and returns its root node.
    ///
    /// # Errors
    ///
    /// Transport and decoding problems are reported as
    /// `AppError::TransportFailure`.
    fn fetch(&self, uri: &str) -> impl Future<Output = Result<CatalogNode, AppError>> + Send;
}

/// Factory for catalog clients.
///
/// Separate from [`CatalogClient`] so the repository type can pick the
/// transport at call time.
pub trait CatalogClientFactory: Send + Sync + Clone {
    /// The type of catalog client this factory creates.
    type Client: CatalogClient;

    /// Creates a client for the given kind of repository.
    fn create(&self, repository_type: RepositoryType) -> Result<Self::Client, AppError>;
}

/// Client for the search index update and query protocols.
///
/// Implementations must tolerate concurrent calls; the index server orders
/// the writes.
pub trait IndexClient: Send + Sync + Clone {
    /// Adds or replaces one serialized record document.
    fn add(&self, document: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Removes the record with the given identifier.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Makes pending updates visible to searches.
    fn commit(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Runs a query and returns the raw response document.
    fn select(&self, query: &IndexQuery) -> impl Future<Output = Result<String, AppError>> + Send;
}
