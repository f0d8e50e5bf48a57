//! Meridian Core - record model, catalog parsing, crawling and index queries.
//!
//! Transports for catalogs and the search index are abstracted behind the
//! traits in [`traits`]; concrete implementations live in `meridian-client`.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod progress;
pub mod publish;
pub mod query;
pub mod search;
pub mod serializer;
pub mod stats;
pub mod traits;
pub mod xml;

#[cfg(test)]
mod testing;

pub use catalog::CatalogNode;
pub use config::{
    load_catalogs_config, CatalogEntry, CatalogsConfig, CrawlConfig, HttpConfig, IndexConfig,
};
pub use crawler::{CrawlAction, CrawlerManager};
pub use error::AppError;
pub use models::{
    Facet, FacetValue, Field, LookupOutcome, Record, RepositoryType, SearchInput, SearchOutput,
};
pub use parser::{CatalogParser, ParsedNode, ParserStrategy, UrlBuilder};
pub use progress::{CrawlEvent, ProgressReporter, SilentReporter, TracingReporter};
pub use publish::PublishingService;
pub use query::IndexQuery;
pub use search::SearchService;
pub use serializer::RecordSerializer;
pub use stats::{BatchPublishSummary, CatalogPublishResult, CrawlStats};
pub use traits::{CatalogClient, CatalogClientFactory, IndexClient};
