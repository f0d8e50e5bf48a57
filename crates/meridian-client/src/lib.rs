//! Meridian Client - catalog and search index transports.
//!
//! - [`HttpCatalogClient`] fetches catalog documents from remote data servers
//! - [`FileCatalogClient`] reads catalog documents from disk
//! - [`DefaultCatalogClientFactory`] picks between them by repository type
//! - [`SolrIndex`] speaks the index update and select protocols

mod factory;
mod file;
mod retry;
mod solr;
mod thredds;

pub use factory::{CatalogTransport, DefaultCatalogClientFactory};
pub use file::FileCatalogClient;
pub use solr::SolrIndex;
pub use thredds::HttpCatalogClient;
