use meridian_core::traits::{CatalogClient, CatalogClientFactory};
use meridian_core::{AppError, CatalogNode, HttpConfig, RepositoryType};

use crate::{FileCatalogClient, HttpCatalogClient};

/// Catalog client chosen by repository type.
#[derive(Clone)]
pub enum CatalogTransport {
    Http(HttpCatalogClient),
    File(FileCatalogClient),
}

impl CatalogClient for CatalogTransport {
    async fn fetch(&self, uri: &str) -> Result<CatalogNode, AppError> {
        match self {
            CatalogTransport::Http(client) => client.fetch_catalog(uri).await,
            CatalogTransport::File(client) => client.read_catalog(uri).await,
        }
    }
}

/// Creates HTTP clients for remote repositories and filesystem clients for local ones.
///
/// The HTTP client is built once and shared, so connection pooling spans crawls.
#[derive(Clone)]
pub struct DefaultCatalogClientFactory {
    http: HttpCatalogClient,
}

impl DefaultCatalogClientFactory {
    pub fn new(config: HttpConfig) -> Result<Self, AppError> {
        Ok(Self {
            http: HttpCatalogClient::new(config)?,
        })
    }
}

impl CatalogClientFactory for DefaultCatalogClientFactory {
    type Client = CatalogTransport;

    fn create(&self, repository_type: RepositoryType) -> Result<Self::Client, AppError> {
        Ok(match repository_type {
            RepositoryType::Thredds => CatalogTransport::Http(self.http.clone()),
            RepositoryType::Local => CatalogTransport::File(FileCatalogClient::new()),
        })
    }
}
