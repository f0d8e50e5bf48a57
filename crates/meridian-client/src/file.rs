use std::path::PathBuf;

use meridian_core::traits::CatalogClient;
use meridian_core::{AppError, CatalogNode};
use url::Url;

/// Reads catalog documents from the local filesystem.
///
/// Accepts plain paths and `file://` URLs.
#[derive(Debug, Clone, Default)]
pub struct FileCatalogClient;

impl FileCatalogClient {
    pub fn new() -> Self {
        Self
    }

    pub async fn read_catalog(&self, uri: &str) -> Result<CatalogNode, AppError> {
        let path = catalog_path(uri)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::transport(format!("reading catalog {}", path.display()), e))?;

        serde_json::from_str(&content)
            .map_err(|e| AppError::transport(format!("decoding catalog {}", path.display()), e))
    }
}

impl CatalogClient for FileCatalogClient {
    async fn fetch(&self, uri: &str) -> Result<CatalogNode, AppError> {
        self.read_catalog(uri).await
    }
}

/// Maps a catalog URI to a path; `file:` URLs are percent-decoded.
fn catalog_path(uri: &str) -> Result<PathBuf, AppError> {
    let uri = uri.trim();
    if !uri.starts_with("file:") {
        return Ok(PathBuf::from(uri));
    }
    let url =
        Url::parse(uri).map_err(|e| AppError::transport(format!("parsing catalog URL {uri}"), e))?;
    url.to_file_path().map_err(|()| {
        AppError::transport(
            format!("parsing catalog URL {uri}"),
            "not a local file URL".to_string(),
        )
    })
}
