use meridian_core::traits::CatalogClient;
use meridian_core::{AppError, CatalogNode, HttpConfig};
use reqwest::{Client, Url};

use crate::retry::{with_retries, AttemptError};

/// HTTP client for catalogs published by remote data servers.
///
/// Catalog documents are JSON trees: the root's `children` are the top-level
/// datasets and `catalog_refs` name child catalogs, possibly relative to the
/// document's own URL.
///
/// # Examples
///
/// ```no_run
/// use meridian_client::HttpCatalogClient;
/// use meridian_core::HttpConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpCatalogClient::new(HttpConfig::default())?;
/// let root = client
///     .fetch_catalog("https://esg.example.org/thredds/catalog.json")
///     .await?;
/// println!("{} dataset(s)", root.children.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    config: HttpConfig,
}

impl HttpCatalogClient {
    /// Creates a client with the given timeout, retry policy and user agent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetches and decodes the catalog document at `uri`.
    ///
    /// Server errors, rate limiting and connection failures are retried with
    /// exponential backoff. Client errors and undecodable documents are not.
    ///
    /// # Errors
    ///
    /// Returns `AppError::TransportFailure` if the URL is invalid, the
    /// request keeps failing, or the body is not a catalog document.
    pub async fn fetch_catalog(&self, uri: &str) -> Result<CatalogNode, AppError> {
        let url = parse_catalog_url(uri)?;
        let context = format!("fetching catalog {url}");
        let (target, ctx) = (&url, context.as_str());

        let body =
            with_retries(&self.config, ctx, move || self.get_text(target.clone(), ctx)).await?;

        serde_json::from_str(&body)
            .map_err(|e| AppError::transport(format!("decoding catalog {url}"), e))
    }

    async fn get_text(&self, url: Url, context: &str) -> Result<String, AttemptError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AttemptError::from_reqwest(context, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AttemptError::from_reqwest(context, e))?;

        if !status.is_success() {
            return Err(AttemptError::from_status(context, status, &body));
        }
        Ok(body)
    }
}

impl CatalogClient for HttpCatalogClient {
    async fn fetch(&self, uri: &str) -> Result<CatalogNode, AppError> {
        self.fetch_catalog(uri).await
    }
}

fn parse_catalog_url(uri: &str) -> Result<Url, AppError> {
    let url = Url::parse(uri.trim())
        .map_err(|e| AppError::transport(format!("invalid catalog URL {uri:?}"), e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AppError::transport(
            format!("invalid catalog URL {uri:?}"),
            format!("unsupported scheme {scheme}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client() {
        assert!(HttpCatalogClient::new(HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_parse_catalog_url() {
        let url = parse_catalog_url(" https://esg.example.org/thredds/catalog.json ").unwrap();
        assert_eq!(url.as_str(), "https://esg.example.org/thredds/catalog.json");
    }

    #[test]
    fn test_parse_catalog_url_rejects_invalid() {
        let err = parse_catalog_url("not-a-valid-url").unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("invalid catalog URL"));

        assert!(parse_catalog_url("").is_err());
        assert!(parse_catalog_url("ftp://example.org/catalog.json").is_err());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_fails_without_request() {
        let client = HttpCatalogClient::new(HttpConfig::default()).unwrap();
        let err = client.fetch("file:///tmp/catalog.json").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_catalog_document_decoding() {
        let json = r#"{
            "name": "root",
            "children": [
                {"id": "ds1", "name": "Dataset One", "properties": [{"name": "model", "value": "CCSM"}]}
            ],
            "catalog_refs": ["sub/catalog.json"]
        }"#;

        let root: CatalogNode = serde_json::from_str(json).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].id(), Some("ds1"));
        assert_eq!(root.catalog_refs, vec!["sub/catalog.json"]);
    }
}
