use meridian_core::traits::IndexClient;
use meridian_core::{AppError, HttpConfig, IndexQuery, RecordSerializer};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use crate::retry::{with_retries, AttemptError};

/// Client for a Solr core's XML update and select handlers.
///
/// Documents are posted to `{base}/update`; queries go to `{base}/select`
/// with `wt=xml`, and the raw response is handed back for parsing.
///
/// # Examples
///
/// ```no_run
/// use meridian_client::SolrIndex;
/// use meridian_core::{HttpConfig, SearchInput, SearchService};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let index = SolrIndex::new("http://localhost:8983/solr/datasets", HttpConfig::default())?;
/// let search = SearchService::new(index);
/// let output = search.query_results(&SearchInput::new().with_text("temperature")).await?;
/// println!("{} match(es)", output.counts);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SolrIndex {
    client: Client,
    base_url: Url,
    config: HttpConfig,
    serializer: RecordSerializer,
}

impl SolrIndex {
    /// Creates a client for the core at `base_url_str`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the URL is invalid or not HTTP(S).
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(base_url_str: &str, config: HttpConfig) -> Result<Self, AppError> {
        let base_url = normalize_base_url(base_url_str)?;
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            config,
            serializer: RecordSerializer::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn update_url(&self) -> Result<Url, AppError> {
        self.base_url
            .join("update")
            .map_err(|e| AppError::ConfigError(format!("Invalid index update URL: {e}")))
    }

    async fn post_update(&self, body: String, context: &str) -> Result<(), AppError> {
        let url = self.update_url()?;
        let (target, body) = (&url, body.as_str());

        with_retries(&self.config, context, move || async move {
            let resp = self
                .client
                .post(target.clone())
                .header(CONTENT_TYPE, "text/xml; charset=utf-8")
                .body(body.to_string())
                .send()
                .await
                .map_err(|e| AttemptError::from_reqwest(context, e))?;

            let status = resp.status();
            if status.is_success() {
                return Ok(());
            }
            let text = resp.text().await.unwrap_or_default();
            Err(AttemptError::from_status(context, status, &text))
        })
        .await
    }
}

impl IndexClient for SolrIndex {
    async fn add(&self, document: &str) -> Result<(), AppError> {
        self.post_update(document.to_string(), "index add").await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let body = self.serializer.delete_document(id)?;
        self.post_update(body, &format!("index delete {id}")).await
    }

    async fn commit(&self) -> Result<(), AppError> {
        self.post_update(self.serializer.commit_document().to_string(), "index commit")
            .await
    }

    async fn select(&self, query: &IndexQuery) -> Result<String, AppError> {
        let url = query.select_url(&self.base_url)?;
        tracing::debug!(%url, "Selecting from index");
        let target = &url;

        with_retries(&self.config, "index select", move || async move {
            let resp = self
                .client
                .get(target.clone())
                .send()
                .await
                .map_err(|e| AttemptError::from_reqwest("index select", e))?;

            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| AttemptError::from_reqwest("index select", e))?;
            if !status.is_success() {
                return Err(AttemptError::from_status("index select", status, &body));
            }
            Ok(body)
        })
        .await
    }
}

/// Parses the core URL, making sure relative joins land below it.
fn normalize_base_url(base_url_str: &str) -> Result<Url, AppError> {
    let mut base = base_url_str.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let url = Url::parse(&base)
        .map_err(|_| AppError::ConfigError(format!("Invalid index URL: {}", base_url_str)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(AppError::ConfigError(format!(
            "Invalid index URL: {}",
            base_url_str
        ))),
    }
}
