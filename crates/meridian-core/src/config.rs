use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{AppError, RepositoryType};

/// Environment variable overriding the catalogs configuration path.
pub const CATALOGS_CONFIG_ENV: &str = "MERIDIAN_CATALOGS";

/// HTTP client configuration for catalog fetches and index calls.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            user_agent: format!("Meridian/{} (metadata-harvester)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Delay before retry number `attempt` (zero-based), doubling each time.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Catalogs fetched, and records sent, concurrently.
    pub concurrency: usize,
    /// Maximum depth of child catalogs followed; `None` is unlimited.
    pub max_depth: Option<usize>,
    /// Send an explicit commit after a successful publish or unpublish.
    pub commit: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_depth: None,
            commit: true,
        }
    }
}

/// Search index configuration.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub url: String,
    pub rows: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8983/solr/datasets".to_string(),
            rows: 10,
        }
    }
}

/// A catalog listed in the catalogs configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub uri: String,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default)]
    pub repository_type: RepositoryType,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Contents of `catalogs.toml`.
///
/// ```toml
/// [[catalogs]]
/// name = "pcmdi"
/// uri = "https://esg.example.org/thredds/catalog.json"
/// recursive = true
/// repository_type = "thredds"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogsConfig {
    #[serde(default)]
    pub catalogs: Vec<CatalogEntry>,
}

impl CatalogsConfig {
    pub fn enabled_catalogs(&self) -> Vec<&CatalogEntry> {
        self.catalogs.iter().filter(|c| c.enabled).collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&CatalogEntry> {
        self.catalogs.iter().find(|c| c.name == name)
    }
}

fn default_true() -> bool {
    true
}

/// Default location of the catalogs file: `$MERIDIAN_CATALOGS`, or
/// `catalogs.toml` in the platform configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CATALOGS_CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    ProjectDirs::from("", "", "meridian").map(|dirs| dirs.config_dir().join("catalogs.toml"))
}

/// Loads the catalogs configuration from `path`, or from the default path.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if no path can be determined, the file
/// cannot be read, or its contents are not valid TOML for [`CatalogsConfig`].
pub fn load_catalogs_config(path: Option<&Path>) -> Result<CatalogsConfig, AppError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path().ok_or_else(|| {
            AppError::ConfigError("Could not determine configuration directory".to_string())
        })?,
    };

    let content = std::fs::read_to_string(&path).map_err(|e| {
        AppError::ConfigError(format!("Failed to read {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| AppError::ConfigError(format!("Invalid config {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(500));
        assert!(config.user_agent.starts_with("Meridian/"));
    }

    #[test]
    fn test_retry_delay_doubles() {
        let config = HttpConfig::default();
        assert_eq!(config.retry_delay(0), Duration::from_millis(500));
        assert_eq!(config.retry_delay(1), Duration::from_millis(1000));
        assert_eq!(config.retry_delay(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_crawl_config_defaults() {
        let config = CrawlConfig::default();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.max_depth, None);
        assert!(config.commit);
    }

    #[test]
    fn test_index_config_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.url, "http://localhost:8983/solr/datasets");
        assert_eq!(config.rows, 10);
    }

    #[test]
    fn test_load_catalogs_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[catalogs]]
name = "pcmdi"
uri = "https://esg.example.org/thredds/catalog.json"

[[catalogs]]
name = "local-mirror"
uri = "/data/catalogs/root.json"
recursive = false
repository_type = "local"
enabled = false
"#
        )
        .unwrap();

        let config = load_catalogs_config(Some(file.path())).unwrap();
        assert_eq!(config.catalogs.len(), 2);

        let pcmdi = config.find_by_name("pcmdi").unwrap();
        assert!(pcmdi.recursive);
        assert!(pcmdi.enabled);
        assert_eq!(pcmdi.repository_type, RepositoryType::Thredds);

        let mirror = config.find_by_name("local-mirror").unwrap();
        assert!(!mirror.recursive);
        assert_eq!(mirror.repository_type, RepositoryType::Local);

        let enabled: Vec<_> = config
            .enabled_catalogs()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(enabled, vec!["pcmdi"]);
    }

    #[test]
    fn test_load_catalogs_config_errors() {
        let missing = load_catalogs_config(Some(Path::new("/nonexistent/catalogs.toml")));
        assert!(matches!(missing, Err(AppError::ConfigError(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[[catalogs]]\nname = 3").unwrap();
        let invalid = load_catalogs_config(Some(file.path()));
        assert!(matches!(invalid, Err(AppError::ConfigError(_))));
    }
}
