//! Command-line definitions for the `meridian` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use meridian_core::{
    CrawlConfig, HttpConfig, IndexConfig, ParserStrategy, RepositoryType, SearchInput, UrlBuilder,
};

#[derive(Parser, Debug)]
#[command(name = "meridian")]
#[command(about = "Publish scientific data catalogs to a search index and query it")]
#[command(version)]
pub struct Config {
    /// Base URL of the search index core
    #[arg(long, env = "SOLR_URL", default_value_t = IndexConfig::default().url, global = true)]
    pub solr_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,

    /// Retries for failed HTTP requests
    #[arg(long, default_value_t = 3, global = true)]
    pub max_retries: u32,

    /// Catalogs fetched, and records sent, concurrently
    #[arg(long, default_value_t = 10, global = true)]
    pub concurrency: usize,

    /// Maximum depth of child catalogs followed
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Do not commit after publishing or unpublishing
    #[arg(long, global = true)]
    pub no_commit: bool,

    /// How catalog nodes are turned into records
    #[arg(long, default_value = "top-level-dataset", global = true)]
    pub parser: ParserStrategy,

    /// How dataset URLs are built
    #[arg(long, default_value = "catalog-url", global = true)]
    pub url_builder: UrlBuilder,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: std::time::Duration::from_secs(self.timeout),
            max_retries: self.max_retries,
            ..Default::default()
        }
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            concurrency: self.concurrency,
            max_depth: self.max_depth,
            commit: !self.no_commit,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish every record derived from a catalog
    Publish(CrawlArgs),
    /// Remove every record derived from a catalog
    Unpublish(CrawlArgs),
    /// Remove records by identifier
    Delete {
        /// Record identifiers
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Search the index
    Search {
        #[command(flatten)]
        query: QueryArgs,
        /// Facets whose value counts should be listed
        #[arg(long = "facet")]
        facets: Vec<String>,
        /// Index of the first result
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Maximum number of results
        #[arg(long, default_value_t = IndexConfig::default().rows)]
        limit: usize,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the distinct values of facets
    Facets {
        /// Facet names
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        query: QueryArgs,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the record with a given identifier
    Show {
        id: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Publish the catalogs listed in the catalogs configuration file
    Batch {
        /// Path to catalogs.toml (default: $MERIDIAN_CATALOGS or the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Publish only the named catalog
        #[arg(long)]
        only: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CrawlArgs {
    /// Catalog URI: an http(s) URL, a file:// URL or a path
    pub uri: String,

    /// Process only this catalog, not the catalogs it references
    #[arg(long)]
    pub no_recursive: bool,

    /// Kind of repository serving the catalog
    #[arg(long, default_value = "thredds")]
    pub repository_type: RepositoryType,
}

#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Free-text query
    #[arg(short = 'q', long)]
    pub text: Option<String>,

    /// Record type, e.g. Dataset or File
    #[arg(long = "type")]
    pub record_type: Option<String>,

    /// Facet constraint as name=value (repeatable)
    #[arg(short = 'c', long = "constraint", value_parser = parse_constraint)]
    pub constraints: Vec<(String, String)>,
}

impl QueryArgs {
    pub fn to_input(&self) -> SearchInput {
        let mut input = SearchInput::new();
        input.text = self.text.clone();
        input.record_type = self.record_type.clone();
        for (name, value) in &self.constraints {
            input.add_constraint(name.as_str(), value.as_str());
        }
        input
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Parses a `name=value` facet constraint.
pub fn parse_constraint(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {s:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing facet name in {s:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}
