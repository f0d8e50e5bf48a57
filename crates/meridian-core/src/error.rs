use thiserror::Error;

/// Boxed error type used to carry the original cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum AppError {
    /// A catalog node is missing its identifier or display name.
    ///
    /// Contained locally: the crawler skips the node and keeps going.
    #[error("Invalid catalog node: {0}")]
    InvalidCatalogNode(String),

    /// A record failed validation before leaving the process.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// An index document could not be turned back into a record.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A catalog fetch or index call failed.
    #[error("Transport failure ({context}): {source}")]
    TransportFailure {
        context: String,
        #[source]
        source: BoxError,
    },

    /// A lookup by unique identifier matched more than one record.
    #[error("Too many results associated with unique identifier {id}: {count}")]
    AmbiguousIdentifier { id: String, count: u64 },

    #[error("Query translation failure: {0}")]
    QueryTranslationFailure(String),

    /// A publish or unpublish call failed. Records already sent are not rolled back.
    #[error("Failed to {operation} {target}: {source}")]
    PublishFailed {
        operation: &'static str,
        target: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("API Client error: {0}")]
    ClientError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl AppError {
    /// Wraps a lower-level failure as a [`AppError::TransportFailure`], keeping the cause.
    pub fn transport<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        AppError::TransportFailure {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns true for failures talking to a catalog or the index.
    pub fn is_transport(&self) -> bool {
        match self {
            AppError::TransportFailure { .. } | AppError::ClientError(_) => true,
            AppError::PublishFailed { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    /// Returns true for structural problems confined to a single catalog node.
    pub fn is_node_local(&self) -> bool {
        matches!(self, AppError::InvalidCatalogNode(_))
    }
}
