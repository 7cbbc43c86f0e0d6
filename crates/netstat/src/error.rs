//! Error types for connection collection.

use std::io;

/// Result type for collection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by [`Error::SourceUnavailable`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while collecting connection counts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The snapshot source could not produce a connection list.
    ///
    /// Fatal to the current cycle: nothing is emitted.
    #[error("error getting net connections info: {context}: {source}")]
    SourceUnavailable {
        /// What the source was doing when it failed.
        context: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// The sink rejected a record.
    #[error("sink error: {source}")]
    Sink {
        /// The underlying write failure.
        #[source]
        source: BoxError,
    },

    /// I/O error outside of a snapshot (e.g. reading a config file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a source error from any underlying failure.
    pub fn source_unavailable(
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::SourceUnavailable {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create a sink error from any underlying failure.
    pub fn sink(source: impl Into<BoxError>) -> Self {
        Self::Sink {
            source: source.into(),
        }
    }

    /// Add context to this error.
    ///
    /// Plain I/O errors become [`Error::SourceUnavailable`] with the given
    /// context; source errors get the context prepended. Other errors are
    /// returned unchanged.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Io(e) => Self::source_unavailable(operation, e),
            Self::SourceUnavailable { context, source } => Self::SourceUnavailable {
                context: format!("{}: {}", operation.into(), context),
                source,
            },
            other => other,
        }
    }

    /// Check if the snapshot source failed.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }

    /// Check if this is a permission error anywhere in the cause chain.
    pub fn is_permission_denied(&self) -> bool {
        self.io_error()
            .is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied)
    }

    /// Check if this is a "not found" error anywhere in the cause chain.
    pub fn is_not_found(&self) -> bool {
        self.io_error()
            .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
    }

    /// Get the underlying I/O error, if there is one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Io(e) => Some(e),
            Self::SourceUnavailable { source, .. } | Self::Sink { source } => {
                source.downcast_ref::<io::Error>()
            }
            _ => None,
        }
    }
}
