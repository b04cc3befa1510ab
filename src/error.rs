use crate::index;

pub type Result<T> = std::result::Result<T, OverlapError>;

/// Errors surfaced to callers of the overlap service.
///
/// `Validation` and `UnsupportedSource` are the caller's fault, everything
/// else is on our side (or the provider's).
#[derive(thiserror::Error, Debug)]
pub enum OverlapError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unsupported index source: {0}")]
    UnsupportedSource(String),

    #[error("Failed to fetch {index_source} index {code} constituents: {cause}")]
    Fetch {
        index_source: index::IndexSource,
        code: String,
        cause: String,
    },

    #[error("Failed to fetch {index_source} index list: {cause}")]
    IndexListFetch {
        index_source: index::IndexSource,
        cause: String,
    },

    #[error("{0}")]
    Internal(String),
}

impl OverlapError {
    /// Stable machine-readable tag, independent of the message wording.
    pub fn kind(&self) -> &'static str {
        match self {
            OverlapError::Validation(_) => "validation",
            OverlapError::UnsupportedSource(_) => "unsupported_source",
            OverlapError::Fetch { .. } | OverlapError::IndexListFetch { .. } => "fetch",
            OverlapError::Internal(_) => "internal",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, OverlapError::Validation(_) | OverlapError::UnsupportedSource(_))
    }

    /// Wraps a provider failure for one index, keeping the whole cause chain.
    pub fn fetch(index_source: index::IndexSource, code: &str, cause: &anyhow::Error) -> Self {
        OverlapError::Fetch {
            index_source,
            code: code.to_string(),
            cause: format!("{:#}", cause),
        }
    }
}
