//! Typed failures for catalog access.

use thiserror::Error;

/// Errors produced by catalog operations.
///
/// The split matters to callers: `NotFound` is surfaced as-is, `Transient`
/// is safe to retry, `Malformed` is a contract violation by the remote
/// service and must not be retried.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The remote id or slug does not exist.
    #[error("{resource} was not found in the catalog")]
    NotFound { resource: String },

    /// Connectivity or timeout problem; the request may be retried.
    #[error("catalog request failed: {message}")]
    Transient { message: String },

    /// The service answered with something outside its contract.
    #[error("malformed catalog response: {message}")]
    Malformed { message: String },
}

impl CatalogError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        CatalogError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        CatalogError::Transient {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        CatalogError::Malformed {
            message: message.into(),
        }
    }

    /// Whether retrying the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Transient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(CatalogError::transient("timed out").is_retryable());
        assert!(!CatalogError::not_found("plugin foo").is_retryable());
        assert!(!CatalogError::malformed("bad json").is_retryable());
    }
}
