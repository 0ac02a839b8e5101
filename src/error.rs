//! Wayfarer error types

/// Wayfarer error types
#[derive(Debug, thiserror::Error)]
pub enum WayfarerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external collaborator (credential discovery, admin lookup) did not
    /// answer within its deadline. Reported instead of a hang or a crash so
    /// callers can treat the integration as absent.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// A budgeted upstream call failed for a reason other than local budget
    /// (vendor 4xx, network failure). Carried through
    /// [`with_fallback`](crate::upstream::with_fallback) until every
    /// alternative is exhausted.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// [`with_fallback`](crate::upstream::with_fallback) was called with an
    /// empty alternatives list.
    #[error("no upstream alternatives configured")]
    NoAlternatives,
}

/// Result type alias for wayfarer operations
pub type Result<T> = std::result::Result<T, WayfarerError>;
