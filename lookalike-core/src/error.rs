use thiserror::Error;

/// Errors raised while decoding or fingerprinting a single image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Transform {variant} failed: {reason}")]
    TransformFailed { variant: String, reason: String },
}

/// Errors raised while retrieving image bytes from a URL.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Image too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl FetchError {
    /// Whether another attempt may succeed.
    ///
    /// Missing and oversized images fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::NetworkError(_))
    }
}

/// Errors raised by the fingerprint scorer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Fingerprint length mismatch: {left} bits vs {right} bits")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid fingerprint encoding: {0}")]
    InvalidEncoding(String),

    #[error("Cannot compare empty fingerprints")]
    Empty,
}

/// Errors raised by a catalog store backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Catalog item not found: {0}")]
    NotFound(String),

    #[error("Catalog I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Catalog backend error: {0}")]
    Backend(String),
}

/// Errors surfaced to callers of a query.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid threshold {0}: must be between 0 and 100")]
    InvalidThreshold(f64),

    #[error("Query image could not be fingerprinted: {0}")]
    QueryImage(#[from] ImageError),

    #[error("Catalog unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Query fingerprinting task failed: {0}")]
    Task(String),
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_fetch_errors() {
        assert!(FetchError::Timeout("http://x/a.jpg".into()).is_transient());
        assert!(FetchError::NetworkError("connection reset".into()).is_transient());
        assert!(!FetchError::NotFound("http://x/a.jpg".into()).is_transient());
        assert!(!FetchError::TooLarge { size: 20, limit: 10 }.is_transient());
    }

    #[test]
    fn test_search_error_wraps_image_error() {
        let err: SearchError = ImageError::Decode("bad magic".into()).into();
        assert!(err.to_string().contains("bad magic"));
        assert!(matches!(err, SearchError::QueryImage(ImageError::Decode(_))));
    }
}
