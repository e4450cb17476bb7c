use thiserror::Error;

use crate::access::AccessError;
use crate::cache::CacheError;
use crate::sentiment::ClassifierError;

/// Top-level error for the analytics service. Every variant is recoverable:
/// callers get either a degraded-but-valid result or one of these, never a
/// process-fatal condition.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_errors_convert_transparently() {
        let err = AnalyticsError::from(AccessError::Backend("connection reset".to_owned()));
        assert_eq!(err.to_string(), "data access failure: connection reset");
    }

    #[test]
    fn classifier_errors_convert_transparently() {
        let err = AnalyticsError::from(ClassifierError::Unavailable("model offline".to_owned()));
        assert_eq!(err.to_string(), "classifier unavailable: model offline");
    }
}
