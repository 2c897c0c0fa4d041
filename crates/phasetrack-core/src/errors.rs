//! Error types for the progress core.

/// Errors surfaced by catalog construction and timing persistence.
///
/// Event ingestion never fails: malformed input is clamped or dropped.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// The step catalog violates one of its construction rules.
    #[error("invalid step catalog: {0}")]
    Catalog(String),

    /// The timing store rejected a read or write.
    #[error("timing store error: {0}")]
    Store(String),

    /// Filesystem failure in a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or incoming JSON could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_message() {
        let err = TrackError::Catalog("duplicate step id \"upload\"".into());
        assert_eq!(
            err.to_string(),
            "invalid step catalog: duplicate step id \"upload\""
        );
    }

    #[test]
    fn io_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: TrackError = io.into();
        assert!(matches!(err, TrackError::Io(_)));
    }

    #[test]
    fn json_converts() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: TrackError = parse.into();
        assert!(err.to_string().starts_with("JSON error"));
    }
}
