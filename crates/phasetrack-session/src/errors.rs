//! Session error types.

/// Errors raised while managing a live session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The OS refused to start the ticker thread.
    #[error("failed to spawn ticker thread: {0}")]
    TickerSpawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn spawn_error_has_source() {
        let err = SessionError::TickerSpawn(std::io::Error::other("no threads"));
        assert!(err.to_string().contains("no threads"));
        assert!(err.source().is_some());
    }
}
