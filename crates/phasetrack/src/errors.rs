//! Error handling and exit codes.

use phasetrack_core::constants::exit_codes;
use phasetrack_core::TrackError;

/// Errors ending a replay.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The event stream could not be opened or read.
    #[error("input error: {0}")]
    Input(String),

    /// Invalid flags or environment.
    #[error("configuration error: {0}")]
    Config(String),

    /// Interrupted by the user.
    #[error("canceled")]
    Canceled,

    /// The tracked job reported a failure.
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error(transparent)]
    Track(#[from] TrackError),
}

/// Map an error to the process exit code.
#[must_use]
pub fn handle_error(err: &AppError) -> i32 {
    match err {
        AppError::Input(_) => exit_codes::ERROR_INPUT,
        AppError::Config(_) => exit_codes::ERROR_CONFIG,
        AppError::Canceled => exit_codes::ERROR_CANCELED,
        AppError::JobFailed(_) => exit_codes::ERROR_GENERIC,
        AppError::Track(TrackError::Store(_)) => exit_codes::ERROR_STORE,
        AppError::Track(TrackError::Io(_) | TrackError::Json(_)) => exit_codes::ERROR_INPUT,
        AppError::Track(TrackError::Catalog(_)) => exit_codes::ERROR_CONFIG,
    }
}

/// Exit code for any error reaching `main`.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<AppError>()
        .map_or(exit_codes::ERROR_GENERIC, handle_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(handle_error(&AppError::Canceled), 130);
        assert_eq!(handle_error(&AppError::Input("gone".into())), 2);
        assert_eq!(
            handle_error(&AppError::Track(TrackError::Store("ro".into()))),
            3
        );
        assert_eq!(handle_error(&AppError::Config("bad".into())), 4);
        assert_eq!(handle_error(&AppError::JobFailed("x".into())), 1);
    }

    #[test]
    fn anyhow_downcast() {
        let err = anyhow::Error::new(AppError::Canceled);
        assert_eq!(exit_code(&err), 130);
        let other = anyhow::anyhow!("something else");
        assert_eq!(exit_code(&other), 1);
    }
}
