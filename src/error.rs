use crate::collab::BackendError;
use crate::ingest::IngestError;

/// Error surfaced by the `pulse` binary: a process exit code plus a message.
///
/// Exit codes:
/// - `2`: usage / local file problems
/// - `4`: the raw source could not be ingested
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::new(4, format!("Failed to load data: {err}"))
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::new(2, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_errors_map_to_data_exit_code() {
        let err: AppError = IngestError::EmptySummary.into();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().starts_with("Failed to load data:"));
    }

    #[test]
    fn backend_errors_are_usage_errors() {
        let err: AppError = BackendError::NotSignedIn.into();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "sign in to vote");
    }
}
