use sdds_core::SddsError;
use thiserror::Error;

/// Errors returned by the handle API
#[derive(Error, Debug)]
pub enum BindingError {
    /// Malformed call shape
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Index out of range, or no session open at that index
    #[error("Unknown dataset handle {0}")]
    UnknownHandle(usize),

    /// Field lookup miss
    #[error("Name not found: {0}")]
    NameNotFound(String),

    /// A dynamic value cannot be stored under the requested type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Duplicate or invalid field name
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    /// Failure reported by the storage engine
    #[error("{0}")]
    StorageEngine(#[source] SddsError),

    /// Explicit fatal report
    #[error("Fatal: {0}")]
    Fatal(String),
}

/// Classification of a [`BindingError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArguments,
    UnknownHandle,
    NameNotFound,
    TypeMismatch,
    SchemaConflict,
    StorageEngine,
    Fatal,
}

impl BindingError {
    pub fn invalid_arguments<S: Into<String>>(msg: S) -> Self {
        BindingError::InvalidArguments(msg.into())
    }

    pub fn name_not_found<S: Into<String>>(msg: S) -> Self {
        BindingError::NameNotFound(msg.into())
    }

    pub fn type_mismatch<S: Into<String>>(msg: S) -> Self {
        BindingError::TypeMismatch(msg.into())
    }

    pub fn schema_conflict<S: Into<String>>(msg: S) -> Self {
        BindingError::SchemaConflict(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BindingError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            BindingError::UnknownHandle(_) => ErrorKind::UnknownHandle,
            BindingError::NameNotFound(_) => ErrorKind::NameNotFound,
            BindingError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            BindingError::SchemaConflict(_) => ErrorKind::SchemaConflict,
            BindingError::StorageEngine(_) => ErrorKind::StorageEngine,
            BindingError::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// Whether this error is pushed to the diagnostics queue. Sentinel
    /// failures (bad arguments, bad handle) are not.
    pub fn is_queued(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::InvalidArguments | ErrorKind::UnknownHandle
        )
    }
}

impl From<SddsError> for BindingError {
    fn from(err: SddsError) -> Self {
        match err {
            SddsError::NotFound(msg) => BindingError::NameNotFound(msg),
            SddsError::TypeMismatch(msg) => BindingError::TypeMismatch(msg),
            SddsError::Schema(msg) => BindingError::SchemaConflict(msg),
            SddsError::InvalidArgument(msg) => BindingError::InvalidArguments(msg),
            other => BindingError::StorageEngine(other),
        }
    }
}

/// Result type alias for handle API operations
pub type Result<T> = std::result::Result<T, BindingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_are_classified() {
        let err: BindingError = SddsError::schema("column a already exists").into();
        assert_eq!(err.kind(), ErrorKind::SchemaConflict);

        let err: BindingError = SddsError::not_found("column b").into();
        assert_eq!(err.kind(), ErrorKind::NameNotFound);

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BindingError = SddsError::from(io).into();
        assert_eq!(err.kind(), ErrorKind::StorageEngine);
        assert!(err.to_string().contains("gone"));

        let err: BindingError = SddsError::invalid_argument("row 9 out of range").into();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert!(!err.is_queued());
    }

    #[test]
    fn test_sentinel_errors_are_not_queued() {
        assert!(!BindingError::UnknownHandle(3).is_queued());
        assert!(!BindingError::invalid_arguments("x").is_queued());
        assert!(BindingError::type_mismatch("x").is_queued());
        assert!(BindingError::Fatal("x".into()).is_queued());
    }
}
