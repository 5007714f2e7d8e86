use thiserror::Error;

/// Core error type for storage engine operations
#[derive(Error, Debug)]
pub enum SddsError {
    /// IO errors from file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed header or page data
    #[error("Format error: {0}")]
    Format(String),

    /// Layout and definition errors (duplicate or invalid names)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Field lookup misses
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value does not fit the type tag it is stored under
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not permitted in the dataset's current state
    #[error("Invalid state: {0}")]
    State(String),

    /// UTF-8 decoding errors
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] simdutf8::basic::Utf8Error),

    /// Number parsing errors
    #[error("Parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// Float parsing errors
    #[error("Parse float error: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),
}

/// Result type alias for storage engine operations
pub type Result<T> = std::result::Result<T, SddsError>;

impl SddsError {
    pub fn format<S: Into<String>>(msg: S) -> Self {
        SddsError::Format(msg.into())
    }

    pub fn schema<S: Into<String>>(msg: S) -> Self {
        SddsError::Schema(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        SddsError::NotFound(msg.into())
    }

    pub fn type_mismatch<S: Into<String>>(msg: S) -> Self {
        SddsError::TypeMismatch(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SddsError::InvalidArgument(msg.into())
    }

    pub fn state<S: Into<String>>(msg: S) -> Self {
        SddsError::State(msg.into())
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<SddsError>,
{
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| wrap(ctx.into(), e.into()))
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| wrap(f().into(), e.into()))
    }
}

// Keeps the variant so callers can still classify the failure.
fn wrap(ctx: String, err: SddsError) -> SddsError {
    match err {
        SddsError::Io(e) => SddsError::Io(std::io::Error::new(e.kind(), format!("{}: {}", ctx, e))),
        SddsError::Format(m) => SddsError::Format(format!("{}: {}", ctx, m)),
        SddsError::Schema(m) => SddsError::Schema(format!("{}: {}", ctx, m)),
        SddsError::NotFound(m) => SddsError::NotFound(format!("{}: {}", ctx, m)),
        SddsError::TypeMismatch(m) => SddsError::TypeMismatch(format!("{}: {}", ctx, m)),
        SddsError::InvalidArgument(m) => SddsError::InvalidArgument(format!("{}: {}", ctx, m)),
        SddsError::State(m) => SddsError::State(format!("{}: {}", ctx, m)),
        other => SddsError::Format(format!("{}: {}", ctx, other)),
    }
}
