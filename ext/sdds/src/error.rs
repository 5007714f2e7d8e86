use sdds_adapter::{BindingError, FieldKind};
use thiserror::Error;

/// Errors raised by the whole-file document
#[derive(Error, Debug)]
pub enum SddsFileError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("no {kind} named {name}")]
    UnknownField { kind: FieldKind, name: String },

    #[error("{kind} {name} is already defined")]
    DuplicateField { kind: FieldKind, name: String },

    #[error("page {page} is out of range ({pages} pages)")]
    InvalidPage { page: usize, pages: usize },

    #[error("row {row} is out of range ({rows} rows)")]
    InvalidRow { row: usize, rows: usize },

    #[error("inconsistent data: {0}")]
    Inconsistent(String),

    #[error("{0} contains no pages")]
    NoPages(String),

    #[error("all {0} handles are in use")]
    NoFreeHandle(usize),
}

impl SddsFileError {
    pub fn unknown_field<S: Into<String>>(kind: FieldKind, name: S) -> Self {
        SddsFileError::UnknownField {
            kind,
            name: name.into(),
        }
    }

    pub fn inconsistent<S: Into<String>>(msg: S) -> Self {
        SddsFileError::Inconsistent(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SddsFileError>;
