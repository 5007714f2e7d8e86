//! Handle-indexed binding layer for sdds-core
//!
//! This crate exposes SDDS datasets through small integer handles and
//! dynamically typed values, the shape a scripting-language binding needs.
//!
//! # Overview
//!
//! ## Handle Table
//!
//! [`Sdds`] owns a fixed number of slots (20 by default). Callers pick the
//! index; opening binds a session to it and [`Sdds::terminate`] frees it.
//! Any call against a free or out-of-range index fails with
//! [`BindingError::UnknownHandle`].
//!
//! ## Value Conversion
//!
//! [`DynValue`] is converted to and from the ten native types in
//! [`marshal`]:
//!
//! - Integers wrap to the destination width
//! - `float32` values go through a six-significant-digit round trip
//! - `char` takes the first byte of a string
//! - Sequences convert all-or-nothing
//!
//! ## Schema and Pages
//!
//! Definitions, transfers, checks and introspection live in [`schema`];
//! the page lifecycle and get/set of parameters, columns, arrays and rows
//! in [`page`]. Fields are addressed by name or position through
//! [`FieldRef`].
//!
//! ## Diagnostics
//!
//! Failures other than bad arguments or bad handles are also pushed to an
//! error queue that can be counted, printed and cleared. Fatal reports can
//! be intercepted with a hook instead of exiting the process.

pub mod binding;
pub use binding::Sdds;

pub mod config;
pub use config::{BindingConfig, BindingConfigBuilder, SessionFlags, DEFAULT_CAPACITY};

pub mod diagnostics;
pub use diagnostics::{Diagnostics, FatalHook, PrintMode};

pub mod error;
pub use error::{BindingError, ErrorKind, Result};

pub mod global;
pub use global::with_global;

pub mod handle;
pub use handle::{HandleTable, Session};

pub mod logger;
pub use logger::{LogLevel, LogSink, Logger, LOG_LEVEL_ENV};

pub mod marshal;

pub mod page;

pub mod schema;
pub use schema::{CheckStatus, DefinitionRecord, TypeRequirement};

pub mod value;
pub use value::{DynValue, FieldRef};

pub use sdds_core::{
    ArrayDefinition, ColumnDefinition, DataMode, DefinitionMode, FieldInfo, FieldKind, NamePolicy,
    OutputOptions, ParameterDefinition, TransferMode, TypeTag, UpdateMode,
};
