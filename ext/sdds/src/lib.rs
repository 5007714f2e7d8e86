//! Whole-file access to SDDS data
//!
//! [`SddsFile`] holds a complete file in memory: the description, the
//! definitions of every parameter, array and column, and each field's
//! values page by page. It is read and written through the handle API of
//! `sdds-adapter`, borrowing a free handle for the duration of the call.
//!
//! ```no_run
//! use sdds::{DynValue, SddsFile, TypeTag};
//!
//! let mut file = SddsFile::new();
//! file.define_simple_parameter("step", TypeTag::Int32)?;
//! file.define_simple_column("x", TypeTag::Float64)?;
//! file.set_parameter("step", 0, DynValue::Int(1))?;
//! file.set_column("x", 0, vec![DynValue::from(0.5), DynValue::from(1.5)])?;
//! file.save("out.sdds")?;
//!
//! let loaded = SddsFile::load("out.sdds")?;
//! assert_eq!(loaded.page_count(), 1);
//! # Ok::<(), sdds::SddsFileError>(())
//! ```

pub mod document;
pub use document::{Array, ArrayPage, Column, Description, Parameter, SddsFile};

pub mod error;
pub use error::{Result, SddsFileError};

pub mod io;
pub use io::{load_with, save_with, PageSelection};

pub use sdds_adapter::{DataMode, DynValue, FieldKind, TypeTag};
