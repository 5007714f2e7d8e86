//! Storage engine for self-describing tabular data sets
//!
//! `sdds-core` reads and writes SDDS files: a text header of namelist
//! records describing parameters, arrays and columns, followed by pages of
//! data in binary or ASCII form. It knows nothing about handles or dynamic
//! values; those live in `sdds-adapter`.
//!
//! # Key Components
//!
//! - **Dataset**: One open session through [`dataset::Dataset`]
//!   - Input, output, append and memory-only modes
//!   - Page lifecycle (start, write, incremental update, flush)
//!   - Copying definitions, pages and rows between datasets
//!
//! - **Schema**: The [`schema::Layout`] of a dataset
//!   - Parameter, column and array definitions in definition order
//!   - Name validation and transfer between layouts
//!
//! - **Values**: Typed storage for the ten SDDS element types
//!   - [`NativeValue`] for single values, [`ColumnData`] for typed buffers
//!   - [`ArrayValue`] for shaped arrays
//!
//! - **Codec**: Header, binary and ASCII page encoding
//!   - [`header`] renders and parses the namelist header
//!   - [`reader::PageReader`] and [`writer`] move pages to and from bytes
//!   - [`format`] holds the printf subset and canonical value rendering

pub mod dataset;
pub mod error;
pub mod format;
pub mod header;
pub mod namelist;
pub mod page;
pub mod reader;
pub mod schema;
pub mod types;
pub mod value;
pub mod writer;

pub use dataset::{
    AccessMode, CopyTarget, Dataset, DatasetFlags, OutputOptions, PageState, UpdateMode,
};
pub use error::{ErrorContext, Result, SddsError};
pub use page::Page;
pub use reader::RowSelection;
pub use schema::{
    ArrayDefinition, ColumnDefinition, Definition, DefinitionMode, FieldInfo, Layout, NamePolicy,
    ParameterDefinition, TransferMode,
};
pub use types::{DataMode, FieldKind, TypeTag};
pub use value::{ArrayValue, ColumnData, NativeValue};
