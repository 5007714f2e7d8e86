//! The in-memory model of a whole SDDS file
//!
//! Every field keeps its definition next to one entry per page. Pages and
//! rows are zero-based. Setting the entry just past the end appends a new
//! page (or row); anything further out is an error.

use crate::error::{Result, SddsFileError};
use indexmap::IndexMap;
use itertools::Itertools;
use sdds_adapter::{
    ArrayDefinition, ColumnDefinition, DataMode, DefinitionRecord, DynValue, FieldInfo, FieldKind,
    ParameterDefinition, TypeTag,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Description {
    pub text: Option<String>,
    pub contents: Option<String>,
}

/// A parameter and its value on each page
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub definition: ParameterDefinition,
    pub values: Vec<DynValue>,
}

/// One page's array value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayPage {
    pub values: Vec<DynValue>,
    pub dimensions: Vec<usize>,
}

impl ArrayPage {
    pub fn new(values: Vec<DynValue>, dimensions: Vec<usize>) -> Self {
        Self { values, dimensions }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub definition: ArrayDefinition,
    pub pages: Vec<ArrayPage>,
}

/// A column and its rows on each page
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub definition: ColumnDefinition,
    pub pages: Vec<Vec<DynValue>>,
}

/// Store `value` at `page`, appending when `page` is one past the end
fn put<T>(pages: &mut Vec<T>, page: usize, value: T) -> Result<()> {
    match page.cmp(&pages.len()) {
        std::cmp::Ordering::Less => pages[page] = value,
        std::cmp::Ordering::Equal => pages.push(value),
        std::cmp::Ordering::Greater => {
            return Err(SddsFileError::InvalidPage {
                page,
                pages: pages.len(),
            })
        }
    }
    Ok(())
}

fn page_of<T>(pages: &[T], page: usize) -> Result<&T> {
    pages.get(page).ok_or(SddsFileError::InvalidPage {
        page,
        pages: pages.len(),
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SddsFile {
    pub description: Description,
    pub mode: DataMode,
    parameters: IndexMap<String, Parameter>,
    arrays: IndexMap<String, Array>,
    columns: IndexMap<String, Column>,
}

impl SddsFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: DataMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn set_description<S: Into<String>>(&mut self, text: Option<S>, contents: Option<S>) {
        self.description = Description {
            text: text.map(Into::into),
            contents: contents.map(Into::into),
        };
    }

    // ---- definitions ----

    fn ensure_new(&self, kind: FieldKind, name: &str) -> Result<()> {
        let exists = match kind {
            FieldKind::Parameter => self.parameters.contains_key(name),
            FieldKind::Array => self.arrays.contains_key(name),
            FieldKind::Column => self.columns.contains_key(name),
        };
        if exists {
            return Err(SddsFileError::DuplicateField {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn define_parameter(&mut self, definition: ParameterDefinition) -> Result<()> {
        self.ensure_new(FieldKind::Parameter, &definition.info.name)?;
        self.parameters.insert(
            definition.info.name.clone(),
            Parameter {
                definition,
                values: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn define_simple_parameter(&mut self, name: &str, tag: TypeTag) -> Result<()> {
        self.define_parameter(ParameterDefinition::new(FieldInfo::new(name, tag)))
    }

    pub fn define_array(&mut self, definition: ArrayDefinition) -> Result<()> {
        self.ensure_new(FieldKind::Array, &definition.info.name)?;
        self.arrays.insert(
            definition.info.name.clone(),
            Array {
                definition,
                pages: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn define_simple_array(&mut self, name: &str, tag: TypeTag, dimensions: usize) -> Result<()> {
        self.define_array(ArrayDefinition::new(FieldInfo::new(name, tag), dimensions))
    }

    pub fn define_column(&mut self, definition: ColumnDefinition) -> Result<()> {
        self.ensure_new(FieldKind::Column, &definition.info.name)?;
        self.columns.insert(
            definition.info.name.clone(),
            Column {
                definition,
                pages: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn define_simple_column(&mut self, name: &str, tag: TypeTag) -> Result<()> {
        self.define_column(ColumnDefinition::new(FieldInfo::new(name, tag)))
    }

    /// Add a definition read back from a dataset
    pub fn define(&mut self, record: DefinitionRecord) -> Result<()> {
        match record {
            DefinitionRecord::Parameter(d) => self.define_parameter(d),
            DefinitionRecord::Array(d) => self.define_array(d),
            DefinitionRecord::Column(d) => self.define_column(d),
        }
    }

    // ---- introspection ----

    pub fn field_count(&self, kind: FieldKind) -> usize {
        match kind {
            FieldKind::Parameter => self.parameters.len(),
            FieldKind::Array => self.arrays.len(),
            FieldKind::Column => self.columns.len(),
        }
    }

    pub fn field_names(&self, kind: FieldKind) -> Vec<&str> {
        match kind {
            FieldKind::Parameter => self.parameters.keys().map(String::as_str).collect(),
            FieldKind::Array => self.arrays.keys().map(String::as_str).collect(),
            FieldKind::Column => self.columns.keys().map(String::as_str).collect(),
        }
    }

    pub fn field_info(&self, kind: FieldKind, name: &str) -> Result<&FieldInfo> {
        let info = match kind {
            FieldKind::Parameter => self.parameters.get(name).map(|p| &p.definition.info),
            FieldKind::Array => self.arrays.get(name).map(|a| &a.definition.info),
            FieldKind::Column => self.columns.get(name).map(|c| &c.definition.info),
        };
        info.ok_or_else(|| SddsFileError::unknown_field(kind, name))
    }

    pub fn field_type(&self, kind: FieldKind, name: &str) -> Result<TypeTag> {
        self.field_info(kind, name).map(|info| info.type_tag)
    }

    pub fn field_units(&self, kind: FieldKind, name: &str) -> Result<Option<&str>> {
        self.field_info(kind, name).map(|info| info.units.as_deref())
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn arrays(&self) -> impl Iterator<Item = &Array> {
        self.arrays.values()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub(crate) fn parameters_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.parameters.values_mut()
    }

    pub(crate) fn arrays_mut(&mut self) -> impl Iterator<Item = &mut Array> {
        self.arrays.values_mut()
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = &mut Column> {
        self.columns.values_mut()
    }

    fn parameter_entry(&mut self, name: &str) -> Result<&mut Parameter> {
        self.parameters
            .get_mut(name)
            .ok_or_else(|| SddsFileError::unknown_field(FieldKind::Parameter, name))
    }

    fn array_entry(&mut self, name: &str) -> Result<&mut Array> {
        self.arrays
            .get_mut(name)
            .ok_or_else(|| SddsFileError::unknown_field(FieldKind::Array, name))
    }

    fn column_entry(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| SddsFileError::unknown_field(FieldKind::Column, name))
    }

    // ---- parameter values ----

    /// Replace the values of every page at once
    pub fn set_parameter_values(&mut self, name: &str, values: Vec<DynValue>) -> Result<()> {
        self.parameter_entry(name)?.values = values;
        Ok(())
    }

    pub fn parameter_values(&self, name: &str) -> Result<&[DynValue]> {
        self.parameters
            .get(name)
            .map(|p| p.values.as_slice())
            .ok_or_else(|| SddsFileError::unknown_field(FieldKind::Parameter, name))
    }

    pub fn set_parameter(&mut self, name: &str, page: usize, value: DynValue) -> Result<()> {
        put(&mut self.parameter_entry(name)?.values, page, value)
    }

    pub fn parameter(&self, name: &str, page: usize) -> Result<&DynValue> {
        page_of(self.parameter_values(name)?, page)
    }

    // ---- array values ----

    pub fn set_array_pages(&mut self, name: &str, pages: Vec<ArrayPage>) -> Result<()> {
        self.array_entry(name)?.pages = pages;
        Ok(())
    }

    pub fn array_pages(&self, name: &str) -> Result<&[ArrayPage]> {
        self.arrays
            .get(name)
            .map(|a| a.pages.as_slice())
            .ok_or_else(|| SddsFileError::unknown_field(FieldKind::Array, name))
    }

    pub fn set_array(&mut self, name: &str, page: usize, value: ArrayPage) -> Result<()> {
        put(&mut self.array_entry(name)?.pages, page, value)
    }

    pub fn array(&self, name: &str, page: usize) -> Result<&ArrayPage> {
        page_of(self.array_pages(name)?, page)
    }

    // ---- column values ----

    pub fn set_column_pages(&mut self, name: &str, pages: Vec<Vec<DynValue>>) -> Result<()> {
        self.column_entry(name)?.pages = pages;
        Ok(())
    }

    pub fn column_pages(&self, name: &str) -> Result<&[Vec<DynValue>]> {
        self.columns
            .get(name)
            .map(|c| c.pages.as_slice())
            .ok_or_else(|| SddsFileError::unknown_field(FieldKind::Column, name))
    }

    pub fn set_column(&mut self, name: &str, page: usize, values: Vec<DynValue>) -> Result<()> {
        put(&mut self.column_entry(name)?.pages, page, values)
    }

    pub fn column(&self, name: &str, page: usize) -> Result<&[DynValue]> {
        page_of(self.column_pages(name)?, page).map(Vec::as_slice)
    }

    /// Store one cell. Row 0 of the page just past the end starts a new
    /// page; the row just past a page's end appends a row.
    pub fn set_cell(&mut self, name: &str, page: usize, row: usize, value: DynValue) -> Result<()> {
        let pages = &mut self.column_entry(name)?.pages;
        if page == pages.len() {
            if row != 0 {
                return Err(SddsFileError::InvalidRow { row, rows: 0 });
            }
            pages.push(vec![value]);
            return Ok(());
        }
        let n_pages = pages.len();
        let rows = pages.get_mut(page).ok_or(SddsFileError::InvalidPage {
            page,
            pages: n_pages,
        })?;
        match row.cmp(&rows.len()) {
            std::cmp::Ordering::Less => rows[row] = value,
            std::cmp::Ordering::Equal => rows.push(value),
            std::cmp::Ordering::Greater => {
                return Err(SddsFileError::InvalidRow {
                    row,
                    rows: rows.len(),
                })
            }
        }
        Ok(())
    }

    pub fn cell(&self, name: &str, page: usize, row: usize) -> Result<&DynValue> {
        let rows = self.column(name, page)?;
        rows.get(row).ok_or(SddsFileError::InvalidRow {
            row,
            rows: rows.len(),
        })
    }

    // ---- pages ----

    /// Pages held by the first parameter, else the first column, else the
    /// first array
    pub fn page_count(&self) -> usize {
        self.parameters
            .values()
            .next()
            .map(|p| p.values.len())
            .or_else(|| self.columns.values().next().map(|c| c.pages.len()))
            .or_else(|| self.arrays.values().next().map(|a| a.pages.len()))
            .unwrap_or(0)
    }

    /// Rows on `page`, taken from the first column
    pub fn row_count(&self, page: usize) -> Result<usize> {
        match self.columns.values().next() {
            Some(column) => page_of(&column.pages, page).map(Vec::len),
            None => Ok(0),
        }
    }

    /// Check that every field covers the same pages, that columns agree on
    /// each page's row count and that array shapes match their values.
    /// Returns the page count.
    pub fn validate(&self) -> Result<usize> {
        let pages = self.page_count();
        let short = self
            .parameters
            .iter()
            .filter(|(_, p)| p.values.len() != pages)
            .map(|(name, _)| format!("parameter {}", name))
            .chain(
                self.arrays
                    .iter()
                    .filter(|(_, a)| a.pages.len() != pages)
                    .map(|(name, _)| format!("array {}", name)),
            )
            .chain(
                self.columns
                    .iter()
                    .filter(|(_, c)| c.pages.len() != pages)
                    .map(|(name, _)| format!("column {}", name)),
            )
            .join(", ");
        if !short.is_empty() {
            return Err(SddsFileError::inconsistent(format!(
                "expected {} pages in {}",
                pages, short
            )));
        }

        for page in 0..pages {
            if !self.columns.values().map(|c| c.pages[page].len()).all_equal() {
                return Err(SddsFileError::inconsistent(format!(
                    "columns have unequal row counts on page {}",
                    page
                )));
            }
        }

        for (name, array) in &self.arrays {
            for (page, value) in array.pages.iter().enumerate() {
                if value.dimensions.len() != array.definition.dimensions {
                    return Err(SddsFileError::inconsistent(format!(
                        "array {} has {} dimensions on page {}, defined with {}",
                        name,
                        value.dimensions.len(),
                        page,
                        array.definition.dimensions
                    )));
                }
                let elements: usize = value.dimensions.iter().product();
                if elements != value.values.len() {
                    return Err(SddsFileError::inconsistent(format!(
                        "array {} has {} values on page {} for shape {:?}",
                        name,
                        value.values.len(),
                        page,
                        value.dimensions
                    )));
                }
            }
        }
        Ok(pages)
    }
}
