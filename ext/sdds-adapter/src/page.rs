//! Page lifecycle and value access through the handle API

use crate::binding::Sdds;
use crate::error::{BindingError, Result};
use crate::marshal::{from_column_data, from_native, to_column_data, to_native};
use crate::value::{DynValue, FieldRef};
use sdds_core::{ArrayValue, Dataset, FieldKind, RowSelection, TypeTag, UpdateMode};

/// Resolve `field` and report its index and type
fn typed_field(ds: &Dataset, kind: FieldKind, field: &FieldRef) -> Result<(usize, TypeTag)> {
    let index = Sdds::resolve(ds, kind, field)?;
    let tag = ds
        .layout()
        .field_info(kind, index)
        .map(|info| info.type_tag)
        .ok_or_else(|| BindingError::name_not_found(format!("{} {}", kind, field)))?;
    Ok((index, tag))
}

impl Sdds {
    // ---- page lifecycle ----

    /// Open a page sized for `expected_rows`. The size is a hint unless the
    /// fixed row count flag is set.
    pub fn start_page(&mut self, handle: usize, expected_rows: usize) -> Result<()> {
        self.with_session(handle, |session, _| {
            session.rows_since_update = 0;
            Ok(session.dataset.start_page(expected_rows)?)
        })?;
        self.diagnostics
            .logger()
            .debug(|| format!("handle {} started a page for {} rows", handle, expected_rows));
        Ok(())
    }

    pub fn clear_page(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.clear_page()?))
    }

    pub fn lengthen_table(&mut self, handle: usize, additional: usize) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.lengthen(additional)?))
    }

    pub fn write_page(&mut self, handle: usize) -> Result<()> {
        let rows = self.with_session(handle, |session, config| {
            session.dataset.write_page()?;
            session.rows_since_update = 0;
            if config.auto_check {
                session.dataset.check("write_page")?;
            }
            Ok(session.dataset.row_count())
        })?;
        self.diagnostics
            .logger()
            .debug(|| format!("handle {} wrote a page of {} rows", handle, rows));
        Ok(())
    }

    /// Bring the page on disk up to date. `Flush` also drops the written
    /// rows from memory.
    pub fn update_page(&mut self, handle: usize, mode: UpdateMode) -> Result<()> {
        self.with_session(handle, |session, _| {
            session.dataset.update_page(mode)?;
            session.rows_since_update = 0;
            Ok(())
        })
    }

    fn read_selected(&mut self, handle: usize, selection: RowSelection) -> Result<Option<u32>> {
        let page = self.with_session(handle, |session, config| {
            let page = session.dataset.read_page(selection)?;
            if page.is_some() && config.auto_check {
                session.dataset.check("read_page")?;
            }
            Ok(page)
        })?;
        let logger = self.diagnostics.logger();
        match page {
            Some(number) => logger.debug(|| format!("handle {} read page {}", handle, number)),
            None => logger.debug(|| format!("handle {} reached the end of the data", handle)),
        }
        Ok(page)
    }

    /// Read the next page. `Ok(None)` marks the end of the data.
    pub fn read_page(&mut self, handle: usize) -> Result<Option<u32>> {
        self.read_selected(handle, RowSelection::All)
    }

    /// Read the next page keeping rows `offset, offset + interval, ...`
    pub fn read_page_sparse(
        &mut self,
        handle: usize,
        interval: usize,
        offset: usize,
    ) -> Result<Option<u32>> {
        self.read_selected(handle, RowSelection::Sparse { interval, offset })
    }

    /// Read the next page keeping its final `rows` rows
    pub fn read_page_last_rows(&mut self, handle: usize, rows: usize) -> Result<Option<u32>> {
        self.read_selected(handle, RowSelection::LastRows(rows))
    }

    // ---- rows and selection ----

    pub fn row_count(&mut self, handle: usize) -> Result<usize> {
        self.with_dataset(handle, |ds| Ok(ds.row_count()))
    }

    pub fn set_row_flags(&mut self, handle: usize, value: bool) -> Result<()> {
        self.with_dataset(handle, |ds| {
            ds.set_row_flags(value);
            Ok(())
        })
    }

    pub fn set_column_flags(&mut self, handle: usize, value: bool) -> Result<()> {
        self.with_dataset(handle, |ds| {
            ds.set_column_flags(value);
            Ok(())
        })
    }

    pub fn get_row_flag(&mut self, handle: usize, row: usize) -> Result<bool> {
        self.with_dataset(handle, |ds| Ok(ds.row_flag(row)?))
    }

    // ---- parameters ----

    pub fn get_parameter(&mut self, handle: usize, field: &FieldRef) -> Result<DynValue> {
        self.with_dataset(handle, |ds| {
            let (index, _) = typed_field(ds, FieldKind::Parameter, field)?;
            Ok(from_native(&ds.parameter_value(index)?))
        })
    }

    pub fn set_parameter(&mut self, handle: usize, field: &FieldRef, value: &DynValue) -> Result<()> {
        self.with_dataset(handle, |ds| {
            let (index, tag) = typed_field(ds, FieldKind::Parameter, field)?;
            Ok(ds.set_parameter_value(index, to_native(value, tag)?)?)
        })
    }

    // ---- columns ----

    /// Every row of one column
    pub fn get_column(&mut self, handle: usize, field: &FieldRef) -> Result<Vec<DynValue>> {
        self.with_dataset(handle, |ds| {
            let (index, _) = typed_field(ds, FieldKind::Column, field)?;
            Ok(from_column_data(&ds.column_values(index)?))
        })
    }

    /// Replace a whole column. The values are converted before anything is
    /// stored.
    pub fn set_column(&mut self, handle: usize, field: &FieldRef, values: &[DynValue]) -> Result<()> {
        self.with_dataset(handle, |ds| {
            let (index, tag) = typed_field(ds, FieldKind::Column, field)?;
            let data = to_column_data(values, tag)?;
            Ok(ds.set_column_values(index, data)?)
        })
    }

    pub fn get_cell(&mut self, handle: usize, field: &FieldRef, row: usize) -> Result<DynValue> {
        self.with_dataset(handle, |ds| {
            let (index, _) = typed_field(ds, FieldKind::Column, field)?;
            Ok(from_native(&ds.cell(index, row)?))
        })
    }

    pub fn set_cell(
        &mut self,
        handle: usize,
        field: &FieldRef,
        row: usize,
        value: &DynValue,
    ) -> Result<()> {
        self.set_row_values(handle, row, &[(field.clone(), value.clone())])
    }

    /// Set several cells of one row. Every name and value is checked before
    /// any cell is written.
    pub fn set_row_values(
        &mut self,
        handle: usize,
        row: usize,
        values: &[(FieldRef, DynValue)],
    ) -> Result<()> {
        if values.is_empty() {
            return Err(BindingError::invalid_arguments("no column values given"));
        }
        self.with_session(handle, |session, _| {
            let cells = values
                .iter()
                .map(|(field, value)| {
                    let (index, tag) = typed_field(&session.dataset, FieldKind::Column, field)?;
                    Ok((index, to_native(value, tag)?))
                })
                .collect::<Result<Vec<_>>>()?;
            let new_row = row >= session.dataset.row_count();
            session.dataset.set_row(row, cells)?;
            if session.update_interval > 0 && new_row {
                session.rows_since_update += 1;
                if session.rows_since_update >= session.update_interval {
                    session.dataset.update_page(UpdateMode::Normal)?;
                    session.rows_since_update = 0;
                }
            }
            Ok(())
        })
    }

    /// Every column's value in one row, in definition order
    pub fn get_row_values(&mut self, handle: usize, row: usize) -> Result<Vec<DynValue>> {
        self.with_dataset(handle, |ds| {
            (0..ds.layout().field_count(FieldKind::Column))
                .map(|index| Ok(from_native(&ds.cell(index, row)?)))
                .collect()
        })
    }

    // ---- arrays ----

    /// Elements in row-major order plus the shape
    pub fn get_array(&mut self, handle: usize, field: &FieldRef) -> Result<(Vec<DynValue>, Vec<usize>)> {
        self.with_dataset(handle, |ds| {
            let (index, _) = typed_field(ds, FieldKind::Array, field)?;
            let array = ds.array_value(index)?;
            Ok((from_column_data(&array.data), array.dimensions.clone()))
        })
    }

    pub fn get_array_dimensions(&mut self, handle: usize, field: &FieldRef) -> Result<Vec<usize>> {
        self.with_dataset(handle, |ds| {
            let (index, _) = typed_field(ds, FieldKind::Array, field)?;
            Ok(ds.array_value(index)?.dimensions.clone())
        })
    }

    /// Replace an array. `dimensions` must have one entry per declared
    /// dimension and their product must equal the number of values.
    pub fn set_array(
        &mut self,
        handle: usize,
        field: &FieldRef,
        values: &[DynValue],
        dimensions: &[usize],
    ) -> Result<()> {
        let shape = self.with_dataset(handle, |ds| {
            let (index, tag) = typed_field(ds, FieldKind::Array, field)?;
            let declared = ds
                .layout()
                .arrays
                .get_index(index)
                .map(|(_, def)| def.dimensions)
                .unwrap_or_default();
            Ok((index, tag, declared))
        })?;
        let (index, tag, declared) = shape;
        if dimensions.len() != declared {
            return Err(BindingError::invalid_arguments(format!(
                "array {} has {} dimensions, got a shape of length {}",
                field,
                declared,
                dimensions.len()
            )));
        }
        let count: usize = dimensions.iter().product();
        if count != values.len() {
            return Err(BindingError::invalid_arguments(format!(
                "shape {:?} needs {} elements, got {}",
                dimensions,
                count,
                values.len()
            )));
        }
        self.with_dataset(handle, |ds| {
            let data = to_column_data(values, tag)?;
            let value = ArrayValue::with_data(dimensions.to_vec(), data)?;
            Ok(ds.set_array_value(index, value)?)
        })
    }
}
