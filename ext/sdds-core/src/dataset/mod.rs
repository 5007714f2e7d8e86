//! The dataset session: one open file (or in-memory target), its layout and
//! its current page

mod copy;
mod input;
mod output;

pub use copy::CopyTarget;
pub use output::{OutputOptions, UpdateMode};

use crate::format::{format_canonical, parse_value};
use crate::page::Page;
use crate::reader::PageReader;
use crate::schema::{
    ArrayDefinition, ColumnDefinition, DefinitionMode, FieldMap, Layout, NamePolicy,
    ParameterDefinition,
};
use crate::{ArrayValue, ColumnData, DataMode, FieldKind, NativeValue, Result, SddsError};
use std::path::PathBuf;

/// How the session was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Input,
    Output,
    Append,
    /// Output target with no backing file
    Memory,
}

/// Where the current page is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageState {
    #[default]
    NoPage,
    Open,
    Closed,
}

/// Independent session toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatasetFlags {
    pub fixed_row_count: bool,
    pub fsync: bool,
    pub defer_layout: bool,
}

#[derive(Debug)]
struct InputState {
    reader: PageReader,
    headerless: bool,
}

/// A page that has reached the file and may still grow
#[derive(Debug, Clone, Copy)]
struct DiskPage {
    start: u64,
    count_offset: u64,
    count_width: usize,
    rows_on_disk: usize,
    /// Rows of the in-memory page already written
    written_through: usize,
    flushed: bool,
}

#[derive(Debug)]
struct OutputState {
    file: Option<std::fs::File>,
    layout_written: bool,
    header_on_disk: bool,
    header_end: u64,
    disk_page: Option<DiskPage>,
    pages_written: u32,
}

/// One open dataset
#[derive(Debug)]
pub struct Dataset {
    mode: AccessMode,
    path: Option<PathBuf>,
    layout: Layout,
    saved_layout: Option<Layout>,
    page: Page,
    page_state: PageState,
    flags: DatasetFlags,
    input: Option<InputState>,
    output: Option<OutputState>,
    pages_read: u32,
    parameter_factors: FieldMap<f64>,
    column_factors: FieldMap<f64>,
}

impl Dataset {
    fn with_layout(mode: AccessMode, path: Option<PathBuf>, layout: Layout) -> Self {
        let page = Page::new(&layout);
        Self {
            mode,
            path,
            layout,
            saved_layout: None,
            page,
            page_state: PageState::NoPage,
            flags: DatasetFlags::default(),
            input: None,
            output: None,
            pages_read: 0,
            parameter_factors: FieldMap::default(),
            column_factors: FieldMap::default(),
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_state(&self) -> PageState {
        self.page_state
    }

    pub fn flags(&self) -> DatasetFlags {
        self.flags
    }

    pub fn data_mode(&self) -> DataMode {
        self.layout.data_mode
    }

    pub fn is_writable(&self) -> bool {
        self.mode != AccessMode::Input
    }

    pub fn description(&self) -> (Option<&str>, Option<&str>) {
        (
            self.layout.description.as_deref(),
            self.layout.contents.as_deref(),
        )
    }

    fn layout_frozen(&self) -> bool {
        self.output.as_ref().is_some_and(|o| o.layout_written)
    }

    fn ensure_layout_mutable(&self, what: &str) -> Result<()> {
        if self.layout_frozen() {
            return Err(SddsError::state(format!(
                "cannot {} after the layout is written",
                what
            )));
        }
        Ok(())
    }

    fn after_layout_change(&mut self) {
        self.page.sync(&self.layout);
        self.parameter_factors
            .retain(|name, _| self.layout.parameters.contains_key(name));
        self.column_factors
            .retain(|name, _| self.layout.columns.contains_key(name));
    }

    // ---- definitions ----

    pub fn define_parameter(
        &mut self,
        def: ParameterDefinition,
        policy: NamePolicy,
        mode: DefinitionMode,
    ) -> Result<usize> {
        self.ensure_layout_mutable("define a parameter")?;
        let index = self.layout.define_parameter(def, policy, mode)?;
        self.after_layout_change();
        Ok(index)
    }

    pub fn define_column(
        &mut self,
        def: ColumnDefinition,
        policy: NamePolicy,
        mode: DefinitionMode,
    ) -> Result<usize> {
        self.ensure_layout_mutable("define a column")?;
        let index = self.layout.define_column(def, policy, mode)?;
        self.after_layout_change();
        Ok(index)
    }

    pub fn define_array(
        &mut self,
        def: ArrayDefinition,
        policy: NamePolicy,
        mode: DefinitionMode,
    ) -> Result<usize> {
        self.ensure_layout_mutable("define an array")?;
        let index = self.layout.define_array(def, policy, mode)?;
        self.after_layout_change();
        Ok(index)
    }

    pub fn delete_field(&mut self, kind: FieldKind, name: &str) -> Result<()> {
        self.ensure_layout_mutable("delete a field")?;
        self.layout.delete_field(kind, name)?;
        self.after_layout_change();
        Ok(())
    }

    /// Remove columns never written on this page or deselected
    pub fn delete_unset_columns(&mut self) -> Result<()> {
        self.ensure_layout_mutable("delete columns")?;
        for name in self.page.unset_columns() {
            self.layout.delete_field(FieldKind::Column, &name)?;
        }
        self.after_layout_change();
        Ok(())
    }

    pub fn delete_unset_rows(&mut self) {
        self.page.delete_unset_rows();
    }

    pub fn delete_fixed_values(&mut self) -> Result<()> {
        self.ensure_layout_mutable("delete fixed values")?;
        self.layout.delete_fixed_values();
        Ok(())
    }

    /// Index of a field by name, or `NotFound`
    pub fn field_index(&self, kind: FieldKind, name: &str) -> Result<usize> {
        self.layout
            .field_index(kind, name)
            .ok_or_else(|| SddsError::not_found(format!("{} {}", kind, name)))
    }

    fn check_index(&self, kind: FieldKind, index: usize) -> Result<()> {
        if index >= self.layout.field_count(kind) {
            return Err(SddsError::not_found(format!(
                "{} index {} (dataset has {})",
                kind,
                index,
                self.layout.field_count(kind)
            )));
        }
        Ok(())
    }

    pub fn set_data_mode(&mut self, mode: DataMode) -> Result<()> {
        self.ensure_layout_mutable("change the data mode")?;
        self.layout.data_mode = mode;
        Ok(())
    }

    pub fn set_description(&mut self, text: Option<&str>, contents: Option<&str>) -> Result<()> {
        self.ensure_layout_mutable("change the description")?;
        self.layout.set_description(text, contents);
        Ok(())
    }

    // ---- flags ----

    pub fn set_column_major(&mut self, column_major: bool) -> Result<()> {
        if self.layout.column_major == column_major {
            return Ok(());
        }
        self.ensure_layout_mutable("change the storage order")?;
        self.layout.column_major = column_major;
        Ok(())
    }

    pub fn set_fixed_row_count(&mut self, fixed: bool) {
        self.flags.fixed_row_count = fixed;
    }

    pub fn set_fsync(&mut self, fsync: bool) {
        self.flags.fsync = fsync;
    }

    pub fn set_defer_layout(&mut self, defer: bool) {
        self.flags.defer_layout = defer;
    }

    /// Snapshot the current definitions
    pub fn save_layout(&mut self) {
        self.saved_layout = Some(self.layout.clone());
    }

    /// Return to the last snapshot
    pub fn restore_layout(&mut self) -> Result<()> {
        let saved = self
            .saved_layout
            .clone()
            .ok_or_else(|| SddsError::state("no saved layout to restore"))?;
        self.ensure_layout_mutable("restore the layout")?;
        self.layout = saved;
        self.after_layout_change();
        Ok(())
    }

    // ---- page ----

    pub fn clear_page(&mut self) -> Result<()> {
        self.require_page()?;
        self.page.clear_rows();
        if let Some(disk) = self.output.as_mut().and_then(|o| o.disk_page.as_mut()) {
            disk.written_through = 0;
        }
        Ok(())
    }

    pub fn lengthen(&mut self, additional: usize) -> Result<()> {
        self.require_page()?;
        self.page.lengthen(additional);
        Ok(())
    }

    fn require_page(&self) -> Result<()> {
        if self.page_state == PageState::NoPage {
            return Err(SddsError::state("no page has been started or read"));
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.page.n_rows
    }

    pub fn set_row_flags(&mut self, value: bool) {
        self.page.set_row_flags(value);
    }

    pub fn set_column_flags(&mut self, value: bool) {
        self.page.set_column_flags(value);
    }

    pub fn row_flag(&self, row: usize) -> Result<bool> {
        self.page.row_flag(row).ok_or_else(|| {
            SddsError::invalid_argument(format!(
                "row {} out of range ({} rows)",
                row, self.page.n_rows
            ))
        })
    }

    // ---- values ----

    pub fn parameter_value(&self, index: usize) -> Result<NativeValue> {
        self.check_index(FieldKind::Parameter, index)?;
        let (name, def) = self
            .layout
            .parameters
            .get_index(index)
            .ok_or_else(|| SddsError::not_found(format!("parameter index {}", index)))?;
        if let Some(text) = &def.fixed_value {
            return parse_value(text, def.info.type_tag);
        }
        self.page
            .parameters
            .get(name)
            .cloned()
            .ok_or_else(|| SddsError::state(format!("parameter {} missing from page", name)))
    }

    pub fn set_parameter_value(&mut self, index: usize, value: NativeValue) -> Result<()> {
        self.check_index(FieldKind::Parameter, index)?;
        let (name, def) = self
            .layout
            .parameters
            .get_index(index)
            .ok_or_else(|| SddsError::not_found(format!("parameter index {}", index)))?;
        if def.info.type_tag != value.type_tag() {
            return Err(SddsError::type_mismatch(format!(
                "parameter {} is {}, got {}",
                name,
                def.info.type_tag,
                value.type_name()
            )));
        }
        if def.fixed_value.is_some() {
            return Err(SddsError::state(format!(
                "parameter {} has a fixed value",
                name
            )));
        }
        self.page.parameters.insert(name.clone(), value);
        Ok(())
    }

    pub fn array_value(&self, index: usize) -> Result<&ArrayValue> {
        self.check_index(FieldKind::Array, index)?;
        self.page
            .arrays
            .get_index(index)
            .map(|(_, v)| v)
            .ok_or_else(|| SddsError::state(format!("array {} missing from page", index)))
    }

    pub fn set_array_value(&mut self, index: usize, value: ArrayValue) -> Result<()> {
        self.check_index(FieldKind::Array, index)?;
        let (name, def) = self
            .layout
            .arrays
            .get_index(index)
            .ok_or_else(|| SddsError::not_found(format!("array index {}", index)))?;
        if value.dimensions.len() != def.dimensions {
            return Err(SddsError::invalid_argument(format!(
                "array {} has {} dimensions, got a shape of length {}",
                name,
                def.dimensions,
                value.dimensions.len()
            )));
        }
        if value.type_tag() != def.info.type_tag {
            return Err(SddsError::type_mismatch(format!(
                "array {} is {}, got {}",
                name,
                def.info.type_tag,
                value.type_tag()
            )));
        }
        self.page.arrays.insert(name.clone(), value);
        Ok(())
    }

    pub fn column_values(&self, index: usize) -> Result<ColumnData> {
        self.check_index(FieldKind::Column, index)?;
        self.page.column_values(index)
    }

    pub fn set_column_values(&mut self, index: usize, data: ColumnData) -> Result<()> {
        self.check_index(FieldKind::Column, index)?;
        self.require_page()?;
        self.page.set_column(index, data, self.flags.fixed_row_count)
    }

    pub fn cell(&self, index: usize, row: usize) -> Result<NativeValue> {
        self.check_index(FieldKind::Column, index)?;
        self.page.cell(index, row)
    }

    pub fn set_cell(&mut self, index: usize, row: usize, value: NativeValue) -> Result<()> {
        self.check_index(FieldKind::Column, index)?;
        self.require_page()?;
        let tag = self.page.columns[index].data.type_tag();
        if tag != value.type_tag() {
            return Err(SddsError::type_mismatch(format!(
                "column {} is {}, got {}",
                self.layout.columns[index].info.name,
                tag,
                value.type_name()
            )));
        }
        self.page
            .set_cell(index, row, value, self.flags.fixed_row_count)
    }

    /// Write several cells of one row. Every value is checked before any is stored.
    pub fn set_row(&mut self, row: usize, cells: Vec<(usize, NativeValue)>) -> Result<()> {
        self.require_page()?;
        for (index, value) in &cells {
            self.check_index(FieldKind::Column, *index)?;
            let tag = self.page.columns[*index].data.type_tag();
            if tag != value.type_tag() {
                return Err(SddsError::type_mismatch(format!(
                    "column {} is {}, got {}",
                    self.layout.columns[*index].info.name,
                    tag,
                    value.type_name()
                )));
            }
        }
        self.page.ensure_row(row, self.flags.fixed_row_count)?;
        for (index, value) in cells {
            self.page
                .set_cell(index, row, value, self.flags.fixed_row_count)?;
        }
        Ok(())
    }

    /// Multiply a numeric parameter or column by `factor`, now and on
    /// every page read later
    pub fn apply_factor(&mut self, kind: FieldKind, name: &str, factor: f64) -> Result<()> {
        match kind {
            FieldKind::Parameter => {
                let def = self
                    .layout
                    .parameters
                    .get(name)
                    .ok_or_else(|| SddsError::not_found(format!("parameter {}", name)))?;
                if !def.info.type_tag.is_numeric() {
                    return Err(SddsError::type_mismatch(format!(
                        "cannot apply a factor to {} parameter {}",
                        def.info.type_tag, name
                    )));
                }
                let fixed = match &def.fixed_value {
                    Some(text) => Some(format_canonical(
                        &parse_value(text, def.info.type_tag)?.scaled(factor)?,
                    )),
                    None => None,
                };
                if let Some(value) = self.page.parameters.get_mut(name) {
                    *value = value.scaled(factor)?;
                }
                if let (Some(text), Some(def)) = (fixed, self.layout.parameters.get_mut(name)) {
                    def.fixed_value = Some(text);
                }
                *self.parameter_factors.entry(name.to_string()).or_insert(1.0) *= factor;
            }
            FieldKind::Column => {
                let slot = self
                    .page
                    .columns
                    .get_mut(name)
                    .ok_or_else(|| SddsError::not_found(format!("column {}", name)))?;
                slot.data.apply_factor(factor)?;
                *self.column_factors.entry(name.to_string()).or_insert(1.0) *= factor;
            }
            FieldKind::Array => {
                return Err(SddsError::invalid_argument(
                    "factors apply to parameters and columns only",
                ))
            }
        }
        Ok(())
    }

    fn apply_recorded_factors(&mut self) -> Result<()> {
        for (name, factor) in &self.column_factors {
            if let Some(slot) = self.page.columns.get_mut(name) {
                slot.data.apply_factor(*factor)?;
            }
        }
        for (name, factor) in &self.parameter_factors {
            let fixed = self
                .layout
                .parameters
                .get(name)
                .is_some_and(|d| d.fixed_value.is_some());
            if fixed {
                continue;
            }
            if let Some(value) = self.page.parameters.get_mut(name) {
                *value = value.scaled(*factor)?;
            }
        }
        Ok(())
    }

    /// Consistency self-check of page buffers against the layout
    pub fn check(&self, caller: &str) -> Result<()> {
        let fail = |msg: String| Err(SddsError::state(format!("{}: {}", caller, msg)));
        if self.page.n_rows > self.page.capacity {
            return fail(format!(
                "{} rows exceed capacity {}",
                self.page.n_rows, self.page.capacity
            ));
        }
        if self.page.row_flags.len() != self.page.capacity
            || self.page.row_written.len() != self.page.capacity
        {
            return fail("row flag arrays do not match the row capacity".to_string());
        }
        if self.page.columns.len() != self.layout.columns.len() {
            return fail("column buffers do not match the layout".to_string());
        }
        for ((name, def), (slot_name, slot)) in self.layout.columns.iter().zip(&self.page.columns) {
            if name != slot_name || slot.data.type_tag() != def.info.type_tag {
                return fail(format!("column buffer for {} is out of date", name));
            }
            if slot.data.len() < self.page.n_rows {
                return fail(format!("column {} is shorter than the row count", name));
            }
        }
        for (name, def) in &self.layout.parameters {
            match self.page.parameters.get(name) {
                Some(v) if v.type_tag() == def.info.type_tag => {}
                _ => return fail(format!("parameter {} is out of date", name)),
            }
        }
        for (name, def) in &self.layout.arrays {
            match self.page.arrays.get(name) {
                Some(v)
                    if v.type_tag() == def.info.type_tag
                        && v.dimensions.len() == def.dimensions => {}
                _ => return fail(format!("array {} is out of date", name)),
            }
        }
        Ok(())
    }
}
