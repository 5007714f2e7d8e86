//! Moving definitions and data between two datasets

use super::{Dataset, OutputOptions};
use crate::schema::{
    transfer_all, ColumnDefinition, DefinitionMode, FieldInfo, NamePolicy, ParameterDefinition,
    TransferMode,
};
use crate::{ArrayValue, ColumnData, FieldKind, NativeValue, Result, SddsError};
use std::path::Path;

/// Where `initialize_copy` puts the new dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTarget {
    /// A new file
    File,
    /// Memory only
    Memory,
}

impl CopyTarget {
    /// `"w"` for a file, `"m"` for memory
    pub fn from_mode(mode: &str) -> Option<Self> {
        match mode {
            "w" => Some(CopyTarget::File),
            "m" => Some(CopyTarget::Memory),
            _ => None,
        }
    }
}

fn convert_buffer(data: &ColumnData, tag: crate::TypeTag) -> Result<ColumnData> {
    if data.type_tag() == tag {
        return Ok(data.clone());
    }
    let values = data
        .to_values()
        .iter()
        .map(|v| v.convert(tag))
        .collect::<Result<Vec<NativeValue>>>()?;
    ColumnData::from_values(tag, &values)
}

impl Dataset {
    /// A new writable dataset carrying `source`'s full layout and data mode
    pub fn initialize_copy(
        source: &Dataset,
        path: Option<&Path>,
        target: CopyTarget,
    ) -> Result<Self> {
        let options = OutputOptions::new().with_data_mode(source.layout.data_mode);
        let mut dataset = match (target, path) {
            (CopyTarget::File, Some(path)) => Dataset::open_output(path, options)?,
            (CopyTarget::File, None) => {
                return Err(SddsError::invalid_argument(
                    "a file copy needs a filename",
                ))
            }
            (CopyTarget::Memory, _) => Dataset::open_memory(options)?,
        };
        dataset.layout = source.layout.clone();
        dataset.after_layout_change();
        Ok(dataset)
    }

    /// Replace this dataset's definitions with `source`'s
    pub fn copy_layout(&mut self, source: &Dataset) -> Result<()> {
        self.ensure_layout_mutable("copy a layout")?;
        self.layout.copy_from(&source.layout);
        self.after_layout_change();
        Ok(())
    }

    /// Add the definitions of `source` that this dataset lacks
    pub fn append_layout(&mut self, source: &Dataset) -> Result<()> {
        self.ensure_layout_mutable("append a layout")?;
        self.layout.append_from(&source.layout)?;
        self.after_layout_change();
        Ok(())
    }

    /// Copy one definition from `source`, optionally under a new name
    pub fn transfer_definition(
        &mut self,
        source: &Dataset,
        kind: FieldKind,
        name: &str,
        new_name: Option<&str>,
        policy: NamePolicy,
    ) -> Result<usize> {
        let missing = || SddsError::not_found(format!("{} {} in source", kind, name));
        let rename = |info: &mut FieldInfo| {
            if let Some(n) = new_name.filter(|n| !n.is_empty()) {
                info.name = n.to_string();
            }
        };
        match kind {
            FieldKind::Parameter => {
                let mut def = source.layout.parameters.get(name).cloned().ok_or_else(missing)?;
                rename(&mut def.info);
                self.define_parameter(def, policy, DefinitionMode::Normal)
            }
            FieldKind::Column => {
                let mut def = source.layout.columns.get(name).cloned().ok_or_else(missing)?;
                rename(&mut def.info);
                self.define_column(def, policy, DefinitionMode::Normal)
            }
            FieldKind::Array => {
                let mut def = source.layout.arrays.get(name).cloned().ok_or_else(missing)?;
                rename(&mut def.info);
                self.define_array(def, policy, DefinitionMode::Normal)
            }
        }
    }

    /// Copy every definition of one kind from `source`
    pub fn transfer_all_definitions(
        &mut self,
        source: &Dataset,
        kind: FieldKind,
        mode: TransferMode,
    ) -> Result<()> {
        self.ensure_layout_mutable("transfer definitions")?;
        match kind {
            FieldKind::Parameter => {
                transfer_all(&mut self.layout.parameters, &source.layout.parameters, mode)?
            }
            FieldKind::Column => {
                transfer_all(&mut self.layout.columns, &source.layout.columns, mode)?
            }
            FieldKind::Array => transfer_all(&mut self.layout.arrays, &source.layout.arrays, mode)?,
        }
        self.after_layout_change();
        Ok(())
    }

    /// Define a column shaped like `source`'s parameter `name`
    pub fn define_column_like_parameter(
        &mut self,
        source: &Dataset,
        name: &str,
        new_name: Option<&str>,
        policy: NamePolicy,
    ) -> Result<usize> {
        let param = source
            .layout
            .parameters
            .get(name)
            .ok_or_else(|| SddsError::not_found(format!("parameter {} in source", name)))?;
        let mut def = ColumnDefinition::like_parameter(param);
        if let Some(n) = new_name.filter(|n| !n.is_empty()) {
            def.info.name = n.to_string();
        }
        self.define_column(def, policy, DefinitionMode::Normal)
    }

    /// Define a parameter shaped like `source`'s column `name`
    pub fn define_parameter_like_column(
        &mut self,
        source: &Dataset,
        name: &str,
        new_name: Option<&str>,
        policy: NamePolicy,
    ) -> Result<usize> {
        let column = source
            .layout
            .columns
            .get(name)
            .ok_or_else(|| SddsError::not_found(format!("column {} in source", name)))?;
        let mut def = ParameterDefinition::like_column(column);
        if let Some(n) = new_name.filter(|n| !n.is_empty()) {
            def.info.name = n.to_string();
        }
        self.define_parameter(def, policy, DefinitionMode::Normal)
    }

    /// Start a page sized for `source`'s rows and copy all of its data
    pub fn copy_page(&mut self, source: &Dataset) -> Result<()> {
        self.start_page(source.page.n_rows.max(1))?;
        self.copy_parameters(source)?;
        self.copy_arrays(source)?;
        self.copy_columns(source)
    }

    /// Copy parameter values with matching names
    pub fn copy_parameters(&mut self, source: &Dataset) -> Result<()> {
        let names: Vec<String> = self.layout.parameters.keys().cloned().collect();
        for name in names {
            let (Some(target_def), Some(src_index)) = (
                self.layout.parameters.get(&name),
                source.layout.parameters.get_index_of(&name),
            ) else {
                continue;
            };
            if target_def.fixed_value.is_some() {
                continue;
            }
            let value = source.parameter_value(src_index)?.convert(target_def.info.type_tag)?;
            self.page.parameters.insert(name, value);
        }
        Ok(())
    }

    /// Copy array values with matching names
    pub fn copy_arrays(&mut self, source: &Dataset) -> Result<()> {
        let names: Vec<String> = self.layout.arrays.keys().cloned().collect();
        for name in names {
            let (Some(target_def), Some(src)) =
                (self.layout.arrays.get(&name), source.page.arrays.get(&name))
            else {
                continue;
            };
            if target_def.dimensions != src.dimensions.len() {
                return Err(SddsError::schema(format!(
                    "array {} has {} dimensions in the target and {} in the source",
                    name,
                    target_def.dimensions,
                    src.dimensions.len()
                )));
            }
            let data = convert_buffer(&src.data, target_def.info.type_tag)?;
            let value = ArrayValue::with_data(src.dimensions.clone(), data)?;
            self.page.arrays.insert(name, value);
        }
        Ok(())
    }

    /// Copy whole columns with matching names, along with row flags
    pub fn copy_columns(&mut self, source: &Dataset) -> Result<()> {
        self.require_page()?;
        let n_rows = source.page.n_rows;
        let names: Vec<String> = self.layout.columns.keys().cloned().collect();
        for (index, name) in names.iter().enumerate() {
            let Some(src_index) = source.layout.columns.get_index_of(name) else {
                continue;
            };
            let data = source.page.column_values(src_index)?;
            let data = convert_buffer(&data, self.layout.columns[index].info.type_tag)?;
            self.page.set_column(index, data, self.flags.fixed_row_count)?;
        }
        if n_rows == 0 {
            return Ok(());
        }
        self.page.ensure_row(n_rows - 1, self.flags.fixed_row_count)?;
        self.page.n_rows = self.page.n_rows.max(n_rows);
        self.page.row_flags[..n_rows].copy_from_slice(&source.page.row_flags[..n_rows]);
        for written in &mut self.page.row_written[..n_rows] {
            *written = true;
        }
        Ok(())
    }

    fn copy_row_cells(
        &mut self,
        target_row: usize,
        source: &Dataset,
        source_row: usize,
        respect_column_flags: bool,
    ) -> Result<()> {
        self.require_page()?;
        let mut cells = Vec::new();
        for (index, (name, def)) in self.layout.columns.iter().enumerate() {
            let Some((src_index, _, slot)) = source.page.columns.get_full(name) else {
                continue;
            };
            if respect_column_flags && !slot.selected {
                continue;
            }
            let value = source.page.cell(src_index, source_row)?.convert(def.info.type_tag)?;
            cells.push((index, value));
        }
        self.set_row(target_row, cells)
    }

    /// Copy the `nth` selected row of `source` into `target_row`, skipping
    /// deselected columns
    pub fn copy_row(&mut self, target_row: usize, source: &Dataset, nth: usize) -> Result<()> {
        let source_row = source.page.nth_selected_row(nth).ok_or_else(|| {
            SddsError::invalid_argument(format!("source has no selected row {}", nth))
        })?;
        self.copy_row_cells(target_row, source, source_row, true)
    }

    /// Copy row `source_row` of `source` into `target_row`, ignoring flags
    pub fn copy_row_direct(
        &mut self,
        target_row: usize,
        source: &Dataset,
        source_row: usize,
    ) -> Result<()> {
        self.copy_row_cells(target_row, source, source_row, false)
    }

    /// Append all selected rows of `source` after this page's last row.
    /// Returns the number of rows appended.
    pub fn copy_additional_rows(&mut self, source: &Dataset) -> Result<usize> {
        self.require_page()?;
        let rows = source.page.selected_rows();
        let first = self.page.n_rows;
        for (offset, &row) in rows.iter().enumerate() {
            self.copy_row_cells(first + offset, source, row, false)?;
        }
        Ok(rows.len())
    }
}
