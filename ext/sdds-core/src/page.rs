use crate::schema::{FieldMap, Layout};
use crate::{ArrayValue, ColumnData, NativeValue, Result, SddsError};

/// Row capacity used when a page is started without a hint
pub const DEFAULT_ROW_CAPACITY: usize = 100;

/// One column's cells plus its selection state
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSlot {
    pub data: ColumnData,
    /// Included by column selection
    pub selected: bool,
    /// Written since the page was started
    pub written: bool,
}

impl ColumnSlot {
    fn new(data: ColumnData) -> Self {
        Self {
            data,
            selected: true,
            written: false,
        }
    }
}

/// The tabular data of one page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// 1-based page number; 0 before the first page
    pub number: u32,
    /// Rows in use
    pub n_rows: usize,
    /// Rows the column buffers can hold
    pub capacity: usize,
    pub parameters: FieldMap<NativeValue>,
    pub arrays: FieldMap<ArrayValue>,
    pub columns: FieldMap<ColumnSlot>,
    pub row_flags: Vec<bool>,
    pub row_written: Vec<bool>,
}

impl Page {
    /// An empty page shaped after `layout`
    pub fn new(layout: &Layout) -> Self {
        let mut page = Page::default();
        page.reset(layout, 0);
        page
    }

    /// Drop all data and size the buffers for `capacity` rows
    pub fn reset(&mut self, layout: &Layout, capacity: usize) {
        self.n_rows = 0;
        self.capacity = capacity;
        self.parameters = layout
            .parameters
            .iter()
            .map(|(name, def)| (name.clone(), NativeValue::default_for(def.info.type_tag)))
            .collect();
        self.arrays = layout
            .arrays
            .iter()
            .map(|(name, def)| {
                (
                    name.clone(),
                    ArrayValue::new(def.info.type_tag, vec![0; def.dimensions]),
                )
            })
            .collect();
        self.columns = layout
            .columns
            .iter()
            .map(|(name, def)| {
                (
                    name.clone(),
                    ColumnSlot::new(ColumnData::new(def.info.type_tag, capacity)),
                )
            })
            .collect();
        self.row_flags = vec![true; capacity];
        self.row_written = vec![false; capacity];
    }

    /// Bring the buffers in line with `layout` after definitions changed,
    /// keeping data for fields whose name and type survived
    pub fn sync(&mut self, layout: &Layout) {
        let mut parameters = FieldMap::default();
        for (name, def) in &layout.parameters {
            let value = match self.parameters.swap_remove(name) {
                Some(v) if v.type_tag() == def.info.type_tag => v,
                _ => NativeValue::default_for(def.info.type_tag),
            };
            parameters.insert(name.clone(), value);
        }
        self.parameters = parameters;

        let mut arrays = FieldMap::default();
        for (name, def) in &layout.arrays {
            let value = match self.arrays.swap_remove(name) {
                Some(v) if v.type_tag() == def.info.type_tag && v.dimensions.len() == def.dimensions => v,
                _ => ArrayValue::new(def.info.type_tag, vec![0; def.dimensions]),
            };
            arrays.insert(name.clone(), value);
        }
        self.arrays = arrays;

        let mut columns = FieldMap::default();
        for (name, def) in &layout.columns {
            let slot = match self.columns.swap_remove(name) {
                Some(s) if s.data.type_tag() == def.info.type_tag => s,
                _ => ColumnSlot::new(ColumnData::new(def.info.type_tag, self.capacity)),
            };
            columns.insert(name.clone(), slot);
        }
        self.columns = columns;
    }

    /// Make room for `row`. Fails in fixed-row-count mode.
    pub fn ensure_row(&mut self, row: usize, fixed: bool) -> Result<()> {
        if row < self.capacity {
            return Ok(());
        }
        if fixed {
            return Err(SddsError::state(format!(
                "row {} is beyond the fixed row count {}",
                row, self.capacity
            )));
        }
        let grown = (row + 1).max(self.capacity * 2).max(DEFAULT_ROW_CAPACITY);
        self.grow_to(grown);
        Ok(())
    }

    /// Add `additional` rows of capacity
    pub fn lengthen(&mut self, additional: usize) {
        self.grow_to(self.capacity + additional);
    }

    fn grow_to(&mut self, capacity: usize) {
        for slot in self.columns.values_mut() {
            slot.data.resize(capacity);
        }
        self.row_flags.resize(capacity, true);
        self.row_written.resize(capacity, false);
        self.capacity = capacity;
    }

    /// Forget every row but keep the page open
    pub fn clear_rows(&mut self) {
        let capacity = self.capacity;
        for slot in self.columns.values_mut() {
            let tag = slot.data.type_tag();
            slot.data = ColumnData::new(tag, capacity);
            slot.written = false;
        }
        self.n_rows = 0;
        self.row_flags = vec![true; capacity];
        self.row_written = vec![false; capacity];
    }

    /// Store one cell, growing the row count to cover it
    pub fn set_cell(&mut self, column: usize, row: usize, value: NativeValue, fixed: bool) -> Result<()> {
        self.ensure_row(row, fixed)?;
        let (_, slot) = self
            .columns
            .get_index_mut(column)
            .ok_or_else(|| SddsError::not_found(format!("column index {}", column)))?;
        slot.data.set(row, value)?;
        slot.written = true;
        self.row_written[row] = true;
        if row >= self.n_rows {
            self.n_rows = row + 1;
        }
        Ok(())
    }

    pub fn cell(&self, column: usize, row: usize) -> Result<NativeValue> {
        if row >= self.n_rows {
            return Err(SddsError::invalid_argument(format!(
                "row {} out of range ({} rows)",
                row, self.n_rows
            )));
        }
        let (_, slot) = self
            .columns
            .get_index(column)
            .ok_or_else(|| SddsError::not_found(format!("column index {}", column)))?;
        slot.data
            .get(row)
            .ok_or_else(|| SddsError::invalid_argument(format!("row {} out of range", row)))
    }

    /// Replace a whole column. Grows the page if the data is longer than the
    /// current row count.
    pub fn set_column(&mut self, column: usize, mut data: ColumnData, fixed: bool) -> Result<()> {
        let len = data.len();
        if len > 0 {
            self.ensure_row(len - 1, fixed)?;
        }
        let n_rows = self.n_rows.max(len);
        let capacity = self.capacity;
        let (name, slot) = self
            .columns
            .get_index_mut(column)
            .ok_or_else(|| SddsError::not_found(format!("column index {}", column)))?;
        if data.type_tag() != slot.data.type_tag() {
            return Err(SddsError::type_mismatch(format!(
                "column {} holds {}, got {}",
                name,
                slot.data.type_tag(),
                data.type_tag()
            )));
        }
        data.resize(capacity);
        slot.data = data;
        slot.written = true;
        for flag in &mut self.row_written[..len] {
            *flag = true;
        }
        self.n_rows = n_rows;
        Ok(())
    }

    /// The first `n_rows` cells of a column
    pub fn column_values(&self, column: usize) -> Result<ColumnData> {
        let (_, slot) = self
            .columns
            .get_index(column)
            .ok_or_else(|| SddsError::not_found(format!("column index {}", column)))?;
        let mut data = slot.data.clone();
        data.truncate(self.n_rows);
        Ok(data)
    }

    /// Indices of rows in use whose selection flag is set
    pub fn selected_rows(&self) -> Vec<usize> {
        (0..self.n_rows).filter(|&r| self.row_flags[r]).collect()
    }

    /// Resolve the `nth` selected row to its position in the page
    pub fn nth_selected_row(&self, nth: usize) -> Option<usize> {
        self.selected_rows().get(nth).copied()
    }

    pub fn set_row_flags(&mut self, value: bool) {
        for flag in &mut self.row_flags {
            *flag = value;
        }
    }

    pub fn set_column_flags(&mut self, value: bool) {
        for slot in self.columns.values_mut() {
            slot.selected = value;
        }
    }

    pub fn row_flag(&self, row: usize) -> Option<bool> {
        if row < self.n_rows {
            self.row_flags.get(row).copied()
        } else {
            None
        }
    }

    /// Keep only the rows at `rows`, in that order
    pub fn keep_rows(&mut self, rows: &[usize]) {
        for slot in self.columns.values_mut() {
            slot.data = slot.data.select(rows);
        }
        self.row_flags = rows.iter().map(|&r| self.row_flags[r]).collect();
        self.row_written = rows.iter().map(|&r| self.row_written[r]).collect();
        self.n_rows = rows.len();
        self.capacity = rows.len();
    }

    /// Drop rows that were never written or are deselected
    pub fn delete_unset_rows(&mut self) {
        let rows: Vec<usize> = (0..self.n_rows)
            .filter(|&r| self.row_written[r] && self.row_flags[r])
            .collect();
        self.keep_rows(&rows);
    }

    /// Names of columns never written or deselected
    pub fn unset_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, slot)| !(slot.written && slot.selected))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Mark every row and column as written and selected, after a read
    pub fn mark_loaded(&mut self, n_rows: usize) {
        self.n_rows = n_rows;
        self.capacity = n_rows;
        self.row_flags = vec![true; n_rows];
        self.row_written = vec![true; n_rows];
        for slot in self.columns.values_mut() {
            slot.written = true;
            slot.selected = true;
        }
    }
}
