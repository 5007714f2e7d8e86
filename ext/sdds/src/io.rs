//! Loading and saving whole files through the handle API

use crate::document::{ArrayPage, SddsFile};
use crate::error::{Result, SddsFileError};
use sdds_adapter::{with_global, FieldKind, FieldRef, OutputOptions, Sdds};
use std::path::Path;

/// Which rows of each page a load keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSelection {
    #[default]
    All,
    /// Rows `offset, offset + interval, ...`
    Sparse { interval: usize, offset: usize },
    /// The final rows of each page
    LastRows(usize),
}

fn free_handle(sdds: &Sdds) -> Result<usize> {
    (0..sdds.capacity())
        .find(|&handle| !sdds.is_open(handle))
        .ok_or(SddsFileError::NoFreeHandle(sdds.capacity()))
}

/// Release `handle` whatever the outcome. The first error wins.
fn finish<T>(sdds: &mut Sdds, handle: usize, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            sdds.terminate(handle)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(cleanup) = sdds.terminate(handle) {
                sdds.diagnostics()
                    .logger()
                    .warn(|| format!("releasing handle {}: {}", handle, cleanup));
            }
            Err(err)
        }
    }
}

fn read_next(sdds: &mut Sdds, handle: usize, selection: PageSelection) -> Result<Option<u32>> {
    let page = match selection {
        PageSelection::All => sdds.read_page(handle)?,
        PageSelection::Sparse { interval, offset } => {
            sdds.read_page_sparse(handle, interval, offset)?
        }
        PageSelection::LastRows(rows) => sdds.read_page_last_rows(handle, rows)?,
    };
    Ok(page)
}

fn read_all(
    sdds: &mut Sdds,
    handle: usize,
    path: &Path,
    selection: PageSelection,
) -> Result<SddsFile> {
    let mut file = SddsFile::new().with_mode(sdds.get_mode(handle)?);
    let (text, contents) = sdds.get_description(handle)?;
    file.set_description(text, contents);
    for kind in [FieldKind::Parameter, FieldKind::Array, FieldKind::Column] {
        for index in 0..sdds.field_count(handle, kind)? {
            file.define(sdds.field_definition(handle, kind, &FieldRef::ByIndex(index))?)?;
        }
    }

    let mut pages = 0;
    while read_next(sdds, handle, selection)?.is_some() {
        for (index, parameter) in file.parameters_mut().enumerate() {
            let value = sdds.get_parameter(handle, &FieldRef::ByIndex(index))?;
            parameter.values.push(value);
        }
        for (index, array) in file.arrays_mut().enumerate() {
            let (values, dimensions) = sdds.get_array(handle, &FieldRef::ByIndex(index))?;
            array.pages.push(ArrayPage::new(values, dimensions));
        }
        for (index, column) in file.columns_mut().enumerate() {
            column
                .pages
                .push(sdds.get_column(handle, &FieldRef::ByIndex(index))?);
        }
        pages += 1;
    }
    if pages == 0 {
        return Err(SddsFileError::NoPages(path.display().to_string()));
    }
    Ok(file)
}

/// Load every page of `path` using a free handle of `sdds`
pub fn load_with(sdds: &mut Sdds, path: &Path, selection: PageSelection) -> Result<SddsFile> {
    let handle = free_handle(sdds)?;
    sdds.open_input(handle, path)?;
    let loaded = read_all(sdds, handle, path, selection);
    finish(sdds, handle, loaded)
}

fn write_all(file: &SddsFile, sdds: &mut Sdds, handle: usize, pages: usize) -> Result<()> {
    for parameter in file.parameters() {
        let definition = &parameter.definition;
        sdds.define_parameter(
            handle,
            definition.info.clone(),
            &definition.fixed_value.clone().into(),
        )?;
    }
    for array in file.arrays() {
        let definition = &array.definition;
        sdds.define_array(
            handle,
            definition.info.clone(),
            definition.group_name.as_deref(),
            definition.field_length,
            definition.dimensions,
        )?;
    }
    for column in file.columns() {
        sdds.define_column(handle, column.definition.info.clone(), column.definition.field_length)?;
    }
    sdds.write_layout(handle)?;

    for page in 0..pages {
        sdds.start_page(handle, file.row_count(page)?)?;
        for (index, parameter) in file.parameters().enumerate() {
            // fixed values live in the header
            if parameter.definition.fixed_value.is_some() {
                continue;
            }
            sdds.set_parameter(handle, &FieldRef::ByIndex(index), &parameter.values[page])?;
        }
        for (index, array) in file.arrays().enumerate() {
            let value = &array.pages[page];
            sdds.set_array(
                handle,
                &FieldRef::ByIndex(index),
                &value.values,
                &value.dimensions,
            )?;
        }
        for (index, column) in file.columns().enumerate() {
            sdds.set_column(handle, &FieldRef::ByIndex(index), &column.pages[page])?;
        }
        sdds.write_page(handle)?;
    }
    Ok(())
}

/// Validate `file`, then write it to `path` using a free handle of `sdds`.
/// Nothing is created when validation fails.
pub fn save_with(file: &SddsFile, sdds: &mut Sdds, path: &Path) -> Result<()> {
    let pages = file.validate()?;
    let handle = free_handle(sdds)?;
    let mut options = OutputOptions::new().with_data_mode(file.mode);
    if let Some(text) = &file.description.text {
        options = options.with_description(text.as_str());
    }
    if let Some(contents) = &file.description.contents {
        options = options.with_contents(contents.as_str());
    }
    sdds.open_output(handle, path, options)?;
    let written = write_all(file, sdds, handle, pages);
    finish(sdds, handle, written)
}

impl SddsFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_selected(path, PageSelection::All)
    }

    pub fn load_sparse<P: AsRef<Path>>(path: P, interval: usize, offset: usize) -> Result<Self> {
        Self::load_selected(path, PageSelection::Sparse { interval, offset })
    }

    pub fn load_last_rows<P: AsRef<Path>>(path: P, rows: usize) -> Result<Self> {
        Self::load_selected(path, PageSelection::LastRows(rows))
    }

    /// Load through the process-wide handle table
    pub fn load_selected<P: AsRef<Path>>(path: P, selection: PageSelection) -> Result<Self> {
        with_global(|sdds| load_with(sdds, path.as_ref(), selection))
    }

    /// Save through the process-wide handle table
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        with_global(|sdds| save_with(self, sdds, path.as_ref()))
    }
}
