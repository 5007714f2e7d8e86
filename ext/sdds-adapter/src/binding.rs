//! The handle-indexed facade and its session-level operations

use std::path::Path;

use crate::config::{BindingConfig, OutputOptions, SessionFlags};
use crate::diagnostics::{Diagnostics, FatalHook, PrintMode};
use crate::error::{BindingError, Result};
use crate::handle::{HandleTable, Session};
use crate::value::FieldRef;
use sdds_core::{CopyTarget, DataMode, Dataset, FieldKind};

/// Every operation of the handle API, addressed by dataset index
#[derive(Debug)]
pub struct Sdds {
    pub(crate) handles: HandleTable,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) config: BindingConfig,
}

impl Default for Sdds {
    fn default() -> Self {
        Self::new(BindingConfig::default())
    }
}

impl Sdds {
    pub fn new(config: BindingConfig) -> Self {
        Self {
            handles: HandleTable::new(config.capacity),
            diagnostics: Diagnostics::new(config.logger()),
            config,
        }
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.handles.capacity()
    }

    pub fn is_open(&self, handle: usize) -> bool {
        self.handles.is_open(handle)
    }

    /// Push queued error kinds onto the diagnostics queue
    pub(crate) fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_queued() {
                self.diagnostics.set_error(err.to_string());
            } else {
                self.diagnostics
                    .logger()
                    .debug(|| format!("sentinel failure: {}", err));
            }
        }
        result
    }

    pub(crate) fn with_session<T, F>(&mut self, handle: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session, &BindingConfig) -> Result<T>,
    {
        let result = match self.handles.get_mut(handle) {
            Ok(session) => f(session, &self.config),
            Err(e) => Err(e),
        };
        self.record(result)
    }

    pub(crate) fn with_dataset<T, F>(&mut self, handle: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut Dataset) -> Result<T>,
    {
        self.with_session(handle, |session, _| f(&mut session.dataset))
    }

    pub(crate) fn with_pair<T, F>(&mut self, target: usize, source: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut Dataset, &Dataset) -> Result<T>,
    {
        let result = match self.handles.pair_mut(target, source) {
            Ok((t, s)) => f(&mut t.dataset, &s.dataset),
            Err(e) => Err(e),
        };
        self.record(result)
    }

    fn install(&mut self, handle: usize, dataset: Result<Dataset>) -> Result<()> {
        let result = dataset.and_then(|ds| {
            let mode = ds.mode();
            if self.handles.install(handle, Session::new(ds))?.is_some() {
                self.diagnostics
                    .warning(&format!("handle {} was still open and has been replaced", handle));
            }
            self.diagnostics
                .logger()
                .debug(|| format!("handle {} opened ({:?})", handle, mode));
            Ok(())
        });
        self.record(result)
    }

    fn check_slot(&self, handle: usize) -> Result<()> {
        if handle >= self.handles.capacity() {
            return Err(BindingError::UnknownHandle(handle));
        }
        Ok(())
    }

    // ---- opening and closing ----

    pub fn open_input<P: AsRef<Path>>(&mut self, handle: usize, path: P) -> Result<()> {
        let dataset = self
            .check_slot(handle)
            .and_then(|_| Ok(Dataset::open_input(path)?));
        self.install(handle, dataset)
    }

    /// Open a file without a header. Define the layout before reading.
    pub fn init_headerless_input<P: AsRef<Path>>(&mut self, handle: usize, path: P) -> Result<()> {
        let dataset = self
            .check_slot(handle)
            .and_then(|_| Ok(Dataset::open_headerless_input(path)?));
        self.install(handle, dataset)
    }

    pub fn open_output<P: AsRef<Path>>(
        &mut self,
        handle: usize,
        path: P,
        options: OutputOptions,
    ) -> Result<()> {
        let dataset = self
            .check_slot(handle)
            .and_then(|_| Ok(Dataset::open_output(path, options)?));
        self.install(handle, dataset)
    }

    /// Open an output dataset that never touches a file
    pub fn open_memory(&mut self, handle: usize, options: OutputOptions) -> Result<()> {
        let dataset = self
            .check_slot(handle)
            .and_then(|_| Ok(Dataset::open_memory(options)?));
        self.install(handle, dataset)
    }

    pub fn open_append<P: AsRef<Path>>(&mut self, handle: usize, path: P) -> Result<()> {
        let dataset = self
            .check_slot(handle)
            .and_then(|_| Ok(Dataset::open_append(path)?));
        self.install(handle, dataset)
    }

    /// Reopen the last page of a file for more rows. Returns the rows the
    /// page already holds. With a non-zero `update_interval` the page is
    /// updated on disk after every that many rows set through
    /// [`Sdds::set_row_values`].
    pub fn open_append_to_page<P: AsRef<Path>>(
        &mut self,
        handle: usize,
        path: P,
        update_interval: usize,
    ) -> Result<usize> {
        let opened = self
            .check_slot(handle)
            .and_then(|_| Ok(Dataset::open_append_to_page(path)?));
        let (dataset, rows) = match opened {
            Ok(pair) => pair,
            Err(e) => return self.record(Err(e)),
        };
        self.install(handle, Ok(dataset))?;
        self.with_session(handle, |session, _| {
            session.update_interval = update_interval;
            Ok(rows)
        })
    }

    /// Close the session at `handle` and free the slot
    pub fn terminate(&mut self, handle: usize) -> Result<()> {
        let result = self
            .handles
            .release(handle)
            .and_then(|session| Ok(session.dataset.terminate()?));
        if result.is_ok() {
            self.diagnostics
                .logger()
                .debug(|| format!("handle {} terminated", handle));
        }
        self.record(result)
    }

    // ---- session flags ----

    pub fn set_column_major(&mut self, handle: usize, column_major: bool) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.set_column_major(column_major)?))
    }

    pub fn set_row_major(&mut self, handle: usize) -> Result<()> {
        self.set_column_major(handle, false)
    }

    pub fn set_fixed_row_count(&mut self, handle: usize, fixed: bool) -> Result<()> {
        self.with_dataset(handle, |ds| {
            ds.set_fixed_row_count(fixed);
            Ok(())
        })
    }

    pub fn enable_fsync(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| {
            ds.set_fsync(true);
            Ok(())
        })
    }

    pub fn disable_fsync(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| {
            ds.set_fsync(false);
            Ok(())
        })
    }

    /// Hold the header back until the first page write
    pub fn defer_saving_layout(&mut self, handle: usize, defer: bool) -> Result<()> {
        self.with_dataset(handle, |ds| {
            ds.set_defer_layout(defer);
            Ok(())
        })
    }

    pub fn set_terminate_mode(&mut self, handle: usize, mode: u32) -> Result<()> {
        self.with_session(handle, |session, _| {
            session.terminate_mode = mode;
            Ok(())
        })
    }

    pub fn session_flags(&mut self, handle: usize) -> Result<SessionFlags> {
        self.with_session(handle, |session, _| {
            let flags = session.dataset.flags();
            Ok(SessionFlags {
                column_major: session.dataset.layout().column_major,
                fixed_row_count: flags.fixed_row_count,
                fsync: flags.fsync,
                defer_layout: flags.defer_layout,
                terminate_mode: session.terminate_mode,
            })
        })
    }

    /// Turn the consistency check after page reads and writes on or off.
    /// Returns the previous setting.
    pub fn set_auto_check_mode(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.config.auto_check, enabled)
    }

    // ---- layout lifecycle ----

    pub fn write_layout(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.write_layout()?))
    }

    pub fn erase_data(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.erase_data()?))
    }

    pub fn save_layout(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| {
            ds.save_layout();
            Ok(())
        })
    }

    pub fn restore_layout(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.restore_layout()?))
    }

    pub fn set_data_mode(&mut self, handle: usize, mode: DataMode) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.set_data_mode(mode)?))
    }

    pub fn get_mode(&mut self, handle: usize) -> Result<DataMode> {
        self.with_dataset(handle, |ds| Ok(ds.data_mode()))
    }

    /// Consistency self-check; `caller` prefixes any failure message
    pub fn check_dataset(&mut self, handle: usize, caller: &str) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.check(caller)?))
    }

    // ---- copying between handles ----

    /// Open `target` as a copy of `source`'s layout. `filemode` is `"w"`
    /// to write `filename`, or `"m"` to stay in memory.
    pub fn initialize_copy(
        &mut self,
        target: usize,
        source: usize,
        filename: Option<&Path>,
        filemode: &str,
    ) -> Result<()> {
        let dataset = (|| -> Result<Dataset> {
            self.check_slot(target)?;
            let mode = CopyTarget::from_mode(filemode).ok_or_else(|| {
                BindingError::invalid_arguments(format!("unknown copy file mode {:?}", filemode))
            })?;
            let source = &self.handles.get(source)?.dataset;
            Ok(Dataset::initialize_copy(source, filename, mode)?)
        })();
        self.install(target, dataset)
    }

    pub fn copy_layout(&mut self, target: usize, source: usize) -> Result<()> {
        self.with_pair(target, source, |t, s| Ok(t.copy_layout(s)?))
    }

    pub fn append_layout(&mut self, target: usize, source: usize) -> Result<()> {
        self.with_pair(target, source, |t, s| Ok(t.append_layout(s)?))
    }

    pub fn copy_page(&mut self, target: usize, source: usize) -> Result<()> {
        self.with_pair(target, source, |t, s| Ok(t.copy_page(s)?))
    }

    pub fn copy_parameters(&mut self, target: usize, source: usize) -> Result<()> {
        self.with_pair(target, source, |t, s| Ok(t.copy_parameters(s)?))
    }

    pub fn copy_arrays(&mut self, target: usize, source: usize) -> Result<()> {
        self.with_pair(target, source, |t, s| Ok(t.copy_arrays(s)?))
    }

    pub fn copy_columns(&mut self, target: usize, source: usize) -> Result<()> {
        self.with_pair(target, source, |t, s| Ok(t.copy_columns(s)?))
    }

    /// Copy the `source_row`-th selected row of `source`, leaving out
    /// deselected columns
    pub fn copy_row(
        &mut self,
        target: usize,
        target_row: usize,
        source: usize,
        source_row: usize,
    ) -> Result<()> {
        self.with_pair(target, source, |t, s| Ok(t.copy_row(target_row, s, source_row)?))
    }

    /// Copy row `source_row` of `source` regardless of selection flags
    pub fn copy_row_direct(
        &mut self,
        target: usize,
        target_row: usize,
        source: usize,
        source_row: usize,
    ) -> Result<()> {
        self.with_pair(target, source, |t, s| {
            Ok(t.copy_row_direct(target_row, s, source_row)?)
        })
    }

    /// Append the selected rows of `source` after the target's rows.
    /// Returns how many were appended.
    pub fn copy_additional_rows(&mut self, target: usize, source: usize) -> Result<usize> {
        self.with_pair(target, source, |t, s| Ok(t.copy_additional_rows(s)?))
    }

    // ---- diagnostics ----

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn set_error<S: Into<String>>(&mut self, text: S) {
        self.diagnostics.set_error(text);
    }

    pub fn number_of_errors(&self) -> usize {
        self.diagnostics.number_of_errors()
    }

    pub fn clear_errors(&mut self) {
        self.diagnostics.clear_errors();
    }

    pub fn print_errors(&mut self, mode: PrintMode) {
        self.diagnostics.print_errors(mode);
    }

    pub fn register_program_name<S: Into<String>>(&mut self, name: S) {
        self.diagnostics.register_program_name(name);
    }

    pub fn warning(&self, text: &str) {
        self.diagnostics.warning(text);
    }

    /// Fatal report. Exits the process unless a fatal hook is installed.
    pub fn bomb(&mut self, text: &str) -> BindingError {
        self.diagnostics.bomb(text)
    }

    pub fn set_fatal_hook(&mut self, hook: FatalHook) {
        self.diagnostics.set_fatal_hook(hook);
    }

    // ---- shared lookups ----

    pub(crate) fn resolve(ds: &Dataset, kind: FieldKind, field: &FieldRef) -> Result<usize> {
        match field {
            FieldRef::ByName(name) => ds
                .layout()
                .field_index(kind, name)
                .ok_or_else(|| BindingError::name_not_found(format!("{} {}", kind, name))),
            FieldRef::ByIndex(index) => {
                let count = ds.layout().field_count(kind);
                if *index < count {
                    Ok(*index)
                } else {
                    Err(BindingError::name_not_found(format!(
                        "{} index {} (dataset has {})",
                        kind, index, count
                    )))
                }
            }
        }
    }
}
