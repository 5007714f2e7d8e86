use super::{AccessMode, Dataset, DiskPage, OutputState, PageState};
use crate::header::{parse_header, render_header};
use crate::page::DEFAULT_ROW_CAPACITY;
use crate::reader::{PageReader, RowSelection};
use crate::schema::Layout;
use crate::writer::{encode_count, encode_page, encode_rows};
use crate::{DataMode, ErrorContext, Result, SddsError};
use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// Settings for a new output dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub data_mode: DataMode,
    pub lines_per_row: u32,
    pub description: Option<String>,
    pub contents: Option<String>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            data_mode: DataMode::Binary,
            lines_per_row: 1,
            description: None,
            contents: None,
        }
    }
}

impl OutputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_mode(mut self, mode: DataMode) -> Self {
        self.data_mode = mode;
        self
    }

    pub fn with_lines_per_row(mut self, lines: u32) -> Self {
        self.lines_per_row = lines.max(1);
        self
    }

    /// Description text; an empty string means none
    pub fn with_description<S: Into<String>>(mut self, text: S) -> Self {
        self.description = Some(text.into()).filter(|s| !s.is_empty());
        self
    }

    /// Description contents; an empty string means none
    pub fn with_contents<S: Into<String>>(mut self, contents: S) -> Self {
        self.contents = Some(contents.into()).filter(|s| !s.is_empty());
        self
    }

    fn layout(&self) -> Layout {
        let mut layout = Layout::new();
        layout.data_mode = self.data_mode;
        layout.lines_per_row = self.lines_per_row;
        layout.set_description(self.description.clone(), self.contents.clone());
        layout
    }
}

/// What `update_page` does with rows once they are on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Keep written rows in memory
    #[default]
    Normal,
    /// Drop written rows from memory
    Flush,
}

impl UpdateMode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(UpdateMode::Normal),
            1 => Some(UpdateMode::Flush),
            _ => None,
        }
    }
}

fn new_output_state(file: Option<File>) -> OutputState {
    OutputState {
        file,
        layout_written: false,
        header_on_disk: false,
        header_end: 0,
        disk_page: None,
        pages_written: 0,
    }
}

impl Dataset {
    /// Create or truncate `path` for writing
    pub fn open_output<P: AsRef<Path>>(path: P, options: OutputOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut dataset =
            Dataset::with_layout(AccessMode::Output, Some(path.to_path_buf()), options.layout());
        dataset.output = Some(new_output_state(Some(file)));
        Ok(dataset)
    }

    /// An output dataset that keeps everything in memory
    pub fn open_memory(options: OutputOptions) -> Result<Self> {
        let mut dataset = Dataset::with_layout(AccessMode::Memory, None, options.layout());
        dataset.output = Some(new_output_state(None));
        Ok(dataset)
    }

    fn open_existing(path: &Path) -> Result<(File, Bytes, Layout, usize)> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("opening {} for append", path.display()))?;
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut buf)
            .with_context(|| format!("reading {}", path.display()))?;
        let data = Bytes::from(buf);
        let (layout, body) =
            parse_header(&data).with_context(|| format!("reading header of {}", path.display()))?;
        Ok((file, data, layout, body))
    }

    /// Open an existing file to add pages after its last one
    pub fn open_append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (mut file, data, layout, body) = Self::open_existing(path)?;
        let mut reader = PageReader::new(data, body);
        let mut pages = 0;
        while reader
            .read_page(&layout, pages + 1, RowSelection::All)?
            .is_some()
        {
            pages += 1;
        }
        let end = reader.position() as u64;
        file.set_len(end)?;
        file.seek(SeekFrom::End(0))?;
        let mut dataset = Dataset::with_layout(AccessMode::Append, Some(path.to_path_buf()), layout);
        let mut state = new_output_state(Some(file));
        state.layout_written = true;
        state.header_on_disk = true;
        state.header_end = body as u64;
        state.pages_written = pages;
        dataset.output = Some(state);
        Ok(dataset)
    }

    /// Open an existing file and reopen its last page for more rows.
    /// Returns the dataset and the number of rows the page already has.
    pub fn open_append_to_page<P: AsRef<Path>>(path: P) -> Result<(Self, usize)> {
        let path = path.as_ref();
        let (mut file, data, layout, body) = Self::open_existing(path)?;
        let mut reader = PageReader::new(data, body);
        let mut last = None;
        let mut pages = 0;
        while let Some(found) = reader.read_page(&layout, pages + 1, RowSelection::All)? {
            pages += 1;
            last = Some(found);
        }
        let (page, extent) =
            last.ok_or_else(|| SddsError::state(format!("{} has no page to append to", path.display())))?;
        file.set_len(extent.end as u64)?;
        file.seek(SeekFrom::End(0))?;
        let rows = page.n_rows;
        let mut dataset = Dataset::with_layout(AccessMode::Append, Some(path.to_path_buf()), layout);
        dataset.page = page;
        dataset.page_state = PageState::Open;
        let mut state = new_output_state(Some(file));
        state.layout_written = true;
        state.header_on_disk = true;
        state.header_end = body as u64;
        state.pages_written = pages;
        state.disk_page = Some(DiskPage {
            start: extent.start as u64,
            count_offset: extent.count_offset as u64,
            count_width: extent.count_width,
            rows_on_disk: rows,
            written_through: rows,
            flushed: false,
        });
        dataset.output = Some(state);
        Ok((dataset, rows))
    }

    fn output_mut(&mut self) -> Result<&mut OutputState> {
        self.output
            .as_mut()
            .ok_or_else(|| SddsError::state("dataset is not open for writing"))
    }

    /// Freeze the layout. The header is written now, or at the first page
    /// when layout writing is deferred.
    pub fn write_layout(&mut self) -> Result<()> {
        let defer = self.flags.defer_layout;
        let state = self.output_mut()?;
        if state.layout_written {
            return Err(SddsError::state("layout already written"));
        }
        state.layout_written = true;
        if !defer {
            self.flush_header()?;
        }
        Ok(())
    }

    fn flush_header(&mut self) -> Result<()> {
        let header = render_header(&self.layout);
        let state = self.output_mut()?;
        state.layout_written = true;
        if state.header_on_disk {
            return Ok(());
        }
        if let Some(file) = state.file.as_mut() {
            file.seek(SeekFrom::Start(0))?;
            file.write_all(header.as_bytes()).context("writing header")?;
            state.header_end = header.len() as u64;
        }
        state.header_on_disk = true;
        Ok(())
    }

    /// Open a new, empty page sized for `expected_rows`
    pub fn start_page(&mut self, expected_rows: usize) -> Result<()> {
        let state = self.output_mut()?;
        state.disk_page = None;
        let number = state.pages_written + 1;
        let capacity = if self.flags.fixed_row_count {
            expected_rows
        } else if expected_rows == 0 {
            DEFAULT_ROW_CAPACITY
        } else {
            expected_rows
        };
        self.page.reset(&self.layout, capacity);
        self.page.number = number;
        self.page_state = PageState::Open;
        Ok(())
    }

    /// Write the current page and close it
    pub fn write_page(&mut self) -> Result<()> {
        if self.page_state == PageState::NoPage {
            return Err(SddsError::state("no page has been started"));
        }
        let on_disk = self.output_mut()?.disk_page.is_some();
        if on_disk {
            self.append_pending_rows()?;
        } else {
            self.write_whole_page()?;
        }
        self.page_state = PageState::Closed;
        self.sync_if_requested()
    }

    /// Bring the page on disk up to date with the rows added since it was
    /// written. Writes the whole page if it has not reached the file yet.
    pub fn update_page(&mut self, mode: UpdateMode) -> Result<()> {
        if self.page_state == PageState::NoPage {
            return Err(SddsError::state("no page has been started"));
        }
        if mode == UpdateMode::Flush && self.layout.column_major {
            return Err(SddsError::state(
                "column-major pages cannot be flushed incrementally",
            ));
        }
        let on_disk = self.output_mut()?.disk_page.is_some();
        if on_disk {
            self.append_pending_rows()?;
        } else {
            self.write_whole_page()?;
        }
        if mode == UpdateMode::Flush {
            self.page.clear_rows();
            if let Some(disk) = self.output_mut()?.disk_page.as_mut() {
                disk.written_through = 0;
                disk.flushed = true;
            }
        }
        self.sync_if_requested()
    }

    fn sync_if_requested(&mut self) -> Result<()> {
        if !self.flags.fsync {
            return Ok(());
        }
        if let Some(file) = self.output_mut()?.file.as_mut() {
            file.sync_all().context("syncing output")?;
        }
        Ok(())
    }

    fn write_whole_page(&mut self) -> Result<()> {
        if !self.output_mut()?.header_on_disk {
            self.flush_header()?;
        }
        let rows = self.page.selected_rows();
        let written_through = self.page.n_rows;
        let encoded = if self.mode == AccessMode::Memory {
            None
        } else {
            Some(encode_page(&self.layout, &self.page, &rows)?)
        };
        let state = self.output_mut()?;
        let start = match (state.file.as_mut(), encoded.as_ref()) {
            (Some(file), Some(encoded)) => {
                let start = file.seek(SeekFrom::End(0))?;
                file.write_all(&encoded.bytes).context("writing page")?;
                start
            }
            _ => 0,
        };
        state.pages_written += 1;
        state.disk_page = Some(DiskPage {
            start,
            count_offset: start + encoded.as_ref().map_or(0, |e| e.count_offset as u64),
            count_width: encoded.as_ref().map_or(0, |e| e.count_width),
            rows_on_disk: rows.len(),
            written_through,
            flushed: false,
        });
        Ok(())
    }

    fn append_pending_rows(&mut self) -> Result<()> {
        let disk = self
            .output_mut()?
            .disk_page
            .ok_or_else(|| SddsError::state("page is not on disk"))?;
        let rows: Vec<usize> = (disk.written_through..self.page.n_rows)
            .filter(|&r| self.page.row_flags[r])
            .collect();
        let n_rows = self.page.n_rows;
        if self.mode == AccessMode::Memory {
            let state = self.output_mut()?;
            if let Some(d) = state.disk_page.as_mut() {
                d.rows_on_disk += rows.len();
                d.written_through = n_rows;
            }
            return Ok(());
        }
        let total = disk.rows_on_disk + rows.len();
        let count = encode_count(self.layout.data_mode, total, disk.count_width);
        if self.layout.column_major || count.is_err() {
            if disk.flushed {
                return Err(SddsError::state(
                    "page cannot be rewritten after rows were flushed",
                ));
            }
            return self.rewrite_page(disk);
        }
        let bytes = encode_rows(&self.layout, &self.page, &rows)?;
        let count = count?;
        let state = self.output_mut()?;
        let file = state
            .file
            .as_mut()
            .ok_or_else(|| SddsError::state("output has no file"))?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&bytes).context("appending rows")?;
        file.seek(SeekFrom::Start(disk.count_offset))?;
        file.write_all(&count).context("updating row count")?;
        file.seek(SeekFrom::End(0))?;
        if let Some(d) = state.disk_page.as_mut() {
            d.rows_on_disk = total;
            d.written_through = n_rows;
        }
        Ok(())
    }

    // Truncate back to the page start and write it again from memory.
    fn rewrite_page(&mut self, disk: DiskPage) -> Result<()> {
        let rows = self.page.selected_rows();
        let n_rows = self.page.n_rows;
        let encoded = encode_page(&self.layout, &self.page, &rows)?;
        let state = self.output_mut()?;
        let file = state
            .file
            .as_mut()
            .ok_or_else(|| SddsError::state("output has no file"))?;
        file.set_len(disk.start)?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&encoded.bytes).context("rewriting page")?;
        state.disk_page = Some(DiskPage {
            count_offset: disk.start + encoded.count_offset as u64,
            count_width: encoded.count_width,
            rows_on_disk: rows.len(),
            written_through: n_rows,
            ..disk
        });
        Ok(())
    }

    /// Drop every page written so far, keeping the header
    pub fn erase_data(&mut self) -> Result<()> {
        let state = self.output_mut()?;
        if let Some(file) = state.file.as_mut() {
            if state.header_on_disk {
                file.set_len(state.header_end)?;
                file.seek(SeekFrom::End(0))?;
            }
        }
        state.pages_written = 0;
        state.disk_page = None;
        self.page.reset(&self.layout, 0);
        self.page_state = PageState::NoPage;
        Ok(())
    }

    /// Pages written so far
    pub fn pages_written(&self) -> u32 {
        self.output.as_ref().map_or(0, |o| o.pages_written)
    }

    /// Finish the session, writing a pending header and syncing if asked
    pub fn terminate(mut self) -> Result<()> {
        let pending = self
            .output
            .as_ref()
            .is_some_and(|o| o.layout_written && !o.header_on_disk);
        if pending {
            self.flush_header()?;
        }
        if let Some(file) = self.output.as_mut().and_then(|o| o.file.as_mut()) {
            file.flush()?;
            if self.flags.fsync {
                file.sync_all()?;
            }
        }
        Ok(())
    }
}
