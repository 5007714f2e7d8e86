use super::{AccessMode, Dataset, InputState, PageState};
use crate::header::parse_header;
use crate::reader::{PageReader, RowSelection};
use crate::schema::Layout;
use crate::{ErrorContext, Result, SddsError};
use bytes::Bytes;
use std::path::Path;

impl Dataset {
    /// Open an existing file and parse its header
    pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = Bytes::from(
            std::fs::read(path).with_context(|| format!("opening {}", path.display()))?,
        );
        let (layout, body) =
            parse_header(&data).with_context(|| format!("reading header of {}", path.display()))?;
        let mut dataset = Dataset::with_layout(AccessMode::Input, Some(path.to_path_buf()), layout);
        dataset.input = Some(InputState {
            reader: PageReader::new(data, body),
            headerless: false,
        });
        Ok(dataset)
    }

    /// Open a file that has no header. The caller defines the layout and
    /// data mode before reading pages.
    pub fn open_headerless_input<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = Bytes::from(
            std::fs::read(path).with_context(|| format!("opening {}", path.display()))?,
        );
        let mut dataset =
            Dataset::with_layout(AccessMode::Input, Some(path.to_path_buf()), Layout::new());
        dataset.input = Some(InputState {
            reader: PageReader::new(data, 0),
            headerless: true,
        });
        Ok(dataset)
    }

    pub fn is_headerless(&self) -> bool {
        self.input.as_ref().is_some_and(|i| i.headerless)
    }

    /// Read the next page. Returns its 1-based number, or `None` at the end
    /// of the data.
    pub fn read_page(&mut self, selection: RowSelection) -> Result<Option<u32>> {
        let number = self.pages_read + 1;
        let input = self
            .input
            .as_mut()
            .ok_or_else(|| SddsError::state("dataset is not open for reading"))?;
        let Some((page, _)) = input
            .reader
            .read_page(&self.layout, number, selection)
            .with_context(|| format!("reading page {}", number))?
        else {
            return Ok(None);
        };
        self.page = page;
        self.page_state = PageState::Open;
        self.pages_read = number;
        self.apply_recorded_factors()?;
        Ok(Some(number))
    }

    /// Number of pages read so far
    pub fn pages_read(&self) -> u32 {
        self.pages_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = Dataset::open_input("/nonexistent/dir/file.sdds").unwrap_err();
        assert!(matches!(err, SddsError::Io(_)));
        assert!(err.to_string().contains("opening"));
    }

    #[test]
    fn test_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.sdds");
        std::fs::write(&path, "not sdds\n").unwrap();
        let err = Dataset::open_input(&path).unwrap_err();
        assert!(matches!(err, SddsError::Format(_)));
    }

    #[test]
    fn test_read_on_output_fails() {
        let mut dataset = Dataset::open_memory(Default::default()).unwrap();
        assert!(dataset.read_page(RowSelection::All).is_err());
    }
}
