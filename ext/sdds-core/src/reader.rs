//! Sequential page decoding for both data modes

use crate::format::parse_value;
use crate::page::Page;
use crate::schema::Layout;
use crate::{ArrayValue, ColumnData, DataMode, NativeValue, Result, SddsError, TypeTag};
use bytes::{Buf, Bytes};
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// Which rows of a page to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowSelection {
    #[default]
    All,
    /// Rows `offset, offset + interval, ...`. An interval of 0 reads like 1.
    Sparse { interval: usize, offset: usize },
    /// The final `k` rows, in file order
    LastRows(usize),
}

impl RowSelection {
    pub fn indices(self, n_rows: usize) -> Option<Vec<usize>> {
        match self {
            RowSelection::All => None,
            RowSelection::Sparse { interval, offset } => {
                Some((offset.min(n_rows)..n_rows).step_by(interval.max(1)).collect())
            }
            RowSelection::LastRows(k) => Some((n_rows.saturating_sub(k)..n_rows).collect()),
        }
    }
}

/// Absolute byte positions of a decoded page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageExtent {
    pub start: usize,
    pub count_offset: usize,
    pub count_width: usize,
    pub end: usize,
}

/// Reads pages one after another from an in-memory copy of the file
#[derive(Debug, Clone)]
pub struct PageReader {
    data: Bytes,
    pos: usize,
}

impl PageReader {
    pub fn new(data: Bytes, pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode the next page. `Ok(None)` marks a clean end of data.
    pub fn read_page(
        &mut self,
        layout: &Layout,
        number: u32,
        selection: RowSelection,
    ) -> Result<Option<(Page, PageExtent)>> {
        let start = self.pos;
        let decoded = match layout.data_mode {
            DataMode::Binary => self.read_binary(layout)?,
            DataMode::Ascii => self.read_ascii(layout)?,
        };
        let Some((mut page, count_offset, count_width)) = decoded else {
            return Ok(None);
        };
        page.number = number;
        if let Some(rows) = selection.indices(page.n_rows) {
            page.keep_rows(&rows);
            page.mark_loaded(rows.len());
        }
        let extent = PageExtent {
            start,
            count_offset,
            count_width,
            end: self.pos,
        };
        Ok(Some((page, extent)))
    }

    fn read_binary(&mut self, layout: &Layout) -> Result<Option<(Page, usize, usize)>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let count_offset = self.pos;
        let mut buf = &self.data[self.pos..];
        let total = buf.remaining();

        need(&buf, 8, "row count")?;
        let n_rows = buf.get_i64_le();
        if n_rows < 0 {
            return Err(SddsError::format(format!("negative row count {}", n_rows)));
        }
        let n_rows = n_rows as usize;

        let mut page = Page::new(layout);
        for (name, def) in &layout.parameters {
            let value = match &def.fixed_value {
                Some(text) => parse_value(text, def.info.type_tag)?,
                None => get_value(&mut buf, def.info.type_tag)?,
            };
            page.parameters.insert(name.clone(), value);
        }
        for (name, def) in &layout.arrays {
            let mut dims = Vec::with_capacity(def.dimensions);
            for _ in 0..def.dimensions {
                need(&buf, 4, "array dimension")?;
                let d = buf.get_i32_le();
                if d < 0 {
                    return Err(SddsError::format(format!(
                        "array {} has negative dimension {}",
                        name, d
                    )));
                }
                dims.push(d as usize);
            }
            let count = element_count(name, &dims)?;
            check_plausible(&buf, count, def.info.type_tag)?;
            let data = get_buffer(&mut buf, def.info.type_tag, count)?;
            page.arrays.insert(name.clone(), ArrayValue::with_data(dims, data)?);
        }

        let min_row: usize = layout
            .columns
            .values()
            .map(|d| min_size(d.info.type_tag))
            .sum();
        if min_row > 0 && n_rows.saturating_mul(min_row) > buf.remaining() {
            return Err(SddsError::format(format!(
                "page claims {} rows but only {} bytes remain",
                n_rows,
                buf.remaining()
            )));
        }
        page.reset_columns(layout, n_rows);
        if layout.column_major {
            for slot in page.columns.values_mut() {
                slot.data = get_buffer(&mut buf, slot.data.type_tag(), n_rows)?;
            }
        } else {
            for row in 0..n_rows {
                for slot in page.columns.values_mut() {
                    let value = get_value(&mut buf, slot.data.type_tag())?;
                    slot.data.set(row, value)?;
                }
            }
        }
        page.mark_loaded(n_rows);
        self.pos += total - buf.remaining();
        Ok(Some((page, count_offset, 8)))
    }

    fn read_ascii(&mut self, layout: &Layout) -> Result<Option<(Page, usize, usize)>> {
        let mut tokens = Tokens {
            data: &self.data,
            pos: self.pos,
        };
        if !tokens.skip_blank() {
            self.pos = tokens.pos;
            return Ok(None);
        }
        let mut page = Page::new(layout);
        for (name, def) in &layout.parameters {
            let value = match &def.fixed_value {
                Some(text) => parse_value(text, def.info.type_tag)?,
                None => tokens.value(def.info.type_tag, name)?,
            };
            page.parameters.insert(name.clone(), value);
        }
        for (name, def) in &layout.arrays {
            let mut dims = Vec::with_capacity(def.dimensions);
            for _ in 0..def.dimensions {
                dims.push(tokens.count(name)?);
            }
            let count = element_count(name, &dims)?;
            // every element needs at least one byte of text
            let left = self.data.len() - tokens.pos.min(self.data.len());
            if count > left {
                return Err(SddsError::format(format!(
                    "array {} claims {} elements but only {} bytes remain",
                    name, count, left
                )));
            }
            let mut data = ColumnData::new(def.info.type_tag, count);
            for i in 0..count {
                data.set(i, tokens.value(def.info.type_tag, name)?)?;
            }
            page.arrays.insert(name.clone(), ArrayValue::with_data(dims, data)?);
        }

        let token = tokens
            .next()?
            .ok_or_else(|| SddsError::format("missing row count"))?;
        let n_rows: usize = text_of(&token.bytes)?.trim().parse()?;
        let line_start = self.data[..token.start]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let count_offset = line_start;
        let count_width = token.end - line_start;

        if !layout.columns.is_empty() && n_rows > self.data.len() {
            return Err(SddsError::format(format!(
                "page claims {} rows but the file is too short",
                n_rows
            )));
        }
        page.reset_columns(layout, n_rows);
        let names: Vec<String> = page.columns.keys().cloned().collect();
        if layout.column_major {
            for (index, name) in names.iter().enumerate() {
                for row in 0..n_rows {
                    let (_, slot) = page
                        .columns
                        .get_index_mut(index)
                        .ok_or_else(|| SddsError::state("column buffer missing"))?;
                    let value = tokens.value(slot.data.type_tag(), name)?;
                    slot.data.set(row, value)?;
                }
            }
        } else {
            for row in 0..n_rows {
                for (index, name) in names.iter().enumerate() {
                    let (_, slot) = page
                        .columns
                        .get_index_mut(index)
                        .ok_or_else(|| SddsError::state("column buffer missing"))?;
                    let value = tokens.value(slot.data.type_tag(), name)?;
                    slot.data.set(row, value)?;
                }
            }
        }
        page.mark_loaded(n_rows);
        // Consume the rest of the last line so the next page starts cleanly.
        while tokens.pos < self.data.len() && self.data[tokens.pos] != b'\n' {
            if !self.data[tokens.pos].is_ascii_whitespace() {
                break;
            }
            tokens.pos += 1;
        }
        if tokens.pos < self.data.len() && self.data[tokens.pos] == b'\n' {
            tokens.pos += 1;
        }
        self.pos = tokens.pos;
        Ok(Some((page, count_offset, count_width)))
    }
}

impl Page {
    fn reset_columns(&mut self, layout: &Layout, n_rows: usize) {
        let parameters = std::mem::take(&mut self.parameters);
        let arrays = std::mem::take(&mut self.arrays);
        self.reset(layout, n_rows);
        self.parameters = parameters;
        self.arrays = arrays;
    }
}

fn need(buf: &&[u8], n: usize, what: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(SddsError::format(format!(
            "unexpected end of data reading {}",
            what
        )));
    }
    Ok(())
}

fn min_size(tag: TypeTag) -> usize {
    match tag {
        TypeTag::String => 4,
        other => other.size(),
    }
}

fn element_count(name: &str, dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| {
            SddsError::format(format!("array {} dimensions {:?} overflow", name, dims))
        })
}

fn check_plausible(buf: &&[u8], count: usize, tag: TypeTag) -> Result<()> {
    if count.saturating_mul(min_size(tag)) > buf.remaining() {
        return Err(SddsError::format(format!(
            "{} {} elements do not fit in the remaining {} bytes",
            count,
            tag,
            buf.remaining()
        )));
    }
    Ok(())
}

fn get_value(buf: &mut &[u8], tag: TypeTag) -> Result<NativeValue> {
    need(buf, min_size(tag), tag.type_name())?;
    Ok(match tag {
        TypeTag::Int16 => NativeValue::Int16(buf.get_i16_le()),
        TypeTag::UInt16 => NativeValue::UInt16(buf.get_u16_le()),
        TypeTag::Int32 => NativeValue::Int32(buf.get_i32_le()),
        TypeTag::UInt32 => NativeValue::UInt32(buf.get_u32_le()),
        TypeTag::Int64 => NativeValue::Int64(buf.get_i64_le()),
        TypeTag::UInt64 => NativeValue::UInt64(buf.get_u64_le()),
        TypeTag::Float32 => NativeValue::Float32(OrderedFloat(buf.get_f32_le())),
        TypeTag::Float64 => NativeValue::Float64(OrderedFloat(buf.get_f64_le())),
        TypeTag::Char => NativeValue::Char(buf.get_u8()),
        TypeTag::String => {
            let len = buf.get_i32_le();
            if len < 0 {
                return Err(SddsError::format(format!("negative string length {}", len)));
            }
            let len = len as usize;
            need(buf, len, "string")?;
            let text = simdutf8::basic::from_utf8(&buf[..len])?;
            let value = NativeValue::String(Arc::from(text));
            buf.advance(len);
            value
        }
    })
}

fn get_buffer(buf: &mut &[u8], tag: TypeTag, count: usize) -> Result<ColumnData> {
    let mut data = ColumnData::new(tag, count);
    for i in 0..count {
        data.set(i, get_value(buf, tag)?)?;
    }
    Ok(data)
}

fn text_of(bytes: &[u8]) -> Result<&str> {
    Ok(simdutf8::basic::from_utf8(bytes)?)
}

struct Token {
    bytes: Vec<u8>,
    start: usize,
    end: usize,
}

/// Whitespace-separated tokens with `"..."` quoting and `!` comments
struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Tokens<'_> {
    /// Skip whitespace and comments. Returns false at end of data.
    fn skip_blank(&mut self) -> bool {
        while self.pos < self.data.len() {
            let b = self.data[self.pos];
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'!' {
                while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else {
                return true;
            }
        }
        false
    }

    fn next(&mut self) -> Result<Option<Token>> {
        if !self.skip_blank() {
            return Ok(None);
        }
        let start = self.pos;
        let mut bytes = Vec::new();
        if self.data[self.pos] == b'"' {
            self.pos += 1;
            loop {
                let Some(&b) = self.data.get(self.pos) else {
                    return Err(SddsError::format("unterminated quoted value"));
                };
                self.pos += 1;
                match b {
                    b'"' => break,
                    b'\\' => bytes.push(self.escape()?),
                    other => bytes.push(other),
                }
            }
        } else {
            while self.pos < self.data.len() && !self.data[self.pos].is_ascii_whitespace() {
                bytes.push(self.data[self.pos]);
                self.pos += 1;
            }
        }
        Ok(Some(Token {
            bytes,
            start,
            end: self.pos,
        }))
    }

    fn escape(&mut self) -> Result<u8> {
        let Some(&b) = self.data.get(self.pos) else {
            return Err(SddsError::format("dangling escape"));
        };
        self.pos += 1;
        Ok(match b {
            b'n' => b'\n',
            b't' => b'\t',
            b'0'..=b'7' => {
                let mut v = (b - b'0') as u32;
                for _ in 0..2 {
                    match self.data.get(self.pos) {
                        Some(&d @ b'0'..=b'7') => {
                            v = v * 8 + (d - b'0') as u32;
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                v as u8
            }
            other => other,
        })
    }

    fn value(&mut self, tag: TypeTag, field: &str) -> Result<NativeValue> {
        let token = self
            .next()?
            .ok_or_else(|| SddsError::format(format!("missing value for {}", field)))?;
        match tag {
            TypeTag::Char => Ok(NativeValue::Char(token.bytes.first().copied().unwrap_or(0))),
            _ => parse_value(text_of(&token.bytes)?, tag),
        }
    }

    fn count(&mut self, field: &str) -> Result<usize> {
        let token = self
            .next()?
            .ok_or_else(|| SddsError::format(format!("missing dimension for {}", field)))?;
        Ok(text_of(&token.bytes)?.trim().parse()?)
    }
}
