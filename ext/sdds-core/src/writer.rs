//! Page body encoding for both data modes

use crate::format::format_cell;
use crate::page::Page;
use crate::schema::Layout;
use crate::{ColumnData, DataMode, NativeValue, Result, SddsError};
use bytes::{BufMut, BytesMut};

/// Width of the right-aligned row-count field in ASCII pages
pub const ASCII_COUNT_WIDTH: usize = 20;

/// An encoded page and where its row count lives, relative to the page start
#[derive(Debug, Clone)]
pub struct EncodedPage {
    pub bytes: BytesMut,
    pub count_offset: usize,
    pub count_width: usize,
}

/// Encode the page header block and the given rows
pub fn encode_page(layout: &Layout, page: &Page, rows: &[usize]) -> Result<EncodedPage> {
    match layout.data_mode {
        DataMode::Binary => encode_binary_page(layout, page, rows),
        DataMode::Ascii => encode_ascii_page(layout, page, rows),
    }
}

/// Encode rows only, for appending to a page already on disk
pub fn encode_rows(layout: &Layout, page: &Page, rows: &[usize]) -> Result<BytesMut> {
    if layout.column_major {
        return Err(SddsError::state(
            "rows cannot be appended to a column-major page",
        ));
    }
    let mut buf = BytesMut::new();
    match layout.data_mode {
        DataMode::Binary => put_binary_rows(&mut buf, page, rows)?,
        DataMode::Ascii => put_ascii_rows(&mut buf, layout, page, rows)?,
    }
    Ok(buf)
}

/// Row-count bytes to patch in place
pub fn encode_count(mode: DataMode, count: usize, width: usize) -> Result<Vec<u8>> {
    match mode {
        DataMode::Binary => Ok((count as i64).to_le_bytes().to_vec()),
        DataMode::Ascii => {
            let text = format!("{:>width$}", count, width = width);
            if text.len() > width {
                return Err(SddsError::format(format!(
                    "row count {} does not fit in {} characters",
                    count, width
                )));
            }
            Ok(text.into_bytes())
        }
    }
}

fn put_string(buf: &mut BytesMut, s: &str) -> Result<()> {
    let len = i32::try_from(s.len())
        .map_err(|_| SddsError::format(format!("string of {} bytes is too long", s.len())))?;
    buf.put_i32_le(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn put_value(buf: &mut BytesMut, value: &NativeValue) -> Result<()> {
    match value {
        NativeValue::Int16(v) => buf.put_i16_le(*v),
        NativeValue::UInt16(v) => buf.put_u16_le(*v),
        NativeValue::Int32(v) => buf.put_i32_le(*v),
        NativeValue::UInt32(v) => buf.put_u32_le(*v),
        NativeValue::Int64(v) => buf.put_i64_le(*v),
        NativeValue::UInt64(v) => buf.put_u64_le(*v),
        NativeValue::Float32(v) => buf.put_f32_le(v.0),
        NativeValue::Float64(v) => buf.put_f64_le(v.0),
        NativeValue::Char(c) => buf.put_u8(*c),
        NativeValue::String(s) => put_string(buf, s)?,
    }
    Ok(())
}

fn put_buffer(buf: &mut BytesMut, data: &ColumnData, rows: &[usize]) -> Result<()> {
    for &row in rows {
        let value = data
            .get(row)
            .ok_or_else(|| SddsError::state(format!("row {} missing from buffer", row)))?;
        put_value(buf, &value)?;
    }
    Ok(())
}

fn put_binary_rows(buf: &mut BytesMut, page: &Page, rows: &[usize]) -> Result<()> {
    for &row in rows {
        for slot in page.columns.values() {
            let value = slot
                .data
                .get(row)
                .ok_or_else(|| SddsError::state(format!("row {} missing from buffer", row)))?;
            put_value(buf, &value)?;
        }
    }
    Ok(())
}

fn encode_binary_page(layout: &Layout, page: &Page, rows: &[usize]) -> Result<EncodedPage> {
    let mut buf = BytesMut::with_capacity(64 + rows.len() * 8 * page.columns.len());
    buf.put_i64_le(rows.len() as i64);
    for (name, def) in &layout.parameters {
        if def.fixed_value.is_some() {
            continue;
        }
        let value = page
            .parameters
            .get(name)
            .ok_or_else(|| SddsError::state(format!("parameter {} missing from page", name)))?;
        put_value(&mut buf, value)?;
    }
    for name in layout.arrays.keys() {
        let array = page
            .arrays
            .get(name)
            .ok_or_else(|| SddsError::state(format!("array {} missing from page", name)))?;
        for &d in &array.dimensions {
            buf.put_i32_le(d as i32);
        }
        let all: Vec<usize> = (0..array.element_count()).collect();
        put_buffer(&mut buf, &array.data, &all)?;
    }
    if layout.column_major {
        for slot in page.columns.values() {
            put_buffer(&mut buf, &slot.data, rows)?;
        }
    } else {
        put_binary_rows(&mut buf, page, rows)?;
    }
    Ok(EncodedPage {
        bytes: buf,
        count_offset: 0,
        count_width: 8,
    })
}

fn put_line(buf: &mut BytesMut, cells: &[String]) {
    buf.put_slice(cells.join(" ").as_bytes());
    buf.put_u8(b'\n');
}

fn put_ascii_rows(buf: &mut BytesMut, layout: &Layout, page: &Page, rows: &[usize]) -> Result<()> {
    for &row in rows {
        let mut cells = Vec::with_capacity(page.columns.len());
        for (name, slot) in &page.columns {
            let value = slot
                .data
                .get(row)
                .ok_or_else(|| SddsError::state(format!("row {} missing from buffer", row)))?;
            let fmt = layout
                .columns
                .get(name)
                .and_then(|d| d.info.format_string.as_deref());
            cells.push(format_cell(&value, fmt)?);
        }
        put_line(buf, &cells);
    }
    Ok(())
}

fn encode_ascii_page(layout: &Layout, page: &Page, rows: &[usize]) -> Result<EncodedPage> {
    let mut buf = BytesMut::new();
    buf.put_slice(format!("! page number {}\n", page.number).as_bytes());
    for (name, def) in &layout.parameters {
        if def.fixed_value.is_some() {
            continue;
        }
        let value = page
            .parameters
            .get(name)
            .ok_or_else(|| SddsError::state(format!("parameter {} missing from page", name)))?;
        let text = format_cell(value, def.info.format_string.as_deref())?;
        put_line(&mut buf, &[text]);
    }
    for (name, def) in &layout.arrays {
        let array = page
            .arrays
            .get(name)
            .ok_or_else(|| SddsError::state(format!("array {} missing from page", name)))?;
        let dims: Vec<String> = array.dimensions.iter().map(|d| d.to_string()).collect();
        put_line(&mut buf, &dims);
        let mut cells = Vec::with_capacity(array.element_count());
        for value in array.data.to_values() {
            cells.push(format_cell(&value, def.info.format_string.as_deref())?);
        }
        put_line(&mut buf, &cells);
    }
    let count_offset = buf.len();
    buf.put_slice(&encode_count(DataMode::Ascii, rows.len(), ASCII_COUNT_WIDTH)?);
    buf.put_u8(b'\n');
    if layout.column_major {
        for (name, slot) in &page.columns {
            let fmt = layout
                .columns
                .get(name)
                .and_then(|d| d.info.format_string.as_deref());
            let mut cells = Vec::with_capacity(rows.len());
            for &row in rows {
                let value = slot
                    .data
                    .get(row)
                    .ok_or_else(|| SddsError::state(format!("row {} missing from buffer", row)))?;
                cells.push(format_cell(&value, fmt)?);
            }
            put_line(&mut buf, &cells);
        }
    } else {
        put_ascii_rows(&mut buf, layout, page, rows)?;
    }
    Ok(EncodedPage {
        bytes: buf,
        count_offset,
        count_width: ASCII_COUNT_WIDTH,
    })
}
