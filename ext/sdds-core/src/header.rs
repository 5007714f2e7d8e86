//! Conversion between a [`Layout`] and its textual header

use crate::namelist::{has_complete_record, parse_namelists, Namelist};
use crate::schema::{
    ArrayDefinition, ColumnDefinition, DefinitionMode, FieldInfo, Layout, NamePolicy,
    ParameterDefinition,
};
use crate::{DataMode, ErrorContext, Result, SddsError, TypeTag};

/// First line of every file
pub const MAGIC: &str = "SDDS1";

fn info_from(list: &Namelist) -> Result<FieldInfo> {
    let name = list
        .get("name")
        .ok_or_else(|| SddsError::format(format!("&{} record without a name", list.group)))?;
    let type_name = list
        .get("type")
        .ok_or_else(|| SddsError::format(format!("{} {} has no type", list.group, name)))?;
    let tag = TypeTag::from_name(type_name).ok_or_else(|| {
        SddsError::format(format!("{} {} has unknown type {:?}", list.group, name, type_name))
    })?;
    Ok(FieldInfo::new(name, tag)
        .with_symbol(list.get("symbol"))
        .with_units(list.get("units"))
        .with_description(list.get("description"))
        .with_format_string(list.get("format_string")))
}

fn int_attr(list: &Namelist, key: &str, default: i64) -> Result<i64> {
    match list.get(key) {
        None | Some("") => Ok(default),
        Some(text) => text
            .trim()
            .parse::<i64>()
            .with_context(|| format!("attribute {} of &{} record", key, list.group)),
    }
}

pub fn parameter_from_namelist(list: &Namelist) -> Result<ParameterDefinition> {
    Ok(ParameterDefinition::new(info_from(list)?).with_fixed_value(list.get("fixed_value")))
}

pub fn column_from_namelist(list: &Namelist) -> Result<ColumnDefinition> {
    let length = int_attr(list, "field_length", 0)?;
    Ok(ColumnDefinition::new(info_from(list)?).with_field_length(length as i32))
}

pub fn array_from_namelist(list: &Namelist) -> Result<ArrayDefinition> {
    let dimensions = int_attr(list, "dimensions", 1)?;
    if dimensions < 1 {
        return Err(SddsError::format(format!(
            "array dimensions must be at least 1, got {}",
            dimensions
        )));
    }
    let length = int_attr(list, "field_length", 0)?;
    Ok(ArrayDefinition::new(info_from(list)?, dimensions as usize)
        .with_field_length(length as i32)
        .with_group_name(list.get("group_name")))
}

/// Parse a single `&group ... &end` definition string
pub fn single_record(text: &str, group: &str) -> Result<Namelist> {
    let mut lists = parse_namelists(text)?;
    if lists.len() != 1 {
        return Err(SddsError::format(format!(
            "expected exactly one &{} record, found {}",
            group,
            lists.len()
        )));
    }
    let list = lists.remove(0);
    if list.group != group {
        return Err(SddsError::format(format!(
            "expected a &{} record, found &{}",
            group, list.group
        )));
    }
    Ok(list)
}

fn apply_record(layout: &mut Layout, list: &Namelist) -> Result<bool> {
    match list.group.as_str() {
        "description" => {
            layout.set_description(list.get("text"), list.get("contents"));
        }
        "parameter" => {
            let def = parameter_from_namelist(list)?;
            layout.define_parameter(def, NamePolicy::AllowAny, DefinitionMode::WriteOnly)?;
        }
        "column" => {
            let def = column_from_namelist(list)?;
            layout.define_column(def, NamePolicy::AllowAny, DefinitionMode::WriteOnly)?;
        }
        "array" => {
            let def = array_from_namelist(list)?;
            layout.define_array(def, NamePolicy::AllowAny, DefinitionMode::WriteOnly)?;
        }
        "data" => {
            let mode = list.get("mode").unwrap_or("binary");
            layout.data_mode = match mode.to_ascii_lowercase().as_str() {
                "binary" => DataMode::Binary,
                "ascii" => DataMode::Ascii,
                other => {
                    return Err(SddsError::format(format!("unknown data mode {:?}", other)))
                }
            };
            layout.lines_per_row = int_attr(list, "lines_per_row", 1)?.max(1) as u32;
            layout.column_major = int_attr(list, "column_major_order", 0)? != 0;
            return Ok(true);
        }
        "associate" | "include" => {}
        other => {
            return Err(SddsError::format(format!(
                "unknown header record &{}",
                other
            )))
        }
    }
    Ok(false)
}

/// Parse the header at the start of `bytes`.
///
/// Returns the layout and the offset where page data begins.
pub fn parse_header(bytes: &[u8]) -> Result<(Layout, usize)> {
    let mut layout = Layout::new();
    let mut pending = String::new();
    let mut pos = 0;
    let mut first = true;
    while pos < bytes.len() {
        let end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i + 1)
            .unwrap_or(bytes.len());
        let line = simdutf8::basic::from_utf8(&bytes[pos..end]).context("header line")?;
        pos = end;
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if first {
            if !line.starts_with("SDDS") {
                return Err(SddsError::format("missing SDDS header line"));
            }
            first = false;
            continue;
        }
        if pending.is_empty() && line.trim_start().starts_with('!') {
            continue;
        }
        pending.push_str(line);
        pending.push('\n');
        let closed = pending.trim_end().to_ascii_lowercase().ends_with("&end");
        if closed && has_complete_record(&pending) {
            let mut saw_data = false;
            for list in parse_namelists(&pending)? {
                saw_data |= apply_record(&mut layout, &list)?;
            }
            pending.clear();
            if saw_data {
                return Ok((layout, pos));
            }
        }
    }
    if first {
        return Err(SddsError::format("empty input"));
    }
    Err(SddsError::format("header ended without a &data record"))
}

/// Render the full header, ending with the `&data` line
pub fn render_header(layout: &Layout) -> String {
    let mut out = String::from(MAGIC);
    out.push('\n');
    if layout.description.is_some() || layout.contents.is_some() {
        let mut list = Namelist::new("description");
        list.push_opt("text", layout.description.as_deref());
        list.push_opt("contents", layout.contents.as_deref());
        out.push_str(&list.render());
        out.push('\n');
    }
    for def in layout.parameters.values() {
        let mut list = info_record("parameter", &def.info);
        list.push_opt("fixed_value", def.fixed_value.as_deref());
        out.push_str(&list.render());
        out.push('\n');
    }
    for def in layout.arrays.values() {
        let mut list = info_record("array", &def.info);
        list.push_opt("group_name", def.group_name.as_deref());
        if def.field_length != 0 {
            list.push("field_length", def.field_length.to_string());
        }
        list.push("dimensions", def.dimensions.to_string());
        out.push_str(&list.render());
        out.push('\n');
    }
    for def in layout.columns.values() {
        let mut list = info_record("column", &def.info);
        if def.field_length != 0 {
            list.push("field_length", def.field_length.to_string());
        }
        out.push_str(&list.render());
        out.push('\n');
    }
    let mut data = Namelist::new("data");
    data.push("mode", layout.data_mode.name());
    if layout.data_mode == DataMode::Ascii && layout.lines_per_row > 1 {
        data.push("lines_per_row", layout.lines_per_row.to_string());
    }
    if layout.column_major {
        data.push("column_major_order", "1");
    }
    out.push_str(&data.render());
    out.push('\n');
    out
}

fn info_record(group: &str, info: &FieldInfo) -> Namelist {
    let mut list = Namelist::new(group);
    list.push("name", info.name.as_str());
    list.push_opt("symbol", info.symbol.as_deref());
    list.push_opt("units", info.units.as_deref());
    list.push_opt("description", info.description.as_deref());
    list.push_opt("format_string", info.format_string.as_deref());
    list.push("type", info.type_tag.type_name());
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_layout() -> Layout {
        let mut layout = Layout::new();
        layout.set_description(Some("run 7"), Some("beam data"));
        layout
            .define_parameter(
                ParameterDefinition::new(FieldInfo::new("step", TypeTag::Int32))
                    .with_fixed_value(Some("3")),
                NamePolicy::Strict,
                DefinitionMode::Normal,
            )
            .unwrap();
        layout
            .define_array(
                ArrayDefinition::new(FieldInfo::new("grid", TypeTag::Float32), 2)
                    .with_group_name(Some("g")),
                NamePolicy::Strict,
                DefinitionMode::Normal,
            )
            .unwrap();
        layout
            .define_column(
                ColumnDefinition::new(
                    FieldInfo::new("x", TypeTag::Float64)
                        .with_units(Some("m"))
                        .with_description(Some("horizontal, position")),
                ),
                NamePolicy::Strict,
                DefinitionMode::Normal,
            )
            .unwrap();
        layout.data_mode = DataMode::Ascii;
        layout
    }

    #[test]
    fn test_header_roundtrip() {
        let layout = sample_layout();
        let text = render_header(&layout);
        assert!(text.starts_with("SDDS1\n"));
        let (parsed, offset) = parse_header(text.as_bytes()).unwrap();
        assert_eq!(offset, text.len());
        assert_eq!(parsed, layout);
    }

    #[test]
    fn test_header_with_comments_and_binary_tail() {
        let mut bytes = b"SDDS1\n! written by hand\n&column name=a, type=short, &end\n&data mode=binary, &end\n".to_vec();
        let offset = bytes.len();
        bytes.extend_from_slice(&[0xff, 0x00, 0x80]);
        let (layout, body) = parse_header(&bytes).unwrap();
        assert_eq!(body, offset);
        assert_eq!(layout.columns["a"].info.type_tag, TypeTag::Int16);
    }

    #[test]
    fn test_header_errors() {
        assert!(parse_header(b"").is_err());
        assert!(parse_header(b"not a header\n").is_err());
        assert!(parse_header(b"SDDS1\n&column name=a, &end\n&data mode=binary, &end\n").is_err());
        assert!(parse_header(b"SDDS1\n&column name=a, type=double, &end\n").is_err());
    }

    #[test]
    fn test_single_record() {
        let list = single_record("&column name=z, type=long, &end", "column").unwrap();
        let def = column_from_namelist(&list).unwrap();
        assert_eq!(def.info.type_tag, TypeTag::Int32);
        assert!(single_record("&array name=z, type=long, &end", "column").is_err());
    }
}
