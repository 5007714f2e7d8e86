//! Conversion between [`DynValue`] and the ten native types
//!
//! Integer tags take integers only and wrap to the destination width.
//! Floating tags take integers or floats; `float32` goes through the
//! six-significant-digit text round trip in both directions. `char` is
//! Latin-1: it takes the first character of a text value, which must be at
//! most U+00FF, and reads back as that character. `string` takes text as-is.

use crate::error::{BindingError, Result};
use crate::value::DynValue;
use ordered_float::OrderedFloat;
use sdds_core::format::{char_byte, char_text, format_value, round_float32, round_six_digits};
use sdds_core::{ColumnData, NativeValue, TypeTag};
use std::sync::Arc;

fn mismatch(value: &DynValue, tag: TypeTag) -> BindingError {
    BindingError::type_mismatch(format!(
        "cannot store a {} value as {}",
        value.type_name(),
        tag
    ))
}

/// Convert one dynamic value to `tag`
pub fn to_native(value: &DynValue, tag: TypeTag) -> Result<NativeValue> {
    match tag {
        TypeTag::Float32 => value
            .as_float()
            .map(|v| NativeValue::Float32(OrderedFloat(round_float32(v))))
            .ok_or_else(|| mismatch(value, tag)),
        TypeTag::Float64 => value
            .as_float()
            .map(|v| NativeValue::Float64(OrderedFloat(v)))
            .ok_or_else(|| mismatch(value, tag)),
        TypeTag::Char => value
            .as_text()
            .and_then(char_byte)
            .map(NativeValue::Char)
            .ok_or_else(|| mismatch(value, tag)),
        TypeTag::String => value
            .as_text()
            .map(|s| NativeValue::String(Arc::from(s)))
            .ok_or_else(|| mismatch(value, tag)),
        _ => {
            let v = value.as_int().ok_or_else(|| mismatch(value, tag))?;
            Ok(NativeValue::from_i128(tag, v)?)
        }
    }
}

/// Convert one native value back to its dynamic form
pub fn from_native(value: &NativeValue) -> DynValue {
    match value {
        NativeValue::Int16(v) => DynValue::Int(*v as i128),
        NativeValue::UInt16(v) => DynValue::Int(*v as i128),
        NativeValue::Int32(v) => DynValue::Int(*v as i128),
        NativeValue::UInt32(v) => DynValue::Int(*v as i128),
        NativeValue::Int64(v) => DynValue::Int(*v as i128),
        NativeValue::UInt64(v) => DynValue::Int(*v as i128),
        NativeValue::Float32(v) => DynValue::Float(OrderedFloat(round_six_digits(v.0 as f64))),
        NativeValue::Float64(v) => DynValue::Float(*v),
        NativeValue::Char(c) => DynValue::Text(char_text(*c)),
        NativeValue::String(s) => DynValue::Text(s.to_string()),
    }
}

/// Convert a whole sequence. Any failing element fails the call and
/// nothing is returned.
pub fn to_column_data(values: &[DynValue], tag: TypeTag) -> Result<ColumnData> {
    let natives = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            to_native(v, tag).map_err(|e| match e {
                BindingError::TypeMismatch(msg) => {
                    BindingError::type_mismatch(format!("element {}: {}", i, msg))
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ColumnData::from_values(tag, &natives)?)
}

pub fn from_column_data(data: &ColumnData) -> Vec<DynValue> {
    data.to_values().iter().map(from_native).collect()
}

/// Text stored as a parameter's fixed value.
///
/// Text is used verbatim and an empty string means no fixed value.
/// Integers render as `int32` and floats as `float64`, through
/// `format_string` when one is given. `None` means no fixed value.
pub fn fixed_value_text(value: &DynValue, format_string: Option<&str>) -> Result<Option<String>> {
    match value {
        DynValue::Text(text) if text.is_empty() => Ok(None),
        DynValue::Text(text) => Ok(Some(text.clone())),
        DynValue::Int(v) => Ok(Some(format_value(
            &NativeValue::Int32(*v as i32),
            format_string,
        )?)),
        DynValue::Float(v) => Ok(Some(format_value(&NativeValue::Float64(*v), format_string)?)),
        DynValue::None => Ok(None),
        DynValue::List(_) => Err(BindingError::type_mismatch(
            "a fixed value must be text or a number",
        )),
    }
}
