#![allow(dead_code)]

use sdds_adapter::*;
use std::path::Path;
use std::sync::Arc;

/// An instance whose log output is discarded
pub fn quiet() -> Sdds {
    Sdds::new(
        BindingConfig::builder()
            .with_log_level(LogLevel::Fatal)
            .with_log_sink(Arc::new(|_: LogLevel, _: &str| {}))
            .build(),
    )
}

/// One (tag, value to set, value expected back) case per native type
pub fn tag_cases() -> Vec<(TypeTag, DynValue, DynValue)> {
    vec![
        (TypeTag::Float64, DynValue::from(0.1), DynValue::from(0.1)),
        (TypeTag::Float32, DynValue::from(1.23456789), DynValue::from(1.234568)),
        (TypeTag::Int64, DynValue::Int(-9_000_000_000), DynValue::Int(-9_000_000_000)),
        (
            TypeTag::UInt64,
            DynValue::Int(18_000_000_000_000_000_000),
            DynValue::Int(18_000_000_000_000_000_000),
        ),
        (TypeTag::Int32, DynValue::Int(-123_456), DynValue::Int(-123_456)),
        (TypeTag::UInt32, DynValue::Int(4_000_000_000), DynValue::Int(4_000_000_000)),
        (TypeTag::Int16, DynValue::Int(-7), DynValue::Int(-7)),
        (TypeTag::UInt16, DynValue::Int(65_535), DynValue::Int(65_535)),
        (TypeTag::String, DynValue::from("two words"), DynValue::from("two words")),
        (TypeTag::Char, DynValue::from("q"), DynValue::from("q")),
    ]
}

/// Write one page with an int32 column `i` holding `0..rows`
pub fn write_counting_file(sdds: &mut Sdds, handle: usize, path: &Path, mode: DataMode, rows: usize) -> Result<()> {
    sdds.open_output(handle, path, OutputOptions::new().with_data_mode(mode))?;
    sdds.define_simple_column(handle, "i", None, TypeTag::Int32)?;
    sdds.write_layout(handle)?;
    sdds.start_page(handle, rows)?;
    let values: Vec<DynValue> = (0..rows).map(DynValue::from).collect();
    sdds.set_column(handle, &"i".into(), &values)?;
    sdds.write_page(handle)?;
    sdds.terminate(handle)
}

pub fn ints(values: &[i64]) -> Vec<DynValue> {
    values.iter().copied().map(DynValue::from).collect()
}
