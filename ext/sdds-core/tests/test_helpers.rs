#![allow(dead_code)]

use sdds_core::*;
use std::path::Path;
use std::sync::Arc;

/// Define the layout used across the integration tests: two parameters,
/// one 2-d array and three columns
pub fn define_test_layout(dataset: &mut Dataset) -> Result<()> {
    dataset.define_parameter(
        ParameterDefinition::new(FieldInfo::new("run", TypeTag::Int32)),
        NamePolicy::Strict,
        DefinitionMode::Normal,
    )?;
    dataset.define_parameter(
        ParameterDefinition::new(
            FieldInfo::new("label", TypeTag::String).with_units(Some("none")),
        ),
        NamePolicy::Strict,
        DefinitionMode::Normal,
    )?;
    dataset.define_array(
        ArrayDefinition::new(FieldInfo::new("grid", TypeTag::Float64), 2),
        NamePolicy::Strict,
        DefinitionMode::Normal,
    )?;
    dataset.define_column(
        ColumnDefinition::new(FieldInfo::new("x", TypeTag::Float64).with_units(Some("m"))),
        NamePolicy::Strict,
        DefinitionMode::Normal,
    )?;
    dataset.define_column(
        ColumnDefinition::new(FieldInfo::new("n", TypeTag::Int32)),
        NamePolicy::Strict,
        DefinitionMode::Normal,
    )?;
    dataset.define_column(
        ColumnDefinition::new(FieldInfo::new("name", TypeTag::String)),
        NamePolicy::Strict,
        DefinitionMode::Normal,
    )?;
    Ok(())
}

/// Fill the current page with `rows` rows derived from `page`
pub fn fill_test_page(dataset: &mut Dataset, page: i32, rows: usize) -> Result<()> {
    dataset.set_parameter_value(0, NativeValue::Int32(page))?;
    dataset.set_parameter_value(1, NativeValue::String(Arc::from(format!("page {}", page))))?;
    dataset.set_array_value(
        0,
        ArrayValue::with_data(
            vec![2, 2],
            ColumnData::Float64(vec![1.0, 2.0, 3.0, page as f64]),
        )?,
    )?;
    for row in 0..rows {
        dataset.set_row(
            row,
            vec![
                (0, NativeValue::Float64((row as f64 * 0.5).into())),
                (1, NativeValue::Int32(page * 100 + row as i32)),
                (2, NativeValue::String(Arc::from(format!("row {}", row)))),
            ],
        )?;
    }
    Ok(())
}

/// Write `pages` pages of `rows` rows each to `path`
pub fn write_test_file(path: &Path, mode: DataMode, pages: i32, rows: usize) -> Result<()> {
    let mut dataset = Dataset::open_output(path, OutputOptions::new().with_data_mode(mode))?;
    define_test_layout(&mut dataset)?;
    dataset.write_layout()?;
    for page in 1..=pages {
        dataset.start_page(rows)?;
        fill_test_page(&mut dataset, page, rows)?;
        dataset.write_page()?;
    }
    dataset.terminate()
}

/// The `n` column of the current page as plain integers
pub fn n_column(dataset: &Dataset) -> Vec<i32> {
    match dataset.column_values(1).unwrap() {
        ColumnData::Int32(values) => values,
        other => panic!("unexpected column data {:?}", other),
    }
}
