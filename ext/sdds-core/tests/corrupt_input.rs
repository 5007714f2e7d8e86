use sdds_core::*;
use std::path::Path;
use tempfile::tempdir;

/// One page holding a 2x3x1 int32 array
fn write_cube(path: &Path, mode: DataMode) -> Result<()> {
    let mut dataset = Dataset::open_output(path, OutputOptions::new().with_data_mode(mode))?;
    dataset.define_array(
        ArrayDefinition::new(FieldInfo::new("cube", TypeTag::Int32), 3),
        NamePolicy::Strict,
        DefinitionMode::Normal,
    )?;
    dataset.write_layout()?;
    dataset.start_page(0)?;
    dataset.set_array_value(
        0,
        ArrayValue::with_data(vec![2, 3, 1], ColumnData::Int32(vec![1, 2, 3, 4, 5, 6]))?,
    )?;
    dataset.write_page()?;
    dataset.terminate()
}

fn first_page(path: &Path) -> Result<Option<u32>> {
    let mut dataset = Dataset::open_input(path)?;
    dataset.read_page(RowSelection::All)
}

fn replace_once(bytes: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let at = bytes
        .windows(from.len())
        .position(|w| w == from)
        .expect("pattern present");
    let mut out = bytes[..at].to_vec();
    out.extend_from_slice(to);
    out.extend_from_slice(&bytes[at + from.len()..]);
    out
}

#[test]
fn test_intact_cube_reads() {
    let dir = tempdir().unwrap();
    for mode in [DataMode::Ascii, DataMode::Binary] {
        let path = dir.path().join(format!("cube_{:?}.sdds", mode));
        write_cube(&path, mode).unwrap();
        assert_eq!(first_page(&path).unwrap(), Some(1));
    }
}

#[test]
fn test_ascii_dimensions_overflowing_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cube.sdds");
    write_cube(&path, DataMode::Ascii).unwrap();
    let bytes = std::fs::read(&path).unwrap();

    let huge = replace_once(&bytes, b"\n2 3 1\n", b"\n4000000000 4000000000 4000000000\n");
    std::fs::write(&path, huge).unwrap();
    let err = first_page(&path).unwrap_err();
    assert!(matches!(err, SddsError::Format(_)), "{}", err);

    let large = replace_once(&bytes, b"\n2 3 1\n", b"\n100000 100000 1\n");
    std::fs::write(&path, large).unwrap();
    assert!(matches!(first_page(&path), Err(SddsError::Format(_))));
}

#[test]
fn test_binary_dimensions_overflowing_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cube.sdds");
    write_cube(&path, DataMode::Binary).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let dims: Vec<u8> = [2i32, 3, 1].iter().flat_map(|d| d.to_le_bytes()).collect();

    let max: Vec<u8> = [i32::MAX; 3].iter().flat_map(|d| d.to_le_bytes()).collect();
    std::fs::write(&path, replace_once(&bytes, &dims, &max)).unwrap();
    let err = first_page(&path).unwrap_err();
    assert!(matches!(err, SddsError::Format(_)), "{}", err);

    let wide: Vec<u8> = [65536i32, 65536, 1].iter().flat_map(|d| d.to_le_bytes()).collect();
    std::fs::write(&path, replace_once(&bytes, &dims, &wide)).unwrap();
    assert!(matches!(first_page(&path), Err(SddsError::Format(_))));
}
