use sdds::*;
use tempfile::tempdir;

use test_helpers::*;

fn assert_same_data(loaded: &SddsFile, original: &SddsFile) {
    assert_eq!(loaded.description, original.description);
    assert_eq!(loaded.mode, original.mode);
    for kind in [FieldKind::Parameter, FieldKind::Array, FieldKind::Column] {
        assert_eq!(loaded.field_names(kind), original.field_names(kind));
    }
    for name in original.field_names(FieldKind::Parameter) {
        assert_eq!(
            loaded.parameter_values(name).unwrap(),
            original.parameter_values(name).unwrap(),
            "parameter {}",
            name
        );
    }
    for name in original.field_names(FieldKind::Array) {
        assert_eq!(
            loaded.array_pages(name).unwrap(),
            original.array_pages(name).unwrap(),
            "array {}",
            name
        );
    }
    for name in original.field_names(FieldKind::Column) {
        assert_eq!(
            loaded.column_pages(name).unwrap(),
            original.column_pages(name).unwrap(),
            "column {}",
            name
        );
    }
}

#[test]
fn test_save_and_load_binary() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.sdds");
    let original = two_page_file(DataMode::Binary);
    original.save(&path).unwrap();

    let loaded = SddsFile::load(&path).unwrap();
    assert_same_data(&loaded, &original);
    assert_eq!(loaded.page_count(), 2);
    assert_eq!(loaded.row_count(0).unwrap(), 4);
    assert_eq!(loaded.row_count(1).unwrap(), 2);
}

#[test]
fn test_save_and_load_ascii() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.sdds");
    let original = two_page_file(DataMode::Ascii);
    original.save(&path).unwrap();

    let loaded = SddsFile::load(&path).unwrap();
    assert_same_data(&loaded, &original);
    assert_eq!(loaded.cell("label", 0, 3).unwrap(), &DynValue::from("row 3"));
}

#[test]
fn test_definitions_survive_the_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("defs.sdds");
    two_page_file(DataMode::Binary).save(&path).unwrap();

    let loaded = SddsFile::load(&path).unwrap();
    assert_eq!(
        loaded.field_units(FieldKind::Parameter, "energy").unwrap(),
        Some("MeV")
    );
    assert_eq!(
        loaded.field_type(FieldKind::Array, "grid").unwrap(),
        TypeTag::Int16
    );
    let grid = loaded.arrays().next().unwrap();
    assert_eq!(grid.definition.group_name.as_deref(), Some("maps"));
    assert_eq!(grid.definition.dimensions, 2);
    let run = loaded.parameters().nth(1).unwrap();
    assert_eq!(run.definition.fixed_value.as_deref(), Some("7"));
    assert_eq!(
        loaded
            .field_info(FieldKind::Column, "index")
            .unwrap()
            .description
            .as_deref(),
        Some("row index")
    );
}

#[test]
fn test_sparse_and_last_row_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rows.sdds");
    let mut file = SddsFile::new();
    file.define_simple_column("i", TypeTag::Int64).unwrap();
    file.set_column("i", 0, ints(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]))
        .unwrap();
    file.set_column("i", 1, ints(&[100, 101])).unwrap();
    file.save(&path).unwrap();

    let sparse = SddsFile::load_sparse(&path, 3, 1).unwrap();
    assert_eq!(sparse.column("i", 0).unwrap(), ints(&[1, 4, 7]).as_slice());
    assert_eq!(sparse.column("i", 1).unwrap(), ints(&[101]).as_slice());

    let last = SddsFile::load_last_rows(&path, 3).unwrap();
    assert_eq!(last.column("i", 0).unwrap(), ints(&[7, 8, 9]).as_slice());
    assert_eq!(last.column("i", 1).unwrap(), ints(&[100, 101]).as_slice());
}

#[test]
fn test_inconsistent_file_is_not_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.sdds");
    let mut file = SddsFile::new();
    file.define_simple_column("a", TypeTag::Int32).unwrap();
    file.define_simple_column("b", TypeTag::Int32).unwrap();
    file.set_column("a", 0, ints(&[1, 2])).unwrap();
    file.set_column("b", 0, ints(&[1])).unwrap();

    let mut sdds = quiet();
    let err = save_with(&file, &mut sdds, &path).unwrap_err();
    assert!(matches!(err, SddsFileError::Inconsistent(_)));
    assert!(!path.exists());
    assert_eq!(sdds.number_of_errors(), 0);
}

#[test]
fn test_failed_load_releases_the_handle() {
    let dir = tempdir().unwrap();
    let mut sdds = quiet();

    let err = load_with(&mut sdds, &dir.path().join("missing.sdds"), PageSelection::All)
        .unwrap_err();
    assert!(matches!(err, SddsFileError::Binding(_)));
    assert_eq!(sdds.number_of_errors(), 1);
    assert!(!sdds.is_open(0));

    let path = dir.path().join("empty.sdds");
    let mut file = SddsFile::new();
    file.define_simple_column("x", TypeTag::Float64).unwrap();
    save_with(&file, &mut sdds, &path).unwrap();
    let err = load_with(&mut sdds, &path, PageSelection::All).unwrap_err();
    assert!(matches!(err, SddsFileError::NoPages(_)));
    assert!(!sdds.is_open(0));
}

#[test]
fn test_handles_in_use_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("skip.sdds");
    let mut sdds = quiet();
    sdds.open_memory(0, sdds_adapter::OutputOptions::new())
        .unwrap();

    two_page_file(DataMode::Binary)
        .save(&path)
        .unwrap();
    let loaded = load_with(&mut sdds, &path, PageSelection::LastRows(1)).unwrap();
    assert_eq!(loaded.column("index", 0).unwrap(), ints(&[3]).as_slice());
    assert!(sdds.is_open(0));
    assert!(!sdds.is_open(1));

    for handle in 1..sdds.capacity() {
        sdds.open_memory(handle, sdds_adapter::OutputOptions::new())
            .unwrap();
    }
    let err = load_with(&mut sdds, &path, PageSelection::All).unwrap_err();
    assert!(matches!(err, SddsFileError::NoFreeHandle(20)));
}
