use sdds_adapter::*;
use tempfile::tempdir;

mod test_helpers;
use test_helpers::*;

fn define_every_tag(sdds: &mut Sdds, handle: usize) -> Result<()> {
    for (tag, _, _) in tag_cases() {
        let name = tag.type_name();
        sdds.define_simple_parameter(handle, name, None, tag)?;
        sdds.define_simple_column(handle, name, None, tag)?;
        sdds.define_simple_array(handle, name, None, tag, 1)?;
    }
    Ok(())
}

fn write_every_tag(sdds: &mut Sdds, handle: usize, rows: usize) -> Result<()> {
    define_every_tag(sdds, handle)?;
    sdds.write_layout(handle)?;
    sdds.start_page(handle, rows)?;
    for (tag, input, _) in tag_cases() {
        let field = FieldRef::from(tag.type_name());
        sdds.set_parameter(handle, &field, &input)?;
        sdds.set_array(handle, &field, &[input.clone(), input.clone()], &[2])?;
    }
    for row in 0..rows {
        let cells: Vec<(FieldRef, DynValue)> = tag_cases()
            .into_iter()
            .map(|(tag, input, _)| (FieldRef::from(tag.type_name()), input))
            .collect();
        sdds.set_row_values(handle, row, &cells)?;
    }
    sdds.write_page(handle)
}

fn check_every_tag(sdds: &mut Sdds, handle: usize, rows: usize) {
    for (tag, _, expected) in tag_cases() {
        let field = FieldRef::from(tag.type_name());
        assert_eq!(sdds.get_parameter(handle, &field).unwrap(), expected, "{}", tag);
        assert_eq!(
            sdds.get_column(handle, &field).unwrap(),
            vec![expected.clone(); rows],
            "{}",
            tag
        );
        let (values, shape) = sdds.get_array(handle, &field).unwrap();
        assert_eq!(values, vec![expected.clone(); 2], "{}", tag);
        assert_eq!(shape, vec![2]);
    }
}

#[test]
fn test_every_tag_in_memory() {
    let mut sdds = quiet();
    sdds.open_memory(0, OutputOptions::new()).unwrap();
    write_every_tag(&mut sdds, 0, 2).unwrap();
    check_every_tag(&mut sdds, 0, 2);
}

#[test]
fn test_every_tag_through_binary_and_ascii_files() {
    let dir = tempdir().unwrap();
    for mode in [DataMode::Binary, DataMode::Ascii] {
        let path = dir.path().join(format!("tags.{}", mode.name()));
        let mut sdds = quiet();
        sdds.open_output(0, &path, OutputOptions::new().with_data_mode(mode))
            .unwrap();
        write_every_tag(&mut sdds, 0, 3).unwrap();
        sdds.terminate(0).unwrap();

        sdds.open_input(1, &path).unwrap();
        assert_eq!(sdds.get_mode(1).unwrap(), mode);
        assert_eq!(sdds.read_page(1).unwrap(), Some(1));
        assert_eq!(sdds.row_count(1).unwrap(), 3);
        check_every_tag(&mut sdds, 1, 3);
        assert_eq!(sdds.read_page(1).unwrap(), None);
        sdds.terminate(1).unwrap();
        assert_eq!(sdds.number_of_errors(), 0);
    }
}

#[test]
fn test_strings_with_whitespace_survive_ascii() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("strings.sdds");
    let texts = ["plain", "two words", " leading", "tab\there", "", "quote \" mark"];

    let mut sdds = quiet();
    sdds.open_output(0, &path, OutputOptions::new().with_data_mode(DataMode::Ascii))
        .unwrap();
    sdds.define_simple_column(0, "s", None, TypeTag::String)
        .unwrap();
    sdds.write_layout(0).unwrap();
    sdds.start_page(0, texts.len()).unwrap();
    let values: Vec<DynValue> = texts.iter().map(|t| DynValue::from(*t)).collect();
    sdds.set_column(0, &"s".into(), &values).unwrap();
    sdds.write_page(0).unwrap();
    sdds.terminate(0).unwrap();

    sdds.open_input(0, &path).unwrap();
    sdds.read_page(0).unwrap();
    let read = sdds.get_column(0, &"s".into()).unwrap();
    assert_eq!(read, values);
    let whitespace: Vec<bool> = read
        .iter()
        .map(|v| Sdds::has_whitespace(v.as_text().unwrap()))
        .collect();
    assert_eq!(whitespace, vec![false, true, true, true, false, true]);
    assert!(Sdds::string_is_blank(read[4].as_text().unwrap()));
}

#[test]
fn test_fixed_parameter_reads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fixed.sdds");
    let mut sdds = quiet();
    sdds.open_output(0, &path, OutputOptions::new()).unwrap();
    sdds.define_parameter(0, FieldInfo::new("gain", TypeTag::Float64), &DynValue::from(2.5))
        .unwrap();
    sdds.define_parameter(0, FieldInfo::new("tag", TypeTag::String), &DynValue::from("A-1"))
        .unwrap();
    sdds.write_layout(0).unwrap();
    sdds.start_page(0, 0).unwrap();
    let err = sdds
        .set_parameter(0, &"gain".into(), &DynValue::from(1.0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageEngine);
    sdds.write_page(0).unwrap();
    sdds.terminate(0).unwrap();

    sdds.open_input(0, &path).unwrap();
    sdds.read_page(0).unwrap();
    assert_eq!(
        sdds.get_parameter(0, &"gain".into()).unwrap(),
        DynValue::from(2.5)
    );
    assert_eq!(
        sdds.get_parameter(0, &"tag".into()).unwrap(),
        DynValue::from("A-1")
    );
}

#[test]
fn test_narrowing_on_set() {
    let mut sdds = quiet();
    sdds.open_memory(0, OutputOptions::new()).unwrap();
    sdds.define_simple_parameter(0, "u", None, TypeTag::UInt16)
        .unwrap();
    sdds.define_simple_parameter(0, "c", None, TypeTag::Char)
        .unwrap();
    sdds.start_page(0, 1).unwrap();
    sdds.set_parameter(0, &"u".into(), &DynValue::Int(-1)).unwrap();
    sdds.set_parameter(0, &"c".into(), &DynValue::from("xyz")).unwrap();
    assert_eq!(sdds.get_parameter(0, &"u".into()).unwrap(), DynValue::Int(65_535));
    assert_eq!(sdds.get_parameter(0, &"c".into()).unwrap(), DynValue::from("x"));
}
