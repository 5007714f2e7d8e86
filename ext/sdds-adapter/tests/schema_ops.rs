use sdds_adapter::*;
use tempfile::tempdir;

mod test_helpers;
use test_helpers::*;

fn source_with_two_columns(sdds: &mut Sdds, handle: usize) {
    sdds.open_memory(handle, OutputOptions::new()).unwrap();
    sdds.define_simple_column(handle, "A", None, TypeTag::Int32)
        .unwrap();
    sdds.define_simple_column(handle, "B", Some("label"), TypeTag::String)
        .unwrap();
}

#[test]
fn test_duplicate_definition_is_rejected() {
    let mut sdds = quiet();
    sdds.open_memory(0, OutputOptions::new()).unwrap();
    sdds.define_parameter(
        0,
        FieldInfo::new("p", TypeTag::Float64).with_units(Some("m")),
        &DynValue::None,
    )
    .unwrap();
    let before = sdds
        .field_definition(0, FieldKind::Parameter, &"p".into())
        .unwrap();
    let err = sdds
        .define_parameter(
            0,
            FieldInfo::new("p", TypeTag::Int16).with_units(Some("s")),
            &DynValue::Int(1),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaConflict);
    assert_eq!(sdds.number_of_errors(), 1);
    assert_eq!(
        sdds.field_definition(0, FieldKind::Parameter, &"p".into())
            .unwrap(),
        before
    );
    assert_eq!(sdds.field_count(0, FieldKind::Parameter).unwrap(), 1);
}

#[test]
fn test_copy_layout_onto_empty_dataset() {
    let mut sdds = quiet();
    source_with_two_columns(&mut sdds, 0);
    sdds.open_memory(1, OutputOptions::new()).unwrap();
    sdds.copy_layout(1, 0).unwrap();
    assert_eq!(
        sdds.field_names(1, FieldKind::Column).unwrap(),
        vec!["A", "B"]
    );
    assert_eq!(
        sdds.field_types(1, FieldKind::Column).unwrap(),
        vec![TypeTag::Int32, TypeTag::String]
    );
    assert_eq!(
        sdds.check_column(1, "B", Some("label"), TypeRequirement::Exact(TypeTag::String))
            .unwrap(),
        CheckStatus::Okay
    );

    sdds.copy_layout(1, 0).unwrap();
    assert_eq!(sdds.field_count(1, FieldKind::Column).unwrap(), 2);

    let err = sdds.copy_layout(1, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    let err = sdds.copy_layout(1, 9).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownHandle);
}

#[test]
fn test_append_layout_keeps_target_fields() {
    let mut sdds = quiet();
    source_with_two_columns(&mut sdds, 0);
    sdds.open_memory(1, OutputOptions::new()).unwrap();
    sdds.define_simple_column(1, "B", None, TypeTag::Float64)
        .unwrap();
    sdds.append_layout(1, 0).unwrap();
    assert_eq!(
        sdds.field_names(1, FieldKind::Column).unwrap(),
        vec!["B", "A"]
    );
    assert_eq!(
        sdds.field_type(1, FieldKind::Column, &"B".into()).unwrap(),
        TypeTag::Float64
    );
}

#[test]
fn test_apply_factor_to_columns() {
    let mut sdds = quiet();
    sdds.open_memory(0, OutputOptions::new()).unwrap();
    sdds.define_simple_column(0, "x", None, TypeTag::Float64)
        .unwrap();
    sdds.define_simple_column(0, "s", None, TypeTag::String)
        .unwrap();
    sdds.start_page(0, 3).unwrap();
    sdds.set_column(0, &"x".into(), &[1.0.into(), 2.0.into(), 3.0.into()])
        .unwrap();
    let words: Vec<DynValue> = vec!["a".into(), "b".into(), "c".into()];
    sdds.set_column(0, &"s".into(), &words).unwrap();

    sdds.apply_factor_to_column(0, "x", 2.0).unwrap();
    assert_eq!(
        sdds.get_column(0, &"x".into()).unwrap(),
        vec![DynValue::from(2.0), DynValue::from(4.0), DynValue::from(6.0)]
    );

    let err = sdds.apply_factor_to_column(0, "s", 2.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(sdds.get_column(0, &"s".into()).unwrap(), words);

    let err = sdds
        .apply_factor(0, FieldKind::Array, "x", 2.0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
}

#[test]
fn test_apply_factor_to_parameter() {
    let mut sdds = quiet();
    sdds.open_memory(0, OutputOptions::new()).unwrap();
    sdds.define_simple_parameter(0, "n", None, TypeTag::Int32)
        .unwrap();
    sdds.start_page(0, 0).unwrap();
    sdds.set_parameter(0, &"n".into(), &DynValue::Int(21)).unwrap();
    sdds.apply_factor_to_parameter(0, "n", 2.0).unwrap();
    assert_eq!(sdds.get_parameter(0, &"n".into()).unwrap(), DynValue::Int(42));
}

#[test]
fn test_transfers_between_handles() {
    let mut sdds = quiet();
    source_with_two_columns(&mut sdds, 0);
    sdds.define_simple_parameter(0, "run", Some("count"), TypeTag::Int64)
        .unwrap();
    sdds.open_memory(1, OutputOptions::new()).unwrap();

    assert_eq!(
        sdds.transfer_definition(1, 0, FieldKind::Column, "B", Some("B2"))
            .unwrap(),
        0
    );
    assert_eq!(
        sdds.define_column_like_parameter(1, 0, "run", None).unwrap(),
        1
    );
    assert_eq!(
        sdds.define_parameter_like_column(1, 0, "A", Some("a_param"))
            .unwrap(),
        0
    );
    assert_eq!(
        sdds.field_names(1, FieldKind::Column).unwrap(),
        vec!["B2", "run"]
    );
    let info = sdds
        .field_info(1, FieldKind::Column, &"run".into())
        .unwrap();
    assert_eq!(info.units.as_deref(), Some("count"));
    assert_eq!(info.type_tag, TypeTag::Int64);

    sdds.transfer_all_definitions(1, 0, FieldKind::Parameter, TransferMode::ErrorOnConflict)
        .unwrap();
    let err = sdds
        .transfer_all_definitions(1, 0, FieldKind::Parameter, TransferMode::ErrorOnConflict)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaConflict);
    sdds.transfer_all_definitions(1, 0, FieldKind::Parameter, TransferMode::KeepTarget)
        .unwrap();
    assert_eq!(
        sdds.field_names(1, FieldKind::Parameter).unwrap(),
        vec!["a_param", "run"]
    );

    let err = sdds
        .transfer_definition(1, 0, FieldKind::Column, "missing", None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameNotFound);
}

#[test]
fn test_copy_pages_and_rows_between_handles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("copy.sdds");
    let mut sdds = quiet();
    source_with_two_columns(&mut sdds, 0);
    sdds.start_page(0, 3).unwrap();
    for (row, label) in ["x", "y", "z"].iter().enumerate() {
        sdds.set_row_values(
            0,
            row,
            &[("A".into(), DynValue::from(row)), ("B".into(), DynValue::from(*label))],
        )
        .unwrap();
    }

    sdds.initialize_copy(1, 0, Some(&path), "w").unwrap();
    sdds.write_layout(1).unwrap();
    sdds.copy_page(1, 0).unwrap();
    sdds.write_page(1).unwrap();
    sdds.terminate(1).unwrap();

    sdds.open_input(2, &path).unwrap();
    sdds.read_page(2).unwrap();
    assert_eq!(sdds.get_column(2, &"A".into()).unwrap(), ints(&[0, 1, 2]));

    sdds.initialize_copy(3, 0, None, "m").unwrap();
    sdds.start_page(3, 4).unwrap();
    sdds.copy_row_direct(3, 0, 0, 2).unwrap();
    sdds.copy_row(3, 1, 0, 0).unwrap();
    assert_eq!(sdds.copy_additional_rows(3, 0).unwrap(), 3);
    assert_eq!(sdds.row_count(3).unwrap(), 5);
    assert_eq!(
        sdds.get_column(3, &"B".into()).unwrap(),
        vec![
            DynValue::from("z"),
            DynValue::from("x"),
            DynValue::from("x"),
            DynValue::from("y"),
            DynValue::from("z"),
        ]
    );

    let err = sdds.initialize_copy(4, 0, None, "w").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    let err = sdds.initialize_copy(4, 0, None, "q").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
}

#[test]
fn test_delete_unset_columns_and_rows() {
    let mut sdds = quiet();
    source_with_two_columns(&mut sdds, 0);
    sdds.start_page(0, 4).unwrap();
    sdds.set_row_values(0, 0, &[("A".into(), DynValue::Int(1))])
        .unwrap();
    sdds.set_row_values(0, 2, &[("A".into(), DynValue::Int(3))])
        .unwrap();
    sdds.delete_unset_rows(0).unwrap();
    assert_eq!(sdds.get_column(0, &"A".into()).unwrap(), ints(&[1, 3]));
    sdds.delete_unset_columns(0).unwrap();
    assert_eq!(sdds.field_names(0, FieldKind::Column).unwrap(), vec!["A"]);
    sdds.check_dataset(0, "after delete").unwrap();
}
