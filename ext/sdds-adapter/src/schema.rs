//! Definition, lookup and transfer of fields through the handle API

use crate::binding::Sdds;
use crate::error::{BindingError, Result};
use crate::marshal::fixed_value_text;
use crate::value::{DynValue, FieldRef};
use sdds_core::header::{
    array_from_namelist, column_from_namelist, parameter_from_namelist, single_record,
};
use sdds_core::schema::{has_whitespace, string_is_blank};
use sdds_core::{
    ArrayDefinition, ColumnDefinition, DefinitionMode, FieldInfo, FieldKind, NamePolicy,
    ParameterDefinition, TransferMode, TypeTag,
};

/// What `check_field` accepts as the field's type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRequirement {
    Exact(TypeTag),
    Any,
    AnyNumeric,
    AnyInteger,
    AnyFloating,
}

impl TypeRequirement {
    pub fn accepts(self, tag: TypeTag) -> bool {
        match self {
            TypeRequirement::Exact(t) => t == tag,
            TypeRequirement::Any => true,
            TypeRequirement::AnyNumeric => tag.is_numeric(),
            TypeRequirement::AnyInteger => tag.is_integer(),
            TypeRequirement::AnyFloating => tag.is_floating(),
        }
    }
}

/// Outcome of `check_field`. The numeric codes are part of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Okay,
    NonExistent,
    WrongType,
    WrongUnits,
}

impl CheckStatus {
    pub fn code(self) -> i32 {
        match self {
            CheckStatus::Okay => 0,
            CheckStatus::NonExistent => 1,
            CheckStatus::WrongType => 2,
            CheckStatus::WrongUnits => 3,
        }
    }
}

/// A full definition as returned by `field_definition`
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionRecord {
    Parameter(ParameterDefinition),
    Column(ColumnDefinition),
    Array(ArrayDefinition),
}

fn opt_text(value: &Option<String>) -> DynValue {
    value.clone().into()
}

impl DefinitionRecord {
    pub fn info(&self) -> &FieldInfo {
        match self {
            DefinitionRecord::Parameter(d) => &d.info,
            DefinitionRecord::Column(d) => &d.info,
            DefinitionRecord::Array(d) => &d.info,
        }
    }

    /// Flat list form: symbol, units, description, format string, then the
    /// kind-specific entries. Parameters end with the type code and fixed
    /// value, columns with the type code and field length, arrays with the
    /// group name, type code, field length and dimension count.
    pub fn to_values(&self) -> Vec<DynValue> {
        let info = self.info();
        let mut values = vec![
            opt_text(&info.symbol),
            opt_text(&info.units),
            opt_text(&info.description),
            opt_text(&info.format_string),
        ];
        let code = DynValue::from(info.type_tag.code());
        match self {
            DefinitionRecord::Parameter(d) => {
                values.push(code);
                values.push(opt_text(&d.fixed_value));
            }
            DefinitionRecord::Column(d) => {
                values.push(code);
                values.push(DynValue::from(d.field_length));
            }
            DefinitionRecord::Array(d) => {
                values.push(opt_text(&d.group_name));
                values.push(code);
                values.push(DynValue::from(d.field_length));
                values.push(DynValue::from(d.dimensions));
            }
        }
        values
    }
}

/// Wrap a bare attribute list in `&group ... &end`
fn record_text(text: &str, group: &str) -> String {
    if text.trim_start().starts_with('&') {
        text.to_string()
    } else {
        format!("&{} {} &end", group, text)
    }
}

fn tag_from_code(code: i32) -> Result<TypeTag> {
    TypeTag::from_code(code)
        .ok_or_else(|| BindingError::invalid_arguments(format!("unknown type code {}", code)))
}

impl Sdds {
    // ---- definitions ----

    /// Define a parameter. `fixed` becomes the constant value: text is
    /// stored as given (empty text means none), numbers are rendered through
    /// the field's format string, [`DynValue::None`] means none.
    pub fn define_parameter(
        &mut self,
        handle: usize,
        info: FieldInfo,
        fixed: &DynValue,
    ) -> Result<usize> {
        let policy = self.config.name_policy;
        self.with_dataset(handle, |ds| {
            let text = fixed_value_text(fixed, info.format_string.as_deref())?;
            let def = ParameterDefinition::new(info).with_fixed_value(text);
            Ok(ds.define_parameter(def, policy, DefinitionMode::Normal)?)
        })
    }

    pub fn define_column(
        &mut self,
        handle: usize,
        info: FieldInfo,
        field_length: i32,
    ) -> Result<usize> {
        let policy = self.config.name_policy;
        self.with_dataset(handle, |ds| {
            let def = ColumnDefinition::new(info).with_field_length(field_length);
            Ok(ds.define_column(def, policy, DefinitionMode::Normal)?)
        })
    }

    pub fn define_array(
        &mut self,
        handle: usize,
        info: FieldInfo,
        group_name: Option<&str>,
        field_length: i32,
        dimensions: usize,
    ) -> Result<usize> {
        if dimensions == 0 {
            return Err(BindingError::invalid_arguments(
                "an array needs at least one dimension",
            ));
        }
        let policy = self.config.name_policy;
        self.with_dataset(handle, |ds| {
            let def = ArrayDefinition::new(info, dimensions)
                .with_field_length(field_length)
                .with_group_name(group_name);
            Ok(ds.define_array(def, policy, DefinitionMode::Normal)?)
        })
    }

    pub fn define_simple_parameter(
        &mut self,
        handle: usize,
        name: &str,
        units: Option<&str>,
        tag: TypeTag,
    ) -> Result<usize> {
        self.define_parameter(
            handle,
            FieldInfo::new(name, tag).with_units(units),
            &DynValue::None,
        )
    }

    pub fn define_simple_column(
        &mut self,
        handle: usize,
        name: &str,
        units: Option<&str>,
        tag: TypeTag,
    ) -> Result<usize> {
        self.define_column(handle, FieldInfo::new(name, tag).with_units(units), 0)
    }

    pub fn define_simple_array(
        &mut self,
        handle: usize,
        name: &str,
        units: Option<&str>,
        tag: TypeTag,
        dimensions: usize,
    ) -> Result<usize> {
        self.define_array(
            handle,
            FieldInfo::new(name, tag).with_units(units),
            None,
            0,
            dimensions,
        )
    }

    /// Define a parameter from namelist text such as
    /// `name=p, type=double, units=m`. Write-only definitions skip the
    /// name check.
    pub fn process_parameter_string(
        &mut self,
        handle: usize,
        text: &str,
        mode: DefinitionMode,
    ) -> Result<usize> {
        let policy = self.config.name_policy;
        self.with_dataset(handle, |ds| {
            let list = single_record(&record_text(text, "parameter"), "parameter")?;
            Ok(ds.define_parameter(parameter_from_namelist(&list)?, policy, mode)?)
        })
    }

    pub fn process_column_string(
        &mut self,
        handle: usize,
        text: &str,
        mode: DefinitionMode,
    ) -> Result<usize> {
        let policy = self.config.name_policy;
        self.with_dataset(handle, |ds| {
            let list = single_record(&record_text(text, "column"), "column")?;
            Ok(ds.define_column(column_from_namelist(&list)?, policy, mode)?)
        })
    }

    pub fn process_array_string(
        &mut self,
        handle: usize,
        text: &str,
        mode: DefinitionMode,
    ) -> Result<usize> {
        let policy = self.config.name_policy;
        self.with_dataset(handle, |ds| {
            let list = single_record(&record_text(text, "array"), "array")?;
            Ok(ds.define_array(array_from_namelist(&list)?, policy, mode)?)
        })
    }

    // ---- names ----

    pub fn is_valid_name(&self, name: &str) -> bool {
        self.config.name_policy.is_valid(name)
    }

    /// Returns the previous policy
    pub fn set_name_validity_policy(&mut self, policy: NamePolicy) -> NamePolicy {
        std::mem::replace(&mut self.config.name_policy, policy)
    }

    pub fn has_whitespace(text: &str) -> bool {
        has_whitespace(text)
    }

    pub fn string_is_blank(text: &str) -> bool {
        string_is_blank(text)
    }

    // ---- type tags ----

    pub fn type_size(code: i32) -> Result<usize> {
        Ok(tag_from_code(code)?.size())
    }

    pub fn type_name(code: i32) -> Result<&'static str> {
        Ok(tag_from_code(code)?.type_name())
    }

    pub fn type_code(name: &str) -> Result<i32> {
        TypeTag::from_name(name)
            .map(TypeTag::code)
            .ok_or_else(|| BindingError::invalid_arguments(format!("unknown type name {:?}", name)))
    }

    // ---- cross-dataset ----

    pub fn transfer_definition(
        &mut self,
        target: usize,
        source: usize,
        kind: FieldKind,
        name: &str,
        new_name: Option<&str>,
    ) -> Result<usize> {
        let policy = self.config.name_policy;
        self.with_pair(target, source, |t, s| {
            Ok(t.transfer_definition(s, kind, name, new_name, policy)?)
        })
    }

    pub fn transfer_all_definitions(
        &mut self,
        target: usize,
        source: usize,
        kind: FieldKind,
        mode: TransferMode,
    ) -> Result<()> {
        self.with_pair(target, source, |t, s| {
            Ok(t.transfer_all_definitions(s, kind, mode)?)
        })
    }

    pub fn define_column_like_parameter(
        &mut self,
        target: usize,
        source: usize,
        name: &str,
        new_name: Option<&str>,
    ) -> Result<usize> {
        let policy = self.config.name_policy;
        self.with_pair(target, source, |t, s| {
            Ok(t.define_column_like_parameter(s, name, new_name, policy)?)
        })
    }

    pub fn define_parameter_like_column(
        &mut self,
        target: usize,
        source: usize,
        name: &str,
        new_name: Option<&str>,
    ) -> Result<usize> {
        let policy = self.config.name_policy;
        self.with_pair(target, source, |t, s| {
            Ok(t.define_parameter_like_column(s, name, new_name, policy)?)
        })
    }

    // ---- deletion ----

    pub fn delete_field(&mut self, handle: usize, kind: FieldKind, name: &str) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.delete_field(kind, name)?))
    }

    pub fn delete_column(&mut self, handle: usize, name: &str) -> Result<()> {
        self.delete_field(handle, FieldKind::Column, name)
    }

    pub fn delete_parameter(&mut self, handle: usize, name: &str) -> Result<()> {
        self.delete_field(handle, FieldKind::Parameter, name)
    }

    /// Drop columns that have no value in the current page
    pub fn delete_unset_columns(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.delete_unset_columns()?))
    }

    /// Drop rows never written in the current page
    pub fn delete_unset_rows(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| {
            ds.delete_unset_rows();
            Ok(())
        })
    }

    pub fn delete_parameter_fixed_values(&mut self, handle: usize) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.delete_fixed_values()?))
    }

    // ---- introspection ----

    pub fn field_count(&mut self, handle: usize, kind: FieldKind) -> Result<usize> {
        self.with_dataset(handle, |ds| Ok(ds.layout().field_count(kind)))
    }

    pub fn field_names(&mut self, handle: usize, kind: FieldKind) -> Result<Vec<String>> {
        self.with_dataset(handle, |ds| {
            Ok(ds
                .layout()
                .field_names(kind)
                .into_iter()
                .map(str::to_string)
                .collect())
        })
    }

    pub fn field_name(&mut self, handle: usize, kind: FieldKind, index: usize) -> Result<String> {
        self.field_info(handle, kind, &FieldRef::ByIndex(index))
            .map(|info| info.name)
    }

    pub fn field_index(&mut self, handle: usize, kind: FieldKind, name: &str) -> Result<usize> {
        self.with_dataset(handle, |ds| {
            Sdds::resolve(ds, kind, &FieldRef::ByName(name.to_string()))
        })
    }

    pub fn field_type(&mut self, handle: usize, kind: FieldKind, field: &FieldRef) -> Result<TypeTag> {
        self.field_info(handle, kind, field).map(|info| info.type_tag)
    }

    /// Type tags of every field of `kind`, in definition order
    pub fn field_types(&mut self, handle: usize, kind: FieldKind) -> Result<Vec<TypeTag>> {
        self.with_dataset(handle, |ds| {
            let layout = ds.layout();
            Ok((0..layout.field_count(kind))
                .filter_map(|i| layout.field_info(kind, i).map(|info| info.type_tag))
                .collect())
        })
    }

    pub fn field_info(&mut self, handle: usize, kind: FieldKind, field: &FieldRef) -> Result<FieldInfo> {
        self.with_dataset(handle, |ds| {
            let index = Sdds::resolve(ds, kind, field)?;
            ds.layout()
                .field_info(kind, index)
                .cloned()
                .ok_or_else(|| BindingError::name_not_found(format!("{} {}", kind, field)))
        })
    }

    pub fn field_definition(
        &mut self,
        handle: usize,
        kind: FieldKind,
        field: &FieldRef,
    ) -> Result<DefinitionRecord> {
        self.with_dataset(handle, |ds| {
            let index = Sdds::resolve(ds, kind, field)?;
            let layout = ds.layout();
            let record = match kind {
                FieldKind::Parameter => layout
                    .parameters
                    .get_index(index)
                    .map(|(_, d)| DefinitionRecord::Parameter(d.clone())),
                FieldKind::Column => layout
                    .columns
                    .get_index(index)
                    .map(|(_, d)| DefinitionRecord::Column(d.clone())),
                FieldKind::Array => layout
                    .arrays
                    .get_index(index)
                    .map(|(_, d)| DefinitionRecord::Array(d.clone())),
            };
            record.ok_or_else(|| BindingError::name_not_found(format!("{} {}", kind, field)))
        })
    }

    /// Verify that a field exists with an acceptable type and, when `units`
    /// is given, matching units. Absent and empty units compare equal.
    pub fn check_field(
        &mut self,
        handle: usize,
        kind: FieldKind,
        name: &str,
        units: Option<&str>,
        requirement: TypeRequirement,
    ) -> Result<CheckStatus> {
        self.with_dataset(handle, |ds| {
            let layout = ds.layout();
            let Some(info) = layout
                .field_index(kind, name)
                .and_then(|i| layout.field_info(kind, i))
            else {
                return Ok(CheckStatus::NonExistent);
            };
            if !requirement.accepts(info.type_tag) {
                return Ok(CheckStatus::WrongType);
            }
            if let Some(expected) = units {
                if info.units.as_deref().unwrap_or("") != expected {
                    return Ok(CheckStatus::WrongUnits);
                }
            }
            Ok(CheckStatus::Okay)
        })
    }

    pub fn check_parameter(
        &mut self,
        handle: usize,
        name: &str,
        units: Option<&str>,
        requirement: TypeRequirement,
    ) -> Result<CheckStatus> {
        self.check_field(handle, FieldKind::Parameter, name, units, requirement)
    }

    pub fn check_column(
        &mut self,
        handle: usize,
        name: &str,
        units: Option<&str>,
        requirement: TypeRequirement,
    ) -> Result<CheckStatus> {
        self.check_field(handle, FieldKind::Column, name, units, requirement)
    }

    pub fn check_array(
        &mut self,
        handle: usize,
        name: &str,
        units: Option<&str>,
        requirement: TypeRequirement,
    ) -> Result<CheckStatus> {
        self.check_field(handle, FieldKind::Array, name, units, requirement)
    }

    // ---- description ----

    /// Description text and contents
    pub fn get_description(&mut self, handle: usize) -> Result<(Option<String>, Option<String>)> {
        self.with_dataset(handle, |ds| {
            let (text, contents) = ds.description();
            Ok((text.map(str::to_string), contents.map(str::to_string)))
        })
    }

    pub fn get_description_text(&mut self, handle: usize) -> Result<Option<String>> {
        self.get_description(handle).map(|(text, _)| text)
    }

    pub fn get_description_contents(&mut self, handle: usize) -> Result<Option<String>> {
        self.get_description(handle).map(|(_, contents)| contents)
    }

    pub fn set_description(
        &mut self,
        handle: usize,
        text: Option<&str>,
        contents: Option<&str>,
    ) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.set_description(text, contents)?))
    }

    /// Multiply a numeric parameter or column by `factor` on this page and
    /// every page read afterwards
    pub fn apply_factor(
        &mut self,
        handle: usize,
        kind: FieldKind,
        name: &str,
        factor: f64,
    ) -> Result<()> {
        self.with_dataset(handle, |ds| Ok(ds.apply_factor(kind, name, factor)?))
    }

    pub fn apply_factor_to_parameter(&mut self, handle: usize, name: &str, factor: f64) -> Result<()> {
        self.apply_factor(handle, FieldKind::Parameter, name, factor)
    }

    pub fn apply_factor_to_column(&mut self, handle: usize, name: &str, factor: f64) -> Result<()> {
        self.apply_factor(handle, FieldKind::Column, name, factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use sdds_core::OutputOptions;

    fn memory() -> Sdds {
        let mut sdds = Sdds::default();
        sdds.open_memory(0, OutputOptions::new()).unwrap();
        sdds
    }

    #[test]
    fn test_define_and_lookup() {
        let mut sdds = memory();
        assert_eq!(
            sdds.define_simple_column(0, "x", Some("m"), TypeTag::Float64).unwrap(),
            0
        );
        assert_eq!(
            sdds.define_simple_column(0, "y", None, TypeTag::Int32).unwrap(),
            1
        );
        assert_eq!(sdds.field_count(0, FieldKind::Column).unwrap(), 2);
        assert_eq!(sdds.field_index(0, FieldKind::Column, "y").unwrap(), 1);
        assert_eq!(sdds.field_name(0, FieldKind::Column, 0).unwrap(), "x");
        assert_eq!(
            sdds.field_type(0, FieldKind::Column, &"y".into()).unwrap(),
            TypeTag::Int32
        );
        assert_eq!(
            sdds.field_types(0, FieldKind::Column).unwrap(),
            vec![TypeTag::Float64, TypeTag::Int32]
        );
        let err = sdds.field_index(0, FieldKind::Column, "z").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameNotFound);
        let err = sdds
            .field_type(0, FieldKind::Column, &FieldRef::ByIndex(5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameNotFound);
    }

    #[test]
    fn test_duplicate_name_leaves_definition_alone() {
        let mut sdds = memory();
        sdds.define_column(0, FieldInfo::new("a", TypeTag::Int32).with_units(Some("s")), 0)
            .unwrap();
        let err = sdds
            .define_column(0, FieldInfo::new("a", TypeTag::String), 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaConflict);
        let info = sdds.field_info(0, FieldKind::Column, &"a".into()).unwrap();
        assert_eq!(info.type_tag, TypeTag::Int32);
        assert_eq!(info.units.as_deref(), Some("s"));
        assert_eq!(sdds.number_of_errors(), 1);
    }

    #[test]
    fn test_unusable_format_string_is_refused() {
        let mut sdds = memory();
        let huge = "%99999999999999999999d";

        let err = sdds
            .define_parameter(
                0,
                FieldInfo::new("p", TypeTag::Int32).with_format_string(Some(huge)),
                &DynValue::from(3),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageEngine);

        let err = sdds
            .define_column(
                0,
                FieldInfo::new("c", TypeTag::Float64).with_format_string(Some("%2000f")),
                0,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaConflict);

        assert_eq!(sdds.field_count(0, FieldKind::Parameter).unwrap(), 0);
        assert_eq!(sdds.field_count(0, FieldKind::Column).unwrap(), 0);
        assert_eq!(sdds.number_of_errors(), 2);
    }

    #[test]
    fn test_name_policy() {
        let mut sdds = memory();
        assert!(!sdds.is_valid_name("1abc"));
        let err = sdds
            .define_simple_parameter(0, "1abc", None, TypeTag::Int32)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaConflict);
        let previous = sdds.set_name_validity_policy(NamePolicy::AllowAny);
        assert_eq!(previous, NamePolicy::Strict);
        assert!(sdds.is_valid_name("1abc"));
        sdds.define_simple_parameter(0, "1abc", None, TypeTag::Int32)
            .unwrap();
    }

    #[test]
    fn test_fixed_parameter_definition() {
        let mut sdds = memory();
        sdds.define_parameter(
            0,
            FieldInfo::new("count", TypeTag::Int32).with_format_string(Some("%04d")),
            &DynValue::Int(12),
        )
        .unwrap();
        let record = sdds
            .field_definition(0, FieldKind::Parameter, &"count".into())
            .unwrap();
        assert_eq!(
            record.to_values(),
            vec![
                DynValue::None,
                DynValue::None,
                DynValue::None,
                DynValue::from("%04d"),
                DynValue::Int(6),
                DynValue::from("0012"),
            ]
        );

        let err = sdds
            .define_parameter(0, FieldInfo::new("bad", TypeTag::Int32), &DynValue::List(vec![]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_array_definition_record() {
        let mut sdds = memory();
        sdds.define_array(
            0,
            FieldInfo::new("grid", TypeTag::Float32).with_units(Some("V")),
            Some("g1"),
            8,
            2,
        )
        .unwrap();
        let values = sdds
            .field_definition(0, FieldKind::Array, &FieldRef::ByIndex(0))
            .unwrap()
            .to_values();
        assert_eq!(values[1], DynValue::from("V"));
        assert_eq!(values[4], DynValue::from("g1"));
        assert_eq!(values[5], DynValue::Int(3));
        assert_eq!(values[6], DynValue::Int(8));
        assert_eq!(values[7], DynValue::Int(2));

        let err = sdds
            .define_simple_array(0, "flat", None, TypeTag::Int16, 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    }

    #[test]
    fn test_process_strings() {
        let mut sdds = memory();
        sdds.process_column_string(0, "name=x, type=double, units=mm", DefinitionMode::Normal)
            .unwrap();
        sdds.process_parameter_string(
            0,
            "&parameter name=p, type=long, fixed_value=3, &end",
            DefinitionMode::Normal,
        )
        .unwrap();
        sdds.process_array_string(0, "name=a type=short dimensions=3", DefinitionMode::Normal)
            .unwrap();
        let info = sdds.field_info(0, FieldKind::Column, &"x".into()).unwrap();
        assert_eq!(info.units.as_deref(), Some("mm"));
        let record = sdds
            .field_definition(0, FieldKind::Array, &"a".into())
            .unwrap();
        assert!(matches!(record, DefinitionRecord::Array(ref d) if d.dimensions == 3));

        assert!(sdds
            .process_column_string(0, "name=9x, type=double", DefinitionMode::Normal)
            .is_err());
        sdds.process_column_string(0, "name=9x, type=double", DefinitionMode::WriteOnly)
            .unwrap();
    }

    #[test]
    fn test_check_field() {
        let mut sdds = memory();
        sdds.define_simple_column(0, "x", Some("m"), TypeTag::Float32)
            .unwrap();
        sdds.define_simple_column(0, "n", None, TypeTag::UInt16)
            .unwrap();
        let check = |sdds: &mut Sdds, name: &str, units: Option<&str>, req| {
            sdds.check_field(0, FieldKind::Column, name, units, req)
                .unwrap()
        };
        assert_eq!(
            check(&mut sdds, "x", Some("m"), TypeRequirement::AnyFloating),
            CheckStatus::Okay
        );
        assert_eq!(
            check(&mut sdds, "x", Some("s"), TypeRequirement::Any),
            CheckStatus::WrongUnits
        );
        assert_eq!(
            check(&mut sdds, "x", None, TypeRequirement::Exact(TypeTag::Float64)),
            CheckStatus::WrongType
        );
        assert_eq!(
            check(&mut sdds, "n", Some(""), TypeRequirement::AnyInteger),
            CheckStatus::Okay
        );
        let status = check(&mut sdds, "q", None, TypeRequirement::Any);
        assert_eq!(status, CheckStatus::NonExistent);
        assert_eq!(status.code(), 1);
    }

    #[test]
    fn test_type_helpers() {
        assert_eq!(Sdds::type_size(2).unwrap(), 8);
        assert_eq!(Sdds::type_size(11).unwrap(), 1);
        assert_eq!(Sdds::type_name(9).unwrap(), "ushort");
        assert_eq!(Sdds::type_code("long64").unwrap(), 4);
        assert_eq!(
            Sdds::type_code("quad").unwrap_err().kind(),
            ErrorKind::InvalidArguments
        );
        assert!(Sdds::type_size(1).is_err());
        assert!(Sdds::has_whitespace("a b"));
        assert!(Sdds::string_is_blank(" \t"));
        assert!(!Sdds::string_is_blank(" x"));
    }

    #[test]
    fn test_description() {
        let mut sdds = Sdds::default();
        sdds.open_memory(
            1,
            OutputOptions::new()
                .with_description("run log")
                .with_contents("beam"),
        )
        .unwrap();
        assert_eq!(
            sdds.get_description(1).unwrap(),
            (Some("run log".to_string()), Some("beam".to_string()))
        );
        sdds.set_description(1, Some(""), Some("other")).unwrap();
        assert_eq!(sdds.get_description_text(1).unwrap(), None);
        assert_eq!(
            sdds.get_description_contents(1).unwrap().as_deref(),
            Some("other")
        );
    }

    #[test]
    fn test_delete_fixed_values() {
        let mut sdds = memory();
        sdds.define_parameter(0, FieldInfo::new("k", TypeTag::Float64), &DynValue::from(1.5))
            .unwrap();
        sdds.delete_parameter_fixed_values(0).unwrap();
        let record = sdds
            .field_definition(0, FieldKind::Parameter, &"k".into())
            .unwrap();
        assert!(matches!(record, DefinitionRecord::Parameter(ref d) if d.fixed_value.is_none()));
        sdds.delete_parameter(0, "k").unwrap();
        assert_eq!(sdds.field_count(0, FieldKind::Parameter).unwrap(), 0);
        let err = sdds.delete_column(0, "k").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameNotFound);
    }
}
