use crate::{format, DataMode, FieldKind, Result, SddsError, TypeTag};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered map of field definitions keyed by name
pub type FieldMap<V> = IndexMap<String, V, ahash::RandomState>;

const VALID_NAME_CHARS: &str = "@:#+%-._$&/[]";
const VALID_START_CHARS: &str = ".:";

/// Which names `define` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamePolicy {
    /// Letters, digits and `@:#+%-._$&/[]`, starting with a letter, `.` or `:`
    #[default]
    Strict,
    /// Any non-empty name
    AllowAny,
}

impl NamePolicy {
    pub fn is_valid(self, name: &str) -> bool {
        match self {
            NamePolicy::AllowAny => !name.is_empty(),
            NamePolicy::Strict => is_valid_name(name),
        }
    }
}

/// Strict name check
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => return false,
        Some(c) if !(c.is_ascii_alphabetic() || VALID_START_CHARS.contains(c)) => return false,
        _ => {}
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || VALID_NAME_CHARS.contains(c))
}

pub fn has_whitespace(text: &str) -> bool {
    text.chars().any(char::is_whitespace)
}

/// True for empty or all-whitespace text
pub fn string_is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Attributes shared by every field kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub symbol: Option<String>,
    pub units: Option<String>,
    pub description: Option<String>,
    pub format_string: Option<String>,
    pub type_tag: TypeTag,
}

impl FieldInfo {
    pub fn new<S: Into<String>>(name: S, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            symbol: None,
            units: None,
            description: None,
            format_string: None,
            type_tag,
        }
    }

    pub fn with_symbol<S: Into<String>>(mut self, symbol: Option<S>) -> Self {
        self.symbol = non_empty(symbol.map(Into::into));
        self
    }

    pub fn with_units<S: Into<String>>(mut self, units: Option<S>) -> Self {
        self.units = non_empty(units.map(Into::into));
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: Option<S>) -> Self {
        self.description = non_empty(description.map(Into::into));
        self
    }

    pub fn with_format_string<S: Into<String>>(mut self, format_string: Option<S>) -> Self {
        self.format_string = non_empty(format_string.map(Into::into));
        self
    }

    /// Empty optional attributes become absent
    pub fn normalize(&mut self) {
        self.symbol = non_empty(self.symbol.take());
        self.units = non_empty(self.units.take());
        self.description = non_empty(self.description.take());
        self.format_string = non_empty(self.format_string.take());
    }
}

/// A single scalar per page, or a constant baked into the header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub info: FieldInfo,
    /// Canonical text of the constant value
    pub fixed_value: Option<String>,
}

/// A per-row scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub info: FieldInfo,
    pub field_length: i32,
}

/// A multi-dimensional value, one per page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDefinition {
    pub info: FieldInfo,
    pub field_length: i32,
    pub dimensions: usize,
    pub group_name: Option<String>,
}

impl ParameterDefinition {
    pub fn new(info: FieldInfo) -> Self {
        Self {
            info,
            fixed_value: None,
        }
    }

    pub fn with_fixed_value<S: Into<String>>(mut self, value: Option<S>) -> Self {
        self.fixed_value = value.map(Into::into);
        self
    }

    /// Derive a parameter from a column, keeping type, units and text attributes
    pub fn like_column(column: &ColumnDefinition) -> Self {
        Self::new(column.info.clone())
    }
}

impl ColumnDefinition {
    pub fn new(info: FieldInfo) -> Self {
        Self {
            info,
            field_length: 0,
        }
    }

    pub fn with_field_length(mut self, field_length: i32) -> Self {
        self.field_length = field_length;
        self
    }

    /// Derive a column from a parameter. The fixed value is not carried over.
    pub fn like_parameter(parameter: &ParameterDefinition) -> Self {
        Self::new(parameter.info.clone())
    }
}

impl ArrayDefinition {
    pub fn new(info: FieldInfo, dimensions: usize) -> Self {
        Self {
            info,
            field_length: 0,
            dimensions,
            group_name: None,
        }
    }

    pub fn with_field_length(mut self, field_length: i32) -> Self {
        self.field_length = field_length;
        self
    }

    pub fn with_group_name<S: Into<String>>(mut self, group_name: Option<S>) -> Self {
        self.group_name = non_empty(group_name.map(Into::into));
        self
    }
}

/// Common access to the three definition records
pub trait Definition: Clone {
    const KIND: FieldKind;

    fn info(&self) -> &FieldInfo;
    fn info_mut(&mut self) -> &mut FieldInfo;

    /// Kind-specific checks run before the definition is accepted
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn normalize(&mut self) {
        self.info_mut().normalize();
    }

    fn name(&self) -> &str {
        &self.info().name
    }

    fn type_tag(&self) -> TypeTag {
        self.info().type_tag
    }
}

impl Definition for ParameterDefinition {
    const KIND: FieldKind = FieldKind::Parameter;

    fn info(&self) -> &FieldInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut FieldInfo {
        &mut self.info
    }

    fn validate(&self) -> Result<()> {
        if let Some(text) = &self.fixed_value {
            format::parse_value(text, self.info.type_tag).map_err(|e| {
                SddsError::schema(format!(
                    "fixed value {:?} of parameter {} is not a valid {}: {}",
                    text, self.info.name, self.info.type_tag, e
                ))
            })?;
        }
        Ok(())
    }
}

impl Definition for ColumnDefinition {
    const KIND: FieldKind = FieldKind::Column;

    fn info(&self) -> &FieldInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut FieldInfo {
        &mut self.info
    }

    fn validate(&self) -> Result<()> {
        if self.field_length < 0 && self.info.type_tag != TypeTag::String {
            return Err(SddsError::schema(format!(
                "negative field length is only valid for string columns ({})",
                self.info.name
            )));
        }
        Ok(())
    }
}

impl Definition for ArrayDefinition {
    const KIND: FieldKind = FieldKind::Array;

    fn info(&self) -> &FieldInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut FieldInfo {
        &mut self.info
    }

    fn validate(&self) -> Result<()> {
        if self.dimensions < 1 {
            return Err(SddsError::schema(format!(
                "array {} must have at least one dimension",
                self.info.name
            )));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.info.normalize();
        self.group_name = non_empty(self.group_name.take());
    }
}

/// How bulk definition transfers treat names that already exist in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    /// Fail before transferring anything if any name is already defined
    ErrorOnConflict,
    /// Leave the target's definition in place
    KeepTarget,
    /// Replace the target's definition with the source's
    Overwrite,
    /// Add missing names only. A same-named field of a different type is an error.
    MergeMissing,
}

impl TransferMode {
    pub fn code(self) -> i32 {
        match self {
            TransferMode::ErrorOnConflict => 0,
            TransferMode::KeepTarget => 1,
            TransferMode::Overwrite => 2,
            TransferMode::MergeMissing => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TransferMode::ErrorOnConflict),
            1 => Some(TransferMode::KeepTarget),
            2 => Some(TransferMode::Overwrite),
            3 => Some(TransferMode::MergeMissing),
            _ => None,
        }
    }
}

/// Whether a definition goes through name checks ("normal") or is written
/// as-is ("write-only", used when mirroring an existing file)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DefinitionMode {
    #[default]
    Normal,
    WriteOnly,
}

/// Add `def` to `map`, returning its index
pub fn insert_field<D: Definition>(
    map: &mut FieldMap<D>,
    mut def: D,
    policy: NamePolicy,
    mode: DefinitionMode,
) -> Result<usize> {
    def.normalize();
    let name = def.name().to_string();
    if mode == DefinitionMode::Normal && !policy.is_valid(&name) {
        return Err(SddsError::schema(format!(
            "invalid {} name {:?}",
            D::KIND,
            name
        )));
    }
    if name.is_empty() {
        return Err(SddsError::schema(format!("{} name is empty", D::KIND)));
    }
    if map.contains_key(&name) {
        return Err(SddsError::schema(format!(
            "{} {} already exists",
            D::KIND,
            name
        )));
    }
    if let Some(fmt) = &def.info().format_string {
        format::check_format_string(fmt).map_err(|e| {
            SddsError::schema(format!("format string of {} {}: {}", D::KIND, name, e))
        })?;
    }
    def.validate()?;
    let (index, _) = map.insert_full(name, def);
    Ok(index)
}

/// Copy every definition of `source` into `target` under `mode`
pub fn transfer_all<D: Definition>(
    target: &mut FieldMap<D>,
    source: &FieldMap<D>,
    mode: TransferMode,
) -> Result<()> {
    match mode {
        TransferMode::ErrorOnConflict => {
            if let Some(name) = source.keys().find(|name| target.contains_key(*name)) {
                return Err(SddsError::schema(format!(
                    "{} {} already exists in the target",
                    D::KIND,
                    name
                )));
            }
        }
        TransferMode::MergeMissing => {
            for (name, def) in source {
                if let Some(existing) = target.get(name) {
                    if existing.type_tag() != def.type_tag() {
                        return Err(SddsError::schema(format!(
                            "{} {} is {} in the target but {} in the source",
                            D::KIND,
                            name,
                            existing.type_tag(),
                            def.type_tag()
                        )));
                    }
                }
            }
        }
        _ => {}
    }
    for (name, def) in source {
        match target.get_mut(name) {
            Some(existing) if mode == TransferMode::Overwrite => *existing = def.clone(),
            Some(_) => {}
            None => {
                target.insert(name.clone(), def.clone());
            }
        }
    }
    Ok(())
}

/// The complete schema of a dataset
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub description: Option<String>,
    pub contents: Option<String>,
    pub parameters: FieldMap<ParameterDefinition>,
    pub arrays: FieldMap<ArrayDefinition>,
    pub columns: FieldMap<ColumnDefinition>,
    pub data_mode: DataMode,
    pub lines_per_row: u32,
    pub column_major: bool,
}

impl Layout {
    pub fn new() -> Self {
        Self {
            lines_per_row: 1,
            ..Self::default()
        }
    }

    pub fn set_description<S: Into<String>>(&mut self, text: Option<S>, contents: Option<S>) {
        self.description = non_empty(text.map(Into::into));
        self.contents = non_empty(contents.map(Into::into));
    }

    pub fn define_parameter(
        &mut self,
        def: ParameterDefinition,
        policy: NamePolicy,
        mode: DefinitionMode,
    ) -> Result<usize> {
        insert_field(&mut self.parameters, def, policy, mode)
    }

    pub fn define_column(
        &mut self,
        def: ColumnDefinition,
        policy: NamePolicy,
        mode: DefinitionMode,
    ) -> Result<usize> {
        insert_field(&mut self.columns, def, policy, mode)
    }

    pub fn define_array(
        &mut self,
        def: ArrayDefinition,
        policy: NamePolicy,
        mode: DefinitionMode,
    ) -> Result<usize> {
        insert_field(&mut self.arrays, def, policy, mode)
    }

    pub fn field_names(&self, kind: FieldKind) -> Vec<&str> {
        match kind {
            FieldKind::Parameter => self.parameters.keys().map(String::as_str).collect(),
            FieldKind::Column => self.columns.keys().map(String::as_str).collect(),
            FieldKind::Array => self.arrays.keys().map(String::as_str).collect(),
        }
    }

    pub fn field_count(&self, kind: FieldKind) -> usize {
        match kind {
            FieldKind::Parameter => self.parameters.len(),
            FieldKind::Column => self.columns.len(),
            FieldKind::Array => self.arrays.len(),
        }
    }

    pub fn field_index(&self, kind: FieldKind, name: &str) -> Option<usize> {
        match kind {
            FieldKind::Parameter => self.parameters.get_index_of(name),
            FieldKind::Column => self.columns.get_index_of(name),
            FieldKind::Array => self.arrays.get_index_of(name),
        }
    }

    pub fn field_info(&self, kind: FieldKind, index: usize) -> Option<&FieldInfo> {
        match kind {
            FieldKind::Parameter => self.parameters.get_index(index).map(|(_, d)| &d.info),
            FieldKind::Column => self.columns.get_index(index).map(|(_, d)| &d.info),
            FieldKind::Array => self.arrays.get_index(index).map(|(_, d)| &d.info),
        }
    }

    /// Remove one field, keeping the order of the rest
    pub fn delete_field(&mut self, kind: FieldKind, name: &str) -> Result<()> {
        let removed = match kind {
            FieldKind::Parameter => self.parameters.shift_remove(name).is_some(),
            FieldKind::Column => self.columns.shift_remove(name).is_some(),
            FieldKind::Array => self.arrays.shift_remove(name).is_some(),
        };
        if removed {
            Ok(())
        } else {
            Err(SddsError::not_found(format!("{} {}", kind, name)))
        }
    }

    /// Drop every parameter's constant value, keeping the definitions
    pub fn delete_fixed_values(&mut self) {
        for def in self.parameters.values_mut() {
            def.fixed_value = None;
        }
    }

    /// Replace every definition with the source's
    pub fn copy_from(&mut self, source: &Layout) {
        let data_mode = self.data_mode;
        *self = source.clone();
        self.data_mode = data_mode;
    }

    /// Add the source's definitions that the target lacks
    pub fn append_from(&mut self, source: &Layout) -> Result<()> {
        transfer_all(&mut self.parameters, &source.parameters, TransferMode::KeepTarget)?;
        transfer_all(&mut self.arrays, &source.arrays, TransferMode::KeepTarget)?;
        transfer_all(&mut self.columns, &source.columns, TransferMode::KeepTarget)?;
        if self.description.is_none() {
            self.description = source.description.clone();
        }
        if self.contents.is_none() {
            self.contents = source.contents.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, tag: TypeTag) -> ColumnDefinition {
        ColumnDefinition::new(FieldInfo::new(name, tag))
    }

    #[test]
    fn test_name_validity() {
        assert!(is_valid_name("x"));
        assert!(is_valid_name("Beam.Current[1]"));
        assert!(is_valid_name(":tag"));
        assert!(!is_valid_name("1abc"));
        assert!(!is_valid_name("two words"));
        assert!(!is_valid_name(""));
        assert!(NamePolicy::AllowAny.is_valid("two words"));
        assert!(!NamePolicy::AllowAny.is_valid(""));
    }

    #[test]
    fn test_blank_predicates() {
        assert!(has_whitespace("a b"));
        assert!(!has_whitespace("ab"));
        assert!(string_is_blank(""));
        assert!(string_is_blank(" \t"));
        assert!(!string_is_blank(" x "));
    }

    #[test]
    fn test_duplicate_definition_keeps_original() {
        let mut layout = Layout::new();
        let def = column("x", TypeTag::Float64).with_field_length(4);
        assert_eq!(
            layout.define_column(def, NamePolicy::Strict, DefinitionMode::Normal).unwrap(),
            0
        );
        let err = layout
            .define_column(column("x", TypeTag::String), NamePolicy::Strict, DefinitionMode::Normal)
            .unwrap_err();
        assert!(matches!(err, SddsError::Schema(_)));
        assert_eq!(layout.columns["x"].info.type_tag, TypeTag::Float64);
        assert_eq!(layout.columns["x"].field_length, 4);
    }

    #[test]
    fn test_empty_attributes_normalized() {
        let mut layout = Layout::new();
        let info = FieldInfo::new("p", TypeTag::Int32)
            .with_units(Some(""))
            .with_symbol(Some("P"));
        layout
            .define_parameter(ParameterDefinition::new(info), NamePolicy::Strict, DefinitionMode::Normal)
            .unwrap();
        assert_eq!(layout.parameters["p"].info.units, None);
        assert_eq!(layout.parameters["p"].info.symbol.as_deref(), Some("P"));
    }

    #[test]
    fn test_write_only_skips_name_check() {
        let mut layout = Layout::new();
        assert!(layout
            .define_column(column("1st", TypeTag::Int16), NamePolicy::Strict, DefinitionMode::Normal)
            .is_err());
        assert!(layout
            .define_column(column("1st", TypeTag::Int16), NamePolicy::Strict, DefinitionMode::WriteOnly)
            .is_ok());
    }

    #[test]
    fn test_invalid_fixed_value() {
        let mut layout = Layout::new();
        let def = ParameterDefinition::new(FieldInfo::new("n", TypeTag::Int32))
            .with_fixed_value(Some("abc"));
        assert!(layout
            .define_parameter(def, NamePolicy::Strict, DefinitionMode::Normal)
            .is_err());
        assert!(layout.parameters.is_empty());
    }

    #[test]
    fn test_unusable_format_string() {
        let mut layout = Layout::new();
        let info = FieldInfo::new("x", TypeTag::Float64)
            .with_format_string(Some("%99999999999999999999f"));
        let err = layout
            .define_column(ColumnDefinition::new(info), NamePolicy::Strict, DefinitionMode::Normal)
            .unwrap_err();
        assert!(matches!(err, SddsError::Schema(_)));
        assert!(layout.columns.is_empty());
    }

    #[test]
    fn test_transfer_modes() {
        let mut source = FieldMap::default();
        source.insert("a".to_string(), column("a", TypeTag::Int32));
        source.insert("b".to_string(), column("b", TypeTag::String));

        let mut target = FieldMap::default();
        target.insert("a".to_string(), column("a", TypeTag::Int32).with_field_length(9));

        let mut t = target.clone();
        assert!(transfer_all(&mut t, &source, TransferMode::ErrorOnConflict).is_err());
        assert_eq!(t.len(), 1);

        let mut t = target.clone();
        transfer_all(&mut t, &source, TransferMode::KeepTarget).unwrap();
        assert_eq!(t["a"].field_length, 9);
        assert_eq!(t.len(), 2);

        let mut t = target.clone();
        transfer_all(&mut t, &source, TransferMode::Overwrite).unwrap();
        assert_eq!(t["a"].field_length, 0);

        let mut t = FieldMap::default();
        t.insert("b".to_string(), column("b", TypeTag::Float64));
        assert!(transfer_all(&mut t, &source, TransferMode::MergeMissing).is_err());
    }

    #[test]
    fn test_copy_layout_order() {
        let mut source = Layout::new();
        source
            .define_column(column("A", TypeTag::Int32), NamePolicy::Strict, DefinitionMode::Normal)
            .unwrap();
        source
            .define_column(column("B", TypeTag::String), NamePolicy::Strict, DefinitionMode::Normal)
            .unwrap();
        let mut target = Layout::new();
        target.copy_from(&source);
        assert_eq!(target.field_names(FieldKind::Column), vec!["A", "B"]);
        assert_eq!(target.columns["B"].info.type_tag, TypeTag::String);
    }
}
