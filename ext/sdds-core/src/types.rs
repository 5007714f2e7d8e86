use serde::{Deserialize, Serialize};

/// The ten scalar kinds a field can be declared with.
///
/// Numeric codes follow the dataset format's on-disk type numbering so that
/// callers which exchange raw codes keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Float64,
    Float32,
    Int64,
    UInt64,
    Int32,
    UInt32,
    Int16,
    UInt16,
    String,
    Char,
}

impl TypeTag {
    pub const ALL: [TypeTag; 10] = [
        TypeTag::Float64,
        TypeTag::Float32,
        TypeTag::Int64,
        TypeTag::UInt64,
        TypeTag::Int32,
        TypeTag::UInt32,
        TypeTag::Int16,
        TypeTag::UInt16,
        TypeTag::String,
        TypeTag::Char,
    ];

    /// Numeric code used by the file format and the handle API
    pub fn code(self) -> i32 {
        match self {
            TypeTag::Float64 => 2,
            TypeTag::Float32 => 3,
            TypeTag::Int64 => 4,
            TypeTag::UInt64 => 5,
            TypeTag::Int32 => 6,
            TypeTag::UInt32 => 7,
            TypeTag::Int16 => 8,
            TypeTag::UInt16 => 9,
            TypeTag::String => 10,
            TypeTag::Char => 11,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        TypeTag::ALL.into_iter().find(|tag| tag.code() == code)
    }

    /// Name written in headers (`type=...`)
    pub fn type_name(self) -> &'static str {
        match self {
            TypeTag::Float64 => "double",
            TypeTag::Float32 => "float",
            TypeTag::Int64 => "long64",
            TypeTag::UInt64 => "ulong64",
            TypeTag::Int32 => "long",
            TypeTag::UInt32 => "ulong",
            TypeTag::Int16 => "short",
            TypeTag::UInt16 => "ushort",
            TypeTag::String => "string",
            TypeTag::Char => "character",
        }
    }

    /// Inverse of [`TypeTag::type_name`]. Width-explicit aliases are accepted too.
    pub fn from_name(name: &str) -> Option<Self> {
        let tag = match name.trim().to_ascii_lowercase().as_str() {
            "double" | "real64" | "float64" => TypeTag::Float64,
            "float" | "real32" | "float32" => TypeTag::Float32,
            "long64" | "int64" => TypeTag::Int64,
            "ulong64" | "uint64" => TypeTag::UInt64,
            "long" | "int32" => TypeTag::Int32,
            "ulong" | "uint32" => TypeTag::UInt32,
            "short" | "int16" => TypeTag::Int16,
            "ushort" | "uint16" => TypeTag::UInt16,
            "string" => TypeTag::String,
            "character" | "char" => TypeTag::Char,
            _ => return None,
        };
        Some(tag)
    }

    /// Byte width of one native element. Strings report the width of a slot
    /// holding one owned string reference.
    pub fn size(self) -> usize {
        match self {
            TypeTag::Int16 | TypeTag::UInt16 => 2,
            TypeTag::Int32 | TypeTag::UInt32 | TypeTag::Float32 => 4,
            TypeTag::Int64 | TypeTag::UInt64 | TypeTag::Float64 => 8,
            TypeTag::Char => 1,
            TypeTag::String => std::mem::size_of::<usize>(),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeTag::Int16
                | TypeTag::UInt16
                | TypeTag::Int32
                | TypeTag::UInt32
                | TypeTag::Int64
                | TypeTag::UInt64
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, TypeTag::Float32 | TypeTag::Float64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_floating()
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Encoding of page bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataMode {
    #[default]
    Binary,
    Ascii,
}

impl DataMode {
    pub fn code(self) -> i32 {
        match self {
            DataMode::Binary => 1,
            DataMode::Ascii => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(DataMode::Binary),
            2 => Some(DataMode::Ascii),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataMode::Binary => "binary",
            DataMode::Ascii => "ascii",
        }
    }
}

/// The three kinds of field a layout holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Parameter,
    Column,
    Array,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Parameter => "parameter",
            FieldKind::Column => "column",
            FieldKind::Array => "array",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
