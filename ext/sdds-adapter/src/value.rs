use ordered_float::OrderedFloat;

/// A value as seen by callers of the handle API
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DynValue {
    None,
    Int(i128),
    Float(OrderedFloat<f64>),
    Text(String),
    List(Vec<DynValue>),
}

impl DynValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            DynValue::None => "none",
            DynValue::Int(_) => "int",
            DynValue::Float(_) => "float",
            DynValue::Text(_) => "text",
            DynValue::List(_) => "list",
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            DynValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats here
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DynValue::Int(v) => Some(*v as f64),
            DynValue::Float(v) => Some(v.0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DynValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DynValue]> {
        match self {
            DynValue::List(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for DynValue {
                fn from(v: $ty) -> Self {
                    DynValue::Int(v as i128)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, i128);

impl From<f64> for DynValue {
    fn from(v: f64) -> Self {
        DynValue::Float(OrderedFloat(v))
    }
}

impl From<f32> for DynValue {
    fn from(v: f32) -> Self {
        DynValue::Float(OrderedFloat(v as f64))
    }
}

impl From<&str> for DynValue {
    fn from(v: &str) -> Self {
        DynValue::Text(v.to_string())
    }
}

impl From<String> for DynValue {
    fn from(v: String) -> Self {
        DynValue::Text(v)
    }
}

impl<T: Into<DynValue>> From<Vec<T>> for DynValue {
    fn from(v: Vec<T>) -> Self {
        DynValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<DynValue>> From<Option<T>> for DynValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DynValue::None, Into::into)
    }
}

/// A field addressed by name or by position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    ByName(String),
    ByIndex(usize),
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::ByName(name) => write!(f, "{}", name),
            FieldRef::ByIndex(index) => write!(f, "#{}", index),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::ByName(name.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        FieldRef::ByName(name)
    }
}

impl From<&String> for FieldRef {
    fn from(name: &String) -> Self {
        FieldRef::ByName(name.clone())
    }
}

impl From<usize> for FieldRef {
    fn from(index: usize) -> Self {
        FieldRef::ByIndex(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(DynValue::from(3_i32), DynValue::Int(3));
        assert_eq!(DynValue::from(1.5), DynValue::Float(OrderedFloat(1.5)));
        assert_eq!(DynValue::from("a"), DynValue::Text("a".to_string()));
        assert_eq!(
            DynValue::from(vec![1_u8, 2]),
            DynValue::List(vec![DynValue::Int(1), DynValue::Int(2)])
        );
        assert_eq!(DynValue::from(None::<i32>), DynValue::None);
        assert_eq!(DynValue::Int(2).as_float(), Some(2.0));
        assert_eq!(DynValue::Text("x".into()).as_float(), None);
    }

    #[test]
    fn test_field_ref() {
        assert_eq!(FieldRef::from("x"), FieldRef::ByName("x".to_string()));
        assert_eq!(FieldRef::from(2_usize), FieldRef::ByIndex(2));
        assert_eq!(FieldRef::ByIndex(4).to_string(), "#4");
    }
}
