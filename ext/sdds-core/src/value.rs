use crate::{SddsError, Result, TypeTag};
use num::cast::AsPrimitive;
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// One datum in the native width of its type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeValue {
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    Char(u8),
    String(Arc<str>),
}

impl NativeValue {
    /// Zero value for a tag (empty string for `string`)
    pub fn default_for(tag: TypeTag) -> Self {
        match tag {
            TypeTag::Int16 => NativeValue::Int16(0),
            TypeTag::UInt16 => NativeValue::UInt16(0),
            TypeTag::Int32 => NativeValue::Int32(0),
            TypeTag::UInt32 => NativeValue::UInt32(0),
            TypeTag::Int64 => NativeValue::Int64(0),
            TypeTag::UInt64 => NativeValue::UInt64(0),
            TypeTag::Float32 => NativeValue::Float32(OrderedFloat(0.0)),
            TypeTag::Float64 => NativeValue::Float64(OrderedFloat(0.0)),
            TypeTag::Char => NativeValue::Char(0),
            TypeTag::String => NativeValue::String(Arc::from("")),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            NativeValue::Int16(_) => TypeTag::Int16,
            NativeValue::UInt16(_) => TypeTag::UInt16,
            NativeValue::Int32(_) => TypeTag::Int32,
            NativeValue::UInt32(_) => TypeTag::UInt32,
            NativeValue::Int64(_) => TypeTag::Int64,
            NativeValue::UInt64(_) => TypeTag::UInt64,
            NativeValue::Float32(_) => TypeTag::Float32,
            NativeValue::Float64(_) => TypeTag::Float64,
            NativeValue::Char(_) => TypeTag::Char,
            NativeValue::String(_) => TypeTag::String,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_tag().type_name()
    }

    /// Wrap an integer into the width of `tag`. Out-of-range input is
    /// truncated to the low bits, the same as an `as` cast.
    pub fn from_i128(tag: TypeTag, v: i128) -> Result<Self> {
        Ok(match tag {
            TypeTag::Int16 => NativeValue::Int16(v.as_()),
            TypeTag::UInt16 => NativeValue::UInt16(v.as_()),
            TypeTag::Int32 => NativeValue::Int32(v.as_()),
            TypeTag::UInt32 => NativeValue::UInt32(v.as_()),
            TypeTag::Int64 => NativeValue::Int64(v.as_()),
            TypeTag::UInt64 => NativeValue::UInt64(v.as_()),
            TypeTag::Float32 => NativeValue::Float32(OrderedFloat(v.as_())),
            TypeTag::Float64 => NativeValue::Float64(OrderedFloat(v.as_())),
            TypeTag::Char => NativeValue::Char(v.as_()),
            TypeTag::String => {
                return Err(SddsError::type_mismatch(
                    "cannot store an integer in a string field",
                ))
            }
        })
    }

    /// Convert a float into the width of `tag`
    pub fn from_f64(tag: TypeTag, v: f64) -> Result<Self> {
        Ok(match tag {
            TypeTag::Int16 => NativeValue::Int16(v.as_()),
            TypeTag::UInt16 => NativeValue::UInt16(v.as_()),
            TypeTag::Int32 => NativeValue::Int32(v.as_()),
            TypeTag::UInt32 => NativeValue::UInt32(v.as_()),
            TypeTag::Int64 => NativeValue::Int64(v.as_()),
            TypeTag::UInt64 => NativeValue::UInt64(v.as_()),
            TypeTag::Float32 => NativeValue::Float32(OrderedFloat(v.as_())),
            TypeTag::Float64 => NativeValue::Float64(OrderedFloat(v)),
            TypeTag::Char | TypeTag::String => {
                return Err(SddsError::type_mismatch(format!(
                    "cannot store a float in a {} field",
                    tag
                )))
            }
        })
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            NativeValue::Int16(v) => Some(v.as_()),
            NativeValue::UInt16(v) => Some(v.as_()),
            NativeValue::Int32(v) => Some(v.as_()),
            NativeValue::UInt32(v) => Some(v.as_()),
            NativeValue::Int64(v) => Some(v.as_()),
            NativeValue::UInt64(v) => Some(v.as_()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Float32(v) => Some(v.0.as_()),
            NativeValue::Float64(v) => Some(v.0),
            other => other.as_i128().map(|v| v.as_()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert between tags of the same family. Numeric values convert to
    /// any numeric tag; strings and characters only to themselves.
    pub fn convert(&self, tag: TypeTag) -> Result<Self> {
        if self.type_tag() == tag {
            return Ok(self.clone());
        }
        if tag.is_numeric() {
            if let Some(v) = self.as_i128() {
                return NativeValue::from_i128(tag, v);
            }
            if let Some(v) = self.as_f64() {
                return NativeValue::from_f64(tag, v);
            }
        }
        Err(SddsError::type_mismatch(format!(
            "cannot convert {} to {}",
            self.type_name(),
            tag
        )))
    }

    /// Multiply a numeric value, keeping its tag
    pub fn scaled(&self, factor: f64) -> Result<Self> {
        match self.as_f64() {
            Some(v) => NativeValue::from_f64(self.type_tag(), v * factor),
            None => Err(SddsError::type_mismatch(format!(
                "cannot apply a factor to a {} value",
                self.type_name()
            ))),
        }
    }
}

/// A homogeneous buffer of native values, one variant per type tag
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Char(Vec<u8>),
    String(Vec<Arc<str>>),
}

// Runs the same body against whichever typed vector is inside.
macro_rules! each_buffer {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ColumnData::Int16($v) => $body,
            ColumnData::UInt16($v) => $body,
            ColumnData::Int32($v) => $body,
            ColumnData::UInt32($v) => $body,
            ColumnData::Int64($v) => $body,
            ColumnData::UInt64($v) => $body,
            ColumnData::Float32($v) => $body,
            ColumnData::Float64($v) => $body,
            ColumnData::Char($v) => $body,
            ColumnData::String($v) => $body,
        }
    };
}

macro_rules! each_numeric {
    ($data:expr, $v:ident => $body:expr, $other:pat => $fallback:expr) => {
        match $data {
            ColumnData::Int16($v) => $body,
            ColumnData::UInt16($v) => $body,
            ColumnData::Int32($v) => $body,
            ColumnData::UInt32($v) => $body,
            ColumnData::Int64($v) => $body,
            ColumnData::UInt64($v) => $body,
            ColumnData::Float32($v) => $body,
            ColumnData::Float64($v) => $body,
            $other => $fallback,
        }
    };
}

fn scale_in_place<T>(values: &mut [T], factor: f64)
where
    T: AsPrimitive<f64>,
    f64: AsPrimitive<T>,
{
    for v in values.iter_mut() {
        let scaled: f64 = v.as_() * factor;
        *v = scaled.as_();
    }
}

impl ColumnData {
    /// A buffer of `len` zero values
    pub fn new(tag: TypeTag, len: usize) -> Self {
        match tag {
            TypeTag::Int16 => ColumnData::Int16(vec![0; len]),
            TypeTag::UInt16 => ColumnData::UInt16(vec![0; len]),
            TypeTag::Int32 => ColumnData::Int32(vec![0; len]),
            TypeTag::UInt32 => ColumnData::UInt32(vec![0; len]),
            TypeTag::Int64 => ColumnData::Int64(vec![0; len]),
            TypeTag::UInt64 => ColumnData::UInt64(vec![0; len]),
            TypeTag::Float32 => ColumnData::Float32(vec![0.0; len]),
            TypeTag::Float64 => ColumnData::Float64(vec![0.0; len]),
            TypeTag::Char => ColumnData::Char(vec![0; len]),
            TypeTag::String => ColumnData::String(vec![Arc::from(""); len]),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            ColumnData::Int16(_) => TypeTag::Int16,
            ColumnData::UInt16(_) => TypeTag::UInt16,
            ColumnData::Int32(_) => TypeTag::Int32,
            ColumnData::UInt32(_) => TypeTag::UInt32,
            ColumnData::Int64(_) => TypeTag::Int64,
            ColumnData::UInt64(_) => TypeTag::UInt64,
            ColumnData::Float32(_) => TypeTag::Float32,
            ColumnData::Float64(_) => TypeTag::Float64,
            ColumnData::Char(_) => TypeTag::Char,
            ColumnData::String(_) => TypeTag::String,
        }
    }

    pub fn len(&self) -> usize {
        each_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow with zero values or shrink to `len`
    pub fn resize(&mut self, len: usize) {
        match self {
            ColumnData::Int16(v) => v.resize(len, 0),
            ColumnData::UInt16(v) => v.resize(len, 0),
            ColumnData::Int32(v) => v.resize(len, 0),
            ColumnData::UInt32(v) => v.resize(len, 0),
            ColumnData::Int64(v) => v.resize(len, 0),
            ColumnData::UInt64(v) => v.resize(len, 0),
            ColumnData::Float32(v) => v.resize(len, 0.0),
            ColumnData::Float64(v) => v.resize(len, 0.0),
            ColumnData::Char(v) => v.resize(len, 0),
            ColumnData::String(v) => v.resize(len, Arc::from("")),
        }
    }

    pub fn truncate(&mut self, len: usize) {
        each_buffer!(self, v => v.truncate(len))
    }

    pub fn get(&self, index: usize) -> Option<NativeValue> {
        match self {
            ColumnData::Int16(v) => v.get(index).map(|x| NativeValue::Int16(*x)),
            ColumnData::UInt16(v) => v.get(index).map(|x| NativeValue::UInt16(*x)),
            ColumnData::Int32(v) => v.get(index).map(|x| NativeValue::Int32(*x)),
            ColumnData::UInt32(v) => v.get(index).map(|x| NativeValue::UInt32(*x)),
            ColumnData::Int64(v) => v.get(index).map(|x| NativeValue::Int64(*x)),
            ColumnData::UInt64(v) => v.get(index).map(|x| NativeValue::UInt64(*x)),
            ColumnData::Float32(v) => v.get(index).map(|x| NativeValue::Float32(OrderedFloat(*x))),
            ColumnData::Float64(v) => v.get(index).map(|x| NativeValue::Float64(OrderedFloat(*x))),
            ColumnData::Char(v) => v.get(index).map(|x| NativeValue::Char(*x)),
            ColumnData::String(v) => v.get(index).map(|x| NativeValue::String(x.clone())),
        }
    }

    /// Store one value. The value must already carry this buffer's tag.
    pub fn set(&mut self, index: usize, value: NativeValue) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(SddsError::invalid_argument(format!(
                "index {} out of range for buffer of {} elements",
                index, len
            )));
        }
        match (self, value) {
            (ColumnData::Int16(v), NativeValue::Int16(x)) => v[index] = x,
            (ColumnData::UInt16(v), NativeValue::UInt16(x)) => v[index] = x,
            (ColumnData::Int32(v), NativeValue::Int32(x)) => v[index] = x,
            (ColumnData::UInt32(v), NativeValue::UInt32(x)) => v[index] = x,
            (ColumnData::Int64(v), NativeValue::Int64(x)) => v[index] = x,
            (ColumnData::UInt64(v), NativeValue::UInt64(x)) => v[index] = x,
            (ColumnData::Float32(v), NativeValue::Float32(x)) => v[index] = x.0,
            (ColumnData::Float64(v), NativeValue::Float64(x)) => v[index] = x.0,
            (ColumnData::Char(v), NativeValue::Char(x)) => v[index] = x,
            (ColumnData::String(v), NativeValue::String(x)) => v[index] = x,
            (data, value) => {
                return Err(SddsError::type_mismatch(format!(
                    "cannot store {} in a {} buffer",
                    value.type_name(),
                    data.type_tag()
                )))
            }
        }
        Ok(())
    }

    pub fn push(&mut self, value: NativeValue) -> Result<()> {
        let index = self.len();
        self.resize(index + 1);
        self.set(index, value).inspect_err(|_| self.truncate(index))
    }

    /// Build a buffer from values that all carry `tag`
    pub fn from_values(tag: TypeTag, values: &[NativeValue]) -> Result<Self> {
        let mut data = ColumnData::new(tag, values.len());
        for (i, value) in values.iter().enumerate() {
            data.set(i, value.clone())?;
        }
        Ok(data)
    }

    pub fn to_values(&self) -> Vec<NativeValue> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    /// Gather the given indices into a new buffer, in order
    pub fn select(&self, indices: &[usize]) -> Self {
        each_buffer!(self, v => {
            let picked = indices
                .iter()
                .filter_map(|&i| v.get(i).cloned())
                .collect::<Vec<_>>();
            ColumnData::from_typed(picked)
        })
    }

    /// Keep only elements whose mask entry is true. Missing entries count as true.
    pub fn retain_mask(&mut self, mask: &[bool]) {
        each_buffer!(self, v => {
            let mut i = 0;
            v.retain(|_| {
                let keep = mask.get(i).copied().unwrap_or(true);
                i += 1;
                keep
            });
        })
    }

    /// Append every element of `other`, which must carry the same tag
    pub fn extend_from(&mut self, other: &ColumnData) -> Result<()> {
        match (self, other) {
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a.extend_from_slice(b),
            (ColumnData::UInt16(a), ColumnData::UInt16(b)) => a.extend_from_slice(b),
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a.extend_from_slice(b),
            (ColumnData::UInt32(a), ColumnData::UInt32(b)) => a.extend_from_slice(b),
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend_from_slice(b),
            (ColumnData::UInt64(a), ColumnData::UInt64(b)) => a.extend_from_slice(b),
            (ColumnData::Float32(a), ColumnData::Float32(b)) => a.extend_from_slice(b),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend_from_slice(b),
            (ColumnData::Char(a), ColumnData::Char(b)) => a.extend_from_slice(b),
            (ColumnData::String(a), ColumnData::String(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(SddsError::type_mismatch(format!(
                    "cannot append {} data to a {} buffer",
                    b.type_tag(),
                    a.type_tag()
                )))
            }
        }
        Ok(())
    }

    /// Multiply every element by `factor`. Fails without touching the data
    /// when the buffer is not numeric.
    pub fn apply_factor(&mut self, factor: f64) -> Result<()> {
        each_numeric!(self, v => {
            scale_in_place(v, factor);
            Ok(())
        }, other => Err(SddsError::type_mismatch(format!(
            "cannot apply a factor to {} data",
            other.type_tag()
        ))))
    }
}

/// Build a buffer from an already-typed vector
pub trait FromTyped<T> {
    fn from_typed(values: Vec<T>) -> Self;
}

macro_rules! impl_from_typed {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromTyped<$ty> for ColumnData {
                fn from_typed(values: Vec<$ty>) -> Self {
                    ColumnData::$variant(values)
                }
            }
        )*
    };
}

impl_from_typed!(
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    u8 => Char,
    Arc<str> => String,
);

/// A multi-dimensional array value: a flat buffer plus its shape
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub dimensions: Vec<usize>,
    pub data: ColumnData,
}

impl ArrayValue {
    /// A zero-filled array of the given shape
    pub fn new(tag: TypeTag, dimensions: Vec<usize>) -> Self {
        let count = dimensions.iter().product();
        Self {
            data: ColumnData::new(tag, count),
            dimensions,
        }
    }

    /// Pair data with a shape, checking that the element count agrees
    pub fn with_data(dimensions: Vec<usize>, data: ColumnData) -> Result<Self> {
        let count: usize = dimensions.iter().product();
        if count != data.len() {
            return Err(SddsError::invalid_argument(format!(
                "array shape {:?} needs {} elements, got {}",
                dimensions,
                count,
                data.len()
            )));
        }
        Ok(Self { dimensions, data })
    }

    pub fn element_count(&self) -> usize {
        self.data.len()
    }

    pub fn type_tag(&self) -> TypeTag {
        self.data.type_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_integers() {
        assert_eq!(
            NativeValue::from_i128(TypeTag::UInt16, -1).unwrap(),
            NativeValue::UInt16(u16::MAX)
        );
        assert_eq!(
            NativeValue::from_i128(TypeTag::Int16, 70000).unwrap(),
            NativeValue::Int16(70000_i128 as i16)
        );
        assert!(NativeValue::from_i128(TypeTag::String, 1).is_err());
    }

    #[test]
    fn test_convert_numeric() {
        let v = NativeValue::Int32(7);
        assert_eq!(
            v.convert(TypeTag::Float64).unwrap(),
            NativeValue::Float64(OrderedFloat(7.0))
        );
        assert!(v.convert(TypeTag::String).is_err());
        let s = NativeValue::String(Arc::from("x"));
        assert!(s.convert(TypeTag::Int32).is_err());
    }

    #[test]
    fn test_buffer_set_get() {
        let mut data = ColumnData::new(TypeTag::Int32, 3);
        data.set(1, NativeValue::Int32(5)).unwrap();
        assert_eq!(data.get(1), Some(NativeValue::Int32(5)));
        assert!(data.set(1, NativeValue::Int16(5)).is_err());
        assert!(data.set(3, NativeValue::Int32(5)).is_err());
    }

    #[test]
    fn test_apply_factor() {
        let mut data = ColumnData::Float64(vec![1.0, 2.0, 3.0]);
        data.apply_factor(2.0).unwrap();
        assert_eq!(data, ColumnData::Float64(vec![2.0, 4.0, 6.0]));

        let mut text = ColumnData::String(vec![Arc::from("a")]);
        assert!(text.apply_factor(2.0).is_err());
        assert_eq!(text, ColumnData::String(vec![Arc::from("a")]));
    }

    #[test]
    fn test_select_and_mask() {
        let data = ColumnData::Int64((0..10).collect());
        assert_eq!(
            data.select(&[0, 2, 4]),
            ColumnData::Int64(vec![0, 2, 4])
        );

        let mut data = ColumnData::Char(vec![b'a', b'b', b'c']);
        data.retain_mask(&[true, false, true]);
        assert_eq!(data, ColumnData::Char(vec![b'a', b'c']));
    }

    #[test]
    fn test_array_shape_check() {
        let data = ColumnData::Float32(vec![0.0; 6]);
        assert!(ArrayValue::with_data(vec![2, 3], data.clone()).is_ok());
        assert!(ArrayValue::with_data(vec![2, 2], data).is_err());
    }
}
