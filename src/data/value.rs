//! Tagged union for heterogeneous map values.
//!
//! `String -> Object` maps carry no static element type, so every entry's
//! value is preceded by a one-byte [`TypeTag`] that tells the decoder which
//! codec to dispatch to. Every other container shape in the system has
//! static element types and needs no tag.

use indexmap::IndexMap;

use crate::data::{BitSet, ByteBuffer, FloatBuffer, IntBuffer, ShortBuffer};
use crate::savable::SavableRef;

/// Wire code identifying how a heterogeneous value is encoded.
///
/// Written as a signed byte under the `type` attribute. The
/// default/absent code is `-1` ([`TypeTag::Unhandled`]), so unhandled
/// entries carry no `type` attribute at all and decode to no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum TypeTag {
    Unhandled = -1,
    BitSet = 0,
    Bool = 1,
    BoolArray = 2,
    BoolArray2 = 3,
    Byte = 4,
    ByteArray = 5,
    ByteArray2 = 6,
    ByteBuffer = 7,
    Double = 8,
    DoubleArray = 9,
    DoubleArray2 = 10,
    Float = 11,
    FloatArray = 12,
    FloatArray2 = 13,
    FloatBuffer = 14,
    Int = 15,
    IntArray = 16,
    IntArray2 = 17,
    IntBuffer = 18,
    Long = 19,
    LongArray = 20,
    LongArray2 = 21,
    Short = 22,
    ShortArray = 23,
    ShortArray2 = 24,
    ShortBuffer = 25,
    Str = 26,
    StrArray = 27,
    StrArray2 = 28,
    Savable = 29,
    SavableArray = 30,
    SavableArray2 = 31,
    SavableList = 32,
    SavableMap = 33,
    StringSavableMap = 34,
    StringObjectMap = 35,
    FloatBufferList = 36,
    ByteBufferList = 37,
}

impl TypeTag {
    /// The wire byte for this tag.
    pub fn code(self) -> i8 {
        self as i8
    }

    /// Decode a wire byte. Unknown codes map to `None`, which the reader
    /// treats like an unhandled value rather than an error.
    pub fn from_code(code: i8) -> Option<Self> {
        Some(match code {
            -1 => TypeTag::Unhandled,
            0 => TypeTag::BitSet,
            1 => TypeTag::Bool,
            2 => TypeTag::BoolArray,
            3 => TypeTag::BoolArray2,
            4 => TypeTag::Byte,
            5 => TypeTag::ByteArray,
            6 => TypeTag::ByteArray2,
            7 => TypeTag::ByteBuffer,
            8 => TypeTag::Double,
            9 => TypeTag::DoubleArray,
            10 => TypeTag::DoubleArray2,
            11 => TypeTag::Float,
            12 => TypeTag::FloatArray,
            13 => TypeTag::FloatArray2,
            14 => TypeTag::FloatBuffer,
            15 => TypeTag::Int,
            16 => TypeTag::IntArray,
            17 => TypeTag::IntArray2,
            18 => TypeTag::IntBuffer,
            19 => TypeTag::Long,
            20 => TypeTag::LongArray,
            21 => TypeTag::LongArray2,
            22 => TypeTag::Short,
            23 => TypeTag::ShortArray,
            24 => TypeTag::ShortArray2,
            25 => TypeTag::ShortBuffer,
            26 => TypeTag::Str,
            27 => TypeTag::StrArray,
            28 => TypeTag::StrArray2,
            29 => TypeTag::Savable,
            30 => TypeTag::SavableArray,
            31 => TypeTag::SavableArray2,
            32 => TypeTag::SavableList,
            33 => TypeTag::SavableMap,
            34 => TypeTag::StringSavableMap,
            35 => TypeTag::StringObjectMap,
            36 => TypeTag::FloatBufferList,
            37 => TypeTag::ByteBufferList,
            _ => return None,
        })
    }
}

/// A heterogeneous map value: exactly one variant per [`TypeTag`].
#[derive(Clone)]
pub enum Value {
    BitSet(BitSet),
    Bool(bool),
    BoolArray(Vec<bool>),
    BoolArray2(Vec<Vec<bool>>),
    Byte(u8),
    ByteArray(Vec<u8>),
    ByteArray2(Vec<Vec<u8>>),
    ByteBuffer(ByteBuffer),
    Double(f64),
    DoubleArray(Vec<f64>),
    DoubleArray2(Vec<Vec<f64>>),
    Float(f32),
    FloatArray(Vec<f32>),
    FloatArray2(Vec<Vec<f32>>),
    FloatBuffer(FloatBuffer),
    Int(i32),
    IntArray(Vec<i32>),
    IntArray2(Vec<Vec<i32>>),
    IntBuffer(IntBuffer),
    Long(i64),
    LongArray(Vec<i64>),
    LongArray2(Vec<Vec<i64>>),
    Short(i16),
    ShortArray(Vec<i16>),
    ShortArray2(Vec<Vec<i16>>),
    ShortBuffer(ShortBuffer),
    Str(String),
    StrArray(Vec<String>),
    StrArray2(Vec<Vec<String>>),
    Savable(SavableRef),
    SavableArray(Vec<Option<SavableRef>>),
    SavableArray2(Vec<Vec<Option<SavableRef>>>),
    SavableList(Vec<Option<SavableRef>>),
    SavableMap(Vec<(SavableRef, SavableRef)>),
    StringSavableMap(IndexMap<String, SavableRef>),
    StringObjectMap(IndexMap<String, Value>),
    FloatBufferList(Vec<FloatBuffer>),
    ByteBufferList(Vec<ByteBuffer>),
}

// `dyn Savable` carries no `Debug` bound, so values print as their tag.
impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value({:?})", self.tag())
    }
}

impl Value {
    /// The wire tag for this value.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::BitSet(_) => TypeTag::BitSet,
            Value::Bool(_) => TypeTag::Bool,
            Value::BoolArray(_) => TypeTag::BoolArray,
            Value::BoolArray2(_) => TypeTag::BoolArray2,
            Value::Byte(_) => TypeTag::Byte,
            Value::ByteArray(_) => TypeTag::ByteArray,
            Value::ByteArray2(_) => TypeTag::ByteArray2,
            Value::ByteBuffer(_) => TypeTag::ByteBuffer,
            Value::Double(_) => TypeTag::Double,
            Value::DoubleArray(_) => TypeTag::DoubleArray,
            Value::DoubleArray2(_) => TypeTag::DoubleArray2,
            Value::Float(_) => TypeTag::Float,
            Value::FloatArray(_) => TypeTag::FloatArray,
            Value::FloatArray2(_) => TypeTag::FloatArray2,
            Value::FloatBuffer(_) => TypeTag::FloatBuffer,
            Value::Int(_) => TypeTag::Int,
            Value::IntArray(_) => TypeTag::IntArray,
            Value::IntArray2(_) => TypeTag::IntArray2,
            Value::IntBuffer(_) => TypeTag::IntBuffer,
            Value::Long(_) => TypeTag::Long,
            Value::LongArray(_) => TypeTag::LongArray,
            Value::LongArray2(_) => TypeTag::LongArray2,
            Value::Short(_) => TypeTag::Short,
            Value::ShortArray(_) => TypeTag::ShortArray,
            Value::ShortArray2(_) => TypeTag::ShortArray2,
            Value::ShortBuffer(_) => TypeTag::ShortBuffer,
            Value::Str(_) => TypeTag::Str,
            Value::StrArray(_) => TypeTag::StrArray,
            Value::StrArray2(_) => TypeTag::StrArray2,
            Value::Savable(_) => TypeTag::Savable,
            Value::SavableArray(_) => TypeTag::SavableArray,
            Value::SavableArray2(_) => TypeTag::SavableArray2,
            Value::SavableList(_) => TypeTag::SavableList,
            Value::SavableMap(_) => TypeTag::SavableMap,
            Value::StringSavableMap(_) => TypeTag::StringSavableMap,
            Value::StringObjectMap(_) => TypeTag::StringObjectMap,
            Value::FloatBufferList(_) => TypeTag::FloatBufferList,
            Value::ByteBufferList(_) => TypeTag::ByteBufferList,
        }
    }

    /// The contained `i32`, if this is an [`Value::Int`].
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained string slice, if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The contained float slice, if this is a [`Value::FloatArray`].
    pub fn as_float_array(&self) -> Option<&[f32]> {
        match self {
            Value::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    /// The contained savable handle, if this is a [`Value::Savable`].
    pub fn as_savable(&self) -> Option<&SavableRef> {
        match self {
            Value::Savable(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_codes_round_trip() {
        for code in -1..40_i8 {
            if let Some(tag) = TypeTag::from_code(code) {
                assert_eq!(tag.code(), code);
            }
        }
        assert_eq!(TypeTag::from_code(99), None);
        assert_eq!(TypeTag::from_code(-2), None);
    }

    #[test]
    fn test_value_tags() {
        assert_eq!(Value::Int(4).tag(), TypeTag::Int);
        assert_eq!(Value::Str("x".into()).tag(), TypeTag::Str);
        assert_eq!(Value::FloatArray(vec![1.0]).tag(), TypeTag::FloatArray);
        assert_eq!(
            Value::FloatBuffer(FloatBuffer::from_vec(vec![1.0])).tag(),
            TypeTag::FloatBuffer
        );
    }
}
