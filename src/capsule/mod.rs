//! # Capsules
//!
//! Capsules are the field-level codec surface that [`Savable`] objects
//! write into and read from. The traits here mirror each other: every
//! write entry point has a matching read entry point, and the pair must
//! round-trip exactly.
//!
//! ## Default-value elision
//!
//! The central space-saving rule of the wire format: a scalar equal to its
//! declared default is not written at all, and an absent attribute decodes
//! to the default the reader supplies. Both sides of a field must therefore
//! agree on the default.
//!
//! ## Cursor discipline
//!
//! Both capsule implementations keep a "current element" cursor. Every
//! operation that descends into a child element restores the cursor before
//! returning, so sibling reads and writes continue from the right place.
//!
//! [`Savable`]: crate::savable::Savable

mod input;
mod output;

use std::fmt::Display;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::data::{BitSet, ByteBuffer, FloatBuffer, IntBuffer, ShortBuffer, Value};
use crate::error::{ParseSource, Result, SaveError};
use crate::savable::SavableRef;

pub use input::XmlInputCapsule;
pub use output::XmlOutputCapsule;

// Wire-format vocabulary shared by both capsule implementations.
pub(crate) const ATTR_DATA: &str = "data";
pub(crate) const ATTR_SIZE: &str = "size";
pub(crate) const ATTR_SIZE_OUTER: &str = "size_outer";
pub(crate) const ATTR_SIZE_INNER: &str = "size_inner";
pub(crate) const ATTR_CLASS: &str = "class";
pub(crate) const ATTR_REF: &str = "ref";
pub(crate) const ATTR_REFERENCE_ID: &str = "reference_ID";
pub(crate) const ATTR_KEY: &str = "key";
pub(crate) const ATTR_TYPE: &str = "type";
pub(crate) const ATTR_VALUE: &str = "value";
pub(crate) const ELEM_NULL: &str = "null";
pub(crate) const ELEM_OBJECT: &str = "Object";
pub(crate) const ELEM_MAP_ENTRY: &str = "MapEntry";
pub(crate) const ELEM_KEY: &str = "Key";
pub(crate) const ELEM_VALUE: &str = "Value";
pub(crate) const ELEM_SAVABLE: &str = "Savable";
pub(crate) const ELEM_FLOAT_BUFFER: &str = "FloatBuffer";
pub(crate) const ELEM_BYTE_BUFFER: &str = "ByteBuffer";
pub(crate) const PREFIX_STRING: &str = "String_";
pub(crate) const PREFIX_ARRAY: &str = "array_";
pub(crate) const PREFIX_LIST: &str = "SavableArrayList_";
pub(crate) const PREFIX_LIST_ARRAY: &str = "SavableArrayListArray_";

/// Output sink a [`Savable`](crate::savable::Savable) writes its fields
/// into.
///
/// Scalar writes attach attributes to the current element and are elided
/// when equal to the default. Array, buffer, container, and map writes
/// create child elements. Array writes accept an optional default slice:
/// `Some` elides the write when the value compares equal, `None` always
/// writes.
pub trait OutputCapsule {
    // --- scalars -------------------------------------------------------

    /// Write a byte attribute unless it equals `default`.
    fn write_u8(&mut self, value: u8, name: &str, default: u8) -> Result<()>;
    /// Write a short attribute unless it equals `default`.
    fn write_i16(&mut self, value: i16, name: &str, default: i16) -> Result<()>;
    /// Write an int attribute unless it equals `default`.
    fn write_i32(&mut self, value: i32, name: &str, default: i32) -> Result<()>;
    /// Write a long attribute unless it equals `default`.
    fn write_i64(&mut self, value: i64, name: &str, default: i64) -> Result<()>;
    /// Write a float attribute unless it equals `default`.
    fn write_f32(&mut self, value: f32, name: &str, default: f32) -> Result<()>;
    /// Write a double attribute unless it equals `default`.
    fn write_f64(&mut self, value: f64, name: &str, default: f64) -> Result<()>;
    /// Write a boolean attribute unless it equals `default`.
    fn write_bool(&mut self, value: bool, name: &str, default: bool) -> Result<()>;
    /// Write a string attribute unless it equals `default`.
    fn write_str(&mut self, value: &str, name: &str, default: &str) -> Result<()>;
    /// Write a bit set as its set-bit indices unless it equals `default`.
    fn write_bitset(&mut self, value: &BitSet, name: &str, default: &BitSet) -> Result<()>;

    // --- 1D arrays -----------------------------------------------------

    fn write_u8_array(&mut self, value: &[u8], name: &str, default: Option<&[u8]>) -> Result<()>;
    fn write_i16_array(&mut self, value: &[i16], name: &str, default: Option<&[i16]>)
        -> Result<()>;
    fn write_i32_array(&mut self, value: &[i32], name: &str, default: Option<&[i32]>)
        -> Result<()>;
    fn write_i64_array(&mut self, value: &[i64], name: &str, default: Option<&[i64]>)
        -> Result<()>;
    fn write_f32_array(&mut self, value: &[f32], name: &str, default: Option<&[f32]>)
        -> Result<()>;
    fn write_f64_array(&mut self, value: &[f64], name: &str, default: Option<&[f64]>)
        -> Result<()>;
    fn write_bool_array(
        &mut self,
        value: &[bool],
        name: &str,
        default: Option<&[bool]>,
    ) -> Result<()>;
    fn write_str_array(
        &mut self,
        value: &[String],
        name: &str,
        default: Option<&[String]>,
    ) -> Result<()>;

    // --- 2D arrays (one `array_<i>` child per row) ---------------------

    fn write_u8_array2(
        &mut self,
        value: &[Vec<u8>],
        name: &str,
        default: Option<&[Vec<u8>]>,
    ) -> Result<()>;
    fn write_i16_array2(
        &mut self,
        value: &[Vec<i16>],
        name: &str,
        default: Option<&[Vec<i16>]>,
    ) -> Result<()>;
    fn write_i32_array2(
        &mut self,
        value: &[Vec<i32>],
        name: &str,
        default: Option<&[Vec<i32>]>,
    ) -> Result<()>;
    fn write_i64_array2(
        &mut self,
        value: &[Vec<i64>],
        name: &str,
        default: Option<&[Vec<i64>]>,
    ) -> Result<()>;
    fn write_f32_array2(
        &mut self,
        value: &[Vec<f32>],
        name: &str,
        default: Option<&[Vec<f32>]>,
    ) -> Result<()>;
    fn write_f64_array2(
        &mut self,
        value: &[Vec<f64>],
        name: &str,
        default: Option<&[Vec<f64>]>,
    ) -> Result<()>;
    fn write_bool_array2(
        &mut self,
        value: &[Vec<bool>],
        name: &str,
        default: Option<&[Vec<bool>]>,
    ) -> Result<()>;
    fn write_str_array2(
        &mut self,
        value: &[Vec<String>],
        name: &str,
        default: Option<&[Vec<String>]>,
    ) -> Result<()>;

    // --- buffers -------------------------------------------------------

    /// Write a float buffer; `None` writes nothing.
    fn write_float_buffer(&mut self, value: Option<&FloatBuffer>, name: &str) -> Result<()>;
    fn write_int_buffer(&mut self, value: Option<&IntBuffer>, name: &str) -> Result<()>;
    fn write_byte_buffer(&mut self, value: Option<&ByteBuffer>, name: &str) -> Result<()>;
    fn write_short_buffer(&mut self, value: Option<&ShortBuffer>, name: &str) -> Result<()>;
    /// Write an ordered list of float buffers; entries must be present.
    fn write_float_buffer_list(&mut self, value: &[FloatBuffer], name: &str) -> Result<()>;
    fn write_byte_buffer_list(&mut self, value: &[ByteBuffer], name: &str) -> Result<()>;

    // --- savables ------------------------------------------------------

    /// Write a savable object under `name`.
    ///
    /// A no-op when `value` is `None` or pointer-identical to `default`.
    /// Re-encountered instances are written as a lightweight `ref` element
    /// instead of a second full encoding.
    fn write_savable(
        &mut self,
        value: Option<&SavableRef>,
        name: &str,
        default: Option<&SavableRef>,
    ) -> Result<()>;

    /// Write a savable array; `None` entries become explicit `null`
    /// placeholder elements, preserving slot positions.
    fn write_savable_array(&mut self, value: &[Option<SavableRef>], name: &str) -> Result<()>;

    /// Write a 2D savable array, row-major, with `size_outer`/`size_inner`.
    fn write_savable_array2(
        &mut self,
        value: &[Vec<Option<SavableRef>>],
        name: &str,
    ) -> Result<()>;

    /// Write a savable list; same placeholder rule as arrays.
    fn write_savable_list(&mut self, value: &[Option<SavableRef>], name: &str) -> Result<()>;

    /// Write an array of savable lists.
    fn write_savable_list_array(
        &mut self,
        value: &[Option<Vec<Option<SavableRef>>>],
        name: &str,
    ) -> Result<()>;

    /// Write a 2D array of savable lists.
    fn write_savable_list_array2(
        &mut self,
        value: &[Vec<Option<Vec<Option<SavableRef>>>>],
        name: &str,
    ) -> Result<()>;

    /// Write a sparse savable list: `None` entries are omitted entirely.
    ///
    /// This shape is deliberately lossy: the reader compacts the surviving
    /// entries and the consumer reconstructs the gaps by other means.
    fn write_sparse_savable_list(
        &mut self,
        value: &[Option<SavableRef>],
        name: &str,
    ) -> Result<()>;

    // --- maps ----------------------------------------------------------

    /// Write a savable-keyed map as `MapEntry` elements with `Key`/`Value`
    /// children.
    fn write_savable_map(&mut self, value: &[(SavableRef, SavableRef)], name: &str) -> Result<()>;

    /// Write a string-keyed savable map.
    fn write_string_savable_map(
        &mut self,
        value: &IndexMap<String, SavableRef>,
        name: &str,
    ) -> Result<()>;

    /// Write a heterogeneous string-keyed map; each entry carries a
    /// [`TypeTag`](crate::data::TypeTag) so the reader can dispatch.
    fn write_string_object_map(
        &mut self,
        value: &IndexMap<String, Value>,
        name: &str,
    ) -> Result<()>;
}

/// Input source a [`Savable`](crate::savable::Savable) reads its fields
/// from.
///
/// Scalar reads return the supplied default when the attribute is absent
/// or empty. Element-shaped reads (arrays, buffers, containers, maps)
/// return `Ok(None)` when the named child element is absent, letting the
/// caller substitute its own default.
pub trait InputCapsule {
    // --- scalars -------------------------------------------------------

    fn read_u8(&mut self, name: &str, default: u8) -> Result<u8>;
    fn read_i16(&mut self, name: &str, default: i16) -> Result<i16>;
    fn read_i32(&mut self, name: &str, default: i32) -> Result<i32>;
    fn read_i64(&mut self, name: &str, default: i64) -> Result<i64>;
    fn read_f32(&mut self, name: &str, default: f32) -> Result<f32>;
    fn read_f64(&mut self, name: &str, default: f64) -> Result<f64>;
    fn read_bool(&mut self, name: &str, default: bool) -> Result<bool>;
    fn read_str(&mut self, name: &str, default: &str) -> Result<String>;
    fn read_bitset(&mut self, name: &str, default: &BitSet) -> Result<BitSet>;

    // --- 1D arrays -----------------------------------------------------

    fn read_u8_array(&mut self, name: &str) -> Result<Option<Vec<u8>>>;
    fn read_i16_array(&mut self, name: &str) -> Result<Option<Vec<i16>>>;
    fn read_i32_array(&mut self, name: &str) -> Result<Option<Vec<i32>>>;
    fn read_i64_array(&mut self, name: &str) -> Result<Option<Vec<i64>>>;
    fn read_f32_array(&mut self, name: &str) -> Result<Option<Vec<f32>>>;
    fn read_f64_array(&mut self, name: &str) -> Result<Option<Vec<f64>>>;
    fn read_bool_array(&mut self, name: &str) -> Result<Option<Vec<bool>>>;
    fn read_str_array(&mut self, name: &str) -> Result<Option<Vec<String>>>;

    // --- 2D arrays -----------------------------------------------------

    fn read_u8_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<u8>>>>;
    fn read_i16_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<i16>>>>;
    fn read_i32_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<i32>>>>;
    fn read_i64_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<i64>>>>;
    fn read_f32_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<f32>>>>;
    fn read_f64_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<f64>>>>;
    fn read_bool_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<bool>>>>;
    fn read_str_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<String>>>>;

    // --- buffers -------------------------------------------------------

    /// Read a float buffer. `name: None` reads from the current element
    /// itself (used inside buffer lists).
    fn read_float_buffer(&mut self, name: Option<&str>) -> Result<Option<FloatBuffer>>;
    fn read_int_buffer(&mut self, name: Option<&str>) -> Result<Option<IntBuffer>>;
    fn read_byte_buffer(&mut self, name: Option<&str>) -> Result<Option<ByteBuffer>>;
    fn read_short_buffer(&mut self, name: Option<&str>) -> Result<Option<ShortBuffer>>;
    fn read_float_buffer_list(&mut self, name: &str) -> Result<Option<Vec<FloatBuffer>>>;
    fn read_byte_buffer_list(&mut self, name: &str) -> Result<Option<Vec<ByteBuffer>>>;

    // --- savables ------------------------------------------------------

    /// Read a savable object.
    ///
    /// `name: Some` looks up the named child; `None` performs an unkeyed
    /// sequential read (the root read, or the next child element). When
    /// supplied, `default` is returned for absent elements and its runtime
    /// type takes precedence during type resolution.
    fn read_savable(
        &mut self,
        name: Option<&str>,
        default: Option<&SavableRef>,
    ) -> Result<Option<SavableRef>>;

    /// Read a savable array; `null` placeholders decode to `None` entries
    /// at their original positions.
    fn read_savable_array(&mut self, name: &str) -> Result<Option<Vec<Option<SavableRef>>>>;

    /// Read a 2D savable array.
    fn read_savable_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<Option<SavableRef>>>>>;

    /// Read a savable list.
    fn read_savable_list(&mut self, name: &str) -> Result<Option<Vec<Option<SavableRef>>>>;

    /// Read an array of savable lists.
    #[allow(clippy::type_complexity)]
    fn read_savable_list_array(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Option<Vec<Option<SavableRef>>>>>>;

    /// Read a 2D array of savable lists.
    #[allow(clippy::type_complexity)]
    fn read_savable_list_array2(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Vec<Option<Vec<Option<SavableRef>>>>>>>;

    /// Read a sparse savable list: surviving entries only, compacted.
    fn read_sparse_savable_list(&mut self, name: &str) -> Result<Option<Vec<SavableRef>>>;

    // --- maps ----------------------------------------------------------

    fn read_savable_map(&mut self, name: &str) -> Result<Option<Vec<(SavableRef, SavableRef)>>>;
    fn read_string_savable_map(
        &mut self,
        name: &str,
    ) -> Result<Option<IndexMap<String, SavableRef>>>;
    fn read_string_object_map(&mut self, name: &str) -> Result<Option<IndexMap<String, Value>>>;
}

/// Enum convenience layered over the string codec.
///
/// Generic methods cannot live on the object-safe capsule traits, so enum
/// support rides on a blanket extension trait instead.
pub trait OutputCapsuleExt: OutputCapsule {
    /// Write an enum as its display form unless it equals `default`.
    fn write_enum<E: Display + PartialEq>(
        &mut self,
        value: &E,
        name: &str,
        default: &E,
    ) -> Result<()> {
        if value == default {
            return Ok(());
        }
        self.write_str(&value.to_string(), name, "")
    }

    /// Write an enum slice as a string array.
    fn write_enum_array<E: Display>(&mut self, value: &[E], name: &str) -> Result<()> {
        let strings: Vec<String> = value.iter().map(E::to_string).collect();
        self.write_str_array(&strings, name, None)
    }
}

impl<C: OutputCapsule + ?Sized> OutputCapsuleExt for C {}

/// Read-side counterpart of [`OutputCapsuleExt`].
pub trait InputCapsuleExt: InputCapsule {
    /// Read an enum attribute, returning `default` when absent.
    fn read_enum<E: FromStr>(&mut self, name: &str, default: E) -> Result<E> {
        let text = self.read_str(name, "")?;
        if text.is_empty() {
            return Ok(default);
        }
        text.parse::<E>().map_err(|_| SaveError::Parse {
            what: "enum",
            text,
            element: name.to_owned(),
            source: ParseSource::Enum,
        })
    }

    /// Read an enum array previously written by
    /// [`OutputCapsuleExt::write_enum_array`].
    fn read_enum_array<E: FromStr>(&mut self, name: &str) -> Result<Option<Vec<E>>> {
        let Some(strings) = self.read_str_array(name)? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(strings.len());
        for text in strings {
            let parsed = text.parse::<E>().map_err(|_| SaveError::Parse {
                what: "enum",
                text,
                element: name.to_owned(),
                source: ParseSource::Enum,
            })?;
            out.push(parsed);
        }
        Ok(Some(out))
    }
}

impl<C: InputCapsule + ?Sized> InputCapsuleExt for C {}
