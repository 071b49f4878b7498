//! Write-side capsule: encodes an object graph into a [`Document`].
//!
//! One capsule instance drives one export. The reference tracker maps
//! object identity to the node holding that object's first full encoding;
//! a `reference_ID` is only assigned when a second encounter actually
//! happens, so singly-owned objects carry no identity attributes at all.

use std::collections::HashMap;
use std::fmt::Display;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::capsule::{
    OutputCapsule, ATTR_CLASS, ATTR_DATA, ATTR_KEY, ATTR_REF, ATTR_REFERENCE_ID, ATTR_SIZE,
    ATTR_SIZE_INNER, ATTR_SIZE_OUTER, ATTR_TYPE, ATTR_VALUE, ELEM_BYTE_BUFFER, ELEM_FLOAT_BUFFER,
    ELEM_KEY, ELEM_MAP_ENTRY, ELEM_NULL, ELEM_OBJECT, ELEM_SAVABLE, ELEM_VALUE, PREFIX_ARRAY,
    PREFIX_LIST, PREFIX_LIST_ARRAY, PREFIX_STRING,
};
use crate::data::{BitSet, Buffer, ByteBuffer, FloatBuffer, IntBuffer, ShortBuffer, Value};
use crate::doc::{Document, NodeId};
use crate::error::{Result, SaveError};
use crate::savable::{identity, SavableRef};

/// Space-joined display form used for `data` attributes and bit sets.
fn join<T: Display>(values: impl IntoIterator<Item = T>) -> String {
    let mut out = String::new();
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{v}");
    }
    out
}

/// Whether `name` can stand as an XML element name directly. Type names
/// that fail this (path separators, generics) fall back to an `Object`
/// element with a `class` attribute.
fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Capsule that encodes savables into a fresh [`Document`].
pub struct XmlOutputCapsule {
    doc: Document,
    cur: Option<NodeId>,
    /// Object identity of every fully-encoded savable, keyed to its node.
    written: HashMap<*const (), NodeId>,
    next_ref_id: u64,
}

impl XmlOutputCapsule {
    /// Create a capsule with an empty document.
    pub fn new() -> Self {
        Self {
            doc: Document::new(),
            cur: None,
            written: HashMap::new(),
            next_ref_id: 0,
        }
    }

    /// Encode `object` as the document root. Called once per export.
    pub fn write_root(&mut self, object: &SavableRef) -> Result<()> {
        self.write_savable_entry(object, None)
    }

    /// Consume the capsule, yielding the finished document.
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// Borrow the document under construction.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn cur(&self, name: &str) -> Result<NodeId> {
        self.cur.ok_or_else(|| SaveError::NoContext(name.to_owned()))
    }

    /// Append a child element under the cursor without moving it.
    fn append(&mut self, name: &str) -> Result<NodeId> {
        let cur = self.cur(name)?;
        Ok(self.doc.append_child(cur, name))
    }

    fn attr_on_cur(&mut self, name: &str, text: &str) -> Result<()> {
        let cur = self.cur(name)?;
        self.doc.set_attr(cur, name, text);
        Ok(())
    }

    fn write_scalar_attr<T: Display + PartialEq>(
        &mut self,
        value: T,
        name: &str,
        default: T,
    ) -> Result<()> {
        if value == default {
            return Ok(());
        }
        self.attr_on_cur(name, &value.to_string())
    }

    /// Child element carrying a flat token run: `size` plus `data`.
    fn data_child<T: Display>(&mut self, parent: NodeId, name: &str, values: &[T]) -> NodeId {
        let node = self.doc.append_child(parent, name);
        self.doc.set_attr(node, ATTR_SIZE, &values.len().to_string());
        self.doc.set_attr(node, ATTR_DATA, &join(values.iter()));
        node
    }

    fn write_prim_array<T: Display + PartialEq>(
        &mut self,
        value: &[T],
        name: &str,
        default: Option<&[T]>,
    ) -> Result<()> {
        if default == Some(value) {
            return Ok(());
        }
        let cur = self.cur(name)?;
        self.data_child(cur, name, value);
        Ok(())
    }

    fn write_prim_array2<T: Display + PartialEq>(
        &mut self,
        value: &[Vec<T>],
        name: &str,
        default: Option<&[Vec<T>]>,
    ) -> Result<()> {
        if default == Some(value) {
            return Ok(());
        }
        let cur = self.cur(name)?;
        let outer = self.doc.append_child(cur, name);
        self.doc
            .set_attr(outer, ATTR_SIZE, &value.len().to_string());
        for (i, row) in value.iter().enumerate() {
            self.data_child(outer, &format!("{PREFIX_ARRAY}{i}"), row);
        }
        Ok(())
    }

    /// String-array body: one `String_<i>` child per entry, value attribute
    /// holding the raw text.
    fn string_children(&mut self, parent: NodeId, value: &[String]) {
        self.doc
            .set_attr(parent, ATTR_SIZE, &value.len().to_string());
        for (i, s) in value.iter().enumerate() {
            let child = self
                .doc
                .append_child(parent, &format!("{PREFIX_STRING}{i}"));
            self.doc.set_attr(child, ATTR_VALUE, s);
        }
    }

    fn write_buffer<T: Display>(&mut self, value: Option<&Buffer<T>>, name: &str) -> Result<()> {
        let Some(buf) = value else {
            return Ok(());
        };
        let cur = self.cur(name)?;
        self.data_child(cur, name, buf.as_slice());
        Ok(())
    }

    fn write_buffer_list<T: Display>(
        &mut self,
        value: &[Buffer<T>],
        name: &str,
        entry_elem: &str,
    ) -> Result<()> {
        let cur = self.cur(name)?;
        let outer = self.doc.append_child(cur, name);
        self.doc
            .set_attr(outer, ATTR_SIZE, &value.len().to_string());
        for buf in value {
            self.data_child(outer, entry_elem, buf.as_slice());
        }
        Ok(())
    }

    /// Encode one savable under the cursor (or as the root when no cursor
    /// is open).
    ///
    /// `name: Some` uses the field name as the element name; `None` derives
    /// the element name from the object's type. Objects seen before are
    /// emitted as a `ref` stub, assigning the target's `reference_ID`
    /// lazily on this second encounter.
    fn write_savable_entry(&mut self, object: &SavableRef, name: Option<&str>) -> Result<()> {
        let ptr = identity(object);
        let type_name = object.borrow().type_name();
        let elem_name = match name {
            Some(n) => n,
            None if is_valid_element_name(type_name) => type_name,
            None => ELEM_OBJECT,
        };

        if let Some(&first) = self.written.get(&ptr) {
            let ref_id = match self.doc.attr(first, ATTR_REFERENCE_ID) {
                Some(id) => id.to_owned(),
                None => {
                    let id = format!("{}-{}", type_name, self.next_ref_id);
                    self.next_ref_id += 1;
                    self.doc.set_attr(first, ATTR_REFERENCE_ID, &id);
                    id
                }
            };
            let stub = self.append(elem_name)?;
            if elem_name != type_name {
                self.doc.set_attr(stub, ATTR_CLASS, type_name);
            }
            self.doc.set_attr(stub, ATTR_REF, &ref_id);
            return Ok(());
        }

        let node = match self.cur {
            Some(c) => self.doc.append_child(c, elem_name),
            None => self.doc.create_root(elem_name),
        };
        if elem_name != type_name {
            self.doc.set_attr(node, ATTR_CLASS, type_name);
        }
        // Registered before descending so cycles resolve to a ref stub
        // instead of recursing forever.
        self.written.insert(ptr, node);

        let old = self.cur;
        self.cur = Some(node);
        let result = object.borrow().write(self);
        self.cur = old;
        result
    }

    /// Write container entries under `parent`: present entries unkeyed,
    /// absent entries as `null` placeholders.
    fn write_entries(&mut self, parent: NodeId, entries: &[Option<SavableRef>]) -> Result<()> {
        let old = self.cur;
        self.cur = Some(parent);
        let mut result = Ok(());
        for entry in entries {
            result = match entry {
                Some(object) => self.write_savable_entry(object, None),
                None => {
                    self.doc.append_child(parent, ELEM_NULL);
                    Ok(())
                }
            };
            if result.is_err() {
                break;
            }
        }
        self.cur = old;
        result
    }

    /// Child element holding a savable list body: `size` plus entries.
    fn write_list_child(
        &mut self,
        parent: NodeId,
        name: &str,
        list: &[Option<SavableRef>],
    ) -> Result<()> {
        let node = self.doc.append_child(parent, name);
        self.doc.set_attr(node, ATTR_SIZE, &list.len().to_string());
        self.write_entries(node, list)
    }

    /// Heterogeneous map payload, dispatched by variant. Scalars land on
    /// the entry's `value` attribute; element-shaped payloads become a
    /// `Value` child. The cursor must be on the map entry element.
    fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::BitSet(v) => self.attr_on_cur(ATTR_VALUE, &join(v.iter())),
            Value::Bool(v) => self.attr_on_cur(ATTR_VALUE, &v.to_string()),
            Value::Byte(v) => self.attr_on_cur(ATTR_VALUE, &v.to_string()),
            Value::Double(v) => self.attr_on_cur(ATTR_VALUE, &v.to_string()),
            Value::Float(v) => self.attr_on_cur(ATTR_VALUE, &v.to_string()),
            Value::Int(v) => self.attr_on_cur(ATTR_VALUE, &v.to_string()),
            Value::Long(v) => self.attr_on_cur(ATTR_VALUE, &v.to_string()),
            Value::Short(v) => self.attr_on_cur(ATTR_VALUE, &v.to_string()),
            Value::Str(v) => self.attr_on_cur(ATTR_VALUE, v),
            Value::BoolArray(v) => self.write_prim_array(v, ELEM_VALUE, None),
            Value::ByteArray(v) => self.write_prim_array(v, ELEM_VALUE, None),
            Value::DoubleArray(v) => self.write_prim_array(v, ELEM_VALUE, None),
            Value::FloatArray(v) => self.write_prim_array(v, ELEM_VALUE, None),
            Value::IntArray(v) => self.write_prim_array(v, ELEM_VALUE, None),
            Value::LongArray(v) => self.write_prim_array(v, ELEM_VALUE, None),
            Value::ShortArray(v) => self.write_prim_array(v, ELEM_VALUE, None),
            Value::BoolArray2(v) => self.write_prim_array2(v, ELEM_VALUE, None),
            Value::ByteArray2(v) => self.write_prim_array2(v, ELEM_VALUE, None),
            Value::DoubleArray2(v) => self.write_prim_array2(v, ELEM_VALUE, None),
            Value::FloatArray2(v) => self.write_prim_array2(v, ELEM_VALUE, None),
            Value::IntArray2(v) => self.write_prim_array2(v, ELEM_VALUE, None),
            Value::LongArray2(v) => self.write_prim_array2(v, ELEM_VALUE, None),
            Value::ShortArray2(v) => self.write_prim_array2(v, ELEM_VALUE, None),
            Value::StrArray(v) => self.write_str_array(v, ELEM_VALUE, None),
            Value::StrArray2(v) => self.write_str_array2(v, ELEM_VALUE, None),
            Value::ByteBuffer(v) => self.write_byte_buffer(Some(v), ELEM_VALUE),
            Value::FloatBuffer(v) => self.write_float_buffer(Some(v), ELEM_VALUE),
            Value::IntBuffer(v) => self.write_int_buffer(Some(v), ELEM_VALUE),
            Value::ShortBuffer(v) => self.write_short_buffer(Some(v), ELEM_VALUE),
            Value::FloatBufferList(v) => self.write_float_buffer_list(v, ELEM_VALUE),
            Value::ByteBufferList(v) => self.write_byte_buffer_list(v, ELEM_VALUE),
            Value::Savable(v) => self.write_savable_entry(v, Some(ELEM_VALUE)),
            Value::SavableArray(v) => self.write_savable_array(v, ELEM_VALUE),
            Value::SavableArray2(v) => self.write_savable_array2(v, ELEM_VALUE),
            Value::SavableList(v) => self.write_savable_list(v, ELEM_VALUE),
            Value::SavableMap(v) => self.write_savable_map(v, ELEM_VALUE),
            Value::StringSavableMap(v) => self.write_string_savable_map(v, ELEM_VALUE),
            Value::StringObjectMap(v) => self.write_string_object_map(v, ELEM_VALUE),
        }
    }
}

impl Default for XmlOutputCapsule {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputCapsule for XmlOutputCapsule {
    fn write_u8(&mut self, value: u8, name: &str, default: u8) -> Result<()> {
        self.write_scalar_attr(value, name, default)
    }

    fn write_i16(&mut self, value: i16, name: &str, default: i16) -> Result<()> {
        self.write_scalar_attr(value, name, default)
    }

    fn write_i32(&mut self, value: i32, name: &str, default: i32) -> Result<()> {
        self.write_scalar_attr(value, name, default)
    }

    fn write_i64(&mut self, value: i64, name: &str, default: i64) -> Result<()> {
        self.write_scalar_attr(value, name, default)
    }

    fn write_f32(&mut self, value: f32, name: &str, default: f32) -> Result<()> {
        self.write_scalar_attr(value, name, default)
    }

    fn write_f64(&mut self, value: f64, name: &str, default: f64) -> Result<()> {
        self.write_scalar_attr(value, name, default)
    }

    fn write_bool(&mut self, value: bool, name: &str, default: bool) -> Result<()> {
        self.write_scalar_attr(value, name, default)
    }

    fn write_str(&mut self, value: &str, name: &str, default: &str) -> Result<()> {
        if value == default {
            return Ok(());
        }
        self.attr_on_cur(name, value)
    }

    fn write_bitset(&mut self, value: &BitSet, name: &str, default: &BitSet) -> Result<()> {
        if value == default {
            return Ok(());
        }
        self.attr_on_cur(name, &join(value.iter()))
    }

    fn write_u8_array(&mut self, value: &[u8], name: &str, default: Option<&[u8]>) -> Result<()> {
        self.write_prim_array(value, name, default)
    }

    fn write_i16_array(
        &mut self,
        value: &[i16],
        name: &str,
        default: Option<&[i16]>,
    ) -> Result<()> {
        self.write_prim_array(value, name, default)
    }

    fn write_i32_array(
        &mut self,
        value: &[i32],
        name: &str,
        default: Option<&[i32]>,
    ) -> Result<()> {
        self.write_prim_array(value, name, default)
    }

    fn write_i64_array(
        &mut self,
        value: &[i64],
        name: &str,
        default: Option<&[i64]>,
    ) -> Result<()> {
        self.write_prim_array(value, name, default)
    }

    fn write_f32_array(
        &mut self,
        value: &[f32],
        name: &str,
        default: Option<&[f32]>,
    ) -> Result<()> {
        self.write_prim_array(value, name, default)
    }

    fn write_f64_array(
        &mut self,
        value: &[f64],
        name: &str,
        default: Option<&[f64]>,
    ) -> Result<()> {
        self.write_prim_array(value, name, default)
    }

    fn write_bool_array(
        &mut self,
        value: &[bool],
        name: &str,
        default: Option<&[bool]>,
    ) -> Result<()> {
        self.write_prim_array(value, name, default)
    }

    fn write_str_array(
        &mut self,
        value: &[String],
        name: &str,
        default: Option<&[String]>,
    ) -> Result<()> {
        if default == Some(value) {
            return Ok(());
        }
        let outer = self.append(name)?;
        self.string_children(outer, value);
        Ok(())
    }

    fn write_u8_array2(
        &mut self,
        value: &[Vec<u8>],
        name: &str,
        default: Option<&[Vec<u8>]>,
    ) -> Result<()> {
        self.write_prim_array2(value, name, default)
    }

    fn write_i16_array2(
        &mut self,
        value: &[Vec<i16>],
        name: &str,
        default: Option<&[Vec<i16>]>,
    ) -> Result<()> {
        self.write_prim_array2(value, name, default)
    }

    fn write_i32_array2(
        &mut self,
        value: &[Vec<i32>],
        name: &str,
        default: Option<&[Vec<i32>]>,
    ) -> Result<()> {
        self.write_prim_array2(value, name, default)
    }

    fn write_i64_array2(
        &mut self,
        value: &[Vec<i64>],
        name: &str,
        default: Option<&[Vec<i64>]>,
    ) -> Result<()> {
        self.write_prim_array2(value, name, default)
    }

    fn write_f32_array2(
        &mut self,
        value: &[Vec<f32>],
        name: &str,
        default: Option<&[Vec<f32>]>,
    ) -> Result<()> {
        self.write_prim_array2(value, name, default)
    }

    fn write_f64_array2(
        &mut self,
        value: &[Vec<f64>],
        name: &str,
        default: Option<&[Vec<f64>]>,
    ) -> Result<()> {
        self.write_prim_array2(value, name, default)
    }

    fn write_bool_array2(
        &mut self,
        value: &[Vec<bool>],
        name: &str,
        default: Option<&[Vec<bool>]>,
    ) -> Result<()> {
        self.write_prim_array2(value, name, default)
    }

    fn write_str_array2(
        &mut self,
        value: &[Vec<String>],
        name: &str,
        default: Option<&[Vec<String>]>,
    ) -> Result<()> {
        if default == Some(value) {
            return Ok(());
        }
        let outer = self.append(name)?;
        self.doc
            .set_attr(outer, ATTR_SIZE, &value.len().to_string());
        for (i, row) in value.iter().enumerate() {
            let row_node = self
                .doc
                .append_child(outer, &format!("{PREFIX_ARRAY}{i}"));
            self.string_children(row_node, row);
        }
        Ok(())
    }

    fn write_float_buffer(&mut self, value: Option<&FloatBuffer>, name: &str) -> Result<()> {
        self.write_buffer(value, name)
    }

    fn write_int_buffer(&mut self, value: Option<&IntBuffer>, name: &str) -> Result<()> {
        self.write_buffer(value, name)
    }

    fn write_byte_buffer(&mut self, value: Option<&ByteBuffer>, name: &str) -> Result<()> {
        self.write_buffer(value, name)
    }

    fn write_short_buffer(&mut self, value: Option<&ShortBuffer>, name: &str) -> Result<()> {
        self.write_buffer(value, name)
    }

    fn write_float_buffer_list(&mut self, value: &[FloatBuffer], name: &str) -> Result<()> {
        self.write_buffer_list(value, name, ELEM_FLOAT_BUFFER)
    }

    fn write_byte_buffer_list(&mut self, value: &[ByteBuffer], name: &str) -> Result<()> {
        self.write_buffer_list(value, name, ELEM_BYTE_BUFFER)
    }

    fn write_savable(
        &mut self,
        value: Option<&SavableRef>,
        name: &str,
        default: Option<&SavableRef>,
    ) -> Result<()> {
        let Some(object) = value else {
            return Ok(());
        };
        if let Some(default) = default {
            if Rc::ptr_eq(object, default) {
                return Ok(());
            }
        }
        self.write_savable_entry(object, Some(name))
    }

    fn write_savable_array(&mut self, value: &[Option<SavableRef>], name: &str) -> Result<()> {
        let outer = self.append(name)?;
        self.doc
            .set_attr(outer, ATTR_SIZE, &value.len().to_string());
        self.write_entries(outer, value)
    }

    fn write_savable_array2(
        &mut self,
        value: &[Vec<Option<SavableRef>>],
        name: &str,
    ) -> Result<()> {
        // Rectangular layout: entries stored row-major under one element.
        let outer = self.append(name)?;
        self.doc
            .set_attr(outer, ATTR_SIZE_OUTER, &value.len().to_string());
        let inner = value.first().map_or(0, Vec::len);
        self.doc
            .set_attr(outer, ATTR_SIZE_INNER, &inner.to_string());
        for row in value {
            self.write_entries(outer, row)?;
        }
        Ok(())
    }

    fn write_savable_list(&mut self, value: &[Option<SavableRef>], name: &str) -> Result<()> {
        let outer = self.append(name)?;
        self.doc
            .set_attr(outer, ATTR_SIZE, &value.len().to_string());
        self.write_entries(outer, value)
    }

    fn write_savable_list_array(
        &mut self,
        value: &[Option<Vec<Option<SavableRef>>>],
        name: &str,
    ) -> Result<()> {
        let outer = self.append(name)?;
        self.doc
            .set_attr(outer, ATTR_SIZE, &value.len().to_string());
        for (i, entry) in value.iter().enumerate() {
            match entry {
                Some(list) => {
                    self.write_list_child(outer, &format!("{PREFIX_LIST}{i}"), list)?;
                }
                None => {
                    self.doc.append_child(outer, ELEM_NULL);
                }
            }
        }
        Ok(())
    }

    fn write_savable_list_array2(
        &mut self,
        value: &[Vec<Option<Vec<Option<SavableRef>>>>],
        name: &str,
    ) -> Result<()> {
        let outer = self.append(name)?;
        self.doc
            .set_attr(outer, ATTR_SIZE, &value.len().to_string());
        for (i, row) in value.iter().enumerate() {
            let row_node = self
                .doc
                .append_child(outer, &format!("{PREFIX_LIST_ARRAY}{i}"));
            self.doc
                .set_attr(row_node, ATTR_SIZE, &row.len().to_string());
            for (j, entry) in row.iter().enumerate() {
                match entry {
                    Some(list) => {
                        self.write_list_child(row_node, &format!("{PREFIX_LIST}{j}"), list)?;
                    }
                    None => {
                        self.doc.append_child(row_node, ELEM_NULL);
                    }
                }
            }
        }
        Ok(())
    }

    fn write_sparse_savable_list(
        &mut self,
        value: &[Option<SavableRef>],
        name: &str,
    ) -> Result<()> {
        // Only surviving entries are written; slot positions are not
        // recoverable from the wire form.
        let present: Vec<Option<SavableRef>> = value
            .iter()
            .filter(|e| e.is_some())
            .cloned()
            .collect();
        let outer = self.append(name)?;
        self.doc
            .set_attr(outer, ATTR_SIZE, &present.len().to_string());
        self.write_entries(outer, &present)
    }

    fn write_savable_map(&mut self, value: &[(SavableRef, SavableRef)], name: &str) -> Result<()> {
        let outer = self.append(name)?;
        let old = self.cur;
        let mut result = Ok(());
        for (key, val) in value {
            let entry = self.doc.append_child(outer, ELEM_MAP_ENTRY);
            self.cur = Some(entry);
            result = self
                .write_savable_entry(key, Some(ELEM_KEY))
                .and_then(|()| self.write_savable_entry(val, Some(ELEM_VALUE)));
            if result.is_err() {
                break;
            }
        }
        self.cur = old;
        result
    }

    fn write_string_savable_map(
        &mut self,
        value: &IndexMap<String, SavableRef>,
        name: &str,
    ) -> Result<()> {
        let outer = self.append(name)?;
        let old = self.cur;
        let mut result = Ok(());
        for (key, val) in value {
            let entry = self.doc.append_child(outer, ELEM_MAP_ENTRY);
            self.doc.set_attr(entry, ATTR_KEY, key);
            self.cur = Some(entry);
            result = self.write_savable_entry(val, Some(ELEM_SAVABLE));
            if result.is_err() {
                break;
            }
        }
        self.cur = old;
        result
    }

    fn write_string_object_map(
        &mut self,
        value: &IndexMap<String, Value>,
        name: &str,
    ) -> Result<()> {
        let outer = self.append(name)?;
        let old = self.cur;
        let mut result = Ok(());
        for (key, val) in value {
            let entry = self.doc.append_child(outer, ELEM_MAP_ENTRY);
            self.doc.set_attr(entry, ATTR_KEY, key);
            self.doc
                .set_attr(entry, ATTR_TYPE, &val.tag().code().to_string());
            self.cur = Some(entry);
            result = self.write_value(val);
            if result.is_err() {
                break;
            }
        }
        self.cur = old;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::InputCapsule;
    use crate::savable::{savable_ref, Savable};
    use std::any::Any;

    #[derive(Debug)]
    struct Mesh {
        name: String,
        lod: i32,
        weights: Vec<f32>,
    }

    impl Savable for Mesh {
        fn type_name(&self) -> &'static str {
            "Mesh"
        }
        fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()> {
            capsule.write_str(&self.name, "name", "")?;
            capsule.write_i32(self.lod, "lod", 0)?;
            capsule.write_f32_array(&self.weights, "weights", None)
        }
        fn read(&mut self, _capsule: &mut dyn InputCapsule) -> Result<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct Pair {
        left: Option<SavableRef>,
        right: Option<SavableRef>,
    }

    impl Savable for Pair {
        fn type_name(&self) -> &'static str {
            "Pair"
        }
        fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()> {
            capsule.write_savable(self.left.as_ref(), "left", None)?;
            capsule.write_savable(self.right.as_ref(), "right", None)
        }
        fn read(&mut self, _capsule: &mut dyn InputCapsule) -> Result<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_scalar_defaults_are_elided() {
        let mesh = savable_ref(Mesh {
            name: String::new(),
            lod: 3,
            weights: vec![0.5, 1.0],
        });
        let mut capsule = XmlOutputCapsule::new();
        capsule.write_root(&mesh).unwrap();

        let doc = capsule.into_document();
        let root = doc.root().unwrap();
        assert_eq!(doc.name(root), "Mesh");
        // name equals its default and must not appear
        assert_eq!(doc.attr(root, "name"), None);
        assert_eq!(doc.attr(root, "lod"), Some("3"));

        let weights = doc.find_child(root, "weights").unwrap();
        assert_eq!(doc.attr(weights, "size"), Some("2"));
        assert_eq!(doc.attr(weights, "data"), Some("0.5 1"));
    }

    #[test]
    fn test_shared_instance_becomes_ref_stub() {
        let shared = savable_ref(Mesh {
            name: "wheel".into(),
            lod: 0,
            weights: vec![],
        });
        let pair = savable_ref(Pair {
            left: Some(shared.clone()),
            right: Some(shared),
        });
        let mut capsule = XmlOutputCapsule::new();
        capsule.write_root(&pair).unwrap();

        let doc = capsule.into_document();
        let root = doc.root().unwrap();
        let left = doc.find_child(root, "left").unwrap();
        let right = doc.find_child(root, "right").unwrap();

        let id = doc.attr(left, "reference_ID").unwrap();
        assert_eq!(id, "Mesh-0");
        assert_eq!(doc.attr(right, "ref"), Some(id));
        // the stub states its type but carries no payload of its own
        assert_eq!(doc.attr(right, "class"), Some("Mesh"));
        assert!(doc.children(right).is_empty());
        assert_eq!(doc.attr(right, "name"), None);
    }

    #[test]
    fn test_unshared_instance_carries_no_reference_id() {
        let mesh = savable_ref(Mesh {
            name: "solo".into(),
            lod: 1,
            weights: vec![],
        });
        let pair = savable_ref(Pair {
            left: Some(mesh),
            right: None,
        });
        let mut capsule = XmlOutputCapsule::new();
        capsule.write_root(&pair).unwrap();

        let doc = capsule.into_document();
        let root = doc.root().unwrap();
        let left = doc.find_child(root, "left").unwrap();
        assert_eq!(doc.attr(left, "reference_ID"), None);
        assert_eq!(doc.find_child(root, "right"), None);
    }

    #[test]
    fn test_null_placeholders_keep_positions() {
        let mesh = savable_ref(Mesh {
            name: "a".into(),
            lod: 0,
            weights: vec![],
        });
        let holder = savable_ref(Holder {
            items: vec![None, Some(mesh), None],
        });
        let mut capsule = XmlOutputCapsule::new();
        capsule.write_root(&holder).unwrap();

        let doc = capsule.into_document();
        let root = doc.root().unwrap();
        let items = doc.find_child(root, "items").unwrap();
        assert_eq!(doc.attr(items, "size"), Some("3"));
        let names: Vec<_> = doc
            .children(items)
            .iter()
            .map(|&c| doc.name(c).to_owned())
            .collect();
        assert_eq!(names, vec!["null", "Mesh", "null"]);
    }

    #[derive(Debug)]
    struct Holder {
        items: Vec<Option<SavableRef>>,
    }

    impl Savable for Holder {
        fn type_name(&self) -> &'static str {
            "Holder"
        }
        fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()> {
            capsule.write_savable_array(&self.items, "items")
        }
        fn read(&mut self, _capsule: &mut dyn InputCapsule) -> Result<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }
}
