//! Read-side capsule: decodes a [`Document`] back into live objects.
//!
//! Types are resolved through the [`TypeRegistry`]; nothing is discovered
//! reflectively. Reference IDs are registered *before* the referenced
//! object's `read` runs, so cyclic graphs resolve their back-references to
//! the instance under construction.

use std::collections::HashMap;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::capsule::{
    InputCapsule, ATTR_CLASS, ATTR_DATA, ATTR_KEY, ATTR_REF, ATTR_REFERENCE_ID, ATTR_SIZE,
    ATTR_SIZE_INNER, ATTR_SIZE_OUTER, ATTR_TYPE, ATTR_VALUE, ELEM_KEY, ELEM_MAP_ENTRY, ELEM_NULL,
    ELEM_SAVABLE, ELEM_VALUE,
};
use crate::data::{BitSet, Buffer, ByteBuffer, FloatBuffer, IntBuffer, ShortBuffer, TypeTag, Value};
use crate::doc::{Document, NodeId};
use crate::error::{ParseSource, Result, SaveError};
use crate::registry::TypeRegistry;
use crate::savable::SavableRef;

/// Capsule that decodes one document against a type registry.
pub struct XmlInputCapsule<'a> {
    doc: &'a Document,
    registry: &'a TypeRegistry,
    cur: Option<NodeId>,
    at_root: bool,
    /// Instances seen under a `reference_ID`, available to later `ref`
    /// stubs. Forward references are unsupported.
    refs: HashMap<String, SavableRef>,
}

impl<'a> XmlInputCapsule<'a> {
    /// Create a capsule positioned at the document root.
    pub fn new(doc: &'a Document, registry: &'a TypeRegistry) -> Self {
        Self {
            doc,
            registry,
            cur: doc.root(),
            at_root: true,
            refs: HashMap::new(),
        }
    }

    /// Decode the document's root object.
    pub fn read_root(&mut self) -> Result<SavableRef> {
        match self.read_savable(None, None)? {
            Some(object) => Ok(object),
            None => Err(SaveError::InvalidRoot),
        }
    }

    fn cur(&self, name: &str) -> Result<NodeId> {
        self.cur.ok_or_else(|| SaveError::NoContext(name.to_owned()))
    }

    fn parse_error<E: Into<ParseSource>>(
        what: &'static str,
        text: &str,
        element: &str,
    ) -> impl FnOnce(E) -> SaveError {
        let text = text.to_owned();
        let element = element.to_owned();
        move |e| SaveError::Parse {
            what,
            text,
            element,
            source: e.into(),
        }
    }

    /// Scalar attribute on the current element; absent or empty reads as
    /// the default.
    fn read_attr_scalar<T: FromStr>(
        &self,
        name: &str,
        default: T,
        what: &'static str,
    ) -> Result<T>
    where
        ParseSource: From<T::Err>,
    {
        let cur = self.cur(name)?;
        match self.doc.attr(cur, name) {
            None => Ok(default),
            Some("") => Ok(default),
            Some(text) => text.parse().map_err(Self::parse_error(what, text, name)),
        }
    }

    fn size_attr(&self, node: NodeId, attr: &str) -> Result<usize> {
        let Some(text) = self.doc.attr(node, attr) else {
            return Ok(0);
        };
        text.parse()
            .map_err(Self::parse_error("size", text, self.doc.name(node)))
    }

    fn parse_bitset_text(&self, text: &str, element: &str) -> Result<BitSet> {
        let mut set = BitSet::new();
        for token in text.split_whitespace() {
            let index: usize = token
                .parse()
                .map_err(Self::parse_error("bit index", token, element))?;
            set.set(index);
        }
        Ok(set)
    }

    /// Parse a `size`/`data` element into a token vector, enforcing the
    /// declared size.
    fn read_data_node<T: FromStr>(&self, node: NodeId, what: &'static str) -> Result<Vec<T>>
    where
        ParseSource: From<T::Err>,
    {
        let element = self.doc.name(node);
        let declared = self.size_attr(node, ATTR_SIZE)?;
        let data = self.doc.attr(node, ATTR_DATA).unwrap_or("");
        // Capacity bounded by the document text, not the declared size.
        let mut out = Vec::with_capacity(declared.min(data.len()));
        for token in data.split_whitespace() {
            out.push(token.parse().map_err(Self::parse_error(what, token, element))?);
        }
        if out.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: element.to_owned(),
                declared,
                actual: out.len(),
            });
        }
        Ok(out)
    }

    fn read_prim_array<T: FromStr>(&self, name: &str, what: &'static str) -> Result<Option<Vec<T>>>
    where
        ParseSource: From<T::Err>,
    {
        let cur = self.cur(name)?;
        match self.doc.find_child(cur, name) {
            None => Ok(None),
            Some(node) => self.read_data_node(node, what).map(Some),
        }
    }

    fn read_prim_array2<T: FromStr>(
        &self,
        name: &str,
        what: &'static str,
    ) -> Result<Option<Vec<Vec<T>>>>
    where
        ParseSource: From<T::Err>,
    {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let declared = self.size_attr(outer, ATTR_SIZE)?;
        let children = self.doc.children(outer);
        if children.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: self.doc.name(outer).to_owned(),
                declared,
                actual: children.len(),
            });
        }
        let mut rows = Vec::with_capacity(declared);
        for &row in children {
            rows.push(self.read_data_node(row, what)?);
        }
        Ok(Some(rows))
    }

    /// Parse a string-array element: `String_<i>` children with `value`
    /// attributes.
    fn read_string_node(&self, node: NodeId) -> Result<Vec<String>> {
        let declared = self.size_attr(node, ATTR_SIZE)?;
        let children = self.doc.children(node);
        if children.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: self.doc.name(node).to_owned(),
                declared,
                actual: children.len(),
            });
        }
        Ok(children
            .iter()
            .map(|&c| self.doc.attr(c, ATTR_VALUE).unwrap_or("").to_owned())
            .collect())
    }

    fn read_buffer<T: FromStr>(
        &self,
        name: Option<&str>,
        what: &'static str,
    ) -> Result<Option<Buffer<T>>>
    where
        ParseSource: From<T::Err>,
    {
        let node = match name {
            Some(n) => match self.doc.find_child(self.cur(n)?, n) {
                Some(node) => node,
                None => return Ok(None),
            },
            None => self.cur("buffer")?,
        };
        Ok(Some(Buffer::from_vec(self.read_data_node(node, what)?)))
    }

    fn read_buffer_list<T: FromStr>(
        &self,
        name: &str,
        what: &'static str,
    ) -> Result<Option<Vec<Buffer<T>>>>
    where
        ParseSource: From<T::Err>,
    {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let declared = self.size_attr(outer, ATTR_SIZE)?;
        let children = self.doc.children(outer);
        if children.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: self.doc.name(outer).to_owned(),
                declared,
                actual: children.len(),
            });
        }
        let mut out = Vec::with_capacity(declared);
        for &child in children {
            out.push(Buffer::from_vec(self.read_data_node(child, what)?));
        }
        Ok(Some(out))
    }

    /// Decode the savable rooted at `node`.
    ///
    /// Resolution order for the concrete type: the runtime type of
    /// `default` when one was supplied, else the `class` attribute, else
    /// the element name itself. `ref` stubs short-circuit to the
    /// previously decoded instance.
    fn read_savable_from(
        &mut self,
        node: NodeId,
        default: Option<&SavableRef>,
    ) -> Result<SavableRef> {
        if let Some(ref_id) = self.doc.attr(node, ATTR_REF) {
            return match self.refs.get(ref_id) {
                Some(object) => Ok(object.clone()),
                None => {
                    log::error!("reference `{ref_id}` used before its definition");
                    Err(SaveError::UnresolvedReference(ref_id.to_owned()))
                }
            };
        }

        let type_name = match default {
            Some(d) => d.borrow().type_name().to_owned(),
            None => match self.doc.attr(node, ATTR_CLASS) {
                Some(class) => class.to_owned(),
                None => self.doc.name(node).to_owned(),
            },
        };
        let instance = self.registry.instantiate(&type_name)?;

        // Registered before `read` so cyclic back-references resolve to
        // the instance under construction.
        if let Some(id) = self.doc.attr(node, ATTR_REFERENCE_ID) {
            self.refs.insert(id.to_owned(), instance.clone());
        }

        let old = self.cur;
        self.cur = Some(node);
        let result = instance.borrow_mut().read(self);
        self.cur = old;
        result?;
        Ok(instance)
    }

    /// One container slot: a `null` placeholder or a full savable.
    fn read_entry(&mut self, node: NodeId) -> Result<Option<SavableRef>> {
        if self.doc.name(node) == ELEM_NULL {
            Ok(None)
        } else {
            self.read_savable_from(node, None).map(Some)
        }
    }

    /// A savable container element: `size` attribute plus one child per
    /// slot, count enforced.
    fn read_entry_node(&mut self, node: NodeId) -> Result<Vec<Option<SavableRef>>> {
        let declared = self.size_attr(node, ATTR_SIZE)?;
        let children = self.doc.children(node).to_vec();
        if children.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: self.doc.name(node).to_owned(),
                declared,
                actual: children.len(),
            });
        }
        children.into_iter().map(|c| self.read_entry(c)).collect()
    }

    /// Heterogeneous map payload for one entry, dispatched by tag. The
    /// cursor must be on the entry element. `Ok(None)` means the payload
    /// was absent and the entry should be skipped.
    fn read_value(&mut self, entry: NodeId, tag: TypeTag) -> Result<Option<Value>> {
        let old = self.cur;
        self.cur = Some(entry);
        let result = self.read_value_at(tag);
        self.cur = old;
        result
    }

    fn value_scalar<T: FromStr>(&self, what: &'static str) -> Result<Option<T>>
    where
        ParseSource: From<T::Err>,
    {
        let cur = self.cur(ATTR_VALUE)?;
        match self.doc.attr(cur, ATTR_VALUE) {
            None => Ok(None),
            Some(text) => text
                .parse()
                .map(Some)
                .map_err(Self::parse_error(what, text, ATTR_VALUE)),
        }
    }

    fn read_value_at(&mut self, tag: TypeTag) -> Result<Option<Value>> {
        let value = match tag {
            TypeTag::Unhandled => None,
            TypeTag::BitSet => {
                let cur = self.cur(ATTR_VALUE)?;
                match self.doc.attr(cur, ATTR_VALUE) {
                    Some(text) => Some(Value::BitSet(self.parse_bitset_text(text, ATTR_VALUE)?)),
                    None => None,
                }
            }
            TypeTag::Bool => self.value_scalar("bool")?.map(Value::Bool),
            TypeTag::Byte => self.value_scalar("byte")?.map(Value::Byte),
            TypeTag::Double => self.value_scalar("double")?.map(Value::Double),
            TypeTag::Float => self.value_scalar("float")?.map(Value::Float),
            TypeTag::Int => self.value_scalar("int")?.map(Value::Int),
            TypeTag::Long => self.value_scalar("long")?.map(Value::Long),
            TypeTag::Short => self.value_scalar("short")?.map(Value::Short),
            TypeTag::Str => {
                let cur = self.cur(ATTR_VALUE)?;
                self.doc
                    .attr(cur, ATTR_VALUE)
                    .map(|s| Value::Str(s.to_owned()))
            }
            TypeTag::BoolArray => self.read_bool_array(ELEM_VALUE)?.map(Value::BoolArray),
            TypeTag::ByteArray => self.read_u8_array(ELEM_VALUE)?.map(Value::ByteArray),
            TypeTag::DoubleArray => self.read_f64_array(ELEM_VALUE)?.map(Value::DoubleArray),
            TypeTag::FloatArray => self.read_f32_array(ELEM_VALUE)?.map(Value::FloatArray),
            TypeTag::IntArray => self.read_i32_array(ELEM_VALUE)?.map(Value::IntArray),
            TypeTag::LongArray => self.read_i64_array(ELEM_VALUE)?.map(Value::LongArray),
            TypeTag::ShortArray => self.read_i16_array(ELEM_VALUE)?.map(Value::ShortArray),
            TypeTag::StrArray => self.read_str_array(ELEM_VALUE)?.map(Value::StrArray),
            TypeTag::BoolArray2 => self.read_bool_array2(ELEM_VALUE)?.map(Value::BoolArray2),
            TypeTag::ByteArray2 => self.read_u8_array2(ELEM_VALUE)?.map(Value::ByteArray2),
            TypeTag::DoubleArray2 => self.read_f64_array2(ELEM_VALUE)?.map(Value::DoubleArray2),
            TypeTag::FloatArray2 => self.read_f32_array2(ELEM_VALUE)?.map(Value::FloatArray2),
            TypeTag::IntArray2 => self.read_i32_array2(ELEM_VALUE)?.map(Value::IntArray2),
            TypeTag::LongArray2 => self.read_i64_array2(ELEM_VALUE)?.map(Value::LongArray2),
            TypeTag::ShortArray2 => self.read_i16_array2(ELEM_VALUE)?.map(Value::ShortArray2),
            TypeTag::StrArray2 => self.read_str_array2(ELEM_VALUE)?.map(Value::StrArray2),
            TypeTag::ByteBuffer => self.read_byte_buffer(Some(ELEM_VALUE))?.map(Value::ByteBuffer),
            TypeTag::FloatBuffer => self
                .read_float_buffer(Some(ELEM_VALUE))?
                .map(Value::FloatBuffer),
            TypeTag::IntBuffer => self.read_int_buffer(Some(ELEM_VALUE))?.map(Value::IntBuffer),
            TypeTag::ShortBuffer => self
                .read_short_buffer(Some(ELEM_VALUE))?
                .map(Value::ShortBuffer),
            TypeTag::FloatBufferList => self
                .read_float_buffer_list(ELEM_VALUE)?
                .map(Value::FloatBufferList),
            TypeTag::ByteBufferList => self
                .read_byte_buffer_list(ELEM_VALUE)?
                .map(Value::ByteBufferList),
            TypeTag::Savable => self.read_savable(Some(ELEM_VALUE), None)?.map(Value::Savable),
            TypeTag::SavableArray => self.read_savable_array(ELEM_VALUE)?.map(Value::SavableArray),
            TypeTag::SavableArray2 => self
                .read_savable_array2(ELEM_VALUE)?
                .map(Value::SavableArray2),
            TypeTag::SavableList => self.read_savable_list(ELEM_VALUE)?.map(Value::SavableList),
            TypeTag::SavableMap => self.read_savable_map(ELEM_VALUE)?.map(Value::SavableMap),
            TypeTag::StringSavableMap => self
                .read_string_savable_map(ELEM_VALUE)?
                .map(Value::StringSavableMap),
            TypeTag::StringObjectMap => self
                .read_string_object_map(ELEM_VALUE)?
                .map(Value::StringObjectMap),
        };
        Ok(value)
    }
}

impl InputCapsule for XmlInputCapsule<'_> {
    fn read_u8(&mut self, name: &str, default: u8) -> Result<u8> {
        self.read_attr_scalar(name, default, "byte")
    }

    fn read_i16(&mut self, name: &str, default: i16) -> Result<i16> {
        self.read_attr_scalar(name, default, "short")
    }

    fn read_i32(&mut self, name: &str, default: i32) -> Result<i32> {
        self.read_attr_scalar(name, default, "int")
    }

    fn read_i64(&mut self, name: &str, default: i64) -> Result<i64> {
        self.read_attr_scalar(name, default, "long")
    }

    fn read_f32(&mut self, name: &str, default: f32) -> Result<f32> {
        self.read_attr_scalar(name, default, "float")
    }

    fn read_f64(&mut self, name: &str, default: f64) -> Result<f64> {
        self.read_attr_scalar(name, default, "double")
    }

    fn read_bool(&mut self, name: &str, default: bool) -> Result<bool> {
        self.read_attr_scalar(name, default, "bool")
    }

    fn read_str(&mut self, name: &str, default: &str) -> Result<String> {
        let cur = self.cur(name)?;
        Ok(self
            .doc
            .attr(cur, name)
            .map_or_else(|| default.to_owned(), str::to_owned))
    }

    fn read_bitset(&mut self, name: &str, default: &BitSet) -> Result<BitSet> {
        let cur = self.cur(name)?;
        match self.doc.attr(cur, name) {
            None => Ok(default.clone()),
            Some(text) => self.parse_bitset_text(text, name),
        }
    }

    fn read_u8_array(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        self.read_prim_array(name, "byte")
    }

    fn read_i16_array(&mut self, name: &str) -> Result<Option<Vec<i16>>> {
        self.read_prim_array(name, "short")
    }

    fn read_i32_array(&mut self, name: &str) -> Result<Option<Vec<i32>>> {
        self.read_prim_array(name, "int")
    }

    fn read_i64_array(&mut self, name: &str) -> Result<Option<Vec<i64>>> {
        self.read_prim_array(name, "long")
    }

    fn read_f32_array(&mut self, name: &str) -> Result<Option<Vec<f32>>> {
        self.read_prim_array(name, "float")
    }

    fn read_f64_array(&mut self, name: &str) -> Result<Option<Vec<f64>>> {
        self.read_prim_array(name, "double")
    }

    fn read_bool_array(&mut self, name: &str) -> Result<Option<Vec<bool>>> {
        self.read_prim_array(name, "bool")
    }

    fn read_str_array(&mut self, name: &str) -> Result<Option<Vec<String>>> {
        let cur = self.cur(name)?;
        match self.doc.find_child(cur, name) {
            None => Ok(None),
            Some(node) => self.read_string_node(node).map(Some),
        }
    }

    fn read_u8_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<u8>>>> {
        self.read_prim_array2(name, "byte")
    }

    fn read_i16_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<i16>>>> {
        self.read_prim_array2(name, "short")
    }

    fn read_i32_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<i32>>>> {
        self.read_prim_array2(name, "int")
    }

    fn read_i64_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<i64>>>> {
        self.read_prim_array2(name, "long")
    }

    fn read_f32_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<f32>>>> {
        self.read_prim_array2(name, "float")
    }

    fn read_f64_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<f64>>>> {
        self.read_prim_array2(name, "double")
    }

    fn read_bool_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<bool>>>> {
        self.read_prim_array2(name, "bool")
    }

    fn read_str_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<String>>>> {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let declared = self.size_attr(outer, ATTR_SIZE)?;
        let children = self.doc.children(outer);
        if children.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: self.doc.name(outer).to_owned(),
                declared,
                actual: children.len(),
            });
        }
        let mut rows = Vec::with_capacity(declared);
        for &row in children {
            rows.push(self.read_string_node(row)?);
        }
        Ok(Some(rows))
    }

    fn read_float_buffer(&mut self, name: Option<&str>) -> Result<Option<FloatBuffer>> {
        self.read_buffer(name, "float")
    }

    fn read_int_buffer(&mut self, name: Option<&str>) -> Result<Option<IntBuffer>> {
        self.read_buffer(name, "int")
    }

    fn read_byte_buffer(&mut self, name: Option<&str>) -> Result<Option<ByteBuffer>> {
        self.read_buffer(name, "byte")
    }

    fn read_short_buffer(&mut self, name: Option<&str>) -> Result<Option<ShortBuffer>> {
        self.read_buffer(name, "short")
    }

    fn read_float_buffer_list(&mut self, name: &str) -> Result<Option<Vec<FloatBuffer>>> {
        self.read_buffer_list(name, "float")
    }

    fn read_byte_buffer_list(&mut self, name: &str) -> Result<Option<Vec<ByteBuffer>>> {
        self.read_buffer_list(name, "byte")
    }

    fn read_savable(
        &mut self,
        name: Option<&str>,
        default: Option<&SavableRef>,
    ) -> Result<Option<SavableRef>> {
        let node = match name {
            Some(n) => match self.doc.find_child(self.cur(n)?, n) {
                Some(node) => node,
                None => return Ok(default.cloned()),
            },
            None if self.at_root => {
                self.at_root = false;
                self.doc.root().ok_or(SaveError::InvalidRoot)?
            }
            None => match self.cur.and_then(|c| self.doc.first_child(c)) {
                Some(node) => node,
                None => return Ok(default.cloned()),
            },
        };
        // An explicit null placeholder decodes to no object.
        if self.doc.name(node) == ELEM_NULL {
            return Ok(None);
        }
        self.read_savable_from(node, default).map(Some)
    }

    fn read_savable_array(&mut self, name: &str) -> Result<Option<Vec<Option<SavableRef>>>> {
        let cur = self.cur(name)?;
        match self.doc.find_child(cur, name) {
            None => Ok(None),
            Some(node) => self.read_entry_node(node).map(Some),
        }
    }

    fn read_savable_array2(&mut self, name: &str) -> Result<Option<Vec<Vec<Option<SavableRef>>>>> {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let size_outer = self.size_attr(outer, ATTR_SIZE_OUTER)?;
        let size_inner = self.size_attr(outer, ATTR_SIZE_INNER)?;
        let children = self.doc.children(outer).to_vec();
        // Saturates on hostile sizes; the count check rejects them.
        let declared = size_outer.saturating_mul(size_inner);
        if children.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: self.doc.name(outer).to_owned(),
                declared,
                actual: children.len(),
            });
        }
        let mut rows = Vec::with_capacity(size_outer);
        if size_inner == 0 {
            rows.resize_with(size_outer, Vec::new);
            return Ok(Some(rows));
        }
        for row in children.chunks(size_inner) {
            let mut entries = Vec::with_capacity(size_inner);
            for &node in row {
                entries.push(self.read_entry(node)?);
            }
            rows.push(entries);
        }
        Ok(Some(rows))
    }

    fn read_savable_list(&mut self, name: &str) -> Result<Option<Vec<Option<SavableRef>>>> {
        self.read_savable_array(name)
    }

    fn read_savable_list_array(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Option<Vec<Option<SavableRef>>>>>> {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let declared = self.size_attr(outer, ATTR_SIZE)?;
        let children = self.doc.children(outer).to_vec();
        if children.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: self.doc.name(outer).to_owned(),
                declared,
                actual: children.len(),
            });
        }
        let mut out = Vec::with_capacity(declared);
        for node in children {
            if self.doc.name(node) == ELEM_NULL {
                out.push(None);
            } else {
                out.push(Some(self.read_entry_node(node)?));
            }
        }
        Ok(Some(out))
    }

    fn read_savable_list_array2(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Vec<Option<Vec<Option<SavableRef>>>>>>> {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let declared = self.size_attr(outer, ATTR_SIZE)?;
        let rows = self.doc.children(outer).to_vec();
        if rows.len() != declared {
            return Err(SaveError::SizeMismatch {
                element: self.doc.name(outer).to_owned(),
                declared,
                actual: rows.len(),
            });
        }
        let mut out = Vec::with_capacity(declared);
        for row in rows {
            let row_declared = self.size_attr(row, ATTR_SIZE)?;
            let entries = self.doc.children(row).to_vec();
            if entries.len() != row_declared {
                return Err(SaveError::SizeMismatch {
                    element: self.doc.name(row).to_owned(),
                    declared: row_declared,
                    actual: entries.len(),
                });
            }
            let mut row_out = Vec::with_capacity(row_declared);
            for node in entries {
                if self.doc.name(node) == ELEM_NULL {
                    row_out.push(None);
                } else {
                    row_out.push(Some(self.read_entry_node(node)?));
                }
            }
            out.push(row_out);
        }
        Ok(Some(out))
    }

    fn read_sparse_savable_list(&mut self, name: &str) -> Result<Option<Vec<SavableRef>>> {
        // Written without placeholders; decode compacts whatever survives.
        let Some(entries) = self.read_savable_array(name)? else {
            return Ok(None);
        };
        Ok(Some(entries.into_iter().flatten().collect()))
    }

    fn read_savable_map(&mut self, name: &str) -> Result<Option<Vec<(SavableRef, SavableRef)>>> {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let entries = self.doc.children(outer).to_vec();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.doc.name(entry) != ELEM_MAP_ENTRY {
                continue;
            }
            let key = self.doc.find_child(entry, ELEM_KEY);
            let value = self.doc.find_child(entry, ELEM_VALUE);
            let (Some(key), Some(value)) = (key, value) else {
                log::warn!("map entry in `{name}` missing key or value, skipped");
                continue;
            };
            let key = self.read_savable_from(key, None)?;
            let value = self.read_savable_from(value, None)?;
            out.push((key, value));
        }
        Ok(Some(out))
    }

    fn read_string_savable_map(
        &mut self,
        name: &str,
    ) -> Result<Option<IndexMap<String, SavableRef>>> {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let entries = self.doc.children(outer).to_vec();
        let mut out = IndexMap::with_capacity(entries.len());
        for entry in entries {
            if self.doc.name(entry) != ELEM_MAP_ENTRY {
                continue;
            }
            let key = self.doc.attr(entry, ATTR_KEY).unwrap_or("").to_owned();
            let Some(value) = self.doc.find_child(entry, ELEM_SAVABLE) else {
                log::warn!("map entry `{key}` in `{name}` has no value, skipped");
                continue;
            };
            let value = self.read_savable_from(value, None)?;
            out.insert(key, value);
        }
        Ok(Some(out))
    }

    fn read_string_object_map(&mut self, name: &str) -> Result<Option<IndexMap<String, Value>>> {
        let cur = self.cur(name)?;
        let Some(outer) = self.doc.find_child(cur, name) else {
            return Ok(None);
        };
        let entries = self.doc.children(outer).to_vec();
        let mut out = IndexMap::with_capacity(entries.len());
        for entry in entries {
            if self.doc.name(entry) != ELEM_MAP_ENTRY {
                continue;
            }
            let key = self.doc.attr(entry, ATTR_KEY).unwrap_or("").to_owned();
            let code = {
                let old = self.cur;
                self.cur = Some(entry);
                let code = self.read_attr_scalar(ATTR_TYPE, -1i8, "type tag")?;
                self.cur = old;
                code
            };
            let Some(tag) = TypeTag::from_code(code) else {
                log::warn!("map entry `{key}` in `{name}` has unknown type tag {code}, skipped");
                continue;
            };
            match self.read_value(entry, tag)? {
                Some(value) => {
                    out.insert(key, value);
                }
                None => {
                    log::warn!("map entry `{key}` in `{name}` carried no value, skipped");
                }
            }
        }
        Ok(Some(out))
    }
}
