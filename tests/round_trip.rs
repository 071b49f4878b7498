//! End-to-end save/load tests over the full XML text path.

use std::any::Any;
use std::cell::Ref;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;
use tartan::{
    savable_ref, BitSet, ByteBuffer, FloatBuffer, InputCapsule, InputCapsuleExt, IntBuffer,
    OutputCapsule, OutputCapsuleExt, RegisteredSavable, Result, Savable, SavableRef, SaveError,
    TypeRegistry, Value, XmlExporter, XmlImporter,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Kind {
    #[default]
    Opaque,
    Transparent,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Opaque => write!(f, "Opaque"),
            Kind::Transparent => write!(f, "Transparent"),
        }
    }
}

impl FromStr for Kind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "Opaque" => Ok(Kind::Opaque),
            "Transparent" => Ok(Kind::Transparent),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Material {
    name: String,
    shininess: f32,
    flags: BitSet,
    kind: Kind,
}

impl Savable for Material {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()> {
        capsule.write_str(&self.name, "name", "")?;
        capsule.write_f32(self.shininess, "shininess", 0.0)?;
        capsule.write_bitset(&self.flags, "flags", &BitSet::new())?;
        capsule.write_enum(&self.kind, "kind", &Kind::default())
    }

    fn read(&mut self, capsule: &mut dyn InputCapsule) -> Result<()> {
        self.name = capsule.read_str("name", "")?;
        self.shininess = capsule.read_f32("shininess", 0.0)?;
        self.flags = capsule.read_bitset("flags", &BitSet::new())?;
        self.kind = capsule.read_enum("kind", Kind::default())?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl RegisteredSavable for Material {
    const TYPE_NAME: &'static str = "Material";

    fn create() -> SavableRef {
        savable_ref(Material::default())
    }
}

#[derive(Debug, Default)]
struct Mesh {
    positions: Option<FloatBuffer>,
    indices: Option<IntBuffer>,
    lods: Vec<Vec<i32>>,
    tags: Vec<String>,
}

impl Savable for Mesh {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()> {
        capsule.write_float_buffer(self.positions.as_ref(), "positions")?;
        capsule.write_int_buffer(self.indices.as_ref(), "indices")?;
        capsule.write_i32_array2(&self.lods, "lods", Some(&[]))?;
        capsule.write_str_array(&self.tags, "tags", Some(&[]))
    }

    fn read(&mut self, capsule: &mut dyn InputCapsule) -> Result<()> {
        self.positions = capsule.read_float_buffer(Some("positions"))?;
        self.indices = capsule.read_int_buffer(Some("indices"))?;
        self.lods = capsule.read_i32_array2("lods")?.unwrap_or_default();
        self.tags = capsule.read_str_array("tags")?.unwrap_or_default();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl RegisteredSavable for Mesh {
    const TYPE_NAME: &'static str = "Mesh";

    fn create() -> SavableRef {
        savable_ref(Mesh::default())
    }
}

#[derive(Debug, Default)]
struct SceneNode {
    name: String,
    material: Option<SavableRef>,
    parent: Option<SavableRef>,
    children: Vec<Option<SavableRef>>,
    states: Vec<Option<SavableRef>>,
    metadata: IndexMap<String, Value>,
}

impl Savable for SceneNode {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()> {
        capsule.write_str(&self.name, "name", "")?;
        capsule.write_savable(self.material.as_ref(), "material", None)?;
        capsule.write_savable(self.parent.as_ref(), "parent", None)?;
        capsule.write_savable_list(&self.children, "children")?;
        capsule.write_sparse_savable_list(&self.states, "states")?;
        capsule.write_string_object_map(&self.metadata, "metadata")
    }

    fn read(&mut self, capsule: &mut dyn InputCapsule) -> Result<()> {
        self.name = capsule.read_str("name", "")?;
        self.material = capsule.read_savable(Some("material"), None)?;
        self.parent = capsule.read_savable(Some("parent"), None)?;
        self.children = capsule.read_savable_list("children")?.unwrap_or_default();
        self.states = capsule
            .read_sparse_savable_list("states")?
            .map(|v| v.into_iter().map(Some).collect())
            .unwrap_or_default();
        self.metadata = capsule.read_string_object_map("metadata")?.unwrap_or_default();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl RegisteredSavable for SceneNode {
    const TYPE_NAME: &'static str = "SceneNode";

    fn create() -> SavableRef {
        savable_ref(SceneNode::default())
    }
}

#[derive(Debug, Default)]
struct Dictionary {
    pairs: Vec<(SavableRef, SavableRef)>,
    named: IndexMap<String, SavableRef>,
}

impl Savable for Dictionary {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()> {
        capsule.write_savable_map(&self.pairs, "pairs")?;
        capsule.write_string_savable_map(&self.named, "named")
    }

    fn read(&mut self, capsule: &mut dyn InputCapsule) -> Result<()> {
        self.pairs = capsule.read_savable_map("pairs")?.unwrap_or_default();
        self.named = capsule.read_string_savable_map("named")?.unwrap_or_default();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl RegisteredSavable for Dictionary {
    const TYPE_NAME: &'static str = "Dictionary";

    fn create() -> SavableRef {
        savable_ref(Dictionary::default())
    }
}

/// Nested container shapes: grids of objects, arrays of lists, buffer lists.
#[derive(Debug, Default)]
struct Atlas {
    grid: Vec<Vec<Option<SavableRef>>>,
    layers: Vec<Option<Vec<Option<SavableRef>>>>,
    tiles: Vec<Vec<Option<Vec<Option<SavableRef>>>>>,
    mips: Vec<FloatBuffer>,
    masks: Vec<ByteBuffer>,
}

impl Savable for Atlas {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write(&self, capsule: &mut dyn OutputCapsule) -> Result<()> {
        capsule.write_savable_array2(&self.grid, "grid")?;
        capsule.write_savable_list_array(&self.layers, "layers")?;
        capsule.write_savable_list_array2(&self.tiles, "tiles")?;
        capsule.write_float_buffer_list(&self.mips, "mips")?;
        capsule.write_byte_buffer_list(&self.masks, "masks")
    }

    fn read(&mut self, capsule: &mut dyn InputCapsule) -> Result<()> {
        self.grid = capsule.read_savable_array2("grid")?.unwrap_or_default();
        self.layers = capsule.read_savable_list_array("layers")?.unwrap_or_default();
        self.tiles = capsule
            .read_savable_list_array2("tiles")?
            .unwrap_or_default();
        self.mips = capsule.read_float_buffer_list("mips")?.unwrap_or_default();
        self.masks = capsule.read_byte_buffer_list("masks")?.unwrap_or_default();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl RegisteredSavable for Atlas {
    const TYPE_NAME: &'static str = "Atlas";

    fn create() -> SavableRef {
        savable_ref(Atlas::default())
    }
}

fn importer() -> XmlImporter {
    let mut registry = TypeRegistry::new();
    registry.register::<Material>();
    registry.register::<Mesh>();
    registry.register::<SceneNode>();
    registry.register::<Dictionary>();
    registry.register::<Atlas>();
    XmlImporter::new(registry)
}

/// Save to XML text and load it back.
fn round_trip(object: &SavableRef) -> SavableRef {
    let mut bytes = Vec::new();
    XmlExporter::new().save(object, &mut bytes).unwrap();
    importer().load_from_bytes(&bytes).unwrap()
}

fn borrow_as<T: Savable>(object: &SavableRef) -> Ref<'_, T> {
    Ref::map(object.borrow(), |s| s.as_any().downcast_ref::<T>().unwrap())
}

#[test]
fn scalars_bitsets_and_enums_survive() {
    init_logs();
    let material = savable_ref(Material {
        name: "chrome".into(),
        shininess: 0.8,
        flags: BitSet::from_indices(&[1, 4, 70]),
        kind: Kind::Transparent,
    });

    let loaded = round_trip(&material);
    let loaded = borrow_as::<Material>(&loaded);
    assert_eq!(loaded.name, "chrome");
    assert_eq!(loaded.shininess, 0.8);
    assert_eq!(loaded.flags, BitSet::from_indices(&[1, 4, 70]));
    assert_eq!(loaded.kind, Kind::Transparent);
}

#[test]
fn default_valued_fields_are_elided_and_restored() -> anyhow::Result<()> {
    init_logs();
    let mut bytes = Vec::new();
    XmlExporter::new().save(&savable_ref(Material::default()), &mut bytes)?;

    // A fully-default object serializes to a bare element.
    let text = String::from_utf8(bytes.clone())?;
    assert!(text.contains("<Material/>"), "unexpected output: {text}");

    let loaded = importer().load_from_bytes(&bytes)?;
    let loaded = borrow_as::<Material>(&loaded);
    assert_eq!(loaded.name, "");
    assert_eq!(loaded.shininess, 0.0);
    assert!(loaded.flags.is_empty());
    assert_eq!(loaded.kind, Kind::Opaque);
    Ok(())
}

#[test]
fn buffers_and_arrays_survive() {
    init_logs();
    let mesh = savable_ref(Mesh {
        positions: Some(FloatBuffer::from_vec(vec![0.0, 1.5, -2.25])),
        indices: Some(IntBuffer::from_vec(vec![0, 1, 2, 2, 1, 0])),
        lods: vec![vec![1, 2, 3], vec![4], vec![]],
        tags: vec!["hull".into(), "static".into()],
    });

    let loaded = round_trip(&mesh);
    let loaded = borrow_as::<Mesh>(&loaded);
    assert_eq!(
        loaded.positions.as_ref().unwrap().as_slice(),
        &[0.0, 1.5, -2.25]
    );
    assert_eq!(
        loaded.indices.as_ref().unwrap().as_slice(),
        &[0, 1, 2, 2, 1, 0]
    );
    assert_eq!(loaded.lods, vec![vec![1, 2, 3], vec![4], vec![]]);
    assert_eq!(loaded.tags, vec!["hull".to_owned(), "static".to_owned()]);
}

#[test]
fn extra_rows_beyond_declared_size_are_rejected() {
    init_logs();
    let text = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<Mesh>\n",
        "  <lods size=\"2\">\n",
        "    <array_0 size=\"1\" data=\"1\"/>\n",
        "    <array_1 size=\"1\" data=\"2\"/>\n",
        "    <array_2 size=\"1\" data=\"3\"/>\n",
        "  </lods>\n",
        "</Mesh>\n",
    );

    let err = importer().load_from_bytes(text.as_bytes()).unwrap_err();
    assert!(matches!(
        err,
        SaveError::SizeMismatch {
            declared: 2,
            actual: 3,
            ..
        }
    ));
}

#[test]
fn nested_containers_and_buffer_lists_survive() {
    init_logs();
    let shared = savable_ref(Material {
        name: "shared".into(),
        ..Material::default()
    });
    let solo = savable_ref(Material {
        name: "solo".into(),
        ..Material::default()
    });
    let atlas = savable_ref(Atlas {
        grid: vec![
            vec![Some(shared.clone()), None],
            vec![Some(solo), Some(shared.clone())],
        ],
        layers: vec![None, Some(vec![Some(shared.clone()), None])],
        tiles: vec![vec![None, Some(vec![Some(shared)])], vec![Some(vec![])]],
        mips: vec![
            FloatBuffer::from_vec(vec![1.0, 0.5]),
            FloatBuffer::from_vec(vec![]),
        ],
        masks: vec![ByteBuffer::from_vec(vec![0, 255, 7])],
    });

    let loaded = round_trip(&atlas);
    let loaded = borrow_as::<Atlas>(&loaded);

    assert_eq!(loaded.grid.len(), 2);
    assert!(loaded.grid[0][1].is_none());
    assert_eq!(
        borrow_as::<Material>(loaded.grid[1][0].as_ref().unwrap()).name,
        "solo"
    );

    // One shared instance across every container that held it.
    let shared = loaded.grid[0][0].as_ref().unwrap();
    assert!(Rc::ptr_eq(shared, loaded.grid[1][1].as_ref().unwrap()));
    assert_eq!(borrow_as::<Material>(shared).name, "shared");

    assert!(loaded.layers[0].is_none());
    let layer = loaded.layers[1].as_ref().unwrap();
    assert_eq!(layer.len(), 2);
    assert!(Rc::ptr_eq(layer[0].as_ref().unwrap(), shared));
    assert!(layer[1].is_none());

    assert!(loaded.tiles[0][0].is_none());
    let tile = loaded.tiles[0][1].as_ref().unwrap();
    assert!(Rc::ptr_eq(tile[0].as_ref().unwrap(), shared));
    assert!(loaded.tiles[1][0].as_ref().unwrap().is_empty());

    assert_eq!(loaded.mips.len(), 2);
    assert_eq!(loaded.mips[0].as_slice(), &[1.0, 0.5]);
    assert!(loaded.mips[1].as_slice().is_empty());
    assert_eq!(loaded.masks[0].as_slice(), &[0, 255, 7]);
}

#[test]
fn shared_material_decodes_to_one_instance() {
    init_logs();
    let material = savable_ref(Material {
        name: "shared".into(),
        ..Material::default()
    });
    let left = savable_ref(SceneNode {
        name: "left".into(),
        material: Some(material.clone()),
        ..SceneNode::default()
    });
    let right = savable_ref(SceneNode {
        name: "right".into(),
        material: Some(material),
        ..SceneNode::default()
    });
    let root = savable_ref(SceneNode {
        name: "root".into(),
        children: vec![Some(left), Some(right)],
        ..SceneNode::default()
    });

    let loaded = round_trip(&root);
    let loaded = borrow_as::<SceneNode>(&loaded);
    let left = borrow_as::<SceneNode>(loaded.children[0].as_ref().unwrap());
    let right = borrow_as::<SceneNode>(loaded.children[1].as_ref().unwrap());
    let a = left.material.as_ref().unwrap();
    let b = right.material.as_ref().unwrap();
    assert!(Rc::ptr_eq(a, b));
    assert_eq!(borrow_as::<Material>(a).name, "shared");
}

#[test]
fn cyclic_parent_links_resolve() {
    init_logs();
    let root = savable_ref(SceneNode {
        name: "root".into(),
        ..SceneNode::default()
    });
    let child = savable_ref(SceneNode {
        name: "child".into(),
        parent: Some(root.clone()),
        ..SceneNode::default()
    });
    root.borrow_mut()
        .as_any_mut()
        .downcast_mut::<SceneNode>()
        .unwrap()
        .children = vec![Some(child)];

    let loaded = round_trip(&root);
    {
        let node = borrow_as::<SceneNode>(&loaded);
        let child = borrow_as::<SceneNode>(node.children[0].as_ref().unwrap());
        assert!(Rc::ptr_eq(child.parent.as_ref().unwrap(), &loaded));
    }
}

#[test]
fn sparse_list_drops_gaps_and_compacts() {
    init_logs();
    let state = savable_ref(Material {
        name: "wire".into(),
        ..Material::default()
    });
    let node = savable_ref(SceneNode {
        name: "n".into(),
        states: vec![None, Some(state), None],
        ..SceneNode::default()
    });

    let loaded = round_trip(&node);
    let loaded = borrow_as::<SceneNode>(&loaded);
    assert_eq!(loaded.states.len(), 1);
    let state = loaded.states[0].as_ref().unwrap();
    assert_eq!(borrow_as::<Material>(state).name, "wire");
}

#[test]
fn savable_and_string_keyed_maps_survive() {
    init_logs();
    let key = savable_ref(Material {
        name: "key".into(),
        ..Material::default()
    });
    let value = savable_ref(Mesh::default());
    let named_value = savable_ref(Material {
        name: "named".into(),
        ..Material::default()
    });
    let mut named = IndexMap::new();
    named.insert("primary".to_owned(), named_value);
    let dict = savable_ref(Dictionary {
        pairs: vec![(key, value)],
        named,
    });

    let loaded = round_trip(&dict);
    let loaded = borrow_as::<Dictionary>(&loaded);
    assert_eq!(loaded.pairs.len(), 1);
    assert_eq!(borrow_as::<Material>(&loaded.pairs[0].0).name, "key");
    assert!(loaded.pairs[0].1.borrow().as_any().is::<Mesh>());
    assert_eq!(
        borrow_as::<Material>(&loaded.named["primary"]).name,
        "named"
    );
}

#[test]
fn heterogeneous_metadata_survives() {
    init_logs();
    let mut metadata = IndexMap::new();
    metadata.insert("visible".to_owned(), Value::Bool(true));
    metadata.insert("lod".to_owned(), Value::Int(3));
    metadata.insert("label".to_owned(), Value::Str("a<b & c".to_owned()));
    metadata.insert("weights".to_owned(), Value::FloatArray(vec![0.1, 0.9]));
    metadata.insert(
        "palette".to_owned(),
        Value::StrArray(vec!["red".into(), "blue".into()]),
    );
    metadata.insert(
        "mask".to_owned(),
        Value::BitSet(BitSet::from_indices(&[0, 9])),
    );
    let node = savable_ref(SceneNode {
        name: "meta".into(),
        metadata,
        ..SceneNode::default()
    });

    let loaded = round_trip(&node);
    let loaded = borrow_as::<SceneNode>(&loaded);
    assert!(matches!(loaded.metadata["visible"], Value::Bool(true)));
    assert_eq!(loaded.metadata["lod"].as_int(), Some(3));
    assert_eq!(loaded.metadata["label"].as_str(), Some("a<b & c"));
    assert_eq!(
        loaded.metadata["weights"].as_float_array(),
        Some(&[0.1, 0.9][..])
    );
    assert!(
        matches!(&loaded.metadata["palette"], Value::StrArray(v) if v == &["red", "blue"])
    );
    assert!(
        matches!(&loaded.metadata["mask"], Value::BitSet(b) if *b == BitSet::from_indices(&[0, 9]))
    );
}

#[test]
fn markup_characters_in_strings_survive() {
    init_logs();
    let material = savable_ref(Material {
        name: "a<b>&\"quoted\"\nsecond line\ttabbed".into(),
        ..Material::default()
    });

    let loaded = round_trip(&material);
    let loaded = borrow_as::<Material>(&loaded);
    assert_eq!(loaded.name, "a<b>&\"quoted\"\nsecond line\ttabbed");
}

#[test]
fn loading_an_unregistered_type_fails() {
    init_logs();
    let mesh = savable_ref(Mesh::default());
    let mut bytes = Vec::new();
    XmlExporter::new().save(&mesh, &mut bytes).unwrap();

    let importer = XmlImporter::new(TypeRegistry::new());
    let err = importer.load_from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, SaveError::UnknownType(name) if name == "Mesh"));
}

#[test]
fn malformed_documents_are_rejected() {
    init_logs();
    let importer = importer();
    assert!(importer.load_from_bytes(b"not xml at all <").is_err());
    assert!(matches!(
        importer.load_from_bytes(b""),
        Err(SaveError::InvalidRoot) | Err(SaveError::Xml(_))
    ));
}
