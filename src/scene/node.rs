use glam::{Affine2, Vec2};

use crate::errors::Result;
use crate::io::{BlockReader, BlockWriter};
use crate::scene::NodeHandle;
use crate::scene::transform::Transform2D;

/// Node variant tag, read from the block type before choosing a deserializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Plain transform node.
    Node,
    /// Bone with a length.
    Bone,
    /// Root of a bone chain.
    RootBone,
    /// Skinned textured mesh.
    Mesh,
}

impl NodeKind {
    /// Maps a node block type to its variant. Unknown tags return `None`.
    #[must_use]
    pub fn from_block_type(kind: u8) -> Option<Self> {
        match kind {
            2 => Some(Self::Node),
            3 => Some(Self::Bone),
            4 => Some(Self::RootBone),
            5 => Some(Self::Mesh),
            _ => None,
        }
    }

    #[must_use]
    pub fn block_type(self) -> u8 {
        match self {
            Self::Node => 2,
            Self::Bone => 3,
            Self::RootBone => 4,
            Self::Mesh => 5,
        }
    }
}

/// Shared scene node payload: name, hierarchy links and transform.
///
/// Variant data (bones, meshes) lives in the owning [`Actor`](super::Actor)'s
/// component maps keyed by the same [`NodeHandle`]; the node only carries the
/// [`NodeKind`] tag.
///
/// # Hierarchy
///
/// - `parent_index`: raw flat-array index as read from the stream
/// - `parent` / `children`: live handles, linked during reference resolution
///
/// # Override world transform
///
/// Skinned meshes carry an authoring-time world transform that replaces the
/// hierarchical one, so their bone-relative vertices are not re-parented.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform2D,
    pub opacity: f32,
    pub is_collapsed: bool,

    pub(crate) kind: NodeKind,
    pub(crate) parent_index: Option<u16>,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) override_world: Option<Affine2>,

    // Pull-evaluation bookkeeping, see `Hierarchy::world_transform`.
    pub(crate) world_epoch: u64,
    pub(crate) parent_epoch_seen: u64,
}

impl Node {
    #[must_use]
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform2D::new(),
            opacity: 1.0,
            is_collapsed: false,
            kind,
            parent_index: None,
            parent: None,
            children: Vec::new(),
            override_world: None,
            world_epoch: 0,
            parent_epoch_seen: 0,
        }
    }

    /// Reads the base node fields shared by every variant.
    pub fn read(reader: &mut BlockReader<'_>, kind: NodeKind) -> Result<Self> {
        let mut node = Self::new("", kind);
        node.read_base(reader)?;
        Ok(node)
    }

    /// Populates the base fields of an existing node in place.
    pub fn read_base(&mut self, reader: &mut BlockReader<'_>) -> Result<()> {
        self.name = reader.read_string("node name")?;
        self.parent_index = Some(reader.read_u16("parent index")?);

        let tx = reader.read_f32("translation")?;
        let ty = reader.read_f32("translation")?;
        let rotation = reader.read_f32("rotation")?;
        let sx = reader.read_f32("scale")?;
        let sy = reader.read_f32("scale")?;
        self.transform = Transform2D::from_trs(Vec2::new(tx, ty), rotation, Vec2::new(sx, sy));

        self.opacity = reader.read_f32("opacity")?;
        self.is_collapsed = reader.read_u8("collapsed flag")? != 0;
        Ok(())
    }

    /// Writes the base node fields; `parent_index` is the parent's flat index.
    pub fn write_base(&self, parent_index: u16, writer: &mut BlockWriter) -> Result<()> {
        writer.write_string(&self.name)?;
        writer.write_u16(parent_index)?;
        writer.write_f32(self.transform.translation.x)?;
        writer.write_f32(self.transform.translation.y)?;
        writer.write_f32(self.transform.rotation)?;
        writer.write_f32(self.transform.scale.x)?;
        writer.write_f32(self.transform.scale.y)?;
        writer.write_f32(self.opacity)?;
        writer.write_u8(u8::from(self.is_collapsed))
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Raw parent index from the stream, before resolution.
    #[inline]
    #[must_use]
    pub fn parent_index(&self) -> Option<u16> {
        self.parent_index
    }

    #[inline]
    #[must_use]
    pub fn override_world_transform(&self) -> Option<&Affine2> {
        self.override_world.as_ref()
    }

    /// Pins the world transform, bypassing the parent chain.
    pub fn set_override_world_transform(&mut self, mat: Option<Affine2>) {
        self.override_world = mat;
        self.transform.mark_dirty();
    }
}
