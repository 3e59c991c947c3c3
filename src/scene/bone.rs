use crate::errors::Result;
use crate::io::{BlockReader, BlockWriter};

/// Bone payload attached to a [`NodeKind::Bone`](super::NodeKind) or
/// [`NodeKind::RootBone`](super::NodeKind) node.
#[derive(Debug, Clone, Default)]
pub struct Bone {
    /// Bone length along its local x axis. Always zero for root bones.
    pub length: f32,
    is_root: bool,
    is_connected_to_mesh: bool,
}

impl Bone {
    #[must_use]
    pub fn new(length: f32) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn new_root() -> Self {
        Self {
            is_root: true,
            ..Self::default()
        }
    }

    /// Reads the bone-specific fields that follow the base node fields.
    pub fn read(reader: &mut BlockReader<'_>, is_root: bool) -> Result<Self> {
        if is_root {
            return Ok(Self::new_root());
        }
        Ok(Self::new(reader.read_f32("bone length")?))
    }

    pub fn write(&self, writer: &mut BlockWriter) -> Result<()> {
        if self.is_root {
            return Ok(());
        }
        writer.write_f32(self.length)
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Whether a skinned mesh binds to this bone. Informational only: world
    /// transforms are pulled on demand, so nothing here depends on the flag.
    #[inline]
    #[must_use]
    pub fn is_connected_to_mesh(&self) -> bool {
        self.is_connected_to_mesh
    }

    pub(crate) fn set_connected_to_mesh(&mut self, connected: bool) {
        self.is_connected_to_mesh = connected;
    }
}
