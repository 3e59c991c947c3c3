use byteorder::{LittleEndian, WriteBytesExt};
use glam::Affine2;

use crate::errors::Result;

/// Little-endian writer producing the layout [`BlockReader`](super::BlockReader) consumes.
#[derive(Debug, Default)]
pub struct BlockWriter {
    buf: Vec<u8>,
}

impl BlockWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.buf.write_u8(value)?;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.buf.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_u32(value.len() as u32)?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    pub fn write_affine(&mut self, mat: &Affine2) -> Result<()> {
        self.write_f32_array(&mat.to_cols_array())
    }

    pub fn write_f32_array(&mut self, values: &[f32]) -> Result<()> {
        for &v in values {
            self.write_f32(v)?;
        }
        Ok(())
    }

    pub fn write_u16_array(&mut self, values: &[u16]) -> Result<()> {
        for &v in values {
            self.write_u16(v)?;
        }
        Ok(())
    }

    /// Writes a nested block: the type tag, the payload length, then whatever
    /// `body` writes.
    pub fn write_block<F>(&mut self, kind: u8, body: F) -> Result<()>
    where
        F: FnOnce(&mut BlockWriter) -> Result<()>,
    {
        let mut inner = BlockWriter::new();
        body(&mut inner)?;
        self.write_u8(kind)?;
        self.write_u32(inner.len() as u32)?;
        self.write_bytes(&inner.buf);
        Ok(())
    }
}
