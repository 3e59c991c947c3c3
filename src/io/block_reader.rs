use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::Affine2;

use crate::errors::{Result, Skin2dError};
use crate::math::AFFINE_COMPONENTS;

/// One length-delimited block: a type tag followed by a bounded payload.
#[derive(Debug)]
pub struct Block<'a> {
    /// Raw block type tag.
    pub kind: u8,
    /// Reader bounded to exactly this block's payload.
    pub reader: BlockReader<'a>,
}

/// Sequential little-endian reader over an already buffered block.
///
/// Every read checks the remaining length first, so a node's reads can never
/// run past its own block and array reads never allocate for counts the block
/// cannot back.
#[derive(Debug, Clone)]
pub struct BlockReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BlockReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Bytes left in this block.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len() - self.position()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    fn ensure(&self, needed: usize, context: &'static str) -> Result<()> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(Skin2dError::UnexpectedEof {
                context,
                needed,
                remaining,
            });
        }
        Ok(())
    }

    fn array_len(&self, count: usize, width: usize, context: &'static str) -> Result<usize> {
        let needed = count.checked_mul(width).unwrap_or(usize::MAX);
        self.ensure(needed, context)?;
        Ok(needed)
    }

    // ========================================================================
    // Primitives
    // ========================================================================

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        self.ensure(1, context)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u16(&mut self, context: &'static str) -> Result<u16> {
        self.ensure(2, context)?;
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        self.ensure(4, context)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self, context: &'static str) -> Result<f32> {
        self.ensure(4, context)?;
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    /// Reads `len` raw bytes without copying.
    pub fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        self.ensure(len, context)?;
        let data: &'a [u8] = *self.cursor.get_ref();
        let start = self.position();
        let bytes = &data[start..start + len];
        self.cursor.set_position((start + len) as u64);
        Ok(bytes)
    }

    /// Reads a `u32` byte length followed by UTF-8 text.
    pub fn read_string(&mut self, context: &'static str) -> Result<String> {
        let len = self.read_u32(context)? as usize;
        let bytes = self.read_bytes(len, context)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Skin2dError::InvalidUtf8 { context })
    }

    /// Reads six floats as a packed 2×3 affine matrix.
    pub fn read_affine(&mut self, context: &'static str) -> Result<Affine2> {
        let mut cols = [0.0f32; AFFINE_COMPONENTS];
        self.ensure(AFFINE_COMPONENTS * 4, context)?;
        self.cursor.read_f32_into::<LittleEndian>(&mut cols)?;
        Ok(Affine2::from_cols_array(&cols))
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    pub fn read_f32_array(&mut self, count: usize, context: &'static str) -> Result<Vec<f32>> {
        self.array_len(count, 4, context)?;
        let mut out = vec![0.0f32; count];
        self.cursor.read_f32_into::<LittleEndian>(&mut out)?;
        Ok(out)
    }

    pub fn read_u16_array(&mut self, count: usize, context: &'static str) -> Result<Vec<u16>> {
        self.array_len(count, 2, context)?;
        let mut out = vec![0u16; count];
        self.cursor.read_u16_into::<LittleEndian>(&mut out)?;
        Ok(out)
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Reads the next nested block, or `None` once this block is exhausted.
    pub fn read_block(&mut self) -> Result<Option<Block<'a>>> {
        if self.is_empty() {
            return Ok(None);
        }
        let kind = self.read_u8("block type")?;
        let len = self.read_u32("block length")? as usize;
        let payload = self.read_bytes(len, "block payload")?;
        Ok(Some(Block {
            kind,
            reader: BlockReader::new(payload),
        }))
    }
}
