//! Binary block streams.
//!
//! Actor files are a flat sequence of blocks, each a `u8` type tag, a `u32`
//! payload length and the payload. Blocks nest: the nodes block holds one
//! block per node.

pub mod block_reader;
pub mod block_writer;

pub use block_reader::{Block, BlockReader};
pub use block_writer::BlockWriter;
