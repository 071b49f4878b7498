//! # Wire Data Types
//!
//! Value types with a dedicated wire representation: bit sets, fixed-size
//! numeric buffers, and the [`Value`] tagged union used for heterogeneous
//! string-keyed maps.

mod bitset;
mod buffer;
mod value;

pub use bitset::BitSet;
pub use buffer::{Buffer, ByteBuffer, FloatBuffer, IntBuffer, ShortBuffer};
pub use value::{TypeTag, Value};
