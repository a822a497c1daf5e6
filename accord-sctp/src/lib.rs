#![warn(rust_2018_idioms)]

pub mod chunk;
pub mod packet;
pub mod ppi;

pub use chunk::{Chunk, ChunkPayloadData, ChunkType};
pub use packet::Packet;
pub use ppi::PayloadProtocolIdentifier;
