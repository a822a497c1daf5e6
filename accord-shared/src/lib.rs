#![warn(rust_2018_idioms)]

pub mod error;
pub mod marshal;
pub mod serial;
pub mod transport;
pub mod util;

pub use transport::{TaggedBytesMut, Transport, TransportContext, TransportMessage};
