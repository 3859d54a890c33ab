//! Pull reader over an in-memory document
//!
//! `SliceReader` yields `XmlEvent`s that borrow from the input.

pub mod events;
pub mod slice;

pub use events::{Tag, XmlEvent};
pub use slice::{ReadError, SliceReader};
