//! Mutable arena document
//!
//! Nodes live in one arena behind per-node mutexes and point at each other
//! by `NodeId`. Names, values and text are interned in a shared pool.

pub mod document;
pub mod node;
pub mod serialize;
pub mod strings;

pub use document::XmlDocument;
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
pub use strings::StringPool;
