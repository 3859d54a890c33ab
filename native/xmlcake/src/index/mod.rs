//! Path Index Module
//!
//! Addresses nodes of a mutable [`XmlDocument`](crate::dom::XmlDocument) by
//! slash-joined key paths:
//!
//! ```text
//! <catalog>
//!   <section name="fiction">     fiction
//!     <book name="dune"/>        fiction/dune
//!     <book/>                    fiction/Element1
//!   </section>
//! </catalog>
//! ```
//!
//! - **Keys**: a pluggable [`KeyGenerator`] names each node; anonymous nodes
//!   get a positional `{typeTag}{siblingIndex}` segment.
//! - **Registration**: explicit, by root, layer or slice, with a
//!   [`DuplicateKeyPolicy`] deciding collisions.
//! - **Navigation**: a registered path answers from the map, anything else
//!   is resolved by walking the tree.

pub mod key;
pub mod path;
pub mod path_index;
pub mod policy;

pub use key::{default_key, AttributeKey, KeyGenerator, DEFAULT_KEY_ATTRIBUTE};
pub use path::DIVIDER;
pub use path_index::PathIndex;
pub use policy::{DuplicateKeyPolicy, Registration};
