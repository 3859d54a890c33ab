//! Resource types handed to the BEAM
//!
//! Persistent state shared with the BEAM: one path index per parsed document.

use rustler::ResourceArc;

use crate::index::{DuplicateKeyPolicy, PathIndex};

/// The index and document carry their own locks, so NIF calls on the same
/// resource run concurrently without an outer mutex.
pub struct IndexResource {
    pub index: PathIndex,
}

impl IndexResource {
    /// Parse leniently and wrap the document in an empty index
    pub fn parse(input: &[u8], policy: DuplicateKeyPolicy) -> Self {
        IndexResource {
            index: PathIndex::parse(input, policy),
        }
    }

    /// Wrap an index built elsewhere (used by parse_strict)
    pub fn from_index(index: PathIndex) -> Self {
        IndexResource { index }
    }
}

#[rustler::resource_impl]
impl rustler::Resource for IndexResource {}

pub type IndexRef = ResourceArc<IndexResource>;
