//! Duplicate-key resolution
//!
//! Applied whenever a key is about to be registered. Re-registering the
//! node a key already maps to is never a collision.

use std::collections::HashMap;

use log::debug;

use super::path;
use crate::dom::{NodeId, XmlDocument};
use crate::error::IndexError;

/// What to do when a key already maps to a different node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DuplicateKeyPolicy {
    /// Refuse with [`IndexError::KeyCollision`]
    #[default]
    None,
    /// Keep the existing mapping, leave the new node unmapped
    Ignore,
    /// Map the key to the new node; the old node stays in the tree
    Reset,
    /// Detach the old node from the tree, drop the paths below it and map the new one
    RemoveOld,
    /// Detach the new node from the tree and keep the existing mapping
    RemoveNew,
}

impl DuplicateKeyPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "ignore" => Some(Self::Ignore),
            "reset" => Some(Self::Reset),
            "remove_old" => Some(Self::RemoveOld),
            "remove_new" => Some(Self::RemoveNew),
            _ => Option::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ignore => "ignore",
            Self::Reset => "reset",
            Self::RemoveOld => "remove_old",
            Self::RemoveNew => "remove_new",
        }
    }

    /// Register `node` at `key`, resolving a collision with this policy
    ///
    /// Callers hold the index write lock across key generation and this call.
    pub(crate) fn apply(
        self,
        entries: &mut HashMap<String, NodeId>,
        key: &str,
        node: NodeId,
        doc: &XmlDocument,
    ) -> Result<Registration, IndexError> {
        let existing = match entries.get(key) {
            Some(&existing) if existing == node => return Ok(Registration::Unchanged),
            Some(&existing) => existing,
            Option::None => {
                entries.insert(key.to_owned(), node);
                return Ok(Registration::Inserted);
            }
        };

        debug!(
            "key `{}` already maps to node {}, resolving node {} with {:?}",
            key, existing, node, self
        );
        match self {
            Self::None => Err(IndexError::KeyCollision(key.to_owned())),
            Self::Ignore => Ok(Registration::Ignored { existing }),
            Self::Reset => {
                entries.insert(key.to_owned(), node);
                Ok(Registration::Overwritten { previous: existing })
            }
            Self::RemoveOld => {
                doc.detach(existing);
                entries.retain(|other, _| !path::is_below(other, key));
                entries.insert(key.to_owned(), node);
                Ok(Registration::RemovedOld { previous: existing })
            }
            Self::RemoveNew => {
                doc.detach(node);
                Ok(Registration::RemovedNew { existing })
            }
        }
    }
}

/// Outcome of a single registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// The key already mapped to this node
    Unchanged,
    Overwritten { previous: NodeId },
    Ignored { existing: NodeId },
    RemovedOld { previous: NodeId },
    RemovedNew { existing: NodeId },
}

impl Registration {
    /// True if the key now maps to the node that was registered
    pub fn is_mapped(&self) -> bool {
        matches!(
            self,
            Registration::Inserted
                | Registration::Unchanged
                | Registration::Overwritten { .. }
                | Registration::RemovedOld { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_siblings() -> (XmlDocument, NodeId, NodeId) {
        let doc = XmlDocument::parse(b"<root><a/><b/></root>");
        let layer = doc.elements(doc.root_element_id().unwrap());
        (doc, layer[0], layer[1])
    }

    #[test]
    fn test_insert_and_unchanged() {
        let (doc, a, _) = two_siblings();
        let mut entries = HashMap::new();
        for policy in [DuplicateKeyPolicy::None, DuplicateKeyPolicy::RemoveNew] {
            entries.clear();
            assert_eq!(policy.apply(&mut entries, "k", a, &doc).unwrap(), Registration::Inserted);
            assert_eq!(policy.apply(&mut entries, "k", a, &doc).unwrap(), Registration::Unchanged);
        }
    }

    #[test]
    fn test_none_rejects() {
        let (doc, a, b) = two_siblings();
        let mut entries = HashMap::from([("k".to_string(), a)]);
        let err = DuplicateKeyPolicy::None.apply(&mut entries, "k", b, &doc).unwrap_err();
        assert!(matches!(err, IndexError::KeyCollision(ref k) if k == "k"));
        assert_eq!(entries["k"], a);
    }

    #[test]
    fn test_ignore_and_reset() {
        let (doc, a, b) = two_siblings();
        let mut entries = HashMap::from([("k".to_string(), a)]);
        let outcome = DuplicateKeyPolicy::Ignore.apply(&mut entries, "k", b, &doc).unwrap();
        assert_eq!(outcome, Registration::Ignored { existing: a });
        assert!(!outcome.is_mapped());
        assert_eq!(entries["k"], a);

        let outcome = DuplicateKeyPolicy::Reset.apply(&mut entries, "k", b, &doc).unwrap();
        assert_eq!(outcome, Registration::Overwritten { previous: a });
        assert_eq!(entries["k"], b);
        assert!(doc.parent(a).is_some());
    }

    #[test]
    fn test_remove_old_detaches_existing() {
        let (doc, a, b) = two_siblings();
        let root = doc.root_element_id().unwrap();
        let mut entries = HashMap::from([("k".to_string(), a)]);
        let outcome = DuplicateKeyPolicy::RemoveOld.apply(&mut entries, "k", b, &doc).unwrap();
        assert!(outcome.is_mapped());
        assert_eq!(entries["k"], b);
        assert_eq!(doc.parent(a), None);
        assert_eq!(doc.elements(root), vec![b]);
    }

    #[test]
    fn test_remove_old_drops_paths_below() {
        let (doc, a, b) = two_siblings();
        let mut entries = HashMap::from([
            ("k".to_string(), a),
            ("k/child".to_string(), 7),
            ("k/child/leaf".to_string(), 8),
            ("kin".to_string(), 9),
        ]);
        DuplicateKeyPolicy::RemoveOld.apply(&mut entries, "k", b, &doc).unwrap();
        let mut keys: Vec<_> = entries.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["k", "kin"]);
        assert_eq!(entries["k"], b);
    }

    #[test]
    fn test_remove_new_detaches_incoming() {
        let (doc, a, b) = two_siblings();
        let root = doc.root_element_id().unwrap();
        let mut entries = HashMap::from([("k".to_string(), a)]);
        let outcome = DuplicateKeyPolicy::RemoveNew.apply(&mut entries, "k", b, &doc).unwrap();
        assert_eq!(outcome, Registration::RemovedNew { existing: a });
        assert_eq!(entries["k"], a);
        assert_eq!(doc.parent(b), None);
        assert_eq!(doc.elements(root), vec![a]);
    }

    #[test]
    fn test_names() {
        for policy in [
            DuplicateKeyPolicy::None,
            DuplicateKeyPolicy::Ignore,
            DuplicateKeyPolicy::Reset,
            DuplicateKeyPolicy::RemoveOld,
            DuplicateKeyPolicy::RemoveNew,
        ] {
            assert_eq!(DuplicateKeyPolicy::from_name(policy.name()), Some(policy));
        }
        assert_eq!(DuplicateKeyPolicy::from_name("bogus"), None);
    }
}
