//! Path index over an XML document
//!
//! Maps slash-joined key paths to nodes. Registration is explicit: callers
//! map a root, a layer or a whole slice, and every lookup that misses the
//! map falls back to walking the tree segment by segment.
//!
//! Lock order is index then node. The index write lock is held across key
//! generation and insertion (which may detach nodes); tree mutations
//! release their node locks before the index is touched.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace, warn};

use super::key::{type_tag, AttributeKey, KeyGenerator};
use super::path::{self, DIVIDER};
use super::policy::{DuplicateKeyPolicy, Registration};
use crate::dom::{NodeId, XmlDocument, DOCUMENT_NODE};
use crate::error::{DocumentError, IndexError};

/// Path-keyed index of one document
pub struct PathIndex {
    doc: Arc<XmlDocument>,
    entries: RwLock<HashMap<String, NodeId>>,
    policy: DuplicateKeyPolicy,
    generator: Arc<dyn KeyGenerator>,
}

impl PathIndex {
    /// Index with the `None` policy and the `name`-attribute generator
    pub fn new(doc: Arc<XmlDocument>) -> Self {
        Self::with_policy(doc, DuplicateKeyPolicy::default())
    }

    pub fn with_policy(doc: Arc<XmlDocument>, policy: DuplicateKeyPolicy) -> Self {
        Self::with_generator(doc, policy, AttributeKey::default())
    }

    pub fn with_generator(
        doc: Arc<XmlDocument>,
        policy: DuplicateKeyPolicy,
        generator: impl KeyGenerator + 'static,
    ) -> Self {
        PathIndex {
            doc,
            entries: RwLock::new(HashMap::new()),
            policy,
            generator: Arc::new(generator),
        }
    }

    /// Parse a document leniently and wrap it in an empty index
    pub fn parse(input: &[u8], policy: DuplicateKeyPolicy) -> Self {
        Self::with_policy(Arc::new(XmlDocument::parse(input)), policy)
    }

    /// Load a document from disk and wrap it in an empty index
    pub fn load(file: impl AsRef<Path>, policy: DuplicateKeyPolicy) -> Result<Self, IndexError> {
        let doc = XmlDocument::load(file)?;
        Ok(Self::with_policy(Arc::new(doc), policy))
    }

    pub fn document(&self) -> &Arc<XmlDocument> {
        &self.doc
    }

    pub fn policy(&self) -> DuplicateKeyPolicy {
        self.policy
    }

    pub fn generator(&self) -> &dyn KeyGenerator {
        self.generator.as_ref()
    }

    fn entries_read(&self) -> RwLockReadGuard<'_, HashMap<String, NodeId>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_write(&self) -> RwLockWriteGuard<'_, HashMap<String, NodeId>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// Path of `node` as the `index`-th element child below `parent_path`
    ///
    /// A node whose key equals its bare type tag is anonymous and gets the
    /// positional segment `{tag}{index}`.
    pub fn get_path(&self, parent_path: &str, node: NodeId, index: usize) -> String {
        let tag = type_tag(&self.doc, node);
        let key = self.generator.generate(&self.doc, node);
        if key == tag {
            return path::join(parent_path, &path::synthetic_segment(tag, index));
        }
        if key.contains(DIVIDER) {
            warn!("key `{}` of node {} contains the path divider", key, node);
        }
        path::join(parent_path, &key)
    }

    /// Root-level path of a node (no parent path, position 0)
    pub fn path_of(&self, node: NodeId) -> String {
        self.get_path("", node, 0)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register `node` at an explicit path under the index policy
    pub fn register(&self, path: &str, node: NodeId) -> Result<Registration, IndexError> {
        let mut entries = self.entries_write();
        let outcome = self.policy.apply(&mut entries, path, node, &self.doc)?;
        trace!("register `{}` -> {}: {:?}", path, node, outcome);
        Ok(outcome)
    }

    /// Generate the child path and register it in one critical section
    fn map_child(
        &self,
        parent_path: &str,
        node: NodeId,
        index: usize,
    ) -> Result<(String, Registration), IndexError> {
        let mut entries = self.entries_write();
        let path = self.get_path(parent_path, node, index);
        let outcome = self.policy.apply(&mut entries, &path, node, &self.doc)?;
        trace!("register `{}` -> {}: {:?}", path, node, outcome);
        Ok((path, outcome))
    }

    /// Register every element child of `parent`; returns the ones still mapped afterwards
    ///
    /// Positions count live siblings only. A child detached by the policy
    /// does not take up a position, and when an earlier sibling is evicted
    /// the positional keys of the survivors are rebuilt.
    fn register_layer(
        &self,
        base: &str,
        parent: NodeId,
        layer: &[NodeId],
    ) -> Result<Vec<(NodeId, String)>, IndexError> {
        let mut mapped = Vec::with_capacity(layer.len());
        let mut position = 0;
        let mut shifted = false;
        for &child in layer {
            let (path, outcome) = self.map_child(base, child, position)?;
            match outcome {
                Registration::RemovedNew { .. } => {
                    shifted = true;
                    continue;
                }
                Registration::RemovedOld { previous } if layer.contains(&previous) => shifted = true,
                _ => {}
            }
            position += 1;
            if outcome.is_mapped() {
                mapped.push((child, path));
            }
        }
        if shifted {
            mapped = self.rekey_layer(base, parent, mapped)?;
        }

        // A later sibling may have evicted an earlier one under RemoveOld
        let entries = self.entries_read();
        mapped.retain(|(child, path)| entries.get(path) == Some(child));
        Ok(mapped)
    }

    /// Move mapped children whose position changed to their current positional path
    fn rekey_layer(
        &self,
        base: &str,
        parent: NodeId,
        mapped: Vec<(NodeId, String)>,
    ) -> Result<Vec<(NodeId, String)>, IndexError> {
        let mut rekeyed = Vec::with_capacity(mapped.len());
        for (i, child) in self.doc.elements(parent).into_iter().enumerate() {
            let Some((_, old_path)) = mapped.iter().find(|(c, _)| *c == child) else {
                continue;
            };
            let mut entries = self.entries_write();
            let path = self.get_path(base, child, i);
            if path == *old_path {
                rekeyed.push((child, path));
                continue;
            }
            if entries.get(old_path) == Some(&child) {
                entries.remove(old_path);
            }
            let outcome = self.policy.apply(&mut entries, &path, child, &self.doc)?;
            trace!("rekey `{}` -> `{}` for {}: {:?}", old_path, path, child, outcome);
            if outcome.is_mapped() {
                rekeyed.push((child, path));
            }
        }
        Ok(rekeyed)
    }

    /// Register a node at its root-level path
    pub fn map_root(&self, root: NodeId) -> Result<(String, Registration), IndexError> {
        let path = self.path_of(root);
        let outcome = self.register(&path, root)?;
        Ok((path, outcome))
    }

    /// Register the element children of `root`
    ///
    /// With `use_blank_path` the children are keyed as top-level paths,
    /// otherwise below the root's own path. Returns how many children are
    /// mapped afterwards.
    pub fn map_layer(&self, root: NodeId, use_blank_path: bool) -> Result<usize, IndexError> {
        self.map_layer_with(root, use_blank_path, false)
    }

    /// [`map_layer`](Self::map_layer), optionally registering the root as well
    pub fn map_layer_with(
        &self,
        root: NodeId,
        use_blank_path: bool,
        include_root: bool,
    ) -> Result<usize, IndexError> {
        let root_path = self.path_of(root);
        let layer = self.doc.elements(root);
        if layer.is_empty() {
            return Err(IndexError::EmptyLayer(root_path));
        }

        let mut count = 0;
        if include_root && self.register(&root_path, root)?.is_mapped() {
            count += 1;
        }
        let base = if use_blank_path { String::new() } else { root_path };
        count += self.register_layer(&base, root, &layer)?.len();
        debug!("mapped layer of node {} below `{}`: {} entries", root, base, count);
        Ok(count)
    }

    /// Register the element children of the node at `path`, keyed below `path`
    pub fn map_layer_at(&self, path: &str, use_blank_path: bool) -> Result<usize, IndexError> {
        let root = self.resolve(path)?;
        let layer = self.doc.elements(root);
        if layer.is_empty() {
            return Err(IndexError::EmptyLayer(path.to_owned()));
        }
        let base = if use_blank_path { "" } else { path };
        Ok(self.register_layer(base, root, &layer)?.len())
    }

    /// Descend from the root element by sibling positions and register the final layer
    ///
    /// The first position selects from the single-node layer holding the
    /// root element. Paths compose from the root's own key. With
    /// `map_ancestors` every node on the way down is registered too.
    pub fn map_layer_by_position(
        &self,
        positions: &[usize],
        map_ancestors: bool,
    ) -> Result<usize, IndexError> {
        let root = self
            .doc
            .root_element_id()
            .ok_or_else(|| IndexError::PathNotFound(String::new()))?;

        let mut parent = DOCUMENT_NODE;
        let mut layer = vec![root];
        let mut base = String::new();
        let mut count = 0;
        for &position in positions {
            let Some(&picked) = layer.get(position) else {
                return Err(IndexError::PathNotFound(path::join(
                    &base,
                    &format!("[{}]", position),
                )));
            };
            let picked_path = self.get_path(&base, picked, position);
            if map_ancestors && self.register(&picked_path, picked)?.is_mapped() {
                count += 1;
            }
            base = picked_path;
            parent = picked;
            layer = self.doc.elements(picked);
        }

        if layer.is_empty() {
            return Err(IndexError::EmptyLayer(base));
        }
        count += self.register_layer(&base, parent, &layer)?.len();
        Ok(count)
    }

    /// Register `root`'s element descendants down to `depth` levels (unbounded if `None`)
    ///
    /// The top layer is keyed blank or below the root's path; deeper layers
    /// below their parent's registered path. Only nodes that end up mapped
    /// are descended into. A depth of zero registers nothing.
    pub fn map_slice(
        &self,
        root: NodeId,
        depth: Option<usize>,
        use_blank_path: bool,
    ) -> Result<usize, IndexError> {
        let base = if use_blank_path { String::new() } else { self.path_of(root) };
        self.map_subtree(root, base, depth)
    }

    /// [`map_slice`](Self::map_slice) starting at the node resolved from `path`
    pub fn map_slice_at(
        &self,
        path: &str,
        depth: Option<usize>,
        use_blank_path: bool,
    ) -> Result<usize, IndexError> {
        let root = self.resolve(path)?;
        let base = if use_blank_path { String::new() } else { path.to_owned() };
        self.map_subtree(root, base, depth)
    }

    /// Register every element below the root element, top layer at blank paths
    pub fn map_all(&self) -> Result<usize, IndexError> {
        match self.doc.root_element_id() {
            Some(root) => {
                let count = self.map_slice(root, None, true)?;
                debug!("mapped {} paths", count);
                Ok(count)
            }
            None => Ok(0),
        }
    }

    fn map_subtree(
        &self,
        root: NodeId,
        base: String,
        depth: Option<usize>,
    ) -> Result<usize, IndexError> {
        let mut count = 0;
        let mut stack = vec![(root, base, depth)];
        while let Some((node, base, depth)) = stack.pop() {
            if depth == Some(0) {
                continue;
            }
            let layer = self.doc.elements(node);
            let mapped = self.register_layer(&base, node, &layer)?;
            count += mapped.len();
            let next = depth.map(|d| d - 1);
            stack.extend(mapped.into_iter().rev().map(|(child, path)| (child, path, next)));
        }
        Ok(count)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Resolve a path from the document's root element
    pub fn navigate_to(&self, path: &str) -> Option<NodeId> {
        let root = self.doc.root_element_id()?;
        self.navigate_within(path, root)
    }

    /// Resolve a path from an explicit working root
    pub fn navigate_within(&self, path: &str, working_root: NodeId) -> Option<NodeId> {
        self.navigate_from(path, working_root, self.generator.as_ref())
    }

    /// Resolve a path from a working root with a caller-supplied generator
    ///
    /// A registered path answers directly. Otherwise each segment picks the
    /// element child it names: a synthetic `{tag}{n}` segment selects the
    /// n-th element child when that child is anonymous, anything else is
    /// matched against the children's generated keys in order.
    pub fn navigate_from(
        &self,
        path: &str,
        working_root: NodeId,
        generator: &dyn KeyGenerator,
    ) -> Option<NodeId> {
        if let Some(hit) = self.lookup(path) {
            return Some(hit);
        }
        trace!("index miss for `{}`, walking from node {}", path, working_root);
        path::segments(path)
            .try_fold(working_root, |current, segment| self.find_child(current, segment, generator))
    }

    fn find_child(&self, parent: NodeId, segment: &str, generator: &dyn KeyGenerator) -> Option<NodeId> {
        let children = self.doc.elements(parent);
        if let Some((tag, i)) = path::parse_synthetic(segment) {
            if let Some(&child) = children.get(i) {
                let child_tag = type_tag(&self.doc, child);
                if child_tag == tag && generator.generate(&self.doc, child) == child_tag {
                    return Some(child);
                }
            }
        }
        let found = children
            .into_iter()
            .find(|&child| generator.generate(&self.doc, child) == segment);
        if found.is_none() {
            trace!("no child of node {} matches segment `{}`", parent, segment);
        }
        found
    }

    fn resolve(&self, path: &str) -> Result<NodeId, IndexError> {
        self.navigate_to(path)
            .ok_or_else(|| IndexError::PathNotFound(path.to_owned()))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Registered node at exactly `path`, without walking the tree
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        self.entries_read().get(path).copied()
    }

    /// True if the path resolves, registered or not
    pub fn path_exists(&self, path: &str) -> bool {
        self.navigate_to(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries_read().is_empty()
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries_read().keys().cloned().collect();
        paths.sort_unstable();
        paths
    }

    /// Drop a registration; the tree is not touched
    pub fn unmap(&self, path: &str) -> Option<NodeId> {
        self.entries_write().remove(path)
    }

    pub fn clear(&self) {
        self.entries_write().clear();
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Swap the node at `path` for the detached `replacement`
    ///
    /// The replacement always takes over the path whatever the policy, and
    /// registrations below the old node are dropped. Returns the old node,
    /// now detached.
    pub fn replace_element(&self, path: &str, replacement: NodeId) -> Result<NodeId, IndexError> {
        let target = self.replace_target(path)?;
        self.doc
            .replace_node(target, replacement)
            .map_err(|err| match err {
                DocumentError::Orphan(_) => IndexError::NoParent(path.to_owned()),
                other => other.into(),
            })?;

        let mut entries = self.entries_write();
        let before = entries.len();
        entries.retain(|key, _| !path::is_below(key, path));
        DuplicateKeyPolicy::Reset.apply(&mut entries, path, replacement, &self.doc)?;
        debug!(
            "replaced node {} at `{}` with {}, dropped {} stale paths",
            target,
            path,
            replacement,
            before.saturating_sub(entries.len())
        );
        Ok(target)
    }

    fn replace_target(&self, path: &str) -> Result<NodeId, IndexError> {
        let target = self.resolve(path)?;
        if self.doc.parent_element(target).is_none() {
            return Err(IndexError::NoParent(path.to_owned()));
        }
        Ok(target)
    }

    /// [`replace_element`](Self::replace_element) with a replacement parsed from XML
    ///
    /// The path is checked before the fragment is parsed, so a failed call
    /// leaves the arena untouched.
    pub fn replace_with_xml(&self, path: &str, fragment: &[u8]) -> Result<NodeId, IndexError> {
        self.replace_target(path)?;
        let replacement = self.parse_fragment_element(path, fragment)?;
        self.replace_element(path, replacement)
    }

    /// Append the detached `child` as the last child of the node at `path`
    ///
    /// The child is not registered.
    pub fn append_element(&self, path: &str, child: NodeId) -> Result<NodeId, IndexError> {
        let target = self.resolve(path)?;
        self.doc.append_child(target, child)?;
        Ok(target)
    }

    /// [`append_element`](Self::append_element) with a child parsed from XML; returns the child
    pub fn append_xml(&self, path: &str, fragment: &[u8]) -> Result<NodeId, IndexError> {
        let target = self.resolve(path)?;
        let child = self.parse_fragment_element(path, fragment)?;
        self.doc.append_child(target, child)?;
        Ok(child)
    }

    fn parse_fragment_element(&self, path: &str, fragment: &[u8]) -> Result<NodeId, IndexError> {
        self.doc
            .parse_element(fragment)
            .ok_or_else(|| IndexError::InvalidFragment(path.to_owned()))
    }

    /// Detached deep copy of the node at `path`
    pub fn copy_element(&self, path: &str) -> Result<NodeId, IndexError> {
        let target = self.resolve(path)?;
        Ok(self.doc.deep_copy(target)?)
    }

    /// XML of the node at `path`, serialized in place
    pub fn element_xml(&self, path: &str) -> Result<String, IndexError> {
        let target = self.resolve(path)?;
        Ok(self.doc.to_xml(target))
    }
}
