//! XML Document - Arena-based mutable DOM
//!
//! Nodes live in an append-only arena addressed by [`NodeId`]. Every slot
//! carries its own mutex so structural edits on disjoint subtrees proceed in
//! parallel:
//!
//! - the arena vector lock is held only long enough to fetch or push a slot
//! - a node lock is never held while acquiring the string pool lock
//! - when two tree nodes are locked together the parent is always locked first
//! - a node being inserted is claimed (its parent link set) under its own
//!   lock alone, before any tree node is locked
//!
//! Detached nodes keep their slot; ids are never reused.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
use super::strings::StringPool;
use crate::core::scanner::is_whitespace;
use crate::error::DocumentError;
use crate::reader::events::{Tag, XmlEvent};
use crate::reader::slice::SliceReader;

type Slot = Arc<Mutex<XmlNode>>;

#[inline]
fn lock_node(slot: &Mutex<XmlNode>) -> MutexGuard<'_, XmlNode> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An XML document stored in arena format
pub struct XmlDocument {
    /// Arena of nodes; slot 0 is the document node
    nodes: RwLock<Vec<Slot>>,
    /// Interned names, values and text
    strings: RwLock<StringPool>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Create an empty document holding only the document node
    pub fn new() -> Self {
        XmlDocument {
            nodes: RwLock::new(vec![Arc::new(Mutex::new(XmlNode::document()))]),
            strings: RwLock::new(StringPool::new()),
        }
    }

    /// Parse an XML document from a byte slice (lenient mode, never fails)
    pub fn parse(input: &[u8]) -> Self {
        let doc = XmlDocument::new();
        let mut reader = SliceReader::new(input);
        // Lenient building has no failure path
        if let Ok(top) = doc.build(&mut reader, false, true) {
            doc.adopt_top_level(top);
        }
        doc
    }

    /// Parse an XML document in strict mode
    ///
    /// Rejects mismatched or unclosed tags, multiple root elements, and
    /// character data outside the root element.
    pub fn parse_strict(input: &[u8]) -> Result<Self, DocumentError> {
        let doc = XmlDocument::new();
        let mut reader = SliceReader::new_strict(input);
        let top = doc.build(&mut reader, true, true)?;
        doc.adopt_top_level(top);
        Ok(doc)
    }

    /// Read and parse a document from a file (lenient mode)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let input = std::fs::read(path)?;
        Ok(Self::parse(&input))
    }

    /// Parse a fragment into detached nodes of this document
    ///
    /// Returns the top-level nodes in document order. None of them has a
    /// parent; link them with [`XmlDocument::append_child`] or
    /// [`XmlDocument::replace_node`].
    pub fn parse_fragment(&self, input: &[u8]) -> Vec<NodeId> {
        let mut reader = SliceReader::new(input);
        self.build(&mut reader, false, false).unwrap_or_default()
    }

    /// Parse a fragment and return its first top-level element
    pub fn parse_element(&self, input: &[u8]) -> Option<NodeId> {
        self.parse_fragment(input)
            .into_iter()
            .find(|&id| self.kind(id) == Some(NodeKind::Element))
    }

    // =========================================================================
    // Arena plumbing
    // =========================================================================

    fn nodes_read(&self) -> RwLockReadGuard<'_, Vec<Slot>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn nodes_write(&self) -> RwLockWriteGuard<'_, Vec<Slot>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn strings_write(&self) -> RwLockWriteGuard<'_, StringPool> {
        self.strings.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the string pool under a shared lock
    pub fn with_strings<R>(&self, f: impl FnOnce(&StringPool) -> R) -> R {
        let pool = self.strings.read().unwrap_or_else(PoisonError::into_inner);
        f(&pool)
    }

    fn slot(&self, id: NodeId) -> Option<Slot> {
        self.nodes_read().get(id as usize).cloned()
    }

    fn ensure(&self, id: NodeId) -> Result<Slot, DocumentError> {
        self.slot(id).ok_or(DocumentError::UnknownNode(id))
    }

    fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&XmlNode) -> R) -> Option<R> {
        let slot = self.slot(id)?;
        let node = lock_node(&slot);
        Some(f(&node))
    }

    fn with_node_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut XmlNode) -> R) -> Option<R> {
        let slot = self.slot(id)?;
        let mut node = lock_node(&slot);
        Some(f(&mut node))
    }

    fn push_node(&self, node: XmlNode) -> NodeId {
        let mut nodes = self.nodes_write();
        let id = nodes.len() as NodeId;
        nodes.push(Arc::new(Mutex::new(node)));
        id
    }

    fn resolve(&self, string_id: u32) -> Option<String> {
        self.with_strings(|pool| pool.get(string_id).map(str::to_owned))
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Build nodes from reader events into a private buffer, then publish
    /// them to the arena in one push. Returns the top-level node ids.
    fn build(
        &self,
        reader: &mut SliceReader<'_>,
        strict: bool,
        whole_document: bool,
    ) -> Result<Vec<NodeId>, DocumentError> {
        let mut pool = self.strings_write();
        let mut builder = TreeBuilder {
            pool: &mut pool,
            nodes: Vec::with_capacity(256),
            stack: Vec::new(),
            tag_stack: Vec::new(),
            top: Vec::new(),
            seen_root: false,
            strict: strict && whole_document,
        };

        while let Some(event) = reader.next_event() {
            builder
                .handle(event)
                .map_err(|message| DocumentError::Parse { message, position: reader.offset() })?;
        }

        if strict {
            if let Some(err) = reader.error() {
                return Err(DocumentError::Parse { message: err.message.clone(), position: err.position });
            }
            if let Some(unclosed) = builder.tag_stack.first() {
                return Err(DocumentError::Parse {
                    message: format!("Unclosed tag: <{}>", unclosed),
                    position: reader.offset(),
                });
            }
        }

        let TreeBuilder { nodes: built, top, .. } = builder;
        drop(pool);

        let mut nodes = self.nodes_write();
        let base = nodes.len() as NodeId;
        for mut node in built {
            node.parent = node.parent.map(|p| p + base);
            for child in node.children.iter_mut() {
                *child += base;
            }
            nodes.push(Arc::new(Mutex::new(node)));
        }
        Ok(top.into_iter().map(|local| local + base).collect())
    }

    /// Link freshly built top-level nodes under the document node
    fn adopt_top_level(&self, top: Vec<NodeId>) {
        for &id in &top {
            self.with_node_mut(id, |node| node.parent = Some(DOCUMENT_NODE));
        }
        self.with_node_mut(DOCUMENT_NODE, |doc| doc.children.extend(top));
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Get total number of arena slots (detached nodes included)
    pub fn node_count(&self) -> usize {
        self.nodes_read().len()
    }

    /// Get root element ID (first element child of the document node)
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.elements(DOCUMENT_NODE).into_iter().next()
    }

    /// Snapshot of a node
    pub fn node(&self, id: NodeId) -> Option<XmlNode> {
        self.with_node(id, XmlNode::clone)
    }

    /// Node kind
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.with_node(id, |n| n.kind)
    }

    /// Parent node, if attached
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.with_node(id, |n| n.parent).flatten()
    }

    /// Parent node, only if it is an element (the root element has none)
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id)
            .filter(|&p| self.kind(p) == Some(NodeKind::Element))
    }

    /// Ancestors from the parent up to the top of the tree
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// All child nodes in document order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.with_node(id, |n| n.children.clone()).unwrap_or_default()
    }

    /// Element children in document order
    pub fn elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .into_iter()
            .filter(|&c| self.kind(c) == Some(NodeKind::Element))
            .collect()
    }

    /// All descendants in document order (the node itself excluded)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }

    /// Element or processing instruction name
    pub fn node_name(&self, id: NodeId) -> Option<String> {
        let (kind, name_id) = self.with_node(id, |n| (n.kind, n.name_id))?;
        match kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => self.resolve(name_id),
            _ => None,
        }
    }

    /// Content of a text, CDATA or comment node
    pub fn text_content(&self, id: NodeId) -> Option<String> {
        let (is_text, content_id) = self.with_node(id, |n| (n.is_character_data(), n.name_id))?;
        if is_text {
            self.resolve(content_id)
        } else {
            None
        }
    }

    /// Concatenated text of the node and its descendants (comments excluded)
    pub fn string_value(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in std::iter::once(id).chain(self.descendants(id)) {
            if matches!(self.kind(node), Some(NodeKind::Text | NodeKind::CData)) {
                if let Some(text) = self.text_content(node) {
                    out.push_str(&text);
                }
            }
        }
        out
    }

    /// Attribute value by name
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        let attrs = self.with_node(id, |n| n.attributes.clone())?;
        self.with_strings(|pool| {
            let name_id = pool.lookup(name)?;
            attrs
                .iter()
                .find(|a| a.name_id == name_id)
                .and_then(|a| pool.get(a.value_id))
                .map(str::to_owned)
        })
    }

    /// All attribute names and values in document order
    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        let attrs = self.with_node(id, |n| n.attributes.clone()).unwrap_or_default();
        self.with_strings(|pool| {
            attrs
                .iter()
                .filter_map(|a| {
                    let name = pool.get(a.name_id)?;
                    let value = pool.get(a.value_id)?;
                    Some((name.to_owned(), value.to_owned()))
                })
                .collect()
        })
    }

    // =========================================================================
    // Node creation
    // =========================================================================

    /// Create a detached element
    pub fn create_element(&self, name: &str, attributes: &[(&str, &str)]) -> NodeId {
        let node = {
            let mut pool = self.strings_write();
            let mut node = XmlNode::element(pool.intern(name));
            node.attributes = attributes
                .iter()
                .map(|(k, v)| XmlAttribute::new(pool.intern(k), pool.intern(v)))
                .collect();
            node
        };
        self.push_node(node)
    }

    /// Create a detached text node
    pub fn create_text(&self, text: &str) -> NodeId {
        let content_id = self.strings_write().intern(text);
        self.push_node(XmlNode::text(content_id))
    }

    /// Create a detached comment node
    pub fn create_comment(&self, text: &str) -> NodeId {
        let content_id = self.strings_write().intern(text);
        self.push_node(XmlNode::comment(content_id))
    }

    /// Set (or add) an attribute on an element
    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> Result<(), DocumentError> {
        let (name_id, value_id) = {
            let mut pool = self.strings_write();
            (pool.intern(name), pool.intern(value))
        };
        self.with_node_mut(id, |node| {
            match node.attributes.iter_mut().find(|a| a.name_id == name_id) {
                Some(attr) => attr.value_id = value_id,
                None => node.attributes.push(XmlAttribute::new(name_id, value_id)),
            }
        })
        .ok_or(DocumentError::UnknownNode(id))
    }

    // =========================================================================
    // Structural primitives
    // =========================================================================

    /// Set the parent link of a detached node, under its own lock only
    fn claim(&self, id: NodeId, parent: NodeId) -> Result<(), DocumentError> {
        let slot = self.ensure(id)?;
        let mut node = lock_node(&slot);
        if node.parent.is_some() || node.kind == NodeKind::Document {
            return Err(DocumentError::Attached(id));
        }
        node.parent = Some(parent);
        Ok(())
    }

    fn release(&self, id: NodeId) {
        self.with_node_mut(id, |node| node.parent = None);
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DocumentError> {
        let parent_slot = self.ensure(parent)?;
        if child == parent || self.ancestors(parent).contains(&child) {
            return Err(DocumentError::Cycle(child));
        }
        self.claim(child, parent)?;
        lock_node(&parent_slot).children.push(child);
        Ok(())
    }

    /// Put a detached `replacement` where `target` is, detaching `target`
    ///
    /// Locks the parent, then the target. Returns the parent id.
    pub fn replace_node(&self, target: NodeId, replacement: NodeId) -> Result<NodeId, DocumentError> {
        let target_slot = self.ensure(target)?;
        self.ensure(replacement)?;
        let parent_id = lock_node(&target_slot).parent.ok_or(DocumentError::Orphan(target))?;
        if replacement == target {
            return Ok(parent_id);
        }
        if replacement == parent_id || self.ancestors(parent_id).contains(&replacement) {
            return Err(DocumentError::Cycle(replacement));
        }
        let parent_slot = self.ensure(parent_id)?;

        self.claim(replacement, parent_id)?;
        let swapped = {
            let mut parent = lock_node(&parent_slot);
            let mut node = lock_node(&target_slot);
            match parent.children.iter().position(|&c| c == target) {
                Some(pos) if node.parent == Some(parent_id) => {
                    parent.children[pos] = replacement;
                    node.parent = None;
                    true
                }
                _ => false,
            }
        };

        if swapped {
            Ok(parent_id)
        } else {
            // Target moved between the read and the lock
            self.release(replacement);
            Err(DocumentError::Orphan(target))
        }
    }

    /// Unlink a node from its parent. Returns false if it had none.
    pub fn detach(&self, id: NodeId) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        let Some(parent_id) = lock_node(&slot).parent else {
            return false;
        };
        let Some(parent_slot) = self.slot(parent_id) else {
            return false;
        };

        let mut parent = lock_node(&parent_slot);
        let mut node = lock_node(&slot);
        if node.parent != Some(parent_id) {
            return false;
        }
        parent.children.retain(|&c| c != id);
        node.parent = None;
        true
    }

    /// Structurally independent deep duplicate of a subtree, detached
    pub fn deep_copy(&self, id: NodeId) -> Result<NodeId, DocumentError> {
        let shallow = |src: NodeId| {
            self.with_node(src, |n| XmlNode {
                kind: n.kind,
                parent: None,
                children: Vec::new(),
                name_id: n.name_id,
                attributes: n.attributes.clone(),
            })
            .ok_or(DocumentError::UnknownNode(src))
        };

        let root = self.push_node(shallow(id)?);
        let mut stack = vec![(id, root)];
        while let Some((src, dst)) = stack.pop() {
            for child in self.children(src) {
                let mut copy = shallow(child)?;
                copy.parent = Some(dst);
                let copy_id = self.push_node(copy);
                self.with_node_mut(dst, |n| n.children.push(copy_id));
                stack.push((child, copy_id));
            }
        }
        Ok(root)
    }

    /// Serialize a node and its subtree to XML
    pub fn to_xml(&self, id: NodeId) -> String {
        super::serialize::serialize_node(self, id)
    }
}

/// Event-to-node builder working on local indices
struct TreeBuilder<'p> {
    pool: &'p mut StringPool,
    nodes: Vec<XmlNode>,
    /// Open elements (local ids)
    stack: Vec<NodeId>,
    /// Open element names, for strict tag matching
    tag_stack: Vec<String>,
    /// Nodes with no open parent (local ids)
    top: Vec<NodeId>,
    seen_root: bool,
    strict: bool,
}

impl TreeBuilder<'_> {
    fn handle(&mut self, event: XmlEvent<'_>) -> Result<(), String> {
        match event {
            XmlEvent::Open(tag) => {
                let id = self.element(&tag)?;
                if !tag.self_closing {
                    self.tag_stack.push(String::from_utf8_lossy(tag.name).into_owned());
                    self.stack.push(id);
                }
            }
            XmlEvent::Close(name) => {
                let name = String::from_utf8_lossy(name);
                match self.tag_stack.pop() {
                    Some(open) if self.strict && open != name => {
                        return Err(format!("Tag mismatch: <{}> closed with </{}>", open, name));
                    }
                    None if self.strict => {
                        return Err(format!("Unexpected end tag: </{}> without matching start tag", name));
                    }
                    _ => {}
                }
                self.stack.pop();
            }
            XmlEvent::Text(content) => {
                if self.strict && self.stack.is_empty() && !content.iter().all(|&b| is_whitespace(b)) {
                    return Err("Text content not allowed at document level".to_string());
                }
                let id = self.pool.intern_bytes(&content);
                self.push(XmlNode::text(id));
            }
            XmlEvent::CData(content) => {
                if self.strict && self.stack.is_empty() {
                    return Err("CDATA section not allowed at document level".to_string());
                }
                let id = self.pool.intern_bytes(content);
                self.push(XmlNode::cdata(id));
            }
            XmlEvent::Comment(content) => {
                let id = self.pool.intern_bytes(content);
                self.push(XmlNode::comment(id));
            }
            XmlEvent::Pi { target, .. } => {
                let id = self.pool.intern_bytes(target);
                self.push(XmlNode::processing_instruction(id));
            }
            XmlEvent::Prolog => {}
        }
        Ok(())
    }

    fn element(&mut self, tag: &Tag<'_>) -> Result<NodeId, String> {
        if self.stack.is_empty() && self.strict {
            if self.seen_root {
                return Err("Document has multiple root elements".to_string());
            }
            self.seen_root = true;
        }

        let mut node = XmlNode::element(self.pool.intern_bytes(tag.name));
        for attr in &tag.attributes {
            let name_id = self.pool.intern_bytes(attr.name);
            if self.strict && node.attributes.iter().any(|a| a.name_id == name_id) {
                return Err(format!("Duplicate attribute: {}", String::from_utf8_lossy(attr.name)));
            }
            let value_id = self.pool.intern_bytes(&attr.value);
            node.attributes.push(XmlAttribute::new(name_id, value_id));
        }
        Ok(self.push(node))
    }

    /// Add a node under the innermost open element (or at top level)
    fn push(&mut self, mut node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        node.parent = self.stack.last().copied();
        match node.parent {
            Some(parent) => self.nodes[parent as usize].children.push(id),
            None => self.top.push(id),
        }
        self.nodes.push(node);
        id
    }
}
