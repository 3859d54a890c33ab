//! Arena node records
//!
//! Nodes refer to each other by [`NodeId`] only. A parent link is an index
//! into the owning document's arena, so a subtree can be detached or moved
//! without touching any borrow.

pub type NodeId = u32;

/// Slot 0 of every arena
pub const DOCUMENT_NODE: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

const KINDS: [(NodeKind, &str); 6] = [
    (NodeKind::Document, "Document"),
    (NodeKind::Element, "Element"),
    (NodeKind::Text, "Text"),
    (NodeKind::CData, "CDATA"),
    (NodeKind::Comment, "Comment"),
    (NodeKind::ProcessingInstruction, "ProcessingInstruction"),
];

impl NodeKind {
    /// Name used in default keys and synthetic path segments (`Text0`, `CDATA2`)
    pub fn type_tag(self) -> &'static str {
        KINDS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("", |(_, tag)| tag)
    }

    pub fn from_type_tag(tag: &str) -> Option<NodeKind> {
        KINDS.iter().find(|(_, t)| *t == tag).map(|(kind, _)| *kind)
    }
}

#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Unset on the document node and on anything detached
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Pool id of the element name or PI target; for character data, the content
    pub name_id: u32,
    /// Only elements carry attributes, kept in source order
    pub attributes: Vec<XmlAttribute>,
}

impl XmlNode {
    fn detached(kind: NodeKind, name_id: u32) -> Self {
        XmlNode { kind, parent: None, children: Vec::new(), name_id, attributes: Vec::new() }
    }

    pub fn document() -> Self {
        Self::detached(NodeKind::Document, 0)
    }

    pub fn element(name_id: u32) -> Self {
        Self::detached(NodeKind::Element, name_id)
    }

    pub fn text(content_id: u32) -> Self {
        Self::detached(NodeKind::Text, content_id)
    }

    pub fn cdata(content_id: u32) -> Self {
        Self::detached(NodeKind::CData, content_id)
    }

    pub fn comment(content_id: u32) -> Self {
        Self::detached(NodeKind::Comment, content_id)
    }

    pub fn processing_instruction(target_id: u32) -> Self {
        Self::detached(NodeKind::ProcessingInstruction, target_id)
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element)
    }

    /// Text, CDATA and comments keep their content in `name_id`
    #[inline]
    pub fn is_character_data(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData | NodeKind::Comment)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Name and value as pool ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name_id: u32,
    pub value_id: u32,
}

impl XmlAttribute {
    pub fn new(name_id: u32, value_id: u32) -> Self {
        XmlAttribute { name_id, value_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_start_detached() {
        for node in [XmlNode::document(), XmlNode::element(3), XmlNode::text(4)] {
            assert!(node.parent.is_none());
            assert!(!node.has_children());
            assert!(node.attributes.is_empty());
        }
    }

    #[test]
    fn test_kind_predicates() {
        let item = XmlNode::element(1);
        assert!(item.is_element());
        assert!(!item.is_character_data());

        assert!(XmlNode::cdata(2).is_character_data());
        assert!(XmlNode::comment(2).is_character_data());
        assert!(!XmlNode::processing_instruction(2).is_character_data());
        assert!(!XmlNode::document().is_element());
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(NodeKind::CData.type_tag(), "CDATA");
        assert_eq!(NodeKind::Text.type_tag(), "Text");
        for (kind, tag) in KINDS {
            assert_eq!(NodeKind::from_type_tag(tag), Some(kind));
            assert_eq!(kind.type_tag(), tag);
        }
        assert_eq!(NodeKind::from_type_tag("item"), None);
        assert_eq!(NodeKind::from_type_tag("cdata"), None);
    }
}
