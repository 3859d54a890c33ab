//! Key generation
//!
//! A key generator turns a node into the string that names it inside its
//! parent. When the generator has nothing distinguishing to say it returns
//! the node's bare type tag, and the index falls back to a positional
//! segment.

use crate::dom::{NodeId, NodeKind, XmlDocument};

/// Attribute read by the default generator
pub const DEFAULT_KEY_ATTRIBUTE: &str = "name";

/// Strategy producing a node's key
///
/// Generators run while the index holds its registration lock, so they must
/// not call back into the index.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self, doc: &XmlDocument, node: NodeId) -> String;
}

impl<F> KeyGenerator for F
where
    F: Fn(&XmlDocument, NodeId) -> String + Send + Sync,
{
    fn generate(&self, doc: &XmlDocument, node: NodeId) -> String {
        self(doc, node)
    }
}

/// Bare type tag of a node (`"Element"`, `"Text"`, ...)
pub fn type_tag(doc: &XmlDocument, node: NodeId) -> &'static str {
    doc.kind(node).map_or("", NodeKind::type_tag)
}

/// Keys nodes by the value of one attribute, falling back to the type tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeKey {
    attribute: String,
}

impl AttributeKey {
    pub fn new(attribute: impl Into<String>) -> Self {
        AttributeKey { attribute: attribute.into() }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl Default for AttributeKey {
    fn default() -> Self {
        AttributeKey::new(DEFAULT_KEY_ATTRIBUTE)
    }
}

impl KeyGenerator for AttributeKey {
    fn generate(&self, doc: &XmlDocument, node: NodeId) -> String {
        doc.attribute(node, &self.attribute)
            .unwrap_or_else(|| type_tag(doc, node).to_owned())
    }
}

/// The default generator: `name` attribute, else the type tag
pub fn default_key(doc: &XmlDocument, node: NodeId) -> String {
    AttributeKey::default().generate(doc, node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key() {
        let doc = XmlDocument::parse(b"<root><a name=\"alpha\"/><b id=\"7\"/>text</root>");
        let root = doc.root_element_id().unwrap();
        let children = doc.children(root);
        assert_eq!(default_key(&doc, children[0]), "alpha");
        assert_eq!(default_key(&doc, children[1]), "Element");
        assert_eq!(default_key(&doc, children[2]), "Text");
    }

    #[test]
    fn test_attribute_key() {
        let doc = XmlDocument::parse(b"<root><b id=\"7\"/></root>");
        let b = doc.elements(doc.root_element_id().unwrap())[0];
        let by_id = AttributeKey::new("id");
        assert_eq!(by_id.attribute(), "id");
        assert_eq!(by_id.generate(&doc, b), "7");
    }

    #[test]
    fn test_closure_generator() {
        let doc = XmlDocument::parse(b"<root><item/></root>");
        let item = doc.elements(doc.root_element_id().unwrap())[0];
        let by_name = |doc: &XmlDocument, id: NodeId| doc.node_name(id).unwrap_or_default();
        assert_eq!(by_name.generate(&doc, item), "item");
    }
}
