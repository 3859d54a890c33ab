//! Step predicates

use crate::dom::{NodeId, NodeKind, XmlDocument};

/// One position of a sequence pattern
pub trait Step: Send + Sync {
    fn is_match(&self, doc: &XmlDocument, node: NodeId) -> bool;
}

impl<F> Step for F
where
    F: Fn(&XmlDocument, NodeId) -> bool + Send + Sync,
{
    fn is_match(&self, doc: &XmlDocument, node: NodeId) -> bool {
        self(doc, node)
    }
}

/// Element with the given name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameStep {
    name: String,
}

impl NameStep {
    pub fn new(name: impl Into<String>) -> Self {
        NameStep { name: name.into() }
    }
}

impl Step for NameStep {
    fn is_match(&self, doc: &XmlDocument, node: NodeId) -> bool {
        doc.kind(node) == Some(NodeKind::Element)
            && doc.node_name(node).is_some_and(|n| n == self.name)
    }
}

/// Any node of the given kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindStep(pub NodeKind);

impl Step for KindStep {
    fn is_match(&self, doc: &XmlDocument, node: NodeId) -> bool {
        doc.kind(node) == Some(self.0)
    }
}

/// Element carrying an attribute, optionally with a given value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeStep {
    name: String,
    value: Option<String>,
}

impl AttributeStep {
    pub fn present(name: impl Into<String>) -> Self {
        AttributeStep { name: name.into(), value: None }
    }

    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        AttributeStep {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl Step for AttributeStep {
    fn is_match(&self, doc: &XmlDocument, node: NodeId) -> bool {
        match (doc.attribute(node, &self.name), &self.value) {
            (Some(actual), Some(expected)) => actual == *expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps() {
        let doc = XmlDocument::parse(b"<r><a id=\"1\"/>text<b/></r>");
        let children = doc.children(doc.root_element_id().unwrap());
        let (a, text, b) = (children[0], children[1], children[2]);

        assert!(NameStep::new("a").is_match(&doc, a));
        assert!(!NameStep::new("a").is_match(&doc, b));
        assert!(!NameStep::new("a").is_match(&doc, text));

        assert!(KindStep(NodeKind::Text).is_match(&doc, text));
        assert!(!KindStep(NodeKind::Text).is_match(&doc, a));

        assert!(AttributeStep::present("id").is_match(&doc, a));
        assert!(AttributeStep::equals("id", "1").is_match(&doc, a));
        assert!(!AttributeStep::equals("id", "2").is_match(&doc, a));
        assert!(!AttributeStep::present("id").is_match(&doc, b));

        let any_element = |doc: &XmlDocument, id: NodeId| doc.kind(id) == Some(NodeKind::Element);
        assert!(any_element.is_match(&doc, b));
    }
}
