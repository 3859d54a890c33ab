//! XML serialization
//!
//! Iterative with an explicit stack so deep trees do not overflow.

use super::document::XmlDocument;
use super::node::{NodeId, NodeKind};
use crate::core::entities::escape_to_buf;

enum StackEntry {
    Enter(NodeId),
    Close(String),
}

/// Serialize a node and its subtree to an XML string
pub fn serialize_node(doc: &XmlDocument, node_id: NodeId) -> String {
    let mut buf = String::with_capacity(256);
    let mut stack = vec![StackEntry::Enter(node_id)];

    while let Some(entry) = stack.pop() {
        let current = match entry {
            StackEntry::Close(name) => {
                buf.push_str("</");
                buf.push_str(&name);
                buf.push('>');
                continue;
            }
            StackEntry::Enter(id) => id,
        };
        let Some(node) = doc.node(current) else {
            continue;
        };

        doc.with_strings(|pool| {
            let text = pool.get(node.name_id).unwrap_or("");
            match node.kind {
                NodeKind::Element => {
                    buf.push('<');
                    buf.push_str(text);
                    for attr in &node.attributes {
                        buf.push(' ');
                        buf.push_str(pool.get(attr.name_id).unwrap_or(""));
                        buf.push_str("=\"");
                        escape_to_buf(pool.get(attr.value_id).unwrap_or(""), &mut buf);
                        buf.push('"');
                    }
                    if node.children.is_empty() {
                        buf.push_str("/>");
                    } else {
                        buf.push('>');
                        stack.push(StackEntry::Close(text.to_owned()));
                        stack.extend(node.children.iter().rev().map(|&c| StackEntry::Enter(c)));
                    }
                }
                NodeKind::Text => escape_to_buf(text, &mut buf),
                NodeKind::CData => {
                    buf.push_str("<![CDATA[");
                    buf.push_str(text);
                    buf.push_str("]]>");
                }
                NodeKind::Comment => {
                    buf.push_str("<!--");
                    buf.push_str(text);
                    buf.push_str("-->");
                }
                NodeKind::ProcessingInstruction => {
                    buf.push_str("<?");
                    buf.push_str(text);
                    buf.push_str("?>");
                }
                NodeKind::Document => {
                    stack.extend(node.children.iter().rev().map(|&c| StackEntry::Enter(c)));
                }
            }
        });
    }

    buf
}

#[cfg(test)]
mod tests {
    use crate::dom::{XmlDocument, DOCUMENT_NODE};

    #[test]
    fn test_round_trip_shape() {
        let input = "<root a=\"1\"><x>t &amp; u</x><!--c--><![CDATA[<raw>]]><y/></root>";
        let doc = XmlDocument::parse(input.as_bytes());
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.to_xml(root), input);
    }

    #[test]
    fn test_attribute_escaping() {
        let doc = XmlDocument::new();
        let el = doc.create_element("a", &[("title", "\"q\" & <b>")]);
        assert_eq!(doc.to_xml(el), "<a title=\"&quot;q&quot; &amp; &lt;b&gt;\"/>");
    }

    #[test]
    fn test_document_node() {
        let doc = XmlDocument::parse(b"<?xml version=\"1.0\"?><r><s/></r>");
        assert_eq!(doc.to_xml(DOCUMENT_NODE), "<r><s/></r>");
    }
}
