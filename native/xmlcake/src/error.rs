//! Error types for the document, the path index and matcher patterns

use thiserror::Error;

use crate::dom::NodeId;

/// Failures raised by the document collaborator
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The id does not name a slot in this document's arena
    #[error("unknown node id {0}")]
    UnknownNode(NodeId),

    /// The node has no element parent (document root or detached)
    #[error("node {0} has no parent")]
    Orphan(NodeId),

    /// The node is already linked into a tree and cannot be inserted again
    #[error("node {0} is already attached to a parent")]
    Attached(NodeId),

    /// Linking the node would make it its own ancestor
    #[error("node {0} cannot be inserted below itself")]
    Cycle(NodeId),

    /// Strict-mode well-formedness failure
    #[error("parse error at byte {position}: {message}")]
    Parse { message: String, position: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures raised by [`crate::index::PathIndex`]
#[derive(Debug, Error)]
pub enum IndexError {
    /// A mutation targeted a path that neither the index nor a tree walk resolves
    #[error("no node at path `{0}`")]
    PathNotFound(String),

    /// Replace targeted a node without an element parent
    #[error("node at path `{0}` has no parent")]
    NoParent(String),

    /// MapLayer was asked to map a node with no element children
    #[error("node at path `{0}` has no children to map")]
    EmptyLayer(String),

    /// Two distinct nodes produced the same key under the `None` policy
    #[error("duplicate key `{0}`")]
    KeyCollision(String),

    /// An XML fragment meant for `path` contained no element
    #[error("fragment for path `{0}` holds no element")]
    InvalidFragment(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Failures building a matcher pattern
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("a pattern needs at least one step")]
    EmptyPattern,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            IndexError::KeyCollision("a/b".to_string()).to_string(),
            "duplicate key `a/b`"
        );
        assert_eq!(
            IndexError::from(DocumentError::Orphan(3)).to_string(),
            "node 3 has no parent"
        );
        let err = DocumentError::Parse { message: "Unclosed tag: <a>".to_string(), position: 7 };
        assert_eq!(err.to_string(), "parse error at byte 7: Unclosed tag: <a>");
    }
}
