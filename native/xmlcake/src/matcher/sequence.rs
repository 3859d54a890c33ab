//! Filtered sequence matching
//!
//! A pattern is an ordered list of steps plus a filler kind. Scanning a
//! node stream advances through the steps one hit at a time; once the first
//! step has hit, every further hit and every filler node is collected. The
//! collected run becomes a match when the last step hits.

use super::step::Step;
use crate::dom::{NodeId, NodeKind, XmlDocument};
use crate::error::PatternError;

/// Nodes of one completed occurrence, in stream order; empty means no match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Match(Vec<NodeId>);

impl Match {
    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn into_nodes(self) -> Vec<NodeId> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Non-overlapping matches in stream order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCollection(Vec<Match>);

impl MatchCollection {
    pub fn matches(&self) -> &[Match] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.0.iter()
    }
}

impl IntoIterator for MatchCollection {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A pattern that can be run over a node stream
pub trait Expression: Send + Sync {
    /// First occurrence, or an empty match
    fn find(&self, doc: &XmlDocument, nodes: &[NodeId]) -> Match;

    /// Every occurrence; an unfinished trailing run is dropped
    fn find_all(&self, doc: &XmlDocument, nodes: &[NodeId]) -> MatchCollection;
}

/// Step sequence with filler nodes allowed between (and collected with) the hits
pub struct FilteredWrap {
    filler: NodeKind,
    steps: Vec<Box<dyn Step>>,
}

impl FilteredWrap {
    pub fn new(filler: NodeKind, steps: Vec<Box<dyn Step>>) -> Result<Self, PatternError> {
        if steps.is_empty() {
            return Err(PatternError::EmptyPattern);
        }
        Ok(FilteredWrap { filler, steps })
    }

    /// Build from steps of a single type
    pub fn from_steps<S, I>(filler: NodeKind, steps: I) -> Result<Self, PatternError>
    where
        S: Step + 'static,
        I: IntoIterator<Item = S>,
    {
        let steps = steps
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn Step>)
            .collect();
        Self::new(filler, steps)
    }

    pub fn filler(&self) -> NodeKind {
        self.filler
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Run the state machine over any node stream
    pub fn scan<I>(&self, doc: &XmlDocument, nodes: I, repeated: bool) -> MatchCollection
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut found = Vec::new();
        let mut progress = 0;
        let mut buffer = Vec::new();

        for node in nodes {
            let hit = self.steps[progress].is_match(doc, node);
            if hit {
                progress += 1;
            }
            if progress > 0 && (hit || doc.kind(node) == Some(self.filler)) {
                buffer.push(node);
            }
            if progress == self.steps.len() {
                found.push(Match(std::mem::take(&mut buffer)));
                progress = 0;
                if !repeated {
                    break;
                }
            }
        }

        MatchCollection(found)
    }
}

impl Expression for FilteredWrap {
    fn find(&self, doc: &XmlDocument, nodes: &[NodeId]) -> Match {
        self.scan(doc, nodes.iter().copied(), false)
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    fn find_all(&self, doc: &XmlDocument, nodes: &[NodeId]) -> MatchCollection {
        self.scan(doc, nodes.iter().copied(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::step::{NameStep, Step};

    fn a_then_b() -> FilteredWrap {
        FilteredWrap::from_steps(NodeKind::Text, [NameStep::new("a"), NameStep::new("b")]).unwrap()
    }

    fn stream(doc: &XmlDocument) -> Vec<NodeId> {
        doc.children(doc.root_element_id().unwrap())
    }

    #[test]
    fn test_empty_pattern() {
        assert!(matches!(
            FilteredWrap::new(NodeKind::Text, Vec::new()),
            Err(PatternError::EmptyPattern)
        ));
    }

    #[test]
    fn test_inclusion_rule() {
        let doc = XmlDocument::parse(b"<r>x<a/>y<b/>z</r>");
        let nodes = stream(&doc);
        let found = a_then_b().find(&doc, &nodes);
        assert_eq!(found.nodes(), &nodes[1..4]);
        assert_eq!(doc.text_content(found.nodes()[1]).as_deref(), Some("y"));
    }

    #[test]
    fn test_non_filler_between_hits_skipped() {
        let doc = XmlDocument::parse(b"<r><a/><!--c--><x/><b/></r>");
        let nodes = stream(&doc);
        let found = a_then_b().find(&doc, &nodes);
        assert_eq!(found.nodes(), &[nodes[0], nodes[3]]);
    }

    #[test]
    fn test_no_match() {
        let doc = XmlDocument::parse(b"<r>x<a/>y</r>");
        let nodes = stream(&doc);
        let pattern = a_then_b();
        assert!(pattern.find(&doc, &nodes).is_empty());
        assert!(pattern.find_all(&doc, &nodes).is_empty());
        assert!(pattern.find(&doc, &[]).is_empty());
    }

    #[test]
    fn test_repeated() {
        let doc = XmlDocument::parse(b"<r><a/>t<b/><c/><a/><b/>u<a/>v</r>");
        let nodes = stream(&doc);
        let all = a_then_b().find_all(&doc, &nodes);
        assert_eq!(all.len(), 2);
        assert_eq!(all.matches()[0].nodes(), &nodes[0..3]);
        assert_eq!(all.matches()[1].nodes(), &nodes[4..6]);
        let first = all.matches()[0].nodes();
        assert!(all.matches()[1].nodes().iter().all(|n| !first.contains(n)));
    }

    #[test]
    fn test_single_stops_at_first() {
        let doc = XmlDocument::parse(b"<r><a/><b/><a/><b/></r>");
        let nodes = stream(&doc);
        assert_eq!(a_then_b().find(&doc, &nodes).into_nodes(), nodes[0..2].to_vec());
    }

    #[test]
    fn test_single_step_with_closure() {
        let doc = XmlDocument::parse(b"<r>one<a/>two</r>");
        let nodes = stream(&doc);
        let is_text = |doc: &XmlDocument, id: NodeId| doc.kind(id) == Some(NodeKind::Text);
        let pattern = FilteredWrap::new(NodeKind::Comment, vec![Box::new(is_text) as Box<dyn Step>]).unwrap();
        let all = pattern.find_all(&doc, &nodes);
        assert_eq!(all.len(), 2);
        assert_eq!(pattern.step_count(), 1);
        assert_eq!(pattern.filler(), NodeKind::Comment);
    }
}
