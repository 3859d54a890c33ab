//! Parallel matching
//!
//! Uses Rayon to run one pattern over many independent node streams.

use rayon::prelude::*;

use super::sequence::{Expression, Match, MatchCollection};
use crate::dom::{NodeId, XmlDocument};

/// First match of each stream
pub fn find_parallel<E>(expr: &E, doc: &XmlDocument, streams: &[Vec<NodeId>]) -> Vec<Match>
where
    E: Expression + ?Sized,
{
    streams
        .par_iter()
        .map(|stream| expr.find(doc, stream))
        .collect()
}

/// All matches of each stream
pub fn find_all_parallel<E>(
    expr: &E,
    doc: &XmlDocument,
    streams: &[Vec<NodeId>],
) -> Vec<MatchCollection>
where
    E: Expression + ?Sized,
{
    streams
        .par_iter()
        .map(|stream| expr.find_all(doc, stream))
        .collect()
}

/// Child lists of the given parents, one stream per parent
pub fn child_streams(doc: &XmlDocument, parents: &[NodeId]) -> Vec<Vec<NodeId>> {
    parents.par_iter().map(|&p| doc.children(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;
    use crate::matcher::{FilteredWrap, NameStep};

    #[test]
    fn test_parallel_matches_sequential() {
        let doc = XmlDocument::parse(
            b"<r><s><a/>x<b/></s><s><b/><a/></s><s><a/><b/><a/><b/></s></r>",
        );
        let sections = doc.elements(doc.root_element_id().unwrap());
        let streams = child_streams(&doc, &sections);
        let pattern =
            FilteredWrap::from_steps(NodeKind::Text, [NameStep::new("a"), NameStep::new("b")])
                .unwrap();

        let all = find_all_parallel(&pattern, &doc, &streams);
        let counts: Vec<usize> = all.iter().map(MatchCollection::len).collect();
        assert_eq!(counts, [1, 0, 2]);

        let firsts = find_parallel(&pattern, &doc, &streams);
        for (first, stream) in firsts.iter().zip(&streams) {
            assert_eq!(*first, pattern.find(&doc, stream));
        }
        assert_eq!(firsts[0].len(), 3);
    }
}
