//! Encoding of nodes, paths and match results for the BEAM side

use rustler::{Atom, Encoder, Env, NewBinary, Term};

use crate::dom::{NodeId, NodeKind, XmlDocument};
use crate::error::IndexError;
use crate::index::DuplicateKeyPolicy;
use crate::matcher::MatchCollection;

rustler::atoms! {
    ok,
    error,
    element,
    comment,
    pi,
    text,
    cdata,
    // duplicate-key policies
    none,
    ignore,
    reset,
    remove_old,
    remove_new,
    // error reasons
    path_not_found,
    no_parent,
    empty_layer,
    key_collision,
    invalid_node,
    invalid_policy,
    invalid_kind,
    invalid_fragment,
}

/// Decode a policy atom (`:none`, `:ignore`, `:reset`, `:remove_old`, `:remove_new`)
pub fn policy_from_term(term: Term<'_>) -> Option<DuplicateKeyPolicy> {
    let name = term.atom_to_string().ok()?;
    DuplicateKeyPolicy::from_name(&name)
}

pub fn policy_to_atom(policy: DuplicateKeyPolicy) -> Atom {
    match policy {
        DuplicateKeyPolicy::None => none(),
        DuplicateKeyPolicy::Ignore => ignore(),
        DuplicateKeyPolicy::Reset => reset(),
        DuplicateKeyPolicy::RemoveOld => remove_old(),
        DuplicateKeyPolicy::RemoveNew => remove_new(),
    }
}

/// `{reason_atom, detail}` for an index failure
pub fn index_error_to_term<'a>(env: Env<'a>, err: &IndexError) -> Term<'a> {
    let reason = match err {
        IndexError::PathNotFound(_) => path_not_found(),
        IndexError::NoParent(_) => no_parent(),
        IndexError::EmptyLayer(_) => empty_layer(),
        IndexError::KeyCollision(_) => key_collision(),
        IndexError::InvalidFragment(_) => invalid_fragment(),
        IndexError::Document(_) => invalid_node(),
    };
    (reason, str_to_binary(env, &err.to_string())).encode(env)
}

/// Elements become `{:element, name, attrs, children}`; text and CDATA become binaries
pub fn node_to_term<'a>(env: Env<'a>, doc: &XmlDocument, node_id: NodeId) -> Term<'a> {
    let Some(kind) = doc.kind(node_id) else {
        return rustler::types::atom::nil().encode(env);
    };

    match kind {
        NodeKind::Element => {
            let name = doc.node_name(node_id).unwrap_or_default();

            let mut attrs = Term::list_new_empty(env);
            for (attr_name, attr_value) in doc.attributes(node_id).iter().rev() {
                let attr_tuple = (str_to_binary(env, attr_name), str_to_binary(env, attr_value));
                attrs = attrs.list_prepend(attr_tuple.encode(env));
            }

            let mut children = Term::list_new_empty(env);
            for child in doc.children(node_id).into_iter().rev() {
                children = children.list_prepend(node_to_term(env, doc, child));
            }

            (element(), str_to_binary(env, &name), attrs, children).encode(env)
        }
        NodeKind::Text | NodeKind::CData => {
            let content = doc.text_content(node_id).unwrap_or_default();
            str_to_binary(env, &content)
        }
        NodeKind::Comment => {
            let content = doc.text_content(node_id).unwrap_or_default();
            (comment(), str_to_binary(env, &content)).encode(env)
        }
        NodeKind::ProcessingInstruction => {
            let target = doc.node_name(node_id).unwrap_or_default();
            (pi(), str_to_binary(env, &target)).encode(env)
        }
        NodeKind::Document => match doc.root_element_id() {
            Some(root_id) => node_to_term(env, doc, root_id),
            None => rustler::types::atom::nil().encode(env),
        },
    }
}

pub fn strings_to_term<'a>(env: Env<'a>, items: &[String]) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for s in items.iter().rev() {
        list = list.list_prepend(str_to_binary(env, s));
    }
    list
}

/// Convert match results to a list of lists of node terms, one list per match
pub fn matches_to_term<'a>(env: Env<'a>, doc: &XmlDocument, matches: &MatchCollection) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for m in matches.iter().rev() {
        let mut nodes = Term::list_new_empty(env);
        for &id in m.nodes().iter().rev() {
            nodes = nodes.list_prepend(node_to_term(env, doc, id));
        }
        list = list.list_prepend(nodes);
    }
    list
}

/// Copy `s` into a fresh binary
#[inline]
pub fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

/// Decode a node-kind atom used as a matcher filler
pub fn kind_from_term(term: Term<'_>) -> Option<NodeKind> {
    match term.atom_to_string().ok()?.as_str() {
        "element" => Some(NodeKind::Element),
        "text" => Some(NodeKind::Text),
        "cdata" => Some(NodeKind::CData),
        "comment" => Some(NodeKind::Comment),
        "pi" => Some(NodeKind::ProcessingInstruction),
        _ => None,
    }
}
