//! XmlCake - path-indexed XML documents
//!
//! Components:
//! - Reader: zero-copy slice parser feeding the DOM builder
//! - DOM: mutable arena document with per-node locks
//! - Index: path keys -> nodes, populated by root, layer or slice
//! - Matcher: step sequences with filler nodes over sibling streams

use rustler::{Binary, Encoder, Env, NifResult, ResourceArc, Term};

pub mod core;
pub mod dom;
pub mod error;
pub mod index;
pub mod matcher;
pub mod reader;
pub mod resource;
pub mod term;

use crate::error::IndexError;
use crate::index::PathIndex;
use crate::matcher::{Expression, FilteredWrap, NameStep};
use crate::resource::{IndexRef, IndexResource};
use crate::term::{
    error, index_error_to_term, invalid_kind, invalid_policy, kind_from_term,
    matches_to_term, node_to_term, ok, path_not_found, policy_from_term, policy_to_atom,
    str_to_binary, strings_to_term,
};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// `{:ok, value}` or `{:error, {reason, message}}`
fn encode_result<'a, T: Encoder>(env: Env<'a>, result: Result<T, IndexError>) -> Term<'a> {
    match result {
        Ok(value) => (ok(), value).encode(env),
        Err(e) => (error(), index_error_to_term(env, &e)).encode(env),
    }
}

/// `:ok` or `{:error, {reason, message}}`
fn encode_status<'a, T>(env: Env<'a>, result: Result<T, IndexError>) -> Term<'a> {
    match result {
        Ok(_) => ok().encode(env),
        Err(e) => (error(), index_error_to_term(env, &e)).encode(env),
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Parse XML into an empty path index (returns {:ok, ref})
/// Malformed input is read leniently, never rejected
#[rustler::nif]
fn parse<'a>(env: Env<'a>, input: Binary<'a>, policy: Term<'a>) -> NifResult<Term<'a>> {
    let Some(policy) = policy_from_term(policy) else {
        return Ok((error(), invalid_policy()).encode(env));
    };
    let arc = ResourceArc::new(IndexResource::parse(input.as_slice(), policy));
    Ok((ok(), arc).encode(env))
}

/// Parse XML in strict mode (returns {:ok, ref} or {:error, reason})
#[rustler::nif]
fn parse_strict<'a>(env: Env<'a>, input: Binary<'a>, policy: Term<'a>) -> NifResult<Term<'a>> {
    let Some(policy) = policy_from_term(policy) else {
        return Ok((error(), invalid_policy()).encode(env));
    };
    match dom::XmlDocument::parse_strict(input.as_slice()) {
        Ok(doc) => {
            let index = PathIndex::with_policy(std::sync::Arc::new(doc), policy);
            let arc = ResourceArc::new(IndexResource::from_index(index));
            Ok((ok(), arc).encode(env))
        }
        Err(e) => Ok((error(), e.to_string()).encode(env)),
    }
}

#[rustler::nif]
fn policy(index_ref: IndexRef) -> rustler::Atom {
    policy_to_atom(index_ref.index.policy())
}

// ============================================================================
// Registration
// ============================================================================

/// Register every element below the root (returns {:ok, count})
#[rustler::nif(schedule = "DirtyCpu")]
fn map_all<'a>(env: Env<'a>, index_ref: IndexRef) -> NifResult<Term<'a>> {
    Ok(encode_result(env, index_ref.index.map_all()))
}

/// Register the element children of the node at `path`
#[rustler::nif]
fn map_layer<'a>(
    env: Env<'a>,
    index_ref: IndexRef,
    path: &str,
    use_blank_path: bool,
) -> NifResult<Term<'a>> {
    Ok(encode_result(env, index_ref.index.map_layer_at(path, use_blank_path)))
}

/// Register the subtree at `path` down to `depth` levels (`nil` = unbounded)
#[rustler::nif(schedule = "DirtyCpu")]
fn map_slice<'a>(
    env: Env<'a>,
    index_ref: IndexRef,
    path: &str,
    depth: Option<usize>,
    use_blank_path: bool,
) -> NifResult<Term<'a>> {
    Ok(encode_result(
        env,
        index_ref.index.map_slice_at(path, depth, use_blank_path),
    ))
}

// ============================================================================
// Lookups
// ============================================================================

/// Registered node at exactly `path`, or nil
#[rustler::nif]
fn lookup<'a>(env: Env<'a>, index_ref: IndexRef, path: &str) -> NifResult<Term<'a>> {
    let index = &index_ref.index;
    Ok(match index.lookup(path) {
        Some(id) => node_to_term(env, index.document(), id),
        None => rustler::types::atom::nil().encode(env),
    })
}

/// Resolve `path` through the index or by walking the tree, or nil
#[rustler::nif]
fn navigate<'a>(env: Env<'a>, index_ref: IndexRef, path: &str) -> NifResult<Term<'a>> {
    let index = &index_ref.index;
    Ok(match index.navigate_to(path) {
        Some(id) => node_to_term(env, index.document(), id),
        None => rustler::types::atom::nil().encode(env),
    })
}

#[rustler::nif]
fn path_exists(index_ref: IndexRef, path: &str) -> bool {
    index_ref.index.path_exists(path)
}

/// Registered paths, sorted
#[rustler::nif]
fn paths<'a>(env: Env<'a>, index_ref: IndexRef) -> NifResult<Term<'a>> {
    Ok(strings_to_term(env, &index_ref.index.paths()))
}

#[rustler::nif]
fn unmap(index_ref: IndexRef, path: &str) -> bool {
    index_ref.index.unmap(path).is_some()
}

/// Serialize the node at `path` (returns {:ok, xml})
#[rustler::nif]
fn to_xml<'a>(env: Env<'a>, index_ref: IndexRef, path: &str) -> NifResult<Term<'a>> {
    let index = &index_ref.index;
    Ok(match index.navigate_to(path) {
        Some(id) => (ok(), str_to_binary(env, &index.document().to_xml(id))).encode(env),
        None => (error(), path_not_found()).encode(env),
    })
}

// ============================================================================
// Mutation
// ============================================================================

/// Replace the node at `path` with a parsed XML fragment
#[rustler::nif]
fn replace_element<'a>(
    env: Env<'a>,
    index_ref: IndexRef,
    path: &str,
    fragment: Binary<'a>,
) -> NifResult<Term<'a>> {
    Ok(encode_status(env, index_ref.index.replace_with_xml(path, fragment.as_slice())))
}

/// Append a parsed XML fragment as the last child of the node at `path`
#[rustler::nif]
fn append_element<'a>(
    env: Env<'a>,
    index_ref: IndexRef,
    path: &str,
    fragment: Binary<'a>,
) -> NifResult<Term<'a>> {
    Ok(encode_status(env, index_ref.index.append_xml(path, fragment.as_slice())))
}

/// Copy of the node at `path`, returned as XML; the document is not touched
#[rustler::nif]
fn copy_element<'a>(env: Env<'a>, index_ref: IndexRef, path: &str) -> NifResult<Term<'a>> {
    let result = index_ref
        .index
        .element_xml(path)
        .map(|xml| str_to_binary(env, &xml));
    Ok(encode_result(env, result))
}

// ============================================================================
// Matching
// ============================================================================

/// Match element names in order over the children of the node at `path`
///
/// Nodes of the `filler` kind between hits are kept in each match.
#[rustler::nif]
fn match_children<'a>(
    env: Env<'a>,
    index_ref: IndexRef,
    path: &str,
    names: Vec<String>,
    filler: Term<'a>,
    repeated: bool,
) -> NifResult<Term<'a>> {
    let Some(filler) = kind_from_term(filler) else {
        return Ok((error(), invalid_kind()).encode(env));
    };
    let pattern = match FilteredWrap::from_steps(filler, names.into_iter().map(NameStep::new)) {
        Ok(p) => p,
        Err(e) => return Ok((error(), e.to_string()).encode(env)),
    };

    let index = &index_ref.index;
    let doc = index.document();
    let Some(parent) = index.navigate_to(path) else {
        return Ok((error(), path_not_found()).encode(env));
    };
    let children = doc.children(parent);
    let found = if repeated {
        pattern.find_all(doc, &children)
    } else {
        pattern.scan(doc, children, false)
    };
    Ok((ok(), matches_to_term(env, doc, &found)).encode(env))
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.XmlCake.Native");
