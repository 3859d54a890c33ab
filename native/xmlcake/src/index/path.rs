//! Path keys
//!
//! A path key is a `/`-joined list of segments, one per level below the
//! index root. A segment is either a generated key or a synthetic
//! `{typeTag}{siblingIndex}` for nodes the generator cannot tell apart.

use memchr::memchr;

/// Segment divider
pub const DIVIDER: char = '/';

/// Append a segment, inserting a divider unless `parent` is empty or already ends with one
pub fn join(parent: &str, segment: &str) -> String {
    let mut path = String::with_capacity(parent.len() + segment.len() + 1);
    path.push_str(parent);
    if !parent.is_empty() && !parent.ends_with(DIVIDER) {
        path.push(DIVIDER);
    }
    path.push_str(segment);
    path
}

/// Positional segment for an anonymous node
pub fn synthetic_segment(type_tag: &str, index: usize) -> String {
    format!("{}{}", type_tag, index)
}

/// Split a segment of the exact form `{tag}{index}` into its parts
///
/// The tag must be non-empty and the index a canonical decimal (no sign,
/// no leading zeros), which is exactly what [`synthetic_segment`] produces.
pub fn parse_synthetic(segment: &str) -> Option<(&str, usize)> {
    let tag_len = segment.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if tag_len == 0 || tag_len == segment.len() {
        return None;
    }
    let (tag, digits) = segment.split_at(tag_len);
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok().map(|index| (tag, index))
}

/// True if `path` lies strictly below `ancestor`
pub fn is_below(path: &str, ancestor: &str) -> bool {
    let prefix = ancestor.trim_end_matches(DIVIDER);
    path.len() > prefix.len() + 1
        && path.starts_with(prefix)
        && path[prefix.len()..].starts_with(DIVIDER)
}

/// Iterate over the non-empty segments of a path
pub fn segments(path: &str) -> Segments<'_> {
    Segments { path, pos: 0 }
}

/// Iterator returned by [`segments`]
pub struct Segments<'a> {
    path: &'a str,
    pos: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.pos <= self.path.len() {
            let rest = &self.path[self.pos..];
            let segment = match memchr(DIVIDER as u8, rest.as_bytes()) {
                Some(i) => {
                    self.pos += i + 1;
                    &rest[..i]
                }
                None => {
                    self.pos = self.path.len() + 1;
                    rest
                }
            };
            if !segment.is_empty() {
                return Some(segment);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", "b"), "a/b");
        assert_eq!(join("a/", "b"), "a/b");
        assert_eq!(join("a/b", &synthetic_segment("Element", 3)), "a/b/Element3");
    }

    #[test]
    fn test_parse_synthetic() {
        assert_eq!(parse_synthetic("Element0"), Some(("Element", 0)));
        assert_eq!(parse_synthetic("Element12"), Some(("Element", 12)));
        assert_eq!(parse_synthetic("Element"), None);
        assert_eq!(parse_synthetic("42"), None);
        assert_eq!(parse_synthetic("Element01"), None);
        assert_eq!(parse_synthetic("MyElement3x"), None);
    }

    #[test]
    fn test_segments() {
        let parts: Vec<_> = segments("a/Element1//c/").collect();
        assert_eq!(parts, ["a", "Element1", "c"]);
        assert_eq!(segments("").count(), 0);
        assert_eq!(segments("/").count(), 0);
        assert_eq!(segments("solo").collect::<Vec<_>>(), ["solo"]);
    }

    #[test]
    fn test_is_below() {
        assert!(is_below("a/b", "a"));
        assert!(is_below("a/b/c", "a/"));
        assert!(!is_below("a", "a"));
        assert!(!is_below("ab/c", "a"));
        assert!(!is_below("a/", "a"));
    }
}
