//! Byte cursor with memchr-backed delimiter search
//!
//! Every `take_*` method consumes what it returns. On failure the cursor
//! does not move, so callers can decide how to recover.

use memchr::{memchr, memchr3, memmem};

pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Unconsumed input
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    pub fn at(&self, prefix: &[u8]) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Consume `prefix` if the input continues with it
    #[inline]
    pub fn eat(&mut self, prefix: &[u8]) -> bool {
        let found = self.at(prefix);
        if found {
            self.pos += prefix.len();
        }
        found
    }

    /// Move back to an earlier position
    #[inline]
    pub fn rewind(&mut self, pos: usize) {
        self.pos = pos.min(self.pos);
    }

    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.input[start..end]
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    pub fn take_while(&mut self, mut pred: impl FnMut(u8) -> bool) -> &'a [u8] {
        let rest = self.rest();
        let len = rest.iter().position(|&b| !pred(b)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    #[inline]
    pub fn skip_whitespace(&mut self) {
        self.take_while(is_whitespace);
    }

    /// Everything up to the next `<` (or the end)
    pub fn take_text(&mut self) -> &'a [u8] {
        let rest = self.rest();
        let len = memchr(b'<', rest).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    pub fn take_rest(&mut self) -> &'a [u8] {
        let rest = self.rest();
        self.pos = self.input.len();
        rest
    }

    /// Body up to `terminator`, consuming both
    pub fn take_through(&mut self, terminator: &[u8]) -> Option<&'a [u8]> {
        let rest = self.rest();
        let len = memmem::find(rest, terminator)?;
        self.pos += len + terminator.len();
        Some(&rest[..len])
    }

    /// Body up to the `>` closing a tag, ignoring any `>` inside quoted values
    pub fn take_tag_body(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest();
        let mut i = 0;
        loop {
            i += memchr3(b'>', b'"', b'\'', &rest[i..])?;
            match rest[i] {
                b'>' => {
                    self.pos += i + 1;
                    return Some(&rest[..i]);
                }
                quote => i += 1 + memchr(quote, &rest[i + 1..])? + 1,
            }
        }
    }
}

/// Split tag content (`name attr="v" ...`) into the name and the attribute tail
pub fn split_tag_name(content: &[u8]) -> (&[u8], &[u8]) {
    let end = content
        .iter()
        .position(|&b| is_whitespace(b) || b == b'/')
        .unwrap_or(content.len());
    content.split_at(end)
}

pub fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| !is_whitespace(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| !is_whitespace(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// ASCII letters, `_`, `:` and any byte of a multi-byte UTF-8 sequence
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || !b.is_ascii()
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_text() {
        let mut s = Scanner::new(b"hello <world>");
        assert_eq!(s.take_text(), b"hello ");
        assert!(s.at(b"<world"));
        assert_eq!(s.take_text(), b"");
    }

    #[test]
    fn test_take_tag_body_skips_quoted() {
        let mut s = Scanner::new(b"a attr=\">test\">content");
        assert_eq!(s.take_tag_body(), Some(&b"a attr=\">test\""[..]));
        assert_eq!(s.rest(), b"content");

        let mut s = Scanner::new(b"a x='\">'>");
        assert_eq!(s.take_tag_body(), Some(&b"a x='\">'"[..]));

        let mut s = Scanner::new(b"a x=\"never closed>");
        assert_eq!(s.take_tag_body(), None);
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn test_take_through() {
        let mut s = Scanner::new(b" a -- b -->rest");
        assert_eq!(s.take_through(b"-->"), Some(&b" a -- b "[..]));
        assert_eq!(s.rest(), b"rest");
        assert_eq!(s.take_through(b"-->"), None);
        assert_eq!(s.take_rest(), b"rest");
        assert!(s.is_eof());
    }

    #[test]
    fn test_eat_and_whitespace() {
        let mut s = Scanner::new(b"<!--  \t\n x");
        assert!(!s.eat(b"<?"));
        assert!(s.eat(b"<!--"));
        s.skip_whitespace();
        assert_eq!(s.peek(), Some(b'x'));
    }

    #[test]
    fn test_split_and_trim() {
        assert_eq!(split_tag_name(b"item name=\"a\""), (&b"item"[..], &b" name=\"a\""[..]));
        assert_eq!(split_tag_name(b"br/"), (&b"br"[..], &b"/"[..]));
        assert_eq!(trim(b"  x y \n"), b"x y");
        assert_eq!(trim(b"   "), b"");
    }
}
