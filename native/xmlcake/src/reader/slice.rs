//! Zero-Copy Slice Reader
//!
//! Pulls events from a byte slice. Names and markup bodies borrow from the
//! input; text is only copied when entities had to be decoded.
//!
//! A lenient reader never stops early: unterminated constructs run to the
//! end of input and a `<` that does not open a tag is read as text. A
//! strict reader stops at the first such problem and records it.

use std::borrow::Cow;

use super::events::{Tag, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::entities::decode_text;
use crate::core::scanner::{is_name_start_char, split_tag_name, trim, Scanner};

/// First well-formedness failure seen by a strict reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadError {
    pub message: String,
    pub position: usize,
}

pub struct SliceReader<'a> {
    scanner: Scanner<'a>,
    strict: bool,
    error: Option<ReadError>,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader { scanner: Scanner::new(input), strict: false, error: None }
    }

    pub fn new_strict(input: &'a [u8]) -> Self {
        SliceReader { scanner: Scanner::new(input), strict: true, error: None }
    }

    pub fn error(&self) -> Option<&ReadError> {
        self.error.as_ref()
    }

    /// Byte offset of the next unread input
    pub fn offset(&self) -> usize {
        self.scanner.position()
    }

    /// Next event, or None at end of input (or after a strict error)
    pub fn next_event(&mut self) -> Option<XmlEvent<'a>> {
        if self.error.is_some() || self.scanner.is_eof() {
            return None;
        }
        if self.scanner.peek() != Some(b'<') {
            return Some(XmlEvent::Text(decode_text(self.scanner.take_text())));
        }

        let start = self.scanner.position();
        if self.scanner.eat(b"<!--") {
            let body = self.body(b"-->", "Unterminated comment", start)?;
            Some(XmlEvent::Comment(body))
        } else if self.scanner.eat(b"<![CDATA[") {
            let body = self.body(b"]]>", "Unterminated CDATA section", start)?;
            Some(XmlEvent::CData(body))
        } else if self.scanner.at(b"<!") {
            self.doctype(start)
        } else if self.scanner.eat(b"<?") {
            let body = self.body(b"?>", "Unterminated processing instruction", start)?;
            let (target, data) = split_tag_name(body);
            if target.eq_ignore_ascii_case(b"xml") {
                Some(XmlEvent::Prolog)
            } else {
                Some(XmlEvent::Pi { target, data: trim(data) })
            }
        } else if self.scanner.eat(b"</") {
            self.close_tag(start)
        } else {
            self.open_tag(start)
        }
    }

    /// Body up to `terminator`; a lenient reader takes the rest of the input
    fn body(&mut self, terminator: &[u8], message: &str, start: usize) -> Option<&'a [u8]> {
        match self.scanner.take_through(terminator) {
            Some(body) => Some(body),
            None if self.fail(message, start) => None,
            None => Some(self.scanner.take_rest()),
        }
    }

    fn doctype(&mut self, start: usize) -> Option<XmlEvent<'a>> {
        // Internal subsets nest brackets and may contain '>'
        let mut depth = 0usize;
        let len = self.scanner.rest().iter().position(|&b| {
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return true,
                _ => {}
            }
            false
        });
        match len {
            Some(len) => {
                self.scanner.advance(len + 1);
                Some(XmlEvent::Prolog)
            }
            None => {
                self.fail("Unterminated DOCTYPE declaration", start);
                None
            }
        }
    }

    fn close_tag(&mut self, start: usize) -> Option<XmlEvent<'a>> {
        let Some(body) = self.scanner.take_tag_body() else {
            self.fail("Unterminated end tag", start);
            return None;
        };
        let name = trim(body);
        if name.is_empty() && self.fail("End tag without a name", start) {
            return None;
        }
        Some(XmlEvent::Close(name))
    }

    fn open_tag(&mut self, start: usize) -> Option<XmlEvent<'a>> {
        self.scanner.advance(1);
        let body = match self.scanner.take_tag_body() {
            Some(body) if body.first().copied().is_some_and(is_name_start_char) => body,
            Some(_) if self.fail("Invalid element name", start) => return None,
            None if self.fail("Unterminated start tag", start) => return None,
            _ => return Some(self.stray_lt(start)),
        };

        let (content, self_closing) = match body.strip_suffix(b"/") {
            Some(content) => (content, true),
            None => (body, false),
        };
        let (name, tail) = split_tag_name(content);
        let attributes = match parse_attributes(tail, self.strict) {
            Ok(attributes) => attributes,
            Err(message) => {
                self.fail(message, start);
                return None;
            }
        };
        Some(XmlEvent::Open(Tag { name, attributes, self_closing }))
    }

    /// Lenient recovery: a `<` that opens nothing is one byte of text
    fn stray_lt(&mut self, start: usize) -> XmlEvent<'a> {
        self.scanner.rewind(start + 1);
        XmlEvent::Text(Cow::Borrowed(self.scanner.slice(start, start + 1)))
    }

    /// Record an error in strict mode. Returns true when the caller must stop.
    fn fail(&mut self, message: &str, position: usize) -> bool {
        if self.strict && self.error.is_none() {
            self.error = Some(ReadError { message: message.to_string(), position });
        }
        self.strict
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = XmlEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &[u8]) -> Vec<XmlEvent<'_>> {
        SliceReader::new(input).collect()
    }

    #[test]
    fn test_simple_element() {
        let events = events(b"<root>hello</root>");
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], XmlEvent::Open(t) if t.name == b"root" && !t.self_closing));
        assert!(matches!(&events[1], XmlEvent::Text(t) if t.as_ref() == b"hello"));
        assert!(matches!(&events[2], XmlEvent::Close(name) if *name == b"root"));
    }

    #[test]
    fn test_self_closing_with_attributes() {
        let events = events(b"<div id=\"main\" class=\"a/b\"/>");
        assert_eq!(events.len(), 1);
        let XmlEvent::Open(tag) = &events[0] else {
            panic!("expected a tag, got {:?}", events[0]);
        };
        assert!(tag.self_closing);
        assert_eq!(tag.name_str(), Some("div"));
        assert_eq!(tag.attribute("id"), Some("main"));
        assert_eq!(tag.attribute("class"), Some("a/b"));
        assert_eq!(tag.attribute("missing"), None);
    }

    #[test]
    fn test_markup_kinds() {
        let input = b"<?xml version=\"1.0\"?><!DOCTYPE r [<!ENTITY a \"b\">]><r><![CDATA[<x>]]><!-- c --><?go now?></r>";
        let events = events(input);
        assert_eq!(events.len(), 7);
        assert!(matches!(events[0], XmlEvent::Prolog));
        assert!(matches!(events[1], XmlEvent::Prolog));
        assert!(matches!(&events[3], XmlEvent::CData(c) if *c == b"<x>"));
        assert!(matches!(&events[4], XmlEvent::Comment(c) if *c == b" c "));
        assert!(matches!(
            &events[5],
            XmlEvent::Pi { target, data } if *target == b"go" && *data == b"now"
        ));
    }

    #[test]
    fn test_text_entities_decoded() {
        let events = events(b"<a>1 &lt; 2</a>");
        assert!(matches!(&events[1], XmlEvent::Text(t) if t.as_ref() == b"1 < 2"));
    }

    #[test]
    fn test_lenient_recovery() {
        let events = events(b"<a><!-- never closed");
        assert!(matches!(&events[1], XmlEvent::Comment(c) if *c == b" never closed"));

        let events = SliceReader::new(b"a < b").collect::<Vec<_>>();
        let text: Vec<u8> = events
            .iter()
            .flat_map(|e| match e {
                XmlEvent::Text(t) => t.to_vec(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(text, b"a < b");
    }

    #[test]
    fn test_strict_reports_error() {
        let mut reader = SliceReader::new_strict(b"<a><!-- never closed");
        let events: Vec<_> = reader.by_ref().collect();
        assert_eq!(events.len(), 1);
        let err = reader.error().unwrap();
        assert_eq!(err.message, "Unterminated comment");
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_offset_through_mut_ref() {
        let mut reader = SliceReader::new(b"<a>text</a>");
        let by_ref = &mut reader;
        assert!(matches!(by_ref.next(), Some(XmlEvent::Open(_))));
        assert_eq!(by_ref.offset(), 3);
        assert_eq!(by_ref.count(), 2);
        assert_eq!(reader.offset(), 11);
    }

    #[test]
    fn test_strict_rejects_bad_attribute() {
        let mut reader = SliceReader::new_strict(b"<a x=1/>");
        assert!(reader.next_event().is_none());
        assert_eq!(reader.error().map(|e| e.position), Some(0));
    }
}
