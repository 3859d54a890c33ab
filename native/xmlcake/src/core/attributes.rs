//! Attribute parsing from the tail of a start tag

use std::borrow::Cow;

use super::entities::decode_text;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace, Scanner};

#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    pub name: &'a [u8],
    /// Entities decoded
    pub value: Cow<'a, [u8]>,
}

impl Attribute<'_> {
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

/// Parse `name="value"` pairs
///
/// Lenient parsing skips stray bytes and accepts bare names (empty value)
/// and unquoted values. Strict parsing reports the first malformed pair.
pub fn parse_attributes(tail: &[u8], strict: bool) -> Result<Vec<Attribute<'_>>, &'static str> {
    let mut attrs = Vec::new();
    let mut s = Scanner::new(tail);

    loop {
        s.skip_whitespace();
        match s.peek() {
            None | Some(b'/') => break,
            Some(b) if !is_name_start_char(b) => {
                if strict {
                    return Err("Attribute name must start with letter, underscore, or colon");
                }
                s.advance(1);
                continue;
            }
            Some(_) => {}
        }

        let name = s.take_while(is_name_char);
        s.skip_whitespace();
        if !s.eat(b"=") {
            if strict {
                return Err("Attribute value required");
            }
            attrs.push(Attribute { name, value: Cow::Borrowed(b"") });
            continue;
        }
        s.skip_whitespace();

        let raw = match s.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                s.advance(1);
                match s.take_through(&[quote]) {
                    Some(raw) => raw,
                    None if strict => return Err("Unterminated attribute value"),
                    None => s.take_rest(),
                }
            }
            _ if strict => return Err("Attribute value must be quoted"),
            _ => s.take_while(|b| !is_whitespace(b) && b != b'/'),
        };
        attrs.push(Attribute { name, value: decode_text(raw) });
    }

    Ok(attrs)
}
