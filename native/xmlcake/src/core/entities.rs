//! Entity references in character data and attribute values
//!
//! The five predefined entities and decimal or hex character references are
//! replaced. Anything else beginning with `&` passes through untouched.

use std::borrow::Cow;

use memchr::memchr;

/// Replace entity references, borrowing the input when it has none
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    match memchr(b'&', input) {
        None => Cow::Borrowed(input),
        Some(first) => Cow::Owned(decode_from(input, first)),
    }
}

fn decode_from(input: &[u8], first: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    out.extend_from_slice(&input[..first]);
    let mut rest = &input[first..];

    while !rest.is_empty() {
        let replaced = memchr(b';', rest).and_then(|semi| Some((reference(&rest[1..semi])?, semi)));
        let consumed = match replaced {
            Some((c, semi)) => {
                out.extend_from_slice(c.encode_utf8(&mut [0u8; 4]).as_bytes());
                semi + 1
            }
            None => {
                out.push(b'&');
                1
            }
        };
        rest = &rest[consumed..];

        let plain = memchr(b'&', rest).unwrap_or(rest.len());
        out.extend_from_slice(&rest[..plain]);
        rest = &rest[plain..];
    }
    out
}

/// `body` is what sits between `&` and `;`
fn reference(body: &[u8]) -> Option<char> {
    let (digits, radix) = match body {
        b"lt" => return Some('<'),
        b"gt" => return Some('>'),
        b"amp" => return Some('&'),
        b"quot" => return Some('"'),
        b"apos" => return Some('\''),
        [b'#', b'x' | b'X', hex @ ..] => (hex, 16),
        [b'#', dec @ ..] => (dec, 10),
        _ => return None,
    };
    if digits.is_empty() || !digits.iter().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let code = u32::from_str_radix(std::str::from_utf8(digits).ok()?, radix).ok()?;
    char::from_u32(code).filter(|&c| c != '\0')
}

/// Append `s` with markup characters replaced by entities
#[inline]
pub fn escape_to_buf(s: &str, buf: &mut String) {
    let mut plain = 0;
    for (i, b) in s.bytes().enumerate() {
        let entity = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            _ => continue,
        };
        buf.push_str(&s[plain..i]);
        buf.push_str(entity);
        plain = i + 1;
    }
    buf.push_str(&s[plain..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_input_is_borrowed() {
        assert!(matches!(decode_text(b"dune by herbert"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_predefined_entities() {
        let decoded = decode_text(b"&lt;book title=&quot;x&quot;&gt; &amp; &apos;");
        assert_eq!(decoded.as_ref(), b"<book title=\"x\"> & '");
    }

    #[test]
    fn test_character_references() {
        assert_eq!(decode_text(b"&#100;une &#x44;&#X55;").as_ref(), b"dune DU");
        assert_eq!(decode_text(b"&#9731;").as_ref(), "\u{2603}".as_bytes());
    }

    #[test]
    fn test_unrecognized_references_pass_through() {
        assert_eq!(decode_text(b"&copy; a & b &#; &#0; &#12x;").as_ref(), b"&copy; a & b &#; &#0; &#12x;");
    }

    #[test]
    fn test_escape_to_buf() {
        let mut buf = String::from("x=");
        escape_to_buf("\"a\" < b & c > d", &mut buf);
        assert_eq!(buf, "x=&quot;a&quot; &lt; b &amp; c &gt; d");
    }
}
