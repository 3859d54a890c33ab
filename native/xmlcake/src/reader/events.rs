//! Reader events

use std::borrow::Cow;

use crate::core::attributes::Attribute;

/// One syntactic construct of the input
#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// `<name ...>` or `<name .../>`
    Open(Tag<'a>),
    /// `</name>`
    Close(&'a [u8]),
    /// Character data with entities decoded
    Text(Cow<'a, [u8]>),
    CData(&'a [u8]),
    Comment(&'a [u8]),
    Pi { target: &'a [u8], data: &'a [u8] },
    /// XML declaration or DOCTYPE; carries nothing the tree keeps
    Prolog,
}

#[derive(Debug, Clone)]
pub struct Tag<'a> {
    pub name: &'a [u8],
    pub attributes: Vec<Attribute<'a>>,
    pub self_closing: bool,
}

impl Tag<'_> {
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name.as_bytes())
            .and_then(Attribute::value_str)
    }
}
