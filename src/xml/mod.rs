//! Minimal XML element tree used as the textual form of tables and
//! descriptors.
//!
//! Entities build an [`Element`] with typed attribute setters (see `attr`)
//! and read one back with typed, range-checked getters. Conversion from and
//! to XML text lives in `text`.

mod attr;
mod enumeration;
mod text;

pub use attr::{parse_hex_text, to_hex_text, XmlInt};
pub use enumeration::Enumeration;
pub use text::{parse_document, to_document};

use crate::error::{PsiError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element names compare case-insensitively.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn check_name(&self, expected: &str) -> Result<()> {
        if self.has_name(expected) {
            Ok(())
        } else {
            Err(PsiError::schema(format!(
                "incorrect element <{}>, expected <{}>",
                self.name, expected
            )))
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets an attribute, replacing a previous value of the same name.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.has_name(name))
    }

    pub fn add_element(&mut self, name: impl Into<String>) -> &mut Element {
        self.children.push(Element::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub(crate) fn append_text(&mut self, text: &str) {
        self.text.push_str(text);
    }
}
