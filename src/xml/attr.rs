//! Typed attribute accessors on [`Element`].
//!
//! Getters follow one contract: a missing attribute yields the default unless
//! it is required, and every present value must parse and sit in range.

use std::net::Ipv4Addr;

use super::{Element, Enumeration};
use crate::error::{PsiError, Result};

/// Unsigned field types that can be carried in an XML attribute.
pub trait XmlInt: Copy + Into<u64> + TryFrom<u64> {
    /// Digits used when the value is written in hexadecimal.
    const HEX_DIGITS: usize;
}

impl XmlInt for u8 {
    const HEX_DIGITS: usize = 2;
}

impl XmlInt for u16 {
    const HEX_DIGITS: usize = 4;
}

impl XmlInt for u32 {
    const HEX_DIGITS: usize = 8;
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_int(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Uppercase hex bytes separated by spaces.
pub fn to_hex_text(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inverse of [`to_hex_text`]; whitespace anywhere is ignored.
pub fn parse_hex_text(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}

impl Element {
    pub fn set_int_attribute<T: XmlInt>(&mut self, name: &str, value: T, hex: bool) {
        let v: u64 = value.into();
        let text = if hex {
            format!("0x{:0width$X}", v, width = T::HEX_DIGITS)
        } else {
            v.to_string()
        };
        self.set_attribute(name, text);
    }

    /// Absent values produce no attribute.
    pub fn set_optional_int_attribute<T: XmlInt>(&mut self, name: &str, value: Option<T>, hex: bool) {
        if let Some(v) = value {
            self.set_int_attribute(name, v, hex);
        }
    }

    pub fn set_bool_attribute(&mut self, name: &str, value: bool) {
        self.set_attribute(name, if value { "true" } else { "false" });
    }

    pub fn set_enum_attribute(&mut self, names: &Enumeration, name: &str, value: impl Into<u64>) {
        self.set_attribute(name, names.name(value.into()));
    }

    pub fn add_hex_text_child(&mut self, name: &str, data: &[u8]) {
        self.add_element(name).set_text(to_hex_text(data));
    }

    fn missing(&self, name: &str) -> PsiError {
        PsiError::schema(format!(
            "missing required attribute '{name}' in <{}>",
            self.name()
        ))
    }

    fn out_of_range(&self, name: &str, text: &str, min: u64, max: u64) -> PsiError {
        PsiError::schema(format!(
            "'{text}' out of range {min}..={max} for attribute '{name}' in <{}>",
            self.name()
        ))
    }

    pub fn get_int_attribute<T: XmlInt>(
        &self,
        name: &str,
        required: bool,
        default: T,
        min: T,
        max: T,
    ) -> Result<T> {
        match self.get_optional_int_attribute(name, min, max)? {
            Some(v) => Ok(v),
            None if required => Err(self.missing(name)),
            None => Ok(default),
        }
    }

    pub fn get_optional_int_attribute<T: XmlInt>(&self, name: &str, min: T, max: T) -> Result<Option<T>> {
        let Some(text) = self.attribute(name) else {
            return Ok(None);
        };
        let v = parse_int(text).ok_or_else(|| {
            PsiError::schema(format!(
                "'{text}' is not an integer for attribute '{name}' in <{}>",
                self.name()
            ))
        })?;
        let (lo, hi): (u64, u64) = (min.into(), max.into());
        if v < lo || v > hi {
            return Err(self.out_of_range(name, text, lo, hi));
        }
        T::try_from(v)
            .map(Some)
            .map_err(|_| self.out_of_range(name, text, lo, hi))
    }

    pub fn get_bool_attribute(&self, name: &str, required: bool, default: bool) -> Result<bool> {
        match self.attribute(name) {
            None if required => Err(self.missing(name)),
            None => Ok(default),
            Some(text) => parse_bool(text).ok_or_else(|| {
                PsiError::schema(format!(
                    "'{text}' is not a boolean for attribute '{name}' in <{}>",
                    self.name()
                ))
            }),
        }
    }

    /// Symbolic name from `names`, or a raw integer in `0..=max`.
    pub fn get_enum_attribute<T: XmlInt>(
        &self,
        names: &Enumeration,
        name: &str,
        required: bool,
        default: T,
        max: T,
    ) -> Result<T> {
        let text = match self.attribute(name) {
            None if required => return Err(self.missing(name)),
            None => return Ok(default),
            Some(text) => text,
        };
        let v = names.value(text.trim()).or_else(|| parse_int(text)).ok_or_else(|| {
            PsiError::schema(format!(
                "'{text}' is not a valid value for attribute '{name}' in <{}>",
                self.name()
            ))
        })?;
        let hi: u64 = max.into();
        if v > hi {
            return Err(self.out_of_range(name, text, 0, hi));
        }
        T::try_from(v).map_err(|_| self.out_of_range(name, text, 0, hi))
    }

    /// `max_units` bounds the length in UTF-16 code units.
    pub fn get_text_attribute(
        &self,
        name: &str,
        required: bool,
        default: &str,
        max_units: usize,
    ) -> Result<String> {
        let value = match self.attribute(name) {
            None if required => return Err(self.missing(name)),
            None => default.to_string(),
            Some(text) => text.to_string(),
        };
        if value.encode_utf16().count() > max_units {
            return Err(PsiError::schema(format!(
                "attribute '{name}' in <{}> longer than {max_units} characters",
                self.name()
            )));
        }
        Ok(value)
    }

    pub fn get_ipv4_attribute(&self, name: &str, required: bool) -> Result<Ipv4Addr> {
        match self.attribute(name) {
            None if required => Err(self.missing(name)),
            None => Ok(Ipv4Addr::UNSPECIFIED),
            Some(text) => text.trim().parse().map_err(|_| {
                PsiError::schema(format!(
                    "'{text}' is not an IPv4 address for attribute '{name}' in <{}>",
                    self.name()
                ))
            }),
        }
    }

    /// Bytes of an optional single hex-text child, empty when absent.
    pub fn get_hex_text_child(&self, name: &str, required: bool, max_size: usize) -> Result<Vec<u8>> {
        let mut found = self.children_named(name);
        let Some(child) = found.next() else {
            return if required {
                Err(PsiError::schema(format!(
                    "missing required <{name}> in <{}>",
                    self.name()
                )))
            } else {
                Ok(Vec::new())
            };
        };
        if found.next().is_some() {
            return Err(PsiError::schema(format!(
                "more than one <{name}> in <{}>",
                self.name()
            )));
        }
        let data = parse_hex_text(child.text())
            .ok_or_else(|| PsiError::schema(format!("invalid hexadecimal content in <{name}>")))?;
        if data.len() > max_size {
            return Err(PsiError::schema(format!(
                "<{name}> holds {} bytes, at most {max_size} allowed",
                data.len()
            )));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_attribute_formats() {
        let mut e = Element::new("x");
        e.set_int_attribute("id", 0x0500u16, true);
        e.set_int_attribute("rate", 500u16, false);
        e.set_int_attribute("tag", 0x0Au8, true);
        assert_eq!(e.attribute("id"), Some("0x0500"));
        assert_eq!(e.attribute("rate"), Some("500"));
        assert_eq!(e.attribute("tag"), Some("0x0A"));
    }

    #[test]
    fn test_get_int_attribute_rules() {
        let mut e = Element::new("x");
        e.set_attribute("version", "32");
        e.set_attribute("id", "0x1F");
        assert_eq!(e.get_int_attribute::<u8>("id", true, 0, 0, 0xFF).unwrap(), 0x1F);
        assert!(e.get_int_attribute::<u8>("version", false, 0, 0, 31).is_err());
        assert!(e.get_int_attribute::<u16>("absent", true, 0, 0, 0xFFFF).is_err());
        assert_eq!(e.get_int_attribute::<u16>("absent", false, 7, 0, 0xFFFF).unwrap(), 7);

        e.set_attribute("big", "70000");
        assert!(e.get_int_attribute::<u16>("big", true, 0, 0, u16::MAX).is_err());
        e.set_attribute("junk", "twelve");
        assert!(e.get_int_attribute::<u16>("junk", true, 0, 0, u16::MAX).is_err());
    }

    #[test]
    fn test_enum_attribute_accepts_name_or_number() {
        const MODES: Enumeration = Enumeration::new(&[("8-VSB", 4)]);
        let mut e = Element::new("x");
        e.set_attribute("a", "8-vsb");
        e.set_attribute("b", "17");
        e.set_attribute("c", "nope");
        assert_eq!(e.get_enum_attribute::<u8>(&MODES, "a", true, 0, 0xFF).unwrap(), 4);
        assert_eq!(e.get_enum_attribute::<u8>(&MODES, "b", true, 0, 0xFF).unwrap(), 17);
        assert!(e.get_enum_attribute::<u8>(&MODES, "b", true, 0, 0x0F).is_err());
        assert!(e.get_enum_attribute::<u8>(&MODES, "c", true, 0, 0xFF).is_err());
    }

    #[test]
    fn test_hex_text_roundtrip_and_errors() {
        assert_eq!(to_hex_text(&[0xD9, 0x04, 0x00]), "D9 04 00");
        assert_eq!(parse_hex_text(" d9 04\n00 "), Some(vec![0xD9, 0x04, 0x00]));
        assert_eq!(parse_hex_text("ABC"), None);
        assert_eq!(parse_hex_text("ZZ"), None);

        let mut e = Element::new("x");
        e.add_hex_text_child("private_data", &[1, 2, 3]);
        assert_eq!(e.get_hex_text_child("private_data", false, 8).unwrap(), vec![1, 2, 3]);
        assert!(e.get_hex_text_child("private_data", false, 2).is_err());
        assert!(e.get_hex_text_child("other", false, 8).unwrap().is_empty());
        assert!(e.get_hex_text_child("other", true, 8).is_err());
    }

    #[test]
    fn test_bool_and_text_attributes() {
        let mut e = Element::new("x");
        e.set_bool_attribute("hidden", true);
        e.set_attribute("short_name", "ABCDEFGH");
        assert!(e.get_bool_attribute("hidden", false, false).unwrap());
        assert!(e.get_bool_attribute("missing", false, true).unwrap());
        assert!(e.get_text_attribute("short_name", true, "", 7).is_err());
        assert_eq!(e.get_text_attribute("short_name", true, "", 8).unwrap(), "ABCDEFGH");
    }
}
