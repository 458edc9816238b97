//! Ordered descriptor lists and their length-prefixed loops.

use bytes::Bytes;
use log::debug;
use serde::Serialize;

use super::{descriptor_from_xml, descriptor_to_xml, Descriptor, DescriptorCodec};
use crate::constants::DESCRIPTOR_HEADER_SIZE;
use crate::error::{PsiError, Result};
use crate::field::{get_u16, put_u16};
use crate::xml::Element;

/// 16-bit field holding a descriptor loop length: reserved high bits set to
/// all ones, then a `bits`-wide length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthField {
    pub reserved: u16,
    pub bits: u32,
}

impl LengthField {
    /// `1111` + 12-bit length, used by most tables.
    pub const STANDARD: Self = Self {
        reserved: 0x000F,
        bits: 12,
    };
    /// `111111` + 10-bit length, used by virtual channel tables.
    pub const VCT: Self = Self {
        reserved: 0x003F,
        bits: 10,
    };

    pub const fn max_length(&self) -> usize {
        (1usize << self.bits) - 1
    }

    pub fn encode(&self, length: usize) -> u16 {
        (self.reserved << self.bits) | (length.min(self.max_length()) as u16)
    }

    pub fn decode(&self, raw: u16) -> usize {
        (raw as usize) & self.max_length()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DescriptorList {
    descs: Vec<Descriptor>,
}

impl DescriptorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.descs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    pub fn clear(&mut self) {
        self.descs.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Descriptor> {
        self.descs.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Descriptor> {
        self.descs.get(index)
    }

    pub fn push(&mut self, desc: Descriptor) {
        self.descs.push(desc);
    }

    /// Serializes a typed descriptor and appends it.
    pub fn add<T: DescriptorCodec>(&mut self, desc: &T) {
        self.descs.push(desc.serialize());
    }

    /// Index of the first descriptor with `tag`, at or after `start`.
    pub fn search(&self, tag: u8, start: usize) -> Option<usize> {
        self.descs
            .iter()
            .skip(start)
            .position(|d| d.tag == tag)
            .map(|i| i + start)
    }

    /// Total size of all descriptors on the wire, loop length excluded.
    pub fn binary_size(&self) -> usize {
        self.descs.iter().map(Descriptor::size).sum()
    }

    /// Appends every complete descriptor found in `data`. Stops at the first
    /// descriptor overrunning the buffer and returns false in that case.
    pub fn add_wire(&mut self, data: &[u8]) -> bool {
        let mut offset = 0;
        while offset + DESCRIPTOR_HEADER_SIZE <= data.len() {
            let tag = data[offset];
            let length = data[offset + 1] as usize;
            let start = offset + DESCRIPTOR_HEADER_SIZE;
            if start + length > data.len() {
                debug!("descriptor 0x{tag:02X} overruns its loop by {} bytes", start + length - data.len());
                return false;
            }
            self.descs
                .push(Descriptor::new(tag, Bytes::copy_from_slice(&data[start..start + length])));
            offset = start + length;
        }
        offset == data.len()
    }

    /// Writes a length field followed by the descriptors starting at `start`,
    /// as many as fit in `out` and in the length field. Descriptors are never
    /// split.
    ///
    /// Returns the index of the first descriptor not written and the number
    /// of bytes written (length field included). Nothing is written when
    /// `out` cannot hold the length field.
    pub fn serialize_loop(&self, out: &mut [u8], start: usize, field: LengthField) -> (usize, usize) {
        if out.len() < 2 {
            return (start, 0);
        }
        let limit = (out.len() - 2).min(field.max_length());
        let mut size = 0;
        let mut index = start;
        while let Some(desc) = self.descs.get(index) {
            if size + desc.size() > limit {
                break;
            }
            let at = 2 + size;
            out[at] = desc.tag;
            out[at + 1] = desc.payload().len() as u8;
            out[at + 2..at + desc.size()].copy_from_slice(desc.payload());
            size += desc.size();
            index += 1;
        }
        put_u16(out, 0, field.encode(size));
        (index, 2 + size)
    }

    /// Reads a length-prefixed loop at the start of `data`. The declared
    /// length is capped to the bytes actually present. Returns the bytes
    /// consumed, or `None` if `data` cannot even hold the length field.
    pub fn deserialize_loop(&mut self, data: &[u8], field: LengthField) -> Option<usize> {
        if data.len() < 2 {
            return None;
        }
        let declared = field.decode(get_u16(data, 0));
        let length = declared.min(data.len() - 2);
        if length < declared {
            debug!("descriptor loop length {declared} capped to {length}");
        }
        self.add_wire(&data[2..2 + length]);
        Some(2 + length)
    }

    /// Adds one XML child per descriptor to `parent`.
    pub fn to_xml(&self, parent: &mut Element, tid: u8) {
        for desc in &self.descs {
            parent.push_child(descriptor_to_xml(desc, tid));
        }
    }

    /// Collects the descriptor children of `parent`. Children named in
    /// `others` are skipped; any other non-descriptor child is an error.
    pub fn from_xml(parent: &Element, tid: u8, others: &[&str]) -> Result<Self> {
        let mut list = Self::new();
        for child in parent.children() {
            match descriptor_from_xml(child, tid) {
                Some(desc) => list.push(desc?),
                None if others.iter().any(|o| child.has_name(o)) => {}
                None => {
                    return Err(PsiError::schema(format!(
                        "unexpected <{}> in <{}>",
                        child.name(),
                        parent.name()
                    )));
                }
            }
        }
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a DescriptorList {
    type Item = &'a Descriptor;
    type IntoIter = std::slice::Iter<'a, Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descs.iter()
    }
}

impl FromIterator<Descriptor> for DescriptorList {
    fn from_iter<I: IntoIterator<Item = Descriptor>>(iter: I) -> Self {
        Self {
            descs: iter.into_iter().collect(),
        }
    }
}
