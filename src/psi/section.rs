// psi/section.rs
//! Long PSI/SI sections and ordered section sets, with CRC-32 (MPEG-2)
//! framing on the wire.

use bytes::Bytes;
use crc::{Crc, CRC_32_MPEG_2};
use log::debug;
use serde::Serialize;

use crate::constants::{LONG_SECTION_HEADER_SIZE, SECTION_CRC32_SIZE};
use crate::error::{PsiError, Result};
use crate::field::{get_u16, get_u32, put_u16, put_u32};
use crate::xml::to_hex_text;

const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// section_length counts from table_id_extension through the CRC.
const SECTION_LENGTH_OVERHEAD: usize = LONG_SECTION_HEADER_SIZE - 3 + SECTION_CRC32_SIZE;

/// One long section. Built fresh by table serializers, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub table_id: u8,
    pub is_private: bool,
    pub table_id_extension: u16,
    pub version: u8,
    pub is_current: bool,
    pub section_number: u8,
    pub last_section_number: u8,
    #[serde(serialize_with = "serialize_hex")]
    payload: Bytes,
}

fn serialize_hex<S: serde::Serializer>(payload: &Bytes, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&to_hex_text(payload))
}

impl Section {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        table_id: u8,
        is_private: bool,
        table_id_extension: u16,
        version: u8,
        is_current: bool,
        section_number: u8,
        last_section_number: u8,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            table_id,
            is_private,
            table_id_extension,
            version: version & 0x1F,
            is_current,
            section_number,
            last_section_number,
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Total size on the wire, header and CRC included.
    pub fn size(&self) -> usize {
        LONG_SECTION_HEADER_SIZE + self.payload.len() + SECTION_CRC32_SIZE
    }

    /// Header, payload and CRC-32.
    pub fn to_wire(&self) -> Vec<u8> {
        let section_length = self.payload.len() + SECTION_LENGTH_OVERHEAD;
        let mut out = vec![0u8; self.size()];
        out[0] = self.table_id;
        let private_bit: u16 = if self.is_private { 0x4000 } else { 0x0000 };
        // section_syntax_indicator, private bit, 2 reserved bits, length
        put_u16(&mut out, 1, 0x8000 | private_bit | 0x3000 | (section_length as u16 & 0x0FFF));
        put_u16(&mut out, 3, self.table_id_extension);
        out[5] = 0xC0 | ((self.version & 0x1F) << 1) | self.is_current as u8;
        out[6] = self.section_number;
        out[7] = self.last_section_number;
        let end = LONG_SECTION_HEADER_SIZE + self.payload.len();
        out[LONG_SECTION_HEADER_SIZE..end].copy_from_slice(&self.payload);
        let crc = CRC_MPEG.checksum(&out[..end]);
        put_u32(&mut out, end, crc);
        out
    }

    /// Parses one long section at the start of `data` and validates its
    /// CRC-32. Returns the section and the number of bytes it spans.
    pub fn from_wire(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 3 {
            return Err(PsiError::truncated("section header", 3, data.len()));
        }
        if data[1] & 0x80 == 0 {
            return Err(PsiError::Malformed("short section where a long section is expected"));
        }
        let section_length = (get_u16(data, 1) & 0x0FFF) as usize;
        if section_length < SECTION_LENGTH_OVERHEAD {
            return Err(PsiError::Malformed("section_length below long header size"));
        }
        let end = 3 + section_length;
        if end > data.len() {
            return Err(PsiError::truncated("section", end, data.len()));
        }

        let computed = CRC_MPEG.checksum(&data[..end - SECTION_CRC32_SIZE]);
        let stored = get_u32(data, end - SECTION_CRC32_SIZE);
        if computed != stored {
            return Err(PsiError::CrcMismatch { computed, stored });
        }

        Ok((
            Self {
                table_id: data[0],
                is_private: data[1] & 0x40 != 0,
                table_id_extension: get_u16(data, 3),
                version: (data[5] & 0x3E) >> 1,
                is_current: data[5] & 0x01 != 0,
                section_number: data[6],
                last_section_number: data[7],
                payload: Bytes::copy_from_slice(&data[LONG_SECTION_HEADER_SIZE..end - SECTION_CRC32_SIZE]),
            },
            end,
        ))
    }
}

/// The sections of one table instance, in the order they were produced or
/// received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BinaryTable {
    sections: Vec<Section>,
}

impl BinaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sections(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn table_id(&self) -> Option<u8> {
        self.sections.first().map(|s| s.table_id)
    }

    /// Non-empty and every section carries the same table_id.
    pub fn is_valid(&self) -> bool {
        match self.table_id() {
            Some(tid) => self.sections.iter().all(|s| s.table_id == tid),
            None => false,
        }
    }

    /// All sections back to back.
    pub fn to_wire(&self) -> Vec<u8> {
        self.sections.iter().flat_map(Section::to_wire).collect()
    }

    /// Reads back-to-back sections. Trailing 0xFF stuffing ends the input.
    pub fn from_wire(data: &[u8]) -> Result<Self> {
        let mut table = Self::new();
        let mut offset = 0;
        while offset < data.len() && data[offset] != 0xFF {
            let (section, size) = Section::from_wire(&data[offset..])?;
            debug!(
                "section tid=0x{:02X} #{}/{} ({} bytes)",
                section.table_id, section.section_number, section.last_section_number, size
            );
            table.add_section(section);
            offset += size;
        }
        Ok(table)
    }
}
