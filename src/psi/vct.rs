// psi/vct.rs
//! ATSC virtual channel tables, terrestrial (TVCT) and cable (CVCT).

use bitstream_io::{BigEndian, BitRead, BitReader};
use log::debug;
use serde::Serialize;

use super::section::{BinaryTable, Section};
use super::splitter::{parse_section_body, split_payloads, EntryCodec, LongTableLayout, SplitInput};
use crate::config::{CodecOptions, ConsistencyPolicy};
use crate::constants::{TID_CVCT, TID_TVCT, VCT_CHANNEL_FIXED_SIZE, VCT_SHORT_NAME_UNITS};
use crate::descriptors::{DescriptorList, LengthField};
use crate::error::{PsiError, Result};
use crate::field::{get_u16, get_u32, put_u16, put_u24, put_u32};
use crate::xml::{Element, Enumeration};

pub const MODULATION_MODE_ENUM: Enumeration = Enumeration::new(&[
    ("analog", 0x01),
    ("64-QAM", 0x02),
    ("256-QAM", 0x03),
    ("8-VSB", 0x04),
    ("16-VSB", 0x05),
]);

pub const SERVICE_TYPE_ENUM: Enumeration = Enumeration::new(&[
    ("analog", 0x01),
    ("dtv", 0x02),
    ("audio", 0x03),
    ("data", 0x04),
    ("software", 0x05),
]);

const SERVICE_TYPE_DTV: u8 = 0x02;

/// Fixed part of a channel, without the descriptor loop length.
const CHANNEL_FIELDS_SIZE: usize = VCT_CHANNEL_FIXED_SIZE - 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VctKind {
    Terrestrial,
    Cable,
}

impl VctKind {
    pub fn table_id(self) -> u8 {
        match self {
            VctKind::Terrestrial => TID_TVCT,
            VctKind::Cable => TID_CVCT,
        }
    }

    pub fn from_table_id(tid: u8) -> Option<Self> {
        match tid {
            TID_TVCT => Some(VctKind::Terrestrial),
            TID_CVCT => Some(VctKind::Cable),
            _ => None,
        }
    }

    pub fn xml_name(self) -> &'static str {
        match self {
            VctKind::Terrestrial => "TVCT",
            VctKind::Cable => "CVCT",
        }
    }

    pub fn from_xml_name(name: &str) -> Option<Self> {
        [VctKind::Terrestrial, VctKind::Cable]
            .into_iter()
            .find(|k| k.xml_name().eq_ignore_ascii_case(name))
    }

    /// Bits 3 and 2 of the channel flags byte, right-aligned.
    fn encode_path_bits(self, path_select: u8, out_of_band: bool) -> u8 {
        match self {
            VctKind::Cable => ((path_select & 0x01) << 1) | out_of_band as u8,
            VctKind::Terrestrial => 0x03,
        }
    }

    fn decode_path_bits(self, bits: u8) -> (u8, bool) {
        match self {
            VctKind::Cable => ((bits >> 1) & 0x01, bits & 0x01 != 0),
            VctKind::Terrestrial => (0, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    /// At most 7 UTF-16 code units on the wire.
    pub short_name: String,
    pub major_channel_number: u16,
    pub minor_channel_number: u16,
    pub modulation_mode: u8,
    pub carrier_frequency: u32,
    pub channel_tsid: u16,
    pub program_number: u16,
    pub etm_location: u8,
    pub access_controlled: bool,
    pub hidden: bool,
    /// Cable only.
    pub path_select: u8,
    /// Cable only.
    pub out_of_band: bool,
    pub hide_guide: bool,
    pub service_type: u8,
    pub source_id: u16,
    pub descs: DescriptorList,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            short_name: String::new(),
            major_channel_number: 0,
            minor_channel_number: 0,
            modulation_mode: 0,
            carrier_frequency: 0,
            channel_tsid: 0,
            program_number: 0,
            etm_location: 0,
            access_controlled: false,
            hidden: false,
            path_select: 0,
            out_of_band: false,
            hide_guide: false,
            service_type: SERVICE_TYPE_DTV,
            source_id: 0,
            descs: DescriptorList::new(),
        }
    }
}

/// Bit fields of bytes 26..28 of a channel.
struct ChannelFlags {
    etm_location: u8,
    access_controlled: bool,
    hidden: bool,
    path_bits: u8,
    hide_guide: bool,
    service_type: u8,
}

fn read_channel_numbers(data: &[u8]) -> std::io::Result<(u16, u16)> {
    let mut br = BitReader::endian(data, BigEndian);
    br.skip(4)?; // reserved
    let major = br.read::<10, u16>()?;
    let minor = br.read::<10, u16>()?;
    Ok((major, minor))
}

fn read_channel_flags(data: &[u8]) -> std::io::Result<ChannelFlags> {
    let mut br = BitReader::endian(data, BigEndian);
    let etm_location = br.read::<2, u8>()?;
    let access_controlled = br.read::<1, u8>()? != 0;
    let hidden = br.read::<1, u8>()? != 0;
    let path_bits = br.read::<2, u8>()?;
    let hide_guide = br.read::<1, u8>()? != 0;
    br.skip(3)?; // reserved
    let service_type = br.read::<6, u8>()?;
    Ok(ChannelFlags {
        etm_location,
        access_controlled,
        hidden,
        path_bits,
        hide_guide,
        service_type,
    })
}

/// Whole characters only: one needing a surrogate pair that would not fit
/// ends the name.
fn encode_short_name(name: &str, out: &mut [u8]) {
    let mut used = 0;
    for c in name.chars() {
        let mut buf = [0u16; 2];
        let units = c.encode_utf16(&mut buf);
        if used + units.len() > VCT_SHORT_NAME_UNITS {
            break;
        }
        for &unit in units.iter() {
            put_u16(out, 2 * used, unit);
            used += 1;
        }
    }
}

fn decode_short_name(data: &[u8]) -> String {
    let units = data
        .chunks_exact(2)
        .take(VCT_SHORT_NAME_UNITS)
        .map(|c| get_u16(c, 0))
        .take_while(|&u| u != 0);
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

impl EntryCodec for Channel {
    type Variant = VctKind;

    const FIXED_SIZE: usize = CHANNEL_FIELDS_SIZE;
    const LOOP: LengthField = LengthField::VCT;

    fn write_fixed(&self, kind: VctKind, out: &mut [u8]) {
        out[..2 * VCT_SHORT_NAME_UNITS].fill(0);
        encode_short_name(&self.short_name, &mut out[..2 * VCT_SHORT_NAME_UNITS]);
        put_u24(
            out,
            14,
            0xF0_0000
                | (u32::from(self.major_channel_number & 0x03FF) << 10)
                | u32::from(self.minor_channel_number & 0x03FF),
        );
        out[17] = self.modulation_mode;
        put_u32(out, 18, self.carrier_frequency);
        put_u16(out, 22, self.channel_tsid);
        put_u16(out, 24, self.program_number);
        out[26] = ((self.etm_location & 0x03) << 6)
            | ((self.access_controlled as u8) << 5)
            | ((self.hidden as u8) << 4)
            | (kind.encode_path_bits(self.path_select, self.out_of_band) << 2)
            | ((self.hide_guide as u8) << 1)
            | 0x01;
        out[27] = 0xC0 | (self.service_type & 0x3F);
        put_u16(out, 28, self.source_id);
    }

    fn read_fixed(kind: VctKind, data: &[u8]) -> Result<Self> {
        if data.len() < CHANNEL_FIELDS_SIZE {
            return Err(PsiError::truncated("channel", CHANNEL_FIELDS_SIZE, data.len()));
        }
        let bits_err = |_: std::io::Error| PsiError::truncated("channel bit fields", CHANNEL_FIELDS_SIZE, data.len());
        let (major, minor) = read_channel_numbers(&data[14..17]).map_err(bits_err)?;
        let flags = read_channel_flags(&data[26..28]).map_err(bits_err)?;
        let (path_select, out_of_band) = kind.decode_path_bits(flags.path_bits);

        Ok(Self {
            short_name: decode_short_name(&data[..2 * VCT_SHORT_NAME_UNITS]),
            major_channel_number: major,
            minor_channel_number: minor,
            modulation_mode: data[17],
            carrier_frequency: get_u32(data, 18),
            channel_tsid: get_u16(data, 22),
            program_number: get_u16(data, 24),
            etm_location: flags.etm_location,
            access_controlled: flags.access_controlled,
            hidden: flags.hidden,
            path_select,
            out_of_band,
            hide_guide: flags.hide_guide,
            service_type: flags.service_type,
            source_id: get_u16(data, 28),
            descs: DescriptorList::new(),
        })
    }

    fn descriptors(&self) -> &DescriptorList {
        &self.descs
    }

    fn descriptors_mut(&mut self) -> &mut DescriptorList {
        &mut self.descs
    }
}

impl Channel {
    fn build_xml(&self, kind: VctKind, parent: &mut Element) {
        let e = parent.add_element("channel");
        e.set_attribute("short_name", self.short_name.clone());
        e.set_int_attribute("major_channel_number", self.major_channel_number, false);
        e.set_int_attribute("minor_channel_number", self.minor_channel_number, false);
        e.set_enum_attribute(&MODULATION_MODE_ENUM, "modulation_mode", self.modulation_mode);
        e.set_int_attribute("carrier_frequency", self.carrier_frequency, false);
        e.set_int_attribute("channel_TSID", self.channel_tsid, true);
        e.set_int_attribute("program_number", self.program_number, true);
        e.set_int_attribute("ETM_location", self.etm_location, false);
        e.set_bool_attribute("access_controlled", self.access_controlled);
        e.set_bool_attribute("hidden", self.hidden);
        if kind == VctKind::Cable {
            e.set_int_attribute("path_select", self.path_select, false);
            e.set_bool_attribute("out_of_band", self.out_of_band);
        }
        e.set_bool_attribute("hide_guide", self.hide_guide);
        e.set_enum_attribute(&SERVICE_TYPE_ENUM, "service_type", self.service_type);
        e.set_int_attribute("source_id", self.source_id, true);
        self.descs.to_xml(e, kind.table_id());
    }

    fn from_xml(kind: VctKind, e: &Element) -> Result<Self> {
        let cable = kind == VctKind::Cable;
        Ok(Self {
            short_name: e.get_text_attribute("short_name", true, "", VCT_SHORT_NAME_UNITS)?,
            major_channel_number: e.get_int_attribute("major_channel_number", true, 0, 0, 0x03FF)?,
            minor_channel_number: e.get_int_attribute("minor_channel_number", true, 0, 0, 0x03FF)?,
            modulation_mode: e.get_enum_attribute(&MODULATION_MODE_ENUM, "modulation_mode", true, 0, 0xFF)?,
            carrier_frequency: e.get_int_attribute("carrier_frequency", false, 0, 0, u32::MAX)?,
            channel_tsid: e.get_int_attribute("channel_TSID", true, 0, 0, u16::MAX)?,
            program_number: e.get_int_attribute("program_number", true, 0, 0, u16::MAX)?,
            etm_location: e.get_int_attribute("ETM_location", false, 0, 0, 0x03)?,
            access_controlled: e.get_bool_attribute("access_controlled", false, false)?,
            hidden: e.get_bool_attribute("hidden", false, false)?,
            path_select: if cable {
                e.get_int_attribute("path_select", false, 0, 0, 0x01)?
            } else {
                0
            },
            out_of_band: cable && e.get_bool_attribute("out_of_band", false, false)?,
            hide_guide: e.get_bool_attribute("hide_guide", false, false)?,
            service_type: e.get_enum_attribute(&SERVICE_TYPE_ENUM, "service_type", false, SERVICE_TYPE_DTV, 0x3F)?,
            source_id: e.get_int_attribute("source_id", true, 0, 0, u16::MAX)?,
            descs: DescriptorList::from_xml(e, kind.table_id(), &[])?,
        })
    }
}

/// TVCT or CVCT. Both share the channel layout; the kind selects the table
/// id, the XML name and the meaning of two channel flag bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualChannelTable {
    pub kind: VctKind,
    pub version: u8,
    pub is_current: bool,
    pub transport_stream_id: u16,
    pub protocol_version: u8,
    pub channels: Vec<Channel>,
    pub descs: DescriptorList,
    #[serde(skip)]
    valid: bool,
}

impl VirtualChannelTable {
    pub fn new(kind: VctKind) -> Self {
        Self {
            kind,
            version: 0,
            is_current: true,
            transport_stream_id: 0,
            protocol_version: 0,
            channels: Vec::new(),
            descs: DescriptorList::new(),
            valid: true,
        }
    }

    /// Reset content, flagged invalid.
    pub fn invalid(kind: VctKind) -> Self {
        Self {
            valid: false,
            ..Self::new(kind)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn table_id(&self) -> u8 {
        self.kind.table_id()
    }

    /// Splits the table into as many sections as needed. An invalid table
    /// yields no section.
    pub fn serialize(&self, opts: &CodecOptions) -> BinaryTable {
        if !self.valid {
            debug!("{}: not serializing an invalid table", self.kind.xml_name());
            return BinaryTable::new();
        }

        let prefix = [self.protocol_version, 0];
        let input = SplitInput {
            prefix: &prefix,
            count_offset: 1,
            entries: &self.channels,
            variant: self.kind,
            global: &self.descs,
            layout: LongTableLayout {
                capacity: opts.section_capacity(),
                global_loop: LengthField::VCT,
            },
        };
        let payloads = split_payloads(&input);

        // Section count is only known once every payload exists.
        let last = (payloads.len().saturating_sub(1)).min(u8::MAX as usize) as u8;
        let sections = payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| {
                Section::new(
                    self.table_id(),
                    true,
                    self.transport_stream_id,
                    self.version,
                    self.is_current,
                    i as u8,
                    last,
                    payload,
                )
            })
            .collect();
        BinaryTable::from_sections(sections)
    }

    pub fn try_deserialize(table: &BinaryTable, opts: &CodecOptions) -> Result<Self> {
        if !table.is_valid() {
            return Err(PsiError::TableInconsistent(
                "empty section set or mixed table ids".into(),
            ));
        }
        let tid = table.table_id().unwrap_or_default();
        let kind = VctKind::from_table_id(tid).ok_or(PsiError::TagMismatch {
            expected: TID_TVCT,
            actual: tid,
        })?;

        let mut vct = Self::new(kind);
        for (index, section) in table.sections().iter().enumerate() {
            let data = section.payload();
            if data.len() < 2 {
                return Err(PsiError::truncated("VCT section payload", 2, data.len()));
            }
            if index > 0 && opts.consistency == ConsistencyPolicy::Strict {
                check_consistent(&vct, section, data[0])?;
            }
            vct.version = section.version;
            vct.is_current = section.is_current;
            vct.transport_stream_id = section.table_id_extension;
            vct.protocol_version = data[0];

            parse_section_body(
                &data[2..],
                data[1] as usize,
                kind,
                LengthField::VCT,
                &mut vct.channels,
                &mut vct.descs,
            )?;
        }
        Ok(vct)
    }

    /// Rebuilds a table from its sections, in the order given. Any failure
    /// yields an invalid table; no partial content is kept.
    pub fn deserialize(table: &BinaryTable, opts: &CodecOptions) -> Self {
        Self::try_deserialize(table, opts).unwrap_or_else(|e| {
            debug!("invalid virtual channel table: {e}");
            let kind = table
                .table_id()
                .and_then(VctKind::from_table_id)
                .unwrap_or(VctKind::Terrestrial);
            Self::invalid(kind)
        })
    }

    pub fn build_xml(&self) -> Element {
        let mut root = Element::new(self.kind.xml_name());
        root.set_int_attribute("version", self.version, false);
        root.set_bool_attribute("current", self.is_current);
        root.set_int_attribute("protocol_version", self.protocol_version, false);
        root.set_int_attribute("transport_stream_id", self.transport_stream_id, true);
        self.descs.to_xml(&mut root, self.table_id());
        for channel in &self.channels {
            channel.build_xml(self.kind, &mut root);
        }
        root
    }

    pub fn try_from_xml(root: &Element) -> Result<Self> {
        let kind = VctKind::from_xml_name(root.name()).ok_or_else(|| {
            PsiError::schema(format!("<{}> is not a virtual channel table", root.name()))
        })?;
        let channels = root
            .children_named("channel")
            .map(|e| Channel::from_xml(kind, e))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            kind,
            version: root.get_int_attribute("version", false, 0, 0, 0x1F)?,
            is_current: root.get_bool_attribute("current", false, true)?,
            transport_stream_id: root.get_int_attribute("transport_stream_id", true, 0, 0, u16::MAX)?,
            protocol_version: root.get_int_attribute("protocol_version", false, 0, 0, u8::MAX)?,
            channels,
            descs: DescriptorList::from_xml(root, kind.table_id(), &["channel"])?,
            valid: true,
        })
    }

    /// Any schema violation yields an invalid table.
    pub fn from_xml(root: &Element) -> Self {
        Self::try_from_xml(root).unwrap_or_else(|e| {
            debug!("invalid <{}>: {e}", root.name());
            Self::invalid(VctKind::from_xml_name(root.name()).unwrap_or(VctKind::Terrestrial))
        })
    }
}

fn check_consistent(vct: &VirtualChannelTable, section: &Section, protocol_version: u8) -> Result<()> {
    if section.version != vct.version
        || section.is_current != vct.is_current
        || section.table_id_extension != vct.transport_stream_id
        || protocol_version != vct.protocol_version
    {
        return Err(PsiError::TableInconsistent(format!(
            "section {} disagrees with earlier sections on version, current flag, \
             transport_stream_id or protocol_version",
            section.section_number
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{Ac3Descriptor, Descriptor, DescriptorCodec};

    fn channel(n: u16) -> Channel {
        Channel {
            short_name: format!("CH{n}"),
            major_channel_number: 10 + n,
            minor_channel_number: n,
            modulation_mode: 0x04,
            carrier_frequency: 57_000_000,
            channel_tsid: 0x0100 + n,
            program_number: n + 1,
            source_id: 0x2000 + n,
            ..Channel::default()
        }
    }

    fn sample(kind: VctKind) -> VirtualChannelTable {
        let mut vct = VirtualChannelTable::new(kind);
        vct.version = 7;
        vct.transport_stream_id = 0x0ABC;
        vct.channels = (0..3).map(channel).collect();
        let mut ac3 = Ac3Descriptor::new();
        ac3.bsid = Some(8);
        vct.channels[1].descs.add(&ac3);
        vct.descs.push(Descriptor::new(0xA0, vec![1, 2, 3]));
        vct
    }

    #[test]
    fn test_channel_fixed_layout() {
        let mut ch = channel(1);
        ch.short_name = "KQED".into();
        ch.major_channel_number = 0x3FF;
        ch.minor_channel_number = 0x001;
        ch.service_type = 0x02;
        let mut out = [0u8; CHANNEL_FIELDS_SIZE];
        ch.write_fixed(VctKind::Terrestrial, &mut out);
        assert_eq!(&out[..8], &[0, b'K', 0, b'Q', 0, b'E', 0, b'D']);
        assert_eq!(&out[8..14], &[0; 6]);
        // 1111 + 1111111111 + 0000000001
        assert_eq!(&out[14..17], &[0xFF, 0xFC, 0x01]);
        assert_eq!(out[27], 0xC2);

        let back = Channel::read_fixed(VctKind::Terrestrial, &out).unwrap();
        assert_eq!(back, ch);
    }

    #[test]
    fn test_flag_bits_depend_on_kind() {
        let mut ch = channel(0);
        ch.hide_guide = true;
        let mut tvct = [0u8; CHANNEL_FIELDS_SIZE];
        let mut cvct = [0u8; CHANNEL_FIELDS_SIZE];
        ch.write_fixed(VctKind::Terrestrial, &mut tvct);
        ch.write_fixed(VctKind::Cable, &mut cvct);
        assert_eq!(tvct[26], 0x0F);
        assert_eq!(cvct[26], 0x03);

        ch.path_select = 1;
        ch.out_of_band = true;
        ch.write_fixed(VctKind::Cable, &mut cvct);
        assert_eq!(cvct[26], 0x0F);
        assert_eq!(Channel::read_fixed(VctKind::Cable, &cvct).unwrap(), ch);

        // Reserved bits never surface as cable fields.
        let back = Channel::read_fixed(VctKind::Terrestrial, &cvct).unwrap();
        assert_eq!(back.path_select, 0);
        assert!(!back.out_of_band);
        assert!(back.hide_guide);
    }

    #[test]
    fn test_short_name_limits() {
        let mut ch = channel(0);
        ch.short_name = "ABCDEFGHIJ".into();
        let mut out = [0u8; CHANNEL_FIELDS_SIZE];
        ch.write_fixed(VctKind::Cable, &mut out);
        let back = Channel::read_fixed(VctKind::Cable, &out).unwrap();
        assert_eq!(back.short_name, "ABCDEFG");
    }

    #[test]
    fn test_short_name_never_splits_surrogate_pair() {
        let mut ch = channel(0);
        let mut out = [0u8; CHANNEL_FIELDS_SIZE];

        ch.short_name = "ABCDEF\u{1F600}".into();
        ch.write_fixed(VctKind::Cable, &mut out);
        assert_eq!(&out[12..14], &[0, 0]);
        assert_eq!(Channel::read_fixed(VctKind::Cable, &out).unwrap().short_name, "ABCDEF");

        // Exactly 7 units with the pair at the end.
        ch.short_name = "ABCDE\u{1F600}".into();
        ch.write_fixed(VctKind::Cable, &mut out);
        assert_eq!(Channel::read_fixed(VctKind::Cable, &out).unwrap().short_name, ch.short_name);
    }

    #[test]
    fn test_single_section_roundtrip() {
        let opts = CodecOptions::default();
        let vct = sample(VctKind::Cable);
        let bin = vct.serialize(&opts);
        assert_eq!(bin.section_count(), 1);
        let s = &bin.sections()[0];
        assert_eq!(s.table_id, 0xC9);
        assert_eq!(s.table_id_extension, 0x0ABC);
        assert_eq!(s.payload()[1], 3);

        let back = VirtualChannelTable::deserialize(&bin, &opts);
        assert!(back.is_valid());
        assert_eq!(back, vct);
    }

    #[test]
    fn test_multi_section_keeps_channels_whole() {
        let opts = CodecOptions {
            max_section_payload: 100,
            ..CodecOptions::default()
        };
        let mut vct = sample(VctKind::Terrestrial);
        vct.channels = (0..10)
            .map(|n| {
                let mut ch = channel(n);
                ch.descs.push(Descriptor::new(0x80, vec![n as u8; 10]));
                ch
            })
            .collect();

        let bin = vct.serialize(&opts);
        assert!(bin.section_count() > 1);
        let last = (bin.section_count() - 1) as u8;
        for (i, s) in bin.sections().iter().enumerate() {
            assert_eq!(s.section_number, i as u8);
            assert_eq!(s.last_section_number, last);
            assert!(s.payload().len() <= 100);
        }
        let total: usize = bin.sections().iter().map(|s| s.payload()[1] as usize).sum();
        assert_eq!(total, 10);

        let back = VirtualChannelTable::deserialize(&bin, &opts);
        assert_eq!(back, vct);
    }

    #[test]
    fn test_truncated_section_invalidates_table() {
        let opts = CodecOptions::default();
        let bin = sample(VctKind::Cable).serialize(&opts);
        let s = &bin.sections()[0];
        // Drop the last channel and the global loop.
        let cut = &s.payload()[..s.payload().len() - 20];
        let broken = BinaryTable::from_sections(vec![Section::new(
            s.table_id, true, s.table_id_extension, s.version, s.is_current, 0, 0, cut.to_vec(),
        )]);
        let back = VirtualChannelTable::deserialize(&broken, &opts);
        assert!(!back.is_valid());
        assert!(back.channels.is_empty());
        assert!(back.descs.is_empty());

        let tiny = BinaryTable::from_sections(vec![Section::new(0xC8, true, 1, 0, true, 0, 0, vec![0])]);
        assert!(!VirtualChannelTable::deserialize(&tiny, &opts).is_valid());
        assert!(!VirtualChannelTable::deserialize(&BinaryTable::new(), &opts).is_valid());
    }

    #[test]
    fn test_wrong_table_id_is_invalid() {
        let bin = BinaryTable::from_sections(vec![Section::new(0x42, false, 1, 0, true, 0, 0, vec![0, 0, 0xFC, 0])]);
        assert!(!VirtualChannelTable::deserialize(&bin, &CodecOptions::default()).is_valid());
    }

    #[test]
    fn test_consistency_policy() {
        let mut opts = CodecOptions {
            max_section_payload: 80,
            ..CodecOptions::default()
        };
        let vct = sample(VctKind::Terrestrial);
        let bin = vct.serialize(&opts);
        assert!(bin.section_count() > 1);

        let mut sections = bin.sections().to_vec();
        let last = sections.len() - 1;
        sections[last].version = 8;
        let mixed = BinaryTable::from_sections(sections);

        assert!(!VirtualChannelTable::deserialize(&mixed, &opts).is_valid());

        opts.consistency = ConsistencyPolicy::LastWins;
        let back = VirtualChannelTable::deserialize(&mixed, &opts);
        assert!(back.is_valid());
        assert_eq!(back.version, 8);
        assert_eq!(back.channels, vct.channels);
    }

    #[test]
    fn test_invalid_table_serializes_to_nothing() {
        let vct = VirtualChannelTable::invalid(VctKind::Cable);
        assert_eq!(vct.serialize(&CodecOptions::default()).section_count(), 0);
    }

    #[test]
    fn test_xml_roundtrip() {
        let mut vct = sample(VctKind::Cable);
        vct.channels[0].path_select = 1;
        vct.channels[0].out_of_band = true;
        vct.channels[2].modulation_mode = 0x80;
        let root = vct.build_xml();
        assert_eq!(root.name(), "CVCT");
        assert_eq!(root.attribute("transport_stream_id"), Some("0x0ABC"));
        let ch = &root.children_named("channel").next().unwrap();
        assert_eq!(ch.attribute("modulation_mode"), Some("8-VSB"));
        assert_eq!(ch.attribute("service_type"), Some("dtv"));
        assert_eq!(ch.attribute("path_select"), Some("1"));

        let back = VirtualChannelTable::from_xml(&root);
        assert!(back.is_valid());
        assert_eq!(back, vct);
    }

    #[test]
    fn test_xml_terrestrial_has_no_cable_attributes() {
        let root = sample(VctKind::Terrestrial).build_xml();
        let ch = root.children_named("channel").next().unwrap();
        assert_eq!(ch.attribute("path_select"), None);
        assert_eq!(ch.attribute("out_of_band"), None);
    }

    #[test]
    fn test_xml_defaults_and_violations() {
        let mut root = Element::new("TVCT");
        root.set_attribute("transport_stream_id", "0x0001");
        let e = root.add_element("channel");
        for (k, v) in [
            ("short_name", "ABC"),
            ("major_channel_number", "2"),
            ("minor_channel_number", "1"),
            ("modulation_mode", "64-QAM"),
            ("channel_TSID", "0x10"),
            ("program_number", "3"),
            ("source_id", "4"),
        ] {
            e.set_attribute(k, v);
        }
        let vct = VirtualChannelTable::from_xml(&root);
        assert!(vct.is_valid());
        assert!(vct.is_current);
        assert_eq!(vct.version, 0);
        assert_eq!(vct.channels[0].modulation_mode, 0x02);
        assert_eq!(vct.channels[0].service_type, SERVICE_TYPE_DTV);

        let mut bad = root.clone();
        bad.set_attribute("version", "32");
        assert!(!VirtualChannelTable::from_xml(&bad).is_valid());

        let mut long_name = root.clone();
        long_name.add_element("channel").set_attribute("short_name", "TOOLONGNAME");
        assert!(!VirtualChannelTable::from_xml(&long_name).is_valid());

        let mut stray = root.clone();
        stray.add_element("not_a_descriptor");
        assert!(!VirtualChannelTable::from_xml(&stray).is_valid());

        assert!(!VirtualChannelTable::from_xml(&Element::new("PMT")).is_valid());
    }

    #[test]
    fn test_descriptor_xml_inside_channel() {
        let vct = sample(VctKind::Terrestrial);
        let root = vct.build_xml();
        let ch = root.children_named("channel").nth(1).unwrap();
        assert_eq!(ch.children()[0].name(), Ac3Descriptor::XML_NAME);
        assert_eq!(root.children()[0].name(), "generic_descriptor");
    }
}
