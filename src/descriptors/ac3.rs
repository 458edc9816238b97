//! AC-3 descriptor (DVB, tag 0x6A).
//!
//! Four optional one-byte fields announced by a leading presence byte,
//! followed by free-form additional info. The low nibble of the presence
//! byte is reserved: ignored on decode, written as zero.

use bytes::{BufMut, BytesMut};

use super::DescriptorCodec;
use crate::constants::{DID_AC3, MAX_DESCRIPTOR_PAYLOAD_SIZE};
use crate::error::{PsiError, Result};
use crate::xml::Element;

const COMPONENT_TYPE_FLAG: u8 = 0x80;
const BSID_FLAG: u8 = 0x40;
const MAINID_FLAG: u8 = 0x20;
const ASVC_FLAG: u8 = 0x10;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Ac3Descriptor {
    pub component_type: Option<u8>,
    pub bsid: Option<u8>,
    pub mainid: Option<u8>,
    pub asvc: Option<u8>,
    pub additional_info: Vec<u8>,
    #[serde(skip)]
    valid: bool,
}

impl Default for Ac3Descriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Ac3Descriptor {
    pub fn new() -> Self {
        Self {
            component_type: None,
            bsid: None,
            mainid: None,
            asvc: None,
            additional_info: Vec::new(),
            valid: true,
        }
    }

    /// Optional fields in wire order with their presence bit.
    fn optional_fields(&self) -> [(u8, Option<u8>); 4] {
        [
            (COMPONENT_TYPE_FLAG, self.component_type),
            (BSID_FLAG, self.bsid),
            (MAINID_FLAG, self.mainid),
            (ASVC_FLAG, self.asvc),
        ]
    }

    /// Fills the fields still unset here from `other`. Set fields are never
    /// overwritten; additional info is taken only if ours is empty.
    pub fn merge(&mut self, other: &Ac3Descriptor) {
        self.component_type = self.component_type.or(other.component_type);
        self.bsid = self.bsid.or(other.bsid);
        self.mainid = self.mainid.or(other.mainid);
        self.asvc = self.asvc.or(other.asvc);
        if self.additional_info.is_empty() {
            self.additional_info = other.additional_info.clone();
        }
    }
}

impl DescriptorCodec for Ac3Descriptor {
    const TAG: u8 = DID_AC3;
    const XML_NAME: &'static str = "AC3_descriptor";

    fn invalid() -> Self {
        Self {
            valid: false,
            ..Self::new()
        }
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn write_payload(&self, out: &mut BytesMut) {
        let fields = self.optional_fields();
        let flags = fields
            .iter()
            .filter(|(_, v)| v.is_some())
            .fold(0u8, |acc, (bit, _)| acc | bit);
        out.put_u8(flags);
        for value in fields.iter().filter_map(|(_, v)| *v) {
            out.put_u8(value);
        }
        out.put_slice(&self.additional_info);
    }

    fn read_payload(payload: &[u8]) -> Result<Self> {
        let (&flags, mut rest) = payload
            .split_first()
            .ok_or_else(|| PsiError::truncated("AC-3 descriptor", 1, 0))?;

        let mut take = |bit: u8| -> Result<Option<u8>> {
            if flags & bit == 0 {
                return Ok(None);
            }
            let (&v, tail) = rest
                .split_first()
                .ok_or(PsiError::Malformed("AC-3 descriptor: flagged field missing"))?;
            rest = tail;
            Ok(Some(v))
        };

        let component_type = take(COMPONENT_TYPE_FLAG)?;
        let bsid = take(BSID_FLAG)?;
        let mainid = take(MAINID_FLAG)?;
        let asvc = take(ASVC_FLAG)?;

        Ok(Self {
            component_type,
            bsid,
            mainid,
            asvc,
            additional_info: rest.to_vec(),
            valid: true,
        })
    }

    fn write_xml(&self, root: &mut Element) {
        root.set_optional_int_attribute("component_type", self.component_type, true);
        root.set_optional_int_attribute("bsid", self.bsid, true);
        root.set_optional_int_attribute("mainid", self.mainid, true);
        root.set_optional_int_attribute("asvc", self.asvc, true);
        if !self.additional_info.is_empty() {
            root.add_hex_text_child("additional_info", &self.additional_info);
        }
    }

    fn read_xml(element: &Element) -> Result<Self> {
        Ok(Self {
            component_type: element.get_optional_int_attribute("component_type", 0, 0xFF)?,
            bsid: element.get_optional_int_attribute("bsid", 0, 0xFF)?,
            mainid: element.get_optional_int_attribute("mainid", 0, 0xFF)?,
            asvc: element.get_optional_int_attribute("asvc", 0, 0xFF)?,
            additional_info: element.get_hex_text_child(
                "additional_info",
                false,
                MAX_DESCRIPTOR_PAYLOAD_SIZE - 1,
            )?,
            valid: true,
        })
    }
}
