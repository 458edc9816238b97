//! ECM repetition rate descriptor.

use bytes::{BufMut, BytesMut};

use super::DescriptorCodec;
use crate::constants::{DID_ECM_REPETITION_RATE, MAX_DESCRIPTOR_PAYLOAD_SIZE};
use crate::error::{PsiError, Result};
use crate::field::get_u16;
use crate::xml::Element;

const FIXED_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EcmRepetitionRateDescriptor {
    pub ca_system_id: u16,
    /// Milliseconds.
    pub ecm_repetition_rate: u16,
    pub private_data: Vec<u8>,
    #[serde(skip)]
    valid: bool,
}

impl Default for EcmRepetitionRateDescriptor {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl EcmRepetitionRateDescriptor {
    pub fn new(ca_system_id: u16, ecm_repetition_rate: u16) -> Self {
        Self {
            ca_system_id,
            ecm_repetition_rate,
            private_data: Vec::new(),
            valid: true,
        }
    }
}

impl DescriptorCodec for EcmRepetitionRateDescriptor {
    const TAG: u8 = DID_ECM_REPETITION_RATE;
    const XML_NAME: &'static str = "ECM_repetition_rate_descriptor";

    fn invalid() -> Self {
        Self {
            valid: false,
            ..Self::new(0, 0)
        }
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn write_payload(&self, out: &mut BytesMut) {
        out.put_u16(self.ca_system_id);
        out.put_u16(self.ecm_repetition_rate);
        out.put_slice(&self.private_data);
    }

    fn read_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < FIXED_SIZE {
            return Err(PsiError::truncated("ECM repetition rate descriptor", FIXED_SIZE, payload.len()));
        }
        Ok(Self {
            ca_system_id: get_u16(payload, 0),
            ecm_repetition_rate: get_u16(payload, 2),
            private_data: payload[FIXED_SIZE..].to_vec(),
            valid: true,
        })
    }

    fn write_xml(&self, root: &mut Element) {
        root.set_int_attribute("CA_system_id", self.ca_system_id, true);
        root.set_int_attribute("ECM_repetition_rate", self.ecm_repetition_rate, false);
        if !self.private_data.is_empty() {
            root.add_hex_text_child("private_data", &self.private_data);
        }
    }

    fn read_xml(element: &Element) -> Result<Self> {
        Ok(Self {
            ca_system_id: element.get_int_attribute("CA_system_id", true, 0, 0, u16::MAX)?,
            ecm_repetition_rate: element.get_int_attribute("ECM_repetition_rate", true, 0, 0, u16::MAX)?,
            private_data: element.get_hex_text_child(
                "private_data",
                false,
                MAX_DESCRIPTOR_PAYLOAD_SIZE - FIXED_SIZE,
            )?,
            valid: true,
        })
    }
}
