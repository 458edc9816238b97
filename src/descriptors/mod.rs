//! Descriptors: raw tag-length-value records, descriptor lists and the typed
//! descriptors this crate models.
//!
//! A typed descriptor implements [`DescriptorCodec`]. Decoding never fails
//! loudly: a structurally invalid input yields an entity whose
//! [`DescriptorCodec::is_valid`] is false and whose fields are all reset.

mod ac3;
mod ecm_repetition_rate;
mod list;
mod target_ip_address;

pub use ac3::Ac3Descriptor;
pub use ecm_repetition_rate::EcmRepetitionRateDescriptor;
pub use list::{DescriptorList, LengthField};
pub use target_ip_address::TargetIpAddressDescriptor;

use bytes::{Bytes, BytesMut};
use log::debug;
use serde::Serialize;

use crate::constants::{
    DESCRIPTOR_HEADER_SIZE, DID_AC3, DID_ECM_REPETITION_RATE, DID_TARGET_IP_ADDRESS,
    MAX_DESCRIPTOR_PAYLOAD_SIZE, TID_INT, TID_UNT,
};
use crate::error::{PsiError, Result};
use crate::xml::{parse_hex_text, to_hex_text, Element};

pub const GENERIC_DESCRIPTOR_XML_NAME: &str = "generic_descriptor";

/// One raw descriptor: `tag:u8, length:u8, payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub tag: u8,
    #[serde(serialize_with = "serialize_hex")]
    payload: Bytes,
}

fn serialize_hex<S: serde::Serializer>(payload: &Bytes, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&to_hex_text(payload))
}

impl Descriptor {
    /// Payloads longer than 255 bytes are truncated to fit the length byte.
    pub fn new(tag: u8, payload: impl Into<Bytes>) -> Self {
        let mut payload: Bytes = payload.into();
        if payload.len() > MAX_DESCRIPTOR_PAYLOAD_SIZE {
            debug!(
                "descriptor 0x{tag:02X}: payload of {} bytes truncated to {MAX_DESCRIPTOR_PAYLOAD_SIZE}",
                payload.len()
            );
            payload.truncate(MAX_DESCRIPTOR_PAYLOAD_SIZE);
        }
        Self { tag, payload }
    }

    /// Parses exactly one descriptor. The declared length must match the
    /// bytes after the header, no more and no less.
    pub fn from_wire(data: &[u8]) -> Result<Self> {
        if data.len() < DESCRIPTOR_HEADER_SIZE {
            return Err(PsiError::truncated("descriptor header", DESCRIPTOR_HEADER_SIZE, data.len()));
        }
        let declared = data[1] as usize;
        let available = data.len() - DESCRIPTOR_HEADER_SIZE;
        if declared != available {
            return Err(PsiError::LengthMismatch {
                declared,
                available,
            });
        }
        Ok(Self::new(data[0], Bytes::copy_from_slice(&data[2..])))
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size on the wire, header included.
    pub fn size(&self) -> usize {
        DESCRIPTOR_HEADER_SIZE + self.payload.len()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.tag);
        out.push(self.payload.len() as u8);
        out.extend_from_slice(&self.payload);
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        self.write_to(&mut out);
        out
    }
}

/// A descriptor type with a fixed tag, a binary payload layout and an XML
/// form.
///
/// Implementors provide the fallible payload and XML readers; the provided
/// methods turn any failure into an invalid entity.
pub trait DescriptorCodec: Sized {
    const TAG: u8;
    const XML_NAME: &'static str;

    /// A value with every field reset and the validity flag cleared.
    fn invalid() -> Self;
    fn is_valid(&self) -> bool;

    fn write_payload(&self, out: &mut BytesMut);
    fn read_payload(payload: &[u8]) -> Result<Self>;
    fn write_xml(&self, root: &mut Element);
    fn read_xml(element: &Element) -> Result<Self>;

    fn serialize(&self) -> Descriptor {
        let mut out = BytesMut::new();
        self.write_payload(&mut out);
        Descriptor::new(Self::TAG, out.freeze())
    }

    fn try_deserialize(desc: &Descriptor) -> Result<Self> {
        if desc.tag != Self::TAG {
            return Err(PsiError::TagMismatch {
                expected: Self::TAG,
                actual: desc.tag,
            });
        }
        Self::read_payload(desc.payload())
    }

    fn deserialize(desc: &Descriptor) -> Self {
        Self::try_deserialize(desc).unwrap_or_else(|e| {
            debug!("{}: {e}", Self::XML_NAME);
            Self::invalid()
        })
    }

    /// Decodes one descriptor from its exact wire bytes.
    fn from_wire(data: &[u8]) -> Self {
        match Descriptor::from_wire(data) {
            Ok(desc) => Self::deserialize(&desc),
            Err(e) => {
                debug!("{}: {e}", Self::XML_NAME);
                Self::invalid()
            }
        }
    }

    fn to_xml(&self) -> Element {
        let mut root = Element::new(Self::XML_NAME);
        self.write_xml(&mut root);
        root
    }

    fn try_from_xml(element: &Element) -> Result<Self> {
        element.check_name(Self::XML_NAME)?;
        Self::read_xml(element)
    }

    fn from_xml(element: &Element) -> Self {
        Self::try_from_xml(element).unwrap_or_else(|e| {
            debug!("{}: {e}", Self::XML_NAME);
            Self::invalid()
        })
    }
}

/// Decodes with `T` and renders the XML form; `None` if the payload does not
/// decode.
fn typed_xml<T: DescriptorCodec>(desc: &Descriptor) -> Option<Element> {
    T::try_deserialize(desc).ok().map(|d| d.to_xml())
}

/// XML form of a raw descriptor as seen in table `tid`. Unknown or
/// undecodable descriptors become a `generic_descriptor` carrying the raw
/// payload.
pub fn descriptor_to_xml(desc: &Descriptor, tid: u8) -> Element {
    let typed = match desc.tag {
        DID_AC3 => typed_xml::<Ac3Descriptor>(desc),
        DID_ECM_REPETITION_RATE => typed_xml::<EcmRepetitionRateDescriptor>(desc),
        DID_TARGET_IP_ADDRESS if tid == TID_INT || tid == TID_UNT => {
            typed_xml::<TargetIpAddressDescriptor>(desc)
        }
        _ => None,
    };
    typed.unwrap_or_else(|| {
        let mut e = Element::new(GENERIC_DESCRIPTOR_XML_NAME);
        e.set_int_attribute("tag", desc.tag, true);
        e.set_text(to_hex_text(desc.payload()));
        e
    })
}

fn typed_binary<T: DescriptorCodec>(element: &Element) -> Result<Descriptor> {
    Ok(T::try_from_xml(element)?.serialize())
}

/// Inverse of [`descriptor_to_xml`]. Returns `None` when `element` does not
/// name a descriptor at all, so containers can tell descriptors apart from
/// their other children.
pub fn descriptor_from_xml(element: &Element, tid: u8) -> Option<Result<Descriptor>> {
    let result = if element.has_name(Ac3Descriptor::XML_NAME) {
        typed_binary::<Ac3Descriptor>(element)
    } else if element.has_name(EcmRepetitionRateDescriptor::XML_NAME) {
        typed_binary::<EcmRepetitionRateDescriptor>(element)
    } else if element.has_name(TargetIpAddressDescriptor::XML_NAME) {
        if tid == TID_INT || tid == TID_UNT {
            typed_binary::<TargetIpAddressDescriptor>(element)
        } else {
            Err(PsiError::schema(format!(
                "<{}> not allowed in table 0x{tid:02X}",
                TargetIpAddressDescriptor::XML_NAME
            )))
        }
    } else if element.has_name(GENERIC_DESCRIPTOR_XML_NAME) {
        generic_from_xml(element)
    } else {
        return None;
    };
    Some(result)
}

fn generic_from_xml(element: &Element) -> Result<Descriptor> {
    let tag = element.get_int_attribute::<u8>("tag", true, 0, 0, 0xFF)?;
    let payload = parse_hex_text(element.text())
        .ok_or_else(|| PsiError::schema("invalid hexadecimal content in <generic_descriptor>"))?;
    if payload.len() > MAX_DESCRIPTOR_PAYLOAD_SIZE {
        return Err(PsiError::schema(format!(
            "generic descriptor payload of {} bytes exceeds {MAX_DESCRIPTOR_PAYLOAD_SIZE}",
            payload.len()
        )));
    }
    Ok(Descriptor::new(tag, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TID_CVCT;

    #[test]
    fn test_from_wire_requires_exact_length() {
        let d = Descriptor::from_wire(&[0x48, 0x02, 0xAA, 0xBB]).unwrap();
        assert_eq!(d.tag, 0x48);
        assert_eq!(d.payload(), &[0xAA, 0xBB]);
        assert_eq!(d.to_wire(), vec![0x48, 0x02, 0xAA, 0xBB]);

        assert!(Descriptor::from_wire(&[0x48, 0x03, 0xAA, 0xBB]).is_err());
        assert!(Descriptor::from_wire(&[0x48, 0x01, 0xAA, 0xBB]).is_err());
        assert!(Descriptor::from_wire(&[0x48]).is_err());
    }

    #[test]
    fn test_new_clamps_payload() {
        let d = Descriptor::new(0x80, vec![0u8; 300]);
        assert_eq!(d.payload().len(), 255);
        assert_eq!(d.size(), 257);
    }

    #[test]
    fn test_generic_descriptor_xml_roundtrip() {
        let d = Descriptor::new(0xA0, vec![1, 2, 3]);
        let e = descriptor_to_xml(&d, TID_CVCT);
        assert_eq!(e.name(), GENERIC_DESCRIPTOR_XML_NAME);
        assert_eq!(e.attribute("tag"), Some("0xA0"));
        assert_eq!(e.text(), "01 02 03");
        assert_eq!(descriptor_from_xml(&e, TID_CVCT).unwrap().unwrap(), d);
    }

    #[test]
    fn test_target_ip_is_table_dependent() {
        // Tag 0x09 is a CA descriptor outside INT/UNT.
        let d = Descriptor::new(0x09, vec![255, 255, 255, 0, 10, 0, 0, 1]);
        assert_eq!(descriptor_to_xml(&d, TID_CVCT).name(), GENERIC_DESCRIPTOR_XML_NAME);
        let e = descriptor_to_xml(&d, TID_INT);
        assert_eq!(e.name(), TargetIpAddressDescriptor::XML_NAME);
        assert_eq!(descriptor_from_xml(&e, TID_INT).unwrap().unwrap(), d);
        assert!(descriptor_from_xml(&e, TID_CVCT).unwrap().is_err());
    }

    #[test]
    fn test_non_descriptor_element_is_ignored() {
        assert!(descriptor_from_xml(&Element::new("channel"), TID_CVCT).is_none());
    }
}
