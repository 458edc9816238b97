//! target_IP_address_descriptor (INT/UNT only, reuses tag 0x09).

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};

use super::DescriptorCodec;
use crate::constants::DID_TARGET_IP_ADDRESS;
use crate::error::{PsiError, Result};
use crate::field::get_u32;
use crate::xml::Element;

/// Addresses fitting in 255 bytes after the mask.
pub const MAX_ENTRIES: usize = 62;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TargetIpAddressDescriptor {
    pub ipv4_addr_mask: Ipv4Addr,
    pub ipv4_addr: Vec<Ipv4Addr>,
    #[serde(skip)]
    valid: bool,
}

impl Default for TargetIpAddressDescriptor {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED)
    }
}

impl TargetIpAddressDescriptor {
    pub fn new(ipv4_addr_mask: Ipv4Addr) -> Self {
        Self {
            ipv4_addr_mask,
            ipv4_addr: Vec::new(),
            valid: true,
        }
    }
}

impl DescriptorCodec for TargetIpAddressDescriptor {
    const TAG: u8 = DID_TARGET_IP_ADDRESS;
    const XML_NAME: &'static str = "target_IP_address_descriptor";

    fn invalid() -> Self {
        Self {
            valid: false,
            ..Self::default()
        }
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn write_payload(&self, out: &mut BytesMut) {
        out.put_u32(self.ipv4_addr_mask.into());
        for addr in self.ipv4_addr.iter().take(MAX_ENTRIES) {
            out.put_u32((*addr).into());
        }
    }

    fn read_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 4 || payload.len() % 4 != 0 {
            return Err(PsiError::Malformed("target IP address descriptor: size not a multiple of 4"));
        }
        Ok(Self {
            ipv4_addr_mask: Ipv4Addr::from(get_u32(payload, 0)),
            ipv4_addr: payload[4..]
                .chunks_exact(4)
                .map(|c| Ipv4Addr::from(get_u32(c, 0)))
                .collect(),
            valid: true,
        })
    }

    fn write_xml(&self, root: &mut Element) {
        root.set_attribute("IPv4_addr_mask", self.ipv4_addr_mask.to_string());
        for addr in &self.ipv4_addr {
            root.add_element("address")
                .set_attribute("IPv4_addr", addr.to_string());
        }
    }

    fn read_xml(element: &Element) -> Result<Self> {
        let ipv4_addr_mask = element.get_ipv4_attribute("IPv4_addr_mask", true)?;
        let ipv4_addr = element
            .children_named("address")
            .map(|a| a.get_ipv4_attribute("IPv4_addr", true))
            .collect::<Result<Vec<_>>>()?;
        if ipv4_addr.len() > MAX_ENTRIES {
            return Err(PsiError::schema(format!(
                "{} addresses in <{}>, at most {MAX_ENTRIES} allowed",
                ipv4_addr.len(),
                Self::XML_NAME
            )));
        }
        Ok(Self {
            ipv4_addr_mask,
            ipv4_addr,
            valid: true,
        })
    }
}
