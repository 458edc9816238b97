//! Constants for PSI/SI section and descriptor encoding

/// Section size constants
pub const MAX_PSI_SECTION_SIZE: usize = 1024;
pub const LONG_SECTION_HEADER_SIZE: usize = 8;
pub const SECTION_CRC32_SIZE: usize = 4;
pub const MAX_PSI_LONG_SECTION_PAYLOAD_SIZE: usize =
    MAX_PSI_SECTION_SIZE - LONG_SECTION_HEADER_SIZE - SECTION_CRC32_SIZE; // 1012
/// section_number is 8 bits
pub const MAX_SECTIONS_PER_TABLE: usize = 256;

/// Descriptor constants
pub const DESCRIPTOR_HEADER_SIZE: usize = 2; // tag + length
pub const MAX_DESCRIPTOR_PAYLOAD_SIZE: usize = 255;
pub const MAX_DESCRIPTOR_SIZE: usize = DESCRIPTOR_HEADER_SIZE + MAX_DESCRIPTOR_PAYLOAD_SIZE;

/// Table ids
pub const TID_UNT: u8 = 0x4B;
pub const TID_INT: u8 = 0x4C;
pub const TID_TVCT: u8 = 0xC8;
pub const TID_CVCT: u8 = 0xC9;

/// Descriptor tags
pub const DID_TARGET_IP_ADDRESS: u8 = 0x09; // INT/UNT only
pub const DID_AC3: u8 = 0x6A;
pub const DID_ECM_REPETITION_RATE: u8 = 0xD9;

/// Virtual channel table layout
pub const VCT_CHANNEL_FIXED_SIZE: usize = 32;
pub const VCT_SHORT_NAME_UNITS: usize = 7;
