//! Codec configuration

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PSI_LONG_SECTION_PAYLOAD_SIZE, VCT_CHANNEL_FIXED_SIZE};

/// Smallest payload that still holds a table prefix, one channel and the
/// global descriptor length.
pub const MIN_SECTION_PAYLOAD: usize = 2 + VCT_CHANNEL_FIXED_SIZE + 2;

/// How reassembly treats table-level fields that differ between sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPolicy {
    /// version, current_next and table_id_extension must match in every
    /// section, otherwise the table is invalid.
    #[default]
    Strict,
    /// The last section read wins, without checking.
    LastWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Payload capacity of one long section (header and CRC excluded).
    pub max_section_payload: usize,
    pub consistency: ConsistencyPolicy,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_section_payload: MAX_PSI_LONG_SECTION_PAYLOAD_SIZE,
            consistency: ConsistencyPolicy::Strict,
        }
    }
}

impl CodecOptions {
    /// Payload capacity clamped to what a long section can actually carry.
    pub fn section_capacity(&self) -> usize {
        self.max_section_payload
            .clamp(MIN_SECTION_PAYLOAD, MAX_PSI_LONG_SECTION_PAYLOAD_SIZE)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
