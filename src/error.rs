//! Error types for the PSI/SI codec.
//!
//! Entity-level entry points never return these: they fold a failure into the
//! entity's validity flag. The `Result`-returning `try_*` functions expose the
//! cause for callers that want it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PsiError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PsiError {
    /// Descriptor tag does not match the decoded type.
    #[error("unexpected tag 0x{actual:02X}, expected 0x{expected:02X}")]
    TagMismatch { expected: u8, actual: u8 },

    /// Declared length disagrees with the available bytes.
    #[error("declared length {declared} but {available} bytes available")]
    LengthMismatch { declared: usize, available: usize },

    /// Buffer ends before a mandatory field.
    #[error("truncated {what}: need {needed} bytes, got {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// Payload shape violates the structure's own rules.
    #[error("malformed {0}")]
    Malformed(&'static str),

    /// A section promises more than it carries, or sections disagree.
    #[error("inconsistent table: {0}")]
    TableInconsistent(String),

    /// XML element or attribute does not match the expected schema.
    #[error("XML schema violation: {0}")]
    XmlSchema(String),

    /// XML text is not well-formed.
    #[error("XML syntax error: {0}")]
    XmlSyntax(String),

    /// Section CRC32 does not match its content.
    #[error("CRC-32 mismatch: computed 0x{computed:08X}, stored 0x{stored:08X}")]
    CrcMismatch { computed: u32, stored: u32 },
}

impl PsiError {
    pub(crate) fn truncated(what: &'static str, needed: usize, available: usize) -> Self {
        PsiError::Truncated {
            what,
            needed,
            available,
        }
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        PsiError::XmlSchema(msg.into())
    }
}
