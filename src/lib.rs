// src/lib.rs
//! Binary and XML codecs for PSI/SI descriptors and multi-section tables.

pub mod config;
pub mod constants;
pub mod descriptors;
pub mod error;
pub mod field;
pub mod psi;
pub mod xml;

pub use config::{CodecOptions, ConsistencyPolicy};
pub use descriptors::{Descriptor, DescriptorCodec, DescriptorList};
pub use error::{PsiError, Result};
pub use psi::{BinaryTable, Section, VirtualChannelTable};
