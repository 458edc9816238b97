// psi/mod.rs
pub mod section;
pub mod splitter;
pub mod vct;

pub use section::{BinaryTable, Section};
pub use splitter::{EntryCodec, LongTableLayout, SplitState};
pub use vct::{Channel, VctKind, VirtualChannelTable};
