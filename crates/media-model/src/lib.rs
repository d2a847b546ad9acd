//! VideoBank Media Model
//!
//! Defines the data contracts shared by the capture engine and the review
//! stage:
//! - **Constraints:** Which camera to open and whether to record audio
//! - **Encoding:** Container/codec candidates tried during negotiation
//! - **Artifact:** Recorded chunks, the assembled video, its preview handle
//!   and the still frame handed to analysis
//! - **Ledger:** Tags, submitted video metadata, and earnings totals
//!
//! Nothing in this crate performs I/O.

pub mod artifact;
pub mod constraints;
pub mod encoding;
pub mod ledger;

pub use artifact::*;
pub use constraints::*;
pub use encoding::*;
pub use ledger::*;

/// Errors raised while constructing model values from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown facing mode '{value}' (expected 'front' or 'rear')")]
    UnknownFacing { value: String },

    #[error("Unknown container '{value}' (expected 'mp4' or 'webm')")]
    UnknownContainer { value: String },

    #[error("Invalid MIME type '{value}'")]
    InvalidMime { value: String },
}
