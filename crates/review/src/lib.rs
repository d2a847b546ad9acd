//! VideoBank Review
//!
//! Everything that happens to a recording after capture:
//! - **Analysis:** AI tag/description suggestions from the still frame, with
//!   a fixed fallback when the model is unavailable
//! - **Earnings:** payout estimate from the recorded duration
//! - **Draft:** user-edited tags and description
//! - **Submission:** upload collaborator and the earnings ledger
//! - **Flow:** the Dashboard → Recorder → Review → Success view machine

pub mod analysis;
pub mod draft;
pub mod earnings;
pub mod flow;
pub mod gemini;
pub mod ledger;
pub mod submission;

pub use analysis::*;
pub use draft::*;
pub use earnings::*;
pub use flow::*;
pub use gemini::GeminiAnalysisService;
pub use ledger::*;
pub use submission::*;
