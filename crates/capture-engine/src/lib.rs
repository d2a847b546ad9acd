//! VideoBank Capture Engine
//!
//! Drives one camera recording from device acquisition to a finished
//! artifact. The engine never talks to hardware directly: camera, recorder,
//! clock and preview registry are injected capabilities, and the
//! [`CaptureSession`] reacts to user commands plus recorder/timer events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     CaptureSession                        │
//! │                                                           │
//! │  acquire ──► negotiate ──► start ──► tick ... ──► stop    │
//! │     │                        │                     │      │
//! │     ▼                        ▼                     ▼      │
//! │  MediaStream            Recorder ─ chunks ─► ChunkBuffer  │
//! │  (preview surface)                                 │      │
//! │     │                                  Finalized ──┤      │
//! │     └──────── still frame ─────────► Assembly ◄────┘      │
//! │                                          │                │
//! │                                          ▼                │
//! │                          CapturedArtifact ──► caller      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod acquisition;
pub mod assembly;
pub mod backend;
pub mod negotiation;
pub mod preview;
pub mod session;
pub mod still;

pub use preview::InMemoryPreviewRegistry;
pub use session::*;
