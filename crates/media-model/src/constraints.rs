//! Camera and microphone acquisition constraints.
//!
//! The set of options is fixed: which way the camera faces and whether a
//! microphone track is requested. There is deliberately no aspect-ratio or
//! resolution option, so devices are opened at their native sensor format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Which camera to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// User-facing camera.
    Front,
    /// Environment-facing camera (the one pointed at the work).
    #[default]
    Rear,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Front => "front",
            FacingMode::Rear => "rear",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacingMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(FacingMode::Front),
            "rear" | "back" | "environment" => Ok(FacingMode::Rear),
            _ => Err(ModelError::UnknownFacing {
                value: s.to_string(),
            }),
        }
    }
}

/// Constraints passed to the media source when acquiring a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConstraints {
    /// Camera to open.
    #[serde(default)]
    pub facing: FacingMode,

    /// Whether to open a microphone track alongside the camera.
    #[serde(default = "default_audio")]
    pub audio: bool,
}

fn default_audio() -> bool {
    true
}

impl CaptureConstraints {
    pub fn new(facing: FacingMode, audio: bool) -> Self {
        Self { facing, audio }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Rear,
            audio: true,
        }
    }
}
