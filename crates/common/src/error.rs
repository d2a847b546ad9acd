//! Error types shared across VideoBank crates.

/// Top-level error type for VideoBank operations.
#[derive(Debug, thiserror::Error)]
pub enum VideobankError {
    /// Camera or microphone could not be opened (denied or missing device).
    #[error("Acquisition error: {message}")]
    Acquisition { message: String },

    /// The platform recorder refused the negotiated encoding or failed to start.
    #[error("Recorder initialization error: {message}")]
    RecorderInit { message: String },

    /// A still image could not be taken from the live preview.
    #[error("Still frame capture error: {message}")]
    FrameCapture { message: String },

    /// The AI analysis collaborator failed or returned garbage.
    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Submission error: {message}")]
    Submission { message: String },

    /// An operation was requested in a state that does not allow it.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VideobankError.
pub type VideobankResult<T> = Result<T, VideobankError>;

impl VideobankError {
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
        }
    }

    pub fn recorder_init(msg: impl Into<String>) -> Self {
        Self::RecorderInit {
            message: msg.into(),
        }
    }

    pub fn frame_capture(msg: impl Into<String>) -> Self {
        Self::FrameCapture {
            message: msg.into(),
        }
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis {
            message: msg.into(),
        }
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission {
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error ends the capture screen (the user must retry or
    /// leave). Frame and analysis failures degrade output but never block.
    pub fn is_fatal_for_capture(&self) -> bool {
        matches!(
            self,
            Self::Acquisition { .. } | Self::RecorderInit { .. } | Self::Platform { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_errors_are_fatal_others_are_not() {
        assert!(VideobankError::acquisition("denied").is_fatal_for_capture());
        assert!(VideobankError::recorder_init("codec").is_fatal_for_capture());
        assert!(!VideobankError::frame_capture("0x0").is_fatal_for_capture());
        assert!(!VideobankError::analysis("timeout").is_fatal_for_capture());
    }

    #[test]
    fn messages_name_the_category() {
        let err = VideobankError::recorder_init("video/ogg not supported");
        assert_eq!(
            err.to_string(),
            "Recorder initialization error: video/ogg not supported"
        );
    }
}
