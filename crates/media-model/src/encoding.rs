//! Recording container/codec candidates.
//!
//! Candidates are written as MIME strings (`video/webm;codecs=vp8,opus`)
//! because that is the form platform recorders accept and report. Parsing
//! keeps the original string so the exact negotiated value can be attached
//! to the finished artifact.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Media type used for the artifact when negotiation selected nothing.
pub const FALLBACK_VIDEO_MIME: &str = "video/webm";

/// Recording container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
}

impl Container {
    pub fn essence(&self) -> &'static str {
        match self {
            Container::Mp4 => "video/mp4",
            Container::Webm => "video/webm",
        }
    }
}

/// Broad class of a codec identifier inside a MIME `codecs` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Video,
    Audio,
    Unknown,
}

/// Classify a codec identifier such as `avc1.42E01E` or `opus`.
pub fn codec_kind(codec: &str) -> CodecKind {
    let lower = codec.to_ascii_lowercase();
    let family = lower.split('.').next().unwrap_or_default();
    match family {
        "avc1" | "avc3" | "h264" | "hev1" | "hvc1" | "vp8" | "vp9" | "vp09" | "av01" | "av1" => {
            CodecKind::Video
        }
        "mp4a" | "aac" | "opus" | "vorbis" => CodecKind::Audio,
        _ => CodecKind::Unknown,
    }
}

/// One container/codec pairing that may be offered to the recorder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncodingCandidate {
    mime: String,
    container: Container,
    codecs: Vec<String>,
}

impl EncodingCandidate {
    /// Parse a MIME string like `video/mp4; codecs="avc1.42E01E, mp4a.40.2"`.
    pub fn parse(mime: &str) -> Result<Self, ModelError> {
        let trimmed = mime.trim();
        let mut parts = trimmed.split(';');
        let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();

        let container = match essence.as_str() {
            "video/mp4" => Container::Mp4,
            "video/webm" => Container::Webm,
            other if other.starts_with("video/") => {
                return Err(ModelError::UnknownContainer {
                    value: other.trim_start_matches("video/").to_string(),
                })
            }
            _ => {
                return Err(ModelError::InvalidMime {
                    value: mime.to_string(),
                })
            }
        };

        let mut codecs = Vec::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let Some((key, value)) = param.split_once('=') else {
                return Err(ModelError::InvalidMime {
                    value: mime.to_string(),
                });
            };
            if !key.trim().eq_ignore_ascii_case("codecs") {
                continue;
            }
            codecs.extend(
                value
                    .trim()
                    .trim_matches('"')
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            );
        }

        Ok(Self {
            mime: trimmed.to_string(),
            container,
            codecs,
        })
    }

    /// The MIME string exactly as configured.
    pub fn mime_type(&self) -> &str {
        &self.mime
    }

    pub fn container(&self) -> Container {
        self.container
    }

    /// Codec identifiers listed in the `codecs` parameter, in order.
    pub fn codecs(&self) -> &[String] {
        &self.codecs
    }

    /// First video codec named by the candidate, if any.
    pub fn video_codec(&self) -> Option<&str> {
        self.codecs
            .iter()
            .find(|c| codec_kind(c) == CodecKind::Video)
            .map(String::as_str)
    }

    /// First audio codec named by the candidate, if any.
    pub fn audio_codec(&self) -> Option<&str> {
        self.codecs
            .iter()
            .find(|c| codec_kind(c) == CodecKind::Audio)
            .map(String::as_str)
    }
}

impl fmt::Display for EncodingCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime)
    }
}

impl TryFrom<String> for EncodingCandidate {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EncodingCandidate> for String {
    fn from(value: EncodingCandidate) -> Self {
        value.mime
    }
}

/// Default negotiation order: broadly playable MP4/H.264 first, WebM last.
pub fn default_encoding_priority() -> Vec<EncodingCandidate> {
    [
        "video/mp4; codecs=\"avc1.42E01E, mp4a.40.2\"",
        "video/mp4",
        "video/webm;codecs=vp9,opus",
        "video/webm;codecs=vp8,opus",
        "video/webm",
    ]
    .iter()
    .filter_map(|mime| EncodingCandidate::parse(mime).ok())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_codec_list() {
        let candidate = EncodingCandidate::parse("video/mp4; codecs=\"avc1.42E01E, mp4a.40.2\"").unwrap();
        assert_eq!(candidate.container(), Container::Mp4);
        assert_eq!(candidate.codecs(), ["avc1.42E01E", "mp4a.40.2"]);
        assert_eq!(candidate.video_codec(), Some("avc1.42E01E"));
        assert_eq!(candidate.audio_codec(), Some("mp4a.40.2"));
    }

    #[test]
    fn parses_bare_codec_list() {
        let candidate = EncodingCandidate::parse("video/webm;codecs=vp9,opus").unwrap();
        assert_eq!(candidate.container(), Container::Webm);
        assert_eq!(candidate.video_codec(), Some("vp9"));
        assert_eq!(candidate.audio_codec(), Some("opus"));
    }

    #[test]
    fn keeps_original_mime_string() {
        let mime = "video/webm;codecs=vp8,opus";
        assert_eq!(EncodingCandidate::parse(mime).unwrap().mime_type(), mime);
    }

    #[test]
    fn container_only_has_no_codecs() {
        let candidate = EncodingCandidate::parse("video/mp4").unwrap();
        assert!(candidate.codecs().is_empty());
        assert_eq!(candidate.video_codec(), None);
    }

    #[test]
    fn rejects_unknown_containers() {
        assert!(matches!(
            EncodingCandidate::parse("video/ogg"),
            Err(ModelError::UnknownContainer { .. })
        ));
        assert!(matches!(
            EncodingCandidate::parse("audio/wav"),
            Err(ModelError::InvalidMime { .. })
        ));
    }

    #[test]
    fn default_priority_prefers_mp4() {
        let list = default_encoding_priority();
        assert_eq!(list.len(), 5);
        assert_eq!(list[0].container(), Container::Mp4);
        assert_eq!(list[4].mime_type(), FALLBACK_VIDEO_MIME);
    }

    #[test]
    fn serializes_as_plain_string() {
        let candidate = EncodingCandidate::parse("video/webm").unwrap();
        assert_eq!(serde_json::to_string(&candidate).unwrap(), "\"video/webm\"");
        let back: EncodingCandidate = serde_json::from_str("\"video/webm;codecs=vp8\"").unwrap();
        assert_eq!(back.video_codec(), Some("vp8"));
    }
}
