//! Encoder negotiation.

use videobank_media_model::EncodingCandidate;

/// Pick the first candidate the platform reports as supported.
///
/// Returns `None` when nothing matches; the recorder is then created without
/// an explicit type and the platform picks its own default.
pub fn select_encoding<F>(
    candidates: &[EncodingCandidate],
    mut is_supported: F,
) -> Option<EncodingCandidate>
where
    F: FnMut(&EncodingCandidate) -> bool,
{
    for candidate in candidates {
        if is_supported(candidate) {
            tracing::info!(encoding = %candidate, "Selected recording encoding");
            return Some(candidate.clone());
        }
        tracing::debug!(encoding = %candidate, "Encoding not supported");
    }

    tracing::warn!(
        candidates = candidates.len(),
        "No preferred encoding supported; deferring to platform default"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use videobank_media_model::default_encoding_priority;

    #[test]
    fn picks_exactly_the_only_supported_candidate() {
        let candidates = default_encoding_priority();
        let third = candidates[2].clone();
        let chosen = select_encoding(&candidates, |c| *c == third);
        assert_eq!(chosen, Some(third));
    }

    #[test]
    fn prefers_earlier_candidates() {
        let candidates = default_encoding_priority();
        let chosen = select_encoding(&candidates, |c| c.mime_type().starts_with("video/webm"));
        assert_eq!(chosen.unwrap().mime_type(), "video/webm;codecs=vp9,opus");
    }

    #[test]
    fn returns_none_when_nothing_is_supported() {
        let candidates = default_encoding_priority();
        assert_eq!(select_encoding(&candidates, |_| false), None);
    }

    #[test]
    fn stops_probing_after_first_match() {
        let candidates = default_encoding_priority();
        let mut probed = 0;
        select_encoding(&candidates, |_| {
            probed += 1;
            probed == 2
        });
        assert_eq!(probed, 2);
    }
}
