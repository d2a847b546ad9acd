//! Still-frame capture from the live preview.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{imageops::FilterType, ImageEncoder, RgbImage};
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::StillFrame;
use videobank_platform_core::{PreviewSurface, RawFrame};

/// Take the frame currently shown on `surface`, scaled to the surface's
/// native resolution, and encode it as a JPEG data URL.
///
/// A surface without dimensions (not yet showing video, or mid-teardown)
/// yields [`VideobankError::FrameCapture`].
pub async fn capture_still(surface: &dyn PreviewSurface, quality: u8) -> VideobankResult<StillFrame> {
    let (width, height) = surface.native_size();
    if width == 0 || height == 0 {
        return Err(VideobankError::frame_capture(format!(
            "Preview surface has no dimensions ({width}x{height})"
        )));
    }

    let frame = surface
        .current_frame()
        .ok_or_else(|| VideobankError::frame_capture("Preview surface has no frame to capture"))?;

    let quality = quality.clamp(1, 100);
    let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(frame, width, height, quality))
        .await
        .map_err(|e| VideobankError::frame_capture(format!("Still encoder task failed: {e}")))??;

    tracing::debug!(width, height, bytes = jpeg.len(), "Captured still frame");
    Ok(StillFrame::from_jpeg_base64(BASE64.encode(jpeg)))
}

/// Encode an RGB frame as JPEG at `width`x`height`.
pub fn encode_jpeg(frame: RawFrame, width: u32, height: u32, quality: u8) -> VideobankResult<Vec<u8>> {
    if !frame.is_valid() {
        return Err(VideobankError::frame_capture(format!(
            "Malformed preview frame {}x{} with {} bytes",
            frame.width,
            frame.height,
            frame.rgb.len()
        )));
    }

    let (src_width, src_height) = (frame.width, frame.height);
    let image = RgbImage::from_raw(src_width, src_height, frame.rgb)
        .ok_or_else(|| VideobankError::frame_capture("Preview frame buffer too small"))?;
    let image = if (src_width, src_height) == (width, height) {
        image
    } else {
        image::imageops::resize(&image, width, height, FilterType::Triangle)
    };

    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| VideobankError::frame_capture(format!("JPEG encoding failed: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedSurface {
        size: (u32, u32),
        frame: Mutex<Option<RawFrame>>,
    }

    impl PreviewSurface for FixedSurface {
        fn native_size(&self) -> (u32, u32) {
            self.size
        }

        fn current_frame(&self) -> Option<RawFrame> {
            self.frame.lock().unwrap().clone()
        }
    }

    fn gray(width: u32, height: u32) -> RawFrame {
        RawFrame::new(width, height, vec![128; (width * height * 3) as usize])
    }

    #[tokio::test]
    async fn encodes_jpeg_data_url_at_native_size() {
        let surface = FixedSurface {
            size: (32, 16),
            frame: Mutex::new(Some(gray(32, 16))),
        };
        let still = capture_still(&surface, 80).await.unwrap();
        assert!(still.data_url().starts_with("data:image/jpeg;base64,"));

        let bytes = BASE64.decode(still.base64_payload()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[tokio::test]
    async fn rescales_frames_to_native_size() {
        let surface = FixedSurface {
            size: (20, 10),
            frame: Mutex::new(Some(gray(40, 20))),
        };
        let still = capture_still(&surface, 80).await.unwrap();
        let bytes = BASE64.decode(still.base64_payload()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }

    #[tokio::test]
    async fn zero_sized_surface_fails_gracefully() {
        let surface = FixedSurface {
            size: (0, 0),
            frame: Mutex::new(None),
        };
        let err = capture_still(&surface, 80).await.unwrap_err();
        assert!(matches!(err, VideobankError::FrameCapture { .. }));
    }

    #[test]
    fn malformed_frame_is_rejected() {
        let err = encode_jpeg(RawFrame::new(4, 4, vec![0; 5]), 4, 4, 80).unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }
}
