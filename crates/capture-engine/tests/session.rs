mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{harness, FakeBackend};
use videobank_capture_engine::acquisition::ACQUISITION_ERROR_MESSAGE;
use videobank_capture_engine::{SessionStatus, RECORDER_INIT_ERROR_MESSAGE};
use videobank_common::error::VideobankError;
use videobank_platform_core::PreviewRegistry;

const ALL_TYPES: &[&str] = &["video/mp4; codecs=\"avc1.42E01E, mp4a.40.2\"", "video/mp4", "video/webm"];

#[tokio::test]
async fn full_recording_produces_ordered_artifact() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    assert_eq!(h.session.status(), SessionStatus::Ready);

    h.session.start().unwrap();
    assert_eq!(h.session.status(), SessionStatus::Recording);

    let sink = h.backend.sink();
    sink.data(b"one-".to_vec());
    h.clock.advance(Duration::from_millis(1_200));
    sink.data(Vec::new());
    sink.data(b"two-".to_vec());
    h.clock.advance(Duration::from_millis(2_300));
    assert!(h.session.process_pending().await.unwrap().is_none());
    assert_eq!(h.session.elapsed_secs(), 3);

    assert!(h.session.stop().unwrap());
    assert_eq!(h.session.status(), SessionStatus::Stopped);
    sink.data(b"three".to_vec());
    sink.finalized();

    let artifact = h.session.process_pending().await.unwrap().expect("artifact");
    assert_eq!(artifact.video.bytes(), b"one-two-three");
    assert_eq!(artifact.video.mime_type(), "video/mp4; codecs=\"avc1.42E01E, mp4a.40.2\"");
    assert_eq!(artifact.duration_secs, 3);
    assert!(artifact.frame.data_url().starts_with("data:image/jpeg;base64,"));
    assert_eq!(h.previews.resolve(&artifact.preview), Some(artifact.video.clone()));

    assert_eq!(h.backend.live_streams(), 0);
    assert_eq!(h.clock.active_timers(), 0);
}

#[tokio::test]
async fn elapsed_freezes_at_stop() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();

    h.clock.advance(Duration::from_millis(10_400));
    h.session.stop().unwrap();
    assert_eq!(h.session.elapsed_secs(), 10);

    h.clock.advance(Duration::from_secs(5));
    h.session.process_pending().await.unwrap();
    assert_eq!(h.session.elapsed_secs(), 10);
}

#[tokio::test]
async fn stop_without_start_is_a_no_op() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    assert!(!h.session.stop().unwrap());
    assert_eq!(h.session.status(), SessionStatus::Idle);

    h.session.acquire().await.unwrap();
    assert!(!h.session.stop().unwrap());
    assert_eq!(h.session.status(), SessionStatus::Ready);
    assert!(h.session.has_stream());
}

#[tokio::test]
async fn start_without_stream_is_rejected() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    let err = h.session.start().unwrap_err();
    assert!(matches!(err, VideobankError::InvalidState { .. }));
    assert_eq!(h.session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn second_start_is_rejected_while_recording() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();
    assert!(h.session.start().is_err());
    assert_eq!(h.session.status(), SessionStatus::Recording);
    assert_eq!(h.backend.sinks.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn acquisition_failure_sets_errored_state() {
    let mut h = harness(FakeBackend {
        deny_acquire: true,
        ..FakeBackend::default()
    });
    let err = h.session.acquire().await.unwrap_err();
    assert!(matches!(err, VideobankError::Acquisition { .. }));
    assert_eq!(h.session.status(), SessionStatus::Errored);
    assert_eq!(h.session.error_message(), Some(ACQUISITION_ERROR_MESSAGE));
    assert!(!h.session.has_stream());
}

#[tokio::test]
async fn acquire_is_rejected_while_stream_is_held() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    assert!(h.session.acquire().await.is_err());
    assert_eq!(h.backend.streams.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn negotiation_uses_first_supported_candidate() {
    let mut h = harness(FakeBackend::supporting(&["video/webm;codecs=vp9,opus"]));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();

    assert_eq!(h.backend.last_encoding().as_deref(), Some("video/webm;codecs=vp9,opus"));
    assert_eq!(
        h.session.record().encoding.as_ref().map(|e| e.mime_type()),
        Some("video/webm;codecs=vp9,opus")
    );
}

#[tokio::test]
async fn no_supported_candidate_falls_back_to_platform_default() {
    let mut h = harness(FakeBackend::default());
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();
    assert_eq!(h.backend.last_encoding(), None);

    let sink = h.backend.sink();
    sink.data(vec![1, 2, 3]);
    h.session.stop().unwrap();
    sink.finalized();

    let artifact = h.session.process_pending().await.unwrap().unwrap();
    assert_eq!(artifact.video.mime_type(), "video/webm");
}

#[tokio::test]
async fn recorder_init_failure_releases_everything() {
    let mut h = harness(FakeBackend {
        fail_recorder: true,
        ..FakeBackend::supporting(ALL_TYPES)
    });
    h.session.acquire().await.unwrap();

    let err = h.session.start().unwrap_err();
    assert!(matches!(err, VideobankError::RecorderInit { .. }));
    assert_eq!(h.session.status(), SessionStatus::Errored);
    assert_eq!(h.session.error_message(), Some(RECORDER_INIT_ERROR_MESSAGE));
    assert_ne!(h.session.error_message(), Some(ACQUISITION_ERROR_MESSAGE));
    assert_eq!(h.backend.live_streams(), 0);
    assert_eq!(h.clock.active_timers(), 0);
}

#[tokio::test]
async fn cancel_during_recording_emits_nothing() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();

    let sink = h.backend.sink();
    sink.data(b"partial".to_vec());
    h.clock.advance(Duration::from_secs(2));
    h.session.cancel();

    assert_eq!(h.session.status(), SessionStatus::Idle);
    assert_eq!(h.session.buffered_bytes(), 0);
    assert_eq!(h.backend.live_streams(), 0);
    assert_eq!(h.clock.active_timers(), 0);

    // The recorder's late output belongs to the cancelled attempt.
    sink.data(b"late".to_vec());
    sink.finalized();
    assert!(h.session.process_pending().await.unwrap().is_none());
    assert_eq!(h.previews.live_handles(), 0);
}

#[tokio::test]
async fn output_from_previous_attempt_is_ignored() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();
    h.clock.advance(Duration::from_secs(4));
    h.session.cancel();

    h.session.acquire().await.unwrap();
    h.session.start().unwrap();
    let stale = h.backend.sink_at(0);
    let current = h.backend.sink_at(1);

    stale.data(b"stale".to_vec());
    current.data(b"fresh".to_vec());
    h.session.process_pending().await.unwrap();
    assert_eq!(h.session.buffered_bytes(), 5);
    assert_eq!(h.session.elapsed_secs(), 0);

    h.clock.advance(Duration::from_millis(1_500));
    h.session.stop().unwrap();
    stale.finalized();
    assert!(h.session.process_pending().await.unwrap().is_none());
    assert_eq!(h.session.status(), SessionStatus::Stopped);

    current.finalized();
    let artifact = h.session.process_pending().await.unwrap().unwrap();
    assert_eq!(artifact.video.bytes(), b"fresh");
    assert_eq!(artifact.duration_secs, 1);
}

#[tokio::test]
async fn finalize_is_consumed_once() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();
    let sink = h.backend.sink();
    sink.data(vec![7]);
    h.session.stop().unwrap();
    sink.finalized();
    sink.finalized();

    let first = h.session.process_pending().await.unwrap();
    assert!(first.is_some());
    assert_eq!(h.previews.live_handles(), 1);
}

#[tokio::test]
async fn zero_sized_preview_yields_placeholder_frame() {
    let mut h = harness(FakeBackend {
        zero_surface: true,
        ..FakeBackend::supporting(ALL_TYPES)
    });
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();
    let sink = h.backend.sink();
    sink.data(vec![1]);
    h.session.stop().unwrap();
    sink.finalized();

    let artifact = h.session.process_pending().await.unwrap().unwrap();
    assert!(artifact.frame.is_placeholder());
    assert_eq!(artifact.video.len(), 1);
}

#[tokio::test]
async fn recorder_failure_moves_to_errored_and_releases() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();
    let sink = h.backend.sink();
    sink.data(vec![1, 2]);
    sink.failed("encoder crashed");

    let err = h.session.process_pending().await.unwrap_err();
    assert!(matches!(err, VideobankError::Platform { .. }));
    assert_eq!(h.session.status(), SessionStatus::Errored);
    assert_eq!(h.session.buffered_bytes(), 0);
    assert_eq!(h.backend.live_streams(), 0);
    assert_eq!(h.clock.active_timers(), 0);

    // Recoverable by acquiring again.
    h.session.acquire().await.unwrap();
    assert_eq!(h.session.status(), SessionStatus::Ready);
}

#[tokio::test]
async fn release_is_idempotent() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();

    h.session.release();
    h.session.release();
    h.session.cancel();

    assert_eq!(h.backend.track_stops.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(
        h.backend.recorder_stops.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn dropping_the_session_releases_the_camera() {
    let h = harness(FakeBackend::supporting(ALL_TYPES));
    let backend = h.backend.clone();
    let clock = h.clock.clone();
    let mut session = h.session;
    session.acquire().await.unwrap();
    session.start().unwrap();
    assert_eq!(backend.live_streams(), 1);

    drop(session);
    assert_eq!(backend.live_streams(), 0);
    assert_eq!(clock.active_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoned_acquire_can_be_retried() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.backend.stall_acquire.store(true, Ordering::SeqCst);

    let outcome = tokio::time::timeout(Duration::from_millis(50), h.session.acquire()).await;
    assert!(outcome.is_err());
    assert_eq!(h.session.status(), SessionStatus::Acquiring);
    assert!(!h.session.has_stream());

    h.session.acquire().await.unwrap();
    assert_eq!(h.session.status(), SessionStatus::Ready);
    assert_eq!(h.backend.live_streams(), 1);
}

#[tokio::test]
async fn stopped_session_needs_cancel_before_next_acquire() {
    let mut h = harness(FakeBackend::supporting(ALL_TYPES));
    h.session.acquire().await.unwrap();
    h.session.start().unwrap();
    h.session.stop().unwrap();
    h.backend.sink().data(b"clip".to_vec());
    h.backend.sink().finalized();
    assert!(h.session.process_pending().await.unwrap().is_some());
    assert_eq!(h.session.status(), SessionStatus::Stopped);

    let err = h.session.acquire().await.unwrap_err();
    assert!(matches!(err, VideobankError::InvalidState { .. }));
    assert_eq!(h.session.status(), SessionStatus::Stopped);

    h.session.cancel();
    assert_eq!(h.session.status(), SessionStatus::Idle);
    h.session.acquire().await.unwrap();
    assert_eq!(h.session.status(), SessionStatus::Ready);
    assert_eq!(h.backend.live_streams(), 1);
}
