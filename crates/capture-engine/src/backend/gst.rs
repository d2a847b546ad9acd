//! GStreamer camera backend (V4L2 video, PulseAudio audio).
//!
//! Acquisition starts a preview-only pipeline that keeps the latest RGB
//! frame for the preview surface. Starting a recorder replaces it with one
//! pipeline that tees the camera into the same preview branch and into an
//! encoder/muxer whose streamable output is delivered through an appsink.
//! A V4L2 node can only be opened once, hence the swap instead of a second
//! pipeline.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::{CaptureConstraints, Container, EncodingCandidate, FacingMode};
use videobank_platform_core::{
    CaptureBackend, EncoderSupport, MediaSource, MediaStream, PreviewSurface, RawFrame, Recorder,
    RecorderFactory, RecorderSink,
};

/// Camera backend over GStreamer.
#[derive(Debug)]
pub struct GstBackend {
    device_override: Option<String>,
}

impl GstBackend {
    /// Initialise GStreamer and pick devices automatically.
    pub fn new() -> VideobankResult<Self> {
        init_gstreamer()?;
        Ok(Self {
            device_override: None,
        })
    }

    /// Always use `device` (e.g. `/dev/video2`) regardless of facing mode.
    pub fn with_device(device: impl Into<String>) -> VideobankResult<Self> {
        init_gstreamer()?;
        Ok(Self {
            device_override: Some(device.into()),
        })
    }
}

#[async_trait::async_trait]
impl MediaSource for GstBackend {
    async fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> VideobankResult<Box<dyn MediaStream>> {
        let device = match &self.device_override {
            Some(device) => device.clone(),
            None => detect_camera_device(constraints.facing).ok_or_else(|| {
                VideobankError::acquisition(
                    "No camera found (expected /dev/video0 or another /dev/video* node)",
                )
            })?,
        };

        let has_audio = constraints.audio && gst::ElementFactory::find("pulsesrc").is_some();
        if constraints.audio && !has_audio {
            tracing::warn!("pulsesrc is not available; recording without audio");
        }

        let surface = Arc::new(LiveSurface::default());
        let pipeline = launch_pipeline(&preview_launch(&device))
            .map_err(|e| VideobankError::acquisition(e.to_string()))?;
        attach_preview(&pipeline, &surface)
            .map_err(|e| VideobankError::acquisition(e.to_string()))?;
        set_playing(&pipeline, "preview").map_err(|e| VideobankError::acquisition(e.to_string()))?;

        Ok(Box::new(GstStream {
            id: format!("v4l2:{device}"),
            device,
            has_audio,
            active: AtomicBool::new(true),
            pipeline: Arc::new(Mutex::new(Some(pipeline))),
            surface,
        }))
    }
}

impl EncoderSupport for GstBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        let Ok(candidate) = EncodingCandidate::parse(mime_type) else {
            return false;
        };
        match EncoderChain::for_encoding(Some(&candidate)) {
            Some(chain) => chain
                .required_elements(true)
                .iter()
                .all(|name| gst::ElementFactory::find(name).is_some()),
            None => false,
        }
    }
}

impl RecorderFactory for GstBackend {
    fn create_recorder(
        &self,
        stream: &dyn MediaStream,
        encoding: Option<&EncodingCandidate>,
        sink: RecorderSink,
    ) -> VideobankResult<Box<dyn Recorder>> {
        let stream = stream.as_any().downcast_ref::<GstStream>().ok_or_else(|| {
            VideobankError::recorder_init("Stream was not opened by the GStreamer backend")
        })?;
        if !stream.is_active() {
            return Err(VideobankError::recorder_init("Camera stream has been stopped"));
        }

        let chain = EncoderChain::for_encoding(encoding).ok_or_else(|| {
            VideobankError::recorder_init(format!(
                "No GStreamer encoder for {}",
                encoding.map(|e| e.mime_type()).unwrap_or("default")
            ))
        })?;
        if let Some(missing) = chain
            .required_elements(stream.has_audio)
            .into_iter()
            .find(|name| gst::ElementFactory::find(name).is_none())
        {
            return Err(VideobankError::recorder_init(format!(
                "GStreamer element '{missing}' is not installed"
            )));
        }

        Ok(Box::new(GstRecorder {
            launch: recording_launch(&stream.device, &chain, stream.has_audio),
            mime: encoding.map(|e| e.mime_type().to_string()),
            slot: Arc::clone(&stream.pipeline),
            surface: Arc::clone(&stream.surface),
            sink,
            bus_done: Arc::new(AtomicBool::new(false)),
            pipeline: None,
        }))
    }
}

impl CaptureBackend for GstBackend {
    fn name(&self) -> &str {
        "gstreamer"
    }
}

fn init_gstreamer() -> VideobankResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string())) {
        Ok(()) => Ok(()),
        Err(e) => Err(VideobankError::platform(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The camera pipeline currently running for a stream. The recorder swaps
/// its own pipeline in; stopping the stream stops whichever is there.
type PipelineSlot = Arc<Mutex<Option<gst::Pipeline>>>;

struct GstStream {
    id: String,
    device: String,
    has_audio: bool,
    active: AtomicBool,
    pipeline: PipelineSlot,
    surface: Arc<LiveSurface>,
}

impl MediaStream for GstStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn has_audio(&self) -> bool {
        self.has_audio
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn stop_tracks(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(pipeline) = lock(&self.pipeline).take() {
            if let Err(e) = pipeline.set_state(gst::State::Null) {
                tracing::warn!(stream = %self.id, error = ?e, "Failed to stop camera pipeline");
            }
        }
        self.surface.clear();
        tracing::debug!(stream = %self.id, "Camera tracks stopped");
    }

    fn preview(&self) -> Arc<dyn PreviewSurface> {
        self.surface.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for GstStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

/// Latest decoded camera frame.
#[derive(Default)]
struct LiveSurface {
    frame: Mutex<Option<RawFrame>>,
}

impl LiveSurface {
    fn store(&self, frame: RawFrame) {
        *lock(&self.frame) = Some(frame);
    }

    fn clear(&self) {
        *lock(&self.frame) = None;
    }
}

impl PreviewSurface for LiveSurface {
    fn native_size(&self) -> (u32, u32) {
        lock(&self.frame)
            .as_ref()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0))
    }

    fn current_frame(&self) -> Option<RawFrame> {
        lock(&self.frame).clone()
    }
}

struct GstRecorder {
    launch: String,
    mime: Option<String>,
    slot: PipelineSlot,
    surface: Arc<LiveSurface>,
    sink: RecorderSink,
    bus_done: Arc<AtomicBool>,
    pipeline: Option<gst::Pipeline>,
}

impl Recorder for GstRecorder {
    fn start(&mut self) -> VideobankResult<()> {
        if self.pipeline.is_some() {
            return Err(VideobankError::invalid_state("Recorder already started"));
        }

        let pipeline = launch_pipeline(&self.launch)?;
        attach_preview(&pipeline, &self.surface)?;
        attach_chunks(&pipeline, self.sink.clone())?;

        // Release the camera from the preview-only pipeline first.
        if let Some(preview) = lock(&self.slot).take() {
            if let Err(e) = preview.set_state(gst::State::Null) {
                tracing::warn!(error = ?e, "Failed to stop preview pipeline");
            }
        }

        set_playing(&pipeline, "recording")?;
        watch_bus(&pipeline, self.sink.clone(), Arc::clone(&self.bus_done));
        *lock(&self.slot) = Some(pipeline.clone());
        self.pipeline = Some(pipeline);

        tracing::info!(mime = ?self.mime, "GStreamer recorder started");
        Ok(())
    }

    fn stop(&mut self) -> VideobankResult<()> {
        let Some(pipeline) = self.pipeline.take() else {
            return Ok(());
        };
        // The chunk appsink reports Finalized once EOS has drained the muxer.
        if !pipeline.send_event(gst::event::Eos::new()) {
            return Err(VideobankError::platform(
                "Failed to send EOS; recording may be truncated",
            ));
        }
        Ok(())
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime.as_deref()
    }
}

impl Drop for GstRecorder {
    fn drop(&mut self) {
        self.bus_done.store(true, Ordering::SeqCst);
    }
}

/// Encoder, optional audio encoder, and muxer for one encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EncoderChain {
    video: &'static str,
    audio: &'static str,
    mux: &'static str,
}

impl EncoderChain {
    fn for_encoding(encoding: Option<&EncodingCandidate>) -> Option<Self> {
        let (container, video, audio) = match encoding {
            None => (Container::Webm, None, None),
            Some(e) => (e.container(), e.video_codec(), e.audio_codec()),
        };
        let video = video.map(|c| c.to_ascii_lowercase());
        let audio = audio.map(|c| c.to_ascii_lowercase());

        match container {
            Container::Mp4 => {
                let video_ok = video.as_deref().map_or(true, |v| v.starts_with("avc1") || v == "h264");
                let audio_ok = audio.as_deref().map_or(true, |a| a.starts_with("mp4a") || a == "aac");
                (video_ok && audio_ok).then_some(Self {
                    video: "x264enc tune=zerolatency speed-preset=veryfast key-int-max=60 ! h264parse",
                    audio: "avenc_aac",
                    mux: "mp4mux fragment-duration=1000 streamable=true",
                })
            }
            Container::Webm => {
                let video = match video.as_deref() {
                    None | Some("vp8") => "vp8enc deadline=1 keyframe-max-dist=60",
                    Some("vp9") | Some("vp09") => "vp9enc deadline=1 keyframe-max-dist=60",
                    Some(_) => return None,
                };
                let audio_ok = audio.as_deref().map_or(true, |a| a == "opus" || a == "vorbis");
                let audio = if audio.as_deref() == Some("vorbis") {
                    "vorbisenc"
                } else {
                    "opusenc"
                };
                audio_ok.then_some(Self {
                    video,
                    audio,
                    mux: "webmmux streamable=true",
                })
            }
        }
    }

    /// Element factory names this chain instantiates.
    fn required_elements(&self, with_audio: bool) -> Vec<&'static str> {
        let mut names = vec![first_element(self.video), first_element(self.mux), "v4l2src"];
        if self.video.contains("h264parse") {
            names.push("h264parse");
        }
        if with_audio {
            names.push(first_element(self.audio));
            names.push("pulsesrc");
        }
        names
    }
}

fn first_element(fragment: &'static str) -> &'static str {
    fragment.split_whitespace().next().unwrap_or(fragment)
}

fn preview_branch() -> &'static str {
    "videoconvert ! video/x-raw,format=RGB ! appsink name=preview max-buffers=1 drop=true sync=false"
}

fn preview_launch(device: &str) -> String {
    format!(
        "v4l2src device=\"{}\" do-timestamp=true ! {}",
        escape(device),
        preview_branch()
    )
}

fn recording_launch(device: &str, chain: &EncoderChain, with_audio: bool) -> String {
    let mut launch = format!(
        "v4l2src device=\"{device}\" do-timestamp=true ! videoconvert ! tee name=t \
         t. ! queue leaky=downstream max-size-buffers=2 ! {preview} \
         t. ! queue max-size-buffers=200 ! videoconvert ! videorate ! video/x-raw,framerate=30/1 ! {video} ! mux. \
         {mux} name=mux ! appsink name=chunks sync=false emit-signals=false",
        device = escape(device),
        preview = preview_branch(),
        video = chain.video,
        mux = chain.mux,
    );
    if with_audio {
        launch.push_str(&format!(
            " pulsesrc do-timestamp=true ! queue ! audioconvert ! audioresample ! {} ! mux.",
            chain.audio
        ));
    }
    launch
}

fn escape(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn launch_pipeline(launch: &str) -> VideobankResult<gst::Pipeline> {
    init_gstreamer()?;
    let element = gst::parse::launch(launch)
        .map_err(|e| VideobankError::recorder_init(format!("Failed to build pipeline: {e}")))?;
    element
        .dynamic_cast::<gst::Pipeline>()
        .map_err(|_| VideobankError::recorder_init("Launch string did not produce a pipeline"))
}

fn set_playing(pipeline: &gst::Pipeline, name: &str) -> VideobankResult<()> {
    pipeline.set_state(gst::State::Playing).map_err(|e| {
        VideobankError::recorder_init(format!("Failed to start {name} pipeline: {e:?}"))
    })?;

    match pipeline.state(gst::ClockTime::from_seconds(10)) {
        (Ok(_), gst::State::Playing, _) => Ok(()),
        (Ok(_), state, _) => {
            tracing::warn!(pipeline = name, ?state, "Pipeline did not reach Playing state within timeout");
            Ok(())
        }
        (Err(e), _, _) => {
            // Leave nothing holding the device.
            let _ = pipeline.set_state(gst::State::Null);
            Err(VideobankError::recorder_init(format!(
                "{name} pipeline failed to reach Playing state: {e:?}"
            )))
        }
    }
}

fn app_sink(pipeline: &gst::Pipeline, name: &str) -> VideobankResult<gst_app::AppSink> {
    pipeline
        .by_name(name)
        .and_then(|e| e.dynamic_cast::<gst_app::AppSink>().ok())
        .ok_or_else(|| VideobankError::recorder_init(format!("Pipeline has no appsink '{name}'")))
}

fn attach_preview(pipeline: &gst::Pipeline, surface: &Arc<LiveSurface>) -> VideobankResult<()> {
    let appsink = app_sink(pipeline, "preview")?;
    let surface = Arc::clone(surface);
    appsink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_sample(move |sink| {
                let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                if let Some(frame) = sample_to_frame(&sample) {
                    surface.store(frame);
                }
                Ok(gst::FlowSuccess::Ok)
            })
            .build(),
    );
    Ok(())
}

fn attach_chunks(pipeline: &gst::Pipeline, sink: RecorderSink) -> VideobankResult<()> {
    let appsink = app_sink(pipeline, "chunks")?;
    let eos_sink = sink.clone();
    appsink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_sample(move |appsink| {
                let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                sink.data(map.as_slice().to_vec());
                Ok(gst::FlowSuccess::Ok)
            })
            .eos(move |_| eos_sink.finalized())
            .build(),
    );
    Ok(())
}

/// Forward pipeline errors to the sink until the recorder goes away.
fn watch_bus(pipeline: &gst::Pipeline, sink: RecorderSink, done: Arc<AtomicBool>) {
    let Some(bus) = pipeline.bus() else {
        tracing::warn!("Recording pipeline has no bus; errors will not be reported");
        return;
    };
    std::thread::spawn(move || {
        while !done.load(Ordering::SeqCst) {
            let Some(msg) = bus.timed_pop_filtered(
                gst::ClockTime::from_mseconds(200),
                &[gst::MessageType::Error, gst::MessageType::Eos],
            ) else {
                continue;
            };
            match msg.view() {
                gst::MessageView::Error(e) => {
                    tracing::error!(error = %e.error(), debug = ?e.debug(), "Recording pipeline error");
                    sink.failed(e.error().to_string());
                    break;
                }
                gst::MessageView::Eos(_) => break,
                _ => {}
            }
        }
    });
}

fn sample_to_frame(sample: &gst::Sample) -> Option<RawFrame> {
    let caps = sample.caps()?;
    let structure = caps.structure(0)?;
    let width = u32::try_from(structure.get::<i32>("width").ok()?).ok()?;
    let height = u32::try_from(structure.get::<i32>("height").ok()?).ok()?;
    let buffer = sample.buffer()?;
    let map = buffer.map_readable().ok()?;
    pack_rgb_rows(map.as_slice(), width, height)
}

/// Strip per-row padding from an RGB buffer (GStreamer aligns rows to 4
/// bytes).
fn pack_rgb_rows(data: &[u8], width: u32, height: u32) -> Option<RawFrame> {
    if width == 0 || height == 0 {
        return None;
    }
    let row = width as usize * 3;
    let stride = data.len() / height as usize;
    if stride < row {
        return None;
    }
    let mut rgb = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        rgb.extend_from_slice(&data[y * stride..y * stride + row]);
    }
    Some(RawFrame::new(width, height, rgb))
}

/// Pick the V4L2 node that best matches the requested facing mode.
fn detect_camera_device(facing: FacingMode) -> Option<String> {
    let mut candidates: Vec<(String, u32)> = (0..16u32)
        .filter_map(|idx| {
            let path = format!("/dev/video{idx}");
            if !std::path::Path::new(&path).exists() {
                return None;
            }
            let name = std::fs::read_to_string(format!("/sys/class/video4linux/video{idx}/name"))
                .unwrap_or_default();
            Some((path, camera_priority(&name, facing)))
        })
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    let (device, priority) = candidates.into_iter().next()?;
    tracing::info!(%device, priority, %facing, "Selected camera device");
    Some(device)
}

/// Score a device name as a camera for `facing`. Zero means "not a camera".
fn camera_priority(name: &str, facing: FacingMode) -> u32 {
    const CAMERA: &[&str] = &["webcam", "camera", "cam", "facetime", "uvc", "logitech"];
    const NOT_CAMERA: &[&str] = &[
        "tuner", "tv", "dvb", "hdmi", "capture", "encoder", "decoder", "metadata",
    ];
    const FRONT: &[&str] = &["front", "user", "integrated", "facetime"];
    const REAR: &[&str] = &["rear", "back", "world", "environment"];

    let name = name.to_lowercase();
    if NOT_CAMERA.iter().any(|kw| name.contains(kw)) {
        return 0;
    }

    let mut score = if CAMERA.iter().any(|kw| name.contains(kw)) { 50 } else { 10 };
    let preferred = match facing {
        FacingMode::Front => FRONT,
        FacingMode::Rear => REAR,
    };
    if preferred.iter().any(|kw| name.contains(kw)) {
        score += 40;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(mime: &str) -> Option<EncoderChain> {
        EncoderChain::for_encoding(Some(&EncodingCandidate::parse(mime).unwrap()))
    }

    #[test]
    fn maps_candidates_to_encoder_chains() {
        let mp4 = chain("video/mp4; codecs=\"avc1.42E01E, mp4a.40.2\"").unwrap();
        assert!(mp4.video.starts_with("x264enc"));
        assert!(mp4.mux.starts_with("mp4mux"));

        let vp9 = chain("video/webm;codecs=vp9,opus").unwrap();
        assert!(vp9.video.starts_with("vp9enc"));
        assert_eq!(vp9.audio, "opusenc");

        assert!(chain("video/webm").unwrap().video.starts_with("vp8enc"));
        assert!(chain("video/mp4;codecs=hvc1").is_none());
        assert!(chain("video/webm;codecs=av1").is_none());
    }

    #[test]
    fn required_elements_include_audio_only_when_requested() {
        let c = chain("video/webm;codecs=vp8,opus").unwrap();
        assert!(!c.required_elements(false).contains(&"opusenc"));
        assert!(c.required_elements(true).contains(&"pulsesrc"));
    }

    #[test]
    fn camera_priority_prefers_requested_facing() {
        assert_eq!(camera_priority("HDMI Capture", FacingMode::Rear), 0);
        assert!(
            camera_priority("Integrated Camera", FacingMode::Front)
                > camera_priority("Integrated Camera", FacingMode::Rear)
        );
        assert!(
            camera_priority("Rear Camera", FacingMode::Rear)
                > camera_priority("USB Camera", FacingMode::Rear)
        );
    }

    #[test]
    fn strips_row_padding() {
        // 1x2 RGB with rows padded to 4 bytes.
        let data = [1, 2, 3, 0, 4, 5, 6, 0];
        let frame = pack_rgb_rows(&data, 1, 2).unwrap();
        assert_eq!(frame.rgb, vec![1, 2, 3, 4, 5, 6]);
        assert!(pack_rgb_rows(&data, 0, 2).is_none());
    }
}
