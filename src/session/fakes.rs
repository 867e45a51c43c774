//! Test doubles for the session capabilities.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::classifier::{
    AssetError, ClassifierError, ClassifierModel, InputTensor, LabelSet, PipelineAssets,
};
use crate::config::PipelineKind;
use crate::landmarks::{Hand, Handedness, LandmarkFrame, Point3, LANDMARK_COUNT};

use super::capabilities::{
    CameraConstraints, CameraSource, CaptureError, DetectorFactory, DetectorOptions,
    FrameObserver, HandDetector, MediaStream, MediaTrack, ModelProvider, Overlay,
};
use super::state::Chip;

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

pub struct FakeTrack {
    id: String,
    live: AtomicBool,
    fail: bool,
}

impl FakeTrack {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            live: AtomicBool::new(true),
            fail: false,
        })
    }

    /// A track whose `stop` always errors and stays live.
    pub fn failing(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            live: AtomicBool::new(true),
            fail: true,
        })
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn stop(&self) -> Result<(), CaptureError> {
        if self.fail {
            return Err(CaptureError::TrackStop {
                id: self.id.clone(),
                reason: "device busy".into(),
            });
        }
        self.live.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

pub struct FakeStream {
    id: String,
    tracks: Mutex<Vec<Arc<FakeTrack>>>,
}

impl FakeStream {
    pub fn with_tracks(id: &str, track_ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            tracks: Mutex::new(track_ids.iter().map(|t| FakeTrack::new(t)).collect()),
        })
    }

    pub fn add_track(&self, track: Arc<FakeTrack>) {
        self.tracks.lock().unwrap().push(track);
    }

    pub fn tracks_by_id(&self, id: &str) -> Option<Arc<FakeTrack>> {
        self.tracks.lock().unwrap().iter().find(|t| t.id == id).cloned()
    }

    pub fn all_stopped(&self) -> bool {
        self.tracks.lock().unwrap().iter().all(|t| !t.is_live())
    }
}

impl MediaStream for FakeStream {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn MediaTrack>)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCamera {
    fail: Option<CaptureError>,
    gate: Option<Arc<Notify>>,
    acquired: Mutex<Vec<Arc<FakeStream>>>,
    pub constraints: Mutex<Option<CameraConstraints>>,
}

impl FakeCamera {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(err: CaptureError) -> Arc<Self> {
        Arc::new(Self {
            fail: Some(err),
            ..Self::default()
        })
    }

    /// Acquisition blocks until the returned `Notify` is signalled.
    pub fn gated() -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let cam = Arc::new(Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        });
        (cam, gate)
    }

    pub fn acquisitions(&self) -> usize {
        self.acquired.lock().unwrap().len()
    }

    pub fn streams(&self) -> Vec<Arc<FakeStream>> {
        self.acquired.lock().unwrap().clone()
    }

    pub fn any_live(&self) -> bool {
        self.streams().iter().any(|s| !s.all_stopped())
    }
}

#[async_trait]
impl CameraSource for FakeCamera {
    async fn acquire(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Arc<dyn MediaStream>, CaptureError> {
        *self.constraints.lock().unwrap() = Some(*constraints);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        let n = self.acquisitions();
        let stream = FakeStream::with_tracks(&format!("cam-{n}"), &[&format!("cam-{n}-video")]);
        self.acquired.lock().unwrap().push(Arc::clone(&stream));
        Ok(stream)
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

type ObserverSlot = Arc<Mutex<Option<Arc<dyn FrameObserver>>>>;
type StartHook = Arc<Mutex<Option<Box<dyn Fn() + Send + Sync>>>>;

struct FakeDetector {
    observer: ObserverSlot,
    stream: Option<Arc<dyn MediaStream>>,
    extra: Option<Arc<FakeStream>>,
    fail_start: bool,
    stopped: Arc<AtomicUsize>,
    mirror: Arc<AtomicBool>,
    options: Arc<Mutex<Option<DetectorOptions>>>,
    on_start: StartHook,
}

impl HandDetector for FakeDetector {
    fn start(
        &mut self,
        stream: Arc<dyn MediaStream>,
        options: &DetectorOptions,
        observer: Arc<dyn FrameObserver>,
    ) -> Result<(), CaptureError> {
        *self.options.lock().unwrap() = Some(*options);
        self.stream = Some(stream);
        if self.fail_start {
            return Err(CaptureError::Detector("model graph failed to load".into()));
        }
        *self.observer.lock().unwrap() = Some(observer);
        if let Some(hook) = self.on_start.lock().unwrap().as_ref() {
            hook();
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn streams(&self) -> Vec<Arc<dyn MediaStream>> {
        let mut out: Vec<Arc<dyn MediaStream>> = self.stream.iter().cloned().collect();
        if let Some(extra) = &self.extra {
            out.push(Arc::clone(extra) as Arc<dyn MediaStream>);
        }
        out
    }

    fn set_mirror(&mut self, mirror: bool) {
        self.mirror.store(mirror, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeDetectorFactory {
    observer: ObserverSlot,
    pub created: AtomicUsize,
    pub stopped: Arc<AtomicUsize>,
    pub mirror: Arc<AtomicBool>,
    pub options: Arc<Mutex<Option<DetectorOptions>>>,
    pub pipelines: Mutex<Vec<PipelineKind>>,
    extra: Option<Arc<FakeStream>>,
    fail_start: bool,
    on_start: StartHook,
}

impl FakeDetectorFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Detectors that also hold a stream they opened themselves.
    pub fn with_extra_stream(extra: Arc<FakeStream>) -> Arc<Self> {
        Arc::new(Self {
            extra: Some(extra),
            ..Self::default()
        })
    }

    pub fn failing_start() -> Arc<Self> {
        Arc::new(Self {
            fail_start: true,
            ..Self::default()
        })
    }

    /// Run `hook` inside every successful detector start, while the session
    /// still holds its resources lock.
    pub fn set_on_start(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_start.lock().unwrap() = Some(Box::new(hook));
    }

    /// Deliver a frame to the most recently started detector's observer.
    pub fn emit(&self, frame: LandmarkFrame) {
        let observer = self.observer.lock().unwrap().clone();
        if let Some(observer) = observer {
            observer.on_frame(frame);
        }
    }
}

impl DetectorFactory for FakeDetectorFactory {
    fn create(&self, pipeline: PipelineKind) -> Result<Box<dyn HandDetector>, CaptureError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.pipelines.lock().unwrap().push(pipeline);
        Ok(Box::new(FakeDetector {
            observer: Arc::clone(&self.observer),
            stream: None,
            extra: self.extra.clone(),
            fail_start: self.fail_start,
            stopped: Arc::clone(&self.stopped),
            mirror: Arc::clone(&self.mirror),
            options: Arc::clone(&self.options),
            on_start: Arc::clone(&self.on_start),
        }))
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Returns the same output for every input until told otherwise.
pub struct FixedModel {
    out: Mutex<Vec<f32>>,
    fail_next: AtomicBool,
}

impl FixedModel {
    pub fn new(out: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            out: Mutex::new(out),
            fail_next: AtomicBool::new(false),
        })
    }

    pub fn set(&self, out: Vec<f32>) {
        *self.out.lock().unwrap() = out;
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl ClassifierModel for FixedModel {
    fn predict(&self, _input: &InputTensor) -> Result<Vec<f32>, ClassifierError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ClassifierError::Inference("scripted failure".into()));
        }
        Ok(self.out.lock().unwrap().clone())
    }
}

pub fn model_assets(model: Arc<FixedModel>, labels: &[&str]) -> PipelineAssets {
    PipelineAssets::new(model, LabelSet::new(labels.iter().copied()), None)
}

pub struct FakeModels {
    model: Arc<FixedModel>,
    labels: Vec<&'static str>,
    fail: bool,
}

impl FakeModels {
    pub fn new(model: Arc<FixedModel>, labels: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            model,
            labels: labels.to_vec(),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            model: FixedModel::new(Vec::new()),
            labels: Vec::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl ModelProvider for FakeModels {
    async fn load(&self, _pipeline: PipelineKind) -> Result<PipelineAssets, AssetError> {
        if self.fail {
            return Err(AssetError::Model("weights missing".into()));
        }
        Ok(model_assets(Arc::clone(&self.model), &self.labels))
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeOverlay {
    pub clears: AtomicUsize,
    pub draws: AtomicUsize,
    pub tags: Mutex<Vec<String>>,
    pub mirror: AtomicBool,
}

impl Overlay for FakeOverlay {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn draw_hand(&self, _hand: &Hand, tag: Option<&Chip>) {
        self.draws.fetch_add(1, Ordering::SeqCst);
        if let Some(chip) = tag {
            self.tags.lock().unwrap().push(chip.label.clone());
        }
    }

    fn set_mirror(&self, mirror: bool) {
        self.mirror.store(mirror, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// A right hand with spread-out landmarks in a 640×480 frame.
pub fn hand_frame(timestamp_ms: u64) -> LandmarkFrame {
    let mut points = [Point3::default(); LANDMARK_COUNT];
    for (i, p) in points.iter_mut().enumerate() {
        let f = i as f32;
        *p = Point3::new(0.4 + 0.01 * f, 0.6 - 0.012 * f, -0.001 * f);
    }
    LandmarkFrame::single(Hand::new(points, Handedness::Right), 640, 480, timestamp_ms)
}
