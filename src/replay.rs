//! File-backed camera and hand detector.
//!
//! A recording is JSON Lines, one [`LandmarkFrame`] per line:
//!
//! ```text
//! {"hands":[{"landmarks":[{"x":0.41,"y":0.62,"z":0.0}, ...],"handedness":"Right"}],
//!  "frame_width":640,"frame_height":480,"timestamp_ms":0}
//! {"hands":[],"frame_width":640,"frame_height":480,"timestamp_ms":33}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.  Frames are delivered
//! with the pacing implied by their `timestamp_ms` deltas, so a recorded
//! session exercises the auto-commit ticker exactly as it did live.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::config::PipelineKind;
use crate::landmarks::LandmarkFrame;
use crate::session::{
    CameraConstraints, CameraSource, CaptureError, DetectorFactory, DetectorOptions,
    FrameObserver, HandDetector, MediaStream, MediaTrack,
};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a JSON Lines recording.
pub fn parse_frames(text: &str) -> Result<Vec<LandmarkFrame>, ReplayError> {
    let mut frames = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let frame = serde_json::from_str(line).map_err(|source| ReplayError::Parse {
            line: i + 1,
            source,
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

pub fn read_frames(path: &Path) -> Result<Vec<LandmarkFrame>, ReplayError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_frames(&text)
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

struct ReplayTrack {
    id: String,
    live: AtomicBool,
}

impl MediaTrack for ReplayTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn stop(&self) -> Result<(), CaptureError> {
        self.live.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

struct ReplayStream {
    id: String,
    track: Arc<ReplayTrack>,
}

impl MediaStream for ReplayStream {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![Arc::clone(&self.track) as Arc<dyn MediaTrack>]
    }
}

/// Camera that hands out a virtual stream with a single video track.
#[derive(Debug, Default)]
pub struct ReplayCamera;

#[async_trait]
impl CameraSource for ReplayCamera {
    async fn acquire(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Arc<dyn MediaStream>, CaptureError> {
        log::debug!(
            "replay: virtual camera {}x{} {:?}",
            constraints.ideal_width,
            constraints.ideal_height,
            constraints.facing
        );
        Ok(Arc::new(ReplayStream {
            id: "replay".into(),
            track: Arc::new(ReplayTrack {
                id: "replay-video".into(),
                live: AtomicBool::new(true),
            }),
        }))
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

pub struct ReplayDetectorFactory {
    frames: Arc<Vec<LandmarkFrame>>,
    finished: Arc<Notify>,
}

impl ReplayDetectorFactory {
    pub fn new(frames: Vec<LandmarkFrame>) -> Self {
        Self {
            frames: Arc::new(frames),
            finished: Arc::new(Notify::new()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        Ok(Self::new(read_frames(path)?))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Signalled once the recording has been fully delivered (or the stream
    /// it was bound to went dead).
    pub fn finished(&self) -> Arc<Notify> {
        Arc::clone(&self.finished)
    }
}

impl DetectorFactory for ReplayDetectorFactory {
    fn create(&self, pipeline: PipelineKind) -> Result<Box<dyn HandDetector>, CaptureError> {
        log::debug!(
            "replay: detector for {} pipeline ({} frames)",
            pipeline.label(),
            self.frames.len()
        );
        Ok(Box::new(ReplayDetector {
            frames: Arc::clone(&self.frames),
            finished: Arc::clone(&self.finished),
            stream: None,
            task: None,
        }))
    }
}

struct ReplayDetector {
    frames: Arc<Vec<LandmarkFrame>>,
    finished: Arc<Notify>,
    stream: Option<Arc<dyn MediaStream>>,
    task: Option<JoinHandle<()>>,
}

impl HandDetector for ReplayDetector {
    fn start(
        &mut self,
        stream: Arc<dyn MediaStream>,
        options: &DetectorOptions,
        observer: Arc<dyn FrameObserver>,
    ) -> Result<(), CaptureError> {
        let runtime = Handle::try_current()
            .map_err(|e| CaptureError::Detector(format!("no async runtime: {e}")))?;
        log::debug!("replay: starting with {options:?}");

        let frames = Arc::clone(&self.frames);
        let finished = Arc::clone(&self.finished);
        let source = Arc::clone(&stream);
        self.stream = Some(stream);

        self.task = Some(runtime.spawn(async move {
            let origin = Instant::now();
            let first_ts = frames.first().map(|f| f.timestamp_ms).unwrap_or(0);
            for frame in frames.iter() {
                let offset = frame.timestamp_ms.saturating_sub(first_ts);
                sleep_until(origin + Duration::from_millis(offset)).await;
                if !source.tracks().iter().any(|t| t.is_live()) {
                    log::debug!("replay: stream stopped, ending early");
                    break;
                }
                observer.on_frame(frame.clone());
            }
            finished.notify_one();
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn streams(&self) -> Vec<Arc<dyn MediaStream>> {
        self.stream.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, CommitMode};
    use crate::session::fakes::{hand_frame, FakeModels, FixedModel};
    use crate::session::{Capabilities, SessionManager};

    fn to_jsonl(frames: &[LandmarkFrame]) -> String {
        frames
            .iter()
            .map(|f| serde_json::to_string(f).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let text = format!(
            "# recorded 2026-03-01\n\n{}\n   \n{}\n",
            serde_json::to_string(&hand_frame(0)).unwrap(),
            serde_json::to_string(&LandmarkFrame::empty(640, 480, 33)).unwrap()
        );
        let frames = parse_frames(&text).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].hand_count(), 1);
        assert_eq!(frames[1].timestamp_ms, 33);
    }

    #[test]
    fn parse_error_reports_line() {
        let text = format!("{}\nnot json\n", serde_json::to_string(&hand_frame(0)).unwrap());
        match parse_frames(&text) {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn read_frames_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        std::fs::write(&path, to_jsonl(&[hand_frame(0), hand_frame(33)])).unwrap();
        assert_eq!(read_frames(&path).unwrap().len(), 2);
        assert!(matches!(
            read_frames(&dir.path().join("missing.jsonl")),
            Err(ReplayError::Io { .. })
        ));
    }

    fn manager(config: AppConfig, factory: &Arc<ReplayDetectorFactory>, model: Arc<FixedModel>) -> SessionManager {
        let caps = Capabilities::new()
            .with_camera(Arc::new(ReplayCamera))
            .with_detectors(factory.clone())
            .with_models(FakeModels::new(model, &["A", "B", "space"]));
        SessionManager::new(config, caps)
    }

    #[tokio::test(start_paused = true)]
    async fn replays_commands_in_free_form() {
        let frames: Vec<_> = (0..10).map(|i| hand_frame(i * 33)).collect();
        let factory = Arc::new(ReplayDetectorFactory::new(frames));
        let mgr = manager(
            AppConfig::default(),
            &factory,
            FixedModel::new(vec![0.02, 0.02, 0.96]),
        );
        let done = factory.finished();

        mgr.start(PipelineKind::Spelling).await.unwrap();
        done.notified().await;
        assert_eq!(mgr.text(), " ");
        mgr.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn replay_pacing_drives_auto_commit() {
        // One frame every 100 ms for 3.5 s.
        let frames: Vec<_> = (0..35).map(|i| hand_frame(i * 100)).collect();
        let factory = Arc::new(ReplayDetectorFactory::new(frames));
        let mut config = AppConfig::default();
        config.default_mode = CommitMode::AutoCommit;
        let mgr = manager(config, &factory, FixedModel::new(vec![0.05, 0.9, 0.05]));
        let done = factory.finished();

        mgr.start(PipelineKind::Spelling).await.unwrap();
        done.notified().await;
        assert_eq!(mgr.text(), "B");
        mgr.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_replay_early() {
        let frames: Vec<_> = (0..100).map(|i| hand_frame(i * 100)).collect();
        let factory = Arc::new(ReplayDetectorFactory::new(frames));
        let mgr = manager(
            AppConfig::default(),
            &factory,
            FixedModel::new(vec![0.9, 0.05, 0.05]),
        );
        mgr.start(PipelineKind::Spelling).await.unwrap();
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(mgr.hands(), 1);
        mgr.stop();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(mgr.hands(), 0);
    }
}
