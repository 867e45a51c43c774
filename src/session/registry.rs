//! Registry of every media stream and track a session has touched.
//!
//! Streams can reach the session by more than one path (the camera source,
//! the detector's own handle).  Each path is remembered here, deduplicated by
//! id, so that [`TrackRegistry::stop_all`] can release them exhaustively.

use std::sync::Arc;

use super::capabilities::{MediaStream, MediaTrack};

#[derive(Default)]
pub struct TrackRegistry {
    streams: Vec<Arc<dyn MediaStream>>,
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `stream` and its current tracks.  Returns `false` when the
    /// stream was already known.
    pub fn remember(&mut self, stream: &Arc<dyn MediaStream>) -> bool {
        let id = stream.id();
        let is_new = !self.streams.iter().any(|s| s.id() == id);
        if is_new {
            self.streams.push(Arc::clone(stream));
        }
        for track in stream.tracks() {
            self.remember_track(track);
        }
        is_new
    }

    fn remember_track(&mut self, track: Arc<dyn MediaTrack>) {
        let id = track.id();
        if !self.tracks.iter().any(|t| t.id() == id) {
            self.tracks.push(track);
        }
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.tracks.is_empty()
    }

    /// Stop every remembered track, including tracks added to a remembered
    /// stream after it was registered, then forget everything.  Failures are
    /// logged and do not stop the sweep.  Returns the number of tracks
    /// stopped.
    pub fn stop_all(&mut self) -> usize {
        let streams = std::mem::take(&mut self.streams);
        for stream in &streams {
            for track in stream.tracks() {
                self.remember_track(track);
            }
        }

        let tracks = std::mem::take(&mut self.tracks);
        for track in &tracks {
            if let Err(e) = track.stop() {
                log::warn!("session: {e}");
            }
        }
        if !tracks.is_empty() {
            log::debug!(
                "session: stopped {} track(s) across {} stream(s)",
                tracks.len(),
                streams.len()
            );
        }
        tracks.len()
    }
}

/// Stop every track of one stream that never made it into a registry.
pub fn stop_stream(stream: &Arc<dyn MediaStream>) {
    for track in stream.tracks() {
        if let Err(e) = track.stop() {
            log::warn!("session: {e}");
        }
    }
}
