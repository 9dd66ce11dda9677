use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::{factory::BuilderFactory, AudioBuffer, AudioCanvasError, FrameClock, Result};

const MICROS_PER_SECOND: u64 = 1_000_000;

/// Configuration options for the export driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub fps: u32,
    /// Stop after this many frames even if the clip has more.
    pub max_frames: Option<u64>,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            max_frames: None,
        }
    }
}

/// Fixed properties of a clip, known at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipMeta {
    /// Microseconds.
    pub duration: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Microseconds since the start of the clip.
    pub timestamp: u64,
    pub image: RgbaImage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClipState {
    Success(VideoFrame),
    /// The requested timestamp lies past the end; stop asking.
    Done,
}

/// A seekable frame source over one isolated factory and one audio buffer.
///
/// Frames depend only on the timestamps passed to [`CanvasClip::tick`],
/// never on wall-clock time, so an export can run at any speed.
#[derive(Debug)]
pub struct CanvasClip {
    meta: ClipMeta,
    factory: BuilderFactory,
    buffer: Arc<AudioBuffer>,
    destroyed: bool,
}

impl CanvasClip {
    /// `factory` should sit on a hidden surface cloned from the live one.
    pub fn new(factory: BuilderFactory, buffer: Arc<AudioBuffer>) -> Self {
        let meta = ClipMeta {
            duration: buffer.duration_micros(),
            width: factory.surface().width(),
            height: factory.surface().height(),
        };

        Self {
            meta,
            factory,
            buffer,
            destroyed: false,
        }
    }

    pub fn meta(&self) -> ClipMeta {
        self.meta
    }

    pub fn factory(&self) -> &BuilderFactory {
        &self.factory
    }

    /// Renders the frame at `timestamp` microseconds.
    pub fn tick(&mut self, timestamp: u64) -> ClipState {
        if self.destroyed || timestamp > self.meta.duration {
            return ClipState::Done;
        }

        self.factory
            .draw_all(&self.buffer, FrameClock::from_timestamp_micros(timestamp));
        ClipState::Success(VideoFrame {
            timestamp,
            image: self.factory.render(),
        })
    }

    /// Tears down the isolated surface. Later ticks report `Done`.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.factory.surface_mut().clear();
        self.destroyed = true;
        tracing::debug!(duration = self.meta.duration, "destroyed canvas clip");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// A clip stands only for itself; the buffer is already shared.
    pub fn duplicate(&mut self) -> &mut Self {
        self
    }
}

/// Consumer of rendered frames, e.g. an encoder or an image sequence writer.
pub trait FrameSink {
    fn push_frame(&mut self, frame: VideoFrame) -> Result<()>;
}

impl FrameSink for Vec<VideoFrame> {
    fn push_frame(&mut self, frame: VideoFrame) -> Result<()> {
        self.push(frame);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordingSummary {
    pub frames: u64,
    pub last_timestamp: Option<u64>,
    pub cancelled: bool,
}

/// Lets another part of the program stop a recording.
///
/// A stop requested before [`Recorder::record`] starts still counts: the
/// request stays in place and no frame is produced.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Drives a [`CanvasClip`] at a fixed frame rate and pipes every frame into
/// a [`FrameSink`].
#[derive(Debug, Default)]
pub struct Recorder {
    settings: RecordingSettings,
    recording: AtomicBool,
    stop_requested: Arc<AtomicBool>,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop_requested))
    }

    /// Timestamp of frame `index`, in microseconds.
    pub fn timestamp_of(&self, index: u64) -> u64 {
        index * MICROS_PER_SECOND / u64::from(self.settings.fps.max(1))
    }

    /// Ticks `clip` until it reports `Done`, the frame limit is hit or a
    /// stop is requested. Frames already handed to `sink` stay valid
    /// whatever the outcome.
    pub fn record(&self, clip: &mut CanvasClip, sink: &mut dyn FrameSink) -> Result<RecordingSummary> {
        if self.settings.fps == 0 {
            return Err(AudioCanvasError::InvalidInput("frame rate must be positive"));
        }

        self.recording.store(true, Ordering::SeqCst);
        tracing::debug!(fps = self.settings.fps, duration = clip.meta().duration, "recording started");
        let result = self.record_frames(clip, sink);
        self.recording.store(false, Ordering::SeqCst);

        let mut summary = result?;
        summary.cancelled = self.is_stopped();
        tracing::debug!(frames = summary.frames, cancelled = summary.cancelled, "recording finished");
        Ok(summary)
    }

    fn record_frames(&self, clip: &mut CanvasClip, sink: &mut dyn FrameSink) -> Result<RecordingSummary> {
        let mut summary = RecordingSummary::default();

        for index in 0.. {
            if self.is_stopped() {
                break;
            }
            if self.settings.max_frames.is_some_and(|max| index >= max) {
                break;
            }

            let timestamp = self.timestamp_of(index);
            match clip.tick(timestamp) {
                ClipState::Success(frame) => {
                    sink.push_frame(frame)?;
                    summary.frames += 1;
                    summary.last_timestamp = Some(timestamp);
                }
                ClipState::Done => break,
            }
        }

        Ok(summary)
    }
}
