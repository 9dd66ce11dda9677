//! Core library for the audio canvas.
//!
//! Audio-reactive visuals ("builders") are laid out on a drawing surface and
//! redrawn from the spectrum of a decoded audio buffer. The same factory of
//! builders drives both the live preview and deterministic frame-by-frame
//! exports through [`CanvasClip`]. Each module owns one subsystem (analysis,
//! builders, the surface model, rendering, export, etc.).

pub mod analysis;
pub mod audio;
pub mod builder;
pub mod color;
pub mod config;
pub mod error;
pub mod factory;
pub mod record;
pub mod render;
pub mod scene;
pub mod timeline;

pub use analysis::{FrequencyAnalyzer, Smoothing};
pub use audio::AudioBuffer;
pub use builder::{Builder, BuilderOptions, Variant};
pub use color::{Color, ColorSpec, Gradient};
pub use config::{AppConfig, SurfaceConfig, VisualConfig};
pub use error::{AudioCanvasError, Result};
pub use factory::{variant_names, BuilderFactory};
pub use record::{CanvasClip, ClipMeta, ClipState, FrameSink, Recorder, RecordingSettings, VideoFrame};
pub use render::Rasterizer;
pub use scene::{Group, SceneObject, Surface, Transform};
pub use timeline::{FrameClock, PlaybackClock};
