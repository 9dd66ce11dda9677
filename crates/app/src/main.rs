use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use audio_canvas_core::{
    analysis::shaper_names, builder::transform_size_for, variant_names, AppConfig, CanvasClip,
    FrameSink, FrequencyAnalyzer, PlaybackClock, Recorder, VideoFrame,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod wav;

fn main() -> audio_canvas_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Variants => run_variants(),
        Commands::Analyze {
            audio,
            time,
            count,
            shaper,
        } => run_analyze(&audio, time, count, &shaper),
        Commands::Live {
            config,
            audio,
            seconds,
            fps,
        } => run_live(config.as_deref(), &audio, seconds, fps),
        Commands::Export {
            config,
            audio,
            out_dir,
        } => run_export(config.as_deref(), &audio, &out_dir),
    }
}

fn run_variants() -> audio_canvas_core::Result<()> {
    println!("variants: {}", variant_names().collect::<Vec<_>>().join(", "));
    println!("shapers:  {}", shaper_names().collect::<Vec<_>>().join(", "));
    Ok(())
}

fn run_analyze(audio: &Path, time: f64, count: usize, shaper: &str) -> audio_canvas_core::Result<()> {
    let buffer = wav::load_wav(audio)?;
    let mut analyzer = FrequencyAnalyzer::new(transform_size_for(count));
    let frame = analyzer.analyze(&buffer, time, shaper);

    tracing::info!(time, bins = frame.len(), "analysed one frame");
    println!("{}", serde_json::to_string(&frame)?);
    Ok(())
}

fn run_live(config: Option<&Path>, audio: &Path, seconds: Option<f64>, fps: u32) -> audio_canvas_core::Result<()> {
    let config = load_config(config)?;
    let buffer = wav::load_wav(audio)?;
    let mut factory = config.build_factory()?;

    let length = seconds.unwrap_or(f64::INFINITY).min(buffer.duration());
    let interval = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    tracing::info!(builders = factory.builders().len(), seconds = length, fps, "starting live mode");

    let clock = PlaybackClock::start();
    let mut frames = 0_u64;
    let mut busy = Duration::ZERO;
    let mut last_report = Instant::now();

    while clock.position_seconds() < length {
        let started = Instant::now();
        factory.draw_all(&buffer, clock.frame_clock());
        if factory.surface().render_requested() {
            factory.render();
        }
        frames += 1;
        busy += started.elapsed();

        if last_report.elapsed() >= Duration::from_secs(1) {
            tracing::info!(
                position = clock.position_seconds(),
                frames,
                avg_frame_ms = busy.as_secs_f64() * 1e3 / frames as f64,
                "live preview"
            );
            last_report = Instant::now();
        }

        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    tracing::info!(frames, "live mode finished");
    Ok(())
}

fn run_export(config: Option<&Path>, audio: &Path, out_dir: &Path) -> audio_canvas_core::Result<()> {
    let config = load_config(config)?;
    let buffer = Arc::new(wav::load_wav(audio)?);
    let live = config.build_factory()?;

    // The export renders on its own hidden surface; the live factory stays editable.
    let isolated = live.clone_onto(live.surface().offscreen_copy())?;
    let mut clip = CanvasClip::new(isolated, buffer);
    let meta = clip.meta();
    tracing::info!(?out_dir, duration = meta.duration, width = meta.width, height = meta.height, "starting export");

    std::fs::create_dir_all(out_dir)?;
    let mut sink = PngSequence::new(out_dir);
    let recorder = Recorder::new(config.export.clone());
    let result = recorder.record(&mut clip, &mut sink);
    clip.destroy();

    let summary = result?;
    tracing::info!(frames = summary.frames, last = ?summary.last_timestamp, "export finished");
    Ok(())
}

fn load_config(path: Option<&Path>) -> audio_canvas_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_path(path),
        None => Ok(AppConfig::default()),
    }
}

/// Writes each frame as `frame_00000.png`, `frame_00001.png`, ...
struct PngSequence {
    dir: PathBuf,
    written: u64,
}

impl PngSequence {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            written: 0,
        }
    }
}

impl FrameSink for PngSequence {
    fn push_frame(&mut self, frame: VideoFrame) -> audio_canvas_core::Result<()> {
        let path = self.dir.join(format!("frame_{:05}.png", self.written));
        frame.image.save(&path)?;
        tracing::trace!(?path, timestamp = frame.timestamp, "wrote frame");
        self.written += 1;
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive canvas visuals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available visual variants and shapers.
    Variants,
    /// Print one magnitude frame of an audio file as JSON.
    Analyze {
        /// WAV file to analyse.
        audio: PathBuf,
        /// Position in seconds.
        #[arg(short, long, default_value_t = 0.0)]
        time: f64,
        /// Element count; the transform size is twice this, rounded up to a power of two.
        #[arg(short, long, default_value_t = 64)]
        count: usize,
        #[arg(short, long, default_value = "Slope")]
        shaper: String,
    },
    /// Drive the configured visuals in real time.
    Live {
        /// Optional configuration file to load on startup.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// WAV file to play.
        audio: PathBuf,
        /// Stop after this many seconds instead of at the end of the audio.
        #[arg(short, long)]
        seconds: Option<f64>,
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },
    /// Render the configured visuals to a PNG frame sequence.
    Export {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// WAV file the frames are analysed from.
        audio: PathBuf,
        /// Directory the frames are written to.
        out_dir: PathBuf,
    },
}
