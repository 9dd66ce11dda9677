use std::time::{Duration, Instant};

/// The two clocks a draw call sees.
///
/// `audio_seconds` selects the analysed window; `wall_millis` feeds the
/// purely decorative motion some variants layer on top. Live playback
/// fills the latter from a real clock, exports from the frame timestamp, so
/// an export renders the same frames every time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameClock {
    pub audio_seconds: f64,
    pub wall_millis: f64,
}

impl FrameClock {
    pub fn new(audio_seconds: f64, wall_millis: f64) -> Self {
        Self {
            audio_seconds,
            wall_millis,
        }
    }

    /// Clock for an export frame at `timestamp_micros`; both time sources
    /// derive from the frame timestamp.
    pub fn from_timestamp_micros(timestamp_micros: u64) -> Self {
        Self {
            audio_seconds: timestamp_micros as f64 / 1e6,
            wall_millis: timestamp_micros as f64 / 1e3,
        }
    }
}

/// Playback position for the live regime.
///
/// The audio position is the source of truth; the host either lets the
/// clock run from [`PlaybackClock::start`] or pins it with
/// [`PlaybackClock::seek`] whenever its audio device reports a position.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    origin: Instant,
    anchor: Instant,
    anchor_seconds: f64,
    paused: bool,
}

impl PlaybackClock {
    /// Starts a running clock at position zero.
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            origin: now,
            anchor: now,
            anchor_seconds: 0.0,
            paused: false,
        }
    }

    /// Wall time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Current playback position in seconds.
    pub fn position_seconds(&self) -> f64 {
        if self.paused {
            self.anchor_seconds
        } else {
            self.anchor_seconds + self.anchor.elapsed().as_secs_f64()
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        self.anchor = Instant::now();
        self.anchor_seconds = seconds.max(0.0);
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.anchor_seconds = self.position_seconds();
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.anchor = Instant::now();
            self.paused = false;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Clock for a live frame drawn right now.
    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(
            self.position_seconds(),
            self.elapsed().as_secs_f64() * 1e3,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_clock_derives_both_sources_from_timestamp() {
        let clock = FrameClock::from_timestamp_micros(1_500_000);
        assert_eq!(clock.audio_seconds, 1.5);
        assert_eq!(clock.wall_millis, 1_500.0);
    }

    #[test]
    fn paused_clock_holds_position() {
        let mut clock = PlaybackClock::start();
        clock.seek(2.0);
        clock.pause();
        let held = clock.position_seconds();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.position_seconds(), held);
        assert!(held >= 2.0);

        clock.resume();
        assert!(clock.position_seconds() >= held);
        assert!(clock.elapsed() >= Duration::from_millis(5));
    }
}
