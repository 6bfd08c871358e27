use std::time::{Duration, Instant};

/// Fixed-interval cine state over a stack of `total` images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    interval: Duration,
    playing: bool,
    last_advance: Option<Instant>,
}

impl Playback {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            playing: false,
            last_advance: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn start(&mut self, now: Instant) {
        self.playing = true;
        self.last_advance = Some(now);
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.last_advance = None;
    }

    /// True when a full interval has passed since the last advance. Consumes the interval.
    pub fn due(&mut self, now: Instant) -> bool {
        if !self.playing {
            return false;
        }
        match self.last_advance {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_advance = Some(now);
                true
            }
        }
    }

    /// Index to show after one playback step, or `None` when the stack is exhausted.
    pub fn next_index(current: usize, total: usize) -> Option<usize> {
        let next = current.saturating_add(1);
        (next < total).then_some(next)
    }
}
