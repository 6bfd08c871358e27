use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Whole-second countdown for one question. Never goes below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    limit: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    pub fn restart(&mut self, limit: u32) {
        self.limit = limit;
        self.remaining = limit;
    }

    /// Counts one second down. True exactly when this tick reached zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn fraction_remaining(&self) -> f32 {
        if self.limit == 0 {
            0.0
        } else {
            self.remaining as f32 / self.limit as f32
        }
    }

    pub fn label(&self) -> String {
        format!("{}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

/// Tick sent by a [`Ticker`], tagged with the session generation it was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Sends one [`Tick`] per period until stopped or dropped. Hosts replace the ticker whenever
/// the question changes, so at most one is live per session.
#[derive(Debug)]
pub struct Ticker {
    generation: u64,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

const POLL_SLICE: Duration = Duration::from_millis(20);

impl Ticker {
    pub fn spawn<T: Send + 'static>(
        generation: u64,
        period: Duration,
        sender: Sender<T>,
        wrap: fn(Tick) -> T,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let mut next = Instant::now() + period;
            loop {
                while Instant::now() < next {
                    if flag.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(POLL_SLICE.min(next.saturating_duration_since(Instant::now())));
                }
                if flag.load(Ordering::Relaxed) || sender.send(wrap(Tick { generation })).is_err() {
                    return;
                }
                next += period;
            }
        });
        Self {
            generation,
            stop,
            handle: Some(handle),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
