use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use protocol::config::ProgressConfig;

/// Cosmetic progress played after the analysis request settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressAnimation {
    step: u32,
    max: u32,
    interval: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Frame(u32),
    Finished,
    Cancelled,
}

impl ProgressAnimation {
    pub fn new(step: u32, max: u32, interval: Duration) -> Self {
        Self {
            step: step.max(1),
            max,
            interval,
        }
    }

    pub fn from_config(config: &ProgressConfig) -> Self {
        Self::new(
            config.step,
            config.max,
            Duration::from_millis(config.interval_ms),
        )
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn frames(&self) -> Frames {
        Frames {
            next: self.step.min(self.max),
            step: self.step,
            max: self.max,
            done: self.max == 0,
        }
    }

    /// Starts a fresh run. Every call restarts from the first frame.
    pub fn start(&self) -> ProgressTicker {
        let period = self.interval.max(Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ProgressTicker {
            frames: self.frames(),
            interval,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Frames {
    next: u32,
    step: u32,
    max: u32,
    done: bool,
}

impl Iterator for Frames {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.done {
            return None;
        }
        let current = self.next;
        if current >= self.max {
            self.done = true;
        } else {
            self.next = current.saturating_add(self.step).min(self.max);
        }
        Some(current)
    }
}

pub struct ProgressTicker {
    frames: Frames,
    interval: Interval,
}

impl ProgressTicker {
    pub async fn tick(&mut self, token: &CancellationToken) -> Tick {
        let Some(progress) = self.frames.next() else {
            return Tick::Finished;
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Tick::Cancelled,
            _ = self.interval.tick() => Tick::Frame(progress),
        }
    }
}
