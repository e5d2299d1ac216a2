//! Playback clock as a pure state machine.
//!
//! [`Scheduler::handle`] applies an [`Event`] and returns the [`Effect`]s the
//! caller must perform (arming the next tick, reacting to start/stop). The
//! scheduler never touches a clock itself, so every transition can be driven
//! deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::container::PixelStream;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a scheduler instance. Events carry the id they target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchedulerId(u64);

impl SchedulerId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Input to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Start { id: SchedulerId },
    Stop { id: SchedulerId },
    Toggle { id: SchedulerId },
    /// Jump to an absolute position in seconds. Negative values clamp to 0.
    Set { id: SchedulerId, elapsed_secs: f64 },
    /// One interval has passed. `tag` is the run the tick was armed for.
    Tick { id: SchedulerId, tag: u64 },
}

impl Event {
    pub fn id(&self) -> SchedulerId {
        match *self {
            Event::Start { id }
            | Event::Stop { id }
            | Event::Toggle { id }
            | Event::Set { id, .. }
            | Event::Tick { id, .. } => id,
        }
    }
}

/// Work requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Deliver `Event::Tick { id, tag }` after `delay`.
    ScheduleTick {
        id: SchedulerId,
        tag: u64,
        delay: Duration,
    },
    /// The scheduler started (`true`) or stopped (`false`).
    RunningChanged(bool),
}

/// Playback clock with a fixed tick interval and an optional maximum.
///
/// A `max` of zero means unbounded. With a maximum, `elapsed` never exceeds
/// it and reaching past it stops the clock.
///
/// Every start and stop bumps the run tag, so at most one tick chain is
/// live: ticks armed for an earlier run are dropped even if the clock has
/// been restarted by the time they arrive.
#[derive(Debug, Clone)]
pub struct Scheduler {
    id: SchedulerId,
    tag: u64,
    elapsed: Duration,
    running: bool,
    interval: Duration,
    max: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration, max: Duration) -> Self {
        Self {
            id: SchedulerId::next(),
            tag: 0,
            elapsed: Duration::ZERO,
            running: false,
            interval,
            max,
        }
    }

    /// Scheduler ticking once per frame and bounded by the stream duration.
    pub fn for_stream(stream: &PixelStream) -> Self {
        Self::new(stream.interval(), stream.duration())
    }

    pub fn id(&self) -> SchedulerId {
        self.id
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    fn bounded(&self) -> bool {
        !self.max.is_zero()
    }

    /// Stopped at the end of a bounded run.
    pub fn is_finished(&self) -> bool {
        self.bounded() && !self.running && self.elapsed == self.max
    }

    /// Position as a fraction of `max` (0.0 when unbounded).
    pub fn progress(&self) -> f64 {
        if !self.bounded() {
            return 0.0;
        }
        self.elapsed.as_secs_f64() / self.max.as_secs_f64()
    }

    pub fn start(&self) -> Event {
        Event::Start { id: self.id }
    }

    pub fn stop(&self) -> Event {
        Event::Stop { id: self.id }
    }

    pub fn toggle(&self) -> Event {
        Event::Toggle { id: self.id }
    }

    /// Tick for the current run, as delivered by its armed timer.
    pub fn tick(&self) -> Event {
        Event::Tick {
            id: self.id,
            tag: self.tag,
        }
    }

    pub fn set(&self, elapsed_secs: f64) -> Event {
        Event::Set {
            id: self.id,
            elapsed_secs,
        }
    }

    pub fn reset(&self) -> Event {
        self.set(0.0)
    }

    /// Seek relative to the current position.
    pub fn seek(&self, delta_secs: f64) -> Event {
        self.set(self.elapsed.as_secs_f64() + delta_secs)
    }

    /// Apply `event`, returning the effects the caller must perform.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        if event.id() != self.id {
            return Vec::new();
        }

        match event {
            Event::Start { .. } => self.apply_start(),
            Event::Stop { .. } => self.apply_stop(),
            Event::Toggle { .. } if self.running => self.apply_stop(),
            Event::Toggle { .. } => self.apply_start(),
            Event::Set { elapsed_secs, .. } => self.apply_set(elapsed_secs),
            Event::Tick { tag, .. } => self.apply_tick(tag),
        }
    }

    fn apply_start(&mut self) -> Vec<Effect> {
        if self.running {
            return Vec::new();
        }
        // Replay from the beginning instead of sitting at the end
        if self.bounded() && self.elapsed == self.max {
            self.elapsed = Duration::ZERO;
        }
        self.running = true;
        self.tag = self.tag.wrapping_add(1);
        vec![Effect::RunningChanged(true), self.schedule_tick()]
    }

    fn apply_stop(&mut self) -> Vec<Effect> {
        if !self.running {
            return Vec::new();
        }
        self.running = false;
        self.tag = self.tag.wrapping_add(1);
        vec![Effect::RunningChanged(false)]
    }

    fn apply_set(&mut self, elapsed_secs: f64) -> Vec<Effect> {
        self.elapsed = if elapsed_secs.is_nan() || elapsed_secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(elapsed_secs).unwrap_or(Duration::MAX)
        };

        if self.bounded() && self.elapsed > self.max {
            self.elapsed = self.max;
            return self.apply_stop();
        }
        Vec::new()
    }

    fn apply_tick(&mut self, tag: u64) -> Vec<Effect> {
        // Ticks armed before a stop arrive late and are dropped here
        if !self.running || tag != self.tag {
            return Vec::new();
        }

        self.elapsed = self.elapsed.saturating_add(self.interval);
        if self.bounded() && self.elapsed > self.max {
            self.elapsed = self.max;
            return self.apply_stop();
        }
        vec![self.schedule_tick()]
    }

    fn schedule_tick(&self) -> Effect {
        Effect::ScheduleTick {
            id: self.id,
            tag: self.tag,
            delay: self.interval,
        }
    }
}

/// Format a duration as `HH:MM:SS`, rounded to the nearest second.
pub fn format_clock(d: Duration) -> String {
    let secs = (d + Duration::from_millis(500)).as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
