/// Frame-driven scheduler for hosts that poll once per frame
use std::time::Duration;

use tracing::debug;

use super::playback::{Scheduler, TimerHandle};

/// Ticks owed to one timer after a long frame are capped at this many.
const MAX_CATCH_UP_TICKS: u32 = 4;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

struct RepeatingTimer {
    handle: TimerHandle,
    interval: Duration,
    elapsed: Duration,
}

/// Accumulates frame time and reports which timers are due.
#[derive(Default)]
pub struct FrameClock {
    next_id: u64,
    timers: Vec<RepeatingTimer>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Add `delta` to every timer and return the due ticks in firing order.
    pub fn advance(&mut self, delta: Duration) -> Vec<TimerHandle> {
        let mut due = Vec::new();
        for timer in &mut self.timers {
            timer.elapsed += delta;
            let mut fired = 0;
            while timer.elapsed >= timer.interval && fired < MAX_CATCH_UP_TICKS {
                timer.elapsed -= timer.interval;
                due.push(timer.handle);
                fired += 1;
            }
            if timer.elapsed >= timer.interval {
                let rest = timer.elapsed.as_nanos() % timer.interval.as_nanos();
                timer.elapsed = Duration::from_nanos(rest as u64);
            }
        }
        due
    }

    /// Time until the earliest timer fires, for repaint scheduling.
    pub fn until_next_tick(&self) -> Option<Duration> {
        self.timers
            .iter()
            .map(|t| t.interval.saturating_sub(t.elapsed))
            .min()
    }
}

impl Scheduler for FrameClock {
    fn schedule_repeating(&mut self, interval: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.timers.push(RepeatingTimer {
            handle,
            interval: interval.max(MIN_INTERVAL),
            elapsed: Duration::ZERO,
        });
        debug!(?handle, interval_ms = interval.as_millis() as u64, "timer scheduled");
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.retain(|t| t.handle != handle);
    }
}
