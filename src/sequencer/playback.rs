/// Playback engine - reveals a committed address one digit per tick
///
/// The engine never owns a timer. It asks a `Scheduler` for a repeating timer
/// on `start()` and the host feeds ticks back through `on_tick()`. At most one
/// timer handle is held at any time; ticks carrying any other handle are
/// ignored, so a replaced address can never receive a stray note.
use std::time::Duration;

use tracing::{debug, info};

use crate::fractal::{Address, NoteSymbol};

/// Identifies a repeating timer handed out by a `Scheduler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Host-side timer service.
pub trait Scheduler {
    fn schedule_repeating(&mut self, interval: Duration) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

/// Fire-and-forget sound trigger. Only called with audible symbols.
pub trait NoteTrigger {
    fn trigger(&mut self, symbol: NoteSymbol);
}

impl NoteTrigger for () {
    fn trigger(&mut self, _symbol: NoteSymbol) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Stopped,
}

/// Which revealed digits produce a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CueMode {
    /// Only the x digit of each level (even index) sounds.
    #[default]
    LeadingDigit,
    EveryDigit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    NoteRevealed {
        index: usize,
        digit: u8,
        cued: Option<NoteSymbol>,
    },
    LoopRestarted,
    Finished,
}

pub struct PlaybackEngine {
    committed: Address,
    revealed: usize,
    looping: bool,
    state: PlaybackState,
    interval: Duration,
    cue_mode: CueMode,
    timer: Option<TimerHandle>,
}

impl PlaybackEngine {
    pub fn new(interval: Duration) -> Self {
        Self {
            committed: Address::empty(),
            revealed: 0,
            looping: false,
            state: PlaybackState::Idle,
            interval,
            cue_mode: CueMode::default(),
            timer: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    pub fn committed(&self) -> &Address {
        &self.committed
    }

    /// Digits disclosed so far, in reveal order.
    pub fn revealed(&self) -> &[u8] {
        self.committed.prefix(self.revealed)
    }

    pub fn revealed_len(&self) -> usize {
        self.revealed
    }

    pub fn active_timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn cue_mode(&self) -> CueMode {
        self.cue_mode
    }

    pub fn set_cue_mode(&mut self, cue_mode: CueMode) {
        self.cue_mode = cue_mode;
    }

    /// Replace the committed address. Stops playback and hides every digit.
    pub fn commit(&mut self, address: Address, scheduler: &mut dyn Scheduler) {
        self.stop(scheduler);
        self.committed = address;
        self.revealed = 0;
    }

    /// Show a whole address at once without timed reveal.
    pub fn preview(&mut self, address: Address, scheduler: &mut dyn Scheduler) {
        self.stop(scheduler);
        self.revealed = address.len();
        self.committed = address;
    }

    /// Restart the reveal from the first digit. No-op for an empty address.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) -> bool {
        if self.committed.is_empty() {
            return false;
        }
        self.stop(scheduler);
        self.revealed = 0;
        let handle = scheduler.schedule_repeating(self.interval);
        self.timer = Some(handle);
        self.state = PlaybackState::Running;
        info!(
            notes = %self.committed,
            interval_ms = self.interval.as_millis() as u64,
            looping = self.looping,
            "playback started"
        );
        true
    }

    /// Cancel the pending timer. Safe to call in any state.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.timer.take() {
            scheduler.cancel(handle);
            debug!(?handle, "playback timer cancelled");
        }
        if self.state == PlaybackState::Running {
            self.state = PlaybackState::Stopped;
        }
    }

    /// Stop and forget the committed address.
    pub fn clear(&mut self, scheduler: &mut dyn Scheduler) {
        self.stop(scheduler);
        self.committed = Address::empty();
        self.revealed = 0;
        self.state = PlaybackState::Idle;
    }

    /// Change the tick interval, re-arming a running timer.
    pub fn set_interval(&mut self, interval: Duration, scheduler: &mut dyn Scheduler) {
        self.interval = interval;
        if let Some(old) = self.timer.take() {
            scheduler.cancel(old);
            let handle = scheduler.schedule_repeating(interval);
            self.timer = Some(handle);
            debug!(?old, ?handle, interval_ms = interval.as_millis() as u64, "playback timer re-armed");
        }
    }

    /// Advance by one tick of `handle`.
    pub fn on_tick(
        &mut self,
        handle: TimerHandle,
        scheduler: &mut dyn Scheduler,
        trigger: &mut dyn NoteTrigger,
    ) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        if self.state != PlaybackState::Running || self.timer != Some(handle) {
            debug!(?handle, "ignoring stale tick");
            return events;
        }

        if self.revealed >= self.committed.len() {
            if !self.looping {
                self.finish(scheduler, &mut events);
                return events;
            }
            // restart on the same tick so the loop has no gap
            self.revealed = 0;
            events.push(PlaybackEvent::LoopRestarted);
        }

        let index = self.revealed;
        let digit = self.committed.digits()[index];
        self.revealed += 1;

        let cued = self.cue_for(index, digit);
        if let Some(symbol) = cued {
            trigger.trigger(symbol);
        }
        debug!(index, digit, ?cued, "note revealed");
        events.push(PlaybackEvent::NoteRevealed { index, digit, cued });

        if self.revealed >= self.committed.len() && !self.looping {
            self.finish(scheduler, &mut events);
        }
        events
    }

    fn cue_for(&self, index: usize, digit: u8) -> Option<NoteSymbol> {
        let sounds = match self.cue_mode {
            CueMode::LeadingDigit => index % 2 == 0,
            CueMode::EveryDigit => true,
        };
        if !sounds {
            return None;
        }
        NoteSymbol::from_digit(digit).filter(|symbol| symbol.is_audible())
    }

    fn finish(&mut self, scheduler: &mut dyn Scheduler, events: &mut Vec<PlaybackEvent>) {
        self.stop(scheduler);
        info!(notes = %self.committed, "playback finished");
        events.push(PlaybackEvent::Finished);
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(125))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Scheduler double that records every call.
    #[derive(Default)]
    pub(crate) struct ManualScheduler {
        next: u64,
        pub active: Vec<(TimerHandle, Duration)>,
        pub cancelled: Vec<TimerHandle>,
    }

    impl Scheduler for ManualScheduler {
        fn schedule_repeating(&mut self, interval: Duration) -> TimerHandle {
            self.next += 1;
            let handle = TimerHandle(self.next);
            self.active.push((handle, interval));
            handle
        }

        fn cancel(&mut self, handle: TimerHandle) {
            self.active.retain(|(h, _)| *h != handle);
            self.cancelled.push(handle);
        }
    }

    #[derive(Default)]
    pub(crate) struct Recorder(pub Vec<NoteSymbol>);

    impl NoteTrigger for Recorder {
        fn trigger(&mut self, symbol: NoteSymbol) {
            self.0.push(symbol);
        }
    }

    fn engine_with(digits: Vec<u8>, looping: bool, sched: &mut ManualScheduler) -> PlaybackEngine {
        let mut engine = PlaybackEngine::new(Duration::from_millis(125));
        engine.set_looping(looping);
        engine.commit(Address::from_digits(digits), sched);
        engine
    }

    fn tick(engine: &mut PlaybackEngine, sched: &mut ManualScheduler, rec: &mut Recorder) -> Vec<PlaybackEvent> {
        let handle = engine.active_timer().unwrap_or(TimerHandle(u64::MAX));
        engine.on_tick(handle, sched, rec)
    }

    #[test]
    fn test_start_schedules_one_timer() {
        let mut sched = ManualScheduler::default();
        let mut engine = engine_with(vec![0, 1, 2, 3], false, &mut sched);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(engine.start(&mut sched));
        assert_eq!(engine.state(), PlaybackState::Running);
        assert_eq!(sched.active.len(), 1);
        assert_eq!(sched.active[0].1, Duration::from_millis(125));
        assert_eq!(engine.revealed_len(), 0);
    }

    #[test]
    fn test_start_with_empty_address_is_noop() {
        let mut sched = ManualScheduler::default();
        let mut engine = PlaybackEngine::default();
        assert!(!engine.start(&mut sched));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(sched.active.is_empty());
    }

    #[test]
    fn test_restart_keeps_single_timer() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![0, 1, 2, 3], true, &mut sched);
        engine.start(&mut sched);
        let first = engine.active_timer().unwrap();
        tick(&mut engine, &mut sched, &mut rec);
        engine.start(&mut sched);
        assert_eq!(sched.active.len(), 1);
        assert_eq!(sched.cancelled, vec![first]);
        assert_eq!(engine.revealed_len(), 0);
    }

    #[test]
    fn test_non_looping_stops_after_last_digit() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![0, 1, 2, 3], false, &mut sched);
        engine.start(&mut sched);
        let handle = engine.active_timer().unwrap();
        for i in 0..4 {
            let events = engine.on_tick(handle, &mut sched, &mut rec);
            assert!(matches!(events[0], PlaybackEvent::NoteRevealed { index, .. } if index == i));
        }
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.revealed(), &[0, 1, 2, 3]);
        assert!(sched.active.is_empty());

        let events = engine.on_tick(handle, &mut sched, &mut rec);
        assert!(events.is_empty());
        assert_eq!(engine.revealed_len(), 4);
    }

    #[test]
    fn test_finished_event_on_last_tick() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![2, 2], false, &mut sched);
        engine.start(&mut sched);
        tick(&mut engine, &mut sched, &mut rec);
        let events = tick(&mut engine, &mut sched, &mut rec);
        assert_eq!(events.last(), Some(&PlaybackEvent::Finished));
    }

    #[test]
    fn test_looping_restarts_on_fifth_tick() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![1, 0, 2, 3], true, &mut sched);
        engine.start(&mut sched);
        for _ in 0..4 {
            tick(&mut engine, &mut sched, &mut rec);
        }
        assert_eq!(engine.revealed_len(), 4);
        assert!(engine.is_running());

        let events = tick(&mut engine, &mut sched, &mut rec);
        assert_eq!(events[0], PlaybackEvent::LoopRestarted);
        assert_eq!(
            events[1],
            PlaybackEvent::NoteRevealed { index: 0, digit: 1, cued: Some(NoteSymbol::Snare) }
        );
        assert_eq!(engine.revealed(), &[1]);
        assert_eq!(sched.active.len(), 1);
    }

    #[test]
    fn test_looping_turned_off_mid_cycle_finishes() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![0, 0], true, &mut sched);
        engine.start(&mut sched);
        tick(&mut engine, &mut sched, &mut rec);
        tick(&mut engine, &mut sched, &mut rec);
        engine.set_looping(false);
        let events = tick(&mut engine, &mut sched, &mut rec);
        assert_eq!(events, vec![PlaybackEvent::Finished]);
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_leading_digit_cues() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![0, 1, 3, 2, 2, 0], false, &mut sched);
        engine.start(&mut sched);
        for _ in 0..6 {
            tick(&mut engine, &mut sched, &mut rec);
        }
        // x digits 0, 3, 2 -> bass, rest (silent), hihat
        assert_eq!(rec.0, vec![NoteSymbol::Bass, NoteSymbol::HiHat]);
    }

    #[test]
    fn test_every_digit_cues() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![0, 1, 3, 2], false, &mut sched);
        engine.set_cue_mode(CueMode::EveryDigit);
        engine.start(&mut sched);
        for _ in 0..4 {
            tick(&mut engine, &mut sched, &mut rec);
        }
        assert_eq!(rec.0, vec![NoteSymbol::Bass, NoteSymbol::Snare, NoteSymbol::HiHat]);
    }

    #[test]
    fn test_unknown_digit_is_revealed_but_silent() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![7, 0], false, &mut sched);
        engine.set_cue_mode(CueMode::EveryDigit);
        engine.start(&mut sched);
        let events = tick(&mut engine, &mut sched, &mut rec);
        assert_eq!(events[0], PlaybackEvent::NoteRevealed { index: 0, digit: 7, cued: None });
        assert!(rec.0.is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut sched = ManualScheduler::default();
        let mut engine = engine_with(vec![0, 1], false, &mut sched);
        engine.stop(&mut sched);
        assert_eq!(engine.state(), PlaybackState::Idle);
        engine.start(&mut sched);
        engine.stop(&mut sched);
        engine.stop(&mut sched);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(sched.cancelled.len(), 1);
        assert!(engine.active_timer().is_none());
    }

    #[test]
    fn test_recommit_ignores_old_timer() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![0, 0, 0, 0], false, &mut sched);
        engine.start(&mut sched);
        let old = engine.active_timer().unwrap();

        engine.commit(Address::from_digits(vec![1, 1, 1, 1]), &mut sched);
        engine.start(&mut sched);
        assert!(engine.on_tick(old, &mut sched, &mut rec).is_empty());
        assert_eq!(engine.revealed_len(), 0);
        assert!(rec.0.is_empty());

        tick(&mut engine, &mut sched, &mut rec);
        assert_eq!(rec.0, vec![NoteSymbol::Snare]);
    }

    #[test]
    fn test_set_interval_rearms_running_timer() {
        let mut sched = ManualScheduler::default();
        let mut rec = Recorder::default();
        let mut engine = engine_with(vec![0, 1, 2, 3], false, &mut sched);
        engine.start(&mut sched);
        tick(&mut engine, &mut sched, &mut rec);
        engine.set_interval(Duration::from_millis(250), &mut sched);
        assert_eq!(sched.active.len(), 1);
        assert_eq!(sched.active[0].1, Duration::from_millis(250));
        assert_eq!(engine.revealed_len(), 1);

        let mut idle = PlaybackEngine::default();
        idle.set_interval(Duration::from_millis(60), &mut sched);
        assert_eq!(sched.active.len(), 1);
    }

    #[test]
    fn test_preview_reveals_everything_and_stops() {
        let mut sched = ManualScheduler::default();
        let mut engine = engine_with(vec![0, 1], false, &mut sched);
        engine.start(&mut sched);
        engine.preview(Address::from_digits(vec![3, 2, 1]), &mut sched);
        assert_eq!(engine.revealed(), &[3, 2, 1]);
        assert!(!engine.is_running());
        assert!(sched.active.is_empty());
    }

    #[test]
    fn test_clear_returns_to_idle() {
        let mut sched = ManualScheduler::default();
        let mut engine = engine_with(vec![0, 1], true, &mut sched);
        engine.start(&mut sched);
        engine.clear(&mut sched);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(engine.committed().is_empty());
        assert!(engine.revealed().is_empty());
        assert!(sched.active.is_empty());
    }
}
