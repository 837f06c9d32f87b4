//! Local countdown and the clock half of change reconciliation.
//!
//! [`ClockDriver`] never reads wall time itself: callers pass the tick instant,
//! which keeps the countdown deterministic under test.

use std::time::Duration;

use tokio::time::Instant;

use crate::{
    dao::models::StatePatch,
    state::{blinds::BlindSchedule, tournament::TournamentState},
};

/// Period between two pushes of the running clock to the store.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// What a single tick did to the local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clock is paused; nothing changed.
    Idle,
    /// One second elapsed. Carries the periodic sync when one is due.
    Counted {
        /// `{time_remaining}` push, present every sync interval.
        sync: Option<StatePatch>,
    },
    /// Level ran out and the next schedule entry started.
    Advanced {
        /// `{current_level, time_remaining, is_paused: false}`.
        patch: StatePatch,
    },
    /// Last level ran out; the clock stopped at zero.
    Finished {
        /// `{time_remaining: 0, is_paused: true}`.
        patch: StatePatch,
    },
}

impl TickOutcome {
    /// Patch to persist when the process owns the clock.
    pub fn into_patch(self) -> Option<StatePatch> {
        match self {
            TickOutcome::Idle => None,
            TickOutcome::Counted { sync } => sync,
            TickOutcome::Advanced { patch } | TickOutcome::Finished { patch } => Some(patch),
        }
    }
}

/// Per-process countdown plus the level and pause flag last seen for this session.
#[derive(Debug, Clone)]
pub struct ClockDriver {
    tracked_level: usize,
    tracked_paused: bool,
    last_sync: Option<Instant>,
    sync_interval: Duration,
}

impl ClockDriver {
    /// Driver tracking a freshly loaded state.
    pub fn new(state: &TournamentState, sync_interval: Duration) -> Self {
        Self {
            tracked_level: state.current_level,
            tracked_paused: state.is_paused,
            last_sync: None,
            sync_interval,
        }
    }

    /// Level index the driver believes is current.
    pub fn tracked_level(&self) -> usize {
        self.tracked_level
    }

    /// Pause flag the driver believes is current.
    pub fn tracked_paused(&self) -> bool {
        self.tracked_paused
    }

    /// Forget every tracked value and start over from `state`.
    pub fn retrack(&mut self, state: &TournamentState) {
        self.tracked_level = state.current_level;
        self.tracked_paused = state.is_paused;
        self.last_sync = None;
    }

    /// Record a level chosen locally so the matching notification is a merge.
    pub fn note_level(&mut self, level: usize) {
        self.tracked_level = level;
    }

    /// Record a pause flag set locally so the matching notification is a merge.
    pub fn note_paused(&mut self, paused: bool) {
        self.tracked_paused = paused;
        if !paused {
            self.last_sync = None;
        }
    }

    /// Count one second down on `state`.
    pub fn tick(
        &mut self,
        state: &mut TournamentState,
        schedule: &BlindSchedule,
        now: Instant,
    ) -> TickOutcome {
        if state.is_paused {
            return TickOutcome::Idle;
        }

        let remaining = state.time_remaining.saturating_sub(1);
        if remaining > 0 {
            state.time_remaining = remaining;
            let sync = self.sync_due(now).then(|| {
                self.last_sync = Some(now);
                StatePatch {
                    time_remaining: Some(remaining),
                    ..StatePatch::default()
                }
            });
            return TickOutcome::Counted { sync };
        }

        self.last_sync = Some(now);
        match schedule.next(state.current_level) {
            Some(next) => {
                state.current_level = next.index;
                state.time_remaining = next.duration_sec;
                state.is_paused = false;
                self.tracked_level = next.index;
                self.tracked_paused = false;
                TickOutcome::Advanced {
                    patch: StatePatch {
                        current_level: Some(next.index),
                        time_remaining: Some(next.duration_sec),
                        is_paused: Some(false),
                        ..StatePatch::default()
                    },
                }
            }
            None => {
                state.time_remaining = 0;
                state.is_paused = true;
                self.tracked_paused = true;
                TickOutcome::Finished {
                    patch: StatePatch {
                        time_remaining: Some(0),
                        is_paused: Some(true),
                        ..StatePatch::default()
                    },
                }
            }
        }
    }

    fn sync_due(&self, now: Instant) -> bool {
        match self.last_sync {
            None => true,
            Some(last) => now.duration_since(last) >= self.sync_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn running(level: usize, remaining: u32) -> TournamentState {
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        state.current_level = level;
        state.time_remaining = remaining;
        state.is_paused = false;
        state
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        let mut clock = ClockDriver::new(&state, DEFAULT_SYNC_INTERVAL);
        let outcome = clock.tick(&mut state, &BlindSchedule::default(), Instant::now());
        assert_eq!(outcome, TickOutcome::Idle);
        assert_eq!(state.time_remaining, 720);
    }

    #[test]
    fn sync_is_pushed_once_per_interval() {
        let schedule = BlindSchedule::default();
        let mut state = running(2, 600);
        let mut clock = ClockDriver::new(&state, DEFAULT_SYNC_INTERVAL);
        let start = Instant::now();

        let syncs: Vec<u32> = (0..25u64)
            .filter_map(|second| {
                clock
                    .tick(&mut state, &schedule, start + Duration::from_secs(second))
                    .into_patch()
                    .and_then(|patch| patch.time_remaining)
            })
            .collect();

        assert_eq!(syncs, vec![599, 589, 579]);
        assert_eq!(state.time_remaining, 575);
    }

    #[test]
    fn reaching_zero_advances_into_break() {
        let schedule = BlindSchedule::default();
        let mut state = running(10, 1);
        let mut clock = ClockDriver::new(&state, DEFAULT_SYNC_INTERVAL);

        let outcome = clock.tick(&mut state, &schedule, Instant::now());

        assert_eq!(state.current_level, 11);
        assert_eq!(state.time_remaining, 1800);
        assert!(!state.is_paused);
        assert_eq!(clock.tracked_level(), 11);
        let TickOutcome::Advanced { patch } = outcome else {
            panic!("expected advance, got {outcome:?}");
        };
        assert_eq!(patch.current_level, Some(11));
        assert_eq!(patch.is_paused, Some(false));
    }

    #[test]
    fn last_level_stops_at_zero() {
        let schedule = BlindSchedule::default();
        let mut state = running(26, 1);
        let mut clock = ClockDriver::new(&state, DEFAULT_SYNC_INTERVAL);

        let outcome = clock.tick(&mut state, &schedule, Instant::now());

        assert!(matches!(outcome, TickOutcome::Finished { .. }));
        assert_eq!(state.time_remaining, 0);
        assert!(state.is_paused);
        assert!(clock.tracked_paused());
    }
}
