//! Static blind schedule shared by every process of a venue-session.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fallback duration used when a level index points outside the schedule.
pub const DEFAULT_LEVEL_DURATION_SEC: u32 = 720;

/// Whether a schedule entry is a playable level or a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    /// Regular level with blinds in play.
    Level,
    /// Pause between levels; no blinds.
    Break,
}

/// One entry of the blind schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlindLevel {
    /// Position of the entry in the schedule.
    pub index: usize,
    /// Level or break.
    pub kind: LevelKind,
    /// Small blind (`None` during breaks).
    pub sb: Option<u32>,
    /// Big blind (`None` during breaks).
    pub bb: Option<u32>,
    /// Ante (`None` during breaks).
    pub ante: Option<u32>,
    /// Full duration of the entry in seconds.
    pub duration_sec: u32,
}

impl BlindLevel {
    const fn level(index: usize, sb: u32, bb: u32, duration_sec: u32) -> Self {
        Self {
            index,
            kind: LevelKind::Level,
            sb: Some(sb),
            bb: Some(bb),
            ante: Some(0),
            duration_sec,
        }
    }

    const fn pause(index: usize, duration_sec: u32) -> Self {
        Self {
            index,
            kind: LevelKind::Break,
            sb: None,
            bb: None,
            ante: None,
            duration_sec,
        }
    }

    /// Return true when the entry is a break.
    pub fn is_break(&self) -> bool {
        self.kind == LevelKind::Break
    }

    /// Human readable blinds, e.g. `25/50` or `BREAK`.
    pub fn label(&self) -> String {
        match (self.kind, self.sb, self.bb) {
            (LevelKind::Level, Some(sb), Some(bb)) => format!("{sb}/{bb}"),
            _ => "BREAK".to_string(),
        }
    }
}

/// Ordered, immutable list of blind levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlindSchedule {
    levels: Vec<BlindLevel>,
}

impl BlindSchedule {
    /// Build a schedule from raw entries, re-indexing them by position.
    ///
    /// Returns `None` when `levels` is empty since a session always needs a first level.
    pub fn new(levels: Vec<BlindLevel>) -> Option<Self> {
        if levels.is_empty() {
            return None;
        }

        let levels = levels
            .into_iter()
            .enumerate()
            .map(|(index, level)| BlindLevel { index, ..level })
            .collect();
        Some(Self { levels })
    }

    /// Entry at `index`, if any.
    pub fn level(&self, index: usize) -> Option<&BlindLevel> {
        self.levels.get(index)
    }

    /// Entry following `index` (level or break).
    pub fn next(&self, index: usize) -> Option<&BlindLevel> {
        index.checked_add(1).and_then(|next| self.levels.get(next))
    }

    /// Entry preceding `index`.
    pub fn previous(&self, index: usize) -> Option<&BlindLevel> {
        index.checked_sub(1).and_then(|prev| self.levels.get(prev))
    }

    /// Next entry after `index` that is not a break.
    pub fn next_playable(&self, index: usize) -> Option<&BlindLevel> {
        self.levels
            .iter()
            .skip(index.saturating_add(1))
            .find(|level| !level.is_break())
    }

    /// Full duration of the entry at `index`, falling back to [`DEFAULT_LEVEL_DURATION_SEC`].
    pub fn duration_of(&self, index: usize) -> u32 {
        self.level(index)
            .map(|level| level.duration_sec)
            .unwrap_or(DEFAULT_LEVEL_DURATION_SEC)
    }

    /// Duration of the first entry, used for fresh and reset sessions.
    pub fn initial_duration(&self) -> u32 {
        self.duration_of(0)
    }

    /// Number of playable levels, breaks excluded.
    pub fn playable_count(&self) -> usize {
        self.levels.iter().filter(|level| !level.is_break()).count()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false: a schedule cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterate over every entry in order.
    pub fn iter(&self) -> impl Iterator<Item = &BlindLevel> {
        self.levels.iter()
    }
}

impl Default for BlindSchedule {
    fn default() -> Self {
        Self {
            levels: default_levels(),
        }
    }
}

/// League blind structure shipped with the binary.
fn default_levels() -> Vec<BlindLevel> {
    vec![
        BlindLevel::level(0, 2, 4, 720),
        BlindLevel::level(1, 3, 6, 720),
        BlindLevel::level(2, 4, 8, 720),
        BlindLevel::level(3, 5, 10, 720),
        BlindLevel::level(4, 6, 12, 720),
        BlindLevel::level(5, 7, 14, 720),
        BlindLevel::level(6, 8, 16, 720),
        BlindLevel::level(7, 10, 20, 720),
        BlindLevel::level(8, 15, 30, 720),
        BlindLevel::level(9, 20, 40, 720),
        BlindLevel::level(10, 25, 50, 720),
        BlindLevel::pause(11, 1800),
        BlindLevel::level(12, 30, 60, 900),
        BlindLevel::level(13, 40, 80, 900),
        BlindLevel::level(14, 50, 100, 900),
        BlindLevel::level(15, 60, 120, 900),
        BlindLevel::level(16, 80, 160, 900),
        BlindLevel::level(17, 100, 200, 900),
        BlindLevel::level(18, 125, 250, 900),
        BlindLevel::level(19, 150, 300, 900),
        BlindLevel::level(20, 200, 400, 900),
        BlindLevel::level(21, 250, 500, 900),
        BlindLevel::level(22, 300, 600, 900),
        BlindLevel::level(23, 350, 700, 900),
        BlindLevel::level(24, 400, 800, 900),
        BlindLevel::level(25, 500, 1000, 900),
        BlindLevel::level(26, 600, 1200, 900),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_past_the_end_are_empty() {
        let schedule = BlindSchedule::default();
        assert!(schedule.next(usize::MAX).is_none());
        assert!(schedule.next_playable(usize::MAX).is_none());
        assert!(schedule.next(schedule.len() - 1).is_none());
    }

    #[test]
    fn default_schedule_has_break_after_level_ten() {
        let schedule = BlindSchedule::default();
        assert_eq!(schedule.len(), 27);
        assert_eq!(schedule.level(10).unwrap().label(), "25/50");
        let next = schedule.next(10).unwrap();
        assert!(next.is_break());
        assert_eq!(next.duration_sec, 1800);
        assert_eq!(next.label(), "BREAK");
    }

    #[test]
    fn next_playable_skips_breaks() {
        let schedule = BlindSchedule::default();
        assert_eq!(schedule.next_playable(10).unwrap().index, 12);
        assert_eq!(schedule.next_playable(3).unwrap().index, 4);
        assert!(schedule.next_playable(26).is_none());
    }

    #[test]
    fn edges_of_schedule() {
        let schedule = BlindSchedule::default();
        assert!(schedule.previous(0).is_none());
        assert!(schedule.next(26).is_none());
        assert_eq!(schedule.duration_of(99), DEFAULT_LEVEL_DURATION_SEC);
        assert_eq!(schedule.playable_count(), 26);
    }

    #[test]
    fn custom_schedule_is_reindexed() {
        let schedule = BlindSchedule::new(vec![
            BlindLevel::level(7, 1, 2, 60),
            BlindLevel::pause(3, 30),
        ])
        .unwrap();
        assert_eq!(schedule.level(0).unwrap().index, 0);
        assert_eq!(schedule.level(1).unwrap().index, 1);
        assert!(BlindSchedule::new(Vec::new()).is_none());
    }
}
