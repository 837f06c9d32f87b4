//! Live figures shown on the display: stacks, prize pool and payouts.

use crate::state::tournament::Roster;

/// Chips handed to each entry and each rebuy.
pub const STARTING_STACK: u64 = 1_000;

/// Largest buy-in the operator may set.
pub const MAX_BUY_IN: u64 = 1_000_000_000;

/// Share of the prize pool paid to each finishing position, in percent.
pub const PAYOUT_PERCENTAGES: [u64; 4] = [40, 25, 15, 10];

/// Aggregated roster figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveStats {
    /// Registered entries.
    pub registered: usize,
    /// Entries still playing.
    pub active: usize,
    /// Entries knocked out.
    pub eliminated: usize,
    /// Rebuys taken.
    pub rebuys: usize,
    /// Chips in play.
    pub total_chips: u64,
    /// Average stack among active players, rounded; 0 when nobody is playing.
    pub average_stack: u64,
    /// Entries plus rebuys times the buy-in, saturating at `u64::MAX`.
    pub prize_pool: u64,
}

impl LiveStats {
    /// Compute the figures for `roster` at the given buy-in.
    pub fn compute(roster: &Roster, buy_in: u64) -> Self {
        let registered = roster.len();
        let active = roster.active_count();
        let rebuys = roster.total_rebuys();
        let purchases = u64::try_from(registered.saturating_add(rebuys)).unwrap_or(u64::MAX);
        let total_chips = purchases.saturating_mul(STARTING_STACK);
        let average_stack = match active {
            0 => 0,
            count => {
                let count = count as u64;
                total_chips.saturating_add(count / 2) / count
            }
        };

        Self {
            registered,
            active,
            eliminated: registered.saturating_sub(active),
            rebuys,
            total_chips,
            average_stack,
            prize_pool: purchases.saturating_mul(buy_in),
        }
    }
}

/// Amount paid to one finishing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    /// Finishing position, starting at 1.
    pub position: u32,
    /// Share of the pool in percent.
    pub percentage: u64,
    /// Amount paid.
    pub amount: u64,
}

/// Split `prize_pool` over the paid positions, rounding down.
pub fn payouts(prize_pool: u64) -> Vec<Payout> {
    PAYOUT_PERCENTAGES
        .iter()
        .zip(1u32..)
        .map(|(&percentage, position)| Payout {
            position,
            percentage,
            amount: share(prize_pool, percentage),
        })
        .collect()
}

fn share(prize_pool: u64, percentage: u64) -> u64 {
    let amount = u128::from(prize_pool) * u128::from(percentage) / 100;
    u64::try_from(amount).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tournament::{PlayerEntry, PlayerStatus};

    #[test]
    fn pool_counts_rebuys() {
        let roster: Roster = (0..10)
            .map(|i| {
                let mut entry = PlayerEntry::registered(format!("p{i}"), format!("P{i}"));
                entry.has_rebuy = i < 2;
                if i >= 6 {
                    entry.status = PlayerStatus::Eliminated;
                }
                entry
            })
            .collect();

        let stats = LiveStats::compute(&roster, 10_000);
        assert_eq!(stats.registered, 10);
        assert_eq!(stats.active, 6);
        assert_eq!(stats.eliminated, 4);
        assert_eq!(stats.rebuys, 2);
        assert_eq!(stats.total_chips, 12_000);
        assert_eq!(stats.average_stack, 2_000);
        assert_eq!(stats.prize_pool, 120_000);
    }

    #[test]
    fn empty_roster_has_no_average() {
        let stats = LiveStats::compute(&Roster::new(), 10_000);
        assert_eq!(stats.total_chips, 0);
        assert_eq!(stats.average_stack, 0);
        assert_eq!(stats.prize_pool, 0);
    }

    #[test]
    fn huge_buy_in_saturates_instead_of_overflowing() {
        let roster: Roster = (0..3)
            .map(|i| PlayerEntry::registered(format!("p{i}"), format!("P{i}")))
            .collect();

        let stats = LiveStats::compute(&roster, 1_000_000_000_000_000_000);
        assert_eq!(stats.prize_pool, u64::MAX);

        let split = payouts(stats.prize_pool);
        assert_eq!(split[0].amount, (u128::from(u64::MAX) * 40 / 100) as u64);
        assert!(split.windows(2).all(|pair| pair[0].amount >= pair[1].amount));
    }

    #[test]
    fn payouts_follow_percentages() {
        let split = payouts(120_000);
        let amounts: Vec<_> = split.iter().map(|payout| payout.amount).collect();
        assert_eq!(amounts, vec![48_000, 30_000, 18_000, 12_000]);
        assert_eq!(split[0].position, 1);
    }
}
