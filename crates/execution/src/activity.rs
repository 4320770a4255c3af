//! Trading-activity detection over position snapshots.
//!
//! Successive snapshots of the position's bins are diffed; any amount or
//! liquidity delta above a small epsilon counts as trading activity. Bins
//! present in only one of the two snapshots carry no comparable delta and
//! are ignored. The monitor keeps a consecutive idle-cycle counter the
//! orchestrator reads for its inactivity exit.

use dlmm_lp_domain::PositionData;
use std::collections::BTreeMap;
use tracing::debug;

/// Delta below which two observed amounts count as unchanged.
pub const ACTIVITY_EPSILON: f64 = 0.001;

/// Observed amounts of one bin, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BinAmounts {
    /// Token X amount.
    pub x_amount: f64,
    /// Token Y amount.
    pub y_amount: f64,
    /// Liquidity share.
    pub liquidity: f64,
}

/// Per-bin amounts at one observation instant, keyed by bin id.
pub type BinActivitySnapshot = BTreeMap<i32, BinAmounts>;

/// Builds an activity snapshot from a position snapshot.
///
/// Amount strings that fail to parse observe as zero; the diff then treats
/// them like an empty bin rather than poisoning the whole snapshot.
#[must_use]
pub fn snapshot_from_position(data: &PositionData) -> BinActivitySnapshot {
    data.bins
        .iter()
        .map(|bin| {
            (
                bin.bin_id,
                BinAmounts {
                    x_amount: bin.x_amount.parse().unwrap_or(0.0),
                    y_amount: bin.y_amount.parse().unwrap_or(0.0),
                    liquidity: bin.liquidity.parse().unwrap_or(0.0),
                },
            )
        })
        .collect()
}

/// Detects trading activity across successive snapshots.
#[derive(Debug)]
pub struct ActivityMonitor {
    epsilon: f64,
    previous: Option<BinActivitySnapshot>,
    idle_cycles: u32,
}

impl ActivityMonitor {
    /// Creates a monitor with the default epsilon.
    #[must_use]
    pub fn new() -> Self {
        Self::with_epsilon(ACTIVITY_EPSILON)
    }

    /// Creates a monitor with a custom epsilon.
    #[must_use]
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            epsilon,
            previous: None,
            idle_cycles: 0,
        }
    }

    /// Records a snapshot and reports whether it shows trading activity.
    ///
    /// The first observation has nothing to diff against and counts as idle.
    /// Activity resets the idle counter; idleness increments it.
    pub fn observe(&mut self, current: BinActivitySnapshot) -> bool {
        let active = match &self.previous {
            Some(previous) => self.has_activity(previous, &current),
            None => false,
        };
        if active {
            self.idle_cycles = 0;
        } else {
            self.idle_cycles += 1;
        }
        debug!(
            active,
            idle_cycles = self.idle_cycles,
            bins = current.len(),
            "activity observation"
        );
        self.previous = Some(current);
        active
    }

    /// Consecutive observations without trading activity.
    #[must_use]
    pub fn idle_cycles(&self) -> u32 {
        self.idle_cycles
    }

    fn has_activity(&self, previous: &BinActivitySnapshot, current: &BinActivitySnapshot) -> bool {
        current.iter().any(|(bin_id, now)| {
            previous.get(bin_id).is_some_and(|then| {
                (now.x_amount - then.x_amount).abs() > self.epsilon
                    || (now.y_amount - then.y_amount).abs() > self.epsilon
                    || (now.liquidity - then.liquidity).abs() > self.epsilon
            })
        })
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(i32, f64, f64, f64)]) -> BinActivitySnapshot {
        entries
            .iter()
            .map(|&(bin_id, x_amount, y_amount, liquidity)| {
                (
                    bin_id,
                    BinAmounts {
                        x_amount,
                        y_amount,
                        liquidity,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn first_observation_counts_as_idle() {
        let mut monitor = ActivityMonitor::new();
        assert!(!monitor.observe(snapshot(&[(1, 10.0, 2.0, 100.0)])));
        assert_eq!(monitor.idle_cycles(), 1);
    }

    #[test]
    fn identical_snapshots_accumulate_idle_cycles() {
        let mut monitor = ActivityMonitor::new();
        for cycle in 1..=4 {
            monitor.observe(snapshot(&[(1, 10.0, 2.0, 100.0), (2, 5.0, 1.0, 50.0)]));
            assert_eq!(monitor.idle_cycles(), cycle);
        }
    }

    #[test]
    fn amount_change_resets_the_idle_counter() {
        let mut monitor = ActivityMonitor::new();
        monitor.observe(snapshot(&[(1, 10.0, 2.0, 100.0)]));
        monitor.observe(snapshot(&[(1, 10.0, 2.0, 100.0)]));
        assert_eq!(monitor.idle_cycles(), 2);
        assert!(monitor.observe(snapshot(&[(1, 10.5, 2.0, 100.0)])));
        assert_eq!(monitor.idle_cycles(), 0);
    }

    #[test]
    fn sub_epsilon_jitter_is_not_activity() {
        let mut monitor = ActivityMonitor::new();
        monitor.observe(snapshot(&[(1, 10.0, 2.0, 100.0)]));
        assert!(!monitor.observe(snapshot(&[(1, 10.0005, 2.0, 100.0)])));
        assert_eq!(monitor.idle_cycles(), 2);
    }

    #[test]
    fn bins_in_only_one_snapshot_are_ignored() {
        let mut monitor = ActivityMonitor::new();
        monitor.observe(snapshot(&[(1, 10.0, 2.0, 100.0)]));
        // bin 2 appears, bin 1 unchanged: no comparable delta
        assert!(!monitor.observe(snapshot(&[(1, 10.0, 2.0, 100.0), (2, 7.0, 1.0, 30.0)])));
        // bin 1 disappears, bin 2 unchanged
        assert!(!monitor.observe(snapshot(&[(2, 7.0, 1.0, 30.0)])));
        assert_eq!(monitor.idle_cycles(), 3);
    }

    #[test]
    fn liquidity_delta_alone_is_activity() {
        let mut monitor = ActivityMonitor::new();
        monitor.observe(snapshot(&[(1, 10.0, 2.0, 100.0)]));
        assert!(monitor.observe(snapshot(&[(1, 10.0, 2.0, 101.0)])));
    }

    #[test]
    fn snapshot_parses_position_bin_strings() {
        use dlmm_lp_domain::PositionBinData;
        let data = PositionData {
            total_x_amount: "10.5".into(),
            total_y_amount: "2.25".into(),
            bins: vec![PositionBinData {
                bin_id: 7,
                x_amount: "10.5".into(),
                y_amount: "2.25".into(),
                liquidity: "broken".into(),
                price_per_token: "0.2".into(),
            }],
            fee_x: "00".into(),
            fee_y: "00".into(),
            reward_one: "00".into(),
            reward_two: "00".into(),
            lower_bin_id: 7,
            upper_bin_id: 7,
            fee_owner: solana_sdk::pubkey::Pubkey::default(),
        };
        let snapshot = snapshot_from_position(&data);
        let amounts = snapshot.get(&7).unwrap();
        assert!((amounts.x_amount - 10.5).abs() < f64::EPSILON);
        assert_eq!(amounts.liquidity, 0.0);
    }
}
