//! Single-position lifecycle state machine.
//!
//! One run drives one position from funding through monitoring to unwind:
//! `Idle -> Entering -> Monitoring -> Exiting -> SwappingBack -> Done`, with
//! `Failed` absorbing any unrecoverable error. States never loop backwards;
//! a new position means a new run.

mod orchestrator;

pub use orchestrator::PositionLifecycle;

use chrono::{DateTime, Utc};
use dlmm_lp_domain::StrategyType;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::time::Duration;

use crate::transaction::PriorityLevel;

/// Phase of a lifecycle run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Preconditions being checked, nothing committed on chain.
    Idle,
    /// Funding swap and position creation in flight.
    Entering,
    /// Position open, polling for exit conditions.
    Monitoring,
    /// Claiming and removing liquidity.
    Exiting,
    /// Converting counterpart proceeds back to the base asset.
    SwappingBack,
    /// Run finished cleanly.
    Done,
    /// Run aborted; manual inspection may be needed.
    Failed,
}

impl LifecycleState {
    /// Whether the run has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Done | LifecycleState::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Entering => "entering",
            LifecycleState::Monitoring => "monitoring",
            LifecycleState::Exiting => "exiting",
            LifecycleState::SwappingBack => "swapping-back",
            LifecycleState::Done => "done",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why monitoring decided to unwind the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Accrued fees and rewards crossed the configured threshold.
    FeeRewardThreshold {
        /// Summed counter value at the crossing observation.
        total: u128,
    },
    /// Too many consecutive polls without trading activity.
    Inactivity {
        /// Idle cycles at the triggering observation.
        idle_cycles: u32,
    },
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::FeeRewardThreshold { total } => {
                write!(f, "fee and reward counters reached {total}")
            }
            ExitReason::Inactivity { idle_cycles } => {
                write!(f, "no trading activity for {idle_cycles} cycles")
            }
        }
    }
}

/// Tunable parameters of one lifecycle run.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Price range of the position, percent around the current price.
    pub range_percentage: f64,
    /// Liquidity shape across the range.
    pub strategy_type: StrategyType,
    /// Budget in display units when the pool's base asset is USDC.
    pub investment_usdc: f64,
    /// Budget in display units when the pool's base asset is SOL.
    pub investment_sol: f64,
    /// Fraction of balances actually deposited, headroom for fees.
    pub buffer_ratio: f64,
    /// Lamports that must stay untouched for transaction fees.
    pub min_fee_reserve_lamports: u64,
    /// Slippage tolerance for swaps, basis points.
    pub swap_slippage_bps: u16,
    /// Priority tier for all lifecycle transactions.
    pub priority: PriorityLevel,
    /// Delay between monitoring polls.
    pub poll_interval: Duration,
    /// Idle polls tolerated before the inactivity exit.
    pub max_idle_cycles: u32,
    /// Fee-and-reward counter sum triggering the profit exit.
    pub fee_reward_threshold: u128,
    /// Consecutive monitoring fetch failures tolerated.
    pub max_fetch_failures: u32,
    /// Attempts at removing all liquidity before failing the run.
    pub max_remove_attempts: u32,
    /// Delay between removal attempts.
    pub remove_retry_delay: Duration,
    /// Settling pause after a submitted transaction confirms.
    pub settle_delay: Duration,
    /// Confirmation polls per transaction.
    pub confirm_attempts: u32,
    /// Delay between confirmation polls.
    pub confirm_delay: Duration,
    /// Residual display-unit amount below which a position counts as empty.
    pub dust_threshold: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            range_percentage: 20.0,
            strategy_type: StrategyType::SpotBalanced,
            investment_usdc: 0.0,
            investment_sol: 0.0,
            buffer_ratio: 0.99,
            min_fee_reserve_lamports: 100_000_000,
            swap_slippage_bps: 1_000,
            priority: PriorityLevel::High,
            poll_interval: Duration::from_secs(60),
            max_idle_cycles: 10,
            fee_reward_threshold: 20_000,
            max_fetch_failures: 5,
            max_remove_attempts: 5,
            remove_retry_delay: Duration::from_secs(5),
            settle_delay: Duration::from_secs(5),
            confirm_attempts: 3,
            confirm_delay: Duration::from_secs(5),
            dust_threshold: 0.001,
        }
    }
}

/// Entry valuation and realized return of one position.
///
/// Values are in display units of the quote (Y) token, from the deposit at
/// creation and the last monitored snapshot before the unwind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionEconomics {
    /// Deposit value at creation.
    pub entry_value: f64,
    /// Position value at the last monitoring observation.
    pub exit_value: f64,
    /// Fee and reward counter sum at the last observation.
    pub fees_and_rewards: u128,
    /// Relative return over the holding period, percent.
    pub return_pct: f64,
    /// Return annualized over the holding period, percent.
    pub apy_pct: f64,
}

/// Outcome of one lifecycle run.
#[derive(Debug, Clone)]
pub struct LifecycleReport {
    /// Terminal state of the run.
    pub final_state: LifecycleState,
    /// Why monitoring exited, when it got that far.
    pub exit_reason: Option<ExitReason>,
    /// Error chain of the failure, for failed runs.
    pub failure: Option<String>,
    /// Position account the run managed, once created.
    pub position: Option<Pubkey>,
    /// Entry value and realized return, once the position was valued.
    pub economics: Option<PositionEconomics>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    pub finished_at: DateTime<Utc>,
}

/// Holding-period and annualized return for a position, in percent.
///
/// Sub-second holding periods clamp to one second so the annualization
/// stays finite.
#[must_use]
pub fn annualized_return(entry_value: f64, exit_value: f64, held_for: Duration) -> (f64, f64) {
    if entry_value <= 0.0 {
        return (0.0, 0.0);
    }
    let return_pct = (exit_value - entry_value) / entry_value * 100.0;
    let seconds = held_for.as_secs_f64().max(1.0);
    let apy_pct = return_pct * (365.0 * 86_400.0) / seconds;
    (return_pct, apy_pct)
}

/// Exit decision for one monitoring observation.
///
/// The profit condition wins when both trigger on the same poll.
#[must_use]
pub fn evaluate_exit(
    total_fees_and_rewards: u128,
    idle_cycles: u32,
    config: &LifecycleConfig,
) -> Option<ExitReason> {
    if total_fees_and_rewards >= config.fee_reward_threshold {
        return Some(ExitReason::FeeRewardThreshold {
            total: total_fees_and_rewards,
        });
    }
    if idle_cycles >= config.max_idle_cycles {
        return Some(ExitReason::Inactivity { idle_cycles });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_crossing_triggers_the_profit_exit() {
        let config = LifecycleConfig::default();
        assert_eq!(evaluate_exit(19_999, 0, &config), None);
        assert_eq!(
            evaluate_exit(20_000, 0, &config),
            Some(ExitReason::FeeRewardThreshold { total: 20_000 })
        );
    }

    #[test]
    fn idle_limit_triggers_the_inactivity_exit() {
        let config = LifecycleConfig::default();
        assert_eq!(evaluate_exit(0, 9, &config), None);
        assert_eq!(
            evaluate_exit(0, 10, &config),
            Some(ExitReason::Inactivity { idle_cycles: 10 })
        );
    }

    #[test]
    fn profit_exit_wins_over_inactivity() {
        let config = LifecycleConfig::default();
        assert!(matches!(
            evaluate_exit(25_000, 10, &config),
            Some(ExitReason::FeeRewardThreshold { total: 25_000 })
        ));
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(LifecycleState::Done.is_terminal());
        assert!(LifecycleState::Failed.is_terminal());
        assert!(!LifecycleState::Monitoring.is_terminal());
    }

    #[test]
    fn states_display_as_lowercase_names() {
        assert_eq!(LifecycleState::SwappingBack.to_string(), "swapping-back");
        assert_eq!(LifecycleState::Idle.to_string(), "idle");
    }

    #[test]
    fn one_year_hold_annualizes_to_the_plain_return() {
        let year = Duration::from_secs(365 * 86_400);
        let (return_pct, apy_pct) = annualized_return(100.0, 110.0, year);
        assert!((return_pct - 10.0).abs() < 1e-9);
        assert!((apy_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn shorter_holds_scale_the_annualized_return_up() {
        let half_year = Duration::from_secs(365 * 86_400 / 2);
        let (return_pct, apy_pct) = annualized_return(100.0, 105.0, half_year);
        assert!((return_pct - 5.0).abs() < 1e-9);
        assert!((apy_pct - 10.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_economics_inputs_yield_zero() {
        assert_eq!(annualized_return(0.0, 10.0, Duration::from_secs(60)), (0.0, 0.0));
        let (return_pct, apy_pct) = annualized_return(100.0, 90.0, Duration::ZERO);
        assert!(return_pct < 0.0);
        assert!(apy_pct.is_finite());
    }
}
