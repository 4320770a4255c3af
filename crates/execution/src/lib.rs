//! Lifecycle core: range selection, deposit planning, activity monitoring,
//! transaction submission and the position state machine.

pub mod activity;
pub mod allocation;
pub mod lifecycle;
pub mod range;
pub mod transaction;
pub mod wallet;

pub use activity::{ACTIVITY_EPSILON, ActivityMonitor, BinActivitySnapshot};
pub use allocation::{AllocationError, DepositPlan, TokenSplit, plan_deposit, split_budget};
pub use lifecycle::{
    ExitReason, LifecycleConfig, LifecycleReport, LifecycleState, PositionLifecycle,
};
pub use range::{BinRange, RangeError, range_for_percentage, range_for_radius};
pub use transaction::{PriorityLevel, TransactionSubmitter, with_compute_budget};
pub use wallet::Wallet;
