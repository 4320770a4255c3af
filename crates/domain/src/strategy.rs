//! Liquidity-shape strategy parameters.

use serde::{Deserialize, Serialize};

/// How liquidity is shaped across the chosen bin range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyType {
    /// Even spot distribution balanced around the active bin.
    SpotBalanced,
    /// Curve distribution concentrated on the active bin.
    CurveBalanced,
    /// Bid-ask distribution weighted toward the range edges.
    BidAsk,
}

/// Immutable instruction to the DLMM client describing a liquidity shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    /// Lowest bin id receiving liquidity.
    pub min_bin_id: i32,
    /// Highest bin id receiving liquidity.
    pub max_bin_id: i32,
    /// Distribution shape.
    pub strategy_type: StrategyType,
    /// Strategy-specific extras, passed through to the client untouched.
    pub params: Option<serde_json::Value>,
}

impl StrategyParameters {
    /// Creates parameters with no strategy-specific extras.
    #[must_use]
    pub fn new(min_bin_id: i32, max_bin_id: i32, strategy_type: StrategyType) -> Self {
        Self {
            min_bin_id,
            max_bin_id,
            strategy_type,
            params: None,
        }
    }

    /// Number of bins covered by the range, inclusive.
    #[must_use]
    pub fn bin_count(&self) -> u32 {
        (self.max_bin_id - self.min_bin_id).unsigned_abs() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_count_is_inclusive() {
        let params = StrategyParameters::new(-6, 6, StrategyType::SpotBalanced);
        assert_eq!(params.bin_count(), 13);
    }
}
