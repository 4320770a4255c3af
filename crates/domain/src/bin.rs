//! Bin-level pool state.

use serde::{Deserialize, Serialize};

/// The bin currently containing the traded price.
///
/// The single reference point for all pricing decisions at a given time.
/// `price` is the raw per-lamport bin price; `price_per_token` is adjusted
/// for the token decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveBin {
    /// Bin id of the active bin.
    pub bin_id: i32,
    /// Raw bin price.
    pub price: f64,
    /// Price adjusted to display units per token.
    pub price_per_token: f64,
    /// Token X reserve of the bin, in minor units.
    pub x_amount: u64,
    /// Token Y reserve of the bin, in minor units.
    pub y_amount: u64,
}

/// Per-bin reserves and supply, used only for liquidity-weighted pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinLiquidity {
    /// Bin id, within the `[lower, upper]` range requested from the client.
    pub bin_id: i32,
    /// Price adjusted to display units per token.
    pub price_per_token: f64,
    /// Liquidity supply of the bin, preserved as a decimal string.
    pub supply: String,
    /// Token X reserve of the bin, in minor units.
    pub x_amount: u64,
    /// Token Y reserve of the bin, in minor units.
    pub y_amount: u64,
}

/// Result of a bounded bin query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinRangeSnapshot {
    /// Active bin at query time.
    pub active_bin: ActiveBin,
    /// Bins between the requested bounds, ordered by bin id.
    pub bins: Vec<BinLiquidity>,
}
