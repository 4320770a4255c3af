//! Pool token metadata.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Mint and precision of one of the two pool tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token mint address.
    pub mint: Pubkey,
    /// Decimal places of the mint.
    pub decimals: u8,
}

impl TokenInfo {
    /// Creates token metadata for a mint.
    #[must_use]
    pub fn new(mint: Pubkey, decimals: u8) -> Self {
        Self { mint, decimals }
    }

    /// Scale factor from display units to minor units.
    #[must_use]
    pub fn unit_scale(&self) -> f64 {
        10f64.powi(i32::from(self.decimals))
    }
}
