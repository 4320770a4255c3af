//! Pool classification against the supported base assets.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Mainnet USDC mint.
pub const USDC_MINT: Pubkey = Pubkey::from_str_const("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// Wrapped SOL mint.
pub const WSOL_MINT: Pubkey = Pubkey::from_str_const("So11111111111111111111111111111111111111112");

/// Which known base asset one of the pool tokens matches.
///
/// Derived once at orchestrator start; [`PoolType::Unsupported`] is terminal
/// and refuses the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolType {
    /// One pool token is USDC.
    Usdc,
    /// One pool token is (wrapped) SOL.
    Sol,
    /// Neither pool token is a supported base asset.
    Unsupported,
}

impl PoolType {
    /// Classifies a pool from its two token mints.
    ///
    /// USDC takes precedence when a pool pairs USDC against SOL, matching the
    /// base-asset preference order.
    #[must_use]
    pub fn classify(token_x: &Pubkey, token_y: &Pubkey) -> Self {
        if *token_x == USDC_MINT || *token_y == USDC_MINT {
            PoolType::Usdc
        } else if *token_x == WSOL_MINT || *token_y == WSOL_MINT {
            PoolType::Sol
        } else {
            PoolType::Unsupported
        }
    }

    /// Whether a lifecycle may run against this pool.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, PoolType::Unsupported)
    }

    /// The base-asset mint for a supported pool type.
    #[must_use]
    pub fn base_mint(&self) -> Option<Pubkey> {
        match self {
            PoolType::Usdc => Some(USDC_MINT),
            PoolType::Sol => Some(WSOL_MINT),
            PoolType::Unsupported => None,
        }
    }

    /// Decimals of the base asset for a supported pool type.
    #[must_use]
    pub fn base_decimals(&self) -> Option<u8> {
        match self {
            PoolType::Usdc => Some(6),
            PoolType::Sol => Some(9),
            PoolType::Unsupported => None,
        }
    }
}
