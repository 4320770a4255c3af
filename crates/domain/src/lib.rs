//! Domain model for the DLMM position lifecycle manager.
//!
//! Typed entities for pool, bin and position snapshots returned by the DLMM
//! client, plus the decoding rules for the raw key-value form those snapshots
//! arrive in. All on-chain amounts are integers in minor units; only prices
//! and price impact are floating values.

pub mod bin;
pub mod error;
pub mod hex;
pub mod pool;
pub mod position;
pub mod strategy;
pub mod swap;
pub mod token;

pub use bin::{ActiveBin, BinLiquidity, BinRangeSnapshot};
pub use error::SnapshotError;
pub use hex::decode_counter;
pub use pool::{PoolType, USDC_MINT, WSOL_MINT};
pub use position::{
    Position, PositionBinData, PositionData, RawBinData, RawPosition, RawPositionData,
    UserPositions,
};
pub use strategy::{StrategyParameters, StrategyType};
pub use swap::{RawSwapQuote, SwapDirection, SwapQuote};
pub use token::TokenInfo;
