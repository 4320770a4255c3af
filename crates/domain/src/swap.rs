//! Swap direction and quotes.

use crate::error::SnapshotError;
use crate::hex::decode_amount;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Direction of a swap between the two pool tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Sell token X for token Y.
    XToY,
    /// Sell token Y for token X.
    YToX,
}

impl SwapDirection {
    /// The opposite direction, used when swapping proceeds back.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            SwapDirection::XToY => SwapDirection::YToX,
            SwapDirection::YToX => SwapDirection::XToY,
        }
    }

    /// Whether the swap consumes token Y.
    #[must_use]
    pub fn is_y_to_x(&self) -> bool {
        matches!(self, SwapDirection::YToX)
    }
}

/// Quote fields as returned by the client, amounts hex-encoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSwapQuote {
    /// Input actually consumed, hex.
    pub consumed_in_amount: Option<String>,
    /// Quoted output, hex.
    pub out_amount: Option<String>,
    /// Swap fee, hex.
    pub fee: Option<String>,
    /// Protocol share of the fee, hex.
    pub protocol_fee: Option<String>,
    /// Minimum acceptable output after slippage, hex.
    pub min_out_amount: Option<String>,
    /// Relative price impact of the swap.
    pub price_impact: Option<f64>,
    /// Bin price after the swap.
    pub end_price: Option<f64>,
    /// Bin arrays the swap will touch.
    pub bin_arrays_pubkey: Vec<Pubkey>,
}

/// A decoded swap quote.
///
/// Produced fresh for each swap and consumed immediately; quotes are never
/// cached, staleness invalidates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Input actually consumed, in minor units.
    pub consumed_in_amount: u64,
    /// Quoted output, in minor units.
    pub out_amount: u64,
    /// Swap fee, in minor units of the input token.
    pub fee: u64,
    /// Protocol share of the fee.
    pub protocol_fee: u64,
    /// Minimum acceptable output after slippage.
    pub min_out_amount: u64,
    /// Relative price impact of the swap.
    pub price_impact: f64,
    /// Bin price after the swap.
    pub end_price: f64,
    /// Bin arrays the swap will touch.
    pub bin_arrays_pubkey: Vec<Pubkey>,
}

impl SwapQuote {
    /// Decodes a raw quote, failing on any missing or malformed field.
    pub fn from_raw(raw: RawSwapQuote) -> Result<Self, SnapshotError> {
        let consumed_in_amount = decode_amount(
            raw.consumed_in_amount
                .as_deref()
                .ok_or(SnapshotError::MissingField("consumedInAmount"))?,
        )?;
        let out_amount = decode_amount(
            raw.out_amount
                .as_deref()
                .ok_or(SnapshotError::MissingField("outAmount"))?,
        )?;
        let fee = decode_amount(raw.fee.as_deref().ok_or(SnapshotError::MissingField("fee"))?)?;
        let protocol_fee = decode_amount(
            raw.protocol_fee
                .as_deref()
                .ok_or(SnapshotError::MissingField("protocolFee"))?,
        )?;
        let min_out_amount = decode_amount(
            raw.min_out_amount
                .as_deref()
                .ok_or(SnapshotError::MissingField("minOutAmount"))?,
        )?;
        Ok(Self {
            consumed_in_amount,
            out_amount,
            fee,
            protocol_fee,
            min_out_amount,
            price_impact: raw.price_impact.unwrap_or(0.0),
            end_price: raw.end_price.unwrap_or(0.0),
            bin_arrays_pubkey: raw.bin_arrays_pubkey,
        })
    }
}
