//! Position snapshots and their validation.
//!
//! The DLMM client returns positions as loosely-typed key-value snapshots.
//! [`Position::from_raw`] structures them into typed entities; every field a
//! downstream computation needs must be present, and a missing field fails
//! construction naming the field. Decimal-string amounts are preserved as
//! strings at this layer to avoid precision loss; consumers that need
//! arithmetic parse them.

use crate::error::SnapshotError;
use crate::hex::decode_counter;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::warn;

use crate::bin::ActiveBin;

/// Raw per-bin entry of a position snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBinData {
    /// Bin id.
    pub bin_id: Option<i32>,
    /// Token X amount, decimal string in display units.
    pub x_amount: Option<String>,
    /// Token Y amount, decimal string in display units.
    pub y_amount: Option<String>,
    /// Liquidity share of the bin, decimal string.
    pub bin_liquidity: Option<String>,
    /// Bin price per token.
    pub price_per_token: Option<String>,
}

/// Raw position data snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPositionData {
    /// Total token X amount, decimal string.
    pub total_x_amount: Option<String>,
    /// Total token Y amount, decimal string.
    pub total_y_amount: Option<String>,
    /// Per-bin entries.
    pub position_bin_data: Vec<RawBinData>,
    /// Accrued token X fees, hex counter.
    pub fee_x: Option<String>,
    /// Accrued token Y fees, hex counter.
    pub fee_y: Option<String>,
    /// First reward counter, hex.
    pub reward_one: Option<String>,
    /// Second reward counter, hex.
    pub reward_two: Option<String>,
    /// Lowest occupied bin id.
    pub lower_bin_id: Option<i32>,
    /// Highest occupied bin id.
    pub upper_bin_id: Option<i32>,
    /// Fee owner address.
    pub fee_owner: Option<String>,
}

/// Raw position snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPosition {
    /// Position account address.
    pub public_key: Option<String>,
    /// Position account version.
    pub version: Option<u8>,
    /// Position data.
    pub position_data: Option<RawPositionData>,
}

/// One occupied bin of a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionBinData {
    /// Bin id, unique within the position.
    pub bin_id: i32,
    /// Token X amount, decimal string in display units.
    pub x_amount: String,
    /// Token Y amount, decimal string in display units.
    pub y_amount: String,
    /// Liquidity share of the bin, decimal string.
    pub liquidity: String,
    /// Bin price per token.
    pub price_per_token: String,
}

/// Point-in-time snapshot of a position's holdings and accruals.
///
/// Snapshots are value objects and are never diffed in place; new snapshots
/// replace old ones, and deltas are computed externally by the activity
/// monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    /// Total token X amount, decimal string.
    pub total_x_amount: String,
    /// Total token Y amount, decimal string.
    pub total_y_amount: String,
    /// Occupied bins, ordered by bin id.
    pub bins: Vec<PositionBinData>,
    /// Accrued token X fees, hex counter.
    pub fee_x: String,
    /// Accrued token Y fees, hex counter.
    pub fee_y: String,
    /// First reward counter, hex.
    pub reward_one: String,
    /// Second reward counter, hex.
    pub reward_two: String,
    /// Lowest occupied bin id.
    pub lower_bin_id: i32,
    /// Highest occupied bin id.
    pub upper_bin_id: i32,
    /// Fee owner; defaults to the null address when the snapshot omits it.
    pub fee_owner: Pubkey,
}

impl PositionData {
    /// Validates and structures a raw position-data snapshot.
    pub fn from_raw(raw: RawPositionData) -> Result<Self, SnapshotError> {
        let total_x_amount = raw
            .total_x_amount
            .ok_or(SnapshotError::MissingField("totalXAmount"))?;
        let total_y_amount = raw
            .total_y_amount
            .ok_or(SnapshotError::MissingField("totalYAmount"))?;
        let fee_x = raw.fee_x.ok_or(SnapshotError::MissingField("feeX"))?;
        let fee_y = raw.fee_y.ok_or(SnapshotError::MissingField("feeY"))?;
        let reward_one = raw
            .reward_one
            .ok_or(SnapshotError::MissingField("rewardOne"))?;
        let reward_two = raw
            .reward_two
            .ok_or(SnapshotError::MissingField("rewardTwo"))?;
        let lower_bin_id = raw
            .lower_bin_id
            .ok_or(SnapshotError::MissingField("lowerBinId"))?;
        let upper_bin_id = raw
            .upper_bin_id
            .ok_or(SnapshotError::MissingField("upperBinId"))?;

        if lower_bin_id > upper_bin_id {
            return Err(SnapshotError::InvalidField {
                field: "lowerBinId",
                reason: format!("lower bin {lower_bin_id} above upper bin {upper_bin_id}"),
            });
        }

        let fee_owner = match raw.fee_owner {
            Some(addr) => Pubkey::from_str(&addr).map_err(|e| SnapshotError::InvalidField {
                field: "feeOwner",
                reason: e.to_string(),
            })?,
            None => {
                warn!("snapshot missing feeOwner, defaulting to the null address");
                Pubkey::default()
            }
        };

        let mut bins = Vec::with_capacity(raw.position_bin_data.len());
        for raw_bin in raw.position_bin_data {
            bins.push(PositionBinData {
                bin_id: raw_bin.bin_id.ok_or(SnapshotError::MissingField("binId"))?,
                x_amount: raw_bin
                    .x_amount
                    .ok_or(SnapshotError::MissingField("xAmount"))?,
                y_amount: raw_bin
                    .y_amount
                    .ok_or(SnapshotError::MissingField("yAmount"))?,
                liquidity: raw_bin
                    .bin_liquidity
                    .ok_or(SnapshotError::MissingField("binLiquidity"))?,
                price_per_token: raw_bin
                    .price_per_token
                    .ok_or(SnapshotError::MissingField("pricePerToken"))?,
            });
        }
        bins.sort_by_key(|b| b.bin_id);
        if bins.windows(2).any(|w| w[0].bin_id == w[1].bin_id) {
            return Err(SnapshotError::InvalidField {
                field: "positionBinData",
                reason: "duplicate bin id in position snapshot".to_string(),
            });
        }

        Ok(Self {
            total_x_amount,
            total_y_amount,
            bins,
            fee_x,
            fee_y,
            reward_one,
            reward_two,
            lower_bin_id,
            upper_bin_id,
            fee_owner,
        })
    }

    /// Occupied bin ids, ascending.
    #[must_use]
    pub fn bin_ids(&self) -> Vec<i32> {
        self.bins.iter().map(|b| b.bin_id).collect()
    }

    /// Sum of the decoded fee and reward counters.
    pub fn total_fees_and_rewards(&self) -> Result<u128, SnapshotError> {
        Ok(decode_counter(&self.fee_x)?
            + decode_counter(&self.fee_y)?
            + decode_counter(&self.reward_one)?
            + decode_counter(&self.reward_two)?)
    }

    /// Parses the total amounts into display-unit floats.
    pub fn display_totals(&self) -> Result<(f64, f64), SnapshotError> {
        let total_x = self
            .total_x_amount
            .parse::<f64>()
            .map_err(|e| SnapshotError::InvalidField {
                field: "totalXAmount",
                reason: e.to_string(),
            })?;
        let total_y = self
            .total_y_amount
            .parse::<f64>()
            .map_err(|e| SnapshotError::InvalidField {
                field: "totalYAmount",
                reason: e.to_string(),
            })?;
        Ok((total_x, total_y))
    }
}

/// A liquidity position owned by the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Position account address, generated client-side before submission and
    /// never changed afterwards.
    pub public_key: Pubkey,
    /// Version tag set at creation.
    pub version: u8,
    /// Latest data snapshot, refreshed on every query.
    pub data: PositionData,
}

impl Position {
    /// Validates and structures a raw position snapshot.
    pub fn from_raw(raw: RawPosition) -> Result<Self, SnapshotError> {
        let public_key = raw
            .public_key
            .ok_or(SnapshotError::MissingField("publicKey"))?;
        let public_key =
            Pubkey::from_str(&public_key).map_err(|e| SnapshotError::InvalidField {
                field: "publicKey",
                reason: e.to_string(),
            })?;
        let version = raw.version.ok_or(SnapshotError::MissingField("version"))?;
        let data = PositionData::from_raw(
            raw.position_data
                .ok_or(SnapshotError::MissingField("positionData"))?,
        )?;
        Ok(Self {
            public_key,
            version,
            data,
        })
    }
}

/// Positions of one wallet in one pool, with the active bin at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPositions {
    /// Active bin at query time.
    pub active_bin: ActiveBin,
    /// Positions owned by the queried wallet.
    pub positions: Vec<Position>,
}

impl UserPositions {
    /// Finds a position by its account address.
    #[must_use]
    pub fn find(&self, position: &Pubkey) -> Option<&Position> {
        self.positions.iter().find(|p| p.public_key == *position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_bin(bin_id: i32) -> RawBinData {
        RawBinData {
            bin_id: Some(bin_id),
            x_amount: Some("10.5".to_string()),
            y_amount: Some("2.25".to_string()),
            bin_liquidity: Some("100.0".to_string()),
            price_per_token: Some("0.2".to_string()),
        }
    }

    fn raw_data() -> RawPositionData {
        RawPositionData {
            total_x_amount: Some("21.0".to_string()),
            total_y_amount: Some("4.5".to_string()),
            position_bin_data: vec![raw_bin(101), raw_bin(99), raw_bin(100)],
            fee_x: Some("1f4".to_string()),
            fee_y: Some("00".to_string()),
            reward_one: Some("64".to_string()),
            reward_two: Some("00".to_string()),
            lower_bin_id: Some(99),
            upper_bin_id: Some(101),
            fee_owner: Some(Pubkey::new_unique().to_string()),
        }
    }

    fn raw_position() -> RawPosition {
        RawPosition {
            public_key: Some(Pubkey::new_unique().to_string()),
            version: Some(2),
            position_data: Some(raw_data()),
        }
    }

    #[test]
    fn structures_a_complete_snapshot() {
        let position = Position::from_raw(raw_position()).unwrap();
        assert_eq!(position.version, 2);
        assert_eq!(position.data.bin_ids(), vec![99, 100, 101]);
        assert_eq!(position.data.total_x_amount, "21.0");
    }

    #[test]
    fn missing_field_names_the_field() {
        let mut raw = raw_data();
        raw.reward_one = None;
        assert!(matches!(
            PositionData::from_raw(raw),
            Err(SnapshotError::MissingField("rewardOne"))
        ));

        let mut raw = raw_position();
        raw.version = None;
        assert!(matches!(
            Position::from_raw(raw),
            Err(SnapshotError::MissingField("version"))
        ));
    }

    #[test]
    fn missing_fee_owner_defaults_to_null_address() {
        let mut raw = raw_data();
        raw.fee_owner = None;
        let data = PositionData::from_raw(raw).unwrap();
        assert_eq!(data.fee_owner, Pubkey::default());
    }

    #[test]
    fn duplicate_bin_ids_are_rejected() {
        let mut raw = raw_data();
        raw.position_bin_data.push(raw_bin(100));
        assert!(matches!(
            PositionData::from_raw(raw),
            Err(SnapshotError::InvalidField { field: "positionBinData", .. })
        ));
    }

    #[test]
    fn inverted_bin_bounds_are_rejected() {
        let mut raw = raw_data();
        raw.lower_bin_id = Some(102);
        assert!(PositionData::from_raw(raw).is_err());
    }

    #[test]
    fn fee_and_reward_counters_decode_and_sum() {
        let data = PositionData::from_raw(raw_data()).unwrap();
        // 0x1f4 + 0 + 0x64 + 0 = 500 + 100
        assert_eq!(data.total_fees_and_rewards().unwrap(), 600);
    }

    #[test]
    fn display_totals_parse_decimal_strings() {
        let data = PositionData::from_raw(raw_data()).unwrap();
        let (x, y) = data.display_totals().unwrap();
        assert!((x - 21.0).abs() < f64::EPSILON);
        assert!((y - 4.5).abs() < f64::EPSILON);
    }
}
