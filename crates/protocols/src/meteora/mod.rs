//! Meteora DLMM (LB CLMM) client.
//!
//! Reads lb-pair, bin-array and position accounts directly and builds the
//! pool's instructions. Swap quoting is a single-active-bin approximation:
//! exact multi-bin quote math stays with the on-chain program, the quote here
//! only sizes `min_out` for slippage protection.

pub mod instructions;

use crate::DlmmClient;
use crate::rpc::{RpcProvider, create_ata_idempotent, wrap_sol};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use dlmm_lp_domain::{
    ActiveBin, BinLiquidity, BinRangeSnapshot, Position, RawBinData, RawPosition, RawPositionData,
    StrategyParameters, SwapDirection, SwapQuote, TokenInfo, UserPositions, WSOL_MINT,
};
use solana_client::rpc_config::RpcProgramAccountsConfig;
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Meteora LB CLMM program ID (mainnet).
pub const LB_CLMM_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo");

/// Bins per bin-array account.
pub const BINS_PER_ARRAY: i32 = 70;

// lb_pair account layout: 8-byte discriminator, 32-byte static parameters,
// 32-byte variable parameters, then the pair header fields.
const LB_PAIR_BASE_FACTOR_OFFSET: usize = 8;
const LB_PAIR_PROTOCOL_SHARE_OFFSET: usize = 32;
const LB_PAIR_ACTIVE_ID_OFFSET: usize = 76;
const LB_PAIR_BIN_STEP_OFFSET: usize = 80;
const LB_PAIR_TOKEN_X_MINT_OFFSET: usize = 88;
const LB_PAIR_TOKEN_Y_MINT_OFFSET: usize = 120;
const LB_PAIR_RESERVE_X_OFFSET: usize = 152;
const LB_PAIR_RESERVE_Y_OFFSET: usize = 184;

// bin_array account layout: discriminator, index i64, version + padding,
// lb_pair pubkey, then 70 fixed-size bin records.
const BIN_ARRAY_HEADER_LEN: usize = 56;
const BIN_RECORD_LEN: usize = 144;
const BIN_AMOUNT_X_OFFSET: usize = 0;
const BIN_AMOUNT_Y_OFFSET: usize = 8;
const BIN_LIQUIDITY_SUPPLY_OFFSET: usize = 32;

// position_v2 account layout: discriminator, lb_pair, owner, 70 liquidity
// shares, 70 reward infos, 70 fee infos, then the summary fields.
const POSITION_LB_PAIR_OFFSET: usize = 8;
const POSITION_OWNER_OFFSET: usize = 40;
const POSITION_SHARES_OFFSET: usize = 72;
const POSITION_REWARD_INFOS_OFFSET: usize = 1192;
const POSITION_FEE_INFOS_OFFSET: usize = 4552;
const POSITION_LOWER_BIN_OFFSET: usize = 7912;
const POSITION_UPPER_BIN_OFFSET: usize = 7916;
const REWARD_INFO_LEN: usize = 48;
const REWARD_PENDINGS_OFFSET: usize = 32;
const FEE_INFO_LEN: usize = 48;
const FEE_X_PENDING_OFFSET: usize = 32;
const FEE_Y_PENDING_OFFSET: usize = 40;

const MINT_DECIMALS_OFFSET: usize = 44;

/// Decoded lb-pair header fields the client needs.
#[derive(Debug, Clone, Copy)]
struct LbPairState {
    active_id: i32,
    bin_step_bps: u16,
    base_factor: u16,
    protocol_share_bps: u16,
    token_x_mint: Pubkey,
    token_y_mint: Pubkey,
    reserve_x: Pubkey,
    reserve_y: Pubkey,
}

impl LbPairState {
    fn decode(data: &[u8]) -> Result<Self> {
        Ok(Self {
            active_id: read_i32(data, LB_PAIR_ACTIVE_ID_OFFSET)?,
            bin_step_bps: read_u16(data, LB_PAIR_BIN_STEP_OFFSET)?,
            base_factor: read_u16(data, LB_PAIR_BASE_FACTOR_OFFSET)?,
            protocol_share_bps: read_u16(data, LB_PAIR_PROTOCOL_SHARE_OFFSET)?,
            token_x_mint: read_pubkey(data, LB_PAIR_TOKEN_X_MINT_OFFSET)?,
            token_y_mint: read_pubkey(data, LB_PAIR_TOKEN_Y_MINT_OFFSET)?,
            reserve_x: read_pubkey(data, LB_PAIR_RESERVE_X_OFFSET)?,
            reserve_y: read_pubkey(data, LB_PAIR_RESERVE_Y_OFFSET)?,
        })
    }
}

/// One decoded bin record.
#[derive(Debug, Clone, Copy, Default)]
struct BinState {
    amount_x: u64,
    amount_y: u64,
    liquidity_supply: u128,
}

/// DLMM client bound to one pool.
pub struct MeteoraDlmm {
    provider: Arc<RpcProvider>,
    pool: Pubkey,
    program_id: Pubkey,
    token_x: TokenInfo,
    token_y: TokenInfo,
    bin_step_bps: u16,
    base_factor: u16,
    protocol_share_bps: u16,
    reserve_x: Pubkey,
    reserve_y: Pubkey,
}

impl MeteoraDlmm {
    /// Connects to a pool, decoding its pair header and token mints.
    pub async fn load(provider: Arc<RpcProvider>, pool: Pubkey) -> Result<Self> {
        let data = provider
            .get_account_data(&pool)
            .await?
            .ok_or_else(|| anyhow!("lb pair account {pool} not found"))?;
        let state = LbPairState::decode(&data).context("failed to decode lb pair account")?;

        let decimals_x = fetch_mint_decimals(&provider, &state.token_x_mint).await?;
        let decimals_y = fetch_mint_decimals(&provider, &state.token_y_mint).await?;

        debug!(
            pool = %pool,
            token_x = %state.token_x_mint,
            token_y = %state.token_y_mint,
            bin_step_bps = state.bin_step_bps,
            "Connected to DLMM pool"
        );

        Ok(Self {
            provider,
            pool,
            program_id: LB_CLMM_PROGRAM_ID,
            token_x: TokenInfo::new(state.token_x_mint, decimals_x),
            token_y: TokenInfo::new(state.token_y_mint, decimals_y),
            bin_step_bps: state.bin_step_bps,
            base_factor: state.base_factor,
            protocol_share_bps: state.protocol_share_bps,
            reserve_x: state.reserve_x,
            reserve_y: state.reserve_y,
        })
    }

    async fn pair_state(&self) -> Result<LbPairState> {
        let data = self
            .provider
            .get_account_data(&self.pool)
            .await?
            .ok_or_else(|| anyhow!("lb pair account {} not found", self.pool))?;
        LbPairState::decode(&data)
    }

    /// Raw bin price: each bin step multiplies the price by `1 + step/10000`.
    fn bin_price(&self, bin_id: i32) -> f64 {
        (1.0 + f64::from(self.bin_step_bps) / 10_000.0).powi(bin_id)
    }

    /// Bin price adjusted from per-lamport to per-token display units.
    fn bin_price_per_token(&self, bin_id: i32) -> f64 {
        let decimal_diff = i32::from(self.token_x.decimals) - i32::from(self.token_y.decimals);
        self.bin_price(bin_id) * 10f64.powi(decimal_diff)
    }

    fn derive_bin_array(&self, array_index: i32) -> Pubkey {
        let (address, _bump) = Pubkey::find_program_address(
            &[
                b"bin_array",
                self.pool.as_ref(),
                &i64::from(array_index).to_le_bytes(),
            ],
            &self.program_id,
        );
        address
    }

    /// Fetches and decodes the bin records covering `[lower, upper]`.
    ///
    /// Arrays missing on chain contribute no records; callers fall back to
    /// their degraded paths when a bin is absent.
    async fn fetch_bins(&self, lower_bin_id: i32, upper_bin_id: i32) -> Result<HashMap<i32, BinState>> {
        let mut bins = HashMap::new();
        let lower_array = lower_bin_id.div_euclid(BINS_PER_ARRAY);
        let upper_array = upper_bin_id.div_euclid(BINS_PER_ARRAY);

        for array_index in lower_array..=upper_array {
            let address = self.derive_bin_array(array_index);
            let Some(data) = self.provider.get_account_data(&address).await? else {
                debug!(array_index, "bin array not initialized, skipping");
                continue;
            };
            for slot in 0..BINS_PER_ARRAY {
                let bin_id = array_index * BINS_PER_ARRAY + slot;
                if bin_id < lower_bin_id || bin_id > upper_bin_id {
                    continue;
                }
                let base = BIN_ARRAY_HEADER_LEN + slot as usize * BIN_RECORD_LEN;
                bins.insert(
                    bin_id,
                    BinState {
                        amount_x: read_u64(&data, base + BIN_AMOUNT_X_OFFSET)?,
                        amount_y: read_u64(&data, base + BIN_AMOUNT_Y_OFFSET)?,
                        liquidity_supply: read_u128(&data, base + BIN_LIQUIDITY_SUPPLY_OFFSET)?,
                    },
                );
            }
        }
        Ok(bins)
    }

    fn active_bin_from_state(&self, active_id: i32, bin: BinState) -> ActiveBin {
        ActiveBin {
            bin_id: active_id,
            price: self.bin_price(active_id),
            price_per_token: self.bin_price_per_token(active_id),
            x_amount: bin.amount_x,
            y_amount: bin.amount_y,
        }
    }

    /// Structures one position account into the raw snapshot form and
    /// validates it through the domain model.
    fn decode_position(
        &self,
        address: &Pubkey,
        data: &[u8],
        bins: &HashMap<i32, BinState>,
    ) -> Result<Position> {
        let lower_bin_id = read_i32(data, POSITION_LOWER_BIN_OFFSET)?;
        let upper_bin_id = read_i32(data, POSITION_UPPER_BIN_OFFSET)?;
        let owner = read_pubkey(data, POSITION_OWNER_OFFSET)?;

        let mut fee_x: u128 = 0;
        let mut fee_y: u128 = 0;
        let mut reward_one: u128 = 0;
        let mut reward_two: u128 = 0;
        let mut bin_data = Vec::new();
        let mut total_x = 0f64;
        let mut total_y = 0f64;

        let slots = (upper_bin_id - lower_bin_id + 1).max(0) as usize;
        for slot in 0..slots {
            let bin_id = lower_bin_id + slot as i32;

            let fee_base = POSITION_FEE_INFOS_OFFSET + slot * FEE_INFO_LEN;
            fee_x += u128::from(read_u64(data, fee_base + FEE_X_PENDING_OFFSET)?);
            fee_y += u128::from(read_u64(data, fee_base + FEE_Y_PENDING_OFFSET)?);

            let reward_base =
                POSITION_REWARD_INFOS_OFFSET + slot * REWARD_INFO_LEN + REWARD_PENDINGS_OFFSET;
            reward_one += u128::from(read_u64(data, reward_base)?);
            reward_two += u128::from(read_u64(data, reward_base + 8)?);

            let share = read_u128(data, POSITION_SHARES_OFFSET + slot * 16)?;
            if share == 0 {
                continue;
            }
            let state = bins.get(&bin_id).copied().unwrap_or_default();
            let (x_amount, y_amount) = if state.liquidity_supply == 0 {
                (0.0, 0.0)
            } else {
                let fraction = share as f64 / state.liquidity_supply as f64;
                (
                    fraction * state.amount_x as f64 / self.token_x.unit_scale(),
                    fraction * state.amount_y as f64 / self.token_y.unit_scale(),
                )
            };
            total_x += x_amount;
            total_y += y_amount;
            bin_data.push(RawBinData {
                bin_id: Some(bin_id),
                x_amount: Some(format!("{x_amount}")),
                y_amount: Some(format!("{y_amount}")),
                bin_liquidity: Some(format!("{share}")),
                price_per_token: Some(format!("{}", self.bin_price_per_token(bin_id))),
            });
        }

        let raw = RawPosition {
            public_key: Some(address.to_string()),
            version: Some(2),
            position_data: Some(RawPositionData {
                total_x_amount: Some(format!("{total_x}")),
                total_y_amount: Some(format!("{total_y}")),
                position_bin_data: bin_data,
                fee_x: Some(to_hex_counter(fee_x)),
                fee_y: Some(to_hex_counter(fee_y)),
                reward_one: Some(to_hex_counter(reward_one)),
                reward_two: Some(to_hex_counter(reward_two)),
                lower_bin_id: Some(lower_bin_id),
                upper_bin_id: Some(upper_bin_id),
                fee_owner: Some(owner.to_string()),
            }),
        };
        Position::from_raw(raw).map_err(Into::into)
    }
}

#[async_trait]
impl DlmmClient for MeteoraDlmm {
    fn pool_address(&self) -> Pubkey {
        self.pool
    }

    fn token_x(&self) -> TokenInfo {
        self.token_x
    }

    fn token_y(&self) -> TokenInfo {
        self.token_y
    }

    async fn get_active_bin(&self) -> Result<ActiveBin> {
        let state = self.pair_state().await?;
        let bins = self.fetch_bins(state.active_id, state.active_id).await?;
        let bin = bins.get(&state.active_id).copied().unwrap_or_default();
        Ok(self.active_bin_from_state(state.active_id, bin))
    }

    async fn get_positions_by_user_and_pool(&self, owner: &Pubkey) -> Result<UserPositions> {
        let filters = vec![
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                POSITION_LB_PAIR_OFFSET,
                self.pool.as_ref(),
            )),
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                POSITION_OWNER_OFFSET,
                owner.as_ref(),
            )),
        ];
        let config = RpcProgramAccountsConfig {
            filters: Some(filters),
            ..RpcProgramAccountsConfig::default()
        };
        let accounts = self
            .provider
            .client()
            .get_program_accounts_with_config(&self.program_id, config)
            .await
            .context("failed to query position accounts")?;

        let state = self.pair_state().await?;
        let mut positions = Vec::with_capacity(accounts.len());
        for (address, account) in accounts {
            let lower = read_i32(&account.data, POSITION_LOWER_BIN_OFFSET)?;
            let upper = read_i32(&account.data, POSITION_UPPER_BIN_OFFSET)?;
            let bins = self.fetch_bins(lower, upper).await?;
            positions.push(self.decode_position(&address, &account.data, &bins)?);
        }

        let active = self.fetch_bins(state.active_id, state.active_id).await?;
        let active_bin = self.active_bin_from_state(
            state.active_id,
            active.get(&state.active_id).copied().unwrap_or_default(),
        );
        Ok(UserPositions {
            active_bin,
            positions,
        })
    }

    async fn get_bins_between(
        &self,
        lower_bin_id: i32,
        upper_bin_id: i32,
    ) -> Result<BinRangeSnapshot> {
        let state = self.pair_state().await?;
        let bins = self.fetch_bins(lower_bin_id, upper_bin_id).await?;

        let mut liquidity: Vec<BinLiquidity> = bins
            .iter()
            .map(|(bin_id, bin)| BinLiquidity {
                bin_id: *bin_id,
                price_per_token: self.bin_price_per_token(*bin_id),
                supply: format!("{}", bin.liquidity_supply),
                x_amount: bin.amount_x,
                y_amount: bin.amount_y,
            })
            .collect();
        liquidity.sort_by_key(|b| b.bin_id);

        let active = bins.get(&state.active_id).copied().unwrap_or_default();
        Ok(BinRangeSnapshot {
            active_bin: self.active_bin_from_state(state.active_id, active),
            bins: liquidity,
        })
    }

    async fn get_bin_arrays_for_swap(&self, direction: SwapDirection) -> Result<Vec<Pubkey>> {
        let state = self.pair_state().await?;
        let active_array = state.active_id.div_euclid(BINS_PER_ARRAY);
        // A swap walks away from the active array in the direction of
        // consumption; three arrays cover any realistic single swap.
        let indexes = match direction {
            SwapDirection::YToX => [active_array, active_array + 1, active_array + 2],
            SwapDirection::XToY => [active_array, active_array - 1, active_array - 2],
        };
        Ok(indexes
            .iter()
            .map(|index| self.derive_bin_array(*index))
            .collect())
    }

    async fn quote_swap(
        &self,
        amount_in: u64,
        direction: SwapDirection,
        slippage_bps: u16,
        bin_arrays: &[Pubkey],
    ) -> Result<SwapQuote> {
        let state = self.pair_state().await?;
        let price = self.bin_price(state.active_id);

        // Single-active-bin approximation; the program computes the exact
        // multi-bin fill, this quote only sizes the slippage floor.
        let gross_out = match direction {
            SwapDirection::XToY => amount_in as f64 * price,
            SwapDirection::YToX => amount_in as f64 / price,
        };
        // Base fee rate: base factor times bin step, in hundred-millionths.
        let fee_rate =
            f64::from(self.base_factor) * f64::from(self.bin_step_bps) / 100_000_000.0;
        let fee = gross_out * fee_rate;
        let protocol_fee = fee * f64::from(self.protocol_share_bps) / 10_000.0;
        let net_out = (gross_out - fee).max(0.0);
        let min_out = net_out * (1.0 - f64::from(slippage_bps) / 10_000.0);

        if net_out < 1.0 {
            warn!(amount_in, "swap quote rounds to zero output");
        }

        Ok(SwapQuote {
            consumed_in_amount: amount_in,
            out_amount: net_out as u64,
            fee: fee as u64,
            protocol_fee: protocol_fee as u64,
            min_out_amount: min_out as u64,
            price_impact: 0.0,
            end_price: self.bin_price_per_token(state.active_id),
            bin_arrays_pubkey: bin_arrays.to_vec(),
        })
    }

    async fn build_swap(
        &self,
        owner: &Pubkey,
        quote: &SwapQuote,
        direction: SwapDirection,
    ) -> Result<Vec<Instruction>> {
        let (in_mint, out_mint) = match direction {
            SwapDirection::XToY => (self.token_x.mint, self.token_y.mint),
            SwapDirection::YToX => (self.token_y.mint, self.token_x.mint),
        };
        // Both ATAs must exist before the program touches them, and a native
        // SOL input must be wrapped into the WSOL ATA first.
        let mut instruction_set = vec![
            create_ata_idempotent(owner, owner, &in_mint),
            create_ata_idempotent(owner, owner, &out_mint),
        ];
        if in_mint == WSOL_MINT {
            instruction_set.extend(wrap_sol(owner, quote.consumed_in_amount)?);
        }
        instruction_set.push(instructions::swap(
            &self.pool,
            owner,
            &self.token_x,
            &self.token_y,
            &self.reserve_x,
            &self.reserve_y,
            quote,
            direction,
        ));
        Ok(instruction_set)
    }

    async fn build_create_position_and_add_liquidity(
        &self,
        position: &Pubkey,
        owner: &Pubkey,
        x_amount: u64,
        y_amount: u64,
        strategy: &StrategyParameters,
    ) -> Result<Vec<Instruction>> {
        let state = self.pair_state().await?;
        let mut instruction_set = vec![
            create_ata_idempotent(owner, owner, &self.token_x.mint),
            create_ata_idempotent(owner, owner, &self.token_y.mint),
        ];
        if self.token_x.mint == WSOL_MINT && x_amount > 0 {
            instruction_set.extend(wrap_sol(owner, x_amount)?);
        }
        if self.token_y.mint == WSOL_MINT && y_amount > 0 {
            instruction_set.extend(wrap_sol(owner, y_amount)?);
        }
        instruction_set.push(instructions::initialize_position_and_add_liquidity(
            &self.pool,
            position,
            owner,
            &self.token_x,
            &self.token_y,
            &self.reserve_x,
            &self.reserve_y,
            x_amount,
            y_amount,
            state.active_id,
            strategy,
        ));
        Ok(instruction_set)
    }

    async fn build_remove_liquidity(
        &self,
        position: &Pubkey,
        owner: &Pubkey,
        bin_ids: &[i32],
        bps_to_remove: u16,
        claim_rewards: bool,
    ) -> Result<Vec<Vec<Instruction>>> {
        let mut transactions = Vec::new();
        for (from_bin, to_bin) in contiguous_ranges(bin_ids) {
            let mut instruction_set = vec![instructions::remove_liquidity_by_range(
                &self.pool,
                position,
                owner,
                &self.token_x,
                &self.token_y,
                &self.reserve_x,
                &self.reserve_y,
                from_bin,
                to_bin,
                bps_to_remove,
            )];
            if claim_rewards {
                instruction_set.push(instructions::claim_fee(
                    &self.pool,
                    position,
                    owner,
                    &self.token_x,
                    &self.token_y,
                    &self.reserve_x,
                    &self.reserve_y,
                ));
            }
            transactions.push(instruction_set);
        }
        Ok(transactions)
    }

    async fn build_claim_all_rewards(
        &self,
        owner: &Pubkey,
        positions: &[Position],
    ) -> Result<Vec<Vec<Instruction>>> {
        let mut transactions = Vec::new();
        for position in positions {
            transactions.push(vec![
                instructions::claim_fee(
                    &self.pool,
                    &position.public_key,
                    owner,
                    &self.token_x,
                    &self.token_y,
                    &self.reserve_x,
                    &self.reserve_y,
                ),
                instructions::claim_reward(&self.pool, &position.public_key, owner, 0),
                instructions::claim_reward(&self.pool, &position.public_key, owner, 1),
            ]);
        }
        Ok(transactions)
    }
}

/// Splits a sorted bin-id list into inclusive contiguous ranges.
fn contiguous_ranges(bin_ids: &[i32]) -> Vec<(i32, i32)> {
    let mut sorted = bin_ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return ranges;
    };
    let (mut start, mut end) = (first, first);
    for bin_id in iter {
        if bin_id == end + 1 {
            end = bin_id;
        } else {
            ranges.push((start, end));
            start = bin_id;
            end = bin_id;
        }
    }
    ranges.push((start, end));
    ranges
}

async fn fetch_mint_decimals(provider: &RpcProvider, mint: &Pubkey) -> Result<u8> {
    let data = provider
        .get_account_data(mint)
        .await?
        .ok_or_else(|| anyhow!("mint account {mint} not found"))?;
    data.get(MINT_DECIMALS_OFFSET)
        .copied()
        .ok_or_else(|| anyhow!("mint account {mint} too short"))
}

fn to_hex_counter(value: u128) -> String {
    if value == 0 {
        "00".to_string()
    } else {
        format!("{value:x}")
    }
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    let bytes = data
        .get(offset..offset + 2)
        .ok_or_else(|| anyhow!("account data truncated at offset {offset}"))?;
    Ok(u16::from_le_bytes(bytes.try_into()?))
}

fn read_i32(data: &[u8], offset: usize) -> Result<i32> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or_else(|| anyhow!("account data truncated at offset {offset}"))?;
    Ok(i32::from_le_bytes(bytes.try_into()?))
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    let bytes = data
        .get(offset..offset + 8)
        .ok_or_else(|| anyhow!("account data truncated at offset {offset}"))?;
    Ok(u64::from_le_bytes(bytes.try_into()?))
}

fn read_u128(data: &[u8], offset: usize) -> Result<u128> {
    let bytes = data
        .get(offset..offset + 16)
        .ok_or_else(|| anyhow!("account data truncated at offset {offset}"))?;
    Ok(u128::from_le_bytes(bytes.try_into()?))
}

fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey> {
    let bytes = data
        .get(offset..offset + 32)
        .ok_or_else(|| anyhow!("account data truncated at offset {offset}"))?;
    Ok(Pubkey::try_from(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_ranges_groups_adjacent_bins() {
        assert_eq!(
            contiguous_ranges(&[3, 1, 2, 7, 8, 10]),
            vec![(1, 3), (7, 8), (10, 10)]
        );
        assert!(contiguous_ranges(&[]).is_empty());
        assert_eq!(contiguous_ranges(&[5, 5, 5]), vec![(5, 5)]);
    }

    #[test]
    fn hex_counter_uses_zero_sentinel() {
        assert_eq!(to_hex_counter(0), "00");
        assert_eq!(to_hex_counter(20_000), "4e20");
    }

    #[test]
    fn field_readers_reject_truncated_data() {
        let data = [0u8; 4];
        assert!(read_i32(&data, 0).is_ok());
        assert!(read_i32(&data, 2).is_err());
        assert!(read_pubkey(&data, 0).is_err());
    }
}
