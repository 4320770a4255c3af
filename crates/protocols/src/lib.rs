//! Chain and DLMM client surfaces.
//!
//! The lifecycle core talks to the outside world through two async traits:
//! [`rpc::ChainClient`] for the raw RPC transport and [`DlmmClient`] for the
//! DLMM pool's query and instruction-building surface. Production
//! implementations live here ([`rpc::RpcProvider`], [`meteora::MeteoraDlmm`]);
//! tests substitute mocks.

pub mod meteora;
pub mod rpc;

use anyhow::Result;
use async_trait::async_trait;
use dlmm_lp_domain::{
    ActiveBin, BinRangeSnapshot, Position, StrategyParameters, SwapDirection, SwapQuote, TokenInfo,
    UserPositions,
};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

/// Query and instruction-building surface of one DLMM pool.
///
/// Builders return ready-to-sign instruction sets; the transaction submitter
/// owns compute budget, blockhash and signing. Any operation may fail with a
/// transport-level error, which callers treat as retryable at the step level.
#[async_trait]
pub trait DlmmClient: Send + Sync {
    /// Address of the pool this client is bound to.
    fn pool_address(&self) -> Pubkey;

    /// Metadata of pool token X.
    fn token_x(&self) -> TokenInfo;

    /// Metadata of pool token Y.
    fn token_y(&self) -> TokenInfo;

    /// Fetches the bin currently containing the traded price.
    async fn get_active_bin(&self) -> Result<ActiveBin>;

    /// Fetches all positions of `owner` in this pool.
    async fn get_positions_by_user_and_pool(&self, owner: &Pubkey) -> Result<UserPositions>;

    /// Fetches per-bin liquidity between two bin ids, inclusive.
    async fn get_bins_between(
        &self,
        lower_bin_id: i32,
        upper_bin_id: i32,
    ) -> Result<BinRangeSnapshot>;

    /// Bin arrays a swap in `direction` will traverse.
    async fn get_bin_arrays_for_swap(&self, direction: SwapDirection) -> Result<Vec<Pubkey>>;

    /// Quotes a swap against the given bin arrays.
    async fn quote_swap(
        &self,
        amount_in: u64,
        direction: SwapDirection,
        slippage_bps: u16,
        bin_arrays: &[Pubkey],
    ) -> Result<SwapQuote>;

    /// Builds the swap instructions for a fresh quote.
    async fn build_swap(
        &self,
        owner: &Pubkey,
        quote: &SwapQuote,
        direction: SwapDirection,
    ) -> Result<Vec<Instruction>>;

    /// Builds the create-position-and-add-liquidity instructions. The position
    /// account is generated client-side and must co-sign the transaction.
    async fn build_create_position_and_add_liquidity(
        &self,
        position: &Pubkey,
        owner: &Pubkey,
        x_amount: u64,
        y_amount: u64,
        strategy: &StrategyParameters,
    ) -> Result<Vec<Instruction>>;

    /// Builds the remove-liquidity transactions over `bin_ids`, one
    /// instruction set per transaction to submit and confirm in order.
    async fn build_remove_liquidity(
        &self,
        position: &Pubkey,
        owner: &Pubkey,
        bin_ids: &[i32],
        bps_to_remove: u16,
        claim_rewards: bool,
    ) -> Result<Vec<Vec<Instruction>>>;

    /// Builds reward-claim transactions for the given positions.
    async fn build_claim_all_rewards(
        &self,
        owner: &Pubkey,
        positions: &[Position],
    ) -> Result<Vec<Vec<Instruction>>>;
}
