//! LB CLMM instruction builders.
//!
//! Anchor instructions: an 8-byte discriminator followed by the borsh-encoded
//! arguments. Account lists carry the core accounts; bin arrays covering the
//! touched range are appended as remaining accounts by the callers that know
//! them.

use crate::rpc::{SYSTEM_PROGRAM_ID, derive_ata};
use dlmm_lp_domain::{StrategyParameters, StrategyType, SwapDirection, SwapQuote, TokenInfo};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::LB_CLMM_PROGRAM_ID;

// Anchor discriminators: sha256("global:<name>")[..8].
const SWAP_DISCRIMINATOR: [u8; 8] = [0xf8, 0xc6, 0x9e, 0x91, 0xe1, 0x75, 0x87, 0xc8];
const INIT_POSITION_AND_ADD_BY_STRATEGY_DISCRIMINATOR: [u8; 8] =
    [0x07, 0x04, 0xb0, 0x82, 0x0f, 0xc5, 0xb5, 0x4b];
const REMOVE_LIQUIDITY_BY_RANGE_DISCRIMINATOR: [u8; 8] =
    [0x1a, 0x52, 0x6f, 0x80, 0xd9, 0xac, 0x34, 0x74];
const CLAIM_FEE_DISCRIMINATOR: [u8; 8] = [0xa9, 0x20, 0x4f, 0x89, 0x88, 0xe8, 0x46, 0x89];
const CLAIM_REWARD_DISCRIMINATOR: [u8; 8] = [0x95, 0x5b, 0x3f, 0x94, 0x6c, 0xe1, 0xd5, 0x57];

fn strategy_type_tag(strategy_type: StrategyType) -> u8 {
    match strategy_type {
        StrategyType::SpotBalanced => 0,
        StrategyType::CurveBalanced => 1,
        StrategyType::BidAsk => 2,
    }
}

/// Builds a swap consuming `quote.consumed_in_amount` of the input token.
#[allow(clippy::too_many_arguments)]
pub fn swap(
    pool: &Pubkey,
    owner: &Pubkey,
    token_x: &TokenInfo,
    token_y: &TokenInfo,
    reserve_x: &Pubkey,
    reserve_y: &Pubkey,
    quote: &SwapQuote,
    direction: SwapDirection,
) -> Instruction {
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(&SWAP_DISCRIMINATOR);
    data.extend_from_slice(&quote.consumed_in_amount.to_le_bytes());
    data.extend_from_slice(&quote.min_out_amount.to_le_bytes());

    let (user_token_in, user_token_out) = match direction {
        SwapDirection::XToY => (
            derive_ata(owner, &token_x.mint),
            derive_ata(owner, &token_y.mint),
        ),
        SwapDirection::YToX => (
            derive_ata(owner, &token_y.mint),
            derive_ata(owner, &token_x.mint),
        ),
    };

    let mut accounts = vec![
        AccountMeta::new(*pool, false),                    // lb_pair
        AccountMeta::new(*reserve_x, false),               // reserve_x
        AccountMeta::new(*reserve_y, false),               // reserve_y
        AccountMeta::new(user_token_in, false),            // user_token_in
        AccountMeta::new(user_token_out, false),           // user_token_out
        AccountMeta::new_readonly(token_x.mint, false),    // token_x_mint
        AccountMeta::new_readonly(token_y.mint, false),    // token_y_mint
        AccountMeta::new_readonly(*owner, true),           // user
        AccountMeta::new_readonly(spl_token::id(), false), // token_program
    ];
    // Bin arrays the swap traverses, in traversal order.
    accounts.extend(
        quote
            .bin_arrays_pubkey
            .iter()
            .map(|array| AccountMeta::new(*array, false)),
    );

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts,
        data,
    }
}

/// Builds the combined create-position / add-liquidity-by-strategy
/// instruction. The new position account co-signs.
#[allow(clippy::too_many_arguments)]
pub fn initialize_position_and_add_liquidity(
    pool: &Pubkey,
    position: &Pubkey,
    owner: &Pubkey,
    token_x: &TokenInfo,
    token_y: &TokenInfo,
    reserve_x: &Pubkey,
    reserve_y: &Pubkey,
    x_amount: u64,
    y_amount: u64,
    active_id: i32,
    strategy: &StrategyParameters,
) -> Instruction {
    let mut data = Vec::with_capacity(37);
    data.extend_from_slice(&INIT_POSITION_AND_ADD_BY_STRATEGY_DISCRIMINATOR);
    data.extend_from_slice(&x_amount.to_le_bytes());
    data.extend_from_slice(&y_amount.to_le_bytes());
    data.extend_from_slice(&active_id.to_le_bytes());
    data.extend_from_slice(&strategy.min_bin_id.to_le_bytes());
    data.extend_from_slice(&strategy.max_bin_id.to_le_bytes());
    data.push(strategy_type_tag(strategy.strategy_type));

    let accounts = vec![
        AccountMeta::new(*position, true),                 // position (new account)
        AccountMeta::new(*pool, false),                    // lb_pair
        AccountMeta::new(derive_ata(owner, &token_x.mint), false), // user_token_x
        AccountMeta::new(derive_ata(owner, &token_y.mint), false), // user_token_y
        AccountMeta::new(*reserve_x, false),               // reserve_x
        AccountMeta::new(*reserve_y, false),               // reserve_y
        AccountMeta::new_readonly(token_x.mint, false),    // token_x_mint
        AccountMeta::new_readonly(token_y.mint, false),    // token_y_mint
        AccountMeta::new(*owner, true),                    // owner / rent payer
        AccountMeta::new_readonly(spl_token::id(), false), // token_program
        AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false), // system_program
        // Bin arrays covering [min_bin_id, max_bin_id] appended by the program's
        // account resolution.
    ];

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts,
        data,
    }
}

/// Builds a remove-liquidity instruction over an inclusive bin range.
#[allow(clippy::too_many_arguments)]
pub fn remove_liquidity_by_range(
    pool: &Pubkey,
    position: &Pubkey,
    owner: &Pubkey,
    token_x: &TokenInfo,
    token_y: &TokenInfo,
    reserve_x: &Pubkey,
    reserve_y: &Pubkey,
    from_bin_id: i32,
    to_bin_id: i32,
    bps_to_remove: u16,
) -> Instruction {
    let mut data = Vec::with_capacity(18);
    data.extend_from_slice(&REMOVE_LIQUIDITY_BY_RANGE_DISCRIMINATOR);
    data.extend_from_slice(&from_bin_id.to_le_bytes());
    data.extend_from_slice(&to_bin_id.to_le_bytes());
    data.extend_from_slice(&bps_to_remove.to_le_bytes());

    let accounts = vec![
        AccountMeta::new(*position, false),                // position
        AccountMeta::new(*pool, false),                    // lb_pair
        AccountMeta::new(derive_ata(owner, &token_x.mint), false), // user_token_x
        AccountMeta::new(derive_ata(owner, &token_y.mint), false), // user_token_y
        AccountMeta::new(*reserve_x, false),               // reserve_x
        AccountMeta::new(*reserve_y, false),               // reserve_y
        AccountMeta::new_readonly(token_x.mint, false),    // token_x_mint
        AccountMeta::new_readonly(token_y.mint, false),    // token_y_mint
        AccountMeta::new_readonly(*owner, true),           // owner
        AccountMeta::new_readonly(spl_token::id(), false), // token_program
        // Bin arrays covering [from_bin_id, to_bin_id] appended by the
        // program's account resolution.
    ];

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts,
        data,
    }
}

/// Builds a claim of the accrued swap fees of a position.
pub fn claim_fee(
    pool: &Pubkey,
    position: &Pubkey,
    owner: &Pubkey,
    token_x: &TokenInfo,
    token_y: &TokenInfo,
    reserve_x: &Pubkey,
    reserve_y: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*pool, false),                    // lb_pair
        AccountMeta::new(*position, false),                // position
        AccountMeta::new(derive_ata(owner, &token_x.mint), false), // user_token_x
        AccountMeta::new(derive_ata(owner, &token_y.mint), false), // user_token_y
        AccountMeta::new(*reserve_x, false),               // reserve_x
        AccountMeta::new(*reserve_y, false),               // reserve_y
        AccountMeta::new_readonly(token_x.mint, false),    // token_x_mint
        AccountMeta::new_readonly(token_y.mint, false),    // token_y_mint
        AccountMeta::new_readonly(*owner, true),           // owner
        AccountMeta::new_readonly(spl_token::id(), false), // token_program
    ];

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts,
        data: CLAIM_FEE_DISCRIMINATOR.to_vec(),
    }
}

/// Builds a claim of one liquidity-mining reward slot.
pub fn claim_reward(pool: &Pubkey, position: &Pubkey, owner: &Pubkey, reward_index: u64) -> Instruction {
    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&CLAIM_REWARD_DISCRIMINATOR);
    data.extend_from_slice(&reward_index.to_le_bytes());

    let accounts = vec![
        AccountMeta::new(*pool, false),                    // lb_pair
        AccountMeta::new(*position, false),                // position
        AccountMeta::new_readonly(*owner, true),           // owner
        AccountMeta::new_readonly(spl_token::id(), false), // token_program
        // Reward vault and user reward token account resolved from the pair's
        // reward info for `reward_index`.
    ];

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_position_instruction_requires_position_signature() {
        let pool = Pubkey::new_unique();
        let position = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let token_x = TokenInfo::new(Pubkey::new_unique(), 9);
        let token_y = TokenInfo::new(Pubkey::new_unique(), 6);
        let strategy = StrategyParameters::new(
            -10,
            10,
            StrategyType::SpotBalanced,
        );

        let ix = initialize_position_and_add_liquidity(
            &pool,
            &position,
            &owner,
            &token_x,
            &token_y,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            1_000,
            2_000,
            0,
            &strategy,
        );

        assert_eq!(ix.program_id, LB_CLMM_PROGRAM_ID);
        let position_meta = ix
            .accounts
            .iter()
            .find(|meta| meta.pubkey == position)
            .unwrap();
        assert!(position_meta.is_signer);
    }

    #[test]
    fn remove_liquidity_encodes_range_and_bps() {
        let token = TokenInfo::new(Pubkey::new_unique(), 6);
        let ix = remove_liquidity_by_range(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &token,
            &token,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            -5,
            5,
            10_000,
        );
        assert_eq!(&ix.data[..8], &REMOVE_LIQUIDITY_BY_RANGE_DISCRIMINATOR);
        assert_eq!(&ix.data[8..12], &(-5i32).to_le_bytes());
        assert_eq!(&ix.data[12..16], &5i32.to_le_bytes());
        assert_eq!(&ix.data[16..18], &10_000u16.to_le_bytes());
    }

    #[test]
    fn swap_appends_bin_arrays_as_remaining_accounts() {
        let token_x = TokenInfo::new(Pubkey::new_unique(), 9);
        let token_y = TokenInfo::new(Pubkey::new_unique(), 6);
        let arrays = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let quote = SwapQuote {
            consumed_in_amount: 500,
            out_amount: 100,
            fee: 1,
            protocol_fee: 0,
            min_out_amount: 90,
            price_impact: 0.0,
            end_price: 0.2,
            bin_arrays_pubkey: arrays.clone(),
        };
        let ix = swap(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &token_x,
            &token_y,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &quote,
            SwapDirection::YToX,
        );
        let tail: Vec<Pubkey> = ix.accounts[ix.accounts.len() - 2..]
            .iter()
            .map(|meta| meta.pubkey)
            .collect();
        assert_eq!(tail, arrays);
    }
}
