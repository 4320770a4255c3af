//! End-to-end lifecycle runs against mock chain and pool clients.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use dlmm_lp_domain::{
    ActiveBin, BinRangeSnapshot, Position, RawBinData, RawPosition, RawPositionData,
    StrategyParameters, SwapDirection, SwapQuote, TokenInfo, USDC_MINT, UserPositions,
};
use dlmm_lp_execution::lifecycle::{ExitReason, LifecycleConfig, LifecycleState};
use dlmm_lp_execution::{PositionLifecycle, Wallet};
use dlmm_lp_protocols::DlmmClient;
use dlmm_lp_protocols::rpc::ChainClient;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct MockChain {
    native_balance: u64,
    token_balance: u64,
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, _owner: &Pubkey) -> Result<u64> {
        Ok(self.native_balance)
    }

    async fn get_token_balance(&self, _token_account: &Pubkey) -> Result<u64> {
        Ok(self.token_balance)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::default())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        Ok(transaction.signatures[0])
    }

    async fn confirm_transaction(&self, _signature: &Signature) -> Result<bool> {
        Ok(true)
    }

    async fn account_exists(&self, _address: &Pubkey) -> Result<bool> {
        Ok(true)
    }
}

struct MockPool {
    pool: Pubkey,
    token_x: TokenInfo,
    token_y: TokenInfo,
    active_bin_id: i32,
    price: f64,
    /// Fee counter returned per position fetch, last entry repeating.
    fee_schedule: Vec<&'static str>,
    /// Hides the position from fetches even after creation.
    hide_position: bool,
    /// Makes every active-bin query fail, as a degraded RPC would.
    fail_active_bin: bool,
    fetches: AtomicUsize,
    swaps: AtomicUsize,
    created: Mutex<Option<Pubkey>>,
    deposit: Mutex<Option<(u64, u64)>>,
    strategy_range: Mutex<Option<(i32, i32)>>,
    removed: AtomicBool,
}

impl MockPool {
    fn usdc_quoted(fee_schedule: Vec<&'static str>) -> Self {
        Self {
            pool: Pubkey::new_unique(),
            token_x: TokenInfo::new(Pubkey::new_unique(), 9),
            token_y: TokenInfo::new(USDC_MINT, 6),
            active_bin_id: 1_250,
            price: 0.2,
            fee_schedule,
            hide_position: false,
            fail_active_bin: false,
            fetches: AtomicUsize::new(0),
            swaps: AtomicUsize::new(0),
            created: Mutex::new(None),
            deposit: Mutex::new(None),
            strategy_range: Mutex::new(None),
            removed: AtomicBool::new(false),
        }
    }

    fn active_bin(&self) -> ActiveBin {
        ActiveBin {
            bin_id: self.active_bin_id,
            price: self.price,
            price_per_token: self.price,
            x_amount: 1_000_000,
            y_amount: 200_000,
        }
    }

    fn position_snapshot(&self, key: Pubkey, fee_x: &str) -> Position {
        let bin = RawBinData {
            bin_id: Some(self.active_bin_id),
            x_amount: Some("10.0".to_string()),
            y_amount: Some("2.0".to_string()),
            bin_liquidity: Some("100.0".to_string()),
            price_per_token: Some("0.2".to_string()),
        };
        Position::from_raw(RawPosition {
            public_key: Some(key.to_string()),
            version: Some(2),
            position_data: Some(RawPositionData {
                total_x_amount: Some("10.0".to_string()),
                total_y_amount: Some("2.0".to_string()),
                position_bin_data: vec![bin],
                fee_x: Some(fee_x.to_string()),
                fee_y: Some("00".to_string()),
                reward_one: Some("00".to_string()),
                reward_two: Some("00".to_string()),
                lower_bin_id: Some(self.active_bin_id),
                upper_bin_id: Some(self.active_bin_id),
                fee_owner: Some(Pubkey::new_unique().to_string()),
            }),
        })
        .expect("mock snapshot must be valid")
    }

    fn dummy_instruction(&self) -> Instruction {
        Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![AccountMeta::new(Pubkey::new_unique(), false)],
            data: vec![0],
        }
    }
}

#[async_trait]
impl DlmmClient for MockPool {
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
        if self.fail_active_bin {
            return Err(anyhow!("active bin query timed out"));
        }
        Ok(self.active_bin())
    }

    async fn get_positions_by_user_and_pool(&self, _owner: &Pubkey) -> Result<UserPositions> {
        let created = *self.created.lock().map_err(|_| anyhow!("lock poisoned"))?;
        let positions = match created {
            Some(key) if !self.hide_position && !self.removed.load(Ordering::SeqCst) => {
                let fetch = self.fetches.fetch_add(1, Ordering::SeqCst);
                let fee_x = self.fee_schedule[fetch.min(self.fee_schedule.len() - 1)];
                vec![self.position_snapshot(key, fee_x)]
            }
            _ => vec![],
        };
        Ok(UserPositions {
            active_bin: self.active_bin(),
            positions,
        })
    }

    async fn get_bins_between(
        &self,
        _lower_bin_id: i32,
        _upper_bin_id: i32,
    ) -> Result<BinRangeSnapshot> {
        Ok(BinRangeSnapshot {
            active_bin: self.active_bin(),
            bins: vec![],
        })
    }

    async fn get_bin_arrays_for_swap(&self, _direction: SwapDirection) -> Result<Vec<Pubkey>> {
        Ok(vec![Pubkey::new_unique()])
    }

    async fn quote_swap(
        &self,
        amount_in: u64,
        _direction: SwapDirection,
        slippage_bps: u16,
        bin_arrays: &[Pubkey],
    ) -> Result<SwapQuote> {
        let out_amount = amount_in * 5;
        Ok(SwapQuote {
            consumed_in_amount: amount_in,
            out_amount,
            fee: 0,
            protocol_fee: 0,
            min_out_amount: out_amount - out_amount * u64::from(slippage_bps) / 10_000,
            price_impact: 0.0,
            end_price: self.price,
            bin_arrays_pubkey: bin_arrays.to_vec(),
        })
    }

    async fn build_swap(
        &self,
        _owner: &Pubkey,
        _quote: &SwapQuote,
        _direction: SwapDirection,
    ) -> Result<Vec<Instruction>> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.dummy_instruction()])
    }

    async fn build_create_position_and_add_liquidity(
        &self,
        position: &Pubkey,
        _owner: &Pubkey,
        x_amount: u64,
        y_amount: u64,
        strategy: &StrategyParameters,
    ) -> Result<Vec<Instruction>> {
        assert!(x_amount > 0, "deposit must carry a primary leg");
        assert!(y_amount > 0, "deposit must carry a counterpart leg");
        *self.created.lock().map_err(|_| anyhow!("lock poisoned"))? = Some(*position);
        *self.deposit.lock().map_err(|_| anyhow!("lock poisoned"))? = Some((x_amount, y_amount));
        *self
            .strategy_range
            .lock()
            .map_err(|_| anyhow!("lock poisoned"))? = Some((strategy.min_bin_id, strategy.max_bin_id));
        let mut instruction = self.dummy_instruction();
        instruction.accounts.push(AccountMeta::new(*position, true));
        Ok(vec![instruction])
    }

    async fn build_remove_liquidity(
        &self,
        _position: &Pubkey,
        _owner: &Pubkey,
        bin_ids: &[i32],
        bps_to_remove: u16,
        _claim_rewards: bool,
    ) -> Result<Vec<Vec<Instruction>>> {
        assert_eq!(bps_to_remove, 10_000);
        assert!(!bin_ids.is_empty());
        self.removed.store(true, Ordering::SeqCst);
        Ok(vec![vec![self.dummy_instruction()]])
    }

    async fn build_claim_all_rewards(
        &self,
        _owner: &Pubkey,
        _positions: &[Position],
    ) -> Result<Vec<Vec<Instruction>>> {
        Ok(vec![vec![self.dummy_instruction()]])
    }
}

fn test_config() -> LifecycleConfig {
    LifecycleConfig {
        investment_usdc: 1.0,
        max_idle_cycles: 3,
        poll_interval: Duration::ZERO,
        remove_retry_delay: Duration::ZERO,
        settle_delay: Duration::ZERO,
        confirm_delay: Duration::ZERO,
        ..LifecycleConfig::default()
    }
}

fn lifecycle(
    chain: MockChain,
    pool: MockPool,
    config: LifecycleConfig,
) -> (PositionLifecycle<MockChain, MockPool>, Arc<MockPool>) {
    let pool = Arc::new(pool);
    let wallet = Arc::new(Wallet::from_keypair(Keypair::new()));
    (
        PositionLifecycle::new(Arc::new(chain), pool.clone(), wallet, config),
        pool,
    )
}

#[tokio::test]
async fn fee_threshold_unwinds_on_the_next_poll() {
    let chain = MockChain {
        native_balance: 1_000_000_000,
        token_balance: 800_000_000,
    };
    // first fetch verifies creation, second crosses the threshold
    let pool = MockPool::usdc_quoted(vec!["00", "4e20"]);
    let (mut lifecycle, pool) = lifecycle(chain, pool, test_config());

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Done);
    assert_eq!(
        report.exit_reason,
        Some(ExitReason::FeeRewardThreshold { total: 20_000 })
    );
    assert!(report.failure.is_none());
    assert_eq!(report.position, *pool.created.lock().unwrap());
    // entry swap plus the swap back
    assert_eq!(pool.swaps.load(Ordering::SeqCst), 2);
    assert!(pool.removed.load(Ordering::SeqCst));

    // 792_000_000 X at 0.2 plus 158_400 Y, both in display units
    let economics = report.economics.expect("a completed run reports its return");
    assert!((economics.entry_value - 0.3168).abs() < 1e-9);
    assert!((economics.exit_value - 4.0).abs() < 1e-9);
    assert_eq!(economics.fees_and_rewards, 20_000);
    assert!(economics.return_pct > 0.0);
    assert!(economics.apy_pct > economics.return_pct);
}

#[tokio::test]
async fn deposit_legs_are_capped_by_the_budget_split() {
    let chain = MockChain {
        native_balance: 1_000_000_000,
        // far more than the one-unit budget could ever place
        token_balance: 10_000_000_000,
    };
    let pool = MockPool::usdc_quoted(vec!["00", "4e20"]);
    let (mut lifecycle, pool) = lifecycle(chain, pool, test_config());

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Done);
    // an even split of 1 USDC at price 0.2 targets 2.5 X and 0.5 USDC;
    // the deposit is those targets buffered, not the wallet balance
    let (x_amount, y_amount) = pool.deposit.lock().unwrap().unwrap();
    assert_eq!(x_amount, 2_475_000_000);
    assert_eq!(y_amount, 495_000);
}

#[tokio::test]
async fn unavailable_active_bin_without_history_fails_the_entry() {
    let chain = MockChain {
        native_balance: 1_000_000_000,
        token_balance: 800_000_000,
    };
    let mut pool = MockPool::usdc_quoted(vec!["00"]);
    pool.fail_active_bin = true;
    let (mut lifecycle, pool) = lifecycle(chain, pool, test_config());

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Failed);
    assert!(report.failure.unwrap().contains("no prior bin is known"));
    assert!(pool.created.lock().unwrap().is_none());
}

#[tokio::test]
async fn unavailable_active_bin_with_history_opens_a_wide_range() {
    let chain = MockChain {
        native_balance: 1_000_000_000,
        token_balance: 800_000_000,
    };
    let mut pool = MockPool::usdc_quoted(vec!["00", "4e20"]);
    pool.fail_active_bin = true;
    let (lifecycle, pool) = lifecycle(chain, pool, test_config());
    let mut lifecycle = lifecycle.with_last_known_bin_id(1_250);

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Done);
    // 100 bins either side of the last known active bin
    assert_eq!(*pool.strategy_range.lock().unwrap(), Some((1_150, 1_350)));
}

#[tokio::test]
async fn sustained_inactivity_unwinds_with_a_distinct_reason() {
    let chain = MockChain {
        native_balance: 1_000_000_000,
        token_balance: 800_000_000,
    };
    // counters never move and the bin amounts never change
    let pool = MockPool::usdc_quoted(vec!["00"]);
    let (mut lifecycle, pool) = lifecycle(chain, pool, test_config());

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Done);
    assert_eq!(
        report.exit_reason,
        Some(ExitReason::Inactivity { idle_cycles: 3 })
    );
    assert!(pool.removed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn unsupported_pool_fails_before_touching_the_chain() {
    let chain = MockChain {
        native_balance: 1_000_000_000,
        token_balance: 800_000_000,
    };
    let mut pool = MockPool::usdc_quoted(vec!["00"]);
    pool.token_y = TokenInfo::new(Pubkey::new_unique(), 6);
    let (mut lifecycle, pool) = lifecycle(chain, pool, test_config());

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Failed);
    assert!(report.failure.unwrap().contains("neither USDC nor SOL"));
    assert!(report.position.is_none());
    assert_eq!(pool.swaps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn depleted_fee_reserve_refuses_the_run() {
    let chain = MockChain {
        native_balance: 10_000,
        token_balance: 800_000_000,
    };
    let pool = MockPool::usdc_quoted(vec!["00"]);
    let (mut lifecycle, _pool) = lifecycle(chain, pool, test_config());

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Failed);
    assert!(report.failure.unwrap().contains("fee reserve"));
}

#[tokio::test]
async fn unverifiable_position_creation_is_fatal() {
    let chain = MockChain {
        native_balance: 1_000_000_000,
        token_balance: 800_000_000,
    };
    let mut pool = MockPool::usdc_quoted(vec!["00"]);
    pool.hide_position = true;
    let (mut lifecycle, _pool) = lifecycle(chain, pool, test_config());

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Failed);
    assert!(report.failure.unwrap().contains("not visible on chain"));
}

#[tokio::test]
async fn missing_investment_for_the_base_asset_is_fatal() {
    let chain = MockChain {
        native_balance: 1_000_000_000,
        token_balance: 800_000_000,
    };
    let pool = MockPool::usdc_quoted(vec!["00"]);
    let config = LifecycleConfig {
        investment_usdc: 0.0,
        ..test_config()
    };
    let (mut lifecycle, _pool) = lifecycle(chain, pool, config);

    let report = lifecycle.run().await;
    assert_eq!(report.final_state, LifecycleState::Failed);
    assert!(report.failure.unwrap().contains("no investment configured"));
}
