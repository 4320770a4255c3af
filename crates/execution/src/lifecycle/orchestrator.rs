//! Drives one position through its lifecycle.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use dlmm_lp_domain::{
    PoolType, Position, StrategyParameters, SwapDirection, WSOL_MINT,
};
use dlmm_lp_protocols::DlmmClient;
use dlmm_lp_protocols::rpc::{ChainClient, spendable_balance};
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityMonitor, snapshot_from_position};
use crate::allocation::{plan_deposit, split_budget, weighted_price};
use crate::lifecycle::{
    ExitReason, LifecycleConfig, LifecycleReport, LifecycleState, PositionEconomics,
    annualized_return, evaluate_exit,
};
use crate::range::{BinRange, fallback_range, range_for_percentage};
use crate::transaction::TransactionSubmitter;
use crate::wallet::Wallet;

/// Removing all deposited liquidity, in basis points.
const FULL_REMOVAL_BPS: u16 = 10_000;

/// One position's lifecycle, from funding to unwind.
///
/// Generic over the chain and DLMM clients so the state machine runs
/// unchanged against mocks in tests. A lifecycle instance manages exactly
/// one position and is not reusable; a new position means a new instance.
pub struct PositionLifecycle<C: ChainClient, D: DlmmClient> {
    chain: Arc<C>,
    dlmm: Arc<D>,
    wallet: Arc<Wallet>,
    submitter: TransactionSubmitter<C>,
    activity: ActivityMonitor,
    config: LifecycleConfig,
    state: LifecycleState,
    pool_type: PoolType,
    entry_direction: Option<SwapDirection>,
    entry_swap_amount: u64,
    investment_display: f64,
    last_known_bin_id: Option<i32>,
    position: Option<Pubkey>,
    exit_reason: Option<ExitReason>,
    fetch_failures: u32,
    entry_value: Option<f64>,
    entered_at: Option<DateTime<Utc>>,
    last_value: Option<f64>,
    last_fees: u128,
}

impl<C: ChainClient, D: DlmmClient> PositionLifecycle<C, D> {
    /// Creates a lifecycle over a pool and wallet.
    #[must_use]
    pub fn new(chain: Arc<C>, dlmm: Arc<D>, wallet: Arc<Wallet>, config: LifecycleConfig) -> Self {
        let pool_type = PoolType::classify(&dlmm.token_x().mint, &dlmm.token_y().mint);
        Self {
            submitter: TransactionSubmitter::new(chain.clone()),
            chain,
            dlmm,
            wallet,
            activity: ActivityMonitor::new(),
            config,
            state: LifecycleState::Idle,
            pool_type,
            entry_direction: None,
            entry_swap_amount: 0,
            investment_display: 0.0,
            last_known_bin_id: None,
            position: None,
            exit_reason: None,
            fetch_failures: 0,
            entry_value: None,
            entered_at: None,
            last_value: None,
            last_fees: 0,
        }
    }

    /// Seeds the last known active bin id, enabling the degraded wide-range
    /// fallback when the active bin cannot be fetched before any successful
    /// query of this run.
    #[must_use]
    pub fn with_last_known_bin_id(mut self, bin_id: i32) -> Self {
        self.last_known_bin_id = Some(bin_id);
        self
    }

    /// Runs the lifecycle to a terminal state.
    pub async fn run(&mut self) -> LifecycleReport {
        let started_at = Utc::now();
        info!(
            pool = %self.dlmm.pool_address(),
            owner = %self.wallet.pubkey(),
            pool_type = ?self.pool_type,
            "lifecycle starting"
        );

        let mut failure = None;
        while !self.state.is_terminal() {
            let step = match self.state {
                LifecycleState::Idle => self.prepare().await,
                LifecycleState::Entering => self.enter().await,
                LifecycleState::Monitoring => self.monitor_cycle().await,
                LifecycleState::Exiting => self.exit().await,
                LifecycleState::SwappingBack => self.swap_back().await,
                LifecycleState::Done | LifecycleState::Failed => break,
            };
            match step {
                Ok(next) => {
                    if next != self.state {
                        info!(from = %self.state, to = %next, "state transition");
                    }
                    self.state = next;
                }
                Err(e) => {
                    error!(state = %self.state, error = ?e, "lifecycle step failed");
                    failure = Some(format!("{e:#}"));
                    self.state = LifecycleState::Failed;
                }
            }
        }

        let economics = self.economics();
        if let Some(economics) = &economics {
            info!(
                entry_value = economics.entry_value,
                exit_value = economics.exit_value,
                fees_and_rewards = economics.fees_and_rewards,
                return_pct = economics.return_pct,
                apy_pct = economics.apy_pct,
                "position economics"
            );
        }
        LifecycleReport {
            final_state: self.state,
            exit_reason: self.exit_reason,
            failure,
            position: self.position,
            economics,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Realized return of the run, once the position was valued at entry and
    /// observed at least once.
    fn economics(&self) -> Option<PositionEconomics> {
        let entry_value = self.entry_value?;
        let entered_at = self.entered_at?;
        let exit_value = self.last_value?;
        let held_for = (Utc::now() - entered_at).to_std().unwrap_or_default();
        let (return_pct, apy_pct) = annualized_return(entry_value, exit_value, held_for);
        Some(PositionEconomics {
            entry_value,
            exit_value,
            fees_and_rewards: self.last_fees,
            return_pct,
            apy_pct,
        })
    }

    /// Checks preconditions and sizes the entry, committing nothing on chain.
    async fn prepare(&mut self) -> Result<LifecycleState> {
        if !self.pool_type.is_supported() {
            bail!("pool pairs neither USDC nor SOL, refusing to run");
        }
        let base_mint = self
            .pool_type
            .base_mint()
            .context("supported pool type without a base mint")?;
        let base_decimals = self
            .pool_type
            .base_decimals()
            .context("supported pool type without base decimals")?;

        let investment = match self.pool_type {
            PoolType::Usdc => self.config.investment_usdc,
            PoolType::Sol => self.config.investment_sol,
            PoolType::Unsupported => 0.0,
        };
        if investment <= 0.0 {
            bail!("no investment configured for this pool's base asset");
        }

        let owner = self.wallet.pubkey();
        let native = self.chain.get_balance(&owner).await?;
        if native < self.config.min_fee_reserve_lamports {
            bail!(
                "native balance {native} lamports below the {} lamport fee reserve",
                self.config.min_fee_reserve_lamports
            );
        }

        let base_amount = (investment * 10f64.powi(i32::from(base_decimals))) as u64;
        let swap_amount = base_amount / 2;
        if swap_amount == 0 {
            bail!("investment of {investment} is too small to split");
        }
        let base_balance = spendable_balance(self.chain.as_ref(), &owner, &base_mint).await?;
        if base_balance < base_amount {
            bail!("base asset balance {base_balance} below the {base_amount} required");
        }

        self.entry_direction = Some(if self.dlmm.token_y().mint == base_mint {
            SwapDirection::YToX
        } else if self.dlmm.token_x().mint == base_mint {
            SwapDirection::XToY
        } else {
            bail!("pool does not contain the base asset mint {base_mint}");
        });
        self.entry_swap_amount = swap_amount;
        self.investment_display = investment;
        info!(
            investment,
            swap_amount, base_balance, "entry sized, preconditions hold"
        );
        Ok(LifecycleState::Entering)
    }

    /// Funds the pair, selects a range and opens the position.
    async fn enter(&mut self) -> Result<LifecycleState> {
        let direction = self
            .entry_direction
            .context("entering without a prepared direction")?;
        let owner = self.wallet.pubkey();
        let token_x = self.dlmm.token_x();
        let token_y = self.dlmm.token_y();

        self.swap(direction, self.entry_swap_amount)
            .await
            .context("funding swap failed")?;
        tokio::time::sleep(self.config.settle_delay).await;

        let (range, active_price) = self.select_range().await?;
        let window = match self
            .dlmm
            .get_bins_between(range.min_bin_id, range.max_bin_id)
            .await
        {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "bin window unavailable, planning without weighting");
                None
            }
        };
        let current_price = active_price
            .or_else(|| window.as_ref().map(|w| w.active_bin.price_per_token))
            .context("no price source available for deposit planning")?;
        let planning_price = window
            .as_ref()
            .and_then(|w| weighted_price(&w.bins, current_price))
            .unwrap_or(current_price);
        // the split expects a quote-denominated budget; a base asset on the
        // X side converts at the current price
        let quote_budget = if direction.is_y_to_x() {
            self.investment_display
        } else {
            self.investment_display * current_price
        };
        let split = split_budget(
            quote_budget,
            current_price,
            window.as_ref().map(|w| w.bins.as_slice()),
            token_x.decimals,
            token_y.decimals,
        )?;
        debug!(
            x_ratio = split.x_ratio,
            y_ratio = split.y_ratio,
            planning_price,
            "budget split over the selected range"
        );

        // proceeds of the funding swap are the primary leg; the base asset
        // half kept back is the counterpart. Both legs are bounded by the
        // weighted budget split so unrelated wallet balances never enter the
        // position.
        let main_is_x = direction.is_y_to_x();
        let (main_mint, other_mint, main_target, other_target) = if main_is_x {
            (token_x.mint, token_y.mint, split.x_amount, split.y_amount)
        } else {
            (token_y.mint, token_x.mint, split.y_amount, split.x_amount)
        };
        let main_balance = spendable_balance(self.chain.as_ref(), &owner, &main_mint)
            .await?
            .min(main_target);
        let other_balance = spendable_balance(self.chain.as_ref(), &owner, &other_mint)
            .await?
            .min(other_target)
            .min(self.entry_swap_amount);

        let plan = plan_deposit(
            main_balance,
            other_balance,
            planning_price,
            main_is_x,
            token_x.decimals,
            token_y.decimals,
            self.config.buffer_ratio,
        )?;
        info!(
            x_amount = plan.x_amount,
            y_amount = plan.y_amount,
            rescaled = plan.rescaled,
            "deposit planned"
        );
        // entry valuation in quote display units, for the end-of-run return
        self.entry_value = Some(
            plan.x_amount as f64 / token_x.unit_scale() * planning_price
                + plan.y_amount as f64 / token_y.unit_scale(),
        );
        self.entered_at = Some(Utc::now());

        let strategy = StrategyParameters::new(
            range.min_bin_id,
            range.max_bin_id,
            self.config.strategy_type,
        );
        let position_keypair = Keypair::new();
        let position_key = position_keypair.pubkey();
        let instructions = self
            .dlmm
            .build_create_position_and_add_liquidity(
                &position_key,
                &owner,
                plan.x_amount,
                plan.y_amount,
                &strategy,
            )
            .await?;
        let signature = self
            .submitter
            .send_with_priority(
                instructions,
                self.config.priority,
                self.wallet.keypair(),
                &[&position_keypair],
            )
            .await
            .context("position creation submission failed")?;
        if !self
            .submitter
            .confirm_with_retries(
                &signature,
                self.config.confirm_attempts,
                self.config.confirm_delay,
            )
            .await
        {
            bail!("position creation transaction {signature} did not confirm");
        }
        tokio::time::sleep(self.config.settle_delay).await;

        let positions = self.dlmm.get_positions_by_user_and_pool(&owner).await?;
        if positions.find(&position_key).is_none() {
            bail!("created position {position_key} is not visible on chain");
        }
        self.last_known_bin_id = Some(positions.active_bin.bin_id);
        self.position = Some(position_key);
        info!(
            position = %position_key,
            min_bin_id = range.min_bin_id,
            max_bin_id = range.max_bin_id,
            "position opened"
        );
        Ok(LifecycleState::Monitoring)
    }

    /// One monitoring poll: refresh the snapshot, diff activity, decide.
    async fn monitor_cycle(&mut self) -> Result<LifecycleState> {
        tokio::time::sleep(self.config.poll_interval).await;
        let position_key = self.position.context("monitoring without a position")?;
        let owner = self.wallet.pubkey();

        let positions = match self.dlmm.get_positions_by_user_and_pool(&owner).await {
            Ok(positions) => {
                self.fetch_failures = 0;
                positions
            }
            Err(e) => {
                self.fetch_failures += 1;
                if self.fetch_failures >= self.config.max_fetch_failures {
                    return Err(e).context(format!(
                        "position fetch failed {} consecutive times",
                        self.fetch_failures
                    ));
                }
                warn!(
                    error = %e,
                    consecutive = self.fetch_failures,
                    "position fetch failed, staying in monitoring"
                );
                return Ok(LifecycleState::Monitoring);
            }
        };
        self.last_known_bin_id = Some(positions.active_bin.bin_id);

        let position = positions
            .find(&position_key)
            .context("position disappeared while monitoring")?;
        let total = position.data.total_fees_and_rewards()?;
        self.last_fees = total;
        if let Ok((x_display, y_display)) = position.data.display_totals() {
            self.last_value =
                Some(x_display * positions.active_bin.price_per_token + y_display);
        }
        let active = self.activity.observe(snapshot_from_position(&position.data));
        info!(
            position = %position_key,
            total_fees_and_rewards = total,
            active,
            idle_cycles = self.activity.idle_cycles(),
            active_bin = positions.active_bin.bin_id,
            "monitoring poll"
        );

        if let Some(reason) = evaluate_exit(total, self.activity.idle_cycles(), &self.config) {
            info!(%reason, "exit condition met");
            self.exit_reason = Some(reason);
            return Ok(LifecycleState::Exiting);
        }
        Ok(LifecycleState::Monitoring)
    }

    /// Claims accruals and removes all liquidity, retrying until verified.
    async fn exit(&mut self) -> Result<LifecycleState> {
        let position_key = self.position.context("exiting without a position")?;
        let owner = self.wallet.pubkey();

        for attempt in 1..=self.config.max_remove_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.remove_retry_delay).await;
            }

            let positions = match self.dlmm.get_positions_by_user_and_pool(&owner).await {
                Ok(positions) => positions,
                Err(e) => {
                    warn!(attempt, error = %e, "position fetch failed during exit");
                    continue;
                }
            };
            let Some(position) = positions.find(&position_key) else {
                info!(position = %position_key, "position no longer on chain, removal complete");
                return Ok(LifecycleState::SwappingBack);
            };
            if self.holds_only_dust(position) {
                info!(position = %position_key, "position drained to dust, removal complete");
                return Ok(LifecycleState::SwappingBack);
            }

            self.claim_accruals(position).await;

            // bin ids are recomputed from the fresh snapshot every attempt;
            // a partial earlier removal shrinks the remaining set
            let bin_ids = position.data.bin_ids();
            if bin_ids.is_empty() {
                return Ok(LifecycleState::SwappingBack);
            }
            let batches = match self
                .dlmm
                .build_remove_liquidity(&position_key, &owner, &bin_ids, FULL_REMOVAL_BPS, true)
                .await
            {
                Ok(batches) => batches,
                Err(e) => {
                    warn!(attempt, error = %e, "building removal transactions failed");
                    continue;
                }
            };

            let mut all_confirmed = true;
            for instructions in batches {
                let signature = match self
                    .submitter
                    .send_with_priority(
                        instructions,
                        self.config.priority,
                        self.wallet.keypair(),
                        &[],
                    )
                    .await
                {
                    Ok(signature) => signature,
                    Err(e) => {
                        warn!(attempt, error = %e, "removal submission failed");
                        all_confirmed = false;
                        break;
                    }
                };
                if !self
                    .submitter
                    .confirm_with_retries(
                        &signature,
                        self.config.confirm_attempts,
                        self.config.confirm_delay,
                    )
                    .await
                {
                    all_confirmed = false;
                    break;
                }
            }
            if !all_confirmed {
                warn!(attempt, "removal batch incomplete, retrying");
                continue;
            }

            tokio::time::sleep(self.config.settle_delay).await;
            match self.removal_verified(&owner, &position_key).await {
                Ok(true) => {
                    info!(position = %position_key, attempt, "liquidity removal verified");
                    return Ok(LifecycleState::SwappingBack);
                }
                Ok(false) => warn!(attempt, "liquidity remains after removal"),
                Err(e) => warn!(attempt, error = %e, "could not verify removal"),
            }
        }
        bail!(
            "liquidity still present after {} removal attempts",
            self.config.max_remove_attempts
        );
    }

    /// Swaps counterpart proceeds back into the base asset.
    async fn swap_back(&mut self) -> Result<LifecycleState> {
        let direction = self
            .entry_direction
            .context("swapping back without a prepared direction")?;
        let owner = self.wallet.pubkey();
        let main_mint = if direction.is_y_to_x() {
            self.dlmm.token_x().mint
        } else {
            self.dlmm.token_y().mint
        };

        let mut balance = spendable_balance(self.chain.as_ref(), &owner, &main_mint).await?;
        if main_mint == WSOL_MINT {
            // the native balance doubles as the fee reserve
            balance = balance.saturating_sub(self.config.min_fee_reserve_lamports);
        }
        if balance == 0 {
            info!("no counterpart proceeds to swap back");
            return Ok(LifecycleState::Done);
        }

        self.swap(direction.reversed(), balance)
            .await
            .context("swap back to the base asset failed")?;
        info!(amount = balance, "proceeds swapped back to the base asset");
        Ok(LifecycleState::Done)
    }

    /// Quotes, submits and confirms one swap.
    async fn swap(&self, direction: SwapDirection, amount_in: u64) -> Result<()> {
        let owner = self.wallet.pubkey();
        let bin_arrays = self.dlmm.get_bin_arrays_for_swap(direction).await?;
        let quote = self
            .dlmm
            .quote_swap(
                amount_in,
                direction,
                self.config.swap_slippage_bps,
                &bin_arrays,
            )
            .await?;
        info!(
            amount_in,
            out_amount = quote.out_amount,
            min_out_amount = quote.min_out_amount,
            price_impact = quote.price_impact,
            ?direction,
            "swap quoted"
        );
        let instructions = self.dlmm.build_swap(&owner, &quote, direction).await?;
        let signature = self
            .submitter
            .send_with_priority(
                instructions,
                self.config.priority,
                self.wallet.keypair(),
                &[],
            )
            .await?;
        if !self
            .submitter
            .confirm_with_retries(
                &signature,
                self.config.confirm_attempts,
                self.config.confirm_delay,
            )
            .await
        {
            bail!("swap transaction {signature} did not confirm");
        }
        Ok(())
    }

    /// Range around the current active bin, degrading to a wide window
    /// around the last known bin when the active bin cannot be fetched.
    async fn select_range(&mut self) -> Result<(BinRange, Option<f64>)> {
        match self.dlmm.get_active_bin().await {
            Ok(active) => {
                self.last_known_bin_id = Some(active.bin_id);
                let range = range_for_percentage(
                    active.bin_id,
                    active.price_per_token,
                    self.config.range_percentage,
                )?;
                Ok((range, Some(active.price_per_token)))
            }
            Err(e) => match self.last_known_bin_id {
                Some(last_bin_id) => {
                    warn!(
                        error = %e,
                        last_bin_id,
                        "active bin unavailable, falling back to a wide range"
                    );
                    Ok((fallback_range(last_bin_id), None))
                }
                None => Err(e).context("active bin unavailable and no prior bin is known"),
            },
        }
    }

    /// Claims fees and rewards, best effort; failures never block the exit.
    async fn claim_accruals(&self, position: &Position) {
        let owner = self.wallet.pubkey();
        let batches = match self
            .dlmm
            .build_claim_all_rewards(&owner, std::slice::from_ref(position))
            .await
        {
            Ok(batches) => batches,
            Err(e) => {
                warn!(error = %e, "building claim transactions failed, skipping claims");
                return;
            }
        };
        for instructions in batches {
            match self
                .submitter
                .send_with_priority(
                    instructions,
                    self.config.priority,
                    self.wallet.keypair(),
                    &[],
                )
                .await
            {
                Ok(signature) => {
                    if !self
                        .submitter
                        .confirm_with_retries(
                            &signature,
                            self.config.confirm_attempts,
                            self.config.confirm_delay,
                        )
                        .await
                    {
                        warn!(%signature, "claim transaction unconfirmed");
                    }
                }
                Err(e) => warn!(error = %e, "claim submission failed"),
            }
        }
    }

    fn holds_only_dust(&self, position: &Position) -> bool {
        position
            .data
            .display_totals()
            .map(|(x, y)| x < self.config.dust_threshold && y < self.config.dust_threshold)
            .unwrap_or(false)
    }

    /// Whether the position is gone or drained below the dust threshold.
    async fn removal_verified(&self, owner: &Pubkey, position_key: &Pubkey) -> Result<bool> {
        let positions = self.dlmm.get_positions_by_user_and_pool(owner).await?;
        match positions.find(position_key) {
            None => Ok(true),
            Some(position) => Ok(self.holds_only_dust(position)),
        }
    }
}
