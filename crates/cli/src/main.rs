//! Command line interface for the DLMM position lifecycle manager.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dlmm_lp_execution::lifecycle::{LifecycleConfig, LifecycleState};
use dlmm_lp_execution::{PositionLifecycle, PriorityLevel, Wallet};
use dlmm_lp_protocols::DlmmClient;
use dlmm_lp_protocols::meteora::MeteoraDlmm;
use dlmm_lp_protocols::rpc::RpcProvider;
use dotenv::dotenv;
use solana_sdk::pubkey::Pubkey;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dlmm-lp")]
#[command(about = "Single-position DLMM liquidity lifecycle manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for PriorityLevel {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => PriorityLevel::Low,
            PriorityArg::Medium => PriorityLevel::Medium,
            PriorityArg::High => PriorityLevel::High,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full position lifecycle against a pool
    Run {
        /// DLMM pool (lb pair) address
        #[arg(short, long, env = "POOL_ADDRESS")]
        pool: String,

        /// Price range of the position, percent around the current price
        #[arg(long, default_value_t = 20.0)]
        range_percentage: f64,

        /// Investment in USDC display units, for USDC-quoted pools
        #[arg(long, env = "INVESTMENT_USDC", default_value_t = 0.0)]
        investment_usdc: f64,

        /// Investment in SOL display units, for SOL-quoted pools
        #[arg(long, env = "INVESTMENT_SOL", default_value_t = 0.0)]
        investment_sol: f64,

        /// Seconds between monitoring polls
        #[arg(long, default_value_t = 60)]
        poll_interval: u64,

        /// Idle polls tolerated before unwinding
        #[arg(long, default_value_t = 10)]
        max_idle_cycles: u32,

        /// Fee-and-reward counter sum that triggers the profit exit
        #[arg(long, default_value_t = 20_000)]
        fee_reward_threshold: u128,

        /// Swap slippage tolerance in basis points
        #[arg(long, default_value_t = 1_000)]
        slippage_bps: u16,

        /// Priority fee tier for all transactions
        #[arg(long, value_enum, default_value = "high")]
        priority: PriorityArg,
    },
    /// List the wallet's positions in a pool
    Positions {
        /// DLMM pool (lb pair) address
        #[arg(short, long, env = "POOL_ADDRESS")]
        pool: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let rpc_url = env::var("RPC_URL").expect("RPC_URL must be set in .env or environment");
    let private_key =
        env::var("PRIVATE_KEY").expect("PRIVATE_KEY must be set in .env or environment");
    let wallet = Arc::new(Wallet::from_base58(&private_key)?);
    let provider = Arc::new(RpcProvider::new(rpc_url));

    match cli.command {
        Commands::Run {
            pool,
            range_percentage,
            investment_usdc,
            investment_sol,
            poll_interval,
            max_idle_cycles,
            fee_reward_threshold,
            slippage_bps,
            priority,
        } => {
            let pool = Pubkey::from_str(&pool).context("invalid pool address")?;
            let dlmm = Arc::new(MeteoraDlmm::load(provider.clone(), pool).await?);

            let config = LifecycleConfig {
                range_percentage,
                investment_usdc,
                investment_sol,
                poll_interval: Duration::from_secs(poll_interval),
                max_idle_cycles,
                fee_reward_threshold,
                swap_slippage_bps: slippage_bps,
                priority: priority.into(),
                ..LifecycleConfig::default()
            };

            println!("Starting lifecycle on pool {pool} as {}", wallet.pubkey());
            let mut lifecycle = PositionLifecycle::new(provider, dlmm, wallet, config);
            let report = lifecycle.run().await;

            println!(
                "Lifecycle finished: {} ({} -> {})",
                report.final_state, report.started_at, report.finished_at
            );
            if let Some(position) = report.position {
                println!("Position: {position}");
            }
            if let Some(reason) = report.exit_reason {
                println!("Exit reason: {reason}");
            }
            if let Some(failure) = &report.failure {
                println!("Failure: {failure}");
            }
            if report.final_state == LifecycleState::Failed {
                std::process::exit(1);
            }
        }
        Commands::Positions { pool } => {
            let pool = Pubkey::from_str(&pool).context("invalid pool address")?;
            let dlmm = MeteoraDlmm::load(provider, pool).await?;

            let positions = dlmm.get_positions_by_user_and_pool(&wallet.pubkey()).await?;
            println!(
                "Active bin {} @ {:.6}",
                positions.active_bin.bin_id, positions.active_bin.price_per_token
            );
            println!(
                "{:<44} | {:>10} | {:>10} | {:>14} | {:>14}",
                "position", "lower bin", "upper bin", "total x", "total y"
            );
            for position in &positions.positions {
                println!(
                    "{:<44} | {:>10} | {:>10} | {:>14} | {:>14}",
                    position.public_key.to_string(),
                    position.data.lower_bin_id,
                    position.data.upper_bin_id,
                    position.data.total_x_amount,
                    position.data.total_y_amount
                );
            }
            if positions.positions.is_empty() {
                println!("No positions in this pool.");
            }
        }
    }

    Ok(())
}
