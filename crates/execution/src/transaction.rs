//! Transaction assembly, priority fees and confirmation polling.

use anyhow::{Context, Result};
use dlmm_lp_protocols::rpc::ChainClient;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Compute budget program.
pub const COMPUTE_BUDGET_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("ComputeBudget111111111111111111111111111111");

/// Compute unit limit requested for every lifecycle transaction.
pub const COMPUTE_UNIT_LIMIT: u32 = 200_000;

/// Priority fee tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityLevel {
    /// Background work, no urgency.
    Low,
    /// Default tier.
    Medium,
    /// Entries and exits that must land promptly.
    High,
}

impl PriorityLevel {
    /// Priority fee of the tier, in micro-lamports per compute unit.
    #[must_use]
    pub fn micro_lamports_per_cu(&self) -> u64 {
        match self {
            PriorityLevel::Low => 1_000,
            PriorityLevel::Medium => 10_000,
            PriorityLevel::High => 100_000,
        }
    }
}

/// Prepends compute budget instructions unless the set already carries some.
///
/// Instruction sets built upstream may bring their own budget; prepending a
/// second pair would make the transaction fail, so existing budget
/// instructions are left untouched.
#[must_use]
pub fn with_compute_budget(
    instructions: Vec<Instruction>,
    priority: PriorityLevel,
) -> Vec<Instruction> {
    let has_budget = instructions
        .iter()
        .any(|ix| ix.program_id == COMPUTE_BUDGET_PROGRAM_ID);
    if has_budget {
        debug!("instruction set already carries a compute budget");
        return instructions;
    }
    let mut budgeted = Vec::with_capacity(instructions.len() + 2);
    budgeted.push(ComputeBudgetInstruction::set_compute_unit_limit(
        COMPUTE_UNIT_LIMIT,
    ));
    budgeted.push(ComputeBudgetInstruction::set_compute_unit_price(
        priority.micro_lamports_per_cu(),
    ));
    budgeted.extend(instructions);
    budgeted
}

/// Signs and submits instruction sets with a priority fee attached.
pub struct TransactionSubmitter<C: ChainClient> {
    chain: Arc<C>,
}

impl<C: ChainClient> TransactionSubmitter<C> {
    /// Creates a submitter over a chain client.
    #[must_use]
    pub fn new(chain: Arc<C>) -> Self {
        Self { chain }
    }

    /// Assembles, signs and submits one transaction.
    ///
    /// A fresh blockhash is fetched per submission; `additional_signers`
    /// covers accounts that must co-sign, such as a new position account.
    pub async fn send_with_priority(
        &self,
        instructions: Vec<Instruction>,
        priority: PriorityLevel,
        payer: &Keypair,
        additional_signers: &[&Keypair],
    ) -> Result<Signature> {
        let instructions = with_compute_budget(instructions, priority);
        let blockhash = self
            .chain
            .get_latest_blockhash()
            .await
            .context("failed to fetch a blockhash for submission")?;

        let mut signers: Vec<&dyn Signer> = vec![payer];
        signers.extend(additional_signers.iter().map(|k| *k as &dyn Signer));
        let transaction = Transaction::new_signed_with_payer(
            &instructions,
            Some(&payer.pubkey()),
            &signers,
            blockhash,
        );

        let signature = self.chain.send_transaction(&transaction).await?;
        info!(%signature, ?priority, "transaction submitted");
        Ok(signature)
    }

    /// Polls a signature until confirmed, a fixed number of times.
    ///
    /// Only re-polls; the transaction is never resubmitted. Returns whether
    /// confirmation was observed within the attempt budget.
    pub async fn confirm_with_retries(
        &self,
        signature: &Signature,
        max_attempts: u32,
        delay: Duration,
    ) -> bool {
        for attempt in 1..=max_attempts {
            match self.chain.confirm_transaction(signature).await {
                Ok(true) => {
                    info!(%signature, attempt, "transaction confirmed");
                    return true;
                }
                Ok(false) => {
                    debug!(%signature, attempt, "transaction not yet confirmed");
                }
                Err(e) => {
                    warn!(%signature, attempt, error = %e, "confirmation poll failed");
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }
        warn!(%signature, max_attempts, "transaction unconfirmed after all attempts");
        false
    }
}
