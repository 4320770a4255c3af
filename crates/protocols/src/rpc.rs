//! RPC transport with bounded retries.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use dlmm_lp_domain::WSOL_MINT;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Associated token program ID.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// System program ID.
pub const SYSTEM_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("11111111111111111111111111111111");

/// Raw RPC operations the lifecycle core depends on.
///
/// Balance queries treat a definitive "account not found" as zero / absent,
/// not as an error; transient transport failures surface as errors for the
/// caller to retry at the step level.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native lamport balance of an account.
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64>;

    /// Token balance of a token account; zero when the account is absent.
    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<u64>;

    /// Latest blockhash for transaction assembly.
    async fn get_latest_blockhash(&self) -> Result<Hash>;

    /// Submits a signed transaction without waiting for confirmation.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// Polls confirmation status of a signature once.
    async fn confirm_transaction(&self, signature: &Signature) -> Result<bool>;

    /// Whether an account exists on chain.
    async fn account_exists(&self, address: &Pubkey) -> Result<bool>;
}

/// RPC provider over the nonblocking Solana client.
pub struct RpcProvider {
    client: RpcClient,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl RpcProvider {
    /// Creates a provider with confirmed commitment and default retry policy.
    #[must_use]
    pub fn new(rpc_url: String) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Overrides the transient-error retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    /// Raw account data, `None` when the account does not exist.
    pub async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        match self.client.get_account(address).await {
            Ok(account) => Ok(Some(account.data)),
            Err(e) if is_account_not_found(&e) => Ok(None),
            Err(e) => Err(e).context("failed to fetch account"),
        }
    }

    /// Access to the underlying client for protocol-specific queries.
    #[must_use]
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Runs an RPC call with bounded fixed-delay retries on transient errors.
    async fn retry<T, Fut, F>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, ClientError>>,
    {
        let mut last_error = None;
        for attempt in 1..=self.retry_attempts {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(op, attempt, error = %e, "RPC call failed");
                    last_error = Some(e);
                    if attempt < self.retry_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(anyhow!(
            "{op} failed after {} attempts: {}",
            self.retry_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ))
    }
}

#[async_trait]
impl ChainClient for RpcProvider {
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64> {
        self.retry("get_balance", || self.client.get_balance(owner))
            .await
    }

    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<u64> {
        match self.client.get_token_account_balance(token_account).await {
            Ok(balance) => balance
                .amount
                .parse::<u64>()
                .context("token balance was not an integer amount"),
            Err(e) if is_account_not_found(&e) => {
                debug!(account = %token_account, "token account does not exist, treating as zero");
                Ok(0)
            }
            Err(e) => Err(e).context("failed to fetch token account balance"),
        }
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.retry("get_latest_blockhash", || {
            self.client.get_latest_blockhash()
        })
        .await
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        // No implicit retry; resubmitting is the caller's decision.
        self.client
            .send_transaction(transaction)
            .await
            .context("failed to send transaction")
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<bool> {
        self.client
            .confirm_transaction(signature)
            .await
            .context("failed to poll transaction confirmation")
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self.get_account_data(address).await?.is_some())
    }
}

fn is_account_not_found(error: &ClientError) -> bool {
    let message = error.to_string();
    message.contains("could not find account") || message.contains("AccountNotFound")
}

/// Derives the associated token account of an owner for a mint.
#[must_use]
pub fn derive_ata(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    let (ata, _bump) = Pubkey::find_program_address(
        &[owner.as_ref(), spl_token::id().as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    );
    ata
}

/// Builds an idempotent create of the owner's associated token account.
///
/// The associated-token-program `CreateIdempotent` variant is a no-op when
/// the account already exists, so it can prefix every transfer touching an
/// ATA without a prior existence check.
#[must_use]
pub fn create_ata_idempotent(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),                   // payer
            AccountMeta::new(derive_ata(owner, mint), false), // associated token account
            AccountMeta::new_readonly(*owner, false),         // owner
            AccountMeta::new_readonly(*mint, false),          // mint
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false), // system_program
            AccountMeta::new_readonly(spl_token::id(), false), // token_program
        ],
        data: vec![1], // CreateIdempotent
    }
}

/// Builds the instructions funding the owner's wrapped-SOL account with
/// `lamports`: a native transfer into the WSOL ATA followed by sync-native,
/// which updates the token amount to match the lamport balance.
pub fn wrap_sol(owner: &Pubkey, lamports: u64) -> Result<Vec<Instruction>> {
    let wsol_ata = derive_ata(owner, &WSOL_MINT);
    let sync = spl_token::instruction::sync_native(&spl_token::id(), &wsol_ata)
        .context("failed to build the sync-native instruction")?;
    Ok(vec![system_transfer(owner, &wsol_ata, lamports), sync])
}

fn system_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    // System program Transfer: u32 variant tag 2, then the lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*from, true), // funding account
            AccountMeta::new(*to, false),  // recipient
        ],
        data,
    }
}

/// Spendable balance of `mint` for `owner`, in minor units.
///
/// Wrapped SOL reads the native lamport balance; any other mint reads the
/// associated token account, absent accounts counting as zero.
pub async fn spendable_balance<C: ChainClient + ?Sized>(
    chain: &C,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Result<u64> {
    if *mint == WSOL_MINT {
        chain.get_balance(owner).await
    } else {
        chain.get_token_balance(&derive_ata(owner, mint)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ata_derivation_is_deterministic() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert_eq!(derive_ata(&owner, &mint), derive_ata(&owner, &mint));
        assert_ne!(derive_ata(&owner, &mint), derive_ata(&mint, &owner));
    }

    #[test]
    fn ata_create_uses_the_idempotent_variant() {
        let payer = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = create_ata_idempotent(&payer, &owner, &mint);
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ix.data, vec![1]);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, derive_ata(&owner, &mint));
    }

    #[test]
    fn wrap_sol_transfers_then_syncs() {
        let owner = Pubkey::new_unique();
        let wsol_ata = derive_ata(&owner, &WSOL_MINT);
        let ixs = wrap_sol(&owner, 750_000).unwrap();
        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(&ixs[0].data[..4], &2u32.to_le_bytes());
        assert_eq!(&ixs[0].data[4..], &750_000u64.to_le_bytes());
        assert_eq!(ixs[0].accounts[1].pubkey, wsol_ata);
        assert_eq!(ixs[1].program_id, spl_token::id());
        assert_eq!(ixs[1].accounts[0].pubkey, wsol_ata);
    }
}
