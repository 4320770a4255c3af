//! Wallet keys.

use anyhow::{Context, Result, anyhow};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};

/// The signing wallet of the lifecycle.
pub struct Wallet {
    keypair: Keypair,
}

impl Wallet {
    /// Loads a wallet from a base58-encoded 64-byte secret key.
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .context("private key is not valid base58")?;
        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|e| anyhow!("private key bytes are not a valid keypair: {e}"))?;
        Ok(Self { keypair })
    }

    /// Wraps an existing keypair.
    #[must_use]
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Public address of the wallet.
    #[must_use]
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// The signing keypair.
    #[must_use]
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}
