//! On-chain side of the bot: PDA math, the trigger instruction and the RPC
//! client that submits it.

mod instruction;
mod pda;
mod solana_client;

pub use instruction::{
    build_trigger_explosion, encode_trigger_explosion, TRIGGER_EXPLOSION_DISCRIMINATOR,
};
pub use pda::{boom_token_pda, protocol_pda, BOOM_TOKEN_SEED, PROTOCOL_SEED};
pub use solana_client::SolanaClient;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// Snapshot of a boom token state account.
///
/// The account layout is not deserialized yet; see
/// [`ChainClient::get_boom_token_state`].
#[derive(Debug, Clone)]
pub struct BoomTokenState {
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub is_exploded: bool,
    pub cap_hash: [u8; 32],
    pub revealed_cap: u64,
    pub explosion_time: i64,
}

impl BoomTokenState {
    /// Placeholder record for an existing, not-yet-parsed account
    pub fn unparsed(mint: Pubkey) -> Self {
        Self {
            mint,
            name: String::new(),
            symbol: String::new(),
            is_exploded: false,
            cap_hash: [0u8; 32],
            revealed_cap: 0,
            explosion_time: 0,
        }
    }
}

/// Result of a trigger attempt.
///
/// The trigger path never returns `Err`; a failed submission is an outcome
/// the loop acts on, not a crash.
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// Dry-run mode accepted the trigger without touching the network
    DryRunAccepted,
    /// The transaction was accepted by the RPC node
    Submitted(Signature),
    /// The transaction could not be built, signed or submitted
    Rejected(String),
}

impl TriggerOutcome {
    /// True when the outcome counts as the one-shot action having fired
    pub fn fired(&self) -> bool {
        matches!(self, TriggerOutcome::DryRunAccepted | TriggerOutcome::Submitted(_))
    }
}

/// Trait defining what the monitor needs from the chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Public key that signs and pays for the trigger transaction
    fn authority(&self) -> Pubkey;

    /// Raw token supply in base units
    async fn get_token_supply(&self, mint: &Pubkey) -> crate::Result<u64>;

    /// Current boom token account state for a mint.
    ///
    /// `Ok(None)` means the account does not exist. When it does exist the
    /// returned record is a placeholder: the Anchor account layout is not
    /// parsed, so every field except `mint` carries its default and must not
    /// be used for decisions.
    async fn get_boom_token_state(&self, mint: &Pubkey) -> crate::Result<Option<BoomTokenState>>;

    /// Attempt the trigger_explosion call.
    ///
    /// With `dry_run` set this returns [`TriggerOutcome::DryRunAccepted`]
    /// before any network request is made.
    async fn trigger_explosion(
        &self,
        mint: &Pubkey,
        revealed_cap: u64,
        price_proof: &[u8],
        dry_run: bool,
    ) -> TriggerOutcome;
}
