//! RPC-backed implementation of [`ChainClient`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_account_decoder::parse_token::UiTokenAmount;
use solana_client::nonblocking::rpc_client::RpcClient as AsyncRpcClient;
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};

use crate::config::SolanaConfig;
use crate::{Error, Result};

use super::instruction::build_trigger_explosion;
use super::pda::boom_token_pda;
use super::{BoomTokenState, ChainClient, TriggerOutcome};

/// A client for interacting with the BOOM program over Solana RPC
pub struct SolanaClient {
    client: AsyncRpcClient,
    keypair: Arc<Keypair>,
    program_id: Pubkey,
    commitment: CommitmentConfig,
}

fn parse_commitment(commitment: &str) -> CommitmentLevel {
    match commitment {
        | "processed" => CommitmentLevel::Processed,
        | "finalized" => CommitmentLevel::Finalized,
        | _ => CommitmentLevel::Confirmed,
    }
}

impl SolanaClient {
    /// Create a new client from config, program id and signing keypair
    pub fn new(config: &SolanaConfig, program_id: Pubkey, keypair: Keypair) -> Self {
        let commitment = CommitmentConfig {
            commitment: parse_commitment(&config.commitment),
        };
        let client = AsyncRpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            Duration::from_secs(config.timeout_seconds),
            commitment,
        );

        Self {
            client,
            keypair: Arc::new(keypair),
            program_id,
            commitment,
        }
    }

    /// Program this client targets
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Whether an account exists at the given address
    pub async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| Error::AccountNotFound(format!("{}: {}", address, e)))?;
        Ok(response.value.is_some())
    }

    async fn submit_trigger(
        &self,
        mint: &Pubkey,
        revealed_cap: u64,
        price_proof: &[u8],
    ) -> Result<Signature> {
        let instruction = build_trigger_explosion(
            &self.program_id,
            mint,
            &self.keypair.pubkey(),
            revealed_cap,
            price_proof,
        );

        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::SubmissionFailure(format!("blockhash fetch: {}", e)))?;

        let mut transaction =
            Transaction::new_with_payer(&[instruction], Some(&self.keypair.pubkey()));
        transaction
            .try_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| Error::SigningFailure(e.to_string()))?;

        let signature = self
            .client
            .send_transaction(&transaction)
            .await
            .map_err(|e| Error::SubmissionFailure(e.to_string()))?;

        Ok(signature)
    }
}

#[async_trait]
impl ChainClient for SolanaClient {
    fn authority(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn get_token_supply(&self, mint: &Pubkey) -> Result<u64> {
        let supply: UiTokenAmount = self
            .client
            .get_token_supply(mint)
            .await
            .map_err(|e| Error::SupplyUnavailable(format!("{}: {}", mint, e)))?;

        supply
            .amount
            .parse::<u64>()
            .map_err(|e| Error::SupplyUnavailable(format!("amount '{}': {}", supply.amount, e)))
    }

    async fn get_boom_token_state(&self, mint: &Pubkey) -> Result<Option<BoomTokenState>> {
        let (boom_token, _) = boom_token_pda(&self.program_id, mint);

        let response = self
            .client
            .get_account_with_commitment(&boom_token, self.commitment)
            .await
            .map_err(|e| Error::AccountNotFound(format!("boom_token {}: {}", boom_token, e)))?;

        match response.value {
            | Some(account) => {
                log::debug!(
                    "boom_token account {} exists ({} bytes, owner {})",
                    boom_token,
                    account.data.len(),
                    account.owner
                );
                Ok(Some(BoomTokenState::unparsed(*mint)))
            }
            | None => Ok(None),
        }
    }

    async fn trigger_explosion(
        &self,
        mint: &Pubkey,
        revealed_cap: u64,
        price_proof: &[u8],
        dry_run: bool,
    ) -> TriggerOutcome {
        if dry_run {
            log::info!(
                "DRY RUN: trigger_explosion for {} (revealed cap {}) accepted without submission",
                mint,
                revealed_cap
            );
            return TriggerOutcome::DryRunAccepted;
        }

        match self.submit_trigger(mint, revealed_cap, price_proof).await {
            | Ok(signature) => {
                log::info!("trigger_explosion submitted: {}", signature);
                TriggerOutcome::Submitted(signature)
            }
            | Err(e) => {
                log::error!("trigger_explosion failed: {}", e);
                TriggerOutcome::Rejected(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::str::FromStr;

    fn unreachable_client() -> SolanaClient {
        // Port 1 is never listening; any RPC touch fails immediately
        let config = SolanaConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            commitment: "confirmed".to_string(),
            timeout_seconds: 1,
        };
        let program_id =
            Pubkey::from_str(crate::config::DEFAULT_PROGRAM_ID).unwrap();
        SolanaClient::new(&config, program_id, Keypair::new())
    }

    #[test]
    fn test_parse_commitment() {
        assert_eq!(parse_commitment("processed"), CommitmentLevel::Processed);
        assert_eq!(parse_commitment("finalized"), CommitmentLevel::Finalized);
        assert_eq!(parse_commitment("confirmed"), CommitmentLevel::Confirmed);
        // Anything unrecognized falls back to confirmed
        assert_eq!(parse_commitment("banana"), CommitmentLevel::Confirmed);
    }

    #[tokio::test]
    async fn test_dry_run_never_touches_the_network() {
        let client = unreachable_client();
        let mint = Pubkey::new_unique();

        let outcome = client.trigger_explosion(&mint, 100_000_000_000, &[], true).await;
        assert_matches!(outcome, TriggerOutcome::DryRunAccepted);
    }

    #[tokio::test]
    async fn test_live_trigger_against_dead_rpc_is_rejected() {
        let client = unreachable_client();
        let mint = Pubkey::new_unique();

        let outcome = client.trigger_explosion(&mint, 100_000_000_000, &[], false).await;
        // The dead RPC fails at the blockhash fetch, which is a submission
        // problem, not a signing one
        assert_matches!(outcome, TriggerOutcome::Rejected(reason) => {
            assert!(reason.contains("Submission failure"), "unexpected reason: {}", reason);
        });
    }

    #[tokio::test]
    async fn test_supply_failure_is_supply_unavailable() {
        let client = unreachable_client();
        let err = client.get_token_supply(&Pubkey::new_unique()).await.unwrap_err();
        assert_matches!(err, Error::SupplyUnavailable(_));
    }
}
