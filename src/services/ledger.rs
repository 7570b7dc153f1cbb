//! Solana ledger client
//!
//! Signs aggregator-built transactions with the trading wallet, broadcasts
//! them and reports signature status.

use std::str::FromStr;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};

use crate::agent::types::{AgentError, ConfirmationStatus};

/// Broadcast and confirmation capability of the chain client.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Sign and broadcast a base64 transaction payload, returning its signature.
    async fn submit_transaction(&self, payload: &str) -> Result<String, AgentError>;

    /// Query the settlement status of a previously broadcast transaction.
    async fn check_confirmation(&self, signature: &str) -> Result<ConfirmationStatus, AgentError>;
}

pub struct SolanaLedger {
    rpc_client: RpcClient,
    keypair: Keypair,
}

impl SolanaLedger {
    /// Create a ledger client for `rpc_url` signing with the base58 `private_key`.
    ///
    /// `expected_pubkey` must match the keypair, otherwise the aggregator would
    /// build transactions for a wallet we cannot sign for.
    pub fn new(rpc_url: &str, private_key: &str, expected_pubkey: &str) -> Result<Self, AgentError> {
        let keypair = keypair_from_base58(private_key)?;

        let expected = Pubkey::from_str(expected_pubkey)
            .map_err(|e| AgentError::Configuration(format!("Invalid PUBLIC_KEY: {}", e)))?;
        if keypair.pubkey() != expected {
            return Err(AgentError::Configuration(format!(
                "PUBLIC_KEY {} does not match PRIVATE_KEY (derived {})",
                expected,
                keypair.pubkey()
            )));
        }

        let rpc_client = RpcClient::new_with_commitment(
            rpc_url.to_string(),
            CommitmentConfig::confirmed(),
        );

        Ok(Self { rpc_client, keypair })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Decode the aggregator payload and put our signature in the payer slot.
    fn sign_payload(&self, payload: &str) -> Result<VersionedTransaction, AgentError> {
        let transaction_bytes = STANDARD
            .decode(payload)
            .map_err(|e| AgentError::Ledger(format!("Failed to decode swap transaction: {}", e)))?;

        let mut versioned_tx: VersionedTransaction = bincode::deserialize(&transaction_bytes)
            .map_err(|e| AgentError::Ledger(format!("Failed to deserialize versioned transaction: {}", e)))?;

        let idx = versioned_tx
            .message
            .static_account_keys()
            .iter()
            .position(|key| key == &self.keypair.pubkey())
            .ok_or_else(|| AgentError::Ledger("Wallet not in message account keys".to_string()))?;

        if idx >= versioned_tx.signatures.len() {
            return Err(AgentError::Ledger(format!("Wallet key at index {} is not a signer", idx)));
        }

        let msg_data = versioned_tx.message.serialize();
        versioned_tx.signatures[idx] = self.keypair.sign_message(&msg_data);
        Ok(versioned_tx)
    }
}

/// Parse a base58-encoded 64-byte keypair.
pub fn keypair_from_base58(private_key: &str) -> Result<Keypair, AgentError> {
    let keypair_bytes = bs58::decode(private_key.trim())
        .into_vec()
        .map_err(|e| AgentError::Configuration(format!("Failed to decode private key: {}", e)))?;

    Keypair::try_from(&keypair_bytes[..])
        .map_err(|e| AgentError::Configuration(format!("Failed to create keypair from bytes: {}", e)))
}

#[async_trait]
impl Ledger for SolanaLedger {
    async fn submit_transaction(&self, payload: &str) -> Result<String, AgentError> {
        let transaction = self.sign_payload(payload)?;

        let signature = self.rpc_client
            .send_transaction(&transaction)
            .await
            .map_err(|e| AgentError::Ledger(format!("Failed to send transaction: {}", e)))?;

        Ok(signature.to_string())
    }

    async fn check_confirmation(&self, signature: &str) -> Result<ConfirmationStatus, AgentError> {
        let signature = Signature::from_str(signature)
            .map_err(|e| AgentError::Ledger(format!("Invalid signature '{}': {}", signature, e)))?;

        let status = self.rpc_client
            .get_signature_status(&signature)
            .await
            .map_err(|e| AgentError::Ledger(format!("Failed to check signature: {}", e)))?;

        Ok(match status {
            Some(Ok(())) => ConfirmationStatus::Confirmed,
            Some(Err(tx_error)) => ConfirmationStatus::Failed(tx_error.to_string()),
            None => ConfirmationStatus::NotConfirmed,
        })
    }
}
