//! JSON-RPC backed ledger client
//!
//! Constructed once per process and bound to a single test cluster. The
//! cluster cannot be changed after construction.

use super::{Confirmation, LedgerClient, LedgerError, LedgerReference};
use crate::config::Cluster;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::time::Duration;

pub struct RpcLedgerClient {
    client: RpcClient,
    cluster: Cluster,
    poll_interval: Duration,
}

impl RpcLedgerClient {
    /// Bind a client to `cluster` at `confirmed` commitment
    pub fn new(cluster: Cluster, poll_interval: Duration) -> Self {
        let client = RpcClient::new_with_commitment(
            cluster.rpc_url().to_string(),
            CommitmentConfig::confirmed(),
        );
        tracing::info!(cluster = %cluster, url = cluster.rpc_url(), "Ledger client bound");
        Self::from_client(client, cluster, poll_interval)
    }

    fn from_client(client: RpcClient, cluster: Cluster, poll_interval: Duration) -> Self {
        Self {
            client,
            cluster,
            poll_interval,
        }
    }

    pub fn cluster(&self) -> Cluster {
        self.cluster
    }

    pub fn url(&self) -> String {
        self.client.url()
    }

    /// Terminal status of `signature`, or `None` while it has not landed
    async fn poll_status(&self, signature: &Signature) -> Result<Option<Confirmation>, LedgerError> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, self.client.commitment())
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        Ok(match status {
            Some(Ok(())) => Some(Confirmation::Confirmed),
            Some(Err(e)) => Some(Confirmation::Failed(e.to_string())),
            None => None,
        })
    }

    async fn past_validity(&self, reference: &LedgerReference) -> bool {
        match self
            .client
            .get_block_height_with_commitment(self.client.commitment())
            .await
        {
            Ok(height) => height > reference.last_valid_block_height,
            Err(e) => {
                tracing::warn!(error = %e, "Block height poll failed");
                false
            }
        }
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn latest_reference(&self) -> Result<LedgerReference, LedgerError> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.client.commitment())
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        tracing::debug!(
            blockhash = %blockhash,
            last_valid_block_height,
            "Fetched latest blockhash"
        );

        Ok(LedgerReference {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, LedgerError> {
        self.client
            .send_transaction(tx)
            .await
            .map_err(|e| match e.kind().get_transaction_error() {
                Some(tx_err) => LedgerError::Preflight(tx_err.to_string()),
                None => LedgerError::Send(e.to_string()),
            })
    }

    async fn await_confirmation(
        &self,
        signature: &Signature,
        reference: &LedgerReference,
    ) -> Result<Confirmation, LedgerError> {
        loop {
            match self.poll_status(signature).await {
                Ok(Some(confirmation)) => return Ok(confirmation),
                Ok(None) => {}
                // Transient; the caller's timeout bounds the retries
                Err(e) => tracing::warn!(signature = %signature, error = %e, "Status poll failed"),
            }

            if self.past_validity(reference).await {
                // The signature can land between the status and height polls
                match self.poll_status(signature).await {
                    Ok(Some(confirmation)) => return Ok(confirmation),
                    Ok(None) => {
                        tracing::debug!(
                            signature = %signature,
                            last_valid_block_height = reference.last_valid_block_height,
                            "Blockhash expired before confirmation"
                        );
                        return Ok(Confirmation::Expired);
                    }
                    Err(e) => {
                        tracing::warn!(signature = %signature, error = %e, "Status recheck failed")
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
