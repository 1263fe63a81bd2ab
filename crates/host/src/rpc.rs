//! Dispute client talking to the challenge contract over JSON-RPC

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};
use xlayer_dispute_bindings::{encode_bisect_execution, encode_one_step_prove_execution, ExecutionCounters};
use xlayer_dispute_core::Hash;

use crate::cancel::CancelToken;
use crate::client::{BisectionMove, DisputeClient, OneStepProofMove, SubmissionError, TxRef};
use crate::config::ChallengerConfig;

/// Gas limit for challenge moves
const MOVE_GAS_LIMIT: &str = "0x500000";

/// Sends moves with `eth_sendTransaction` from an unlocked account and waits
/// for the receipt.
#[derive(Debug)]
pub struct RpcDisputeClient {
    l1_rpc: String,
    challenge_address: String,
    from_address: String,
    poll_interval: Duration,
    http_client: reqwest::Client,
}

impl RpcDisputeClient {
    /// Client for the configured node and challenge contract
    pub fn new(config: &ChallengerConfig) -> Self {
        Self {
            l1_rpc: config.l1_rpc.clone(),
            challenge_address: config.challenge_address.clone(),
            from_address: config.challenger_address.clone(),
            poll_interval: Duration::from_secs(config.receipt_poll_secs.max(1)),
            http_client: reqwest::Client::new(),
        }
    }

    /// Call RPC
    async fn rpc_call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http_client
            .post(&self.l1_rpc)
            .json(&request)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("{} failed: {}", method, error));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("No result in response"))
    }

    async fn send_transaction(&self, calldata: Vec<u8>) -> Result<Hash> {
        let tx_request = serde_json::json!({
            "from": self.from_address,
            "to": self.challenge_address,
            "data": format!("0x{}", hex::encode(&calldata)),
            "gas": MOVE_GAS_LIMIT
        });

        let result = self
            .rpc_call("eth_sendTransaction", serde_json::json!([tx_request]))
            .await?;
        let tx_hash = result.as_str().ok_or_else(|| anyhow!("No tx hash in response"))?;
        parse_hash(tx_hash)
    }

    /// Poll for the receipt; `None` while the transaction is pending
    async fn receipt_status(&self, tx_hash: &Hash) -> Result<Option<bool>> {
        let receipt = self
            .rpc_call(
                "eth_getTransactionReceipt",
                serde_json::json!([format!("0x{}", hex::encode(tx_hash))]),
            )
            .await?;

        if receipt.is_null() {
            return Ok(None);
        }
        Ok(Some(receipt.get("status").and_then(|s| s.as_str()) == Some("0x1")))
    }

    async fn submit(&self, cancel: &CancelToken, calldata: Vec<u8>) -> Result<TxRef, SubmissionError> {
        if cancel.is_cancelled() {
            return Err(SubmissionError::Cancelled);
        }

        let tx_hash = self.send_transaction(calldata).await?;
        let tx = TxRef(tx_hash);
        info!("  tx_hash: {}", tx);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Stopped waiting for receipt of {}", tx);
                    return Err(SubmissionError::Cancelled);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            match self.receipt_status(&tx_hash).await? {
                Some(true) => return Ok(tx),
                Some(false) => return Err(SubmissionError::Rejected(format!("{} reverted", tx))),
                None => {}
            }
        }
    }
}

fn parse_hash(value: &str) -> Result<Hash> {
    let bytes = hex::decode(value.trim_start_matches("0x"))?;
    if bytes.len() != 32 {
        return Err(anyhow!("Invalid hash length {}", bytes.len()));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

#[async_trait]
impl DisputeClient for RpcDisputeClient {
    async fn submit_bisection(
        &self,
        cancel: &CancelToken,
        bisection: BisectionMove,
    ) -> Result<TxRef, SubmissionError> {
        let sub_hashes: Vec<Hash> = bisection.sub_cuts.iter().map(|cut| cut.cut_hash()).collect();
        let calldata = encode_bisect_execution(
            &bisection.prev_bisection.cut_hashes(),
            bisection.segment_index as u64,
            bisection.segment.start,
            bisection.segment.length,
            &sub_hashes,
        );
        self.submit(cancel, calldata).await
    }

    async fn submit_one_step_proof(
        &self,
        cancel: &CancelToken,
        proof: OneStepProofMove,
    ) -> Result<TxRef, SubmissionError> {
        let info = &proof.execution_info;
        let counters = ExecutionCounters {
            gas_used: info.gas_used,
            inbox_messages_read: info.inbox_messages_read,
            send_count: info.send_count,
            log_count: info.log_count,
        };
        let calldata = encode_one_step_prove_execution(
            &proof.prev_bisection.cut_hashes(),
            proof.segment_index as u64,
            &counters,
            info.send_acc,
            info.log_acc,
            info.machine_hash,
            proof.inbox_delta,
            &proof.machine_proof,
            &proof.buffer_proof,
        );
        self.submit(cancel, calldata).await
    }
}
