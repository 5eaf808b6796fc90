//! Solana JSON-RPC access.
//!
//! The SDK needs three things from the chain: a recent blockhash to stamp
//! payment transactions, an account-existence check for the ATA resolver,
//! and (legacy protocol only) transaction submission. [`SolanaRpc`] is the
//! seam; [`RpcClient`] is the reqwest-backed implementation.

use std::future::Future;

use base64::Engine;
use serde_json::{json, Value};

use crate::error::TettoError;
use crate::pubkey::Pubkey;

/// Minimal chain-read/submit capability used by the resolver and the
/// payment builder.
pub trait SolanaRpc: Send + Sync {
    /// Fetch a recent blockhash to stamp a new transaction with.
    fn latest_blockhash(&self)
        -> impl Future<Output = Result<[u8; 32], TettoError>> + Send;

    /// Whether an account currently exists on chain.
    fn account_exists(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<bool, TettoError>> + Send;

    /// Submit a signed wire-format transaction, returning its signature.
    fn send_transaction(
        &self,
        wire: &[u8],
    ) -> impl Future<Output = Result<String, TettoError>> + Send;
}

/// JSON-RPC client for a Solana node.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, TettoError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TettoError::RpcError(format!("{method} request failed: {e}")))?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| TettoError::RpcError(format!("{method} response parse failed: {e}")))?;

        if let Some(err) = body.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(TettoError::RpcError(format!("{method}: {message}")));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| TettoError::RpcError(format!("{method}: missing result field")))
    }
}

impl SolanaRpc for RpcClient {
    async fn latest_blockhash(&self) -> Result<[u8; 32], TettoError> {
        let result = self
            .request("getLatestBlockhash", json!([{"commitment": "confirmed"}]))
            .await?;

        let blockhash = result
            .pointer("/value/blockhash")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                TettoError::RpcError("getLatestBlockhash: missing blockhash".into())
            })?;

        let bytes = bs58::decode(blockhash)
            .into_vec()
            .map_err(|e| TettoError::RpcError(format!("blockhash decode failed: {e}")))?;
        bytes
            .try_into()
            .map_err(|_| TettoError::RpcError("blockhash is not 32 bytes".into()))
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, TettoError> {
        let result = self
            .request(
                "getAccountInfo",
                json!([address.to_base58(), {"encoding": "base64"}]),
            )
            .await?;

        Ok(result.get("value").map(|v| !v.is_null()).unwrap_or(false))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, TettoError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(wire);
        let result = self
            .request("sendTransaction", json!([encoded, {"encoding": "base64"}]))
            .await?;

        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| TettoError::RpcError("sendTransaction: non-string signature".into()))
    }
}
