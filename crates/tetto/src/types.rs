//! Marketplace data model.
//!
//! These mirror the marketplace API's JSON shapes (snake_case on the
//! wire). The SDK reads them; it never mutates an agent record or a
//! receipt.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payment::DEFAULT_FEE_BPS;

/// A marketplace-registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Price in the token's smallest unit.
    pub price_base: u64,
    /// Token symbol, e.g. "USDC" or "SOL".
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_mint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_decimals: Option<u8>,
    /// The agent owner's payout wallet.
    pub owner_wallet: String,
    /// Protocol fee in basis points. Absent means [`DEFAULT_FEE_BPS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_bps: Option<u64>,
}

impl Agent {
    pub fn fee_bps_or_default(&self) -> u64 {
        self.fee_bps.unwrap_or(DEFAULT_FEE_BPS)
    }
}

/// Registration payload for `POST /api/agents/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    pub description: String,
    pub endpoint_url: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub price_base: u64,
    pub owner_wallet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<bool>,
}

/// Terminal output of a paid agent call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    /// The agent's output, conforming to its declared output schema
    /// (validated server-side, not here).
    pub output: Value,
    pub tx_signature: String,
    pub receipt_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Base units credited to the agent owner.
    pub agent_received: u64,
    /// Base units credited to the protocol.
    pub protocol_fee: u64,
}

/// Immutable record of a completed (or failed) paid call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub caller_wallet: String,
    pub payout_wallet: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
    pub tx_signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Hex SHA-256 of a JSON value's compact serialization. Matches the
/// content hashes the platform records on receipts (`input_hash`,
/// `output_hash`).
pub fn content_hash(value: &Value) -> String {
    use sha2::{Digest, Sha256};
    let compact = serde_json::to_string(value).unwrap_or_default();
    let digest = Sha256::digest(compact.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_without_fee_bps_defaults_to_ten_percent() {
        let agent: Agent = serde_json::from_value(serde_json::json!({
            "id": "agent-1",
            "name": "summarizer",
            "price_base": 1_000_000,
            "token": "USDC",
            "owner_wallet": "11111111111111111111111111111111"
        }))
        .unwrap();
        assert_eq!(agent.fee_bps, None);
        assert_eq!(agent.fee_bps_or_default(), 1000);
    }

    #[test]
    fn agent_explicit_fee_bps_wins() {
        let agent: Agent = serde_json::from_value(serde_json::json!({
            "id": "agent-1",
            "name": "summarizer",
            "price_base": 1_000_000,
            "token": "USDC",
            "owner_wallet": "11111111111111111111111111111111",
            "fee_bps": 250
        }))
        .unwrap();
        assert_eq!(agent.fee_bps_or_default(), 250);
    }

    #[test]
    fn call_result_roundtrips_server_shape() {
        let json = serde_json::json!({
            "output": {"summary": "hi"},
            "tx_signature": "5Kd...",
            "receipt_id": "rcpt-1",
            "explorer_url": "https://explorer.solana.com/tx/5Kd...",
            "agent_received": 900_000,
            "protocol_fee": 100_000
        });
        let result: CallResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.agent_received, 900_000);
        assert_eq!(result.protocol_fee, 100_000);
    }

    #[test]
    fn content_hash_is_stable_and_input_sensitive() {
        let a = content_hash(&serde_json::json!({"text": "hello"}));
        let b = content_hash(&serde_json::json!({"text": "hello"}));
        let c = content_hash(&serde_json::json!({"text": "goodbye"}));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
