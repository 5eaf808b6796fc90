//! HTTP contracts with the marketplace backend.
//!
//! Each endpoint gets explicit request/response types and a conversion
//! into `Result`, so error handling is exhaustive instead of string
//! matching on loosely-typed bodies. Server error strings are surfaced
//! verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TettoError;
use crate::types::{Agent, CallResult, Receipt, RegisterAgentRequest};

/// Request body for `POST /api/agents/{id}/build-transaction`.
///
/// Sent before any payment exists; the platform validates `input` against
/// the agent's schema and only returns an unsigned transaction when it
/// passes, so bad input never reaches the payment step.
#[derive(Debug, Clone, Serialize)]
pub struct BuildTransactionRequest {
    pub payer_wallet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_token: Option<String>,
    pub input: Value,
    /// Identity stamp for agent-originated calls; `None` reports the call
    /// as human-originated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calling_agent_id: Option<String>,
}

/// Success payload of the build-transaction endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BuiltTransaction {
    /// Unsigned transaction, base64 wire format.
    pub transaction: String,
    pub payment_intent_id: String,
    pub amount_base: u64,
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub input_hash: Option<String>,
}

/// Request body for the current `POST /api/agents/call`: the platform
/// submits, confirms, executes the agent, and validates output.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteCallRequest {
    pub payment_intent_id: String,
    /// Signed transaction, base64 wire format.
    pub signed_transaction: String,
}

/// Request body for the legacy `POST /api/agents/call`, where the client
/// has already submitted the transaction itself.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyCallRequest {
    pub agent_id: String,
    pub input: Value,
    pub caller_wallet: String,
    pub tx_signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentEnvelope {
    ok: bool,
    #[serde(default)]
    agent: Option<Agent>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentListEnvelope {
    ok: bool,
    #[serde(default)]
    agents: Option<Vec<Agent>>,
    #[serde(default)]
    error: Option<String>,
}

// Success fields are individually optional so `{ok:false, error}` bodies
// parse cleanly; `into_result` enforces presence on the success path.
#[derive(Debug, Deserialize)]
struct BuildTransactionEnvelope {
    ok: bool,
    #[serde(default)]
    transaction: Option<String>,
    #[serde(default)]
    payment_intent_id: Option<String>,
    #[serde(default)]
    amount_base: Option<u64>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    input_hash: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl BuildTransactionEnvelope {
    fn into_result(self) -> Result<BuiltTransaction, TettoError> {
        if !self.ok {
            return Err(TettoError::CallFailed(server_error(self.error)));
        }
        match (self.transaction, self.payment_intent_id, self.amount_base, self.token) {
            (Some(transaction), Some(payment_intent_id), Some(amount_base), Some(token)) => {
                Ok(BuiltTransaction {
                    transaction,
                    payment_intent_id,
                    amount_base,
                    token,
                    expires_at: self.expires_at,
                    input_hash: self.input_hash,
                })
            }
            _ => Err(TettoError::CallFailed(
                "build-transaction response missing required fields".into(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallEnvelope {
    ok: bool,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    tx_signature: Option<String>,
    #[serde(default)]
    receipt_id: Option<String>,
    #[serde(default)]
    explorer_url: Option<String>,
    #[serde(default)]
    agent_received: Option<u64>,
    #[serde(default)]
    protocol_fee: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

impl CallEnvelope {
    fn into_result(self) -> Result<CallResult, TettoError> {
        if !self.ok {
            return Err(TettoError::CallFailed(server_error(self.error)));
        }
        match (self.output, self.tx_signature, self.receipt_id) {
            (Some(output), Some(tx_signature), Some(receipt_id)) => Ok(CallResult {
                output,
                tx_signature,
                receipt_id,
                explorer_url: self.explorer_url,
                agent_received: self.agent_received.unwrap_or(0),
                protocol_fee: self.protocol_fee.unwrap_or(0),
            }),
            _ => Err(TettoError::CallFailed(
                "call response missing required fields".into(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReceiptEnvelope {
    ok: bool,
    #[serde(default)]
    receipt: Option<Receipt>,
    #[serde(default)]
    error: Option<String>,
}

fn server_error(error: Option<String>) -> String {
    error.unwrap_or_else(|| "unknown server error".into())
}

/// Typed client for the marketplace API.
pub struct MarketplaceApi {
    http: reqwest::Client,
    base_url: String,
}

impl MarketplaceApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<T, TettoError> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| TettoError::HttpError(format!("GET {path} failed: {e}")))?;
        resp.json()
            .await
            .map_err(|e| TettoError::HttpError(format!("GET {path} parse failed: {e}")))
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TettoError> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| TettoError::HttpError(format!("POST {path} failed: {e}")))?;
        resp.json()
            .await
            .map_err(|e| TettoError::HttpError(format!("POST {path} parse failed: {e}")))
    }

    /// `GET /api/agents`
    pub async fn list_agents(&self) -> Result<Vec<Agent>, TettoError> {
        let envelope: AgentListEnvelope = self.get_json("/api/agents").await?;
        match envelope {
            AgentListEnvelope { ok: true, agents: Some(agents), .. } => Ok(agents),
            AgentListEnvelope { error, .. } => {
                Err(TettoError::CallFailed(server_error(error)))
            }
        }
    }

    /// `GET /api/agents/{id}`
    pub async fn get_agent(&self, agent_id: &str) -> Result<Agent, TettoError> {
        let envelope: AgentEnvelope =
            self.get_json(&format!("/api/agents/{agent_id}")).await?;
        match envelope {
            AgentEnvelope { ok: true, agent: Some(agent), .. } => Ok(agent),
            AgentEnvelope { error, .. } => {
                Err(TettoError::AgentNotFound(server_error(error)))
            }
        }
    }

    /// `POST /api/agents/register`. Server-side error codes such as
    /// `AGENT_NAME_TAKEN` or `INVALID_SCHEMA` come back verbatim.
    pub async fn register_agent(
        &self,
        request: &RegisterAgentRequest,
    ) -> Result<Agent, TettoError> {
        let envelope: AgentEnvelope =
            self.post_json("/api/agents/register", request).await?;
        match envelope {
            AgentEnvelope { ok: true, agent: Some(agent), .. } => Ok(agent),
            AgentEnvelope { error, .. } => {
                Err(TettoError::CallFailed(server_error(error)))
            }
        }
    }

    /// `POST /api/agents/{id}/build-transaction`
    pub async fn build_transaction(
        &self,
        agent_id: &str,
        request: &BuildTransactionRequest,
    ) -> Result<BuiltTransaction, TettoError> {
        let envelope: BuildTransactionEnvelope = self
            .post_json(&format!("/api/agents/{agent_id}/build-transaction"), request)
            .await?;
        envelope.into_result()
    }

    /// `POST /api/agents/call` (current protocol).
    pub async fn complete_call(
        &self,
        request: &CompleteCallRequest,
    ) -> Result<CallResult, TettoError> {
        let envelope: CallEnvelope = self.post_json("/api/agents/call", request).await?;
        envelope.into_result()
    }

    /// `POST /api/agents/call` (legacy protocol).
    pub async fn complete_call_legacy(
        &self,
        request: &LegacyCallRequest,
    ) -> Result<CallResult, TettoError> {
        let envelope: CallEnvelope = self.post_json("/api/agents/call", request).await?;
        envelope.into_result()
    }

    /// `GET /api/receipts/{id}`
    pub async fn get_receipt(&self, receipt_id: &str) -> Result<Receipt, TettoError> {
        let envelope: ReceiptEnvelope =
            self.get_json(&format!("/api/receipts/{receipt_id}")).await?;
        match envelope {
            ReceiptEnvelope { ok: true, receipt: Some(receipt), .. } => Ok(receipt),
            ReceiptEnvelope { error, .. } => {
                Err(TettoError::CallFailed(server_error(error)))
            }
        }
    }
}
