//! The agent-call orchestrator.
//!
//! [`TettoClient`] drives one paid call end to end: fetch the agent
//! record, compute the fee split, obtain an unsigned payment transaction,
//! get it signed by the caller's wallet, and hand it to the platform for
//! settlement and agent execution.
//!
//! Two protocols exist. The current one is platform-builds: the SDK POSTs
//! the input to `build-transaction` (which validates it server-side before
//! any payment exists), signs the returned transaction, and POSTs the
//! payment-intent id plus signed bytes to `call`. The legacy one is
//! client-builds: the SDK constructs and submits the transaction itself,
//! then reports the signature. New integrations should use the current
//! path; the legacy one remains for older deployments.
//!
//! The SDK enforces no timeouts of its own and retries nothing. A caller
//! that stops awaiting a call has not cancelled the payment: a transaction
//! that was already signed and handed off may still settle on chain.

use base64::Engine;
use serde_json::Value;

use crate::api::{
    BuildTransactionRequest, CompleteCallRequest, LegacyCallRequest, MarketplaceApi,
};
use crate::context::{resolve_outbound_identity, TettoContext};
use crate::error::TettoError;
use crate::payment::{build_payment, fee_split, PaymentParams, PaymentToken};
use crate::pubkey::Pubkey;
use crate::registry::{mint_for, Network};
use crate::rpc::{RpcClient, SolanaRpc};
use crate::types::{Agent, CallResult, Receipt, RegisterAgentRequest};
use crate::wallet::Wallet;

/// Immutable SDK configuration. The client holds nothing else: no agent
/// cache, no wallet reference, no mutable state.
#[derive(Debug, Clone)]
pub struct TettoConfig {
    /// Marketplace API base URL.
    pub api_url: String,
    pub network: Network,
    /// Protocol treasury wallet. Required only for the legacy
    /// client-builds path; the platform knows its own treasury otherwise.
    pub protocol_wallet: Option<Pubkey>,
    /// Solana RPC override; defaults to the network's public endpoint.
    pub rpc_url: Option<String>,
    /// Identity stamped on outbound calls when this client belongs to an
    /// agent (coordinator pattern). `None` means calls report as
    /// human-originated.
    pub agent_id: Option<String>,
}

impl TettoConfig {
    pub fn new(api_url: impl Into<String>, network: Network) -> Self {
        Self {
            api_url: api_url.into(),
            network,
            protocol_wallet: None,
            rpc_url: None,
            agent_id: None,
        }
    }

    /// Build a config from the environment, loading a `.env` file when one
    /// is present. `TETTO_API_URL` is required; `TETTO_NETWORK` defaults to
    /// mainnet; `TETTO_RPC_URL` and `TETTO_AGENT_ID` are optional.
    pub fn from_env() -> Result<Self, TettoError> {
        dotenvy::dotenv().ok();
        let api_url = std::env::var("TETTO_API_URL")
            .map_err(|_| TettoError::ConfigError("TETTO_API_URL is not set".into()))?;
        let network = match std::env::var("TETTO_NETWORK") {
            Ok(name) => name.parse()?,
            Err(_) => Network::Mainnet,
        };

        let mut config = Self::new(api_url, network);
        config.rpc_url = std::env::var("TETTO_RPC_URL").ok();
        config.agent_id = std::env::var(crate::context::AGENT_ID_ENV)
            .ok()
            .filter(|v| !v.is_empty());
        Ok(config)
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_protocol_wallet(mut self, wallet: Pubkey) -> Self {
        self.protocol_wallet = Some(wallet);
        self
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Pay in a different token than the agent's default, when the agent
    /// accepts it.
    pub selected_token: Option<String>,
    /// Per-call identity override; takes precedence over the configured
    /// agent id.
    pub calling_agent_id: Option<String>,
}

/// Reject agent records whose fee rate exceeds 100% before any money is
/// split against them. The value is server-supplied and untrusted.
fn validated_fee_bps(agent: &Agent) -> Result<u64, TettoError> {
    let fee_bps = agent.fee_bps_or_default();
    if fee_bps > 10_000 {
        return Err(TettoError::CallFailed(format!(
            "agent {} has invalid fee_bps {fee_bps}",
            agent.id
        )));
    }
    Ok(fee_bps)
}

/// Client for the Tetto marketplace.
pub struct TettoClient {
    config: TettoConfig,
    api: MarketplaceApi,
}

impl TettoClient {
    pub fn new(config: TettoConfig) -> Self {
        let api = MarketplaceApi::new(config.api_url.clone());
        Self { config, api }
    }

    /// Derive a coordinator client from an inbound call's context, so that
    /// sub-calls report this agent, not a human, as their originator.
    ///
    /// An agent that receives a context with `caller_agent_id = "X"` and
    /// wants to call further agents must construct its client this way (or
    /// set `agent_id` explicitly); otherwise downstream analytics
    /// misclassify its sub-calls.
    pub fn from_context(mut config: TettoConfig, context: &TettoContext) -> Self {
        if let Some(agent_id) = &context.caller_agent_id {
            config.agent_id = Some(agent_id.clone());
        }
        Self::new(config)
    }

    pub fn config(&self) -> &TettoConfig {
        &self.config
    }

    pub fn api(&self) -> &MarketplaceApi {
        &self.api
    }

    /// RPC client for the configured cluster, honoring the `rpc_url`
    /// override. Only the legacy call path needs chain access.
    pub fn rpc_client(&self) -> RpcClient {
        let url = self
            .config
            .rpc_url
            .clone()
            .unwrap_or_else(|| self.config.network.default_rpc_url().to_string());
        RpcClient::new(url)
    }

    /// The identity this client would stamp on an outbound call.
    /// Precedence: per-call override, configured id, environment fallback.
    pub fn outbound_identity(&self, options: &CallOptions) -> Option<String> {
        resolve_outbound_identity(
            options.calling_agent_id.as_deref(),
            self.config.agent_id.as_deref(),
        )
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Agent, TettoError> {
        self.api.get_agent(agent_id).await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, TettoError> {
        self.api.list_agents().await
    }

    pub async fn register_agent(
        &self,
        request: &RegisterAgentRequest,
    ) -> Result<Agent, TettoError> {
        self.api.register_agent(request).await
    }

    pub async fn get_receipt(&self, receipt_id: &str) -> Result<Receipt, TettoError> {
        self.api.get_receipt(receipt_id).await
    }

    /// Make a paid call to an agent (current protocol, platform-builds).
    pub async fn call_agent<W: Wallet>(
        &self,
        agent_id: &str,
        input: Value,
        wallet: &W,
    ) -> Result<CallResult, TettoError> {
        self.call_agent_with(agent_id, input, wallet, &CallOptions::default())
            .await
    }

    /// [`call_agent`](Self::call_agent) with per-call options.
    pub async fn call_agent_with<W: Wallet>(
        &self,
        agent_id: &str,
        input: Value,
        wallet: &W,
        options: &CallOptions,
    ) -> Result<CallResult, TettoError> {
        let agent = self.api.get_agent(agent_id).await?;
        let fee_bps = validated_fee_bps(&agent)?;

        // The platform computes the same split server-side; computing it
        // here keeps the amounts auditable by both parties.
        let split = fee_split(agent.price_base, fee_bps);
        tracing::info!(
            agent = %agent.id,
            price_base = agent.price_base,
            agent_amount = split.agent_amount,
            fee_amount = split.fee_amount,
            "calling agent"
        );

        // Input is validated server-side before any payment exists; a
        // schema failure comes back here, with no transaction to sign.
        let built = self
            .api
            .build_transaction(
                agent_id,
                &BuildTransactionRequest {
                    payer_wallet: wallet.public_key().to_base58(),
                    selected_token: options.selected_token.clone(),
                    input,
                    calling_agent_id: self.outbound_identity(options),
                },
            )
            .await?;

        let wire = base64::engine::general_purpose::STANDARD
            .decode(&built.transaction)
            .map_err(|e| {
                TettoError::TransactionError(format!("platform transaction is not base64: {e}"))
            })?;

        let signed = wallet.sign_transaction(&wire).await?;

        let result = self
            .api
            .complete_call(&CompleteCallRequest {
                payment_intent_id: built.payment_intent_id,
                signed_transaction: base64::engine::general_purpose::STANDARD.encode(&signed),
            })
            .await?;

        tracing::info!(
            receipt = %result.receipt_id,
            signature = %result.tx_signature,
            "call settled"
        );
        Ok(result)
    }

    /// Make a paid call building and submitting the payment transaction
    /// locally (legacy protocol). Requires a configured protocol wallet
    /// and chain access.
    pub async fn call_agent_legacy<W: Wallet>(
        &self,
        agent_id: &str,
        input: Value,
        wallet: &W,
        rpc: &impl SolanaRpc,
        options: &CallOptions,
    ) -> Result<CallResult, TettoError> {
        let agent = self.api.get_agent(agent_id).await?;
        let fee_bps = validated_fee_bps(&agent)?;

        let protocol_wallet = self.config.protocol_wallet.ok_or_else(|| {
            TettoError::ConfigError(
                "legacy calls require a configured protocol wallet".into(),
            )
        })?;
        let agent_wallet = Pubkey::from_base58(&agent.owner_wallet)?;

        let symbol = options.selected_token.as_deref().unwrap_or(&agent.token);
        let token = if symbol == "SOL" {
            PaymentToken::Sol
        } else {
            let mint = match &agent.token_mint {
                Some(mint) => Pubkey::from_base58(mint)?,
                None => Pubkey::from_base58(mint_for(symbol, self.config.network)?)?,
            };
            PaymentToken::Spl { mint }
        };

        let split = fee_split(agent.price_base, fee_bps);
        let built = build_payment(
            rpc,
            &PaymentParams {
                payer: wallet.public_key(),
                agent_wallet,
                protocol_wallet,
                gross_amount: agent.price_base,
                fee_amount: split.fee_amount,
                token,
            },
        )
        .await?;
        if built.atas_created > 0 {
            tracing::info!(count = built.atas_created, "payment will create token accounts");
        }

        let signed = wallet
            .sign_transaction(&built.transaction.to_wire_unsigned())
            .await?;
        let tx_signature = rpc.send_transaction(&signed).await?;
        tracing::info!(signature = %tx_signature, "payment submitted");

        let mut result = self
            .api
            .complete_call_legacy(&LegacyCallRequest {
                agent_id: agent.id,
                input,
                caller_wallet: wallet.public_key().to_base58(),
                tx_signature,
                selected_token: options.selected_token.clone(),
            })
            .await?;

        // Older deployments omit the explorer link; synthesize it from the
        // configured cluster.
        if result.explorer_url.is_none() {
            result.explorer_url =
                Some(self.config.network.explorer_tx_url(&result.tx_signature));
        }
        Ok(result)
    }

    /// Call several agents concurrently, failing if any call fails.
    ///
    /// Results are positional with `calls`; completion order is
    /// unspecified and must not be relied on.
    pub async fn call_agents<W: Wallet>(
        &self,
        calls: &[(String, Value)],
        wallet: &W,
    ) -> Result<Vec<CallResult>, TettoError> {
        futures::future::try_join_all(
            calls
                .iter()
                .map(|(agent_id, input)| self.call_agent(agent_id, input.clone(), wallet)),
        )
        .await
    }

    /// Call several agents concurrently, collecting every outcome.
    ///
    /// Unlike [`call_agents`](Self::call_agents), one failure does not
    /// discard the other results. Results are positional with `calls`.
    pub async fn call_agents_settled<W: Wallet>(
        &self,
        calls: &[(String, Value)],
        wallet: &W,
    ) -> Vec<Result<CallResult, TettoError>> {
        futures::future::join_all(
            calls
                .iter()
                .map(|(agent_id, input)| self.call_agent(agent_id, input.clone(), wallet)),
        )
        .await
    }
}
