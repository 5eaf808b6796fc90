//! Caller-identity context threaded through agent-to-agent calls.
//!
//! Every dispatched agent invocation may carry a [`TettoContext`] telling
//! the agent who paid and whether the call came from a human client or
//! from another agent. Absence is coded as `null`, never an error: callers
//! predating the context never populate it.
//!
//! A coordinator (an agent that calls other agents) must re-stamp its
//! own identity onto its sub-calls by deriving a client from the inbound
//! context (see [`crate::client::TettoClient::from_context`]). Skipping
//! that step makes sub-agents misclassify the call as human-originated,
//! which corrupts pricing and fraud analytics downstream.

use serde::{Deserialize, Serialize};

/// Current context-schema version stamped by the platform.
pub const CONTEXT_VERSION: u32 = 1;

/// Identity-propagation record attached to an agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TettoContext {
    /// The wallet that paid for this call.
    pub caller_wallet: String,
    /// The agent that initiated this call, or `None` when the caller is a
    /// human/direct client.
    #[serde(default)]
    pub caller_agent_id: Option<String>,
    /// Human-readable name for the calling agent, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_agent_name: Option<String>,
    /// Payment intent this call settled under, for traceability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: u32,
}

/// Environment fallback for the outbound agent identity.
pub const AGENT_ID_ENV: &str = "TETTO_AGENT_ID";

/// Tests that read or mutate `TETTO_AGENT_ID` hold this lock; the test
/// binary runs them in parallel and the environment is process-global.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Resolve the identity a client stamps on outbound calls.
///
/// Precedence: explicit per-call override, then the configured agent id,
/// then the `TETTO_AGENT_ID` environment variable, then none (the call
/// reports as human-originated).
pub fn resolve_outbound_identity(
    explicit: Option<&str>,
    configured: Option<&str>,
) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| configured.map(str::to_string))
        .or_else(|| std::env::var(AGENT_ID_ENV).ok().filter(|v| !v.is_empty()))
}
