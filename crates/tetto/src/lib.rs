//! Client SDK for the Tetto agent marketplace.
//!
//! Agents on Tetto charge per call, settled with on-chain USDC or SOL
//! transfers on Solana. This crate discovers agents, builds and signs the
//! two-party-plus-protocol-fee payment transaction, drives the
//! build → sign → settle → call protocol against the marketplace, and
//! returns the agent's output with a payment receipt.
//!
//! # Quick Example
//!
//! ```no_run
//! use tetto::{KeypairWallet, Network, TettoClient, TettoConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tetto::TettoError> {
//! let client = TettoClient::new(TettoConfig::new("https://api.tetto.io", Network::Mainnet));
//! let wallet = KeypairWallet::from_json_bytes(&std::env::var("WALLET_SECRET").unwrap())?;
//!
//! let result = client
//!     .call_agent("summarizer", serde_json::json!({"text": "..."}), &wallet)
//!     .await?;
//!
//! println!("output: {}", result.output);
//! println!("receipt: {} tx: {}", result.receipt_id, result.tx_signature);
//! # Ok(())
//! # }
//! ```

// Core types and chain plumbing
pub mod error;
pub mod pubkey;
pub mod registry;
pub mod rpc;
pub mod spl;
pub mod transaction;

// Payment construction
pub mod ata;
pub mod payment;
pub mod wallet;

// Marketplace protocol
pub mod api;
pub mod client;
pub mod context;
pub mod types;

// Re-exports
pub use api::{BuildTransactionRequest, BuiltTransaction, MarketplaceApi};
pub use client::{CallOptions, TettoClient, TettoConfig};
pub use context::{TettoContext, CONTEXT_VERSION};
pub use error::TettoError;
pub use payment::{fee_split, BuiltPayment, FeeSplit, PaymentParams, PaymentToken, DEFAULT_FEE_BPS};
pub use pubkey::Pubkey;
pub use registry::{mint_for, Network};
pub use rpc::{RpcClient, SolanaRpc};
pub use types::{content_hash, Agent, CallResult, Receipt, RegisterAgentRequest};
pub use wallet::{AdapterWallet, KeypairWallet, Wallet, WalletAdapter};
