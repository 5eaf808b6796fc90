//! Static token-mint registry.
//!
//! Canonical mint addresses per (token symbol, network) pair. The table
//! exists to rule out manual address transcription: a mainnet/devnet mint
//! mix-up is a silent payment failure, not a compile error. Adding a token
//! or network is a table edit, not a logic change.

use std::fmt;
use std::str::FromStr;

use crate::error::TettoError;

/// Solana cluster the SDK talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Devnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Devnet => "devnet",
        }
    }

    /// Default public RPC endpoint for this cluster.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.mainnet-beta.solana.com",
            Network::Devnet => "https://api.devnet.solana.com",
        }
    }

    /// Explorer URL for a transaction signature.
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        match self {
            Network::Mainnet => format!("https://explorer.solana.com/tx/{signature}"),
            Network::Devnet => {
                format!("https://explorer.solana.com/tx/{signature}?cluster=devnet")
            }
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = TettoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "mainnet-beta" => Ok(Network::Mainnet),
            "devnet" => Ok(Network::Devnet),
            other => Err(TettoError::ConfigError(format!("unknown network '{other}'"))),
        }
    }
}

/// USDC mint on mainnet.
pub const USDC_MINT_MAINNET: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Circle's USDC mint on devnet. Not the same address as mainnet.
pub const USDC_MINT_DEVNET: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

/// The wrapped-SOL mint, identical on every cluster.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Look up the canonical mint address for a token symbol on a network.
///
/// Fails with [`TettoError::UnknownMint`] naming the invalid combination
/// when the pair is not in the table.
pub fn mint_for(symbol: &str, network: Network) -> Result<&'static str, TettoError> {
    match (symbol, network) {
        ("USDC", Network::Mainnet) => Ok(USDC_MINT_MAINNET),
        ("USDC", Network::Devnet) => Ok(USDC_MINT_DEVNET),
        ("SOL", _) => Ok(SOL_MINT),
        (symbol, network) => Err(TettoError::UnknownMint(format!(
            "no known mint for token '{symbol}' on network '{network}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubkey::Pubkey;

    #[test]
    fn usdc_mints_are_distinct_and_well_formed() {
        let mainnet = mint_for("USDC", Network::Mainnet).unwrap();
        let devnet = mint_for("USDC", Network::Devnet).unwrap();
        assert_ne!(mainnet, devnet);
        assert!(Pubkey::from_base58(mainnet).is_ok());
        assert!(Pubkey::from_base58(devnet).is_ok());
    }

    #[test]
    fn sol_mint_is_network_independent() {
        let mainnet = mint_for("SOL", Network::Mainnet).unwrap();
        let devnet = mint_for("SOL", Network::Devnet).unwrap();
        assert_eq!(mainnet, devnet);
        assert!(Pubkey::from_base58(mainnet).is_ok());
        assert_ne!(mainnet, mint_for("USDC", Network::Mainnet).unwrap());
        assert_ne!(mainnet, mint_for("USDC", Network::Devnet).unwrap());
    }

    #[test]
    fn unknown_combination_names_the_pair() {
        let err = mint_for("USDT", Network::Mainnet).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("USDT"));
        assert!(msg.contains("mainnet"));
    }

    #[test]
    fn unknown_network_string_fails_parse() {
        let err = "testnet".parse::<Network>().unwrap_err();
        assert!(err.to_string().contains("testnet"));
    }

    #[test]
    fn network_roundtrip() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("mainnet-beta".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("devnet".parse::<Network>().unwrap(), Network::Devnet);
    }

    #[test]
    fn explorer_url_carries_cluster_param_on_devnet() {
        let url = Network::Devnet.explorer_tx_url("abc123");
        assert!(url.contains("abc123"));
        assert!(url.contains("cluster=devnet"));
        let url = Network::Mainnet.explorer_tx_url("abc123");
        assert!(!url.contains("cluster="));
    }
}
