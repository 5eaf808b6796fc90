//! Wallet capability shims.
//!
//! Two very different signing sources, an in-process Ed25519 keypair and
//! an external wallet adapter with its own approval flow, are normalized
//! into one minimal capability: a public key plus transaction signing.
//! Submission is deliberately not part of the shape; the platform submits.
//! (Earlier SDK generations carried a network connection and a
//! `send_transaction` alternative here; that shape is retired.)
//!
//! The SDK never persists, caches, or logs key material, and holds no
//! reference to a wallet beyond the single call it signs for.

use std::fmt;
use std::future::Future;

use ed25519_dalek::Signer as _;

use crate::error::TettoError;
use crate::pubkey::Pubkey;
use crate::transaction::{find_signer_slot, parse_wire_layout};

/// The minimal wallet capability the orchestrator needs.
pub trait Wallet: Send + Sync {
    fn public_key(&self) -> Pubkey;

    /// Sign a wire-format transaction, filling this wallet's signature
    /// slot, and return the signed bytes. A rejection (user decline, signer
    /// failure) surfaces as [`TettoError::SigningRejected`] and is never
    /// retried by the SDK.
    fn sign_transaction(
        &self,
        wire: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, TettoError>> + Send;
}

/// Sign `wire` in place with an Ed25519 signing key, writing into the
/// slot that matches the key's public half.
fn sign_wire(key: &ed25519_dalek::SigningKey, wire: &[u8]) -> Result<Vec<u8>, TettoError> {
    let layout = parse_wire_layout(wire)?;
    let message = &wire[layout.message_start..];
    let pubkey = Pubkey(key.verifying_key().to_bytes());

    let slot = find_signer_slot(message, layout.num_signatures, &pubkey)?;
    let signature = key.sign(message);

    let mut signed = wire.to_vec();
    let offset = layout.sigs_start + slot * 64;
    signed[offset..offset + 64].copy_from_slice(&signature.to_bytes());
    Ok(signed)
}

/// Wallet backed by a raw in-process keypair. Signs synchronously, no
/// network or approval step.
pub struct KeypairWallet {
    key: ed25519_dalek::SigningKey,
}

// Manual impl: deriving would print the signing key.
impl fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl KeypairWallet {
    /// From a 32-byte Ed25519 seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self { key: ed25519_dalek::SigningKey::from_bytes(&seed) }
    }

    /// From the JSON byte-array secret format used for coordinator wallets
    /// (`[12,34,...]`): either a 64-byte keypair (seed + public key) or a
    /// bare 32-byte seed.
    pub fn from_json_bytes(json: &str) -> Result<Self, TettoError> {
        let bytes: Vec<u8> = serde_json::from_str(json)
            .map_err(|e| TettoError::InvalidWallet(format!("bad secret key JSON: {e}")))?;

        let seed: [u8; 32] = match bytes.len() {
            64 => bytes[..32].try_into().unwrap(),
            32 => bytes.try_into().unwrap(),
            n => {
                return Err(TettoError::InvalidWallet(format!(
                    "secret key must be 32 or 64 bytes, got {n}"
                )))
            }
        };
        Ok(Self::from_seed(seed))
    }
}

impl Wallet for KeypairWallet {
    fn public_key(&self) -> Pubkey {
        Pubkey(self.key.verifying_key().to_bytes())
    }

    async fn sign_transaction(&self, wire: &[u8]) -> Result<Vec<u8>, TettoError> {
        sign_wire(&self.key, wire)
    }
}

/// An external wallet implementation (browser extension bridge, hardware
/// wallet daemon, remote signer). Signing may involve a user approval flow
/// entirely outside this process.
pub trait WalletAdapter: Send + Sync {
    /// The connected public key, if the adapter has an active session.
    fn connected_public_key(&self) -> Option<Pubkey>;

    /// Whether the adapter exposes transaction signing at all.
    fn supports_signing(&self) -> bool;

    /// Delegate signing to the adapter. An `Err` means the signer refused
    /// or failed; the message is surfaced verbatim.
    fn sign_transaction(
        &self,
        wire: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, String>> + Send;
}

/// Shim over a [`WalletAdapter`], validated at construction so a
/// disconnected or sign-incapable adapter fails before any call starts.
#[derive(Debug)]
pub struct AdapterWallet<A: WalletAdapter> {
    adapter: A,
    public_key: Pubkey,
}

impl<A: WalletAdapter> AdapterWallet<A> {
    pub fn new(adapter: A) -> Result<Self, TettoError> {
        let public_key = adapter.connected_public_key().ok_or_else(|| {
            TettoError::InvalidWallet("wallet adapter is not connected".into())
        })?;
        if !adapter.supports_signing() {
            return Err(TettoError::InvalidWallet(
                "wallet adapter does not support transaction signing".into(),
            ));
        }
        Ok(Self { adapter, public_key })
    }
}

impl<A: WalletAdapter> Wallet for AdapterWallet<A> {
    fn public_key(&self) -> Pubkey {
        self.public_key
    }

    async fn sign_transaction(&self, wire: &[u8]) -> Result<Vec<u8>, TettoError> {
        self.adapter
            .sign_transaction(wire)
            .await
            .map_err(TettoError::SigningRejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{system_transfer, Transaction};
    use ed25519_dalek::Verifier as _;

    fn unsigned_wire_for(payer: &Pubkey) -> Vec<u8> {
        let ix = system_transfer(payer, &Pubkey([0xBB; 32]), 1_000);
        let tx = Transaction::compile(&[ix], payer, &[0xCC; 32]).unwrap();
        tx.to_wire_unsigned()
    }

    #[tokio::test]
    async fn keypair_wallet_signs_its_slot() {
        let wallet = KeypairWallet::from_seed([0x42; 32]);
        let payer = wallet.public_key();
        let wire = unsigned_wire_for(&payer);

        let signed = wallet.sign_transaction(&wire).await.unwrap();
        assert_eq!(signed.len(), wire.len());
        // Message portion is untouched.
        assert_eq!(&signed[65..], &wire[65..]);

        let sig_bytes: [u8; 64] = signed[1..65].try_into().unwrap();
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        let vk = ed25519_dalek::VerifyingKey::from_bytes(payer.as_bytes()).unwrap();
        assert!(vk.verify(&signed[65..], &signature).is_ok());
    }

    #[tokio::test]
    async fn keypair_wallet_rejects_foreign_transaction() {
        let wallet = KeypairWallet::from_seed([0x42; 32]);
        // Fee payer is someone else entirely.
        let wire = unsigned_wire_for(&Pubkey([0x99; 32]));

        let err = wallet.sign_transaction(&wire).await.unwrap_err();
        assert!(matches!(err, TettoError::SigningRejected(_)));
    }

    #[test]
    fn keypair_from_json_bytes_64_and_32() {
        let seed = [7u8; 32];
        let reference = KeypairWallet::from_seed(seed);

        let seed_json = serde_json::to_string(&seed.to_vec()).unwrap();
        let w32 = KeypairWallet::from_json_bytes(&seed_json).unwrap();
        assert_eq!(w32.public_key(), reference.public_key());

        let mut full = seed.to_vec();
        full.extend_from_slice(reference.public_key().as_bytes());
        let full_json = serde_json::to_string(&full).unwrap();
        let w64 = KeypairWallet::from_json_bytes(&full_json).unwrap();
        assert_eq!(w64.public_key(), reference.public_key());
    }

    #[test]
    fn keypair_debug_shows_public_key_only() {
        let wallet = KeypairWallet::from_seed([0x42; 32]);
        let rendered = format!("{wallet:?}");
        assert!(rendered.contains(&wallet.public_key().to_base58()));
        // No seed bytes (0x42 = 66) in any rendering.
        assert!(!rendered.contains("66, 66"));
        assert!(!rendered.contains("key: ["));
    }

    #[test]
    fn keypair_from_json_bytes_bad_length() {
        let err = KeypairWallet::from_json_bytes("[1,2,3]").unwrap_err();
        assert!(matches!(err, TettoError::InvalidWallet(_)));
    }

    #[derive(Debug)]
    struct FakeAdapter {
        pubkey: Option<Pubkey>,
        can_sign: bool,
        decline: bool,
    }

    impl WalletAdapter for FakeAdapter {
        fn connected_public_key(&self) -> Option<Pubkey> {
            self.pubkey
        }

        fn supports_signing(&self) -> bool {
            self.can_sign
        }

        async fn sign_transaction(&self, wire: &[u8]) -> Result<Vec<u8>, String> {
            if self.decline {
                return Err("user declined the request".into());
            }
            Ok(wire.to_vec())
        }
    }

    #[test]
    fn adapter_wallet_requires_connection() {
        let err = AdapterWallet::new(FakeAdapter {
            pubkey: None,
            can_sign: true,
            decline: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }

    #[test]
    fn adapter_wallet_requires_signing_support() {
        let err = AdapterWallet::new(FakeAdapter {
            pubkey: Some(Pubkey([1; 32])),
            can_sign: false,
            decline: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("does not support"));
    }

    #[tokio::test]
    async fn adapter_decline_surfaces_verbatim() {
        let wallet = AdapterWallet::new(FakeAdapter {
            pubkey: Some(Pubkey([1; 32])),
            can_sign: true,
            decline: true,
        })
        .unwrap();

        let err = wallet.sign_transaction(&[0x01]).await.unwrap_err();
        match err {
            TettoError::SigningRejected(msg) => {
                assert_eq!(msg, "user declined the request")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
