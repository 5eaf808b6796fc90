//! Associated-account resolver.
//!
//! Given an owner and a mint, derive the ATA address, check whether it
//! already exists on chain, and emit an idempotent creation instruction
//! when it does not. A failed existence lookup is downgraded to "does not
//! exist": the creation instruction is a no-op if the account lands first,
//! so attempting creation is always safer than failing the payment.

use crate::error::TettoError;
use crate::pubkey::Pubkey;
use crate::rpc::SolanaRpc;
use crate::spl;
use crate::transaction::Instruction;

/// Result of resolving one `(owner, mint)` pair.
#[derive(Debug)]
pub struct AtaResolution {
    /// The derived associated token account address.
    pub address: Pubkey,
    /// Creation instruction, present only when the account was not found.
    pub instruction: Option<Instruction>,
    /// Whether the account already existed at lookup time.
    pub existed: bool,
}

/// Aggregate summary of a batch resolution, for cost/UX reporting
/// ("2 new token accounts will be created").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub existed: usize,
    pub created: usize,
}

/// Result of resolving one mint against many owners. `addresses` is
/// positional with the input owner list; `instructions` holds only the
/// creations actually needed.
#[derive(Debug)]
pub struct BatchResolution {
    pub addresses: Vec<Pubkey>,
    pub instructions: Vec<Instruction>,
    pub summary: BatchSummary,
}

/// Resolve the associated token account for `(owner, mint)`.
///
/// `payer` funds the rent if creation turns out to be needed. The caller
/// decides whether to include or discard the returned instruction.
pub async fn resolve(
    rpc: &impl SolanaRpc,
    owner: &Pubkey,
    mint: &Pubkey,
    payer: &Pubkey,
) -> Result<AtaResolution, TettoError> {
    let address = spl::derive_ata(owner, mint)?;

    // Lookup failures are swallowed: assume absent and attempt idempotent
    // creation rather than failing the whole payment.
    let existed = match rpc.account_exists(&address).await {
        Ok(exists) => exists,
        Err(e) => {
            tracing::warn!(ata = %address, error = %e, "ATA existence check failed, assuming absent");
            false
        }
    };

    let instruction =
        (!existed).then(|| spl::create_ata_idempotent(payer, &address, owner, mint));

    Ok(AtaResolution { address, instruction, existed })
}

/// Resolve one mint against many owners, preserving input order.
pub async fn resolve_many(
    rpc: &impl SolanaRpc,
    owners: &[Pubkey],
    mint: &Pubkey,
    payer: &Pubkey,
) -> Result<BatchResolution, TettoError> {
    let mut addresses = Vec::with_capacity(owners.len());
    let mut instructions = Vec::new();
    let mut existed = 0usize;

    // Sequential on purpose: the address list is positional, and batches
    // are small (two or three owners per payment).
    for owner in owners {
        let resolution = resolve(rpc, owner, mint, payer).await?;
        addresses.push(resolution.address);
        if resolution.existed {
            existed += 1;
        }
        if let Some(ix) = resolution.instruction {
            instructions.push(ix);
        }
    }

    let summary = BatchSummary {
        total: owners.len(),
        existed,
        created: owners.len() - existed,
    };

    Ok(BatchResolution { addresses, instructions, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory chain state for resolver tests.
    struct FakeRpc {
        existing: Mutex<HashSet<Pubkey>>,
        fail_lookups: bool,
    }

    impl FakeRpc {
        fn with_accounts(accounts: &[Pubkey]) -> Self {
            Self {
                existing: Mutex::new(accounts.iter().copied().collect()),
                fail_lookups: false,
            }
        }

        fn failing() -> Self {
            Self { existing: Mutex::new(HashSet::new()), fail_lookups: true }
        }

        fn add(&self, address: Pubkey) {
            self.existing.lock().unwrap().insert(address);
        }
    }

    impl SolanaRpc for FakeRpc {
        async fn latest_blockhash(&self) -> Result<[u8; 32], TettoError> {
            Ok([0xAB; 32])
        }

        async fn account_exists(&self, address: &Pubkey) -> Result<bool, TettoError> {
            if self.fail_lookups {
                return Err(TettoError::RpcError("simulated lookup failure".into()));
            }
            Ok(self.existing.lock().unwrap().contains(address))
        }

        async fn send_transaction(&self, _wire: &[u8]) -> Result<String, TettoError> {
            Ok("fake-signature".into())
        }
    }

    fn key(byte: u8) -> Pubkey {
        Pubkey([byte; 32])
    }

    #[tokio::test]
    async fn missing_account_yields_creation_instruction() {
        let rpc = FakeRpc::with_accounts(&[]);
        let resolution = resolve(&rpc, &key(1), &key(2), &key(9)).await.unwrap();
        assert!(!resolution.existed);
        let ix = resolution.instruction.expect("expected creation instruction");
        assert_eq!(ix.program_id, spl::ASSOCIATED_TOKEN_PROGRAM_ID);
    }

    #[tokio::test]
    async fn existing_account_yields_no_instruction() {
        let owner = key(1);
        let mint = key(2);
        let ata = spl::derive_ata(&owner, &mint).unwrap();
        let rpc = FakeRpc::with_accounts(&[ata]);

        let resolution = resolve(&rpc, &owner, &mint, &key(9)).await.unwrap();
        assert!(resolution.existed);
        assert!(resolution.instruction.is_none());
        assert_eq!(resolution.address, ata);
    }

    #[tokio::test]
    async fn second_resolution_after_creation_is_idempotent() {
        let owner = key(1);
        let mint = key(2);
        let rpc = FakeRpc::with_accounts(&[]);

        let first = resolve(&rpc, &owner, &mint, &key(9)).await.unwrap();
        assert!(!first.existed);
        assert!(first.instruction.is_some());

        // Simulate the first call's instruction having landed on chain.
        rpc.add(first.address);

        let second = resolve(&rpc, &owner, &mint, &key(9)).await.unwrap();
        assert!(second.existed);
        assert!(second.instruction.is_none());
    }

    #[tokio::test]
    async fn lookup_failure_is_treated_as_absent() {
        let rpc = FakeRpc::failing();
        let resolution = resolve(&rpc, &key(1), &key(2), &key(9)).await.unwrap();
        assert!(!resolution.existed);
        assert!(resolution.instruction.is_some());
    }

    #[tokio::test]
    async fn batch_summary_accounts_for_mixed_state() {
        let mint = key(0x55);
        let payer = key(9);
        let owners = [key(1), key(2), key(3)];

        // Owner 2's ATA pre-exists; the other two do not.
        let pre_existing = spl::derive_ata(&owners[1], &mint).unwrap();
        let rpc = FakeRpc::with_accounts(&[pre_existing]);

        let batch = resolve_many(&rpc, &owners, &mint, &payer).await.unwrap();
        assert_eq!(batch.summary.total, 3);
        assert_eq!(batch.summary.existed, 1);
        assert_eq!(batch.summary.created, 2);
        assert_eq!(batch.summary.existed + batch.summary.created, batch.summary.total);
        assert_eq!(batch.instructions.len(), batch.summary.created);
    }

    #[tokio::test]
    async fn batch_addresses_are_positional() {
        let mint = key(0x55);
        let owners = [key(3), key(1), key(2)];
        let rpc = FakeRpc::with_accounts(&[]);

        let batch = resolve_many(&rpc, &owners, &mint, &key(9)).await.unwrap();
        assert_eq!(batch.addresses.len(), 3);
        for (owner, address) in owners.iter().zip(&batch.addresses) {
            assert_eq!(*address, spl::derive_ata(owner, &mint).unwrap());
        }
    }
}
