//! SPL token instructions and associated token account derivation.
//!
//! An associated token account (ATA) is the deterministic program-derived
//! address that holds one owner's balance of one mint. Derivation seeds are
//! `[owner, token_program, mint]` under the associated-token program, with
//! the usual bump search for an off-curve point.

use sha2::{Digest, Sha256};

use crate::error::TettoError;
use crate::pubkey::Pubkey;
use crate::transaction::{AccountMeta, Instruction, SYSTEM_PROGRAM_ID};

/// SPL Token Program: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`.
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// Associated Token Account Program: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

/// PDA derivation domain separator.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// SPL Token `Transfer` instruction index.
const SPL_TRANSFER_IX: u8 = 3;

/// ATA program `CreateIdempotent` instruction discriminator. No-ops on-chain
/// if the account already exists, which is what makes resolver-side lookup
/// errors safe to swallow.
const ATA_CREATE_IDEMPOTENT_IX: u8 = 1;

/// Build an SPL Token `Transfer` instruction moving `amount` base units
/// between two token accounts, authorized by `owner`.
pub fn spl_transfer(
    from_token_account: &Pubkey,
    to_token_account: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Instruction {
    // Data: [3] (Transfer) + u64 LE amount = 9 bytes.
    let mut data = Vec::with_capacity(9);
    data.push(SPL_TRANSFER_IX);
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*from_token_account, false),
            AccountMeta::writable(*to_token_account, false),
            AccountMeta::readonly(*owner, true),
        ],
        data,
    }
}

/// Build an idempotent create-ATA instruction: creates the associated token
/// account for `(owner, mint)` with `payer` funding the rent, or does
/// nothing if it already exists.
pub fn create_ata_idempotent(
    payer: &Pubkey,
    ata: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*ata, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![ATA_CREATE_IDEMPOTENT_IX],
    }
}

/// Derive the associated token account address for `(owner, mint)`.
pub fn derive_ata(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey, TettoError> {
    find_program_address(
        &[owner.as_bytes(), TOKEN_PROGRAM_ID.as_bytes(), mint.as_bytes()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Find a program-derived address: iterate bump seeds 255 down to 0 and
/// return the first hash that is not a valid Ed25519 point.
fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), TettoError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_program_address(seeds, bump, program_id) {
            return Ok((address, bump));
        }
    }
    Err(TettoError::InvalidAddress(
        "no valid PDA bump seed for owner/mint pair".into(),
    ))
}

fn try_program_address(seeds: &[&[u8]], bump: u8, program_id: &Pubkey) -> Option<Pubkey> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    // A PDA must NOT be on the Ed25519 curve.
    if is_on_curve(&hash) {
        return None;
    }
    Some(Pubkey(hash))
}

fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_ids_match_known_addresses() {
        assert_eq!(
            TOKEN_PROGRAM_ID.to_base58(),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
        assert_eq!(
            ASSOCIATED_TOKEN_PROGRAM_ID.to_base58(),
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"
        );
    }

    #[test]
    fn spl_transfer_data_encoding() {
        let ix = spl_transfer(&Pubkey([1; 32]), &Pubkey([2; 32]), &Pubkey([3; 32]), 500_000);
        assert_eq!(ix.data.len(), 9);
        assert_eq!(ix.data[0], 3);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 500_000);
        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
    }

    #[test]
    fn spl_transfer_account_roles() {
        let ix = spl_transfer(&Pubkey([1; 32]), &Pubkey([2; 32]), &Pubkey([3; 32]), 100);
        assert_eq!(ix.accounts.len(), 3);
        // source and destination writable, owner signs read-only
        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
        assert!(ix.accounts[2].is_signer && !ix.accounts[2].is_writable);
    }

    #[test]
    fn create_ata_idempotent_shape() {
        let payer = Pubkey([1; 32]);
        let owner = Pubkey([2; 32]);
        let mint = Pubkey([3; 32]);
        let ata = derive_ata(&owner, &mint).unwrap();

        let ix = create_ata_idempotent(&payer, &ata, &owner, &mint);
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ix.data, vec![1]);
        assert_eq!(ix.accounts.len(), 6);
        // payer funds the rent and signs
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[0].pubkey, payer);
        assert_eq!(ix.accounts[1].pubkey, ata);
        assert!(ix.accounts[1].is_writable);
    }

    #[test]
    fn ata_derivation_is_deterministic_and_off_curve() {
        let owner = Pubkey([0x11; 32]);
        let mint = Pubkey([0x22; 32]);
        let a = derive_ata(&owner, &mint).unwrap();
        let b = derive_ata(&owner, &mint).unwrap();
        assert_eq!(a, b);
        assert!(!is_on_curve(a.as_bytes()));
    }

    #[test]
    fn ata_differs_per_owner_and_mint() {
        let mint = Pubkey([0xFF; 32]);
        let a = derive_ata(&Pubkey([0x01; 32]), &mint).unwrap();
        let b = derive_ata(&Pubkey([0x02; 32]), &mint).unwrap();
        assert_ne!(a, b);

        let owner = Pubkey([0xAA; 32]);
        let c = derive_ata(&owner, &Pubkey([0x01; 32])).unwrap();
        let d = derive_ata(&owner, &Pubkey([0x02; 32])).unwrap();
        assert_ne!(c, d);
    }

    #[test]
    fn usdc_ata_for_fixed_owner_is_valid() {
        let usdc = Pubkey::from_base58("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
        let owner = Pubkey([0x42; 32]);
        let ata = derive_ata(&owner, &usdc).unwrap();
        assert!(!is_on_curve(ata.as_bytes()));
        assert!(Pubkey::from_base58(&ata.to_base58()).is_ok());
    }

    #[test]
    fn on_curve_detects_basepoint() {
        // Compressed Ed25519 basepoint.
        let basepoint: [u8; 32] = [
            0x58, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
            0x66, 0x66, 0x66, 0x66,
        ];
        assert!(is_on_curve(&basepoint));
        assert!(!is_on_curve(&[0x02; 32]));
    }
}
