//! Solana transaction wire format.
//!
//! Payment transactions are built, signed, and exchanged as raw wire bytes
//! (base64 on the marketplace API). The layout is a compact binary format:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (program index, account indices, data)
//! ```
//!
//! Once signed, a transaction must be submitted unmodified: any mutation of
//! the message bytes invalidates the signature. The recent blockhash makes
//! every transaction single-use and time-boxed; an expired one is rebuilt,
//! never resubmitted.

use crate::error::TettoError;
use crate::pubkey::Pubkey;

/// The System Program: 32 zero bytes (`11111111111111111111111111111111`).
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey([0u8; 32]);

/// System Program `Transfer` instruction index (little-endian u32).
const SYSTEM_TRANSFER_IX: u32 = 2;

/// A single account reference inside an instruction.
#[derive(Debug, Clone)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self { pubkey, is_signer, is_writable: true }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self { pubkey, is_signer, is_writable: false }
    }
}

/// An instruction before compilation into a transaction.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled instruction: account references replaced by u8 indices into
/// the transaction's account key list.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled, unsigned Solana transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Account keys in canonical order: writable signers (fee payer first),
    /// read-only signers, writable non-signers, read-only non-signers.
    pub account_keys: Vec<Pubkey>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

/// Build a System Program `Transfer` instruction moving `lamports` from
/// `from` to `to`.
pub fn system_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    // Data: u32 LE instruction index (2 = Transfer) + u64 LE lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    }
}

impl Transaction {
    /// Compile instructions into a transaction with `fee_payer` as the first
    /// signer and account index 0.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        recent_blockhash: &[u8; 32],
    ) -> Result<Self, TettoError> {
        struct Entry {
            pubkey: Pubkey,
            is_signer: bool,
            is_writable: bool,
        }

        // Instruction account lists are tiny, so a Vec scan beats a map.
        let mut entries: Vec<Entry> = Vec::new();
        let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(Entry { pubkey, is_signer: signer, is_writable: writable });
            }
        };

        // Fee payer is always signer + writable.
        upsert(*fee_payer, true, true);

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            // Program IDs are read-only non-signers.
            upsert(ix.program_id, false, false);
        }

        // Canonical ordering; stable sort keeps the fee payer first within
        // the writable-signer group.
        fn rank(e: &Entry) -> u8 {
            match (e.is_signer, e.is_writable) {
                (true, true) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (false, false) => 3,
            }
        }
        entries.sort_by_key(rank);

        let num_required_signatures = entries.iter().filter(|e| e.is_signer).count() as u8;
        let num_readonly_signed =
            entries.iter().filter(|e| e.is_signer && !e.is_writable).count() as u8;
        let num_readonly_unsigned =
            entries.iter().filter(|e| !e.is_signer && !e.is_writable).count() as u8;

        let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();

        let index_of = |key: &Pubkey| -> Result<u8, TettoError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    TettoError::TransactionError("account missing from key table".into())
                })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let program_id_index = index_of(&ix.program_id)?;
            let mut account_indices = Vec::with_capacity(ix.accounts.len());
            for meta in &ix.accounts {
                account_indices.push(index_of(&meta.pubkey)?);
            }
            compiled.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            account_keys,
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            recent_blockhash: *recent_blockhash,
            instructions: compiled,
        })
    }

    /// Serialize the message portion (the bytes that get signed).
    pub fn serialize_message(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&encode_compact_u16(self.account_keys.len() as u16));
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(&self.recent_blockhash);

        buf.extend_from_slice(&encode_compact_u16(self.instructions.len() as u16));
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
            buf.extend_from_slice(&ix.account_indices);
            buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
            buf.extend_from_slice(&ix.data);
        }

        buf
    }

    /// Serialize to wire format with zeroed signature slots.
    ///
    /// This is the unsigned form the marketplace exchanges as base64; a
    /// wallet fills in its slot via [`sign_wire`].
    pub fn to_wire_unsigned(&self) -> Vec<u8> {
        let message = self.serialize_message();
        let n = self.num_required_signatures as usize;

        let mut wire = Vec::with_capacity(3 + 64 * n + message.len());
        wire.extend_from_slice(&encode_compact_u16(n as u16));
        wire.extend(std::iter::repeat(0u8).take(64 * n));
        wire.extend_from_slice(&message);
        wire
    }
}

/// Encode a value in Solana's compact-u16 format (1-3 bytes).
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);
    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }
    out
}

/// Decode a compact-u16, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), TettoError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            TettoError::TransactionError("truncated compact-u16".into())
        })?;
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            break;
        }
        if consumed >= 3 {
            return Err(TettoError::TransactionError(
                "compact-u16 continuation past three bytes".into(),
            ));
        }
    }

    if value > u16::MAX as u32 {
        return Err(TettoError::TransactionError("compact-u16 overflow".into()));
    }
    Ok((value as u16, consumed))
}

/// Locations of the signable parts of a wire-format transaction.
#[derive(Debug)]
pub(crate) struct WireLayout {
    pub sigs_start: usize,
    pub num_signatures: usize,
    pub message_start: usize,
}

pub(crate) fn parse_wire_layout(wire: &[u8]) -> Result<WireLayout, TettoError> {
    let (num_sigs, compact_len) = decode_compact_u16(wire)?;
    if num_sigs == 0 {
        return Err(TettoError::TransactionError(
            "transaction has zero signature slots".into(),
        ));
    }
    let message_start = compact_len + num_sigs as usize * 64;
    if message_start >= wire.len() {
        return Err(TettoError::TransactionError(
            "transaction too short for its signature slots".into(),
        ));
    }
    Ok(WireLayout {
        sigs_start: compact_len,
        num_signatures: num_sigs as usize,
        message_start,
    })
}

/// Find the signer-slot index of `pubkey` inside a wire transaction's
/// message, or an error if the key is not among the required signers.
pub(crate) fn find_signer_slot(
    message: &[u8],
    num_signatures: usize,
    pubkey: &Pubkey,
) -> Result<usize, TettoError> {
    if message.len() < 4 {
        return Err(TettoError::TransactionError("transaction message too short".into()));
    }
    let num_required = message[0] as usize;
    let (num_accounts, compact_len) = decode_compact_u16(&message[3..])?;
    let keys_start = 3 + compact_len;
    let keys_end = keys_start + num_accounts as usize * 32;
    if keys_end > message.len() {
        return Err(TettoError::TransactionError(
            "transaction message too short for account keys".into(),
        ));
    }

    for i in 0..num_required.min(num_signatures).min(num_accounts as usize) {
        let start = keys_start + i * 32;
        if &message[start..start + 32] == pubkey.as_bytes() {
            return Ok(i);
        }
    }
    Err(TettoError::SigningRejected(format!(
        "wallet {pubkey} is not among the transaction's signers"
    )))
}
