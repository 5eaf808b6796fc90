//! Payment transaction construction.
//!
//! A payment is always a two-way split: payer pays the agent's owner and
//! the protocol treasury in a single transaction. Native SOL payments are
//! two system transfers; SPL payments are two token transfers with any
//! needed associated-account creations prepended, so the destination
//! accounts exist before the transfers execute within the same transaction.

use crate::ata;
use crate::error::TettoError;
use crate::pubkey::Pubkey;
use crate::rpc::SolanaRpc;
use crate::spl;
use crate::transaction::{system_transfer, Instruction, Transaction};

/// Fee rate applied when an agent record carries no `fee_bps`: 1000 = 10%.
pub const DEFAULT_FEE_BPS: u64 = 1000;

/// The two halves of a payment, in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    /// Credited to the agent owner's wallet.
    pub agent_amount: u64,
    /// Credited to the protocol treasury.
    pub fee_amount: u64,
}

/// Split a gross price into agent and protocol shares.
///
/// `fee = floor(price_base * fee_bps / 10000)`, agent gets the remainder,
/// so the two halves always sum to `price_base` exactly. Both the SDK and
/// the platform compute this split; it must stay reproducible by either
/// party from the agent record alone. Rates above 10000 bps are clamped to
/// the full amount; callers reject such records before money moves (see
/// [`crate::client::TettoClient::call_agent`]).
pub fn fee_split(price_base: u64, fee_bps: u64) -> FeeSplit {
    let fee_bps = fee_bps.min(10_000);
    // u64 * u64 can exceed 64 bits; widen before dividing.
    let fee_amount = ((price_base as u128 * fee_bps as u128) / 10_000) as u64;
    FeeSplit {
        agent_amount: price_base - fee_amount,
        fee_amount,
    }
}

/// What the payment moves: native lamports, or base units of an SPL mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentToken {
    Sol,
    Spl { mint: Pubkey },
}

impl PaymentToken {
    /// Parse an agent record's token identifier: the literal `"SOL"`
    /// sentinel, or a mint address string.
    pub fn parse(token: &str) -> Result<Self, TettoError> {
        if token == "SOL" {
            Ok(PaymentToken::Sol)
        } else {
            Ok(PaymentToken::Spl { mint: Pubkey::from_base58(token)? })
        }
    }
}

/// Inputs to [`build_payment`]. The fee split is computed by the caller
/// (see [`fee_split`]); this layer only lays out instructions.
///
/// Amounts are base units of the payment token, so mint decimals are not
/// carried here: plain SPL `Transfer` takes no decimals argument. Moving
/// to `TransferChecked` would add a decimals field.
#[derive(Debug)]
pub struct PaymentParams {
    pub payer: Pubkey,
    pub agent_wallet: Pubkey,
    pub protocol_wallet: Pubkey,
    /// Gross price in base units.
    pub gross_amount: u64,
    /// Protocol share in base units; the agent receives the remainder.
    pub fee_amount: u64,
    pub token: PaymentToken,
}

/// A compiled, unsigned payment transaction plus how many token accounts
/// it will create along the way.
#[derive(Debug)]
pub struct BuiltPayment {
    pub transaction: Transaction,
    pub atas_created: usize,
}

/// Build the complete unsigned payment transaction.
///
/// Fetches a current blockhash and stamps the payer as fee payer, so the
/// result is single-use and time-boxed: if it expires unsubmitted it must
/// be rebuilt, not resubmitted.
pub async fn build_payment(
    rpc: &impl SolanaRpc,
    params: &PaymentParams,
) -> Result<BuiltPayment, TettoError> {
    if params.fee_amount > params.gross_amount {
        return Err(TettoError::TransactionError(format!(
            "fee {} exceeds gross amount {}",
            params.fee_amount, params.gross_amount
        )));
    }
    let agent_amount = params.gross_amount - params.fee_amount;

    let (instructions, atas_created) = match params.token {
        PaymentToken::Sol => {
            let instructions = vec![
                system_transfer(&params.payer, &params.agent_wallet, agent_amount),
                system_transfer(&params.payer, &params.protocol_wallet, params.fee_amount),
            ];
            (instructions, 0)
        }
        PaymentToken::Spl { mint } => {
            // The payer's own ATA must already exist and be funded; we only
            // derive it. Recipients may be first-time holders.
            let payer_ata = spl::derive_ata(&params.payer, &mint)?;
            let recipients = [params.agent_wallet, params.protocol_wallet];
            let batch = ata::resolve_many(rpc, &recipients, &mint, &params.payer).await?;

            tracing::debug!(
                created = batch.summary.created,
                existed = batch.summary.existed,
                "resolved recipient token accounts"
            );

            // Creations first: accounts must exist before being transferred
            // into within the same transaction.
            let mut instructions: Vec<Instruction> = batch.instructions;
            let atas_created = instructions.len();
            instructions.push(spl::spl_transfer(
                &payer_ata,
                &batch.addresses[0],
                &params.payer,
                agent_amount,
            ));
            instructions.push(spl::spl_transfer(
                &payer_ata,
                &batch.addresses[1],
                &params.payer,
                params.fee_amount,
            ));
            (instructions, atas_created)
        }
    };

    let blockhash = rpc.latest_blockhash().await?;
    let transaction = Transaction::compile(&instructions, &params.payer, &blockhash)?;

    Ok(BuiltPayment { transaction, atas_created })
}
