use crate::ledger::LedgerReference;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
#[allow(deprecated)]
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;

/// A single transfer attempt, bound to the reference fetched for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub recipient: Pubkey,
    pub amount_lamports: u64,
    pub fee_payer: Pubkey,
    pub reference: LedgerReference,
}

impl PaymentIntent {
    pub fn new(
        recipient: Pubkey,
        amount_lamports: u64,
        fee_payer: Pubkey,
        reference: LedgerReference,
    ) -> Self {
        Self {
            recipient,
            amount_lamports,
            fee_payer,
            reference,
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.reference.blockhash
    }

    pub fn last_valid_block_height(&self) -> u64 {
        self.reference.last_valid_block_height
    }

    #[allow(deprecated)]
    pub fn instruction(&self) -> Instruction {
        system_instruction::transfer(&self.fee_payer, &self.recipient, self.amount_lamports)
    }

    /// Unsigned transfer transaction with the fee payer first
    pub fn to_transaction(&self) -> Transaction {
        let message = Message::new_with_blockhash(
            &[self.instruction()],
            Some(&self.fee_payer),
            &self.reference.blockhash,
        );
        Transaction::new_unsigned(message)
    }
}
