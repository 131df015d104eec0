//! Instruction definitions

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::state::DelegationGrant;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum EscrowInstruction {
    /// Create the escrow record. `operator` defaults to the authority.
    ///
    /// Accounts expected:
    /// 0. `[writable, signer]` Escrow record (fresh keypair, may be pre-funded)
    /// 1. `[signer]` Authority
    /// 2. `[writable, signer]` Payer
    /// 3. `[]` System program
    Initialize { operator: Option<Pubkey> },

    /// Re-designate the operator
    ///
    /// SPL delegate approvals made to the previous operator stay in force on
    /// the token program. Re-run `AuthorizeOperatorOnce` for the new operator
    /// on every granted token account; the new approval replaces the old
    /// delegate.
    ///
    /// Accounts expected:
    /// 0. `[writable]` Escrow record
    /// 1. `[signer]` Authority
    SetOperator { new_operator: Pubkey },

    /// Grant the operator an allowance over a token account, replacing any
    /// previous grant on that account
    ///
    /// Accounts expected:
    /// 0. `[]` Escrow record
    /// 1. `[writable]` Token account
    /// 2. `[signer]` Token account authority (record authority or the record itself)
    /// 3. `[]` Operator
    /// 4. `[writable]` Delegation grant (PDA)
    /// 5. `[writable, signer]` Payer
    /// 6. `[]` Token program
    /// 7. `[]` System program
    AuthorizeOperatorOnce { allowance: u64 },

    /// Pay SOL out of the escrow record
    ///
    /// Accounts expected:
    /// 0. `[writable]` Escrow record
    /// 1. `[signer]` Operator
    /// 2. `[writable]` Recipient
    /// 3. `[]` System program
    DistributeSol { amount: u64 },

    /// Pay tokens out of a granting token account
    ///
    /// Accounts expected:
    /// 0. `[]` Escrow record
    /// 1. `[signer]` Operator
    /// 2. `[writable]` Sender token account
    /// 3. `[writable]` Recipient token account
    /// 4. `[writable]` Delegation grant (PDA)
    /// 5. `[]` Token program
    DistributeToken { amount: u64 },
}

pub fn initialize(
    program_id: &Pubkey,
    escrow: &Pubkey,
    authority: &Pubkey,
    payer: &Pubkey,
    operator: Option<Pubkey>,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*escrow, true),
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: EscrowInstruction::Initialize { operator }.try_to_vec()?,
    })
}

pub fn set_operator(
    program_id: &Pubkey,
    escrow: &Pubkey,
    authority: &Pubkey,
    new_operator: &Pubkey,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*escrow, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data: EscrowInstruction::SetOperator {
            new_operator: *new_operator,
        }
        .try_to_vec()?,
    })
}

pub fn authorize_operator_once(
    program_id: &Pubkey,
    escrow: &Pubkey,
    token_account: &Pubkey,
    token_account_authority: &Pubkey,
    operator: &Pubkey,
    payer: &Pubkey,
    allowance: u64,
) -> Result<Instruction, ProgramError> {
    let (grant, _bump) = DelegationGrant::find_address(escrow, token_account, program_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*escrow, false),
            AccountMeta::new(*token_account, false),
            AccountMeta::new_readonly(*token_account_authority, true),
            AccountMeta::new_readonly(*operator, false),
            AccountMeta::new(grant, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: EscrowInstruction::AuthorizeOperatorOnce { allowance }.try_to_vec()?,
    })
}

pub fn distribute_sol(
    program_id: &Pubkey,
    escrow: &Pubkey,
    operator: &Pubkey,
    recipient: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*escrow, false),
            AccountMeta::new_readonly(*operator, true),
            AccountMeta::new(*recipient, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: EscrowInstruction::DistributeSol { amount }.try_to_vec()?,
    })
}

pub fn distribute_token(
    program_id: &Pubkey,
    escrow: &Pubkey,
    operator: &Pubkey,
    sender_token_account: &Pubkey,
    recipient_token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let (grant, _bump) = DelegationGrant::find_address(escrow, sender_token_account, program_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*escrow, false),
            AccountMeta::new_readonly(*operator, true),
            AccountMeta::new(*sender_token_account, false),
            AccountMeta::new(*recipient_token_account, false),
            AccountMeta::new(grant, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: EscrowInstruction::DistributeToken { amount }.try_to_vec()?,
    })
}
