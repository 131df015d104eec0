//! Access control for escrow operations
//!
//! Every predicate here is pure: it sees the record, the identities named by
//! the instruction and the set of transaction signers, and returns ALLOW
//! (`Ok`) or the reason for DENY. Nothing here touches account data.

use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{error::EscrowError, state::EscrowRecord};

/// An operation on an existing escrow record that needs a role check.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    /// Re-designate the operator.
    SetOperator { authority: &'a Pubkey },
    /// Grant `operator` an allowance over a token account controlled by `granter`.
    AuthorizeOperator {
        granter: &'a Pubkey,
        operator: &'a Pubkey,
    },
    /// Native or token payout triggered by `operator`.
    Distribute { operator: &'a Pubkey },
}

/// Collects the keys of every signer among `accounts`.
pub fn signer_keys(accounts: &[AccountInfo]) -> Vec<Pubkey> {
    accounts
        .iter()
        .filter(|account| account.is_signer)
        .map(|account| *account.key)
        .collect()
}

fn has_signed(signers: &[Pubkey], key: &Pubkey) -> bool {
    signers.iter().any(|signer| signer == key)
}

/// The has-one relationship between a request and the record: the supplied
/// operator must be exactly the record's operator.
pub fn check_has_one_operator(
    record: &EscrowRecord,
    supplied_operator: &Pubkey,
) -> Result<(), EscrowError> {
    if record.operator != *supplied_operator {
        return Err(EscrowError::ConstraintHasOne);
    }
    Ok(())
}

/// Initialization needs a fresh record and the intended authority's signature.
pub fn authorize_initialize(
    record_is_fresh: bool,
    authority: &Pubkey,
    signers: &[Pubkey],
) -> ProgramResult {
    if !record_is_fresh {
        return Err(EscrowError::EscrowAlreadyInitialized.into());
    }
    if !has_signed(signers, authority) {
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

/// Decides whether `op` may proceed against `record` (stored at `record_key`).
pub fn authorize(
    op: &Operation,
    record: &EscrowRecord,
    record_key: &Pubkey,
    signers: &[Pubkey],
) -> ProgramResult {
    match *op {
        Operation::SetOperator { authority } => {
            if record.authority != *authority || !has_signed(signers, authority) {
                return Err(EscrowError::Unauthorized.into());
            }
            Ok(())
        }
        Operation::AuthorizeOperator { granter, operator } => {
            // Self-custodied token accounts are owned by the record address,
            // which then signs in place of the authority.
            let is_granting_role = record.authority == *granter || record_key == granter;
            if !is_granting_role || !has_signed(signers, granter) {
                return Err(EscrowError::Unauthorized.into());
            }
            check_has_one_operator(record, operator)?;
            Ok(())
        }
        Operation::Distribute { operator } => {
            check_has_one_operator(record, operator)?;
            if !has_signed(signers, operator) {
                return Err(ProgramError::MissingRequiredSignature);
            }
            Ok(())
        }
    }
}
