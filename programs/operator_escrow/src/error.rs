//! Error types

use solana_program::program_error::ProgramError;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// Supplied operator does not match `EscrowRecord.operator`
    #[error("Operator does not match escrow record (ConstraintHasOne)")]
    ConstraintHasOne,

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid recipient")]
    InvalidRecipient,

    #[error("Insufficient allowance")]
    InsufficientAllowance,

    #[error("No delegation grant for operator")]
    NoDelegationGrant,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid token program")]
    InvalidTokenProgram,

    #[error("Invalid token account")]
    InvalidTokenAccount,

    #[error("Invalid account owner")]
    InvalidAccountOwner,

    #[error("Invalid PDA")]
    InvalidPDA,

    #[error("Invalid operator")]
    InvalidOperator,

    #[error("Invalid instruction data")]
    InvalidInstructionData,

    #[error("Account not initialized")]
    AccountNotInitialized,

    #[error("Escrow already initialized")]
    EscrowAlreadyInitialized,
}

impl From<EscrowError> for ProgramError {
    fn from(e: EscrowError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
