//! Account state definitions

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey};

use crate::error::EscrowError;

/// Custody record held at the escrow's own keypair address.
///
/// The lamports above the rent-exempt reserve of this account are the
/// escrow's native balance.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct EscrowRecord {
    /// Discriminator for account type
    pub discriminator: [u8; 8],
    /// Creator of the record; the only party allowed to re-designate the operator
    pub authority: Pubkey,
    /// Party currently allowed to trigger distributions
    pub operator: Pubkey,
}

impl EscrowRecord {
    pub const DISCRIMINATOR: [u8; 8] = [0x45, 0x53, 0x43, 0x52, 0x57, 0x52, 0x45, 0x43]; // "ESCRWREC"
    pub const LEN: usize = 8 + 32 + 32; // discriminator + authority + operator

    pub fn new(authority: Pubkey, operator: Pubkey) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            authority,
            operator,
        }
    }

    /// Reads the record from an account owned by `program_id`.
    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id {
            return Err(EscrowError::InvalidAccountOwner.into());
        }
        let data = account.try_borrow_data()?;
        if data.len() != Self::LEN {
            return Err(EscrowError::AccountNotInitialized.into());
        }
        let record = Self::try_from_slice(&data)
            .map_err(|_| EscrowError::AccountNotInitialized)?;
        if record.discriminator != Self::DISCRIMINATOR {
            return Err(EscrowError::AccountNotInitialized.into());
        }
        Ok(record)
    }

    pub fn store(&self, account: &AccountInfo) -> Result<(), ProgramError> {
        self.serialize(&mut &mut account.try_borrow_mut_data()?[..])?;
        Ok(())
    }
}

/// Allowance granted to an operator over one token account.
///
/// One grant exists per (escrow record, token account) pair at the PDA
/// `[GRANT_SEED, escrow, token_account]`. The SPL Token delegate approval on
/// the token account mirrors it.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct DelegationGrant {
    /// Discriminator for account type
    pub discriminator: [u8; 8],
    /// Escrow record the grant belongs to
    pub escrow: Pubkey,
    /// Token account whose funds are delegated
    pub token_account: Pubkey,
    /// Operator the allowance was granted to
    pub operator: Pubkey,
    /// Amount granted by the latest authorization
    pub allowance: u64,
    /// Amount still transferable without a re-grant
    pub remaining: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl DelegationGrant {
    pub const DISCRIMINATOR: [u8; 8] = [0x44, 0x45, 0x4c, 0x45, 0x47, 0x47, 0x52, 0x54]; // "DELEGGRT"
    pub const LEN: usize = 8 + 32 + 32 + 32 + 8 + 8 + 1; // 121 bytes

    pub fn new(
        escrow: Pubkey,
        token_account: Pubkey,
        operator: Pubkey,
        allowance: u64,
        bump: u8,
    ) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            escrow,
            token_account,
            operator,
            allowance,
            remaining: allowance,
            bump,
        }
    }

    /// Replaces the binding with a fresh allowance for `operator`.
    pub fn regrant(&mut self, operator: Pubkey, allowance: u64) {
        self.operator = operator;
        self.allowance = allowance;
        self.remaining = allowance;
    }

    /// Decrements the remaining allowance by `amount`.
    pub fn consume(&mut self, amount: u64) -> Result<(), EscrowError> {
        self.remaining = self
            .remaining
            .checked_sub(amount)
            .ok_or(EscrowError::InsufficientAllowance)?;
        Ok(())
    }

    /// Reads an existing grant. An empty or foreign account means no grant
    /// has been made yet.
    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id || account.data_len() == 0 {
            return Err(EscrowError::NoDelegationGrant.into());
        }
        let data = account.try_borrow_data()?;
        let grant = Self::try_from_slice(&data).map_err(|_| EscrowError::NoDelegationGrant)?;
        if grant.discriminator != Self::DISCRIMINATOR {
            return Err(EscrowError::NoDelegationGrant.into());
        }
        Ok(grant)
    }

    pub fn store(&self, account: &AccountInfo) -> Result<(), ProgramError> {
        self.serialize(&mut &mut account.try_borrow_mut_data()?[..])?;
        Ok(())
    }

    /// Derives the grant PDA for a token account under an escrow record.
    pub fn find_address(escrow: &Pubkey, token_account: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[seeds::GRANT_SEED, escrow.as_ref(), token_account.as_ref()],
            program_id,
        )
    }
}

/// Seeds for PDA derivation
pub mod seeds {
    pub const GRANT_SEED: &[u8] = b"grant";
}
