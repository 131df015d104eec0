//! Distribution engine
//!
//! Native and token payouts run through the same pipeline:
//! authorization, amount, recipient, capacity, then a single atomic transfer.
//! The asset-specific parts sit behind [`AssetTransfer`].

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    program::invoke,
    program_error::ProgramError,
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
};
use spl_token::state::Account as TokenAccount;

use crate::{
    error::EscrowError,
    events,
    guard::{self, Operation},
    state::{DelegationGrant, EscrowRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Native,
    Token,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Native => "native",
            AssetKind::Token => "token",
        }
    }
}

/// One way of moving value out of the escrow.
pub trait AssetTransfer {
    fn kind(&self) -> AssetKind;

    /// Rejects recipients that cannot receive this asset.
    fn validate_recipient(&self) -> ProgramResult;

    /// Checks the source can cover `amount` without touching any balance.
    fn check_capacity(&self, amount: u64) -> ProgramResult;

    /// Moves `amount` to the recipient and returns what was credited.
    fn execute(&self, amount: u64) -> Result<u64, ProgramError>;
}

pub fn validate_amount(amount: u64) -> Result<(), EscrowError> {
    if amount == 0 {
        return Err(EscrowError::InvalidAmount);
    }
    Ok(())
}

/// Runs a payout of `amount` through the shared validation pipeline.
pub fn distribute<T: AssetTransfer>(
    record: &EscrowRecord,
    record_key: &Pubkey,
    operator: &AccountInfo,
    amount: u64,
    asset: &T,
) -> ProgramResult {
    let signers = guard::signer_keys(std::slice::from_ref(operator));
    let result = guard::authorize(
        &Operation::Distribute {
            operator: operator.key,
        },
        record,
        record_key,
        &signers,
    )
    .and_then(|_| validate_amount(amount).map_err(ProgramError::from))
    .and_then(|_| asset.validate_recipient())
    .and_then(|_| asset.check_capacity(amount))
    .and_then(|_| asset.execute(amount));

    match result {
        Ok(credited) => {
            events::emit_distributed(asset.kind(), record_key, operator.key, amount, credited);
            Ok(())
        }
        Err(error) => {
            events::emit_distribution_rejected(asset.kind(), record_key, operator.key, &error);
            Err(error)
        }
    }
}

// ============================================================================
// NATIVE
// ============================================================================

/// Lamport payout straight out of the program-owned escrow record.
pub struct NativeTransfer<'a, 'info> {
    escrow: &'a AccountInfo<'info>,
    recipient: &'a AccountInfo<'info>,
    rent: Rent,
}

impl<'a, 'info> NativeTransfer<'a, 'info> {
    pub fn new(escrow: &'a AccountInfo<'info>, recipient: &'a AccountInfo<'info>, rent: Rent) -> Self {
        Self {
            escrow,
            recipient,
            rent,
        }
    }

    /// Total debit for a payout of `amount`. An empty recipient also receives
    /// its rent-exempt minimum, otherwise the runtime would reject the new
    /// account.
    fn gross_amount(&self, amount: u64) -> Result<u64, EscrowError> {
        gross_native_amount(
            amount,
            self.recipient.lamports(),
            self.rent.minimum_balance(self.recipient.data_len()),
        )
    }
}

pub fn gross_native_amount(
    amount: u64,
    recipient_lamports: u64,
    recipient_rent_minimum: u64,
) -> Result<u64, EscrowError> {
    if recipient_lamports > 0 {
        return Ok(amount);
    }
    amount
        .checked_add(recipient_rent_minimum)
        .ok_or(EscrowError::Overflow)
}

/// Lamports the escrow may pay out while staying rent-exempt.
pub fn spendable_lamports(escrow_lamports: u64, escrow_rent_minimum: u64) -> u64 {
    escrow_lamports.saturating_sub(escrow_rent_minimum)
}

impl AssetTransfer for NativeTransfer<'_, '_> {
    fn kind(&self) -> AssetKind {
        AssetKind::Native
    }

    fn validate_recipient(&self) -> ProgramResult {
        let key = self.recipient.key;
        if *key == Pubkey::default() || key == self.escrow.key || !self.recipient.is_writable {
            return Err(EscrowError::InvalidRecipient.into());
        }
        Ok(())
    }

    fn check_capacity(&self, amount: u64) -> ProgramResult {
        let debit = self.gross_amount(amount)?;
        let spendable = spendable_lamports(
            self.escrow.lamports(),
            self.rent.minimum_balance(self.escrow.data_len()),
        );
        if debit > spendable {
            return Err(EscrowError::InsufficientFunds.into());
        }
        Ok(())
    }

    fn execute(&self, amount: u64) -> Result<u64, ProgramError> {
        let debit = self.gross_amount(amount)?;

        let escrow_lamports = self
            .escrow
            .lamports()
            .checked_sub(debit)
            .ok_or(EscrowError::InsufficientFunds)?;
        let recipient_lamports = self
            .recipient
            .lamports()
            .checked_add(debit)
            .ok_or(EscrowError::Overflow)?;

        **self.escrow.try_borrow_mut_lamports()? = escrow_lamports;
        **self.recipient.try_borrow_mut_lamports()? = recipient_lamports;
        Ok(debit)
    }
}

// ============================================================================
// TOKEN
// ============================================================================

/// SPL Token payout under the operator's delegated allowance.
pub struct TokenTransfer<'a, 'info> {
    program_id: &'a Pubkey,
    escrow_key: &'a Pubkey,
    operator: &'a AccountInfo<'info>,
    sender: &'a AccountInfo<'info>,
    recipient: &'a AccountInfo<'info>,
    grant: &'a AccountInfo<'info>,
    token_program: &'a AccountInfo<'info>,
}

impl<'a, 'info> TokenTransfer<'a, 'info> {
    pub fn new(
        program_id: &'a Pubkey,
        escrow_key: &'a Pubkey,
        operator: &'a AccountInfo<'info>,
        sender: &'a AccountInfo<'info>,
        recipient: &'a AccountInfo<'info>,
        grant: &'a AccountInfo<'info>,
        token_program: &'a AccountInfo<'info>,
    ) -> Self {
        Self {
            program_id,
            escrow_key,
            operator,
            sender,
            recipient,
            grant,
            token_program,
        }
    }

    fn sender_state(&self) -> Result<TokenAccount, ProgramError> {
        if *self.sender.owner != spl_token::id() {
            return Err(EscrowError::InvalidAccountOwner.into());
        }
        TokenAccount::unpack(&self.sender.try_borrow_data()?)
            .map_err(|_| EscrowError::InvalidTokenAccount.into())
    }

    fn recipient_state(&self) -> Result<TokenAccount, ProgramError> {
        if *self.recipient.owner != spl_token::id() || self.recipient.key == self.sender.key {
            return Err(EscrowError::InvalidRecipient.into());
        }
        TokenAccount::unpack(&self.recipient.try_borrow_data()?)
            .map_err(|_| EscrowError::InvalidRecipient.into())
    }

    fn load_grant(&self) -> Result<DelegationGrant, ProgramError> {
        let (grant_pda, _bump) =
            DelegationGrant::find_address(self.escrow_key, self.sender.key, self.program_id);
        if grant_pda != *self.grant.key {
            return Err(EscrowError::InvalidPDA.into());
        }
        let grant = DelegationGrant::load(self.grant, self.program_id)?;
        if grant.escrow != *self.escrow_key
            || grant.token_account != *self.sender.key
            || grant.operator != *self.operator.key
        {
            return Err(EscrowError::NoDelegationGrant.into());
        }
        Ok(grant)
    }
}

impl AssetTransfer for TokenTransfer<'_, '_> {
    fn kind(&self) -> AssetKind {
        AssetKind::Token
    }

    fn validate_recipient(&self) -> ProgramResult {
        self.recipient_state()?;
        Ok(())
    }

    fn check_capacity(&self, amount: u64) -> ProgramResult {
        if *self.token_program.key != spl_token::id() {
            return Err(EscrowError::InvalidTokenProgram.into());
        }
        let sender = self.sender_state()?;
        // Mint agreement needs both accounts.
        if self.recipient_state()?.mint != sender.mint {
            return Err(EscrowError::InvalidRecipient.into());
        }
        let grant = self.load_grant()?;
        if grant.remaining < amount {
            return Err(EscrowError::InsufficientAllowance.into());
        }
        // The ledger-side approval must agree with the grant record.
        let delegated_to_operator = sender.delegate == COption::Some(*self.operator.key);
        if !delegated_to_operator || sender.delegated_amount < amount {
            return Err(EscrowError::InsufficientAllowance.into());
        }
        Ok(())
    }

    fn execute(&self, amount: u64) -> Result<u64, ProgramError> {
        let mut grant = self.load_grant()?;

        invoke(
            &spl_token::instruction::transfer(
                &spl_token::id(),
                self.sender.key,
                self.recipient.key,
                self.operator.key,
                &[],
                amount,
            )?,
            &[
                self.sender.clone(),
                self.recipient.clone(),
                self.operator.clone(),
                self.token_program.clone(),
            ],
        )?;

        grant.consume(amount)?;
        grant.store(self.grant)?;
        Ok(amount)
    }
}
