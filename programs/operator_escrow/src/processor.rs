//! Instruction processing

#![allow(deprecated)] // system_instruction deprecation - will migrate when solana_system_interface is stable

use borsh::BorshDeserialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};
use spl_token::state::Account as TokenAccount;

use crate::{
    distribution::{self, NativeTransfer, TokenTransfer},
    error::EscrowError,
    events,
    guard::{self, Operation},
    instruction::EscrowInstruction,
    state::{seeds, DelegationGrant, EscrowRecord},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = EscrowInstruction::try_from_slice(instruction_data)
            .map_err(|_| EscrowError::InvalidInstructionData)?;

        match instruction {
            EscrowInstruction::Initialize { operator } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(program_id, accounts, operator)
            }
            EscrowInstruction::SetOperator { new_operator } => {
                msg!("Instruction: SetOperator");
                Self::process_set_operator(program_id, accounts, new_operator)
            }
            EscrowInstruction::AuthorizeOperatorOnce { allowance } => {
                msg!("Instruction: AuthorizeOperatorOnce");
                Self::process_authorize_operator_once(program_id, accounts, allowance)
            }
            EscrowInstruction::DistributeSol { amount } => {
                msg!("Instruction: DistributeSol");
                Self::process_distribute_sol(program_id, accounts, amount)
            }
            EscrowInstruction::DistributeToken { amount } => {
                msg!("Instruction: DistributeToken");
                Self::process_distribute_token(program_id, accounts, amount)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        operator: Option<Pubkey>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let escrow_account = next_account_info(account_info_iter)?;
        let authority = next_account_info(account_info_iter)?;
        let payer = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        if !system_program::check_id(system_program.key) {
            return Err(ProgramError::IncorrectProgramId);
        }

        let record_is_fresh = *escrow_account.owner == system_program::id()
            && escrow_account.data_is_empty();
        if !record_is_fresh && escrow_account.owner != program_id {
            return Err(EscrowError::InvalidAccountOwner.into());
        }
        guard::authorize_initialize(record_is_fresh, authority.key, &guard::signer_keys(accounts))?;
        if !escrow_account.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let operator = operator.unwrap_or(*authority.key);
        if operator == Pubkey::default() {
            return Err(EscrowError::InvalidOperator.into());
        }

        // The record address signs for its own allocation.
        create_program_account(
            payer,
            escrow_account,
            system_program,
            program_id,
            EscrowRecord::LEN,
            &[],
        )?;

        let record = EscrowRecord::new(*authority.key, operator);
        record.store(escrow_account)?;

        events::emit_escrow_initialized(escrow_account.key, authority.key, &operator);
        Ok(())
    }

    fn process_set_operator(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        new_operator: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let escrow_account = next_account_info(account_info_iter)?;
        let authority = next_account_info(account_info_iter)?;

        let mut record = EscrowRecord::load(escrow_account, program_id)?;
        guard::authorize(
            &Operation::SetOperator {
                authority: authority.key,
            },
            &record,
            escrow_account.key,
            &guard::signer_keys(accounts),
        )?;

        if new_operator == Pubkey::default() {
            return Err(EscrowError::InvalidOperator.into());
        }

        let previous = record.operator;
        record.operator = new_operator;
        record.store(escrow_account)?;

        events::emit_operator_changed(escrow_account.key, &previous, &new_operator);
        Ok(())
    }

    fn process_authorize_operator_once(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        allowance: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let escrow_account = next_account_info(account_info_iter)?;
        let token_account = next_account_info(account_info_iter)?;
        let token_account_authority = next_account_info(account_info_iter)?;
        let operator = next_account_info(account_info_iter)?;
        let grant_account = next_account_info(account_info_iter)?;
        let payer = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        let record = EscrowRecord::load(escrow_account, program_id)?;
        guard::authorize(
            &Operation::AuthorizeOperator {
                granter: token_account_authority.key,
                operator: operator.key,
            },
            &record,
            escrow_account.key,
            &guard::signer_keys(accounts),
        )?;

        if *token_program.key != spl_token::id() {
            return Err(EscrowError::InvalidTokenProgram.into());
        }
        if !system_program::check_id(system_program.key) {
            return Err(ProgramError::IncorrectProgramId);
        }
        if *token_account.owner != spl_token::id() {
            return Err(EscrowError::InvalidAccountOwner.into());
        }
        let token_state = TokenAccount::unpack(&token_account.try_borrow_data()?)
            .map_err(|_| EscrowError::InvalidTokenAccount)?;
        if token_state.owner != *token_account_authority.key {
            return Err(EscrowError::Unauthorized.into());
        }

        let (grant_pda, grant_bump) =
            DelegationGrant::find_address(escrow_account.key, token_account.key, program_id);
        if grant_pda != *grant_account.key {
            return Err(EscrowError::InvalidPDA.into());
        }

        // Approve replaces any earlier delegate on the token account.
        invoke(
            &spl_token::instruction::approve(
                &spl_token::id(),
                token_account.key,
                operator.key,
                token_account_authority.key,
                &[],
                allowance,
            )?,
            &[
                token_account.clone(),
                operator.clone(),
                token_account_authority.clone(),
                token_program.clone(),
            ],
        )?;

        let grant = if *grant_account.owner == *program_id && !grant_account.data_is_empty() {
            let mut grant = DelegationGrant::load(grant_account, program_id)?;
            grant.regrant(*operator.key, allowance);
            grant
        } else {
            create_program_account(
                payer,
                grant_account,
                system_program,
                program_id,
                DelegationGrant::LEN,
                &[&[
                    seeds::GRANT_SEED,
                    escrow_account.key.as_ref(),
                    token_account.key.as_ref(),
                    &[grant_bump],
                ]],
            )?;
            DelegationGrant::new(
                *escrow_account.key,
                *token_account.key,
                *operator.key,
                allowance,
                grant_bump,
            )
        };
        grant.store(grant_account)?;

        events::emit_operator_authorized(
            escrow_account.key,
            token_account.key,
            operator.key,
            allowance,
        );
        Ok(())
    }

    fn process_distribute_sol(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let escrow_account = next_account_info(account_info_iter)?;
        let operator = next_account_info(account_info_iter)?;
        let recipient = next_account_info(account_info_iter)?;
        let _system_program = next_account_info(account_info_iter)?;

        let record = EscrowRecord::load(escrow_account, program_id)?;
        let native = NativeTransfer::new(escrow_account, recipient, Rent::get()?);
        distribution::distribute(&record, escrow_account.key, operator, amount, &native)
    }

    fn process_distribute_token(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let escrow_account = next_account_info(account_info_iter)?;
        let operator = next_account_info(account_info_iter)?;
        let sender_token_account = next_account_info(account_info_iter)?;
        let recipient_token_account = next_account_info(account_info_iter)?;
        let grant_account = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        let record = EscrowRecord::load(escrow_account, program_id)?;
        let token = TokenTransfer::new(
            program_id,
            escrow_account.key,
            operator,
            sender_token_account,
            recipient_token_account,
            grant_account,
            token_program,
        );
        distribution::distribute(&record, escrow_account.key, operator, amount, &token)
    }
}

/// Creates a rent-exempt account of `space` bytes owned by `owner`.
///
/// An address that already holds lamports (funded before initialization)
/// cannot go through `create_account`; it is topped up, allocated and
/// assigned instead. `signer_seeds` is empty when `target` signs itself.
fn create_program_account<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    owner: &Pubkey,
    space: usize,
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    let rent = Rent::get()?;
    let required = rent.minimum_balance(space);
    let current = target.lamports();

    if current == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer.key,
                target.key,
                required,
                space as u64,
                owner,
            ),
            &[payer.clone(), target.clone(), system_program.clone()],
            signer_seeds,
        );
    }

    let top_up = required.saturating_sub(current);
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer.key, target.key, top_up),
            &[payer.clone(), target.clone(), system_program.clone()],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(target.key, space as u64),
        &[target.clone(), system_program.clone()],
        signer_seeds,
    )?;
    invoke_signed(
        &system_instruction::assign(target.key, owner),
        &[target.clone(), system_program.clone()],
        signer_seeds,
    )
}
