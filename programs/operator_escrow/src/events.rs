//! Event definitions for the operator escrow program.
//!
//! Events are emitted via solana_program::msg! and can be parsed from transaction logs.

use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::distribution::AssetKind;

/// Emitted when a new escrow record is created.
pub fn emit_escrow_initialized(escrow: &Pubkey, authority: &Pubkey, operator: &Pubkey) {
    msg!(
        "EscrowInitialized: escrow={}, authority={}, operator={}",
        escrow,
        authority,
        operator
    );
}

/// Emitted when the authority re-designates the operator.
pub fn emit_operator_changed(escrow: &Pubkey, previous: &Pubkey, operator: &Pubkey) {
    msg!(
        "OperatorChanged: escrow={}, previous={}, operator={}",
        escrow,
        previous,
        operator
    );
}

/// Emitted when an allowance over a token account is granted or replaced.
pub fn emit_operator_authorized(
    escrow: &Pubkey,
    token_account: &Pubkey,
    operator: &Pubkey,
    allowance: u64,
) {
    msg!(
        "OperatorAuthorized: escrow={}, token_account={}, operator={}, allowance={}",
        escrow,
        token_account,
        operator,
        allowance
    );
}

/// Emitted after a successful payout. `credited` includes any rent top-up.
pub fn emit_distributed(
    kind: AssetKind,
    escrow: &Pubkey,
    operator: &Pubkey,
    amount: u64,
    credited: u64,
) {
    match kind {
        AssetKind::Native => msg!(
            "SolDistributed: escrow={}, operator={}, amount={}, credited={}",
            escrow,
            operator,
            amount,
            credited
        ),
        AssetKind::Token => msg!(
            "TokenDistributed: escrow={}, operator={}, amount={}",
            escrow,
            operator,
            amount
        ),
    }
}

/// Emitted when a payout is refused. The error is still returned to the caller.
pub fn emit_distribution_rejected(
    kind: AssetKind,
    escrow: &Pubkey,
    operator: &Pubkey,
    error: &ProgramError,
) {
    msg!(
        "DistributionRejected: asset={}, escrow={}, operator={}, reason={:?}",
        kind.as_str(),
        escrow,
        operator,
        error
    );
}
