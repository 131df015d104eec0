//! Operator Escrow Program (Native Solana)
//!
//! Custody for SOL and SPL tokens under a single authority. The authority
//! designates an operator that may pay out to third parties, bounded by the
//! escrow's native balance and by explicit per-token-account allowances.

pub mod distribution;
pub mod error;
pub mod events;
pub mod guard;
pub mod instruction;
pub mod processor;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

pub use solana_program;

// Re-export for tests
pub use error::EscrowError;
pub use instruction::EscrowInstruction;
pub use state::{DelegationGrant, EscrowRecord};
