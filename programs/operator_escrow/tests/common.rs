#![allow(dead_code)]
#![allow(deprecated)]

use borsh::BorshDeserialize;
use solana_program::program_pack::Pack;
use solana_program_test::{processor, BanksClientError, ProgramTest, ProgramTestContext};
use solana_sdk::system_instruction;
use solana_sdk::{
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};

use operator_escrow::{
    instruction,
    state::{DelegationGrant, EscrowRecord},
    EscrowError,
};

// ============================================================================
// TEST PROGRAM ID
// ============================================================================

/// Fixed program ID for testing. Actual deployed program ID is determined by
/// the deployment keypair, not this value.
pub fn test_program_id() -> Pubkey {
    solana_sdk::pubkey!("Escrow11111111111111111111111111111111111111")
}

/// Lamports sent to the escrow address before it is initialized.
pub const ESCROW_PREFUND: u64 = 1_000_000_000;

/// Tokens minted into the escrow-owned token account.
pub const ESCROW_TOKENS: u64 = 1_000_000;

// ============================================================================
// TEST HARNESS HELPERS
// ============================================================================

/// Helper: Build a ProgramTest instance with operator_escrow + spl_token
pub fn program_test() -> ProgramTest {
    let program_id = test_program_id();
    let mut program_test = ProgramTest::new(
        "operator_escrow",
        program_id,
        processor!(operator_escrow::processor::Processor::process),
    );
    program_test.add_program(
        "spl_token",
        spl_token::id(),
        processor!(spl_token::processor::Processor::process),
    );
    program_test
}

/// Helper: Send a transaction and return the banks result
pub async fn try_send_tx(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    // A fresh blockhash keeps two identical transactions from being deduplicated.
    let blockhash = context.get_new_latest_blockhash().await.unwrap();
    let mut all_signers = Vec::with_capacity(signers.len() + 1);
    all_signers.push(payer);
    for signer in signers {
        if signer.pubkey() != payer.pubkey() {
            all_signers.push(*signer);
        }
    }

    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &all_signers,
        blockhash,
    );
    context.banks_client.process_transaction(tx).await
}

/// Helper: Send a transaction that must succeed
pub async fn send_tx(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
) {
    try_send_tx(context, payer, instructions, signers)
        .await
        .unwrap();
}

// ============================================================================
// SPL TOKEN HELPERS
// ============================================================================

/// Helper: Create a new SPL token mint
pub async fn create_mint(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint_authority: &Keypair,
    decimals: u8,
) -> Pubkey {
    let mint = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    let mint_rent = rent.minimum_balance(spl_token::state::Mint::LEN);

    let create_mint_ix = system_instruction::create_account(
        &payer.pubkey(),
        &mint.pubkey(),
        mint_rent,
        spl_token::state::Mint::LEN as u64,
        &spl_token::id(),
    );
    let init_mint_ix = spl_token::instruction::initialize_mint2(
        &spl_token::id(),
        &mint.pubkey(),
        &mint_authority.pubkey(),
        None,
        decimals,
    )
    .unwrap();

    send_tx(context, payer, &[create_mint_ix, init_mint_ix], &[&mint]).await;
    mint.pubkey()
}

/// Helper: Create an SPL token account for a given mint and owner
pub async fn create_token_account(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    owner: Pubkey,
) -> Pubkey {
    let token_account = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    let token_rent = rent.minimum_balance(spl_token::state::Account::LEN);

    let create_ix = system_instruction::create_account(
        &payer.pubkey(),
        &token_account.pubkey(),
        token_rent,
        spl_token::state::Account::LEN as u64,
        &spl_token::id(),
    );
    let init_ix = spl_token::instruction::initialize_account3(
        &spl_token::id(),
        &token_account.pubkey(),
        &mint,
        &owner,
    )
    .unwrap();

    send_tx(context, payer, &[create_ix, init_ix], &[&token_account]).await;
    token_account.pubkey()
}

/// Helper: Mint tokens to a token account
pub async fn mint_to(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    mint_authority: &Keypair,
    destination: Pubkey,
    amount: u64,
) {
    let ix = spl_token::instruction::mint_to(
        &spl_token::id(),
        &mint,
        &destination,
        &mint_authority.pubkey(),
        &[],
        amount,
    )
    .unwrap();

    send_tx(context, payer, &[ix], &[mint_authority]).await;
}

/// Helper: Read SPL token account state
pub async fn get_token_account(
    context: &mut ProgramTestContext,
    token_account: Pubkey,
) -> spl_token::state::Account {
    let account = context
        .banks_client
        .get_account(token_account)
        .await
        .unwrap()
        .unwrap();
    spl_token::state::Account::unpack(&account.data).unwrap()
}

/// Helper: Read SPL token account balance
pub async fn get_token_balance(context: &mut ProgramTestContext, token_account: Pubkey) -> u64 {
    get_token_account(context, token_account).await.amount
}

/// Helper: Read lamports held at an address (0 if the account does not exist)
pub async fn get_lamports(context: &mut ProgramTestContext, address: Pubkey) -> u64 {
    context
        .banks_client
        .get_account(address)
        .await
        .unwrap()
        .map(|account| account.lamports)
        .unwrap_or(0)
}

// ============================================================================
// PROGRAM HELPERS
// ============================================================================

/// Helper: Initialize an escrow record at `escrow`'s address
pub async fn initialize_escrow(
    context: &mut ProgramTestContext,
    escrow: &Keypair,
    authority: &Keypair,
    operator: Option<Pubkey>,
) -> Result<(), BanksClientError> {
    let payer = context.payer.insecure_clone();
    let ix = instruction::initialize(
        &test_program_id(),
        &escrow.pubkey(),
        &authority.pubkey(),
        &payer.pubkey(),
        operator,
    )
    .unwrap();
    try_send_tx(context, &payer, &[ix], &[escrow, authority]).await
}

/// Helper: Grant `operator` an allowance over `token_account`, signed by `granter`
pub async fn authorize_operator(
    context: &mut ProgramTestContext,
    escrow: Pubkey,
    token_account: Pubkey,
    granter: &Keypair,
    operator: Pubkey,
    allowance: u64,
) -> Result<(), BanksClientError> {
    let payer = context.payer.insecure_clone();
    let ix = instruction::authorize_operator_once(
        &test_program_id(),
        &escrow,
        &token_account,
        &granter.pubkey(),
        &operator,
        &payer.pubkey(),
        allowance,
    )
    .unwrap();
    try_send_tx(context, &payer, &[ix], &[granter]).await
}

/// Helper: Pay SOL out of the escrow, signed by `operator`
pub async fn distribute_sol(
    context: &mut ProgramTestContext,
    escrow: Pubkey,
    operator: &Keypair,
    recipient: Pubkey,
    amount: u64,
) -> Result<(), BanksClientError> {
    let payer = context.payer.insecure_clone();
    let ix = instruction::distribute_sol(
        &test_program_id(),
        &escrow,
        &operator.pubkey(),
        &recipient,
        amount,
    )
    .unwrap();
    try_send_tx(context, &payer, &[ix], &[operator]).await
}

/// Helper: Pay tokens out of `sender_token`, signed by `operator`
pub async fn distribute_token(
    context: &mut ProgramTestContext,
    escrow: Pubkey,
    operator: &Keypair,
    sender_token: Pubkey,
    recipient_token: Pubkey,
    amount: u64,
) -> Result<(), BanksClientError> {
    let payer = context.payer.insecure_clone();
    let ix = instruction::distribute_token(
        &test_program_id(),
        &escrow,
        &operator.pubkey(),
        &sender_token,
        &recipient_token,
        amount,
    )
    .unwrap();
    try_send_tx(context, &payer, &[ix], &[operator]).await
}

/// Helper: Read the escrow record
pub async fn read_escrow(context: &mut ProgramTestContext, escrow: Pubkey) -> EscrowRecord {
    let account = context
        .banks_client
        .get_account(escrow)
        .await
        .unwrap()
        .unwrap();
    EscrowRecord::try_from_slice(&account.data).unwrap()
}

/// Helper: Read the delegation grant for a token account
pub async fn read_grant(
    context: &mut ProgramTestContext,
    escrow: Pubkey,
    token_account: Pubkey,
) -> DelegationGrant {
    let (grant_pda, _) = DelegationGrant::find_address(&escrow, &token_account, &test_program_id());
    let account = context
        .banks_client
        .get_account(grant_pda)
        .await
        .unwrap()
        .unwrap();
    DelegationGrant::try_from_slice(&account.data).unwrap()
}

// ============================================================================
// TEST ENVIRONMENT
// ============================================================================

/// Test environment with an initialized escrow and SPL token setup
pub struct TestEnv {
    pub program_id: Pubkey,
    pub escrow: Keypair,
    pub authority: Keypair,
    pub operator: Keypair,
    pub stranger: Keypair,
    pub recipient: Keypair,
    pub mint_authority: Keypair,
    pub mint: Pubkey,
    /// Token account owned by the escrow record address
    pub escrow_token: Pubkey,
    pub recipient_token: Pubkey,
}

/// Helper: Create a baseline environment used by most tests
///
/// The escrow address is pre-funded before initialization, and its token
/// account holds `ESCROW_TOKENS`. No grant exists yet.
pub async fn setup_basic_env(context: &mut ProgramTestContext) -> TestEnv {
    let payer = context.payer.insecure_clone();
    let program_id = test_program_id();
    let escrow = Keypair::new();
    let authority = Keypair::new();
    let operator = Keypair::new();
    let stranger = Keypair::new();
    let recipient = Keypair::new();
    let mint_authority = Keypair::new();

    let fund_escrow = system_instruction::transfer(&payer.pubkey(), &escrow.pubkey(), ESCROW_PREFUND);
    send_tx(context, &payer, &[fund_escrow], &[]).await;

    initialize_escrow(context, &escrow, &authority, Some(operator.pubkey()))
        .await
        .unwrap();

    let mint = create_mint(context, &payer, &mint_authority, 6).await;
    let escrow_token = create_token_account(context, &payer, mint, escrow.pubkey()).await;
    let recipient_token = create_token_account(context, &payer, mint, recipient.pubkey()).await;
    mint_to(
        context,
        &payer,
        mint,
        &mint_authority,
        escrow_token,
        ESCROW_TOKENS,
    )
    .await;

    TestEnv {
        program_id,
        escrow,
        authority,
        operator,
        stranger,
        recipient,
        mint_authority,
        mint,
        escrow_token,
        recipient_token,
    }
}

// ============================================================================
// ERROR CHECKING HELPERS
// ============================================================================

/// Helper: Assert that a transaction failed with the given custom program error
pub fn assert_escrow_error(result: Result<(), BanksClientError>, expected: EscrowError) {
    assert_instruction_error(result, InstructionError::Custom(expected as u32));
}

/// Helper: Assert that a transaction failed with the given instruction error
pub fn assert_instruction_error(result: Result<(), BanksClientError>, expected: InstructionError) {
    let error = result.expect_err("transaction should have failed").unwrap();
    match error {
        TransactionError::InstructionError(_, actual) => assert_eq!(actual, expected),
        other => panic!("unexpected transaction error: {:?}", other),
    }
}
