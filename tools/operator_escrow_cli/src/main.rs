use anyhow::{anyhow, Result};
use borsh::BorshDeserialize;
use operator_escrow::{
    distribution::spendable_lamports,
    instruction,
    state::{DelegationGrant, EscrowRecord},
};
use operator_escrow_cli::{
    parse_options, required_option, required_pubkey, required_u64, CliConfig,
};
use solana_client::rpc_client::RpcClient;
use solana_program::program_pack::Pack;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signature, Signer},
    transaction::Transaction,
};
use spl_token::state::Account as TokenAccount;
use std::{collections::HashMap, env};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI ENTRYPOINT
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("[operator_escrow_cli] Error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    let command = args[0].as_str();
    let options = parse_options(&args[1..])?;

    let mut config = CliConfig::load_from_path(options.get("config").map(String::as_str))?;
    config.apply_overrides(&options);
    config.validate()?;

    let client = RpcClient::new(config.rpc_url.clone());

    // Commands that don't require program-id
    if command == "get-token-balance" {
        return handle_get_token_balance(&client, &options);
    }

    let program_id = config.program_id()?;

    match command {
        "initialize" => handle_initialize(&client, &config, &options, program_id),
        "set-operator" => handle_set_operator(&client, &config, &options, program_id),
        "authorize-operator" => handle_authorize_operator(&client, &config, &options, program_id),
        "distribute-sol" => handle_distribute_sol(&client, &config, &options, program_id),
        "distribute-token" => handle_distribute_token(&client, &config, &options, program_id),
        "get-escrow" => handle_get_escrow(&client, &options, program_id),
        "get-grant" => handle_get_grant(&client, &options, program_id),
        _ => {
            print_usage();
            Err(anyhow!("Unknown command '{}'", command))
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_initialize(
    client: &RpcClient,
    config: &CliConfig,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let payer = read_keypair(config.payer_path()?)?;
    let escrow = read_keypair(required_option(options, "escrow")?)?;
    let authority = read_keypair(required_option(options, "authority")?)?;
    let operator = match options.get("operator") {
        Some(_) => Some(required_pubkey(options, "operator")?),
        None => None,
    };

    let ix = instruction::initialize(
        &program_id,
        &escrow.pubkey(),
        &authority.pubkey(),
        &payer.pubkey(),
        operator,
    )?;

    let signature = send_tx(client, &[ix], &payer, &[&escrow, &authority])?;
    println!("Initialize signature: {signature}");
    println!("Escrow: {}", escrow.pubkey());
    println!("Authority: {}", authority.pubkey());
    println!("Operator: {}", operator.unwrap_or_else(|| authority.pubkey()));
    Ok(())
}

fn handle_set_operator(
    client: &RpcClient,
    config: &CliConfig,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let payer = read_keypair(config.payer_path()?)?;
    let escrow = required_pubkey(options, "escrow")?;
    let authority = read_keypair(required_option(options, "authority")?)?;
    let new_operator = required_pubkey(options, "operator")?;

    let ix = instruction::set_operator(&program_id, &escrow, &authority.pubkey(), &new_operator)?;

    let signature = send_tx(client, &[ix], &payer, &[&authority])?;
    println!("SetOperator signature: {signature}");
    println!("Operator: {new_operator}");
    println!(
        "Note: the previous operator keeps its SPL approvals. Run authorize-operator \
         --operator {new_operator} for each granted token account to replace them."
    );
    Ok(())
}

fn handle_authorize_operator(
    client: &RpcClient,
    config: &CliConfig,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let payer = read_keypair(config.payer_path()?)?;
    let escrow = required_pubkey(options, "escrow")?;
    let token_account = required_pubkey(options, "token-account")?;
    let granter = read_keypair(required_option(options, "granter")?)?;
    let operator = required_pubkey(options, "operator")?;
    let allowance = required_u64(options, "allowance")?;

    let ix = instruction::authorize_operator_once(
        &program_id,
        &escrow,
        &token_account,
        &granter.pubkey(),
        &operator,
        &payer.pubkey(),
        allowance,
    )?;

    let signature = send_tx(client, &[ix], &payer, &[&granter])?;
    let (grant, _) = DelegationGrant::find_address(&escrow, &token_account, &program_id);
    println!("AuthorizeOperatorOnce signature: {signature}");
    println!("Grant PDA: {grant}");
    Ok(())
}

fn handle_distribute_sol(
    client: &RpcClient,
    config: &CliConfig,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let payer = read_keypair(config.payer_path()?)?;
    let escrow = required_pubkey(options, "escrow")?;
    let operator = read_keypair(required_option(options, "operator")?)?;
    let recipient = required_pubkey(options, "recipient")?;
    let amount = required_u64(options, "amount")?;

    let ix = instruction::distribute_sol(&program_id, &escrow, &operator.pubkey(), &recipient, amount)?;

    let signature = send_tx(client, &[ix], &payer, &[&operator])?;
    println!("DistributeSol signature: {signature}");
    Ok(())
}

fn handle_distribute_token(
    client: &RpcClient,
    config: &CliConfig,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let payer = read_keypair(config.payer_path()?)?;
    let escrow = required_pubkey(options, "escrow")?;
    let operator = read_keypair(required_option(options, "operator")?)?;
    let sender_token = required_pubkey(options, "sender-token")?;
    let recipient_token = required_pubkey(options, "recipient-token")?;
    let amount = required_u64(options, "amount")?;

    let ix = instruction::distribute_token(
        &program_id,
        &escrow,
        &operator.pubkey(),
        &sender_token,
        &recipient_token,
        amount,
    )?;

    let signature = send_tx(client, &[ix], &payer, &[&operator])?;
    println!("DistributeToken signature: {signature}");
    Ok(())
}

fn handle_get_escrow(
    client: &RpcClient,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let escrow = required_pubkey(options, "escrow")?;
    let account = client.get_account(&escrow)?;
    if account.owner != program_id {
        return Err(anyhow!("Account {} is not owned by {}", escrow, program_id));
    }
    let record = EscrowRecord::try_from_slice(&account.data)?;
    let reserve = client.get_minimum_balance_for_rent_exemption(account.data.len())?;

    println!("Escrow: {escrow}");
    println!("Authority: {}", record.authority);
    println!("Operator: {}", record.operator);
    println!("Lamports: {}", account.lamports);
    println!("Spendable: {}", spendable_lamports(account.lamports, reserve));
    Ok(())
}

fn handle_get_grant(
    client: &RpcClient,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let escrow = required_pubkey(options, "escrow")?;
    let token_account = required_pubkey(options, "token-account")?;
    let (grant_pda, _) = DelegationGrant::find_address(&escrow, &token_account, &program_id);

    let account = client
        .get_account(&grant_pda)
        .map_err(|_| anyhow!("No delegation grant at {}", grant_pda))?;
    let grant = DelegationGrant::try_from_slice(&account.data)?;

    println!("Grant PDA: {grant_pda}");
    println!("Operator: {}", grant.operator);
    println!("Allowance: {}", grant.allowance);
    println!("Remaining: {}", grant.remaining);
    Ok(())
}

fn handle_get_token_balance(client: &RpcClient, options: &HashMap<String, String>) -> Result<()> {
    let token_account = required_pubkey(options, "token-account")?;
    let account = client.get_account(&token_account)?;
    let token_state = TokenAccount::unpack(&account.data)?;
    println!("{}", token_state.amount);
    Ok(())
}

// ============================================================================
// TRANSACTION HELPERS
// ============================================================================

fn send_tx(
    client: &RpcClient,
    instructions: &[Instruction],
    payer: &Keypair,
    signers: &[&Keypair],
) -> Result<Signature> {
    let blockhash = client.get_latest_blockhash()?;
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
    let signature = client.send_and_confirm_transaction(&tx)?;
    info!(%signature, instructions = instructions.len(), "Transaction confirmed");
    Ok(signature)
}

fn read_keypair(path: &str) -> Result<Keypair> {
    read_keypair_file(path).map_err(|e| anyhow!("Failed to read keypair '{}': {}", path, e))
}

// ============================================================================
// USAGE
// ============================================================================

fn print_usage() {
    eprintln!(
        r#"Operator Escrow CLI

Usage:
  operator_escrow_cli <command> [--option value]...

Commands:
  initialize          --escrow <keypair> --authority <keypair> [--operator <pubkey>]
  set-operator        --escrow <pubkey> --authority <keypair> --operator <pubkey>
  authorize-operator  --escrow <pubkey> --token-account <pubkey> --granter <keypair>
                      --operator <pubkey> --allowance <u64>
  distribute-sol      --escrow <pubkey> --operator <keypair> --recipient <pubkey> --amount <u64>
  distribute-token    --escrow <pubkey> --operator <keypair> --sender-token <pubkey>
                      --recipient-token <pubkey> --amount <u64>
  get-escrow          --escrow <pubkey>
  get-grant           --escrow <pubkey> --token-account <pubkey>
  get-token-balance   --token-account <pubkey>

Common options:
  --program-id <pubkey>  --payer <keypair>  --rpc <url>  --config <path>
  Defaults come from $OPERATOR_ESCROW_CONFIG_PATH or config/operator_escrow.toml
        "#
    );
}
