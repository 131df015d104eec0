//! Shared helpers for the operator escrow CLI: option parsing, address
//! decoding and configuration loading.

pub mod config;

use solana_sdk::pubkey::Pubkey;
use std::{collections::HashMap, str::FromStr};
use thiserror::Error;

pub use config::CliConfig;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("Unexpected argument '{0}', expected --option value")]
    UnexpectedArgument(String),

    #[error("Missing value for --{0}")]
    MissingValue(String),

    #[error("Missing required option --{0}")]
    MissingOption(String),

    #[error("Invalid address '{value}': {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
}

/// Parses `--key value` pairs into a map keyed without the leading dashes.
pub fn parse_options(args: &[String]) -> Result<HashMap<String, String>, CliError> {
    let mut options = HashMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let key = arg
            .strip_prefix("--")
            .ok_or_else(|| CliError::UnexpectedArgument(arg.clone()))?;
        let value = iter
            .next()
            .ok_or_else(|| CliError::MissingValue(key.to_string()))?;
        options.insert(key.to_string(), value.clone());
    }
    Ok(options)
}

pub fn required_option<'a>(
    options: &'a HashMap<String, String>,
    key: &str,
) -> Result<&'a str, CliError> {
    options
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| CliError::MissingOption(key.to_string()))
}

/// Decodes a base58 address. Nothing is sent for a malformed one.
pub fn parse_pubkey(value: &str) -> Result<Pubkey, CliError> {
    Pubkey::from_str(value).map_err(|e| CliError::InvalidAddress {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

pub fn parse_u64(value: &str) -> Result<u64, CliError> {
    value
        .parse::<u64>()
        .map_err(|_| CliError::InvalidNumber(value.to_string()))
}

/// Looks up `key` and decodes it as an address.
pub fn required_pubkey(options: &HashMap<String, String>, key: &str) -> Result<Pubkey, CliError> {
    parse_pubkey(required_option(options, key)?)
}

/// Looks up `key` and decodes it as a `u64`.
pub fn required_u64(options: &HashMap<String, String>, key: &str) -> Result<u64, CliError> {
    parse_u64(required_option(options, key)?)
}
