//! Configuration Management Module
//!
//! The CLI reads cluster and program settings from a TOML file. Every value
//! can be overridden on the command line.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

use crate::parse_pubkey;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "OPERATOR_ESCROW_CONFIG_PATH";

/// Config file used when neither `--config` nor the env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/operator_escrow.toml";

pub const DEFAULT_RPC_URL: &str = "http://localhost:8899";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// JSON-RPC endpoint of the cluster
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Deployed operator escrow program (base58)
    #[serde(default)]
    pub program_id: Option<String>,
    /// Keypair file paying fees and rent
    #[serde(default)]
    pub payer: Option<String>,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            program_id: None,
            payer: None,
        }
    }
}

impl CliConfig {
    /// Loads the configuration.
    ///
    /// Lookup order: `path`, then `OPERATOR_ESCROW_CONFIG_PATH`, then
    /// `config/operator_escrow.toml`. An explicitly named file must exist;
    /// a missing default file yields the defaults.
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let explicit = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());

        let config = match explicit {
            Some(config_path) => {
                if !std::path::Path::new(&config_path).exists() {
                    return Err(anyhow::anyhow!(
                        "Configuration file '{}' not found. Please copy the template:\n\
                        cp config/operator_escrow.template.toml {}",
                        config_path,
                        config_path
                    ));
                }
                Self::read(&config_path)?
            }
            None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::read(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    fn read(config_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path))?;
        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path))?;
        Ok(config)
    }

    /// Command-line `--rpc`, `--program-id` and `--payer` win over the file.
    pub fn apply_overrides(&mut self, options: &HashMap<String, String>) {
        if let Some(rpc) = options.get("rpc") {
            self.rpc_url = rpc.clone();
        }
        if let Some(program_id) = options.get("program-id") {
            self.program_id = Some(program_id.clone());
        }
        if let Some(payer) = options.get("payer") {
            self.payer = Some(payer.clone());
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Configuration error: rpc_url is empty"));
        }
        if let Some(program_id) = &self.program_id {
            parse_pubkey(program_id).context("Configuration error: program_id")?;
        }
        Ok(())
    }

    pub fn program_id(&self) -> anyhow::Result<Pubkey> {
        let value = self
            .program_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("program_id is not configured; pass --program-id"))?;
        Ok(parse_pubkey(value)?)
    }

    pub fn payer_path(&self) -> anyhow::Result<&str> {
        self.payer
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("payer is not configured; pass --payer"))
    }
}
