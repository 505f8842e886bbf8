mod account;
mod client;
mod company;
pub mod state;

pub use account::{Account, AccountKind};
pub use client::Client;
pub use company::{Company, Config, InstallmentSettings};
pub use state::{AccountMovement, Direction, State};

use crate::error::{LedgerError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Get the config directory path (XDG config dir, falling back to ~/.installments/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "installments") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".installments"))
}

fn read_toml<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    if !path.exists() {
        return Err(LedgerError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| LedgerError::ConfigParse { path, source: e })
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let config: Config = read_toml(config_dir.join("config.toml"))?;
    config.locale.validate()?;
    Ok(config)
}

/// Load clients.toml as a HashMap keyed by client id
pub fn load_clients(config_dir: &Path) -> Result<HashMap<String, Client>> {
    read_toml(config_dir.join("clients.toml"))
}

/// Load accounts.toml as a HashMap keyed by account id
pub fn load_accounts(config_dir: &Path) -> Result<HashMap<String, Account>> {
    read_toml(config_dir.join("accounts.toml"))
}

/// Load state.toml (empty state if missing)
pub fn load_state(config_dir: &Path) -> Result<State> {
    let path = config_dir.join("state.toml");
    if !path.exists() {
        return Ok(State::default());
    }
    read_toml(path)
}

/// Save state.toml. The file is replaced in one rename so a failed write
/// leaves the previous state in place.
pub fn save_state(config_dir: &Path, state: &State) -> Result<()> {
    let path = config_dir.join("state.toml");
    let content = toml::to_string_pretty(state).map_err(|e| LedgerError::ConfigWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let tmp = config_dir.join("state.toml.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, &path)?;
    debug!(path = %path.display(), entries = state.entries.len(), "state saved");
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[company]
name = "Your Company Name"
document = "00.000.000/0001-00"   # CNPJ, optional
email = "financeiro@yourcompany.com.br"
# phone = "+55 11 99999-0000"    # optional
utc_offset_minutes = -180         # America/Sao_Paulo

[locale]
currency_symbol = "R$ "
decimal_separator = ","
grouping_separator = "."
date_format = "%d/%m/%Y"

[installments]
default_count = 1
max_count = 360
# What happens when editing an installment leaves too little for the last one:
#   "reject" keeps the plan unchanged, "clamp" sets the last one to zero and
#   refuses to save the unbalanced plan.
overflow_policy = "reject"
"#;

/// Template content for clients.toml
pub const CLIENTS_TEMPLATE: &str = r#"# Define your clients here. The table name (e.g., [posto-central]) is used
# as the client identifier in the add command.
#
# Example:
#   installments add --client posto-central --total 1.200,00 --installments 3

[example-client]
name = "Example Client Ltda."
document = "12.345.678/0001-90"   # CPF or CNPJ, optional
contact = "Maria Souza"           # optional
email = "maria@example.com"       # optional
city = "Campinas"                 # optional
state = "SP"                      # optional
"#;

/// Template content for accounts.toml
pub const ACCOUNTS_TEMPLATE: &str = r#"# Settlement accounts payments move money through. The table name is used
# as the account identifier in the pay command.
#
# Example:
#   installments pay 2 150,00 --account caixa --method cash

[caixa]
name = "Caixa"
kind = "cash"

[banco]
name = "Conta corrente"
kind = "bank"
"#;
