use serde::{Deserialize, Serialize};
use std::fmt;

/// A cash drawer or bank account payments settle through.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub kind: AccountKind,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Cash,
    #[default]
    Bank,
    Card,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Cash => write!(f, "cash"),
            AccountKind::Bank => write!(f, "bank"),
            AccountKind::Card => write!(f, "card"),
        }
    }
}
