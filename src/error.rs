use std::path::PathBuf;
use thiserror::Error;

use crate::money::Money;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Config directory not found at {0}. Run 'installments init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {reason}")]
    ConfigWrite { path: PathBuf, reason: String },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Client '{0}' not found in clients.toml")]
    ClientNotFound(String),

    #[error("Account '{0}' not found in accounts.toml")]
    AccountNotFound(String),

    #[error("A settlement account is required to register a payment")]
    MissingAccount,

    #[error("Entry {0} not found")]
    EntryNotFound(u32),

    #[error("Entry {0} is paid through its installments; pay an installment instead")]
    EntryHasPlan(u32),

    #[error("Payment {0} not found")]
    PaymentNotFound(u32),

    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid date_format '{0}' in config.toml")]
    InvalidDateFormat(String),

    #[error("Amount must not be negative (got {0})")]
    NegativeAmount(Money),

    #[error("Down payment {down_payment} exceeds total {total}")]
    DownPaymentExceedsTotal { total: Money, down_payment: Money },

    #[error("Installment count must be at least 1")]
    InvalidInstallmentCount,

    #[error("Installment count {count} is too large (at most {max})")]
    TooManyInstallments { count: i64, max: u32 },

    #[error("Installment {index} out of range (plan has {len} installment(s))")]
    InstallmentIndex { index: usize, len: usize },

    #[error("Installment {0} already has payments and cannot be dropped from the plan")]
    PlanHasPayments(u32),

    #[error("Installment {number} already has {paid} paid; its amount cannot go below that")]
    InstallmentBelowPaid { number: u32, paid: Money },

    #[error("Entry {id} already has {paid} paid; its total cannot go below that")]
    EntryBelowPaid { id: u32, paid: Money },

    #[error("Edit rejected: {0}")]
    EditRejected(String),

    #[error("Payment would exceed the expected amount (max {max} remaining)")]
    OverPayment { parent: u32, max: Money },

    #[error("Payment amount must be greater than zero")]
    InvalidPaymentAmount,

    #[error("Unknown payment method '{0}'. Use pix, cash, bank-transfer, credit-card, debit-card, boleto or other")]
    InvalidPaymentMethod(String),

    #[error("Unknown entry kind '{0}'. Use debit or credit")]
    InvalidEntryKind(String),

    #[error("Entry {0} already has payments; remove them before changing its terms")]
    EntryHasPayments(u32),

    #[error("A submission is already in flight; wait for it to settle")]
    SubmissionInFlight,

    #[error("Payment service failed: {0}")]
    Gateway(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
