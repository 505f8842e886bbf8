mod guard;
mod reconciler;

pub use guard::{SubmitGuard, SubmitToken};
pub use reconciler::{Balance, PaymentReconciler};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, Result};
use crate::ledger::EntryId;
use crate::money::Money;

pub type PaymentId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    #[default]
    Pix,
    Cash,
    BankTransfer,
    CreditCard,
    DebitCard,
    Boleto,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank-transfer",
            PaymentMethod::CreditCard => "credit-card",
            PaymentMethod::DebitCard => "debit-card",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "pix" => Ok(PaymentMethod::Pix),
            "cash" => Ok(PaymentMethod::Cash),
            "bank-transfer" | "transfer" => Ok(PaymentMethod::BankTransfer),
            "credit-card" => Ok(PaymentMethod::CreditCard),
            "debit-card" => Ok(PaymentMethod::DebitCard),
            "boleto" => Ok(PaymentMethod::Boleto),
            "other" => Ok(PaymentMethod::Other),
            _ => Err(LedgerError::InvalidPaymentMethod(s.to_string())),
        }
    }
}

/// A payment recorded against an installment or a single-payment entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaymentEntry {
    pub id: PaymentId,
    pub parent_entry_id: EntryId,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub method: PaymentMethod,
    pub account: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub parent_entry_id: EntryId,
    pub amount: Money,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub notes: String,
    pub account: String,
}

/// What the payment service reports back for a registration.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub success: bool,
    pub message: String,
    pub payment_id: Option<PaymentId>,
    pub balance_after: Option<Money>,
}

/// The service that records payments. A registration is atomic: the payment,
/// the parent's paid amount and the settlement account movement are either
/// all written or none are.
pub trait PaymentGateway {
    /// Amount the payable record is expected to receive.
    fn expected_amount_of(&self, parent: EntryId) -> Result<Money>;

    fn payments_for(&self, parent: EntryId) -> Result<Vec<PaymentEntry>>;

    fn payment(&self, id: PaymentId) -> Result<PaymentEntry>;

    fn register_payment(&mut self, request: &PaymentRequest) -> Result<PaymentReceipt>;

    fn update_payment(&mut self, id: PaymentId, amount: Money, date: NaiveDate) -> Result<PaymentEntry>;

    fn delete_payment(&mut self, id: PaymentId) -> Result<PaymentEntry>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_round_trip_through_their_names() {
        for method in [
            PaymentMethod::Pix,
            PaymentMethod::Cash,
            PaymentMethod::BankTransfer,
            PaymentMethod::CreditCard,
            PaymentMethod::DebitCard,
            PaymentMethod::Boleto,
            PaymentMethod::Other,
        ] {
            assert_eq!(method.to_string().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn method_parsing_is_lenient_about_case_and_underscores() {
        assert_eq!("PIX".parse::<PaymentMethod>().unwrap(), PaymentMethod::Pix);
        assert_eq!(
            "bank_transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert!(matches!(
            "cheque".parse::<PaymentMethod>(),
            Err(LedgerError::InvalidPaymentMethod(_))
        ));
    }
}
