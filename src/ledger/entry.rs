use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;
use crate::money::{self, Money};
use crate::plan::PlanInputs;

pub type EntryId = u32;

/// Derived payment state of a payable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    PartiallyPaid,
    Paid,
}

impl PaymentStatus {
    /// Nothing left to collect counts as paid, even with no payments.
    pub fn from_amounts(expected: Money, paid: Money) -> Self {
        if expected <= Decimal::ZERO {
            PaymentStatus::Paid
        } else if paid <= Decimal::ZERO {
            PaymentStatus::Pending
        } else if paid >= expected {
            PaymentStatus::Paid
        } else {
            PaymentStatus::PartiallyPaid
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::PartiallyPaid => write!(f, "PARTIAL"),
            PaymentStatus::Paid => write!(f, "PAID"),
        }
    }
}

/// Debit entries are receivables (the client owes the company); credit
/// entries are payables (the company owes the client, e.g. oil purchased).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Debit,
    Credit,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Debit => write!(f, "debit"),
            EntryKind::Credit => write!(f, "credit"),
        }
    }
}

impl FromStr for EntryKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debit" | "d" => Ok(EntryKind::Debit),
            "credit" | "c" => Ok(EntryKind::Credit),
            _ => Err(LedgerError::InvalidEntryKind(s.to_string())),
        }
    }
}

/// One scheduled portion of a financed total.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Installment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub expected_amount: Money,
    #[serde(default)]
    pub paid_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: PaymentStatus,
}

impl Installment {
    pub fn refresh_status(&mut self) {
        self.status = PaymentStatus::from_amounts(self.expected_amount, self.paid_amount);
    }
}

/// A debit or credit tied to a client contract. Entries with more than one
/// installment are paid through their plan; the rest are paid directly.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LedgerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub kind: EntryKind,
    pub client: String,
    #[serde(default)]
    pub description: String,
    pub issue_date: NaiveDate,
    pub total_value: Money,
    #[serde(default)]
    pub down_payment: Money,
    pub installments_number: u32,
    #[serde(default)]
    pub paid_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub installments: Vec<Installment>,
}

impl LedgerEntry {
    /// Amount left after the down payment; what the plan (or the single
    /// payment) has to cover.
    pub fn financed(&self) -> Money {
        money::cents(self.total_value - self.down_payment)
    }

    pub fn has_plan(&self) -> bool {
        !self.installments.is_empty()
    }

    pub fn plan_inputs(&self) -> PlanInputs {
        PlanInputs {
            total_value: self.total_value,
            down_payment: self.down_payment,
            installments_number: i64::from(self.installments_number),
            issue_date: Some(self.issue_date),
        }
    }

    pub fn outstanding(&self) -> Money {
        self.financed() - self.paid_amount
    }

    pub fn installment_by_id(&self, id: EntryId) -> Option<&Installment> {
        self.installments.iter().find(|i| i.id == Some(id))
    }

    /// Recompute paid amount, paid date and status from the plan. Entries
    /// without a plan keep the amounts written by the payment store.
    pub fn roll_up(&mut self) {
        if self.has_plan() {
            self.paid_amount = money::sum(self.installments.iter().map(|i| i.paid_amount));
            self.paid_date = self.installments.iter().filter_map(|i| i.paid_date).max();
        }
        self.status = PaymentStatus::from_amounts(self.financed(), self.paid_amount);
    }
}
