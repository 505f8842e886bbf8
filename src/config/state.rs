use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::ledger::{EntryId, EntryKind, Installment, LedgerEntry, LedgerStore};
use crate::money::{self, Money, TOLERANCE};
use crate::payment::{PaymentEntry, PaymentGateway, PaymentId, PaymentReceipt, PaymentRequest};

/// Contents of state.toml: every entry, plan, payment and account movement.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct State {
    #[serde(default)]
    pub counter: Counter,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub payments: Vec<PaymentEntry>,
    #[serde(default)]
    pub movements: Vec<AccountMovement>,
}

/// Entries and installments share one id sequence so a payable id is
/// unambiguous.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Counter {
    pub last_entry_id: u32,
    pub last_payment_id: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

/// Money moving through a settlement account because of a payment.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AccountMovement {
    pub payment_id: PaymentId,
    pub account: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy)]
enum Payable {
    Entry(usize),
    Installment(usize, usize),
}

impl State {
    fn next_entry_id(&mut self) -> EntryId {
        self.counter.last_entry_id += 1;
        self.counter.last_entry_id
    }

    fn next_payment_id(&mut self) -> PaymentId {
        self.counter.last_payment_id += 1;
        self.counter.last_payment_id
    }

    fn locate(&self, id: EntryId) -> Option<Payable> {
        for (entry_idx, entry) in self.entries.iter().enumerate() {
            if entry.id == Some(id) {
                return Some(Payable::Entry(entry_idx));
            }
            if let Some(idx) = entry.installments.iter().position(|i| i.id == Some(id)) {
                return Some(Payable::Installment(entry_idx, idx));
            }
        }
        None
    }

    /// The entry `id` belongs to, whether `id` is the entry itself or one of
    /// its installments.
    pub fn owning_entry(&self, id: EntryId) -> Option<&LedgerEntry> {
        match self.locate(id)? {
            Payable::Entry(idx) | Payable::Installment(idx, _) => self.entries.get(idx),
        }
    }

    pub fn installment(&self, id: EntryId) -> Option<&Installment> {
        match self.locate(id)? {
            Payable::Installment(entry_idx, idx) => self.entries[entry_idx].installments.get(idx),
            Payable::Entry(_) => None,
        }
    }

    pub fn last_entry_id(&self) -> EntryId {
        self.counter.last_entry_id
    }

    /// Net amount that went through `account` (money in minus money out).
    pub fn account_balance(&self, account: &str) -> Money {
        money::sum(
            self.movements
                .iter()
                .filter(|m| m.account == account)
                .map(|m| match m.direction {
                    Direction::In => m.amount,
                    Direction::Out => -m.amount,
                }),
        )
    }

    fn payable_expected(&self, id: EntryId) -> Result<Money> {
        match self.locate(id) {
            Some(Payable::Entry(idx)) => {
                let entry = &self.entries[idx];
                if entry.has_plan() {
                    Err(LedgerError::EntryHasPlan(id))
                } else {
                    Ok(entry.financed())
                }
            }
            Some(Payable::Installment(entry_idx, idx)) => {
                Ok(self.entries[entry_idx].installments[idx].expected_amount)
            }
            None => Err(LedgerError::EntryNotFound(id)),
        }
    }

    fn paid_towards(&self, id: EntryId) -> Money {
        money::sum(
            self.payments
                .iter()
                .filter(|p| p.parent_entry_id == id)
                .map(|p| p.amount),
        )
    }

    /// Rewrite the paid figures of payable `id` from its recorded payments
    /// and roll them up to the owning entry.
    fn refresh_paid(&mut self, id: EntryId) {
        let paid = self.paid_towards(id);
        let paid_date = self
            .payments
            .iter()
            .filter(|p| p.parent_entry_id == id)
            .map(|p| p.date)
            .max();

        match self.locate(id) {
            Some(Payable::Entry(idx)) => {
                let entry = &mut self.entries[idx];
                entry.paid_amount = paid;
                entry.paid_date = paid_date;
                entry.roll_up();
            }
            Some(Payable::Installment(entry_idx, idx)) => {
                let entry = &mut self.entries[entry_idx];
                let installment = &mut entry.installments[idx];
                installment.paid_amount = paid;
                installment.paid_date = paid_date;
                installment.refresh_status();
                entry.roll_up();
            }
            None => {}
        }
    }

    fn direction_for(&self, parent: EntryId) -> Direction {
        match self.owning_entry(parent).map(|e| e.kind) {
            Some(EntryKind::Credit) => Direction::Out,
            _ => Direction::In,
        }
    }
}

impl LedgerStore for State {
    fn upsert_entry(&mut self, mut entry: LedgerEntry) -> Result<LedgerEntry> {
        let existing = entry
            .id
            .and_then(|id| self.entries.iter().position(|e| e.id == Some(id)));

        entry.roll_up();
        match existing {
            Some(idx) => self.entries[idx] = entry.clone(),
            None => {
                match entry.id {
                    Some(id) => self.counter.last_entry_id = self.counter.last_entry_id.max(id),
                    None => entry.id = Some(self.next_entry_id()),
                }
                self.entries.push(entry.clone());
            }
        }
        debug!(id = ?entry.id, "entry stored");
        Ok(entry)
    }

    fn save_installment_plan(
        &mut self,
        parent_id: EntryId,
        installments: &[Installment],
    ) -> Result<Vec<Installment>> {
        let entry_idx = self
            .entries
            .iter()
            .position(|e| e.id == Some(parent_id))
            .ok_or(LedgerError::EntryNotFound(parent_id))?;

        let kept: Vec<EntryId> = installments.iter().filter_map(|i| i.id).collect();
        if let Some(dropped) = self.entries[entry_idx].installments.iter().find(|i| {
            i.id.is_some_and(|id| {
                !kept.contains(&id) && self.payments.iter().any(|p| p.parent_entry_id == id)
            })
        }) {
            return Err(LedgerError::PlanHasPayments(dropped.installment_number));
        }

        let mut saved = installments.to_vec();
        for installment in &mut saved {
            if installment.id.is_none() {
                installment.id = Some(self.next_entry_id());
            }
        }
        let ids: Vec<EntryId> = saved.iter().filter_map(|i| i.id).collect();
        self.entries[entry_idx].installments = saved;

        self.refresh_paid(parent_id);
        for id in ids {
            self.refresh_paid(id);
        }

        debug!(parent_id, count = installments.len(), "installment plan stored");
        Ok(self.entries[entry_idx].installments.clone())
    }

    fn entry(&self, id: EntryId) -> Result<LedgerEntry> {
        self.entries
            .iter()
            .find(|e| e.id == Some(id))
            .cloned()
            .ok_or(LedgerError::EntryNotFound(id))
    }
}

impl PaymentGateway for State {
    fn expected_amount_of(&self, parent: EntryId) -> Result<Money> {
        self.payable_expected(parent)
    }

    fn payments_for(&self, parent: EntryId) -> Result<Vec<PaymentEntry>> {
        Ok(self
            .payments
            .iter()
            .filter(|p| p.parent_entry_id == parent)
            .cloned()
            .collect())
    }

    fn payment(&self, id: PaymentId) -> Result<PaymentEntry> {
        self.payments
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(LedgerError::PaymentNotFound(id))
    }

    /// Validate first, then write the payment, the movement and the paid
    /// figures together.
    fn register_payment(&mut self, request: &PaymentRequest) -> Result<PaymentReceipt> {
        let parent = request.parent_entry_id;
        let refused = |message: String| PaymentReceipt {
            success: false,
            message,
            payment_id: None,
            balance_after: None,
        };

        let expected = match self.payable_expected(parent) {
            Ok(expected) => expected,
            Err(e) => return Ok(refused(e.to_string())),
        };
        let paid = self.paid_towards(parent);
        let (after, limit) = match (
            money::checked_add(paid, request.amount),
            money::checked_add(expected, TOLERANCE),
        ) {
            (Ok(after), Ok(limit)) => (after, limit),
            (Err(e), _) | (_, Err(e)) => return Ok(refused(e.to_string())),
        };
        if after > limit {
            return Ok(refused(format!(
                "payment exceeds the expected amount of {expected}"
            )));
        }

        let id = self.next_payment_id();
        let direction = self.direction_for(parent);
        self.payments.push(PaymentEntry {
            id,
            parent_entry_id: parent,
            amount: request.amount,
            date: request.date,
            method: request.method,
            account: request.account.clone(),
            notes: request.notes.clone(),
        });
        self.movements.push(AccountMovement {
            payment_id: id,
            account: request.account.clone(),
            amount: request.amount,
            date: request.date,
            direction,
        });
        self.refresh_paid(parent);

        Ok(PaymentReceipt {
            success: true,
            message: format!("payment {id} recorded"),
            payment_id: Some(id),
            balance_after: Some(expected - self.paid_towards(parent)),
        })
    }

    fn update_payment(&mut self, id: PaymentId, amount: Money, date: NaiveDate) -> Result<PaymentEntry> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LedgerError::PaymentNotFound(id))?;
        payment.amount = amount;
        payment.date = date;
        let updated = payment.clone();

        for movement in self.movements.iter_mut().filter(|m| m.payment_id == id) {
            movement.amount = amount;
            movement.date = date;
        }
        self.refresh_paid(updated.parent_entry_id);
        Ok(updated)
    }

    fn delete_payment(&mut self, id: PaymentId) -> Result<PaymentEntry> {
        let idx = self
            .payments
            .iter()
            .position(|p| p.id == id)
            .ok_or(LedgerError::PaymentNotFound(id))?;
        let removed = self.payments.remove(idx);
        self.movements.retain(|m| m.payment_id != id);
        self.refresh_paid(removed.parent_entry_id);
        Ok(removed)
    }
}

impl State {
    /// Entries whose remaining balance is still above zero.
    pub fn open_entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.outstanding() > Decimal::ZERO)
    }
}
