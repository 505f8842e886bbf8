use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use super::{EntryId, EntryKind, Installment, LedgerEntry, LedgerStore, PaymentStatus};
use crate::error::{LedgerError, Result};
use crate::money::{self, Money, TOLERANCE};
use crate::plan::{self, EditOutcome, EditWarning, OverflowPolicy, MAX_INSTALLMENTS};

/// Everything needed to open a new entry.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub kind: EntryKind,
    pub client: String,
    pub description: String,
    pub issue_date: NaiveDate,
    pub total_value: Money,
    pub down_payment: Money,
    pub installments_number: u32,
}

/// New terms for an existing entry; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermsChange {
    pub total_value: Option<Money>,
    pub down_payment: Option<Money>,
    pub installments_number: Option<u32>,
    pub issue_date: Option<NaiveDate>,
}

fn validate_terms(total_value: Money, down_payment: Money, installments_number: u32) -> Result<()> {
    if total_value < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount(total_value));
    }
    if down_payment < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount(down_payment));
    }
    if down_payment > total_value {
        return Err(LedgerError::DownPaymentExceedsTotal {
            total: total_value,
            down_payment,
        });
    }
    if installments_number == 0 {
        return Err(LedgerError::InvalidInstallmentCount);
    }
    if installments_number > MAX_INSTALLMENTS {
        return Err(LedgerError::TooManyInstallments {
            count: i64::from(installments_number),
            max: MAX_INSTALLMENTS,
        });
    }
    Ok(())
}

/// No installment may expect less than what was already paid on it.
fn ensure_covers_payments(plan: &[Installment]) -> Result<()> {
    match plan
        .iter()
        .find(|i| i.paid_amount > i.expected_amount + TOLERANCE)
    {
        Some(short) => Err(LedgerError::InstallmentBelowPaid {
            number: short.installment_number,
            paid: short.paid_amount,
        }),
        None => Ok(()),
    }
}

fn persisted_id(entry: &LedgerEntry) -> Result<EntryId> {
    entry
        .id
        .ok_or_else(|| LedgerError::Gateway("store returned an entry without an id".to_string()))
}

/// Open an entry and, when it is split into more than one installment,
/// generate and store its plan.
pub fn create_entry<S: LedgerStore>(store: &mut S, draft: EntryDraft) -> Result<LedgerEntry> {
    validate_terms(draft.total_value, draft.down_payment, draft.installments_number)?;

    let entry = LedgerEntry {
        id: None,
        kind: draft.kind,
        client: draft.client,
        description: draft.description,
        issue_date: draft.issue_date,
        total_value: money::cents(draft.total_value),
        down_payment: money::cents(draft.down_payment),
        installments_number: draft.installments_number,
        paid_amount: money::cents(Decimal::ZERO),
        paid_date: None,
        status: PaymentStatus::Pending,
        installments: Vec::new(),
    };

    let saved = store.upsert_entry(entry)?;
    let id = persisted_id(&saved)?;

    if saved.installments_number > 1 {
        let plan = plan::generate(&saved.plan_inputs(), &[]);
        store.save_installment_plan(id, &plan)?;
    }

    info!(
        id,
        client = %saved.client,
        total = %saved.total_value,
        installments = saved.installments_number,
        "entry created"
    );
    store.entry(id)
}

/// Change the generating inputs of an entry and regenerate its plan.
///
/// Installments that survive the change keep their ids, payments and due
/// dates. Dropping an installment that already received payments, or
/// switching between a single payment and a plan while payments exist, is
/// refused.
pub fn update_entry_terms<S: LedgerStore>(
    store: &mut S,
    id: EntryId,
    change: TermsChange,
) -> Result<LedgerEntry> {
    let mut entry = store.entry(id)?;

    if let Some(total_value) = change.total_value {
        entry.total_value = money::cents(total_value);
    }
    if let Some(down_payment) = change.down_payment {
        entry.down_payment = money::cents(down_payment);
    }
    if let Some(count) = change.installments_number {
        entry.installments_number = count;
    }
    if let Some(issue_date) = change.issue_date {
        entry.issue_date = issue_date;
    }
    validate_terms(entry.total_value, entry.down_payment, entry.installments_number)?;

    let count = entry.installments_number;
    let new_plan = if count > 1 {
        if !entry.has_plan() && entry.paid_amount > Decimal::ZERO {
            return Err(LedgerError::EntryHasPayments(id));
        }
        if let Some(paid) = entry
            .installments
            .iter()
            .find(|i| i.installment_number > count && i.paid_amount > Decimal::ZERO)
        {
            return Err(LedgerError::PlanHasPayments(paid.installment_number));
        }
        let regenerated = plan::generate(&entry.plan_inputs(), &entry.installments);
        ensure_covers_payments(&regenerated)?;
        regenerated
    } else {
        if let Some(paid) = entry
            .installments
            .iter()
            .find(|i| i.paid_amount > Decimal::ZERO)
        {
            return Err(LedgerError::PlanHasPayments(paid.installment_number));
        }
        if entry.paid_amount > entry.financed() + TOLERANCE {
            return Err(LedgerError::EntryBelowPaid {
                id,
                paid: entry.paid_amount,
            });
        }
        Vec::new()
    };

    store.upsert_entry(entry)?;
    store.save_installment_plan(id, &new_plan)?;

    info!(id, installments = count, "entry terms updated");
    store.entry(id)
}

/// Apply a manual amount edit to installment `installment_number` of a
/// stored plan and persist the rebalanced plan.
///
/// Rejected edits come back with their warning and nothing is written. A
/// plan left out of balance is never persisted.
pub fn edit_plan_amount<S: LedgerStore>(
    store: &mut S,
    id: EntryId,
    installment_number: u32,
    new_amount: Money,
    policy: OverflowPolicy,
) -> Result<EditOutcome> {
    let entry = store.entry(id)?;
    let index = entry
        .installments
        .iter()
        .position(|i| i.installment_number == installment_number)
        .ok_or(LedgerError::InstallmentIndex {
            index: installment_number as usize,
            len: entry.installments.len(),
        })?;

    let outcome = plan::edit_installment_amount(&entry.installments, index, new_amount, policy)?;

    match &outcome.warning {
        Some(warning @ EditWarning::OutOfBalance { .. }) => {
            Err(LedgerError::EditRejected(warning.to_string()))
        }
        Some(EditWarning::OverflowRejected { .. }) => Ok(outcome),
        _ => {
            ensure_covers_payments(&outcome.plan)?;
            let plan = store.save_installment_plan(id, &outcome.plan)?;
            Ok(EditOutcome {
                plan,
                warning: outcome.warning,
            })
        }
    }
}
