use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use crate::ledger::{Installment, PaymentStatus};
use crate::money::{self, Money};

/// Upper bound on plan length (a century of monthly installments).
pub const MAX_INSTALLMENTS: u32 = 1200;

/// The four values a plan is generated from. Any change to one of them
/// means the plan has to be regenerated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanInputs {
    pub total_value: Money,
    pub down_payment: Money,
    pub installments_number: i64,
    pub issue_date: Option<NaiveDate>,
}

impl PlanInputs {
    pub fn financed(&self) -> Money {
        money::cents(self.total_value - self.down_payment)
    }
}

/// Split the financed balance into `installments_number` monthly
/// installments.
///
/// Every installment gets the floor-rounded base amount and the last one
/// also takes the cents lost to truncation, so the amounts always add up to
/// `total_value - down_payment`. Installments in `existing` keep their
/// identity, payments and due date when their number is still in the plan.
///
/// Incomplete inputs (no issue date, a non-positive count, a down payment
/// larger than the total) produce an empty plan, as do counts above
/// [`MAX_INSTALLMENTS`] or due dates past the calendar range.
pub fn generate(inputs: &PlanInputs, existing: &[Installment]) -> Vec<Installment> {
    let Some(issue_date) = inputs.issue_date else {
        return Vec::new();
    };
    let Ok(count) = u32::try_from(inputs.installments_number) else {
        return Vec::new();
    };
    let remaining = inputs.financed();
    if count == 0 || count > MAX_INSTALLMENTS || remaining < Decimal::ZERO {
        return Vec::new();
    }
    if issue_date.checked_add_months(Months::new(count)).is_none() {
        return Vec::new();
    }

    let base = money::floor_cents(remaining / Decimal::from(count));
    let rounding_remainder = money::cents(remaining - base * Decimal::from(count));

    let mut plan = Vec::with_capacity(count as usize);
    for number in 1..=count {
        let expected_amount = if number == count {
            base + rounding_remainder
        } else {
            base
        };

        let installment = match existing.iter().find(|e| e.installment_number == number) {
            Some(previous) => Installment {
                id: previous.id,
                installment_number: number,
                due_date: previous.due_date,
                expected_amount,
                paid_amount: previous.paid_amount,
                paid_date: previous.paid_date,
                status: PaymentStatus::from_amounts(expected_amount, previous.paid_amount),
            },
            None => {
                let Some(due_date) = issue_date.checked_add_months(Months::new(number)) else {
                    return Vec::new();
                };
                Installment {
                    id: None,
                    installment_number: number,
                    due_date,
                    expected_amount,
                    paid_amount: Decimal::ZERO,
                    paid_date: None,
                    status: PaymentStatus::from_amounts(expected_amount, Decimal::ZERO),
                }
            }
        };
        plan.push(installment);
    }

    debug!(
        count,
        %remaining,
        %base,
        %rounding_remainder,
        reused = existing.len(),
        "generated installment plan"
    );

    plan
}

/// Outstanding amount of a single installment.
pub fn compute_balance(installment: &Installment) -> Money {
    installment.expected_amount - installment.paid_amount
}

pub fn plan_total(plan: &[Installment]) -> Money {
    money::sum(plan.iter().map(|i| i.expected_amount))
}

pub fn is_balanced(plan: &[Installment], financed: Money) -> bool {
    plan_total(plan) == money::cents(financed)
}
