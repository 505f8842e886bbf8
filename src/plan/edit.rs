use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::ledger::Installment;
use crate::money::{self, Money, TOLERANCE};

/// What to do when an edit to an earlier installment would push the last
/// one below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Refuse the edit and keep the plan as it was.
    #[default]
    Reject,
    /// Clamp the last installment to zero and report the plan as out of
    /// balance.
    Clamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditWarning {
    /// The last installment can only hold one value; the entered amount was
    /// replaced by it.
    LastInstallmentForced { entered: Money, forced: Money },
    /// The edit would have made the last installment negative by `excess`.
    OverflowRejected { excess: Money },
    /// The last installment was clamped to zero; the plan is `excess` over
    /// the financed balance.
    OutOfBalance { excess: Money },
}

impl fmt::Display for EditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditWarning::LastInstallmentForced { entered, forced } => write!(
                f,
                "last installment must be {forced} to match the total (entered {entered})"
            ),
            EditWarning::OverflowRejected { excess } => write!(
                f,
                "amount exceeds the remaining balance by {excess}; edit rejected"
            ),
            EditWarning::OutOfBalance { excess } => write!(
                f,
                "plan exceeds the total by {excess} after clamping the last installment"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub plan: Vec<Installment>,
    pub warning: Option<EditWarning>,
}

impl EditOutcome {
    /// False only when the clamp policy left the plan out of balance.
    pub fn is_balanced(&self) -> bool {
        !matches!(self.warning, Some(EditWarning::OutOfBalance { .. }))
    }
}

/// Set the amount of the installment at `index` and rebalance the plan.
///
/// The plan total before the edit is the amount that has to be preserved.
/// Editing the last installment only succeeds when the new value is within
/// a cent of the single value that keeps the plan balanced. Editing any
/// other installment moves the difference onto the last one.
pub fn edit_installment_amount(
    plan: &[Installment],
    index: usize,
    new_amount: Money,
    policy: OverflowPolicy,
) -> Result<EditOutcome> {
    if index >= plan.len() {
        return Err(LedgerError::InstallmentIndex {
            index,
            len: plan.len(),
        });
    }
    if new_amount < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount(new_amount));
    }

    let entered = money::cents(new_amount);
    let total_expected = money::checked_sum(plan.iter().map(|i| i.expected_amount))?;
    let last = plan.len() - 1;
    let mut edited = plan.to_vec();

    if index == last {
        let others = money::checked_sum(plan[..last].iter().map(|i| i.expected_amount))?;
        let target_last = money::checked_sub(total_expected, others)?;

        edited[last].expected_amount = target_last;
        edited[last].refresh_status();

        if money::checked_sub(entered, target_last)?.abs() > TOLERANCE {
            debug!(%entered, %target_last, "last installment edit rejected");
            return Ok(EditOutcome {
                plan: edited,
                warning: Some(EditWarning::LastInstallmentForced {
                    entered,
                    forced: target_last,
                }),
            });
        }

        return Ok(EditOutcome {
            plan: edited,
            warning: None,
        });
    }

    edited[index].expected_amount = entered;
    edited[index].refresh_status();

    let edited_total = money::checked_sum(edited.iter().map(|i| i.expected_amount))?;
    let difference = money::checked_sub(total_expected, edited_total)?;
    let new_last = money::checked_add(edited[last].expected_amount, difference)?;

    if new_last < Decimal::ZERO {
        let excess = -new_last;
        return match policy {
            OverflowPolicy::Reject => {
                debug!(index, %entered, %excess, "installment edit would overdraw the plan");
                Ok(EditOutcome {
                    plan: plan.to_vec(),
                    warning: Some(EditWarning::OverflowRejected { excess }),
                })
            }
            OverflowPolicy::Clamp => {
                debug!(index, %entered, %excess, "last installment clamped to zero");
                edited[last].expected_amount = money::cents(Decimal::ZERO);
                edited[last].refresh_status();
                Ok(EditOutcome {
                    plan: edited,
                    warning: Some(EditWarning::OutOfBalance { excess }),
                })
            }
        };
    }

    edited[last].expected_amount = new_last;
    edited[last].refresh_status();
    debug!(index, %entered, %new_last, "installment edited");

    Ok(EditOutcome {
        plan: edited,
        warning: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{parse_currency, LocaleConfig};
    use crate::plan::{generate, plan_total, PlanInputs};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn m(s: &str) -> Money {
        Decimal::from_str(s).unwrap()
    }

    fn plan_of(total: &str, count: i64) -> Vec<Installment> {
        generate(
            &PlanInputs {
                total_value: m(total),
                down_payment: Decimal::ZERO,
                installments_number: count,
                issue_date: NaiveDate::from_ymd_opt(2026, 1, 10),
            },
            &[],
        )
    }

    fn amounts(plan: &[Installment]) -> Vec<Money> {
        plan.iter().map(|i| i.expected_amount).collect()
    }

    #[test]
    fn editing_an_earlier_installment_moves_the_difference_to_the_last() {
        let plan = plan_of("100.00", 3);
        let outcome = edit_installment_amount(&plan, 0, m("40.00"), OverflowPolicy::Reject).unwrap();

        assert_eq!(outcome.warning, None);
        assert_eq!(
            amounts(&outcome.plan),
            vec![m("40.00"), m("33.33"), m("26.67")]
        );
        assert_eq!(plan_total(&outcome.plan), m("100.00"));
    }

    #[test]
    fn last_installment_is_forced_back_outside_tolerance() {
        let plan = plan_of("100.00", 3);
        let outcome = edit_installment_amount(&plan, 2, m("50.00"), OverflowPolicy::Reject).unwrap();

        assert_eq!(
            outcome.warning,
            Some(EditWarning::LastInstallmentForced {
                entered: m("50.00"),
                forced: m("33.34"),
            })
        );
        assert_eq!(
            amounts(&outcome.plan),
            vec![m("33.33"), m("33.33"), m("33.34")]
        );
    }

    #[test]
    fn last_installment_within_a_cent_is_accepted() {
        let plan = plan_of("100.00", 3);
        let outcome = edit_installment_amount(&plan, 2, m("33.335"), OverflowPolicy::Reject).unwrap();
        assert_eq!(outcome.warning, None);
        assert_eq!(plan_total(&outcome.plan), m("100.00"));
    }

    #[test]
    fn overflow_is_rejected_by_default() {
        let plan = plan_of("100.00", 3);
        let outcome = edit_installment_amount(&plan, 0, m("90.00"), OverflowPolicy::Reject).unwrap();

        assert_eq!(
            outcome.warning,
            Some(EditWarning::OverflowRejected { excess: m("23.33") })
        );
        assert_eq!(outcome.plan, plan);
        assert!(outcome.is_balanced());
    }

    #[test]
    fn clamp_policy_reports_out_of_balance() {
        let plan = plan_of("100.00", 3);
        let outcome = edit_installment_amount(&plan, 0, m("90.00"), OverflowPolicy::Clamp).unwrap();

        assert_eq!(
            amounts(&outcome.plan),
            vec![m("90.00"), m("33.33"), m("0.00")]
        );
        assert_eq!(
            outcome.warning,
            Some(EditWarning::OutOfBalance { excess: m("23.33") })
        );
        assert!(!outcome.is_balanced());
    }

    #[test]
    fn edit_that_exactly_consumes_the_last_installment_is_balanced() {
        let plan = plan_of("100.00", 2);
        let outcome = edit_installment_amount(&plan, 0, m("100.00"), OverflowPolicy::Reject).unwrap();
        assert_eq!(amounts(&outcome.plan), vec![m("100.00"), m("0.00")]);
        assert_eq!(outcome.warning, None);
    }

    #[test]
    fn single_installment_plan_only_accepts_its_total() {
        let plan = plan_of("80.00", 1);
        let outcome = edit_installment_amount(&plan, 0, m("10.00"), OverflowPolicy::Reject).unwrap();
        assert!(matches!(
            outcome.warning,
            Some(EditWarning::LastInstallmentForced { .. })
        ));
        assert_eq!(amounts(&outcome.plan), vec![m("80.00")]);
    }

    #[test]
    fn invalid_edits_are_errors() {
        let plan = plan_of("100.00", 3);
        assert!(matches!(
            edit_installment_amount(&plan, 3, m("1"), OverflowPolicy::Reject),
            Err(LedgerError::InstallmentIndex { index: 3, len: 3 })
        ));
        assert!(matches!(
            edit_installment_amount(&plan, 0, m("-1"), OverflowPolicy::Reject),
            Err(LedgerError::NegativeAmount(_))
        ));
        assert!(edit_installment_amount(&[], 0, m("1"), OverflowPolicy::Reject).is_err());
    }

    #[test]
    fn amounts_beyond_the_decimal_range_are_errors() {
        let huge = parse_currency(
            "79.228.162.514.264.337.593.543.950.335",
            &LocaleConfig::default(),
        )
        .unwrap();
        let plan = plan_of("100.00", 3);

        for policy in [OverflowPolicy::Reject, OverflowPolicy::Clamp] {
            assert!(matches!(
                edit_installment_amount(&plan, 0, huge, policy),
                Err(LedgerError::InvalidAmount(_))
            ));
        }
        let last = edit_installment_amount(&plan, 2, huge, OverflowPolicy::Reject);
        assert!(!matches!(last, Ok(EditOutcome { warning: None, .. })));
    }
}
