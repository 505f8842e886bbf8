mod edit;
mod planner;

pub use edit::{edit_installment_amount, EditOutcome, EditWarning, OverflowPolicy};
pub use planner::{
    compute_balance, generate, is_balanced, plan_total, PlanInputs, MAX_INSTALLMENTS,
};
