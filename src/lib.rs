//! Installment plans and payment reconciliation for collection contracts.

pub mod config;
pub mod error;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod plan;

pub use config::{Account, Client, Company, Config, State};
pub use error::{LedgerError, Result};
pub use ledger::{EntryKind, Installment, LedgerEntry, LedgerStore, PaymentStatus};
pub use money::{format_currency, parse_currency, LocaleConfig, Money};
pub use payment::{PaymentEntry, PaymentGateway, PaymentMethod, PaymentReconciler};
pub use plan::{compute_balance, edit_installment_amount, generate, OverflowPolicy, PlanInputs};

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT_TRACING: Once = Once::new();

/// Install the global tracing subscriber. Reads the filter from
/// `INSTALLMENTS_LOG` and defaults to warnings only; logs go to stderr.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env("INSTALLMENTS_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
