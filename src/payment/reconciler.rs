use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{PaymentEntry, PaymentGateway, PaymentId, PaymentRequest, SubmitGuard};
use crate::error::{LedgerError, Result};
use crate::ledger::{EntryId, PaymentStatus};
use crate::money::{self, Money, TOLERANCE};

/// Paid and outstanding figures for one payable record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    pub expected: Money,
    pub paid: Money,
    pub remaining: Money,
    pub status: PaymentStatus,
}

impl Balance {
    pub fn from_payments(expected: Money, payments: &[PaymentEntry]) -> Self {
        let paid = money::sum(payments.iter().map(|p| p.amount));
        Self {
            expected,
            paid,
            remaining: expected - paid,
            status: PaymentStatus::from_amounts(expected, paid),
        }
    }
}

/// Validates payment submissions against the expected amount of their
/// parent record and forwards them to the payment service.
///
/// Balances are always recomputed from the service after a confirmed write,
/// so a failed call never advances what is shown to the user.
pub struct PaymentReconciler<'a, G> {
    gateway: &'a mut G,
    guard: SubmitGuard,
}

impl<'a, G: PaymentGateway> PaymentReconciler<'a, G> {
    pub fn new(gateway: &'a mut G) -> Self {
        Self::with_guard(gateway, SubmitGuard::new())
    }

    /// Share the in-flight flag with whatever owns the submit control.
    pub fn with_guard(gateway: &'a mut G, guard: SubmitGuard) -> Self {
        Self { gateway, guard }
    }

    pub fn balance(&self, parent: EntryId) -> Result<Balance> {
        let expected = self.gateway.expected_amount_of(parent)?;
        let payments = self.gateway.payments_for(parent)?;
        Ok(Balance::from_payments(expected, &payments))
    }

    /// Record a (possibly partial) payment. The amount must be positive,
    /// a settlement account must be named, and the payment may not take the
    /// parent past its expected amount.
    pub fn register_payment(&mut self, request: &PaymentRequest) -> Result<Balance> {
        let amount = money::cents(request.amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidPaymentAmount);
        }
        if request.account.trim().is_empty() {
            return Err(LedgerError::MissingAccount);
        }

        let _token = self.guard.try_acquire()?;
        let parent = request.parent_entry_id;
        let current = self.balance(parent)?;
        if amount > money::checked_add(current.remaining, TOLERANCE)? {
            return Err(LedgerError::OverPayment {
                parent,
                max: current.remaining.max(Decimal::ZERO),
            });
        }

        let request = PaymentRequest {
            amount,
            ..request.clone()
        };
        let receipt = self.gateway.register_payment(&request).map_err(|e| {
            info!(parent, error = %e, "payment registration failed");
            e
        })?;
        if !receipt.success {
            info!(parent, message = %receipt.message, "payment service refused registration");
            return Err(LedgerError::Gateway(receipt.message));
        }

        let balance = self.balance(parent)?;
        if let Some(reported) = receipt.balance_after {
            if reported != balance.remaining {
                warn!(parent, %reported, computed = %balance.remaining, "balance mismatch after payment");
            }
        }
        info!(parent, %amount, remaining = %balance.remaining, "payment registered");
        Ok(balance)
    }

    /// Change the amount and date of a recorded payment. Refused before any
    /// write when the parent's payments would exceed its expected amount.
    pub fn edit_payment(
        &mut self,
        id: PaymentId,
        new_amount: Money,
        new_date: NaiveDate,
    ) -> Result<Balance> {
        let amount = money::cents(new_amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidPaymentAmount);
        }

        let _token = self.guard.try_acquire()?;
        let payment = self.gateway.payment(id)?;
        let parent = payment.parent_entry_id;
        let expected = self.gateway.expected_amount_of(parent)?;
        let others = money::sum(
            self.gateway
                .payments_for(parent)?
                .iter()
                .filter(|p| p.id != id)
                .map(|p| p.amount),
        );
        let after = money::checked_add(amount, others)?;
        if after > money::checked_add(expected, TOLERANCE)? {
            return Err(LedgerError::OverPayment {
                parent,
                max: (expected - others).max(Decimal::ZERO),
            });
        }

        self.gateway.update_payment(id, amount, new_date)?;
        let balance = self.balance(parent)?;
        info!(id, parent, %amount, remaining = %balance.remaining, "payment edited");
        Ok(balance)
    }

    pub fn delete_payment(&mut self, id: PaymentId) -> Result<Balance> {
        let _token = self.guard.try_acquire()?;
        let removed = self.gateway.delete_payment(id)?;
        let balance = self.balance(removed.parent_entry_id)?;
        info!(
            id,
            parent = removed.parent_entry_id,
            amount = %removed.amount,
            "payment deleted"
        );
        Ok(balance)
    }
}
