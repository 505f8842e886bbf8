use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LedgerError, Result};

/// Keeps a submit action from being triggered again while a previous
/// request has not settled. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct SubmitGuard {
    in_flight: Arc<AtomicBool>,
}

/// Held for the duration of one submission; releases the guard on drop.
#[derive(Debug)]
pub struct SubmitToken {
    in_flight: Arc<AtomicBool>,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<SubmitToken> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LedgerError::SubmissionInFlight)?;
        Ok(SubmitToken {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for SubmitToken {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_submission_is_refused_until_the_first_settles() {
        let guard = SubmitGuard::new();
        let token = guard.try_acquire().unwrap();
        assert!(guard.is_in_flight());
        assert!(matches!(
            guard.clone().try_acquire(),
            Err(LedgerError::SubmissionInFlight)
        ));

        drop(token);
        assert!(!guard.is_in_flight());
        assert!(guard.try_acquire().is_ok());
    }
}
