use super::{EntryId, Installment, LedgerEntry};
use crate::error::Result;

/// Persistence boundary for entries and their installment plans.
///
/// Implementations decide how records are stored; callers only rely on the
/// returned records carrying their assigned ids. Nothing here retries.
pub trait LedgerStore {
    /// Insert the entry when it has no id yet, otherwise replace the stored
    /// entry with the same id.
    fn upsert_entry(&mut self, entry: LedgerEntry) -> Result<LedgerEntry>;

    /// Replace the plan of `parent_id` with `installments`, assigning ids to
    /// installments that do not have one yet.
    fn save_installment_plan(
        &mut self,
        parent_id: EntryId,
        installments: &[Installment],
    ) -> Result<Vec<Installment>>;

    fn entry(&self, id: EntryId) -> Result<LedgerEntry>;
}
