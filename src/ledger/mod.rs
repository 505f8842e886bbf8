mod entry;
mod ops;
mod store;

pub use entry::{EntryId, EntryKind, Installment, LedgerEntry, PaymentStatus};
pub use ops::{create_entry, edit_plan_amount, update_entry_terms, EntryDraft, TermsChange};
pub use store::LedgerStore;
