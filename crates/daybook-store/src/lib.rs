//! `daybook-store` is the single source of truth for ledger consistency.
//!
//! One [`LedgerSession`] owns the in-memory table, the edit cursor, and the
//! backing store handle. Every mutation goes through it: conform, mutate,
//! re-sort, renumber, flush — or roll back. The session is an explicit
//! context object owned by the caller; there is no ambient state.

mod session;

pub use session::{
    EditDraft, LedgerSession, MergeOutcome, OpenNotice, StoreError, SubmitKind, SubmitOutcome,
};
