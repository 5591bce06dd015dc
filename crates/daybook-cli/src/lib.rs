//! Command-line surface for Daybook ledgers.
//!
//! The CLI is a thin session driver: every subcommand opens a
//! [`daybook_store::LedgerSession`] over the ledger file, runs one
//! operation, and exits. Positions printed by `list` are only valid until
//! the next mutating command.

pub mod cli;
