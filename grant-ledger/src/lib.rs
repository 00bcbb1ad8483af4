//! Grant Ledger
//!
//! Fund-flow accounting for grant programs over a key-value store.
//!
//! # Architecture
//!
//! - **Actors**: grantors, grantees, sub-grantees and suppliers with six balances
//! - **Spends**: expenditures settled against a grantee's award, auto-approved
//!   at or below the approval threshold
//! - **Releases**: a grantor funds pending expenditures, producing reimbursements
//! - **Atomic operations**: every mutation stages its writes and commits them
//!   as one batch under a single writer
//!
//! # Invariants
//!
//! - `spent <= awarded` and `reimbursed <= committed` from creation on
//! - Every indexed id resolves to a stored record
//! - Index lists are append-only except for explicit deletes and `init`

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod storage;
pub mod transaction;
pub mod index;
pub mod clock;
pub mod actors;
pub mod expenditures;
pub mod reimbursements;
pub mod settlement;
pub mod release;
pub mod query;
pub mod operation;
pub mod ledger;
pub mod writer;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use metrics::Metrics;
pub use operation::{Operation, Response};
pub use types::{
    Actor, ActorId, Balances, Expenditure, ExpenditureId, ExpenditureStatus, Reimbursement,
    ReimbursementId, TransactionKind,
};
pub use writer::{spawn_ledger_writer, LedgerHandle};
