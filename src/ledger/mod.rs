// Ledger module - WHO HOLDS WHAT
// Token ledger interface, the checkpoint journal, and an in-memory implementation

mod memory;
mod token;

pub use memory::{InMemoryLedger, LedgerStats};
pub use token::{atomically, LedgerError, TokenLedger};
