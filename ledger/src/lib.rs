pub mod account;
pub mod errors;
pub mod store;
pub mod memory;
pub mod validation;
pub mod executor;

pub use account::{Account, Receipt, UserId};
pub use errors::{LedgerError, LedgerResult};
pub use store::{LedgerStore, LedgerTxn};
pub use memory::{MemoryLedger, MemoryTxn};
pub use validation::{RequestValidator, PurchaseRequest, ValidatedPurchase, MAX_PAYLOAD_SIZE};
pub use executor::LedgerExecutor;
