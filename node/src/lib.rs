pub mod errors;
pub mod utils;
pub mod storage;
pub mod migrations;
pub mod node;

pub use errors::{NodeError, NodeResult};
pub use storage::{Storage, StorageTxn};
pub use migrations::{AppliedMigration, Migration, MIGRATIONS};
pub use node::{Node, NodeConfig};
