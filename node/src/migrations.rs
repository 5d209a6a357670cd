//! Versioned schema migrations for the ledger store.
//!
//! The `meta` column family records the current schema version and one
//! [`AppliedMigration`] per step. Each pending migration runs in its own
//! RocksDB transaction together with the version bump, so a failed step
//! leaves the previous version in place.

use rocksdb::{Transaction, TransactionDB};
use serde::{Serialize, Deserialize};
use tracing::{info, error};

use crate::errors::{NodeError, NodeResult};
use crate::storage::{Storage, CF_BALANCES, CF_HOLDINGS, CF_META};
use crate::utils::current_timestamp;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const LAYOUT_KEY: &[u8] = b"layout";

pub type MigrationFn = fn(&Storage, &Transaction<'_, TransactionDB>) -> NodeResult<()>;

/// One step in the schema history
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub apply: MigrationFn,
}

/// History record written when a migration commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
    pub applied_at: u64,
}

/// Describes how ledger records are laid out on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLayout {
    pub balances: String,
    pub holdings: String,
    pub amount_encoding: String,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_ledger_layout",
        apply: create_ledger_layout,
    },
];

fn create_ledger_layout(storage: &Storage, txn: &Transaction<'_, TransactionDB>) -> NodeResult<()> {
    let layout = LedgerLayout {
        balances: CF_BALANCES.to_string(),
        holdings: CF_HOLDINGS.to_string(),
        amount_encoding: "i64-le".to_string(),
    };
    txn.put_cf(storage.column(CF_META)?, LAYOUT_KEY, bincode::serialize(&layout)?)?;
    Ok(())
}

/// Bring the store up to the latest known schema version
pub fn run_pending(storage: &Storage) -> NodeResult<u32> {
    apply(storage, MIGRATIONS)
}

/// Apply every migration in `migrations` newer than the stored version.
///
/// `migrations` must be sorted by strictly increasing version.
pub fn apply(storage: &Storage, migrations: &[Migration]) -> NodeResult<u32> {
    if migrations.windows(2).any(|pair| pair[0].version >= pair[1].version) {
        return Err(NodeError::Migration("Migrations are not in increasing version order".to_string()));
    }

    let current = schema_version(storage)?;
    let latest = migrations.last().map(|m| m.version).unwrap_or(0);

    if current > latest {
        return Err(NodeError::Migration(format!(
            "Database schema version {} is newer than supported version {}",
            current, latest
        )));
    }

    if current == latest {
        info!("Schema up to date at version {}", current);
        return Ok(current);
    }

    let meta = storage.column(CF_META)?;

    for migration in migrations.iter().filter(|m| m.version > current) {
        let txn = storage.db().transaction();

        if let Err(e) = (migration.apply)(storage, &txn) {
            error!("Migration {} ({}) failed: {}", migration.version, migration.name, e);
            return Err(NodeError::Migration(format!(
                "Migration {} ({}) failed: {}",
                migration.version, migration.name, e
            )));
        }

        let record = AppliedMigration {
            version: migration.version,
            name: migration.name.to_string(),
            applied_at: current_timestamp(),
        };
        txn.put_cf(meta, migration_key(migration.version), bincode::serialize(&record)?)?;
        txn.put_cf(meta, SCHEMA_VERSION_KEY, migration.version.to_le_bytes())?;
        txn.commit()?;

        info!("Applied migration {} ({})", migration.version, migration.name);
    }

    info!("Finished migrations at schema version {}", latest);
    Ok(latest)
}

/// Stored schema version, `0` for a fresh store
pub fn schema_version(storage: &Storage) -> NodeResult<u32> {
    let meta = storage.column(CF_META)?;
    match storage.db().get_cf(meta, SCHEMA_VERSION_KEY)? {
        None => Ok(0),
        Some(bytes) => {
            let raw: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                NodeError::Migration(format!("Unreadable schema version record ({} bytes)", bytes.len()))
            })?;
            Ok(u32::from_le_bytes(raw))
        }
    }
}

/// History records for the given migrations, in version order
pub fn applied_migrations(storage: &Storage, migrations: &[Migration]) -> NodeResult<Vec<AppliedMigration>> {
    let meta = storage.column(CF_META)?;
    let mut applied = Vec::new();

    for migration in migrations {
        if let Some(bytes) = storage.db().get_cf(meta, migration_key(migration.version))? {
            applied.push(bincode::deserialize(&bytes)?);
        }
    }

    Ok(applied)
}

fn migration_key(version: u32) -> Vec<u8> {
    format!("migration:{:08}", version).into_bytes()
}
