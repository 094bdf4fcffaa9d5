use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version number of a migration, stored in a PostgreSQL `INTEGER` column.
pub type Version = i32;

pub(crate) const DEFAULT_VERSION_TABLE_NAME: &str = "_migratio_version_";

/// One applied migration, as persisted in the tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Caller-assigned version. Strictly increasing and unique per tracking table.
    pub version: Version,
    /// The SQL that reverses this migration. Stored verbatim, never parsed.
    pub down_sql: String,
}

impl MigrationRecord {
    pub fn new(version: Version, down_sql: impl Into<String>) -> Self {
        Self {
            version,
            down_sql: down_sql.into(),
        }
    }
}

/// The storage operations of [Database], used to label errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetMaxMigrationVersion,
    GetMigration,
    AddMigration,
    DeleteMigration,
    ExecuteSql,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetMaxMigrationVersion => "get_max_migration_version",
            Self::GetMigration => "get_migration",
            Self::AddMigration => "add_migration",
            Self::DeleteMigration => "delete_migration",
            Self::ExecuteSql => "execute_sql",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The synchronous storage contract a migration engine drives.
///
/// Every method blocks until the database round trip has finished, and calls made one after
/// another complete in the order they were issued. Implementations do not open or commit
/// transactions; a caller that needs a migration's SQL and its bookkeeping to be atomic must
/// provide the transaction itself.
pub trait Database {
    /// Returns the highest applied version, or `None` when nothing has been applied yet.
    ///
    /// A tracking table that does not exist yet and one that is empty both yield `None`.
    fn get_max_migration_version(&self) -> Result<Option<Version>, Error>;

    /// Fetch the record for `version`.
    ///
    /// The caller must only ask for versions it knows were applied. A missing row is reported as
    /// [Error::RecordNotFound].
    fn get_migration(&self, version: Version) -> Result<MigrationRecord, Error>;

    /// Persist `migration` as applied.
    ///
    /// Fails with [Error::TableMissing] when the tracking table has not been created and with
    /// [Error::ConstraintViolation] when the version is already recorded.
    fn add_migration(&self, migration: &MigrationRecord) -> Result<(), Error>;

    /// Remove the record for `version`. Removing a version that is not recorded is not an error.
    fn delete_migration(&self, version: Version) -> Result<(), Error>;

    /// Run a migration script (one or more statements) directly on the connection.
    fn execute_sql(&self, sql: &str) -> Result<(), Error>;
}
