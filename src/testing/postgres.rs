//! Testing utilities for PostgreSQL migration stores.
//!
//! This module provides a test harness for code built on [MigrationStore]: [StoreTestHarness]

use crate::bridge::{SyncBridge, TokioBridge};
use crate::core::{MigrationRecord, Version, DEFAULT_VERSION_TABLE_NAME};
use crate::postgres::MigrationStore;
use crate::Error;
use std::future::Future;
use tokio_postgres::types::FromSqlOwned;
use tokio_postgres::Client;

/// The statement that creates a tracking table with the layout [MigrationStore] expects.
pub fn tracking_table_ddl(table_name: &str) -> String {
    format!(
        "CREATE TABLE {} (version INTEGER PRIMARY KEY NOT NULL, down_sql TEXT NOT NULL)",
        table_name
    )
}

/// A test harness owning a connection and the bridge that drives it, with state control and
/// assertion helpers around one tracking table.
///
/// # Example
///
/// ```ignore
/// use migratio_tokio_postgres::testing::postgres::StoreTestHarness;
/// use migratio_tokio_postgres::{Database, Error, MigrationRecord};
///
/// #[test]
/// fn test() -> Result<(), Error> {
///     let (bridge, client) = connect_test_db(); // however you want to connect to a postgres database in your tests
///     let harness = StoreTestHarness::new(bridge, client).with_table_name("schema_migrations");
///
///     harness.create_tracking_table()?;
///     harness.store().add_migration(&MigrationRecord::new(1, "DROP TABLE users"))?;
///
///     harness.assert_applied(&[1])?;
///     Ok(())
/// }
/// ```
pub struct StoreTestHarness {
    // Dropped before the bridge, whose runtime hosts the connection task
    client: Client,
    bridge: TokioBridge,
    table_name: String,
}

impl StoreTestHarness {
    /// Create a new test harness tracking migrations in the default "_migratio_version_" table.
    ///
    /// The client's connection task must have been spawned on `bridge`.
    pub fn new(bridge: TokioBridge, client: Client) -> Self {
        Self {
            client,
            bridge,
            table_name: DEFAULT_VERSION_TABLE_NAME.to_string(),
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// A store over the harness connection and tracking table.
    pub fn store(&self) -> MigrationStore<'_, Client, &TokioBridge> {
        MigrationStore::new(&self.bridge, self.table_name.as_str(), &self.client)
    }

    pub fn create_tracking_table(&self) -> Result<(), Error> {
        self.execute(&tracking_table_ddl(&self.table_name))
    }

    pub fn drop_tracking_table(&self) -> Result<(), Error> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", self.table_name))
    }

    /// Execute SQL (for setting up test data).
    pub fn execute(&self, sql: &str) -> Result<(), Error> {
        self.run(self.client.batch_execute(sql))
    }

    /// Query a single value from the database.
    pub fn query_one<T: FromSqlOwned>(&self, sql: &str) -> Result<T, Error> {
        let row = self.run(self.client.query_one(sql, &[]))?;
        Ok(row.get(0))
    }

    /// Query all values from a single-column result.
    pub fn query_all<T: FromSqlOwned>(&self, sql: &str) -> Result<Vec<T>, Error> {
        let rows = self.run(self.client.query(sql, &[]))?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    /// Every record in the tracking table, ordered by version.
    pub fn tracking_rows(&self) -> Result<Vec<MigrationRecord>, Error> {
        let sql = format!(
            "SELECT version, down_sql FROM {} ORDER BY version",
            self.table_name
        );
        let rows = self.run(self.client.query(sql.as_str(), &[]))?;
        Ok(rows
            .iter()
            .map(|row| MigrationRecord {
                version: row.get("version"),
                down_sql: row.get("down_sql"),
            })
            .collect())
    }

    /// Assert that exactly `versions` are recorded in the tracking table.
    pub fn assert_applied(&self, versions: &[Version]) -> Result<(), Error> {
        let applied: Vec<Version> = self
            .tracking_rows()?
            .into_iter()
            .map(|record| record.version)
            .collect();
        let mut expected = versions.to_vec();
        expected.sort();

        if applied != expected {
            return Err(Error::Generic(format!(
                "Expected applied versions {:?} in '{}', found {:?}",
                expected, self.table_name, applied
            )));
        }
        Ok(())
    }

    /// Assert that a table exists in the database.
    pub fn assert_table_exists(&self, table_name: &str) -> Result<(), Error> {
        if !self.table_exists(table_name)? {
            return Err(Error::Generic(format!(
                "Table '{}' does not exist",
                table_name
            )));
        }
        Ok(())
    }

    /// Assert that a table does not exist in the database.
    pub fn assert_table_not_exists(&self, table_name: &str) -> Result<(), Error> {
        if self.table_exists(table_name)? {
            return Err(Error::Generic(format!(
                "Table '{}' exists but should not",
                table_name
            )));
        }
        Ok(())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn bridge(&self) -> &TokioBridge {
        &self.bridge
    }

    fn table_exists(&self, table_name: &str) -> Result<bool, Error> {
        let row = self.run(
            self.client
                .query_one("SELECT to_regclass($1) IS NOT NULL", &[&table_name]),
        )?;
        Ok(row.get(0))
    }

    fn run<T, F>(&self, work: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, tokio_postgres::Error>>,
    {
        self.bridge
            .block_on(work)?
            .map_err(|source| {
                Error::Generic(format!(
                    "Test harness query on {} failed: {}",
                    self.table_name, source
                ))
            })
    }
}
