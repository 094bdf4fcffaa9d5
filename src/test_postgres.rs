#![allow(dead_code)]

//! PostgreSQL test infrastructure module.
//!
//! This module provides shared infrastructure for PostgreSQL integration tests,
//! including testcontainer management and database setup utilities.

use std::sync::OnceLock;

use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::types::FromSqlOwned;
use tokio_postgres::{Client, NoTls};
use uuid::Uuid;

use crate::bridge::{SyncBridge, TokioBridge};
use crate::postgres::MigrationStore;

/// Default credentials for testcontainers-modules postgres
const PG_USER: &str = "postgres";
const PG_PASSWORD: &str = "postgres";
const PG_DB: &str = "postgres";

/// The shared container's port, plus the runtime that keeps the container alive
struct SharedPostgres {
    port: u16,
    _runtime: tokio::runtime::Runtime,
}

static POSTGRES: OnceLock<SharedPostgres> = OnceLock::new();

/// Start the shared PostgreSQL container on first use and return its mapped port.
fn get_postgres_port() -> u16 {
    POSTGRES
        .get_or_init(|| {
            // Dedicated runtime for container management
            let runtime = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

            let port = runtime.block_on(async {
                let container = Postgres::default()
                    .start()
                    .await
                    .expect("failed to start postgres container");

                let port = container
                    .get_host_port_ipv4(5432)
                    .await
                    .expect("failed to get postgres port");

                // Leak the container to keep it alive for the test duration
                std::mem::forget(container);

                port
            });

            SharedPostgres {
                port,
                _runtime: runtime,
            }
        })
        .port
}

/// Get a PostgreSQL connection URL for a specific database.
fn url_with_db(db: &str) -> String {
    let port = get_postgres_port();
    format!(
        "postgres://{}:{}@127.0.0.1:{}/{}",
        PG_USER, PG_PASSWORD, port, db
    )
}

/// Connect through `bridge`, running the connection task on the bridge's runtime.
fn connect(bridge: &TokioBridge, url: &str) -> Client {
    let (client, connection) = bridge
        .block_on(tokio_postgres::connect(url, NoTls))
        .expect("bridge refused to connect")
        .expect("failed to connect to postgres");
    bridge.spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("postgres connection error: {}", e);
        }
    });
    client
}

/// A client connected to a fresh database, and the bridge that drives it.
///
/// Field order matters: the client is dropped before the runtime its connection task lives on.
pub struct TestConnection {
    pub client: Client,
    pub bridge: TokioBridge,
    pub db_name: String,
}

impl TestConnection {
    pub fn store(&self, table_name: &str) -> MigrationStore<'_, Client, &TokioBridge> {
        MigrationStore::new(&self.bridge, table_name, &self.client)
    }

    pub fn execute(&self, sql: &str) {
        self.bridge
            .block_on(self.client.batch_execute(sql))
            .unwrap()
            .expect("failed to execute test sql");
    }

    pub fn create_tracking_table(&self, table_name: &str) {
        self.execute(&format!(
            "CREATE TABLE {} (version INTEGER PRIMARY KEY NOT NULL, down_sql TEXT NOT NULL)",
            table_name
        ));
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        self.query_one_with(
            "SELECT to_regclass($1) IS NOT NULL",
            &[&table_name],
        )
    }

    pub fn query_one<T: FromSqlOwned>(&self, sql: &str) -> T {
        self.query_one_with(sql, &[])
    }

    fn query_one_with<T: FromSqlOwned>(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> T {
        self.bridge
            .block_on(self.client.query_one(sql, params))
            .unwrap()
            .expect("failed to run test query")
            .get(0)
    }
}

/// Create a fresh PostgreSQL database with a unique name for isolated testing.
///
/// Each test should call this to get an isolated database instance.
pub fn get_test_connection() -> TestConnection {
    let bridge = TokioBridge::new().expect("failed to create bridge");

    // Connect to default DB as admin
    let admin = connect(&bridge, &url_with_db(PG_DB));

    // Create a DB with unique name (PostgreSQL identifiers are case-insensitive, so lowercase is fine)
    let db_name = format!("test_{}", Uuid::new_v4().simple());

    bridge
        .block_on(admin.batch_execute(&format!("CREATE DATABASE \"{}\"", db_name)))
        .unwrap()
        .expect("failed to create test database");

    // Close admin connection before creating new one
    drop(admin);

    let client = connect(&bridge, &url_with_db(&db_name));
    TestConnection {
        client,
        bridge,
        db_name,
    }
}
