use crate::core::{Operation, Version};
use tokio_postgres::error::SqlState;

/// Error type for the migratio-tokio-postgres crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The tracking table does not exist.
    /// Only `get_max_migration_version` recovers from this; everywhere else it is returned as-is.
    #[error("{operation}: tracking table {table} does not exist")]
    TableMissing {
        operation: Operation,
        table: String,
        #[source]
        source: tokio_postgres::Error,
    },
    /// `get_migration` was asked for a version that has no row.
    #[error("{operation}: no migration with version {version} in {table}")]
    RecordNotFound {
        operation: Operation,
        table: String,
        version: Version,
    },
    /// The backend rejected a write with an integrity constraint (SQLSTATE class 23).
    #[error("{operation}: constraint violation on {table}{}: {source}", at_version(.version))]
    ConstraintViolation {
        operation: Operation,
        table: String,
        version: Option<Version>,
        #[source]
        source: tokio_postgres::Error,
    },
    /// Any other failure reported by the driver: connectivity, syntax, decoding.
    #[error("{operation}: database error on {table}{}: {source}", at_version(.version))]
    Backend {
        operation: Operation,
        table: String,
        version: Option<Version>,
        #[source]
        source: tokio_postgres::Error,
    },
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("invalid tracking table name {0:?}")]
    InvalidTableName(String),
    #[error("{0}")]
    Generic(String),
}

/// Fieldless discriminant of [Error], for matching on the failure kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TableMissing,
    RecordNotFound,
    ConstraintViolation,
    Backend,
    Runtime,
    InvalidTableName,
    Generic,
}

fn at_version(version: &Option<Version>) -> String {
    match version {
        Some(version) => format!(" (version {})", version),
        None => String::new(),
    }
}

impl Error {
    /// Classify a driver error raised while running `operation` against `table`.
    pub(crate) fn from_backend(
        operation: Operation,
        table: &str,
        version: Option<Version>,
        source: tokio_postgres::Error,
    ) -> Self {
        let table = table.to_string();
        match source.code() {
            // Raw SQL is not about the tracking table, so a missing relation there is a plain backend failure
            Some(code) if *code == SqlState::UNDEFINED_TABLE && operation != Operation::ExecuteSql => {
                Self::TableMissing {
                    operation,
                    table,
                    source,
                }
            }
            Some(code) if code.code().starts_with("23") => Self::ConstraintViolation {
                operation,
                table,
                version,
                source,
            },
            _ => Self::Backend {
                operation,
                table,
                version,
                source,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TableMissing { .. } => ErrorKind::TableMissing,
            Self::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            Self::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::Runtime(_) => ErrorKind::Runtime,
            Self::InvalidTableName(_) => ErrorKind::InvalidTableName,
            Self::Generic(_) => ErrorKind::Generic,
        }
    }

    /// The store operation that failed, if the error came from one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::TableMissing { operation, .. }
            | Self::RecordNotFound { operation, .. }
            | Self::ConstraintViolation { operation, .. }
            | Self::Backend { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// The migration version involved, where the operation had one.
    pub fn version(&self) -> Option<Version> {
        match self {
            Self::RecordNotFound { version, .. } => Some(*version),
            Self::ConstraintViolation { version, .. } | Self::Backend { version, .. } => *version,
            _ => None,
        }
    }

    /// The SQLSTATE reported by the backend, if any.
    pub fn sql_state(&self) -> Option<&SqlState> {
        match self {
            Self::TableMissing { source, .. }
            | Self::ConstraintViolation { source, .. }
            | Self::Backend { source, .. } => source.code(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_message_names_operation_table_and_version() {
        let err = Error::RecordNotFound {
            operation: Operation::GetMigration,
            table: "schema_migrations".to_string(),
            version: 7,
        };
        assert_eq!(
            err.to_string(),
            "get_migration: no migration with version 7 in schema_migrations"
        );
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
        assert_eq!(err.operation(), Some(Operation::GetMigration));
        assert_eq!(err.version(), Some(7));
        assert!(err.sql_state().is_none());
    }

    #[test]
    fn runtime_errors_carry_no_operation() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "no threads"));
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.operation(), None);
        assert_eq!(err.version(), None);
        assert_eq!(err.to_string(), "failed to start async runtime: no threads");
    }

    #[test]
    fn at_version_formats_optional_version() {
        assert_eq!(at_version(&Some(3)), " (version 3)");
        assert_eq!(at_version(&None), "");
    }
}
