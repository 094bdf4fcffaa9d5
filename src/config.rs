//! Configuration for [MigrationStore](crate::MigrationStore).
//!
//! The tracking table name is spliced into SQL text, so a name that comes from configuration is
//! checked here before it reaches a store.

use crate::core::DEFAULT_VERSION_TABLE_NAME;
use crate::error::Error;
use serde::Deserialize;

/// PostgreSQL truncates identifiers longer than this (NAMEDATALEN - 1).
const MAX_IDENTIFIER_LEN: usize = 63;

/// Store settings, typically deserialized from the application's configuration file.
///
/// ```
/// use migratio_tokio_postgres::StoreConfig;
///
/// let config = StoreConfig::default().with_table_name("ops.schema_migrations");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the tracking table, optionally schema-qualified.
    /// Defaults to "_migratio_version_".
    pub table_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_VERSION_TABLE_NAME.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Check that `table_name` is an unquoted identifier or `schema.identifier`.
    pub fn validate(&self) -> Result<(), Error> {
        validate_table_name(&self.table_name)
    }
}

fn validate_table_name(name: &str) -> Result<(), Error> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_identifier(part)) {
        return Err(Error::InvalidTableName(name.to_string()));
    }
    Ok(())
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    let starts_well = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    starts_well
        && part.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_uses_migratio_table() {
        let config = StoreConfig::default();
        assert_eq!(config.table_name, "_migratio_version_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn accepts_plain_and_schema_qualified_names() {
        for name in ["schema_migrations", "ops.schema_migrations", "_t1", "a$b", "Migrations"] {
            assert!(
                StoreConfig::default().with_table_name(name).validate().is_ok(),
                "{} should be accepted",
                name
            );
        }
    }

    #[test]
    fn rejects_names_that_are_not_identifiers() {
        let too_long = "t".repeat(64);
        for name in [
            "",
            "1migrations",
            "a.b.c",
            "ops.",
            "migrations; DROP TABLE users",
            "\"quoted\"",
            "white space",
            "naïve",
            too_long.as_str(),
        ] {
            let err = StoreConfig::default()
                .with_table_name(name)
                .validate()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTableName, "{:?}", name);
        }
    }

    #[test]
    fn deserializes_with_default_table_name() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());

        let config: StoreConfig =
            serde_json::from_str(r#"{ "table_name": "schema_migrations" }"#).unwrap();
        assert_eq!(config.table_name, "schema_migrations");
    }
}
