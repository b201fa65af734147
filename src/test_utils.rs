//! Test utilities for Tabletalk
//!
//! This module provides common test helpers: temporary files, a small sample
//! data set, and assertion helpers.

use crate::config::{Config, IngestConfig};
use crate::store::{DataStoreHandle, TabularIngestor};
use std::path::PathBuf;
use tempfile::TempDir;

/// Three people with names and ages
pub const PEOPLE_CSV: &str = "name,age\nada,36\nalan,41\ngrace,85\n";

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Disposable store holding [`PEOPLE_CSV`] as `uploaded_data`
pub fn people_store() -> DataStoreHandle {
    TabularIngestor::new(&IngestConfig::default())
        .ingest_reader(PEOPLE_CSV.as_bytes(), "people.csv")
        .expect("Failed to ingest sample data")
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: crate::error::Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration with default values
pub fn test_config() -> Config {
    Config::default()
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
provider:
  type: openai
  openai:
    model: gpt-4o-mini
    api_base: http://localhost:8080/v1

agent:
  max_turns: 10
  timeout_seconds: 60
  history_window: 6
  tools:
    max_output_size: 4096
    max_query_rows: 20
    sample_rows: 2

ingest:
  table_name: rows
  delimiter: ";"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TabletalkError;

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.csv", "a\n1\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
    }

    #[tokio::test]
    async fn test_people_store() {
        let store = people_store();
        assert_eq!(store.database().row_count("uploaded_data").await.unwrap(), 3);
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: crate::error::Result<()> =
            Err(TabletalkError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    fn test_test_config_yaml() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.ingest.delimiter, ';');
        assert_eq!(config.agent.history_window, 6);
        assert!(test_config().validate().is_ok());
    }
}
