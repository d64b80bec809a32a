use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::TestDataError;

/// Directory under each test directory that holds the persisted records.
pub const TEST_DATA_DIR: &str = ".test-data";

/// Record name conventionally used for Terraform options.
pub const TERRAFORM_OPTIONS_NAME: &str = "TerraformOptions";

/// Record name conventionally used for Packer options.
pub const PACKER_OPTIONS_NAME: &str = "PackerOptions";

/// Record name conventionally used for a built AMI ID.
pub const AMI_NAME: &str = "AMI";

/// Returns the path where the record `name` lives under `test_dir`.
pub fn test_data_path(test_dir: &Path, name: &str) -> PathBuf {
    test_dir.join(TEST_DATA_DIR).join(format!("{name}.json"))
}

/// Serializes and saves a value under `test_dir` so it can be reused by a
/// later stage. Overwriting is permitted; a warning is logged when the target
/// already holds a non-empty record.
pub fn save_test_data<T: Serialize>(
    test_dir: &Path,
    name: &str,
    value: &T,
) -> Result<(), TestDataError> {
    let path = test_data_path(test_dir, name);
    debug!(path = %path.display(), "storing test data so it can be reused later");

    if matches!(is_test_data_present(test_dir, name), Ok(true)) {
        warn!(
            "test data already exists for \"{}\" at {}; the save will overwrite it",
            name,
            path.display()
        );
    }

    let bytes = serde_json::to_vec(value)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TestDataError::io(parent, e))?;
    }
    fs::write(&path, bytes).map_err(|e| TestDataError::io(&path, e))?;
    Ok(())
}

/// Loads and deserializes a value stored by an earlier stage.
pub fn load_test_data<T: DeserializeOwned>(test_dir: &Path, name: &str) -> Result<T, TestDataError> {
    let path = test_data_path(test_dir, name);
    debug!(path = %path.display(), "loading test data");

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TestDataError::Missing { path });
        }
        Err(e) => return Err(TestDataError::io(&path, e)),
    };
    serde_json::from_slice(&bytes).map_err(|source| TestDataError::Corrupt { path, source })
}

/// Returns true if a record exists for `name` and its contents are not empty.
pub fn is_test_data_present(test_dir: &Path, name: &str) -> Result<bool, TestDataError> {
    let path = test_data_path(test_dir, name);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(TestDataError::io(&path, e)),
    };
    if bytes.is_empty() {
        return Ok(false);
    }
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|source| TestDataError::Corrupt { path, source })?;
    Ok(!is_empty_record(&value))
}

/// Removes the record for `name`. Does nothing if no record exists.
pub fn cleanup_test_data(test_dir: &Path, name: &str) -> Result<(), TestDataError> {
    let path = test_data_path(test_dir, name);
    match fs::remove_file(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "cleaned up test data");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "nothing to clean up");
            Ok(())
        }
        Err(e) => Err(TestDataError::io(&path, e)),
    }
}

/// Saves a uniquely named string value, e.g. an AMI ID under [`AMI_NAME`].
pub fn save_string(test_dir: &Path, name: &str, value: &str) -> Result<(), TestDataError> {
    save_test_data(test_dir, name, &value)
}

/// Loads a string value saved by an earlier stage.
pub fn load_string(test_dir: &Path, name: &str) -> Result<String, TestDataError> {
    load_test_data(test_dir, name)
}

/// A record is considered empty when it holds null, `false`, `0`, an empty
/// string, an empty list or an empty mapping.
fn is_empty_record(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
