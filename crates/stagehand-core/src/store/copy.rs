use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::error::TestDataError;
use super::skip::skip_stage_env_var_set;

/// Copies `root_dir` to a fresh temp directory and returns the path to
/// `examples_subdir` inside the copy. Running multiple tests in parallel
/// against the same template tree would otherwise have them overwrite each
/// other's working directories and state files, so each test gets its own
/// copy. The whole root is copied, not just the examples directory, so that
/// relative references between templates keep working.
///
/// When any `SKIP_<stage>` environment variable is set we assume a developer
/// is iterating locally and wants artifacts cached between stages, so the
/// copy is bypassed and the original path is returned instead.
pub fn copy_folder_to_temp(
    root_dir: &Path,
    examples_subdir: &str,
    test_name: &str,
) -> Result<PathBuf, TestDataError> {
    if skip_stage_env_var_set() {
        info!(
            "a SKIP_XXX environment variable is set; using the original examples folder \
             rather than a temp folder so data is cached between stages"
        );
        return Ok(root_dir.join(examples_subdir));
    }

    // Qualified sub-test names contain slashes, which cannot appear in a
    // directory name.
    let prefix = test_name.replace(['/', '\\'], "-");
    let temp_root = tempfile::Builder::new()
        .prefix(&prefix)
        .tempdir()
        .map_err(|e| TestDataError::io(std::env::temp_dir(), e))?
        .into_path();

    copy_tree(root_dir, &temp_root)?;
    Ok(temp_root.join(examples_subdir))
}

/// Recursive copy, leaving behind local working state (`.terraform`
/// directories and `terraform.tfstate*` files) that must not leak between
/// test runs.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), TestDataError> {
    fs::create_dir_all(dst).map_err(|e| TestDataError::io(dst, e))?;
    let entries = fs::read_dir(src).map_err(|e| TestDataError::io(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| TestDataError::io(src, e))?;
        let path = entry.path();
        let name = entry.file_name();
        let target = dst.join(&name);
        let name = name.to_string_lossy();

        if path.is_dir() {
            if name == ".terraform" {
                continue;
            }
            copy_tree(&path, &target)?;
        } else {
            if name.starts_with("terraform.tfstate") {
                continue;
            }
            fs::copy(&path, &target).map_err(|e| TestDataError::io(&path, e))?;
        }
    }
    Ok(())
}
