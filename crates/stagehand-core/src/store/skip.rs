use std::env;

use tracing::info;

/// Prefix of the environment variables that gate stage execution.
pub const SKIP_STAGE_ENV_VAR_PREFIX: &str = "SKIP_";

/// Executes the given test stage (e.g. setup, validation, teardown) unless an
/// environment variable named `SKIP_<stage_name>` is set to a non-empty value.
pub fn run_test_stage<F: FnOnce()>(stage_name: &str, stage: F) {
    let env_var_name = format!("{SKIP_STAGE_ENV_VAR_PREFIX}{stage_name}");
    match env::var(&env_var_name) {
        Ok(value) if !value.is_empty() => {
            info!(
                "The '{}' environment variable is set, so skipping stage '{}'.",
                env_var_name, stage_name
            );
        }
        _ => {
            info!(
                "The '{}' environment variable is not set, so executing stage '{}'.",
                env_var_name, stage_name
            );
            stage();
        }
    }
}

/// Returns true if any environment variable instructs us to skip a test
/// stage. This doubles as a signal that a developer is iterating locally
/// rather than running in CI.
pub fn skip_stage_env_var_set() -> bool {
    env::vars_os().any(|(name, _)| {
        name.to_string_lossy()
            .starts_with(SKIP_STAGE_ENV_VAR_PREFIX)
    })
}
