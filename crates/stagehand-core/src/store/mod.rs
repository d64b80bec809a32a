//! Test-data store and stage-skip protocol.
//!
//! Stages persist typed values under `<test-dir>/.test-data/<name>.json` so
//! that a setup stage can stash connection options for a later validation or
//! teardown stage, across separate runs of the test binary. The store has no
//! cross-process locking; callers namespace by test directory.

mod copy;
mod data;
mod error;
mod skip;

pub use copy::copy_folder_to_temp;
pub use data::{
    cleanup_test_data, is_test_data_present, load_string, load_test_data, save_string,
    save_test_data, test_data_path, AMI_NAME, PACKER_OPTIONS_NAME, TERRAFORM_OPTIONS_NAME,
    TEST_DATA_DIR,
};
pub use error::TestDataError;
pub use skip::{run_test_stage, skip_stage_env_var_set, SKIP_STAGE_ENV_VAR_PREFIX};
