//! Stage extraction: walks parsed test functions and computes the ordered
//! list of stages each test (and sub-test) executes.

mod error;
mod extractor;
mod model;

pub use error::ExtractError;
pub use extractor::{extract_stages, parse_test_stages, STAGE_PACKAGE_NAME};
pub use model::{Stage, StageList, TestStageMap};
