pub mod stages;
pub mod store;
pub mod syntax;
pub mod tunnel;

pub use stages::{parse_test_stages, Stage, StageList, TestStageMap};
pub use store::run_test_stage;
pub use syntax::GoPackage;
pub use tunnel::Tunnel;
