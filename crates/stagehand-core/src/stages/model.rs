use std::collections::BTreeMap;

/// A named, environment-gated phase within a test. `depth` is the nesting
/// level at which the stage is declared in the source; 0 is the top-level
/// test. Depth is kept for display purposes only and never reorders stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub depth: usize,
    pub name: String,
}

impl Stage {
    pub fn new(depth: usize, name: impl Into<String>) -> Self {
        Stage {
            depth,
            name: name.into(),
        }
    }
}

/// Stages in execution order: source order, with deferred stages at the end
/// in reverse declaration order.
pub type StageList = Vec<Stage>;

/// Maps the qualified test name (`Parent/Child/...`, matching how `go test
/// -run` filters) to the stages that test executes. A sub-test entry includes
/// its ancestors' setup and cleanup stages, since the test binary still runs
/// them when targeting the sub-test.
pub type TestStageMap = BTreeMap<String, StageList>;
