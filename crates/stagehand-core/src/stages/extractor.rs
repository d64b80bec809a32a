use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use super::error::ExtractError;
use super::model::{Stage, StageList, TestStageMap};
use crate::syntax::{parse_package, Arg, CallExpr, Callee, FuncBody, GoPackage};

/// Package selector recognised as the stage namespace. Matching is purely
/// syntactic; an aliased import of the stage package is not recognised.
pub const STAGE_PACKAGE_NAME: &str = "test_structure";

const STAGE_CALL_NAME: &str = "RunTestStage";
const TEST_FUNC_PREFIX: &str = "Test";

/// Parses the package at `dir` and extracts the stage map for every test
/// function it declares.
pub fn parse_test_stages(dir: &Path, package_name: &str) -> Result<TestStageMap, ExtractError> {
    let pkg = parse_package(dir, package_name)?;
    extract_stages(&pkg)
}

/// Extracts the stage map from an already-parsed package.
pub fn extract_stages(pkg: &GoPackage) -> Result<TestStageMap, ExtractError> {
    let extractor = StageExtractor {
        funcs: pkg.top_level_functions(),
    };
    extractor.extract()
}

/// A call the extractor cares about: everything else is either inlined
/// (same-package function calls) or ignored.
enum TestCall<'a> {
    RunStage(&'a CallExpr),
    SubTest(&'a CallExpr),
}

struct StageExtractor<'a> {
    funcs: BTreeMap<&'a str, &'a FuncBody>,
}

impl<'a> StageExtractor<'a> {
    fn extract(&self) -> Result<TestStageMap, ExtractError> {
        let mut map = TestStageMap::new();
        for (&name, &body) in &self.funcs {
            if !name.starts_with(TEST_FUNC_PREFIX) {
                continue;
            }
            let calls = self.collect_calls(body, &mut vec![name])?;
            let (stages, nested) = self.walk(&calls, 0)?;
            for (sub_name, sub_stages) in nested {
                map.insert(format!("{name}/{sub_name}"), sub_stages);
            }
            map.insert(name.to_string(), stages);
        }
        Ok(map)
    }

    /// Flattens a function body into stage and sub-test calls in execution
    /// order: non-deferred statements in source order, then deferred
    /// statements in reverse declaration order. Calls to same-package
    /// functions are replaced inline by the calls of their bodies.
    ///
    /// `inline_stack` holds the names of functions currently being inlined;
    /// a call back into one of them is cut to avoid non-termination.
    fn collect_calls(
        &self,
        body: &'a FuncBody,
        inline_stack: &mut Vec<&'a str>,
    ) -> Result<Vec<TestCall<'a>>, ExtractError> {
        let mut all = Vec::new();
        let mut deferred: Vec<TestCall<'a>> = Vec::new();
        for body_call in &body.calls {
            let calls = self.calls_from_expr(&body_call.call, inline_stack)?;
            if body_call.deferred {
                let mut group = calls;
                group.append(&mut deferred);
                deferred = group;
            } else {
                all.extend(calls);
            }
        }
        all.append(&mut deferred);
        Ok(all)
    }

    fn calls_from_expr(
        &self,
        call: &'a CallExpr,
        inline_stack: &mut Vec<&'a str>,
    ) -> Result<Vec<TestCall<'a>>, ExtractError> {
        if is_run_stage_call(call) {
            return Ok(vec![TestCall::RunStage(call)]);
        }
        if is_t_run_call(call) {
            return Ok(vec![TestCall::SubTest(call)]);
        }
        match &call.callee {
            Callee::Ident(name) => match self.funcs.get(name.as_str()) {
                Some(&func_body) => {
                    let name = name.as_str();
                    if inline_stack.contains(&name) {
                        warn!(function = name, "cutting recursive call while inlining");
                        return Ok(Vec::new());
                    }
                    inline_stack.push(name);
                    let calls = self.collect_calls(func_body, inline_stack);
                    inline_stack.pop();
                    calls
                }
                // Unresolved identifiers are calls into other packages.
                None => Ok(Vec::new()),
            },
            Callee::FuncLit(func_body) => self.collect_calls(func_body, inline_stack),
            _ => Ok(Vec::new()),
        }
    }

    /// Turns an ordered call list into the stage list for the enclosing body
    /// plus the stage lists of the sub-tests it spawns, keyed by their
    /// name relative to the enclosing body.
    fn walk(
        &self,
        calls: &[TestCall<'a>],
        depth: usize,
    ) -> Result<(StageList, BTreeMap<String, StageList>), ExtractError> {
        let mut stages = StageList::new();
        let mut nested: BTreeMap<String, StageList> = BTreeMap::new();

        for call in calls {
            match call {
                TestCall::RunStage(expr) => {
                    let stage = Stage::new(depth, stage_name(expr));
                    // Sub-tests discovered earlier inherit later ancestor
                    // stages, in particular deferred cleanup.
                    for list in nested.values_mut() {
                        list.push(stage.clone());
                    }
                    stages.push(stage);
                }
                TestCall::SubTest(expr) => {
                    let sub_name = sub_test_name(expr);
                    let sub_body = self.sub_test_body(expr)?;
                    let sub_calls = self.collect_calls(sub_body, &mut Vec::new())?;
                    let (sub_stages, sub_nested) = self.walk(&sub_calls, depth + 1)?;

                    stages.extend(sub_stages.iter().cloned());
                    let ancestor_prefix: StageList = stages
                        .iter()
                        .filter(|stage| stage.depth <= depth)
                        .cloned()
                        .collect();

                    // An unnamed sub-test is still walked (its stages belong
                    // to the parent list) but gets no key of its own.
                    if let Some(sub_name) = sub_name {
                        for (key, list) in sub_nested {
                            let mut qualified = ancestor_prefix.clone();
                            qualified.extend(list);
                            nested.insert(format!("{sub_name}/{key}"), qualified);
                        }
                        let mut own = ancestor_prefix;
                        own.extend(sub_stages);
                        nested.insert(sub_name, own);
                    }
                }
            }
        }

        Ok((stages, nested))
    }

    fn sub_test_body(&self, expr: &'a CallExpr) -> Result<&'a FuncBody, ExtractError> {
        match expr.args.get(1) {
            Some(Arg::Ident(name)) => self
                .funcs
                .get(name.as_str())
                .copied()
                .ok_or(ExtractError::SubTestBodyNotFound),
            Some(Arg::FuncLit(body)) => Ok(body),
            _ => Err(ExtractError::SubTestBodyNotFound),
        }
    }
}

/// Extracts the stage name (second positional argument). A non-literal name
/// is diagnosed and counted as an empty name rather than aborting extraction.
fn stage_name(expr: &CallExpr) -> String {
    match expr.args.get(1) {
        Some(Arg::StringLit(name)) => name.clone(),
        _ => {
            warn!("could not find test stage name from RunTestStage call");
            String::new()
        }
    }
}

/// Extracts the sub-test name (first positional argument). Complex `t.Run`
/// calls, like names built from a range expression, are not handled.
fn sub_test_name(expr: &CallExpr) -> Option<String> {
    match expr.args.first() {
        Some(Arg::StringLit(name)) => Some(name.clone()),
        _ => {
            warn!("could not find test name from t.Run call");
            None
        }
    }
}

fn is_run_stage_call(call: &CallExpr) -> bool {
    matches!(
        &call.callee,
        Callee::Selector { receiver, method }
            if receiver == STAGE_PACKAGE_NAME && method == STAGE_CALL_NAME
    )
}

fn is_t_run_call(call: &CallExpr) -> bool {
    matches!(
        &call.callee,
        Callee::Selector { receiver, method } if receiver == "t" && method == "Run"
    )
}
