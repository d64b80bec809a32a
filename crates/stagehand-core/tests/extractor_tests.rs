use std::path::PathBuf;

use stagehand_core::stages::{parse_test_stages, ExtractError, Stage};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn stage(depth: usize, name: &str) -> Stage {
    Stage::new(depth, name)
}

#[test]
fn extracts_base_case_stages() {
    let map = parse_test_stages(&fixture("basecase"), "basecase").unwrap();

    let stages = map.get("TestWithStages").expect("test function missing");
    assert_eq!(
        stages,
        &vec![
            stage(0, "setup"),
            stage(0, "deploy"),
            stage(0, "validate"),
            stage(0, "cleanup"),
        ],
    );
}

#[test]
fn extracts_nested_run_stages() {
    let map = parse_test_stages(&fixture("nestedrun"), "nestedrun").unwrap();

    let expected = vec![
        stage(0, "setup"),
        stage(0, "deploy"),
        stage(1, "validate"),
        stage(0, "cleanup"),
    ];
    assert_eq!(map.get("TestWithStagesAndNestedTests"), Some(&expected));
    assert_eq!(
        map.get("TestWithStagesAndNestedTests/group"),
        Some(&expected),
    );
}

#[test]
fn extracts_multi_layer_nested_run_stages() {
    let map = parse_test_stages(&fixture("nestedrun"), "nestedrun").unwrap();

    let expected = vec![
        stage(0, "setup"),
        stage(0, "deploy"),
        stage(3, "validate"),
        stage(0, "cleanup"),
    ];
    for test_name in [
        "TestWithStagesAndMultiLayerNestedTests",
        "TestWithStagesAndMultiLayerNestedTests/group",
        "TestWithStagesAndMultiLayerNestedTests/group/subtest",
        "TestWithStagesAndMultiLayerNestedTests/group/subtest/subsubtest",
    ] {
        assert_eq!(map.get(test_name), Some(&expected), "for {test_name}");
    }
}

#[test]
fn sibling_sub_tests_only_inherit_their_own_stages() {
    let map = parse_test_stages(&fixture("nestedrun"), "nestedrun").unwrap();

    assert_eq!(
        map.get("TestWithStagesAndDifferentNestedStages"),
        Some(&vec![
            stage(0, "setup"),
            stage(0, "deploy"),
            stage(1, "validate_foo"),
            stage(1, "validate_bar"),
            stage(0, "cleanup"),
        ]),
    );
    assert_eq!(
        map.get("TestWithStagesAndDifferentNestedStages/foogroup"),
        Some(&vec![
            stage(0, "setup"),
            stage(0, "deploy"),
            stage(1, "validate_foo"),
            stage(0, "cleanup"),
        ]),
    );
    assert_eq!(
        map.get("TestWithStagesAndDifferentNestedStages/bargroup"),
        Some(&vec![
            stage(0, "setup"),
            stage(0, "deploy"),
            stage(1, "validate_bar"),
            stage(0, "cleanup"),
        ]),
    );
}

#[test]
fn inlines_one_and_multi_level_function_calls() {
    let map = parse_test_stages(&fixture("funccalls"), "funccalls").unwrap();

    let expected = vec![
        stage(0, "setup"),
        stage(0, "deploy"),
        stage(0, "validate"),
        stage(0, "cleanup"),
    ];
    for test_name in [
        "TestWithStagesAndOneLevelFuncCall",
        "TestWithStagesAndMultiLevelFuncCall",
    ] {
        assert_eq!(map.get(test_name), Some(&expected), "for {test_name}");
    }
}

#[test]
fn inlines_function_calls_that_spawn_sub_tests() {
    let map = parse_test_stages(&fixture("funccalls"), "funccalls").unwrap();

    let expected = vec![
        stage(0, "setup"),
        stage(0, "deploy"),
        stage(1, "validate"),
        stage(0, "cleanup"),
    ];
    assert_eq!(
        map.get("TestWithStagesAndNestedRunsWithFuncCall"),
        Some(&expected),
    );
    assert_eq!(
        map.get("TestWithStagesAndNestedRunsWithFuncCall/group"),
        Some(&expected),
    );
}

#[test]
fn cuts_recursive_helper_calls() {
    let map = parse_test_stages(&fixture("edgecases"), "edgecases").unwrap();

    assert_eq!(
        map.get("TestWithRecursiveHelper"),
        Some(&vec![stage(0, "ping")]),
    );
}

#[test]
fn escape_sequences_in_stage_names_are_decoded() {
    let map = parse_test_stages(&fixture("edgecases"), "edgecases").unwrap();

    // The surrounding quotes go, escaped quotes and tabs are decoded.
    assert_eq!(
        map.get("TestWithEscapedStageName"),
        Some(&vec![stage(0, "say \"hi\"\tloudly")]),
    );
}

#[test]
fn non_literal_stage_name_becomes_empty() {
    let map = parse_test_stages(&fixture("edgecases"), "edgecases").unwrap();

    assert_eq!(map.get("TestWithDynamicStageName"), Some(&vec![stage(0, "")]));
}

#[test]
fn non_literal_sub_test_name_gets_no_key() {
    let map = parse_test_stages(&fixture("edgecases"), "edgecases").unwrap();

    // The unnamed sub-test is still walked, so its stage joins the parent
    // list, but no qualified key is created for it.
    assert_eq!(
        map.get("TestWithComputedSubTestName"),
        Some(&vec![stage(0, "setup"), stage(1, "validate")]),
    );
    assert!(!map
        .keys()
        .any(|key| key.starts_with("TestWithComputedSubTestName/")));
}

#[test]
fn irresolvable_sub_test_body_is_fatal() {
    let err = parse_test_stages(&fixture("badsubtest"), "badsubtest").unwrap_err();
    assert!(matches!(err, ExtractError::SubTestBodyNotFound));
}
