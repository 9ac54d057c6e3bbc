// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Runs the shipped state plan end to end.

use std::path::PathBuf;

use statebridge_conformance::{
    run_plan, ComponentRegistry, ComponentType, ConformanceError, Runner, TestConfiguration,
};

fn plan_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../conformance/config/state/tests.yml")
}

#[tokio::test]
async fn test_state_conformance() {
    let errors = run_plan(plan_path()).await.unwrap();
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    assert!(messages.is_empty(), "conformance failures: {:#?}", messages);
}

#[tokio::test]
async fn test_state_plan_covers_steps_and_suite() {
    let plan = TestConfiguration::load(plan_path()).unwrap();
    assert_eq!(plan.component_type, ComponentType::State);

    let report = Runner::new(ComponentRegistry::with_defaults())
        .with_run_id("integration")
        .run(&plan)
        .await;
    let component = report.component("in-memory").unwrap();
    let cases: Vec<&str> = component.cases.iter().map(|c| c.case.as_str()).collect();
    assert_eq!(cases[0], "init");
    assert!(cases.contains(&"etag/delete-match"));
    assert!(cases.contains(&"step 3: stale etag is rejected"));
    assert!(cases.contains(&"step 7: order is gone"));
    assert!(component.stats.as_ref().unwrap().bulk_count >= 2);
}

#[tokio::test]
async fn test_missing_plan_is_an_io_error() {
    let err = run_plan("/nonexistent/statebridge/plan.yml").await.unwrap_err();
    assert!(matches!(err, ConformanceError::Io { .. }));
}

#[tokio::test]
async fn test_plan_from_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.yml");
    std::fs::write(
        &path,
        r#"
componentType: state
components:
  - component: in-memory
    operations: [init, set, get]
    steps:
      - { operation: get, key: never-written, expect: { value: "x" } }
"#,
    )
    .unwrap();

    let errors = run_plan(&path).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ConformanceError::CaseFailed { case, .. } if case == "step 1: get never-written"
    ));
}

#[tokio::test]
async fn test_invalid_plan_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.yml");
    std::fs::write(&path, "componentType: state\ncomponents:\n  - component: in-memory\n    operations: [publish]\n").unwrap();
    let err = run_plan(&path).await.unwrap_err();
    assert!(matches!(err, ConformanceError::Config(_)));
}
