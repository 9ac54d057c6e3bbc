// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conformance runner.
//
// For each component in a plan: build it from the registry, resolve its
// metadata, time `init`, then run the built-in suite and any declarative
// steps. A component that cannot be built or initialized gets a failed
// `init` case and the run moves on to the next one.

use std::time::Duration;

use statebridge_state::{MetricsStore, StateStore};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::{ComponentConfig, ComponentType, Operation, TestConfiguration};
use crate::pubsub_suite::run_pubsub_suite;
use crate::registry::ComponentRegistry;
use crate::report::{ComponentReport, Report};
use crate::state_suite::{run_state_suite, timed};
use crate::steps::StepRunner;

/// Runs test plans against components from a [`ComponentRegistry`].
#[derive(Debug, Clone)]
pub struct Runner {
    registry: ComponentRegistry,
    run_id: String,
}

impl Runner {
    /// A runner with a fresh random run id.
    pub fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry,
            run_id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Use a fixed run id, which makes generated keys predictable.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Run every component of `plan`.
    pub async fn run(&self, plan: &TestConfiguration) -> Report {
        let mut report = Report::new(plan.component_type);
        info!(
            component_type = plan.component_type.as_str(),
            components = plan.components.len(),
            run_id = %self.run_id,
            "starting conformance run"
        );

        for component in &plan.components {
            let span = info_span!("component", name = %component.component);
            let result = match plan.component_type {
                ComponentType::State => self.run_state(component).instrument(span).await,
                ComponentType::Pubsub => self.run_pubsub(component).instrument(span).await,
            };
            info!(
                component = %result.component,
                cases = result.cases.len(),
                failed = result.failed().count(),
                "component finished"
            );
            report.components.push(result);
        }
        report
    }

    async fn run_state(&self, component: &ComponentConfig) -> ComponentReport {
        let mut report = ComponentReport::new(component.component.clone());

        let store = match self.registry.create_state(&component.component) {
            Ok(store) => store,
            Err(err) => {
                report.fail("init", err.to_string(), Duration::ZERO);
                return report;
            }
        };
        let metadata = match component.resolved_metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                report.fail("init", err.to_string(), Duration::ZERO);
                return report;
            }
        };

        let mut store = MetricsStore::new(store);
        let (result, elapsed) = timed(store.init(metadata)).await;
        let limit = if component.enabled(Operation::Init) {
            component.config.max_init_duration_in_ms
        } else {
            None
        };
        if !report.record("init", &result, elapsed, limit) {
            return report;
        }

        run_state_suite(&store, component, &self.run_id, &mut report).await;
        if !component.steps.is_empty() {
            StepRunner::new().run(&store, &component.steps, &mut report).await;
        }

        report.stats = Some(store.stats().await);
        report
    }

    async fn run_pubsub(&self, component: &ComponentConfig) -> ComponentReport {
        let mut report = ComponentReport::new(component.component.clone());

        let mut broker = match self.registry.create_pubsub(&component.component) {
            Ok(broker) => broker,
            Err(err) => {
                report.fail("init", err.to_string(), Duration::ZERO);
                return report;
            }
        };
        let metadata = match component.resolved_metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                report.fail("init", err.to_string(), Duration::ZERO);
                return report;
            }
        };

        let (result, elapsed) = timed(broker.init(metadata)).await;
        let limit = if component.enabled(Operation::Init) {
            component.config.max_init_duration_in_ms
        } else {
            None
        };
        if !report.record("init", &result, elapsed, limit) {
            return report;
        }

        run_pubsub_suite(broker.as_ref(), component, &self.run_id, &mut report).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statebridge_state::{
        DeleteRequest, GetRequest, GetResponse, Metadata, SetRequest, StateError,
    };

    fn plan(yaml: &str) -> TestConfiguration {
        TestConfiguration::from_yaml(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_state_plan_passes() {
        let runner = Runner::new(ComponentRegistry::with_defaults()).with_run_id("unit");
        let report = runner
            .run(&plan(
                "componentType: state\ncomponents:\n  - component: in-memory\n    allOperations: true\n",
            ))
            .await;
        assert!(report.passed(), "{}", report.render_text());
        let stats = report.components[0].stats.as_ref().unwrap();
        assert!(stats.set_count > 0);
        assert_eq!(runner.run_id(), "unit");
    }

    #[tokio::test]
    async fn test_unknown_component_fails_init_and_continues() {
        let runner = Runner::new(ComponentRegistry::with_defaults());
        let report = runner
            .run(&plan(
                "componentType: state\ncomponents:\n  - component: redis\n  - component: in-memory\n    operations: [set]\n",
            ))
            .await;
        assert_eq!(report.components.len(), 2);
        let redis = report.component("redis").unwrap();
        assert_eq!(redis.cases.len(), 1);
        assert_eq!(redis.cases[0].case, "init");
        assert!(redis.cases[0].message.contains("unknown state component"));
        assert!(report.component("in-memory").unwrap().failed().next().is_none());
        assert_eq!(report.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_env_fails_init() {
        let runner = Runner::new(ComponentRegistry::with_defaults());
        let report = runner
            .run(&plan(
                "componentType: state\ncomponents:\n  - component: in-memory\n    metadata:\n      Secret: \"${{STATEBRIDGE_TEST_SURELY_UNSET_VAR}}\"\n",
            ))
            .await;
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().contains("STATEBRIDGE_TEST_SURELY_UNSET_VAR"));
    }

    struct RejectingStore;

    #[async_trait::async_trait]
    impl StateStore for RejectingStore {
        async fn init(&mut self, _: Metadata) -> Result<(), StateError> {
            Err(StateError::MissingMetadata("missing connection string".to_string()))
        }
        async fn get(&self, _: &GetRequest) -> Result<GetResponse, StateError> {
            unreachable!("never initialized")
        }
        async fn set(&self, _: &SetRequest) -> Result<(), StateError> {
            unreachable!("never initialized")
        }
        async fn delete(&self, _: &DeleteRequest) -> Result<(), StateError> {
            unreachable!("never initialized")
        }
        fn name(&self) -> &str {
            "rejecting"
        }
    }

    #[tokio::test]
    async fn test_init_failure_skips_suite() {
        let mut registry = ComponentRegistry::new();
        registry.register_state("rejecting", || Box::new(RejectingStore));
        let report = Runner::new(registry)
            .run(&plan(
                "componentType: state\ncomponents:\n  - component: rejecting\n    allOperations: true\n",
            ))
            .await;
        let component = &report.components[0];
        assert_eq!(component.cases.len(), 1);
        assert_eq!(component.cases[0].message, "missing connection string");
        assert!(component.stats.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_pubsub_plan_passes() {
        let runner = Runner::new(ComponentRegistry::with_defaults());
        let report = runner
            .run(&plan(
                "componentType: pubsub\ncomponents:\n  - component: in-memory\n    allOperations: true\n    metadata:\n      bufferSize: \"64\"\n",
            ))
            .await;
        assert!(report.passed(), "{}", report.render_text());
        assert_eq!(report.components[0].cases.len(), 4);
    }
}
