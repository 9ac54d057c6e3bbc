// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Conformance test plan model.
//
// A plan names a component type, then lists the components to exercise with
// their metadata, enabled operations, limits and optional declarative steps.
// See `conformance/config/` for the plans shipped with the workspace.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use statebridge_state::Metadata;

use crate::error::ConformanceError;

/// Which component contract a plan exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    State,
    Pubsub,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::State => "state",
            ComponentType::Pubsub => "pubsub",
        }
    }
}

/// Built-in suite operations that can be enabled per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Init,
    Set,
    Get,
    Delete,
    #[serde(alias = "bulkSet")]
    BulkSet,
    #[serde(alias = "bulkDelete")]
    BulkDelete,
    Etag,
    Subscribe,
    Publish,
}

impl Operation {
    pub const STATE: &'static [Operation] = &[
        Operation::Init,
        Operation::Set,
        Operation::Get,
        Operation::Delete,
        Operation::BulkSet,
        Operation::BulkDelete,
        Operation::Etag,
    ];

    pub const PUBSUB: &'static [Operation] =
        &[Operation::Init, Operation::Subscribe, Operation::Publish];

    pub fn applies_to(&self, kind: ComponentType) -> bool {
        match kind {
            ComponentType::State => Self::STATE.contains(self),
            ComponentType::Pubsub => Self::PUBSUB.contains(self),
        }
    }
}

/// Limits and knobs for the built-in suites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuiteConfig {
    pub max_init_duration_in_ms: Option<u64>,
    pub max_set_duration_in_ms: Option<u64>,
    pub max_get_duration_in_ms: Option<u64>,
    pub max_delete_duration_in_ms: Option<u64>,
    pub max_bulk_set_duration_in_ms: Option<u64>,
    pub max_bulk_delete_duration_in_ms: Option<u64>,
    pub max_publish_duration_in_ms: Option<u64>,
    /// How long the pubsub suite waits for all messages to arrive.
    pub max_read_duration_in_ms: u64,
    /// Prefix of every key the state suite writes.
    pub key_prefix: String,
    /// Items per bulk request in the state suite.
    pub num_bulk_requests: usize,
    /// Topic used by the pubsub suite.
    pub topic: String,
    /// Messages published by the pubsub suite.
    pub message_count: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            max_init_duration_in_ms: None,
            max_set_duration_in_ms: None,
            max_get_duration_in_ms: None,
            max_delete_duration_in_ms: None,
            max_bulk_set_duration_in_ms: None,
            max_bulk_delete_duration_in_ms: None,
            max_publish_duration_in_ms: None,
            max_read_duration_in_ms: 1000,
            key_prefix: "conformance".to_string(),
            num_bulk_requests: 10,
            topic: "conformance-topic".to_string(),
            message_count: 10,
        }
    }
}

/// Operations available to declarative steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepOperation {
    Get,
    Set,
    Delete,
    #[serde(alias = "bulkset")]
    BulkSet,
    #[serde(alias = "bulkdelete")]
    BulkDelete,
}

impl StepOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepOperation::Get => "get",
            StepOperation::Set => "set",
            StepOperation::Delete => "delete",
            StepOperation::BulkSet => "bulkSet",
            StepOperation::BulkDelete => "bulkDelete",
        }
    }
}

/// One key (and value, for bulk sets) of a bulk step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepItem {
    pub key: String,
    #[serde(default)]
    pub value: Option<serde_yaml_ng::Value>,
    #[serde(default)]
    pub etag: Option<String>,
}

/// Expected outcome of a step. An empty expectation means "succeeds".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Expect {
    /// Expected value of a `get`.
    pub value: Option<serde_yaml_ng::Value>,
    /// Whether a `get` should find the key.
    pub found: Option<bool>,
    /// Whether the operation should fail.
    pub error: Option<bool>,
    /// Whether the operation should fail with an etag mismatch.
    pub etag_mismatch: Option<bool>,
}

/// A single declarative operation against a state store.
///
/// `etag: $last` substitutes the etag most recently returned by a `get` of
/// the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,
    pub operation: StepOperation,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<serde_yaml_ng::Value>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub items: Vec<StepItem>,
    #[serde(default)]
    pub expect: Expect,
}

impl Step {
    /// Label used for the step's case in the report.
    pub fn label(&self, index: usize) -> String {
        match (&self.name, &self.key) {
            (Some(name), _) => format!("step {}: {}", index + 1, name),
            (None, Some(key)) => format!("step {}: {} {}", index + 1, self.operation.as_str(), key),
            (None, None) => format!("step {}: {}", index + 1, self.operation.as_str()),
        }
    }

    fn validate(&self, index: usize) -> Result<(), String> {
        let label = self.label(index);
        match self.operation {
            StepOperation::Get | StepOperation::Delete if self.key.is_none() => {
                Err(format!("{}: 'key' is required", label))
            }
            StepOperation::Set if self.key.is_none() || self.value.is_none() => {
                Err(format!("{}: 'key' and 'value' are required", label))
            }
            StepOperation::BulkSet | StepOperation::BulkDelete if self.items.is_empty() => {
                Err(format!("{}: 'items' must not be empty", label))
            }
            StepOperation::BulkSet if self.items.iter().any(|i| i.value.is_none()) => {
                Err(format!("{}: every item needs a 'value'", label))
            }
            _ => Ok(()),
        }
    }
}

/// One component entry of a test plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    /// Registry name of the component.
    pub component: String,
    #[serde(default)]
    pub all_operations: bool,
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// Component metadata; values may reference `${{ENV_VAR}}`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub config: SuiteConfig,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ComponentConfig {
    /// Whether a built-in operation is enabled for this component.
    pub fn enabled(&self, op: Operation) -> bool {
        self.all_operations || self.operations.contains(&op)
    }

    /// Metadata with `${{NAME}}` references resolved from the process
    /// environment.
    pub fn resolved_metadata(&self) -> Result<Metadata, ConformanceError> {
        self.resolved_metadata_with(|name| std::env::var(name).ok())
    }

    /// Metadata with `${{NAME}}` references resolved through `lookup`.
    pub fn resolved_metadata_with<F>(&self, lookup: F) -> Result<Metadata, ConformanceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.metadata
            .iter()
            .map(|(k, v)| Ok((k.clone(), substitute_env(v, &lookup)?)))
            .collect::<Result<HashMap<_, _>, ConformanceError>>()
            .map(Metadata::new)
    }
}

fn env_reference() -> &'static Regex {
    static ENV_REF: OnceLock<Regex> = OnceLock::new();
    ENV_REF.get_or_init(|| {
        Regex::new(r"\$\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("static regex is valid")
    })
}

/// Replace every `${{NAME}}` in `value` with `lookup(NAME)`.
pub fn substitute_env<F>(value: &str, lookup: F) -> Result<String, ConformanceError>
where
    F: Fn(&str) -> Option<String>,
{
    let re = env_reference();
    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    for caps in re.captures_iter(value) {
        let whole = caps.get(0).expect("group 0 always matches");
        let name = &caps[1];
        let resolved = lookup(name).ok_or_else(|| ConformanceError::MissingEnv(name.to_string()))?;
        out.push_str(&value[last..whole.start()]);
        out.push_str(&resolved);
        last = whole.end();
    }
    out.push_str(&value[last..]);
    Ok(out)
}

/// A parsed conformance test plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfiguration {
    pub component_type: ComponentType,
    pub components: Vec<ComponentConfig>,
}

impl TestConfiguration {
    /// Read and validate a plan from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConformanceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConformanceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a plan from YAML text.
    pub fn from_yaml(raw: &str) -> Result<Self, ConformanceError> {
        let config: TestConfiguration = serde_yaml_ng::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Keep only the components whose name is `name`.
    pub fn retain_component(&mut self, name: &str) {
        self.components.retain(|c| c.component == name);
    }

    pub fn validate(&self) -> Result<(), ConformanceError> {
        if self.components.is_empty() {
            return Err(ConformanceError::Config("no components listed".to_string()));
        }
        let kind = self.component_type;
        for component in &self.components {
            if component.component.trim().is_empty() {
                return Err(ConformanceError::Config("component name must not be empty".to_string()));
            }
            if let Some(op) = component.operations.iter().find(|op| !op.applies_to(kind)) {
                return Err(ConformanceError::Config(format!(
                    "{}: operation {:?} does not apply to {} components",
                    component.component,
                    op,
                    kind.as_str()
                )));
            }
            if kind == ComponentType::Pubsub && !component.steps.is_empty() {
                return Err(ConformanceError::Config(format!(
                    "{}: declarative steps are only supported for state components",
                    component.component
                )));
            }
            for (i, step) in component.steps.iter().enumerate() {
                step.validate(i).map_err(|msg| {
                    ConformanceError::Config(format!("{}: {}", component.component, msg))
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
componentType: state
components:
  - component: in-memory
    allOperations: false
    operations: [init, set, get, bulkSet, bulkdelete]
    metadata:
      Region: us-east-1
      AccessKey: "${{ TEST_KEY }}"
    config:
      maxSetDurationInMs: 50
      numBulkRequests: 3
    steps:
      - { operation: set, key: a, value: "x" }
      - { operation: get, key: a, expect: { value: "x" } }
      - operation: bulkSet
        items:
          - { key: b, value: { n: 1 } }
"#;

    #[test]
    fn test_parse_plan() {
        let plan = TestConfiguration::from_yaml(PLAN).unwrap();
        assert_eq!(plan.component_type, ComponentType::State);
        let c = &plan.components[0];
        assert_eq!(c.component, "in-memory");
        assert!(c.enabled(Operation::BulkSet));
        assert!(c.enabled(Operation::BulkDelete));
        assert!(!c.enabled(Operation::Delete));
        assert_eq!(c.config.max_set_duration_in_ms, Some(50));
        assert_eq!(c.config.num_bulk_requests, 3);
        // Defaults survive partial config blocks.
        assert_eq!(c.config.key_prefix, "conformance");
        assert_eq!(c.steps.len(), 3);
        assert_eq!(c.steps[2].operation, StepOperation::BulkSet);
    }

    #[test]
    fn test_all_operations_enables_everything() {
        let plan = TestConfiguration::from_yaml(
            "componentType: state\ncomponents:\n  - component: x\n    allOperations: true\n",
        )
        .unwrap();
        assert!(plan.components[0].enabled(Operation::Etag));
    }

    #[test]
    fn test_resolved_metadata_substitutes_env() {
        let plan = TestConfiguration::from_yaml(PLAN).unwrap();
        let md = plan.components[0]
            .resolved_metadata_with(|name| (name == "TEST_KEY").then(|| "secret".to_string()))
            .unwrap();
        assert_eq!(md.get("AccessKey"), Some("secret"));
        assert_eq!(md.get("Region"), Some("us-east-1"));
    }

    #[test]
    fn test_resolved_metadata_missing_env() {
        let plan = TestConfiguration::from_yaml(PLAN).unwrap();
        let err = plan.components[0].resolved_metadata_with(|_| None).unwrap_err();
        assert!(matches!(err, ConformanceError::MissingEnv(ref name) if name == "TEST_KEY"));
    }

    #[test]
    fn test_substitute_env_multiple_references() {
        let out = substitute_env("${{A}}-${{B}}/${{A}}", |n| Some(n.to_lowercase())).unwrap();
        assert_eq!(out, "a-b/a");
        assert_eq!(substitute_env("plain", |_| None).unwrap(), "plain");
    }

    #[test]
    fn test_empty_components_rejected() {
        let err = TestConfiguration::from_yaml("componentType: state\ncomponents: []\n").unwrap_err();
        assert!(matches!(err, ConformanceError::Config(_)));
    }

    #[test]
    fn test_unknown_component_type_rejected() {
        let err = TestConfiguration::from_yaml(
            "componentType: bindings\ncomponents:\n  - component: x\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConformanceError::Yaml(_)));
    }

    #[test]
    fn test_operation_of_wrong_type_rejected() {
        let err = TestConfiguration::from_yaml(
            "componentType: pubsub\ncomponents:\n  - component: x\n    operations: [bulkset]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConformanceError::Config(_)));
    }

    #[test]
    fn test_step_missing_key_rejected() {
        let err = TestConfiguration::from_yaml(
            "componentType: state\ncomponents:\n  - component: x\n    steps:\n      - { operation: get }\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("'key' is required"));
    }

    #[test]
    fn test_step_labels() {
        let plan = TestConfiguration::from_yaml(PLAN).unwrap();
        let steps = &plan.components[0].steps;
        assert_eq!(steps[0].label(0), "step 1: set a");
        assert_eq!(steps[2].label(2), "step 3: bulkSet");
    }

    #[test]
    fn test_retain_component() {
        let mut plan = TestConfiguration::from_yaml(
            "componentType: state\ncomponents:\n  - component: a\n  - component: b\n",
        )
        .unwrap();
        plan.retain_component("b");
        assert_eq!(plan.components.len(), 1);
        assert_eq!(plan.components[0].component, "b");
    }
}
