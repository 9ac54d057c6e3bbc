// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Conformance results.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;
use statebridge_state::StoreStats;
use tracing::{debug, warn};

use crate::config::ComponentType;
use crate::error::ConformanceError;

/// Outcome of a single case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub case: String,
    pub outcome: Outcome,
    /// Failure or skip reason; empty for passes.
    pub message: String,
    pub duration_ms: u64,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        self.outcome != Outcome::Failed
    }
}

/// All cases run against one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentReport {
    pub component: String,
    pub cases: Vec<CaseResult>,
    /// Operation counters for state components.
    pub stats: Option<StoreStats>,
}

impl ComponentReport {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            cases: Vec::new(),
            stats: None,
        }
    }

    pub fn pass(&mut self, case: impl Into<String>, elapsed: Duration) {
        let case = case.into();
        debug!(component = %self.component, case = %case, "passed");
        self.cases.push(CaseResult {
            case,
            outcome: Outcome::Passed,
            message: String::new(),
            duration_ms: elapsed.as_millis() as u64,
        });
    }

    pub fn fail(&mut self, case: impl Into<String>, message: impl Into<String>, elapsed: Duration) {
        let case = case.into();
        let message = message.into();
        warn!(component = %self.component, case = %case, %message, "failed");
        self.cases.push(CaseResult {
            case,
            outcome: Outcome::Failed,
            message,
            duration_ms: elapsed.as_millis() as u64,
        });
    }

    pub fn skip(&mut self, case: impl Into<String>, reason: impl Into<String>) {
        self.cases.push(CaseResult {
            case: case.into(),
            outcome: Outcome::Skipped,
            message: reason.into(),
            duration_ms: 0,
        });
    }

    /// Record `result`, failing the case if it took longer than `limit_ms`.
    pub fn record<T, E: std::fmt::Display>(
        &mut self,
        case: impl Into<String>,
        result: &Result<T, E>,
        elapsed: Duration,
        limit_ms: Option<u64>,
    ) -> bool {
        let case = case.into();
        match result {
            Err(err) => {
                self.fail(case, err.to_string(), elapsed);
                false
            }
            Ok(_) => self.check_duration(case, elapsed, limit_ms),
        }
    }

    /// Pass the case unless it exceeded `limit_ms`.
    pub fn check_duration(&mut self, case: impl Into<String>, elapsed: Duration, limit_ms: Option<u64>) -> bool {
        match limit_ms {
            Some(limit) if elapsed > Duration::from_millis(limit) => {
                self.fail(
                    case,
                    format!("took {}ms, limit is {}ms", elapsed.as_millis(), limit),
                    elapsed,
                );
                false
            }
            _ => {
                self.pass(case, elapsed);
                true
            }
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases.iter().filter(|c| !c.passed())
    }
}

/// Results of a whole test plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub component_type: ComponentType,
    pub components: Vec<ComponentReport>,
}

impl Report {
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            components: Vec::new(),
        }
    }

    pub fn case_count(&self) -> usize {
        self.components.iter().map(|c| c.cases.len()).sum()
    }

    /// Every failed case as an error.
    pub fn failures(&self) -> Vec<ConformanceError> {
        self.components
            .iter()
            .flat_map(|c| {
                c.failed().map(move |case| ConformanceError::CaseFailed {
                    component: c.component.clone(),
                    case: case.case.clone(),
                    message: case.message.clone(),
                })
            })
            .collect()
    }

    pub fn passed(&self) -> bool {
        self.components.iter().all(|c| c.failed().next().is_none())
    }

    /// Find a component's report by name.
    pub fn component(&self, name: &str) -> Option<&ComponentReport> {
        self.components.iter().find(|c| c.component == name)
    }

    /// Human-readable summary.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let failed = self.failures().len();
        let _ = writeln!(
            out,
            "{} conformance: {} component(s), {} case(s), {} failed",
            self.component_type.as_str(),
            self.components.len(),
            self.case_count(),
            failed
        );
        for component in &self.components {
            let _ = writeln!(out, "  {}", component.component);
            for case in &component.cases {
                let tag = match case.outcome {
                    Outcome::Passed => "PASS",
                    Outcome::Failed => "FAIL",
                    Outcome::Skipped => "SKIP",
                };
                if case.message.is_empty() {
                    let _ = writeln!(out, "    {} {} ({}ms)", tag, case.case, case.duration_ms);
                } else {
                    let _ = writeln!(out, "    {} {} ({}ms): {}", tag, case.case, case.duration_ms, case.message);
                }
            }
            if let Some(stats) = &component.stats {
                let _ = writeln!(
                    out,
                    "    ops: get={} set={} delete={} bulk={} errors={} read={}B written={}B",
                    stats.get_count,
                    stats.set_count,
                    stats.delete_count,
                    stats.bulk_count,
                    stats.error_count,
                    stats.total_bytes_read,
                    stats.total_bytes_written
                );
            }
        }
        out
    }

    /// JSON rendering for machine consumption.
    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        let mut c = ComponentReport::new("in-memory");
        c.pass("init", Duration::from_millis(1));
        c.fail("get/json", "value mismatch", Duration::from_millis(2));
        c.skip("etag", "unsupported");
        let mut report = Report::new(ComponentType::State);
        report.components.push(c);
        report
    }

    #[test]
    fn test_failures_and_passed() {
        let report = sample();
        assert!(!report.passed());
        assert_eq!(report.case_count(), 3);
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].to_string(), "in-memory: get/json failed: value mismatch");
    }

    #[test]
    fn test_check_duration_over_limit_fails() {
        let mut c = ComponentReport::new("x");
        assert!(!c.check_duration("set", Duration::from_millis(20), Some(5)));
        assert!(c.check_duration("get", Duration::from_millis(1), Some(5)));
        assert!(c.check_duration("get", Duration::from_secs(10), None));
        assert_eq!(c.failed().count(), 1);
        assert!(c.cases[0].message.contains("limit is 5ms"));
    }

    #[test]
    fn test_record_error() {
        let mut c = ComponentReport::new("x");
        let result: Result<(), String> = Err("boom".to_string());
        assert!(!c.record("set", &result, Duration::ZERO, None));
        assert_eq!(c.cases[0].message, "boom");
    }

    #[test]
    fn test_render_text() {
        let text = sample().render_text();
        assert!(text.starts_with("state conformance: 1 component(s), 3 case(s), 1 failed"));
        assert!(text.contains("PASS init"));
        assert!(text.contains("FAIL get/json (2ms): value mismatch"));
        assert!(text.contains("SKIP etag (0ms): unsupported"));
    }

    #[test]
    fn test_render_json() {
        let json: serde_json::Value = serde_json::from_str(&sample().render_json().unwrap()).unwrap();
        assert_eq!(json["component_type"], "state");
        assert_eq!(json["components"][0]["cases"][1]["outcome"], "failed");
    }
}
