// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Interpreter for declarative test steps.
//
// Step values are YAML: a string is written as its raw UTF-8 bytes, any other
// value is written as JSON. Expected values follow the same rule, so a
// mapping in `expect.value` is compared structurally against the JSON read
// back from the store.

use std::collections::HashMap;

use serde_yaml_ng::Value as YamlValue;
use statebridge_state::{
    DeleteRequest, GetRequest, GetResponse, SetRequest, StateError, StateStore,
};
use tracing::debug;

use crate::config::{Expect, Step, StepOperation};
use crate::report::ComponentReport;
use crate::state_suite::timed;

/// Placeholder for "the etag returned by the last get of this key".
pub const LAST_ETAG: &str = "$last";

/// Encode a YAML step value as the bytes written to the store.
pub fn value_bytes(value: &YamlValue) -> Result<Vec<u8>, String> {
    match value {
        YamlValue::String(s) => Ok(s.as_bytes().to_vec()),
        other => {
            let json = yaml_to_json(other)?;
            serde_json::to_vec(&json).map_err(|err| err.to_string())
        }
    }
}

fn yaml_to_json(value: &YamlValue) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|err| format!("value is not representable as JSON: {}", err))
}

/// Compare bytes read from the store with an expected YAML value.
pub fn matches_expected(expected: &YamlValue, actual: &[u8]) -> Result<(), String> {
    match expected {
        YamlValue::String(s) => {
            if s.as_bytes() == actual {
                Ok(())
            } else {
                Err(format!(
                    "expected {:?}, got {:?}",
                    s,
                    String::from_utf8_lossy(actual)
                ))
            }
        }
        other => {
            let want = yaml_to_json(other)?;
            let got: serde_json::Value = serde_json::from_slice(actual).map_err(|err| {
                format!("stored value is not JSON ({}): {:?}", err, String::from_utf8_lossy(actual))
            })?;
            if want == got {
                Ok(())
            } else {
                Err(format!("expected {}, got {}", want, got))
            }
        }
    }
}

/// Runs steps in order, remembering etags between them.
#[derive(Debug, Default)]
pub struct StepRunner {
    etags: HashMap<String, String>,
}

impl StepRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Etag remembered for `key` from its last successful get.
    pub fn last_etag(&self, key: &str) -> Option<&str> {
        self.etags.get(key).map(String::as_str)
    }

    fn resolve_etag(&self, key: &str, etag: &Option<String>) -> Result<Option<String>, String> {
        match etag.as_deref() {
            Some(LAST_ETAG) => self
                .etags
                .get(key)
                .cloned()
                .map(Some)
                .ok_or_else(|| format!("no etag recorded for '{}'; add a get step first", key)),
            other => Ok(other.map(str::to_string)),
        }
    }

    /// Run every step against `store`, one report case per step.
    pub async fn run(&mut self, store: &dyn StateStore, steps: &[Step], report: &mut ComponentReport) {
        for (i, step) in steps.iter().enumerate() {
            let label = step.label(i);
            let (outcome, elapsed) = timed(self.run_step(store, step)).await;
            match outcome {
                Ok(()) => report.pass(label, elapsed),
                Err(message) => report.fail(label, message, elapsed),
            }
        }
    }

    async fn run_step(&mut self, store: &dyn StateStore, step: &Step) -> Result<(), String> {
        let key = step.key.clone().unwrap_or_default();
        debug!(operation = step.operation.as_str(), key = %key, "running step");

        match step.operation {
            StepOperation::Get => {
                let result = store.get(&GetRequest::new(key.clone())).await;
                if let Ok(resp) = &result {
                    match &resp.etag {
                        Some(etag) => {
                            self.etags.insert(key.clone(), etag.clone());
                        }
                        None => {
                            self.etags.remove(&key);
                        }
                    }
                }
                check_get(&step.expect, result)
            }
            StepOperation::Set => {
                let value = step
                    .value
                    .as_ref()
                    .ok_or_else(|| "set step has no value".to_string())?;
                let mut req = SetRequest::new(key.clone(), value_bytes(value)?);
                req.etag = self.resolve_etag(&key, &step.etag)?;
                check_write(&step.expect, store.set(&req).await)
            }
            StepOperation::Delete => {
                let mut req = DeleteRequest::new(key.clone());
                req.etag = self.resolve_etag(&key, &step.etag)?;
                check_write(&step.expect, store.delete(&req).await)
            }
            StepOperation::BulkSet => {
                let mut reqs = Vec::with_capacity(step.items.len());
                for item in &step.items {
                    let value = item
                        .value
                        .as_ref()
                        .ok_or_else(|| format!("bulk item '{}' has no value", item.key))?;
                    let mut req = SetRequest::new(item.key.clone(), value_bytes(value)?);
                    req.etag = self.resolve_etag(&item.key, &item.etag)?;
                    reqs.push(req);
                }
                check_write(&step.expect, store.bulk_set(&reqs).await)
            }
            StepOperation::BulkDelete => {
                let mut reqs = Vec::with_capacity(step.items.len());
                for item in &step.items {
                    let mut req = DeleteRequest::new(item.key.clone());
                    req.etag = self.resolve_etag(&item.key, &item.etag)?;
                    reqs.push(req);
                }
                check_write(&step.expect, store.bulk_delete(&reqs).await)
            }
        }
    }
}

/// Check the error expectations shared by every operation. Returns
/// `Ok(true)` when the operation failed as expected and there is nothing
/// more to check.
fn check_error<T>(expect: &Expect, result: &Result<T, StateError>) -> Result<bool, String> {
    let want_mismatch = expect.etag_mismatch.unwrap_or(false);
    let want_error = want_mismatch || expect.error.unwrap_or(false);
    match result {
        Err(err) if want_mismatch && !err.is_etag_mismatch() => {
            Err(format!("expected etag mismatch, got: {}", err))
        }
        Err(_) if want_error => Ok(true),
        Err(err) => Err(err.to_string()),
        Ok(_) if want_mismatch => Err("expected etag mismatch, operation succeeded".to_string()),
        Ok(_) if want_error => Err("expected an error, operation succeeded".to_string()),
        Ok(_) => Ok(false),
    }
}

fn check_write(expect: &Expect, result: Result<(), StateError>) -> Result<(), String> {
    check_error(expect, &result).map(|_| ())
}

fn check_get(expect: &Expect, result: Result<GetResponse, StateError>) -> Result<(), String> {
    if check_error(expect, &result)? {
        return Ok(());
    }
    let resp = result.map_err(|err| err.to_string())?;

    let want_found = expect.found.unwrap_or(expect.value.is_some());
    match (&resp.data, want_found) {
        (Some(_), false) if expect.found == Some(false) => {
            return Err("expected key to be absent, but it was found".to_string());
        }
        (None, true) => return Err("expected key to be found".to_string()),
        _ => {}
    }

    match (&expect.value, &resp.data) {
        (Some(expected), Some(data)) => matches_expected(expected, data),
        _ => Ok(()),
    }
}
