// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Built-in behavioural suite for state stores.
//
// Runs the same fixed scenarios against any `StateStore`: single-key
// set/get/delete, bulk set/delete and, when the store advertises it, etag
// concurrency. Every key is `{keyPrefix}-{run id}-{name}` so concurrent runs
// against a shared backend do not collide.

use std::future::Future;
use std::time::{Duration, Instant};

use statebridge_state::{
    DeleteRequest, Feature, GetRequest, SetRequest, StateError, StateStore,
};
use tracing::{debug, info};

use crate::config::{ComponentConfig, Operation};
use crate::report::ComponentReport;

/// A fixed value written by the suite.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub key: String,
    pub value: Vec<u8>,
    /// Compare structurally as JSON rather than byte-for-byte.
    pub json: bool,
}

/// The single-key scenarios: raw bytes, a UTF-8 string and a JSON document.
pub fn scenarios(prefix: &str, run_id: &str) -> Vec<Scenario> {
    let key = |name: &str| format!("{}-{}-{}", prefix, run_id, name);
    vec![
        Scenario {
            name: "bytes",
            key: key("bytes"),
            value: vec![0x00, 0xff, 0x10, 0x80, 0x7f, 0xfe],
            json: false,
        },
        Scenario {
            name: "string",
            key: key("string"),
            value: b"hello world".to_vec(),
            json: false,
        },
        Scenario {
            name: "json",
            key: key("json"),
            value: br#"{"message":"test","product":{"value":11}}"#.to_vec(),
            json: true,
        },
    ]
}

/// Compare a read value with the written one.
pub fn values_match(expected: &[u8], actual: &[u8], json: bool) -> bool {
    if json {
        let parse = |b: &[u8]| serde_json::from_slice::<serde_json::Value>(b).ok();
        match (parse(expected), parse(actual)) {
            (Some(e), Some(a)) => e == a,
            _ => false,
        }
    } else {
        expected == actual
    }
}

pub(crate) async fn timed<F, T>(fut: F) -> (T, Duration)
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    (out, start.elapsed())
}

/// Expect `key` to hold `expected`; record the outcome under `case`.
async fn verify_get(
    store: &dyn StateStore,
    report: &mut ComponentReport,
    case: String,
    key: &str,
    expected: &[u8],
    json: bool,
    limit_ms: Option<u64>,
) {
    let (result, elapsed) = timed(store.get(&GetRequest::new(key))).await;
    match result {
        Err(err) => report.fail(case, err.to_string(), elapsed),
        Ok(resp) => match resp.data {
            None => report.fail(case, format!("key '{}' not found", key), elapsed),
            Some(data) if !values_match(expected, &data, json) => report.fail(
                case,
                format!("value mismatch for '{}': expected {:?}, got {:?}", key, expected, data),
                elapsed,
            ),
            Some(_) => {
                report.check_duration(case, elapsed, limit_ms);
            }
        },
    }
}

/// Expect `key` to be absent; record the outcome under `case`.
async fn verify_absent(
    store: &dyn StateStore,
    report: &mut ComponentReport,
    case: String,
    key: &str,
) {
    let (result, elapsed) = timed(store.get(&GetRequest::new(key))).await;
    match result {
        Err(err) => report.fail(case, err.to_string(), elapsed),
        Ok(resp) if resp.is_found() => {
            report.fail(case, format!("key '{}' still present after delete", key), elapsed)
        }
        Ok(_) => report.pass(case, elapsed),
    }
}

/// Seed data for a phase whose producing phase is disabled.
async fn seed(store: &dyn StateStore, reqs: &[SetRequest]) -> Result<(), StateError> {
    debug!(count = reqs.len(), "seeding keys");
    for req in reqs {
        store.set(req).await?;
    }
    Ok(())
}

/// Run every enabled state operation against an initialized store.
pub async fn run_state_suite(
    store: &dyn StateStore,
    component: &ComponentConfig,
    run_id: &str,
    report: &mut ComponentReport,
) {
    let cfg = &component.config;
    let scenarios = scenarios(&cfg.key_prefix, run_id);
    let scenario_sets: Vec<SetRequest> = scenarios
        .iter()
        .map(|s| SetRequest::new(s.key.clone(), s.value.clone()))
        .collect();
    let mut written: Vec<String> = Vec::new();

    info!(component = %component.component, run_id, "running state suite");

    if component.enabled(Operation::Set) {
        for (scenario, req) in scenarios.iter().zip(&scenario_sets) {
            let (result, elapsed) = timed(store.set(req)).await;
            report.record(format!("set/{}", scenario.name), &result, elapsed, cfg.max_set_duration_in_ms);
            written.push(req.key.clone());
        }
    }

    if component.enabled(Operation::Get) {
        let seeded = component.enabled(Operation::Set) || {
            written.extend(scenario_sets.iter().map(|r| r.key.clone()));
            match seed(store, &scenario_sets).await {
                Ok(()) => true,
                Err(err) => {
                    report.fail("get", format!("seeding failed: {}", err), Duration::ZERO);
                    false
                }
            }
        };
        if seeded {
            for scenario in &scenarios {
                verify_get(
                    store,
                    report,
                    format!("get/{}", scenario.name),
                    &scenario.key,
                    &scenario.value,
                    scenario.json,
                    cfg.max_get_duration_in_ms,
                )
                .await;
            }
        }
    }

    if component.enabled(Operation::Delete) {
        let seeded = if component.enabled(Operation::Set) || component.enabled(Operation::Get) {
            true
        } else {
            written.extend(scenario_sets.iter().map(|r| r.key.clone()));
            match seed(store, &scenario_sets).await {
                Ok(()) => true,
                Err(err) => {
                    report.fail("delete", format!("seeding failed: {}", err), Duration::ZERO);
                    false
                }
            }
        };
        if seeded {
            for scenario in &scenarios {
                let (result, elapsed) = timed(store.delete(&DeleteRequest::new(scenario.key.clone()))).await;
                let case = format!("delete/{}", scenario.name);
                if report.record(case.clone(), &result, elapsed, cfg.max_delete_duration_in_ms) {
                    verify_absent(store, report, format!("{}/verify", case), &scenario.key).await;
                }
            }
            // A missing key must delete cleanly too.
            let missing = format!("{}-{}-never-written", cfg.key_prefix, run_id);
            let (result, elapsed) = timed(store.delete(&DeleteRequest::new(missing))).await;
            report.record("delete/missing-key", &result, elapsed, cfg.max_delete_duration_in_ms);
        }
    }

    let bulk_sets: Vec<SetRequest> = (0..cfg.num_bulk_requests)
        .map(|i| {
            SetRequest::new(
                format!("{}-{}-bulk-{}", cfg.key_prefix, run_id, i),
                format!("bulk value {}", i),
            )
        })
        .collect();

    if component.enabled(Operation::BulkSet) {
        let (result, elapsed) = timed(store.bulk_set(&bulk_sets)).await;
        written.extend(bulk_sets.iter().map(|r| r.key.clone()));
        if report.record("bulkset", &result, elapsed, cfg.max_bulk_set_duration_in_ms) {
            for (i, req) in bulk_sets.iter().enumerate() {
                verify_get(store, report, format!("bulkset/verify-{}", i), &req.key, &req.value, false, None)
                    .await;
            }
        }
    }

    if component.enabled(Operation::BulkDelete) {
        let seeded = component.enabled(Operation::BulkSet) || {
            written.extend(bulk_sets.iter().map(|r| r.key.clone()));
            match store.bulk_set(&bulk_sets).await {
                Ok(()) => true,
                Err(err) => {
                    report.fail("bulkdelete", format!("seeding failed: {}", err), Duration::ZERO);
                    false
                }
            }
        };
        if seeded {
            let deletes: Vec<DeleteRequest> = bulk_sets
                .iter()
                .map(|r| DeleteRequest::new(r.key.clone()))
                .collect();
            let (result, elapsed) = timed(store.bulk_delete(&deletes)).await;
            if report.record("bulkdelete", &result, elapsed, cfg.max_bulk_delete_duration_in_ms) {
                for (i, req) in deletes.iter().enumerate() {
                    verify_absent(store, report, format!("bulkdelete/verify-{}", i), &req.key).await;
                }
            }
        }
    }

    if component.enabled(Operation::Etag) {
        if store.features().contains(&Feature::ETag) {
            let key = format!("{}-{}-etag", cfg.key_prefix, run_id);
            written.push(key.clone());
            run_etag_cases(store, &key, report).await;
        } else {
            report.skip("etag", format!("{} does not support etags", store.name()));
        }
    }

    cleanup(store, &written).await;
}

async fn run_etag_cases(store: &dyn StateStore, key: &str, report: &mut ComponentReport) {
    let start = Instant::now();
    let first_etag = async {
        store.set(&SetRequest::new(key, "v1")).await?;
        store.get(&GetRequest::new(key)).await
    }
    .await;
    let etag = match first_etag {
        Ok(resp) => match resp.etag {
            Some(etag) => etag,
            None => {
                report.fail("etag/read", "store advertises etags but returned none", start.elapsed());
                return;
            }
        },
        Err(err) => {
            report.fail("etag/read", err.to_string(), start.elapsed());
            return;
        }
    };
    report.pass("etag/read", start.elapsed());

    let stale = format!("{}-stale", etag);

    let (result, elapsed) = timed(store.set(&SetRequest::new(key, "v2").with_etag(stale.clone()))).await;
    expect_mismatch(report, "etag/set-mismatch", result, elapsed);

    let (result, elapsed) = timed(store.set(&SetRequest::new(key, "v2").with_etag(etag.clone()))).await;
    if !report.record("etag/set-match", &result, elapsed, None) {
        return;
    }

    let (result, elapsed) = timed(store.get(&GetRequest::new(key))).await;
    let current = match result {
        Ok(resp) if resp.data.as_deref() == Some(&b"v2"[..]) && resp.etag.as_ref() != Some(&etag) => {
            report.pass("etag/updated", elapsed);
            resp.etag
        }
        Ok(resp) => {
            report.fail(
                "etag/updated",
                format!("expected new value and etag, got etag {:?}", resp.etag),
                elapsed,
            );
            return;
        }
        Err(err) => {
            report.fail("etag/updated", err.to_string(), elapsed);
            return;
        }
    };

    let (result, elapsed) = timed(store.delete(&DeleteRequest::new(key).with_etag(etag))).await;
    expect_mismatch(report, "etag/delete-mismatch", result, elapsed);

    let mut delete = DeleteRequest::new(key);
    delete.etag = current;
    let (result, elapsed) = timed(store.delete(&delete)).await;
    report.record("etag/delete-match", &result, elapsed, None);
}

fn expect_mismatch(report: &mut ComponentReport, case: &str, result: Result<(), StateError>, elapsed: Duration) {
    match result {
        Err(err) if err.is_etag_mismatch() => report.pass(case, elapsed),
        Err(err) => report.fail(case, format!("expected etag mismatch, got: {}", err), elapsed),
        Ok(()) => report.fail(case, "write with a stale etag succeeded", elapsed),
    }
}

/// Best-effort removal of everything the suite wrote.
async fn cleanup(store: &dyn StateStore, keys: &[String]) {
    for key in keys {
        if let Err(err) = store.delete(&DeleteRequest::new(key.clone())).await {
            debug!(key = %key, error = %err, "cleanup delete failed");
        }
    }
}
