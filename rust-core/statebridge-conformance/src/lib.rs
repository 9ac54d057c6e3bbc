// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! statebridge conformance runner.
//!
//! Loads a YAML test plan, builds each listed component from a
//! [`ComponentRegistry`], and checks it against the behaviour every
//! component of that type must share:
//!
//! - [`config`] -- Test plan model, validation and `${{ENV}}` substitution.
//! - [`registry`] -- Component names to constructors.
//! - [`state_suite`] / [`pubsub_suite`] -- Built-in suites.
//! - [`steps`] -- Declarative per-component steps.
//! - [`runner`] -- Drives a plan and produces a [`Report`].
//!
//! ```rust,no_run
//! use statebridge_conformance::{ComponentRegistry, Runner, TestConfiguration};
//!
//! # tokio_test::block_on(async {
//! let plan = TestConfiguration::load("conformance/config/state/tests.yml").unwrap();
//! let report = Runner::new(ComponentRegistry::with_defaults()).run(&plan).await;
//! for failure in report.failures() {
//!     eprintln!("{}", failure);
//! }
//! # });
//! ```

pub mod config;
pub mod error;
pub mod pubsub_suite;
pub mod registry;
pub mod report;
pub mod runner;
pub mod state_suite;
pub mod steps;

pub use config::{ComponentConfig, ComponentType, Operation, SuiteConfig, TestConfiguration};
pub use error::ConformanceError;
pub use registry::ComponentRegistry;
pub use report::{CaseResult, ComponentReport, Outcome, Report};
pub use runner::Runner;

/// Load the plan at `path` and run it with the default registry.
///
/// Returns one error per failed case; an empty list means the run passed.
pub async fn run_plan(path: impl AsRef<std::path::Path>) -> Result<Vec<ConformanceError>, ConformanceError> {
    let plan = TestConfiguration::load(path)?;
    let report = Runner::new(ComponentRegistry::with_defaults()).run(&plan).await;
    Ok(report.failures())
}
