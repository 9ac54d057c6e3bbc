// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Conformance runner error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a test plan or reported by a run.
#[derive(Debug, Error)]
pub enum ConformanceError {
    /// The test plan file could not be read.
    #[error("failed to read test configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The test plan is not valid YAML for the expected schema.
    #[error("failed to parse test configuration: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// The test plan parsed but is semantically invalid.
    #[error("invalid test configuration: {0}")]
    Config(String),

    /// No factory is registered under the requested component name.
    #[error("unknown {kind} component '{name}'")]
    UnknownComponent { kind: &'static str, name: String },

    /// A `${{NAME}}` reference in metadata names an unset variable.
    #[error("environment variable '{0}' referenced in metadata is not set")]
    MissingEnv(String),

    /// A conformance case did not pass.
    #[error("{component}: {case} failed: {message}")]
    CaseFailed {
        component: String,
        case: String,
        message: String,
    },
}
