use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::TextRange;

/// Top-level error type exposed by the engine.
///
/// Only frontend parse failures are fatal for a file; rule failures are
/// recorded per analysis (see [`RuleFailure`]) so partial results survive.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parse failure: {0}")]
    Parse(#[from] ParseFailure),

    /// "Catch-all" for unexpected internal failures.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Structured failure from the AST/resolution provider.
///
/// The frontend adapter builds one of these when it cannot produce a resolved
/// tree for a file; the file is then excluded from the report and never
/// retried by the engine.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("failed to parse {path} at {line}:{column}: {message}")]
pub struct ParseFailure {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseFailure {
    pub fn new(path: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// A rule callback that errored during one file's traversal.
///
/// Recorded at the dispatcher boundary and carried in the analysis result;
/// the traversal and all other rules continue unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<TextRange>,
    pub message: String,
}
