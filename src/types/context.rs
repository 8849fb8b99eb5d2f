//! Per-file analysis context shared by all rules during one traversal.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::ast::{Ast, NodeId, TextRange};
use crate::config::EngineConfig;
use crate::error::RuleFailure;
use crate::predict::ValuePredictor;
use crate::semantics::{ResolvedFile, SemanticModel};
use crate::types::finding::{FileAnalysis, Issue, SecondaryLocation};

/// Cache of compiled regexes, scoped to one file's analysis.
///
/// Shared by all rules within one traversal and dropped with the context
/// when the file's analysis ends.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: HashMap<String, Arc<Regex>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&mut self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        if let Some(regex) = self.compiled.get(pattern) {
            return Ok(Arc::clone(regex));
        }
        let regex = Arc::new(Regex::new(pattern)?);
        self.compiled.insert(pattern.to_string(), Arc::clone(&regex));
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Context handed to rule callbacks: read access to the resolved file, the
/// issue sink, and the per-file regex cache. Exclusively owned by one file's
/// analysis; nothing here is shared across files.
pub struct FileContext<'a> {
    file: &'a ResolvedFile,
    config: &'a EngineConfig,
    pub regex_cache: RegexCache,
    issues: Vec<Issue>,
    rule_failures: Vec<RuleFailure>,
}

impl<'a> FileContext<'a> {
    pub fn new(file: &'a ResolvedFile, config: &'a EngineConfig) -> Self {
        Self {
            file,
            config,
            regex_cache: RegexCache::new(),
            issues: Vec::new(),
            rule_failures: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.file.path
    }

    pub fn ast(&self) -> &'a Ast {
        &self.file.ast
    }

    pub fn model(&self) -> &'a SemanticModel {
        &self.file.model
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Value predictor over this file's tree and resolution data.
    pub fn predictor(&self) -> ValuePredictor<'a> {
        ValuePredictor::new(&self.file.ast, &self.file.model, self.config.max_parent_hops)
    }

    /// Secondary location pointing at a node.
    pub fn secondary_of(&self, node: NodeId, message: Option<String>) -> SecondaryLocation {
        SecondaryLocation::new(self.file.ast.range(node), message)
    }

    /// Append an issue at `node`. Issues keep traversal order and are never
    /// deduplicated or retracted within a file pass.
    ///
    /// Reporting is skipped when a recoverable frontend diagnostic overlaps
    /// the node: type information there is incomplete and the finding would
    /// likely be a false positive.
    pub fn report_issue(
        &mut self,
        rule_id: &str,
        node: NodeId,
        message: impl Into<String>,
        secondary_locations: Vec<SecondaryLocation>,
    ) {
        let location = self.file.ast.range(node);
        if self.file.model.has_recoverable_diagnostic_at(&location) {
            tracing::debug!(
                rule_id,
                path = %self.file.path,
                line = location.start_line,
                "issue suppressed by recoverable frontend diagnostic"
            );
            return;
        }
        self.issues.push(Issue {
            rule_id: rule_id.to_string(),
            location,
            message: message.into(),
            secondary_locations,
        });
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub(crate) fn record_rule_failure(
        &mut self,
        rule_id: &str,
        location: Option<TextRange>,
        error: &anyhow::Error,
    ) {
        self.rule_failures.push(RuleFailure {
            rule_id: rule_id.to_string(),
            location,
            message: format!("{error:#}"),
        });
    }

    pub(crate) fn finish(self) -> FileAnalysis {
        FileAnalysis {
            path: self.file.path.clone(),
            issues: self.issues,
            rule_failures: self.rule_failures,
        }
    }
}
