use serde::{Deserialize, Serialize};

use crate::ast::TextRange;
use crate::error::RuleFailure;

/// An auxiliary source position attached to an issue, used to explain why it
/// was raised (e.g. the immutable declarations a predicted value flowed
/// through).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryLocation {
    pub location: TextRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SecondaryLocation {
    pub fn new(location: TextRange, message: Option<String>) -> Self {
        Self { location, message }
    }
}

/// One finding reported by a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// The ID of the rule that produced this.
    pub rule_id: String,

    /// Primary location of the finding.
    pub location: TextRange,

    /// A human-readable message.
    pub message: String,

    /// Ordered supporting locations.
    #[serde(default)]
    pub secondary_locations: Vec<SecondaryLocation>,
}

/// Result of analyzing one file: issues in traversal order, plus any rule
/// callbacks that failed along the way. Partial results are always kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub rule_failures: Vec<RuleFailure>,
}

impl FileAnalysis {
    /// Issues produced by one rule, in traversal order.
    pub fn issues_for(&self, rule_id: &str) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.rule_id == rule_id)
            .collect()
    }
}
