use std::collections::HashSet;
use std::sync::Arc;

use crate::rules::ignored_operation_status::IgnoredOperationStatusRule;
use crate::rules::structured_concurrency::StructuredConcurrencyRule;
use crate::rules::unpredictable_seed::UnpredictableSeedRule;
use crate::rules::CallRule;

#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn CallRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register(&mut self, rule: Arc<dyn CallRule>) {
        self.rules.push(rule);
    }

    pub fn all(&self) -> &[Arc<dyn CallRule>] {
        &self.rules
    }

    /// Get a rule by ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn CallRule>> {
        self.rules.iter().find(|r| r.id() == id).cloned()
    }

    /// Check if a rule exists.
    pub fn contains(&self, id: &str) -> bool {
        self.rules.iter().any(|r| r.id() == id)
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Create a new registry containing only rules with the given IDs.
    ///
    /// Rules not found are silently ignored.
    pub fn filter_by_ids(&self, ids: &[String]) -> Self {
        let id_set: HashSet<&str> = ids.iter().map(|s| s.as_str()).collect();
        let filtered_rules: Vec<Arc<dyn CallRule>> = self
            .rules
            .iter()
            .filter(|r| id_set.contains(r.id()))
            .cloned()
            .collect();

        Self {
            rules: filtered_rules,
        }
    }

    /// Convenience factory to build a registry with built-in rules.
    pub fn with_builtin_rules() -> Self {
        let mut registry = RuleRegistry::new();

        // Security rules
        registry.register(Arc::new(UnpredictableSeedRule::new()));

        // Coroutine rules
        registry.register(Arc::new(StructuredConcurrencyRule::new()));

        // Reliability rules
        registry.register(Arc::new(IgnoredOperationStatusRule::new()));

        registry
    }
}
