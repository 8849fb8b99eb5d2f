use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::EngineConfig;
use crate::error::{EngineError, ParseFailure};
use crate::rules::registry::RuleRegistry;
use crate::semantics::ResolvedFile;
use crate::session::FileSession;
use crate::types::finding::FileAnalysis;

/// The rule engine.
///
/// Thread-safe and designed for concurrent use: configuration and rules can
/// be hot-swapped via `ArcSwap`, and each call to [`Engine::analyze`] owns
/// all of its per-file state, so independent files can be analyzed from
/// independent threads without locking.
///
/// # Usage
///
/// ```rust,ignore
/// use kalyze::engine::Engine;
///
/// let engine = Engine::with_default_config();
///
/// // Analyze with all built-in rules
/// let analysis = engine.analyze(&file);
///
/// // Or analyze with specific rule IDs
/// let analysis = engine.analyze_with_rules(&file, &rule_ids);
/// ```
pub struct Engine {
    pub config: ArcSwap<EngineConfig>,
    pub rule_registry: ArcSwap<RuleRegistry>,
}

impl Engine {
    /// Create a new engine with the given configuration and rules.
    pub fn new(config: EngineConfig, rule_registry: RuleRegistry) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            rule_registry: ArcSwap::from_pointee(rule_registry),
        }
    }

    /// Convenience constructor with default configuration and built-in rules.
    pub fn with_default_config() -> Self {
        Self::new(EngineConfig::default(), RuleRegistry::with_builtin_rules())
    }

    /// Convenience constructor with default config and an empty registry.
    ///
    /// Useful for testing when you want to register rules manually.
    pub fn with_empty_registry() -> Self {
        Self::new(EngineConfig::default(), RuleRegistry::new())
    }

    /// Main entry point: run every registered rule over one resolved file.
    ///
    /// One file in, one analysis out; the engine is stateless between calls
    /// and all traversal state lives inside the call.
    pub fn analyze(&self, file: &ResolvedFile) -> FileAnalysis {
        let config = self.config.load_full();
        let registry = self.rule_registry.load_full();
        let analysis = FileSession::new(&registry).run(file, &config);
        tracing::debug!(
            path = %file.path,
            issues = analysis.issues.len(),
            rule_failures = analysis.rule_failures.len(),
            "file analysis complete"
        );
        analysis
    }

    /// Analyze with a specific set of rules (by ID).
    ///
    /// Rules not found in the registry are silently ignored.
    pub fn analyze_with_rules(&self, file: &ResolvedFile, rule_ids: &[String]) -> FileAnalysis {
        let config = self.config.load_full();
        let full_registry = self.rule_registry.load_full();
        let filtered_registry = full_registry.filter_by_ids(rule_ids);
        FileSession::new(&filtered_registry).run(file, &config)
    }

    /// Adapter entry for hosts that feed the frontend's parse result straight
    /// in. A parse failure excludes the file from the report and is returned
    /// to the host; it is never retried here.
    pub fn try_analyze(
        &self,
        parsed: Result<ResolvedFile, ParseFailure>,
    ) -> Result<FileAnalysis, EngineError> {
        match parsed {
            Ok(file) => Ok(self.analyze(&file)),
            Err(failure) => {
                tracing::error!(path = %failure.path, "frontend parse failure: {failure}");
                Err(EngineError::Parse(failure))
            }
        }
    }

    /// Get the rule registry.
    pub fn rules(&self) -> arc_swap::Guard<Arc<RuleRegistry>> {
        self.rule_registry.load()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use crate::semantics::{CalleeSignature, ResolvedCall, SemanticModel};

    fn empty_file() -> ResolvedFile {
        ResolvedFile::new("Empty.kt", AstBuilder::new().build(), SemanticModel::new())
    }

    fn discarded_delete_file() -> ResolvedFile {
        let mut b = AstBuilder::new();
        let receiver = b.name_ref("file");
        let delete = b.call("delete", Some(receiver), vec![], None);
        b.add_item(delete);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_resolved_call(
            delete,
            ResolvedCall::new(CalleeSignature::function(
                "java.io.File",
                "delete",
                vec![],
                "kotlin.Boolean",
            )),
        );
        ResolvedFile::new("Files.kt", ast, model)
    }

    // ==================== Constructor Tests ====================

    #[test]
    fn test_engine_new_with_custom_config() {
        let config = EngineConfig {
            max_parent_hops: 32,
        };
        let engine = Engine::new(config, RuleRegistry::new());

        let loaded_config = engine.config.load();
        assert_eq!(loaded_config.max_parent_hops, 32);
    }

    #[test]
    fn test_engine_with_default_config() {
        let engine = Engine::with_default_config();

        let loaded_config = engine.config.load();
        assert_eq!(loaded_config.max_parent_hops, 25);
        assert!(!engine.rules().is_empty());
    }

    #[test]
    fn test_engine_with_empty_registry() {
        let engine = Engine::with_empty_registry();
        assert!(engine.rules().is_empty());
    }

    // ==================== Hot-Swap Tests ====================

    #[test]
    fn test_engine_config_is_arc_swappable() {
        let engine = Engine::with_default_config();

        let config1 = engine.config.load();
        assert_eq!(config1.max_parent_hops, 25);

        engine.config.store(Arc::new(EngineConfig {
            max_parent_hops: 64,
        }));

        let config2 = engine.config.load();
        assert_eq!(config2.max_parent_hops, 64);
    }

    #[test]
    fn test_engine_rule_registry_is_arc_swappable() {
        let engine = Engine::with_default_config();
        assert!(!engine.rules().is_empty());

        engine.rule_registry.store(Arc::new(RuleRegistry::new()));
        assert!(engine.rules().is_empty());
    }

    // ==================== Analysis Tests ====================

    #[test]
    fn analyze_empty_file_yields_no_issues() {
        let engine = Engine::with_default_config();
        let analysis = engine.analyze(&empty_file());
        assert!(analysis.issues.is_empty());
        assert!(analysis.rule_failures.is_empty());
    }

    #[test]
    fn analyze_runs_builtin_rules() {
        let engine = Engine::with_default_config();
        let analysis = engine.analyze(&discarded_delete_file());

        assert_eq!(analysis.issues.len(), 1);
        assert_eq!(analysis.issues[0].rule_id, "kotlin.ignored-operation-status");
    }

    #[test]
    fn analyze_with_rules_filters_the_registry() {
        let engine = Engine::with_default_config();
        let file = discarded_delete_file();

        let with_rule =
            engine.analyze_with_rules(&file, &["kotlin.ignored-operation-status".to_string()]);
        assert_eq!(with_rule.issues.len(), 1);

        let without_rule =
            engine.analyze_with_rules(&file, &["kotlin.unpredictable-seed".to_string()]);
        assert!(without_rule.issues.is_empty());
    }

    #[test]
    fn try_analyze_propagates_parse_failures() {
        let engine = Engine::with_default_config();
        let failure = ParseFailure::new("Broken.kt", 3, 1, "unexpected token");

        let result = engine.try_analyze(Err(failure));
        assert!(matches!(result, Err(EngineError::Parse(_))));
    }

    #[test]
    fn try_analyze_passes_through_good_files() {
        let engine = Engine::with_default_config();
        let result = engine.try_analyze(Ok(discarded_delete_file()));
        assert_eq!(result.unwrap().issues.len(), 1);
    }
}
