//! Per-file dispatch: one traversal, many rules.
//!
//! A [`FileSession`] indexes the registered rules' matchers by resolved owner
//! once, then walks the file's tree depth-first. Each call-site is resolved a
//! single time and only the rules whose matchers can possibly accept that
//! owner are consulted, so dispatch cost does not scale with the product of
//! rules and call-sites. Rule callbacks are isolated: a failing callback is
//! recorded and the traversal continues with the remaining rules and nodes.

use std::collections::HashMap;

use crate::ast::NodeKind;
use crate::config::EngineConfig;
use crate::rules::registry::RuleRegistry;
use crate::semantics::{CalleeKind, CalleeSignature, ResolvedFile};
use crate::types::context::FileContext;
use crate::types::finding::FileAnalysis;

/// Index key: owner qualifier plus simple name. Constructors use a sentinel
/// name since the name concept does not apply to them.
type IndexKey = (String, String);

const CONSTRUCTOR_NAME: &str = "<init>";

/// Dispatcher for one file's traversal over a fixed rule set.
pub struct FileSession<'a> {
    registry: &'a RuleRegistry,
    /// Rule indices by (qualifier, name).
    by_owner_and_name: HashMap<IndexKey, Vec<usize>>,
    /// Rule indices for function matchers that accept any name, by qualifier.
    any_name_by_owner: HashMap<String, Vec<usize>>,
}

impl<'a> FileSession<'a> {
    pub fn new(registry: &'a RuleRegistry) -> Self {
        let mut by_owner_and_name: HashMap<IndexKey, Vec<usize>> = HashMap::new();
        let mut any_name_by_owner: HashMap<String, Vec<usize>> = HashMap::new();

        for (rule_index, rule) in registry.all().iter().enumerate() {
            for matcher in rule.matchers() {
                let qualifier = matcher.qualifier().to_string();
                match matcher.callee_kind() {
                    CalleeKind::Constructor => {
                        by_owner_and_name
                            .entry((qualifier, CONSTRUCTOR_NAME.to_string()))
                            .or_default()
                            .push(rule_index);
                    }
                    CalleeKind::Function if matcher.accepted_names().is_empty() => {
                        any_name_by_owner.entry(qualifier).or_default().push(rule_index);
                    }
                    CalleeKind::Function => {
                        for name in matcher.accepted_names() {
                            by_owner_and_name
                                .entry((qualifier.clone(), name.clone()))
                                .or_default()
                                .push(rule_index);
                        }
                    }
                }
            }
        }

        Self {
            registry,
            by_owner_and_name,
            any_name_by_owner,
        }
    }

    /// Rules that may accept a call with this signature, in registration
    /// order, each at most once. Candidates still run the full matcher check
    /// before their callback fires.
    fn candidate_rules(&self, signature: &CalleeSignature) -> Vec<usize> {
        let key = match signature.kind {
            CalleeKind::Constructor => {
                (signature.qualifier.clone(), CONSTRUCTOR_NAME.to_string())
            }
            CalleeKind::Function => (signature.qualifier.clone(), signature.name.clone()),
        };
        let mut candidates: Vec<usize> = self
            .by_owner_and_name
            .get(&key)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        if signature.kind == CalleeKind::Function {
            if let Some(open) = self.any_name_by_owner.get(&signature.qualifier) {
                candidates.extend(open.iter().copied());
            }
        }
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// Run every registered rule over the file in one depth-first traversal.
    pub fn run(&self, file: &ResolvedFile, config: &EngineConfig) -> FileAnalysis {
        let mut ctx = FileContext::new(file, config);
        let rules = self.registry.all();

        for node in file.ast.descendants(file.ast.root()) {
            if !matches!(file.ast.kind(node), NodeKind::Call { .. }) {
                continue;
            }
            // Unresolved call-sites are skipped entirely: no matcher can
            // accept them.
            let Some(resolved) = file.model.resolved_call(node) else {
                continue;
            };
            for rule_index in self.candidate_rules(&resolved.signature) {
                let rule = &rules[rule_index];
                if !rule
                    .matchers()
                    .iter()
                    .any(|m| m.matches(&resolved.signature))
                {
                    continue;
                }
                if let Err(error) = rule.visit_call(node, resolved, &mut ctx) {
                    tracing::warn!(
                        rule_id = rule.id(),
                        path = %file.path,
                        "rule callback failed: {error:#}"
                    );
                    ctx.record_rule_failure(rule.id(), Some(file.ast.range(node)), &error);
                }
            }
        }

        ctx.finish()
    }
}
