//! Detects predictable seeds handed to `java.security.SecureRandom`.
//!
//! A seed whose value can be statically predicted (a constant number, or a
//! byte array built from a constant string) defeats the point of a
//! cryptographically strong generator. The rule follows the seed argument
//! through immutable bindings and reports the chain of declarations it
//! crossed as secondary locations, so the origin of the predictable value is
//! visible in the finding.

use crate::ast::{NodeId, NodeKind};
use crate::matcher::{ArgumentSpec, FunMatcher};
use crate::rules::CallRule;
use crate::semantics::ResolvedCall;
use crate::types::context::FileContext;
use crate::types::finding::SecondaryLocation;

const MESSAGE: &str = "Change this seed value to something unpredictable, or remove the seed.";

const SECURE_RANDOM: &str = "java.security.SecureRandom";
const BYTE_ARRAY: &str = "kotlin.ByteArray";

/// `toByteArray` is the stdlib string-to-bytes conversion; a seed built from
/// it is predictable exactly when the receiver string is.
const STRING_TO_BYTE_ARRAY_QUALIFIER: &str = "kotlin.text";

#[derive(Debug)]
pub struct UnpredictableSeedRule {
    matchers: Vec<FunMatcher>,
    byte_array_size_ctor: FunMatcher,
    secure_random_funs: FunMatcher,
}

impl UnpredictableSeedRule {
    pub fn new() -> Self {
        Self {
            matchers: vec![
                FunMatcher::new(SECURE_RANDOM)
                    .name("setSeed")
                    .with_arguments([ArgumentSpec::Any]),
                FunMatcher::constructor(SECURE_RANDOM).with_arguments([ArgumentSpec::Any]),
            ],
            byte_array_size_ctor: FunMatcher::constructor(BYTE_ARRAY)
                .with_argument_types(["kotlin.Int"]),
            secure_random_funs: FunMatcher::new(SECURE_RANDOM),
        }
    }

    /// Whether the predicted seed expression has a statically known value.
    /// Declarations crossed while deciding are appended to `declarations`.
    fn is_predictable(
        &self,
        seed: NodeId,
        ctx: &FileContext<'_>,
        declarations: &mut Vec<NodeId>,
    ) -> bool {
        let predictor = ctx.predictor();
        let predicted = predictor.predict_value_with_declarations(seed, declarations);

        match ctx.ast().kind(predicted) {
            NodeKind::IntLiteral { .. } => true,
            NodeKind::Call { .. } => {
                self.is_bytes_from_predictable_string(predicted, ctx, declarations)
                    || self.is_zero_filled_byte_array(predicted, seed, ctx)
            }
            _ => predictor.predict_int_value(predicted).is_some(),
        }
    }

    /// `ByteArray(n)` stays all-zero until something writes into it. The
    /// seed is predictable when no usage of the binding before the seed
    /// reference hands it to a secure-random function.
    fn is_zero_filled_byte_array(&self, ctor: NodeId, seed: NodeId, ctx: &FileContext<'_>) -> bool {
        self.byte_array_size_ctor.matches_call(ctx.model(), ctor)
            && self.is_initialized_predictably(seed, ctor, ctx)
    }

    /// An inline seed expression is always in its initial state. A seed
    /// reference is predictable unless a prior usage in its block was fed to
    /// a `SecureRandom` function that could have filled the array.
    fn is_initialized_predictably(
        &self,
        seed: NodeId,
        search_start: NodeId,
        ctx: &FileContext<'_>,
    ) -> bool {
        if !matches!(ctx.ast().kind(seed), NodeKind::NameRef { .. }) {
            return true;
        }
        !self
            .find_previous_usages(seed, search_start, ctx)
            .into_iter()
            .any(|usage| self.is_secure_random_write(usage, ctx))
    }

    /// References to the same binding as `seed_ref`, inside the block
    /// enclosing `search_start`, in source order, stopping at the seed
    /// reference itself. Usages after the seed cannot have filled it.
    fn find_previous_usages(
        &self,
        seed_ref: NodeId,
        search_start: NodeId,
        ctx: &FileContext<'_>,
    ) -> Vec<NodeId> {
        let ast = ctx.ast();
        let Some(target) = ctx.model().reference_target(seed_ref) else {
            return Vec::new();
        };
        let scope = std::iter::once(search_start)
            .chain(ast.ancestors(search_start))
            .find(|&node| matches!(ast.kind(node), NodeKind::Block { .. }))
            .unwrap_or(ast.root());
        let mut usages = Vec::new();
        for node in ast.descendants(scope) {
            if node == seed_ref {
                break;
            }
            if matches!(ast.kind(node), NodeKind::NameRef { .. })
                && ctx.model().reference_target(node) == Some(target)
            {
                usages.push(node);
            }
        }
        usages
    }

    /// Whether the usage sits inside a call resolved to `SecureRandom`,
    /// e.g. `random.nextBytes(bytes)`. Other calls do not count as fills.
    fn is_secure_random_write(&self, usage: NodeId, ctx: &FileContext<'_>) -> bool {
        ctx.ast()
            .enclosing_call(usage)
            .is_some_and(|call| self.secure_random_funs.matches_call(ctx.model(), call))
    }

    /// `"...".toByteArray()` (or a reference chain ending there) with a
    /// statically known receiver string.
    fn is_bytes_from_predictable_string(
        &self,
        call: NodeId,
        ctx: &FileContext<'_>,
        declarations: &mut Vec<NodeId>,
    ) -> bool {
        let Some(resolved) = ctx.model().resolved_call(call) else {
            return false;
        };
        if resolved.signature.qualifier != STRING_TO_BYTE_ARRAY_QUALIFIER
            || resolved.signature.name != "toByteArray"
        {
            return false;
        }
        let predictor = ctx.predictor();
        predictor
            .predict_receiver(call)
            .and_then(|receiver| {
                predictor.predict_string_value_with_declarations(receiver, declarations)
            })
            .is_some()
    }
}

impl Default for UnpredictableSeedRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRule for UnpredictableSeedRule {
    fn id(&self) -> &'static str {
        "kotlin.unpredictable-seed"
    }

    fn name(&self) -> &'static str {
        "Unpredictable SecureRandom Seed"
    }

    fn matchers(&self) -> &[FunMatcher] {
        &self.matchers
    }

    fn visit_call(
        &self,
        call: NodeId,
        _resolved: &ResolvedCall,
        ctx: &mut FileContext<'_>,
    ) -> anyhow::Result<()> {
        let seed = match ctx.ast().kind(call) {
            NodeKind::Call { args, .. } => match args.first() {
                Some(&seed) => seed,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        let mut declarations = Vec::new();
        if self.is_predictable(seed, ctx, &mut declarations) {
            let secondaries: Vec<SecondaryLocation> = declarations
                .into_iter()
                .map(|decl| ctx.secondary_of(decl, None))
                .collect();
            ctx.report_issue(self.id(), seed, MESSAGE, secondaries);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use crate::config::EngineConfig;
    use crate::semantics::{CalleeSignature, ResolvedFile, SemanticModel};

    fn run_rule(file: &ResolvedFile, call: NodeId) -> crate::types::finding::FileAnalysis {
        let config = EngineConfig::default();
        let mut ctx = FileContext::new(file, &config);
        let rule = UnpredictableSeedRule::new();
        let resolved = file.model.resolved_call(call).cloned().unwrap();
        rule.visit_call(call, &resolved, &mut ctx).unwrap();
        ctx.finish()
    }

    fn set_seed_signature() -> CalleeSignature {
        CalleeSignature::function(
            SECURE_RANDOM,
            "setSeed",
            vec!["kotlin.ByteArray"],
            "kotlin.Unit",
        )
    }

    fn to_byte_array_signature() -> CalleeSignature {
        CalleeSignature::function("kotlin.text", "toByteArray", vec![], "kotlin.ByteArray")
    }

    // ==================== Reporting Tests ====================

    #[test]
    fn constant_string_bytes_seed_is_reported_with_declaration_chain() {
        // val seed = "abc"; random.setSeed(seed.toByteArray())
        let mut b = AstBuilder::new();
        let lit = b.string_lit("abc");
        let prop = b.val("seed", lit);
        let seed_ref = b.name_ref("seed");
        let bytes = b.call("toByteArray", Some(seed_ref), vec![], None);
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![bytes], None);
        b.add_item(prop);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_reference_target(seed_ref, prop);
        model.set_resolved_call(bytes, ResolvedCall::new(to_byte_array_signature()));
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let prop_range = ast.range(prop);
        let bytes_range = ast.range(bytes);
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert_eq!(analysis.issues.len(), 1);
        let issue = &analysis.issues[0];
        assert_eq!(issue.rule_id, "kotlin.unpredictable-seed");
        assert_eq!(issue.location, bytes_range);
        assert_eq!(
            issue.message,
            "Change this seed value to something unpredictable, or remove the seed."
        );
        assert_eq!(issue.secondary_locations.len(), 1);
        assert_eq!(issue.secondary_locations[0].location, prop_range);
    }

    #[test]
    fn constant_long_seed_is_reported() {
        // SecureRandom(42) style: setSeed(42)
        let mut b = AstBuilder::new();
        let lit = b.int_lit(42);
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![lit], None);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_resolved_call(
            set_seed,
            ResolvedCall::new(CalleeSignature::function(
                SECURE_RANDOM,
                "setSeed",
                vec!["kotlin.Long"],
                "kotlin.Unit",
            )),
        );
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert_eq!(analysis.issues.len(), 1);
    }

    #[test]
    fn constructor_with_constant_bytes_is_reported() {
        // SecureRandom("abc".toByteArray())
        let mut b = AstBuilder::new();
        let lit = b.string_lit("abc");
        let bytes = b.call("toByteArray", Some(lit), vec![], None);
        let ctor = b.call("SecureRandom", None, vec![bytes], None);
        b.add_item(ctor);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_resolved_call(bytes, ResolvedCall::new(to_byte_array_signature()));
        model.set_resolved_call(
            ctor,
            ResolvedCall::new(CalleeSignature::constructor(
                SECURE_RANDOM,
                vec!["kotlin.ByteArray"],
            )),
        );
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, ctor);
        assert_eq!(analysis.issues.len(), 1);
    }

    #[test]
    fn scoping_function_receiver_is_traced() {
        // val s = "abc"; s.let { random.setSeed(it.toByteArray()) }
        let mut b = AstBuilder::new();
        let lit = b.string_lit("abc");
        let prop = b.val("s", lit);
        let receiver = b.name_ref("s");
        let param = b.param("it");
        let it_ref = b.name_ref("it");
        let bytes = b.call("toByteArray", Some(it_ref), vec![], None);
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![bytes], None);
        let body = b.block(vec![set_seed]);
        let lambda = b.lambda(vec![param], Some(body));
        let let_call = b.call("let", Some(receiver), vec![], Some(lambda));
        b.add_item(prop);
        b.add_item(let_call);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_reference_target(receiver, prop);
        model.set_reference_target(it_ref, param);
        model.set_resolved_call(bytes, ResolvedCall::new(to_byte_array_signature()));
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert_eq!(analysis.issues.len(), 1);
        assert_eq!(analysis.issues[0].secondary_locations.len(), 1);
    }

    // ==================== Zero-Filled Byte Array Tests ====================

    fn byte_array_ctor_signature() -> CalleeSignature {
        CalleeSignature::constructor("kotlin.ByteArray", vec!["kotlin.Int"])
    }

    #[test]
    fn inline_zero_byte_array_seed_is_reported() {
        // random.setSeed(ByteArray(16))
        let mut b = AstBuilder::new();
        let size = b.int_lit(16);
        let ctor = b.call("ByteArray", None, vec![size], None);
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![ctor], None);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_resolved_call(ctor, ResolvedCall::new(byte_array_ctor_signature()));
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert_eq!(analysis.issues.len(), 1);
    }

    #[test]
    fn unfilled_byte_array_binding_is_reported() {
        // val bytes = ByteArray(16); random.setSeed(bytes)
        let mut b = AstBuilder::new();
        let size = b.int_lit(16);
        let ctor = b.call("ByteArray", None, vec![size], None);
        let prop = b.val("bytes", ctor);
        let reference = b.name_ref("bytes");
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![reference], None);
        b.add_item(prop);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_reference_target(reference, prop);
        model.set_resolved_call(ctor, ResolvedCall::new(byte_array_ctor_signature()));
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert_eq!(analysis.issues.len(), 1);
        assert_eq!(analysis.issues[0].secondary_locations.len(), 1);
    }

    fn next_bytes_signature() -> CalleeSignature {
        CalleeSignature::function(
            SECURE_RANDOM,
            "nextBytes",
            vec!["kotlin.ByteArray"],
            "kotlin.Unit",
        )
    }

    #[test]
    fn byte_array_filled_before_use_is_not_reported() {
        // val bytes = ByteArray(16); strongRandom.nextBytes(bytes); random.setSeed(bytes)
        let mut b = AstBuilder::new();
        let size = b.int_lit(16);
        let ctor = b.call("ByteArray", None, vec![size], None);
        let prop = b.val("bytes", ctor);
        let fill_arg = b.name_ref("bytes");
        let strong = b.name_ref("strongRandom");
        let fill = b.call("nextBytes", Some(strong), vec![fill_arg], None);
        let reference = b.name_ref("bytes");
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![reference], None);
        b.add_item(prop);
        b.add_item(fill);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_reference_target(fill_arg, prop);
        model.set_reference_target(reference, prop);
        model.set_resolved_call(ctor, ResolvedCall::new(byte_array_ctor_signature()));
        model.set_resolved_call(fill, ResolvedCall::new(next_bytes_signature()));
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn fill_after_the_seed_reference_is_still_reported() {
        // val bytes = ByteArray(16); random.setSeed(bytes); strongRandom.nextBytes(bytes)
        let mut b = AstBuilder::new();
        let size = b.int_lit(16);
        let ctor = b.call("ByteArray", None, vec![size], None);
        let prop = b.val("bytes", ctor);
        let reference = b.name_ref("bytes");
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![reference], None);
        let fill_arg = b.name_ref("bytes");
        let strong = b.name_ref("strongRandom");
        let fill = b.call("nextBytes", Some(strong), vec![fill_arg], None);
        b.add_item(prop);
        b.add_item(set_seed);
        b.add_item(fill);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_reference_target(reference, prop);
        model.set_reference_target(fill_arg, prop);
        model.set_resolved_call(ctor, ResolvedCall::new(byte_array_ctor_signature()));
        model.set_resolved_call(fill, ResolvedCall::new(next_bytes_signature()));
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        // The array is still all-zero at the point of the seed call.
        let analysis = run_rule(&file, set_seed);
        assert_eq!(analysis.issues.len(), 1);
    }

    #[test]
    fn prior_usage_outside_secure_random_is_still_reported() {
        // val bytes = ByteArray(16); println(bytes); random.setSeed(bytes)
        let mut b = AstBuilder::new();
        let size = b.int_lit(16);
        let ctor = b.call("ByteArray", None, vec![size], None);
        let prop = b.val("bytes", ctor);
        let print_arg = b.name_ref("bytes");
        let print = b.call("println", None, vec![print_arg], None);
        let reference = b.name_ref("bytes");
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![reference], None);
        b.add_item(prop);
        b.add_item(print);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_reference_target(print_arg, prop);
        model.set_reference_target(reference, prop);
        model.set_resolved_call(ctor, ResolvedCall::new(byte_array_ctor_signature()));
        model.set_resolved_call(
            print,
            ResolvedCall::new(CalleeSignature::function(
                "kotlin.io",
                "println",
                vec!["kotlin.Any"],
                "kotlin.Unit",
            )),
        );
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        // println cannot write into the array; it stays all-zero.
        let analysis = run_rule(&file, set_seed);
        assert_eq!(analysis.issues.len(), 1);
    }

    #[test]
    fn byte_array_ctor_with_init_lambda_is_not_reported() {
        // random.setSeed(ByteArray(16) { it.toByte() }) style: size-plus-init
        // overload, contents are not all-zero
        let mut b = AstBuilder::new();
        let size = b.int_lit(16);
        let ctor = b.call("ByteArray", None, vec![size], None);
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![ctor], None);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_resolved_call(
            ctor,
            ResolvedCall::new(CalleeSignature::constructor(
                "kotlin.ByteArray",
                vec!["kotlin.Int", "kotlin.Function1"],
            )),
        );
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert!(analysis.issues.is_empty());
    }

    // ==================== Non-Reporting Tests ====================

    #[test]
    fn unpredictable_seed_is_not_reported() {
        // random.setSeed(input.toByteArray()) where input is unresolved
        let mut b = AstBuilder::new();
        let input = b.name_ref("input");
        let bytes = b.call("toByteArray", Some(input), vec![], None);
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![bytes], None);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_resolved_call(bytes, ResolvedCall::new(to_byte_array_signature()));
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn mutable_binding_makes_seed_unpredictable() {
        // var s = "abc"; random.setSeed(s.toByteArray())
        let mut b = AstBuilder::new();
        let lit = b.string_lit("abc");
        let prop = b.var("s", Some(lit));
        let reference = b.name_ref("s");
        let bytes = b.call("toByteArray", Some(reference), vec![], None);
        let random = b.name_ref("random");
        let set_seed = b.call("setSeed", Some(random), vec![bytes], None);
        b.add_item(prop);
        b.add_item(set_seed);
        let ast = b.build();

        let mut model = SemanticModel::new();
        model.set_reference_target(reference, prop);
        model.set_resolved_call(bytes, ResolvedCall::new(to_byte_array_signature()));
        model.set_resolved_call(set_seed, ResolvedCall::new(set_seed_signature()));
        let file = ResolvedFile::new("Seed.kt", ast, model);

        let analysis = run_rule(&file, set_seed);
        assert!(analysis.issues.is_empty());
    }

    // ==================== Matcher Shape Tests ====================

    #[test]
    fn matchers_cover_set_seed_and_constructor() {
        let rule = UnpredictableSeedRule::new();
        let set_seed = CalleeSignature::function(
            SECURE_RANDOM,
            "setSeed",
            vec!["kotlin.Long"],
            "kotlin.Unit",
        );
        let ctor = CalleeSignature::constructor(SECURE_RANDOM, vec!["kotlin.ByteArray"]);
        let no_arg_ctor = CalleeSignature::constructor(SECURE_RANDOM, vec![]);

        assert!(rule.matchers().iter().any(|m| m.matches(&set_seed)));
        assert!(rule.matchers().iter().any(|m| m.matches(&ctor)));
        // The unseeded constructor is fine.
        assert!(!rule.matchers().iter().any(|m| m.matches(&no_arg_ctor)));
    }
}
