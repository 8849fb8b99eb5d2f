//! Detects coroutine builders escaping structured concurrency.
//!
//! Launching on `GlobalScope`, or passing a fresh `Job`/`SupervisorJob` as the
//! coroutine context, detaches the coroutine from its parent scope: it
//! outlives the caller and its failures are not propagated. Code explicitly
//! opted into the delicate API is not reported.

use crate::ast::{Annotation, NodeId, NodeKind};
use crate::matcher::FunMatcher;
use crate::rules::CallRule;
use crate::semantics::ResolvedCall;
use crate::types::context::FileContext;

const COROUTINES_PACKAGE: &str = "kotlinx.coroutines";
const GLOBAL_SCOPE_TYPE: &str = "kotlinx.coroutines.GlobalScope";
const DELICATE_API_ANNOTATION: &str = "kotlinx.coroutines.DelicateCoroutinesApi";
const OPT_IN_ANNOTATION: &str = "kotlin.OptIn";

const MESSAGE_SUFFIX: &str = " here leads to the breaking of structured concurrency principles.";

/// Job factories whose result, passed as a coroutine context, severs the
/// parent-child link.
const STANDALONE_JOB_FACTORIES: [&str; 2] = ["Job", "SupervisorJob"];

#[derive(Debug)]
pub struct StructuredConcurrencyRule {
    matchers: Vec<FunMatcher>,
}

impl StructuredConcurrencyRule {
    pub fn new() -> Self {
        Self {
            matchers: vec![
                FunMatcher::new(COROUTINES_PACKAGE).names(["launch", "async", "withContext"]),
            ],
        }
    }

    /// Whether the call sits under a scope that opted into the delicate API,
    /// either directly or via `@OptIn(DelicateCoroutinesApi::class)`. Walks
    /// the ancestor chain iteratively up to the file root.
    fn opted_into_delicate_api(&self, call: NodeId, ctx: &FileContext<'_>) -> bool {
        let ast = ctx.ast();
        std::iter::once(call)
            .chain(ast.ancestors(call))
            .any(|node| ast.annotations(node).iter().any(allows_delicate_api))
    }

    /// Reports a `GlobalScope` receiver; returns whether it did, so the
    /// caller can fall through to the context argument otherwise.
    fn check_receiver(&self, call: NodeId, ctx: &mut FileContext<'_>) -> bool {
        let predictor = ctx.predictor();
        let Some(receiver) = predictor.predict_receiver(call) else {
            return false;
        };
        let predicted = predictor.predict_value(receiver);
        let is_global_scope = ctx.model().expression_type(predicted) == Some(GLOBAL_SCOPE_TYPE)
            || ctx.model().expression_type(receiver) == Some(GLOBAL_SCOPE_TYPE);
        if is_global_scope {
            ctx.report_issue(
                self.id(),
                receiver,
                format!("Using \"GlobalScope\"{MESSAGE_SUFFIX}"),
                vec![],
            );
        }
        is_global_scope
    }

    /// The coroutine context is the first parameter of every matched
    /// builder, so only the first argument can sever the parent link.
    fn check_context_argument(&self, call: NodeId, ctx: &mut FileContext<'_>) {
        let arg = match ctx.ast().kind(call) {
            NodeKind::Call { args, .. } => match args.first() {
                Some(&arg) => arg,
                None => return,
            },
            _ => return,
        };
        let predicted = ctx.predictor().predict_value(arg);
        let Some(resolved) = ctx.model().resolved_call(predicted) else {
            return;
        };
        let signature = &resolved.signature;
        if signature.qualifier == COROUTINES_PACKAGE
            && STANDALONE_JOB_FACTORIES.contains(&signature.name.as_str())
        {
            ctx.report_issue(
                self.id(),
                arg,
                format!("Using \"{}()\"{MESSAGE_SUFFIX}", signature.name),
                vec![],
            );
        }
    }
}

fn allows_delicate_api(annotation: &Annotation) -> bool {
    annotation.type_fqn == DELICATE_API_ANNOTATION
        || (annotation.type_fqn == OPT_IN_ANNOTATION
            && annotation
                .class_args
                .iter()
                .any(|arg| arg == DELICATE_API_ANNOTATION))
}

impl Default for StructuredConcurrencyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRule for StructuredConcurrencyRule {
    fn id(&self) -> &'static str {
        "kotlin.structured-concurrency"
    }

    fn name(&self) -> &'static str {
        "Structured Concurrency Principles"
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
        if self.opted_into_delicate_api(call, ctx) {
            return Ok(());
        }
        if !self.check_receiver(call, ctx) {
            self.check_context_argument(call, ctx);
        }
        Ok(())
    }
}
