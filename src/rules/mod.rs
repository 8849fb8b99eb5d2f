pub mod ignored_operation_status;
pub mod registry;
pub mod structured_concurrency;
pub mod unpredictable_seed;

use std::fmt::Debug;

use crate::ast::NodeId;
use crate::matcher::FunMatcher;
use crate::semantics::ResolvedCall;
use crate::types::context::FileContext;

/// A single call-pattern rule the engine can run.
///
/// Rules are stateless across files: all per-file state lives in the
/// [`FileContext`] handed to the callback. A rule declares up front, via
/// [`CallRule::matchers`], which resolved call shapes it wants to see; the
/// dispatcher only invokes [`CallRule::visit_call`] on call-sites one of
/// those matchers accepted.
pub trait CallRule: Send + Sync + Debug {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    /// Call shapes this rule subscribes to. Built once at rule construction.
    fn matchers(&self) -> &[FunMatcher];

    /// Inspect one matched call-site and report issues through the context.
    ///
    /// Errors are caught at the dispatcher boundary and recorded as rule
    /// failures; they never abort the traversal or other rules.
    fn visit_call(
        &self,
        call: NodeId,
        resolved: &ResolvedCall,
        ctx: &mut FileContext<'_>,
    ) -> anyhow::Result<()>;
}
