//! Detects discarded return values that carry an operation's outcome.
//!
//! Calls like `file.delete()` or `lock.tryLock()` report success or failure
//! through their return value; using them as bare statements silently drops
//! that status. The rule only fires when the call result is syntactically
//! discarded, so assignments, conditions and argument positions stay clean.

use crate::ast::NodeId;
use crate::matcher::FunMatcher;
use crate::rules::CallRule;
use crate::semantics::ResolvedCall;
use crate::types::context::FileContext;

#[derive(Debug)]
pub struct IgnoredOperationStatusRule {
    matchers: Vec<FunMatcher>,
}

impl IgnoredOperationStatusRule {
    pub fn new() -> Self {
        Self {
            matchers: vec![
                FunMatcher::new("java.io.File").names([
                    "delete",
                    "mkdir",
                    "mkdirs",
                    "renameTo",
                    "setReadOnly",
                    "setLastModified",
                    "createNewFile",
                    "setWritable",
                    "setReadable",
                    "setExecutable",
                ]),
                FunMatcher::new("java.util.Iterator")
                    .name("hasNext")
                    .with_no_arguments(),
                FunMatcher::new("kotlin.collections.Iterator")
                    .name("hasNext")
                    .with_no_arguments(),
                FunMatcher::new("kotlin.collections.MutableIterator")
                    .name("hasNext")
                    .with_no_arguments(),
                FunMatcher::new("java.util.Enumeration")
                    .name("hasMoreElements")
                    .with_no_arguments(),
                FunMatcher::new("java.util.concurrent.locks.Lock").name("tryLock"),
                FunMatcher::new("java.util.concurrent.locks.Condition")
                    .name("await")
                    .with_argument_types(["kotlin.Long", "java.util.concurrent.TimeUnit"]),
                FunMatcher::new("java.util.concurrent.locks.Condition")
                    .names(["awaitNanos", "awaitUntil"]),
                FunMatcher::new("java.util.concurrent.CountDownLatch")
                    .name("await")
                    .with_argument_types(["kotlin.Long", "java.util.concurrent.TimeUnit"]),
                FunMatcher::new("java.util.concurrent.Semaphore").name("tryAcquire"),
                FunMatcher::new("java.util.concurrent.BlockingQueue").names(["offer", "remove"]),
            ],
        }
    }
}

impl Default for IgnoredOperationStatusRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRule for IgnoredOperationStatusRule {
    fn id(&self) -> &'static str {
        "kotlin.ignored-operation-status"
    }

    fn name(&self) -> &'static str {
        "Ignored Operation Status"
    }

    fn matchers(&self) -> &[FunMatcher] {
        &self.matchers
    }

    fn visit_call(
        &self,
        call: NodeId,
        resolved: &ResolvedCall,
        ctx: &mut FileContext<'_>,
    ) -> anyhow::Result<()> {
        if !ctx.ast().is_used_as_statement(call) {
            return Ok(());
        }
        let signature = &resolved.signature;
        ctx.report_issue(
            self.id(),
            call,
            format!(
                "Do something with the \"{}\" value returned by \"{}\".",
                signature.return_type_simple_name(),
                signature.name
            ),
            vec![],
        );
        Ok(())
    }
}
