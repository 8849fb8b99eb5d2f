//! Static prediction of runtime values.
//!
//! Given an expression, the predictor follows immutable bindings, scoping
//! functions and pass-through accessors to the best statically-determined
//! equivalent of its runtime value. Prediction never fails: an unrecognized
//! shape returns the input expression unchanged, and callers treat that as
//! "assume unpredictable". Every immutable declaration crossed on the way is
//! recorded so rules can surface the chain as secondary locations.

use std::collections::HashSet;

use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, TemplateEntry};
use crate::matcher::{ArgumentSpec, FunMatcher};
use crate::semantics::SemanticModel;

/// Scoping functions whose lambda parameter (or receiver) stands for the
/// expression the chain was invoked on.
const SCOPE_FUNCTIONS: [&str; 5] = ["let", "also", "run", "apply", "with"];

/// Value predictor over one file's tree and resolution data.
///
/// Cheap to construct; rules typically create one per callback via
/// [`crate::types::context::FileContext::predictor`].
pub struct ValuePredictor<'a> {
    ast: &'a Ast,
    model: &'a SemanticModel,
    max_parent_hops: usize,
    properties_get_with_default: FunMatcher,
}

impl<'a> ValuePredictor<'a> {
    pub fn new(ast: &'a Ast, model: &'a SemanticModel, max_parent_hops: usize) -> Self {
        Self {
            ast,
            model,
            max_parent_hops,
            properties_get_with_default: FunMatcher::new("java.util.Properties")
                .name("getProperty")
                .with_arguments([ArgumentSpec::Any, ArgumentSpec::Any]),
        }
    }

    /// Best statically-determined equivalent of `expr`'s runtime value.
    pub fn predict_value(&self, expr: NodeId) -> NodeId {
        let mut declarations = Vec::new();
        self.predict_value_with_declarations(expr, &mut declarations)
    }

    /// Like [`Self::predict_value`], recording every immutable declaration
    /// followed along the way, in the order they were crossed.
    pub fn predict_value_with_declarations(
        &self,
        expr: NodeId,
        declarations: &mut Vec<NodeId>,
    ) -> NodeId {
        let mut seen = HashSet::new();
        self.resolve(expr, declarations, &mut seen)
    }

    fn resolve(
        &self,
        start: NodeId,
        declarations: &mut Vec<NodeId>,
        seen: &mut HashSet<NodeId>,
    ) -> NodeId {
        let mut expr = start;
        loop {
            if !seen.insert(expr) {
                // Reference cycle in the fixture or frontend data; stop here.
                return expr;
            }
            match self.ast.kind(expr) {
                NodeKind::Paren { inner } => expr = *inner,
                // A cast does not change runtime identity for this analysis.
                NodeKind::Cast { operand, .. } => expr = *operand,
                NodeKind::NameRef { .. } => match self.follow_reference(expr, declarations) {
                    Some(next) => expr = next,
                    None => return expr,
                },
                NodeKind::Call { args, .. } => {
                    // Pass-through accessor: a properties-map getter with a
                    // default evaluates to the default when the key is unset,
                    // and the default is the only statically known branch.
                    if self.properties_get_with_default.matches_call(self.model, expr) {
                        match args.get(1) {
                            Some(&default) => expr = default,
                            None => return expr,
                        }
                    } else {
                        return expr;
                    }
                }
                _ => return expr,
            }
        }
    }

    /// One step through a name reference: to the initializer of an immutable
    /// binding, or to the subject of the scoping function that introduced the
    /// referenced lambda parameter. `None` is a prediction dead-end.
    fn follow_reference(&self, reference: NodeId, declarations: &mut Vec<NodeId>) -> Option<NodeId> {
        let target = self.model.reference_target(reference)?;
        match self.ast.kind(target) {
            NodeKind::Property {
                mutable: false,
                initializer: Some(init),
                ..
            } => {
                declarations.push(target);
                Some(*init)
            }
            NodeKind::Param { .. } => {
                let lambda = self.ast.parent(target)?;
                self.scope_function_target(lambda)
            }
            _ => None,
        }
    }

    /// The expression a scoping-function literal's parameter/receiver stands
    /// for: the receiver for `let`/`also`/`run`/`apply`, the first argument
    /// for `with`. The upward walk to the introducing call is bounded by the
    /// configured hop budget; exhausting it gives up (`None`).
    pub fn scope_function_target(&self, lambda: NodeId) -> Option<NodeId> {
        let mut hops = 0;
        for ancestor in self.ast.ancestors(lambda) {
            if hops >= self.max_parent_hops {
                return None;
            }
            hops += 1;
            if let NodeKind::Call {
                callee,
                receiver,
                args,
                lambda_arg,
                ..
            } = self.ast.kind(ancestor)
            {
                if self.unwrap_parens(*lambda_arg) != Some(lambda) {
                    continue;
                }
                if !SCOPE_FUNCTIONS.contains(&callee.as_str()) {
                    return None;
                }
                return match callee.as_str() {
                    "with" => args.first().copied(),
                    _ => *receiver,
                };
            }
        }
        None
    }

    /// Receiver expression of a call, looking through the enclosing scoping
    /// function when the receiver is implicit (`with(x) { foo() }`).
    pub fn predict_receiver(&self, call: NodeId) -> Option<NodeId> {
        if let NodeKind::Call {
            receiver: Some(receiver),
            ..
        } = self.ast.kind(call)
        {
            return Some(*receiver);
        }
        let lambda = self.model.resolved_call(call)?.implicit_receiver_lambda?;
        self.scope_function_target(lambda)
    }

    /// Literal string value of `expr`, if statically known.
    pub fn predict_string_value(&self, expr: NodeId) -> Option<String> {
        let mut declarations = Vec::new();
        self.predict_string_value_with_declarations(expr, &mut declarations)
    }

    /// Evaluates string templates and `+` concatenation over predicted
    /// sub-values; any statically unknown operand makes the whole value
    /// unknown.
    pub fn predict_string_value_with_declarations(
        &self,
        expr: NodeId,
        declarations: &mut Vec<NodeId>,
    ) -> Option<String> {
        let mut seen = HashSet::new();
        self.string_value(expr, declarations, &mut seen)
    }

    fn string_value(
        &self,
        expr: NodeId,
        declarations: &mut Vec<NodeId>,
        seen: &mut HashSet<NodeId>,
    ) -> Option<String> {
        if !seen.insert(expr) {
            return None;
        }
        let resolved = self.resolve(expr, declarations, &mut HashSet::new());
        match self.ast.kind(resolved) {
            NodeKind::StringLiteral { value } => Some(value.clone()),
            NodeKind::StringTemplate { entries } => {
                let mut out = String::new();
                for entry in entries {
                    match entry {
                        TemplateEntry::Literal(text) => out.push_str(text),
                        TemplateEntry::Expression(inner) => {
                            out.push_str(&self.string_value(*inner, declarations, seen)?);
                        }
                    }
                }
                Some(out)
            }
            NodeKind::Binary {
                op: BinaryOp::Plus,
                lhs,
                rhs,
            } => {
                let left = self.string_value(*lhs, declarations, seen)?;
                let right = self.string_value(*rhs, declarations, seen)?;
                Some(left + &right)
            }
            _ => None,
        }
    }

    /// Integer value of `expr`, if statically known: a literal reached by
    /// prediction, or a frontend constant-folding result.
    pub fn predict_int_value(&self, expr: NodeId) -> Option<i64> {
        let resolved = self.predict_value(expr);
        if let NodeKind::IntLiteral { value } = self.ast.kind(resolved) {
            return Some(*value);
        }
        self.model
            .constant_int(resolved)
            .or_else(|| self.model.constant_int(expr))
    }

    fn unwrap_parens(&self, mut node: Option<NodeId>) -> Option<NodeId> {
        while let Some(id) = node {
            match self.ast.kind(id) {
                NodeKind::Paren { inner } => node = Some(*inner),
                _ => return Some(id),
            }
        }
        None
    }
}
