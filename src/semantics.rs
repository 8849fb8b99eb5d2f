//! Read-only facade over the frontend's semantic-resolution result.
//!
//! The frontend (a real compiler binding or a test fixture) fills a
//! [`SemanticModel`] with the resolution data the engine needs: reference
//! targets, resolved call signatures, expression types, folded constants and
//! semantic diagnostics. Every query returns `Option`; an absent entry means
//! "unresolved" and consumers are expected to fail closed rather than error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Ast, NodeId, TextRange};

/// Whether a resolved callee is an ordinary function (member or extension) or
/// a constructor. For constructors the simple-name concept does not apply;
/// matching is by constructed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalleeKind {
    Function,
    Constructor,
}

/// Resolved identity of a call target: the single declaration the frontend
/// bound the call-site to, after overload resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalleeSignature {
    /// Fully qualified owner: package or type FQN for functions, the
    /// constructed type FQN for constructors.
    pub qualifier: String,
    pub name: String,
    pub kind: CalleeKind,
    /// Declared parameter types, fully qualified, in order.
    pub parameter_types: Vec<String>,
    pub return_type: String,
}

impl CalleeSignature {
    pub fn function(
        qualifier: impl Into<String>,
        name: impl Into<String>,
        parameter_types: Vec<&str>,
        return_type: impl Into<String>,
    ) -> Self {
        Self {
            qualifier: qualifier.into(),
            name: name.into(),
            kind: CalleeKind::Function,
            parameter_types: parameter_types.into_iter().map(String::from).collect(),
            return_type: return_type.into(),
        }
    }

    pub fn constructor(type_fqn: impl Into<String>, parameter_types: Vec<&str>) -> Self {
        let type_fqn = type_fqn.into();
        let simple = type_fqn.rsplit('.').next().unwrap_or(&type_fqn).to_string();
        Self {
            qualifier: type_fqn.clone(),
            name: simple,
            kind: CalleeKind::Constructor,
            parameter_types: parameter_types.into_iter().map(String::from).collect(),
            return_type: type_fqn,
        }
    }

    /// Simple (unqualified) name of the return type, for messages.
    pub fn return_type_simple_name(&self) -> &str {
        self.return_type
            .rsplit('.')
            .next()
            .unwrap_or(&self.return_type)
    }
}

/// Full resolution of one call-site.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub signature: CalleeSignature,
    /// When the call has no explicit receiver but dispatches through the
    /// receiver of an enclosing scoping-function literal (`with(x) { foo() }`),
    /// the frontend records that function literal here.
    pub implicit_receiver_lambda: Option<NodeId>,
}

impl ResolvedCall {
    pub fn new(signature: CalleeSignature) -> Self {
        Self {
            signature,
            implicit_receiver_lambda: None,
        }
    }

    pub fn with_implicit_receiver_lambda(mut self, lambda: NodeId) -> Self {
        self.implicit_receiver_lambda = Some(lambda);
        self
    }
}

/// Kind of a frontend-reported semantic diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A built-in declaration the frontend could not find. Type information
    /// near such a diagnostic is incomplete, so issue reporting is skipped
    /// there to avoid false positives.
    MissingBuiltinDeclaration,
    UnresolvedReference,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontendDiagnostic {
    pub kind: DiagnosticKind,
    pub range: TextRange,
    pub message: String,
}

impl FrontendDiagnostic {
    pub fn new(kind: DiagnosticKind, range: TextRange, message: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            message: message.into(),
        }
    }

    /// Recoverable diagnostics suppress issue reporting at their location
    /// instead of aborting the file's analysis.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind, DiagnosticKind::MissingBuiltinDeclaration)
    }
}

/// Resolution tables for one file.
#[derive(Debug, Clone, Default)]
pub struct SemanticModel {
    reference_targets: HashMap<NodeId, NodeId>,
    resolved_calls: HashMap<NodeId, ResolvedCall>,
    expression_types: HashMap<NodeId, String>,
    constant_ints: HashMap<NodeId, i64>,
    diagnostics: Vec<FrontendDiagnostic>,
}

impl SemanticModel {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- population (frontend / fixture side) ----

    pub fn set_reference_target(&mut self, reference: NodeId, declaration: NodeId) {
        self.reference_targets.insert(reference, declaration);
    }

    pub fn set_resolved_call(&mut self, call: NodeId, resolved: ResolvedCall) {
        self.resolved_calls.insert(call, resolved);
    }

    pub fn set_expression_type(&mut self, expr: NodeId, type_fqn: impl Into<String>) {
        self.expression_types.insert(expr, type_fqn.into());
    }

    pub fn set_constant_int(&mut self, expr: NodeId, value: i64) {
        self.constant_ints.insert(expr, value);
    }

    pub fn push_diagnostic(&mut self, diagnostic: FrontendDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    // ---- queries (engine side) ----

    /// Declaration a name reference binds to, if resolved.
    pub fn reference_target(&self, reference: NodeId) -> Option<NodeId> {
        self.reference_targets.get(&reference).copied()
    }

    /// Resolution of a call-site, if the frontend bound it.
    pub fn resolved_call(&self, call: NodeId) -> Option<&ResolvedCall> {
        self.resolved_calls.get(&call)
    }

    /// Static type of an expression, fully qualified.
    pub fn expression_type(&self, expr: NodeId) -> Option<&str> {
        self.expression_types.get(&expr).map(String::as_str)
    }

    /// Frontend constant-folding result for an expression.
    pub fn constant_int(&self, expr: NodeId) -> Option<i64> {
        self.constant_ints.get(&expr).copied()
    }

    pub fn diagnostics(&self) -> &[FrontendDiagnostic] {
        &self.diagnostics
    }

    /// Whether a recoverable diagnostic overlaps the given range.
    pub fn has_recoverable_diagnostic_at(&self, range: &TextRange) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.is_recoverable() && d.range.overlaps(range))
    }
}

/// One file as handed to the engine: tree plus resolution, immutable for the
/// duration of the analysis.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub path: String,
    pub ast: Ast,
    pub model: SemanticModel,
}

impl ResolvedFile {
    pub fn new(path: impl Into<String>, ast: Ast, model: SemanticModel) -> Self {
        Self {
            path: path.into(),
            ast,
            model,
        }
    }
}
