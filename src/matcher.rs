//! Declarative matchers for calls and constructors.
//!
//! A [`FunMatcher`] describes a callable by resolved identity: owner
//! qualifier, accepted simple names and argument shape. It never inspects
//! syntax, only the [`CalleeSignature`] the frontend attached to a call-site,
//! which makes it robust against surface variation (`a.b()` vs
//! `with(a) { b() }`, extension-call chains, implicit receivers).
//! Matchers are pure values, built once when a rule is constructed.

use crate::ast::NodeId;
use crate::semantics::{CalleeKind, CalleeSignature, SemanticModel};

/// Constraint on a single argument position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentSpec {
    /// Any type at this position.
    Any,
    /// Exact fully qualified parameter type.
    OfType(String),
}

impl ArgumentSpec {
    pub fn of_type(fqn: impl Into<String>) -> Self {
        ArgumentSpec::OfType(fqn.into())
    }

    fn accepts(&self, parameter_type: &str) -> bool {
        match self {
            ArgumentSpec::Any => true,
            ArgumentSpec::OfType(fqn) => fqn == parameter_type,
        }
    }
}

/// Constraint on the whole argument list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArgumentsSpec {
    /// Any arity, any types.
    #[default]
    AnyArity,
    /// Exactly zero arguments.
    NoArguments,
    /// Exact arity with a per-position spec.
    Exactly(Vec<ArgumentSpec>),
}

impl ArgumentsSpec {
    fn accepts(&self, parameter_types: &[String]) -> bool {
        match self {
            ArgumentsSpec::AnyArity => true,
            ArgumentsSpec::NoArguments => parameter_types.is_empty(),
            ArgumentsSpec::Exactly(specs) => {
                specs.len() == parameter_types.len()
                    && specs
                        .iter()
                        .zip(parameter_types)
                        .all(|(spec, ty)| spec.accepts(ty))
            }
        }
    }
}

/// Predicate over resolved call targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunMatcher {
    qualifier: String,
    /// Accepted simple names. Empty means "any name" (always the case for
    /// constructor matchers, where the name concept does not apply).
    names: Vec<String>,
    arguments: ArgumentsSpec,
    kind: CalleeKind,
}

impl FunMatcher {
    /// Matcher for ordinary member/extension functions owned by `qualifier`.
    pub fn new(qualifier: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            names: Vec::new(),
            arguments: ArgumentsSpec::AnyArity,
            kind: CalleeKind::Function,
        }
    }

    /// Matcher for constructor invocations of `type_fqn`.
    pub fn constructor(type_fqn: impl Into<String>) -> Self {
        Self {
            qualifier: type_fqn.into(),
            names: Vec::new(),
            arguments: ArgumentsSpec::AnyArity,
            kind: CalleeKind::Constructor,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_arguments<I>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = ArgumentSpec>,
    {
        self.arguments = ArgumentsSpec::Exactly(specs.into_iter().collect());
        self
    }

    /// Exact argument list given as fully qualified type names.
    pub fn with_argument_types<I, S>(self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_arguments(types.into_iter().map(|t| ArgumentSpec::OfType(t.into())))
    }

    pub fn with_no_arguments(mut self) -> Self {
        self.arguments = ArgumentsSpec::NoArguments;
        self
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn accepted_names(&self) -> &[String] {
        &self.names
    }

    pub fn callee_kind(&self) -> CalleeKind {
        self.kind
    }

    /// Test the matcher against a resolved signature.
    pub fn matches(&self, signature: &CalleeSignature) -> bool {
        if signature.kind != self.kind || signature.qualifier != self.qualifier {
            return false;
        }
        let name_ok = match self.kind {
            // Constructor identity is the constructed type alone.
            CalleeKind::Constructor => true,
            CalleeKind::Function => {
                self.names.is_empty() || self.names.iter().any(|n| n == &signature.name)
            }
        };
        name_ok && self.arguments.accepts(&signature.parameter_types)
    }

    /// Resolve a call-site and test it. Unresolved call-sites never match.
    pub fn matches_call(&self, model: &SemanticModel, call: NodeId) -> bool {
        model
            .resolved_call(call)
            .map(|resolved| self.matches(&resolved.signature))
            .unwrap_or(false)
    }
}
