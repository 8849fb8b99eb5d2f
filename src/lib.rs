//! kalyze: pattern-based rule engine over resolved Kotlin ASTs
//!
//! This crate runs declarative call-pattern rules over a semantically
//! resolved syntax tree, including:
//! - A call/constructor matcher DSL keyed on resolved callee signatures
//! - A value predictor that traces constants through immutable bindings,
//!   scoping functions and pass-through accessors
//! - A single-traversal dispatcher with per-rule failure isolation
//!
//! Parsing and semantic resolution are the frontend's job: the engine
//! consumes a [`semantics::ResolvedFile`] and produces a
//! [`types::finding::FileAnalysis`].
//!
//! # Example
//!
//! ```ignore
//! use kalyze::Engine;
//!
//! let engine = Engine::with_default_config();
//! let analysis = engine.analyze(&file);
//! ```

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod predict;
pub mod rules;
pub mod semantics;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use ast::{Annotation, Ast, AstBuilder, NodeId, NodeKind, TextRange};
pub use semantics::{CalleeSignature, ResolvedCall, ResolvedFile, SemanticModel};
pub use types::context::FileContext;
pub use types::finding::{FileAnalysis, Issue, SecondaryLocation};

// Re-export main engine types
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, ParseFailure, RuleFailure};
pub use matcher::{ArgumentSpec, FunMatcher};
pub use predict::ValuePredictor;
pub use rules::registry::RuleRegistry;
pub use rules::CallRule;
pub use session::FileSession;
