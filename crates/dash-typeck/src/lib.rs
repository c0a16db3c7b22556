//! Dash type checker: Hindley-Milner inference over nominal classes.
//!
//! This crate checks Dash programs against an introspected API schema. It
//! consumes an already-parsed AST and either produces a closed type scheme
//! for the whole program or reports the first error found. Supported:
//!
//! - Nominal classes with forward and mutual references (two-pass hoisting)
//! - Structural, order-sensitive records
//! - Non-null wrapping with nullable-target assignability
//! - Implicit invocation of fields whose parameters are all optional
//! - Let-polymorphism for the generic `let`/`lambda` primitives
//!
//! # Architecture
//!
//! - [`ast`]: Input tree and type annotations
//! - [`ty`]: Core type representation (Ty, RecordType, Scheme)
//! - [`subst`]: Substitutions and composition
//! - [`unify`]: Unification, inference context, constraint solver
//! - [`env`]: Module arena with scoped parent links
//! - [`builtins`]: Built-in scalar classes
//! - [`schema`]: Schema description and environment seeding
//! - [`hoist`]: Pre-declaration of classes and slot signatures
//! - [`infer`]: Per-node inference rules
//! - [`error`]: Error types with provenance tracking
//! - [`diagnostics`]: Ariadne rendering

pub mod ast;
pub mod builtins;
pub mod diagnostics;
pub mod env;
pub mod error;
mod hoist;
pub mod infer;
pub mod schema;
pub mod subst;
pub mod ty;
pub mod unify;

use crate::ast::Node;
use crate::env::Env;
use crate::error::CheckError;
use crate::schema::Schema;
use crate::ty::Scheme;

pub use crate::infer::infer_program;

/// Type-check a program against a schema.
///
/// This is the main entry point. It seeds a fresh environment from the
/// schema, infers the program in its root module, and returns the closed
/// scheme of the program's value.
pub fn check(schema: &Schema, program: &Node) -> Result<Scheme, CheckError> {
    let mut env = Env::from_schema(schema)?;
    Ok(infer_program(&mut env, program)?)
}
