//! Type error types with provenance tracking.
//!
//! Every mismatch carries a `ConstraintOrigin` naming the rule that asked for
//! two types to agree, so messages can say "argument `name`" or "list element
//! 2" instead of only "expected X, found Y".

use std::fmt;

use crate::ast::Span;
use crate::schema::SchemaError;
use crate::ty::{Ty, TyVar};

/// Which rule demanded that two types agree.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintOrigin {
    /// A slot's value against its declared type.
    SlotValue { name: String },
    /// The two operands of a default (`left ? right`).
    Default,
    /// A call argument against its parameter.
    Argument { name: String },
    /// A list element against the first element.
    ListElement { index: usize },
    /// A `self(...)` override against the slot it replaces.
    SelfOverride { name: String },
    /// A function body against its declared return type.
    FunReturn { name: String },
    /// A deferred application constraint.
    Application,
    /// A recursive binding against its own definition.
    RecursiveDefinition { name: String },
    /// Synthetic origin for internal constraints.
    Builtin,
}

impl fmt::Display for ConstraintOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOrigin::SlotValue { name } => write!(f, "slot `{}`", name),
            ConstraintOrigin::Default => write!(f, "default"),
            ConstraintOrigin::Argument { name } => write!(f, "argument `{}`", name),
            ConstraintOrigin::ListElement { index } => write!(f, "list element {}", index),
            ConstraintOrigin::SelfOverride { name } => write!(f, "override of `{}`", name),
            ConstraintOrigin::FunReturn { name } => write!(f, "return type of `{}`", name),
            ConstraintOrigin::Application => write!(f, "application"),
            ConstraintOrigin::RecursiveDefinition { name } => {
                write!(f, "recursive definition of `{}`", name)
            }
            ConstraintOrigin::Builtin => write!(f, "builtin"),
        }
    }
}

/// A type error encountered during checking.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// Two types that should agree do not.
    Mismatch {
        expected: Ty,
        found: Ty,
        origin: ConstraintOrigin,
        span: Span,
    },
    /// A type variable appears in its own definition.
    InfiniteType {
        var: TyVar,
        ty: Ty,
        origin: ConstraintOrigin,
        span: Span,
    },
    /// A symbol not bound anywhere along the scope chain.
    UndefinedVariable { name: String, span: Span },
    /// A selected field missing from the receiver's class.
    NoSuchField { ty: Ty, field: String, span: Span },
    /// A named type annotation that names no registered class.
    UnresolvedType { name: String, span: Span },
    /// A named type annotation with an empty name.
    EmptyTypeName { span: Span },
    /// A scheme still quantifies variables where a concrete type is needed.
    NotMonomorphic { name: String, span: Span },
    /// A name already bound in this scope to a different type.
    AlreadyDefined {
        name: String,
        existing: Ty,
        found: Ty,
        span: Span,
    },
    /// A slot or argument declared with neither a type nor a value.
    NoTypeOrValue { name: String, span: Span },
    /// A required (non-null) parameter was not supplied.
    MissingArgument { name: String, span: Span },
    /// Supplied arguments that match no parameter.
    UnexpectedArguments { names: Vec<String>, span: Span },
    /// A `self(...)` override naming a slot the class does not have.
    UnknownArgument { name: String, span: Span },
    /// A selection on something other than a non-null object.
    ExpectedObject { found: Ty, span: Span },
    /// A call on something that is neither a function nor a class.
    NotAFunction { ty: Ty, span: Span },
    /// `self(...)` used outside any class body.
    SelfOutsideClass { span: Span },
    /// A record literal or argument list naming the same field twice.
    DuplicateField { name: String, span: Span },
    /// Every error found while hoisting one block.
    Hoist(Vec<TypeError>),
}

impl TypeError {
    /// The span of the node whose rule failed. `Hoist` has no single span.
    pub fn span(&self) -> Option<Span> {
        match self {
            TypeError::Mismatch { span, .. }
            | TypeError::InfiniteType { span, .. }
            | TypeError::UndefinedVariable { span, .. }
            | TypeError::NoSuchField { span, .. }
            | TypeError::UnresolvedType { span, .. }
            | TypeError::EmptyTypeName { span }
            | TypeError::NotMonomorphic { span, .. }
            | TypeError::AlreadyDefined { span, .. }
            | TypeError::NoTypeOrValue { span, .. }
            | TypeError::MissingArgument { span, .. }
            | TypeError::UnexpectedArguments { span, .. }
            | TypeError::UnknownArgument { span, .. }
            | TypeError::ExpectedObject { span, .. }
            | TypeError::NotAFunction { span, .. }
            | TypeError::SelfOutsideClass { span }
            | TypeError::DuplicateField { span, .. } => Some(*span),
            TypeError::Hoist(_) => None,
        }
    }

    /// Attach a span to an error raised without one (e.g. by `unify`).
    pub(crate) fn with_span(mut self, at: Span) -> Self {
        match &mut self {
            TypeError::Mismatch { span, .. } | TypeError::InfiniteType { span, .. } => {
                if span.is_empty() {
                    *span = at;
                }
            }
            _ => {}
        }
        self
    }

    /// Join hoisting errors, flattening nested aggregates.
    pub(crate) fn join(errors: Vec<TypeError>) -> Option<TypeError> {
        let mut flat = Vec::new();
        for err in errors {
            match err {
                TypeError::Hoist(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.is_empty() {
            None
        } else {
            Some(TypeError::Hoist(flat))
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch {
                expected,
                found,
                origin,
                ..
            } => {
                write!(
                    f,
                    "type mismatch in {}: expected `{}`, found `{}`",
                    origin, expected, found
                )
            }
            TypeError::InfiniteType { var, ty, .. } => {
                write!(f, "infinite type: `?{}` occurs in `{}`", var.0, ty)
            }
            TypeError::UndefinedVariable { name, .. } => {
                write!(f, "undefined variable `{}`", name)
            }
            TypeError::NoSuchField { ty, field, .. } => {
                write!(f, "type `{}` has no field `{}`", ty, field)
            }
            TypeError::UnresolvedType { name, .. } => write!(f, "unresolved type: {}", name),
            TypeError::EmptyTypeName { .. } => write!(f, "named type with an empty name"),
            TypeError::NotMonomorphic { name, .. } => {
                write!(f, "type of `{}` is not monomorphic", name)
            }
            TypeError::AlreadyDefined { name, existing, .. } => {
                write!(f, "`{}` already defined as `{}`", name, existing)
            }
            TypeError::NoTypeOrValue { name, .. } => {
                write!(f, "`{}` has no type or value", name)
            }
            TypeError::MissingArgument { name, .. } => {
                write!(f, "missing required argument `{}`", name)
            }
            TypeError::UnexpectedArguments { names, .. } => {
                write!(f, "unexpected fields: {}", names.join(", "))
            }
            TypeError::UnknownArgument { name, .. } => write!(f, "unknown argument: {}", name),
            TypeError::ExpectedObject { found, .. } => {
                write!(f, "expected a non-null object, found `{}`", found)
            }
            TypeError::NotAFunction { ty, .. } => write!(f, "`{}` is not a function", ty),
            TypeError::SelfOutsideClass { .. } => write!(f, "self used outside a class body"),
            TypeError::DuplicateField { name, .. } => {
                write!(f, "field `{}` given more than once", name)
            }
            TypeError::Hoist(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for TypeError {}

/// Failure of a whole check: either the schema could not be installed or
/// the program did not type-check.
#[derive(Clone, Debug)]
pub enum CheckError {
    Schema(SchemaError),
    Type(TypeError),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Schema(e) => write!(f, "invalid schema: {}", e),
            CheckError::Type(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CheckError {}

impl From<SchemaError> for CheckError {
    fn from(e: SchemaError) -> Self {
        CheckError::Schema(e)
    }
}

impl From<TypeError> for CheckError {
    fn from(e: TypeError) -> Self {
        CheckError::Type(e)
    }
}
