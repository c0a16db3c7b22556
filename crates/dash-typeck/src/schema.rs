//! Introspected API schema and environment seeding.
//!
//! The schema arrives already decoded, in the shape of a GraphQL
//! introspection result: named types, each with fields, each field with a
//! type reference and optional named arguments. Seeding turns every type
//! into a class and every field into a binding in that class.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::builtins::{find_or_create_class, register_builtins};
use crate::env::Env;
use crate::ty::{RecordType, Scheme, Ty};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Name of the type whose fields are visible at the top level.
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub types: Vec<SchemaType>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaType {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub args: Vec<InputValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValue {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeKind::Scalar => "SCALAR",
            TypeKind::Object => "OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::Enum => "ENUM",
            TypeKind::InputObject => "INPUT_OBJECT",
            TypeKind::List => "LIST",
            TypeKind::NonNull => "NON_NULL",
        };
        write!(f, "{}", s)
    }
}

/// A reference to a type: a named type, or a list/non-null wrapper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub kind: TypeKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    pub fn named(kind: TypeKind, name: impl Into<String>) -> Self {
        TypeRef {
            kind,
            name: Some(name.into()),
            of_type: None,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        TypeRef::named(TypeKind::Scalar, name)
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeRef::named(TypeKind::Object, name)
    }

    pub fn list(of: TypeRef) -> Self {
        TypeRef {
            kind: TypeKind::List,
            name: None,
            of_type: Some(Box::new(of)),
        }
    }

    pub fn non_null(of: TypeRef) -> Self {
        TypeRef {
            kind: TypeKind::NonNull,
            name: None,
            of_type: Some(Box::new(of)),
        }
    }
}

/// A malformed or inconsistent schema description.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaError {
    /// A type reference names a type the schema does not declare.
    UnknownType { name: String },
    /// A named type reference (or declared type) without a name.
    MissingName { kind: TypeKind },
    /// A list or non-null reference without an inner type.
    MissingOfType { kind: TypeKind },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::UnknownType { name } => {
                write!(f, "schema references unknown type `{}`", name)
            }
            SchemaError::MissingName { kind } => write!(f, "{} type reference has no name", kind),
            SchemaError::MissingOfType { kind } => {
                write!(f, "{} type reference has no inner type", kind)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

impl Schema {
    pub fn from_json(json: &str) -> Result<Schema, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Override the query type's name.
    pub fn with_query_type(mut self, name: impl Into<String>) -> Self {
        self.query_type = Some(name.into());
        self
    }
}

// ── Seeding ─────────────────────────────────────────────────────────────

impl Env {
    /// A root environment with the built-in scalars and one class per schema
    /// type. The query type (if any) becomes the root's fallback scope.
    pub fn from_schema(schema: &Schema) -> Result<Env, SchemaError> {
        let mut env = Env::new();
        register_builtins(&mut env);
        seed(&mut env, schema)?;
        Ok(env)
    }
}

/// Install a schema into an existing environment.
pub fn seed(env: &mut Env, schema: &Schema) -> Result<(), SchemaError> {
    let root = env.root();

    // First pass: every type gets a class, so fields can reference any of them.
    for t in &schema.types {
        if t.name.is_empty() {
            return Err(SchemaError::MissingName { kind: t.kind });
        }
        let class = find_or_create_class(env, root, &t.name);
        if schema.query_type.as_deref() == Some(t.name.as_str()) {
            env.set_fallback(root, Some(class));
        }
    }

    // Second pass: fields.
    for t in &schema.types {
        let class = env
            .named_type(root, &t.name)
            .ok_or_else(|| SchemaError::UnknownType {
                name: t.name.clone(),
            })?;
        for field in &t.fields {
            let ret = resolve_type_ref(env, &field.type_ref)?;
            if field.args.is_empty() {
                trace!(class = %t.name, field = %field.name, "seeding zero-arity field");
                env.add(class, field.name.clone(), Scheme::mono(ret));
            } else {
                let mut args = RecordType::anonymous(Vec::new());
                for arg in &field.args {
                    let ty = resolve_type_ref(env, &arg.type_ref)?;
                    args.add(arg.name.clone(), Scheme::mono(ty));
                }
                trace!(class = %t.name, field = %field.name, args = field.args.len(), "seeding function field");
                env.add(class, field.name.clone(), Scheme::mono(Ty::fun(args, ret)));
            }
        }
    }
    Ok(())
}

/// Translate a type reference into a type. Named references resolve to the
/// class of that name; wrappers recurse.
pub fn resolve_type_ref(env: &Env, type_ref: &TypeRef) -> Result<Ty, SchemaError> {
    match type_ref.kind {
        TypeKind::List | TypeKind::NonNull => {
            let inner = type_ref
                .of_type
                .as_deref()
                .ok_or(SchemaError::MissingOfType {
                    kind: type_ref.kind,
                })?;
            let inner = resolve_type_ref(env, inner)?;
            if type_ref.kind == TypeKind::List {
                Ok(Ty::list(inner))
            } else {
                Ok(Ty::non_null(inner))
            }
        }
        kind => {
            let name = type_ref
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .ok_or(SchemaError::MissingName { kind })?;
            let class = env
                .named_type(env.root(), name)
                .ok_or_else(|| SchemaError::UnknownType {
                    name: name.to_string(),
                })?;
            Ok(env.module_ty(class))
        }
    }
}
