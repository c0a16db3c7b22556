//! Type representation for the Dash type system.
//!
//! Defines the closed `Ty` sum type, records, function types, type variables
//! and polymorphic `Scheme`s. Classes are nominal: a `Ty::Module` names a
//! module in the environment arena by id, and two classes are the same type
//! only when they share that id.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::subst::Subst;

/// A type variable, allocated from the per-check counter in `InferCtx`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVar(pub u32);

/// Index of a module in the environment arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);

/// A reference to a class/module used as a type.
///
/// The `name` field is used ONLY for display. Identity is the `id`.
#[derive(Clone, Debug)]
pub struct ModuleRef {
    pub id: ModuleId,
    pub name: String,
}

impl PartialEq for ModuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id // name intentionally excluded
    }
}

impl Eq for ModuleRef {}

impl std::hash::Hash for ModuleRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A structural record of named, ordered fields.
#[derive(Clone, Debug)]
pub struct RecordType {
    /// Empty for anonymous records.
    pub name: String,
    pub fields: Vec<(String, Scheme)>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, fields: Vec<(String, Scheme)>) -> Self {
        RecordType {
            name: name.into(),
            fields,
        }
    }

    pub fn anonymous(fields: Vec<(String, Scheme)>) -> Self {
        RecordType::new("", fields)
    }

    pub fn scheme_of(&self, key: &str) -> Option<&Scheme> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    /// Insert or replace a field, keeping keys unique.
    pub fn add(&mut self, key: impl Into<String>, scheme: Scheme) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = scheme,
            None => self.fields.push((key, scheme)),
        }
    }

    /// True if any field is non-null, i.e. must be supplied by a caller.
    pub fn has_required(&self) -> bool {
        self.fields.iter().any(|(_, s)| s.ty.is_non_null())
    }

    pub fn apply(&self, sub: &Subst) -> RecordType {
        RecordType {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(|(k, s)| (k.clone(), s.apply(sub)))
                .collect(),
        }
    }

    fn collect_free_vars(&self, out: &mut Vec<TyVar>) {
        for (_, s) in &self.fields {
            s.collect_free_vars(out);
        }
    }
}

/// Equality is positional: same length, same names in the same order,
/// pairwise-equal field types. Two non-empty record names must also agree.
impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        if !self.name.is_empty() && !other.name.is_empty() && self.name != other.name {
            return false;
        }
        self.fields
            .iter()
            .zip(other.fields.iter())
            .all(|((k1, s1), (k2, s2))| k1 == k2 && s1.ty == s2.ty)
    }
}

/// A function taking one record of named arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub arg: RecordType,
    pub ret: Ty,
}

impl FunctionType {
    /// The return type. With `recursive`, curried function layers are
    /// peeled until a non-function result is reached, keeping any non-null
    /// wrapper around the final result.
    pub fn ret(&self, recursive: bool) -> Ty {
        if !recursive {
            return self.ret.clone();
        }
        fn peel(ty: &Ty) -> Ty {
            match ty {
                Ty::Fun(f) => peel(&f.ret),
                Ty::NonNull(inner) if matches!(inner.as_ref(), Ty::Fun(_)) => {
                    Ty::non_null(peel(inner))
                }
                other => other.clone(),
            }
        }
        peel(&self.ret)
    }
}

/// A Dash type.
#[derive(Clone, Debug)]
pub enum Ty {
    /// A class (or schema object/scalar), compared by identity.
    Module(ModuleRef),
    /// A structural record.
    Record(RecordType),
    /// `[T]`
    List(Box<Ty>),
    /// `T!` -- guaranteed non-null. Unwrapped types are nullable.
    NonNull(Box<Ty>),
    /// `{args} -> T`
    Fun(Box<FunctionType>),
    /// An inference variable.
    Var(TyVar),
}

impl Ty {
    pub fn module(id: ModuleId, name: impl Into<String>) -> Ty {
        Ty::Module(ModuleRef {
            id,
            name: name.into(),
        })
    }

    pub fn list(elem: Ty) -> Ty {
        Ty::List(Box::new(elem))
    }

    /// Wrap in `NonNull`. Wrapping an already non-null type is a no-op.
    pub fn non_null(inner: Ty) -> Ty {
        match inner {
            Ty::NonNull(_) => inner,
            other => Ty::NonNull(Box::new(other)),
        }
    }

    pub fn fun(arg: RecordType, ret: Ty) -> Ty {
        Ty::Fun(Box::new(FunctionType { arg, ret }))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Ty::NonNull(_))
    }

    /// The class this type names, looking through one non-null layer.
    pub fn as_module(&self) -> Option<&ModuleRef> {
        match self {
            Ty::Module(m) => Some(m),
            Ty::NonNull(inner) => match inner.as_ref() {
                Ty::Module(m) => Some(m),
                _ => None,
            },
            _ => None,
        }
    }

    /// Implicitly invoke a computed field.
    ///
    /// Non-null layers are looked through (and kept); a function none of
    /// whose parameters is required becomes its return type. A function with
    /// at least one required parameter is left as a callable value.
    pub fn force_thunk(self) -> Ty {
        match self {
            Ty::NonNull(inner) => Ty::non_null(inner.force_thunk()),
            Ty::Fun(f) if !f.arg.has_required() => f.ret(false),
            other => other,
        }
    }

    pub fn apply(&self, sub: &Subst) -> Ty {
        if sub.is_empty() {
            return self.clone();
        }
        match self {
            Ty::Var(v) => match sub.get(*v) {
                Some(t) => t.clone(),
                None => self.clone(),
            },
            Ty::Module(_) => self.clone(),
            Ty::Record(r) => Ty::Record(r.apply(sub)),
            Ty::List(elem) => Ty::List(Box::new(elem.apply(sub))),
            Ty::NonNull(inner) => Ty::NonNull(Box::new(inner.apply(sub))),
            Ty::Fun(f) => Ty::fun(f.arg.apply(sub), f.ret.apply(sub)),
        }
    }

    /// Free type variables, deduplicated, in first-occurrence order.
    pub fn free_vars(&self) -> Vec<TyVar> {
        let mut out = Vec::new();
        self.collect_free_vars(&mut out);
        dedup(out)
    }

    pub(crate) fn occurs(&self, var: TyVar) -> bool {
        self.free_vars().contains(&var)
    }

    fn collect_free_vars(&self, out: &mut Vec<TyVar>) {
        match self {
            Ty::Var(v) => out.push(*v),
            Ty::Module(_) => {}
            Ty::Record(r) => r.collect_free_vars(out),
            Ty::List(elem) => elem.collect_free_vars(out),
            Ty::NonNull(inner) => inner.collect_free_vars(out),
            Ty::Fun(f) => {
                f.arg.collect_free_vars(out);
                f.ret.collect_free_vars(out);
            }
        }
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ty::Module(a), Ty::Module(b)) => a == b,
            (Ty::Record(a), Ty::Record(b)) => a == b,
            (Ty::List(a), Ty::List(b)) => a == b,
            (Ty::NonNull(a), Ty::NonNull(b)) => a == b,
            (Ty::Fun(a), Ty::Fun(b)) => a == b,
            (Ty::Var(a), Ty::Var(b)) => a == b,
            _ => false,
        }
    }
}

fn dedup(vars: Vec<TyVar>) -> Vec<TyVar> {
    let mut seen = FxHashSet::default();
    vars.into_iter().filter(|v| seen.insert(*v)).collect()
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[(String, Scheme)]) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (k, s)) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", k, s)?;
    }
    write!(f, "}}")
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        write_fields(f, &self.fields)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Module(m) => write!(f, "{}", m.name),
            Ty::Record(r) => write!(f, "{}", r),
            Ty::List(elem) => write!(f, "[{}]", elem),
            Ty::NonNull(inner) => write!(f, "{}!", inner),
            Ty::Fun(fun) => {
                write_fields(f, &fun.arg.fields)?;
                write!(f, " -> {}", fun.ret)
            }
            Ty::Var(v) => write!(f, "?{}", v.0),
        }
    }
}

/// A polymorphic type scheme: a type with universally quantified variables.
#[derive(Clone, Debug)]
pub struct Scheme {
    /// The quantified (generic) type variables.
    pub vars: Vec<TyVar>,
    /// The underlying type (may reference vars).
    pub ty: Ty,
}

impl Scheme {
    /// Create a monomorphic scheme (no quantified variables).
    pub fn mono(ty: Ty) -> Self {
        Scheme {
            vars: Vec::new(),
            ty,
        }
    }

    pub fn is_mono(&self) -> bool {
        self.vars.is_empty()
    }

    /// The type, only if nothing is quantified.
    pub fn mono_type(&self) -> Option<&Ty> {
        if self.is_mono() {
            Some(&self.ty)
        } else {
            None
        }
    }

    /// Apply a substitution to the unquantified part of the scheme.
    pub fn apply(&self, sub: &Subst) -> Scheme {
        if self.vars.is_empty() {
            return Scheme::mono(self.ty.apply(sub));
        }
        let narrowed = sub.without(&self.vars);
        Scheme {
            vars: self.vars.clone(),
            ty: self.ty.apply(&narrowed),
        }
    }

    pub fn free_vars(&self) -> Vec<TyVar> {
        let mut out = Vec::new();
        self.collect_free_vars(&mut out);
        dedup(out)
    }

    fn collect_free_vars(&self, out: &mut Vec<TyVar>) {
        let mut inner = Vec::new();
        self.ty.collect_free_vars(&mut inner);
        out.extend(inner.into_iter().filter(|v| !self.vars.contains(v)));
    }

    /// Rename the quantified variables to `?0, ?1, ...` in order.
    pub fn normalize(&self) -> Scheme {
        let mut rename = Subst::new();
        let vars: Vec<TyVar> = (0..self.vars.len() as u32).map(TyVar).collect();
        for (old, new) in self.vars.iter().zip(vars.iter()) {
            rename.insert(*old, Ty::Var(*new));
        }
        Scheme {
            vars,
            ty: self.ty.apply(&rename),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.vars.is_empty() {
            write!(f, "forall")?;
            for v in &self.vars {
                write!(f, " ?{}", v.0)?;
            }
            write!(f, ". ")?;
        }
        write!(f, "{}", self.ty)
    }
}
