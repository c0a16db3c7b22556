//! Unification and the inference context.
//!
//! Unification is substitution-returning: `unify(a, b)` produces the most
//! general `Subst` that makes `a` and `b` equal, and callers compose it into
//! whatever they have accumulated. Deferred constraints (from lambda
//! application) are solved in order by `solve`, composing as it goes.

use rustc_hash::FxHashMap;

use crate::ast::Span;
use crate::error::{ConstraintOrigin, TypeError};
use crate::subst::Subst;
use crate::ty::{RecordType, Scheme, Ty, TyVar};

/// Per-check inference state: the fresh-variable counter, pending
/// constraints, and the variables introduced by `'a`-style annotations.
#[derive(Debug, Default)]
pub struct InferCtx {
    next_var: u32,
    /// Deferred equality constraints, solved at `let` and at the end.
    pub constraints: Vec<Constraint>,
    /// Type variables named in annotations, shared across one check.
    named: FxHashMap<String, TyVar>,
    /// Number of lambda bodies currently being inferred.
    pub(crate) lambda_depth: u32,
}

impl InferCtx {
    pub fn new() -> Self {
        InferCtx::default()
    }

    // ── Type Variable Creation ──────────────────────────────────────────

    pub fn fresh_var(&mut self) -> Ty {
        let var = TyVar(self.next_var);
        self.next_var += 1;
        Ty::Var(var)
    }

    /// The variable bound to an annotation name, allocating it on first use.
    pub fn named_var(&mut self, name: &str) -> Ty {
        if let Some(var) = self.named.get(name) {
            return Ty::Var(*var);
        }
        let var = TyVar(self.next_var);
        self.next_var += 1;
        self.named.insert(name.to_string(), var);
        Ty::Var(var)
    }

    // ── Schemes ─────────────────────────────────────────────────────────

    /// Replace every quantified variable with a fresh one.
    pub fn instantiate(&mut self, scheme: &Scheme) -> Ty {
        if scheme.is_mono() {
            return scheme.ty.clone();
        }
        let mut sub = Subst::new();
        for var in &scheme.vars {
            let fresh = self.fresh_var();
            sub.insert(*var, fresh);
        }
        scheme.ty.apply(&sub)
    }

    /// Quantify every free variable of `ty` not free in the environment.
    pub fn generalize(&self, env_free: &[TyVar], ty: Ty) -> Scheme {
        let vars = ty
            .free_vars()
            .into_iter()
            .filter(|v| !env_free.contains(v))
            .collect();
        Scheme { vars, ty }
    }

    pub fn push_constraint(&mut self, a: Ty, b: Ty, origin: ConstraintOrigin, span: Span) {
        self.constraints.push(Constraint { a, b, origin, span });
    }

    /// Keep the bindings of an eager substitution found inside a lambda
    /// body, so the lambda's parameter types see them when constraints are
    /// solved. Outside lambdas the substitution stays local to its rule.
    pub fn defer_eager(&mut self, sub: &Subst, origin: &ConstraintOrigin, span: Span) {
        if self.lambda_depth == 0 {
            return;
        }
        for (var, ty) in sub.iter() {
            self.push_constraint(Ty::Var(*var), ty.clone(), origin.clone(), span);
        }
    }
}

// ── Constraints ─────────────────────────────────────────────────────────

/// A deferred requirement that two types be equal.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub a: Ty,
    pub b: Ty,
    pub origin: ConstraintOrigin,
    pub span: Span,
}

impl Constraint {
    pub fn apply(&self, sub: &Subst) -> Constraint {
        Constraint {
            a: self.a.apply(sub),
            b: self.b.apply(sub),
            origin: self.origin.clone(),
            span: self.span,
        }
    }
}

/// Solve constraints in order, applying what has been solved so far to each
/// one before unifying it.
pub fn solve(constraints: &[Constraint]) -> Result<Subst, TypeError> {
    let mut sub = Subst::new();
    for c in constraints {
        let step = unify(
            &c.a.apply(&sub),
            &c.b.apply(&sub),
            c.origin.clone(),
            c.span,
        )?;
        sub = Subst::compose(&step, &sub);
    }
    Ok(sub)
}

// ── Unification ─────────────────────────────────────────────────────────

enum Failure {
    Mismatch,
    Occurs(TyVar, Ty),
}

/// Unify two types exactly. On a structural mismatch the error reports the
/// outermost pair, not the innermost disagreeing component.
pub fn unify(a: &Ty, b: &Ty, origin: ConstraintOrigin, span: Span) -> Result<Subst, TypeError> {
    unify_inner(a, b).map_err(|f| failure_to_error(f, a, b, origin, span))
}

/// Unify a value's type against the type of the place it flows into.
///
/// Identical to `unify` except that a non-null value satisfies a nullable
/// target: `String!` may be passed where `String` is declared, at any list
/// depth. The converse (`String` into `String!`) is still a mismatch.
pub fn unify_assignable(
    target: &Ty,
    value: &Ty,
    origin: ConstraintOrigin,
    span: Span,
) -> Result<Subst, TypeError> {
    assignable_inner(target, value).map_err(|f| failure_to_error(f, target, value, origin, span))
}

fn failure_to_error(f: Failure, a: &Ty, b: &Ty, origin: ConstraintOrigin, span: Span) -> TypeError {
    match f {
        Failure::Mismatch => TypeError::Mismatch {
            expected: a.clone(),
            found: b.clone(),
            origin,
            span,
        },
        Failure::Occurs(var, ty) => TypeError::InfiniteType {
            var,
            ty,
            origin,
            span,
        },
    }
}

fn bind(var: TyVar, ty: &Ty) -> Result<Subst, Failure> {
    if let Ty::Var(other) = ty {
        if *other == var {
            return Ok(Subst::new());
        }
    }
    if ty.occurs(var) {
        return Err(Failure::Occurs(var, ty.clone()));
    }
    Ok(Subst::singleton(var, ty.clone()))
}

fn unify_inner(a: &Ty, b: &Ty) -> Result<Subst, Failure> {
    match (a, b) {
        (Ty::Var(v), other) | (other, Ty::Var(v)) => bind(*v, other),
        (Ty::Module(m1), Ty::Module(m2)) => {
            if m1 == m2 {
                Ok(Subst::new())
            } else {
                Err(Failure::Mismatch)
            }
        }
        (Ty::List(e1), Ty::List(e2)) => unify_inner(e1, e2),
        (Ty::NonNull(i1), Ty::NonNull(i2)) => unify_inner(i1, i2),
        (Ty::Record(r1), Ty::Record(r2)) => unify_records(r1, r2),
        (Ty::Fun(f1), Ty::Fun(f2)) => {
            let s1 = unify_records(&f1.arg, &f2.arg)?;
            let s2 = unify_inner(&f1.ret.apply(&s1), &f2.ret.apply(&s1))?;
            Ok(Subst::compose(&s2, &s1))
        }
        _ => Err(Failure::Mismatch),
    }
}

fn unify_records(r1: &RecordType, r2: &RecordType) -> Result<Subst, Failure> {
    if r1.fields.len() != r2.fields.len() {
        return Err(Failure::Mismatch);
    }
    if !r1.name.is_empty() && !r2.name.is_empty() && r1.name != r2.name {
        return Err(Failure::Mismatch);
    }
    let mut sub = Subst::new();
    for ((k1, s1), (k2, s2)) in r1.fields.iter().zip(r2.fields.iter()) {
        if k1 != k2 {
            return Err(Failure::Mismatch);
        }
        let step = unify_inner(&s1.ty.apply(&sub), &s2.ty.apply(&sub))?;
        sub = Subst::compose(&step, &sub);
    }
    Ok(sub)
}

fn assignable_inner(target: &Ty, value: &Ty) -> Result<Subst, Failure> {
    match (target, value) {
        (Ty::Var(_), _) | (_, Ty::Var(_)) => unify_inner(target, value),
        (Ty::NonNull(t), Ty::NonNull(v)) => assignable_inner(t, v),
        (Ty::NonNull(_), _) => Err(Failure::Mismatch),
        (_, Ty::NonNull(v)) => assignable_inner(target, v),
        (Ty::List(t), Ty::List(v)) => assignable_inner(t, v),
        _ => unify_inner(target, value),
    }
}
