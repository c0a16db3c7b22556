//! Substitutions: finite maps from type variables to types.

use rustc_hash::FxHashMap;

use crate::ty::{Ty, TyVar};

/// A mapping from type variables to the types they stand for.
#[derive(Clone, Debug, Default)]
pub struct Subst {
    map: FxHashMap<TyVar, Ty>,
}

impl Subst {
    pub fn new() -> Self {
        Subst::default()
    }

    pub fn singleton(var: TyVar, ty: Ty) -> Self {
        let mut sub = Subst::new();
        sub.insert(var, ty);
        sub
    }

    pub fn get(&self, var: TyVar) -> Option<&Ty> {
        self.map.get(&var)
    }

    pub fn insert(&mut self, var: TyVar, ty: Ty) {
        self.map.insert(var, ty);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TyVar, &Ty)> {
        self.map.iter()
    }

    /// A copy with the given variables unbound (used under quantifiers).
    pub fn without(&self, vars: &[TyVar]) -> Subst {
        Subst {
            map: self
                .map
                .iter()
                .filter(|(v, _)| !vars.contains(v))
                .map(|(v, t)| (*v, t.clone()))
                .collect(),
        }
    }

    /// `newer ∘ older`: apply `newer` to every binding of `older`, then
    /// overlay `newer`'s own bindings. Applying the result equals applying
    /// `older` and then `newer`.
    pub fn compose(newer: &Subst, older: &Subst) -> Subst {
        let mut map: FxHashMap<TyVar, Ty> = older
            .map
            .iter()
            .map(|(v, t)| (*v, t.apply(newer)))
            .collect();
        for (v, t) in &newer.map {
            map.insert(*v, t.clone());
        }
        Subst { map }
    }
}
