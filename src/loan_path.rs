//! The loan-path algebra: a symbolic, structurally-comparable normal form
//! for places, built by walking a categorized expression's base chain.

use std::rc::Rc;

use crate::oracles::{
    Aliasability, Binding, Cmt, Categorization, FieldId, InteriorKind, MutCategory, Mutability,
    PointerKind, ScopeId, ScopeTree, TyId, VariantId,
};

/// A single projection step away from a base loan path.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum LoanPathElem {
    Deref(PointerKindKey),
    Interior(Option<VariantId>, InteriorKindKey),
}

/// `PointerKind` and `InteriorKind` carry a `Region`/non-hashable payload in
/// the oracle model; the loan path only needs the *shape* of the
/// projection for structural equality, so it keys on a reduced form here.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PointerKindKey {
    Ref(MutabilityKey),
    Unique,
    RawPtr(MutabilityKey),
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum MutabilityKey {
    Imm,
    Mut,
}

impl From<Mutability> for MutabilityKey {
    fn from(m: Mutability) -> Self {
        match m {
            Mutability::Imm => MutabilityKey::Imm,
            Mutability::Mut => MutabilityKey::Mut,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum InteriorKindKey {
    Field(FieldId),
    Index,
    Pattern,
}

impl From<InteriorKind> for InteriorKindKey {
    fn from(ik: InteriorKind) -> Self {
        match ik {
            InteriorKind::Field(f) => InteriorKindKey::Field(f),
            InteriorKind::Index => InteriorKindKey::Index,
            InteriorKind::Pattern => InteriorKindKey::Pattern,
        }
    }
}

impl From<PointerKind> for PointerKindKey {
    fn from(pk: PointerKind) -> Self {
        match pk {
            PointerKind::Ref(m, _region) => PointerKindKey::Ref(m.into()),
            PointerKind::Unique => PointerKindKey::Unique,
            PointerKind::RawPtr(m) => PointerKindKey::RawPtr(m.into()),
        }
    }
}

/// The symbolic normal form of a place. Structurally compared: equality,
/// hashing and the `path_map` key are all by value.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum LoanPathVariant {
    Var(Binding),
    /// Reserved; mirrors `Categorization::Upvar`.
    Upvar(Binding),
    Downcast(Rc<LoanPath>, VariantId),
    Extend(Rc<LoanPath>, MutCategoryKey, LoanPathElem),
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum MutCategoryKey {
    Declared,
    Inherited,
    ThroughPointer,
}

impl From<MutCategory> for MutCategoryKey {
    fn from(m: MutCategory) -> Self {
        match m {
            MutCategory::Declared => MutCategoryKey::Declared,
            MutCategory::Inherited => MutCategoryKey::Inherited,
            MutCategory::ThroughPointer => MutCategoryKey::ThroughPointer,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct LoanPath {
    pub variant: LoanPathVariant,
    pub ty: TyId,
}

impl LoanPath {
    pub fn new(variant: LoanPathVariant, ty: TyId) -> Rc<LoanPath> {
        Rc::new(LoanPath { variant, ty })
    }

    /// The root binding of this path, regardless of how many `Extend`/
    /// `Downcast` layers sit on top of it.
    pub fn root_binding(&self) -> Option<Binding> {
        match &self.variant {
            LoanPathVariant::Var(b) | LoanPathVariant::Upvar(b) => Some(*b),
            LoanPathVariant::Downcast(base, _) => base.root_binding(),
            LoanPathVariant::Extend(base, _, _) => base.root_binding(),
        }
    }

    pub fn parent(&self) -> Option<&Rc<LoanPath>> {
        match &self.variant {
            LoanPathVariant::Var(_) | LoanPathVariant::Upvar(_) => None,
            LoanPathVariant::Downcast(base, _) | LoanPathVariant::Extend(base, _, _) => Some(base),
        }
    }

    /// `true` iff this path has no parent.
    pub fn is_variable_path(&self) -> bool {
        self.parent().is_none()
    }

    /// A path is precise iff it contains no `Interior` projection — an
    /// index or pattern-binding step defeats path precision, since two
    /// different indices into the same array cannot be proven disjoint.
    pub fn is_precise(&self) -> bool {
        match &self.variant {
            LoanPathVariant::Var(_) | LoanPathVariant::Upvar(_) => true,
            LoanPathVariant::Extend(_, _, LoanPathElem::Interior(_, _)) => false,
            LoanPathVariant::Downcast(base, _) | LoanPathVariant::Extend(base, _, _) => base.is_precise(),
        }
    }

    /// The lexical scope of the root binding; transparent through
    /// `Downcast`/`Extend`.
    pub fn kill_scope(&self, scopes: &dyn ScopeTree) -> ScopeId {
        let root = self.root_binding().expect("loan path must have a root binding");
        scopes.variable_scope(root)
    }

    /// `true` iff `self` and `other` diverge at some `Interior` projection
    /// — i.e. they are provably-disjoint sibling subplaces.
    pub fn has_fork(self: &Rc<Self>, other: &Rc<Self>) -> bool {
        has_fork_impl(self, other)
    }

    /// `true` iff `self` is `other` or a strict prefix of it (i.e. `other`
    /// extends `self` through zero or more `Extend`/`Downcast` steps).
    pub fn is_prefix_of(&self, other: &LoanPath) -> bool {
        if self == other {
            return true;
        }
        match other.parent() {
            Some(parent) => self.is_prefix_of(parent),
            None => false,
        }
    }
}

fn has_fork_impl(a: &Rc<LoanPath>, b: &Rc<LoanPath>) -> bool {
    if a == b {
        return false;
    }
    let chain_a = ancestor_chain(a);
    let chain_b = ancestor_chain(b);
    let mut i = 0;
    while i < chain_a.len() && i < chain_b.len() && chain_a[i] == chain_b[i] {
        i += 1;
    }
    if i == 0 || i >= chain_a.len() || i >= chain_b.len() {
        // No shared root, or one path is a strict ancestor of the other —
        // a parent/child relation, not a sibling fork.
        return false;
    }
    let step_is_interior = |lp: &Rc<LoanPath>| {
        matches!(lp.variant, LoanPathVariant::Extend(_, _, LoanPathElem::Interior(..)))
    };
    step_is_interior(&chain_a[i]) || step_is_interior(&chain_b[i])
}

/// Root-to-leaf chain of `lp` and all of its ancestors (`lp` included last).
fn ancestor_chain(lp: &Rc<LoanPath>) -> Vec<Rc<LoanPath>> {
    let mut v = vec![lp.clone()];
    let mut cur = lp.clone();
    while let Some(p) = cur.parent().cloned() {
        v.push(p.clone());
        cur = p;
    }
    v.reverse();
    v
}

/// Partial function from a categorized expression to its loan path. Returns
/// `None` for rvalues, statics, or an uncategorizable base — moving out of
/// an rvalue has no path to track.
pub fn compute_loan_path(cmt: &Cmt) -> Option<Rc<LoanPath>> {
    match &cmt.category {
        Categorization::Rvalue | Categorization::StaticItem => None,
        Categorization::Local(b) => Some(LoanPath::new(LoanPathVariant::Var(*b), cmt.ty)),
        Categorization::Upvar(b) => Some(LoanPath::new(LoanPathVariant::Upvar(*b), cmt.ty)),
        Categorization::Deref(base, pk) => {
            let base_lp = compute_loan_path(base)?;
            let elem = LoanPathElem::Deref((*pk).into());
            Some(LoanPath::new(LoanPathVariant::Extend(base_lp, base.mutcat.into(), elem), cmt.ty))
        }
        Categorization::Interior(base, ik) => {
            let base_lp = compute_loan_path(base)?;
            let variant = match &base.category {
                Categorization::Downcast(_, v) => Some(*v),
                _ => None,
            };
            let elem = LoanPathElem::Interior(variant, (*ik).into());
            Some(LoanPath::new(LoanPathVariant::Extend(base_lp, base.mutcat.into(), elem), cmt.ty))
        }
        Categorization::Downcast(base, v) => {
            let base_lp = compute_loan_path(base)?;
            Some(LoanPath::new(LoanPathVariant::Downcast(base_lp, *v), cmt.ty))
        }
    }
}

/// `true` iff the path traverses at least one `Interior` projection. Used
/// to distinguish variable assignments from path (field/element)
/// assignments.
pub fn loan_path_is_field(lp: &LoanPath) -> bool {
    match &lp.variant {
        LoanPathVariant::Var(_) | LoanPathVariant::Upvar(_) => false,
        LoanPathVariant::Extend(base, _, LoanPathElem::Interior(..)) => {
            let _ = base;
            true
        }
        LoanPathVariant::Downcast(base, _) | LoanPathVariant::Extend(base, _, _) => loan_path_is_field(base),
    }
}

pub fn aliasability_of(cmt: &Cmt) -> Aliasability {
    cmt.aliasability
}
