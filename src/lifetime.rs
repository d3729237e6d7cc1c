//! Lifetime guarantee (spec §4.5): checks that every pointer step on the
//! way to a borrowed place has a lifetime outliving the loan's region,
//! before a loan is ever created.
//!
//! Grounded on the `guarantee_valid`/region-outlives recursion described
//! for `middle/borrowck::gather_loans::lifetime` in the teacher lineage.

use crate::loan::resolve_region_scope;
use crate::oracles::{Categorization, Cmt, PointerKind, Region, ScopeId, ScopeTree};

/// Why a loan's region cannot be guaranteed valid (spec §4.5, §7 "Gather-
/// time" `OutOfScope`/`BorrowedPointerTooShort`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LifetimeError {
    /// The loan's region is not contained in `super_scope`, the scope of
    /// the local variable at the root of the borrowed place.
    OutOfScope { super_scope: ScopeId, sub_scope: ScopeId },
    /// The loan's region outlives the region of an intermediate `&`
    /// reference it is borrowed through.
    BorrowedPointerTooShort { loan_region: Region, pointer_region: Region },
}

/// Recurses on `cmt`'s categorization chain, requiring at each `Deref` of a
/// `&'r T` that `loan_region ⊆ r`, and at the root `Local`/`Upvar` binding
/// that `loan_region ⊆ variableScope(b)` (spec §4.5). `Unique`/`RawPtr`
/// derefs and `Interior`/`Downcast` steps are transparent — they carry no
/// lifetime of their own to check.
pub fn guarantee_lifetime(scopes: &dyn ScopeTree, cmt: &Cmt, loan_region: Region) -> Result<(), LifetimeError> {
    match &cmt.category {
        Categorization::Rvalue | Categorization::StaticItem => Ok(()),
        Categorization::Local(b) | Categorization::Upvar(b) => {
            let var_scope = scopes.variable_scope(*b);
            require_region_in_scope(scopes, loan_region, var_scope)
        }
        Categorization::Deref(base, PointerKind::Ref(_, r)) => {
            require_region_outlives(scopes, loan_region, *r)?;
            guarantee_lifetime(scopes, base, loan_region)
        }
        Categorization::Deref(base, PointerKind::Unique) | Categorization::Deref(base, PointerKind::RawPtr(_)) => {
            guarantee_lifetime(scopes, base, loan_region)
        }
        Categorization::Interior(base, _) | Categorization::Downcast(base, _) => guarantee_lifetime(scopes, base, loan_region),
    }
}

fn require_region_in_scope(scopes: &dyn ScopeTree, loan_region: Region, target: ScopeId) -> Result<(), LifetimeError> {
    match resolve_region_scope(scopes, loan_region) {
        Some(loan_scope) if scopes.is_sub_scope_of_or_eq(loan_scope, target) => Ok(()),
        Some(loan_scope) => Err(LifetimeError::OutOfScope { super_scope: target, sub_scope: loan_scope }),
        // A region that does not resolve to a concrete scope (e.g. a free
        // region with no mapping yet, spec §9 "`FreeRegionMap` is
        // constructed empty in the source") cannot be proven to violate —
        // absence of proof is not proof of violation.
        None => Ok(()),
    }
}

fn require_region_outlives(scopes: &dyn ScopeTree, loan_region: Region, pointer_region: Region) -> Result<(), LifetimeError> {
    if matches!(pointer_region, Region::Static) {
        return Ok(());
    }
    match (resolve_region_scope(scopes, loan_region), resolve_region_scope(scopes, pointer_region)) {
        (Some(loan_scope), Some(ptr_scope)) if scopes.is_sub_scope_of_or_eq(loan_scope, ptr_scope) => Ok(()),
        (Some(_), Some(_)) => Err(LifetimeError::BorrowedPointerTooShort { loan_region, pointer_region }),
        _ => Ok(()),
    }
}
