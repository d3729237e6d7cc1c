//! Loan recording and scope arithmetic (spec §3 "Loan", §4.7 "Loan
//! recording — scope arithmetic").
//!
//! Grounded on the `gen_scope`/`kill_scope` narrowing described for
//! `middle/borrowck::gather_loans::Loan` in the teacher lineage; written in
//! the idiom established by `crate::move_data`/`crate::loan_path`.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::idx::new_index;
use crate::loan_path::LoanPath;
use crate::oracles::{BorrowKind, Element, LoanCause, Region, ScopeId, ScopeTree};

/// A loan restricts at most a handful of sibling paths in practice (the
/// projections leading from the borrowed place up to its root), so the
/// restricted set is a `smallvec` rather than a heap-allocating `Vec` for
/// the common case (see `SPEC_FULL.md` §B).
pub type RestrictedPaths = SmallVec<[Rc<LoanPath>; 4]>;

new_index! {
    /// Index into the per-body loan table; doubles as the bit position of
    /// a loan in the loan dataflow (spec §4.7: "Its index is the bit
    /// position in the loan dataflow").
    #[derive(Debug)]
    pub struct LoanIndex, "loan"
}

/// A recorded borrow (spec §3 "Loan"). Invariants: `gen_scope` is a
/// sub-scope-or-equal of `kill_scope`; `path` is one of `restricted`;
/// `kind == Mutable` implies `path` was checked mutable and non-aliasable
/// before this loan was created.
pub struct Loan {
    pub index: LoanIndex,
    pub path: Rc<LoanPath>,
    pub kind: BorrowKind,
    pub restricted: RestrictedPaths,
    pub gen_scope: ScopeId,
    pub kill_scope: ScopeId,
    pub cause: LoanCause,
}

/// Resolves a borrow's `Region` to the scope it must not outlive (spec
/// §4.7: "`Scope(s)` -> `s`; `EarlyBound`/`Free` -> mapped free scope;
/// `Static` -> item upper bound; otherwise drop").
pub fn resolve_region_scope(scopes: &dyn ScopeTree, region: Region) -> Option<ScopeId> {
    match region {
        Region::Scope(s) => Some(s),
        Region::EarlyBound(_) => scopes.get_early_free_scope(region),
        Region::Free(_) => scopes.get_free_scope(region),
        Region::Static => Some(scopes.item_scope()),
    }
}

/// Computes `genScope`/`killScope` for a loan about to be recorded at
/// `borrow_element` over `path`, given the already-resolved `loan_scope`
/// (spec §4.7).
///
/// `genScope = borrowScope` if `borrowScope ⊆ loanScope`, else `loanScope`
/// — a loan introduced by, say, a method call argued at a call site can
/// only begin once that call site is reached, even if the region it is
/// tied to starts earlier. `killScope = min(loanScope, lexicalScope(path))`
/// — a reborrow of `&mut T -> &mut U` may outlive the binding holding `T`.
pub fn loan_gen_kill_scope(scopes: &dyn ScopeTree, borrow_element: Element, path: &LoanPath, loan_scope: ScopeId) -> (ScopeId, ScopeId) {
    let borrow_scope = scopes.element_scope(borrow_element);
    let gen_scope = if scopes.is_sub_scope_of_or_eq(borrow_scope, loan_scope) { borrow_scope } else { loan_scope };

    let lexical_scope = path.kill_scope(scopes);
    let kill_scope = if scopes.is_sub_scope_of_or_eq(loan_scope, lexical_scope) { loan_scope } else { lexical_scope };

    (gen_scope, kill_scope)
}
