//! Gather-loans: consumes walker events and builds loans, move records and
//! assignment records (spec §4.3).
//!
//! Grounded on `middle/borrowck::gather_loans` in the teacher lineage,
//! wired onto this crate's `BorrowckDelegate` boundary (`crate::oracles`)
//! and its `LoanPath`/`MoveData`/`Loan` types.

use std::collections::HashSet;
use std::rc::Rc;

use crate::diagnostics::{Diagnostic, DiagnosticSink, IllegalMoveOriginKind};
use crate::gates::{check_aliasability, check_mutability};
use crate::idx::IndexVec;
use crate::lifetime::{guarantee_lifetime, LifetimeError};
use crate::loan::{loan_gen_kill_scope, resolve_region_scope, Loan, LoanIndex};
use crate::loan_path::{self, LoanPath, LoanPathElem, LoanPathVariant, MutabilityKey, PointerKindKey};
use crate::move_data::{MoveData, MoveKind};
use crate::oracles::{
    Binding, BorrowKind, BorrowckDelegate, Categorization, Cmt, ConsumeMode, Element, InteriorKind, LoanCause, MatchMode, Mutability,
    MutateMode, PointerKind, Region, ScopeTree, TypeOracle,
};
use crate::restrictions::{compute_restrictions, Restriction};

/// Drives `BorrowckDelegate` events from the first (gather) walk, building
/// the loan table and `MoveData` that the dataflows and the replay pass
/// (`crate::check_loans`) consume.
pub struct GatherLoans<'a> {
    types: &'a dyn TypeOracle,
    scopes: &'a dyn ScopeTree,
    move_data: MoveData,
    loans: IndexVec<LoanIndex, Loan>,
    used_mut: HashSet<Binding>,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> GatherLoans<'a> {
    pub fn new(types: &'a dyn TypeOracle, scopes: &'a dyn ScopeTree, sink: &'a mut dyn DiagnosticSink) -> Self {
        GatherLoans { types, scopes, move_data: MoveData::new(), loans: IndexVec::new(), used_mut: HashSet::new(), sink }
    }

    /// Consumes `self`, handing the accumulated state to the driver (spec
    /// §2 "Control flow": gather-loans -> (loans, move-data)).
    pub fn into_parts(self) -> (MoveData, IndexVec<LoanIndex, Loan>, HashSet<Binding>) {
        (self.move_data, self.loans, self.used_mut)
    }

    fn do_move(&mut self, element: Element, cmt: &Rc<Cmt>, kind: MoveKind) {
        if let Some(origin) = illegal_move_origin(cmt) {
            if let Some(lp) = loan_path::compute_loan_path(cmt) {
                self.sink.report(Diagnostic::MoveOutOfNonOwned { element, path: lp, origin });
            }
            return;
        }
        if let Some(lp) = loan_path::compute_loan_path(cmt) {
            self.move_data.add_move(self.types, lp, element, kind);
        }
    }

    /// `guaranteeValid` (spec §4.3 step 3): checks the lifetime guarantee,
    /// then the mutability/aliasability gates for a mutable/unique borrow,
    /// then computes the restriction and records a `Loan` if one is
    /// needed.
    fn guarantee_valid(&mut self, element: Element, cmt: &Rc<Cmt>, region: Region, kind: BorrowKind, cause: LoanCause) {
        if let Err(err) = guarantee_lifetime(self.scopes, cmt, region) {
            match err {
                LifetimeError::OutOfScope { super_scope, sub_scope } => {
                    self.sink.report(Diagnostic::OutOfScope { element, super_scope, sub_scope });
                }
                LifetimeError::BorrowedPointerTooShort { loan_region, pointer_region } => {
                    self.sink.report(Diagnostic::BorrowedPointerTooShort { element, loan_region, pointer_region });
                }
            }
            return;
        }

        if matches!(kind, BorrowKind::Mutable | BorrowKind::Unique) {
            if check_mutability(cmt, true).is_err() {
                if let Some(b) = loan_path::compute_loan_path(cmt).and_then(|lp| lp.root_binding()) {
                    self.sink.report(Diagnostic::Mutability { element, binding: b });
                }
                return;
            }
            if let Err(err) = check_aliasability(cmt, true) {
                self.sink.report(Diagnostic::AliasabilityViolation { element, reason: err.0 });
                return;
            }
        }

        let (path, restricted) = match compute_restrictions(cmt, kind) {
            Restriction::Safe => return,
            Restriction::SafeIf(path, restricted) => (path, restricted),
        };

        let loan_scope = match resolve_region_scope(self.scopes, region) {
            Some(s) => s,
            None => return,
        };
        let (gen_scope, kill_scope) = loan_gen_kill_scope(self.scopes, element, &path, loan_scope);

        if matches!(kind, BorrowKind::Mutable | BorrowKind::Unique) {
            if let Some(b) = used_mut_binding(&path) {
                self.used_mut.insert(b);
            }
        }

        let index = self.loans.push(Loan {
            index: LoanIndex::new(0),
            path,
            kind,
            restricted,
            gen_scope,
            kill_scope,
            cause,
        });
        self.loans[index].index = index;
    }
}

/// Cannot move out through a dereference of an immutable reference or a
/// raw pointer, nor out of an index into an array (spec §4.10 "Move
/// errors"), nor out of a `static` (spec §7 supplemented origin kinds, see
/// `SPEC_FULL.md` §C).
fn illegal_move_origin(cmt: &Cmt) -> Option<IllegalMoveOriginKind> {
    match &cmt.category {
        Categorization::StaticItem => Some(IllegalMoveOriginKind::StaticItem),
        Categorization::Deref(_, PointerKind::Ref(Mutability::Imm, _)) => Some(IllegalMoveOriginKind::BorrowedContent),
        Categorization::Deref(_, PointerKind::RawPtr(_)) => Some(IllegalMoveOriginKind::BorrowedContent),
        Categorization::Interior(_, InteriorKind::Index) => Some(IllegalMoveOriginKind::InteriorOfSliceOrArray { is_index: true }),
        _ => None,
    }
}

/// Walks a loan path from its leaf toward its root, returning the binding
/// to mark mutably-used (spec §4.4: "the root binding is marked used_mut
/// ... walking the LP outward, treating a Deref through a mutable pointer
/// as 'through-borrow' so the mark stops at the first fresh binding").
/// Crossing a `Deref` of a `&mut` reference stops the walk without marking
/// anything further out: the variable holding that reference need not
/// itself be declared `mut` to write through it.
fn used_mut_binding(lp: &LoanPath) -> Option<Binding> {
    match &lp.variant {
        LoanPathVariant::Var(b) | LoanPathVariant::Upvar(b) => Some(*b),
        LoanPathVariant::Downcast(base, _) => used_mut_binding(base),
        LoanPathVariant::Extend(_, _, LoanPathElem::Deref(PointerKindKey::Ref(MutabilityKey::Mut))) => None,
        LoanPathVariant::Extend(base, _, _) => used_mut_binding(base),
    }
}

impl<'a> BorrowckDelegate for GatherLoans<'a> {
    fn consume(&mut self, element: Element, cmt: Rc<Cmt>, mode: ConsumeMode) {
        if let ConsumeMode::Move(_) = mode {
            self.do_move(element, &cmt, MoveKind::MoveExpr);
        }
    }

    fn consume_pat(&mut self, pat: Element, cmt: Rc<Cmt>, mode: ConsumeMode) {
        if let ConsumeMode::Move(_) = mode {
            self.do_move(pat, &cmt, MoveKind::MovePat);
        }
    }

    fn matched_pat(&mut self, _pat: Element, _cmt: Rc<Cmt>, _mode: MatchMode) {
        // Informational only; no action required by this core (spec §4.1).
    }

    fn borrow(&mut self, element: Element, cmt: Rc<Cmt>, region: Region, kind: BorrowKind, cause: LoanCause) {
        self.guarantee_valid(element, &cmt, region, kind, cause);
    }

    fn mutate(&mut self, element: Element, cmt: Rc<Cmt>, _mode: MutateMode) {
        let is_local = matches!(cmt.category, Categorization::Local(_));
        if !is_local {
            if check_mutability(&cmt, true).is_err() {
                if let Some(b) = loan_path::compute_loan_path(&cmt).and_then(|lp| lp.root_binding()) {
                    self.sink.report(Diagnostic::Mutability { element, binding: b });
                }
                return;
            }
            if let Err(err) = check_aliasability(&cmt, true) {
                self.sink.report(Diagnostic::AliasabilityViolation { element, reason: err.0 });
                return;
            }
        }
        if let Some(lp) = loan_path::compute_loan_path(&cmt) {
            self.move_data.add_assignment(self.types, lp, element, element);
        }
    }

    fn declaration_without_init(&mut self, binding: Binding, element: Element) {
        // Variables begin uninitialized: a declaration without an
        // initializer is a `Declared` move at the binding's own point
        // (spec §4.1).
        let lp = LoanPath::new(LoanPathVariant::Var(binding), self.types.type_of(element));
        self.move_data.add_move(self.types, lp, element, MoveKind::Declared);
    }
}
