//! The conflict checker: the walker's second (replay) pass (spec §4.10).
//! Consults the three dataflows built by `crate::flow` at every event and
//! reports violations.
//!
//! Grounded on `middle/borrowck::check_loans` in the teacher lineage,
//! wired onto this crate's dataflow engine and `BorrowckDelegate` boundary.

use std::rc::Rc;

use crate::dataflow::DataflowContext;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::idx::IndexVec;
use crate::loan::{Loan, LoanIndex};
use crate::loan_path::LoanPath;
use crate::move_data::{AssignIndex, MoveData, MoveIndex};
use crate::oracles::{BorrowKind, BorrowckDelegate, Cmt, ConsumeMode, Element, MatchMode, Mutability, MutateMode, Region, TypeOracle};
use crate::BorrowCheckConfig;

/// Drives `BorrowckDelegate` events from the second (replay) walk, reading
/// the loan/move/var-assignment dataflows built from the first walk.
pub struct CheckLoans<'a> {
    types: &'a dyn TypeOracle,
    move_data: &'a MoveData,
    loans: &'a IndexVec<LoanIndex, Loan>,
    loan_dfcx: &'a DataflowContext<'a, LoanIndex>,
    move_dfcx: &'a DataflowContext<'a, MoveIndex>,
    assign_dfcx: &'a DataflowContext<'a, AssignIndex>,
    config: BorrowCheckConfig,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> CheckLoans<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        types: &'a dyn TypeOracle,
        move_data: &'a MoveData,
        loans: &'a IndexVec<LoanIndex, Loan>,
        loan_dfcx: &'a DataflowContext<'a, LoanIndex>,
        move_dfcx: &'a DataflowContext<'a, MoveIndex>,
        assign_dfcx: &'a DataflowContext<'a, AssignIndex>,
        config: BorrowCheckConfig,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        CheckLoans { types, move_data, loans, loan_dfcx, move_dfcx, assign_dfcx, config, sink }
    }

    /// "Use of moved value" (spec §4.10): for a use at `element` of place
    /// `lp`, flag any live move whose path is a base of `lp` or vice
    /// versa -- unless a covering re-initialization is also live, or the
    /// two paths diverge at an `Interior` (sibling fields, `hasFork`).
    fn check_if_path_is_moved(&mut self, element: Element, lp: &Rc<LoanPath>) {
        let mut found: Option<MoveIndex> = None;
        self.move_dfcx.each_bit_on_entry(element, |move_index| {
            let moved_path = self.move_data.path_loan_path(self.move_data.moves[move_index].path);
            let related = moved_path == *lp || moved_path.is_prefix_of(lp) || lp.is_prefix_of(&moved_path);
            if related && !lp.has_fork(&moved_path) && !self.covering_assignment_on_entry(element, &moved_path) {
                found = Some(move_index);
                return false;
            }
            true
        });
        if let Some(move_index) = found {
            let moved_path = self.move_data.path_loan_path(self.move_data.moves[move_index].path);
            self.sink.report(Diagnostic::UseOfMovedValue { use_element: element, move_index, moved_path });
        }
    }

    /// `true` iff some assignment live on entry to `element` re-initializes
    /// `moved_path` or a covering ancestor of it.
    fn covering_assignment_on_entry(&self, element: Element, moved_path: &Rc<LoanPath>) -> bool {
        let mut found = false;
        self.assign_dfcx.each_bit_on_entry(element, |assign_index| {
            let assigned_path = self.move_data.path_loan_path(self.move_data.var_assignments[assign_index].path);
            if assigned_path == *moved_path || assigned_path.is_prefix_of(moved_path) {
                found = true;
                return false;
            }
            true
        });
        found
    }

    /// Loan conflicts (spec §4.10): for an access at `element` on place
    /// `lp`, flag any live loan restricting a place that is an ancestor of,
    /// descendant of, or equal to `lp` (and does not fork from it), unless
    /// the access is permitted by the loan's kind. A shared loan forbids
    /// writes and mutable borrows; a mutable/unique loan forbids every
    /// other access, including reads.
    fn check_loan_conflicts(&mut self, element: Element, lp: &Rc<LoanPath>, is_write: bool) {
        let mut found: Option<LoanIndex> = None;
        self.loan_dfcx.each_bit_on_entry(element, |loan_index| {
            let loan = &self.loans[loan_index];
            let conflicts_on_path = loan.restricted.iter().any(|r| *r == *lp || r.is_prefix_of(lp) || lp.is_prefix_of(r));
            if conflicts_on_path && !lp.has_fork(&loan.path) {
                let forbidden = match loan.kind {
                    BorrowKind::Shared => is_write,
                    BorrowKind::Mutable | BorrowKind::Unique => true,
                };
                if forbidden {
                    found = Some(loan_index);
                    return false;
                }
            }
            true
        });
        if let Some(loan_index) = found {
            let path = self.loans[loan_index].path.clone();
            self.sink.report(Diagnostic::LoanConflict { element, loan_index, path });
        }
    }

    /// "Reassignment of immutable binding" (spec §4.10): a second
    /// var-assignment bit live on entry to the same variable path is an
    /// error, gated behind `config.report_reassign_immutable` (spec §9
    /// Open Questions; see `SPEC_FULL.md` §B).
    fn check_reassignment(&mut self, element: Element, lp: &Rc<LoanPath>, binding_mutable: bool) {
        if !self.config.report_reassign_immutable || binding_mutable || !lp.is_variable_path() {
            return;
        }
        let path_index = match self.move_data.existing_move_path(lp) {
            Some(p) => p,
            None => return,
        };
        let mut reassigned = false;
        self.assign_dfcx.each_bit_on_entry(element, |assign_index| {
            if self.move_data.var_assignments[assign_index].path == path_index {
                reassigned = true;
                return false;
            }
            true
        });
        if reassigned {
            self.sink.report(Diagnostic::ReassignImmutable { element, path: lp.clone() });
        }
    }
}

impl<'a> BorrowckDelegate for CheckLoans<'a> {
    fn consume(&mut self, element: Element, cmt: Rc<Cmt>, _mode: ConsumeMode) {
        if let Some(lp) = crate::loan_path::compute_loan_path(&cmt) {
            self.check_if_path_is_moved(element, &lp);
            self.check_loan_conflicts(element, &lp, false);
        }
    }

    fn consume_pat(&mut self, pat: Element, cmt: Rc<Cmt>, mode: ConsumeMode) {
        self.consume(pat, cmt, mode);
    }

    fn matched_pat(&mut self, _pat: Element, _cmt: Rc<Cmt>, _mode: MatchMode) {}

    fn borrow(&mut self, element: Element, cmt: Rc<Cmt>, _region: Region, kind: BorrowKind, _cause: crate::oracles::LoanCause) {
        if let Some(lp) = crate::loan_path::compute_loan_path(&cmt) {
            self.check_if_path_is_moved(element, &lp);
            self.check_loan_conflicts(element, &lp, !matches!(kind, BorrowKind::Shared));
        }
    }

    fn mutate(&mut self, element: Element, cmt: Rc<Cmt>, mode: MutateMode) {
        if let Some(lp) = crate::loan_path::compute_loan_path(&cmt) {
            self.check_loan_conflicts(element, &lp, true);
            if matches!(mode, MutateMode::Init | MutateMode::JustWrite) {
                let binding_mutable =
                    lp.root_binding().map(|b| self.types.mutability_of(b) == Mutability::Mut).unwrap_or(true);
                self.check_reassignment(element, &lp, binding_mutable);
            }
        }
    }

    fn declaration_without_init(&mut self, _binding: crate::oracles::Binding, _element: Element) {}
}
