//! Gen/kill construction for the three per-body dataflows (spec §4.9) and
//! their instantiation over the generic engine (spec §4.8 "Three
//! dataflows are instantiated per body: loans, moves, var-assignments").
//!
//! Grounded on the gen/kill wiring described for `DataFlowContext` in
//! `middle/borrowck/move_data.rs`, adapted onto `crate::dataflow`'s
//! generic engine.

use std::collections::HashSet;

use crate::dataflow::{DataflowContext, KillKind};
use crate::idx::IndexVec;
use crate::loan::{Loan, LoanIndex};
use crate::move_data::{AssignIndex, MoveData, MoveIndex};
use crate::oracles::{local_index, ControlFlowGraph, Element, ScopeTree};
use crate::CancellationToken;

/// The three dataflow results a single function-body analysis needs
/// (spec §4.8).
pub struct Flows<'cfg> {
    pub loans: DataflowContext<'cfg, LoanIndex>,
    pub moves: DataflowContext<'cfg, MoveIndex>,
    pub assigns: DataflowContext<'cfg, AssignIndex>,
}

/// Builds and propagates the loan, move and var-assignment dataflows for
/// one function body (spec §2 "Control flow": "build two dataflows (loans,
/// moves) and one assignment dataflow"). Returns `None` if `cancel` fires
/// after any of the three `propagate()` calls (spec §5's "after each
/// dataflow `propagate`" checkpoint).
pub fn build_and_propagate<'cfg>(
    cfg: &'cfg dyn ControlFlowGraph,
    scopes: &dyn ScopeTree,
    move_data: &MoveData,
    loans: &IndexVec<LoanIndex, Loan>,
    cancel: &dyn CancellationToken,
) -> Option<Flows<'cfg>> {
    let mut elements: HashSet<Element> = HashSet::new();
    for loan in loans.iter() {
        elements.insert(scopes.scope_element(loan.gen_scope));
        elements.insert(scopes.scope_element(loan.kill_scope));
    }
    for mv in move_data.moves.iter() {
        elements.insert(mv.element);
    }
    for assignment in move_data.var_assignments.iter().chain(move_data.path_assignments.iter()) {
        elements.insert(assignment.element);
    }
    for (_, path) in move_data.paths.iter_enumerated() {
        if let Some(b) = path.loan_path.root_binding() {
            elements.insert(scopes.scope_element(scopes.variable_scope(b)));
        }
    }

    let local_idx = local_index(cfg, elements.into_iter());

    let mut loan_dfcx = DataflowContext::new(cfg, local_idx.clone(), loans.len());
    for loan in loans.iter() {
        loan_dfcx.add_gen(scopes.scope_element(loan.gen_scope), loan.index);
        loan_dfcx.add_kill(KillKind::ScopeEnd, scopes.scope_element(loan.kill_scope), loan.index);
    }
    loan_dfcx.add_kills_from_flow_exits();
    loan_dfcx.propagate();
    if cancel.is_cancelled() {
        return None;
    }

    let mut move_dfcx = DataflowContext::new(cfg, local_idx.clone(), move_data.moves.len());
    for (mv_index, mv) in move_data.moves.iter_enumerated() {
        move_dfcx.add_gen(mv.element, mv_index);
    }
    // Moves are execution-killed at every variable or path assignment that
    // writes any ancestor path -- re-initializing re-live-s them (spec
    // §4.9 "Moves").
    for assignment in move_data.var_assignments.iter().chain(move_data.path_assignments.iter()) {
        for mi in move_data.execution_kill_targets(assignment.path) {
            move_dfcx.add_kill(KillKind::Execution, assignment.element, mi);
        }
    }
    // Moves are scope-killed when the root variable of their path leaves
    // scope, but only for precise paths -- an imprecise path (one
    // traversing an `Interior`) leaves its sibling live, so the move
    // through it is not scope-killed (spec §4.9, `MoveData::scope_kill_targets`).
    for (path_index, path) in move_data.paths.iter_enumerated() {
        if let Some(b) = path.loan_path.root_binding() {
            let scope_element = scopes.scope_element(scopes.variable_scope(b));
            for mi in move_data.scope_kill_targets(path_index) {
                move_dfcx.add_kill(KillKind::ScopeEnd, scope_element, mi);
            }
        }
    }
    move_dfcx.add_kills_from_flow_exits();
    move_dfcx.propagate();
    if cancel.is_cancelled() {
        return None;
    }

    let mut assign_dfcx = DataflowContext::new(cfg, local_idx, move_data.var_assignments.len());
    for (assign_index, assignment) in move_data.var_assignments.iter_enumerated() {
        assign_dfcx.add_gen(assignment.element, assign_index);
        let path = &move_data.paths[assignment.path];
        if let Some(b) = path.loan_path.root_binding() {
            assign_dfcx.add_kill(KillKind::ScopeEnd, scopes.scope_element(scopes.variable_scope(b)), assign_index);
        }
    }
    assign_dfcx.add_kills_from_flow_exits();
    assign_dfcx.propagate();
    if cancel.is_cancelled() {
        return None;
    }

    Some(Flows { loans: loan_dfcx, moves: move_dfcx, assigns: assign_dfcx })
}
