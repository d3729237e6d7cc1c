//! Accumulates moves, assignments and the move-path tree (spec §3
//! "MoveData", §4.3 "Gather-loans" moves/assignments, §4.9 gen/kill
//! construction for the move and var-assignment dataflows).
//!
//! Grounded on `middle/borrowck/move_data.rs` (`MovePath`, `Move`,
//! `Assignment`, `move_path`/`add_move`/`add_assignment`,
//! `each_base_path`/`each_extending_path`/`each_applicable_move`,
//! `loan_path_is_precise`), ported from the teacher's `RefCell<Vec<_>>` +
//! sentinel-index style to an `IndexVec`/`Option<Index>` style matching the
//! later `src/librustc_mir/dataflow/move_paths/mod.rs`.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use crate::idx::{new_index, IndexVec};
use crate::loan_path::{InteriorKindKey, LoanPath, LoanPathElem, LoanPathVariant};
use crate::oracles::{Element, MutateMode, TypeOracle};

new_index! {
    /// Index into `MoveData::paths`.
    #[derive(Debug)]
    pub struct MovePathIndex, "mp"
}

new_index! {
    /// Index into `MoveData::moves`.
    #[derive(Debug)]
    pub struct MoveIndex, "mv"
}

new_index! {
    /// Index into `MoveData::var_assignments`; the bit position of a
    /// variable assignment in the var-assignment dataflow (spec §4.9).
    #[derive(Debug)]
    pub struct AssignIndex, "asn"
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MoveKind {
    /// Variables begin uninitialized — a `declarationWithoutInit` event
    /// records a move at the binding's own point (spec §4.1).
    Declared,
    MoveExpr,
    MovePat,
    Captured,
}

pub struct MovePath {
    pub loan_path: Rc<LoanPath>,
    pub parent: Option<MovePathIndex>,
    pub first_move: Option<MoveIndex>,
    pub first_child: Option<MovePathIndex>,
    pub next_sibling: Option<MovePathIndex>,
}

pub struct Move {
    pub path: MovePathIndex,
    pub element: Element,
    pub kind: MoveKind,
    pub next_move: Option<MoveIndex>,
}

#[derive(Clone)]
pub struct Assignment {
    pub path: MovePathIndex,
    pub element: Element,
    pub assignee: Element,
}

#[derive(Default)]
pub struct MoveData {
    pub paths: IndexVec<MovePathIndex, MovePath>,
    path_map: FxHashMap<Rc<LoanPath>, MovePathIndex>,
    pub moves: IndexVec<MoveIndex, Move>,
    /// Variable assignments, tracked by the var-assignment dataflow (spec
    /// §4.9) — each one is a bit position.
    pub var_assignments: IndexVec<AssignIndex, Assignment>,
    /// Path (field/element) assignments. Not fed to a dataflow of their own
    /// (spec §4.9: "Path assignments are not tracked by dataflow"); they
    /// only execution-kill moves.
    pub path_assignments: Vec<Assignment>,
}

impl MoveData {
    pub fn new() -> Self {
        MoveData::default()
    }

    pub fn path_loan_path(&self, index: MovePathIndex) -> Rc<LoanPath> {
        self.paths[index].loan_path.clone()
    }

    fn is_var_path(&self, index: MovePathIndex) -> bool {
        self.paths[index].parent.is_none()
    }

    /// Returns the existing move path index for `lp`, inserting a fresh
    /// node — and any missing ancestor nodes — if absent (spec §3
    /// invariant: "parent is inserted first and child is linked on
    /// firstChild").
    pub fn move_path(&mut self, lp: Rc<LoanPath>) -> MovePathIndex {
        if let Some(&index) = self.path_map.get(&lp) {
            return index;
        }

        let parent = lp.parent().cloned();
        let parent_index = parent.map(|p| self.move_path(p));

        let index = self.paths.push(MovePath {
            loan_path: lp.clone(),
            parent: parent_index,
            first_move: None,
            first_child: None,
            next_sibling: parent_index.map(|p| self.paths[p].first_child).flatten(),
        });
        if let Some(p) = parent_index {
            self.paths[p].first_child = Some(index);
        }

        self.path_map.insert(lp, index);
        index
    }

    pub fn existing_move_path(&self, lp: &Rc<LoanPath>) -> Option<MovePathIndex> {
        self.path_map.get(lp).copied()
    }

    /// Indices for `lp` and every base path of `lp` that already has a move
    /// path, without creating new ones (spec §4.10 `existingBasePaths`).
    pub fn existing_base_paths(&self, lp: &Rc<LoanPath>) -> Vec<MovePathIndex> {
        let mut result = Vec::new();
        self.add_existing_base_paths(lp, &mut result);
        result
    }

    fn add_existing_base_paths(&self, lp: &Rc<LoanPath>, result: &mut Vec<MovePathIndex>) {
        if let Some(index) = self.path_map.get(lp).copied() {
            self.each_base_path(index, |p| {
                result.push(p);
                true
            });
        } else if let Some(parent) = lp.parent() {
            self.add_existing_base_paths(parent, result);
        }
    }

    /// Walks `index` and its ancestors outward (spec §4.10 `eachBasePath`).
    pub fn each_base_path(&self, index: MovePathIndex, mut f: impl FnMut(MovePathIndex) -> bool) -> bool {
        let mut p = Some(index);
        while let Some(cur) = p {
            if !f(cur) {
                return false;
            }
            p = self.paths[cur].parent;
        }
        true
    }

    /// Walks `index` and every path that extends it (spec §4.9
    /// `eachExtendingPath`).
    pub fn each_extending_path(&self, index: MovePathIndex, f: &mut impl FnMut(MovePathIndex) -> bool) -> bool {
        if !f(index) {
            return false;
        }
        let mut child = self.paths[index].first_child;
        while let Some(c) = child {
            if !self.each_extending_path(c, f) {
                return false;
            }
            child = self.paths[c].next_sibling;
        }
        true
    }

    /// Every move recorded against `index` or any path that extends it
    /// (spec §4.9 `eachApplicableMove`).
    pub fn each_applicable_move(&self, index: MovePathIndex, f: &mut impl FnMut(MoveIndex) -> bool) -> bool {
        let mut ret = true;
        self.each_extending_path(index, &mut |p| {
            let mut m = self.paths[p].first_move;
            while let Some(mi) = m {
                if !f(mi) {
                    ret = false;
                    break;
                }
                m = self.moves[mi].next_move;
            }
            ret
        });
        ret
    }

    /// Adds a move entry, broadcasting to union siblings first (spec §4.3
    /// "Union fields rule", testable property 5).
    pub fn add_move(&mut self, types: &dyn TypeOracle, lp: Rc<LoanPath>, element: Element, kind: MoveKind) {
        self.broadcast_union_siblings(types, &lp, element, kind);
        let path_index = self.move_path(lp);
        self.record_move(path_index, element, kind);
    }

    fn record_move(&mut self, path_index: MovePathIndex, element: Element, kind: MoveKind) {
        let next_move = self.paths[path_index].first_move;
        let move_index = self.moves.push(Move { path: path_index, element, kind, next_move });
        self.paths[path_index].first_move = Some(move_index);
    }

    /// Adds an assignment record, classified as a variable- or
    /// path-assignment by `isVariablePath` (spec §4.3).
    pub fn add_assignment(&mut self, types: &dyn TypeOracle, lp: Rc<LoanPath>, element: Element, assignee: Element) {
        self.broadcast_union_siblings_assign(types, &lp, element, assignee);
        let path_index = self.move_path(lp);

        let assignment = Assignment { path: path_index, element, assignee };
        if self.is_var_path(path_index) {
            self.var_assignments.push(assignment);
        } else {
            self.path_assignments.push(assignment);
        }
    }

    /// Walks outward through nested `Extend`s, and at every union level
    /// synthesizes a move for every other field of the same union (spec
    /// §4.3, §4.9 testable property 5).
    fn broadcast_union_siblings(&mut self, types: &dyn TypeOracle, lp: &Rc<LoanPath>, element: Element, kind: MoveKind) {
        for (base, field, mutcat) in union_extend_steps(types, lp) {
            for sibling in types.named_fields(base.ty) {
                if InteriorKindKey::Field(*sibling) == field {
                    continue;
                }
                let sibling_elem = LoanPathElem::Interior(union_variant(lp), InteriorKindKey::Field(*sibling));
                let sibling_ty = types.field_type(base.ty, *sibling);
                let sibling_lp = LoanPath::new(LoanPathVariant::Extend(base.clone(), mutcat, sibling_elem), sibling_ty);
                let sibling_index = self.move_path(sibling_lp);
                self.record_move(sibling_index, element, kind);
            }
        }
    }

    fn broadcast_union_siblings_assign(&mut self, types: &dyn TypeOracle, lp: &Rc<LoanPath>, element: Element, assignee: Element) {
        for (base, field, mutcat) in union_extend_steps(types, lp) {
            for sibling in types.named_fields(base.ty) {
                if InteriorKindKey::Field(*sibling) == field {
                    continue;
                }
                let sibling_elem = LoanPathElem::Interior(union_variant(lp), InteriorKindKey::Field(*sibling));
                let sibling_ty = types.field_type(base.ty, *sibling);
                let sibling_lp = LoanPath::new(LoanPathVariant::Extend(base.clone(), mutcat, sibling_elem), sibling_ty);
                let path_index = self.move_path(sibling_lp);
                self.var_assignments_or_path(path_index).push(Assignment { path: path_index, element, assignee });
            }
        }
    }

    fn var_assignments_or_path(&mut self, path_index: MovePathIndex) -> &mut Vec<Assignment> {
        if self.is_var_path(path_index) {
            &mut self.var_assignments
        } else {
            &mut self.path_assignments
        }
    }

    /// Moves whose path lies in the subtree of `written_path`, irrespective
    /// of precision — assignments kill moves to the path they write and to
    /// every path that extends it (spec §4.9: "execution-killed at every
    /// variable or path assignment that writes any ancestor path").
    pub fn execution_kill_targets(&self, written_path: MovePathIndex) -> Vec<MoveIndex> {
        let mut out = Vec::new();
        self.each_applicable_move(written_path, &mut |mi| {
            out.push(mi);
            true
        });
        out
    }

    /// Moves whose path lies in the subtree of `path`, but only when `path`
    /// is precise — scope-end kills do not apply through an `Interior`
    /// projection, since the sibling fields remain live (spec §4.9: "the
    /// engine restricts scope-kills to precise paths").
    pub fn scope_kill_targets(&self, path: MovePathIndex) -> Vec<MoveIndex> {
        let lp = self.path_loan_path(path);
        if !lp.is_precise() {
            return Vec::new();
        }
        self.execution_kill_targets(path)
    }
}

fn union_variant(lp: &Rc<LoanPath>) -> Option<crate::oracles::VariantId> {
    match &lp.variant {
        LoanPathVariant::Extend(_, _, LoanPathElem::Interior(v, _)) => *v,
        _ => None,
    }
}

/// Yields `(base, field, mutcat)` for every `Extend(base, mutcat,
/// Interior(_, Field(field)))` step on the way from `lp` up to the root,
/// where `base`'s type is a union (spec §4.3 "walk outward through nested
/// `Extend`s applying the union rule at each union level").
fn union_extend_steps(
    types: &dyn TypeOracle,
    lp: &Rc<LoanPath>,
) -> Vec<(Rc<LoanPath>, InteriorKindKey, crate::loan_path::MutCategoryKey)> {
    let mut out = Vec::new();
    let mut cur = lp.clone();
    while let LoanPathVariant::Extend(base, mutcat, LoanPathElem::Interior(_, field)) = cur.variant.clone() {
        if types.is_union(base.ty) {
            out.push((base.clone(), field, mutcat));
        }
        cur = base;
    }
    out
}
