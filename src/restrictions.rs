//! Restriction computation (spec §4.4): for a borrow of a place, derive the
//! set of sibling places whose accesses must be forbidden during the loan.
//!
//! Grounded on `middle/borrowck::gather_loans::restrictions` in the
//! teacher lineage (`RestrictionResult::{Safe, SafeIf}`), ported onto this
//! crate's `LoanPath`/`Cmt` model.

use std::rc::Rc;

use smallvec::smallvec;

use crate::loan::RestrictedPaths;
use crate::loan_path::{compute_loan_path, LoanPath};
use crate::oracles::{BorrowKind, Categorization, Cmt, Mutability, PointerKind};

/// The outcome of restricting a borrowed place (spec §4.4): either no loan
/// is needed at all (`Safe`, e.g. borrowing a `'static` or an rvalue), or a
/// loan is needed on `LoanPath` and every access to any place in
/// `restricted` must be forbidden while the loan is live.
pub enum Restriction {
    Safe,
    SafeIf(Rc<LoanPath>, RestrictedPaths),
}

/// Computes the restriction for a borrow of `cmt` at the requested
/// `loan_kind` (spec §4.4). The lifetime guarantee (spec §4.5) is assumed
/// to have already been checked by the caller — the `Ref(Imm, r)` arm
/// below does not re-derive `region ⊆ r` itself.
pub fn compute_restrictions(cmt: &Cmt, loan_kind: BorrowKind) -> Restriction {
    let lp = match compute_loan_path(cmt) {
        Some(lp) => lp,
        None => return Restriction::Safe,
    };

    match &cmt.category {
        // Rvalues/statics have no loan path, so this arm is unreachable —
        // `compute_loan_path` already returned `None` for them above.
        Categorization::Rvalue | Categorization::StaticItem => Restriction::Safe,

        Categorization::Local(_) | Categorization::Upvar(_) => Restriction::SafeIf(lp.clone(), smallvec![lp]),

        Categorization::Interior(base, _) => extend_or_safe(lp, compute_restrictions(base, loan_kind)),

        Categorization::Downcast(base, _) => match compute_restrictions(base, loan_kind) {
            Restriction::Safe => Restriction::Safe,
            Restriction::SafeIf(_, restricted) => Restriction::SafeIf(lp, restricted),
        },

        Categorization::Deref(base, PointerKind::Unique) => extend_or_safe(lp, compute_restrictions(base, loan_kind)),

        // A shared reference's referent lives at least as long as the
        // loan (checked by the lifetime guarantee pass) and is already
        // reachable by any other alias of the reference, so restricting
        // `base`'s sibling accesses buys nothing: only this path itself
        // need be forbidden.
        Categorization::Deref(_, PointerKind::Ref(Mutability::Imm, _)) => Restriction::SafeIf(lp.clone(), smallvec![lp]),

        // A reborrow through a `&mut` only needs to lock the base's
        // siblings when the new loan is itself exclusive (`Mutable`/
        // `Unique`); a shared reborrow of a `&mut T` is permitted without
        // locking the outer place's siblings at all.
        Categorization::Deref(base, PointerKind::Ref(Mutability::Mut, _)) => match compute_restrictions(base, loan_kind) {
            Restriction::Safe => Restriction::Safe,
            Restriction::SafeIf(_, restricted) => {
                if matches!(loan_kind, BorrowKind::Mutable | BorrowKind::Unique) {
                    let mut restricted = restricted;
                    restricted.insert(0, lp.clone());
                    Restriction::SafeIf(lp, restricted)
                } else {
                    Restriction::SafeIf(lp.clone(), smallvec![lp])
                }
            }
        },

        // Unsafe; the checker does not constrain raw-pointer derefs.
        Categorization::Deref(_, PointerKind::RawPtr(_)) => Restriction::Safe,
    }
}

fn extend_or_safe(lp: Rc<LoanPath>, inner: Restriction) -> Restriction {
    match inner {
        Restriction::Safe => Restriction::Safe,
        Restriction::SafeIf(_, mut restricted) => {
            restricted.insert(0, lp.clone());
            Restriction::SafeIf(lp, restricted)
        }
    }
}
