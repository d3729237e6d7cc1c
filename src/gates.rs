//! Aliasability and mutability gates (spec §4.6): local per-place legality
//! checks run before a mutable borrow or non-local mutation is recorded.
//!
//! Grounded on the same two-gate shape (`check_mutability`/
//! `check_aliasability`) described for the teacher's old-style
//! `middle/borrowck` gather-loans pass; ported to this crate's `Cmt` model
//! in `crate::oracles`.

use crate::oracles::{AliasableReason, Aliasability, Cmt, Mutability};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MutabilityError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AliasabilityError(pub AliasableReason);

/// Passes immediately for shared borrows (`requires_mutable == false`) or
/// when `cmt.mutability` is mutable (spec §4.6 `checkMutability`).
pub fn check_mutability(cmt: &Cmt, requires_mutable: bool) -> Result<(), MutabilityError> {
    if !requires_mutable || cmt.mutability == Mutability::Mut {
        Ok(())
    } else {
        Err(MutabilityError)
    }
}

/// Rejects mutable access to a freely-aliasable immutable place (e.g. a
/// shared `&` reference or an immutable `static`). Immutable access to an
/// immutable static passes; `static mut` passes unconditionally — that
/// hazard is punted to `unsafe` (spec §4.6 `checkAliasability`).
pub fn check_aliasability(cmt: &Cmt, requires_mutable: bool) -> Result<(), AliasabilityError> {
    match cmt.aliasability {
        Aliasability::NonAliasable => Ok(()),
        Aliasability::FreelyAliasable(AliasableReason::StaticMut) => Ok(()),
        Aliasability::FreelyAliasable(reason) if requires_mutable => Err(AliasabilityError(reason)),
        Aliasability::FreelyAliasable(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracles::{Categorization, MutCategory, TyId};

    fn cmt(mutability: Mutability, aliasability: Aliasability) -> Cmt {
        Cmt { ty: TyId::new(0), category: Categorization::Rvalue, mutcat: MutCategory::Declared, aliasability, mutability }
    }

    #[test]
    fn immutable_place_rejects_mutable_access() {
        let c = cmt(Mutability::Imm, Aliasability::NonAliasable);
        assert!(check_mutability(&c, true).is_err());
        assert!(check_mutability(&c, false).is_ok());
    }

    #[test]
    fn static_mut_passes_unconditionally() {
        let c = cmt(Mutability::Mut, Aliasability::FreelyAliasable(AliasableReason::StaticMut));
        assert!(check_aliasability(&c, true).is_ok());
    }

    #[test]
    fn aliasable_borrow_rejects_mutable_access_but_allows_shared() {
        let c = cmt(Mutability::Mut, Aliasability::FreelyAliasable(AliasableReason::AliasableBorrow));
        assert!(check_aliasability(&c, true).is_err());
        assert!(check_aliasability(&c, false).is_ok());
    }
}
