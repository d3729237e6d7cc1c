//! Data contracts for the external collaborators this crate is driven
//! against, plus the categorized-expression (`Cmt`) model those
//! collaborators produce and the walker-delegate boundary they drive calls
//! through.
//!
//! Everything in this module is *interface*: the type system, the memory
//! categorizer, the region/scope tree and the use-walker all live upstream
//! of this crate and are consulted only through the traits below.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use crate::idx::new_index;

new_index! {
    /// A local variable or parameter binding.
    #[derive(Debug)]
    pub struct Binding, "b"
}

new_index! {
    /// A syntactic element (expression, pattern, statement) in the body
    /// being checked. One element may correspond to several CFG nodes.
    #[derive(Debug)]
    pub struct Element, "e"
}

new_index! {
    /// A lexical scope in the region/scope tree.
    #[derive(Debug)]
    pub struct ScopeId, "s"
}

new_index! {
    /// A node of the function body's control-flow graph.
    #[derive(Debug)]
    pub struct CfgNode, "n"
}

new_index! {
    /// Opaque handle to a type, as vended by the `TypeOracle`.
    #[derive(Debug)]
    pub struct TyId, "ty"
}

new_index! {
    /// Opaque handle to an enum variant.
    #[derive(Debug)]
    pub struct VariantId, "v"
}

new_index! {
    /// Opaque handle to a struct/union field.
    #[derive(Debug)]
    pub struct FieldId, "f"
}

/// A static approximation of a runtime lifetime.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Region {
    /// Tied to a lexical scope.
    Scope(ScopeId),
    /// An early-bound region parameter.
    EarlyBound(u32),
    /// A late-bound ("free") region parameter, e.g. `fn f<'a>(...)`.
    Free(u32),
    /// `'static`.
    Static,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Mutability {
    Imm,
    Mut,
}

/// Where a place's mutability comes from: declared on the binding,
/// inherited from a base place, or granted through a pointer deref.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MutCategory {
    Declared,
    Inherited,
    ThroughPointer,
}

/// Why a place may or may not be reached by more than one name.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Aliasability {
    NonAliasable,
    FreelyAliasable(AliasableReason),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AliasableReason {
    StaticItem,
    StaticMut,
    AliasableBorrow,
    ClosureUpvar,
}

/// Pointer kind at a `Deref` step.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PointerKind {
    Ref(Mutability, Region),
    Unique,
    RawPtr(Mutability),
}

/// Interior projection kind: field, index, or a refutable-pattern binding.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InteriorKind {
    Field(FieldId),
    Index,
    Pattern,
}

/// The categorization an expression falls into.
#[derive(Clone, Debug)]
pub enum Categorization {
    Rvalue,
    StaticItem,
    Local(Binding),
    /// Reserved: closure upvar capture. Killing-scope computation for
    /// `Upvar` places is left unimplemented until closure capture is
    /// modeled.
    Upvar(Binding),
    Deref(Rc<Cmt>, PointerKind),
    Interior(Rc<Cmt>, InteriorKind),
    Downcast(Rc<Cmt>, VariantId),
}

/// A categorized memory expression, produced by the external
/// `MemoryCategorization` oracle for every expression the use-walker visits.
#[derive(Clone, Debug)]
pub struct Cmt {
    pub ty: TyId,
    pub category: Categorization,
    pub mutcat: MutCategory,
    pub aliasability: Aliasability,
    /// Declared/effective mutability of the place itself, independent of
    /// how that mutability was derived (`mutcat`). Used directly by the
    /// mutability gate.
    pub mutability: Mutability,
}

impl Cmt {
    pub fn is_mutable(&self) -> bool {
        self.mutability == Mutability::Mut
    }
}

/// Consulted for facts the front-end/type system owns.
pub trait TypeOracle {
    fn type_of(&self, element: Element) -> TyId;
    fn mutability_of(&self, binding: Binding) -> Mutability;
    fn is_union(&self, ty: TyId) -> bool;
    fn named_fields(&self, ty: TyId) -> &[FieldId];
    /// The declared type of `field` on `ty`. `ty` must be a struct, enum
    /// variant or union type containing `field` (as reported by
    /// `named_fields`).
    fn field_type(&self, ty: TyId, field: FieldId) -> TyId;
}

/// Consulted for the lexical scope tree and region relations.
pub trait ScopeTree {
    fn variable_scope(&self, binding: Binding) -> ScopeId;
    fn is_sub_scope_of(&self, a: ScopeId, b: ScopeId) -> bool;
    fn get_early_free_scope(&self, region: Region) -> Option<ScopeId>;
    fn get_free_scope(&self, region: Region) -> Option<ScopeId>;

    /// The syntactic element that defines a scope — used both as the gen
    /// point when the scope is a loan's gen-scope and as the kill point
    /// when it is a loan's kill-scope.
    fn scope_element(&self, scope: ScopeId) -> Element;

    /// The lexical scope directly enclosing a syntactic element — used to
    /// find a borrow's own scope (the candidate `genScope` before it is
    /// narrowed against the loan's region, spec §4.7).
    fn element_scope(&self, element: Element) -> ScopeId;

    /// The scope bounding the whole item (function body) being checked.
    /// Stands in for `'static`'s "item upper bound" when resolving a loan
    /// region to a scope (spec §4.7: "Static -> item upper bound").
    fn item_scope(&self) -> ScopeId;

    /// `a` is a sub-scope-or-equal of `b`.
    fn is_sub_scope_of_or_eq(&self, a: ScopeId, b: ScopeId) -> bool {
        a == b || self.is_sub_scope_of(a, b)
    }
}

/// Consulted for CFG shape.
pub trait ControlFlowGraph {
    fn nodes_in_post_order(&self) -> Vec<CfgNode>;
    fn successors(&self, node: CfgNode) -> &[CfgNode];
    /// The CFG nodes generated from a given syntactic element.
    fn nodes_for_element(&self, element: Element) -> &[CfgNode];
}

/// How a place was consumed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ConsumeMode {
    Copy,
    Move(MoveReason),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MoveReason {
    DirectRefMove,
    PatBindingMove,
    CaptureMove,
}

/// How a place was mutated.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MutateMode {
    Init,
    JustWrite,
    WriteAndRead,
}

/// Informational match classification, reported for exhaustiveness
/// diagnostics upstream of this crate.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MatchMode {
    NonBindingMatch,
    BorrowingMatch,
    CopyingMatch,
    MovingMatch,
}

/// Borrow kind requested at a `borrow` event; carried onto the resulting loan.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BorrowKind {
    Shared,
    Mutable,
    Unique,
}

/// Why a loan was created, carried through to diagnostics.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LoanCause {
    AddrOf,
    AutoRef,
    ClosureInvocation,
    ForLoop,
    MatchDiscriminant,
    OverloadedOperator,
    RefBinding,
}

/// The callbacks a use-walker drives into the checker, in program order.
/// Implemented once by gather-loans and once more by the conflict-checker
/// replay pass.
pub trait BorrowckDelegate {
    fn consume(&mut self, element: Element, cmt: Rc<Cmt>, mode: ConsumeMode);
    fn consume_pat(&mut self, pat: Element, cmt: Rc<Cmt>, mode: ConsumeMode);
    fn matched_pat(&mut self, pat: Element, cmt: Rc<Cmt>, mode: MatchMode);
    fn borrow(&mut self, element: Element, cmt: Rc<Cmt>, region: Region, kind: BorrowKind, cause: LoanCause);
    fn mutate(&mut self, element: Element, cmt: Rc<Cmt>, mode: MutateMode);
    fn declaration_without_init(&mut self, binding: Binding, element: Element);
}

/// A minimal fact base a single function-body analysis is driven against.
/// Bundles the four oracle traits so `crate::check_fn` only needs to thread
/// one value through gather-loans, the dataflows, and the replay pass.
pub trait AnalysisContext {
    type Types: TypeOracle;
    type Scopes: ScopeTree;
    type Cfg: ControlFlowGraph;

    fn types(&self) -> &Self::Types;
    fn scopes(&self) -> &Self::Scopes;
    fn cfg(&self) -> &Self::Cfg;
    fn categorize(&self, element: Element) -> Option<Rc<Cmt>>;
}

/// Maps a syntactic element to the CFG nodes it expands to, as returned by
/// `ControlFlowGraph::nodes_for_element`, pre-flattened for gen/kill
/// resolution by the dataflow engine.
pub fn local_index<'cfg>(cfg: &'cfg dyn ControlFlowGraph, elements: impl Iterator<Item = Element>) -> FxHashMap<Element, Vec<CfgNode>> {
    let mut map = FxHashMap::default();
    for element in elements {
        map.insert(element, cfg.nodes_for_element(element).to_vec());
    }
    map
}
