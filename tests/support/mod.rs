//! A hand-rolled mock harness standing in for the real type system, region
//! tree, memory categorizer and use-walker (`SPEC_FULL.md` §B), so the
//! literal end-to-end scenarios in `tests/scenarios.rs` can be driven
//! through the public API without a front-end.

#![allow(dead_code)]

use std::collections::HashMap;
use std::rc::Rc;

use borrowck_core::idx::Idx;
use borrowck_core::oracles::{
    AnalysisContext, Binding, BorrowKind, BorrowckDelegate, CfgNode, Cmt, ConsumeMode, ControlFlowGraph, Element, FieldId, LoanCause,
    MatchMode, Mutability, MutateMode, Region, ScopeId, ScopeTree, TyId, TypeOracle,
};
use borrowck_core::UseWalker;

/// A straight-line control-flow graph of `n` nodes, `i -> i+1`. Every
/// scenario in this test suite is branch-free, so element `i` always maps
/// to `CfgNode(i)`.
pub struct LinearCfg {
    nodes: Vec<CfgNode>,
}

impl LinearCfg {
    pub fn new(n: usize) -> Self {
        LinearCfg { nodes: (0..n).map(CfgNode::new).collect() }
    }
}

impl ControlFlowGraph for LinearCfg {
    fn nodes_in_post_order(&self) -> Vec<CfgNode> {
        self.nodes.iter().rev().copied().collect()
    }

    fn successors(&self, node: CfgNode) -> &[CfgNode] {
        let i = node.index();
        if i + 1 < self.nodes.len() {
            &self.nodes[i + 1..i + 2]
        } else {
            &[]
        }
    }

    fn nodes_for_element(&self, element: Element) -> &[CfgNode] {
        let i = element.index();
        if i < self.nodes.len() {
            &self.nodes[i..i + 1]
        } else {
            &[]
        }
    }
}

#[derive(Default)]
pub struct MockTypes {
    mutabilities: HashMap<Binding, Mutability>,
    unions: std::collections::HashSet<TyId>,
    fields: HashMap<TyId, Vec<FieldId>>,
    field_types: HashMap<(TyId, FieldId), TyId>,
}

impl MockTypes {
    pub fn new() -> Self {
        MockTypes::default()
    }

    pub fn mutability(mut self, binding: Binding, m: Mutability) -> Self {
        self.mutabilities.insert(binding, m);
        self
    }

    pub fn union(mut self, ty: TyId, fields: Vec<FieldId>) -> Self {
        self.unions.insert(ty);
        self.fields.insert(ty, fields);
        self
    }

    /// Records the declared type of one field of `ty`, for a test to check
    /// that a sibling loan path carries its own field's type.
    pub fn field_type(mut self, ty: TyId, field: FieldId, field_ty: TyId) -> Self {
        self.field_types.insert((ty, field), field_ty);
        self
    }
}

impl TypeOracle for MockTypes {
    fn type_of(&self, _element: Element) -> TyId {
        TyId::new(0)
    }

    fn mutability_of(&self, binding: Binding) -> Mutability {
        self.mutabilities.get(&binding).copied().unwrap_or(Mutability::Imm)
    }

    fn is_union(&self, ty: TyId) -> bool {
        self.unions.contains(&ty)
    }

    fn named_fields(&self, ty: TyId) -> &[FieldId] {
        self.fields.get(&ty).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn field_type(&self, ty: TyId, field: FieldId) -> TyId {
        self.field_types.get(&(ty, field)).copied().unwrap_or(ty)
    }
}

/// A flat scope tree: each scope optionally has a parent; `is_sub_scope_of`
/// walks the parent chain. Every scope maps to one `Element` (used both as
/// the point a gen/kill takes effect, per `ScopeTree::scope_element`'s
/// documented dual role).
#[derive(Default)]
pub struct MockScopes {
    parents: HashMap<ScopeId, ScopeId>,
    var_scopes: HashMap<Binding, ScopeId>,
    free_scopes: HashMap<u32, ScopeId>,
    early_scopes: HashMap<u32, ScopeId>,
    scope_elements: HashMap<ScopeId, Element>,
    element_scopes: HashMap<Element, ScopeId>,
    item_scope: ScopeId,
}

impl MockScopes {
    pub fn new(item_scope: ScopeId) -> Self {
        MockScopes { item_scope, ..MockScopes::default() }
    }

    pub fn parent(mut self, child: ScopeId, parent: ScopeId) -> Self {
        self.parents.insert(child, parent);
        self
    }

    pub fn var(mut self, binding: Binding, scope: ScopeId) -> Self {
        self.var_scopes.insert(binding, scope);
        self
    }

    pub fn free(mut self, idx: u32, scope: ScopeId) -> Self {
        self.free_scopes.insert(idx, scope);
        self
    }

    pub fn early(mut self, idx: u32, scope: ScopeId) -> Self {
        self.early_scopes.insert(idx, scope);
        self
    }

    pub fn at(mut self, scope: ScopeId, element: Element) -> Self {
        self.scope_elements.insert(scope, element);
        self.element_scopes.insert(element, scope);
        self
    }
}

impl ScopeTree for MockScopes {
    fn variable_scope(&self, binding: Binding) -> ScopeId {
        self.var_scopes[&binding]
    }

    fn is_sub_scope_of(&self, a: ScopeId, b: ScopeId) -> bool {
        let mut cur = a;
        while let Some(&p) = self.parents.get(&cur) {
            if p == b {
                return true;
            }
            cur = p;
        }
        false
    }

    fn get_early_free_scope(&self, region: Region) -> Option<ScopeId> {
        match region {
            Region::EarlyBound(i) => self.early_scopes.get(&i).copied(),
            _ => None,
        }
    }

    fn get_free_scope(&self, region: Region) -> Option<ScopeId> {
        match region {
            Region::Free(i) => self.free_scopes.get(&i).copied(),
            _ => None,
        }
    }

    fn scope_element(&self, scope: ScopeId) -> Element {
        self.scope_elements[&scope]
    }

    fn element_scope(&self, element: Element) -> ScopeId {
        self.element_scopes[&element]
    }

    fn item_scope(&self) -> ScopeId {
        self.item_scope
    }
}

/// A single walker event, as an already-computed `Cmt` (this harness plays
/// the role of both the use-walker and the memory categorizer).
pub enum Event {
    Consume(Element, Rc<Cmt>, ConsumeMode),
    ConsumePat(Element, Rc<Cmt>, ConsumeMode),
    MatchedPat(Element, Rc<Cmt>, MatchMode),
    Borrow(Element, Rc<Cmt>, Region, BorrowKind, LoanCause),
    Mutate(Element, Rc<Cmt>, MutateMode),
    DeclarationWithoutInit(Binding, Element),
}

/// Replays a fixed, literal script of events in program order — standing in
/// for a real use-walker driving a parsed function body.
pub struct ScriptedWalker {
    events: Vec<Event>,
}

impl ScriptedWalker {
    pub fn new(events: Vec<Event>) -> Self {
        ScriptedWalker { events }
    }
}

impl UseWalker for ScriptedWalker {
    fn walk_body(&self, delegate: &mut dyn BorrowckDelegate) {
        for event in &self.events {
            match event {
                Event::Consume(e, cmt, mode) => delegate.consume(*e, cmt.clone(), *mode),
                Event::ConsumePat(e, cmt, mode) => delegate.consume_pat(*e, cmt.clone(), *mode),
                Event::MatchedPat(e, cmt, mode) => delegate.matched_pat(*e, cmt.clone(), *mode),
                Event::Borrow(e, cmt, region, kind, cause) => delegate.borrow(*e, cmt.clone(), *region, *kind, *cause),
                Event::Mutate(e, cmt, mode) => delegate.mutate(*e, cmt.clone(), *mode),
                Event::DeclarationWithoutInit(b, e) => delegate.declaration_without_init(*b, *e),
            }
        }
    }
}

/// The minimal `AnalysisContext` the driver needs. `categorize` is unused by
/// this harness — `ScriptedWalker` carries its events' `Cmt`s directly
/// rather than looking them up — but the trait requires an implementation.
pub struct Body {
    pub types: MockTypes,
    pub scopes: MockScopes,
    pub cfg: LinearCfg,
}

impl AnalysisContext for Body {
    type Types = MockTypes;
    type Scopes = MockScopes;
    type Cfg = LinearCfg;

    fn types(&self) -> &MockTypes {
        &self.types
    }

    fn scopes(&self) -> &MockScopes {
        &self.scopes
    }

    fn cfg(&self) -> &LinearCfg {
        &self.cfg
    }

    fn categorize(&self, _element: Element) -> Option<Rc<Cmt>> {
        None
    }
}
