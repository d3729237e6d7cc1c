//! Generic forward bit-vector dataflow engine (spec §3 "Dataflow bitsets",
//! §4.8). One instantiation each for loans, moves and var-assignments (spec
//! §4.9); all three use OR/false, but the join operator stays a type
//! parameter so a future analysis (e.g. definite-initialization, AND/true)
//! can reuse the engine (spec §9 "Dataflow operator as parameter").
//!
//! Grounded on the fixed-point loop in
//! `examples/other_examples/.../nll-src-loans_in_scope.rs` (`compute`/
//! `simulate_block`: seed from successors, subtract kills, gen, repeat to a
//! fixpoint) and on the gen/action-kill/scope-kill split described for
//! `DataFlowContext` in `middle/borrowck/move_data.rs`.

use rustc_hash::FxHashMap;

use crate::idx::{Idx, IdxSet};
use crate::oracles::{CfgNode, ControlFlowGraph, Element};

/// A kill tied to scope end vs one tied to a runtime action such as an
/// assignment (spec GLOSSARY "Scope-kill vs Execution-kill"). The engine
/// subtracts both when computing a node's exit set; the distinction is
/// preserved in per-node storage so it stays available to callers (and to
/// any future analysis that wants to treat them differently), matching
/// spec §4.8's note that "the current engine treats them identically in
/// propagation."
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum KillKind {
    ScopeEnd,
    Execution,
}

struct NodeSets<B: Idx> {
    gens: IdxSet<B>,
    action_kills: IdxSet<B>,
    scope_kills: IdxSet<B>,
    on_entry: IdxSet<B>,
}

impl<B: Idx> NodeSets<B> {
    fn new(domain_size: usize) -> Self {
        NodeSets {
            gens: IdxSet::new_empty(domain_size),
            action_kills: IdxSet::new_empty(domain_size),
            scope_kills: IdxSet::new_empty(domain_size),
            on_entry: IdxSet::new_empty(domain_size),
        }
    }
}

/// A forward bit-vector dataflow analysis over a function body's CFG,
/// parametrized by the bit domain `B` (spec §3 "a bit index is the index of
/// a loan/move/assignment in its backing array").
pub struct DataflowContext<'cfg, B: Idx> {
    cfg: &'cfg dyn ControlFlowGraph,
    local_index: FxHashMap<Element, Vec<CfgNode>>,
    domain_size: usize,
    nodes: FxHashMap<CfgNode, NodeSets<B>>,
    post_order: Vec<CfgNode>,
}

impl<'cfg, B: Idx> DataflowContext<'cfg, B> {
    pub fn new(cfg: &'cfg dyn ControlFlowGraph, local_index: FxHashMap<Element, Vec<CfgNode>>, domain_size: usize) -> Self {
        let post_order = cfg.nodes_in_post_order();
        let mut nodes = FxHashMap::default();
        for &n in &post_order {
            nodes.insert(n, NodeSets::new(domain_size));
        }
        DataflowContext { cfg, local_index, domain_size, nodes, post_order }
    }

    /// Prefers the precomputed cache, but a query element absent from it
    /// (e.g. a plain use-site never tied to any gen/kill) falls back to the
    /// control-flow graph directly rather than silently reporting nothing
    /// live — `local_index` is a warm-start optimization, not the full
    /// domain of queryable elements.
    fn nodes_for(&self, element: Element) -> &[CfgNode] {
        match self.local_index.get(&element) {
            Some(v) => v.as_slice(),
            None => self.cfg.nodes_for_element(element),
        }
    }

    /// Adds a gen bit at every CFG node generated from `element` (spec
    /// §4.8 `addGen`).
    pub fn add_gen(&mut self, element: Element, bit: B) {
        for &n in &self.nodes_for(element).to_vec() {
            self.nodes.get_mut(&n).unwrap().gens.insert(bit);
        }
    }

    /// Adds a kill of the given kind at every CFG node generated from
    /// `element` (spec §4.8 `addKill`).
    pub fn add_kill(&mut self, kind: KillKind, element: Element, bit: B) {
        for &n in &self.nodes_for(element).to_vec() {
            let set = self.nodes.get_mut(&n).unwrap();
            match kind {
                KillKind::ScopeEnd => {
                    set.scope_kills.insert(bit);
                }
                KillKind::Execution => {
                    set.action_kills.insert(bit);
                }
            }
        }
    }

    /// Hook for kills arising from non-local control flow exits (loop
    /// break/continue, early return) that are not modeled as ordinary CFG
    /// edges. A no-op when the `ControlFlowGraph` already materializes
    /// those as edges (spec §4.8 `addKillsFromFlowExits`).
    pub fn add_kills_from_flow_exits(&mut self) {}

    /// Runs the analysis to a fixpoint by reverse-post-order iteration
    /// (spec §4.8 `propagate`): `exit(n) = (onEntry(n) ∪ gen(n)) \
    /// actionKill(n) \ scopeKill(n)`, joined forward into each successor's
    /// entry set.
    pub fn propagate(&mut self) {
        let mut scratch: IdxSet<B> = IdxSet::new_empty(self.domain_size);
        let mut changed = true;
        // Reverse post order gives a good forward iteration order; we loop
        // until no entry set changes, which always terminates since the
        // bitset lattice is finite and the transfer function is monotone
        // (spec §5).
        let rpo: Vec<CfgNode> = self.post_order.iter().rev().copied().collect();
        while changed {
            changed = false;
            for &n in &rpo {
                scratch.clear_to(&self.nodes[&n].on_entry);
                {
                    let set = &self.nodes[&n];
                    scratch.union(&set.gens);
                    scratch.subtract(&set.action_kills);
                    scratch.subtract(&set.scope_kills);
                }
                for &succ in self.cfg.successors(n) {
                    let succ_set = self.nodes.get_mut(&succ).unwrap();
                    if succ_set.on_entry.union(&scratch) {
                        changed = true;
                    }
                }
            }
        }
    }

    /// Iterates the bits live on entry to every CFG node generated from
    /// `element`; short-circuits if `f` returns `false` (spec §4.8
    /// `eachBitOnEntry`).
    pub fn each_bit_on_entry(&self, element: Element, mut f: impl FnMut(B) -> bool) -> bool {
        for &n in self.nodes_for(element) {
            if let Some(set) = self.nodes.get(&n) {
                if !set.on_entry.each_bit(&mut f) {
                    return false;
                }
            }
        }
        true
    }

    /// Iterates the bits generated at `element` (spec §4.8 `eachGenBit`).
    pub fn each_gen_bit(&self, element: Element, mut f: impl FnMut(B) -> bool) -> bool {
        for &n in self.nodes_for(element) {
            if let Some(set) = self.nodes.get(&n) {
                if !set.gens.each_bit(&mut f) {
                    return false;
                }
            }
        }
        true
    }
}

impl<B: Idx> IdxSet<B> {
    fn clear_to(&mut self, other: &IdxSet<B>) {
        self.clear();
        self.union(other);
    }
}
