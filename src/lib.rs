//! A borrow and move checker core (spec §1 "Purpose & scope", §2 "System
//! overview"): consumes use-walker events for one function body and
//! produces a set of mutably-used bindings plus a list of diagnostics.
//!
//! This crate is a *delegate*, not a front-end: it owns no parser, no type
//! checker, no region inference. It is driven against a `TypeOracle` /
//! `ScopeTree` / `ControlFlowGraph` / `UseWalker` supplied by the caller
//! (spec §6 "External interfaces"), analogous to how `rustc_borrowck` is
//! driven by `rustc_mir_dataflow` and the rest of the compiler's query
//! system rather than owning them.

pub mod check_loans;
pub mod dataflow;
pub mod diagnostics;
pub mod flow;
pub mod gates;
pub mod gather_loans;
pub mod idx;
pub mod lifetime;
pub mod loan;
pub mod loan_path;
pub mod move_data;
pub mod oracles;
pub mod restrictions;

use std::collections::HashSet;

use check_loans::CheckLoans;
use diagnostics::Diagnostic;
use gather_loans::GatherLoans;
use oracles::{AnalysisContext, Binding, BorrowckDelegate};

/// The one configuration knob the spec reserves (spec §9 "Open questions":
/// "Reassignment-of-immutable detection ... spec requires the diagnostic
/// but implementations may gate it behind a flag until stable"). See
/// `DESIGN.md` for why the default is `true`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BorrowCheckConfig {
    pub report_reassign_immutable: bool,
}

impl Default for BorrowCheckConfig {
    fn default() -> Self {
        BorrowCheckConfig { report_reassign_immutable: true }
    }
}

/// Checked between major phases of a single analysis (spec §5
/// "Concurrency & resource model": "the top-level entry point is expected
/// to check a cancellation token between major phases"). `()` is the
/// trivial always-running token for callers with no cancellation needs.
pub trait CancellationToken {
    fn is_cancelled(&self) -> bool;
}

impl CancellationToken for () {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Drives `BorrowckDelegate` events for one function body in program order
/// (spec §4.1, §6 "`UseWalker` — drives the delegate events ... in program
/// order"). Implemented twice against the same body: once to gather loans,
/// once to replay against the finished dataflows.
pub trait UseWalker {
    fn walk_body(&self, delegate: &mut dyn BorrowckDelegate);
}

/// The small summary that survives one function-body analysis (spec §3
/// "Lifecycle": "`BorrowCheckResult` survives as a small summary ...
/// paths, loans, dataflow bitsets are discarded").
#[derive(Debug, Default)]
pub struct BorrowCheckResult {
    pub used_mut_nodes: HashSet<Binding>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the borrow/move check for one function body (spec §2 "Control
/// flow": "Driver → walker (emits events) → gather-loans → (loans,
/// move-data) → build two dataflows (loans, moves) and one assignment
/// dataflow → replay walker events against dataflow results → emit
/// violations").
///
/// Returns `None` if `cancel` fires at one of the three checkpoints named
/// in spec §5 ("after gather-loans, after each dataflow `propagate`, at
/// the start of replay"); a cancelled analysis leaves no observable
/// mutation outside this call.
pub fn check_fn<C: AnalysisContext>(
    ctx: &C,
    walker: &dyn UseWalker,
    config: BorrowCheckConfig,
    cancel: &dyn CancellationToken,
) -> Option<BorrowCheckResult> {
    let span = tracing::debug_span!("check_fn");
    let _enter = span.enter();

    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    tracing::debug!("gather-loans pass");
    let (move_data, loans, used_mut_nodes) = {
        let mut gather = GatherLoans::new(ctx.types(), ctx.scopes(), &mut diagnostics);
        walker.walk_body(&mut gather);
        gather.into_parts()
    };

    if cancel.is_cancelled() {
        return None;
    }

    tracing::debug!(loans = loans.len(), "building dataflows");
    let flows = flow::build_and_propagate(ctx.cfg(), ctx.scopes(), &move_data, &loans, cancel)?;

    if cancel.is_cancelled() {
        return None;
    }

    tracing::debug!("replay pass");
    {
        let mut check = CheckLoans::new(ctx.types(), &move_data, &loans, &flows.loans, &flows.moves, &flows.assigns, config, &mut diagnostics);
        walker.walk_body(&mut check);
    }

    Some(BorrowCheckResult { used_mut_nodes, diagnostics })
}
