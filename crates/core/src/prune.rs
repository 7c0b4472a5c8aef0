//! Reachability-based constraint pruning.
//!
//! Most constraints never reach the solver: one of their two orientations
//! contradicts the known precedence graph, so the other orientation is
//! forced. Each round builds bitmap matrices for the two known relations,
//! composes them, closes the union, and discharges every constraint with a
//! conflicting side by folding the opposite side into the known graph. The
//! known graph only grows and the constraint set only shrinks; the loop
//! stops at a fixed point or when the marginal yield drops below the
//! configured fraction.

use core::hash::Hash;

use crate::constraint::{SiConstraint, SiEdge};
use crate::graph::known::{DependencyKind, Edge, KnownGraph};
use crate::graph::matrix::{MatrixGraph, NodeOrder};
use crate::history::types::TransactionId;

/// Endpoint pairs with their known edges, as reported in a verdict.
pub type ConflictEdges<K> = Vec<(TransactionId, TransactionId, Vec<Edge<K>>)>;

/// Result of running the pruner to its stopping condition.
#[derive(Debug)]
pub struct PruneOutcome<K> {
    /// Rounds executed, including the round that detected a cycle.
    pub rounds: u32,
    /// Constraints discharged over all rounds.
    pub discharged: usize,
    /// A self-loop in the composed relation: the history violates
    /// snapshot isolation outright, no solving needed.
    pub cycle: Option<ConflictEdges<K>>,
}

/// Prune `constraints` against the known graph until the stopping rule.
///
/// A round discharging nothing, fewer constraints than `stop_threshold`
/// times the initial total, or leaving a residual below that fraction ends
/// the loop. A composed self-loop ends it immediately with a graph-only
/// cycle witness.
pub fn prune<K>(
    known: &mut KnownGraph<K>,
    constraints: &mut Vec<SiConstraint<K>>,
    stop_threshold: f64,
) -> PruneOutcome<K>
where
    K: Eq + Hash + Clone + Ord,
{
    let total = constraints.len();
    let mut outcome = PruneOutcome {
        rounds: 0,
        discharged: 0,
        cycle: None,
    };
    let mut last_folded: Option<usize> = None;

    loop {
        outcome.rounds += 1;

        let order = NodeOrder::topological(known.nodes(), known.a());
        let mat_a = MatrixGraph::from_graph(&order, known.a());
        let mat_b = MatrixGraph::from_graph(&order, known.b());
        let mat_c = mat_a.compose(&mat_b);

        if let Some(node) = mat_c.self_loop() {
            outcome.cycle = Some(composed_self_loop(known, &order, &mat_a, &mat_b, node));
            tracing::debug!(
                round = outcome.rounds,
                node = %order.id(node),
                "composed relation has a self-loop"
            );
            return outcome;
        }

        if constraints.is_empty() {
            return outcome;
        }

        // The stopping rule is evaluated after the cycle check so that
        // edges folded by the final discharge pass still get inspected.
        #[allow(clippy::cast_precision_loss)]
        let cutoff = stop_threshold * total as f64;
        #[allow(clippy::cast_precision_loss)]
        if let Some(folded) = last_folded {
            if folded == 0 || (folded as f64) < cutoff || (constraints.len() as f64) < cutoff {
                return outcome;
            }
        }

        let reach = mat_a.union(&mat_c).reduce_edges().reachability();
        let pred_a = mat_a.transpose();

        let mut kept = Vec::with_capacity(constraints.len());
        let mut folded = 0usize;
        for constraint in constraints.drain(..) {
            if side_conflicts(&constraint.first, &reach, &pred_a, &order) {
                fold(known, &constraint.second);
                folded += 1;
            } else if side_conflicts(&constraint.second, &reach, &pred_a, &order) {
                fold(known, &constraint.first);
                folded += 1;
            } else {
                kept.push(constraint);
            }
        }
        *constraints = kept;
        outcome.discharged += folded;
        last_folded = Some(folded);

        tracing::debug!(
            round = outcome.rounds,
            folded,
            remaining = constraints.len(),
            "pruning round"
        );
    }
}

/// Does any edge of this side contradict the closed known relation?
///
/// A write-write edge `u -> v` conflicts when `v` already reaches `u`. An
/// anti-dependency `u -> v` conflicts when some known predecessor `p` of
/// `u` is reached by `v`: `p` would then both precede and follow `v`.
fn side_conflicts<K>(
    side: &[SiEdge<K>],
    reach: &MatrixGraph<'_>,
    pred_a: &MatrixGraph<'_>,
    order: &NodeOrder,
) -> bool
where
    K: Eq + Hash + Clone + Ord,
{
    side.iter().any(|edge| {
        let (Some(u), Some(v)) = (order.index_of(&edge.from), order.index_of(&edge.to)) else {
            return false;
        };
        match edge.kind {
            DependencyKind::WriteWrite => reach.has_edge(v, u),
            DependencyKind::ReadWrite => pred_a.successors(u).any(|p| reach.has_edge(v, p)),
            DependencyKind::SessionOrder | DependencyKind::WriteRead => false,
        }
    })
}

fn fold<K>(known: &mut KnownGraph<K>, side: &[SiEdge<K>])
where
    K: Eq + Hash + Clone + Ord,
{
    for edge in side {
        known.put_edge(edge.from, edge.to, edge.to_edge());
    }
}

/// Materialize the two known edges behind a composed self-loop at `node`.
fn composed_self_loop<K>(
    known: &KnownGraph<K>,
    order: &NodeOrder,
    mat_a: &MatrixGraph<'_>,
    mat_b: &MatrixGraph<'_>,
    node: usize,
) -> ConflictEdges<K>
where
    K: Eq + Hash + Clone + Ord,
{
    let mut witness = Vec::new();
    if let Some(mid) = mat_a
        .successors(node)
        .find(|&mid| mat_b.has_edge(mid, node))
    {
        let u = order.id(node);
        let v = order.id(mid);
        witness.push((u, v, known.a().labels(&u, &v).to_vec()));
        witness.push((v, u, known.b().labels(&v, &u).to_vec()));
    }
    witness
}
