//! Boolean encoding of the residual snapshot isolation problem.
//!
//! Every known edge and every constraint-side edge gets a literal. The
//! known literals are assumed true; each constraint contributes one
//! assumed literal equivalent to "exactly one side holds in full". On top
//! of the propositional layer sits an acyclicity theory for the union of
//! the ordering relation with its composition through the
//! anti-dependency relation: satisfying assignments are checked for
//! cycles, and every cycle found is refuted by a clause over its
//! supporting literals until the assignment is acyclic or the instance is
//! unsatisfiable. The unsatisfiable core then names the known edges and
//! constraints that witness the violation.

use core::hash::Hash;

use hashbrown::HashMap;
use rustsat::solvers::SolverResult;
use rustsat::types::Lit;

use sicheck_core::constraint::{SiConstraint, SiEdge};
use sicheck_core::graph::known::{DependencyKind, Edge, KnownGraph};
use sicheck_core::graph::matrix::NodeOrder;
use sicheck_core::history::types::TransactionId;
use sicheck_core::verdict::{Conflict, Verdict};

use crate::encode::Encoder;

/// One verification's solver state. Created per run, dropped when done.
pub struct SiSolver<K> {
    encoder: Encoder,
    order: NodeOrder,
    /// Known ordering edges with their assumed literal.
    known_a: Vec<(usize, usize, Lit)>,
    /// Known anti-dependency edges with their assumed literal.
    known_b: Vec<(usize, usize, Lit)>,
    /// Constraint-side write-write edge literals.
    ww_lits: Vec<(usize, usize, Lit)>,
    /// Constraint-side anti-dependency edge literals.
    rw_lits: Vec<(usize, usize, Lit)>,
    known_info: HashMap<Lit, (TransactionId, TransactionId, Vec<Edge<K>>)>,
    constraint_info: HashMap<Lit, SiConstraint<K>>,
    assumptions: Vec<Lit>,
}

impl<K> SiSolver<K>
where
    K: Eq + Hash + Clone + Ord,
{
    #[must_use]
    pub fn new(known: &KnownGraph<K>, constraints: &[SiConstraint<K>]) -> Self {
        let order = NodeOrder::identity(known.nodes());
        let mut solver = Self {
            encoder: Encoder::default(),
            order,
            known_a: Vec::new(),
            known_b: Vec::new(),
            ww_lits: Vec::new(),
            rw_lits: Vec::new(),
            known_info: HashMap::new(),
            constraint_info: HashMap::new(),
            assumptions: Vec::new(),
        };

        for (from, to) in known.a().pairs() {
            let lit = solver.encoder.fresh_lit();
            let i = solver.order.index_of(&from).unwrap();
            let j = solver.order.index_of(&to).unwrap();
            solver.known_a.push((i, j, lit));
            solver
                .known_info
                .insert(lit, (from, to, known.a().labels(&from, &to).to_vec()));
            solver.assumptions.push(lit);
        }
        for (from, to) in known.b().pairs() {
            let lit = solver.encoder.fresh_lit();
            let i = solver.order.index_of(&from).unwrap();
            let j = solver.order.index_of(&to).unwrap();
            solver.known_b.push((i, j, lit));
            solver
                .known_info
                .insert(lit, (from, to, known.b().labels(&from, &to).to_vec()));
            solver.assumptions.push(lit);
        }

        for constraint in constraints {
            let first = solver.side_lits(&constraint.first);
            let second = solver.side_lits(&constraint.second);

            // Exactly one side holds in full: (all of one) and (none of
            // the other), either way around.
            let mut one_way = first.clone();
            one_way.extend(second.iter().map(|&lit| !lit));
            let mut other_way = second.clone();
            other_way.extend(first.iter().map(|&lit| !lit));
            let forward = solver.encoder.and_lit(&one_way);
            let backward = solver.encoder.and_lit(&other_way);
            let resolved = solver.encoder.or_lit(&[forward, backward]);

            solver.constraint_info.insert(resolved, constraint.clone());
            solver.assumptions.push(resolved);
        }

        tracing::debug!(
            nodes = solver.order.len(),
            known = solver.known_info.len(),
            constraints = solver.constraint_info.len(),
            "solver built"
        );

        solver
    }

    fn side_lits(&mut self, side: &[SiEdge<K>]) -> Vec<Lit> {
        side.iter()
            .map(|edge| {
                let lit = self.encoder.fresh_lit();
                let i = self.order.index_of(&edge.from).unwrap();
                let j = self.order.index_of(&edge.to).unwrap();
                match edge.kind {
                    DependencyKind::ReadWrite => self.rw_lits.push((i, j, lit)),
                    _ => self.ww_lits.push((i, j, lit)),
                }
                lit
            })
            .collect()
    }

    /// Decide the residual problem.
    pub fn solve(mut self) -> Verdict<K> {
        let mut refutations = 0u32;
        loop {
            match self.encoder.solve_under(&self.assumptions) {
                SolverResult::Sat => match self.refute_cycle() {
                    Some(clause) => {
                        refutations += 1;
                        tracing::trace!(refutations, len = clause.len(), "refuting cycle");
                        self.encoder.add_clause(&clause);
                    }
                    None => {
                        tracing::debug!(refutations, "acyclic assignment found");
                        return Verdict::Accept;
                    }
                },
                SolverResult::Unsat => {
                    tracing::debug!(refutations, "unsatisfiable");
                    return Verdict::Reject(self.extract_conflict());
                }
                SolverResult::Interrupted => unreachable!("solver runs without limits"),
            }
        }
    }

    /// Look for a cycle in the graph selected by the current assignment
    /// and return a clause refuting it.
    fn refute_cycle(&self) -> Option<Vec<Lit>> {
        let n = self.order.len();

        // One supporting literal per realized edge; known edges win over
        // constraint-side duplicates of the same pair.
        let mut a_support: HashMap<(usize, usize), Lit> = HashMap::new();
        for &(i, j, lit) in &self.known_a {
            a_support.entry((i, j)).or_insert(lit);
        }
        for &(i, j, lit) in &self.ww_lits {
            if self.encoder.is_true(lit) {
                a_support.entry((i, j)).or_insert(lit);
            }
        }
        let mut b_adjacency: Vec<Vec<(usize, Lit)>> = vec![Vec::new(); n];
        {
            let mut b_support: HashMap<(usize, usize), Lit> = HashMap::new();
            for &(i, j, lit) in &self.known_b {
                b_support.entry((i, j)).or_insert(lit);
            }
            for &(i, j, lit) in &self.rw_lits {
                if self.encoder.is_true(lit) {
                    b_support.entry((i, j)).or_insert(lit);
                }
            }
            let mut pairs: Vec<((usize, usize), Lit)> = b_support.into_iter().collect();
            pairs.sort_unstable();
            for ((i, j), lit) in pairs {
                b_adjacency[i].push((j, lit));
            }
        }

        // The checked graph: realized ordering edges plus their
        // composition through realized anti-dependencies.
        let mut supports: HashMap<(usize, usize), Vec<Lit>> = HashMap::new();
        let mut a_pairs: Vec<((usize, usize), Lit)> = a_support.into_iter().collect();
        a_pairs.sort_unstable();
        for &((i, j), lit) in &a_pairs {
            supports.entry((i, j)).or_insert_with(|| vec![lit]);
        }
        for &((i, j), a_lit) in &a_pairs {
            for &(k, b_lit) in &b_adjacency[j] {
                supports
                    .entry((i, k))
                    .or_insert_with(|| vec![a_lit, b_lit]);
            }
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(i, j) in supports.keys() {
            adjacency[i].push(j);
        }
        for row in &mut adjacency {
            row.sort_unstable();
        }

        let cycle = find_cycle(n, &adjacency)?;
        let mut clause = Vec::new();
        for (position, &from) in cycle.iter().enumerate() {
            let to = cycle[(position + 1) % cycle.len()];
            for &lit in &supports[&(from, to)] {
                clause.push(!lit);
            }
        }
        clause.sort_unstable();
        clause.dedup();
        Some(clause)
    }

    /// Map the unsatisfiable core back to known edges and constraints.
    fn extract_conflict(&mut self) -> Conflict<K> {
        let core = self.encoder.core();
        let mut edges = Vec::new();
        let mut constraints = Vec::new();
        for lit in core {
            let assumed = if lit.is_neg() { !lit } else { lit };
            if let Some((from, to, labels)) = self.known_info.get(&assumed) {
                edges.push((*from, *to, labels.clone()));
            } else if let Some(constraint) = self.constraint_info.get(&assumed) {
                constraints.push(constraint.clone());
            }
        }
        edges.sort_unstable_by_key(|(from, to, _)| (*from, *to));
        edges.dedup_by_key(|(from, to, _)| (*from, *to));
        constraints.sort_unstable_by_key(|constraint| constraint.id);
        constraints.dedup_by_key(|constraint| constraint.id);
        Conflict { edges, constraints }
    }
}

/// First cycle reachable in DFS preorder, as the sequence of its nodes.
fn find_cycle(n: usize, adjacency: &[Vec<usize>]) -> Option<Vec<usize>> {
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let mut color = vec![WHITE; n];
    let mut path: Vec<usize> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..n {
        if color[start] != WHITE {
            continue;
        }
        stack.push((start, 0));
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if frame.1 == 0 {
                color[node] = GRAY;
                path.push(node);
            }
            let child = adjacency[node].get(frame.1).copied();
            frame.1 += 1;
            match child {
                Some(next) if color[next] == WHITE => stack.push((next, 0)),
                Some(next) if color[next] == GRAY => {
                    let from = path.iter().position(|&p| p == next).unwrap();
                    return Some(path[from..].to_vec());
                }
                Some(_) => {}
                None => {
                    color[node] = BLACK;
                    path.pop();
                    stack.pop();
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use sicheck_core::constraint::SiEdge;
    use sicheck_core::graph::known::Edge as KnownEdge;

    use super::*;

    fn t(session: u64, height: u64) -> TransactionId {
        TransactionId::new(session, height)
    }

    fn known_with(
        edges: &[(TransactionId, TransactionId, KnownEdge<&'static str>)],
    ) -> KnownGraph<&'static str> {
        let mut known = KnownGraph::default();
        for (from, to, edge) in edges {
            known.put_edge(*from, *to, edge.clone());
        }
        known
    }

    #[test]
    fn acyclic_known_graph_accepts() {
        let known = known_with(&[
            (t(0, 0), t(1, 0), KnownEdge::write_read("x")),
            (t(1, 0), t(2, 0), KnownEdge::write_read("x")),
        ]);
        let verdict = SiSolver::new(&known, &[]).solve();
        assert!(verdict.is_accept());
    }

    #[test]
    fn known_cycle_rejects_with_edges() {
        let known = known_with(&[
            (t(0, 0), t(1, 0), KnownEdge::write_write("x")),
            (t(1, 0), t(0, 0), KnownEdge::write_write("x")),
        ]);
        let verdict = SiSolver::new(&known, &[]).solve();
        let conflict = verdict.conflict().expect("expected rejection").clone();
        assert_eq!(conflict.edges.len(), 2);
        assert!(conflict.constraints.is_empty());
    }

    #[test]
    fn composed_cycle_rejects() {
        // a -> b in the ordering relation, b -> a as an anti-dependency:
        // the composition has a self-loop at a.
        let known = known_with(&[
            (t(0, 0), t(1, 0), KnownEdge::write_read("x")),
            (t(1, 0), t(0, 0), KnownEdge::read_write("x")),
        ]);
        let verdict = SiSolver::new(&known, &[]).solve();
        assert!(!verdict.is_accept());
    }

    #[test]
    fn free_orientation_accepts() {
        let known = known_with(&[
            (t(0, 0), t(0, 1), KnownEdge::session_order()),
            (t(1, 0), t(1, 1), KnownEdge::session_order()),
        ]);
        let constraint = SiConstraint {
            id: 0,
            writes: (t(0, 0), t(1, 0)),
            first: vec![SiEdge::write_write(t(0, 0), t(1, 0), "x")],
            second: vec![SiEdge::write_write(t(1, 0), t(0, 0), "x")],
        };
        let verdict = SiSolver::new(&known, &[constraint]).solve();
        assert!(verdict.is_accept());
    }

    #[test]
    fn contradictory_constraints_name_themselves() {
        // A long-fork shape: two observers disagree on the order of the
        // init writer against each forked writer. The known relations are
        // acyclic on their own, so the unsatisfiable core must mention at
        // least one constraint.
        let init = t(0, 0);
        let fork_x = t(1, 0);
        let fork_y = t(2, 0);
        let sees_x = t(3, 0);
        let sees_y = t(4, 0);
        let known = known_with(&[
            (fork_x, sees_x, KnownEdge::write_read("x")),
            (init, sees_x, KnownEdge::write_read("y")),
            (init, sees_y, KnownEdge::write_read("x")),
            (fork_y, sees_y, KnownEdge::write_read("y")),
        ]);
        let constraints = vec![
            SiConstraint {
                id: 0,
                writes: (init, fork_x),
                first: vec![
                    SiEdge::write_write(init, fork_x, "x"),
                    SiEdge::read_write(sees_y, fork_x, "x"),
                ],
                second: vec![
                    SiEdge::write_write(fork_x, init, "x"),
                    SiEdge::read_write(sees_x, init, "x"),
                ],
            },
            SiConstraint {
                id: 1,
                writes: (init, fork_y),
                first: vec![
                    SiEdge::write_write(init, fork_y, "y"),
                    SiEdge::read_write(sees_x, fork_y, "y"),
                ],
                second: vec![
                    SiEdge::write_write(fork_y, init, "y"),
                    SiEdge::read_write(sees_y, init, "y"),
                ],
            },
        ];
        let verdict = SiSolver::new(&known, &constraints).solve();
        let conflict = verdict.conflict().expect("expected rejection").clone();
        assert!(!conflict.constraints.is_empty());
    }

    #[test]
    fn find_cycle_returns_node_sequence() {
        let adjacency = vec![vec![1], vec![2], vec![0], vec![]];
        let cycle = find_cycle(4, &adjacency).unwrap();
        assert_eq!(cycle.len(), 3);
        let adjacency = vec![vec![1], vec![2], vec![3], vec![]];
        assert!(find_cycle(4, &adjacency).is_none());
    }
}
