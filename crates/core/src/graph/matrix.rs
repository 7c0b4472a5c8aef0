//! Dense-row bitmap graphs over a fixed transaction set.
//!
//! A [`MatrixGraph`] stores one bitmap of successor indices per node. The
//! node set and the node-to-index bijection are fixed at construction and
//! shared by every matrix derived in the same round, which makes row-wise
//! composition and union meaningful. All operations are pure: composition,
//! union and reachability produce new matrices and never mutate operands.

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;

use super::known::LabeledGraph;
use crate::history::types::TransactionId;

/// Immutable bijection between transactions and row indices.
///
/// When the given graph is acyclic the bijection follows one of its
/// topological orders, so every edge of that graph points from a lower to
/// a higher index. Cyclic graphs fall back to sorted-id order.
#[derive(Debug, Clone)]
pub struct NodeOrder {
    ids: Vec<TransactionId>,
    index: HashMap<TransactionId, usize>,
}

impl NodeOrder {
    /// Order `nodes` by a topological sort of `graph` when possible.
    #[must_use]
    pub fn topological<E>(
        nodes: &[TransactionId],
        graph: &LabeledGraph<TransactionId, E>,
    ) -> Self
    where
        E: Clone + PartialEq,
    {
        let sorted = Self::identity(nodes);
        let n = sorted.ids.len();

        // Kahn's algorithm over the index view of `graph`.
        let mut in_degree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (source, target) in graph.pairs() {
            let (Some(i), Some(j)) = (sorted.index_of(&source), sorted.index_of(&target)) else {
                continue;
            };
            successors[i].push(j);
            in_degree[j] += 1;
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = queue.pop() {
            order.push(i);
            for &j in &successors[i] {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    queue.push(j);
                }
            }
        }

        if order.len() != n {
            // Cycle: keep the sorted-id bijection.
            return sorted;
        }

        let ids: Vec<TransactionId> = order.into_iter().map(|i| sorted.ids[i]).collect();
        Self::from_ids(ids)
    }

    /// Order `nodes` by transaction id.
    #[must_use]
    pub fn identity(nodes: &[TransactionId]) -> Self {
        let mut ids: Vec<TransactionId> = nodes.to_vec();
        ids.sort_unstable();
        ids.dedup();
        Self::from_ids(ids)
    }

    fn from_ids(ids: Vec<TransactionId>) -> Self {
        let index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self { ids, index }
    }

    #[must_use]
    pub fn index_of(&self, id: &TransactionId) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn id(&self, index: usize) -> TransactionId {
        self.ids[index]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A directed graph stored as one successor bitmap per row.
#[derive(Debug, Clone)]
pub struct MatrixGraph<'a> {
    order: &'a NodeOrder,
    rows: Vec<FixedBitSet>,
}

impl<'a> MatrixGraph<'a> {
    #[must_use]
    pub fn empty(order: &'a NodeOrder) -> Self {
        let n = order.len();
        Self {
            order,
            rows: vec![FixedBitSet::with_capacity(n); n],
        }
    }

    /// Build from endpoint pairs; pairs naming unknown nodes are ignored.
    #[must_use]
    pub fn from_pairs<I>(order: &'a NodeOrder, pairs: I) -> Self
    where
        I: IntoIterator<Item = (TransactionId, TransactionId)>,
    {
        let mut graph = Self::empty(order);
        for (source, target) in pairs {
            if let (Some(i), Some(j)) = (order.index_of(&source), order.index_of(&target)) {
                graph.rows[i].insert(j);
            }
        }
        graph
    }

    #[must_use]
    pub fn from_graph<E>(order: &'a NodeOrder, graph: &LabeledGraph<TransactionId, E>) -> Self
    where
        E: Clone + PartialEq,
    {
        Self::from_pairs(order, graph.pairs())
    }

    #[must_use]
    pub const fn order(&self) -> &'a NodeOrder {
        self.order
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.rows.len()
    }

    pub fn add_edge(&mut self, source: usize, target: usize) {
        self.rows[source].insert(target);
    }

    #[must_use]
    pub fn has_edge(&self, source: usize, target: usize) -> bool {
        self.rows[source].contains(target)
    }

    pub fn successors(&self, source: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows[source].ones()
    }

    /// All edges as index pairs, row by row.
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.ones().map(move |j| (i, j)))
            .collect()
    }

    /// Relational composition: `result[i] = U_{j in self[i]} other[j]`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        debug_assert!(core::ptr::eq(self.order, other.order));
        let n = self.node_count();
        let rows = (0..n)
            .map(|i| {
                let mut row = FixedBitSet::with_capacity(n);
                for j in self.rows[i].ones() {
                    row.union_with(&other.rows[j]);
                }
                row
            })
            .collect();
        Self {
            order: self.order,
            rows,
        }
    }

    /// Row-wise bitmap OR.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        debug_assert!(core::ptr::eq(self.order, other.order));
        let rows = self
            .rows
            .iter()
            .zip(other.rows.iter())
            .map(|(left, right)| {
                let mut row = left.clone();
                row.union_with(right);
                row
            })
            .collect();
        Self {
            order: self.order,
            rows,
        }
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let n = self.node_count();
        let mut rows = vec![FixedBitSet::with_capacity(n); n];
        for (i, row) in self.rows.iter().enumerate() {
            for j in row.ones() {
                rows[j].insert(i);
            }
        }
        Self {
            order: self.order,
            rows,
        }
    }

    /// The first node with an edge to itself, if any.
    #[must_use]
    pub fn self_loop(&self) -> Option<usize> {
        (0..self.node_count()).find(|&i| self.rows[i].contains(i))
    }

    /// A topological ordering of the row indices, or `None` on a cycle.
    /// Kahn's algorithm, O(V+E).
    #[must_use]
    pub fn topological_order(&self) -> Option<Vec<usize>> {
        let n = self.node_count();
        let mut in_degree = vec![0usize; n];
        for row in &self.rows {
            for j in row.ones() {
                in_degree[j] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = queue.pop() {
            order.push(i);
            for j in self.rows[i].ones() {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    queue.push(j);
                }
            }
        }

        (order.len() == n).then_some(order)
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.topological_order().is_none()
    }

    /// Reflexive transitive closure.
    ///
    /// With a topological order available the closure row of a node is the
    /// union of its successors' closure rows, filled in reverse order; on
    /// cyclic graphs each row is computed by breadth-first search. Every
    /// node reaches itself.
    #[must_use]
    pub fn reachability(&self) -> Self {
        let n = self.node_count();
        let rows = if let Some(order) = self.topological_order() {
            let mut rows = vec![FixedBitSet::with_capacity(n); n];
            for &i in order.iter().rev() {
                let mut row = FixedBitSet::with_capacity(n);
                for j in self.rows[i].ones() {
                    row.insert(j);
                    row.union_with(&rows[j]);
                }
                rows[i] = row;
            }
            for (i, row) in rows.iter_mut().enumerate() {
                row.insert(i);
            }
            rows
        } else {
            (0..n)
                .map(|start| {
                    let mut visited = FixedBitSet::with_capacity(n);
                    visited.insert(start);
                    let mut frontier = vec![start];
                    while let Some(i) = frontier.pop() {
                        for j in self.rows[i].ones() {
                            if !visited.put(j) {
                                frontier.push(j);
                            }
                        }
                    }
                    visited
                })
                .collect()
        };
        Self {
            order: self.order,
            rows,
        }
    }

    /// Thin rows without changing reachability.
    ///
    /// Session order is total per session, so reaching a session's earliest
    /// successor implies reaching every later one. Each row keeps, per
    /// session present in it, the member with the smallest height, plus the
    /// node's immediate session neighbour when present.
    #[must_use]
    pub fn reduce_edges(&self) -> Self {
        let n = self.node_count();
        let rows = (0..n)
            .map(|i| {
                let mut row = FixedBitSet::with_capacity(n);
                let mut earliest: HashMap<u64, (u64, usize)> = HashMap::new();
                for j in self.rows[i].ones() {
                    let id = self.order.id(j);
                    let entry = earliest
                        .entry(id.session_id)
                        .or_insert((id.session_height, j));
                    if id.session_height < entry.0 {
                        *entry = (id.session_height, j);
                    }
                }
                for &(_, j) in earliest.values() {
                    row.insert(j);
                }

                let me = self.order.id(i);
                let next = TransactionId::new(me.session_id, me.session_height + 1);
                if let Some(j) = self.order.index_of(&next) {
                    if self.rows[i].contains(j) {
                        row.insert(j);
                    }
                }
                row
            })
            .collect();
        Self {
            order: self.order,
            rows,
        }
    }
}
