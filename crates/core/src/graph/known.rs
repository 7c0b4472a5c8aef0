//! The known precedence graph over transactions.
//!
//! Two edge relations are tracked: `a` carries session order, writes-read
//! and any write-write orderings proven later, while `b` carries
//! anti-dependencies. A side index records, per writes-read edge, the key
//! that was read. Between two transactions there may be several edges
//! differing by kind and key, so edge payloads are collections.

use core::fmt::{self, Debug, Display, Formatter};
use core::hash::Hash;

use hashbrown::HashMap;

use crate::history::check::WriteIndex;
use crate::history::types::{Event, Session, TransactionId};

/// Kinds of precedence between two transactions.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKind {
    /// Consecutive transactions of one session.
    SessionOrder,
    /// Writer to reader of the same `(key, value)`.
    WriteRead,
    /// Two writers of the same key, in commit order.
    WriteWrite,
    /// Reader of a key to a later writer of that key.
    ReadWrite,
}

impl Display for DependencyKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::SessionOrder => write!(f, "SO"),
            Self::WriteRead => write!(f, "WR"),
            Self::WriteWrite => write!(f, "WW"),
            Self::ReadWrite => write!(f, "RW"),
        }
    }
}

/// A known edge. Session order carries no key; the data dependencies carry
/// the witnessing key.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge<K> {
    pub kind: DependencyKind,
    pub key: Option<K>,
}

impl<K> Edge<K> {
    #[must_use]
    pub const fn session_order() -> Self {
        Self {
            kind: DependencyKind::SessionOrder,
            key: None,
        }
    }

    #[must_use]
    pub const fn write_read(key: K) -> Self {
        Self {
            kind: DependencyKind::WriteRead,
            key: Some(key),
        }
    }

    #[must_use]
    pub const fn write_write(key: K) -> Self {
        Self {
            kind: DependencyKind::WriteWrite,
            key: Some(key),
        }
    }

    #[must_use]
    pub const fn read_write(key: K) -> Self {
        Self {
            kind: DependencyKind::ReadWrite,
            key: Some(key),
        }
    }
}

impl<K> Display for Edge<K>
where
    K: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}({key})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A directed multigraph with labeled parallel edges.
#[derive(Debug, Clone)]
pub struct LabeledGraph<T, E>
where
    T: Hash + Eq + Clone,
{
    adj: HashMap<T, HashMap<T, Vec<E>>>,
}

impl<T, E> Default for LabeledGraph<T, E>
where
    T: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self {
            adj: HashMap::new(),
        }
    }
}

impl<T, E> LabeledGraph<T, E>
where
    T: Hash + Eq + Clone + Ord,
    E: Clone + PartialEq,
{
    pub fn add_vertex(&mut self, vertex: T) {
        self.adj.entry(vertex).or_default();
    }

    pub fn add_edge(&mut self, source: T, target: T, label: E) {
        self.adj.entry(target.clone()).or_default();
        self.adj
            .entry(source)
            .or_default()
            .entry(target)
            .or_default()
            .push(label);
    }

    /// Add an edge unless an identical label already connects the pair.
    pub fn add_edge_unique(&mut self, source: T, target: T, label: E) {
        self.adj.entry(target.clone()).or_default();
        let labels = self
            .adj
            .entry(source)
            .or_default()
            .entry(target)
            .or_default();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    #[must_use]
    pub fn has_edge(&self, source: &T, target: &T) -> bool {
        self.adj
            .get(source)
            .is_some_and(|neighbors| neighbors.contains_key(target))
    }

    #[must_use]
    pub fn labels(&self, source: &T, target: &T) -> &[E] {
        match self.adj.get(source).and_then(|neighbors| neighbors.get(target)) {
            Some(labels) => labels,
            None => &[],
        }
    }

    /// Successors of `source`, in target order.
    #[must_use]
    pub fn successors(&self, source: &T) -> Vec<T> {
        let mut targets: Vec<T> = self
            .adj
            .get(source)
            .map(|neighbors| neighbors.keys().cloned().collect())
            .unwrap_or_default();
        targets.sort_unstable();
        targets
    }

    /// All endpoint pairs with at least one edge, in pair order.
    #[must_use]
    pub fn pairs(&self) -> Vec<(T, T)> {
        let mut pairs: Vec<(T, T)> = self
            .adj
            .iter()
            .flat_map(|(source, neighbors)| {
                neighbors
                    .keys()
                    .map(|target| (source.clone(), target.clone()))
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adj.values().map(HashMap::len).sum()
    }
}

/// The known precedence graph plus the writes-read key index.
#[derive(Debug, Clone)]
pub struct KnownGraph<K>
where
    K: Eq + Hash + Clone,
{
    /// Session order, writes-read, and proven write-write orderings.
    a: LabeledGraph<TransactionId, Edge<K>>,
    /// Anti-dependencies.
    b: LabeledGraph<TransactionId, Edge<K>>,
    /// Per writes-read edge, the key that was read.
    read_from: LabeledGraph<TransactionId, K>,
    /// Every transaction of the history, in id order.
    nodes: Vec<TransactionId>,
}

impl<K> Default for KnownGraph<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self {
            a: LabeledGraph::default(),
            b: LabeledGraph::default(),
            read_from: LabeledGraph::default(),
            nodes: Vec::new(),
        }
    }
}

impl<K> KnownGraph<K>
where
    K: Eq + Hash + Clone + Ord,
{
    /// Derive the known precedence relations from a history.
    ///
    /// Adds one session-order edge per adjacent transaction pair of each
    /// session, and one writes-read edge (writer to reader, keyed) per
    /// cross-transaction read. Reads satisfied inside their own
    /// transaction produce no edge.
    pub fn from_history<V>(sessions: &[Session<K, V>], index: &WriteIndex<K, V>) -> Self
    where
        V: Eq + Hash + Clone,
    {
        let mut graph = Self::default();

        for (session_id, session) in (0..).zip(sessions.iter()) {
            for (session_height, transaction) in (0..).zip(session.iter()) {
                let txn_id = TransactionId::new(session_id, session_height);
                graph.a.add_vertex(txn_id);
                graph.b.add_vertex(txn_id);
                graph.read_from.add_vertex(txn_id);
                graph.note_node(txn_id);

                if session_height > 0 {
                    let previous = TransactionId::new(session_id, session_height - 1);
                    graph.a.add_edge(previous, txn_id, Edge::session_order());
                }

                for event in &transaction.events {
                    let Event::Read { key, value } = event else {
                        continue;
                    };
                    let Some(write_id) = index.producer_of(key, value) else {
                        continue;
                    };
                    let writer = write_id.transaction_id();
                    if writer != txn_id {
                        graph.put_edge(writer, txn_id, Edge::write_read(key.clone()));
                    }
                }
            }
        }

        graph
    }

    /// Route an edge to the relation its kind belongs to: write-write and
    /// session order into `a`, anti-dependencies into `b`, writes-read
    /// into `a` plus the key index.
    pub fn put_edge(&mut self, from: TransactionId, to: TransactionId, edge: Edge<K>) {
        self.note_node(from);
        self.note_node(to);
        match edge.kind {
            DependencyKind::SessionOrder | DependencyKind::WriteWrite => {
                self.a.add_edge_unique(from, to, edge);
            }
            DependencyKind::ReadWrite => {
                self.b.add_edge_unique(from, to, edge);
            }
            DependencyKind::WriteRead => {
                if let Some(key) = edge.key.clone() {
                    self.read_from.add_edge_unique(from, to, key);
                }
                self.a.add_edge_unique(from, to, edge);
            }
        }
    }

    #[must_use]
    pub const fn a(&self) -> &LabeledGraph<TransactionId, Edge<K>> {
        &self.a
    }

    #[must_use]
    pub const fn b(&self) -> &LabeledGraph<TransactionId, Edge<K>> {
        &self.b
    }

    #[must_use]
    pub const fn read_from(&self) -> &LabeledGraph<TransactionId, K> {
        &self.read_from
    }

    #[must_use]
    pub fn nodes(&self) -> &[TransactionId] {
        &self.nodes
    }

    fn note_node(&mut self, id: TransactionId) {
        if let Err(position) = self.nodes.binary_search(&id) {
            self.nodes.insert(position, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::types::Transaction;

    type History = Vec<Session<&'static str, u64>>;

    fn build(history: &History) -> KnownGraph<&'static str> {
        let index = WriteIndex::build(history).unwrap();
        KnownGraph::from_history(history, &index)
    }

    #[test]
    fn session_order_edges_between_adjacent_transactions() {
        let history: History = vec![vec![
            Transaction::committed(vec![Event::write("x", 1)]),
            Transaction::committed(vec![Event::write("x", 2)]),
            Transaction::committed(vec![Event::write("x", 3)]),
        ]];
        let graph = build(&history);
        let t = |height| TransactionId::new(0, height);
        assert!(graph.a().has_edge(&t(0), &t(1)));
        assert!(graph.a().has_edge(&t(1), &t(2)));
        // Session order is not transitively closed here.
        assert!(!graph.a().has_edge(&t(0), &t(2)));
        assert_eq!(graph.a().labels(&t(0), &t(1)), &[Edge::session_order()]);
    }

    #[test]
    fn write_read_edges_for_cross_transaction_reads() {
        let history: History = vec![
            vec![Transaction::committed(vec![Event::write("x", 1)])],
            vec![Transaction::committed(vec![Event::read("x", 1)])],
        ];
        let graph = build(&history);
        let writer = TransactionId::new(0, 0);
        let reader = TransactionId::new(1, 0);
        assert_eq!(
            graph.a().labels(&writer, &reader),
            &[Edge::write_read("x")]
        );
        assert_eq!(graph.read_from().labels(&writer, &reader), &["x"]);
    }

    #[test]
    fn no_self_write_read_edges() {
        let history: History = vec![vec![Transaction::committed(vec![
            Event::write("x", 1),
            Event::read("x", 1),
        ])]];
        let graph = build(&history);
        let t0 = TransactionId::new(0, 0);
        assert!(!graph.a().has_edge(&t0, &t0));
        assert_eq!(graph.read_from().edge_count(), 0);
    }

    #[test]
    fn put_edge_routes_by_kind() {
        let history: History = vec![
            vec![Transaction::committed(vec![Event::write("x", 1)])],
            vec![Transaction::committed(vec![Event::write("x", 2)])],
        ];
        let mut graph = build(&history);
        let t0 = TransactionId::new(0, 0);
        let t1 = TransactionId::new(1, 0);

        graph.put_edge(t0, t1, Edge::write_write("x"));
        assert!(graph.a().has_edge(&t0, &t1));
        assert!(!graph.b().has_edge(&t0, &t1));

        graph.put_edge(t1, t0, Edge::read_write("x"));
        assert!(graph.b().has_edge(&t1, &t0));
        assert!(!graph.a().has_edge(&t1, &t0));
    }

    #[test]
    fn parallel_edges_accumulate() {
        let history: History = vec![
            vec![Transaction::committed(vec![
                Event::write("x", 1),
                Event::write("y", 1),
            ])],
            vec![Transaction::committed(vec![
                Event::read("x", 1),
                Event::read("y", 1),
            ])],
        ];
        let graph = build(&history);
        let writer = TransactionId::new(0, 0);
        let reader = TransactionId::new(1, 0);
        let labels = graph.a().labels(&writer, &reader);
        assert_eq!(labels.len(), 2);
        assert!(labels.contains(&Edge::write_read("x")));
        assert!(labels.contains(&Edge::write_read("y")));
    }
}
