//! Disjunctive ordering constraints between conflicting writers.
//!
//! Every unordered pair of distinct transactions writing a common key must
//! commit in one of two orders. A constraint captures both candidate
//! orders as edge sets; exactly one side must hold in full. The coalesced
//! form merges all write-write and induced anti-dependency edges between
//! one pair into a single constraint; the un-coalesced form emits one
//! constraint per key and per reader, which is semantically equivalent but
//! larger.

use core::fmt::{self, Display, Formatter};
use core::hash::Hash;
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::known::{DependencyKind, Edge, KnownGraph};
use crate::history::check::WriteIndex;
use crate::history::types::TransactionId;

/// A candidate edge inside a constraint. Only write-write and
/// anti-dependency edges occur here.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiEdge<K> {
    pub from: TransactionId,
    pub to: TransactionId,
    pub kind: DependencyKind,
    pub key: K,
}

impl<K> SiEdge<K> {
    #[must_use]
    pub const fn write_write(from: TransactionId, to: TransactionId, key: K) -> Self {
        Self {
            from,
            to,
            kind: DependencyKind::WriteWrite,
            key,
        }
    }

    #[must_use]
    pub const fn read_write(from: TransactionId, to: TransactionId, key: K) -> Self {
        Self {
            from,
            to,
            kind: DependencyKind::ReadWrite,
            key,
        }
    }
}

impl<K> SiEdge<K>
where
    K: Clone,
{
    /// The known-graph edge this candidate becomes once proven.
    #[must_use]
    pub fn to_edge(&self) -> Edge<K> {
        Edge {
            kind: self.kind,
            key: Some(self.key.clone()),
        }
    }
}

impl<K> Display for SiEdge<K>
where
    K: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} -{}({})-> {}", self.from, self.kind, self.key, self.to)
    }
}

/// Exactly one of `first` and `second` must hold entirely.
///
/// `first` is the `writes.0 -> writes.1` commit order, `second` the
/// reverse.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiConstraint<K> {
    pub id: u64,
    pub writes: (TransactionId, TransactionId),
    pub first: Vec<SiEdge<K>>,
    pub second: Vec<SiEdge<K>>,
}

/// Generate the ordering constraints for every conflicting writer pair.
///
/// With `coalesce` set (the default), one constraint is emitted per pair,
/// aggregating all keys the pair has in common plus the anti-dependency
/// edges induced through the writes-read index. A reader of a key the
/// opposite transaction does not write contributes nothing.
#[must_use]
pub fn generate<K, V>(
    known: &KnownGraph<K>,
    index: &WriteIndex<K, V>,
    coalesce: bool,
) -> Vec<SiConstraint<K>>
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone,
{
    let mut conflicting: BTreeMap<(TransactionId, TransactionId), BTreeSet<K>> = BTreeMap::new();
    for (key, writers) in index.writers.iter() {
        let writers: Vec<TransactionId> = writers.iter().copied().collect();
        for (position, &a) in writers.iter().enumerate() {
            for &c in &writers[position + 1..] {
                conflicting
                    .entry((a, c))
                    .or_default()
                    .insert(key.clone());
            }
        }
    }

    tracing::debug!(
        pairs = conflicting.len(),
        coalesce,
        "generating constraints"
    );

    let mut constraints = Vec::new();
    let mut next_id = 0u64;
    let mut fresh = || {
        let id = next_id;
        next_id += 1;
        id
    };

    for ((a, c), keys) in &conflicting {
        if coalesce {
            let mut first: Vec<SiEdge<K>> = keys
                .iter()
                .map(|key| SiEdge::write_write(*a, *c, key.clone()))
                .collect();
            let mut second: Vec<SiEdge<K>> = keys
                .iter()
                .map(|key| SiEdge::write_write(*c, *a, key.clone()))
                .collect();
            for (reader, writer, other) in [(*a, *c, &mut first), (*c, *a, &mut second)] {
                for b in known.read_from().successors(&reader) {
                    for key in known.read_from().labels(&reader, &b) {
                        if b != writer && writes_key(index, writer, key) {
                            other.push(SiEdge::read_write(b, writer, key.clone()));
                        }
                    }
                }
            }
            constraints.push(SiConstraint {
                id: fresh(),
                writes: (*a, *c),
                first,
                second,
            });
        } else {
            for key in keys {
                constraints.push(SiConstraint {
                    id: fresh(),
                    writes: (*a, *c),
                    first: vec![SiEdge::write_write(*a, *c, key.clone())],
                    second: vec![SiEdge::write_write(*c, *a, key.clone())],
                });
                for b in known.read_from().successors(a) {
                    if b != *c && known.read_from().labels(a, &b).contains(key) {
                        constraints.push(SiConstraint {
                            id: fresh(),
                            writes: (*a, *c),
                            first: vec![
                                SiEdge::write_write(*a, *c, key.clone()),
                                SiEdge::read_write(b, *c, key.clone()),
                            ],
                            second: vec![SiEdge::write_write(*c, *a, key.clone())],
                        });
                    }
                }
                for b in known.read_from().successors(c) {
                    if b != *a && known.read_from().labels(c, &b).contains(key) {
                        constraints.push(SiConstraint {
                            id: fresh(),
                            writes: (*a, *c),
                            first: vec![SiEdge::write_write(*a, *c, key.clone())],
                            second: vec![
                                SiEdge::write_write(*c, *a, key.clone()),
                                SiEdge::read_write(b, *a, key.clone()),
                            ],
                        });
                    }
                }
            }
        }
    }

    constraints
}

fn writes_key<K, V>(index: &WriteIndex<K, V>, txn: TransactionId, key: &K) -> bool
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone,
{
    // A missing writer entry is an empty set, never an error.
    index
        .writers
        .get(key)
        .is_some_and(|writers| writers.contains(&txn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::types::{Event, Session, Transaction};

    type History = Vec<Session<&'static str, u64>>;

    fn build(history: &History, coalesce: bool) -> Vec<SiConstraint<&'static str>> {
        let index = WriteIndex::build(history).unwrap();
        let known = KnownGraph::from_history(history, &index);
        generate(&known, &index, coalesce)
    }

    #[test]
    fn blind_writer_pair_yields_one_constraint() {
        // Two sessions each writing x once, no reads.
        let history: History = vec![
            vec![Transaction::committed(vec![Event::write("x", 1)])],
            vec![Transaction::committed(vec![Event::write("x", 2)])],
        ];
        let constraints = build(&history, true);
        assert_eq!(constraints.len(), 1);
        let constraint = &constraints[0];
        let t1 = TransactionId::new(0, 0);
        let t2 = TransactionId::new(1, 0);
        assert_eq!(constraint.writes, (t1, t2));
        assert_eq!(constraint.first, vec![SiEdge::write_write(t1, t2, "x")]);
        assert_eq!(constraint.second, vec![SiEdge::write_write(t2, t1, "x")]);
    }

    #[test]
    fn coalescing_merges_keys_of_one_pair() {
        let history: History = vec![
            vec![Transaction::committed(vec![
                Event::write("x", 1),
                Event::write("y", 1),
            ])],
            vec![Transaction::committed(vec![
                Event::write("x", 2),
                Event::write("y", 2),
            ])],
        ];
        let coalesced = build(&history, true);
        assert_eq!(coalesced.len(), 1);
        assert_eq!(coalesced[0].first.len(), 2);
        assert_eq!(coalesced[0].second.len(), 2);

        let plain = build(&history, false);
        assert_eq!(plain.len(), 2);
    }

    #[test]
    fn readers_induce_anti_dependency_edges() {
        // t0 writes x, t1 reads x from t0, t2 overwrites x.
        let history: History = vec![
            vec![Transaction::committed(vec![Event::write("x", 1)])],
            vec![Transaction::committed(vec![Event::read("x", 1)])],
            vec![Transaction::committed(vec![Event::write("x", 2)])],
        ];
        let constraints = build(&history, true);
        assert_eq!(constraints.len(), 1);
        let t0 = TransactionId::new(0, 0);
        let t1 = TransactionId::new(1, 0);
        let t2 = TransactionId::new(2, 0);
        let constraint = &constraints[0];
        assert_eq!(constraint.writes, (t0, t2));
        // t0 -> t2 side carries the reader's anti-dependency.
        assert!(constraint.first.contains(&SiEdge::read_write(t1, t2, "x")));
        // The reverse side has no reader of t2.
        assert_eq!(
            constraint.second,
            vec![SiEdge::write_write(t2, t0, "x")]
        );
    }

    #[test]
    fn reader_of_unshared_key_contributes_nothing() {
        // t1 reads y from t0; t2 writes x but never y, so the pair's
        // constraint carries no anti-dependency for y.
        let history: History = vec![
            vec![Transaction::committed(vec![
                Event::write("x", 1),
                Event::write("y", 1),
            ])],
            vec![Transaction::committed(vec![Event::read("y", 1)])],
            vec![Transaction::committed(vec![Event::write("x", 2)])],
        ];
        let constraints = build(&history, true);
        assert_eq!(constraints.len(), 1);
        assert!(constraints[0]
            .first
            .iter()
            .all(|edge| edge.key == "x"));
    }

    #[test]
    fn ids_are_fresh_and_deterministic() {
        let history: History = vec![
            vec![Transaction::committed(vec![
                Event::write("x", 1),
                Event::write("y", 1),
            ])],
            vec![Transaction::committed(vec![Event::write("x", 2)])],
            vec![Transaction::committed(vec![Event::write("y", 2)])],
        ];
        let first = build(&history, true);
        let second = build(&history, true);
        assert_eq!(first, second);
        let ids: Vec<u64> = first.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
