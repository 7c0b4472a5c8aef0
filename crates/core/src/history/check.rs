//! Internal-consistency checking of raw histories.
//!
//! Before any precedence graph is built, every read must be accounted for:
//! a read observing `(key, value)` needs a unique producing write, a read
//! inside the producing transaction must observe the latest prior write of
//! its key, and a read from another transaction must observe that
//! transaction's final write of the key. Violations are fatal and reported
//! without constructing a graph.

use core::hash::Hash;
use std::collections::BTreeSet;

use hashbrown::HashMap;

use super::error::Error;
use super::types::{Event, EventId, Session, TransactionId};

/// Index of all writes in a history.
///
/// Built once per verification and shared by the internal-consistency
/// check, the known-graph builder, and the constraint generator.
#[derive(Debug)]
pub struct WriteIndex<K, V> {
    /// Producing event of each `(key, value)` pair.
    pub producers: HashMap<(K, V), EventId>,
    /// Transactions writing each key, in id order.
    pub writers: HashMap<K, BTreeSet<TransactionId>>,
    /// Sorted event positions of the writes of a key within one transaction.
    pub write_positions: HashMap<(TransactionId, K), Vec<u64>>,
}

impl<K, V> WriteIndex<K, V>
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone,
{
    /// Scan a history and index every write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UncommittedTransaction`] if any transaction never
    /// committed, and [`Error::DuplicateWrite`] if two events produced the
    /// same `(key, value)` pair.
    pub fn build(sessions: &[Session<K, V>]) -> Result<Self, Error<K, V>> {
        let mut producers: HashMap<(K, V), EventId> = HashMap::new();
        let mut writers: HashMap<K, BTreeSet<TransactionId>> = HashMap::new();
        let mut write_positions: HashMap<(TransactionId, K), Vec<u64>> = HashMap::new();

        for (session_id, session) in (0..).zip(sessions.iter()) {
            for (session_height, transaction) in (0..).zip(session.iter()) {
                let txn_id = TransactionId::new(session_id, session_height);
                if !transaction.committed {
                    return Err(Error::UncommittedTransaction { id: txn_id });
                }
                for (transaction_height, event) in (0..).zip(transaction.events.iter()) {
                    let Event::Write { key, value } = event else {
                        continue;
                    };
                    let event_id = EventId {
                        session_id,
                        session_height,
                        transaction_height,
                    };
                    if let Some(&previous) =
                        producers.get(&(key.clone(), value.clone()))
                    {
                        return Err(Error::DuplicateWrite {
                            event: event.clone(),
                            ids: [previous, event_id],
                        });
                    }
                    producers.insert((key.clone(), value.clone()), event_id);
                    writers.entry(key.clone()).or_default().insert(txn_id);
                    write_positions
                        .entry((txn_id, key.clone()))
                        .or_default()
                        .push(transaction_height);
                }
            }
        }

        Ok(Self {
            producers,
            writers,
            write_positions,
        })
    }

    /// The position of the final write of `key` within `txn`, if any.
    #[must_use]
    pub fn last_write_position(&self, txn: TransactionId, key: &K) -> Option<u64> {
        self.write_positions
            .get(&(txn, key.clone()))
            .and_then(|positions| positions.last().copied())
    }

    /// The producing transaction of `(key, value)`, if any.
    #[must_use]
    pub fn producer_of(&self, key: &K, value: &V) -> Option<EventId> {
        self.producers.get(&(key.clone(), value.clone())).copied()
    }
}

/// Check that every read in the history observes a well-formed write.
///
/// For a read at position `i` of transaction `t` observing `(k, v)` with
/// producer at position `j` of transaction `u`:
/// - a producer must exist;
/// - if `u = t`, then `j < i` and `j` is the largest write position of
///   `(t, k)` below `i` (a transaction always reads its own latest write);
/// - if `u != t`, then `j` is the final write of `k` in `u` (only the
///   committed last write of a key is observable outside its transaction).
///
/// # Errors
///
/// Returns the first [`Error`] encountered, scanning sessions in order.
pub fn check_internal<K, V>(
    sessions: &[Session<K, V>],
    index: &WriteIndex<K, V>,
) -> Result<(), Error<K, V>>
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone,
{
    for (session_id, session) in (0..).zip(sessions.iter()) {
        for (session_height, transaction) in (0..).zip(session.iter()) {
            let txn_id = TransactionId::new(session_id, session_height);
            for (transaction_height, event) in (0..).zip(transaction.events.iter()) {
                let Event::Read { key, value } = event else {
                    continue;
                };
                let read_id = EventId {
                    session_id,
                    session_height,
                    transaction_height,
                };
                let Some(write_id) = index.producer_of(key, value) else {
                    return Err(Error::UnmatchedRead {
                        event: event.clone(),
                        id: read_id,
                    });
                };

                if write_id.transaction_id() == txn_id {
                    if write_id.transaction_height >= transaction_height {
                        return Err(Error::FutureRead {
                            event: event.clone(),
                            read_id,
                            write_id,
                        });
                    }
                    // The read must observe the latest write of this key
                    // that precedes it in the same transaction.
                    let latest_below = index.write_positions[&(txn_id, key.clone())]
                        .iter()
                        .copied()
                        .filter(|&position| position < transaction_height)
                        .max()
                        .unwrap_or(write_id.transaction_height);
                    if latest_below != write_id.transaction_height {
                        return Err(Error::StaleInternalRead {
                            event: event.clone(),
                            read_id,
                            write_id,
                            latest_write_id: EventId {
                                transaction_height: latest_below,
                                ..write_id
                            },
                        });
                    }
                } else {
                    let producer = write_id.transaction_id();
                    let last = index
                        .last_write_position(producer, key)
                        .unwrap_or(write_id.transaction_height);
                    if last != write_id.transaction_height {
                        return Err(Error::OverwrittenRead {
                            event: event.clone(),
                            read_id,
                            write_id,
                            last_write_id: EventId {
                                transaction_height: last,
                                ..write_id
                            },
                        });
                    }
                }
            }
        }
    }
    Ok(())
}
