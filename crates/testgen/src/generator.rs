use std::collections::HashMap;

use chrono::{DateTime, Duration, Local};
use rand::distr::{Distribution, Uniform};
use rand::RngExt;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use sicheck_core::history::types::{Event, Session, Transaction};

#[derive(Clone, Debug, Default, Deserialize, Serialize, TypedBuilder)]
pub struct HistParams {
    pub id: u64,
    pub n_session: u64,
    pub n_key: u64,
    pub n_transaction: u64,
    pub n_event: u64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct History {
    params: HistParams,
    info: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    data: Vec<Session<u64, u64>>,
}

impl History {
    #[must_use]
    pub const fn new(
        params: HistParams,
        info: String,
        start: DateTime<Local>,
        end: DateTime<Local>,
        data: Vec<Session<u64, u64>>,
    ) -> Self {
        Self {
            params,
            info,
            start,
            end,
            data,
        }
    }

    #[must_use]
    pub const fn get_id(&self) -> u64 {
        self.params.id
    }

    #[must_use]
    pub const fn get_data(&self) -> &Vec<Session<u64, u64>> {
        &self.data
    }

    #[must_use]
    pub const fn get_params(&self) -> &HistParams {
        &self.params
    }

    #[must_use]
    pub fn get_duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Generate a single history with `n_session` sessions, each containing
/// `n_transaction` transactions of `n_event` events over `n_key` keys.
///
/// # Coherence invariant
///
/// Every generated read is backed by a producing write and observes the
/// value a snapshot-isolated execution in generation order would see:
///
/// 1. An init transaction (first in the first session) writes version 0 of
///    every key, so reads always have a producer.
/// 2. `latest_writes` tracks the most recently written version per key and
///    is snapshotted at transaction start; reads sample the snapshot.
/// 3. A key written earlier in the same transaction is read back at the
///    written version, never the snapshot one.
/// 4. Versions are globally unique per key (a per-key counter), so no two
///    writes produce the same `(key, value)`.
///
/// All generated transactions are committed.
///
/// # Panics
///
/// Panics if `n_key` is zero (cannot create a uniform distribution over an
/// empty range).
#[must_use]
pub fn generate_single_history(
    n_session: u64,
    n_key: u64,
    n_transaction: u64,
    n_event: u64,
) -> Vec<Session<u64, u64>> {
    let mut counters: HashMap<u64, u64> = HashMap::new();
    let mut latest_writes: HashMap<u64, u64> = (0..n_key).map(|key| (key, 0)).collect();
    let mut random_generator = rand::rng();
    let key_range = Uniform::new(0, n_key).unwrap();

    (0..n_session)
        .map(|session_idx| {
            let mut txns: Vec<Transaction<u64, u64>> = Vec::new();

            if session_idx == 0 {
                txns.push(Transaction {
                    events: (0..n_key).map(|key| Event::write(key, 0)).collect(),
                    committed: true,
                });
            }

            for _ in 0..n_transaction {
                let snapshot = latest_writes.clone();
                let mut written: HashMap<u64, u64> = HashMap::new();
                let mut read_keys: Vec<u64> = Vec::new();
                let events = (0..n_event)
                    .map(|_| {
                        let key = key_range.sample(&mut random_generator);
                        let want_read = random_generator.random::<bool>();
                        if want_read && !read_keys.contains(&key) {
                            read_keys.push(key);
                            let value = written.get(&key).unwrap_or(&snapshot[&key]);
                            Event::read(key, *value)
                        } else {
                            // Per-key counters start above the init
                            // transaction's version 0.
                            let value = {
                                let entry = counters.entry(key).or_default();
                                *entry += 1;
                                *entry
                            };
                            written.insert(key, value);
                            latest_writes.insert(key, value);
                            Event::write(key, value)
                        }
                    })
                    .collect();
                txns.push(Transaction {
                    events,
                    committed: true,
                });
            }

            txns
        })
        .collect::<Vec<_>>()
}

#[must_use]
pub fn generate_mult_histories(
    n_hist: u64,
    n_session: u64,
    n_key: u64,
    n_transaction: u64,
    n_event: u64,
) -> Vec<History> {
    (0..n_hist)
        .into_par_iter()
        .map(|i_hist| {
            let start_time = Local::now();
            let hist = generate_single_history(n_session, n_key, n_transaction, n_event);
            let end_time = Local::now();
            History {
                params: HistParams {
                    id: i_hist,
                    n_session,
                    n_key,
                    n_transaction,
                    n_event,
                },
                info: "generated".to_string(),
                start: start_time,
                end: end_time,
                data: hist,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use sicheck_core::history::check::{check_internal, WriteIndex};

    use super::*;

    #[test]
    fn generated_histories_are_internally_consistent() {
        for _ in 0..10 {
            let history = generate_single_history(3, 4, 5, 6);
            let index = WriteIndex::build(&history).unwrap();
            assert!(check_internal(&history, &index).is_ok());
        }
    }

    #[test]
    fn first_session_starts_with_init_transaction() {
        let history = generate_single_history(2, 3, 1, 2);
        let init = &history[0][0];
        assert_eq!(init.events.len(), 3);
        assert!(init.events.iter().all(Event::is_write));
    }

    #[test]
    fn history_wrapper_roundtrips_through_json() {
        let histories = generate_mult_histories(2, 2, 2, 2, 2);
        assert_eq!(histories.len(), 2);
        let json = serde_json::to_string(&histories[0]).unwrap();
        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get_id(), histories[0].get_id());
        assert_eq!(back.get_data(), histories[0].get_data());
    }
}
