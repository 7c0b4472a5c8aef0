use core::fmt::{self, Debug, Display, Formatter};

use super::types::{Event, EventId, TransactionId};

/// Ways a raw history can fail the structural and internal-consistency
/// checks that precede graph construction.
///
/// All of these are fatal: the checker reports the reason and never builds
/// a precedence graph for the offending history.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error<K, V> {
    /// A read observes a `(key, value)` that no write produced.
    UnmatchedRead {
        event: Event<K, V>,
        id: EventId,
    },
    /// Two distinct events wrote the same `(key, value)`.
    DuplicateWrite {
        event: Event<K, V>,
        ids: [EventId; 2],
    },
    /// A read observes a write that occurs later in the same transaction.
    FutureRead {
        event: Event<K, V>,
        read_id: EventId,
        write_id: EventId,
    },
    /// A same-transaction read skips over a more recent write of its key.
    StaleInternalRead {
        event: Event<K, V>,
        read_id: EventId,
        write_id: EventId,
        latest_write_id: EventId,
    },
    /// A cross-transaction read observes a write that is overwritten within
    /// the producing transaction.
    OverwrittenRead {
        event: Event<K, V>,
        read_id: EventId,
        write_id: EventId,
        last_write_id: EventId,
    },
    /// The history contains a transaction that never committed.
    UncommittedTransaction {
        id: TransactionId,
    },
}

impl<K, V> Display for Error<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::UnmatchedRead { event, id } => {
                write!(f, "read {event:?} at {id:?} has no corresponding write")
            }
            Self::DuplicateWrite { event, ids } => {
                write!(f, "write {event:?} produced twice, at {:?} and {:?}", ids[0], ids[1])
            }
            Self::FutureRead { event, read_id, write_id } => {
                write!(f, "read {event:?} at {read_id:?} observes the later write at {write_id:?}")
            }
            Self::StaleInternalRead {
                event,
                read_id,
                latest_write_id,
                ..
            } => {
                write!(
                    f,
                    "read {event:?} at {read_id:?} is not reading from the latest write \
                     (expected the write at {latest_write_id:?})"
                )
            }
            Self::OverwrittenRead {
                event,
                read_id,
                write_id,
                last_write_id,
            } => {
                write!(
                    f,
                    "read {event:?} at {read_id:?} observes the write at {write_id:?}, \
                     overwritten within its transaction by {last_write_id:?}"
                )
            }
            Self::UncommittedTransaction { id } => {
                write!(f, "transaction {id} never committed")
            }
        }
    }
}
