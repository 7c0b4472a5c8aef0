use core::fmt::{self, Debug, Display, Formatter};

/// A single read or write operation within a transaction.
///
/// Every read carries the concrete value it observed. Histories model
/// initial state with an explicit init transaction that writes the starting
/// value of every key, so a read never observes a value without a producer.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Event<K, V> {
    Read { key: K, value: V },
    Write { key: K, value: V },
}

impl<K, V> Event<K, V> {
    pub const fn read(key: K, value: V) -> Self {
        Self::Read { key, value }
    }

    pub const fn write(key: K, value: V) -> Self {
        Self::Write { key, value }
    }

    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. })
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

impl<K, V> Event<K, V>
where
    K: Clone,
    V: Clone,
{
    #[must_use]
    pub fn key(&self) -> K {
        match self {
            Self::Read { key, .. } | Self::Write { key, .. } => key.clone(),
        }
    }

    #[must_use]
    pub fn value(&self) -> V {
        match self {
            Self::Read { value, .. } | Self::Write { value, .. } => value.clone(),
        }
    }
}

impl<K, V> Debug for Event<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Read { key, value } => write!(f, "{key:?}=>{value:?}"),
            Self::Write { key, value } => write!(f, "{key:?}<={value:?}"),
        }
    }
}

impl<K, V> Display for Event<K, V>
where
    K: Display,
    V: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Read { key, value } => write!(f, "{key}=={value}"),
            Self::Write { key, value } => write!(f, "{key}:={value}"),
        }
    }
}

/// A sequence of events executed atomically, either committed or aborted.
///
/// Verified histories contain only committed transactions; an uncommitted
/// transaction is reported as an invalid history before any graph is built.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Clone, PartialEq, Eq)]
pub struct Transaction<K, V> {
    pub events: Vec<Event<K, V>>,
    pub committed: bool,
}

impl<K, V> Transaction<K, V> {
    #[must_use]
    pub const fn committed(events: Vec<Event<K, V>>) -> Self {
        Self {
            events,
            committed: true,
        }
    }

    #[must_use]
    pub const fn uncommitted(events: Vec<Event<K, V>>) -> Self {
        Self {
            events,
            committed: false,
        }
    }
}

impl<K, V> Debug for Transaction<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:?}", self.events)?;
        if !self.committed {
            write!(f, "!")?;
        }
        Ok(())
    }
}

impl<K, V> Display for Transaction<K, V>
where
    K: Display,
    V: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{event}")?;
        }
        write!(f, "]")?;
        if !self.committed {
            write!(f, "!")?;
        }
        Ok(())
    }
}

/// An ordered sequence of transactions from a single client session.
pub type Session<K, V> = Vec<Transaction<K, V>>;

/// Identifies a transaction by its session and position within the session.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId {
    pub session_id: u64,
    pub session_height: u64,
}

impl TransactionId {
    #[must_use]
    pub const fn new(session_id: u64, session_height: u64) -> Self {
        Self {
            session_id,
            session_height,
        }
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "t({},{})", self.session_id, self.session_height)
    }
}

/// Uniquely identifies an event within a history by session, transaction,
/// and position.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId {
    pub session_id: u64,
    pub session_height: u64,
    pub transaction_height: u64,
}

impl EventId {
    #[must_use]
    pub const fn transaction_id(&self) -> TransactionId {
        TransactionId {
            session_id: self.session_id,
            session_height: self.session_height,
        }
    }
}
