use core::hash::Hash;

use crate::constraint::SiConstraint;
use crate::prune::ConflictEdges;

/// A minimal set of known edges and constraints witnessing a forbidden
/// cycle. Rendering (plain or dot) is up to the driver.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict<K> {
    /// Known edges on the cycle, grouped by endpoint pair.
    pub edges: ConflictEdges<K>,
    /// Undischarged constraints on the cycle.
    pub constraints: Vec<SiConstraint<K>>,
}

/// Outcome of verifying a history against snapshot isolation.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<K> {
    /// The history satisfies snapshot isolation.
    Accept,
    /// The history does not; the conflict explains why.
    Reject(Conflict<K>),
}

impl<K> Verdict<K>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    #[must_use]
    pub const fn conflict(&self) -> Option<&Conflict<K>> {
        match self {
            Self::Accept => None,
            Self::Reject(conflict) => Some(conflict),
        }
    }
}
