//! Data model and graph engine for offline snapshot isolation checking.
//!
//! `sicheck_core` holds everything the decision procedure needs short of
//! the SAT solver itself:
//!
//! 1. **History model** -- sessions of ordered transactions of ordered
//!    read/write events ([`history`]), plus the internal-consistency check
//!    that every read observes a well-formed producing write.
//! 2. **Known precedence graph** -- session-order and writes-read edges
//!    derived from the raw events, split into the ordering relation and
//!    the anti-dependency relation ([`graph::known`]).
//! 3. **Bitmap matrices** -- composition, union, edge reduction and
//!    reachability over a fixed node-to-index bijection
//!    ([`graph::matrix`]).
//! 4. **Constraints** -- the disjunctive edge sets every conflicting
//!    writer pair must resolve one way or the other ([`constraint`]).
//! 5. **Pruner** -- the reachability loop that discharges constraints
//!    whose orientation is already forced, folding proven edges back into
//!    the known graph ([`prune`]).
//!
//! The solver that decides the residual problem lives in the
//! `sicheck_solver` crate; it consumes the [`KnownGraph`], the remaining
//! [`SiConstraint`]s and produces a [`Verdict`].
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on the
//!   history, constraint, and verdict types.
//!
//! [`KnownGraph`]: graph::known::KnownGraph
//! [`SiConstraint`]: constraint::SiConstraint
//! [`Verdict`]: verdict::Verdict

pub mod config;
pub mod constraint;
pub mod graph;
pub mod history;
pub mod prune;
pub mod verdict;

pub use config::CheckerConfig;
pub use graph::known::KnownGraph;
pub use verdict::{Conflict, Verdict};
