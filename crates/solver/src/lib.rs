//! SAT-reduced snapshot isolation decision.
//!
//! `sicheck_solver` takes a raw history and decides whether it satisfies
//! snapshot isolation, end to end:
//!
//! 1. internal-consistency check (fatal on failure, no graph is built);
//! 2. known precedence graph and constraint generation
//!    (`sicheck_core`);
//! 3. reachability pruning, short-circuiting on a composed self-loop;
//! 4. boolean encoding of the residual constraints with an acyclicity
//!    theory over the ordering relation united with its composition
//!    through the anti-dependencies, solved with rustsat + batsat;
//! 5. on unsatisfiability, extraction of the conflicting known edges and
//!    constraints from the solver core.
//!
//! The main entry point is [`verify()`]. The SAT solver is created per
//! verification and dropped when the verdict is produced; nothing is
//! shared across runs.
//!
//! ```rust,ignore
//! use sicheck_core::CheckerConfig;
//! use sicheck_solver::verify;
//!
//! match verify(&sessions, &CheckerConfig::default()) {
//!     Ok(verdict) => println!("verdict: {verdict:?}"),
//!     Err(err) => println!("invalid history: {err}"),
//! }
//! ```

use core::fmt::{self, Debug, Display, Formatter};
use core::hash::Hash;

use ::derive_more::From;

use sicheck_core::config::CheckerConfig;
use sicheck_core::constraint;
use sicheck_core::graph::known::KnownGraph;
use sicheck_core::history::check::{check_internal, WriteIndex};
use sicheck_core::history::error::Error as HistoryError;
use sicheck_core::history::types::Session;
use sicheck_core::prune::prune;
use sicheck_core::verdict::{Conflict, Verdict};

pub mod encode;
pub mod solver;

pub use solver::SiSolver;

/// Error returned when a history cannot be verified at all.
#[derive(Debug, From)]
pub enum Error<K, V> {
    /// The history violates the loader contract or internal consistency.
    InvalidHistory(HistoryError<K, V>),
}

impl<K, V> Display for Error<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::InvalidHistory(inner) => write!(f, "invalid history: {inner}"),
        }
    }
}

/// Decide whether `sessions` satisfies snapshot isolation.
///
/// An empty history (or one with only empty sessions) is trivially
/// accepted. The tunables in `config` select constraint coalescing, the
/// pruning pass and its stopping threshold; for a fixed input and
/// configuration the verdict and, on rejection, the witness are
/// deterministic.
///
/// # Errors
///
/// Returns [`Error::InvalidHistory`] when a transaction never committed,
/// a read observes a value no write produced, or a read is not reading
/// from the latest applicable write. These are contract violations of the
/// history, not snapshot isolation verdicts.
pub fn verify<K, V>(
    sessions: &[Session<K, V>],
    config: &CheckerConfig,
) -> Result<Verdict<K>, Error<K, V>>
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone,
{
    tracing::debug!(sessions = sessions.len(), "verifying snapshot isolation");

    #[allow(clippy::redundant_closure_for_method_calls)]
    if sessions.is_empty() || sessions.iter().all(|s| s.is_empty()) {
        tracing::debug!("trivially satisfied: no sessions or all empty");
        return Ok(Verdict::Accept);
    }

    let index = WriteIndex::build(sessions)?;
    check_internal(sessions, &index)?;

    let mut known = KnownGraph::from_history(sessions, &index);
    let mut constraints = constraint::generate(&known, &index, config.coalesce_constraints);

    if config.enable_pruning {
        let outcome = prune(&mut known, &mut constraints, config.stop_threshold);
        tracing::debug!(
            rounds = outcome.rounds,
            discharged = outcome.discharged,
            remaining = constraints.len(),
            "pruning finished"
        );
        if let Some(edges) = outcome.cycle {
            return Ok(Verdict::Reject(Conflict {
                edges,
                constraints: Vec::new(),
            }));
        }
    }

    Ok(SiSolver::new(&known, &constraints).solve())
}
