//! Thin literal algebra over the SAT backend.
//!
//! The encoder hands out fresh literals, Tseitin-encodes conjunction and
//! disjunction, and forwards assumption solving, model queries and core
//! extraction to the underlying solver.

use rustsat::solvers::{Solve, SolveIncremental, SolverResult};
use rustsat::types::{Lit, TernaryVal};
use rustsat_batsat::BasicSolver;

#[derive(Default)]
pub struct Encoder {
    solver: BasicSolver,
    next_var: u32,
}

impl Encoder {
    pub fn fresh_lit(&mut self) -> Lit {
        let var = self.next_var;
        self.next_var += 1;
        Lit::positive(var)
    }

    pub fn add_clause(&mut self, lits: &[Lit]) {
        self.solver
            .add_clause(lits.iter().copied().collect())
            .unwrap();
    }

    /// A literal equivalent to the conjunction of `lits`.
    pub fn and_lit(&mut self, lits: &[Lit]) -> Lit {
        debug_assert!(!lits.is_empty());
        if let [only] = lits {
            return *only;
        }
        let def = self.fresh_lit();
        for &lit in lits {
            self.add_clause(&[!def, lit]);
        }
        let mut clause: Vec<Lit> = lits.iter().map(|&lit| !lit).collect();
        clause.push(def);
        self.add_clause(&clause);
        def
    }

    /// A literal equivalent to the disjunction of `lits`.
    pub fn or_lit(&mut self, lits: &[Lit]) -> Lit {
        debug_assert!(!lits.is_empty());
        if let [only] = lits {
            return *only;
        }
        let def = self.fresh_lit();
        for &lit in lits {
            self.add_clause(&[def, !lit]);
        }
        let mut clause = vec![!def];
        clause.extend(lits.iter().copied());
        self.add_clause(&clause);
        def
    }

    pub fn solve_under(&mut self, assumptions: &[Lit]) -> SolverResult {
        self.solver.solve_assumps(assumptions).unwrap()
    }

    /// The failed assumptions of the last unsatisfiable solve.
    pub fn core(&mut self) -> Vec<Lit> {
        self.solver.core().unwrap()
    }

    /// Is `lit` true in the last satisfying assignment?
    pub fn is_true(&self, lit: Lit) -> bool {
        matches!(self.solver.lit_val(lit).unwrap(), TernaryVal::True)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_lit_forces_all_operands() {
        let mut encoder = Encoder::default();
        let a = encoder.fresh_lit();
        let b = encoder.fresh_lit();
        let both = encoder.and_lit(&[a, b]);
        assert!(matches!(encoder.solve_under(&[both]), SolverResult::Sat));
        assert!(encoder.is_true(a));
        assert!(encoder.is_true(b));
        assert!(matches!(
            encoder.solve_under(&[both, !a]),
            SolverResult::Unsat
        ));
    }

    #[test]
    fn or_lit_requires_some_operand() {
        let mut encoder = Encoder::default();
        let a = encoder.fresh_lit();
        let b = encoder.fresh_lit();
        let either = encoder.or_lit(&[a, b]);
        assert!(matches!(
            encoder.solve_under(&[either, !a, !b]),
            SolverResult::Unsat
        ));
        assert!(matches!(
            encoder.solve_under(&[either, !a]),
            SolverResult::Sat
        ));
        assert!(encoder.is_true(b));
    }

    #[test]
    fn core_names_failed_assumptions() {
        let mut encoder = Encoder::default();
        let a = encoder.fresh_lit();
        let b = encoder.fresh_lit();
        encoder.add_clause(&[!a, !b]);
        assert!(matches!(
            encoder.solve_under(&[a, b]),
            SolverResult::Unsat
        ));
        let core = encoder.core();
        assert!(!core.is_empty());
        assert!(core
            .iter()
            .all(|&lit| lit.var() == a.var() || lit.var() == b.var()));
    }
}
