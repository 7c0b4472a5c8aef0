//! Cross-checks against randomly generated histories.
//!
//! The generator produces histories that are serializable by construction
//! (reads observe a serial execution in generation order), so the checker
//! must accept every one of them, and repeated verification must agree.

use sicheck_core::config::CheckerConfig;
use sicheck_solver::verify;
use sicheck_testgen::generate_single_history;

#[test]
fn generated_histories_satisfy_snapshot_isolation() {
    for _ in 0..10 {
        let history = generate_single_history(3, 4, 4, 5);
        let verdict = verify(&history, &CheckerConfig::default()).unwrap();
        assert!(verdict.is_accept(), "serial-order history rejected");
    }
}

#[test]
fn single_session_histories_always_pass() {
    for _ in 0..10 {
        let history = generate_single_history(1, 3, 6, 4);
        let verdict = verify(&history, &CheckerConfig::default()).unwrap();
        assert!(verdict.is_accept());
    }
}

#[test]
fn repeated_verification_agrees() {
    let config = CheckerConfig::default();
    for _ in 0..5 {
        let history = generate_single_history(4, 3, 3, 4);
        let first = verify(&history, &config).unwrap();
        let second = verify(&history, &config).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn configurations_agree_on_generated_histories() {
    for _ in 0..5 {
        let history = generate_single_history(3, 3, 3, 4);
        for coalesce in [true, false] {
            for pruning in [true, false] {
                let config = CheckerConfig::builder()
                    .coalesce_constraints(coalesce)
                    .enable_pruning(pruning)
                    .build();
                assert!(verify(&history, &config).unwrap().is_accept());
            }
        }
    }
}
