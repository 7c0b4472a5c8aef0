//! Random history generation for exercising the snapshot isolation
//! checker. Generated histories are coherent by construction: every read
//! observes the value a snapshot-isolated serial execution in generation
//! order would produce.

pub mod generator;

pub use generator::{generate_mult_histories, generate_single_history, HistParams, History};
