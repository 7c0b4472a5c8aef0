pub mod known;
pub mod matrix;

pub use known::{DependencyKind, Edge, KnownGraph, LabeledGraph};
pub use matrix::{MatrixGraph, NodeOrder};
