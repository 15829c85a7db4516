//! Solver adapters

pub mod replay;

pub use replay::{FitTrace, ReplaySolver, ReplaySolverFactory};
