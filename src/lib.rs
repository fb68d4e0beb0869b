//! Probabilistic risk analysis engine: compiles static fault trees and
//! event trees (the MEF-level [`model`]) into an indexed Boolean DAG
//! ([`pdag`]), reduces it to a BDD or ZBDD family of minimal cut sets
//! ([`bdd`], [`zbdd`], [`mocus`]), and reports probability, importance, and
//! uncertainty figures over the result ([`analyze`]). [`orchestrator`] ties
//! these phases together into a single `analyze(model, settings)` entry
//! point driven by alignments, phases, and event-tree sequences.

pub mod analyze;
pub mod bdd;
pub mod error;
pub mod expr;
pub mod logging;
pub mod mocus;
pub mod model;
pub mod orchestrator;
pub mod pdag;
pub mod preprocess;
pub mod zbdd;

pub use error::{AnalysisError, Result};
pub use orchestrator::{analyze, AnalysisResult, Settings};

/// Trait for random generation, mainly for building small hand-built model
/// fixtures in tests rather than hand-writing each one out.
pub trait Arbitrary {
    fn random() -> Self;
}
