//! Probability, importance, and uncertainty analysis over a qualitative
//! result.

mod calculator;
mod importance;
mod probability;
mod uncertainty;

pub use calculator::{Calculator, ExactBdd, Mcub, RareEvent};
pub use importance::{ImportanceAnalyzer, ImportanceFactors};
pub use probability::{ProbabilityAnalyzer, Sil, SilBucket};
pub use uncertainty::{UncertaintyAnalyzer, UncertaintyReport};
