//! Alert engine: classification, cooldown bookkeeping and evaluation.
//!
//! The gateway re-exports what the pipeline and the routes need; the
//! submodules do not know about each other except through these names.

mod classifier;
mod cooldown;
mod evaluator;

pub use classifier::{classify, Breach, Classification};
pub use cooldown::{AlertKey, CooldownTracker};
pub use evaluator::{dispatch, evaluate, Evaluation, RECOMMENDATION};
