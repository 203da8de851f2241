//! Contextual patterns
//!
//! A pattern wires three sub-networks together:
//!
//! - **phi** computes a representation `s = phi(x)`
//! - **psi** predicts the target from it, `y ~ psi(s)`
//! - **beta** (optional) predicts a context signal from representations
//!
//! and exposes a target loss, a context loss and their weighted sum for a
//! training loop. Parameters are tagged `phi`/`psi`/`beta` by role so a loop
//! can treat the groups differently (e.g. separate learning rates).
//!
//! Losses are built lazily and at most once. Pairwise patterns build both
//! during construction.

mod base;
mod builder;
mod kind;
mod loss;
mod pairwise;
mod tags;

#[cfg(test)]
mod tests;

pub use base::Pattern;
pub use builder::PatternBuilder;
pub use kind::{ContextShape, PairwiseTransformation, PatternKind};
pub use loss::LossSpec;
pub use tags::{ParamTags, Role};
