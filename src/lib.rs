//! # Concarne: Contextual Patterns for Side-Information Learning
//!
//! Concarne composes a representation network (phi), a target predictor
//! (psi) and an optional context predictor (beta) into a *pattern* that
//! exposes a target loss, a context loss and their weighted sum.
//!
//! ## Architecture
//!
//! - **graph**: Symbolic expressions, dense networks and objectives
//! - **pattern**: Pattern composition, role tagging and lazy losses
//! - **config**: Declarative YAML pattern configuration
//! - **error**: Crate-wide error type

pub mod config;
pub mod graph;
pub mod pattern;

pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};
pub use graph::{Expr, Network, Objective, Param, TagFilter, Variable};
pub use pattern::{Pattern, PatternBuilder, PatternKind, Role};
