//! Symbolic graph construction
//!
//! The graph layer patterns are assembled on top of: deferred expressions
//! over named placeholders, shared parameters, dense networks, objectives and
//! a forward evaluator. Tensor arithmetic is delegated to `ndarray`.
//!
//! # Example
//!
//! ```
//! use concarne::graph::{evaluate, Feed, Variable};
//! use ndarray::array;
//!
//! let x = Variable::matrix("x", 2);
//! let y = &x.expr() - &x.expr().scale(0.5);
//!
//! let feed = Feed::new().with(&x, array![[2.0, 4.0]]);
//! assert_eq!(evaluate(&y, &feed)?, array![[1.0, 2.0]]);
//! # Ok::<(), concarne::Error>(())
//! ```

mod eval;
mod expr;
mod layers;
mod network;
mod objectives;
mod tags;


pub use eval::{evaluate, evaluate_scalar, Feed, LOG_EPSILON};
pub use expr::{Expr, Param, Shape, Variable};
pub use layers::{Activation, Dense, InputLayer};
pub use network::{Network, Sequential};
pub use objectives::{binary_crossentropy, categorical_crossentropy, squared_error, Objective};
pub use tags::{TagFilter, TagSet, TaggedParam, REGULARIZABLE, TRAINABLE};
