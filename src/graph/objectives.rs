//! Pointwise objectives
//!
//! Each objective maps `(prediction, target)` to a per-example (or
//! per-element) loss expression. Patterns reduce it with [`Expr::mean`].

use super::expr::Expr;
use crate::error::{Error, Result};
use std::fmt;
use std::rc::Rc;

/// Categorical cross-entropy between predicted class probabilities and
/// one-hot (or soft) targets, one value per row
///
/// L_n = -sum_k(t_nk * log(p_nk))
pub fn categorical_crossentropy(predictions: &Expr, targets: &Expr) -> Expr {
    (targets * &predictions.log()).sum_rows().scale(-1.0)
}

/// Elementwise squared difference
pub fn squared_error(a: &Expr, b: &Expr) -> Expr {
    let diff = a - b;
    &diff * &diff
}

/// Elementwise binary cross-entropy for probabilities in (0, 1)
///
/// L = -(t * log(p) + (1 - t) * log(1 - p))
pub fn binary_crossentropy(predictions: &Expr, targets: &Expr) -> Expr {
    let one_minus_p = predictions.scale(-1.0).shift(1.0);
    let one_minus_t = targets.scale(-1.0).shift(1.0);
    let positive = targets * &predictions.log();
    let negative = &one_minus_t * &one_minus_p.log();
    (&positive + &negative).scale(-1.0)
}

type ObjectiveFn = dyn Fn(&Expr, &Expr) -> Expr;

/// A named, shareable objective function
///
/// Two `Objective` handles are the [`same`](Objective::same) objective when
/// one is a clone of the other.
#[derive(Clone)]
pub struct Objective {
    name: String,
    f: Rc<ObjectiveFn>,
}

impl Objective {
    /// Wrap an arbitrary objective
    pub fn new(name: impl Into<String>, f: impl Fn(&Expr, &Expr) -> Expr + 'static) -> Self {
        Self {
            name: name.into(),
            f: Rc::new(f),
        }
    }

    pub fn categorical_crossentropy() -> Self {
        Self::new("categorical_crossentropy", categorical_crossentropy)
    }

    pub fn squared_error() -> Self {
        Self::new("squared_error", squared_error)
    }

    pub fn binary_crossentropy() -> Self {
        Self::new("binary_crossentropy", binary_crossentropy)
    }

    /// Look up a built-in objective by name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "categorical_crossentropy" => Ok(Self::categorical_crossentropy()),
            "squared_error" => Ok(Self::squared_error()),
            "binary_crossentropy" => Ok(Self::binary_crossentropy()),
            other => Err(Error::UnknownObjective(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-example loss expression
    pub fn apply(&self, prediction: &Expr, target: &Expr) -> Expr {
        (self.f)(prediction, target)
    }

    pub fn same(&self, other: &Objective) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Objective").field(&self.name).finish()
    }
}
