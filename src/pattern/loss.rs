//! Loss slots with one-shot materialization

use crate::error::Result;
use crate::graph::{Expr, Objective};
use once_cell::unsync::OnceCell;

/// A caller-supplied loss: either a finished expression or an objective to
/// be applied once the pattern knows its prediction and target
#[derive(Debug, Clone)]
pub enum LossSpec {
    Expr(Expr),
    Objective(Objective),
}

impl From<Expr> for LossSpec {
    fn from(expr: Expr) -> Self {
        LossSpec::Expr(expr)
    }
}

impl From<Objective> for LossSpec {
    fn from(objective: Objective) -> Self {
        LossSpec::Objective(objective)
    }
}

/// Storage for one of a pattern's losses
///
/// The expression transitions from empty to built exactly once; later
/// attempts to build it return the existing expression untouched.
#[derive(Debug, Default)]
pub(crate) struct LossSlot {
    expr: OnceCell<Expr>,
    objective: Option<Objective>,
}

impl LossSlot {
    pub(crate) fn from_spec(spec: Option<LossSpec>) -> Self {
        match spec {
            None => Self::default(),
            Some(LossSpec::Expr(expr)) => Self {
                expr: OnceCell::with_value(expr),
                objective: None,
            },
            Some(LossSpec::Objective(objective)) => Self {
                expr: OnceCell::new(),
                objective: Some(objective),
            },
        }
    }

    pub(crate) fn expr(&self) -> Option<&Expr> {
        self.expr.get()
    }

    pub(crate) fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    pub(crate) fn is_built(&self) -> bool {
        self.expr.get().is_some()
    }

    pub(crate) fn get_or_try_build(&self, build: impl FnOnce() -> Result<Expr>) -> Result<&Expr> {
        self.expr.get_or_try_init(build)
    }
}
