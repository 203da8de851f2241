//! Pattern construction

use super::base::{Pattern, PatternParts};
use super::kind::{ContextShape, PairwiseTransformation, PatternKind};
use super::loss::LossSpec;
use crate::error::{Error, Result};
use crate::graph::{Network, Variable};
use std::rc::Rc;

/// Collects the pieces of a pattern and composes them
///
/// # Example
///
/// ```
/// use concarne::graph::{Activation, InputLayer, Sequential, Variable};
/// use concarne::PatternBuilder;
/// use rand::{rngs::StdRng, SeedableRng};
/// use std::rc::Rc;
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let phi = Sequential::new("phi", InputLayer::new("x_i", vec![None, Some(4)]))
///     .dense(2, Activation::Identity, &mut rng)?;
/// let psi = Sequential::new("psi", InputLayer::new("s", vec![None, Some(2)]))
///     .dense(3, Activation::Softmax, &mut rng)?;
///
/// let pattern = PatternBuilder::new(Rc::new(phi), Rc::new(psi))
///     .target_var(Variable::matrix("y", 3))
///     .context_var(Variable::matrix("x_j", 4))
///     .context_transform_var(Variable::matrix("c", 2))
///     .build_pairwise_predict()?;
///
/// let loss = pattern.training_loss(0.5, 0.5)?;
/// # let _ = loss;
/// # Ok::<(), concarne::Error>(())
/// ```
pub struct PatternBuilder {
    phi: Rc<dyn Network>,
    psi: Rc<dyn Network>,
    beta: Option<Rc<dyn Network>>,
    target_var: Option<Variable>,
    context_var: Option<Variable>,
    context_transform_var: Option<Variable>,
    context_shape: Option<ContextShape>,
    target_loss: Option<LossSpec>,
    context_loss: Option<LossSpec>,
    name: Option<String>,
}

impl PatternBuilder {
    pub fn new(phi: Rc<dyn Network>, psi: Rc<dyn Network>) -> Self {
        Self {
            phi,
            psi,
            beta: None,
            target_var: None,
            context_var: None,
            context_transform_var: None,
            context_shape: None,
            target_loss: None,
            context_loss: None,
            name: None,
        }
    }

    pub fn beta(mut self, beta: Rc<dyn Network>) -> Self {
        self.beta = Some(beta);
        self
    }

    pub fn target_var(mut self, var: Variable) -> Self {
        self.target_var = Some(var);
        self
    }

    pub fn context_var(mut self, var: Variable) -> Self {
        self.context_var = Some(var);
        self
    }

    /// Observed transform between the pair, required by pairwise patterns
    pub fn context_transform_var(mut self, var: Variable) -> Self {
        self.context_transform_var = Some(var);
        self
    }

    /// Shape of beta's default input layer
    pub fn context_shape(mut self, shape: impl Into<ContextShape>) -> Self {
        self.context_shape = Some(shape.into());
        self
    }

    /// Target loss as a finished expression or a deferred objective
    pub fn target_loss(mut self, loss: impl Into<LossSpec>) -> Self {
        self.target_loss = Some(loss.into());
        self
    }

    /// Context loss as a finished expression or a deferred objective
    pub fn context_loss(mut self, loss: impl Into<LossSpec>) -> Self {
        self.context_loss = Some(loss.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Compose a base pattern. No loss is built; call
    /// [`Pattern::create_target_objective`] once a target objective is known.
    pub fn build(self) -> Pattern {
        let (parts, _, _) = self.into_parts();
        Pattern::compose(parts, PatternKind::Base)
    }

    /// Compose a pairwise predict-transformation pattern and build both
    /// losses.
    ///
    /// Fails with [`Error::MissingVariable`] before anything is composed when
    /// no context transform variable was given.
    pub fn build_pairwise_predict(self) -> Result<Pattern> {
        let (parts, context_transform_var, context_shape) = self.into_parts();
        let context_transform_var =
            context_transform_var.ok_or(Error::MissingVariable("context_transform_var"))?;

        let kind = PatternKind::PairwisePredictTransformation(PairwiseTransformation::new(
            context_transform_var,
            context_shape,
        ));
        let pattern = Pattern::compose(parts, kind);
        pattern.create_target_objective(None, None)?;
        pattern.create_context_objective()?;
        Ok(pattern)
    }

    fn into_parts(self) -> (PatternParts, Option<Variable>, Option<ContextShape>) {
        let parts = PatternParts {
            phi: self.phi,
            psi: self.psi,
            beta: self.beta,
            target_var: self.target_var,
            context_var: self.context_var,
            target_loss: self.target_loss,
            context_loss: self.context_loss,
            name: self.name,
        };
        (parts, self.context_transform_var, self.context_shape)
    }
}
