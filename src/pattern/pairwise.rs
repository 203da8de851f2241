//! Context-side operations: beta output, context loss and beta's default input

use super::base::Pattern;
use super::kind::PatternKind;
use crate::error::{Error, Result};
use crate::graph::{Expr, InputLayer, Variable};
use tracing::debug;

impl Pattern {
    /// The observed transform between x_i and x_j, for pairwise patterns
    pub fn context_transform_var(&self) -> Option<&Variable> {
        self.kind.pairwise().map(|p| &p.context_transform_var)
    }

    /// Beta's prediction of the context transform for the pair
    /// `(input_i, input_j)`
    pub fn get_beta_output_for(&self, input_i: &Expr, input_j: &Expr) -> Result<Expr> {
        match &self.kind {
            PatternKind::Base => Err(Error::NotImplemented("get_beta_output_for")),
            PatternKind::PairwisePredictTransformation(_) => {
                let phi_i = self.phi.get_output_for(input_i);
                let phi_j = self.phi.get_output_for(input_j);
                let diff = &phi_i - &phi_j;
                Ok(match &self.beta {
                    Some(beta) => beta.get_output_for(&diff),
                    None => diff,
                })
            }
        }
    }

    /// Build the context loss
    /// `mean(objective(beta(input_var, context_var), context_transform_var))`
    /// unless it already exists.
    pub fn create_context_objective(&self) -> Result<()> {
        if self.context_loss.is_built() {
            return Ok(());
        }

        let pairwise = self
            .kind
            .pairwise()
            .ok_or(Error::NotImplemented("create_context_objective"))?;
        let context_var = self
            .context_var
            .as_ref()
            .ok_or(Error::MissingVariable("context_var"))?;
        let objective = match self.context_loss.objective() {
            Some(objective) => objective.clone(),
            None => self.default_context_objective()?,
        };
        let prediction = self.get_beta_output_for(&self.input_var().expr(), &context_var.expr())?;

        self.context_loss.get_or_try_build(|| {
            debug!(objective = objective.name(), "building context loss");
            Ok(objective
                .apply(&prediction, &pairwise.context_transform_var.expr())
                .mean())
        })?;
        Ok(())
    }

    /// Input layer over the context variable, created on first access and
    /// reused afterwards.
    ///
    /// Its shape is the configured context shape, falling back to the
    /// context variable's own shape.
    pub fn default_beta_input(&self) -> Result<&InputLayer> {
        let pairwise = self
            .kind
            .pairwise()
            .ok_or(Error::NotImplemented("default_beta_input"))?;
        let context_var = self
            .context_var
            .as_ref()
            .ok_or(Error::MissingVariable("context_var"))?;

        Ok(pairwise.context_input_layer.get_or_init(|| {
            let shape = pairwise
                .context_shape
                .as_ref()
                .map(|s| s.to_shape())
                .unwrap_or_else(|| context_var.shape().clone());
            debug!(shape = ?shape, "creating default beta input layer");
            InputLayer::bind(context_var.clone(), shape)
        }))
    }
}
