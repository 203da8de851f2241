//! The pattern type and its kind-independent operations

use super::kind::PatternKind;
use super::loss::{LossSlot, LossSpec};
use super::tags::{ParamTags, Role};
use crate::error::{Error, Result};
use crate::graph::{Expr, InputLayer, Network, Objective, Param, Shape, TagFilter, TagSet, Variable};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info};

/// Everything a pattern is composed from, collected by the builder
pub(crate) struct PatternParts {
    pub phi: Rc<dyn Network>,
    pub psi: Rc<dyn Network>,
    pub beta: Option<Rc<dyn Network>>,
    pub target_var: Option<Variable>,
    pub context_var: Option<Variable>,
    pub target_loss: Option<LossSpec>,
    pub context_loss: Option<LossSpec>,
    pub name: Option<String>,
}

/// A contextual pattern: phi, psi and an optional beta composed into a
/// target loss and a context loss
///
/// Construct patterns with [`PatternBuilder`](super::PatternBuilder).
pub struct Pattern {
    pub(crate) phi: Rc<dyn Network>,
    pub(crate) psi: Rc<dyn Network>,
    pub(crate) beta: Option<Rc<dyn Network>>,
    pub(crate) input_layer: InputLayer,
    pub(crate) target_var: Option<Variable>,
    pub(crate) context_var: Option<Variable>,
    pub(crate) target_loss: LossSlot,
    pub(crate) context_loss: LossSlot,
    pub(crate) tags: ParamTags,
    pub(crate) kind: PatternKind,
    pub(crate) name: Option<String>,
}

impl Pattern {
    pub(crate) fn compose(parts: PatternParts, kind: PatternKind) -> Self {
        let PatternParts {
            phi,
            psi,
            beta,
            target_var,
            context_var,
            target_loss,
            context_loss,
            name,
        } = parts;

        let input_layer = phi.input_layer().clone();

        let mut networks: Vec<(Role, &dyn Network)> =
            vec![(Role::Phi, phi.as_ref()), (Role::Psi, psi.as_ref())];
        if let Some(beta) = &beta {
            networks.push((Role::Beta, beta.as_ref()));
        }
        let tags = ParamTags::build(&networks);

        info!(
            pattern = name.as_deref().unwrap_or("<unnamed>"),
            kind = kind.name(),
            params = tags.len(),
            has_beta = beta.is_some(),
            "composed contextual pattern"
        );

        Self {
            input_layer,
            target_var,
            context_var,
            target_loss: LossSlot::from_spec(target_loss),
            context_loss: LossSlot::from_spec(context_loss),
            tags,
            kind,
            name,
            phi,
            psi,
            beta,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    pub fn phi(&self) -> &Rc<dyn Network> {
        &self.phi
    }

    pub fn psi(&self) -> &Rc<dyn Network> {
        &self.psi
    }

    pub fn beta(&self) -> Option<&Rc<dyn Network>> {
        self.beta.as_ref()
    }

    /// Phi's input layer
    pub fn input_layer(&self) -> &InputLayer {
        &self.input_layer
    }

    /// The pattern input; always phi's own input variable
    pub fn input_var(&self) -> &Variable {
        self.input_layer.var()
    }

    pub fn target_var(&self) -> Option<&Variable> {
        self.target_var.as_ref()
    }

    pub fn context_var(&self) -> Option<&Variable> {
        self.context_var.as_ref()
    }

    /// Built target loss, if any
    pub fn target_loss(&self) -> Option<&Expr> {
        self.target_loss.expr()
    }

    /// Deferred target objective supplied by the caller, if any
    pub fn target_loss_fn(&self) -> Option<&Objective> {
        self.target_loss.objective()
    }

    /// Built context loss, if any
    pub fn context_loss(&self) -> Option<&Expr> {
        self.context_loss.expr()
    }

    /// Deferred context objective supplied by the caller, if any
    pub fn context_loss_fn(&self) -> Option<&Objective> {
        self.context_loss.objective()
    }

    /// Variables a training loop must feed, in this order:
    /// `(input, target, context)`, followed by the transform variable for
    /// pairwise patterns
    pub fn training_input_vars(&self) -> Vec<Option<Variable>> {
        let mut vars = vec![
            Some(self.input_var().clone()),
            self.target_var.clone(),
            self.context_var.clone(),
        ];
        if let Some(pairwise) = self.kind.pairwise() {
            vars.push(Some(pairwise.context_transform_var.clone()));
        }
        vars
    }

    /// The context-specific subset of [`Pattern::training_input_vars`]
    pub fn context_vars(&self) -> Vec<Option<Variable>> {
        let mut vars = vec![self.context_var.clone()];
        if let Some(pairwise) = self.kind.pairwise() {
            vars.push(Some(pairwise.context_transform_var.clone()));
        }
        vars
    }

    /// Objective used for the target loss when none was supplied
    pub fn default_target_objective(&self) -> Result<Objective> {
        match &self.kind {
            PatternKind::Base => Err(Error::NotImplemented("default_target_objective")),
            PatternKind::PairwisePredictTransformation(_) => {
                Ok(Objective::categorical_crossentropy())
            }
        }
    }

    /// Objective used for the context loss when none was supplied
    pub fn default_context_objective(&self) -> Result<Objective> {
        match &self.kind {
            PatternKind::Base => Err(Error::NotImplemented("default_context_objective")),
            PatternKind::PairwisePredictTransformation(_) => Ok(Objective::squared_error()),
        }
    }

    /// Build the target loss `mean(objective(output, target))` unless it
    /// already exists.
    ///
    /// `output` defaults to psi(phi(input)) and `target` to the target
    /// variable. The objective is the one supplied at construction, or the
    /// kind's default.
    pub fn create_target_objective(
        &self,
        output: Option<&Expr>,
        target: Option<&Expr>,
    ) -> Result<()> {
        if self.target_loss.is_built() {
            return Ok(());
        }

        let target_var = self
            .target_var
            .as_ref()
            .ok_or(Error::MissingVariable("target_var"))?;
        let objective = match self.target_loss.objective() {
            Some(objective) => objective.clone(),
            None => self.default_target_objective()?,
        };
        let output = output
            .cloned()
            .unwrap_or_else(|| self.get_psi_output_for(&self.input_var().expr()));
        let target = target.cloned().unwrap_or_else(|| target_var.expr());

        self.target_loss.get_or_try_build(|| {
            debug!(objective = objective.name(), "building target loss");
            Ok(objective.apply(&output, &target).mean())
        })?;
        Ok(())
    }

    /// Parameters of psi, then beta, then phi whose tags satisfy `filter`.
    ///
    /// Tags are the layer tags plus role tags. A phi parameter is always
    /// listed in the phi block, even when psi or beta also reach it. Other
    /// parameters shared between networks are listed once, at their first
    /// position.
    pub fn get_params(&self, filter: &TagFilter) -> Vec<Param> {
        let networks = std::iter::once((Role::Psi, &self.psi))
            .chain(self.beta.iter().map(|beta| (Role::Beta, beta)))
            .chain(std::iter::once((Role::Phi, &self.phi)));

        let mut seen = HashSet::new();
        let mut params = Vec::new();
        for (role, network) in networks {
            for tagged in network.tagged_params() {
                if role != Role::Phi && self.tags.has_role(&tagged.param, Role::Phi) {
                    continue;
                }
                if !seen.insert(tagged.param.clone()) {
                    continue;
                }
                let tags = self.tags.get(&tagged.param).unwrap_or(&tagged.tags);
                if filter.matches(tags) {
                    params.push(tagged.param);
                }
            }
        }
        params
    }

    /// Full tag set of one of the pattern's parameters
    pub fn param_tags(&self, param: &Param) -> Option<&TagSet> {
        self.tags.get(param)
    }

    pub fn param_tag_map(&self) -> &ParamTags {
        &self.tags
    }

    /// Shape inference through phi, then psi
    pub fn get_output_shape_for(&self, input_shape: &Shape) -> Result<Shape> {
        let phi_output_shape = self.phi.get_output_shape_for(input_shape)?;
        self.psi.get_output_shape_for(&phi_output_shape)
    }

    /// Output shape for phi's declared input shape
    pub fn output_shape(&self) -> Result<Shape> {
        self.get_output_shape_for(self.input_layer.shape())
    }

    /// psi(phi(input_var))
    pub fn get_output(&self) -> Expr {
        self.get_output_for(&self.input_var().expr())
    }

    pub fn get_output_for(&self, input: &Expr) -> Expr {
        self.get_psi_output_for(input)
    }

    pub fn get_psi_output_for(&self, input: &Expr) -> Expr {
        let phi_output = self.phi.get_output_for(input);
        self.psi.get_output_for(&phi_output)
    }

    pub fn get_phi_output_for(&self, input: &Expr) -> Expr {
        self.phi.get_output_for(input)
    }

    /// Weighted objective `target_weight * target + context_weight * context`.
    ///
    /// A weight of exactly zero drops its term, so the matching loss may be
    /// absent. Weights are not renormalized.
    pub fn training_loss(&self, target_weight: f32, context_weight: f32) -> Result<Expr> {
        if target_weight == 0.0 {
            return Ok(self.require_context_loss()?.scale(context_weight));
        }
        if context_weight == 0.0 {
            return Ok(self.require_target_loss()?.scale(target_weight));
        }

        let target = self.require_target_loss()?.scale(target_weight);
        let context = self.require_context_loss()?.scale(context_weight);
        Ok(&target + &context)
    }

    fn require_target_loss(&self) -> Result<&Expr> {
        self.target_loss().ok_or(Error::MissingLoss("target"))
    }

    fn require_context_loss(&self) -> Result<&Expr> {
        self.context_loss().ok_or(Error::MissingLoss("context"))
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name)
            .field("kind", &self.kind.name())
            .field("phi", &self.phi.name())
            .field("psi", &self.psi.name())
            .field("beta", &self.beta.as_ref().map(|b| b.name()))
            .field("input_var", self.input_var())
            .field("target_loss", &self.target_loss().is_some())
            .field("context_loss", &self.context_loss().is_some())
            .finish()
    }
}
