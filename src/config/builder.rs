//! Build patterns from configuration

use super::schema::{NetworkSpec, PatternSpec, PatternType, TrainingWeights};
use super::validate::{context_prediction_dim, validate_config};
use crate::error::{Error, Result};
use crate::graph::{Expr, InputLayer, Objective, Sequential, Variable};
use crate::pattern::{Pattern, PatternBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;
use tracing::debug;

/// A pattern built from a [`PatternSpec`] together with the variables a
/// training loop has to feed
#[derive(Debug)]
pub struct BuiltPattern {
    pub pattern: Pattern,
    pub target_var: Variable,
    pub context_var: Variable,
    pub context_transform_var: Variable,
    pub weights: TrainingWeights,
}

impl BuiltPattern {
    /// The combined loss with the configured weights
    pub fn training_loss(&self) -> Result<Expr> {
        self.pattern
            .training_loss(self.weights.target_weight, self.weights.context_weight)
    }
}

/// Build a dense stack named `name` on top of `input`
pub fn build_network<R: Rng>(
    name: &str,
    input: InputLayer,
    spec: &NetworkSpec,
    rng: &mut R,
) -> Result<Sequential> {
    spec.layers
        .iter()
        .try_fold(Sequential::new(name, input), |net, layer| {
            net.dense(layer.units, layer.activation, rng)
        })
}

/// Validate `spec` and build its networks, variables and pattern
///
/// Variables are named `x_i`, `x_j` (inputs), `y` (target) and `c`
/// (context transform). Parameters are initialized from `spec.seed`.
pub fn build_pattern(spec: &PatternSpec) -> Result<BuiltPattern> {
    validate_config(spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let phi = build_network(
        "phi",
        InputLayer::new("x_i", vec![None, Some(spec.input_dim)]),
        &spec.phi,
        &mut rng,
    )?;
    let repr_dim = phi
        .output_dim()
        .ok_or_else(|| Error::ConfigError("phi has no output dimension".to_string()))?;

    let psi = build_network(
        "psi",
        InputLayer::new("s", vec![None, Some(repr_dim)]),
        &spec.psi,
        &mut rng,
    )?;
    let target_dim = psi
        .output_dim()
        .ok_or_else(|| Error::ConfigError("psi has no output dimension".to_string()))?;

    let beta = spec
        .beta
        .as_ref()
        .map(|beta| {
            build_network(
                "beta",
                InputLayer::new("ds", vec![None, Some(repr_dim)]),
                beta,
                &mut rng,
            )
        })
        .transpose()?;

    let transform_dim = spec
        .context_transform_dim
        .unwrap_or_else(|| context_prediction_dim(spec));
    let target_var = Variable::matrix("y", target_dim);
    let context_var = Variable::matrix("x_j", spec.input_dim);
    let context_transform_var = Variable::matrix("c", transform_dim);
    debug!(repr_dim, target_dim, transform_dim, "built networks");

    let mut builder = PatternBuilder::new(Rc::new(phi), Rc::new(psi))
        .target_var(target_var.clone())
        .context_var(context_var.clone())
        .context_transform_var(context_transform_var.clone())
        .context_shape(spec.input_dim);
    if let Some(beta) = beta {
        builder = builder.beta(Rc::new(beta));
    }
    if let Some(name) = &spec.target_loss {
        builder = builder.target_loss(Objective::from_name(name)?);
    }
    if let Some(name) = &spec.context_loss {
        builder = builder.context_loss(Objective::from_name(name)?);
    }
    if let Some(name) = &spec.name {
        builder = builder.name(name.clone());
    }

    let pattern = match spec.pattern {
        PatternType::PairwisePredictTransformation => builder.build_pairwise_predict()?,
    };

    Ok(BuiltPattern {
        pattern,
        target_var,
        context_var,
        context_transform_var,
        weights: spec.training,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LayerSpec;
    use crate::graph::{evaluate_scalar, Activation, Feed, Network, TagFilter};
    use crate::pattern::Role;
    use ndarray::Array2;

    fn spec() -> PatternSpec {
        serde_yaml::from_str(
            r#"
name: toy
pattern: pairwise_predict_transformation
input_dim: 3
phi:
  layers:
    - units: 4
      activation: tanh
    - units: 2
psi:
  layers:
    - units: 2
      activation: softmax
beta:
  layers:
    - units: 1
training:
  target_weight: 1.0
  context_weight: 0.25
seed: 11
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_network() {
        let mut rng = StdRng::seed_from_u64(0);
        let spec = NetworkSpec {
            layers: vec![
                LayerSpec {
                    units: 5,
                    activation: Activation::Relu,
                },
                LayerSpec {
                    units: 2,
                    activation: Activation::Identity,
                },
            ],
        };

        let net = build_network("n", InputLayer::new("x", vec![None, Some(3)]), &spec, &mut rng)
            .unwrap();
        assert_eq!(net.layers().len(), 2);
        assert_eq!(net.layers()[0].name(), "n.dense0");
        assert_eq!(net.output_dim(), Some(2));
    }

    #[test]
    fn test_build_pattern() {
        let built = build_pattern(&spec()).unwrap();
        let pattern = &built.pattern;

        assert_eq!(pattern.name(), Some("toy"));
        assert_eq!(pattern.kind().name(), "pairwise_predict_transformation");
        assert_eq!(built.target_var.shape(), &vec![None, Some(2)]);
        assert_eq!(built.context_var.shape(), &vec![None, Some(3)]);
        assert_eq!(built.context_transform_var.shape(), &vec![None, Some(1)]);
        assert!(pattern.target_loss().is_some());
        assert!(pattern.context_loss().is_some());
        assert_eq!(pattern.output_shape().unwrap(), vec![None, Some(2)]);

        let beta_params = pattern.get_params(&TagFilter::new().require(Role::Beta.as_str()));
        assert_eq!(beta_params.len(), 2);
        assert_eq!(
            pattern.default_beta_input().unwrap().shape(),
            &vec![None, Some(3)]
        );
    }

    #[test]
    fn test_build_is_deterministic_for_a_seed() {
        let a = build_pattern(&spec()).unwrap();
        let b = build_pattern(&spec()).unwrap();

        let wa = a.pattern.phi().get_params(&TagFilter::new());
        let wb = b.pattern.phi().get_params(&TagFilter::new());
        assert_eq!(*wa[0].value(), *wb[0].value());
    }

    #[test]
    fn test_named_objectives_are_used() {
        let mut spec = spec();
        spec.target_loss = Some("squared_error".to_string());
        let built = build_pattern(&spec).unwrap();

        assert_eq!(
            built.pattern.target_loss_fn().map(|o| o.name()),
            Some("squared_error")
        );
        // Unnamed objectives fall back to the pattern default
        assert!(built.pattern.context_loss_fn().is_none());
        assert!(built.pattern.context_loss().is_some());
    }

    #[test]
    fn test_training_loss_evaluates() {
        let built = build_pattern(&spec()).unwrap();
        let vars = built.pattern.training_input_vars();
        let feed = Feed::zip(
            &vars,
            vec![
                Array2::ones((2, 3)),
                Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap(),
                Array2::zeros((2, 3)),
                Array2::zeros((2, 1)),
            ],
        )
        .unwrap();

        let loss = evaluate_scalar(&built.training_loss().unwrap(), &feed).unwrap();
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn test_invalid_spec_is_a_config_error() {
        let mut spec = spec();
        spec.context_transform_dim = Some(7);
        assert!(matches!(build_pattern(&spec), Err(Error::ConfigError(_))));
    }
}
