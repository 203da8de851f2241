//! Configuration validation

use super::schema::{NetworkSpec, PatternSpec};

const OBJECTIVES: [&str; 3] = [
    "categorical_crossentropy",
    "squared_error",
    "binary_crossentropy",
];

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid input dimension: {0} (must be > 0)")]
    InvalidInputDim(usize),

    #[error("Network {0} has no layers")]
    EmptyNetwork(&'static str),

    #[error("Invalid layer size in {network}: layer {index} has {units} units (must be > 0)")]
    InvalidUnits {
        network: &'static str,
        index: usize,
        units: usize,
    },

    #[error("Invalid {role} objective: {name} (must be one of: categorical_crossentropy, squared_error, binary_crossentropy)")]
    InvalidObjective { role: &'static str, name: String },

    #[error("Invalid {0} loss weight: {1} (must be finite and >= 0.0)")]
    InvalidWeight(&'static str, f32),

    #[error("Loss weights are both zero")]
    ZeroWeights,

    #[error("Context transform dimension {got} does not match the context prediction dimension {expected}")]
    TransformDimMismatch { expected: usize, got: usize },
}

/// Validate a pattern specification
///
/// Checks:
/// - Dimensions and layer sizes are positive
/// - phi and psi (and beta, when given) have layers
/// - Objective names are known
/// - Loss weights are usable
/// - The context transform matches what beta (or phi) predicts
pub fn validate_config(spec: &PatternSpec) -> Result<(), ValidationError> {
    if spec.input_dim == 0 {
        return Err(ValidationError::InvalidInputDim(spec.input_dim));
    }

    validate_network("phi", &spec.phi)?;
    validate_network("psi", &spec.psi)?;
    if let Some(beta) = &spec.beta {
        validate_network("beta", beta)?;
    }

    for (role, name) in [
        ("target", &spec.target_loss),
        ("context", &spec.context_loss),
    ] {
        if let Some(name) = name {
            if !OBJECTIVES.contains(&name.as_str()) {
                return Err(ValidationError::InvalidObjective {
                    role,
                    name: name.clone(),
                });
            }
        }
    }

    let weights = &spec.training;
    for (role, weight) in [
        ("target", weights.target_weight),
        ("context", weights.context_weight),
    ] {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ValidationError::InvalidWeight(role, weight));
        }
    }
    if weights.target_weight == 0.0 && weights.context_weight == 0.0 {
        return Err(ValidationError::ZeroWeights);
    }

    if let Some(got) = spec.context_transform_dim {
        let expected = context_prediction_dim(spec);
        if got != expected {
            return Err(ValidationError::TransformDimMismatch { expected, got });
        }
    }

    Ok(())
}

/// Feature dimension of beta's prediction, or of phi's output without beta
///
/// Only meaningful for a spec whose networks have layers.
pub(crate) fn context_prediction_dim(spec: &PatternSpec) -> usize {
    spec.beta
        .as_ref()
        .and_then(NetworkSpec::output_dim)
        .or_else(|| spec.phi.output_dim())
        .unwrap_or(spec.input_dim)
}

fn validate_network(network: &'static str, spec: &NetworkSpec) -> Result<(), ValidationError> {
    if spec.layers.is_empty() {
        return Err(ValidationError::EmptyNetwork(network));
    }
    if let Some((index, layer)) = spec.layers.iter().enumerate().find(|(_, l)| l.units == 0) {
        return Err(ValidationError::InvalidUnits {
            network,
            index,
            units: layer.units,
        });
    }
    Ok(())
}
