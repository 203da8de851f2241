//! YAML schema definitions for declarative pattern configuration

use crate::graph::Activation;
use serde::{Deserialize, Serialize};

/// Complete pattern specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Which pattern to compose
    pub pattern: PatternType,

    /// Feature dimension of x_i (and x_j)
    pub input_dim: usize,

    /// Representation network
    pub phi: NetworkSpec,

    /// Target predictor, fed with phi's output
    pub psi: NetworkSpec,

    /// Optional context predictor, fed with phi(x_i) - phi(x_j)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<NetworkSpec>,

    /// Feature dimension of the context transform variable
    ///
    /// Defaults to the output dimension of beta, or of phi without beta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_transform_dim: Option<usize>,

    /// Target objective name, defaults to the pattern's own choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_loss: Option<String>,

    /// Context objective name, defaults to the pattern's own choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_loss: Option<String>,

    /// Weights of the combined training loss
    #[serde(default)]
    pub training: TrainingWeights,

    /// Seed for parameter initialization
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Supported pattern kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    PairwisePredictTransformation,
}

/// Stack of dense layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// Units of the last layer, if any
    pub fn output_dim(&self) -> Option<usize> {
        self.layers.last().map(|layer| layer.units)
    }
}

/// One dense layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub units: usize,

    #[serde(default)]
    pub activation: Activation,
}

/// Weights of the combined training loss
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingWeights {
    #[serde(default = "default_weight")]
    pub target_weight: f32,

    #[serde(default = "default_weight")]
    pub context_weight: f32,
}

impl Default for TrainingWeights {
    fn default() -> Self {
        Self {
            target_weight: default_weight(),
            context_weight: default_weight(),
        }
    }
}

fn default_weight() -> f32 {
    0.5
}

fn default_seed() -> u64 {
    42
}
