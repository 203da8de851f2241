//! Input and dense layers
//!
//! A dense layer computes `activation(x @ W + b)` where `W` has shape
//! `(in_dim, units)` and `b` is a `(1, units)` row broadcast over the batch.

use super::expr::{Expr, Param, Shape, Variable};
use super::tags::{TaggedParam, REGULARIZABLE, TRAINABLE};
use crate::error::{Error, Result};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Elementwise (or row-wise, for softmax) output nonlinearity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    pub fn apply(&self, x: &Expr) -> Expr {
        match self {
            Activation::Identity => x.clone(),
            Activation::Relu => x.relu(),
            Activation::Sigmoid => x.sigmoid(),
            Activation::Tanh => x.tanh(),
            Activation::Softmax => x.softmax(),
        }
    }
}

/// Entry point of a network, binding a [`Variable`] to an expected shape
#[derive(Debug, Clone)]
pub struct InputLayer {
    var: Variable,
    shape: Shape,
}

impl InputLayer {
    /// Input layer over a fresh variable
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        let var = Variable::new(name, shape.clone());
        Self { var, shape }
    }

    /// Input layer reading an existing variable, using the variable's shape
    pub fn from_var(var: Variable) -> Self {
        let shape = var.shape().clone();
        Self { var, shape }
    }

    /// Input layer reading an existing variable with an explicit shape
    pub fn bind(var: Variable, shape: Shape) -> Self {
        Self { var, shape }
    }

    pub fn var(&self) -> &Variable {
        &self.var
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// Fully connected layer
#[derive(Debug)]
pub struct Dense {
    name: String,
    weights: Param,
    bias: Param,
    activation: Activation,
}

impl Dense {
    /// Create a layer with Glorot-uniform weights and zero bias
    pub fn new<R: Rng>(
        name: impl Into<String>,
        in_dim: usize,
        units: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let name = name.into();
        let limit = (6.0 / (in_dim + units).max(1) as f32).sqrt();
        let weights = Array2::from_shape_fn((in_dim, units), |_| rng.random_range(-limit..=limit));

        Self {
            weights: Param::new(format!("{name}.W"), weights),
            bias: Param::new(format!("{name}.b"), Array2::zeros((1, units))),
            name,
            activation,
        }
    }

    /// Create a layer from explicit weights `(in_dim, units)` and bias `(1, units)`
    pub fn from_arrays(
        name: impl Into<String>,
        weights: Array2<f32>,
        bias: Array2<f32>,
        activation: Activation,
    ) -> Result<Self> {
        if bias.dim() != (1, weights.ncols()) {
            return Err(Error::ShapeMismatch {
                expected: vec![Some(1), Some(weights.ncols())],
                got: bias.shape().iter().map(|&d| Some(d)).collect(),
            });
        }

        let name = name.into();
        Ok(Self {
            weights: Param::new(format!("{name}.W"), weights),
            bias: Param::new(format!("{name}.b"), bias),
            name,
            activation,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn in_dim(&self) -> usize {
        self.weights.shape().0
    }

    pub fn units(&self) -> usize {
        self.weights.shape().1
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn weights(&self) -> &Param {
        &self.weights
    }

    pub fn bias(&self) -> &Param {
        &self.bias
    }

    /// Symbolic forward pass
    pub fn forward(&self, input: &Expr) -> Expr {
        let affine = &input.matmul(&self.weights.expr()) + &self.bias.expr();
        self.activation.apply(&affine)
    }

    /// Output shape for a `(batch, in_dim)` input shape
    pub fn output_shape(&self, input_shape: &Shape) -> Result<Shape> {
        match input_shape.as_slice() {
            [batch, features] if features.is_none() || *features == Some(self.in_dim()) => {
                Ok(vec![*batch, Some(self.units())])
            }
            _ => Err(Error::ShapeMismatch {
                expected: vec![None, Some(self.in_dim())],
                got: input_shape.clone(),
            }),
        }
    }

    /// Weights are trainable and regularizable, the bias only trainable
    pub fn tagged_params(&self) -> Vec<TaggedParam> {
        vec![
            TaggedParam::new(self.weights.clone(), [TRAINABLE, REGULARIZABLE]),
            TaggedParam::new(self.bias.clone(), [TRAINABLE]),
        ]
    }
}
