//! Sub-network abstraction consumed by patterns

use super::expr::{Expr, Param, Shape};
use super::layers::{Activation, Dense, InputLayer};
use super::tags::{TagFilter, TaggedParam};
use crate::error::{Error, Result};
use rand::Rng;
use std::collections::HashSet;
use std::rc::Rc;

/// Capabilities a pattern needs from each of its sub-networks
///
/// Building outputs is purely symbolic and therefore infallible; shape
/// inference reports incompatible inputs.
pub trait Network {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// The layer whose variable feeds this network
    fn input_layer(&self) -> &InputLayer;

    /// Symbolic output for an arbitrary input expression
    fn get_output_for(&self, input: &Expr) -> Expr;

    /// Output shape given an input shape
    fn get_output_shape_for(&self, input_shape: &Shape) -> Result<Shape>;

    /// Every parameter reachable from this network, with its layer tags,
    /// each reported once in forward order
    fn tagged_params(&self) -> Vec<TaggedParam>;

    /// Output for the network's own input variable
    fn get_output(&self) -> Expr {
        self.get_output_for(&self.input_layer().var().expr())
    }

    /// Parameters whose layer tags satisfy `filter`
    fn get_params(&self, filter: &TagFilter) -> Vec<Param> {
        self.tagged_params()
            .into_iter()
            .filter(|tp| filter.matches(&tp.tags))
            .map(|tp| tp.param)
            .collect()
    }
}

/// Stack of dense layers applied in order
///
/// Layers are held as `Rc<Dense>` so the same layer may appear in several
/// networks (e.g. a layer shared between phi and beta).
///
/// # Example
///
/// ```
/// use concarne::graph::{Activation, InputLayer, Network, Sequential};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let phi = Sequential::new("phi", InputLayer::new("x", vec![None, Some(4)]))
///     .dense(8, Activation::Relu, &mut rng)?
///     .dense(2, Activation::Identity, &mut rng)?;
///
/// assert_eq!(phi.get_output_shape_for(&vec![None, Some(4)])?, vec![None, Some(2)]);
/// # Ok::<(), concarne::Error>(())
/// ```
pub struct Sequential {
    name: String,
    input: InputLayer,
    layers: Vec<Rc<Dense>>,
}

impl Sequential {
    pub fn new(name: impl Into<String>, input: InputLayer) -> Self {
        Self {
            name: name.into(),
            input,
            layers: Vec::new(),
        }
    }

    /// Append an existing (possibly shared) layer
    pub fn with_layer(mut self, layer: Rc<Dense>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Append a freshly initialized dense layer sized after the current output
    pub fn dense<R: Rng>(
        self,
        units: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        let in_dim = self
            .output_dim()
            .ok_or_else(|| Error::UnknownInputDim(self.name.clone()))?;
        let layer_name = format!("{}.dense{}", self.name, self.layers.len());
        let layer = Dense::new(layer_name, in_dim, units, activation, rng);
        Ok(self.with_layer(Rc::new(layer)))
    }

    pub fn layers(&self) -> &[Rc<Dense>] {
        &self.layers
    }

    /// Feature dimension of the output, if known
    pub fn output_dim(&self) -> Option<usize> {
        match self.layers.last() {
            Some(layer) => Some(layer.units()),
            None => self.input.shape().last().copied().flatten(),
        }
    }
}

impl Network for Sequential {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_layer(&self) -> &InputLayer {
        &self.input
    }

    fn get_output_for(&self, input: &Expr) -> Expr {
        self.layers
            .iter()
            .fold(input.clone(), |x, layer| layer.forward(&x))
    }

    fn get_output_shape_for(&self, input_shape: &Shape) -> Result<Shape> {
        self.layers
            .iter()
            .try_fold(input_shape.clone(), |shape, layer| layer.output_shape(&shape))
    }

    fn tagged_params(&self) -> Vec<TaggedParam> {
        let mut seen = HashSet::new();
        self.layers
            .iter()
            .flat_map(|layer| layer.tagged_params())
            .filter(|tp| seen.insert(tp.param.clone()))
            .collect()
    }
}
