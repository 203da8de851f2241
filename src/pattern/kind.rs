//! Closed set of pattern variants

use crate::graph::{InputLayer, Shape, Variable};
use once_cell::unsync::OnceCell;

/// Dimensionality of the context signal fed to beta's default input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextShape {
    /// Feature count of a batch of row vectors, i.e. `(None, dim)`
    Dim(usize),
    /// Full symbolic shape
    Shape(Shape),
}

impl ContextShape {
    pub fn to_shape(&self) -> Shape {
        match self {
            ContextShape::Dim(dim) => vec![None, Some(*dim)],
            ContextShape::Shape(shape) => shape.clone(),
        }
    }
}

impl From<usize> for ContextShape {
    fn from(dim: usize) -> Self {
        ContextShape::Dim(dim)
    }
}

impl From<Shape> for ContextShape {
    fn from(shape: Shape) -> Self {
        ContextShape::Shape(shape)
    }
}

/// State shared by the pairwise transformation family: x_i is the pattern
/// input, x_j the context variable, and the transform variable carries the
/// observed relation between them
#[derive(Debug)]
pub struct PairwiseTransformation {
    pub(crate) context_transform_var: Variable,
    pub(crate) context_shape: Option<ContextShape>,
    pub(crate) context_input_layer: OnceCell<InputLayer>,
}

impl PairwiseTransformation {
    pub(crate) fn new(context_transform_var: Variable, context_shape: Option<ContextShape>) -> Self {
        Self {
            context_transform_var,
            context_shape,
            context_input_layer: OnceCell::new(),
        }
    }

    pub fn context_transform_var(&self) -> &Variable {
        &self.context_transform_var
    }

    /// Whether the default beta input layer has been created yet
    pub fn has_context_input_layer(&self) -> bool {
        self.context_input_layer.get().is_some()
    }
}

/// Which pattern a [`Pattern`](super::Pattern) implements
///
/// ```text
///                psi
///   x_i ----> s_i ------> y
///        phi      \
///                  \
///   x_j ----> s_j ------> ~c
///        phi       beta(s_i, s_j)
/// ```
#[derive(Debug)]
pub enum PatternKind {
    /// Composition only. Default objectives and beta are unavailable, so
    /// losses must be supplied by the caller.
    Base,
    /// Predict the transform between x_i and x_j from `phi(x_i) - phi(x_j)`,
    /// optionally mapped through beta
    PairwisePredictTransformation(PairwiseTransformation),
}

impl PatternKind {
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Base => "base",
            PatternKind::PairwisePredictTransformation(_) => "pairwise_predict_transformation",
        }
    }

    /// Pairwise state, for kinds in the pairwise family
    pub fn pairwise(&self) -> Option<&PairwiseTransformation> {
        match self {
            PatternKind::Base => None,
            PatternKind::PairwisePredictTransformation(p) => Some(p),
        }
    }
}
