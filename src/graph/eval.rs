//! Forward evaluation of symbolic expressions

use super::expr::{shape_of, Expr, Op, Shape, Variable};
use crate::error::{Error, Result};
use ndarray::{Array2, Axis, Zip};
use std::collections::HashMap;

/// Lower bound applied before taking a logarithm
pub const LOG_EPSILON: f32 = 1e-7;

/// Values bound to symbolic variables for one evaluation
#[derive(Debug, Default, Clone)]
pub struct Feed {
    values: HashMap<usize, (Variable, Array2<f32>)>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value to a variable, replacing any previous binding
    pub fn insert(&mut self, var: &Variable, value: Array2<f32>) -> &mut Self {
        self.values.insert(var.id(), (var.clone(), value));
        self
    }

    /// Builder form of [`Feed::insert`]
    pub fn with(mut self, var: &Variable, value: Array2<f32>) -> Self {
        self.insert(var, value);
        self
    }

    /// Pair an ordered variable list (e.g. a pattern's training inputs) with
    /// values given in the same order
    pub fn zip(vars: &[Option<Variable>], values: Vec<Array2<f32>>) -> Result<Self> {
        if vars.len() != values.len() {
            return Err(Error::InputCountMismatch {
                expected: vars.len(),
                got: values.len(),
            });
        }

        let mut feed = Self::new();
        for (var, value) in vars.iter().zip(values) {
            let var = var
                .as_ref()
                .ok_or(Error::MissingVariable("training input"))?;
            feed.insert(var, value);
        }
        Ok(feed)
    }

    pub fn get(&self, var: &Variable) -> Option<&Array2<f32>> {
        self.values.get(&var.id()).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Evaluate `expr` with the given variable bindings
///
/// Every node is computed at most once per call, so shared sub-graphs (for
/// example phi applied to the same input twice through one node) are cheap.
pub fn evaluate(expr: &Expr, feed: &Feed) -> Result<Array2<f32>> {
    let mut cache = HashMap::new();
    eval_node(expr, feed, &mut cache)
}

/// Evaluate an expression expected to reduce to a single number
pub fn evaluate_scalar(expr: &Expr, feed: &Feed) -> Result<f32> {
    let value = evaluate(expr, feed)?;
    if value.len() != 1 {
        return Err(Error::ShapeMismatch {
            expected: vec![Some(1), Some(1)],
            got: shape_of(&value),
        });
    }
    Ok(value[[0, 0]])
}

fn eval_node(
    expr: &Expr,
    feed: &Feed,
    cache: &mut HashMap<usize, Array2<f32>>,
) -> Result<Array2<f32>> {
    if let Some(value) = cache.get(&expr.id()) {
        return Ok(value.clone());
    }

    let value = match expr.op() {
        Op::Input { name, shape } => {
            let value = feed
                .values
                .get(&expr.id())
                .map(|(_, value)| value)
                .ok_or_else(|| Error::UnboundVariable(name.clone()))?;
            check_fed_shape(shape, value)?;
            value.clone()
        }
        Op::Param(p) => p.value().clone(),
        Op::Constant(a) => a.clone(),
        Op::Add(a, b) => {
            let (a, b) = (eval_node(a, feed, cache)?, eval_node(b, feed, cache)?);
            broadcast_binary(&a, &b, |x, y| x + y)?
        }
        Op::Sub(a, b) => {
            let (a, b) = (eval_node(a, feed, cache)?, eval_node(b, feed, cache)?);
            broadcast_binary(&a, &b, |x, y| x - y)?
        }
        Op::Mul(a, b) => {
            let (a, b) = (eval_node(a, feed, cache)?, eval_node(b, feed, cache)?);
            broadcast_binary(&a, &b, |x, y| x * y)?
        }
        Op::Scale(a, factor) => eval_node(a, feed, cache)? * *factor,
        Op::Shift(a, offset) => eval_node(a, feed, cache)? + *offset,
        Op::MatMul(a, b) => {
            let (a, b) = (eval_node(a, feed, cache)?, eval_node(b, feed, cache)?);
            if a.ncols() != b.nrows() {
                return Err(Error::ShapeMismatch {
                    expected: vec![Some(a.ncols()), None],
                    got: shape_of(&b),
                });
            }
            a.dot(&b)
        }
        Op::Relu(a) => eval_node(a, feed, cache)?.mapv(|x| x.max(0.0)),
        Op::Sigmoid(a) => eval_node(a, feed, cache)?.mapv(|x| 1.0 / (1.0 + (-x).exp())),
        Op::Tanh(a) => eval_node(a, feed, cache)?.mapv(f32::tanh),
        Op::Softmax(a) => {
            let mut out = eval_node(a, feed, cache)?;
            for mut row in out.rows_mut() {
                // Subtract the row max for numerical stability
                let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
                row.mapv_inplace(|x| (x - max).exp());
                let sum = row.sum();
                row.mapv_inplace(|x| x / sum);
            }
            out
        }
        Op::Log(a) => eval_node(a, feed, cache)?.mapv(|x| x.max(LOG_EPSILON).ln()),
        Op::SumRows(a) => eval_node(a, feed, cache)?
            .sum_axis(Axis(1))
            .insert_axis(Axis(1)),
        Op::Mean(a) => {
            let mean = eval_node(a, feed, cache)?
                .mean()
                .ok_or(Error::EmptyOperand("mean"))?;
            Array2::from_elem((1, 1), mean)
        }
    };

    cache.insert(expr.id(), value.clone());
    Ok(value)
}

/// Apply `f` elementwise, broadcasting `b` to the shape of `a` when needed
fn broadcast_binary(
    a: &Array2<f32>,
    b: &Array2<f32>,
    f: impl Fn(f32, f32) -> f32,
) -> Result<Array2<f32>> {
    let b_view = b.broadcast(a.raw_dim()).ok_or_else(|| Error::ShapeMismatch {
        expected: shape_of(a),
        got: shape_of(b),
    })?;
    Ok(Zip::from(a).and(b_view).map_collect(|&x, &y| f(x, y)))
}

fn check_fed_shape(expected: &Shape, value: &Array2<f32>) -> Result<()> {
    let got = shape_of(value);
    let compatible = expected.len() == got.len()
        && expected
            .iter()
            .zip(got.iter())
            .all(|(e, g)| e.is_none() || e == g);
    if compatible {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            expected: expected.clone(),
            got,
        })
    }
}
