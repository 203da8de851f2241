//! Symbolic expression nodes
//!
//! An [`Expr`] is an immutable, reference-counted node in a deferred
//! computation graph. Building an expression never touches numeric data;
//! values only flow when the graph is handed to [`evaluate`](super::evaluate)
//! together with a [`Feed`](super::Feed).

use ndarray::Array2;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;
use std::rc::Rc;

use crate::error::{Error, Result};

/// Symbolic shape. `None` marks a dimension that is only known at run time
/// (typically the batch dimension).
pub type Shape = Vec<Option<usize>>;

/// Render a concrete array shape as a symbolic [`Shape`]
pub(crate) fn shape_of(array: &Array2<f32>) -> Shape {
    array.shape().iter().map(|&d| Some(d)).collect()
}

pub(crate) enum Op {
    Input { name: String, shape: Shape },
    Param(Param),
    Constant(Array2<f32>),
    Add(Expr, Expr),
    Sub(Expr, Expr),
    Mul(Expr, Expr),
    Scale(Expr, f32),
    Shift(Expr, f32),
    MatMul(Expr, Expr),
    Relu(Expr),
    Sigmoid(Expr),
    Tanh(Expr),
    Softmax(Expr),
    Log(Expr),
    SumRows(Expr),
    Mean(Expr),
}

/// Node in a symbolic computation graph
///
/// Cloning an `Expr` is cheap and yields a handle to the same node, so two
/// clones compare equal under [`Expr::ptr_eq`].
#[derive(Clone)]
pub struct Expr(Rc<Op>);

impl Expr {
    fn from_op(op: Op) -> Self {
        Self(Rc::new(op))
    }

    /// Constant leaf holding fixed data
    pub fn constant(value: Array2<f32>) -> Self {
        Self::from_op(Op::Constant(value))
    }

    pub(crate) fn op(&self) -> &Op {
        &self.0
    }

    /// Stable identity of this node for the lifetime of the graph
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Whether both handles refer to the same node
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Multiply every element by a scalar
    pub fn scale(&self, factor: f32) -> Expr {
        Self::from_op(Op::Scale(self.clone(), factor))
    }

    /// Add a scalar to every element
    pub fn shift(&self, offset: f32) -> Expr {
        Self::from_op(Op::Shift(self.clone(), offset))
    }

    /// Matrix product `self @ rhs`
    pub fn matmul(&self, rhs: &Expr) -> Expr {
        Self::from_op(Op::MatMul(self.clone(), rhs.clone()))
    }

    pub fn relu(&self) -> Expr {
        Self::from_op(Op::Relu(self.clone()))
    }

    pub fn sigmoid(&self) -> Expr {
        Self::from_op(Op::Sigmoid(self.clone()))
    }

    pub fn tanh(&self) -> Expr {
        Self::from_op(Op::Tanh(self.clone()))
    }

    /// Softmax over each row independently
    pub fn softmax(&self) -> Expr {
        Self::from_op(Op::Softmax(self.clone()))
    }

    /// Natural logarithm, clamped away from zero
    pub fn log(&self) -> Expr {
        Self::from_op(Op::Log(self.clone()))
    }

    /// Sum over the columns of each row, producing an `N x 1` column
    pub fn sum_rows(&self) -> Expr {
        Self::from_op(Op::SumRows(self.clone()))
    }

    /// Mean over all elements, producing a `1 x 1` scalar
    pub fn mean(&self) -> Expr {
        Self::from_op(Op::Mean(self.clone()))
    }
}

impl ops::Add<&Expr> for &Expr {
    type Output = Expr;

    fn add(self, rhs: &Expr) -> Expr {
        Expr::from_op(Op::Add(self.clone(), rhs.clone()))
    }
}

impl ops::Sub<&Expr> for &Expr {
    type Output = Expr;

    fn sub(self, rhs: &Expr) -> Expr {
        Expr::from_op(Op::Sub(self.clone(), rhs.clone()))
    }
}

impl ops::Mul<&Expr> for &Expr {
    type Output = Expr;

    fn mul(self, rhs: &Expr) -> Expr {
        Expr::from_op(Op::Mul(self.clone(), rhs.clone()))
    }
}

impl ops::Mul<&Expr> for f32 {
    type Output = Expr;

    fn mul(self, rhs: &Expr) -> Expr {
        rhs.scale(self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Op::Input { name, .. } => write!(f, "{name}"),
            Op::Param(p) => write!(f, "{}", p.name()),
            Op::Constant(a) => write!(f, "const{:?}", a.shape()),
            Op::Add(a, b) => write!(f, "({a} + {b})"),
            Op::Sub(a, b) => write!(f, "({a} - {b})"),
            Op::Mul(a, b) => write!(f, "({a} * {b})"),
            Op::Scale(a, k) => write!(f, "{k} * {a}"),
            Op::Shift(a, k) => write!(f, "({a} + {k})"),
            Op::MatMul(a, b) => write!(f, "{a} @ {b}"),
            Op::Relu(a) => write!(f, "relu({a})"),
            Op::Sigmoid(a) => write!(f, "sigmoid({a})"),
            Op::Tanh(a) => write!(f, "tanh({a})"),
            Op::Softmax(a) => write!(f, "softmax({a})"),
            Op::Log(a) => write!(f, "log({a})"),
            Op::SumRows(a) => write!(f, "sum_rows({a})"),
            Op::Mean(a) => write!(f, "mean({a})"),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

/// Symbolic placeholder for a tensor supplied at evaluation time
///
/// Identity is by reference: two variables created with the same name are
/// still distinct, while clones of one variable are interchangeable.
#[derive(Clone)]
pub struct Variable {
    expr: Expr,
}

impl Variable {
    /// Create a new placeholder
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            expr: Expr::from_op(Op::Input {
                name: name.into(),
                shape,
            }),
        }
    }

    /// Placeholder for a batch of row vectors with `cols` features
    pub fn matrix(name: impl Into<String>, cols: usize) -> Self {
        Self::new(name, vec![None, Some(cols)])
    }

    pub fn name(&self) -> &str {
        match self.expr.op() {
            Op::Input { name, .. } => name,
            _ => unreachable!("variable always wraps an input node"),
        }
    }

    pub fn shape(&self) -> &Shape {
        match self.expr.op() {
            Op::Input { shape, .. } => shape,
            _ => unreachable!("variable always wraps an input node"),
        }
    }

    /// Symbolic expression reading this variable
    pub fn expr(&self) -> Expr {
        self.expr.clone()
    }

    pub(crate) fn id(&self) -> usize {
        self.expr.id()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.expr.ptr_eq(&other.expr)
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name())
            .field("shape", self.shape())
            .finish()
    }
}

struct ParamInner {
    name: String,
    value: RefCell<Array2<f32>>,
}

/// Trainable parameter shared between every expression that reads it
///
/// Updating the value through [`Param::set_value`] is visible to all
/// subsequent evaluations of graphs that reference the parameter.
#[derive(Clone)]
pub struct Param(Rc<ParamInner>);

impl Param {
    pub fn new(name: impl Into<String>, value: Array2<f32>) -> Self {
        Self(Rc::new(ParamInner {
            name: name.into(),
            value: RefCell::new(value),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Borrow the current value
    pub fn value(&self) -> Ref<'_, Array2<f32>> {
        self.0.value.borrow()
    }

    /// Replace the value, keeping the shape fixed
    pub fn set_value(&self, value: Array2<f32>) -> Result<()> {
        let current = self.shape();
        if value.dim() != current {
            return Err(Error::ShapeMismatch {
                expected: vec![Some(current.0), Some(current.1)],
                got: shape_of(&value),
            });
        }
        *self.0.value.borrow_mut() = value;
        Ok(())
    }

    pub fn shape(&self) -> (usize, usize) {
        self.0.value.borrow().dim()
    }

    /// Number of scalar entries
    pub fn len(&self) -> usize {
        self.0.value.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Symbolic expression reading this parameter
    pub fn expr(&self) -> Expr {
        Expr::from_op(Op::Param(self.clone()))
    }

    pub fn ptr_eq(&self, other: &Param) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Param {}

impl Hash for Param {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name())
            .field("shape", &self.shape())
            .finish()
    }
}
