//! Lazy expression trees over arrays.
//!
//! Construction is purely structural: composing operators with operands
//! builds nodes and never evaluates anything. Every node exposes its
//! broadcast shape and a pure element getter; evaluation happens on
//! demand, index by index, when an assignment walks the destination.
//!
//! Leaves share the storage of the array they were built from (see
//! [`Array::expr`]) and snapshot only its metadata. That sharing is what
//! lets a destination legally appear inside its own source expression,
//! and what the aliasing probe [`Expression::aliases`] exists to detect.

use std::ops::Neg;
use std::sync::Arc;

use crate::array::{Array, StorageId};
use crate::broadcast::{broadcast_offset, broadcast_shape};
use crate::element::Element;
use crate::layout::{self, Order};
use crate::{ExprError, Result};

/// Capability interface of an expression node.
///
/// `at` takes a multi-index of the node's broadcast rank or higher;
/// leaves align it from the trailing end, so a leaf of lower rank ignores
/// the extra leading positions. Evaluation is pure: calling `at`
/// repeatedly with unchanged leaves returns the same value every time.
///
/// `contiguous_in`/`at_linear` are the flat fast path: when
/// `contiguous_in(dims, order)` holds for the assignment's output shape,
/// every element can be read as `at_linear(i)` for `i` in storage order,
/// skipping multi-index decomposition entirely.
pub trait Expression: Sync {
    /// Element type produced by evaluation.
    type Elem: Element;

    /// Broadcast shape of this node, recomputed from the children on
    /// every call.
    fn shape(&self) -> Result<Vec<usize>>;

    /// Rank of the broadcast shape.
    fn rank(&self) -> usize;

    /// Value at a broadcast multi-index.
    fn at(&self, index: &[usize]) -> Result<Self::Elem>;

    /// Value at flat position `i`; only meaningful when `contiguous_in`
    /// returned true for the shape being iterated.
    fn at_linear(&self, i: usize) -> Result<Self::Elem>;

    /// True when every leaf can be read linearly in `order` at exactly
    /// `dims`: unbroadcast, canonically laid out leaves (constants
    /// always qualify).
    fn contiguous_in(&self, dims: &[usize], order: Order) -> bool;

    /// True when any leaf shares the given backing store.
    fn aliases(&self, storage: StorageId) -> bool;
}

// ============================================================================
// Operator tags
// ============================================================================

/// Binary operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    #[inline]
    pub(crate) fn apply<T: Element>(self, lhs: T, rhs: T) -> Result<T> {
        match self {
            BinOp::Add => Ok(lhs + rhs),
            BinOp::Sub => Ok(lhs - rhs),
            BinOp::Mul => Ok(lhs * rhs),
            BinOp::Div => lhs.checked_div(rhs).ok_or(ExprError::DivisionByZero),
        }
    }
}

/// Unary operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
}

impl UnOp {
    #[inline]
    fn apply<T>(self, value: T) -> T
    where
        T: Element + Neg<Output = T>,
    {
        match self {
            UnOp::Neg => -value,
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Wrapper over an expression node; carries the composition operators
/// (see the `ops` module) and delegates evaluation to the wrapped node.
#[derive(Debug, Clone, Copy)]
pub struct Expr<E>(E);

impl<E> Expr<E> {
    #[inline]
    pub(crate) fn new(inner: E) -> Self {
        Expr(inner)
    }

    /// Unwrap the underlying node.
    #[inline]
    pub fn into_inner(self) -> E {
        self.0
    }
}

/// Leaf reading an array's storage.
///
/// Shares the backing store of the array it came from and snapshots its
/// shape and strides at construction; it never copies element data.
#[derive(Debug, Clone)]
pub struct Source<T> {
    dims: Vec<usize>,
    strides: Vec<isize>,
    data: Arc<Vec<T>>,
}

/// Constant leaf broadcasting one value over any shape.
#[derive(Debug, Clone, Copy)]
pub struct Scalar<T>(T);

/// Binary node combining two child expressions elementwise.
#[derive(Debug, Clone, Copy)]
pub struct Binary<L, R> {
    lhs: L,
    rhs: R,
    op: BinOp,
}

impl<L, R> Binary<L, R> {
    #[inline]
    pub(crate) fn new(lhs: L, rhs: R, op: BinOp) -> Self {
        Binary { lhs, rhs, op }
    }
}

/// Unary node transforming one child expression elementwise.
#[derive(Debug, Clone, Copy)]
pub struct Unary<E> {
    inner: E,
    op: UnOp,
}

impl<E> Unary<E> {
    #[inline]
    pub(crate) fn new(inner: E, op: UnOp) -> Self {
        Unary { inner, op }
    }
}

/// A constant leaf: `scalar(2.0)` composes with arrays and expressions
/// and broadcasts over any output shape.
pub fn scalar<T: Element>(value: T) -> Expr<Scalar<T>> {
    Expr::new(Scalar(value))
}

impl<T: Element> Array<T> {
    /// An expression leaf over this array.
    ///
    /// The leaf shares this array's storage (no element is copied) and
    /// snapshots its shape and strides. Because the leaf owns its handle,
    /// it stays usable while the array itself is mutably borrowed, which
    /// is how a destination ends up inside its own source expression.
    pub fn expr(&self) -> Expr<Source<T>> {
        Expr::new(Source {
            dims: self.dims().to_vec(),
            strides: self.strides().to_vec(),
            data: Arc::clone(self.storage()),
        })
    }
}

// ============================================================================
// Expression implementations
// ============================================================================

impl<T: Element> Expression for Array<T> {
    type Elem = T;

    fn shape(&self) -> Result<Vec<usize>> {
        Ok(self.dims().to_vec())
    }

    fn rank(&self) -> usize {
        self.dims().len()
    }

    fn at(&self, index: &[usize]) -> Result<T> {
        if index.len() < self.dims().len() {
            return Err(ExprError::RankMismatch(self.dims().len(), index.len()));
        }
        Ok(self.as_slice()[broadcast_offset(self.dims(), self.strides(), index)])
    }

    #[inline]
    fn at_linear(&self, i: usize) -> Result<T> {
        Ok(self.as_slice()[i])
    }

    fn contiguous_in(&self, dims: &[usize], order: Order) -> bool {
        self.dims() == dims && layout::is_contiguous(self.dims(), self.strides(), order)
    }

    fn aliases(&self, storage: StorageId) -> bool {
        self.storage_id() == storage
    }
}

impl<T: Element> Expression for Source<T> {
    type Elem = T;

    fn shape(&self) -> Result<Vec<usize>> {
        Ok(self.dims.clone())
    }

    fn rank(&self) -> usize {
        self.dims.len()
    }

    fn at(&self, index: &[usize]) -> Result<T> {
        if index.len() < self.dims.len() {
            return Err(ExprError::RankMismatch(self.dims.len(), index.len()));
        }
        Ok(self.data[broadcast_offset(&self.dims, &self.strides, index)])
    }

    #[inline]
    fn at_linear(&self, i: usize) -> Result<T> {
        Ok(self.data[i])
    }

    fn contiguous_in(&self, dims: &[usize], order: Order) -> bool {
        self.dims == dims && layout::is_contiguous(&self.dims, &self.strides, order)
    }

    fn aliases(&self, storage: StorageId) -> bool {
        StorageId::of(&self.data) == storage
    }
}

impl<T: Element> Expression for Scalar<T> {
    type Elem = T;

    fn shape(&self) -> Result<Vec<usize>> {
        Ok(Vec::new())
    }

    fn rank(&self) -> usize {
        0
    }

    #[inline]
    fn at(&self, _index: &[usize]) -> Result<T> {
        Ok(self.0)
    }

    #[inline]
    fn at_linear(&self, _i: usize) -> Result<T> {
        Ok(self.0)
    }

    fn contiguous_in(&self, _dims: &[usize], _order: Order) -> bool {
        true
    }

    fn aliases(&self, _storage: StorageId) -> bool {
        false
    }
}

impl<L, R> Expression for Binary<L, R>
where
    L: Expression,
    R: Expression<Elem = L::Elem>,
{
    type Elem = L::Elem;

    fn shape(&self) -> Result<Vec<usize>> {
        let lhs = self.lhs.shape()?;
        let rhs = self.rhs.shape()?;
        broadcast_shape(&[&lhs, &rhs])
    }

    fn rank(&self) -> usize {
        self.lhs.rank().max(self.rhs.rank())
    }

    fn at(&self, index: &[usize]) -> Result<Self::Elem> {
        self.op.apply(self.lhs.at(index)?, self.rhs.at(index)?)
    }

    #[inline]
    fn at_linear(&self, i: usize) -> Result<Self::Elem> {
        self.op.apply(self.lhs.at_linear(i)?, self.rhs.at_linear(i)?)
    }

    fn contiguous_in(&self, dims: &[usize], order: Order) -> bool {
        self.lhs.contiguous_in(dims, order) && self.rhs.contiguous_in(dims, order)
    }

    fn aliases(&self, storage: StorageId) -> bool {
        self.lhs.aliases(storage) || self.rhs.aliases(storage)
    }
}

impl<E> Expression for Unary<E>
where
    E: Expression,
    E::Elem: Neg<Output = E::Elem>,
{
    type Elem = E::Elem;

    fn shape(&self) -> Result<Vec<usize>> {
        self.inner.shape()
    }

    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn at(&self, index: &[usize]) -> Result<Self::Elem> {
        Ok(self.op.apply(self.inner.at(index)?))
    }

    #[inline]
    fn at_linear(&self, i: usize) -> Result<Self::Elem> {
        Ok(self.op.apply(self.inner.at_linear(i)?))
    }

    fn contiguous_in(&self, dims: &[usize], order: Order) -> bool {
        self.inner.contiguous_in(dims, order)
    }

    fn aliases(&self, storage: StorageId) -> bool {
        self.inner.aliases(storage)
    }
}

impl<E: Expression> Expression for Expr<E> {
    type Elem = E::Elem;

    fn shape(&self) -> Result<Vec<usize>> {
        self.0.shape()
    }

    fn rank(&self) -> usize {
        self.0.rank()
    }

    fn at(&self, index: &[usize]) -> Result<Self::Elem> {
        self.0.at(index)
    }

    #[inline]
    fn at_linear(&self, i: usize) -> Result<Self::Elem> {
        self.0.at_linear(i)
    }

    fn contiguous_in(&self, dims: &[usize], order: Order) -> bool {
        self.0.contiguous_in(dims, order)
    }

    fn aliases(&self, storage: StorageId) -> bool {
        self.0.aliases(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar;

    /// Values 1, 2, 3, ... in logical row-major order, whatever the
    /// physical layout.
    fn iota(dims: Vec<usize>, order: Order) -> Array<f64> {
        let logical = layout::strides_for(&dims, Order::RowMajor);
        Array::from_fn(dims, order, |idx| {
            (layout::linear_offset(idx, &logical) + 1) as f64
        })
    }

    #[test]
    fn test_shape_broadcasts_children() {
        let a = iota(vec![2, 1], Order::RowMajor);
        let b = iota(vec![3], Order::RowMajor);
        let e = &a + &b;
        assert_eq!(e.shape().unwrap(), vec![2, 3]);
        assert_eq!(e.rank(), 2);
    }

    #[test]
    fn test_at_broadcast_and_rank_check() {
        let a = iota(vec![2, 1], Order::RowMajor); // [[1], [2]]
        let b = iota(vec![3], Order::RowMajor); // [1, 2, 3]
        let e = &a * &b;
        assert_eq!(e.at(&[0, 2]).unwrap(), 3.0);
        assert_eq!(e.at(&[1, 0]).unwrap(), 2.0);
        let err = e.at(&[1]).unwrap_err();
        assert!(matches!(err, ExprError::RankMismatch(2, 1)));
    }

    #[test]
    fn test_at_is_idempotent() {
        let a = iota(vec![2, 2], Order::ColumnMajor);
        let e = (&a + &a) * scalar(0.5);
        let first = e.at(&[1, 0]).unwrap();
        for _ in 0..4 {
            assert_eq!(e.at(&[1, 0]).unwrap(), first);
        }
        assert_eq!(e.shape().unwrap(), e.shape().unwrap());
    }

    #[test]
    fn test_aliases_walks_leaves() {
        let a = iota(vec![2], Order::RowMajor);
        let b = iota(vec![2], Order::RowMajor);
        let e = (&a + &b) * scalar(2.0);
        assert!(e.aliases(a.storage_id()));
        assert!(e.aliases(b.storage_id()));
        assert!(!e.aliases(iota(vec![2], Order::RowMajor).storage_id()));
    }

    #[test]
    fn test_leaf_shares_storage_not_values() {
        let a = iota(vec![3], Order::RowMajor);
        let e = a.expr();
        assert!(e.aliases(a.storage_id()));
        assert_eq!(e.at(&[2]).unwrap(), 3.0);
    }

    #[test]
    fn test_division_by_zero_surfaces() {
        let a = Array::from_vec(vec![2], vec![4, 9], Order::RowMajor).unwrap();
        let b = Array::from_vec(vec![2], vec![2, 0], Order::RowMajor).unwrap();
        let e = &a / &b;
        assert_eq!(e.at(&[0]).unwrap(), 2);
        assert!(matches!(e.at(&[1]).unwrap_err(), ExprError::DivisionByZero));
    }

    #[test]
    fn test_contiguous_in_rejects_broadcast_leaves() {
        let a = iota(vec![2, 3], Order::RowMajor);
        let row = iota(vec![1, 3], Order::RowMajor);
        let full = (&a + &a).into_inner();
        assert!(full.contiguous_in(&[2, 3], Order::RowMajor));
        assert!(!full.contiguous_in(&[2, 3], Order::ColumnMajor));
        let broadcasting = (&a + &row).into_inner();
        assert!(!broadcasting.contiguous_in(&[2, 3], Order::RowMajor));
        // Scalars broadcast without disturbing the fast path.
        let with_scalar = (&a + scalar(1.0)).into_inner();
        assert!(with_scalar.contiguous_in(&[2, 3], Order::RowMajor));
    }

    #[test]
    fn test_neg() {
        let a = iota(vec![2], Order::RowMajor);
        let e = -(&a);
        assert_eq!(e.at(&[1]).unwrap(), -2.0);
    }
}
