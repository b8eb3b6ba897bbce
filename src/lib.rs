//! Lazy broadcasting expressions over strided multidimensional arrays.
//!
//! This crate builds arithmetic expression trees over [`Array`] containers
//! without evaluating anything, resolves broadcasting between mismatched
//! shapes at assignment time, and picks an evaluation strategy based on
//! whether the assignment destination shares storage with any operand.
//!
//! # Core Types
//!
//! - [`Array`]: An owned, dynamically-ranked array with explicit strides.
//!   Row-major, column-major, and arbitrary permuted layouts are all
//!   represented uniformly by the stride vector.
//! - [`Expression`]: The capability every expression node exposes: a
//!   broadcast shape, an element getter for an arbitrary multi-index, and
//!   an aliasing probe against a storage identity.
//! - [`Expr`]: Wrapper carrying the `+ - * /` composition operators.
//!
//! # Assignment
//!
//! Containers are updated through the five fallible assignment operations
//! [`Array::assign`], [`Array::add_assign`], [`Array::sub_assign`],
//! [`Array::mul_assign`] and [`Array::div_assign`]. Plain assignment
//! resizes the destination to the broadcast shape when needed; compound
//! operations treat the destination shape as the fixed output shape and
//! fail on incompatibility.
//!
//! When the destination's storage appears anywhere in the source tree, the
//! engine evaluates the source into a temporary before touching the
//! destination, so in-place updates like `b = b * 2 - b` stay correct:
//!
//! ```rust
//! use strided_expr::{scalar, Array, Order};
//!
//! let mut b = Array::from_vec(vec![3], vec![1.0, 2.0, 3.0], Order::RowMajor).unwrap();
//! let doubled_minus_self = b.expr() * scalar(2.0) - b.expr();
//! b.assign(&doubled_minus_self).unwrap();
//! assert_eq!(b.to_vec(), vec![1.0, 2.0, 3.0]);
//! ```
//!
//! Callers that can guarantee the destination is disjoint from every
//! operand skip the aliasing analysis through [`noalias`]:
//!
//! ```rust
//! use strided_expr::{noalias, Array, Order};
//!
//! let a = Array::from_vec(vec![2, 3], (1..=6).map(f64::from).collect(), Order::RowMajor).unwrap();
//! let b = Array::from_elem(vec![2, 3], 10.0, Order::ColumnMajor);
//! let mut out = Array::from_elem(vec![2, 3], 0.0, Order::RowMajor);
//! noalias(&mut out).assign(&(&a + &b)).unwrap();
//! assert_eq!(out.get(&[1, 2]), 16.0);
//! ```
//!
//! # Broadcasting
//!
//! Shapes are reconciled from the trailing dimension: aligned sizes must be
//! equal or 1, shorter shapes are padded with leading 1s, and size-1
//! dimensions are read through stride 0 so every logical position maps to
//! the single physical element. See [`broadcast_shape`] and
//! [`broadcast_strides`].

mod array;
mod assign;
mod broadcast;
mod element;
mod expr;
mod layout;
mod noalias;
mod ops;

// ============================================================================
// Containers and layout
// ============================================================================
pub use array::{Array, StorageId};
pub use layout::{contiguous_order, linear_offset, strides_for, Order};

// ============================================================================
// Broadcasting
// ============================================================================
pub use broadcast::{broadcast_shape, broadcast_strides};

// ============================================================================
// Expressions
// ============================================================================
pub use element::Element;
pub use expr::{scalar, BinOp, Binary, Expr, Expression, Scalar, Source, UnOp, Unary};

// ============================================================================
// Assignment
// ============================================================================
pub use assign::AssignOp;
pub use noalias::{noalias, NoAlias};

/// Minimum number of elements before the contiguous fast path splits work
/// across rayon workers. Below this the parallel dispatch overhead dominates.
#[cfg(feature = "parallel")]
pub const MIN_PARALLEL_LEN: usize = 1 << 15;

// ============================================================================
// Error types
// ============================================================================

/// Errors reported by expression evaluation and assignment.
#[derive(Debug, thiserror::Error)]
pub enum ExprError {
    /// Shapes are not broadcast-compatible.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// An index of the wrong rank reached an expression node.
    #[error("rank mismatch: expected {0}, got {1}")]
    RankMismatch(usize, usize),

    /// A stride vector whose length disagrees with its shape.
    #[error("stride and shape length mismatch")]
    StrideLengthMismatch,

    /// Caller-supplied strides address storage outside the backing buffer.
    #[error("strides exceed storage: need {needed} elements, have {have}")]
    BoundsExceeded { needed: usize, have: usize },

    /// Element-level quotient undefined (zero divisor, or an integer
    /// quotient the element type cannot represent).
    #[error("division by zero")]
    DivisionByZero,
}

/// Result type for expression and assignment operations.
pub type Result<T> = std::result::Result<T, ExprError>;
