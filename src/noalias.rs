//! Caller-asserted no-alias assignment.
//!
//! [`noalias`] wraps a destination in a thin handle whose assignment
//! operations skip the aliasing probe and always evaluate directly into
//! the destination. It is a pure optimization affordance: the handle
//! holds no state, and using it when the destination *does* share storage
//! with a source leaf breaks the caller's contract. The resulting
//! contents are then unspecified (the implementation stays memory-safe,
//! the values are simply not the mathematical result).

use crate::array::Array;
use crate::assign::{apply, AssignOp};
use crate::element::Element;
use crate::expr::Expression;
use crate::Result;

/// Assignment handle that skips aliasing analysis; see [`noalias`].
pub struct NoAlias<'a, T: Element> {
    dest: &'a mut Array<T>,
}

/// Assert that `dest` shares storage with no operand of the upcoming
/// assignment, and return a handle whose assignments go straight to the
/// direct evaluation path.
pub fn noalias<T: Element>(dest: &mut Array<T>) -> NoAlias<'_, T> {
    NoAlias { dest }
}

impl<T: Element> NoAlias<'_, T> {
    /// Plain assignment without aliasing analysis; otherwise identical to
    /// [`Array::assign`], including resize-on-assign.
    pub fn assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self.dest, src, AssignOp::Assign, false)
    }

    /// `dest += src` without aliasing analysis; see [`Array::add_assign`].
    pub fn add_assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self.dest, src, AssignOp::Add, false)
    }

    /// `dest -= src` without aliasing analysis; see [`Array::sub_assign`].
    pub fn sub_assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self.dest, src, AssignOp::Sub, false)
    }

    /// `dest *= src` without aliasing analysis; see [`Array::mul_assign`].
    pub fn mul_assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self.dest, src, AssignOp::Mul, false)
    }

    /// `dest /= src` without aliasing analysis; see [`Array::div_assign`].
    pub fn div_assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self.dest, src, AssignOp::Div, false)
    }
}
