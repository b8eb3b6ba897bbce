//! The assignment engine.
//!
//! An assignment walks every logical position of the output shape once,
//! combining the evaluated source with the destination element under an
//! [`AssignOp`]. Before iterating it resolves shapes (broadcasting, and
//! resizing the destination for plain assignment), and asks the aliasing
//! probe which strategy is safe:
//!
//! - *needs-temporary*: the destination's storage appears somewhere in the
//!   source tree. The source is evaluated completely into a fresh buffer
//!   first, and only then combined into the destination, so no read ever
//!   observes a partially-updated destination.
//! - *safe-direct*: every source element is written straight into the
//!   destination as it is evaluated.
//!
//! Iteration is linear over the flat storage range when the destination
//! and every leaf are contiguous under the same order; otherwise a
//! row-major odometer decomposes each position and per-operand strides
//! carry the layouts. The odometer order is deterministic, which is what
//! makes partial writes observable in a fixed order when an element-level
//! error aborts the walk. With the `parallel` feature, large contiguous
//! spans are split across rayon workers instead, and the set of elements
//! written before an error is then unspecified.

use crate::array::Array;
use crate::broadcast::broadcast_shape;
use crate::element::Element;
use crate::expr::Expression;
use crate::layout::{self, Order};
use crate::{ExprError, Result};

/// Operation applied between the existing destination element and the
/// evaluated source element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// Overwrite the destination element.
    Assign,
    /// `dest = dest + src`
    Add,
    /// `dest = dest - src`
    Sub,
    /// `dest = dest * src`
    Mul,
    /// `dest = dest / src`
    Div,
}

impl AssignOp {
    #[inline]
    fn combine<T: Element>(self, current: T, incoming: T) -> Result<T> {
        match self {
            AssignOp::Assign => Ok(incoming),
            AssignOp::Add => Ok(current + incoming),
            AssignOp::Sub => Ok(current - incoming),
            AssignOp::Mul => Ok(current * incoming),
            AssignOp::Div => current
                .checked_div(incoming)
                .ok_or(ExprError::DivisionByZero),
        }
    }
}

impl<T: Element> Array<T> {
    /// Plain assignment: evaluate `src` into this array, resizing it to
    /// the broadcast shape first when the shapes disagree (prior contents
    /// are discarded).
    ///
    /// # Errors
    /// [`ExprError::ShapeMismatch`] when the shapes are not
    /// broadcast-compatible (detected before any element is written);
    /// element-level errors abort the remaining iteration.
    pub fn assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self, src, AssignOp::Assign, true)
    }

    /// Compound update `self += src`.
    ///
    /// Compound updates never resize: this array's shape is the output
    /// shape, and `src` must broadcast into it.
    ///
    /// # Errors
    /// [`ExprError::ShapeMismatch`] when `src` does not broadcast into
    /// this array's shape; element-level errors abort the remaining
    /// iteration, leaving earlier writes in place.
    pub fn add_assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self, src, AssignOp::Add, true)
    }

    /// Compound update `self -= src`; see [`Array::add_assign`].
    pub fn sub_assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self, src, AssignOp::Sub, true)
    }

    /// Compound update `self *= src`; see [`Array::add_assign`].
    pub fn mul_assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self, src, AssignOp::Mul, true)
    }

    /// Compound update `self /= src`; see [`Array::add_assign`].
    ///
    /// # Errors
    /// Additionally [`ExprError::DivisionByZero`] for element types whose
    /// quotient is undefined for the encountered operands.
    pub fn div_assign<E: Expression<Elem = T>>(&mut self, src: &E) -> Result<()> {
        apply(self, src, AssignOp::Div, true)
    }
}

/// Engine entry point. `check_alias: false` is the no-alias contract: the
/// caller asserts the destination shares storage with no leaf, and the
/// verdict is forced safe-direct.
pub(crate) fn apply<T, E>(
    dest: &mut Array<T>,
    src: &E,
    op: AssignOp,
    check_alias: bool,
) -> Result<()>
where
    T: Element,
    E: Expression<Elem = T>,
{
    let src_shape = src.shape()?;
    let out_shape = broadcast_shape(&[dest.dims(), &src_shape])?;
    if op != AssignOp::Assign && out_shape.as_slice() != dest.dims() {
        // Compound updates never resize: the destination shape is the
        // output shape and must already accommodate every operand.
        return Err(ExprError::ShapeMismatch(dest.dims().to_vec(), src_shape));
    }

    if check_alias && src.aliases(dest.storage_id()) {
        // Evaluate the whole source while the destination's current
        // contents are still intact, then resize and combine.
        let temp = materialize(src, &out_shape)?;
        if dest.dims() != out_shape.as_slice() {
            dest.resize(&out_shape);
        }
        return combine_arrays(dest, &temp, op);
    }

    if dest.dims() != out_shape.as_slice() {
        dest.resize(&out_shape);
    }
    evaluate_into(dest, src, op)
}

/// Evaluate `src` into a fresh row-major array of the output shape.
fn materialize<T, E>(src: &E, out_shape: &[usize]) -> Result<Array<T>>
where
    T: Element,
    E: Expression<Elem = T>,
{
    let mut data = Vec::with_capacity(out_shape.iter().product());
    layout::for_each_index(out_shape, &[], |index, _| {
        data.push(src.at(index)?);
        Ok(())
    })?;
    Array::from_vec(out_shape.to_vec(), data, Order::RowMajor)
}

/// Combine a fully materialized source into the destination. The source
/// is row-major contiguous by construction; the destination may have any
/// layout.
fn combine_arrays<T: Element>(dest: &mut Array<T>, src: &Array<T>, op: AssignOp) -> Result<()> {
    debug_assert_eq!(dest.dims(), src.dims());
    let n = dest.len();
    let (dims, dest_strides, data) = dest.parts_mut();

    if layout::is_contiguous(dims, dest_strides, Order::RowMajor) {
        let data = &mut data[..n];
        #[cfg(feature = "parallel")]
        if n >= crate::MIN_PARALLEL_LEN {
            use rayon::prelude::*;
            return data
                .par_iter_mut()
                .zip(src.as_slice())
                .try_for_each(|(d, &s)| {
                    *d = op.combine(*d, s)?;
                    Ok(())
                });
        }
        for (d, &s) in data.iter_mut().zip(src.as_slice()) {
            *d = op.combine(*d, s)?;
        }
        return Ok(());
    }

    let strides_list = [dest_strides, src.strides()];
    layout::for_each_index(dims, &strides_list, |_, offsets| {
        let d = &mut data[offsets[0] as usize];
        *d = op.combine(*d, src.as_slice()[offsets[1] as usize])?;
        Ok(())
    })
}

/// Safe-direct evaluation: write each destination element as the source
/// is evaluated. The destination already has the output shape.
fn evaluate_into<T, E>(dest: &mut Array<T>, src: &E, op: AssignOp) -> Result<()>
where
    T: Element,
    E: Expression<Elem = T>,
{
    for order in [Order::RowMajor, Order::ColumnMajor] {
        if layout::is_contiguous(dest.dims(), dest.strides(), order)
            && src.contiguous_in(dest.dims(), order)
        {
            return evaluate_linear(dest, src, op);
        }
    }

    let (dims, strides, data) = dest.parts_mut();
    let strides_list = [strides];
    layout::for_each_index(dims, &strides_list, |index, offsets| {
        let value = src.at(index)?;
        let d = &mut data[offsets[0] as usize];
        *d = op.combine(*d, value)?;
        Ok(())
    })
}

/// Flat iteration over the storage range; valid only when destination and
/// source agree on a contiguous order.
fn evaluate_linear<T, E>(dest: &mut Array<T>, src: &E, op: AssignOp) -> Result<()>
where
    T: Element,
    E: Expression<Elem = T>,
{
    let n = dest.len();
    let (_, _, data) = dest.parts_mut();
    let data = &mut data[..n];

    #[cfg(feature = "parallel")]
    if n >= crate::MIN_PARALLEL_LEN {
        use rayon::prelude::*;
        return data.par_iter_mut().enumerate().try_for_each(|(i, d)| {
            *d = op.combine(*d, src.at_linear(i)?)?;
            Ok(())
        });
    }

    for (i, d) in data.iter_mut().enumerate() {
        *d = op.combine(*d, src.at_linear(i)?)?;
    }
    Ok(())
}
