//! Shape broadcasting: reconciling operand shapes of different rank and
//! size.
//!
//! Dimensions are aligned from the trailing end. An aligned pair is
//! compatible when the sizes are equal or one of them is 1; the output
//! size is the larger of the two. Shapes of lower rank are padded with
//! leading 1s. A size-1 dimension stretched over a larger output reads
//! through stride 0, so every logical position along it maps to the same
//! physical element.
//!
//! Broadcast results are computed fresh for every evaluation and never
//! cached: container shapes can change between assignments.

use crate::{ExprError, Result};

/// Compute the common broadcast shape of all operand shapes.
///
/// The output rank is the maximum operand rank; each output dimension is
/// the maximum of the right-aligned operand sizes.
///
/// # Errors
/// [`ExprError::ShapeMismatch`] when an aligned pair of sizes disagrees
/// with neither side equal to 1.
pub fn broadcast_shape(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1usize; rank];
    for shape in shapes {
        let pad = rank - shape.len();
        for (j, &n) in shape.iter().enumerate() {
            if n == 1 {
                continue;
            }
            let d = &mut out[pad + j];
            if *d == 1 {
                *d = n;
            } else if *d != n {
                return Err(ExprError::ShapeMismatch(
                    shapes[0].to_vec(),
                    shape.to_vec(),
                ));
            }
        }
    }
    Ok(out)
}

/// Remap an operand's strides onto a broadcast target shape.
///
/// Right-aligned dimensions keep their stride when the sizes agree and
/// collapse to stride 0 when the operand size is 1; dimensions present
/// only in the target (rank padding) also get stride 0.
///
/// # Errors
/// [`ExprError::StrideLengthMismatch`] if `strides` and `dims` disagree in
/// length, [`ExprError::ShapeMismatch`] if `dims` does not broadcast into
/// `target`.
pub fn broadcast_strides(dims: &[usize], strides: &[isize], target: &[usize]) -> Result<Vec<isize>> {
    if strides.len() != dims.len() {
        return Err(ExprError::StrideLengthMismatch);
    }
    if dims.len() > target.len() {
        return Err(ExprError::ShapeMismatch(dims.to_vec(), target.to_vec()));
    }

    let pad = target.len() - dims.len();
    let mut out = vec![0isize; target.len()];
    for j in 0..dims.len() {
        if dims[j] == target[pad + j] {
            out[pad + j] = strides[j];
        } else if dims[j] != 1 {
            return Err(ExprError::ShapeMismatch(dims.to_vec(), target.to_vec()));
        }
    }
    Ok(out)
}

/// Storage offset of a broadcast multi-index into an operand with the
/// given shape and strides.
///
/// `index` may have higher rank than `dims` (right alignment); size-1
/// dimensions read element 0 regardless of the index along them. The
/// caller has already established compatibility, so this is pure
/// arithmetic.
#[inline]
pub(crate) fn broadcast_offset(dims: &[usize], strides: &[isize], index: &[usize]) -> usize {
    let pad = index.len() - dims.len();
    let mut offset = 0isize;
    for j in 0..dims.len() {
        if dims[j] != 1 {
            debug_assert!(index[pad + j] < dims[j]);
            offset += index[pad + j] as isize * strides[j];
        }
    }
    offset as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_shape_basic() {
        let out = broadcast_shape(&[&[2, 3], &[1, 3]]).unwrap();
        assert_eq!(out, vec![2, 3]);
    }

    #[test]
    fn test_broadcast_shape_rank_padding() {
        let out = broadcast_shape(&[&[2, 3, 4], &[4], &[3, 1]]).unwrap();
        assert_eq!(out, vec![2, 3, 4]);
    }

    #[test]
    fn test_broadcast_shape_scalar_operand() {
        let out = broadcast_shape(&[&[], &[2, 2]]).unwrap();
        assert_eq!(out, vec![2, 2]);
        assert_eq!(broadcast_shape(&[]).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_broadcast_shape_incompatible() {
        let err = broadcast_shape(&[&[2, 3], &[4, 3]]).unwrap_err();
        assert!(matches!(err, ExprError::ShapeMismatch(_, _)));
    }

    #[test]
    fn test_broadcast_strides_stretch_and_pad() {
        let out = broadcast_strides(&[1, 3], &[3, 1], &[4, 2, 3]).unwrap();
        assert_eq!(out, vec![0, 0, 1]);
    }

    #[test]
    fn test_broadcast_strides_size_one_target() {
        // A size-1 dim aligned with a size-1 target keeps its stride.
        let out = broadcast_strides(&[1, 3], &[3, 1], &[1, 3]).unwrap();
        assert_eq!(out, vec![3, 1]);
    }

    #[test]
    fn test_broadcast_strides_incompatible() {
        let err = broadcast_strides(&[2, 3], &[3, 1], &[4, 3]).unwrap_err();
        assert!(matches!(err, ExprError::ShapeMismatch(_, _)));
        let err = broadcast_strides(&[2, 3], &[3], &[2, 3]).unwrap_err();
        assert!(matches!(err, ExprError::StrideLengthMismatch));
    }

    #[test]
    fn test_broadcast_offset_zero_stride_reads() {
        // Shape [1, 3] stretched over [2, 3]: row index is ignored.
        assert_eq!(broadcast_offset(&[1, 3], &[3, 1], &[0, 2]), 2);
        assert_eq!(broadcast_offset(&[1, 3], &[3, 1], &[1, 2]), 2);
        // Rank padding: leading index positions are ignored.
        assert_eq!(broadcast_offset(&[3], &[1], &[7, 2]), 2);
    }
}
