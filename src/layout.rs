//! Layout and stride model: how a logical multi-index maps to a linear
//! storage offset.
//!
//! A layout is fully described by a stride vector, one entry per dimension.
//! The two canonical layouts (row-major and column-major) are just the two
//! stride vectors [`strides_for`] derives from a shape; permuted layouts
//! are arbitrary caller-supplied stride vectors and go through exactly the
//! same arithmetic. Nothing in this module assumes canonical order.

/// Canonical element orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Last dimension varies fastest.
    RowMajor,
    /// First dimension varies fastest.
    ColumnMajor,
}

/// Derive the canonical strides for a shape under the given order.
///
/// Zero-size dimensions contribute a factor of 1 so the remaining strides
/// stay distinct and the layout stays well-formed.
pub fn strides_for(dims: &[usize], order: Order) -> Vec<isize> {
    let rank = dims.len();
    let mut strides = vec![0isize; rank];
    let mut acc = 1isize;
    match order {
        Order::RowMajor => {
            for j in (0..rank).rev() {
                strides[j] = acc;
                acc *= dims[j].max(1) as isize;
            }
        }
        Order::ColumnMajor => {
            for j in 0..rank {
                strides[j] = acc;
                acc *= dims[j].max(1) as isize;
            }
        }
    }
    strides
}

/// True iff `strides` are exactly the canonical strides for `dims` under
/// `order`, enabling flat linear iteration instead of multi-index
/// decomposition.
pub(crate) fn is_contiguous(dims: &[usize], strides: &[isize], order: Order) -> bool {
    strides == strides_for(dims, order)
}

/// The canonical order `strides` match for `dims`, if any.
///
/// A shape can be contiguous under both orders at once (rank 0 or 1, or
/// any shape whose dimensions are all 1); row-major is reported then.
pub fn contiguous_order(dims: &[usize], strides: &[isize]) -> Option<Order> {
    if is_contiguous(dims, strides, Order::RowMajor) {
        Some(Order::RowMajor)
    } else if is_contiguous(dims, strides, Order::ColumnMajor) {
        Some(Order::ColumnMajor)
    } else {
        None
    }
}

/// Linear storage offset of a multi-index under the given strides.
pub fn linear_offset(index: &[usize], strides: &[isize]) -> isize {
    index
        .iter()
        .zip(strides)
        .map(|(&i, &s)| i as isize * s)
        .sum()
}

/// Walk every multi-index of `dims` exactly once, carrying one
/// incrementally-updated storage offset per stride vector in
/// `strides_list`.
///
/// Visiting order is row-major: most-significant dimension outermost, last
/// dimension fastest. Per-operand layout is carried entirely by the stride
/// vectors, so the visiting order itself is the same for every operand.
/// A rank-0 shape yields a single empty index; a shape with any zero
/// dimension yields nothing.
///
/// The callback's error aborts the walk immediately.
pub(crate) fn for_each_index<E, F>(
    dims: &[usize],
    strides_list: &[&[isize]],
    mut f: F,
) -> std::result::Result<(), E>
where
    F: FnMut(&[usize], &[isize]) -> std::result::Result<(), E>,
{
    let rank = dims.len();
    let mut offsets = vec![0isize; strides_list.len()];
    if rank == 0 {
        return f(&[], &offsets);
    }
    if dims.contains(&0) {
        return Ok(());
    }

    let mut index = vec![0usize; rank];
    loop {
        f(&index, &offsets)?;

        // Odometer advance, last dimension fastest.
        let mut dim = rank;
        loop {
            if dim == 0 {
                return Ok(());
            }
            dim -= 1;
            index[dim] += 1;
            for (offset, strides) in offsets.iter_mut().zip(strides_list) {
                *offset += strides[dim];
            }
            if index[dim] < dims[dim] {
                break;
            }
            index[dim] = 0;
            for (offset, strides) in offsets.iter_mut().zip(strides_list) {
                *offset -= dims[dim] as isize * strides[dim];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides_for_row_major() {
        assert_eq!(strides_for(&[2, 3, 4], Order::RowMajor), vec![12, 4, 1]);
    }

    #[test]
    fn test_strides_for_column_major() {
        assert_eq!(strides_for(&[2, 3, 4], Order::ColumnMajor), vec![1, 2, 6]);
    }

    #[test]
    fn test_contiguous_order_detects_both() {
        assert_eq!(
            contiguous_order(&[2, 3], &[3, 1]),
            Some(Order::RowMajor)
        );
        assert_eq!(
            contiguous_order(&[2, 3], &[1, 2]),
            Some(Order::ColumnMajor)
        );
        assert_eq!(contiguous_order(&[2, 3], &[4, 1]), None);
        // Rank 1 is contiguous either way; row-major wins.
        assert_eq!(contiguous_order(&[5], &[1]), Some(Order::RowMajor));
    }

    #[test]
    fn test_linear_offset() {
        assert_eq!(linear_offset(&[1, 2], &[3, 1]), 5);
        assert_eq!(linear_offset(&[1, 2], &[1, 2]), 5);
        assert_eq!(linear_offset(&[], &[]), 0);
    }

    #[test]
    fn test_for_each_index_order_and_offsets() {
        let dims = [2usize, 2];
        let row = strides_for(&dims, Order::RowMajor);
        let col = strides_for(&dims, Order::ColumnMajor);
        let mut seen = Vec::new();
        let strides_list = [row.as_slice(), col.as_slice()];
        let r: Result<(), ()> = for_each_index(&dims, &strides_list, |index, offsets| {
            seen.push((index.to_vec(), offsets[0], offsets[1]));
            Ok(())
        });
        assert!(r.is_ok());
        assert_eq!(
            seen,
            vec![
                (vec![0, 0], 0, 0),
                (vec![0, 1], 1, 2),
                (vec![1, 0], 2, 1),
                (vec![1, 1], 3, 3),
            ]
        );
    }

    #[test]
    fn test_for_each_index_rank_zero_and_empty() {
        let mut calls = 0;
        let r: Result<(), ()> = for_each_index(&[], &[], |index, _| {
            assert!(index.is_empty());
            calls += 1;
            Ok(())
        });
        assert!(r.is_ok());
        assert_eq!(calls, 1);

        let r: Result<(), ()> = for_each_index(&[2, 0, 3], &[], |_, _| {
            panic!("empty shape must yield nothing")
        });
        assert!(r.is_ok());
    }

    #[test]
    fn test_for_each_index_early_abort() {
        let mut calls = 0;
        let r: Result<(), u8> = for_each_index(&[4], &[], |index, _| {
            calls += 1;
            if index[0] == 2 {
                Err(7)
            } else {
                Ok(())
            }
        });
        assert_eq!(r, Err(7));
        assert_eq!(calls, 3);
    }
}
