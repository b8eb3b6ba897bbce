//! Owned, dynamically-ranked arrays with explicit strides.
//!
//! An [`Array`] owns its shape, strides, and a shared backing store. The
//! stride vector carries the layout: canonical row-major or column-major
//! strides, or any caller-supplied permuted vector via
//! [`Array::from_parts`].
//!
//! Storage is held behind an [`Arc`] and shared with expression leaves, so
//! a source expression can legally refer to the same storage an assignment
//! is about to overwrite; the assignment engine detects that by comparing
//! [`StorageId`]s. Writes go through copy-on-write: mutating an array
//! whose storage is still referenced elsewhere detaches it first, leaving
//! every other referent on the pre-mutation storage.

use std::sync::Arc;

use crate::element::Element;
use crate::layout::{self, Order};
use crate::{ExprError, Result};

/// Identity of a backing store.
///
/// Two arrays (or expression leaves) alias exactly when their storage ids
/// are equal. This is an identity comparison of the shared allocation,
/// never a value comparison, and it changes whenever an array reallocates
/// (resize or copy-on-write detach).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageId(usize);

impl StorageId {
    #[inline]
    pub(crate) fn of<T>(storage: &Arc<Vec<T>>) -> Self {
        StorageId(Arc::as_ptr(storage) as usize)
    }
}

/// An owned multidimensional array with explicit strides.
///
/// Cloning is cheap: the clone shares the backing store until either side
/// writes.
#[derive(Debug, Clone)]
pub struct Array<T> {
    dims: Vec<usize>,
    strides: Vec<isize>,
    order: Order,
    data: Arc<Vec<T>>,
}

impl<T: Element> Array<T> {
    /// Create an array filled with one value, laid out in `order`.
    pub fn from_elem(dims: Vec<usize>, value: T, order: Order) -> Self {
        let strides = layout::strides_for(&dims, order);
        Self {
            data: Arc::new(vec![value; logical_len(&dims)]),
            dims,
            strides,
            order,
        }
    }

    /// Create a zero-filled array laid out in `order`.
    pub fn zeros(dims: Vec<usize>, order: Order) -> Self {
        Self::from_elem(dims, T::zero(), order)
    }

    /// Create an array by calling `f` for every multi-index, laid out in
    /// `order`.
    pub fn from_fn<F>(dims: Vec<usize>, order: Order, f: F) -> Self
    where
        F: Fn(&[usize]) -> T,
    {
        let mut out = Self::zeros(dims, order);
        let strides = out.strides.clone();
        let data = Arc::make_mut(&mut out.data);
        let strides_list = [strides.as_slice()];
        let walk: std::result::Result<(), std::convert::Infallible> =
            layout::for_each_index(&out.dims, &strides_list, |index, offsets| {
                data[offsets[0] as usize] = f(index);
                Ok(())
            });
        debug_assert!(walk.is_ok());
        out
    }

    /// Create an array from existing storage interpreted in `order`.
    ///
    /// # Errors
    /// [`ExprError::BoundsExceeded`] when `data` does not hold exactly one
    /// element per logical position.
    pub fn from_vec(dims: Vec<usize>, data: Vec<T>, order: Order) -> Result<Self> {
        let needed = logical_len(&dims);
        if data.len() != needed {
            return Err(ExprError::BoundsExceeded {
                needed,
                have: data.len(),
            });
        }
        let strides = layout::strides_for(&dims, order);
        Ok(Self {
            data: Arc::new(data),
            dims,
            strides,
            order,
        })
    }

    /// Create an array over existing storage with an arbitrary stride
    /// vector, for permuted or otherwise non-canonical layouts. The
    /// strides are preserved unchanged.
    ///
    /// # Errors
    /// [`ExprError::StrideLengthMismatch`] when `strides` and `dims`
    /// disagree in length; [`ExprError::BoundsExceeded`] when some valid
    /// multi-index would address storage outside `data`.
    pub fn from_parts(dims: Vec<usize>, strides: Vec<isize>, data: Vec<T>) -> Result<Self> {
        if strides.len() != dims.len() {
            return Err(ExprError::StrideLengthMismatch);
        }
        validate_bounds(data.len(), &dims, &strides)?;
        Ok(Self {
            data: Arc::new(data),
            dims,
            strides,
            order: Order::RowMajor,
        })
    }

    /// Shape of the array.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Stride for each dimension.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Order used when this array (re)allocates its storage.
    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of logical elements. A rank-0 array holds one element.
    #[inline]
    pub fn len(&self) -> usize {
        logical_len(&self.dims)
    }

    /// True if the array has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.contains(&0)
    }

    /// The raw backing store, in storage order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Identity of the backing store, for aliasing analysis.
    #[inline]
    pub fn storage_id(&self) -> StorageId {
        StorageId::of(&self.data)
    }

    /// Element at a multi-index.
    ///
    /// # Panics
    /// Panics if the index rank or any coordinate is out of bounds.
    pub fn get(&self, index: &[usize]) -> T {
        assert_eq!(index.len(), self.dims.len(), "index rank mismatch");
        for j in 0..index.len() {
            assert!(index[j] < self.dims[j], "index out of bounds");
        }
        self.data[layout::linear_offset(index, &self.strides) as usize]
    }

    /// Overwrite the element at a multi-index.
    ///
    /// Detaches from any shared storage first, so expressions already
    /// holding this array's storage keep reading the pre-write values.
    ///
    /// # Panics
    /// Panics if the index rank or any coordinate is out of bounds.
    pub fn set(&mut self, index: &[usize], value: T) {
        assert_eq!(index.len(), self.dims.len(), "index rank mismatch");
        for j in 0..index.len() {
            assert!(index[j] < self.dims[j], "index out of bounds");
        }
        let offset = layout::linear_offset(index, &self.strides) as usize;
        Arc::make_mut(&mut self.data)[offset] = value;
    }

    /// Logical contents in row-major order, regardless of physical layout.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        let strides_list = [self.strides.as_slice()];
        let walk: std::result::Result<(), std::convert::Infallible> =
            layout::for_each_index(&self.dims, &strides_list, |_, offsets| {
                out.push(self.data[offsets[0] as usize]);
                Ok(())
            });
        debug_assert!(walk.is_ok());
        out
    }

    /// Reallocate to a new shape with canonical strides in this array's
    /// order. Prior contents are discarded.
    pub fn resize(&mut self, dims: &[usize]) {
        self.dims = dims.to_vec();
        self.strides = layout::strides_for(dims, self.order);
        self.data = Arc::new(vec![T::zero(); logical_len(dims)]);
    }

    /// Shared handle to the backing store, for expression leaves.
    #[inline]
    pub(crate) fn storage(&self) -> &Arc<Vec<T>> {
        &self.data
    }

    /// Split borrow for the assignment engine: shape, strides, and
    /// writable storage. Detaches from shared storage.
    pub(crate) fn parts_mut(&mut self) -> (&[usize], &[isize], &mut [T]) {
        (
            &self.dims,
            &self.strides,
            Arc::make_mut(&mut self.data).as_mut_slice(),
        )
    }
}

/// Logical element count of a shape; a rank-0 shape holds one element.
#[inline]
fn logical_len(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Check that every valid multi-index stays inside the backing store.
fn validate_bounds(data_len: usize, dims: &[usize], strides: &[isize]) -> Result<()> {
    if dims.contains(&0) {
        // Empty array, no reachable offsets.
        return Ok(());
    }

    let mut min_offset = 0isize;
    let mut max_offset = 0isize;
    for j in 0..dims.len() {
        let last = (dims[j] - 1) as isize;
        if strides[j] >= 0 {
            max_offset += strides[j] * last;
        } else {
            min_offset += strides[j] * last;
        }
    }

    if min_offset < 0 || max_offset as usize >= data_len {
        return Err(ExprError::BoundsExceeded {
            needed: (max_offset - min_offset + 1) as usize,
            have: data_len,
        });
    }
    Ok(())
}

/// Equality of logical contents: same shape and the same value at every
/// multi-index. Physical layout is not observable.
impl<T: Element> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.dims != other.dims {
            return false;
        }
        let strides_list = [self.strides.as_slice(), other.strides.as_slice()];
        layout::for_each_index(&self.dims, &strides_list, |_, offsets| {
            if self.data[offsets[0] as usize] == other.data[offsets[1] as usize] {
                Ok(())
            } else {
                Err(())
            }
        })
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_layouts_agree_logically() {
        let row = Array::from_vec(vec![2, 3], vec![1, 2, 3, 4, 5, 6], Order::RowMajor).unwrap();
        let col = Array::from_vec(vec![2, 3], vec![1, 4, 2, 5, 3, 6], Order::ColumnMajor).unwrap();
        assert_eq!(row, col);
        assert_eq!(row.get(&[1, 1]), 5);
        assert_eq!(col.get(&[1, 1]), 5);
        assert_eq!(col.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_from_vec_wrong_len() {
        let err = Array::from_vec(vec![2, 3], vec![1, 2, 3], Order::RowMajor).unwrap_err();
        assert!(matches!(
            err,
            ExprError::BoundsExceeded { needed: 6, have: 3 }
        ));
    }

    #[test]
    fn test_from_parts_permuted_and_slack_storage() {
        // dims (2, 3) over 8 slots with a gap after each row.
        let a = Array::from_parts(vec![2, 3], vec![4, 1], vec![1, 2, 3, 0, 4, 5, 6, 0]).unwrap();
        assert_eq!(a.to_vec(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn test_from_parts_rejects_out_of_bounds() {
        // Highest reachable offset is 4 + 2 = 6, so 6 slots are too few.
        let err = Array::from_parts(vec![2, 3], vec![4, 1], vec![0; 6]).unwrap_err();
        assert!(matches!(err, ExprError::BoundsExceeded { .. }));
        let err = Array::from_parts(vec![2, 3], vec![4], vec![0; 8]).unwrap_err();
        assert!(matches!(err, ExprError::StrideLengthMismatch));
    }

    #[test]
    fn test_rank_zero() {
        let a = Array::from_elem(vec![], 42.0, Order::RowMajor);
        assert_eq!(a.rank(), 0);
        assert_eq!(a.len(), 1);
        assert_eq!(a.get(&[]), 42.0);
        assert_eq!(a.to_vec(), vec![42.0]);
    }

    #[test]
    fn test_from_fn_column_major_storage() {
        let a = Array::from_fn(vec![2, 2], Order::ColumnMajor, |idx| idx[0] * 10 + idx[1]);
        assert_eq!(a.get(&[1, 0]), 10);
        // Column-major storage order: (0,0), (1,0), (0,1), (1,1).
        assert_eq!(a.as_slice(), &[0, 10, 1, 11]);
    }

    #[test]
    fn test_resize_discards_and_reallocates() {
        let mut a = Array::from_elem(vec![2, 2], 7, Order::RowMajor);
        let before = a.storage_id();
        a.resize(&[3]);
        assert_eq!(a.dims(), &[3]);
        assert_eq!(a.to_vec(), vec![0, 0, 0]);
        assert_ne!(a.storage_id(), before);
    }

    #[test]
    fn test_clone_shares_until_write() {
        let mut a = Array::from_elem(vec![2], 1, Order::RowMajor);
        let b = a.clone();
        assert_eq!(a.storage_id(), b.storage_id());
        a.set(&[0], 5);
        assert_ne!(a.storage_id(), b.storage_id());
        assert_eq!(b.get(&[0]), 1);
    }
}
