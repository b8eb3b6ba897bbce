//! Element type bounds for expression evaluation.

use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Sub};

use num_complex::Complex;
use num_traits::{One, Zero};

/// Shared trait bounds for element types usable in expressions and
/// assignments.
///
/// The four arithmetic operators use the element type's own semantics with
/// no implicit widening. Division is the one operator that can fail, and
/// only the element type knows when: integer types have no quotient for a
/// zero divisor, while IEEE float and complex types produce `inf`/`NaN`
/// values instead.
pub trait Element:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    /// Divide, returning `None` where the element type has no defined
    /// quotient (zero divisor, or an integer quotient the type cannot
    /// represent).
    fn checked_div(self, rhs: Self) -> Option<Self>;
}

macro_rules! impl_element_int {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn checked_div(self, rhs: Self) -> Option<Self> {
                    <$t>::checked_div(self, rhs)
                }
            }
        )*
    };
}

macro_rules! impl_element_float {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn checked_div(self, rhs: Self) -> Option<Self> {
                    Some(self / rhs)
                }
            }
        )*
    };
}

macro_rules! impl_element_complex {
    ($($t:ty),*) => {
        $(
            impl Element for Complex<$t> {
                #[inline]
                fn checked_div(self, rhs: Self) -> Option<Self> {
                    Some(self / rhs)
                }
            }
        )*
    };
}

impl_element_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_element_float!(f32, f64);
impl_element_complex!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_element<T: Element>() {}

    #[test]
    fn test_standard_types() {
        assert_element::<f32>();
        assert_element::<f64>();
        assert_element::<i32>();
        assert_element::<u64>();
        assert_element::<Complex<f64>>();
    }

    #[test]
    fn test_checked_div_int() {
        assert_eq!(Element::checked_div(7i32, 2), Some(3));
        assert_eq!(Element::checked_div(7i32, 0), None);
        assert_eq!(Element::checked_div(i32::MIN, -1), None);
    }

    #[test]
    fn test_checked_div_float_is_total() {
        assert_eq!(Element::checked_div(1.0f64, 0.0), Some(f64::INFINITY));
        let nan = Element::checked_div(0.0f64, 0.0).unwrap();
        assert!(nan.is_nan());
    }
}
