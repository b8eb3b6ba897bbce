//! Arithmetic operator overloads building expression nodes.
//!
//! Every combination of array reference and expression composes: the
//! overloads convert array operands into [`Source`] leaves and wrap the
//! resulting node in [`Expr`]. Nothing here evaluates.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::array::Array;
use crate::element::Element;
use crate::expr::{BinOp, Binary, Expr, Expression, Source, UnOp, Unary};

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<'a, 'b, T: Element> $trait<&'b Array<T>> for &'a Array<T> {
            type Output = Expr<Binary<Source<T>, Source<T>>>;

            fn $method(self, rhs: &'b Array<T>) -> Self::Output {
                Expr::new(Binary::new(
                    self.expr().into_inner(),
                    rhs.expr().into_inner(),
                    $op,
                ))
            }
        }

        impl<'a, T: Element, R> $trait<Expr<R>> for &'a Array<T>
        where
            R: Expression<Elem = T>,
        {
            type Output = Expr<Binary<Source<T>, R>>;

            fn $method(self, rhs: Expr<R>) -> Self::Output {
                Expr::new(Binary::new(self.expr().into_inner(), rhs.into_inner(), $op))
            }
        }

        impl<'b, T: Element, L> $trait<&'b Array<T>> for Expr<L>
        where
            L: Expression<Elem = T>,
        {
            type Output = Expr<Binary<L, Source<T>>>;

            fn $method(self, rhs: &'b Array<T>) -> Self::Output {
                Expr::new(Binary::new(self.into_inner(), rhs.expr().into_inner(), $op))
            }
        }

        impl<L, R> $trait<Expr<R>> for Expr<L>
        where
            L: Expression,
            R: Expression<Elem = L::Elem>,
        {
            type Output = Expr<Binary<L, R>>;

            fn $method(self, rhs: Expr<R>) -> Self::Output {
                Expr::new(Binary::new(self.into_inner(), rhs.into_inner(), $op))
            }
        }
    };
}

impl_binary_op!(Add, add, BinOp::Add);
impl_binary_op!(Sub, sub, BinOp::Sub);
impl_binary_op!(Mul, mul, BinOp::Mul);
impl_binary_op!(Div, div, BinOp::Div);

impl<'a, T> Neg for &'a Array<T>
where
    T: Element + Neg<Output = T>,
{
    type Output = Expr<Unary<Source<T>>>;

    fn neg(self) -> Self::Output {
        Expr::new(Unary::new(self.expr().into_inner(), UnOp::Neg))
    }
}

impl<E> Neg for Expr<E>
where
    E: Expression,
    E::Elem: Neg<Output = E::Elem>,
{
    type Output = Expr<Unary<E>>;

    fn neg(self) -> Self::Output {
        Expr::new(Unary::new(self.into_inner(), UnOp::Neg))
    }
}

#[cfg(test)]
mod tests {
    use crate::{scalar, Array, Expression, Order};

    #[test]
    fn test_every_operand_mix_composes() {
        let a = Array::from_vec(vec![2], vec![1.0, 2.0], Order::RowMajor).unwrap();
        let b = Array::from_vec(vec![2], vec![10.0, 20.0], Order::RowMajor).unwrap();

        let e = ((&a + &b) * scalar(2.0) - &a) / (scalar(1.0) + scalar(1.0));
        assert_eq!(e.shape().unwrap(), vec![2]);
        assert_eq!(e.at(&[0]).unwrap(), (11.0 * 2.0 - 1.0) / 2.0);
        assert_eq!(e.at(&[1]).unwrap(), (22.0 * 2.0 - 2.0) / 2.0);
    }

    #[test]
    fn test_double_negation() {
        let a = Array::from_vec(vec![2], vec![1.0, -2.0], Order::RowMajor).unwrap();
        let e = -(-(&a));
        assert_eq!(e.at(&[1]).unwrap(), -2.0);
    }
}
