//! Operator sugar for composing graphs.
//!
//! `x + y`, `x - y`, `x * y` and `x / y` on handles produce lightweight op values that are
//! materialized by [`Graph::build`]. Op values compose, so whole expressions such as
//! `x * y + z` can be written at once; operands are built left to right. The resulting nodes
//! are never simplified.
//!
//! ```
//! use symdiff_rs::graph::Graph;
//!
//! let graph = Graph::<f64>::default();
//! let x = graph.mk_parameter(3.0);
//! let y = graph.mk_parameter(2.0);
//! let f = graph.build(x * y);
//! assert_eq!(graph.value(f), 6.0);
//!
//! let g = graph.build((x - y) / (x + y) + f);
//! assert_eq!(graph.value(g), 6.2);
//! ```

use std::ops::{Add, Div, Mul, Sub};

use num_traits::Float;

use crate::graph::Graph;
use crate::reference::Ref;

pub struct AddOp<L, R> {
    u: L,
    v: R,
}

pub struct SubOp<L, R> {
    u: L,
    v: R,
}

pub struct MulOp<L, R> {
    u: L,
    v: R,
}

pub struct DivOp<L, R> {
    u: L,
    v: R,
}

/// Implements `+ - * /` with any buildable right-hand side for the given left-hand side.
macro_rules! impl_operators {
    ($lhs:ty $(, $g:ident)*) => {
        impl<$($g,)* Rhs: Build> Add<Rhs> for $lhs {
            type Output = AddOp<Self, Rhs>;

            fn add(self, rhs: Rhs) -> Self::Output {
                AddOp { u: self, v: rhs }
            }
        }

        impl<$($g,)* Rhs: Build> Sub<Rhs> for $lhs {
            type Output = SubOp<Self, Rhs>;

            fn sub(self, rhs: Rhs) -> Self::Output {
                SubOp { u: self, v: rhs }
            }
        }

        impl<$($g,)* Rhs: Build> Mul<Rhs> for $lhs {
            type Output = MulOp<Self, Rhs>;

            fn mul(self, rhs: Rhs) -> Self::Output {
                MulOp { u: self, v: rhs }
            }
        }

        impl<$($g,)* Rhs: Build> Div<Rhs> for $lhs {
            type Output = DivOp<Self, Rhs>;

            fn div(self, rhs: Rhs) -> Self::Output {
                DivOp { u: self, v: rhs }
            }
        }
    };
}

impl_operators!(Ref);
impl_operators!(AddOp<L, R>, L, R);
impl_operators!(SubOp<L, R>, L, R);
impl_operators!(MulOp<L, R>, L, R);
impl_operators!(DivOp<L, R>, L, R);

pub trait Build {
    fn build<T: Float>(&self, graph: &Graph<T>) -> Ref;
}

impl<T> Graph<T>
where
    T: Float,
{
    pub fn build(&self, value: impl Build) -> Ref {
        value.build(self)
    }
}

impl Build for Ref {
    fn build<T: Float>(&self, _graph: &Graph<T>) -> Ref {
        *self
    }
}

impl<L: Build, R: Build> Build for AddOp<L, R> {
    fn build<T: Float>(&self, graph: &Graph<T>) -> Ref {
        let u = self.u.build(graph);
        let v = self.v.build(graph);
        graph.mk_add(u, v)
    }
}

impl<L: Build, R: Build> Build for SubOp<L, R> {
    fn build<T: Float>(&self, graph: &Graph<T>) -> Ref {
        let u = self.u.build(graph);
        let v = self.v.build(graph);
        graph.mk_sub(u, v)
    }
}

impl<L: Build, R: Build> Build for MulOp<L, R> {
    fn build<T: Float>(&self, graph: &Graph<T>) -> Ref {
        let u = self.u.build(graph);
        let v = self.v.build(graph);
        graph.mk_mul(u, v)
    }
}

impl<L: Build, R: Build> Build for DivOp<L, R> {
    fn build<T: Float>(&self, graph: &Graph<T>) -> Ref {
        let u = self.u.build(graph);
        let v = self.v.build(graph);
        graph.mk_div(u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::node::Node;

    #[test]
    fn test_build_ref() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);
        assert_eq!(graph.build(x), x);
    }

    #[test]
    fn test_build_add() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);
        let y = graph.mk_parameter(2.0);
        let f = graph.build(x + y);
        assert_eq!(graph.node(f), Node::Addition(x, y));
        assert_eq!(graph.value(f), 3.0);
    }

    #[test]
    fn test_build_sub() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);
        let y = graph.mk_parameter(2.0);
        let f = graph.build(x - y);
        assert_eq!(graph.node(f), Node::Subtraction(x, y));
    }

    #[test]
    fn test_build_mul_is_not_simplified() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(5.0);
        let f = graph.build(graph.one * x);
        assert_eq!(graph.node(f), Node::Multiply(graph.one, x));
        assert_ne!(f, x);
    }

    #[test]
    fn test_build_div() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);
        let f = graph.build(x / graph.two);
        assert_eq!(graph.node(f), Node::Division(x, graph.two));
        assert_eq!(graph.value(f), 0.5);
    }

    #[test]
    fn test_build_nested() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(2.0);
        let y = graph.mk_parameter(3.0);
        let z = graph.mk_parameter(4.0);

        let f = graph.build(x * y + z);
        let Node::Addition(product, rhs) = graph.node(f) else {
            panic!("expected an addition, got {:?}", graph.node(f));
        };
        assert_eq!(graph.node(product), Node::Multiply(x, y));
        assert_eq!(rhs, z);
        assert_eq!(graph.value(f), 10.0);

        // ops on both sides
        let g = graph.build((x - y) / (z + x));
        assert_eq!(graph.value(g), -1.0 / 6.0);
        // right-hand side op on a plain handle
        let h = graph.build(z - x * y);
        assert_eq!(graph.value(h), -2.0);
    }
}
