//! Symbolic differentiation.
//!
//! A [`DiffContext`] builds derivative graphs with respect to one target parameter. Results
//! are memoized per node handle, so a node shared by many parents is differentiated once, and
//! asking twice for the derivative of the same node yields the *same* handle.
//!
//! Derivatives are assembled with the simplifying helpers [`DiffContext::add`],
//! [`DiffContext::sub`], [`DiffContext::mul`] and [`DiffContext::div`], which fold away the
//! trivial cases by comparing handles with the graph sentinels:
//!
//! ```text
//! 0 + b => b        a + 0 => a
//! a - 0 => a
//! 0 * b => 0        a * 0 => 0
//! 1 * b => b        a * 1 => a
//! a / 1 => a
//! ```
//!
//! Only the sentinels take part in these rules. A constant that merely *evaluates* to zero
//! is an ordinary node.
//!
//! # Examples
//!
//! ```
//! use symdiff_rs::diff::DiffContext;
//! use symdiff_rs::graph::Graph;
//!
//! let graph = Graph::<f64>::default();
//! let x = graph.mk_parameter(3.0);
//! let y = graph.mk_parameter(4.0);
//! let f = graph.mk_mul(x, y);
//!
//! let mut ctx = DiffContext::new(&graph, x);
//! let df = ctx.diff(f);
//! assert_eq!(graph.value(df), 4.0);
//! assert_eq!(ctx.diff(f), df);
//! ```

use log::debug;
use num_traits::Float;

use crate::cache::Cache;
use crate::graph::Graph;
use crate::reference::Ref;

pub struct DiffContext<'g, T> {
    graph: &'g Graph<T>,
    target: Ref,
    cache: Cache<Ref, Ref>,
    zero: Ref,
    one: Ref,
    two: Ref,
}

impl<'g, T> DiffContext<'g, T>
where
    T: Float,
{
    /// Create a context differentiating with respect to the parameter node `target`.
    pub fn new(graph: &'g Graph<T>, target: Ref) -> Self {
        Self::with_capacity(graph, target, 0)
    }

    /// Same as [`DiffContext::new`], with room for `capacity` memoized derivatives.
    pub fn with_capacity(graph: &'g Graph<T>, target: Ref, capacity: usize) -> Self {
        assert!(
            graph.is_parameter(target),
            "Differentiation target {} is not a parameter",
            target
        );

        Self {
            graph,
            target,
            cache: Cache::with_capacity(capacity),
            zero: graph.zero,
            one: graph.one,
            two: graph.two,
        }
    }

    pub fn graph(&self) -> &'g Graph<T> {
        self.graph
    }
    pub fn target(&self) -> Ref {
        self.target
    }
    pub fn zero(&self) -> Ref {
        self.zero
    }
    pub fn one(&self) -> Ref {
        self.one
    }
    pub fn two(&self) -> Ref {
        self.two
    }

    /// Number of memoized derivatives.
    pub fn len(&self) -> usize {
        self.cache.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
    pub fn cache(&self) -> &Cache<Ref, Ref> {
        &self.cache
    }

    /// Derivative of `node` with respect to the target parameter.
    pub fn diff(&mut self, node: Ref) -> Ref {
        if let Some(res) = self.cache.get(&node) {
            debug!("cache: diff(node = {}) -> {}", node, res);
            return res;
        }

        // Same traversal as `EvalContext::evaluate`: operands are differentiated first, from
        // an explicit work stack, and the root is differentiated last.
        let mut res = self.zero;
        let mut stack = vec![node];
        while let Some(&top) = stack.last() {
            if self.cache.peek(&top).is_some() {
                stack.pop();
                continue;
            }

            let current = self.graph.node(top);
            let pending = stack.len();
            for child in current.children().rev() {
                if self.cache.peek(&child).is_none() {
                    stack.push(child);
                }
            }
            if stack.len() > pending {
                continue;
            }

            stack.pop();
            res = current.differentiate(top, self);
            debug!("computed: diff(node = {}) -> {}", top, res);
            self.cache.insert(top, res);
        }
        res
    }

    /// `a + b`, folding zero operands.
    pub fn add(&mut self, a: Ref, b: Ref) -> Ref {
        if a == self.zero {
            return b;
        }
        if b == self.zero {
            return a;
        }
        self.graph.mk_add(a, b)
    }

    /// `a - b`, folding a zero subtrahend.
    pub fn sub(&mut self, a: Ref, b: Ref) -> Ref {
        if b == self.zero {
            return a;
        }
        self.graph.mk_sub(a, b)
    }

    /// `a * b`, folding zero and one operands.
    pub fn mul(&mut self, a: Ref, b: Ref) -> Ref {
        if a == self.zero || b == self.zero {
            return self.zero;
        }
        if a == self.one {
            return b;
        }
        if b == self.one {
            return a;
        }
        self.graph.mk_mul(a, b)
    }

    /// `a / b`, folding a unit divisor.
    pub fn div(&mut self, a: Ref, b: Ref) -> Ref {
        if b == self.one {
            return a;
        }
        self.graph.mk_div(a, b)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use test_log::test;

    use super::*;
    use crate::node::Node;

    /// Central finite-difference estimate of d(f)/d(p) at the current bindings.
    fn central_difference(graph: &mut Graph<f64>, f: Ref, p: Ref) -> f64 {
        let x = graph.parameter_value(p);
        let h = 1e-6 * x.abs().max(1.0);
        graph.bind(p, x + h);
        let hi = graph.value(f);
        graph.bind(p, x - h);
        let lo = graph.value(f);
        graph.bind(p, x);
        (hi - lo) / (2.0 * h)
    }

    fn check_against_finite_difference(graph: &mut Graph<f64>, f: Ref, p: Ref) {
        let df = DiffContext::new(graph, p).diff(f);
        let expected = central_difference(graph, f, p);
        assert_relative_eq!(graph.value(df), expected, max_relative = 1e-5, epsilon = 1e-8);
    }

    #[test]
    fn test_constant() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);
        let c = graph.mk_constant(7.0);

        let mut ctx = DiffContext::new(&graph, x);
        assert_eq!(ctx.diff(c), graph.zero);
        assert_eq!(graph.value(c), 7.0);
    }

    #[test]
    fn test_sentinels() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);

        let mut ctx = DiffContext::new(&graph, x);
        assert_eq!(ctx.diff(graph.zero), graph.zero);
        assert_eq!(ctx.diff(graph.one), graph.zero);
        assert_eq!(ctx.diff(graph.two), graph.zero);
    }

    #[test]
    fn test_parameter() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);
        let y = graph.mk_parameter(1.0);

        let mut ctx = DiffContext::new(&graph, x);
        assert_eq!(ctx.diff(x), graph.one);
        assert_eq!(ctx.diff(y), graph.zero);

        let mut ctx = DiffContext::new(&graph, y);
        assert_eq!(ctx.diff(x), graph.zero);
        assert_eq!(ctx.diff(y), graph.one);
    }

    #[test]
    fn test_memoized_identity() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(2.0);
        let y = graph.mk_parameter(3.0);
        let f = graph.mk_div(graph.mk_mul(x, y), graph.mk_exp(x));

        let mut ctx = DiffContext::new(&graph, x);
        let first = ctx.diff(f);
        let nodes = graph.num_nodes();
        let hits = ctx.cache().hits();
        let second = ctx.diff(f);
        assert_eq!(first, second);
        assert_eq!(graph.num_nodes(), nodes);
        assert_eq!(ctx.cache().hits(), hits + 1);
    }

    #[test]
    fn test_shared_child_differentiated_once() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(2.0);
        let s = graph.mk_exp(x);
        // s appears in three parents
        let a = graph.mk_mul(s, s);
        let b = graph.mk_add(s, a);

        let mut ctx = DiffContext::new(&graph, x);
        ctx.diff(b);
        // b, a, s, x: every distinct node is memoized exactly once
        assert_eq!(ctx.len(), 4);
        // Only the root lookup misses: operands are differentiated before their users,
        // whose rules then find them cached (s: x, a: s s, b: s a).
        assert_eq!(ctx.cache().misses(), 1);
        assert_eq!(ctx.cache().hits(), 5);
    }

    #[test]
    fn test_simplifications() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(2.0);
        let a = graph.mk_parameter(5.0);

        let mut ctx = DiffContext::new(&graph, x);
        let zero = graph.zero;
        let one = graph.one;

        assert_eq!(ctx.add(zero, a), a);
        assert_eq!(ctx.add(a, zero), a);
        assert_eq!(ctx.sub(a, zero), a);
        assert_eq!(ctx.mul(zero, a), zero);
        assert_eq!(ctx.mul(a, zero), zero);
        assert_eq!(ctx.mul(one, a), a);
        assert_eq!(ctx.mul(a, one), a);
        assert_eq!(ctx.div(a, one), a);

        // No rule for a zero minuend or a zero dividend.
        assert!(matches!(graph.node(ctx.sub(zero, a)), Node::Subtraction(..)));
        assert!(matches!(graph.node(ctx.div(zero, a)), Node::Division(..)));
    }

    #[test]
    fn test_simplification_uses_identity_not_value() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(2.0);
        let zero_valued = graph.mk_constant(0.0);
        let one_valued = graph.mk_constant(1.0);

        let mut ctx = DiffContext::new(&graph, x);
        assert!(matches!(graph.node(ctx.add(zero_valued, x)), Node::Addition(..)));
        assert!(matches!(graph.node(ctx.mul(one_valued, x)), Node::Multiply(..)));
    }

    #[test]
    fn test_sum_of_independent_terms() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(2.0);
        let y = graph.mk_parameter(3.0);
        let f = graph.mk_add(x, y);

        let mut ctx = DiffContext::new(&graph, x);
        // 1 + 0 => 1
        assert_eq!(ctx.diff(f), graph.one);
        let g = graph.mk_sub(y, x);
        let dg = ctx.diff(g);
        assert_eq!(graph.value(dg), -1.0);
    }

    #[test]
    fn test_product_rule() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.3);
        let y = graph.mk_parameter(-0.7);
        let f = graph.mk_mul(graph.mk_mul(x, y), graph.mk_add(x, graph.two));

        check_against_finite_difference(&mut graph, f, x);
        check_against_finite_difference(&mut graph, f, y);
    }

    #[test]
    fn test_quotient_rule() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.3);
        let y = graph.mk_parameter(2.1);
        let f = graph.mk_div(graph.mk_sub(x, y), graph.mk_mul(x, y));

        check_against_finite_difference(&mut graph, f, x);
        check_against_finite_difference(&mut graph, f, y);
    }

    #[test]
    fn test_power_rule() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.7);
        let y = graph.mk_parameter(0.6);
        let f = graph.mk_pow(x, y);

        check_against_finite_difference(&mut graph, f, x);
        check_against_finite_difference(&mut graph, f, y);
    }

    #[test]
    fn test_power_with_constant_exponent() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.5);
        let three = graph.mk_constant(3.0);
        let f = graph.mk_pow(x, three);

        // u^v * (0 * ln(u) + v * 1 / u) => u^v * (v / u)
        let df = DiffContext::new(&graph, x).diff(f);
        assert!(matches!(graph.node(df), Node::Multiply(this, _) if this == f));
        assert_relative_eq!(graph.value(df), 3.0 * 1.5 * 1.5, max_relative = 1e-12);

        graph.bind(x, -1.5);
        assert_relative_eq!(graph.value(df), 3.0 * 1.5 * 1.5, max_relative = 1e-12);
    }

    #[test]
    fn test_power_with_variable_exponent_needs_positive_base() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(-1.5);
        let y = graph.mk_parameter(2.0);
        let f = graph.mk_pow(x, y);

        let df = DiffContext::new(&graph, y).diff(f);
        assert!(graph.value(df).is_nan());

        graph.bind(x, 1.5);
        assert_relative_eq!(graph.value(df), 1.5_f64.powi(2) * 1.5_f64.ln(), max_relative = 1e-12);
    }

    #[test]
    fn test_square_rule() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(0.8);
        let f = graph.mk_square(graph.mk_mul(x, graph.mk_constant(3.0)));

        let df = DiffContext::new(&graph, x).diff(f);
        // d/dx (3x)^2 = 18x
        assert_relative_eq!(graph.value(df), 18.0 * 0.8, max_relative = 1e-12);
        check_against_finite_difference(&mut graph, f, x);
    }

    #[test]
    fn test_square_of_parameter_is_two_times_parameter() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(0.8);
        let f = graph.mk_square(x);

        let df = DiffContext::new(&graph, x).diff(f);
        // mul(mul(2, x), 1) => mul(2, x)
        assert_eq!(graph.node(df), Node::Multiply(graph.two, x));
    }

    #[test]
    fn test_log_and_exp_rules() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(0.9);
        let f = graph.mk_log(graph.mk_add(graph.mk_exp(x), graph.mk_square(x)));

        check_against_finite_difference(&mut graph, f, x);

        let e = graph.mk_exp(x);
        let de = DiffContext::new(&graph, x).diff(e);
        // exp(x) * 1 => exp(x) itself
        assert_eq!(de, e);
    }

    #[test]
    fn test_second_derivative() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.1);
        let f = graph.mk_mul(graph.mk_exp(x), graph.mk_log(x));

        let df = DiffContext::new(&graph, x).diff(f);
        let ddf = DiffContext::new(&graph, x).diff(df);
        let expected = central_difference(&mut graph, df, x);
        assert_relative_eq!(graph.value(ddf), expected, max_relative = 1e-5);
    }

    #[test]
    fn test_deep_chain() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(0.5);

        // f = x + x^2 + ... one level per iteration
        let mut f = x;
        for _ in 0..100_000 {
            f = graph.mk_add(f, graph.mk_square(x));
        }

        let mut ctx = DiffContext::new(&graph, x);
        let df = ctx.diff(f);
        // x, plus one addition and one square per level
        assert_eq!(ctx.len(), 1 + 2 * 100_000);
        // 1 + 100000 * 2x
        assert_relative_eq!(graph.value(df), 100_001.0, max_relative = 1e-12);
    }

    #[test]
    fn test_f32_graph() {
        let graph = Graph::<f32>::default();
        let x = graph.mk_parameter(2.0);
        let f = graph.mk_mul(graph.mk_square(x), x);

        let df = DiffContext::new(&graph, x).diff(f);
        assert_relative_eq!(graph.value(df), 12.0_f32, max_relative = 1e-6);
    }

    #[test]
    #[should_panic(expected = "is not a parameter")]
    fn test_target_must_be_parameter() {
        let graph = Graph::<f64>::default();
        let c = graph.mk_constant(1.0);
        DiffContext::new(&graph, c);
    }
}
