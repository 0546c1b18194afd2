//! The expression graph manager.
//!
//! All nodes live in a single arena owned by [`Graph`] and are addressed through [`Ref`]
//! handles. Nodes are only ever appended, and a node may only reference nodes that already
//! exist, so every graph is a DAG and a handle stays valid for the lifetime of the graph.
//!
//! Every graph starts with three sentinel constants, [`Graph::zero`], [`Graph::one`] and
//! [`Graph::two`], allocated before anything else. Differentiation uses them as identity
//! markers: a derivative is known to be zero iff its handle *is* `graph.zero`.

use std::cell::RefCell;
use std::fmt::Debug;

use log::debug;
use num_traits::Float;

use crate::node::Node;
use crate::reference::Ref;
use crate::table::Table;
use crate::types::ParamId;

type Storage<T> = Table<Node<T>>;

pub struct Graph<T = f64> {
    storage: RefCell<Storage<T>>,
    params: RefCell<Vec<T>>,
    pub zero: Ref,
    pub one: Ref,
    pub two: Ref,
}

impl<T> Graph<T>
where
    T: Float,
{
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let mut storage = Storage::new(storage_bits);

        // Allocate the sentinels:
        let zero = storage.add(Node::Constant(T::zero()));
        let one = storage.add(Node::Constant(T::one()));
        let two = storage.add(Node::Constant(T::one() + T::one()));
        assert_eq!((zero, one, two), (1, 2, 3)); // Make sure the sentinels come first.

        Self {
            storage: RefCell::new(storage),
            params: RefCell::new(Vec::new()),
            zero: Ref::new(zero as u32),
            one: Ref::new(one as u32),
            two: Ref::new(two as u32),
        }
    }
}

impl<T> Default for Graph<T>
where
    T: Float,
{
    fn default() -> Self {
        Graph::new(16)
    }
}

impl<T> Debug for Graph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Graph")
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .field("parameters", &self.params.borrow().len())
            .finish()
    }
}

impl<T> Graph<T>
where
    T: Float,
{
    /// Get a copy of the node behind the handle.
    pub fn node(&self, node: Ref) -> Node<T> {
        self.storage.borrow()[node.index()]
    }

    /// Number of nodes in the graph, sentinels included.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn contains(&self, node: Ref) -> bool {
        self.storage.borrow().contains(node.index())
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_two(&self, node: Ref) -> bool {
        node == self.two
    }
    pub fn is_sentinel(&self, node: Ref) -> bool {
        self.is_zero(node) || self.is_one(node) || self.is_two(node)
    }

    fn mk_node(&self, node: Node<T>) -> Ref {
        for child in node.children() {
            assert!(
                self.contains(child),
                "Operand {} does not belong to this graph",
                child
            );
        }
        let i = self.storage.borrow_mut().add(node);
        Ref::new(i as u32)
    }

    /// Create a new constant leaf.
    ///
    /// The result is never one of the sentinels, even if `value` is 0, 1 or 2.
    pub fn mk_constant(&self, value: T) -> Ref {
        let res = self.mk_node(Node::Constant(value));
        debug!("mk_constant -> {}", res);
        res
    }

    /// Create a new parameter leaf bound to `value`.
    pub fn mk_parameter(&self, value: T) -> Ref {
        let id = {
            let mut params = self.params.borrow_mut();
            params.push(value);
            ParamId::new((params.len() - 1) as u32)
        };
        let res = self.mk_node(Node::Parameter(id));
        debug!("mk_parameter({}) -> {}", id, res);
        res
    }

    pub fn mk_add(&self, u: Ref, v: Ref) -> Ref {
        let res = self.mk_node(Node::Addition(u, v));
        debug!("mk_add(u = {}, v = {}) -> {}", u, v, res);
        res
    }

    pub fn mk_sub(&self, u: Ref, v: Ref) -> Ref {
        let res = self.mk_node(Node::Subtraction(u, v));
        debug!("mk_sub(u = {}, v = {}) -> {}", u, v, res);
        res
    }

    pub fn mk_mul(&self, u: Ref, v: Ref) -> Ref {
        let res = self.mk_node(Node::Multiply(u, v));
        debug!("mk_mul(u = {}, v = {}) -> {}", u, v, res);
        res
    }

    pub fn mk_div(&self, u: Ref, v: Ref) -> Ref {
        let res = self.mk_node(Node::Division(u, v));
        debug!("mk_div(u = {}, v = {}) -> {}", u, v, res);
        res
    }

    pub fn mk_pow(&self, u: Ref, v: Ref) -> Ref {
        let res = self.mk_node(Node::Power(u, v));
        debug!("mk_pow(u = {}, v = {}) -> {}", u, v, res);
        res
    }

    pub fn mk_square(&self, u: Ref) -> Ref {
        let res = self.mk_node(Node::Square(u));
        debug!("mk_square(u = {}) -> {}", u, res);
        res
    }

    pub fn mk_log(&self, u: Ref) -> Ref {
        let res = self.mk_node(Node::Log(u));
        debug!("mk_log(u = {}) -> {}", u, res);
        res
    }

    pub fn mk_exp(&self, u: Ref) -> Ref {
        let res = self.mk_node(Node::Exp(u));
        debug!("mk_exp(u = {}) -> {}", u, res);
        res
    }

    pub fn num_parameters(&self) -> usize {
        self.params.borrow().len()
    }

    /// Current value of the parameter slot.
    pub fn parameter(&self, id: ParamId) -> T {
        self.params.borrow()[id.index()]
    }

    pub fn is_parameter(&self, node: Ref) -> bool {
        self.param_id(node).is_some()
    }

    pub fn param_id(&self, node: Ref) -> Option<ParamId> {
        match self.node(node) {
            Node::Parameter(id) => Some(id),
            _ => None,
        }
    }

    fn expect_parameter(&self, node: Ref) -> ParamId {
        match self.param_id(node) {
            Some(id) => id,
            None => panic!("Node {} is not a parameter", node),
        }
    }

    /// Current value bound to the parameter node.
    pub fn parameter_value(&self, node: Ref) -> T {
        self.parameter(self.expect_parameter(node))
    }

    /// Rebind the parameter node to a new value.
    ///
    /// Requires exclusive access, so no [`EvalContext`][crate::eval::EvalContext] created
    /// before the rebind can be used after it.
    pub fn bind(&mut self, node: Ref, value: T) {
        let id = self.expect_parameter(node);
        debug!("bind(node = {}, param = {})", node, id);
        self.params.get_mut()[id.index()] = value;
    }

    /// Value of the node by direct evaluation, without memoization.
    ///
    /// Shared subexpressions are recomputed for every path reaching them; use an
    /// [`EvalContext`][crate::eval::EvalContext] for large graphs. The traversal keeps its
    /// own work stack, so the depth of the graph is not limited by the thread stack.
    pub fn value(&self, node: Ref) -> T {
        // (node, operands already pushed), and the values of finished operands
        let mut stack = vec![(node, false)];
        let mut values: Vec<T> = Vec::new();

        while let Some((node, expanded)) = stack.pop() {
            let current = self.node(node);
            if expanded {
                let start = values.len() - current.children().count();
                let value = current.apply(|p| self.parameter(p), &values[start..]);
                values.truncate(start);
                values.push(value);
            } else {
                stack.push((node, true));
                stack.extend(current.children().rev().map(|child| (child, false)));
            }
        }

        values[0]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn test_sentinels() {
        let graph = Graph::<f64>::default();

        assert_eq!(graph.value(graph.zero), 0.0);
        assert_eq!(graph.value(graph.one), 1.0);
        assert_eq!(graph.value(graph.two), 2.0);

        assert!(graph.is_zero(graph.zero));
        assert!(!graph.is_zero(graph.one));
        assert!(graph.is_sentinel(graph.two));
        assert_eq!(graph.num_nodes(), 3);
    }

    #[test]
    fn test_constant_is_not_sentinel() {
        let graph = Graph::<f64>::default();

        let c = graph.mk_constant(0.0);
        assert_ne!(c, graph.zero);
        assert!(!graph.is_sentinel(c));
        assert_eq!(graph.value(c), 0.0);
    }

    #[test]
    fn test_separate_nodes_are_distinct() {
        let graph = Graph::<f64>::default();

        let x = graph.mk_parameter(1.5);
        let a = graph.mk_add(x, graph.one);
        let b = graph.mk_add(x, graph.one);
        assert_ne!(a, b);
        assert_eq!(graph.node(a), graph.node(b));
    }

    #[test]
    fn test_arithmetic_values() {
        let graph = Graph::<f64>::default();

        let x = graph.mk_parameter(3.0);
        let y = graph.mk_constant(4.0);

        assert_eq!(graph.value(graph.mk_add(x, y)), 7.0);
        assert_eq!(graph.value(graph.mk_sub(x, y)), -1.0);
        assert_eq!(graph.value(graph.mk_mul(x, y)), 12.0);
        assert_eq!(graph.value(graph.mk_div(x, y)), 0.75);
        assert_relative_eq!(graph.value(graph.mk_pow(x, y)), 81.0);
        assert_eq!(graph.value(graph.mk_square(x)), 9.0);
        assert_relative_eq!(graph.value(graph.mk_log(graph.mk_exp(x))), 3.0);
        assert_relative_eq!(graph.value(graph.mk_exp(graph.one)), std::f64::consts::E);
    }

    #[test]
    fn test_bind() {
        let mut graph = Graph::<f64>::default();

        let x = graph.mk_parameter(2.0);
        let f = graph.mk_mul(x, x);
        assert_eq!(graph.value(f), 4.0);
        assert_eq!(graph.parameter_value(x), 2.0);

        graph.bind(x, 5.0);
        assert_eq!(graph.value(f), 25.0);
        assert_eq!(graph.parameter_value(x), 5.0);
    }

    #[test]
    fn test_parameter_table() {
        let graph = Graph::<f32>::default();

        let x = graph.mk_parameter(1.0);
        let y = graph.mk_parameter(2.0);
        assert_eq!(graph.num_parameters(), 2);
        assert_eq!(graph.param_id(x), Some(ParamId::new(0)));
        assert_eq!(graph.param_id(y), Some(ParamId::new(1)));
        assert_eq!(graph.param_id(graph.one), None);
        assert!(graph.is_parameter(y));
    }

    #[test]
    fn test_division_by_zero_is_not_trapped() {
        let graph = Graph::<f64>::default();

        let f = graph.mk_div(graph.one, graph.zero);
        assert!(graph.value(f).is_infinite());
        let g = graph.mk_log(graph.mk_constant(-1.0));
        assert!(graph.value(g).is_nan());
    }

    #[test]
    #[should_panic(expected = "is not a parameter")]
    fn test_bind_non_parameter() {
        let mut graph = Graph::<f64>::default();
        let one = graph.one;
        graph.bind(one, 3.0);
    }

    #[test]
    #[should_panic(expected = "does not belong to this graph")]
    fn test_foreign_operand() {
        let graph = Graph::<f64>::default();
        graph.mk_square(Ref::new(100));
    }
}
