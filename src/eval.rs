//! Memoized numeric evaluation.
//!
//! An [`EvalContext`] computes node values for one snapshot of parameter bindings. Each
//! node is evaluated at most once per context, however many parents share it. The context
//! borrows the graph, and [`Graph::bind`] needs exclusive access, so a context can never
//! observe a rebind: create a fresh one for every evaluation round.
//!
//! Instrumentation:
//!
//! - [`call_count`][EvalContext::call_count]: every call to [`evaluate`][EvalContext::evaluate],
//!   including the recursive ones for operands,
//! - [`evaluate_count`][EvalContext::evaluate_count]: calls that actually computed a value,
//! - [`cache_hit_count`][EvalContext::cache_hit_count]: the difference of the two.

use log::trace;
use num_traits::Float;

use crate::cache::Cache;
use crate::graph::Graph;
use crate::reference::Ref;

pub struct EvalContext<'g, T> {
    graph: &'g Graph<T>,
    cache: Cache<Ref, T>,
    calls: usize,
    evaluations: usize,
}

impl<'g, T> EvalContext<'g, T>
where
    T: Float,
{
    pub fn new(graph: &'g Graph<T>) -> Self {
        Self::with_capacity(graph, 0)
    }

    /// Same as [`EvalContext::new`], with room for `capacity` memoized values.
    pub fn with_capacity(graph: &'g Graph<T>, capacity: usize) -> Self {
        Self {
            graph,
            cache: Cache::with_capacity(capacity),
            calls: 0,
            evaluations: 0,
        }
    }

    pub fn graph(&self) -> &'g Graph<T> {
        self.graph
    }

    pub fn call_count(&self) -> usize {
        self.calls
    }
    pub fn evaluate_count(&self) -> usize {
        self.evaluations
    }
    pub fn cache_hit_count(&self) -> usize {
        self.calls - self.evaluations
    }

    /// Value of `node` under the bindings current when the context was created.
    pub fn evaluate(&mut self, node: Ref) -> T {
        self.calls += 1;

        if let Some(res) = self.cache.get(&node) {
            trace!("cache: evaluate(node = {})", node);
            return res;
        }

        // Operands are computed before their users from an explicit work stack, so every
        // operand lookup made by `Node::evaluate` is a cache hit and the depth of the graph
        // never reaches the thread stack. The root sits at the bottom and is computed last.
        let mut res = T::zero();
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
            res = current.evaluate(self);
            self.evaluations += 1;
            trace!("computed: evaluate(node = {})", top);
            self.cache.insert(top, res);
        }
        res
    }
}
