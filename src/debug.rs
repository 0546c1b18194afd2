//! Debug utilities for inspecting expression graphs.
//!
//! This module provides helpers for exploring graph structure: reachable nodes, sharing
//! statistics and a human-readable infix rendering. These are primarily useful in tests,
//! log output and during development.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Write};

use num_bigint::BigUint;
use num_traits::Float;

use crate::graph::Graph;
use crate::node::Node;
use crate::reference::Ref;
use crate::types::ParamId;

/// Detailed information about a single graph node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// The reference to this node
    pub node_ref: Ref,
    /// Node kind, e.g. "Multiply"
    pub kind: &'static str,
    /// Operands, left to right
    pub children: Vec<Ref>,
    /// Parameter slot (None unless this is a parameter)
    pub param: Option<ParamId>,
    /// Is this one of the 0/1/2 sentinels
    pub is_sentinel: bool,
}

impl std::fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.node_ref, self.kind)?;
        if let Some(p) = self.param {
            write!(f, "({})", p)?;
        } else if !self.children.is_empty() {
            let children: Vec<String> = self.children.iter().map(|c| c.to_string()).collect();
            write!(f, "({})", children.join(", "))?;
        }
        if self.is_sentinel {
            write!(f, " [sentinel]")?;
        }
        Ok(())
    }
}

/// All nodes reachable from a root, operands before their users.
#[derive(Debug, Clone)]
pub struct ExprTree {
    pub root: Ref,
    pub nodes: Vec<NodeInfo>,
}

impl std::fmt::Display for ExprTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Expression (root = {}):", self.root)?;
        for node in &self.nodes {
            writeln!(f, "  {}", node)?;
        }
        Ok(())
    }
}

impl<T> Graph<T>
where
    T: Float,
{
    /// Get detailed information about a single node.
    pub fn node_info(&self, node_ref: Ref) -> NodeInfo {
        let node = self.node(node_ref);
        NodeInfo {
            node_ref,
            kind: node.name(),
            children: node.children().collect(),
            param: self.param_id(node_ref),
            is_sentinel: self.is_sentinel(node_ref),
        }
    }

    /// Distinct nodes reachable from `roots`, each listed once, operands before users.
    pub fn descendants(&self, roots: impl IntoIterator<Item = Ref>) -> Vec<Ref> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        // (node, operands already pushed)
        let mut stack: Vec<(Ref, bool)> = roots.into_iter().map(|r| (r, false)).collect();
        stack.reverse();

        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.push((node, true));
            let children: Vec<Ref> = self.node(node).children().collect();
            for &child in children.iter().rev() {
                if !visited.contains(&child) {
                    stack.push((child, false));
                }
            }
        }

        order
    }

    /// Number of distinct nodes reachable from `node`, including itself.
    pub fn size(&self, node: Ref) -> usize {
        self.descendants([node]).len()
    }

    /// Number of nodes the expression would have if every shared operand were duplicated.
    ///
    /// Grows exponentially with depth for graphs that reuse subexpressions, so the result
    /// is arbitrary-precision.
    pub fn tree_size(&self, node: Ref) -> BigUint {
        let mut sizes: HashMap<Ref, BigUint> = HashMap::new();

        // Operands come before their users, so their sizes are always known.
        for current in self.descendants([node]) {
            let mut count = BigUint::from(1u32);
            for child in self.node(current).children() {
                count += &sizes[&child];
            }
            sizes.insert(current, count);
        }

        sizes.remove(&node).unwrap_or_default()
    }

    /// Get a listing of all nodes reachable from `root`.
    pub fn debug_tree(&self, root: Ref) -> ExprTree {
        let nodes = self
            .descendants([root])
            .into_iter()
            .map(|node| self.node_info(node))
            .collect();
        ExprTree { root, nodes }
    }

    /// Print a compact listing of the graph below `root`.
    pub fn debug_string(&self, root: Ref) -> String {
        let mut result = String::new();
        let tree = self.debug_tree(root);

        writeln!(&mut result, "Expression {} (size={}):", root, tree.nodes.len()).unwrap();
        for node in &tree.nodes {
            writeln!(&mut result, "  {}", node).unwrap();
        }
        result
    }
}

impl<T> Graph<T>
where
    T: Float + Display,
{
    /// Render the expression in infix notation, e.g. `((p0 * p1) + exp(p0))`.
    ///
    /// Shared operands are printed once per occurrence, so the output is as long as the
    /// unfolded tree (see [`Graph::tree_size`]) and grows exponentially on heavily shared
    /// graphs such as a Kalman likelihood. The rendering also recurses once per level.
    /// Meant for small expressions in logs and tests; use [`Graph::debug_string`], which
    /// lists every distinct node once, for anything larger.
    pub fn to_infix_string(&self, node: Ref) -> String {
        match self.node(node) {
            Node::Constant(v) => format!("{}", v),
            Node::Parameter(p) => format!("{}", p),
            Node::Addition(u, v) => self.binary_string(u, "+", v),
            Node::Subtraction(u, v) => self.binary_string(u, "-", v),
            Node::Multiply(u, v) => self.binary_string(u, "*", v),
            Node::Division(u, v) => self.binary_string(u, "/", v),
            Node::Power(u, v) => self.binary_string(u, "^", v),
            Node::Square(u) => format!("{}^2", self.to_infix_string(u)),
            Node::Log(u) => format!("ln({})", self.to_infix_string(u)),
            Node::Exp(u) => format!("exp({})", self.to_infix_string(u)),
        }
    }

    fn binary_string(&self, u: Ref, op: &str, v: Ref) -> String {
        format!(
            "({} {} {})",
            self.to_infix_string(u),
            op,
            self.to_infix_string(v)
        )
    }
}
