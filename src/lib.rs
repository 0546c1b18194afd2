//! # symdiff-rs: Symbolic differentiation over shared expression graphs
//!
//! **`symdiff-rs`** builds expression graphs over real-valued parameters, derives exact
//! derivative graphs from them, and evaluates either kind efficiently. It is meant as the
//! engine below gradient-based optimizers and statistical estimators.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All nodes live in a [`Graph`][crate::graph::Graph] arena and are addressed with lightweight [`Ref`][crate::reference::Ref] handles. Graphs are DAGs: a subexpression can be shared by any number of parents.
//! - **Identity, not structure**: Two separately built nodes are always distinct. Caching and simplification compare handles, never values.
//! - **Memoized traversals**: A [`DiffContext`][crate::diff::DiffContext] differentiates each node at most once, an [`EvalContext`][crate::eval::EvalContext] evaluates each node at most once, however much sharing the graph has.
//! - **Rebindable parameters**: Parameters are slots in a table owned by the graph. Rebinding one is visible to every node built on it.
//!
//! ## Basic Usage
//!
//! ```rust
//! use symdiff_rs::diff::DiffContext;
//! use symdiff_rs::eval::EvalContext;
//! use symdiff_rs::graph::Graph;
//!
//! // 1. Initialize the manager
//! let mut graph = Graph::<f64>::default();
//!
//! // 2. Create parameters and build f = x * y + exp(x)
//! let x = graph.mk_parameter(0.0);
//! let y = graph.mk_parameter(2.0);
//! let f = graph.mk_add(graph.mk_mul(x, y), graph.mk_exp(x));
//!
//! // 3. Derive df/dx = y + exp(x)
//! let df = DiffContext::new(&graph, x).diff(f);
//!
//! // 4. Evaluate both with one memoized pass
//! let mut ctx = EvalContext::new(&graph);
//! assert_eq!(ctx.evaluate(f), 1.0);
//! assert_eq!(ctx.evaluate(df), 3.0);
//!
//! // 5. Rebind and evaluate again with a fresh context
//! graph.bind(y, 5.0);
//! assert_eq!(EvalContext::new(&graph).evaluate(df), 6.0);
//! ```
//!
//! ## Core Components
//!
//! - **[`graph`]**: The [`Graph`][crate::graph::Graph] manager: node constructors, sentinels, parameters.
//! - **[`node`]**: The node kinds and their evaluation and differentiation rules.
//! - **[`diff`]**: Memoized differentiation with identity-based simplification.
//! - **[`eval`]**: Memoized evaluation with call/hit instrumentation.
//! - **[`newton`]**: Newton's method with a symbolic Jacobian.
//! - **[`kalman`]**: A Kalman filter whose likelihood is an expression graph.

pub mod cache;
pub mod debug;
pub mod diff;
pub mod eval;
pub mod graph;
pub mod kalman;
pub mod newton;
pub mod node;
pub mod ops;
pub mod reference;
pub mod table;
pub mod types;
