//! Newton's method over expression graphs.
//!
//! [`Newton`] drives N parameters towards a common root of N target expressions. The
//! Jacobian is derived symbolically once, at construction; every [`Newton::step`] then only
//! evaluates targets and Jacobian entries (through a single fresh [`EvalContext`], so nodes
//! shared between entries are computed once) and solves the linear system with a
//! row-pivoted LU decomposition.
//!
//! Convergence checks and iteration limits are up to the caller.
//!
//! # Examples
//!
//! ```
//! use symdiff_rs::graph::Graph;
//! use symdiff_rs::newton::Newton;
//!
//! let mut graph = Graph::<f64>::default();
//! let x = graph.mk_parameter(3.0);
//! // x^2 - 2 = 0
//! let f = graph.mk_sub(graph.mk_square(x), graph.two);
//!
//! let newton = Newton::new(&graph, vec![f], vec![x]);
//! for _ in 0..10 {
//!     newton.step(&mut graph).unwrap();
//! }
//! assert!((graph.parameter_value(x) - 2f64.sqrt()).abs() < 1e-12);
//! ```

use std::fmt;

use log::debug;
use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use crate::diff::DiffContext;
use crate::eval::EvalContext;
use crate::graph::Graph;
use crate::reference::Ref;

/// Errors that can occur during a Newton step.
#[derive(Debug, Clone, PartialEq)]
pub enum NewtonError {
    /// The Jacobian evaluated at the current parameters has no LU solution.
    SingularJacobian,
}

impl fmt::Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewtonError::SingularJacobian => {
                write!(f, "Jacobian is singular at the current parameter values")
            }
        }
    }
}

impl std::error::Error for NewtonError {}

#[derive(Debug, Clone)]
pub struct Newton {
    targets: Vec<Ref>,
    params: Vec<Ref>,
    /// `jacobian[i][j]` is d(targets[i]) / d(params[j]).
    jacobian: Vec<Vec<Ref>>,
}

impl Newton {
    pub fn new<T: Float>(graph: &Graph<T>, targets: Vec<Ref>, params: Vec<Ref>) -> Self {
        assert_eq!(
            targets.len(),
            params.len(),
            "Newton's method needs as many targets as parameters"
        );

        let n = params.len();
        let mut jacobian = vec![vec![graph.zero; n]; n];
        for (j, &p) in params.iter().enumerate() {
            // One context per parameter, shared by all targets.
            let mut ctx = DiffContext::new(graph, p);
            for (i, &f) in targets.iter().enumerate() {
                jacobian[i][j] = ctx.diff(f);
            }
            debug!("jacobian column {}: {} memoized derivatives", j, ctx.len());
        }

        Self {
            targets,
            params,
            jacobian,
        }
    }

    pub fn dim(&self) -> usize {
        self.params.len()
    }
    pub fn targets(&self) -> &[Ref] {
        &self.targets
    }
    pub fn parameters(&self) -> &[Ref] {
        &self.params
    }
    pub fn jacobian(&self) -> &[Vec<Ref>] {
        &self.jacobian
    }

    /// Values of all targets at the current parameter bindings.
    pub fn residuals<T: Float>(&self, graph: &Graph<T>) -> Vec<T> {
        let mut ctx = EvalContext::new(graph);
        self.targets.iter().map(|&f| ctx.evaluate(f)).collect()
    }

    /// Perform one Newton iteration: solve `J * delta = f` and rebind `p <- p - delta`.
    ///
    /// On error the parameters are left untouched.
    pub fn step<T>(&self, graph: &mut Graph<T>) -> Result<(), NewtonError>
    where
        T: Float + RealField,
    {
        let n = self.dim();

        let (residual, jacobian) = {
            let mut ctx = EvalContext::new(graph);
            let residual = DVector::from_iterator(n, self.targets.iter().map(|&f| ctx.evaluate(f)));
            let jacobian = DMatrix::from_fn(n, n, |i, j| ctx.evaluate(self.jacobian[i][j]));
            debug!(
                "step: {} evaluations, {} cache hits",
                ctx.evaluate_count(),
                ctx.cache_hit_count()
            );
            (residual, jacobian)
        };

        let delta = jacobian
            .lu()
            .solve(&residual)
            .ok_or(NewtonError::SingularJacobian)?;
        debug!("step: |f| = {:?}, |delta| = {:?}", residual.norm(), delta.norm());

        for (i, &p) in self.params.iter().enumerate() {
            let current = graph.parameter_value(p);
            graph.bind(p, current - delta[i]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn test_jacobian_structure() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);
        let y = graph.mk_parameter(1.0);
        let f1 = graph.mk_square(x);
        let f2 = graph.mk_square(y);

        let newton = Newton::new(&graph, vec![f1, f2], vec![x, y]);
        let j = newton.jacobian();
        assert_eq!(j[0][1], graph.zero);
        assert_eq!(j[1][0], graph.zero);
        assert_eq!(graph.value(j[0][0]), 2.0);
        assert_eq!(graph.value(j[1][1]), 2.0);
    }

    #[test]
    fn test_single_step_halves_quadratic() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(1.0);
        let f = graph.mk_square(x);

        let newton = Newton::new(&graph, vec![f], vec![x]);
        newton.step(&mut graph).unwrap();
        assert_relative_eq!(graph.parameter_value(x), 0.5);
        assert_relative_eq!(newton.residuals(&graph)[0], 0.25);
    }

    #[test]
    fn test_coupled_linear_system_in_one_step() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(0.0);
        let y = graph.mk_parameter(0.0);
        // x + y - 3 = 0, x - y - 1 = 0
        let three = graph.mk_constant(3.0);
        let f1 = graph.mk_sub(graph.mk_add(x, y), three);
        let f2 = graph.mk_sub(graph.mk_sub(x, y), graph.one);

        let newton = Newton::new(&graph, vec![f1, f2], vec![x, y]);
        newton.step(&mut graph).unwrap();
        assert_relative_eq!(graph.parameter_value(x), 2.0, epsilon = 1e-12);
        assert_relative_eq!(graph.parameter_value(y), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_jacobian() {
        let mut graph = Graph::<f64>::default();
        let x = graph.mk_parameter(0.0);
        let f = graph.mk_square(x);

        let newton = Newton::new(&graph, vec![f], vec![x]);
        assert_eq!(newton.step(&mut graph), Err(NewtonError::SingularJacobian));
        assert_eq!(graph.parameter_value(x), 0.0);
    }

    #[test]
    #[should_panic(expected = "as many targets as parameters")]
    fn test_dimension_mismatch() {
        let graph = Graph::<f64>::default();
        let x = graph.mk_parameter(0.0);
        Newton::new(&graph, vec![x, x], vec![x]);
    }
}
