//! Kalman filter likelihood as an expression graph.
//!
//! The filter tracks a scalar latent state with AR(1) dynamics, observed through a
//! time-varying regressor:
//!
//! ```text
//! x[t] = drift + tension * x[t-1] + w,    w ~ N(0, exp(log_state_variance))
//! y[t] = offset + input[t] * x[t] + v,    v ~ N(0, exp(log_measure_variance))
//! ```
//!
//! Every update appends nodes to the graph instead of computing numbers, so after a run
//! over the observations [`KalmanFilter::likelihood`] is a single expression in the five
//! model parameters. Differentiating it yields exact gradients for fitting; since each step
//! reuses the previous state, variance and the parameters several times, the graph is
//! heavily shared and relies on memoized differentiation and evaluation.
//!
//! The accumulated likelihood is the negative log-likelihood up to constants:
//! `sum(ln(S[t]) + e[t]^2 / S[t])` over innovations `e` with variances `S`.

use log::debug;
use num_traits::Float;

use crate::diff::DiffContext;
use crate::graph::Graph;
use crate::reference::Ref;

/// Initial values of the model parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KalmanParameters<T> {
    pub drift: T,
    pub tension: T,
    pub offset: T,
    pub log_measure_variance: T,
    pub log_state_variance: T,
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    drift: Ref,
    tension: Ref,
    offset: Ref,
    log_measure_variance: Ref,
    log_state_variance: Ref,
    state: Ref,
    variance: Ref,
    likelihood: Ref,
    steps: usize,
}

impl KalmanFilter {
    /// Create the parameters in `graph` and start from the given state and its variance.
    pub fn new<T: Float>(
        graph: &Graph<T>,
        params: KalmanParameters<T>,
        initial_state: T,
        initial_variance: T,
    ) -> Self {
        Self {
            drift: graph.mk_parameter(params.drift),
            tension: graph.mk_parameter(params.tension),
            offset: graph.mk_parameter(params.offset),
            log_measure_variance: graph.mk_parameter(params.log_measure_variance),
            log_state_variance: graph.mk_parameter(params.log_state_variance),
            state: graph.mk_constant(initial_state),
            variance: graph.mk_constant(initial_variance),
            likelihood: graph.zero,
            steps: 0,
        }
    }

    pub fn drift(&self) -> Ref {
        self.drift
    }
    pub fn tension(&self) -> Ref {
        self.tension
    }
    pub fn offset(&self) -> Ref {
        self.offset
    }
    pub fn log_measure_variance(&self) -> Ref {
        self.log_measure_variance
    }
    pub fn log_state_variance(&self) -> Ref {
        self.log_state_variance
    }

    /// Parameters in the order drift, tension, offset, log measure variance, log state variance.
    pub fn parameters(&self) -> Vec<Ref> {
        vec![
            self.drift,
            self.tension,
            self.offset,
            self.log_measure_variance,
            self.log_state_variance,
        ]
    }

    /// Current (filtered) state estimate.
    pub fn state(&self) -> Ref {
        self.state
    }
    /// Variance of the current state estimate.
    pub fn variance(&self) -> Ref {
        self.variance
    }
    /// Likelihood accumulated over all observations so far.
    pub fn likelihood(&self) -> Ref {
        self.likelihood
    }
    /// Number of observations filtered so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn predicted_state<T: Float>(&self, graph: &Graph<T>) -> Ref {
        graph.mk_add(self.drift, graph.mk_mul(self.tension, self.state))
    }

    fn predicted_variance<T: Float>(&self, graph: &Graph<T>) -> Ref {
        let propagated = graph.mk_mul(graph.mk_square(self.tension), self.variance);
        graph.mk_add(propagated, graph.mk_exp(self.log_state_variance))
    }

    fn observation<T: Float>(&self, graph: &Graph<T>, input: Ref, predicted_state: Ref) -> Ref {
        graph.mk_add(self.offset, graph.mk_mul(input, predicted_state))
    }

    /// Predicted observation for the next step with the given regressor.
    ///
    /// Does not advance the filter.
    pub fn estimate<T: Float>(&self, graph: &Graph<T>, input: T) -> Ref {
        let input = graph.mk_constant(input);
        let predicted = self.predicted_state(graph);
        self.observation(graph, input, predicted)
    }

    /// Advance the filter by one observation and accumulate its likelihood term.
    pub fn filtering<T: Float>(&mut self, graph: &Graph<T>, input: T, observation: T) {
        let input = graph.mk_constant(input);
        let observation = graph.mk_constant(observation);

        let predicted_state = self.predicted_state(graph);
        let predicted_variance = self.predicted_variance(graph);

        // innovation and its variance
        let error = graph.mk_sub(
            observation,
            self.observation(graph, input, predicted_state),
        );
        let error_variance = graph.mk_add(
            graph.mk_mul(graph.mk_square(input), predicted_variance),
            graph.mk_exp(self.log_measure_variance),
        );

        let gain = graph.mk_div(graph.mk_mul(predicted_variance, input), error_variance);

        self.state = graph.mk_add(predicted_state, graph.mk_mul(gain, error));
        self.variance = graph.mk_sub(
            predicted_variance,
            graph.mk_mul(graph.mk_mul(gain, input), predicted_variance),
        );

        let term = graph.mk_add(
            graph.mk_log(error_variance),
            graph.mk_div(graph.mk_square(error), error_variance),
        );
        self.likelihood = graph.mk_add(self.likelihood, term);
        self.steps += 1;

        debug!(
            "filtering: step {}, state = {}, likelihood = {}",
            self.steps, self.state, self.likelihood
        );
    }

    /// Run [`KalmanFilter::filtering`] over `(input, observation)` pairs.
    pub fn filter_all<T: Float>(&mut self, graph: &Graph<T>, data: impl IntoIterator<Item = (T, T)>) {
        for (input, observation) in data {
            self.filtering(graph, input, observation);
        }
    }

    /// Partial derivatives of the likelihood, in [`KalmanFilter::parameters`] order.
    pub fn gradient<T: Float>(&self, graph: &Graph<T>) -> Vec<Ref> {
        self.parameters()
            .into_iter()
            .map(|p| DiffContext::new(graph, p).diff(self.likelihood))
            .collect()
    }
}
