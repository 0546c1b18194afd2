use num_traits::Float;

use crate::diff::DiffContext;
use crate::eval::EvalContext;
use crate::reference::Ref;
use crate::types::ParamId;

/// A node of an expression graph.
///
/// Composite variants hold handles to their operands. Operands are always created before
/// the node referencing them, so the graph is acyclic by construction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Node<T> {
    Constant(T),
    Parameter(ParamId),
    Addition(Ref, Ref),
    Subtraction(Ref, Ref),
    Multiply(Ref, Ref),
    Division(Ref, Ref),
    Power(Ref, Ref),
    Square(Ref),
    Log(Ref),
    Exp(Ref),
}

impl<T> Default for Node<T>
where
    T: Float,
{
    fn default() -> Self {
        Node::Constant(T::zero())
    }
}

impl<T> Node<T> {
    /// Name of the node kind, as used in debug output.
    pub fn name(&self) -> &'static str {
        match self {
            Node::Constant(_) => "Constant",
            Node::Parameter(_) => "Parameter",
            Node::Addition(..) => "Addition",
            Node::Subtraction(..) => "Subtraction",
            Node::Multiply(..) => "Multiply",
            Node::Division(..) => "Division",
            Node::Power(..) => "Power",
            Node::Square(_) => "Square",
            Node::Log(_) => "Log",
            Node::Exp(_) => "Exp",
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Constant(_) | Node::Parameter(_))
    }

    /// Operands of the node, left to right.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = Ref> {
        let (a, b) = match *self {
            Node::Constant(_) | Node::Parameter(_) => (None, None),
            Node::Addition(u, v)
            | Node::Subtraction(u, v)
            | Node::Multiply(u, v)
            | Node::Division(u, v)
            | Node::Power(u, v) => (Some(u), Some(v)),
            Node::Square(u) | Node::Log(u) | Node::Exp(u) => (Some(u), None),
        };
        a.into_iter().chain(b)
    }
}

impl<T> Node<T>
where
    T: Float,
{
    /// Combine the values of the operands, fetched through `child`.
    ///
    /// `child` is called exactly once per operand, left to right.
    fn compute(&self, param: impl Fn(ParamId) -> T, mut child: impl FnMut(Ref) -> T) -> T {
        match *self {
            Node::Constant(v) => v,
            Node::Parameter(p) => param(p),
            Node::Addition(u, v) => child(u) + child(v),
            Node::Subtraction(u, v) => child(u) - child(v),
            Node::Multiply(u, v) => child(u) * child(v),
            Node::Division(u, v) => child(u) / child(v),
            Node::Power(u, v) => child(u).powf(child(v)),
            Node::Square(u) => {
                let x = child(u);
                x * x
            }
            Node::Log(u) => child(u).ln(),
            Node::Exp(u) => child(u).exp(),
        }
    }

    /// Value of the node given the values of its operands, in [`Node::children`] order.
    pub(crate) fn apply(&self, param: impl Fn(ParamId) -> T, operands: &[T]) -> T {
        let mut next = 0;
        self.compute(param, |_| {
            let x = operands[next];
            next += 1;
            x
        })
    }

    /// Value of the node, sourcing operand values from `ctx`.
    pub fn evaluate(&self, ctx: &mut EvalContext<'_, T>) -> T {
        let graph = ctx.graph();
        self.compute(|p| graph.parameter(p), |c| ctx.evaluate(c))
    }

    /// Build the derivative of this node with respect to the target of `ctx`.
    ///
    /// `this` is the handle of the node itself. Operand derivatives are always obtained
    /// through [`DiffContext::diff`], never by recursing into the operands directly.
    pub fn differentiate(&self, this: Ref, ctx: &mut DiffContext<'_, T>) -> Ref {
        match *self {
            Node::Constant(_) => ctx.zero(),
            Node::Parameter(_) => {
                if this == ctx.target() {
                    ctx.one()
                } else {
                    ctx.zero()
                }
            }

            // (u + v)' = u' + v'
            Node::Addition(u, v) => {
                let du = ctx.diff(u);
                let dv = ctx.diff(v);
                ctx.add(du, dv)
            }

            // (u - v)' = u' - v'
            Node::Subtraction(u, v) => {
                let du = ctx.diff(u);
                let dv = ctx.diff(v);
                ctx.sub(du, dv)
            }

            // (u * v)' = u' * v + u * v'
            Node::Multiply(u, v) => {
                let du = ctx.diff(u);
                let dv = ctx.diff(v);
                let a = ctx.mul(du, v);
                let b = ctx.mul(u, dv);
                ctx.add(a, b)
            }

            // (u / v)' = (u' * v - u * v') / v^2
            Node::Division(u, v) => {
                let du = ctx.diff(u);
                let dv = ctx.diff(v);
                let a = ctx.mul(du, v);
                let b = ctx.mul(u, dv);
                let numerator = ctx.sub(a, b);
                let denominator = ctx.graph().mk_square(v);
                ctx.div(numerator, denominator)
            }

            // (u ^ v)' = u^v * (v' * ln(u) + v * u' / u)
            Node::Power(u, v) => {
                let du = ctx.diff(u);
                let dv = ctx.diff(v);
                let ln_u = ctx.graph().mk_log(u);
                let a = ctx.mul(dv, ln_u);
                let v_du = ctx.mul(v, du);
                let b = ctx.div(v_du, u);
                let sum = ctx.add(a, b);
                ctx.mul(this, sum)
            }

            // (u^2)' = 2 * u * u'
            Node::Square(u) => {
                let du = ctx.diff(u);
                let two_u = ctx.mul(ctx.two(), u);
                ctx.mul(two_u, du)
            }

            // ln(u)' = u' / u
            Node::Log(u) => {
                let du = ctx.diff(u);
                ctx.div(du, u)
            }

            // exp(u)' = exp(u) * u'
            Node::Exp(u) => {
                let du = ctx.diff(u);
                ctx.mul(this, du)
            }
        }
    }
}
