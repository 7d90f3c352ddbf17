//! The operator contract.
//!
//! A [`Function`] is a named operator living in the parser's function table.
//! During evaluation it receives an [`Args`] cursor over the ordered
//! argument nodes of the expression that invoked it; arguments are evaluated
//! lazily, one at a time, which is what lets `and`/`or` short-circuit
//! without touching the rest of their argument list.
//!
//! The [`NodeEval`] trait is the seam between operators and the environment
//! that owns the node pools: it resolves a [`NodeId`] to its current scalar
//! value, and a function name to its current implementation.

use std::fmt;
use std::sync::Arc;

use crate::NodeId;
use crate::scalar::Scalar;

/// Evaluation access to the node pools behind a compiled tree.
pub trait NodeEval {
    /// Evaluate the node behind `id` and return its current scalar value.
    /// Handles that no longer resolve (for instance after a table was
    /// cleared underneath a compiled tree) yield [`Scalar::Undefined`].
    fn eval_node(&self, id: NodeId) -> Scalar;

    /// Look up a function by its registered name.
    fn lookup_function(&self, name: &str) -> Option<Arc<dyn Function>>;
}

/// The ordered argument list handed to a [`Function`].
///
/// Argument order is significant and the same node may appear more than
/// once. [`Args::values`] evaluates the nodes lazily in order;
/// [`Args::defined`] additionally skips undefined results, which is the
/// shape most folding operators want.
pub struct Args<'a> {
    tree: &'a dyn NodeEval,
    ids: &'a [NodeId],
}

impl<'a> Args<'a> {
    pub(crate) fn new(tree: &'a dyn NodeEval, ids: &'a [NodeId]) -> Self {
        Args { tree, ids }
    }

    /// Number of argument nodes, counting undefined ones.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Evaluate the arguments in order.
    pub fn values(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.ids.iter().map(|id| self.tree.eval_node(*id))
    }

    /// Evaluate the arguments in order, skipping undefined results.
    pub fn defined(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.values().filter(|v| !v.is_undefined())
    }
}

/// A named operator: given an ordered argument list, produce a scalar.
///
/// Evaluation never fails; anomalies such as an empty or all-undefined
/// argument list are reported as [`Scalar::Undefined`]. Implementations are
/// owned by the parser as `Arc<dyn Function>` and may be replaced by
/// registering another function under the same name.
pub trait Function: Send + Sync {
    /// Stable identifier for this operator. Two functions with the same id
    /// are considered interchangeable for environment equality and hashing.
    fn id(&self) -> &str;

    /// Apply the operator to the argument list.
    fn evaluate(&self, args: &Args<'_>) -> Scalar;
}

impl fmt::Debug for dyn Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.id())
    }
}
