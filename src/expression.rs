//! Function application nodes.
//!
//! An [`Expression`] pairs a function name with an ordered list of argument
//! handles. Arguments are non-owning [`NodeId`] references into the parser's
//! pools; the same node may appear several times and order is significant.
//!
//! Evaluating an expression resolves the function by name, invokes it over
//! the current argument values, and stores the result in the expression's
//! own scalar slot. That slot acts as a one-deep cache of the last
//! evaluation - it is refreshed unconditionally on every call, and it is
//! what equality and hashing observe between evaluations.

use std::fmt;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

use crate::NodeId;
use crate::function::{Args, NodeEval};
use crate::scalar::Scalar;

#[derive(Debug, Default)]
struct ExprState {
    name: Option<String>,
    func: Option<String>,
    args: Vec<NodeId>,
}

/// A function applied to an ordered argument list.
#[derive(Debug, Default)]
pub struct Expression {
    state: Mutex<ExprState>,
    cache: Mutex<Scalar>,
}

impl Expression {
    /// An empty expression with no function and no arguments.
    pub fn new() -> Self {
        Expression::default()
    }

    /// An expression applying the named function.
    pub fn with_function(func: impl Into<String>) -> Self {
        Expression {
            state: Mutex::new(ExprState {
                name: None,
                func: Some(func.into()),
                args: Vec::new(),
            }),
            cache: Mutex::new(Scalar::Undefined),
        }
    }

    /// Optional debug label for this expression.
    pub fn name(&self) -> Option<String> {
        self.state.lock().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.state.lock().name = Some(name.into());
    }

    /// The name of the function this expression applies, if one is bound.
    pub fn function(&self) -> Option<String> {
        self.state.lock().func.clone()
    }

    /// Bind (or replace) the function applied by this expression.
    pub fn set_function(&self, func: impl Into<String>) {
        self.state.lock().func = Some(func.into());
    }

    /// Snapshot of the argument list.
    pub fn args(&self) -> Vec<NodeId> {
        self.state.lock().args.clone()
    }

    /// Replace the whole argument list.
    pub fn set_args(&self, args: Vec<NodeId>) {
        self.state.lock().args = args;
    }

    /// Append one argument. Duplicates are allowed.
    pub fn push_arg(&self, arg: NodeId) {
        self.state.lock().args.push(arg);
    }

    /// Append several arguments in order.
    pub fn extend_args(&self, args: impl IntoIterator<Item = NodeId>) {
        self.state.lock().args.extend(args);
    }

    /// Remove the first occurrence of `arg`, returning whether one was
    /// found.
    pub fn remove_arg(&self, arg: NodeId) -> bool {
        let mut st = self.state.lock();
        match st.args.iter().position(|a| *a == arg) {
            Some(i) => {
                st.args.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn clear_args(&self) {
        self.state.lock().args.clear();
    }

    /// The result of the most recent evaluation.
    pub fn cached(&self) -> Scalar {
        *self.cache.lock()
    }

    /// Apply the bound function to the current argument values and refresh
    /// the cached result.
    ///
    /// With no function bound the stored value is reported as-is; a function
    /// name that no longer resolves (removed from the table after
    /// compilation) yields the undefined scalar. The state lock is released
    /// before any argument is evaluated, so lock acquisition never nests.
    pub fn eval(&self, tree: &dyn NodeEval) -> Scalar {
        let (func, args) = {
            let st = self.state.lock();
            (st.func.clone(), st.args.clone())
        };
        let result = match func {
            Some(name) => match tree.lookup_function(&name) {
                Some(f) => f.evaluate(&Args::new(tree, &args)),
                None => Scalar::Undefined,
            },
            None => *self.cache.lock(),
        };
        *self.cache.lock() = result;
        result
    }
}

impl Clone for Expression {
    fn clone(&self) -> Self {
        let st = self.state.lock();
        Expression {
            state: Mutex::new(ExprState {
                name: st.name.clone(),
                func: st.func.clone(),
                args: st.args.clone(),
            }),
            cache: Mutex::new(*self.cache.lock()),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let a = self.state.lock();
        let b = other.state.lock();
        a.name == b.name
            && a.func == b.func
            && a.args == b.args
            && *self.cache.lock() == *other.cache.lock()
    }
}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let st = self.state.lock();
        st.name.hash(state);
        st.func.hash(state);
        st.args.hash(state);
        self.cache.lock().hash(state);
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        write!(f, "[")?;
        if let Some(name) = &st.name {
            write!(f, "'{name}' ")?;
        }
        match &st.func {
            Some(func) => write!(f, "fn={func}")?,
            None => write!(f, "fn=<none>")?,
        }
        write!(f, " args=(")?;
        for (i, arg) in st.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg:?}")?;
        }
        write!(f, ")]")
    }
}
