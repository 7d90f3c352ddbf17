//! Named, mutable scalar slots.
//!
//! A [`Variable`] is the node the parser creates for every identifier it
//! meets: either explicitly through a `(set name value)` form, or implicitly
//! as an undefined-valued placeholder the host is expected to fill in later.
//! The parser owns every variable and hands out [`NodeId`] handles, so the
//! value can change at any time without recompiling anything that refers to
//! it.
//!
//! A variable may carry a bound expression reference (the result of
//! `(set name (expr ...))`); each evaluation then re-evaluates the bound
//! expression and stores the result before reporting it.

use std::fmt;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

use crate::NodeId;
use crate::function::NodeEval;
use crate::scalar::Scalar;

#[derive(Debug, Default)]
struct VarState {
    name: String,
    value: Scalar,
    bound: Option<NodeId>,
}

/// A named scalar slot, protected by its own short lock.
#[derive(Debug, Default)]
pub struct Variable {
    state: Mutex<VarState>,
}

impl Variable {
    /// A variable with a name but no value yet - the placeholder shape the
    /// parser uses for identifiers it has not seen a `set` for.
    pub fn new(name: impl Into<String>) -> Self {
        Variable {
            state: Mutex::new(VarState {
                name: name.into(),
                value: Scalar::Undefined,
                bound: None,
            }),
        }
    }

    pub fn with_value(name: impl Into<String>, value: Scalar) -> Self {
        Variable {
            state: Mutex::new(VarState {
                name: name.into(),
                value,
                bound: None,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    /// The currently stored scalar, without re-evaluating any bound
    /// expression.
    pub fn get(&self) -> Scalar {
        self.state.lock().value
    }

    /// Update name and value in one step.
    pub fn set(&self, name: impl Into<String>, value: Scalar) {
        let mut st = self.state.lock();
        st.name = name.into();
        st.value = value;
    }

    /// Assign a plain value. Any bound expression is dropped.
    pub fn assign(&self, value: Scalar) {
        let mut st = self.state.lock();
        st.value = value;
        st.bound = None;
    }

    /// Bind an expression node; every subsequent [`Variable::eval`] call
    /// re-evaluates it.
    pub fn bind(&self, expr: NodeId) {
        self.state.lock().bound = Some(expr);
    }

    pub fn bound(&self) -> Option<NodeId> {
        self.state.lock().bound
    }

    /// Reset the stored value to undefined. Name and binding are kept.
    pub fn clear(&self) {
        self.state.lock().value.clear();
    }

    /// Current value of the variable. If an expression is bound, it is
    /// evaluated first and its result stored.
    ///
    /// The bound expression is evaluated outside the variable's lock, so an
    /// expression that happens to read this same variable sees the previous
    /// value instead of deadlocking.
    pub fn eval(&self, tree: &dyn NodeEval) -> Scalar {
        let bound = self.state.lock().bound;
        match bound {
            Some(id) => {
                let v = tree.eval_node(id);
                self.state.lock().value = v;
                v
            }
            None => self.state.lock().value,
        }
    }
}

impl Clone for Variable {
    fn clone(&self) -> Self {
        let st = self.state.lock();
        Variable {
            state: Mutex::new(VarState {
                name: st.name.clone(),
                value: st.value,
                bound: st.bound,
            }),
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let a = self.state.lock();
        let b = other.state.lock();
        a.name == b.name && a.value == b.value
    }
}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let st = self.state.lock();
        st.name.hash(state);
        st.value.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        write!(f, "[{} = {}]", st.name, st.value)
    }
}
