//! The parsing environment.
//!
//! [`Parser`] owns everything the language touches: the source text, the
//! function table, the variable table, the constant pool, the
//! sub-expression pool, and the compiled root of the evaluation tree. Nodes
//! refer to one another only through [`NodeId`] handles into these pools, so
//! the parser is the single memory and identity authority - re-registering
//! a variable under an existing name updates the value behind the same
//! handle, and every compiled expression observes the new value on its next
//! evaluation.
//!
//! Compilation translates source forms into the tree once; evaluation walks
//! the tree as many times as the host cares to, cheaply. Each table sits
//! behind its own lock so concurrent hosts contend only on what they
//! actually share.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, trace};

use crate::builtins::{Comp, CompOp, Diff, Logic, LogicOp, Max, Min, Prod, Quot, Sum};
use crate::expression::Expression;
use crate::function::{Function, NodeEval};
use crate::scalar::Scalar;
use crate::syntax::{self, Form};
use crate::variable::Variable;
use crate::{Error, NodeId};

#[derive(Default)]
struct VarTable {
    slots: Vec<Variable>,
    index: HashMap<String, usize>,
}

/// The parser-owned environment: source, tables, pools, and the compiled
/// root expression.
pub struct Parser {
    src: RwLock<String>,
    root: Mutex<Option<NodeId>>,
    fcns: RwLock<HashMap<String, Arc<dyn Function>>>,
    vars: RwLock<VarTable>,
    consts: RwLock<Vec<Scalar>>,
    subs: RwLock<Vec<Expression>>,
}

impl Parser {
    /// A parser seeded with the default functions and variables, ready for
    /// a source string.
    pub fn new() -> Self {
        let parser = Parser {
            src: RwLock::new(String::new()),
            root: Mutex::new(None),
            fcns: RwLock::new(HashMap::new()),
            vars: RwLock::new(VarTable::default()),
            consts: RwLock::new(Vec::new()),
            subs: RwLock::new(Vec::new()),
        };
        parser.reset();
        parser
    }

    /// A parser with `source` already compiled.
    pub fn with_source(source: impl Into<String>) -> Result<Self, Error> {
        let parser = Parser::new();
        parser.set_source(source);
        parser.compile()?;
        Ok(parser)
    }

    /// Replace the source code. The compiled tree is discarded; variables,
    /// functions and pools are kept, so identifiers shared between the old
    /// and new source keep their values.
    pub fn set_source(&self, source: impl Into<String>) {
        let mut src = self.src.write();
        *src = source.into();
        *self.root.lock() = None;
        trace!("source replaced");
    }

    /// The currently active source code.
    pub fn source(&self) -> String {
        self.src.read().clone()
    }

    /// Create the named variable or update its value, preserving node
    /// identity: any compiled expression referring to `name` sees the new
    /// value on its next evaluation. A plain value assignment drops any
    /// expression previously bound by a `set` form.
    pub fn add_variable(&self, name: &str, value: impl Into<Scalar>) {
        let id = self.lookup_or_create_var(name);
        self.with_var(id, |v| v.assign(value.into()));
        trace!(name, "variable assigned");
    }

    /// Merge a ready-made [`Variable`] into the table. An existing variable
    /// of the same name keeps its identity and takes the new value.
    pub fn adopt_variable(&self, variable: Variable) {
        let name = variable.name();
        let mut vars = self.vars.write();
        match vars.index.get(&name).copied() {
            Some(i) => vars.slots[i].assign(variable.get()),
            None => {
                let i = vars.slots.len();
                vars.slots.push(variable);
                vars.index.insert(name, i);
            }
        }
    }

    /// The current value of the named variable, if it exists. Bound
    /// expressions are not re-evaluated; the last stored value is reported.
    pub fn variable(&self, name: &str) -> Option<Scalar> {
        let vars = self.vars.read();
        vars.index.get(name).map(|&i| vars.slots[i].get())
    }

    /// Remove the named variable, returning whether it existed. The node
    /// itself survives until [`Parser::clear`], so compiled trees that
    /// still refer to it stay valid.
    pub fn remove_variable(&self, name: &str) -> bool {
        self.vars.write().index.remove(name).is_some()
    }

    pub fn clear_variables(&self) {
        let mut vars = self.vars.write();
        vars.slots.clear();
        vars.index.clear();
    }

    /// Install the default variables: `e` and `pi`.
    pub fn use_default_variables(&self) {
        self.add_variable("e", 2.71828183);
        self.add_variable("pi", 3.14159265);
    }

    /// Register a function under `name`, replacing any previous function of
    /// that name. Functions must be registered before compiling source that
    /// calls them; compiled expressions resolve the name on every
    /// evaluation, so a replacement takes effect without recompiling.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use lkit::{Args, Function, Parser, Scalar};
    ///
    /// struct Hypot;
    ///
    /// impl Function for Hypot {
    ///     fn id(&self) -> &str {
    ///         "hypot"
    ///     }
    ///
    ///     fn evaluate(&self, args: &Args<'_>) -> Scalar {
    ///         let sum: f64 = args.defined().map(|v| v.eval_as_double().powi(2)).sum();
    ///         Scalar::from(sum.sqrt())
    ///     }
    /// }
    ///
    /// let p = Parser::new();
    /// p.add_function("hypot", Arc::new(Hypot));
    /// p.set_source("(hypot 3 4)");
    /// assert_eq!(p.evaluate().unwrap(), Scalar::from(5.0));
    /// ```
    pub fn add_function(&self, name: &str, function: Arc<dyn Function>) {
        self.fcns.write().insert(name.to_owned(), function);
        trace!(name, "function registered");
    }

    /// Remove the named function, returning whether it existed. Compiled
    /// expressions that still refer to it evaluate to undefined until a
    /// replacement is registered.
    pub fn remove_function(&self, name: &str) -> bool {
        self.fcns.write().remove(name).is_some()
    }

    pub fn clear_functions(&self) {
        self.fcns.write().clear();
    }

    /// Install the built-in operator set.
    pub fn use_default_functions(&self) {
        self.add_function("max", Arc::new(Max));
        self.add_function("min", Arc::new(Min));
        self.add_function("+", Arc::new(Sum));
        self.add_function("-", Arc::new(Diff));
        self.add_function("*", Arc::new(Prod));
        self.add_function("/", Arc::new(Quot));
        self.add_function("==", Arc::new(Comp::new(CompOp::Equals)));
        self.add_function("!=", Arc::new(Comp::new(CompOp::NotEquals)));
        self.add_function("<", Arc::new(Comp::new(CompOp::LessThan)));
        self.add_function(">", Arc::new(Comp::new(CompOp::GreaterThan)));
        self.add_function("<=", Arc::new(Comp::new(CompOp::LessOrEqual)));
        self.add_function(">=", Arc::new(Comp::new(CompOp::GreaterOrEqual)));
        self.add_function("and", Arc::new(Logic::new(LogicOp::And)));
        self.add_function("or", Arc::new(Logic::new(LogicOp::Or)));
        self.add_function("not", Arc::new(Logic::new(LogicOp::Not)));
    }

    /// Compile the current source into an evaluation tree, if it is not
    /// compiled already.
    ///
    /// Top-level forms are processed in textual order. Every form before the
    /// last is evaluated once right here - that is how a leading
    /// `(set x ...)` takes effect - and the last form becomes the root that
    /// [`Parser::evaluate`] runs. On error the previous environment state
    /// (variables, functions, pools) is left intact so the host can fix the
    /// source and retry.
    pub fn compile(&self) -> Result<(), Error> {
        let mut root = self.root.lock();
        if root.is_some() {
            return Ok(());
        }
        let src = self.src.read().clone();
        let forms = syntax::read_program(&src)?;
        let last = forms.len() - 1;
        let mut compiled = None;
        for (i, form) in forms.iter().enumerate() {
            let node = self.compile_form(form)?;
            if i == last {
                compiled = Some(node);
            } else {
                self.eval_ctx().eval_node(node);
            }
        }
        *root = compiled;
        debug!(forms = forms.len(), "source compiled");
        Ok(())
    }

    /// Compile if needed, then evaluate the root expression.
    ///
    /// Evaluation itself cannot fail: anomalies such as division by zero or
    /// an all-undefined argument list surface as undefined scalars.
    pub fn evaluate(&self) -> Result<Scalar, Error> {
        self.compile()?;
        let root = *self.root.lock();
        match root {
            Some(id) => Ok(self.eval_ctx().eval_node(id)),
            None => Ok(Scalar::Undefined),
        }
    }

    /// Empty everything: source, tables, pools and the compiled root.
    pub fn clear(&self) {
        self.set_source(String::new());
        self.clear_functions();
        self.clear_variables();
        self.consts.write().clear();
        self.subs.write().clear();
    }

    /// [`Parser::clear`], then re-seed the default functions and variables.
    pub fn reset(&self) {
        self.clear();
        self.use_default_functions();
        self.use_default_variables();
        debug!("environment reset to defaults");
    }

    /// Hash of the environment state: source, constant pool, variable table
    /// and function table. Consistent with [`PartialEq`]: equal parsers
    /// produce equal hashes.
    pub fn state_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.src.read().hash(&mut h);
        for c in self.consts.read().iter() {
            c.hash(&mut h);
        }
        {
            let vars = self.vars.read();
            let mut names: Vec<_> = vars.index.keys().collect();
            names.sort();
            for name in names {
                vars.slots[vars.index[name]].hash(&mut h);
            }
        }
        {
            let fcns = self.fcns.read();
            let mut names: Vec<_> = fcns.keys().collect();
            names.sort();
            for name in names {
                name.hash(&mut h);
                fcns[name].id().hash(&mut h);
            }
        }
        h.finish()
    }

    fn lookup_or_create_var(&self, name: &str) -> usize {
        let mut vars = self.vars.write();
        match vars.index.get(name).copied() {
            Some(i) => i,
            None => {
                let i = vars.slots.len();
                vars.slots.push(Variable::new(name));
                vars.index.insert(name.to_owned(), i);
                trace!(name, "placeholder variable created");
                i
            }
        }
    }

    fn with_var<R>(&self, id: usize, f: impl FnOnce(&Variable) -> R) -> Option<R> {
        let vars = self.vars.read();
        vars.slots.get(id).map(f)
    }

    fn add_const(&self, value: Scalar) -> NodeId {
        let mut consts = self.consts.write();
        consts.push(value);
        NodeId::Const(consts.len() - 1)
    }

    fn compile_form(&self, form: &Form) -> Result<NodeId, Error> {
        match form {
            Form::List(items) => self.compile_list(items),
            Form::Symbol(name) => Ok(NodeId::Var(self.lookup_or_create_var(name))),
            literal => {
                // classify_token only produces lists, symbols and literals
                let value = literal_scalar(literal).unwrap_or_default();
                Ok(self.add_const(value))
            }
        }
    }

    fn compile_list(&self, items: &[Form]) -> Result<NodeId, Error> {
        let Some((head, rest)) = items.split_first() else {
            return Err(Error::Syntax(
                "an expression needs a function name".to_owned(),
            ));
        };
        let head = match head {
            Form::Symbol(name) => name,
            Form::List(_) => {
                return Err(Error::Syntax(
                    "an expression cannot be the first element of an expression; \
                     a function name is required"
                        .to_owned(),
                ));
            }
            _ => {
                return Err(Error::Syntax(
                    "a literal cannot be the first element of an expression; \
                     a function name is required"
                        .to_owned(),
                ));
            }
        };
        if head == "set" {
            return self.compile_set(rest);
        }
        if !self.fcns.read().contains_key(head.as_str()) {
            return Err(Error::UnknownFunction(head.clone()));
        }
        let expr = Expression::with_function(head.as_str());
        for arg in rest {
            expr.push_arg(self.compile_form(arg)?);
        }
        let mut subs = self.subs.write();
        subs.push(expr);
        Ok(NodeId::Expr(subs.len() - 1))
    }

    /// Lower a `(set name value)` form. The parsed form yields the variable
    /// node itself, so a `set` can appear wherever an argument can.
    fn compile_set(&self, rest: &[Form]) -> Result<NodeId, Error> {
        match rest {
            [] => Err(Error::Syntax("a 'set' requires a variable name".to_owned())),
            [Form::Symbol(name)] => Ok(NodeId::Var(self.lookup_or_create_var(name))),
            [Form::Symbol(name), value] => {
                let var_id = self.lookup_or_create_var(name);
                match value {
                    Form::List(_) => {
                        // the variable re-evaluates the expression on each read
                        let node = self.compile_form(value)?;
                        self.with_var(var_id, |v| v.bind(node));
                    }
                    Form::Symbol(other) => {
                        let other_id = self.lookup_or_create_var(other);
                        let snapshot = self.with_var(other_id, Variable::get).unwrap_or_default();
                        self.with_var(var_id, |v| v.assign(snapshot));
                    }
                    literal => {
                        let value = literal_scalar(literal).unwrap_or_default();
                        self.with_var(var_id, |v| v.assign(value));
                    }
                }
                trace!(name = name.as_str(), "variable set");
                Ok(NodeId::Var(var_id))
            }
            [Form::Symbol(_), _, ..] => Err(Error::Syntax(
                "a 'set' takes only a name and a single value".to_owned(),
            )),
            [_, ..] => Err(Error::Syntax(
                "the element after 'set' must be a variable name".to_owned(),
            )),
        }
    }

    fn eval_ctx(&self) -> EvalCtx<'_> {
        EvalCtx {
            fcns: self.fcns.read(),
            vars: self.vars.read(),
            consts: self.consts.read(),
            subs: self.subs.read(),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("src", &*self.src.read())
            .field("root", &*self.root.lock())
            .field("fcns", &self.fcns.read().keys().collect::<Vec<_>>())
            .field("vars", &self.vars.read().slots)
            .field("consts", &*self.consts.read())
            .field("subs", &*self.subs.read())
            .finish()
    }
}

impl PartialEq for Parser {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if *self.src.read() != *other.src.read() {
            return false;
        }
        if *self.consts.read() != *other.consts.read() {
            return false;
        }
        {
            let a = self.vars.read();
            let b = other.vars.read();
            if a.index.len() != b.index.len() {
                return false;
            }
            for (name, &i) in &a.index {
                let Some(&j) = b.index.get(name) else {
                    return false;
                };
                if a.slots[i] != b.slots[j] {
                    return false;
                }
            }
        }
        {
            let a = self.fcns.read();
            let b = other.fcns.read();
            if a.len() != b.len() {
                return false;
            }
            for (name, f) in a.iter() {
                let Some(g) = b.get(name) else {
                    return false;
                };
                if f.id() != g.id() {
                    return false;
                }
            }
        }
        true
    }
}

fn literal_scalar(form: &Form) -> Option<Scalar> {
    match form {
        Form::Bool(b) => Some((*b).into()),
        Form::Int(i) => Some((*i).into()),
        Form::Double(d) => Some((*d).into()),
        Form::Time(t) => Some((*t).into()),
        Form::Symbol(_) | Form::List(_) => None,
    }
}

/// Read guards over every pool, bundled for one evaluation pass.
struct EvalCtx<'a> {
    fcns: RwLockReadGuard<'a, HashMap<String, Arc<dyn Function>>>,
    vars: RwLockReadGuard<'a, VarTable>,
    consts: RwLockReadGuard<'a, Vec<Scalar>>,
    subs: RwLockReadGuard<'a, Vec<Expression>>,
}

impl NodeEval for EvalCtx<'_> {
    fn eval_node(&self, id: NodeId) -> Scalar {
        match id {
            NodeId::Const(i) => self.consts.get(i).copied().unwrap_or_default(),
            NodeId::Var(i) => match self.vars.slots.get(i) {
                Some(var) => var.eval(self),
                None => Scalar::Undefined,
            },
            NodeId::Expr(i) => match self.subs.get(i) {
                Some(expr) => expr.eval(self),
                None => Scalar::Undefined,
            },
        }
    }

    fn lookup_function(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.fcns.get(name).cloned()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    fn eval_source(src: &str) -> Scalar {
        let p = Parser::new();
        p.set_source(src);
        p.evaluate().unwrap()
    }

    /// Compare against an expected scalar, with a tolerance for doubles.
    fn assert_scalar(got: Scalar, expected: Scalar, context: &str) {
        match expected {
            Scalar::Double(d) => {
                assert!(got.is_double(), "{context}: expected a double, got {got}");
                assert!(
                    (got.eval_as_double() - d).abs() < 1.0e-9,
                    "{context}: expected (double) {d}, got {got}"
                );
            }
            other => assert_eq!(got, other, "{context}"),
        }
    }

    #[test]
    fn end_to_end_evaluation() {
        let cases: Vec<(&str, Scalar)> = vec![
            ("(+ 1 2 3)", Scalar::Int(6)),
            ("(/ 10.0 2.0 5.0)", Scalar::Double(1.0)),
            ("(and true false true)", Scalar::Bool(false)),
            ("(or 1 0 1)", Scalar::Bool(true)),
            ("(+ (+ 1 2) (+ 3 4 5) 6)", Scalar::Int(21)),
            ("(+ (/ 10.0 2.5) (* (+ 1.5 2 6) 2.0))", Scalar::Double(23.0)),
            // first-operand-dominates, both ways around
            ("(+ 10 5.5 3.14 6.2)", Scalar::Int(24)),
            ("(+ 5.5 10 3.14 6.2)", Scalar::Double(24.84)),
            ("(== 1 1.0 (* 2.0 0.5))", Scalar::Bool(true)),
            ("(> 10 9 8 5 5 2)", Scalar::Bool(false)),
            ("(min 4 2 9)", Scalar::Int(2)),
            ("(max 4 2 9.5)", Scalar::Double(9.5)),
            ("(not (< 3 1))", Scalar::Bool(true)),
            ("(- 5)", Scalar::Int(-5)),
        ];
        for (src, expected) in cases {
            assert_scalar(eval_source(src), expected, src);
        }
    }

    #[test]
    fn set_forms_take_effect_before_the_root_runs() {
        let cases: Vec<(&str, Scalar)> = vec![
            ("(set x 14) (+ x 1)", Scalar::Int(15)),
            // x evaluates to 6, so the root is 6 * 3 * (6 * 2)
            ("(set x (+ 1 2 3)) (* x 3 (* x 2))", Scalar::Int(216)),
            ("(set x 2) (set y x) (+ y 0)", Scalar::Int(2)),
            // a set form is itself a value-producing node
            ("(+ (set a 2) 3)", Scalar::Int(5)),
            ("(set t '11:45:16') (+ t 0)", Scalar::Time(42_316_000_000)),
            // earlier non-set forms are compiled and run once, then dropped
            ("(+ 1 2) (+ 3 4)", Scalar::Int(7)),
        ];
        for (src, expected) in cases {
            assert_scalar(eval_source(src), expected, src);
        }
    }

    #[test]
    fn bound_variables_reevaluate_on_each_read() {
        let p = Parser::new();
        p.set_source("(set y (+ base 1)) (+ y 0)");
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(1));

        // rebinding the placeholder flows through y without recompiling
        p.add_variable("base", 10);
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(11));
    }

    #[test]
    fn placeholder_variables_can_be_filled_in_later() {
        let p = Parser::new();
        p.set_source("(* x x)");
        // unresolved identifiers evaluate as undefined
        assert!(p.evaluate().unwrap().is_undefined());

        p.add_variable("x", 5);
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(25));

        p.add_variable("x", 6);
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(36));
    }

    #[test]
    fn adopted_variables_keep_node_identity() {
        let p = Parser::new();
        p.set_source("(+ x 0)");
        p.evaluate().unwrap();

        p.adopt_variable(Variable::with_value("x", Scalar::from(7.5)));
        assert_eq!(p.evaluate().unwrap(), Scalar::Double(7.5));
        assert_eq!(p.variable("x"), Some(Scalar::Double(7.5)));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let p = Parser::new();
        p.set_source("(set x 5) (* x x)");
        let first = p.evaluate().unwrap();
        let second = p.evaluate().unwrap();
        assert_eq!(first, Scalar::Int(25));
        assert_eq!(first, second);
    }

    #[test]
    fn recompiling_the_same_source_is_deterministic() {
        let src = "(set x (+ 2 3)) (* x (+ x 1))";
        let p = Parser::new();
        p.set_source(src);
        let first = p.evaluate().unwrap();
        p.set_source(src);
        let second = p.evaluate().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Scalar::Int(30));
    }

    #[test]
    fn replacing_the_source_keeps_variables() {
        let p = Parser::new();
        p.set_source("(set x 9) (+ x 1)");
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(10));

        p.set_source("(+ x 2)");
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(11));
        assert_eq!(p.source(), "(+ x 2)");
    }

    #[test]
    fn default_environment_has_e_and_pi() {
        let p = Parser::new();
        let pi = p.variable("pi").unwrap();
        assert!((pi.eval_as_double() - 3.14159265).abs() < 1.0e-12);
        let e = p.variable("e").unwrap();
        assert!((e.eval_as_double() - 2.71828183).abs() < 1.0e-12);

        p.set_source("(* pi 2)");
        let tau = p.evaluate().unwrap();
        assert!(tau.is_double());
        assert!((tau.eval_as_double() - 6.2831853).abs() < 1.0e-7);
    }

    #[test]
    fn compile_errors_are_reported() {
        let cases: Vec<(&str, &str)> = vec![
            ("", "no '('"),
            ("+ 1 2", "no '('"),
            ("(1 2)", "literal cannot be the first element"),
            ("((+ 1 2) 3)", "expression cannot be the first element"),
            ("()", "needs a function name"),
            ("(set x 1 2)", "only a name and a single value"),
            ("(set (+ 1 2) 3)", "must be a variable name"),
            ("(set)", "requires a variable name"),
            ("(+ 1.2.3)", "double value"),
            ("(+ 1 2", "end of input"),
        ];
        for (src, text) in cases {
            let p = Parser::new();
            p.set_source(src);
            let err = p.evaluate().unwrap_err();
            assert!(
                matches!(err, Error::Syntax(_)),
                "'{src}' should be a syntax error, got {err:?}"
            );
            assert!(
                err.to_string().contains(text),
                "'{src}': error '{err}' should mention '{text}'"
            );
        }

        let p = Parser::new();
        p.set_source("(frobnicate 1 2)");
        assert_eq!(
            p.evaluate().unwrap_err(),
            Error::UnknownFunction("frobnicate".to_owned())
        );
    }

    #[test]
    fn failed_compiles_leave_the_environment_usable() {
        let p = Parser::new();
        p.add_variable("x", 5);
        p.set_source("(nosuch x)");
        assert!(p.evaluate().is_err());

        // prior state intact; fixing the source is enough
        assert_eq!(p.variable("x"), Some(Scalar::Int(5)));
        p.set_source("(+ x 1)");
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(6));
    }

    #[test]
    fn evaluation_anomalies_yield_undefined() {
        for src in ["(/ 10 0)", "(+ nothing)", "(max)", "(and missing)"] {
            let got = eval_source(src);
            assert!(got.is_undefined(), "'{src}' should be undefined, got {got}");
        }
    }

    #[test]
    fn removing_a_function_degrades_to_undefined() {
        let p = Parser::new();
        p.set_source("(+ 1 2)");
        p.compile().unwrap();
        assert!(p.remove_function("+"));
        assert!(p.evaluate().unwrap().is_undefined());

        // re-registering under the same name restores the tree
        p.add_function("+", Arc::new(Sum));
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(3));
    }

    #[test]
    fn timestamps_participate_in_arithmetic() {
        assert_eq!(
            eval_source("(min '11:45:16' '11:45:16.123456')"),
            Scalar::Time(42_316_000_000)
        );
        assert_eq!(
            eval_source("(- '11:45:16.123456' '11:45:16')"),
            Scalar::Time(123_456)
        );
    }

    #[test]
    fn clear_empties_everything() {
        let p = Parser::new();
        p.set_source("(+ 1 2)");
        p.evaluate().unwrap();

        p.clear();
        assert_eq!(p.source(), "");
        assert_eq!(p.variable("pi"), None);
        assert!(p.evaluate().is_err());
    }

    #[test]
    fn reset_restores_the_defaults() {
        let p = Parser::new();
        p.clear();
        p.reset();
        assert!(p.variable("pi").is_some());
        p.set_source("(max 1 2)");
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(2));
    }

    #[test]
    fn equal_parsers_hash_alike() {
        let make = || {
            let p = Parser::new();
            p.set_source("(+ x 1)");
            p.evaluate().unwrap();
            p
        };
        let a = make();
        let b = make();
        assert_eq!(a, b);
        assert_eq!(a.state_hash(), b.state_hash());

        b.add_variable("z", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn custom_functions_resolve_by_name_on_every_evaluation() {
        use crate::function::Args;

        struct Avg;

        impl Function for Avg {
            fn id(&self) -> &str {
                "avg"
            }

            fn evaluate(&self, args: &Args<'_>) -> Scalar {
                let mut count = 0u32;
                let mut sum = 0.0;
                for v in args.defined() {
                    count += 1;
                    sum += v.eval_as_double();
                }
                if count == 0 {
                    Scalar::Undefined
                } else {
                    Scalar::from(sum / count as f64)
                }
            }
        }

        let p = Parser::new();
        p.add_function("avg", Arc::new(Avg));
        p.set_source("(avg 1 2 3 6)");
        assert_eq!(p.evaluate().unwrap(), Scalar::Double(3.0));

        // replacing the registration under the same name redirects the
        // already-compiled tree
        p.add_function("avg", Arc::new(Max));
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(6));
    }

    #[test]
    fn concurrent_updates_are_observed_by_evaluations() {
        let p = Arc::new(Parser::new());
        p.set_source("(+ x x)");
        p.compile().unwrap();

        let writer = {
            let p = Arc::clone(&p);
            std::thread::spawn(move || {
                for i in 0..500 {
                    p.add_variable("x", i);
                }
            })
        };
        for _ in 0..500 {
            let v = p.evaluate().unwrap();
            // undefined until the first write lands, an integer afterwards
            assert!(v.is_undefined() || v.is_integer(), "got {v}");
        }
        writer.join().unwrap();

        p.add_variable("x", 3);
        assert_eq!(p.evaluate().unwrap(), Scalar::Int(6));
    }

    #[test]
    fn remove_variable_reports_existence() {
        let p = Parser::new();
        assert!(p.remove_variable("pi"));
        assert!(!p.remove_variable("pi"));
        assert_eq!(p.variable("pi"), None);
    }
}
