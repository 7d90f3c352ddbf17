//! LKit - an embeddable expression language with Lisp-style prefix syntax
//!
//! A host program hands a [`Parser`] some source text, the parser compiles it
//! into a tree of shared nodes, and the tree can then be evaluated repeatedly
//! and cheaply to produce a typed scalar result:
//!
//! ```
//! use lkit::Parser;
//!
//! let p = Parser::new();
//! p.set_source("(+ 1 2 3)");
//! assert_eq!(p.evaluate().unwrap().eval_as_int(), 6);
//! ```
//!
//! The language is intentionally small: four scalar types (bool, 32-bit int,
//! 64-bit double, microsecond timestamp), a fixed arithmetic / relational /
//! logical operator set, parser-scoped named variables, and nested
//! expressions:
//!
//! ```text
//! (set x (+ 1 2 3))
//! (* x 3 (* x 2))
//! ```
//!
//! ## Destination-typed arithmetic
//!
//! Arithmetic is *destination-typed*: the result of an operator takes the
//! type of its first operand, and every later operand is coerced into that
//! type before the operation runs. `(+ 10 5.5)` is the integer 15, while
//! `(+ 5.5 10)` is the double 15.5. This is a deliberate part of the
//! language, not an accident of implementation - see [`Scalar`] for the full
//! coercion rules.
//!
//! ## Variables
//!
//! `(set name value)` creates or updates a variable. When the value is a
//! nested expression, the variable keeps a reference to it and re-evaluates
//! it on every read. Identifiers that were never `set` become placeholder
//! variables holding the undefined scalar; the host can bind them through
//! [`Parser::add_variable`] before (or between) evaluations without
//! recompiling.
//!
//! ## Modules
//!
//! - [`scalar`]: the typed polymorphic scalar and its coercion rules
//! - [`variable`] / [`expression`]: the node types of the evaluation tree
//! - [`function`]: the operator trait and argument cursor
//! - [`builtins`]: the fixed built-in operator set
//! - [`parser`]: the parsing environment that owns every node
//! - [`timestamp`]: microsecond-epoch timestamp parsing and formatting

use thiserror::Error;

/// Maximum nesting depth accepted by the reader. Deeper input is rejected
/// with a syntax error rather than risking a parse-time stack overflow.
pub const MAX_PARSE_DEPTH: usize = 64;

/// Error type for compilation failures.
///
/// Evaluation itself never fails: runtime anomalies such as division by zero
/// or an all-undefined argument list produce undefined scalar results
/// instead of errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed source: missing parenthesis, a literal or nested expression
    /// where a function name is expected, an unparseable literal, a `set`
    /// form with too many elements, or nesting beyond [`MAX_PARSE_DEPTH`].
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The head of a form does not name a registered function. Functions
    /// must be registered before the source that uses them is compiled.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
}

/// Handle to a node owned by a [`Parser`].
///
/// Every constant, variable and sub-expression produced during compilation
/// lives in one of the parser's pools; the tree links them together with
/// these indices rather than with owning references. Handles stay valid
/// until the owning parser is cleared or reset, and re-registering a
/// variable under an existing name keeps its handle (and therefore every
/// compiled reference to it) intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// Index into the constant pool.
    Const(usize),
    /// Index into the variable table.
    Var(usize),
    /// Index into the sub-expression pool.
    Expr(usize),
}

pub mod builtins;
pub mod expression;
pub mod function;
pub mod parser;
pub mod scalar;
pub mod timestamp;
pub mod variable;

mod syntax;

pub use expression::Expression;
pub use function::{Args, Function, NodeEval};
pub use parser::Parser;
pub use scalar::{Scalar, ScalarKind};
pub use variable::Variable;
