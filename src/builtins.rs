//! The built-in operator set.
//!
//! These are the functions a freshly [reset] parser knows about: the
//! extremum pair `max`/`min`, the arithmetic folds `+ - * /`, the six
//! relations `== != < > <= >=`, and the logical operators `and`/`or`/`not`.
//!
//! All of them share the same argument discipline: a missing value is not an
//! error. Undefined arguments are skipped, an operator applied to nothing
//! valid yields the undefined scalar, and the arithmetic folds inherit the
//! destination-typed behaviour of [`Scalar`] - the first argument seeds the
//! fold and every later argument is coerced into its type.
//!
//! [reset]: crate::Parser::reset

use crate::function::{Args, Function};
use crate::scalar::Scalar;

/// `max` - the largest defined argument, by coercing comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl Function for Max {
    fn id(&self) -> &str {
        "max"
    }

    fn evaluate(&self, args: &Args<'_>) -> Scalar {
        let mut ans = Scalar::Undefined;
        for v in args.defined() {
            if ans.is_undefined() || v.coerced_gt(&ans) {
                ans = v;
            }
        }
        ans
    }
}

/// `min` - the smallest defined argument, by coercing comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

impl Function for Min {
    fn id(&self) -> &str {
        "min"
    }

    fn evaluate(&self, args: &Args<'_>) -> Scalar {
        let mut ans = Scalar::Undefined;
        for v in args.defined() {
            if ans.is_undefined() || v.coerced_lt(&ans) {
                ans = v;
            }
        }
        ans
    }
}

/// `+` - fold the arguments with `+=`, seeded by the first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl Function for Sum {
    fn id(&self) -> &str {
        "+"
    }

    fn evaluate(&self, args: &Args<'_>) -> Scalar {
        let mut values = args.values();
        let Some(mut ans) = values.next() else {
            return Scalar::Undefined;
        };
        for v in values {
            if !v.is_undefined() {
                ans += v;
            }
        }
        ans
    }
}

/// `-` - negate a sole argument, otherwise seed with the first argument and
/// fold the rest with `-=`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diff;

impl Function for Diff {
    fn id(&self) -> &str {
        "-"
    }

    fn evaluate(&self, args: &Args<'_>) -> Scalar {
        let mut values = args.values();
        let Some(first) = values.next() else {
            return Scalar::Undefined;
        };
        if args.len() == 1 {
            return first.negated();
        }
        let mut ans = first;
        for v in values {
            if !v.is_undefined() {
                ans -= v;
            }
        }
        ans
    }
}

/// `*` - fold the arguments with `*=`, seeded by the first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prod;

impl Function for Prod {
    fn id(&self) -> &str {
        "*"
    }

    fn evaluate(&self, args: &Args<'_>) -> Scalar {
        let mut values = args.values();
        let Some(mut ans) = values.next() else {
            return Scalar::Undefined;
        };
        for v in values {
            if !v.is_undefined() {
                ans *= v;
            }
        }
        ans
    }
}

/// `/` - fold the arguments with `/=`, seeded by the first one. Division by
/// a zero-valued argument clears the running result to undefined.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quot;

impl Function for Quot {
    fn id(&self) -> &str {
        "/"
    }

    fn evaluate(&self, args: &Args<'_>) -> Scalar {
        let mut values = args.values();
        let Some(mut ans) = values.next() else {
            return Scalar::Undefined;
        };
        for v in values {
            if !v.is_undefined() {
                ans /= v;
            }
        }
        ans
    }
}

/// Which relation a [`Comp`] instance applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
}

/// The comparison operators, distributed over consecutive argument pairs.
///
/// `==` holds when every later defined argument coerced-equals the first
/// one; `!=` holds when none does. The orderings chain with a moving pivot:
/// `(> 10 9 8)` checks `10 > 9` and then `9 > 8`. With no defined argument
/// the result is undefined, otherwise it is a boolean.
#[derive(Debug, Clone, Copy)]
pub struct Comp {
    op: CompOp,
}

impl Comp {
    pub fn new(op: CompOp) -> Self {
        Comp { op }
    }
}

impl Default for Comp {
    fn default() -> Self {
        Comp::new(CompOp::Equals)
    }
}

impl Function for Comp {
    fn id(&self) -> &str {
        match self.op {
            CompOp::Equals => "==",
            CompOp::NotEquals => "!=",
            CompOp::LessThan => "<",
            CompOp::GreaterThan => ">",
            CompOp::LessOrEqual => "<=",
            CompOp::GreaterOrEqual => ">=",
        }
    }

    fn evaluate(&self, args: &Args<'_>) -> Scalar {
        let mut values = args.defined();
        let Some(first) = values.next() else {
            return Scalar::Undefined;
        };
        let holds = match self.op {
            CompOp::Equals => values.all(|v| first.coerced_eq(&v)),
            CompOp::NotEquals => values.all(|v| !first.coerced_eq(&v)),
            CompOp::LessThan => chain(first, values, Scalar::coerced_lt),
            CompOp::GreaterThan => chain(first, values, Scalar::coerced_gt),
            CompOp::LessOrEqual => chain(first, values, Scalar::coerced_le),
            CompOp::GreaterOrEqual => chain(first, values, Scalar::coerced_ge),
        };
        Scalar::Bool(holds)
    }
}

/// Each successive value must satisfy the relation against the previous one.
fn chain(
    first: Scalar,
    values: impl Iterator<Item = Scalar>,
    rel: impl Fn(&Scalar, &Scalar) -> bool,
) -> bool {
    let mut prev = first;
    for v in values {
        if !rel(&prev, &v) {
            return false;
        }
        prev = v;
    }
    true
}

/// Which operation a [`Logic`] instance applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Not,
}

/// The logical operators.
///
/// `and` and `or` short-circuit: evaluation stops at the first defined
/// falsy (respectively truthy) argument and later arguments are never
/// evaluated. `not` negates its first defined argument. With no defined
/// argument the result is undefined.
#[derive(Debug, Clone, Copy)]
pub struct Logic {
    op: LogicOp,
}

impl Logic {
    pub fn new(op: LogicOp) -> Self {
        Logic { op }
    }
}

impl Default for Logic {
    fn default() -> Self {
        Logic::new(LogicOp::And)
    }
}

impl Function for Logic {
    fn id(&self) -> &str {
        match self.op {
            LogicOp::And => "and",
            LogicOp::Or => "or",
            LogicOp::Not => "not",
        }
    }

    fn evaluate(&self, args: &Args<'_>) -> Scalar {
        match self.op {
            LogicOp::And => {
                let mut any = false;
                for v in args.values() {
                    if v.is_undefined() {
                        continue;
                    }
                    if !v.eval_as_bool() {
                        return Scalar::Bool(false);
                    }
                    any = true;
                }
                if any { Scalar::Bool(true) } else { Scalar::Undefined }
            }
            LogicOp::Or => {
                let mut any = false;
                for v in args.values() {
                    if v.is_undefined() {
                        continue;
                    }
                    if v.eval_as_bool() {
                        return Scalar::Bool(true);
                    }
                    any = true;
                }
                if any { Scalar::Bool(false) } else { Scalar::Undefined }
            }
            LogicOp::Not => args
                .defined()
                .next()
                .map(|v| Scalar::Bool(!v.eval_as_bool()))
                .unwrap_or(Scalar::Undefined),
        }
    }
}
