//! The typed polymorphic scalar.
//!
//! [`Scalar`] is the value that flows through every corner of the language:
//! constants hold one, variables hold one, and every expression caches the
//! one produced by its last evaluation. A scalar is a tagged union over four
//! payload types plus the undefined state, and it is deliberately a plain
//! `Copy` value - the locking that protects shared mutation lives on the
//! nodes that own scalars, not on the scalar itself.
//!
//! ## Coercion
//!
//! Reading a scalar "as" some type follows fixed rules: booleans widen to
//! 1/0 (or 1.0/0.0), numbers are truthy when non-zero, int and double
//! convert by the usual widen/truncate, and timestamps reinterpret their
//! underlying 64-bit count. Undefined reads as `false`, `0`, `NaN` and `0`
//! respectively.
//!
//! ## Destination-typed arithmetic
//!
//! Compound assignment preserves the target's type: the source is coerced
//! into the target's type and the operation runs there. An undefined target
//! adopts the source on `+=` (and the negated source on `-=`), while `*=`
//! and `/=` leave it undefined. Division by a zero-valued source clears the
//! target back to undefined; boolean targets treat `+`/`-` as xor, `*` as
//! and, and `/` as xnor. The binary operators (`a + b` and friends) copy
//! `a` and apply the compound form, which is exactly why the first operand
//! decides the result type.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

/// The storage class currently held by a [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Undefined,
    Bool,
    Int,
    Double,
    Time,
}

/// A single typed value: undefined, boolean, 32-bit signed integer, 64-bit
/// float, or a 64-bit unsigned microsecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Scalar {
    /// No value. Arithmetic sources of this kind are inert, reads coerce to
    /// the neutral element of the requested type, and only another
    /// undefined scalar compares equal.
    #[default]
    Undefined,
    Bool(bool),
    Int(i32),
    Double(f64),
    /// Microseconds since the Unix epoch.
    Time(u64),
}

impl Scalar {
    /// The storage class currently held.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Undefined => ScalarKind::Undefined,
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Double(_) => ScalarKind::Double,
            Scalar::Time(_) => ScalarKind::Time,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Scalar::Undefined)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Scalar::Bool(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Scalar::Int(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Scalar::Double(_))
    }

    pub fn is_time(&self) -> bool {
        matches!(self, Scalar::Time(_))
    }

    /// Reset to the undefined state, dropping any stored value.
    pub fn clear(&mut self) {
        *self = Scalar::Undefined;
    }

    /// Coerce to a boolean. Numbers are truthy when non-zero; undefined is
    /// `false`.
    pub fn eval_as_bool(&self) -> bool {
        match *self {
            Scalar::Undefined => false,
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Double(d) => d != 0.0,
            Scalar::Time(t) => t != 0,
        }
    }

    /// Coerce to a 32-bit integer. Doubles truncate, timestamps reinterpret
    /// their low bits, and undefined is `0`.
    pub fn eval_as_int(&self) -> i32 {
        match *self {
            Scalar::Undefined => 0,
            Scalar::Bool(b) => b as i32,
            Scalar::Int(i) => i,
            Scalar::Double(d) => d as i32,
            Scalar::Time(t) => t as i32,
        }
    }

    /// Coerce to a double. Undefined is `NaN`.
    pub fn eval_as_double(&self) -> f64 {
        match *self {
            Scalar::Undefined => f64::NAN,
            Scalar::Bool(b) => b as i32 as f64,
            Scalar::Int(i) => i as f64,
            Scalar::Double(d) => d,
            Scalar::Time(t) => t as f64,
        }
    }

    /// Coerce to a timestamp count. Undefined is `0`.
    pub fn eval_as_time(&self) -> u64 {
        match *self {
            Scalar::Undefined => 0,
            Scalar::Bool(b) => b as u64,
            Scalar::Int(i) => i as i64 as u64,
            Scalar::Double(d) => d as u64,
            Scalar::Time(t) => t,
        }
    }

    /// The arithmetic negation of this scalar in its own type: `-n` for
    /// numbers, `!b` for booleans, wrapping negation for timestamps.
    pub fn negated(self) -> Scalar {
        match self {
            Scalar::Undefined => Scalar::Undefined,
            Scalar::Bool(b) => Scalar::Bool(!b),
            Scalar::Int(i) => Scalar::Int(i.wrapping_neg()),
            Scalar::Double(d) => Scalar::Double(-d),
            Scalar::Time(t) => Scalar::Time(t.wrapping_neg()),
        }
    }

    /// Equality after coercing `other` into this scalar's type.
    ///
    /// This is the comparison the `==` operator of the language performs.
    /// It is looser than [`PartialEq`], which requires matching types:
    /// `Int(1)` strictly differs from `Double(1.0)` but compares
    /// coerced-equal to it. An undefined scalar is coerced-equal only to
    /// another undefined scalar.
    pub fn coerced_eq(&self, other: &Scalar) -> bool {
        match *self {
            Scalar::Undefined => other.is_undefined(),
            Scalar::Bool(a) => !other.is_undefined() && a == other.eval_as_bool(),
            Scalar::Int(a) => !other.is_undefined() && a == other.eval_as_int(),
            Scalar::Double(a) => !other.is_undefined() && a == other.eval_as_double(),
            Scalar::Time(a) => !other.is_undefined() && a == other.eval_as_time(),
        }
    }

    /// Strict less-than after coercing `other` into this scalar's type.
    /// Every ordering involving an undefined scalar is `false`.
    pub fn coerced_lt(&self, other: &Scalar) -> bool {
        if other.is_undefined() {
            return false;
        }
        match *self {
            Scalar::Undefined => false,
            Scalar::Bool(a) => !a && other.eval_as_bool(),
            Scalar::Int(a) => a < other.eval_as_int(),
            Scalar::Double(a) => a < other.eval_as_double(),
            Scalar::Time(a) => a < other.eval_as_time(),
        }
    }

    /// Less-or-equal after coercing `other` into this scalar's type.
    /// Every ordering involving an undefined scalar is `false`.
    pub fn coerced_le(&self, other: &Scalar) -> bool {
        if other.is_undefined() {
            return false;
        }
        match *self {
            Scalar::Undefined => false,
            Scalar::Bool(a) => !a || other.eval_as_bool(),
            Scalar::Int(a) => a <= other.eval_as_int(),
            Scalar::Double(a) => a <= other.eval_as_double(),
            Scalar::Time(a) => a <= other.eval_as_time(),
        }
    }

    /// Strict greater-than after coercing `other` into this scalar's type.
    /// Every ordering involving an undefined scalar is `false`.
    pub fn coerced_gt(&self, other: &Scalar) -> bool {
        if other.is_undefined() {
            return false;
        }
        match *self {
            Scalar::Undefined => false,
            Scalar::Bool(a) => a && !other.eval_as_bool(),
            Scalar::Int(a) => a > other.eval_as_int(),
            Scalar::Double(a) => a > other.eval_as_double(),
            Scalar::Time(a) => a > other.eval_as_time(),
        }
    }

    /// Greater-or-equal after coercing `other` into this scalar's type.
    /// Every ordering involving an undefined scalar is `false`.
    pub fn coerced_ge(&self, other: &Scalar) -> bool {
        if other.is_undefined() {
            return false;
        }
        match *self {
            Scalar::Undefined => false,
            Scalar::Bool(a) => a || !other.eval_as_bool(),
            Scalar::Int(a) => a >= other.eval_as_int(),
            Scalar::Double(a) => a >= other.eval_as_double(),
            Scalar::Time(a) => a >= other.eval_as_time(),
        }
    }

    fn add_scalar(&mut self, rhs: Scalar) {
        match rhs {
            Scalar::Undefined => {}
            Scalar::Bool(b) => match *self {
                Scalar::Undefined => *self = Scalar::Bool(b),
                Scalar::Bool(a) => *self = Scalar::Bool(a ^ b),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_add(b as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d + b as i32 as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_add(b as u64)),
            },
            Scalar::Int(v) => match *self {
                Scalar::Undefined => *self = Scalar::Int(v),
                Scalar::Bool(a) => *self = Scalar::Bool((a as i32).wrapping_add(v) != 0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_add(v)),
                Scalar::Double(d) => *self = Scalar::Double(d + v as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_add(v as i64 as u64)),
            },
            Scalar::Double(v) => match *self {
                Scalar::Undefined => *self = Scalar::Double(v),
                Scalar::Bool(a) => *self = Scalar::Bool(a as i32 as f64 + v != 0.0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_add(v as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d + v),
                Scalar::Time(t) => *self = Scalar::Time((t as f64 + v) as u64),
            },
            Scalar::Time(v) => match *self {
                Scalar::Undefined => *self = Scalar::Time(v),
                Scalar::Bool(a) => *self = Scalar::Bool((a as u64).wrapping_add(v) != 0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_add(v as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d + v as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_add(v)),
            },
        }
    }

    fn sub_scalar(&mut self, rhs: Scalar) {
        match rhs {
            Scalar::Undefined => {}
            Scalar::Bool(b) => match *self {
                Scalar::Undefined => *self = Scalar::Bool(!b),
                Scalar::Bool(a) => *self = Scalar::Bool(a ^ b),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_sub(b as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d - b as i32 as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_sub(b as u64)),
            },
            Scalar::Int(v) => match *self {
                Scalar::Undefined => *self = Scalar::Int(v.wrapping_neg()),
                Scalar::Bool(a) => *self = Scalar::Bool((a as i32).wrapping_sub(v) != 0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_sub(v)),
                Scalar::Double(d) => *self = Scalar::Double(d - v as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_sub(v as i64 as u64)),
            },
            Scalar::Double(v) => match *self {
                Scalar::Undefined => *self = Scalar::Double(-v),
                Scalar::Bool(a) => *self = Scalar::Bool(a as i32 as f64 - v != 0.0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_sub(v as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d - v),
                Scalar::Time(t) => *self = Scalar::Time((t as f64 - v) as u64),
            },
            Scalar::Time(v) => match *self {
                Scalar::Undefined => *self = Scalar::Time(v.wrapping_neg()),
                Scalar::Bool(a) => *self = Scalar::Bool((a as u64).wrapping_sub(v) != 0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_sub(v as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d - v as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_sub(v)),
            },
        }
    }

    fn mul_scalar(&mut self, rhs: Scalar) {
        match rhs {
            Scalar::Undefined => {}
            Scalar::Bool(b) => match *self {
                Scalar::Undefined => {}
                Scalar::Bool(a) => *self = Scalar::Bool(a && b),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_mul(b as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d * b as i32 as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_mul(b as u64)),
            },
            Scalar::Int(v) => match *self {
                Scalar::Undefined => {}
                Scalar::Bool(a) => *self = Scalar::Bool(a && v != 0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_mul(v)),
                Scalar::Double(d) => *self = Scalar::Double(d * v as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_mul(v as i64 as u64)),
            },
            Scalar::Double(v) => match *self {
                Scalar::Undefined => {}
                Scalar::Bool(a) => *self = Scalar::Bool(a && v != 0.0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_mul(v as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d * v),
                Scalar::Time(t) => *self = Scalar::Time((t as f64 * v) as u64),
            },
            Scalar::Time(v) => match *self {
                Scalar::Undefined => {}
                Scalar::Bool(a) => *self = Scalar::Bool(a && v != 0),
                Scalar::Int(i) => *self = Scalar::Int(i.wrapping_mul(v as i32)),
                Scalar::Double(d) => *self = Scalar::Double(d * v as f64),
                Scalar::Time(t) => *self = Scalar::Time(t.wrapping_mul(v)),
            },
        }
    }

    fn div_scalar(&mut self, rhs: Scalar) {
        match rhs {
            // Undefined-in, undefined-out.
            Scalar::Undefined => self.clear(),
            Scalar::Bool(b) => match *self {
                Scalar::Undefined => {}
                Scalar::Bool(a) => *self = Scalar::Bool(!(a ^ b)),
                Scalar::Int(_) | Scalar::Double(_) | Scalar::Time(_) => {
                    // division by true is division by one
                    if !b {
                        self.clear();
                    }
                }
            },
            Scalar::Int(v) => match *self {
                Scalar::Undefined => {}
                Scalar::Bool(a) => {
                    if v == 0 {
                        self.clear();
                    } else {
                        *self = Scalar::Bool((a as i32).wrapping_div(v) != 0);
                    }
                }
                Scalar::Int(i) => {
                    if v == 0 {
                        self.clear();
                    } else {
                        *self = Scalar::Int(i.wrapping_div(v));
                    }
                }
                Scalar::Double(d) => {
                    if v == 0 {
                        self.clear();
                    } else {
                        *self = Scalar::Double(d / v as f64);
                    }
                }
                Scalar::Time(t) => {
                    if v == 0 {
                        self.clear();
                    } else {
                        *self = Scalar::Time(t.wrapping_div(v as i64 as u64));
                    }
                }
            },
            Scalar::Double(v) => match *self {
                Scalar::Undefined => {}
                Scalar::Bool(a) => {
                    if v == 0.0 {
                        self.clear();
                    } else {
                        *self = Scalar::Bool(a as i32 as f64 / v != 0.0);
                    }
                }
                Scalar::Int(i) => {
                    if v == 0.0 {
                        self.clear();
                    } else {
                        *self = Scalar::Int((i as f64 / v) as i32);
                    }
                }
                Scalar::Double(d) => {
                    if v == 0.0 {
                        self.clear();
                    } else {
                        *self = Scalar::Double(d / v);
                    }
                }
                Scalar::Time(t) => {
                    if v == 0.0 {
                        self.clear();
                    } else {
                        *self = Scalar::Time((t as f64 / v) as u64);
                    }
                }
            },
            Scalar::Time(v) => match *self {
                Scalar::Undefined => {}
                Scalar::Bool(a) => {
                    if v == 0 {
                        self.clear();
                    } else {
                        *self = Scalar::Bool((a as u64).wrapping_div(v) != 0);
                    }
                }
                Scalar::Int(i) => {
                    if v == 0 {
                        self.clear();
                    } else {
                        *self = Scalar::Int(((i as i64 as u64).wrapping_div(v)) as i32);
                    }
                }
                Scalar::Double(d) => {
                    if v == 0 {
                        self.clear();
                    } else {
                        *self = Scalar::Double(d / v as f64);
                    }
                }
                Scalar::Time(t) => {
                    if v == 0 {
                        self.clear();
                    } else {
                        *self = Scalar::Time(t.wrapping_div(v));
                    }
                }
            },
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Double(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::Time(v)
    }
}

impl<T: Into<Scalar>> AddAssign<T> for Scalar {
    fn add_assign(&mut self, rhs: T) {
        self.add_scalar(rhs.into());
    }
}

impl<T: Into<Scalar>> SubAssign<T> for Scalar {
    fn sub_assign(&mut self, rhs: T) {
        self.sub_scalar(rhs.into());
    }
}

impl<T: Into<Scalar>> MulAssign<T> for Scalar {
    fn mul_assign(&mut self, rhs: T) {
        self.mul_scalar(rhs.into());
    }
}

impl<T: Into<Scalar>> DivAssign<T> for Scalar {
    fn div_assign(&mut self, rhs: T) {
        self.div_scalar(rhs.into());
    }
}

impl<T: Into<Scalar>> Add<T> for Scalar {
    type Output = Scalar;

    fn add(mut self, rhs: T) -> Scalar {
        self += rhs;
        self
    }
}

impl<T: Into<Scalar>> Sub<T> for Scalar {
    type Output = Scalar;

    fn sub(mut self, rhs: T) -> Scalar {
        self -= rhs;
        self
    }
}

impl<T: Into<Scalar>> Mul<T> for Scalar {
    type Output = Scalar;

    fn mul(mut self, rhs: T) -> Scalar {
        self *= rhs;
        self
    }
}

impl<T: Into<Scalar>> Div<T> for Scalar {
    type Output = Scalar;

    fn div(mut self, rhs: T) -> Scalar {
        self /= rhs;
        self
    }
}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            // fixed sentinel so every undefined scalar hashes alike
            Scalar::Undefined => state.write_u64(0),
            Scalar::Bool(b) => {
                state.write_u8(1);
                b.hash(state);
            }
            Scalar::Int(i) => {
                state.write_u8(2);
                i.hash(state);
            }
            Scalar::Double(d) => {
                state.write_u8(3);
                // normalise the two zeroes, which compare equal
                let d = if *d == 0.0 { 0.0 } else { *d };
                d.to_bits().hash(state);
            }
            Scalar::Time(t) => {
                state.write_u8(4);
                t.hash(state);
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Undefined => write!(f, "(undefined)"),
            Scalar::Bool(b) => write!(f, "(bool) {b}"),
            Scalar::Int(i) => write!(f, "(int) {i}"),
            Scalar::Double(d) => write!(f, "(double) {d}"),
            Scalar::Time(t) => write!(f, "(time) {t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_and_reports_each_type() {
        let cases = [
            (Scalar::default(), ScalarKind::Undefined),
            (Scalar::from(true), ScalarKind::Bool),
            (Scalar::from(10), ScalarKind::Int),
            (Scalar::from(10.11), ScalarKind::Double),
            (Scalar::from(123_123_123u64), ScalarKind::Time),
        ];
        for (v, kind) in cases {
            assert_eq!(v.kind(), kind, "{v}");
        }
        assert!(Scalar::default().is_undefined());
        assert!(Scalar::from(10).is_integer());
        assert!(Scalar::from(10.11).is_double());
        assert!(Scalar::from(1u64).is_time());
        assert!(Scalar::from(false).is_bool());
    }

    #[test]
    fn integer_compound_assignment() {
        let mut v = Scalar::from(10);
        v += 5;
        assert_eq!(v, Scalar::Int(15));
        v *= 3;
        assert_eq!(v, Scalar::Int(45));
        v -= 5;
        assert_eq!(v, Scalar::Int(40));
        v /= 10;
        assert_eq!(v, Scalar::Int(4));
    }

    #[test]
    fn double_compound_assignment() {
        let mut v = Scalar::from(10.10);
        v += 5.10;
        assert!((v.eval_as_double() - 15.20).abs() < 1.0e-6);
        v *= 3.0;
        assert!((v.eval_as_double() - 45.60).abs() < 1.0e-6);
        v -= 5.20;
        assert!((v.eval_as_double() - 40.40).abs() < 1.0e-6);
        v /= 10.0;
        assert!((v.eval_as_double() - 4.04).abs() < 1.0e-6);
    }

    #[test]
    fn first_operand_decides_the_type() {
        // int target truncates each double source before the operation
        let mut int_first = Scalar::from(10);
        for source in [5.5, 3.14, 6.2] {
            int_first += source;
        }
        assert_eq!(int_first, Scalar::Int(24));

        let mut double_first = Scalar::from(5.5);
        double_first += 10;
        double_first += 3.14;
        double_first += 6.2;
        assert!((double_first.eval_as_double() - 24.84).abs() < 1.0e-9);
        assert_eq!(double_first.kind(), ScalarKind::Double);
    }

    #[test]
    fn undefined_target_adopts_on_add_and_sub() {
        let mut v = Scalar::Undefined;
        v += 7;
        assert_eq!(v, Scalar::Int(7));

        let mut v = Scalar::Undefined;
        v -= 7;
        assert_eq!(v, Scalar::Int(-7));

        let mut v = Scalar::Undefined;
        v -= 2.5;
        assert_eq!(v, Scalar::Double(-2.5));

        let mut v = Scalar::Undefined;
        v -= true;
        assert_eq!(v, Scalar::Bool(false));
    }

    #[test]
    fn undefined_target_ignores_mul_and_div() {
        let mut v = Scalar::Undefined;
        v *= 7;
        assert!(v.is_undefined());
        v /= 7;
        assert!(v.is_undefined());
    }

    #[test]
    fn undefined_source_is_inert_except_for_division() {
        for op in ["+", "-", "*"] {
            let mut v = Scalar::from(9);
            match op {
                "+" => v += Scalar::Undefined,
                "-" => v -= Scalar::Undefined,
                _ => v *= Scalar::Undefined,
            }
            assert_eq!(v, Scalar::Int(9), "op {op}");
        }
        let mut v = Scalar::from(9);
        v /= Scalar::Undefined;
        assert!(v.is_undefined());
    }

    #[test]
    fn division_by_zero_clears() {
        let mut v = Scalar::from(9);
        v /= 0;
        assert!(v.is_undefined());

        let mut v = Scalar::from(9.0);
        v /= 0.0;
        assert!(v.is_undefined());

        let mut v = Scalar::from(100u64);
        v /= 0;
        assert!(v.is_undefined());

        // bool / bool is xnor, never a clearing division
        let mut v = Scalar::from(true);
        v /= false;
        assert_eq!(v, Scalar::Bool(false));
        let mut v = Scalar::from(false);
        v /= false;
        assert_eq!(v, Scalar::Bool(true));
    }

    #[test]
    fn bool_arithmetic_is_xor_and_xnor() {
        let mut v = Scalar::from(true);
        v += true;
        assert_eq!(v, Scalar::Bool(false));
        v -= true;
        assert_eq!(v, Scalar::Bool(true));
        v *= false;
        assert_eq!(v, Scalar::Bool(false));
    }

    #[test]
    fn binary_operators_copy_the_left_operand() {
        let a = Scalar::from(10);
        let b = Scalar::from(4.0);
        assert_eq!(a + b, Scalar::Int(14));
        assert_eq!(a - b, Scalar::Int(6));
        assert_eq!(a * b, Scalar::Int(40));
        assert_eq!(a / b, Scalar::Int(2));
        // the left operand is untouched
        assert_eq!(a, Scalar::Int(10));
    }

    #[test]
    fn coercion_reads() {
        let cases: Vec<(Scalar, bool, i32, f64, u64)> = vec![
            (Scalar::from(true), true, 1, 1.0, 1),
            (Scalar::from(false), false, 0, 0.0, 0),
            (Scalar::from(-3), true, -3, -3.0, (-3i64) as u64),
            (Scalar::from(2.9), true, 2, 2.9, 2),
            (Scalar::from(42u64), true, 42, 42.0, 42),
            (Scalar::from(0), false, 0, 0.0, 0),
        ];
        for (v, b, i, d, t) in cases {
            assert_eq!(v.eval_as_bool(), b, "{v} as bool");
            assert_eq!(v.eval_as_int(), i, "{v} as int");
            assert_eq!(v.eval_as_double(), d, "{v} as double");
            assert_eq!(v.eval_as_time(), t, "{v} as time");
        }
        let u = Scalar::Undefined;
        assert!(!u.eval_as_bool());
        assert_eq!(u.eval_as_int(), 0);
        assert!(u.eval_as_double().is_nan());
        assert_eq!(u.eval_as_time(), 0);
    }

    #[test]
    fn coerced_comparisons_follow_the_left_type() {
        let one = Scalar::from(1);
        assert!(one.coerced_eq(&Scalar::from(1.0)));
        // truncation happens before the compare
        assert!(one.coerced_eq(&Scalar::from(1.5)));
        assert!(!Scalar::from(1.5).coerced_eq(&one));

        assert!(Scalar::from(2).coerced_gt(&Scalar::from(1.9)));
        assert!(Scalar::from(1.9).coerced_lt(&Scalar::from(2)));
        assert!(Scalar::from(5).coerced_le(&Scalar::from(5u64)));
        assert!(Scalar::from(false).coerced_lt(&Scalar::from(true)));
    }

    #[test]
    fn undefined_compares_equal_only_to_undefined() {
        let u = Scalar::Undefined;
        assert!(u.coerced_eq(&Scalar::Undefined));
        assert!(!u.coerced_eq(&Scalar::from(0)));
        assert!(!Scalar::from(0).coerced_eq(&u));
        for v in [Scalar::from(1), Scalar::Undefined] {
            assert!(!u.coerced_lt(&v));
            assert!(!u.coerced_le(&v));
            assert!(!u.coerced_gt(&v));
            assert!(!u.coerced_ge(&v));
            assert!(!v.coerced_lt(&u));
        }
    }

    #[test]
    fn strict_equality_requires_matching_types() {
        assert_ne!(Scalar::from(1), Scalar::from(1.0));
        assert_ne!(Scalar::from(1), Scalar::from(true));
        assert_ne!(Scalar::from(0), Scalar::Undefined);
        assert_eq!(Scalar::Undefined, Scalar::Undefined);
        assert_eq!(Scalar::from(3.5), Scalar::from(3.5));
    }

    fn hash_of(v: &Scalar) -> u64 {
        use std::hash::{DefaultHasher, Hasher as _};
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn equal_scalars_hash_alike() {
        assert_eq!(hash_of(&Scalar::Undefined), hash_of(&Scalar::Undefined));
        assert_eq!(hash_of(&Scalar::from(0.0)), hash_of(&Scalar::from(-0.0)));
        assert_eq!(hash_of(&Scalar::from(7)), hash_of(&Scalar::from(7)));
        assert_ne!(hash_of(&Scalar::from(0)), hash_of(&Scalar::from(false)));
    }

    #[test]
    fn clear_resets_to_undefined() {
        let mut v = Scalar::from(12);
        v.clear();
        assert!(v.is_undefined());
        assert_eq!(v, Scalar::default());
    }

    #[test]
    fn display_includes_the_type() {
        assert_eq!(Scalar::from(6).to_string(), "(int) 6");
        assert_eq!(Scalar::from(true).to_string(), "(bool) true");
        assert_eq!(Scalar::from(1.5).to_string(), "(double) 1.5");
        assert_eq!(Scalar::from(42u64).to_string(), "(time) 42");
        assert_eq!(Scalar::Undefined.to_string(), "(undefined)");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn scalar() -> impl Strategy<Value = Scalar> {
            prop_oneof![
                Just(Scalar::Undefined),
                any::<bool>().prop_map(Scalar::Bool),
                any::<i32>().prop_map(Scalar::Int),
                any::<f64>().prop_map(Scalar::Double),
                any::<u64>().prop_map(Scalar::Time),
            ]
        }

        proptest! {
            #[test]
            fn equal_implies_equal_hash(a in scalar(), b in scalar()) {
                if a == b {
                    prop_assert_eq!(hash_of(&a), hash_of(&b));
                }
            }

            #[test]
            fn defined_target_keeps_its_kind(a in scalar(), b in scalar()) {
                prop_assume!(!a.is_undefined());
                for result in [a + b, a - b, a * b] {
                    prop_assert_eq!(result.kind(), a.kind());
                }
                // division may clear to undefined, but never changes type
                let quot = a / b;
                prop_assert!(quot.is_undefined() || quot.kind() == a.kind());
            }

            #[test]
            fn same_type_round_trips(i in any::<i32>(), d in any::<f64>(), t in any::<u64>()) {
                prop_assert_eq!(Scalar::from(Scalar::from(i).eval_as_int()), Scalar::from(i));
                prop_assert_eq!(Scalar::from(Scalar::from(t).eval_as_time()), Scalar::from(t));
                let rt = Scalar::from(Scalar::from(d).eval_as_double());
                prop_assert!(rt.coerced_eq(&Scalar::from(d)) || d.is_nan());
            }

            #[test]
            fn undefined_source_never_disturbs_add(a in scalar()) {
                let mut v = a;
                v += Scalar::Undefined;
                prop_assert_eq!(v.kind(), a.kind());
                prop_assert_eq!(hash_of(&v), hash_of(&a));
            }
        }
    }
}
