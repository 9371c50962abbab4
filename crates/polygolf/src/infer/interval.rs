//! Integer interval arithmetic.
//!
//! Each rule returns an interval containing every result of the operation
//! applied to values drawn from the operand intervals. Rules that cannot say
//! anything useful return the unbounded interval.

use crate::ir::{IntegerType, OpCode};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Largest exponent evaluated exactly when the base magnitude exceeds one.
const MAX_EXPONENT: u32 = 1 << 16;

/// Result interval of a binary integer opcode.
///
/// Returns `None` for opcodes that do not produce an integer from two
/// integers.
pub fn binary(op: OpCode, left: &IntegerType, right: &IntegerType) -> Option<IntegerType> {
    Some(match op {
        OpCode::Add => add(left, right),
        OpCode::Sub => sub(left, right),
        OpCode::Mul => hull_of_corners(left, right, |a, b| Some(a * b)),
        OpCode::Div => division(left, right, |a, b| a.div_floor(b)),
        OpCode::TruncDiv => division(left, right, |a, b| a / b),
        OpCode::Exp => exp(left, right),
        OpCode::Mod => modulo(left, right),
        OpCode::Rem => rem(right),
        OpCode::BitAnd | OpCode::BitOr | OpCode::BitXor => IntegerType::unbounded(),
        OpCode::Gcd => gcd(left, right),
        OpCode::Min => min(left, right),
        OpCode::Max => max(left, right),
        _ => return None,
    })
}

/// Result interval of a unary integer opcode.
pub fn unary(op: OpCode, arg: &IntegerType) -> Option<IntegerType> {
    Some(match op {
        OpCode::Neg => neg(arg),
        OpCode::BitNot => bit_not(arg),
        OpCode::Abs => abs(arg),
        _ => return None,
    })
}

fn add(left: &IntegerType, right: &IntegerType) -> IntegerType {
    IntegerType::new(
        both(left.low(), right.low(), |a, b| a + b),
        both(left.high(), right.high(), |a, b| a + b),
    )
}

fn sub(left: &IntegerType, right: &IntegerType) -> IntegerType {
    IntegerType::new(
        both(left.low(), right.high(), |a, b| a - b),
        both(left.high(), right.low(), |a, b| a - b),
    )
}

fn both(
    a: Option<&BigInt>,
    b: Option<&BigInt>,
    f: impl FnOnce(&BigInt, &BigInt) -> BigInt,
) -> Option<BigInt> {
    Some(f(a?, b?))
}

/// Convex hull of `f` at the four corners. Unbounded when any bound is
/// missing or `f` is undefined at a corner.
fn hull_of_corners(
    left: &IntegerType,
    right: &IntegerType,
    f: impl Fn(&BigInt, &BigInt) -> Option<BigInt>,
) -> IntegerType {
    let (Some((l1, h1)), Some((l2, h2))) = (left.bounds(), right.bounds()) else {
        return IntegerType::unbounded();
    };
    let corners = [f(l1, l2), f(l1, h2), f(h1, l2), f(h1, h2)];
    match corners.into_iter().collect::<Option<Vec<_>>>() {
        Some(values) => IntegerType::hull(values),
        None => IntegerType::unbounded(),
    }
}

/// Corner hull over the divisor's sign-constant parts. A zero bound makes
/// the quotient unbounded.
fn division(
    left: &IntegerType,
    right: &IntegerType,
    f: impl Fn(&BigInt, &BigInt) -> BigInt,
) -> IntegerType {
    let (Some((low, high)), Some((d_low, d_high))) = (left.bounds(), right.bounds()) else {
        return IntegerType::unbounded();
    };
    if d_low.is_zero() || d_high.is_zero() {
        return IntegerType::unbounded();
    }
    let mut divisors = vec![d_low.clone(), d_high.clone()];
    if d_low.is_negative() && d_high.is_positive() {
        divisors.extend([-BigInt::one(), BigInt::one()]);
    }
    IntegerType::hull(divisors.iter().flat_map(|d| [f(low, d), f(high, d)]))
}

fn exp(base: &IntegerType, exponent: &IntegerType) -> IntegerType {
    // Negative exponents have no integer result; only the non-negative part counts.
    let exponent = match exponent.low() {
        Some(low) if low.is_negative() => {
            if exponent.high().is_some_and(|h| h.is_negative()) {
                return IntegerType::unbounded();
            }
            IntegerType::new(Some(BigInt::zero()), exponent.high().cloned())
        }
        _ => exponent.clone(),
    };
    hull_of_corners(base, &exponent, |b, e| {
        let e = e.to_u32()?;
        if e > MAX_EXPONENT && b.abs() > BigInt::one() {
            return None;
        }
        Some(b.pow(e))
    })
}

/// Modulo takes the sign of the divisor.
fn modulo(left: &IntegerType, right: &IntegerType) -> IntegerType {
    let Some((d_low, d_high)) = right.bounds() else {
        return match left.bounds() {
            Some((low, high)) => symmetric(low.abs().max(high.abs())),
            None => IntegerType::unbounded(),
        };
    };
    if let Some((low, high)) = left.bounds() {
        if !low.is_negative() && d_low.is_positive() {
            if high < d_low {
                return left.clone();
            }
            let cap = (d_high - BigInt::one()).min(high.clone());
            return IntegerType::new(Some(BigInt::zero()), Some(cap));
        }
    }
    let mut values = vec![BigInt::zero()];
    if d_low.is_negative() {
        values.push(d_low + 1);
    }
    if d_high.is_positive() {
        values.push(d_high - 1);
    }
    IntegerType::hull(values)
}

/// Remainder takes the sign of the dividend.
fn rem(right: &IntegerType) -> IntegerType {
    match right.bounds() {
        Some((low, high)) => symmetric(low.abs().max(high.abs())),
        None => IntegerType::unbounded(),
    }
}

fn symmetric(m: BigInt) -> IntegerType {
    IntegerType::new(Some(-m.clone()), Some(m))
}

fn gcd(left: &IntegerType, right: &IntegerType) -> IntegerType {
    let (Some((l1, h1)), Some((l2, h2))) = (left.bounds(), right.bounds()) else {
        return IntegerType::new(Some(BigInt::one()), None);
    };
    let smallest = [l1, h1, l2, h2]
        .into_iter()
        .map(|x| x.abs())
        .min()
        .unwrap_or_else(BigInt::one);
    IntegerType::new(Some(BigInt::one()), Some(smallest.max(BigInt::one())))
}

fn min(left: &IntegerType, right: &IntegerType) -> IntegerType {
    let low = both(left.low(), right.low(), |a, b| a.min(b).clone());
    let high = match (left.high(), right.high()) {
        (Some(a), Some(b)) => Some(a.min(b).clone()),
        (a, b) => a.or(b).cloned(),
    };
    IntegerType::new(low, high)
}

fn max(left: &IntegerType, right: &IntegerType) -> IntegerType {
    let low = match (left.low(), right.low()) {
        (Some(a), Some(b)) => Some(a.max(b).clone()),
        (a, b) => a.or(b).cloned(),
    };
    let high = both(left.high(), right.high(), |a, b| a.max(b).clone());
    IntegerType::new(low, high)
}

fn neg(arg: &IntegerType) -> IntegerType {
    IntegerType::new(arg.high().map(|h| -h), arg.low().map(|l| -l))
}

/// `~x == -x - 1`
fn bit_not(arg: &IntegerType) -> IntegerType {
    IntegerType::new(arg.high().map(|h| -h - 1), arg.low().map(|l| -l - 1))
}

fn abs(arg: &IntegerType) -> IntegerType {
    match (arg.low(), arg.high()) {
        (Some(low), _) if !low.is_negative() => arg.clone(),
        (_, Some(high)) if !high.is_positive() => neg(arg),
        (low, high) => {
            let high = both(low, high, |l, h| l.abs().max(h.abs()));
            IntegerType::new(Some(BigInt::zero()), high)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn range(low: i64, high: i64) -> IntegerType {
        IntegerType::new(Some(low.into()), Some(high.into()))
    }

    fn at_least(low: i64) -> IntegerType {
        IntegerType::new(Some(low.into()), None)
    }

    #[test]
    fn test_add_and_sub() {
        assert_eq!(add(&range(1, 2), &range(10, 20)), range(11, 22));
        assert_eq!(sub(&range(1, 2), &range(10, 20)), range(-19, -8));
        assert_eq!(
            add(&at_least(0), &range(1, 1)),
            IntegerType::new(Some(1.into()), None)
        );
    }

    #[test]
    fn test_mul_uses_corner_hull() {
        assert_eq!(binary(OpCode::Mul, &range(-3, 2), &range(-5, 4)), Some(range(-12, 15)));
        assert_eq!(
            binary(OpCode::Mul, &at_least(0), &range(1, 2)),
            Some(IntegerType::unbounded())
        );
    }

    #[test]
    fn test_division_hull_spans_both_divisor_signs() {
        assert_eq!(
            binary(OpCode::Div, &range(0, 10), &range(-1, 1)),
            Some(range(-10, 10))
        );
        assert_eq!(
            binary(OpCode::TruncDiv, &range(0, 10), &range(-2, 5)),
            Some(range(-10, 10))
        );
        assert_eq!(
            binary(OpCode::Div, &range(0, 10), &range(0, 3)),
            Some(IntegerType::unbounded())
        );
        assert_eq!(binary(OpCode::Div, &range(-7, 7), &range(2, 2)), Some(range(-4, 3)));
        assert_eq!(binary(OpCode::TruncDiv, &range(-7, 7), &range(2, 2)), Some(range(-3, 3)));
    }

    #[test]
    fn test_exp_clamps_negative_exponent() {
        assert_eq!(binary(OpCode::Exp, &range(2, 3), &range(-2, 2)), Some(range(1, 9)));
        assert_eq!(
            binary(OpCode::Exp, &range(2, 3), &range(0, 1 << 20)),
            Some(IntegerType::unbounded())
        );
    }

    #[test]
    fn test_mod_keeps_dividend_already_in_range() {
        assert_eq!(modulo(&range(0, 9), &range(10, 10)), range(0, 9));
        assert_eq!(modulo(&range(0, 9), &range(1, 1000)), range(0, 9));
        assert_eq!(modulo(&range(3, 9), &range(1, 5)), range(0, 4));
    }

    #[test]
    fn test_mod_by_unbounded_divisor_is_symmetric() {
        assert_eq!(modulo(&range(0, 9), &IntegerType::unbounded()), range(-9, 9));
        assert_eq!(modulo(&range(5, 5), &IntegerType::unbounded()), range(-5, 5));
        assert_eq!(modulo(&range(0, 9), &at_least(1)), range(-9, 9));
        assert_eq!(
            modulo(&IntegerType::unbounded(), &IntegerType::unbounded()),
            IntegerType::unbounded()
        );
    }

    #[test]
    fn test_mod_widens_to_divisor() {
        assert_eq!(modulo(&IntegerType::unbounded(), &range(1, 10)), range(0, 9));
        assert_eq!(modulo(&range(-5, 5), &range(-4, 4)), range(-3, 3));
        assert_eq!(modulo(&range(-20, 5), &IntegerType::unbounded()), range(-20, 20));
    }

    #[test]
    fn test_rem_is_symmetric_in_divisor() {
        assert_eq!(rem(&range(-3, 7)), range(-7, 7));
        assert_eq!(rem(&at_least(1)), IntegerType::unbounded());
    }

    #[test]
    fn test_unary_rules() {
        assert_eq!(neg(&range(-2, 5)), range(-5, 2));
        assert_eq!(bit_not(&range(0, 3)), range(-4, -1));
        assert_eq!(abs(&range(-7, 3)), range(0, 7));
        assert_eq!(abs(&range(-7, -3)), range(3, 7));
        assert_eq!(
            neg(&at_least(4)),
            IntegerType::new(None, Some((-4).into()))
        );
    }

    #[test]
    fn test_gcd_and_min_max() {
        assert_eq!(gcd(&range(4, 12), &range(-6, 30)), range(1, 4));
        assert_eq!(gcd(&at_least(4), &range(1, 2)), at_least(1));
        assert_eq!(min(&range(0, 10), &at_least(5)), range(0, 10));
        assert_eq!(max(&range(0, 10), &at_least(5)), at_least(5));
    }

    #[test]
    fn test_bitwise_is_unbounded() {
        assert_eq!(
            binary(OpCode::BitXor, &range(0, 1), &range(0, 1)),
            Some(IntegerType::unbounded())
        );
        assert_eq!(binary(OpCode::Lt, &range(0, 1), &range(0, 1)), None);
    }

    proptest! {
        #[test]
        fn add_is_tight_hull_of_corner_sums(
            a in -1000i64..1000, b in 0i64..1000,
            c in -1000i64..1000, d in 0i64..1000,
        ) {
            let left = range(a, a + b);
            let right = range(c, c + d);
            let sum = add(&left, &right);
            prop_assert_eq!(sum.clone(), range(a + c, a + b + c + d));
            for x in [a, a + b] {
                for y in [c, c + d] {
                    prop_assert!(sum.contains_value(&BigInt::from(x + y)));
                }
            }
        }

        #[test]
        fn div_contains_every_quotient(
            a in -30i64..30, b in 0i64..15,
            c in -8i64..8, d in 0i64..8,
        ) {
            let quotient = binary(OpCode::Div, &range(a, a + b), &range(c, c + d)).unwrap();
            for x in a..=a + b {
                for y in (c..=c + d).filter(|&y| y != 0) {
                    prop_assert!(quotient.contains_value(&BigInt::from(x).div_floor(&BigInt::from(y))));
                }
            }
        }

        #[test]
        fn mod_contains_every_result_for_bounded_divisor(
            a in -30i64..30, b in 0i64..15,
            c in -8i64..8, d in 0i64..8,
        ) {
            let result = modulo(&range(a, a + b), &range(c, c + d));
            for x in a..=a + b {
                for y in (c..=c + d).filter(|&y| y != 0) {
                    prop_assert!(result.contains_value(&BigInt::from(x).mod_floor(&BigInt::from(y))));
                }
            }
        }

        #[test]
        fn mul_contains_every_product(
            a in -50i64..50, b in 0i64..20,
            c in -50i64..50, d in 0i64..20,
        ) {
            let product = binary(OpCode::Mul, &range(a, a + b), &range(c, c + d)).unwrap();
            for x in a..=a + b {
                for y in c..=c + d {
                    prop_assert!(product.contains_value(&BigInt::from(x * y)));
                }
            }
        }
    }
}
