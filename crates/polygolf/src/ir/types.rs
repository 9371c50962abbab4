//! Value types used by type inference.
//!
//! Integers carry an inclusive interval; either bound may be absent, meaning
//! unbounded in that direction. Integer types form a lattice ordered by
//! interval inclusion.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of the value a node evaluates to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueType {
    Integer(IntegerType),
    Text,
    Boolean,
    Void,
    List {
        member: Box<ValueType>,
    },
    Array {
        member: Box<ValueType>,
        length: usize,
    },
    Set {
        member: Box<ValueType>,
    },
    Table {
        key: Box<ValueType>,
        value: Box<ValueType>,
    },
}

impl ValueType {
    /// Integer with no known bounds.
    pub fn int() -> Self {
        ValueType::Integer(IntegerType::unbounded())
    }

    /// Integer in `[low, high]`.
    pub fn int_range(low: impl Into<BigInt>, high: impl Into<BigInt>) -> Self {
        ValueType::Integer(IntegerType::new(Some(low.into()), Some(high.into())))
    }

    pub fn list(member: ValueType) -> Self {
        ValueType::List {
            member: Box::new(member),
        }
    }

    pub fn array(member: ValueType, length: usize) -> Self {
        ValueType::Array {
            member: Box::new(member),
            length,
        }
    }

    pub fn set(member: ValueType) -> Self {
        ValueType::Set {
            member: Box::new(member),
        }
    }

    pub fn table(key: ValueType, value: ValueType) -> Self {
        ValueType::Table {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn as_integer(&self) -> Option<&IntegerType> {
        match self {
            ValueType::Integer(int) => Some(int),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Integer(int) => write!(f, "{int}"),
            ValueType::Text => f.write_str("text"),
            ValueType::Boolean => f.write_str("boolean"),
            ValueType::Void => f.write_str("void"),
            ValueType::List { member } => write!(f, "List<{member}>"),
            ValueType::Array { member, length } => write!(f, "Array<{member}, {length}>"),
            ValueType::Set { member } => write!(f, "Set<{member}>"),
            ValueType::Table { key, value } => write!(f, "Table<{key}, {value}>"),
        }
    }
}

/// Inclusive integer interval. `None` means unbounded on that side.
///
/// Invariant: `low <= high` whenever both bounds are present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntegerType {
    #[serde(default, with = "crate::ir::bigint_serde::option")]
    low: Option<BigInt>,
    #[serde(default, with = "crate::ir::bigint_serde::option")]
    high: Option<BigInt>,
}

impl IntegerType {
    pub fn new(low: Option<BigInt>, high: Option<BigInt>) -> Self {
        if let (Some(l), Some(h)) = (&low, &high) {
            debug_assert!(l <= h, "integer interval with low {l} > high {h}");
        }
        Self { low, high }
    }

    /// The whole of ℤ.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The single value `value`.
    pub fn exact(value: impl Into<BigInt>) -> Self {
        let value = value.into();
        Self {
            low: Some(value.clone()),
            high: Some(value),
        }
    }

    /// Smallest interval containing every value in `values`.
    ///
    /// Returns the unbounded interval for an empty input.
    pub fn hull(values: impl IntoIterator<Item = BigInt>) -> Self {
        let mut low: Option<BigInt> = None;
        let mut high: Option<BigInt> = None;
        for value in values {
            if low.as_ref().is_none_or(|l| &value < l) {
                low = Some(value.clone());
            }
            if high.as_ref().is_none_or(|h| &value > h) {
                high = Some(value);
            }
        }
        Self { low, high }
    }

    pub fn low(&self) -> Option<&BigInt> {
        self.low.as_ref()
    }

    pub fn high(&self) -> Option<&BigInt> {
        self.high.as_ref()
    }

    /// Both bounds, when both are known.
    pub fn bounds(&self) -> Option<(&BigInt, &BigInt)> {
        Some((self.low.as_ref()?, self.high.as_ref()?))
    }

    pub fn is_finite(&self) -> bool {
        self.low.is_some() && self.high.is_some()
    }

    /// The only inhabitant, if the interval is a single value.
    pub fn singleton(&self) -> Option<&BigInt> {
        match (&self.low, &self.high) {
            (Some(l), Some(h)) if l == h => Some(l),
            _ => None,
        }
    }

    pub fn contains_value(&self, value: &BigInt) -> bool {
        self.low.as_ref().is_none_or(|l| l <= value) && self.high.as_ref().is_none_or(|h| value <= h)
    }

    /// Lattice order: `other` lies entirely inside `self`.
    pub fn contains(&self, other: &IntegerType) -> bool {
        let low_ok = match (&self.low, &other.low) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a <= b,
        };
        let high_ok = match (&self.high, &other.high) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => b <= a,
        };
        low_ok && high_ok
    }

    /// Least upper bound of two intervals.
    pub fn union(&self, other: &IntegerType) -> IntegerType {
        let low = match (&self.low, &other.low) {
            (Some(a), Some(b)) => Some(a.min(b).clone()),
            _ => None,
        };
        let high = match (&self.high, &other.high) {
            (Some(a), Some(b)) => Some(a.max(b).clone()),
            _ => None,
        };
        IntegerType { low, high }
    }
}

impl fmt::Display for IntegerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.low {
            Some(low) => write!(f, "{low}")?,
            None => f.write_str("-oo")?,
        }
        f.write_str("..")?;
        match &self.high {
            Some(high) => write!(f, "{high}"),
            None => f.write_str("oo"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_of_values() {
        let hull = IntegerType::hull([3, -2, 7, 0].map(BigInt::from));
        assert_eq!(hull, IntegerType::new(Some((-2).into()), Some(7.into())));
    }

    #[test]
    fn test_contains_follows_interval_inclusion() {
        let wide = IntegerType::new(Some(0.into()), None);
        let narrow = IntegerType::new(Some(3.into()), Some(9.into()));
        assert!(wide.contains(&narrow));
        assert!(!narrow.contains(&wide));
        assert!(IntegerType::unbounded().contains(&wide));
    }

    #[test]
    fn test_singleton() {
        assert_eq!(IntegerType::exact(5).singleton(), Some(&BigInt::from(5)));
        assert_eq!(IntegerType::unbounded().singleton(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueType::int_range(0, 9).to_string(), "0..9");
        assert_eq!(ValueType::int().to_string(), "-oo..oo");
        assert_eq!(
            ValueType::table(ValueType::Text, ValueType::list(ValueType::Boolean)).to_string(),
            "Table<text, List<boolean>>"
        );
    }

    #[test]
    fn test_serde_integer_bounds_are_strings() {
        let json = serde_json::to_value(ValueType::int_range(-1, 10)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "integer", "low": "-1", "high": "10" })
        );
        let back: ValueType = serde_json::from_value(json).unwrap();
        assert_eq!(back, ValueType::int_range(-1, 10));
    }
}
