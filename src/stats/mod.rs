//! Storage accounting over cell DAGs
//!
//! [`StorageStats`] is the counter pair `(bits, cells)`. [`collect`] walks a
//! cell and its descendants and sums those counters, either once per
//! distinct content hash (deduplicated) or once per reachable occurrence
//! (raw).

mod collector;

pub use collector::{collect, collect_deduplicated, collect_many, collect_raw, CollectOptions};

use dashu::integer::IBig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Bit and cell counters
///
/// Both counters are arbitrary precision and may go negative through
/// subtraction. Every operation returns a new value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StatsRepr", into = "StatsRepr")]
pub struct StorageStats {
    bits: IBig,
    cells: IBig,
}

/// Wire form: counters as decimal strings so no consumer rounds them
#[derive(Serialize, Deserialize)]
struct StatsRepr {
    bits: String,
    cells: String,
}

impl StorageStats {
    /// Create stats from any integer counters
    pub fn new(bits: impl Into<IBig>, cells: impl Into<IBig>) -> Self {
        StorageStats {
            bits: bits.into(),
            cells: cells.into(),
        }
    }

    /// Create stats with both counters at zero
    pub fn zero() -> Self {
        StorageStats {
            bits: IBig::ZERO,
            cells: IBig::ZERO,
        }
    }

    /// The contribution of a single counted cell
    pub fn single(bit_len: usize) -> Self {
        StorageStats::new(bit_len, 1u8)
    }

    /// Get the bit counter
    pub fn bits(&self) -> &IBig {
        &self.bits
    }

    /// Get the cell counter
    pub fn cells(&self) -> &IBig {
        &self.cells
    }

    pub fn is_zero(&self) -> bool {
        self.bits == IBig::ZERO && self.cells == IBig::ZERO
    }

    /// `self` plus every element of `others`, pairwise
    pub fn add_all<'a>(&self, others: impl IntoIterator<Item = &'a StorageStats>) -> Self {
        let mut out = self.clone();
        for s in others {
            out += s;
        }
        out
    }

    /// `self` minus every element of `others`, pairwise
    pub fn sub_all<'a>(&self, others: impl IntoIterator<Item = &'a StorageStats>) -> Self {
        let mut out = self.clone();
        for s in others {
            out -= s;
        }
        out
    }

    /// Copy with `n` added to the bit counter only
    pub fn add_bits(&self, n: impl Into<IBig>) -> Self {
        let n: IBig = n.into();
        StorageStats {
            bits: &self.bits + &n,
            cells: self.cells.clone(),
        }
    }

    /// Copy with `n` subtracted from the bit counter only
    pub fn sub_bits(&self, n: impl Into<IBig>) -> Self {
        let n: IBig = n.into();
        StorageStats {
            bits: &self.bits - &n,
            cells: self.cells.clone(),
        }
    }

    /// Copy with `n` added to the cell counter only
    pub fn add_cells(&self, n: impl Into<IBig>) -> Self {
        let n: IBig = n.into();
        StorageStats {
            cells: &self.cells + &n,
            bits: self.bits.clone(),
        }
    }

    /// Copy with `n` subtracted from the cell counter only
    pub fn sub_cells(&self, n: impl Into<IBig>) -> Self {
        let n: IBig = n.into();
        StorageStats {
            cells: &self.cells - &n,
            bits: self.bits.clone(),
        }
    }
}

impl Default for StorageStats {
    fn default() -> Self {
        StorageStats::zero()
    }
}

impl<'a> AddAssign<&'a StorageStats> for StorageStats {
    fn add_assign(&mut self, rhs: &'a StorageStats) {
        self.bits = &self.bits + &rhs.bits;
        self.cells = &self.cells + &rhs.cells;
    }
}

impl AddAssign for StorageStats {
    fn add_assign(&mut self, rhs: StorageStats) {
        *self += &rhs;
    }
}

impl<'a> SubAssign<&'a StorageStats> for StorageStats {
    fn sub_assign(&mut self, rhs: &'a StorageStats) {
        self.bits = &self.bits - &rhs.bits;
        self.cells = &self.cells - &rhs.cells;
    }
}

impl SubAssign for StorageStats {
    fn sub_assign(&mut self, rhs: StorageStats) {
        *self -= &rhs;
    }
}

impl Add for StorageStats {
    type Output = StorageStats;

    fn add(mut self, rhs: StorageStats) -> StorageStats {
        self += &rhs;
        self
    }
}

impl<'a> Add<&'a StorageStats> for &'a StorageStats {
    type Output = StorageStats;

    fn add(self, rhs: &'a StorageStats) -> StorageStats {
        self.add_all([rhs])
    }
}

impl Sub for StorageStats {
    type Output = StorageStats;

    fn sub(mut self, rhs: StorageStats) -> StorageStats {
        self -= &rhs;
        self
    }
}

impl<'a> Sub<&'a StorageStats> for &'a StorageStats {
    type Output = StorageStats;

    fn sub(self, rhs: &'a StorageStats) -> StorageStats {
        self.sub_all([rhs])
    }
}

impl Sum for StorageStats {
    fn sum<I: Iterator<Item = StorageStats>>(iter: I) -> Self {
        iter.fold(StorageStats::zero(), Add::add)
    }
}

impl<'a> Sum<&'a StorageStats> for StorageStats {
    fn sum<I: Iterator<Item = &'a StorageStats>>(iter: I) -> Self {
        StorageStats::zero().add_all(iter)
    }
}

impl From<StorageStats> for StatsRepr {
    fn from(s: StorageStats) -> Self {
        StatsRepr {
            bits: s.bits.to_string(),
            cells: s.cells.to_string(),
        }
    }
}

impl TryFrom<StatsRepr> for StorageStats {
    type Error = crate::Error;

    fn try_from(repr: StatsRepr) -> crate::Result<Self> {
        let parse = |field: &str, value: &str| {
            IBig::from_str(value)
                .map_err(|e| crate::Error::ParseStats(format!("{field} = {value:?}: {e}")))
        };
        Ok(StorageStats {
            bits: parse("bits", &repr.bits)?,
            cells: parse("cells", &repr.cells)?,
        })
    }
}

/// Renders as `{"bits":"<decimal>","cells":"<decimal>"}`
impl fmt::Display for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#"{{"bits":"{}","cells":"{}"}}"#, self.bits, self.cells)
    }
}

impl fmt::Debug for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageStats(bits={}, cells={})", self.bits, self.cells)
    }
}

/// Parses the rendered form back
impl FromStr for StorageStats {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let repr: StatsRepr =
            serde_json::from_str(s).map_err(|e| crate::Error::ParseStats(e.to_string()))?;
        StorageStats::try_from(repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stats(bits: i64, cells: i64) -> StorageStats {
        StorageStats::new(bits, cells)
    }

    #[test]
    fn test_default_is_zero() {
        let s = StorageStats::default();
        assert!(s.is_zero());
        assert_eq!(s.to_string(), r#"{"bits":"0","cells":"0"}"#);
    }

    #[test]
    fn test_add_all_many() {
        let total = stats(1, 1).add_all(&[stats(10, 2), stats(100, 3)]);
        assert_eq!(total, stats(111, 6));
    }

    #[test]
    fn test_add_all_none_is_copy() {
        let a = stats(7, 3);
        assert_eq!(a.add_all([]), a);
        assert_eq!(a.sub_all([]), a);
    }

    #[test]
    fn test_sub_goes_negative() {
        let s = stats(5, 1).sub_all(&[stats(10, 4)]);
        assert_eq!(s, stats(-5, -3));
        assert_eq!(s.to_string(), r#"{"bits":"-5","cells":"-3"}"#);
    }

    #[test]
    fn test_single_counter_adjustments() {
        let s = stats(10, 2);
        assert_eq!(s.add_bits(5u32), stats(15, 2));
        assert_eq!(s.sub_bits(20), stats(-10, 2));
        assert_eq!(s.add_cells(1u8), stats(10, 3));
        assert_eq!(s.sub_cells(IBig::from(2)), stats(10, 0));
        // inputs untouched
        assert_eq!(s, stats(10, 2));
    }

    #[test]
    fn test_exceeds_u64_without_loss() {
        let big = StorageStats::new(u64::MAX, u64::MAX).add_all(&[StorageStats::new(u64::MAX, 1u8)]);
        assert_eq!(
            big.to_string(),
            r#"{"bits":"36893488147419103230","cells":"18446744073709551616"}"#
        );
        let parsed: StorageStats = big.to_string().parse().unwrap();
        assert_eq!(parsed, big);
    }

    #[test]
    fn test_serde_uses_decimal_strings() {
        let json = serde_json::to_value(stats(1023, 4)).unwrap();
        assert_eq!(json, serde_json::json!({"bits": "1023", "cells": "4"}));

        let back: StorageStats = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats(1023, 4));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            r#"{"bits":"1x","cells":"0"}"#.parse::<StorageStats>(),
            Err(crate::Error::ParseStats(_))
        ));
        assert!("not json".parse::<StorageStats>().is_err());
        assert!(r#"{"bits":1,"cells":2}"#.parse::<StorageStats>().is_err());
    }

    #[test]
    fn test_sum() {
        let parts = vec![stats(1, 1), stats(2, 1), stats(3, 1)];
        let by_ref: StorageStats = parts.iter().sum();
        let by_val: StorageStats = parts.into_iter().sum();
        assert_eq!(by_ref, stats(6, 3));
        assert_eq!(by_val, by_ref);
    }

    proptest! {
        #[test]
        fn add_then_sub_is_identity(
            a in (any::<i64>(), any::<i64>()),
            b in (any::<i64>(), any::<i64>()),
        ) {
            let a = stats(a.0, a.1);
            let b = stats(b.0, b.1);
            prop_assert_eq!(a.add_all([&b]).sub_all([&b]), a.clone());
            prop_assert_eq!(&a + &b, &b + &a);
        }

        #[test]
        fn bits_and_cells_adjust_independently(
            a in (any::<i64>(), any::<i64>()),
            k in any::<i64>(),
        ) {
            let s = stats(a.0, a.1);
            prop_assert_eq!(s.add_bits(k).sub_bits(k), s.clone());
            prop_assert_eq!(s.add_cells(k).sub_cells(k), s.clone());
            let adjusted = s.add_bits(k);
            prop_assert_eq!(adjusted.cells(), s.cells());
            prop_assert_eq!(adjusted.bits() - s.bits(), IBig::from(k));
        }

        #[test]
        fn rendered_form_reparses(a in (any::<i64>(), any::<i64>())) {
            let s = stats(a.0, a.1);
            let text = s.to_string();
            let back: StorageStats = text.parse().unwrap();
            prop_assert_eq!(back.to_string(), text);
        }
    }
}
