//! Module containing the solution values that will be returned when when
//! inspecting a solution.

use rangelist::RangeList;

use crate::IntView;

/// Type alias for a set of integers parameter value.
pub type IntSetVal = RangeList<IntVal>;

/// Type alias for an parameter integer value.
pub type IntVal = i64;

/// A trait for a function that can be used to evaluate an [`IntView`] to its
/// value, which can be used when inspecting a solution.
pub trait Valuation: Fn(IntView) -> IntVal {}

impl<F: Fn(IntView) -> IntVal> Valuation for F {}
