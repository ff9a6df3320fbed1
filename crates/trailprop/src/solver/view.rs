//! The view module contains the types that are used to reference values in the
//! solver that can be expected as part of a solution, and are used internally
//! in propagators.

use crate::{solver::engine::int_var::IntVarRef, IntVal};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// A reference to a integer type value in the solver that can be expected as
/// part of a solution.
pub struct IntView(pub(crate) IntViewInner);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// The internal representation of [`IntView`].
///
/// Note that this representation is not meant to be exposed to the user.
pub(crate) enum IntViewInner {
	/// (Raw) Integer Variable
	/// Reference to location in the Engine's State
	VarRef(IntVarRef),
	/// Constant Integer Value
	Const(IntVal),
}

impl IntView {
	/// Returns the value of the view if it is a constant.
	pub fn as_const(&self) -> Option<IntVal> {
		match self.0 {
			IntViewInner::Const(c) => Some(c),
			IntViewInner::VarRef(_) => None,
		}
	}
}

impl From<IntVal> for IntView {
	fn from(value: IntVal) -> Self {
		Self(IntViewInner::Const(value))
	}
}
