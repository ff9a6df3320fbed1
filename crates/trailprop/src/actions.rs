//! Traits that encapsulate different sets of actions that can be performed at
//! different phases and by different objects in the solving process.

use crate::{
	solver::engine::{
		activation_list::IntPropCond,
		trail::{TrailedInt, TrailedSet},
	},
	Conflict, IntVal, IntView,
};

/// Actions that can be performed during the initialization of propagators.
pub trait InitializationActions: InspectionActions {
	/// Create a new trailed integer value with the given initial value.
	fn new_trailed_int(&mut self, init: IntVal) -> TrailedInt;

	/// Create a new trailed set that can contain the indices `0..capacity`.
	///
	/// If `full` is `true`, then the set initially contains all its possible
	/// members, otherwise it starts empty.
	fn new_trailed_set(&mut self, capacity: usize, full: bool) -> TrailedSet;

	/// Subscribe the propagator being initialized to changes of an integer view
	/// according to the given propagation condition.
	///
	/// The `data` is handed back to the propagator, through
	/// [`crate::Propagator::propagate_on_var`], when it is woken by the
	/// subscription. Propagators generally use it to store the position of the
	/// view in their scope. Subscriptions to constant views are ignored.
	fn subscribe_int(&mut self, var: IntView, condition: IntPropCond, data: u32);
}

/// Actions that can generally be performed when the solver is (partially)
/// initialized.
pub trait InspectionActions: TrailingActions {
	/// Get the minimum value that an integer view is guaranteed to take (given
	/// the current search decisions).
	fn get_int_lower_bound(&self, var: IntView) -> IntVal;

	/// Get the maximum value that an integer view is guaranteed to take (given
	/// the current search decisions).
	fn get_int_upper_bound(&self, var: IntView) -> IntVal;

	/// Convenience method to get both the lower and upper bounds of an integer
	/// view.
	fn get_int_bounds(&self, var: IntView) -> (IntVal, IntVal) {
		(self.get_int_lower_bound(var), self.get_int_upper_bound(var))
	}

	/// Get the current value of an integer view, if it has been assigned.
	fn get_int_val(&self, var: IntView) -> Option<IntVal> {
		let (lb, ub) = self.get_int_bounds(var);
		if lb == ub {
			Some(lb)
		} else {
			None
		}
	}

	/// Check whether a given integer view can take a given value (given the
	/// current search decisions).
	fn check_int_in_domain(&self, var: IntView, val: IntVal) -> bool;
}

/// Actions that can be performed during propagation.
///
/// All changes made through these actions are attributed to the propagator
/// that is currently running. The propagator is not woken again because of its
/// own changes.
pub trait PropagationActions: InspectionActions {
	/// Create a [`Conflict`] attributed to the running propagator, to signal
	/// that it has detected an inconsistency not caused by a specific domain
	/// becoming empty.
	fn conflict(&self) -> Conflict;

	/// Enforce that a an integer view takes a value that is greater or equal to
	/// `val`.
	///
	/// Returns whether the domain of the view changed.
	fn set_int_lower_bound(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict>;

	/// Enforce that a an integer view cannot take a value `val`.
	///
	/// Returns whether the domain of the view changed.
	fn set_int_not_eq(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict>;

	/// Enforce that a an integer view takes a value that is less or equal to
	/// `val`.
	///
	/// Returns whether the domain of the view changed.
	fn set_int_upper_bound(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict>;

	/// Enforce that a an integer view takes a value `val`.
	///
	/// Returns whether the domain of the view changed.
	fn set_int_val(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict>;

	/// Signal that the running propagator can no longer deduce anything in the
	/// current search branch.
	///
	/// The propagator will not be woken again until the solver backtracks to a
	/// decision level before the current one.
	fn set_passive(&mut self);
}

/// Basic actions that can be performed when the trailing infrastructure is
/// available.
pub trait TrailingActions {
	/// Add `delta` to the value of a [`TrailedInt`], returning the new value.
	fn add_trailed_int(&mut self, i: TrailedInt, delta: IntVal) -> IntVal {
		let v = self.get_trailed_int(i) + delta;
		let _ = self.set_trailed_int(i, v);
		v
	}
	/// Get the current value of a [`TrailedInt`].
	fn get_trailed_int(&self, i: TrailedInt) -> IntVal;
	/// Change the value of a [`TrailedInt`] in a way that can be undone if the
	/// solver backtracks to a previous state. Returns the previous value.
	fn set_trailed_int(&mut self, i: TrailedInt, v: IntVal) -> IntVal;
	/// Remove all members from a [`TrailedSet`].
	fn trailed_set_clear(&mut self, s: TrailedSet);
	/// Check whether `elem` is a member of a [`TrailedSet`].
	fn trailed_set_contains(&self, s: TrailedSet, elem: u32) -> bool;
	/// The current members of a [`TrailedSet`], in no particular order.
	fn trailed_set_elements(&self, s: TrailedSet) -> &[u32];
	/// Add `elem` to a [`TrailedSet`], returning whether it was not yet a member.
	fn trailed_set_insert(&mut self, s: TrailedSet, elem: u32) -> bool;
	/// The number of members of a [`TrailedSet`].
	fn trailed_set_len(&self, s: TrailedSet) -> usize;
	/// Remove `elem` from a [`TrailedSet`], returning whether it was a member.
	fn trailed_set_remove(&mut self, s: TrailedSet, elem: u32) -> bool;
}
