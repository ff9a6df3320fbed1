//! Module containing the context in which propagators are posted to the
//! solver.

use delegate::delegate;
use tracing::trace;

use crate::{
	actions::{InitializationActions, InspectionActions, TrailingActions},
	solver::{
		engine::{
			activation_list::IntPropCond,
			trail::{TrailedInt, TrailedSet},
			PropRef, State,
		},
		view::IntViewInner,
	},
	IntVal, IntView,
};

#[derive(Debug)]
/// The context given to a [`crate::solver::poster::Poster`] when a propagator
/// is posted to the solver.
pub(crate) struct InitializationContext<'a> {
	/// The state of the engine to which the propagator is posted.
	pub(crate) state: &'a mut State,
	/// The reference that the propagator will receive.
	pub(crate) prop: PropRef,
}

impl InitializationActions for InitializationContext<'_> {
	fn new_trailed_int(&mut self, init: IntVal) -> TrailedInt {
		self.state.trail.track_int(init)
	}

	fn new_trailed_set(&mut self, capacity: usize, full: bool) -> TrailedSet {
		self.state.trail.track_set(capacity, full)
	}

	fn subscribe_int(&mut self, var: IntView, condition: IntPropCond, data: u32) {
		match var.0 {
			IntViewInner::VarRef(iv) => {
				trace!(
					propagator = usize::from(self.prop),
					int_var = usize::from(iv),
					?condition,
					data,
					"subscribe"
				);
				self.state.int_activation[iv].add(self.prop, condition, data);
			}
			IntViewInner::Const(_) => {}
		}
	}
}

impl InspectionActions for InitializationContext<'_> {
	delegate! {
		to self.state {
			fn check_int_in_domain(&self, var: IntView, val: IntVal) -> bool;
			fn get_int_bounds(&self, var: IntView) -> (IntVal, IntVal);
			fn get_int_lower_bound(&self, var: IntView) -> IntVal;
			fn get_int_upper_bound(&self, var: IntView) -> IntVal;
			fn get_int_val(&self, var: IntView) -> Option<IntVal>;
		}
	}
}

impl TrailingActions for InitializationContext<'_> {
	delegate! {
		to self.state.trail {
			fn add_trailed_int(&mut self, i: TrailedInt, delta: IntVal) -> IntVal;
			fn get_trailed_int(&self, i: TrailedInt) -> IntVal;
			fn set_trailed_int(&mut self, i: TrailedInt, v: IntVal) -> IntVal;
			fn trailed_set_clear(&mut self, s: TrailedSet);
			fn trailed_set_contains(&self, s: TrailedSet, elem: u32) -> bool;
			fn trailed_set_elements(&self, s: TrailedSet) -> &[u32];
			fn trailed_set_insert(&mut self, s: TrailedSet, elem: u32) -> bool;
			fn trailed_set_len(&self, s: TrailedSet) -> usize;
			fn trailed_set_remove(&mut self, s: TrailedSet, elem: u32) -> bool;
		}
	}
}
