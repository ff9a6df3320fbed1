//! Module containing the context in which propagators are run by the engine.

use delegate::delegate;
use tracing::trace;

use crate::{
	actions::{InspectionActions, PropagationActions, TrailingActions},
	solver::{
		engine::{
			activation_list::IntEvent,
			trail::{TrailedInt, TrailedSet},
			PropRef, State,
		},
		poster::BoxedPropagator,
	},
	Conflict, IntVal, IntView,
};

#[derive(Debug)]
/// The context given to a propagator while it is run by the engine.
///
/// All changes made through the context are attributed to the running
/// propagator.
pub(crate) struct SolvingContext<'a> {
	/// Internal State representation of the propagation engine.
	pub(crate) state: &'a mut State,
	/// The propagator that is currently running.
	current: PropRef,
}

impl<'a> SolvingContext<'a> {
	/// Create a new context in which the propagator `current` is run.
	pub(crate) fn new(state: &'a mut State, current: PropRef) -> Self {
		Self { state, current }
	}

	/// Run the current propagator, given the events that it was notified of
	/// since it last ran.
	///
	/// The propagator is only given the events incrementally when it requested
	/// fine grained events and it has been initialized in the current search
	/// branch. In all other cases its full [`crate::Propagator::propagate`]
	/// method is called.
	pub(crate) fn run_propagator(
		&mut self,
		propagator: &mut BoxedPropagator,
		events: Vec<(u32, IntEvent)>,
	) -> Result<(), Conflict> {
		let prop = self.current;
		let incremental = self.state.fine_events[prop]
			&& self.state.is_initialized(prop)
			&& !events.is_empty();
		if !incremental {
			trace!(propagator = usize::from(prop), "full propagation");
			let _ = self.state.trail.set_trailed_int(self.state.initialized[prop], 1);
			return propagator.propagate(self);
		}
		for (data, event) in events {
			if self.state.is_passive(prop) {
				break;
			}
			trace!(
				propagator = usize::from(prop),
				var = data,
				?event,
				"incremental propagation"
			);
			propagator.propagate_on_var(self, data as usize, event)?;
		}
		Ok(())
	}
}

impl InspectionActions for SolvingContext<'_> {
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

impl PropagationActions for SolvingContext<'_> {
	fn conflict(&self) -> Conflict {
		Conflict::new(None, Some(self.current))
	}

	fn set_int_lower_bound(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict> {
		self.state.set_int_lower_bound(var, val, Some(self.current))
	}

	fn set_int_not_eq(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict> {
		self.state.set_int_not_eq(var, val, Some(self.current))
	}

	fn set_int_upper_bound(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict> {
		self.state.set_int_upper_bound(var, val, Some(self.current))
	}

	fn set_int_val(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict> {
		self.state.set_int_val(var, val, Some(self.current))
	}

	fn set_passive(&mut self) {
		self.state.set_passive(self.current);
	}
}

impl TrailingActions for SolvingContext<'_> {
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
