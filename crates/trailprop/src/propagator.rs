//! Module containing the definitions for propagators and their implementations.

pub(crate) mod held_karp;
pub(crate) mod self_loop_count;

use std::fmt::Debug;

use thiserror::Error;

use crate::{
	actions::{InspectionActions, PropagationActions},
	solver::{
		engine::{activation_list::IntEvent, int_var::IntVarRef, PropRef},
		poster::BoxedPropagator,
		view::IntViewInner,
	},
	IntView,
};

/// Conflict is an error type returned when the domain of a variable becomes
/// empty, or when a propagator otherwise detects that the current state of
/// the solver cannot lead to a solution.
#[derive(Clone, Copy, Debug, Default, Error, PartialEq, Eq, Hash)]
#[error("Conflict detected: subject {subject:?}, caused by {cause:?}")]
pub struct Conflict {
	/// The subject of the conflict (i.e., the variable whose domain became
	/// empty).
	///
	/// If `None`, the conflict was signalled by a propagator directly, or
	/// concerns a constant view.
	pub(crate) subject: Option<IntVarRef>,
	/// The propagator that was running when the conflict was detected.
	///
	/// If `None`, the conflict was caused by a change made directly on the
	/// [`crate::Solver`].
	pub(crate) cause: Option<PropRef>,
}

/// A trait to allow the cloning of boxed propagators.
///
/// This trait allows us to implement [`Clone`] for [`BoxedPropagator`].
pub trait DynPropClone {
	/// Clone the object and store it as a boxed trait object.
	fn clone_dyn_prop(&self) -> BoxedPropagator;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Whether a propagator's constraint is satisfied by every, no, or only some
/// of the assignments allowed by the current domains.
pub enum Entailment {
	/// No assignment allowed by the current domains satisfies the constraint.
	False,
	/// Every assignment allowed by the current domains satisfies the
	/// constraint.
	True,
	/// The constraint might still be satisfied or violated.
	Unknown,
}

/// A trait for a propagator that is called during the search process to filter
/// the domains of decision variables, and detect inconsistencies.
///
/// A propagator keeps any incremental state in trailed data structures (see
/// [`crate::actions::TrailingActions`]), so that the state is restored
/// automatically when the solver backtracks. The engine guarantees that the
/// first time a propagator runs, and any time after backtracking past its first
/// run, it is called using [`Propagator::propagate`].
pub trait Propagator: Debug + DynPropClone {
	/// The propagate method is called during the search process to rebuild any
	/// incremental state from the current domains and filter the domains of
	/// the variables in the scope of the propagator.
	///
	/// Calling this method twice in a row without any changes in between must
	/// not make further changes.
	fn propagate(&mut self, actions: &mut dyn PropagationActions) -> Result<(), Conflict>;

	/// Incrementally update the state of the propagator given that `event`
	/// happened to the variable for which the propagator subscribed with data
	/// `var`, and then filter the domains.
	///
	/// This method is only called for propagators that asked to be notified of
	/// fine grained events (see [`crate::solver::poster::QueuePreferences`]).
	/// The end state after processing all events must be the same as when
	/// [`Propagator::propagate`] had been called instead.
	fn propagate_on_var(
		&mut self,
		actions: &mut dyn PropagationActions,
		var: usize,
		event: IntEvent,
	) -> Result<(), Conflict> {
		let _ = var;
		let _ = event;
		self.propagate(actions)
	}

	/// Report whether the constraint of the propagator is entailed given the
	/// current domains.
	///
	/// This method must not change the state of the propagator.
	fn entailment(&self, actions: &dyn InspectionActions) -> Entailment {
		let _ = actions;
		Entailment::Unknown
	}
}

impl Clone for BoxedPropagator {
	fn clone(&self) -> BoxedPropagator {
		self.clone_dyn_prop()
	}
}

impl Conflict {
	/// Create a new conflict concerning the given variable and caused by the
	/// given propagator.
	pub(crate) fn new(subject: Option<IntVarRef>, cause: Option<PropRef>) -> Self {
		Self { subject, cause }
	}

	/// The propagator that was running when the conflict was detected, if any.
	pub fn cause(&self) -> Option<PropRef> {
		self.cause
	}

	/// The integer view whose domain became empty, if any.
	pub fn subject(&self) -> Option<IntView> {
		self.subject.map(|iv| IntView(IntViewInner::VarRef(iv)))
	}
}

impl<P: Propagator + Clone + 'static> DynPropClone for P {
	fn clone_dyn_prop(&self) -> BoxedPropagator {
		Box::new(self.clone())
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		propagator::Conflict,
		solver::{
			engine::{int_var::IntVarRef, PropRef},
			view::{IntView, IntViewInner},
		},
	};

	#[test]
	fn test_conflict_attribution() {
		let root = Conflict::default();
		assert_eq!(root.subject(), None);
		assert_eq!(root.cause(), None);

		let c = Conflict::new(Some(IntVarRef::new(2)), Some(PropRef::new(1)));
		assert_eq!(c.subject(), Some(IntView(IntViewInner::VarRef(IntVarRef::new(2)))));
		assert_eq!(c.cause(), Some(PropRef::new(1)));
		assert!(c.to_string().starts_with("Conflict detected"));
	}
}
