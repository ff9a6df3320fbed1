//! Definitions of the traits and types used to register propagators with the
//! solver.

use crate::{
	actions::InitializationActions, propagator::Propagator,
	solver::engine::queue::PriorityLevel, ReformulationError,
};

/// Type alias for the storage of propagators in the solver.
pub type BoxedPropagator = Box<dyn Propagator>;

/// The trait used called to registering a propagator with the solver.
pub trait Poster {
	/// Register the propagator with the solver.
	///
	/// This method is expected to return the propagator to be registered and
	/// the [`QueuePreferences`] that the engine should use when scheduling it.
	///
	/// The post method is given access to the solver's initialization actions,
	/// which includes the ability to subscribe to variable events, creating
	/// trailed data structures, and inspecting the current state of varaibles.
	/// Any check that could make the method return an error must be done before
	/// the propagator subscribes to variable events.
	fn post<I: InitializationActions + ?Sized>(
		self,
		actions: &mut I,
	) -> Result<(BoxedPropagator, QueuePreferences), ReformulationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The preferences of a propagator on how the engine schedules it.
pub struct QueuePreferences {
	/// Whether the propagator should be placed in the propagation queue
	/// immediately when it is posted.
	pub enqueue_on_post: bool,
	/// The priority level at which the propagator is placed in the queue.
	pub priority: PriorityLevel,
	/// Whether the propagator wants to be notified of every individual event
	/// through [`Propagator::propagate_on_var`], rather than only running
	/// [`Propagator::propagate`] once per wake-up.
	pub fine_events: bool,
}
