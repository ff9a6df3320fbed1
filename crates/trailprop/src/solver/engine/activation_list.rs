//! Definitions of the events that can happen to integer variables, and the
//! lists used to determine which propagators are to be woken when such an
//! event happens.

use crate::solver::engine::PropRef;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// A list of propagators subscribed to the events of a single integer
/// variable.
pub(crate) struct ActivationList {
	/// The subscriptions, in the order in which they were made.
	///
	/// Each subscription consists of the subscribed propagator, the condition
	/// under which it is to be woken, and the data that the propagator attached
	/// to the subscription.
	subscriptions: Vec<(PropRef, IntPropCond, u32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// An event that has happened to the domain of an integer variable.
pub enum IntEvent {
	/// The variable has been fixed to a single value.
	Fixed,
	/// The lower bound of the variable has increased.
	LowerBound,
	/// The upper bound of the variable has decreased.
	UpperBound,
	/// A value strictly between the bounds of the variable has been removed.
	Domain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The condition under which a propagator subscribed to an integer variable
/// wants to be woken.
pub enum IntPropCond {
	/// Wake only when the variable has been fixed.
	Fixed,
	/// Wake when the lower bound of the variable has changed.
	LowerBound,
	/// Wake when the upper bound of the variable has changed.
	UpperBound,
	/// Wake when either of the bounds of the variable has changed.
	Bounds,
	/// Wake on any change to the domain of the variable.
	Domain,
}

impl ActivationList {
	/// Subscribe the propagator `prop` to be woken under `condition`, passing
	/// `data` back to the propagator when it is woken.
	pub(crate) fn add(&mut self, prop: PropRef, condition: IntPropCond, data: u32) {
		self.subscriptions.push((prop, condition, data));
	}

	/// Iterate over the propagators (and their subscription data) that are
	/// activated by `event`.
	pub(crate) fn activated_by(&self, event: IntEvent) -> impl Iterator<Item = (PropRef, u32)> + '_ {
		self.subscriptions
			.iter()
			.filter(move |(_, cond, _)| cond.is_activated_by(event))
			.map(|&(prop, _, data)| (prop, data))
	}
}

impl IntPropCond {
	/// Whether a propagator subscribed under this condition is woken by `event`.
	pub fn is_activated_by(self, event: IntEvent) -> bool {
		match self {
			IntPropCond::Fixed => event == IntEvent::Fixed,
			IntPropCond::LowerBound => matches!(event, IntEvent::Fixed | IntEvent::LowerBound),
			IntPropCond::UpperBound => matches!(event, IntEvent::Fixed | IntEvent::UpperBound),
			IntPropCond::Bounds => event != IntEvent::Domain,
			IntPropCond::Domain => true,
		}
	}
}
