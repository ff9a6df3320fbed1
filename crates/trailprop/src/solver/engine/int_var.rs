//! Module containing the representation of integer variables within the solver.

use crate::{
	actions::TrailingActions,
	solver::engine::{
		activation_list::IntEvent,
		trail::{Trail, TrailedInt, TrailedSet},
	},
	IntSetVal, IntVal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Signal that a requested change would leave the domain of an integer
/// variable without any values.
pub(crate) struct EmptyDomain;

#[derive(Debug, Clone, PartialEq, Eq)]
/// The structure used to store information about an integer variable within
/// the solver.
///
/// A value `v` is in the domain of the variable if it lies between the
/// (trailed) lower and upper bound, and it has not been removed from the inside
/// of the domain according to the [`DomainStorage`]. The bounds themselves are
/// always values of the domain.
pub(crate) struct IntVar {
	/// The domain of the integer variable at the time of its creation.
	domain: IntSetVal,
	/// A trailed integer representing the current lower bound of the integer
	/// variable.
	lower_bound: TrailedInt,
	/// A trailed integer representing the current upper bound of the integer
	/// variable.
	upper_bound: TrailedInt,
	/// The storage of the values inside the bounds.
	storage: DomainStorage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The storage used for the values inside the bounds of an integer variable.
pub(crate) enum DomainStorage {
	/// Only the bounds are trailed.
	///
	/// The holes of the initial domain are still respected, but removing a
	/// value from the inside of the current bounds has no effect. This is used
	/// for variables with domains that are too wide to enumerate.
	Bounds,
	/// Every value of the initial domain is a member of a trailed set, from
	/// which values removed from the inside of the domain are removed.
	Enumerated {
		/// The smallest value of the initial domain.
		offset: IntVal,
		/// The values (relative to `offset`) that have not been removed from the
		/// inside of the domain. Values outside of the bounds are not removed
		/// from the set, the bounds are authoritative.
		values: TrailedSet,
	},
}

impl IntVar {
	/// Returns whether `val` is in the current domain of the integer variable.
	pub(crate) fn contains(&self, trail: &impl TrailingActions, val: IntVal) -> bool {
		let (lb, ub) = self.get_bounds(trail);
		lb <= val && val <= ub && self.has_value(trail, val)
	}

	/// Fix the integer variable to take the value `val`.
	///
	/// Returns the event triggered by the change, if the domain changed.
	pub(crate) fn fix(
		&self,
		trail: &mut Trail,
		val: IntVal,
	) -> Result<Option<IntEvent>, EmptyDomain> {
		if !self.contains(trail, val) {
			return Err(EmptyDomain);
		}
		let (lb, ub) = self.get_bounds(trail);
		if lb == ub {
			return Ok(None);
		}
		let _ = trail.set_trailed_int(self.lower_bound, val);
		let _ = trail.set_trailed_int(self.upper_bound, val);
		Ok(Some(IntEvent::Fixed))
	}

	/// Returns the lower and upper bounds of the current state of the integer variable.
	pub(crate) fn get_bounds(&self, trail: &impl TrailingActions) -> (IntVal, IntVal) {
		(
			trail.get_trailed_int(self.lower_bound),
			trail.get_trailed_int(self.upper_bound),
		)
	}

	/// Returns the lower bound of the current state of the integer variable.
	pub(crate) fn get_lower_bound(&self, trail: &impl TrailingActions) -> IntVal {
		trail.get_trailed_int(self.lower_bound)
	}

	/// Returns the upper bound of the current state of the integer variable.
	pub(crate) fn get_upper_bound(&self, trail: &impl TrailingActions) -> IntVal {
		trail.get_trailed_int(self.upper_bound)
	}

	/// Internal method to check whether `val` has not been removed from the
	/// inside of the domain, regardless of the current bounds.
	fn has_value(&self, trail: &impl TrailingActions, val: IntVal) -> bool {
		match self.storage {
			DomainStorage::Bounds => self
				.domain
				.iter()
				.any(|r| *r.start() <= val && val <= *r.end()),
			DomainStorage::Enumerated { offset, values } => {
				val >= offset && trail.trailed_set_contains(values, (val - offset) as u32)
			}
		}
	}

	/// Create a new integer variable with the given (non-empty) domain, storing
	/// its trailed state in `trail`.
	///
	/// The values of the domain are enumerated when the distance between its
	/// bounds is smaller than `enumerated_limit`, otherwise only the bounds of
	/// the variable are trailed.
	pub(crate) fn new_in(trail: &mut Trail, domain: IntSetVal, enumerated_limit: usize) -> Self {
		let (Some(&lb), Some(&ub)) = (domain.lower_bound(), domain.upper_bound()) else {
			panic!("Unable to create integer variable empty domain")
		};
		let width = ub
			.checked_sub(lb)
			.and_then(|d| usize::try_from(d).ok())
			.filter(|&d| d < enumerated_limit.min(u32::MAX as usize));
		let storage = match width {
			Some(d) => DomainStorage::Enumerated {
				offset: lb,
				values: trail.track_set_from(
					d + 1,
					domain
						.iter()
						.flat_map(|r| (*r.start()..=*r.end()).map(move |v| (v - lb) as u32)),
				),
			},
			None => DomainStorage::Bounds,
		};
		Self {
			domain,
			lower_bound: trail.track_int(lb),
			upper_bound: trail.track_int(ub),
			storage,
		}
	}

	/// Internal method to find the smallest value of the domain in `from..=to`.
	fn next_value(&self, trail: &impl TrailingActions, from: IntVal, to: IntVal) -> Option<IntVal> {
		match self.storage {
			DomainStorage::Bounds => self
				.domain
				.iter()
				.find(|r| *r.end() >= from)
				.map(|r| from.max(*r.start()))
				.filter(|&v| v <= to),
			DomainStorage::Enumerated { .. } => (from..=to).find(|&v| self.has_value(trail, v)),
		}
	}

	/// Internal method to find the largest value of the domain in `from..=to`.
	fn prev_value(&self, trail: &impl TrailingActions, from: IntVal, to: IntVal) -> Option<IntVal> {
		match self.storage {
			DomainStorage::Bounds => self
				.domain
				.iter()
				.filter(|r| *r.start() <= to)
				.map(|r| to.min(*r.end()))
				.last()
				.filter(|&v| v >= from),
			DomainStorage::Enumerated { .. } => {
				(from..=to).rev().find(|&v| self.has_value(trail, v))
			}
		}
	}

	/// Remove the value `val` from the domain of the integer variable.
	///
	/// Returns the event triggered by the change, if the domain changed. Values
	/// strictly inside the bounds are only removed if the variable is
	/// enumerated.
	pub(crate) fn remove_value(
		&self,
		trail: &mut Trail,
		val: IntVal,
	) -> Result<Option<IntEvent>, EmptyDomain> {
		if !self.contains(trail, val) {
			return Ok(None);
		}
		let (lb, ub) = self.get_bounds(trail);
		if lb == ub {
			return Err(EmptyDomain);
		}
		if val == lb {
			return self.tighten_lower_bound(trail, val + 1);
		}
		if val == ub {
			return self.tighten_upper_bound(trail, val - 1);
		}
		match self.storage {
			DomainStorage::Bounds => Ok(None),
			DomainStorage::Enumerated { offset, values } => {
				let removed = trail.trailed_set_remove(values, (val - offset) as u32);
				debug_assert!(removed);
				Ok(Some(IntEvent::Domain))
			}
		}
	}

	/// Enforce that the integer variable takes a value greater or equal to
	/// `val`.
	///
	/// The new lower bound is the smallest value in the domain that is greater
	/// or equal to `val`. Returns the event triggered by the change, if the
	/// domain changed.
	pub(crate) fn tighten_lower_bound(
		&self,
		trail: &mut Trail,
		val: IntVal,
	) -> Result<Option<IntEvent>, EmptyDomain> {
		let (lb, ub) = self.get_bounds(trail);
		if val <= lb {
			return Ok(None);
		}
		let new_lb = self.next_value(trail, val, ub).ok_or(EmptyDomain)?;
		let _ = trail.set_trailed_int(self.lower_bound, new_lb);
		Ok(Some(if new_lb == ub {
			IntEvent::Fixed
		} else {
			IntEvent::LowerBound
		}))
	}

	/// Enforce that the integer variable takes a value less or equal to `val`.
	///
	/// The new upper bound is the largest value in the domain that is less or
	/// equal to `val`. Returns the event triggered by the change, if the domain
	/// changed.
	pub(crate) fn tighten_upper_bound(
		&self,
		trail: &mut Trail,
		val: IntVal,
	) -> Result<Option<IntEvent>, EmptyDomain> {
		let (lb, ub) = self.get_bounds(trail);
		if val >= ub {
			return Ok(None);
		}
		let new_ub = self.prev_value(trail, lb, val).ok_or(EmptyDomain)?;
		let _ = trail.set_trailed_int(self.upper_bound, new_ub);
		Ok(Some(if new_ub == lb {
			IntEvent::Fixed
		} else {
			IntEvent::UpperBound
		}))
	}

	#[cfg(test)]
	/// Iterate over the values currently in the domain of the integer variable,
	/// in increasing order.
	pub(crate) fn values<'a>(
		&'a self,
		trail: &'a impl TrailingActions,
	) -> impl Iterator<Item = IntVal> + 'a {
		let (lb, ub) = self.get_bounds(trail);
		(lb..=ub).filter(move |&v| self.has_value(trail, v))
	}
}

index_vec::define_index_type! {
	/// Identifies an integer variable in a [`crate::Solver`]
	pub struct IntVarRef = u32;
}
