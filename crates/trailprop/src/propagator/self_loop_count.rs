//! Propagator for the constraint that counts the number of self loops in a
//! successor representation of a graph, i.e., the number of successor
//! variables `succs[i]` that take the value `i + offset`.

use tracing::trace;

use crate::{
	actions::{InitializationActions, InspectionActions, PropagationActions},
	propagator::{Conflict, Entailment, Propagator},
	solver::{
		engine::{
			activation_list::{IntEvent, IntPropCond},
			queue::PriorityLevel,
			trail::{TrailedInt, TrailedSet},
		},
		poster::{BoxedPropagator, Poster, QueuePreferences},
		value::IntVal,
		view::IntView,
	},
	ReformulationError,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Incremental propagator for the constraint `|{i | succs[i] = i + offset}| =
/// count`.
///
/// The propagator tracks the number of successor variables that are fixed to
/// their self loop value, and the set of unfixed successor variables that can
/// still take it. Once no successor variable can change the count anymore, the
/// propagator becomes passive.
pub struct SelfLoopCount {
	/// Successor variables
	succs: Vec<IntView>,
	/// Offset of the node identifiers used as values of the successor variables
	offset: IntVal,
	/// Number of self loops
	count: IntView,
	/// Number of successor variables fixed to their self loop value
	min_loops: TrailedInt,
	/// Indices of the unfixed successor variables that can still take their self
	/// loop value
	possible: TrailedSet,
}

/// [`Poster`] for the [`SelfLoopCount`] propagator.
struct SelfLoopCountPoster {
	/// Successor variables
	succs: Vec<IntView>,
	/// Offset of the node identifiers
	offset: IntVal,
	/// Number of self loops
	count: IntView,
}

impl SelfLoopCount {
	/// Filter the domains of the variables based on the current number of
	/// definite and possible self loops.
	fn filter(&mut self, actions: &mut dyn PropagationActions) -> Result<(), Conflict> {
		let min = actions.get_trailed_int(self.min_loops);
		let max = min + actions.trailed_set_len(self.possible) as IntVal;
		let _ = actions.set_int_lower_bound(self.count, min)?;
		let _ = actions.set_int_upper_bound(self.count, max)?;

		if min != max {
			match actions.get_int_val(self.count) {
				Some(count) if count == max => {
					// All possible self loops must be taken
					let possible = actions.trailed_set_elements(self.possible).to_vec();
					for &i in &possible {
						let i = i as usize;
						let _ = actions.set_int_val(self.succs[i], self.self_loop(i))?;
					}
					let _ = actions.add_trailed_int(self.min_loops, possible.len() as IntVal);
					actions.trailed_set_clear(self.possible);
				}
				Some(count) if count == min => {
					// No more self loops can be taken
					let possible = actions.trailed_set_elements(self.possible).to_vec();
					for &i in &possible {
						let i = i as usize;
						let _ = actions.set_int_not_eq(self.succs[i], self.self_loop(i))?;
					}
					actions.trailed_set_clear(self.possible);
				}
				_ => {}
			}
		}

		if actions.trailed_set_len(self.possible) == 0 {
			trace!(loops = min, "self loop count is decided");
			actions.set_passive();
		}
		Ok(())
	}

	/// Prepare a [`SelfLoopCount`] propagator, enforcing that `count` is the
	/// number of successor variables `succs[i]` that take the value `i +
	/// offset`.
	pub fn prepare<V: Into<IntView>, VI: IntoIterator<Item = V>>(
		succs: VI,
		offset: IntVal,
		count: IntView,
	) -> impl Poster {
		SelfLoopCountPoster {
			succs: succs.into_iter().map(Into::into).collect(),
			offset,
			count,
		}
	}

	/// Returns the value that the successor variable `i` takes when node `i` is
	/// a self loop.
	fn self_loop(&self, i: usize) -> IntVal {
		i as IntVal + self.offset
	}
}

impl Propagator for SelfLoopCount {
	#[tracing::instrument(name = "self_loop_count", level = "trace", skip(self, actions))]
	fn propagate(&mut self, actions: &mut dyn PropagationActions) -> Result<(), Conflict> {
		actions.trailed_set_clear(self.possible);
		let _ = actions.set_trailed_int(self.min_loops, 0);
		for (i, &v) in self.succs.iter().enumerate() {
			if actions.check_int_in_domain(v, self.self_loop(i)) {
				if actions.get_int_val(v).is_some() {
					let _ = actions.add_trailed_int(self.min_loops, 1);
				} else {
					let _ = actions.trailed_set_insert(self.possible, i as u32);
				}
			}
		}
		self.filter(actions)
	}

	#[tracing::instrument(name = "self_loop_count", level = "trace", skip(self, actions))]
	fn propagate_on_var(
		&mut self,
		actions: &mut dyn PropagationActions,
		var: usize,
		event: IntEvent,
	) -> Result<(), Conflict> {
		if var < self.succs.len() && actions.trailed_set_contains(self.possible, var as u32) {
			let v = self.succs[var];
			if !actions.check_int_in_domain(v, self.self_loop(var)) {
				let _ = actions.trailed_set_remove(self.possible, var as u32);
			} else if actions.get_int_val(v).is_some() {
				let _ = actions.add_trailed_int(self.min_loops, 1);
				let _ = actions.trailed_set_remove(self.possible, var as u32);
			}
		}
		self.filter(actions)
	}

	fn entailment(&self, actions: &dyn InspectionActions) -> Entailment {
		let mut min = 0;
		let mut max = 0;
		for (i, &v) in self.succs.iter().enumerate() {
			if actions.check_int_in_domain(v, self.self_loop(i)) {
				max += 1;
				if actions.get_int_val(v).is_some() {
					min += 1;
				}
			}
		}
		let (lb, ub) = actions.get_int_bounds(self.count);
		if lb > max || ub < min {
			Entailment::False
		} else if min == max && lb == ub {
			Entailment::True
		} else {
			Entailment::Unknown
		}
	}
}

impl Poster for SelfLoopCountPoster {
	fn post<I: InitializationActions + ?Sized>(
		self,
		actions: &mut I,
	) -> Result<(BoxedPropagator, QueuePreferences), ReformulationError> {
		let n = self.succs.len();
		let (lb, ub) = actions.get_int_bounds(self.count);
		if lb > n as IntVal || ub < 0 {
			return Err(ReformulationError::TrivialUnsatisfiable);
		}

		let prop = SelfLoopCount {
			min_loops: actions.new_trailed_int(0),
			possible: actions.new_trailed_set(n, false),
			succs: self.succs,
			offset: self.offset,
			count: self.count,
		};
		for (i, &v) in prop.succs.iter().enumerate() {
			actions.subscribe_int(v, IntPropCond::Domain, i as u32);
		}
		actions.subscribe_int(prop.count, IntPropCond::Bounds, n as u32);
		Ok((
			Box::new(prop),
			QueuePreferences {
				enqueue_on_post: true,
				priority: PriorityLevel::High,
				fine_events: true,
			},
		))
	}
}
