//! Module containing the main propagation engine of the solver.

pub(crate) mod activation_list;
pub(crate) mod int_var;
pub(crate) mod queue;
pub(crate) mod solving_context;
pub(crate) mod trail;

use std::mem;

use delegate::delegate;
use index_vec::IndexVec;
use tracing::{debug, trace};

use crate::{
	actions::{InspectionActions, TrailingActions},
	solver::{
		engine::{
			activation_list::{ActivationList, IntEvent},
			int_var::{EmptyDomain, IntVar, IntVarRef},
			queue::{PriorityLevel, PriorityQueue},
			solving_context::SolvingContext,
			trail::{Trail, TrailedInt, TrailedSet},
		},
		poster::{BoxedPropagator, QueuePreferences},
		view::IntViewInner,
		SolverConfiguration,
	},
	Conflict, IntVal, IntView,
};

#[derive(Debug, Default, Clone)]
/// The propagation engine, which owns the propagators and runs them until a
/// fixpoint is reached.
pub(crate) struct Engine {
	/// Storage of the propagators.
	pub(crate) propagators: IndexVec<PropRef, BoxedPropagator>,
	/// Internal State representation of the propagation engine.
	pub(crate) state: State,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
/// Statistics collected during the search process.
pub struct SearchStatistics {
	/// Number of conflicts encountered
	pub(crate) conflicts: u64,
	/// Number of search decisions made
	pub(crate) decisions: u64,
	/// Peak search depth
	pub(crate) peak_depth: u32,
	/// Number of times a propagator was called
	pub(crate) propagations: u64,
	/// Number of solutions found
	pub(crate) solutions: u64,
}

#[derive(Clone, Debug, Default)]
/// The state of the propagation engine that can be accessed by the propagators
/// while they are running.
pub(crate) struct State {
	/// Solver confifguration
	pub(crate) config: SolverConfiguration,

	// ---- Trailed Value Infrastructure (e.g., decision variables) ----
	/// Storage for the integer variables
	pub(crate) int_vars: IndexVec<IntVarRef, IntVar>,
	/// Trailed Storage
	/// Includes the domains of integer variables and the incremental state of
	/// propagators
	pub(crate) trail: Trail,
	/// Whether the solver is in a failure state.
	///
	/// Triggered when a conflict is detected, the solver should backtrack to an
	/// earlier decision level. Debug assertions will be triggered if other
	/// actions are taken instead.
	pub(crate) failed: bool,

	// ---- Non-Trailed Infrastructure ----
	/// Solving statistics
	pub(crate) statistics: SearchStatistics,

	// ---- Queueing Infrastructure ----
	/// Integer variable enqueueing information
	pub(crate) int_activation: IndexVec<IntVarRef, ActivationList>,
	/// Queue of propagators awaiting action
	pub(crate) propagator_queue: PriorityQueue<PropRef>,
	/// Priority within the queue for each propagator
	pub(crate) propagator_priority: IndexVec<PropRef, PriorityLevel>,
	/// Flag for whether a propagator is enqueued
	pub(crate) enqueued: IndexVec<PropRef, bool>,
	/// Flag for whether a propagator is notified of individual events
	pub(crate) fine_events: IndexVec<PropRef, bool>,
	/// Events (with the subscription data) that a propagator has not yet
	/// processed, in the order in which they happened
	pub(crate) pending_events: IndexVec<PropRef, Vec<(u32, IntEvent)>>,
	/// Trailed flag (`0` or `1`) for whether a propagator has run in the current
	/// search branch
	pub(crate) initialized: IndexVec<PropRef, TrailedInt>,
	/// Trailed flag (`0` or `1`) for whether a propagator is passive in the
	/// current search branch
	pub(crate) passive: IndexVec<PropRef, TrailedInt>,
}

impl Engine {
	#[tracing::instrument(level = "debug", skip(self), fields(level = self.state.decision_level()))]
	/// Run the propagators in the propagation queue until no more propagators
	/// are enqueued, or until a conflict is detected.
	pub(crate) fn propagate(&mut self) -> Result<(), Conflict> {
		debug_assert!(!self.state.failed);
		while let Some(prop) = self.state.propagator_queue.pop() {
			self.state.enqueued[prop] = false;
			let events = mem::take(&mut self.state.pending_events[prop]);
			if self.state.is_passive(prop) {
				continue;
			}
			self.state.statistics.propagations += 1;
			let propagator = &mut self.propagators[prop];
			let result = SolvingContext::new(&mut self.state, prop).run_propagator(propagator, events);
			if let Err(conflict) = result {
				self.state.notify_conflict(&conflict);
				return Err(conflict);
			}
		}
		Ok(())
	}
}

impl SearchStatistics {
	/// Returns the number of conflicts encountered during the search.
	pub fn conflicts(&self) -> u64 {
		self.conflicts
	}
	/// Returns the number of search decisions made during the search.
	pub fn decisions(&self) -> u64 {
		self.decisions
	}
	/// Returns the peak depth of the search tree.
	pub fn peak_depth(&self) -> u32 {
		self.peak_depth
	}
	/// Returns the number of propagations performed by the engine during the
	/// search.
	pub fn propagations(&self) -> u64 {
		self.propagations
	}
	/// Returns the number of solutions found during the search.
	pub fn solutions(&self) -> u64 {
		self.solutions
	}
}

impl State {
	/// Internal method to apply a change to the domain of an integer view.
	///
	/// The change `on_var` is applied if `var` is a variable, and the
	/// `const_ok` check is used to determine whether the change is consistent
	/// if `var` is a constant.
	fn change_int(
		&mut self,
		var: IntView,
		cause: Option<PropRef>,
		on_var: impl FnOnce(&IntVar, &mut Trail) -> Result<Option<IntEvent>, EmptyDomain>,
		const_ok: impl FnOnce(IntVal) -> bool,
	) -> Result<bool, Conflict> {
		match var.0 {
			IntViewInner::VarRef(iv) => {
				let event = on_var(&self.int_vars[iv], &mut self.trail)
					.map_err(|EmptyDomain| Conflict::new(Some(iv), cause))?;
				let Some(event) = event else {
					return Ok(false);
				};
				trace!(
					int_var = usize::from(iv),
					?event,
					lb = self.int_vars[iv].get_lower_bound(&self.trail),
					ub = self.int_vars[iv].get_upper_bound(&self.trail),
					"domain change"
				);
				self.enqueue_int_propagators(iv, event, cause);
				Ok(true)
			}
			IntViewInner::Const(c) if const_ok(c) => Ok(false),
			IntViewInner::Const(_) => Err(Conflict::new(None, cause)),
		}
	}

	/// Returns the current decision level of the solver.
	pub(crate) fn decision_level(&self) -> u32 {
		self.trail.decision_level()
	}

	/// Enqueue all propagators that are activated because the [`IntEvent`]
	/// `event` has happened to `int_var`.
	///
	/// The propagator `skip`, which caused the event, is not enqueued.
	fn enqueue_int_propagators(
		&mut self,
		int_var: IntVarRef,
		event: IntEvent,
		skip: Option<PropRef>,
	) {
		for (prop, data) in self.int_activation[int_var].activated_by(event) {
			if Some(prop) == skip || self.trail.get_trailed_int(self.passive[prop]) != 0 {
				continue;
			}
			if self.fine_events[prop] {
				self.pending_events[prop].push((data, event));
			}
			if !self.enqueued[prop] {
				trace!(propagator = usize::from(prop), "enqueue");
				self.propagator_queue
					.insert(self.propagator_priority[prop], prop);
				self.enqueued[prop] = true;
			}
		}
	}

	/// Place `prop` in the propagation queue, if it is not already enqueued.
	fn enqueue_propagator(&mut self, prop: PropRef) {
		if !self.enqueued[prop] {
			self.propagator_queue
				.insert(self.propagator_priority[prop], prop);
			self.enqueued[prop] = true;
		}
	}

	/// Internal method to empty the propagation queue, dropping any events that
	/// have not been processed.
	fn clear_queue(&mut self) {
		while let Some(p) = self.propagator_queue.pop() {
			self.enqueued[p] = false;
			self.pending_events[p].clear();
		}
		debug_assert!(self.pending_events.iter().all(Vec::is_empty));
	}

	/// Returns whether the propagator has run in the current search branch.
	pub(crate) fn is_initialized(&self, prop: PropRef) -> bool {
		self.trail.get_trailed_int(self.initialized[prop]) != 0
	}

	/// Returns whether the propagator is passive in the current search branch.
	pub(crate) fn is_passive(&self, prop: PropRef) -> bool {
		self.trail.get_trailed_int(self.passive[prop]) != 0
	}

	/// Internal method called to process the backtracking to an earlier decision
	/// level.
	pub(crate) fn notify_backtrack(&mut self, level: usize) {
		debug!(level, "backtrack");
		// Resolve the conflict status
		self.failed = false;
		// Backtrack trail
		self.trail.notify_backtrack(level);
		// Empty propagation queue
		self.clear_queue();
	}

	/// Internal method called when a conflict has been detected.
	pub(crate) fn notify_conflict(&mut self, conflict: &Conflict) {
		debug!(
			subject = ?conflict.subject.map(usize::from),
			cause = ?conflict.cause.map(usize::from),
			level = self.decision_level(),
			"conflict"
		);
		self.failed = true;
		self.statistics.conflicts += 1;
		self.clear_queue();
	}

	/// Internal method called to trigger a new decision level.
	pub(crate) fn notify_new_decision_level(&mut self) {
		debug_assert!(!self.failed);
		self.trail.notify_new_decision_level();

		// Update peak decision level
		let new_level = self.decision_level();
		trace!(level = new_level, "new decision level");
		if new_level > self.statistics.peak_depth {
			self.statistics.peak_depth = new_level;
		}
	}

	/// Register the bookkeeping of a newly posted propagator with the engine,
	/// and enqueue it if requested.
	pub(crate) fn register_propagator(&mut self, prop: PropRef, prefs: QueuePreferences) {
		let p = self.propagator_priority.push(prefs.priority);
		debug_assert_eq!(prop, p);
		let _ = self.enqueued.push(false);
		let _ = self.fine_events.push(prefs.fine_events);
		let _ = self.pending_events.push(Vec::new());
		let initialized = self.trail.track_int(0);
		let _ = self.initialized.push(initialized);
		let passive = self.trail.track_int(0);
		let _ = self.passive.push(passive);
		if prefs.enqueue_on_post {
			self.enqueue_propagator(prop);
		}
	}

	/// Set whether the search should reject solutions for which a propagator
	/// reports that its constraint is not entailed.
	pub(crate) fn set_check_entailment(&mut self, enable: bool) {
		self.config.check_entailment = enable;
	}

	/// Set the distance between the bounds of the domain from which newly
	/// created integer variables only store their bounds.
	pub(crate) fn set_int_enumerated_limit(&mut self, limit: usize) {
		self.config.int_enumerated_limit = limit;
	}

	/// Enforce that a an integer view takes a value that is greater or equal to
	/// `val`, as a consequence of `cause`.
	pub(crate) fn set_int_lower_bound(
		&mut self,
		var: IntView,
		val: IntVal,
		cause: Option<PropRef>,
	) -> Result<bool, Conflict> {
		self.change_int(
			var,
			cause,
			|iv, trail| iv.tighten_lower_bound(trail, val),
			|c| c >= val,
		)
	}

	/// Enforce that a an integer view cannot take a value `val`, as a
	/// consequence of `cause`.
	pub(crate) fn set_int_not_eq(
		&mut self,
		var: IntView,
		val: IntVal,
		cause: Option<PropRef>,
	) -> Result<bool, Conflict> {
		self.change_int(
			var,
			cause,
			|iv, trail| iv.remove_value(trail, val),
			|c| c != val,
		)
	}

	/// Enforce that a an integer view takes a value that is less or equal to
	/// `val`, as a consequence of `cause`.
	pub(crate) fn set_int_upper_bound(
		&mut self,
		var: IntView,
		val: IntVal,
		cause: Option<PropRef>,
	) -> Result<bool, Conflict> {
		self.change_int(
			var,
			cause,
			|iv, trail| iv.tighten_upper_bound(trail, val),
			|c| c <= val,
		)
	}

	/// Enforce that a an integer view takes the value `val`, as a consequence
	/// of `cause`.
	pub(crate) fn set_int_val(
		&mut self,
		var: IntView,
		val: IntVal,
		cause: Option<PropRef>,
	) -> Result<bool, Conflict> {
		self.change_int(var, cause, |iv, trail| iv.fix(trail, val), |c| c == val)
	}

	/// Set the maximum number of search decisions that the search process may
	/// make before giving up.
	pub(crate) fn set_node_limit(&mut self, limit: Option<u64>) {
		self.config.node_limit = limit;
	}

	/// Mark the propagator as passive in the current search branch, dropping
	/// any events it has not yet processed.
	pub(crate) fn set_passive(&mut self, prop: PropRef) {
		trace!(propagator = usize::from(prop), "passive");
		let _ = self.trail.set_trailed_int(self.passive[prop], 1);
		self.pending_events[prop].clear();
	}
}

impl InspectionActions for State {
	fn check_int_in_domain(&self, var: IntView, val: IntVal) -> bool {
		match var.0 {
			IntViewInner::VarRef(iv) => self.int_vars[iv].contains(&self.trail, val),
			IntViewInner::Const(c) => c == val,
		}
	}

	fn get_int_bounds(&self, var: IntView) -> (IntVal, IntVal) {
		match var.0 {
			IntViewInner::VarRef(iv) => self.int_vars[iv].get_bounds(&self.trail),
			IntViewInner::Const(i) => (i, i),
		}
	}

	fn get_int_lower_bound(&self, var: IntView) -> IntVal {
		match var.0 {
			IntViewInner::VarRef(iv) => self.int_vars[iv].get_lower_bound(&self.trail),
			IntViewInner::Const(i) => i,
		}
	}

	fn get_int_upper_bound(&self, var: IntView) -> IntVal {
		match var.0 {
			IntViewInner::VarRef(iv) => self.int_vars[iv].get_upper_bound(&self.trail),
			IntViewInner::Const(i) => i,
		}
	}
}

impl TrailingActions for State {
	delegate! {
		to self.trail {
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

index_vec::define_index_type! {
	/// Identifies an propagator in a [`crate::Solver`]
	pub struct PropRef = u32;
}

#[cfg(test)]
mod tests {
	use std::{
		cell::{Cell, RefCell},
		rc::Rc,
	};

	use tracing_test::traced_test;

	use crate::{
		actions::{InitializationActions, InspectionActions, PropagationActions},
		solver::{
			engine::activation_list::{IntEvent, IntPropCond},
			poster::{BoxedPropagator, Poster, QueuePreferences},
		},
		Conflict, IntView, PriorityLevel, Propagator, ReformulationError, Solver,
	};

	#[derive(Clone, Copy, Debug, PartialEq, Eq)]
	/// A call made by the engine to a [`Recorder`].
	enum Call {
		/// Call to [`Propagator::propagate`] of the given recorder.
		Full(usize),
		/// Call to [`Propagator::propagate_on_var`] of the given recorder.
		Event(usize, usize, IntEvent),
	}

	#[derive(Clone, Debug)]
	/// Propagator that logs how it is called by the engine.
	struct Recorder {
		/// Identifier used in the log.
		id: usize,
		/// Shared log of calls.
		log: Rc<RefCell<Vec<Call>>>,
		/// Whether every call returns a conflict.
		fail: bool,
		/// Whether the propagator becomes passive after each call.
		passive: bool,
	}

	#[derive(Clone, Debug)]
	/// Poster for [`Recorder`].
	struct RecorderPoster {
		/// The recorder to post.
		recorder: Recorder,
		/// Variables the recorder subscribes to.
		vars: Vec<IntView>,
		/// Priority of the recorder.
		priority: PriorityLevel,
		/// Whether the recorder receives individual events.
		fine_events: bool,
	}

	#[derive(Clone, Debug)]
	/// Propagator that enforces `to >= from` and counts its calls.
	struct Forward {
		/// Variable whose lower bound is copied.
		from: IntView,
		/// Variable that receives the lower bound.
		to: IntView,
		/// Number of times the propagator was called.
		calls: Rc<Cell<usize>>,
	}

	impl Recorder {
		/// Create a recorder that writes to `log`.
		fn new(id: usize, log: &Rc<RefCell<Vec<Call>>>) -> Self {
			Self {
				id,
				log: Rc::clone(log),
				fail: false,
				passive: false,
			}
		}

		/// Shared end of both propagation methods.
		fn finish(&self, actions: &mut dyn PropagationActions) -> Result<(), Conflict> {
			if self.fail {
				return Err(actions.conflict());
			}
			if self.passive {
				actions.set_passive();
			}
			Ok(())
		}

		/// Create a poster for the recorder.
		fn poster(self, vars: Vec<IntView>, priority: PriorityLevel, fine_events: bool) -> RecorderPoster {
			RecorderPoster {
				recorder: self,
				vars,
				priority,
				fine_events,
			}
		}
	}

	impl Propagator for Recorder {
		fn propagate(&mut self, actions: &mut dyn PropagationActions) -> Result<(), Conflict> {
			self.log.borrow_mut().push(Call::Full(self.id));
			self.finish(actions)
		}

		fn propagate_on_var(
			&mut self,
			actions: &mut dyn PropagationActions,
			var: usize,
			event: IntEvent,
		) -> Result<(), Conflict> {
			self.log.borrow_mut().push(Call::Event(self.id, var, event));
			self.finish(actions)
		}
	}

	impl Poster for RecorderPoster {
		fn post<I: InitializationActions + ?Sized>(
			self,
			actions: &mut I,
		) -> Result<(BoxedPropagator, QueuePreferences), ReformulationError> {
			for (i, &v) in self.vars.iter().enumerate() {
				actions.subscribe_int(v, IntPropCond::Domain, i as u32);
			}
			Ok((
				Box::new(self.recorder),
				QueuePreferences {
					enqueue_on_post: false,
					priority: self.priority,
					fine_events: self.fine_events,
				},
			))
		}
	}

	impl Propagator for Forward {
		fn propagate(&mut self, actions: &mut dyn PropagationActions) -> Result<(), Conflict> {
			self.calls.set(self.calls.get() + 1);
			let lb = actions.get_int_lower_bound(self.from);
			let _ = actions.set_int_lower_bound(self.to, lb)?;
			Ok(())
		}
	}

	impl Poster for Forward {
		fn post<I: InitializationActions + ?Sized>(
			self,
			actions: &mut I,
		) -> Result<(BoxedPropagator, QueuePreferences), ReformulationError> {
			actions.subscribe_int(self.from, IntPropCond::LowerBound, 0);
			actions.subscribe_int(self.to, IntPropCond::LowerBound, 1);
			Ok((
				Box::new(self),
				QueuePreferences {
					enqueue_on_post: true,
					priority: PriorityLevel::Medium,
					fine_events: false,
				},
			))
		}
	}

	#[test]
	#[traced_test]
	fn test_priority_order() {
		let mut slv = Solver::default();
		let x = slv.new_int_var((0..=5).into());
		let log = Rc::new(RefCell::new(Vec::new()));
		let _ = slv
			.add_propagator(Recorder::new(0, &log).poster(vec![x], PriorityLevel::Low, false))
			.unwrap();
		let _ = slv
			.add_propagator(Recorder::new(1, &log).poster(vec![x], PriorityLevel::High, false))
			.unwrap();
		let _ = slv
			.add_propagator(Recorder::new(2, &log).poster(vec![x], PriorityLevel::Immediate, false))
			.unwrap();

		// Nothing is enqueued on post
		slv.propagate().unwrap();
		assert!(log.borrow().is_empty());

		assert_eq!(slv.set_int_lower_bound(x, 1), Ok(true));
		slv.propagate().unwrap();
		assert_eq!(
			*log.borrow(),
			vec![Call::Full(2), Call::Full(1), Call::Full(0)]
		);
		assert_eq!(slv.search_statistics().propagations(), 3);
	}

	#[test]
	#[traced_test]
	fn test_fine_events() {
		let mut slv = Solver::default();
		let x = slv.new_int_var((0..=5).into());
		let y = slv.new_int_var((0..=5).into());
		let log = Rc::new(RefCell::new(Vec::new()));
		let _ = slv
			.add_propagator(Recorder::new(0, &log).poster(vec![x, y], PriorityLevel::High, true))
			.unwrap();
		let _ = slv
			.add_propagator(Recorder::new(1, &log).poster(vec![x, y], PriorityLevel::Low, false))
			.unwrap();

		// The first run is always a full propagation
		assert_eq!(slv.set_int_lower_bound(x, 1), Ok(true));
		slv.propagate().unwrap();
		assert_eq!(*log.borrow(), vec![Call::Full(0), Call::Full(1)]);
		log.borrow_mut().clear();

		// Events are delivered in the order in which they happened
		assert_eq!(slv.set_int_upper_bound(x, 4), Ok(true));
		assert_eq!(slv.set_int_not_eq(y, 2), Ok(true));
		assert_eq!(slv.set_int_val(x, 3), Ok(true));
		// Unchanged domains do not generate events
		assert_eq!(slv.set_int_not_eq(y, 2), Ok(false));
		slv.propagate().unwrap();
		assert_eq!(
			*log.borrow(),
			vec![
				Call::Event(0, 0, IntEvent::UpperBound),
				Call::Event(0, 1, IntEvent::Domain),
				Call::Event(0, 0, IntEvent::Fixed),
				Call::Full(1),
			]
		);
	}

	#[test]
	#[traced_test]
	fn test_initialization_restored() {
		let mut slv = Solver::default();
		let x = slv.new_int_var((0..=5).into());
		let log = Rc::new(RefCell::new(Vec::new()));
		let p = slv
			.add_propagator(Recorder::new(0, &log).poster(vec![x], PriorityLevel::Medium, true))
			.unwrap();

		slv.new_decision_level();
		assert_eq!(slv.set_int_lower_bound(x, 1), Ok(true));
		slv.propagate().unwrap();
		assert!(slv.engine.state.is_initialized(p));
		assert_eq!(slv.set_int_lower_bound(x, 2), Ok(true));
		slv.propagate().unwrap();

		// Backtracking past the first run requires a full propagation again
		slv.backtrack(0);
		assert!(!slv.engine.state.is_initialized(p));
		assert_eq!(slv.get_int_lower_bound(x), 0);
		assert_eq!(slv.set_int_upper_bound(x, 4), Ok(true));
		slv.propagate().unwrap();
		assert_eq!(
			*log.borrow(),
			vec![
				Call::Full(0),
				Call::Event(0, 0, IntEvent::LowerBound),
				Call::Full(0)
			]
		);
	}

	#[test]
	#[traced_test]
	fn test_cause_not_woken() {
		let mut slv = Solver::default();
		let x = slv.new_int_var((0..=5).into());
		let y = slv.new_int_var((0..=5).into());
		let calls = Rc::new(Cell::new(0));
		let _ = slv
			.add_propagator(Forward {
				from: x,
				to: y,
				calls: Rc::clone(&calls),
			})
			.unwrap();
		slv.propagate().unwrap();
		assert_eq!(calls.get(), 1);

		// The change to `y` made by the propagator does not wake it again
		assert_eq!(slv.set_int_lower_bound(x, 3), Ok(true));
		slv.propagate().unwrap();
		assert_eq!(calls.get(), 2);
		assert_eq!(slv.get_int_lower_bound(y), 3);

		// Changes from other sources do
		assert_eq!(slv.set_int_lower_bound(y, 4), Ok(true));
		slv.propagate().unwrap();
		assert_eq!(calls.get(), 3);
		assert_eq!(slv.get_int_lower_bound(x), 3);
	}

	#[test]
	#[traced_test]
	fn test_passive() {
		let mut slv = Solver::default();
		let x = slv.new_int_var((0..=5).into());
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut recorder = Recorder::new(0, &log);
		recorder.passive = true;
		let p = slv
			.add_propagator(recorder.poster(vec![x], PriorityLevel::Medium, true))
			.unwrap();

		slv.new_decision_level();
		assert_eq!(slv.set_int_lower_bound(x, 1), Ok(true));
		slv.propagate().unwrap();
		assert!(slv.engine.state.is_passive(p));

		// Passive propagators are not woken
		assert_eq!(slv.set_int_lower_bound(x, 2), Ok(true));
		assert!(slv.engine.state.propagator_queue.is_empty());
		slv.propagate().unwrap();
		assert_eq!(*log.borrow(), vec![Call::Full(0)]);

		// Until the solver backtracks past the point where they became passive
		slv.backtrack(0);
		assert!(!slv.engine.state.is_passive(p));
		assert_eq!(slv.set_int_lower_bound(x, 1), Ok(true));
		slv.propagate().unwrap();
		assert_eq!(*log.borrow(), vec![Call::Full(0), Call::Full(0)]);
	}

	#[test]
	#[traced_test]
	fn test_conflict_clears_queue() {
		let mut slv = Solver::default();
		let x = slv.new_int_var((0..=5).into());
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut failing = Recorder::new(0, &log);
		failing.fail = true;
		let p = slv
			.add_propagator(failing.poster(vec![x], PriorityLevel::High, true))
			.unwrap();
		let _ = slv
			.add_propagator(Recorder::new(1, &log).poster(vec![x], PriorityLevel::Low, true))
			.unwrap();

		slv.new_decision_level();
		assert_eq!(slv.set_int_lower_bound(x, 1), Ok(true));
		let conflict = slv.propagate().unwrap_err();
		assert_eq!(conflict.cause(), Some(p));
		assert_eq!(conflict.subject(), None);

		// The second propagator never ran, and its events were dropped
		assert_eq!(*log.borrow(), vec![Call::Full(0)]);
		assert!(slv.engine.state.failed);
		assert!(slv.engine.state.propagator_queue.is_empty());
		assert!(slv.engine.state.pending_events.iter().all(Vec::is_empty));
		assert_eq!(slv.search_statistics().conflicts(), 1);

		slv.backtrack(0);
		assert!(!slv.engine.state.failed);
		assert_eq!(slv.get_int_lower_bound(x), 0);
	}

	#[test]
	#[traced_test]
	fn test_empty_domain_conflict() {
		let mut slv = Solver::default();
		let x = slv.new_int_var((0..=5).into());
		let y = slv.new_int_var((0..=2).into());
		let calls = Rc::new(Cell::new(0));
		let p = slv
			.add_propagator(Forward {
				from: x,
				to: y,
				calls: Rc::clone(&calls),
			})
			.unwrap();
		slv.propagate().unwrap();

		slv.new_decision_level();
		assert_eq!(slv.set_int_lower_bound(x, 4), Ok(true));
		let conflict = slv.propagate().unwrap_err();
		assert_eq!(conflict.cause(), Some(p));
		assert_eq!(conflict.subject(), Some(y));
		slv.backtrack(0);
		assert_eq!(slv.get_int_bounds(y), (0, 2));
	}
}
