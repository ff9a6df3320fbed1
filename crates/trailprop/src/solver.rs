//! Module containing the central solving infrastructure.

pub(crate) mod engine;
pub(crate) mod initialization_context;
pub(crate) mod poster;
pub(crate) mod value;
pub(crate) mod view;

use std::iter::once;

use delegate::delegate;
use itertools::Itertools;
use tracing::{debug, trace};

use crate::{
	actions::{InspectionActions, TrailingActions},
	propagator::Entailment,
	solver::{
		engine::{
			int_var::{IntVar, IntVarRef},
			trail::{TrailedInt, TrailedSet},
			Engine, PropRef, SearchStatistics,
		},
		initialization_context::InitializationContext,
		poster::Poster,
		value::Valuation,
		view::{IntView, IntViewInner},
	},
	Conflict, IntSetVal, IntVal, ReformulationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Type of the optimization objective
pub enum Goal {
	/// Maximize the value of the given objective
	Maximize,
	/// Minimize the value of the given objective
	Minimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Statistics related to the initialization of the solver
pub struct InitStatistics {
	/// Number of (non-view) integer variables represented in the solver
	int_vars: usize,
	/// Number of propagators in the solver
	propagators: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of a solving attempt
pub enum SolveResult {
	/// The solver has found a solution.
	Satisfied,
	/// The solver has proven that the problem is unsatisfiable.
	Unsatisfiable,
	/// The solver that no more/better solutions can be found.
	Complete,
	/// The solver was interrupted before a result could be reached.
	Unknown,
}

#[derive(Clone, Debug, Default)]
/// The main solver object that is used to create variables, post propagators,
/// and control the search process.
///
/// Cloning a solver creates an independent copy, including the current state
/// of all variables and propagators.
pub struct Solver {
	/// The propagation engine that stores all variables and propagators.
	pub(crate) engine: Engine,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Structure holding the options using to configure the solver.
pub(crate) struct SolverConfiguration {
	/// The maximum number of search decisions that the search process may make.
	pub(crate) node_limit: Option<u64>,
	/// Whether the search process rejects solutions for which a propagator
	/// reports that its constraint is not entailed.
	pub(crate) check_entailment: bool,
	/// The distance between the bounds of a domain from which integer
	/// variables only store their bounds.
	pub(crate) int_enumerated_limit: usize,
}

/// The parameters and the progress of a depth first search process.
struct DepthFirstSearch<'a> {
	/// The variables to branch on, in order.
	vars: &'a [IntView],
	/// The objective to optimize, if any.
	objective: Option<(IntView, Goal)>,
	/// The objective value of the best solution found so far.
	incumbent: Option<IntVal>,
	/// Whether the search stops after the first solution.
	first_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The outcome of exploring a subtree of the search.
enum SearchOutcome {
	/// The subtree has been fully explored, and the search continues.
	Continue,
	/// A solution has been found, and the search stops.
	Stop,
	/// The node limit has been reached.
	LimitReached,
}

impl SolverConfiguration {
	/// The default value of [`Self::int_enumerated_limit`].
	pub(crate) const DEFAULT_INT_ENUMERATED_LIMIT: usize = 1 << 16;
}

impl Default for SolverConfiguration {
	fn default() -> Self {
		Self {
			node_limit: None,
			check_entailment: true,
			int_enumerated_limit: Self::DEFAULT_INT_ENUMERATED_LIMIT,
		}
	}
}

impl InitStatistics {
	/// Number of integer variables present in the solver
	pub fn int_vars(&self) -> usize {
		self.int_vars
	}
	/// Number of propagators present in the solver
	pub fn propagators(&self) -> usize {
		self.propagators
	}
}

impl Solver {
	/// Add a propagator to the solver.
	///
	/// This method accepts a [`Poster`] implementation that is used to finalize
	/// the propagator and subscribe it to any relevant variables. The returned
	/// [`PropRef`] can be used to query the entailment of the propagator.
	pub fn add_propagator<P: Poster>(&mut self, poster: P) -> Result<PropRef, ReformulationError> {
		let prop_ref = PropRef::from(self.engine.propagators.len());
		let mut actions = InitializationContext {
			state: &mut self.engine.state,
			prop: prop_ref,
		};
		let (prop, queue_pref) = poster.post(&mut actions)?;
		debug!(
			propagator = usize::from(prop_ref),
			priority = ?queue_pref.priority,
			fine_events = queue_pref.fine_events,
			"post propagator"
		);
		let p = self.engine.propagators.push(prop);
		debug_assert_eq!(prop_ref, p);
		self.engine.state.register_propagator(prop_ref, queue_pref);
		Ok(prop_ref)
	}

	/// Find all solutions with regard to a list of given variables.
	/// The given closure will be called for each solution found.
	///
	/// The search branches on the variables in the given order, trying the
	/// smallest value in the domain first. The state of the solver is restored
	/// when the search finishes.
	pub fn all_solutions(
		&mut self,
		vars: &[IntView],
		mut on_sol: impl FnMut(&dyn Valuation),
	) -> SolveResult {
		let mut num_sol = 0;
		let mut search = DepthFirstSearch {
			vars,
			objective: None,
			incumbent: None,
			first_only: false,
		};
		let outcome = self.search(&mut search, &mut |value| {
			num_sol += 1;
			on_sol(value);
		});
		match (outcome, num_sol) {
			(SearchOutcome::LimitReached, 0) => SolveResult::Unknown,
			(SearchOutcome::LimitReached, _) => SolveResult::Satisfied,
			(_, 0) => SolveResult::Unsatisfiable,
			(_, _) => SolveResult::Complete,
		}
	}

	/// Check whether the constraint of the given propagator is entailed by the
	/// current domains.
	pub fn propagator_entailment(&self, prop: PropRef) -> Entailment {
		self.engine.propagators[prop].entailment(&self.engine.state)
	}

	/// Revert the state of the solver to the given decision level.
	///
	/// This also resolves any conflict that has been detected at a later
	/// decision level.
	pub fn backtrack(&mut self, level: u32) {
		debug_assert!(level <= self.decision_level());
		self.engine.state.notify_backtrack(level as usize);
	}

	/// Find an optimal solution with regards to the given objective and goal.
	///
	/// Every solution found is strictly better than the previous one, and is
	/// passed to the given closure. The objective value of the last solution
	/// found is returned. The state of the solver is restored when the search
	/// finishes.
	pub fn branch_and_bound(
		&mut self,
		objective: IntView,
		goal: Goal,
		vars: &[IntView],
		mut on_sol: impl FnMut(&dyn Valuation),
	) -> (SolveResult, Option<IntVal>) {
		let vars = vars.iter().copied().chain(once(objective)).collect_vec();
		let mut search = DepthFirstSearch {
			vars: &vars,
			objective: Some((objective, goal)),
			incumbent: None,
			first_only: false,
		};
		debug!(?goal, "start branch and bound");
		let outcome = self.search(&mut search, &mut on_sol);
		let status = match (outcome, search.incumbent) {
			(SearchOutcome::LimitReached, None) => SolveResult::Unknown,
			(SearchOutcome::LimitReached, Some(_)) => SolveResult::Satisfied,
			(_, None) => SolveResult::Unsatisfiable,
			(_, Some(_)) => SolveResult::Complete,
		};
		(status, search.incumbent)
	}

	/// Returns the current decision level of the solver.
	pub fn decision_level(&self) -> u32 {
		self.engine.state.decision_level()
	}

	/// Internal method that explores the subtree of the current search node.
	fn dfs(
		&mut self,
		search: &mut DepthFirstSearch<'_>,
		on_sol: &mut dyn FnMut(&dyn Valuation),
	) -> SearchOutcome {
		if let (Some((obj, goal)), Some(best)) = (search.objective, search.incumbent) {
			let improve = match goal {
				Goal::Minimize => self.set_int_upper_bound(obj, best - 1),
				Goal::Maximize => self.set_int_lower_bound(obj, best + 1),
			};
			if improve.is_err() {
				return SearchOutcome::Continue;
			}
		}
		if self.propagate().is_err() {
			return SearchOutcome::Continue;
		}
		let Some(var) = search
			.vars
			.iter()
			.copied()
			.find(|&v| self.get_int_val(v).is_none())
		else {
			return self.on_leaf(search, on_sol);
		};

		let statistics = &mut self.engine.state.statistics;
		if let Some(limit) = self.engine.state.config.node_limit {
			if statistics.decisions >= limit {
				debug!(limit, "node limit reached");
				return SearchOutcome::LimitReached;
			}
		}
		statistics.decisions += 1;

		// Left branch: assign the smallest value
		let val = self.get_int_lower_bound(var);
		let level = self.decision_level();
		self.new_decision_level();
		trace!(?var, val, level, "decide");
		let outcome = match self.set_int_val(var, val) {
			Ok(_) => self.dfs(search, on_sol),
			Err(_) => SearchOutcome::Continue,
		};
		self.backtrack(level);
		if outcome != SearchOutcome::Continue {
			return outcome;
		}

		// Right branch: exclude the value at the current decision level
		if self.set_int_not_eq(var, val).is_err() {
			return SearchOutcome::Continue;
		}
		self.dfs(search, on_sol)
	}

	/// Wrapper function for `all_solutions` that collects all solutions and returns them in a vector
	/// of solution values.
	pub fn get_all_solutions(&mut self, vars: &[IntView]) -> (SolveResult, Vec<Vec<IntVal>>) {
		let mut solutions = Vec::new();
		let status = self.all_solutions(vars, |sol| {
			solutions.push(vars.iter().map(|&v| sol(v)).collect());
		});
		(status, solutions)
	}

	/// Access the initilization statistics of the [`Solver`] object.
	pub fn init_statistics(&self) -> InitStatistics {
		InitStatistics {
			int_vars: self.engine.state.int_vars.len(),
			propagators: self.engine.propagators.len(),
		}
	}

	/// Create a new decision level, to which the solver can later backtrack.
	///
	/// All propagation should be finished (see [`Self::propagate`]) before a
	/// new decision level is created.
	pub fn new_decision_level(&mut self) {
		debug_assert!(self.engine.state.propagator_queue.is_empty());
		self.engine.state.notify_new_decision_level();
	}

	/// Create a new integer variable with the given domain.
	///
	/// If the domain contains a single value, then a constant view is returned.
	/// When the distance between the bounds of the domain is at least the
	/// limit set using [`Self::set_int_enumerated_limit`], only the bounds of
	/// the variable can be changed: removing a value from the inside of its
	/// domain has no effect.
	///
	/// # Panics
	///
	/// This method will panic if the domain is empty.
	pub fn new_int_var(&mut self, domain: IntSetVal) -> IntView {
		let (Some(&lb), Some(&ub)) = (domain.lower_bound(), domain.upper_bound()) else {
			panic!("Unable to create integer variable empty domain")
		};
		if lb == ub {
			return IntView(IntViewInner::Const(lb));
		}
		let state = &mut self.engine.state;
		let var = IntVar::new_in(&mut state.trail, domain, state.config.int_enumerated_limit);
		let iv: IntVarRef = state.int_vars.push(var);
		let r = state.int_activation.push(Default::default());
		debug_assert_eq!(iv, r);
		trace!(int_var = usize::from(iv), "new integer variable");
		IntView(IntViewInner::VarRef(iv))
	}

	/// Internal method called when all branching variables are fixed.
	fn on_leaf(
		&mut self,
		search: &mut DepthFirstSearch<'_>,
		on_sol: &mut dyn FnMut(&dyn Valuation),
	) -> SearchOutcome {
		if self.engine.state.config.check_entailment {
			if let Some(prop) = (0..self.engine.propagators.len())
				.map(PropRef::new)
				.find(|&p| self.propagator_entailment(p) == Entailment::False)
			{
				debug!(
					propagator = usize::from(prop),
					"solution rejected by entailment check"
				);
				return SearchOutcome::Continue;
			}
		}
		self.engine.state.statistics.solutions += 1;
		if let Some((obj, _)) = search.objective {
			let val = self.get_int_lower_bound(obj);
			debug!(objective = val, "new incumbent");
			search.incumbent = Some(val);
		} else {
			debug!(solutions = self.engine.state.statistics.solutions, "solution");
		}
		let valuation = |v: IntView| self.get_int_lower_bound(v);
		on_sol(&valuation);
		if search.first_only {
			SearchOutcome::Stop
		} else {
			SearchOutcome::Continue
		}
	}

	/// Run the propagators until a fixpoint is reached, or a conflict is
	/// detected.
	///
	/// After a conflict, the solver must [`Self::backtrack`] to an earlier
	/// decision level before making any further changes. A conflict at the root
	/// level means that the problem is unsatisfiable.
	pub fn propagate(&mut self) -> Result<(), Conflict> {
		self.engine.propagate()
	}

	/// Internal method that runs a depth first search from the current state,
	/// restoring the state afterwards.
	fn search(
		&mut self,
		search: &mut DepthFirstSearch<'_>,
		on_sol: &mut dyn FnMut(&dyn Valuation),
	) -> SearchOutcome {
		if self.engine.state.failed || self.propagate().is_err() {
			return SearchOutcome::Continue;
		}
		let level = self.decision_level();
		self.new_decision_level();
		let outcome = self.dfs(search, on_sol);
		self.backtrack(level);
		debug!(
			?outcome,
			decisions = self.engine.state.statistics.decisions,
			conflicts = self.engine.state.statistics.conflicts,
			"search finished"
		);
		outcome
	}

	/// Access the search statistics for the search process up to this point.
	pub fn search_statistics(&self) -> &SearchStatistics {
		&self.engine.state.statistics
	}

	/// Enforce that a an integer view takes a value that is greater or equal to
	/// `val`.
	///
	/// Returns whether the domain of the view changed. A rejected change leaves
	/// the state of the solver unchanged.
	pub fn set_int_lower_bound(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict> {
		self.engine.state.set_int_lower_bound(var, val, None)
	}

	/// Enforce that a an integer view cannot take a value `val`.
	///
	/// Returns whether the domain of the view changed. A rejected change leaves
	/// the state of the solver unchanged.
	pub fn set_int_not_eq(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict> {
		self.engine.state.set_int_not_eq(var, val, None)
	}

	/// Enforce that a an integer view takes a value that is less or equal to
	/// `val`.
	///
	/// Returns whether the domain of the view changed. A rejected change leaves
	/// the state of the solver unchanged.
	pub fn set_int_upper_bound(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict> {
		self.engine.state.set_int_upper_bound(var, val, None)
	}

	/// Enforce that a an integer view takes the value `val`.
	///
	/// Returns whether the domain of the view changed. A rejected change leaves
	/// the state of the solver unchanged.
	pub fn set_int_val(&mut self, var: IntView, val: IntVal) -> Result<bool, Conflict> {
		self.engine.state.set_int_val(var, val, None)
	}

	/// Try and find a solution to the problem for which the Solver was
	/// initialized, branching on the given variables.
	///
	/// The state of the solver is restored when the search finishes.
	pub fn solve(&mut self, vars: &[IntView], mut on_sol: impl FnMut(&dyn Valuation)) -> SolveResult {
		let mut search = DepthFirstSearch {
			vars,
			objective: None,
			incumbent: None,
			first_only: true,
		};
		match self.search(&mut search, &mut on_sol) {
			SearchOutcome::Stop => SolveResult::Satisfied,
			SearchOutcome::Continue => SolveResult::Unsatisfiable,
			SearchOutcome::LimitReached => SolveResult::Unknown,
		}
	}

	delegate! {
		to self.engine.state {
			/// Set whether the search should reject solutions for which a propagator
			/// reports that its constraint is not entailed.
			pub fn set_check_entailment(&mut self, enable: bool);
			/// Set the distance between the bounds of the domain from which newly
			/// created integer variables only store their bounds.
			pub fn set_int_enumerated_limit(&mut self, limit: usize);
			/// Set the maximum number of search decisions that the search process may
			/// make before giving up, or `None` to search without limit.
			pub fn set_node_limit(&mut self, limit: Option<u64>);
		}
	}
}

impl InspectionActions for Solver {
	delegate! {
		to self.engine.state {
			fn check_int_in_domain(&self, var: IntView, val: IntVal) -> bool;
			fn get_int_bounds(&self, var: IntView) -> (IntVal, IntVal);
			fn get_int_lower_bound(&self, var: IntView) -> IntVal;
			fn get_int_upper_bound(&self, var: IntView) -> IntVal;
			fn get_int_val(&self, var: IntView) -> Option<IntVal>;
		}
	}
}

impl TrailingActions for Solver {
	delegate! {
		to self.engine.state.trail {
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
