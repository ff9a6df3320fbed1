//! Propagator that uses a minimum spanning tree of the graph of possible
//! successors as a (Held-Karp) lower bound on the cost of a single circuit
//! through all nodes, and eliminates arcs that cannot be part of a circuit
//! that is cheaper than the upper bound of the cost.

use tracing::trace;

use crate::{
	actions::{InitializationActions, InspectionActions, PropagationActions},
	graph::{
		prim_mst::{MstHost, PrimMstFinderImpl},
		ArcSet, CostMatrix, DiGraph,
	},
	propagator::{Conflict, Entailment, Propagator},
	solver::{
		engine::{activation_list::IntPropCond, queue::PriorityLevel},
		poster::{BoxedPropagator, Poster, QueuePreferences},
		value::IntVal,
		view::IntView,
	},
	ReformulationError,
};

/// Type alias for the Held-Karp propagator that eliminates arcs using their
/// reduced cost.
pub type HeldKarp = HeldKarpImpl<1>;

/// Type alias for the Held-Karp propagator that only enforces the lower bound
/// on the cost.
pub type HeldKarpBound = HeldKarpImpl<0>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Propagator for the constraint that the successor variables form a single
/// circuit through all nodes, and that `cost` is at least the sum of the costs
/// of the arcs in the circuit.
///
/// The value `j` in the domain of `succs[i]` represents the arc `(i, j)`. The
/// propagator only reasons about the relaxation where the circuit is replaced
/// by a spanning tree; whether the fixed successors form a circuit is only
/// checked by [`Propagator::entailment`].
///
/// `F` should be `1` if the propagator eliminates arcs, or `0` if it only
/// enforces the bound. Other values are invalid.
pub struct HeldKarpImpl<const F: usize> {
	/// Successor variables
	succs: Vec<IntView>,
	/// Costs of the arcs
	costs: CostMatrix,
	/// Variable that is at least the cost of the circuit
	cost: IntView,
	/// Minimum cost of any arc
	min_arc: IntVal,
	/// The graph of possible arcs, rebuilt from the successor variables
	graph: DiGraph,
	/// The arcs of which the successor variable is fixed
	mandatory: ArcSet,
	/// Finder of the minimum spanning tree of `graph`
	finder: PrimMstFinderImpl<F>,
}

/// [`Poster`] for the [`HeldKarp`] and [`HeldKarpBound`] propagators.
struct HeldKarpPoster<const F: usize> {
	/// Successor variables
	succs: Vec<IntView>,
	/// Costs of the arcs
	costs: CostMatrix,
	/// Variable that is at least the cost of the circuit
	cost: IntView,
	/// Finder of minimum spanning trees for the number of nodes
	finder: PrimMstFinderImpl<F>,
}

/// The [`MstHost`] view of a running [`HeldKarpImpl`] propagator.
struct SuccessorHost<'a> {
	/// Actions of the running propagator
	actions: &'a mut dyn PropagationActions,
	/// Successor variables
	succs: &'a [IntView],
	/// The arcs of which the successor variable is fixed
	mandatory: &'a ArcSet,
	/// Minimum cost of any arc
	min_arc: IntVal,
	/// Whether removing an arc changed the domain of a successor variable
	changed: bool,
}

impl<const F: usize> HeldKarpImpl<F> {
	/// Rebuild the graph of possible arcs and the set of mandatory arcs from the
	/// domains of the successor variables, ignoring self loops and values that
	/// are not nodes.
	fn build_support_graph<A: InspectionActions + ?Sized>(&mut self, actions: &A) {
		let n = self.succs.len();
		self.graph.clear();
		self.mandatory.clear();
		for (i, &succ) in self.succs.iter().enumerate() {
			let (lb, ub) = actions.get_int_bounds(succ);
			let fixed = lb == ub;
			for j in lb.max(0)..=ub.min(n as IntVal - 1) {
				let node = j as usize;
				if node != i && actions.check_int_in_domain(succ, j) {
					let _ = self.graph.add_arc(i, node);
					if fixed {
						let _ = self.mandatory.insert(i, node);
					}
				}
			}
		}
	}

	/// Compute the minimum spanning tree of the current graph of possible arcs,
	/// and enforce its cost as a lower bound of the cost of the circuit.
	fn compute_bound(&mut self, actions: &mut dyn PropagationActions) -> Result<(), Conflict> {
		self.build_support_graph(&*actions);
		let mut host = SuccessorHost {
			actions,
			succs: &self.succs,
			mandatory: &self.mandatory,
			min_arc: self.min_arc,
			changed: false,
		};
		let bound = self.finder.compute_mst(&self.costs, &self.graph, &host)?;
		trace!(
			bound,
			arcs = self.graph.num_arcs(),
			mandatory = self.mandatory.len(),
			"spanning tree bound"
		);
		let _ = host.actions.set_int_lower_bound(self.cost, bound)?;
		Ok(())
	}

	/// Internal constructor of the poster, checking the preconditions of the
	/// constraint.
	fn poster(
		succs: Vec<IntView>,
		costs: CostMatrix,
		cost: IntView,
		finder: PrimMstFinderImpl<F>,
	) -> HeldKarpPoster<F> {
		assert!(!succs.is_empty(), "a circuit must contain at least one node");
		assert_eq!(
			costs.num_nodes(),
			succs.len(),
			"the cost matrix must contain the costs of all arcs between the nodes"
		);
		for i in 0..costs.num_nodes() {
			for j in 0..costs.num_nodes() {
				assert!(
					costs.cost(i, j) >= 0,
					"the cost of arc ({i}, {j}) must be non-negative"
				);
			}
		}
		HeldKarpPoster {
			succs,
			costs,
			cost,
			finder,
		}
	}
}

impl HeldKarp {
	/// Prepare a [`HeldKarp`] propagator for the circuit formed by `succs` with
	/// the given (non-negative) arc costs, where `cost` is at least the cost of
	/// the circuit.
	///
	/// # Panics
	///
	/// This method will panic if the cost matrix does not match the number of
	/// successor variables, or if it contains negative costs.
	pub fn prepare<V: Into<IntView>, VI: IntoIterator<Item = V>>(
		succs: VI,
		costs: CostMatrix,
		cost: IntView,
	) -> impl Poster {
		let succs: Vec<IntView> = succs.into_iter().map(Into::into).collect();
		let finder = PrimMstFinderImpl::<1>::new(succs.len());
		Self::poster(succs, costs, cost, finder)
	}
}

impl HeldKarpBound {
	/// Prepare a [`HeldKarpBound`] propagator for the circuit formed by `succs`
	/// with the given (non-negative) arc costs, where `cost` is at least the
	/// cost of the circuit.
	///
	/// # Panics
	///
	/// This method will panic if the cost matrix does not match the number of
	/// successor variables, or if it contains negative costs.
	pub fn prepare<V: Into<IntView>, VI: IntoIterator<Item = V>>(
		succs: VI,
		costs: CostMatrix,
		cost: IntView,
	) -> impl Poster {
		let succs: Vec<IntView> = succs.into_iter().map(Into::into).collect();
		let finder = PrimMstFinderImpl::<0>::new(succs.len());
		Self::poster(succs, costs, cost, finder)
	}
}

/// Check whether the fixed successors form a single circuit through all
/// nodes, and whether `cost` is at least its cost.
fn circuit_entailment<const F: usize>(
	prop: &HeldKarpImpl<F>,
	actions: &dyn InspectionActions,
) -> Entailment {
	let Some(next) = prop
		.succs
		.iter()
		.map(|&s| actions.get_int_val(s))
		.collect::<Option<Vec<_>>>()
	else {
		return Entailment::Unknown;
	};
	let n = next.len();
	let mut total = 0;
	let mut visited = 0;
	let mut node = 0;
	loop {
		let succ = match usize::try_from(next[node]) {
			Ok(j) if j < n => j,
			_ => return Entailment::False,
		};
		total += prop.costs.cost(node, succ);
		visited += 1;
		node = succ;
		if node == 0 || visited > n {
			break;
		}
	}
	if node != 0 || visited != n {
		return Entailment::False;
	}
	let (lb, ub) = actions.get_int_bounds(prop.cost);
	if ub < total {
		Entailment::False
	} else if lb >= total {
		Entailment::True
	} else {
		Entailment::Unknown
	}
}

impl Propagator for HeldKarpImpl<0> {
	#[tracing::instrument(name = "held_karp_bound", level = "trace", skip(self, actions))]
	fn propagate(&mut self, actions: &mut dyn PropagationActions) -> Result<(), Conflict> {
		self.compute_bound(actions)
	}

	fn entailment(&self, actions: &dyn InspectionActions) -> Entailment {
		circuit_entailment(self, actions)
	}
}

impl Propagator for HeldKarpImpl<1> {
	#[tracing::instrument(name = "held_karp", level = "trace", skip(self, actions))]
	fn propagate(&mut self, actions: &mut dyn PropagationActions) -> Result<(), Conflict> {
		// Eliminating arcs can change the tree, so repeat until no domain changes
		loop {
			self.compute_bound(actions)?;
			let upper_bound = actions.get_int_upper_bound(self.cost);
			let mut host = SuccessorHost {
				actions: &mut *actions,
				succs: &self.succs,
				mandatory: &self.mandatory,
				min_arc: self.min_arc,
				changed: false,
			};
			let _ = self
				.finder
				.perform_pruning(&self.costs, &self.graph, &mut host, upper_bound)?;
			if !host.changed {
				return Ok(());
			}
		}
	}

	fn entailment(&self, actions: &dyn InspectionActions) -> Entailment {
		circuit_entailment(self, actions)
	}
}

impl<const F: usize> Poster for HeldKarpPoster<F>
where
	HeldKarpImpl<F>: Propagator + 'static,
{
	fn post<I: InitializationActions + ?Sized>(
		self,
		actions: &mut I,
	) -> Result<(BoxedPropagator, QueuePreferences), ReformulationError> {
		let n = self.succs.len();
		let prop = HeldKarpImpl {
			min_arc: self.costs.min_arc_value(),
			graph: DiGraph::new(n),
			mandatory: ArcSet::new(n),
			succs: self.succs,
			costs: self.costs,
			cost: self.cost,
			finder: self.finder,
		};
		for (i, &v) in prop.succs.iter().enumerate() {
			actions.subscribe_int(v, IntPropCond::Domain, i as u32);
		}
		if F == 1 {
			// Only arc elimination depends on the upper bound of the cost
			actions.subscribe_int(prop.cost, IntPropCond::UpperBound, n as u32);
		}
		Ok((
			Box::new(prop),
			QueuePreferences {
				enqueue_on_post: true,
				priority: PriorityLevel::Lowest,
				fine_events: false,
			},
		))
	}
}

impl MstHost for SuccessorHost<'_> {
	fn contradiction(&self) -> Conflict {
		self.actions.conflict()
	}

	fn mandatory_arcs(&self) -> &ArcSet {
		self.mandatory
	}

	fn min_arc_value(&self) -> IntVal {
		self.min_arc
	}

	fn remove_arc(&mut self, from: usize, to: usize) -> Result<(), Conflict> {
		self.changed |= self
			.actions
			.set_int_not_eq(self.succs[from], to as IntVal)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use itertools::Itertools;
	use rand::{rngs::SmallRng, Rng, SeedableRng};
	use rangelist::RangeList;
	use tracing_test::traced_test;

	use crate::{
		actions::InspectionActions,
		graph::CostMatrix,
		propagator::{
			held_karp::{HeldKarp, HeldKarpBound},
			Entailment,
		},
		solver::engine::solving_context::SolvingContext,
		Goal, IntVal, IntView, SolveResult, Solver,
	};

	/// The values in the domains of `vars`.
	fn domains(slv: &Solver, vars: &[IntView]) -> Vec<Vec<IntVal>> {
		vars.iter()
			.map(|&v| {
				let (lb, ub) = slv.get_int_bounds(v);
				(lb..=ub).filter(|&i| slv.check_int_in_domain(v, i)).collect()
			})
			.collect()
	}

	/// Create successor variables for `n` nodes, excluding self loops.
	fn successors(slv: &mut Solver, n: usize) -> Vec<IntView> {
		let last = n as IntVal - 1;
		(0..n as IntVal)
			.map(|i| {
				let domain = if i == 0 {
					RangeList::from_iter([1..=last])
				} else if i == last {
					RangeList::from_iter([0..=last - 1])
				} else {
					RangeList::from_iter([0..=i - 1, i + 1..=last])
				};
				slv.new_int_var(domain)
			})
			.collect()
	}

	/// Costs of an asymmetric instance with 4 nodes.
	fn costs4() -> CostMatrix {
		CostMatrix::new(4, vec![0, 3, 9, 4, 2, 0, 6, 8, 7, 5, 0, 1, 3, 9, 2, 0])
	}

	#[test]
	#[traced_test]
	fn test_held_karp_prune() {
		let mut slv = Solver::default();
		let succs = successors(&mut slv, 3);
		let cost = slv.new_int_var((0..=2).into());
		let costs = CostMatrix::from_fn(3, |i, j| if (i, j) == (0, 1) { 5 } else { 1 });
		let _ = slv
			.add_propagator(HeldKarp::prepare(succs.clone(), costs, cost))
			.unwrap();
		slv.propagate().unwrap();
		assert_eq!(slv.get_int_val(cost), Some(2));
		// The expensive arc (0, 1) is eliminated
		assert_eq!(slv.get_int_val(succs[0]), Some(2));
	}

	#[test]
	#[traced_test]
	fn test_held_karp_bound_only() {
		let mut slv = Solver::default();
		let succs = successors(&mut slv, 3);
		let cost = slv.new_int_var((0..=2).into());
		let costs = CostMatrix::from_fn(3, |i, j| if (i, j) == (0, 1) { 5 } else { 1 });
		let _ = slv
			.add_propagator(HeldKarpBound::prepare(succs.clone(), costs, cost))
			.unwrap();
		slv.propagate().unwrap();
		assert_eq!(slv.get_int_val(cost), Some(2));
		assert!(slv.check_int_in_domain(succs[0], 1));
	}

	#[test]
	#[traced_test]
	fn test_held_karp_mandatory_bound() {
		let mut slv = Solver::default();
		let succs = successors(&mut slv, 4);
		let cost = slv.new_int_var((0..=100).into());
		let _ = slv
			.add_propagator(HeldKarpBound::prepare(succs.clone(), costs4(), cost))
			.unwrap();
		slv.propagate().unwrap();
		// Tree: (1, 0), (3, 0) and (2, 3)
		let root_bound = slv.get_int_lower_bound(cost);
		assert_eq!(root_bound, 6);

		slv.new_decision_level();
		// Force the expensive arc (3, 1) into the tree
		assert_eq!(slv.set_int_val(succs[3], 1), Ok(true));
		slv.propagate().unwrap();
		assert!(slv.get_int_lower_bound(cost) >= root_bound + 9 - 3);
		slv.backtrack(0);
		assert_eq!(slv.get_int_lower_bound(cost), root_bound);
	}

	#[test]
	#[traced_test]
	fn test_held_karp_disconnected() {
		let mut slv = Solver::default();
		let a = slv.new_int_var(RangeList::from_iter([1..=1, 5..=6]));
		let b = slv.new_int_var((0..=1).into());
		let c = slv.new_int_var(RangeList::from_iter([2..=2, 7..=7]));
		let cost = slv.new_int_var((0..=10).into());
		let prop = slv
			.add_propagator(HeldKarp::prepare(
				[a, b, c],
				CostMatrix::from_fn(3, |_, _| 1),
				cost,
			))
			.unwrap();
		let conflict = slv.propagate().unwrap_err();
		assert_eq!(conflict.cause(), Some(prop));
		assert_eq!(slv.search_statistics().conflicts(), 1);
		slv.backtrack(0);
	}

	#[test]
	#[traced_test]
	fn test_held_karp_optimal_tour() {
		let costs = costs4();
		let optimum = (1..4)
			.permutations(3)
			.map(|p| {
				let tour = [0, p[0], p[1], p[2], 0];
				tour.iter()
					.tuple_windows()
					.map(|(&i, &j)| costs.cost(i, j))
					.sum::<IntVal>()
			})
			.min()
			.unwrap();

		for filtering in [true, false] {
			let mut slv = Solver::default();
			let succs = successors(&mut slv, 4);
			let cost = slv.new_int_var((0..=40).into());
			if filtering {
				let _ = slv
					.add_propagator(HeldKarp::prepare(succs.clone(), costs.clone(), cost))
					.unwrap();
			} else {
				let _ = slv
					.add_propagator(HeldKarpBound::prepare(succs.clone(), costs.clone(), cost))
					.unwrap();
			}
			let mut found = Vec::new();
			let (status, best) = slv.branch_and_bound(cost, Goal::Minimize, &succs, |sol| {
				found.push(sol(cost));
			});
			assert_eq!(status, SolveResult::Complete);
			assert_eq!(best, Some(optimum));
			// Every solution improves on the previous one
			assert!(found.iter().tuple_windows().all(|(a, b)| b < a));
			// The solver is restored after the search
			assert_eq!(slv.decision_level(), 0);
			assert_eq!(slv.get_int_val(succs[0]), None);
		}
	}

	#[test]
	#[traced_test]
	fn test_held_karp_entailment() {
		let mut slv = Solver::default();
		let succs = successors(&mut slv, 3);
		let cost = slv.new_int_var((0..=10).into());
		let costs = CostMatrix::from_fn(3, |i, j| (i + 2 * j) as IntVal);
		let prop = slv
			.add_propagator(HeldKarp::prepare(succs.clone(), costs, cost))
			.unwrap();
		slv.propagate().unwrap();
		assert_eq!(slv.get_int_bounds(cost), (3, 10));
		assert_eq!(slv.propagator_entailment(prop), Entailment::Unknown);

		// Circuit 0 -> 1 -> 2 -> 0 with cost 2 + 5 + 2 = 9
		slv.new_decision_level();
		assert_eq!(slv.set_int_val(succs[0], 1), Ok(true));
		assert_eq!(slv.set_int_val(succs[1], 2), Ok(true));
		assert_eq!(slv.set_int_val(succs[2], 0), Ok(true));
		assert_eq!(slv.propagator_entailment(prop), Entailment::Unknown);
		assert_eq!(slv.set_int_lower_bound(cost, 9), Ok(true));
		assert_eq!(slv.propagator_entailment(prop), Entailment::True);
		slv.backtrack(0);

		// Two circuits: 0 -> 1 -> 0 and 2 -> 0
		slv.new_decision_level();
		assert_eq!(slv.set_int_val(succs[0], 1), Ok(true));
		assert_eq!(slv.set_int_val(succs[1], 0), Ok(true));
		assert_eq!(slv.set_int_val(succs[2], 0), Ok(true));
		assert_eq!(slv.propagator_entailment(prop), Entailment::False);
		slv.backtrack(0);

		// Circuit 0 -> 2 -> 1 -> 0 with cost 4 + 4 + 1 = 9 is too expensive
		slv.new_decision_level();
		assert_eq!(slv.set_int_val(succs[0], 2), Ok(true));
		assert_eq!(slv.set_int_val(succs[2], 1), Ok(true));
		assert_eq!(slv.set_int_val(succs[1], 0), Ok(true));
		assert_eq!(slv.set_int_upper_bound(cost, 8), Ok(true));
		assert_eq!(slv.propagator_entailment(prop), Entailment::False);
		slv.backtrack(0);
	}

	#[test]
	fn test_held_karp_fixpoint() {
		let mut rng = SmallRng::seed_from_u64(42);
		for _ in 0..500 {
			let n = rng.gen_range(4..=6);
			let costs = CostMatrix::from_fn(n, |i, j| {
				if i == j {
					0
				} else {
					rng.gen_range(0..=9)
				}
			});
			let mut slv = Solver::default();
			let succs = successors(&mut slv, n);
			for &s in &succs {
				for j in 0..n as IntVal {
					if rng.gen_bool(0.2) {
						let _ = slv.set_int_not_eq(s, j);
					}
				}
			}
			let max_cost: IntVal = rng.gen_range(5..=40);
			let cost = slv.new_int_var((0..=max_cost).into());
			let prop = slv
				.add_propagator(HeldKarp::prepare(succs.clone(), costs, cost))
				.unwrap();
			if slv.propagate().is_err() {
				continue;
			}

			// Running the propagator again must not change any domain
			let vars = succs.iter().copied().chain([cost]).collect_vec();
			let before = domains(&slv, &vars);
			let result = SolvingContext::new(&mut slv.engine.state, prop)
				.run_propagator(&mut slv.engine.propagators[prop], Vec::new());
			assert_eq!(result, Ok(()));
			assert_eq!(domains(&slv, &vars), before);
		}
	}

	#[test]
	fn test_held_karp_cost_subscription() {
		for filtering in [false, true] {
			let mut slv = Solver::default();
			let succs = successors(&mut slv, 4);
			let cost = slv.new_int_var((0..=40).into());
			if filtering {
				let _ = slv
					.add_propagator(HeldKarp::prepare(succs, costs4(), cost))
					.unwrap();
			} else {
				let _ = slv
					.add_propagator(HeldKarpBound::prepare(succs, costs4(), cost))
					.unwrap();
			}
			slv.propagate().unwrap();
			let before = slv.search_statistics().propagations();

			// Only the filtering propagator is woken by a new upper bound
			assert_eq!(slv.set_int_upper_bound(cost, 30), Ok(true));
			slv.propagate().unwrap();
			let woken = slv.search_statistics().propagations() - before;
			assert_eq!(woken, u64::from(filtering));
		}
	}

	#[test]
	#[should_panic(expected = "must be non-negative")]
	fn test_held_karp_negative_cost() {
		let mut slv = Solver::default();
		let succs = successors(&mut slv, 2);
		let cost = slv.new_int_var((0..=10).into());
		let _ = HeldKarp::prepare(succs, CostMatrix::new(2, vec![0, -1, 1, 0]), cost);
	}
}
