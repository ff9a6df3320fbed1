//! Module containing an implementation of Prim's algorithm to find a minimum
//! spanning tree of the support graph of a routing constraint, which is used
//! as a (Held-Karp) lower bound on the cost of any circuit in the graph, and to
//! eliminate arcs by their reduced cost.

use fixedbitset::FixedBitSet;
use itertools::Itertools;
use tracing::{debug, trace};

use crate::{
	graph::{
		heap::{ArcDirection, Candidate, CandidateHeap},
		ArcSet, CostMatrix, DiGraph,
	},
	helpers::opt_field::OptField,
	Conflict, IntVal,
};

/// Type alias for a minimum spanning tree finder that only computes a bound.
pub type BoundMstFinder = PrimMstFinderImpl<0>;

/// Type alias for a minimum spanning tree finder that can also eliminate arcs
/// using [`PrimMstFinderImpl::perform_pruning`].
pub type FilteringMstFinder = PrimMstFinderImpl<1>;

/// The interface of the constraint that owns a minimum spanning tree finder.
pub trait MstHost {
	/// Create a conflict signalling that the relaxed constraint is infeasible.
	fn contradiction(&self) -> Conflict;
	/// The set of arcs that must be part of any solution.
	fn mandatory_arcs(&self) -> &ArcSet;
	/// The key used for mandatory arcs, which should not be larger than the
	/// cost of any arc.
	fn min_arc_value(&self) -> IntVal;
	/// Eliminate the arc `(from, to)` from any solution.
	fn remove_arc(&mut self, from: usize, to: usize) -> Result<(), Conflict>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A finder of minimum spanning trees in the undirected version of a directed
/// support graph, using Prim's algorithm starting from node `0`.
///
/// The constant `F` determines whether the finder tracks the information that
/// is required to eliminate arcs (`1`), or whether it only computes a bound
/// (`0`). See [`FilteringMstFinder`] and [`BoundMstFinder`].
pub struct PrimMstFinderImpl<const F: usize> {
	/// The arcs of the tree, in the orientation of the support graph.
	tree: DiGraph,
	/// The sum of the (real) costs of the arcs in the tree.
	tree_cost: IntVal,
	/// The largest cost of a non-mandatory arc in the tree.
	max_tree_arc: OptField<F, IntVal>,
	/// Candidate connections of the nodes that are not yet part of the tree.
	heap: CandidateHeap,
	/// The nodes that are part of the tree.
	in_tree: FixedBitSet,
	/// The number of arcs in the tree.
	tree_size: usize,
}

impl<const F: usize> PrimMstFinderImpl<F> {
	/// Internal method to add `node` as a leaf of the tree through `candidate`.
	fn add_arc(&mut self, costs: &CostMatrix, node: usize, candidate: Candidate) -> bool {
		let (from, to) = candidate.arc(node);
		if self.tree.arc_exists(to, from) || !self.tree.add_arc(from, to) {
			return false;
		}
		let cost = costs.cost(from, to);
		self.tree_cost += cost;
		if !candidate.mandatory {
			if let Some(max) = self.max_tree_arc.get_mut() {
				*max = (*max).max(cost);
			}
		}
		self.tree_size += 1;
		trace!(from, to, cost, mandatory = candidate.mandatory, "tree arc");
		true
	}

	/// Internal method to add `node` to the tree, and offer the connections to
	/// all its neighbours that are not yet part of the tree.
	fn add_node(
		&mut self,
		costs: &CostMatrix,
		graph: &DiGraph,
		mandatory: &ArcSet,
		min_val: IntVal,
		node: usize,
	) {
		if self.in_tree.put(node) {
			return;
		}
		let offer = |heap: &mut CandidateHeap, j: usize, direction: ArcDirection| {
			let (from, to) = match direction {
				ArcDirection::Outgoing => (node, j),
				ArcDirection::Incoming => (j, node),
			};
			let is_mandatory = mandatory.contains(from, to);
			let key = if is_mandatory {
				min_val
			} else {
				costs.cost(from, to)
			};
			let candidate = Candidate {
				via: node,
				direction,
				mandatory: is_mandatory,
			};
			let _ = heap.add(j, key, candidate);
		};
		for j in graph.successors(node) {
			if !self.in_tree.contains(j) {
				offer(&mut self.heap, j, ArcDirection::Outgoing);
			}
		}
		for j in graph.predecessors(node) {
			if !self.in_tree.contains(j) {
				offer(&mut self.heap, j, ArcDirection::Incoming);
			}
		}
	}

	/// Compute a minimum spanning tree of the (undirected version of the)
	/// support graph `graph`, returning its cost.
	///
	/// Arcs that are mandatory according to `host` are preferred over all other
	/// arcs, but the real cost of all arcs is accumulated. A conflict is
	/// returned when the graph is not connected.
	pub fn compute_mst<H: MstHost + ?Sized>(
		&mut self,
		costs: &CostMatrix,
		graph: &DiGraph,
		host: &H,
	) -> Result<IntVal, Conflict> {
		let n = graph.num_nodes();
		debug_assert_eq!(n, self.tree.num_nodes());
		debug_assert_eq!(n, costs.num_nodes());
		self.tree.clear();
		self.heap.clear();
		self.in_tree.clear();
		self.tree_cost = 0;
		self.tree_size = 0;
		let min_val = host.min_arc_value();
		if let Some(max) = self.max_tree_arc.get_mut() {
			*max = min_val;
		}
		if n == 0 {
			return Ok(0);
		}

		let mandatory = host.mandatory_arcs();
		self.add_node(costs, graph, mandatory, min_val, 0);
		while self.tree_size + 1 < n {
			let Some((node, candidate)) = self.heap.pop() else {
				break;
			};
			if self.in_tree.contains(node) || !self.add_arc(costs, node, candidate) {
				continue;
			}
			self.add_node(costs, graph, mandatory, min_val, node);
		}

		if self.tree_size + 1 != n {
			debug!(
				connected = self.tree_size + 1,
				nodes = n,
				"support graph is disconnected"
			);
			return Err(host.contradiction());
		}
		Ok(self.tree_cost)
	}

	/// Returns the arcs of the last computed tree.
	pub fn tree(&self) -> &DiGraph {
		&self.tree
	}

	/// Returns the cost of the last computed tree.
	pub fn tree_cost(&self) -> IntVal {
		self.tree_cost
	}

	/// Internal constructor of a finder for a graph with `num_nodes` nodes.
	fn with_field(num_nodes: usize, max_tree_arc: OptField<F, IntVal>) -> Self {
		Self {
			tree: DiGraph::new(num_nodes),
			tree_cost: 0,
			max_tree_arc,
			heap: CandidateHeap::with_capacity(num_nodes),
			in_tree: FixedBitSet::with_capacity(num_nodes),
			tree_size: 0,
		}
	}
}

impl PrimMstFinderImpl<0> {
	/// Create a finder that only computes bounds, for a graph with `num_nodes`
	/// nodes.
	pub fn new(num_nodes: usize) -> Self {
		Self::with_field(num_nodes, OptField::default())
	}
}

impl PrimMstFinderImpl<1> {
	/// Returns the largest cost of a non-mandatory arc in the last computed
	/// tree, or the minimum arc value if there is no such arc.
	pub fn max_tree_arc(&self) -> IntVal {
		let Some(&max) = self.max_tree_arc.get() else {
			unreachable!("filtering finder without maximum tree arc")
		};
		max
	}

	/// Create a finder that can eliminate arcs, for a graph with `num_nodes`
	/// nodes.
	pub fn new(num_nodes: usize) -> Self {
		Self::with_field(num_nodes, OptField::new(0))
	}

	/// Eliminate all arcs of the support graph that cannot be part of a
	/// solution with a cost of at most `upper_bound`, returning the number of
	/// eliminated arcs.
	///
	/// An arc `(i, j)` that is not part of the tree and is not mandatory is
	/// eliminated when `cost(i, j) - max_tree_arc > upper_bound - tree_cost`.
	/// This method must be called after [`Self::compute_mst`] with the same
	/// costs and support graph.
	pub fn perform_pruning<H: MstHost + ?Sized>(
		&self,
		costs: &CostMatrix,
		graph: &DiGraph,
		host: &mut H,
		upper_bound: IntVal,
	) -> Result<usize, Conflict> {
		let max_tree_arc = self.max_tree_arc();
		let delta = upper_bound.saturating_sub(self.tree_cost);
		let mandatory = host.mandatory_arcs();
		let eliminated = (0..graph.num_nodes())
			.flat_map(|i| graph.successors(i).map(move |j| (i, j)))
			.filter(|&(i, j)| {
				!self.tree.arc_exists(i, j)
					&& !mandatory.contains(i, j)
					&& costs.cost(i, j).saturating_sub(max_tree_arc) > delta
			})
			.collect_vec();
		for &(i, j) in &eliminated {
			trace!(from = i, to = j, cost = costs.cost(i, j), "eliminate arc");
			host.remove_arc(i, j)?;
		}
		debug!(
			eliminated = eliminated.len(),
			tree_cost = self.tree_cost,
			upper_bound,
			"reduced cost pruning"
		);
		Ok(eliminated.len())
	}
}
