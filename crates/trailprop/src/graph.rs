//! Module containing the (dense) graph structures used by the graph-based
//! propagators.
//!
//! Nodes are identified by their index in `0..n`, and all neighbourhoods are
//! stored as bit sets, so that iteration over the neighbours of a node is in
//! ascending order and deterministic.

pub(crate) mod heap;
pub(crate) mod prim_mst;

use fixedbitset::FixedBitSet;

use crate::IntVal;

#[derive(Clone, Debug, PartialEq, Eq)]
/// A set of arcs in a directed graph with a fixed number of nodes.
///
/// The arc `(from, to)` is stored as the bit `from * n + to`.
pub struct ArcSet {
	/// Number of nodes in the graph.
	n: usize,
	/// The arcs contained in the set.
	bits: FixedBitSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A matrix of the (integer) costs of the arcs between `n` nodes.
pub struct CostMatrix {
	/// Number of nodes.
	n: usize,
	/// Costs in row-major order, i.e., the cost of `(from, to)` is stored at
	/// `from * n + to`.
	costs: Vec<IntVal>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A directed graph over the nodes `0..n`, storing for each node the set of
/// its successors and the set of its predecessors.
pub struct DiGraph {
	/// Successors of each node.
	succ: Vec<FixedBitSet>,
	/// Predecessors of each node.
	pred: Vec<FixedBitSet>,
	/// Number of arcs in the graph.
	num_arcs: usize,
}

impl ArcSet {
	/// Remove all arcs from the set.
	pub fn clear(&mut self) {
		self.bits.clear();
	}

	/// Returns whether the arc `(from, to)` is contained in the set.
	pub fn contains(&self, from: usize, to: usize) -> bool {
		debug_assert!(from < self.n && to < self.n);
		self.bits.contains(from * self.n + to)
	}

	/// Add the arc `(from, to)` to the set, returning whether it was not yet
	/// contained.
	pub fn insert(&mut self, from: usize, to: usize) -> bool {
		debug_assert!(from < self.n && to < self.n);
		!self.bits.put(from * self.n + to)
	}

	/// Returns whether the set contains no arcs.
	pub fn is_empty(&self) -> bool {
		self.bits.ones().next().is_none()
	}

	/// Iterate over the arcs in the set, ordered by their origin and then by
	/// their destination.
	pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
		self.bits.ones().map(|a| (a / self.n, a % self.n))
	}

	/// Returns the number of arcs in the set.
	pub fn len(&self) -> usize {
		self.bits.count_ones(..)
	}

	/// Create an empty set of arcs between `n` nodes.
	pub fn new(n: usize) -> Self {
		Self {
			n,
			bits: FixedBitSet::with_capacity(n * n),
		}
	}

	/// Remove the arc `(from, to)` from the set, returning whether it was
	/// contained.
	pub fn remove(&mut self, from: usize, to: usize) -> bool {
		debug_assert!(from < self.n && to < self.n);
		let index = from * self.n + to;
		let present = self.bits.contains(index);
		self.bits.set(index, false);
		present
	}
}

impl CostMatrix {
	/// Returns the cost of the arc `(from, to)`.
	pub fn cost(&self, from: usize, to: usize) -> IntVal {
		debug_assert!(from < self.n && to < self.n);
		self.costs[from * self.n + to]
	}

	/// Create a cost matrix for `n` nodes, where the cost of each arc is given
	/// by the function `f(from, to)`.
	pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> IntVal) -> Self {
		let mut costs = Vec::with_capacity(n * n);
		for from in 0..n {
			for to in 0..n {
				costs.push(f(from, to));
			}
		}
		Self { n, costs }
	}

	/// Returns the minimum cost of any arc between two different nodes, or `0`
	/// if there are no such arcs.
	pub fn min_arc_value(&self) -> IntVal {
		(0..self.n)
			.flat_map(|from| (0..self.n).map(move |to| (from, to)))
			.filter(|&(from, to)| from != to)
			.map(|(from, to)| self.cost(from, to))
			.min()
			.unwrap_or(0)
	}

	/// Create a cost matrix for `n` nodes from the costs given in row-major
	/// order.
	///
	/// # Panics
	///
	/// This method will panic if the number of costs is not `n * n`.
	pub fn new(n: usize, costs: Vec<IntVal>) -> Self {
		assert_eq!(
			costs.len(),
			n * n,
			"the cost matrix for {n} nodes must contain {} costs",
			n * n
		);
		Self { n, costs }
	}

	/// Returns the number of nodes for which the matrix contains the costs.
	pub fn num_nodes(&self) -> usize {
		self.n
	}
}

impl DiGraph {
	/// Add the arc `(from, to)` to the graph, returning whether it was not yet
	/// present.
	pub fn add_arc(&mut self, from: usize, to: usize) -> bool {
		if self.succ[from].put(to) {
			return false;
		}
		self.pred[to].insert(from);
		self.num_arcs += 1;
		true
	}

	/// Returns whether the arc `(from, to)` is present in the graph.
	pub fn arc_exists(&self, from: usize, to: usize) -> bool {
		self.succ[from].contains(to)
	}

	/// Remove all arcs from the graph.
	pub fn clear(&mut self) {
		for set in self.succ.iter_mut().chain(self.pred.iter_mut()) {
			set.clear();
		}
		self.num_arcs = 0;
	}

	/// Create a graph with `num_nodes` nodes and no arcs.
	pub fn new(num_nodes: usize) -> Self {
		Self {
			succ: vec![FixedBitSet::with_capacity(num_nodes); num_nodes],
			pred: vec![FixedBitSet::with_capacity(num_nodes); num_nodes],
			num_arcs: 0,
		}
	}

	/// Returns the number of arcs in the graph.
	pub fn num_arcs(&self) -> usize {
		self.num_arcs
	}

	/// Returns the number of nodes in the graph.
	pub fn num_nodes(&self) -> usize {
		self.succ.len()
	}

	/// Iterate (in ascending order) over the nodes that have an arc to `node`.
	pub fn predecessors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
		self.pred[node].ones()
	}

	/// Remove the arc `(from, to)` from the graph, returning whether it was
	/// present.
	pub fn remove_arc(&mut self, from: usize, to: usize) -> bool {
		if !self.succ[from].contains(to) {
			return false;
		}
		self.succ[from].set(to, false);
		self.pred[to].set(from, false);
		self.num_arcs -= 1;
		true
	}

	/// Iterate (in ascending order) over the nodes to which `node` has an arc.
	pub fn successors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
		self.succ[node].ones()
	}
}
