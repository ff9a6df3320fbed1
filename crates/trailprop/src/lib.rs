//! # Trailprop - A Trail-Based Propagation Core
//!
//! Trailprop is the propagation core of a finite domain constraint solver. It
//! contains an engine that runs propagators until a fixpoint is reached, and
//! stores the domains of integer variables and the incremental state of the
//! propagators in trailed data structures that are restored automatically when
//! the solver backtracks.
//!
//! Propagators can subscribe to fine grained events on the variables in their
//! scope, allowing them to update their state incrementally, and can declare
//! themselves passive when they can no longer contribute to the search. The
//! crate contains a counting propagator ([`SelfLoopCount`]), and a propagator
//! that uses the minimum spanning tree of the successor graph as a Held-Karp
//! lower bound for the cost of a circuit ([`HeldKarp`]), removing arcs that
//! cannot be part of any improving solution.
//!
//! A simple depth first search is provided on [`Solver`] to enumerate the
//! solutions of small problems and to find optimal solutions by branch and
//! bound.

pub mod actions;
pub mod graph;
pub(crate) mod helpers;
pub mod propagator;
pub mod solver;

use thiserror::Error;

pub use crate::{
	graph::{
		heap::{ArcDirection, Candidate, CandidateHeap},
		prim_mst::{BoundMstFinder, FilteringMstFinder, MstHost, PrimMstFinderImpl},
		ArcSet, CostMatrix, DiGraph,
	},
	propagator::{
		held_karp::{HeldKarp, HeldKarpBound, HeldKarpImpl},
		self_loop_count::SelfLoopCount,
		Conflict, DynPropClone, Entailment, Propagator,
	},
	solver::{
		engine::{
			activation_list::{IntEvent, IntPropCond},
			queue::PriorityLevel,
			trail::{TrailedInt, TrailedSet},
			PropRef, SearchStatistics,
		},
		poster::{BoxedPropagator, Poster, QueuePreferences},
		value::{IntSetVal, IntVal, Valuation},
		view::IntView,
		Goal, InitStatistics, SolveResult, Solver,
	},
};

#[derive(Error, Debug, PartialEq, Eq)]
/// Error type used when adding propagators to a [`Solver`], or when the
/// problem is otherwise reformulated.
pub enum ReformulationError {
	#[error("The problem is trivially unsatisfiable")]
	/// Error used when the problem is found to be unsatisfiable without requiring
	/// any search.
	TrivialUnsatisfiable,
}
