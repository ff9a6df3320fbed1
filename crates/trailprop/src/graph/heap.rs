//! Module containing an indexed binary heap of connection candidates, used to
//! select the next node to join the tree in Prim's algorithm.

use crate::IntVal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The direction of the arc through which a node would join a tree.
pub enum ArcDirection {
	/// The arc leaves the tree node: `(via, node)`.
	Outgoing,
	/// The arc enters the tree node: `(node, via)`.
	Incoming,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// A candidate connection for a node that is not yet part of a tree.
pub struct Candidate {
	/// The tree node that offered the connection.
	pub via: usize,
	/// The direction of the arc between `via` and the node.
	pub direction: ArcDirection,
	/// Whether the arc is mandatory.
	pub mandatory: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// An indexed binary min-heap that contains at most one entry per node.
///
/// Entries are ordered by their key, then mandatory candidates are preferred
/// over optional ones, and finally the node with the smallest index is
/// preferred. When a node is offered again, the entry is only replaced if the
/// new offer is strictly better, so the first of equally good offers is kept.
pub struct CandidateHeap {
	/// The nodes in the heap, in binary heap order.
	heap: Vec<usize>,
	/// Position of each node in `heap`, if it is enqueued.
	position: Vec<Option<usize>>,
	/// The key and best candidate of each enqueued node.
	entry: Vec<Option<(IntVal, Candidate)>>,
}

impl Candidate {
	/// Returns the arc, in the orientation of the graph, through which `node`
	/// is connected by this candidate.
	pub fn arc(&self, node: usize) -> (usize, usize) {
		match self.direction {
			ArcDirection::Outgoing => (self.via, node),
			ArcDirection::Incoming => (node, self.via),
		}
	}
}

impl CandidateHeap {
	/// Offer a connection with the given key for `node`, inserting the node if
	/// it is not yet enqueued, or improving its entry if the offer is strictly
	/// better than the current one.
	///
	/// Returns whether the heap changed.
	pub fn add(&mut self, node: usize, key: IntVal, candidate: Candidate) -> bool {
		match self.position[node] {
			Some(pos) => {
				let Some((cur_key, cur)) = self.entry[node] else {
					unreachable!("enqueued node without entry")
				};
				if (key, !candidate.mandatory) >= (cur_key, !cur.mandatory) {
					return false;
				}
				self.entry[node] = Some((key, candidate));
				self.sift_up(pos);
			}
			None => {
				self.entry[node] = Some((key, candidate));
				self.heap.push(node);
				let pos = self.heap.len() - 1;
				self.position[node] = Some(pos);
				self.sift_up(pos);
			}
		}
		true
	}

	/// Remove all entries from the heap.
	pub fn clear(&mut self) {
		for node in self.heap.drain(..) {
			self.position[node] = None;
			self.entry[node] = None;
		}
	}

	/// Returns whether the heap contains no entries.
	pub fn is_empty(&self) -> bool {
		self.heap.is_empty()
	}

	/// Returns the number of nodes in the heap.
	pub fn len(&self) -> usize {
		self.heap.len()
	}

	/// Internal method that returns whether the entry of node `a` should be
	/// popped before the entry of node `b`.
	fn less(&self, a: usize, b: usize) -> bool {
		let (Some((ka, ca)), Some((kb, cb))) = (self.entry[a], self.entry[b]) else {
			unreachable!("enqueued node without entry")
		};
		(ka, !ca.mandatory, a) < (kb, !cb.mandatory, b)
	}

	/// Returns the current best candidate of `node`, if it is enqueued.
	pub fn mate(&self, node: usize) -> Option<Candidate> {
		self.entry[node].map(|(_, c)| c)
	}

	/// Remove the node with the smallest entry from the heap, returning it
	/// together with its best candidate.
	pub fn pop(&mut self) -> Option<(usize, Candidate)> {
		let top = *self.heap.first()?;
		let last = self.heap.pop()?;
		if !self.heap.is_empty() {
			self.heap[0] = last;
			self.position[last] = Some(0);
			self.sift_down(0);
		}
		self.position[top] = None;
		let (_, candidate) = self.entry[top].take()?;
		Some((top, candidate))
	}

	/// Internal method to move the node at position `pos` towards the leaves
	/// until the heap order is restored.
	fn sift_down(&mut self, mut pos: usize) {
		loop {
			let left = 2 * pos + 1;
			let right = left + 1;
			let mut best = pos;
			if left < self.heap.len() && self.less(self.heap[left], self.heap[best]) {
				best = left;
			}
			if right < self.heap.len() && self.less(self.heap[right], self.heap[best]) {
				best = right;
			}
			if best == pos {
				return;
			}
			self.swap(pos, best);
			pos = best;
		}
	}

	/// Internal method to move the node at position `pos` towards the root
	/// until the heap order is restored.
	fn sift_up(&mut self, mut pos: usize) {
		while pos > 0 {
			let parent = (pos - 1) / 2;
			if !self.less(self.heap[pos], self.heap[parent]) {
				return;
			}
			self.swap(pos, parent);
			pos = parent;
		}
	}

	/// Internal method to swap the nodes at two positions of the heap.
	fn swap(&mut self, i: usize, j: usize) {
		self.heap.swap(i, j);
		self.position[self.heap[i]] = Some(i);
		self.position[self.heap[j]] = Some(j);
	}

	/// Create an empty heap for the nodes `0..num_nodes`.
	pub fn with_capacity(num_nodes: usize) -> Self {
		Self {
			heap: Vec::with_capacity(num_nodes),
			position: vec![None; num_nodes],
			entry: vec![None; num_nodes],
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::graph::heap::{ArcDirection, Candidate, CandidateHeap};

	/// Shorthand for an optional outgoing candidate.
	fn out(via: usize) -> Candidate {
		Candidate {
			via,
			direction: ArcDirection::Outgoing,
			mandatory: false,
		}
	}

	#[test]
	fn test_candidate_arc() {
		let c = Candidate {
			via: 3,
			direction: ArcDirection::Incoming,
			mandatory: false,
		};
		assert_eq!(c.arc(1), (1, 3));
		assert_eq!(out(3).arc(1), (3, 1));
	}

	#[test]
	fn test_heap_order() {
		let mut heap = CandidateHeap::with_capacity(6);
		assert!(heap.add(4, 7, out(0)));
		assert!(heap.add(1, 3, out(0)));
		assert!(heap.add(5, -2, out(0)));
		assert!(heap.add(2, 9, out(0)));
		assert!(heap.add(3, 3, out(0)));
		assert_eq!(heap.len(), 5);

		// Improve the key of node 2
		assert!(heap.add(2, 0, out(5)));
		assert_eq!(heap.mate(2), Some(out(5)));

		let mut order = Vec::new();
		while let Some((node, _)) = heap.pop() {
			order.push(node);
		}
		assert_eq!(order, vec![5, 2, 1, 3, 4]);
		assert!(heap.is_empty());
		assert_eq!(heap.mate(2), None);
	}

	#[test]
	fn test_heap_tie_break() {
		let mut heap = CandidateHeap::with_capacity(4);
		assert!(heap.add(1, 5, out(0)));
		// Equal offers do not replace the first one
		assert!(!heap.add(1, 5, out(2)));
		assert_eq!(heap.mate(1), Some(out(0)));
		// Worse offers are ignored
		assert!(!heap.add(1, 6, out(3)));
		// A mandatory arc with the same key is preferred
		let mandatory = Candidate {
			via: 3,
			direction: ArcDirection::Incoming,
			mandatory: true,
		};
		assert!(heap.add(1, 5, mandatory));
		assert_eq!(heap.mate(1), Some(mandatory));

		// Between nodes: mandatory first, then the smallest node
		assert!(heap.add(0, 5, out(3)));
		assert!(heap.add(2, 5, out(3)));
		assert_eq!(heap.pop(), Some((1, mandatory)));
		assert_eq!(heap.pop(), Some((0, out(3))));
		assert_eq!(heap.pop(), Some((2, out(3))));
		assert_eq!(heap.pop(), None);
	}

	#[test]
	fn test_heap_clear() {
		let mut heap = CandidateHeap::with_capacity(3);
		assert!(heap.add(0, 1, out(1)));
		assert!(heap.add(2, 1, out(1)));
		heap.clear();
		assert!(heap.is_empty());
		assert_eq!(heap.mate(0), None);
		// Nodes can be enqueued again after clearing
		assert!(heap.add(0, 4, out(2)));
		assert_eq!(heap.pop(), Some((0, out(2))));
	}
}
