//! This module contains the data structures used to trail values during the
//! search process. Changes made to trailed values are recorded in the central
//! [`Trail`] structure, if the search process needs to backtrack, then these
//! values can be restored to their previous state.

use std::mem;

use index_vec::IndexVec;
use tracing::trace;

use crate::{actions::TrailingActions, IntVal};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A set of small indices stored as a sparse set.
///
/// The members of the set are kept in `dense[..len]`, the indices that are not
/// members are kept in `dense[len..]`. This allows constant time insertion,
/// removal, and membership tests, and makes it cheap to iterate over the
/// members.
struct SparseSet {
	/// Permutation of all indices, members first.
	dense: Vec<u32>,
	/// The position of every index in `dense`.
	sparse: Vec<u32>,
	/// The number of members in the set.
	len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// The central storage of all values that are restored when the search
/// process backtracks.
pub(crate) struct Trail {
	/// The undo records of the changes made since the first decision.
	trail: Vec<TrailEvent>,
	/// The length of the trail when previous decisions were made.
	prev_len: Vec<usize>,

	/// Stores the current value of trailed integer values.
	int_value: IndexVec<TrailedInt, IntVal>,
	/// Stores the current members of trailed sets.
	set_value: IndexVec<TrailedSet, SparseSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// An event that is recorded such that it can be undone.
pub(crate) enum TrailEvent {
	/// The assignment of a trailed integer value, and the previous value it had.
	IntAssignment(TrailedInt, IntVal),
	/// The insertion of an element into a trailed set.
	SetInsert(TrailedSet, u32),
	/// The removal of an element from a trailed set.
	SetRemove(TrailedSet, u32),
}

impl SparseSet {
	/// Create a set that can contain the indices `0..capacity`, starting with
	/// the given members.
	fn new(capacity: usize, members: impl IntoIterator<Item = u32>) -> Self {
		let dense: Vec<u32> = (0..capacity as u32).collect();
		let mut set = Self {
			sparse: dense.clone(),
			dense,
			len: 0,
		};
		for elem in members {
			debug_assert!((elem as usize) < capacity);
			let _ = set.insert(elem);
		}
		set
	}

	#[inline]
	/// Whether `elem` is a member of the set.
	fn contains(&self, elem: u32) -> bool {
		self.sparse
			.get(elem as usize)
			.is_some_and(|&pos| (pos as usize) < self.len)
	}

	/// Add `elem` to the set, returning whether it was not yet a member.
	fn insert(&mut self, elem: u32) -> bool {
		if self.contains(elem) {
			return false;
		}
		let pos = self.sparse[elem as usize] as usize;
		self.swap(pos, self.len);
		self.len += 1;
		true
	}

	/// The members of the set (in no particular order).
	fn members(&self) -> &[u32] {
		&self.dense[..self.len]
	}

	/// Remove `elem` from the set, returning whether it was a member.
	fn remove(&mut self, elem: u32) -> bool {
		if !self.contains(elem) {
			return false;
		}
		let pos = self.sparse[elem as usize] as usize;
		self.len -= 1;
		self.swap(pos, self.len);
		true
	}

	/// Swap the positions `i` and `j` in `dense`, keeping `sparse` in sync.
	fn swap(&mut self, i: usize, j: usize) {
		self.dense.swap(i, j);
		self.sparse[self.dense[i] as usize] = i as u32;
		self.sparse[self.dense[j] as usize] = j as u32;
	}
}

impl Trail {
	/// Return the current decision level
	pub(crate) fn decision_level(&self) -> u32 {
		self.prev_len.len() as u32
	}

	/// Notify the Trail of a backtracking operation.
	///
	/// The state of the trailed values is restored to the requested level.
	pub(crate) fn notify_backtrack(&mut self, level: usize) {
		if level >= self.prev_len.len() {
			return;
		}

		let len = self.prev_len[level];
		self.prev_len.truncate(level);
		debug_assert!(
			len <= self.trail.len(),
			"backtracking to level {level} length {len}, but trail is already at length {}",
			self.trail.len()
		);
		let undone = self.trail.len() - len;
		while self.trail.len() > len {
			let _ = self.undo();
		}
		trace!(level, undone, "trail restored");
	}

	/// Notify the Trail of a new decision level to which the trail can be restored.
	pub(crate) fn notify_new_decision_level(&mut self) {
		self.prev_len.push(self.trail.len());
	}

	/// Internal method to push a change to the trail
	///
	/// Changes made at the root level are never undone, and are therefore not
	/// recorded.
	fn push_trail(&mut self, event: TrailEvent) {
		if !self.prev_len.is_empty() {
			self.trail.push(event);
		}
	}

	/// Create a new trailed integer with initial value `val`
	pub(crate) fn track_int(&mut self, val: IntVal) -> TrailedInt {
		self.int_value.push(val)
	}

	/// Create a new trailed set that can contain the indices `0..capacity`.
	///
	/// If `full` is set, then all indices are initially members of the set,
	/// otherwise the set starts empty.
	pub(crate) fn track_set(&mut self, capacity: usize, full: bool) -> TrailedSet {
		let members = if full { capacity } else { 0 };
		self.track_set_from(capacity, 0..members as u32)
	}

	/// Create a new trailed set that can contain the indices `0..capacity`, and
	/// initially contains `members`.
	pub(crate) fn track_set_from(
		&mut self,
		capacity: usize,
		members: impl IntoIterator<Item = u32>,
	) -> TrailedSet {
		self.set_value.push(SparseSet::new(capacity, members))
	}

	/// Internal method to undo the last change on the trail.
	///
	/// Note that his method will return `None` if the trail is empty.
	fn undo(&mut self) -> Option<TrailEvent> {
		let event = self.trail.pop()?;
		match event {
			TrailEvent::IntAssignment(i, v) => self.int_value[i] = v,
			TrailEvent::SetInsert(s, e) => {
				let removed = self.set_value[s].remove(e);
				debug_assert!(removed);
			}
			TrailEvent::SetRemove(s, e) => {
				let inserted = self.set_value[s].insert(e);
				debug_assert!(inserted);
			}
		}
		Some(event)
	}
}

impl TrailingActions for Trail {
	fn get_trailed_int(&self, i: TrailedInt) -> IntVal {
		self.int_value[i]
	}

	fn set_trailed_int(&mut self, i: TrailedInt, v: IntVal) -> IntVal {
		if self.int_value[i] == v {
			return v;
		}
		let old = mem::replace(&mut self.int_value[i], v);
		self.push_trail(TrailEvent::IntAssignment(i, old));
		old
	}

	fn trailed_set_clear(&mut self, s: TrailedSet) {
		while let Some(&elem) = self.set_value[s].members().last() {
			let _ = self.trailed_set_remove(s, elem);
		}
	}

	fn trailed_set_contains(&self, s: TrailedSet, elem: u32) -> bool {
		self.set_value[s].contains(elem)
	}

	fn trailed_set_elements(&self, s: TrailedSet) -> &[u32] {
		self.set_value[s].members()
	}

	fn trailed_set_insert(&mut self, s: TrailedSet, elem: u32) -> bool {
		let inserted = self.set_value[s].insert(elem);
		if inserted {
			self.push_trail(TrailEvent::SetInsert(s, elem));
		}
		inserted
	}

	fn trailed_set_len(&self, s: TrailedSet) -> usize {
		self.set_value[s].len
	}

	fn trailed_set_remove(&mut self, s: TrailedSet, elem: u32) -> bool {
		let removed = self.set_value[s].remove(elem);
		if removed {
			self.push_trail(TrailEvent::SetRemove(s, elem));
		}
		removed
	}
}

index_vec::define_index_type! {
	/// Identifies an trailed integer tracked within [`crate::Solver`]
	pub struct TrailedInt = u32;
}

index_vec::define_index_type! {
	/// Identifies a trailed set of indices tracked within [`crate::Solver`]
	pub struct TrailedSet = u32;
}

#[cfg(test)]
mod tests {
	use itertools::Itertools;

	use crate::{
		actions::TrailingActions,
		solver::engine::trail::{Trail, TrailEvent},
	};

	#[test]
	fn test_trailed_int_restore() {
		let mut trail = Trail::default();
		let x = trail.track_int(0);
		let y = trail.track_int(10);
		// Root level changes are permanent
		assert_eq!(trail.set_trailed_int(x, 1), 0);
		trail.notify_new_decision_level();
		let _ = trail.set_trailed_int(x, 5);
		let _ = trail.set_trailed_int(y, 11);
		trail.notify_new_decision_level();
		let _ = trail.set_trailed_int(x, 7);
		let _ = trail.set_trailed_int(x, 9);
		assert_eq!(trail.add_trailed_int(y, 4), 15);
		assert_eq!(trail.decision_level(), 2);

		trail.notify_backtrack(1);
		assert_eq!(trail.get_trailed_int(x), 5);
		assert_eq!(trail.get_trailed_int(y), 11);
		assert_eq!(trail.decision_level(), 1);

		trail.notify_backtrack(0);
		assert_eq!(trail.get_trailed_int(x), 1);
		assert_eq!(trail.get_trailed_int(y), 10);
		assert_eq!(trail.decision_level(), 0);
	}

	#[test]
	fn test_trailed_set_restore() {
		let mut trail = Trail::default();
		let s = trail.track_set(5, true);
		let members = |trail: &Trail| {
			trail
				.trailed_set_elements(s)
				.iter()
				.copied()
				.sorted()
				.collect_vec()
		};
		assert_eq!(members(&trail), vec![0, 1, 2, 3, 4]);

		trail.notify_new_decision_level();
		assert!(trail.trailed_set_remove(s, 2));
		assert!(trail.trailed_set_remove(s, 4));
		assert!(!trail.trailed_set_remove(s, 4));
		assert_eq!(members(&trail), vec![0, 1, 3]);

		trail.notify_new_decision_level();
		assert!(trail.trailed_set_insert(s, 4));
		assert!(trail.trailed_set_remove(s, 0));
		assert_eq!(members(&trail), vec![1, 3, 4]);
		trail.trailed_set_clear(s);
		assert_eq!(trail.trailed_set_len(s), 0);
		assert!(!trail.trailed_set_contains(s, 1));

		trail.notify_backtrack(1);
		assert_eq!(members(&trail), vec![0, 1, 3]);
		assert!(trail.trailed_set_contains(s, 3));
		assert!(!trail.trailed_set_contains(s, 4));

		trail.notify_backtrack(0);
		assert_eq!(members(&trail), vec![0, 1, 2, 3, 4]);
		// Out of range indices are never members
		assert!(!trail.trailed_set_contains(s, 5));
	}

	#[test]
	fn test_trail_event() {
		let mut trail = Trail::default();
		let i = trail.track_int(3);
		let s = trail.track_set(2, false);
		trail.notify_new_decision_level();
		let _ = trail.set_trailed_int(i, 4);
		let _ = trail.trailed_set_insert(s, 1);
		let _ = trail.trailed_set_remove(s, 1);

		assert_eq!(trail.undo(), Some(TrailEvent::SetRemove(s, 1)));
		assert!(trail.trailed_set_contains(s, 1));
		assert_eq!(trail.undo(), Some(TrailEvent::SetInsert(s, 1)));
		assert!(!trail.trailed_set_contains(s, 1));
		assert_eq!(trail.undo(), Some(TrailEvent::IntAssignment(i, 3)));
		assert_eq!(trail.get_trailed_int(i), 3);
		assert_eq!(trail.undo(), None);
	}
}
