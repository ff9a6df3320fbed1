//! Priority levels of propagators, and the queue in which
//! [`crate::solver::engine::Engine`] keeps the propagators that are waiting to
//! run.

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
/// The levels at which propagators are scheduled, from least to most urgent.
///
/// Cheap propagators with strong filtering, such as [`crate::SelfLoopCount`],
/// should run at a high level, while expensive global reasoning, such as
/// [`crate::HeldKarp`], is best run when nothing else is left in the queue.
pub enum PriorityLevel {
	/// Run only when no other propagator is waiting.
	Lowest,
	/// Low urgency.
	Low,
	/// Medium urgency.
	Medium,
	/// High urgency.
	High,
	/// The highest level for regular propagators.
	Highest,
	/// Run before anything else.
	Immediate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A priority queue for propagators.
pub(crate) struct PriorityQueue<E> {
	/// Internal storage of the queues for each priority level.
	storage: [Vec<E>; 6],
}

impl<E> PriorityQueue<E> {
	/// Inserts a propagator into the queue at the end of the given priority
	/// level.
	pub(crate) fn insert(&mut self, priority: PriorityLevel, elem: E) {
		let i = priority as usize;
		debug_assert!((0..=5).contains(&i));
		self.storage[i].push(elem);
	}

	/// Returns whether no propagators are waiting in the queue.
	pub(crate) fn is_empty(&self) -> bool {
		self.storage.iter().all(Vec::is_empty)
	}

	/// Pops the highest priority propagator from the queue.
	pub(crate) fn pop(&mut self) -> Option<E> {
		for queue in self.storage.iter_mut().rev() {
			if !queue.is_empty() {
				return queue.pop();
			}
		}
		None
	}
}

impl<E> Default for PriorityQueue<E> {
	fn default() -> Self {
		Self {
			storage: [
				Vec::new(),
				Vec::new(),
				Vec::new(),
				Vec::new(),
				Vec::new(),
				Vec::new(),
			],
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::solver::engine::queue::{PriorityLevel, PriorityQueue};

	#[test]
	fn priority_order() {
		use PriorityLevel::*;
		assert!(Immediate > Highest);
		assert!(Highest > High);
		assert!(High > Medium);
		assert!(Medium > Low);
		assert!(Low > Lowest);
	}

	#[test]
	fn test_pop_most_important_first() {
		let mut queue = PriorityQueue::default();
		assert!(queue.is_empty());
		queue.insert(PriorityLevel::Lowest, 'a');
		queue.insert(PriorityLevel::High, 'b');
		queue.insert(PriorityLevel::Medium, 'c');
		queue.insert(PriorityLevel::High, 'd');
		assert!(!queue.is_empty());

		let mut order = Vec::new();
		while let Some(e) = queue.pop() {
			order.push(e);
		}
		assert_eq!(order, vec!['d', 'b', 'c', 'a']);
		assert!(queue.is_empty());
	}
}
