//! FIFO update queues and the root update payload.

use std::collections::VecDeque;

use crate::vnode::Children;

/// Ordered pending updates.
///
/// Updates are applied in enqueue order and discarded once drained.
#[derive(Debug)]
pub(crate) struct UpdateQueue<T> {
	pending: VecDeque<T>,
}

impl<T> Default for UpdateQueue<T> {
	fn default() -> Self {
		Self {
			pending: VecDeque::new(),
		}
	}
}

impl<T> UpdateQueue<T> {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn enqueue(&mut self, update: T) {
		self.pending.push_back(update);
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	pub(crate) fn len(&self) -> usize {
		self.pending.len()
	}

	pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
		self.pending.iter()
	}

	/// Take every pending update in enqueue order.
	pub(crate) fn drain(&mut self) -> Vec<T> {
		self.pending.drain(..).collect()
	}
}

/// Update carried by `Root::render`.
#[derive(Debug, Clone)]
pub(crate) struct RootUpdate {
	pub(crate) element: Children,
}

/// Resolved description of a root.
#[derive(Debug, Clone, Default)]
pub(crate) struct RootState {
	pub(crate) element: Children,
}

impl RootState {
	/// Merge `updates` into this state, last one winning.
	pub(crate) fn merge(&self, updates: Vec<RootUpdate>) -> RootState {
		updates
			.into_iter()
			.fold(self.clone(), |_, update| RootState {
				element: update.element,
			})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vnode::VNode;
	use rstest::rstest;

	#[rstest]
	fn test_drain_preserves_enqueue_order() {
		let mut queue = UpdateQueue::new();
		queue.enqueue(1);
		queue.enqueue(2);
		queue.enqueue(3);
		assert_eq!(queue.len(), 3);

		assert_eq!(queue.drain(), vec![1, 2, 3]);
		assert!(queue.is_empty());
	}

	#[rstest]
	fn test_root_state_merge_takes_last_update() {
		let state = RootState::default();
		let merged = state.merge(vec![
			RootUpdate {
				element: VNode::element("a").build().into(),
			},
			RootUpdate {
				element: VNode::element("b").build().into(),
			},
		]);

		match merged.element {
			Children::Single(crate::vnode::Child::Element(node)) => {
				assert_eq!(node.element_type().host_tag(), Some("b"));
			}
			other => panic!("unexpected {other:?}"),
		}
		assert!(state.merge(Vec::new()).element.is_empty());
	}
}
