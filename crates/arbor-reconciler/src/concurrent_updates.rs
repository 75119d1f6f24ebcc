//! Buffer of updates dispatched outside of a render.
//!
//! Dispatches push `(fiber, queue, update)` entries here instead of touching
//! the target queue. The buffer is spliced into the queues when the next
//! render starts, which batches every dispatch of one host task into a
//! single render.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::fiber::FiberId;
use crate::hooks::state::{HookQueue, HookUpdate};
use crate::update_queue::{RootUpdate, UpdateQueue};

pub(crate) enum ConcurrentUpdate {
	Hook {
		fiber: FiberId,
		queue: Rc<RefCell<HookQueue>>,
		update: HookUpdate,
	},
	Root {
		fiber: FiberId,
		queue: Rc<RefCell<UpdateQueue<RootUpdate>>>,
		update: RootUpdate,
	},
}

#[derive(Default)]
pub(crate) struct ConcurrentUpdates {
	buffer: RefCell<Vec<ConcurrentUpdate>>,
}

impl ConcurrentUpdates {
	pub(crate) fn enqueue_hook(
		&self,
		fiber: FiberId,
		queue: Rc<RefCell<HookQueue>>,
		update: HookUpdate,
	) {
		if !update.bailed_out {
			queue.borrow_mut().buffered += 1;
		}
		self.buffer.borrow_mut().push(ConcurrentUpdate::Hook {
			fiber,
			queue,
			update,
		});
	}

	pub(crate) fn enqueue_root(
		&self,
		fiber: FiberId,
		queue: Rc<RefCell<UpdateQueue<RootUpdate>>>,
		update: RootUpdate,
	) {
		self.buffer.borrow_mut().push(ConcurrentUpdate::Root {
			fiber,
			queue,
			update,
		});
	}

	pub(crate) fn len(&self) -> usize {
		self.buffer.borrow().len()
	}

	/// Move every buffered update onto its queue, in dispatch order.
	pub(crate) fn finish_queueing(&self) {
		let buffered = std::mem::take(&mut *self.buffer.borrow_mut());
		if buffered.is_empty() {
			return;
		}
		trace!(updates = buffered.len(), "splicing buffered updates");
		for entry in buffered {
			match entry {
				ConcurrentUpdate::Hook { queue, update, .. } => {
					let mut queue = queue.borrow_mut();
					if !update.bailed_out {
						queue.buffered = queue.buffered.saturating_sub(1);
					}
					queue.pending.enqueue(update);
				}
				ConcurrentUpdate::Root { queue, update, .. } => {
					queue.borrow_mut().enqueue(update);
				}
			}
		}
	}

	/// Fibers that received updates, for logging.
	pub(crate) fn fibers(&self) -> Vec<FiberId> {
		self.buffer
			.borrow()
			.iter()
			.map(|entry| match entry {
				ConcurrentUpdate::Hook { fiber, .. } | ConcurrentUpdate::Root { fiber, .. } => *fiber,
			})
			.collect()
	}
}
