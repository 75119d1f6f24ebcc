//! Complete phase: create or diff host instances and bubble flags upward.

use std::rc::Rc;

use tracing::trace;

use crate::fiber::{FiberArena, FiberId, FiberUpdateQueue, StateNode, WorkTag};
use crate::flags::FiberFlags;
use crate::host::{HostHandle, HostRenderer};
use crate::props::Props;
use crate::runtime::{InstanceRecord, RuntimeInner};
use crate::vnode::ElementType;

impl RuntimeInner {
	pub(crate) fn complete_work(&self, current: Option<FiberId>, wip: FiberId) {
		let tag = self.fibers.borrow()[wip].tag;
		trace!(fiber = ?wip, ?tag, "complete work");
		match tag {
			WorkTag::Root | WorkTag::FunctionComponent => {}
			WorkTag::HostComponent => self.complete_host_component(current, wip),
			WorkTag::HostText => self.complete_host_text(current, wip),
			WorkTag::Indeterminate => panic!("fiber {wip:?} completed before it rendered"),
		}
		bubble_properties(&mut self.fibers.borrow_mut(), wip);
	}

	fn complete_host_component(&self, current: Option<FiberId>, wip: FiberId) {
		let mut fibers = self.fibers.borrow_mut();
		let props = fibers[wip]
			.pending_props
			.as_element()
			.cloned()
			.expect("host component without props");
		let tag: Rc<str> = fibers[wip]
			.element_type
			.as_ref()
			.and_then(ElementType::host_tag)
			.map(Rc::from)
			.expect("host component without a tag");

		let existing = current
			.filter(|_| matches!(fibers[wip].state_node, StateNode::Host(_)))
			.and_then(|current| fibers[current].memoized_props.as_element().cloned());
		if let Some(old) = existing {
			let patch = self.host.borrow().diff_props(&tag, &old, &props);
			let fiber = &mut fibers[wip];
			match patch {
				Some(patch) => {
					trace!(fiber = ?wip, changes = patch.changes().len(), "host props changed");
					fiber.update_queue = FiberUpdateQueue::HostPatch(patch);
					fiber.flags |= FiberFlags::UPDATE;
				}
				None => fiber.update_queue = FiberUpdateQueue::None,
			}
			return;
		}

		let mut host = self.host.borrow_mut();
		let instance = host.create_instance(&tag, &props);
		append_all_children(&fibers, &mut **host, instance, wip);
		self.instances.borrow_mut().insert(
			instance,
			InstanceRecord {
				fiber: wip,
				props,
			},
		);
		let fiber = &mut fibers[wip];
		fiber.state_node = StateNode::Host(instance);
		fiber.update_queue = FiberUpdateQueue::None;
		trace!(fiber = ?wip, ?instance, %tag, "created instance");
	}

	fn complete_host_text(&self, current: Option<FiberId>, wip: FiberId) {
		let mut fibers = self.fibers.borrow_mut();
		let text: Rc<str> = fibers[wip]
			.pending_props
			.as_text()
			.map(Rc::from)
			.expect("text fiber without text");

		if let Some(current) = current
			&& matches!(fibers[wip].state_node, StateNode::Host(_))
		{
			if fibers[current].memoized_props.as_text() != Some(&*text) {
				fibers[wip].flags |= FiberFlags::UPDATE;
			}
			return;
		}

		let instance = self.host.borrow_mut().create_text_instance(&text);
		self.instances.borrow_mut().insert(
			instance,
			InstanceRecord {
				fiber: wip,
				props: Props::empty(),
			},
		);
		fibers[wip].state_node = StateNode::Host(instance);
	}
}

/// Append the top-level host nodes below `wip` to `parent`. Function
/// components are walked through, host children are not descended into.
fn append_all_children(
	fibers: &FiberArena,
	host: &mut dyn HostRenderer,
	parent: HostHandle,
	wip: FiberId,
) {
	let mut next = fibers[wip].child;
	while let Some(node) = next {
		let fiber = &fibers[node];
		if fiber.is_host() {
			if let Some(instance) = fiber.state_node.host_handle() {
				host.append_child(parent, instance);
			}
		} else if let Some(child) = fiber.child {
			next = Some(child);
			continue;
		}

		let mut climb = node;
		next = loop {
			if let Some(sibling) = fibers[climb].sibling {
				break Some(sibling);
			}
			match fibers[climb].parent {
				Some(parent) if parent != wip => climb = parent,
				_ => break None,
			}
		};
	}
}

/// Fold the children's flags into `wip.subtree_flags` and fix their parent links.
fn bubble_properties(fibers: &mut FiberArena, wip: FiberId) {
	let mut subtree_flags = FiberFlags::empty();
	let mut next = fibers[wip].child;
	while let Some(child) = next {
		let fiber = &mut fibers[child];
		subtree_flags |= fiber.subtree_flags | fiber.flags;
		fiber.parent = Some(wip);
		next = fiber.sibling;
	}
	fibers[wip].subtree_flags |= subtree_flags;
}
