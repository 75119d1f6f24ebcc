//! Root-level listeners and two-phase dispatch.

use std::cell::Cell;
use std::rc::Rc;

use arbor_scheduler::Priority;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::events::registry::event_priority;
use crate::events::synthetic::{EventHandler, NativeEvent, SyntheticEvent};
use crate::fiber::{StateNode, WorkTag};
use crate::host::{HostHandle, NativeListener};
use crate::runtime::RuntimeInner;

/// Handlers found on the path from a target to its root, target first.
type DispatchListeners = SmallVec<[(HostHandle, EventHandler); 8]>;

/// Sets the update priority for the duration of a dispatch.
struct UpdatePriorityScope<'a> {
	cell: &'a Cell<Priority>,
	previous: Priority,
}

impl<'a> UpdatePriorityScope<'a> {
	fn enter(cell: &'a Cell<Priority>, priority: Priority) -> Self {
		let previous = cell.replace(priority);
		Self { cell, previous }
	}
}

impl Drop for UpdatePriorityScope<'_> {
	fn drop(&mut self) {
		self.cell.set(self.previous);
	}
}

impl RuntimeInner {
	/// Attach capture and bubble listeners for every registered native
	/// event to `container`. A container is only ever attached once.
	pub(crate) fn listen_to_all_supported_events(&self, container: HostHandle) {
		if !self.listening.borrow_mut().insert(container) {
			return;
		}

		let mut host = self.host.borrow_mut();
		let mut count = 0;
		for event_type in self.registry.all_native_events() {
			for capture in [true, false] {
				let runtime = self.weak.clone();
				let listener: NativeListener = Rc::new(move |native: &dyn NativeEvent| {
					if let Some(runtime) = runtime.upgrade() {
						runtime.dispatch_event_for_plugins(native, capture, container);
					}
				});
				host.add_event_listener(container, event_type, capture, listener);
				count += 1;
			}
		}
		debug!(?container, listeners = count, "listening to supported events");
	}

	/// Deliver one phase of a native event received on `container`.
	pub(crate) fn dispatch_event_for_plugins(
		&self,
		native: &dyn NativeEvent,
		capture: bool,
		container: HostHandle,
	) {
		let event_type = native.event_type();
		let Some(registration_name) = self.registry.registration_name(event_type) else {
			return;
		};
		let registration_name = if capture {
			format!("{registration_name}Capture")
		} else {
			registration_name.to_string()
		};
		let Some(target) = native.target() else {
			return;
		};

		let listeners = self.accumulate_listeners(target, &registration_name, container);
		if listeners.is_empty() {
			return;
		}
		debug!(
			event = %registration_name,
			listeners = listeners.len(),
			"dispatching event"
		);

		let _priority = UpdatePriorityScope::enter(&self.update_priority, event_priority(event_type));
		let event = SyntheticEvent::new(&registration_name, event_type, native);
		let ordered: Box<dyn Iterator<Item = &(HostHandle, EventHandler)>> = if capture {
			Box::new(listeners.iter().rev())
		} else {
			Box::new(listeners.iter())
		};
		for (instance, handler) in ordered {
			if event.is_propagation_stopped() {
				trace!(event = %registration_name, "propagation stopped");
				break;
			}
			event.set_current_target(Some(*instance));
			handler.call(&event);
		}
		event.set_current_target(None);
	}

	/// Collect `registration_name` handlers from `target` up to the root
	/// fiber. Returns nothing when the target is not rendered by a root of
	/// `container`.
	fn accumulate_listeners(
		&self,
		target: HostHandle,
		registration_name: &str,
		container: HostHandle,
	) -> DispatchListeners {
		let instances = self.instances.borrow();
		let fibers = self.fibers.borrow();
		let Some(record) = instances.get(&target) else {
			return DispatchListeners::new();
		};

		let mut listeners = DispatchListeners::new();
		let mut node = Some(record.fiber);
		while let Some(id) = node {
			let Some(fiber) = fibers.get(id) else {
				return DispatchListeners::new();
			};
			match (fiber.tag, fiber.state_node) {
				(WorkTag::HostComponent, StateNode::Host(instance)) => {
					let handler = instances
						.get(&instance)
						.and_then(|record| record.props.handler(registration_name));
					if let Some(handler) = handler {
						listeners.push((instance, handler));
					}
				}
				(WorkTag::Root, StateNode::Root { container: root_container, .. }) => {
					return if root_container == container {
						listeners
					} else {
						DispatchListeners::new()
					};
				}
				_ => {}
			}
			node = fiber.parent;
		}
		DispatchListeners::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_priority_scope_restores_previous() {
		let cell = Cell::new(Priority::Normal);
		{
			let _scope = UpdatePriorityScope::enter(&cell, Priority::UserBlocking);
			assert_eq!(cell.get(), Priority::UserBlocking);
			{
				let _inner = UpdatePriorityScope::enter(&cell, Priority::Immediate);
				assert_eq!(cell.get(), Priority::Immediate);
			}
			assert_eq!(cell.get(), Priority::UserBlocking);
		}
		assert_eq!(cell.get(), Priority::Normal);
	}
}
