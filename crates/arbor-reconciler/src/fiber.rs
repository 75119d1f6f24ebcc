//! Fiber arena and the double-buffered tree model.
//!
//! Fibers live in a [`slotmap`] arena and link to each other through
//! [`FiberId`] handles: `parent`, `child`, `sibling` and `alternate` are plain
//! index fields, so a fiber can be mutated while its neighbours are read.
//!
//! At most two trees exist at a time. `current` mirrors the host tree and
//! `work-in-progress` is being built by the work loop. Every fiber's
//! `alternate` points at its counterpart in the other tree, and
//! [`FiberArena::create_work_in_progress`] recycles that counterpart instead
//! of allocating.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::flags::FiberFlags;
use crate::hooks::Hook;
use crate::hooks::effect::Effect;
use crate::host::{HostHandle, PropPatch};
use crate::props::Props;
use crate::update_queue::{RootState, RootUpdate, UpdateQueue};
use crate::vnode::{ElementType, Key, VNode};

new_key_type! {
	/// Stable handle to a fiber in a [`FiberArena`].
	pub struct FiberId;

	/// Handle to a root created by [`Runtime::create_root`](crate::Runtime::create_root).
	pub struct RootId;
}

/// Kind of work a fiber represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkTag {
	/// The root of a tree. Its state node is the host container.
	Root,
	/// A host element.
	HostComponent,
	/// A function component that has rendered at least once.
	FunctionComponent,
	/// A text node.
	HostText,
	/// A function component before its first render.
	Indeterminate,
}

/// Props as stored on a fiber.
#[derive(Clone, Default)]
pub(crate) enum FiberProps {
	#[default]
	None,
	Element(Props),
	Text(Rc<str>),
}

impl FiberProps {
	pub(crate) fn as_element(&self) -> Option<&Props> {
		match self {
			FiberProps::Element(props) => Some(props),
			_ => None,
		}
	}

	pub(crate) fn as_text(&self) -> Option<&str> {
		match self {
			FiberProps::Text(text) => Some(text),
			_ => None,
		}
	}
}

impl fmt::Debug for FiberProps {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FiberProps::None => f.write_str("None"),
			FiberProps::Element(props) => write!(f, "{props:?}"),
			FiberProps::Text(text) => write!(f, "{text:?}"),
		}
	}
}

/// Tag-specific state that took effect in the last render.
#[derive(Clone, Default)]
pub(crate) enum MemoizedState {
	#[default]
	None,
	Root(RootState),
	Hooks(Vec<Hook>),
}

/// Pending work attached to a fiber.
///
/// Root queues are shared between a fiber and its alternate. Effect lists
/// and prop patches are rebuilt every render.
#[derive(Clone, Default)]
pub(crate) enum FiberUpdateQueue {
	#[default]
	None,
	Root(Rc<RefCell<UpdateQueue<RootUpdate>>>),
	Effects(Vec<Effect>),
	HostPatch(PropPatch),
}

impl FiberUpdateQueue {
	pub(crate) fn effects(&self) -> &[Effect] {
		match self {
			FiberUpdateQueue::Effects(effects) => effects,
			_ => &[],
		}
	}
}

/// Host-side object backing a fiber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StateNode {
	/// Function components and fibers not yet completed.
	#[default]
	None,
	/// A host element or text node.
	Host(HostHandle),
	/// The root record and its container.
	Root {
		/// Owning root.
		id: RootId,
		/// Host container the root renders into.
		container: HostHandle,
	},
}

impl StateNode {
	/// The host handle, for host fibers and roots.
	pub fn host_handle(self) -> Option<HostHandle> {
		match self {
			StateNode::None => None,
			StateNode::Host(handle) => Some(handle),
			StateNode::Root { container, .. } => Some(container),
		}
	}
}

/// One unit of work, tracking a single tree position across renders.
#[derive(Clone)]
pub struct Fiber {
	pub(crate) tag: WorkTag,
	pub(crate) element_type: Option<ElementType>,
	pub(crate) key: Option<Key>,
	pub(crate) pending_props: FiberProps,
	pub(crate) memoized_props: FiberProps,
	pub(crate) memoized_state: MemoizedState,
	pub(crate) update_queue: FiberUpdateQueue,
	pub(crate) flags: FiberFlags,
	pub(crate) subtree_flags: FiberFlags,
	pub(crate) index: usize,
	pub(crate) deletions: Vec<FiberId>,
	pub(crate) parent: Option<FiberId>,
	pub(crate) child: Option<FiberId>,
	pub(crate) sibling: Option<FiberId>,
	pub(crate) alternate: Option<FiberId>,
	pub(crate) state_node: StateNode,
}

impl Fiber {
	pub(crate) fn new(tag: WorkTag, pending_props: FiberProps, key: Option<Key>) -> Self {
		Self {
			tag,
			element_type: None,
			key,
			pending_props,
			memoized_props: FiberProps::None,
			memoized_state: MemoizedState::None,
			update_queue: FiberUpdateQueue::None,
			flags: FiberFlags::empty(),
			subtree_flags: FiberFlags::empty(),
			index: 0,
			deletions: Vec::new(),
			parent: None,
			child: None,
			sibling: None,
			alternate: None,
			state_node: StateNode::None,
		}
	}

	/// Work tag.
	pub fn tag(&self) -> WorkTag {
		self.tag
	}

	/// Host tag or component, absent for roots and text.
	pub fn element_type(&self) -> Option<&ElementType> {
		self.element_type.as_ref()
	}

	/// Reconciliation key.
	pub fn key(&self) -> Option<&Key> {
		self.key.as_ref()
	}

	/// Effect flags of this render.
	pub fn flags(&self) -> FiberFlags {
		self.flags
	}

	/// Union of the flags of every descendant.
	pub fn subtree_flags(&self) -> FiberFlags {
		self.subtree_flags
	}

	/// Position among siblings.
	pub fn index(&self) -> usize {
		self.index
	}

	/// Host object backing this fiber.
	pub fn state_node(&self) -> StateNode {
		self.state_node
	}

	/// Children removed in this render.
	pub fn deletions(&self) -> &[FiberId] {
		&self.deletions
	}

	/// Parent link.
	pub fn parent(&self) -> Option<FiberId> {
		self.parent
	}

	/// First child link.
	pub fn child(&self) -> Option<FiberId> {
		self.child
	}

	/// Next sibling link.
	pub fn sibling(&self) -> Option<FiberId> {
		self.sibling
	}

	/// Counterpart in the other tree.
	pub fn alternate(&self) -> Option<FiberId> {
		self.alternate
	}

	/// Whether this fiber owns a host element or text node.
	pub fn is_host(&self) -> bool {
		matches!(self.tag, WorkTag::HostComponent | WorkTag::HostText)
	}

	/// Whether this fiber can serve as a host parent.
	pub fn is_host_parent(&self) -> bool {
		matches!(self.tag, WorkTag::HostComponent | WorkTag::Root)
	}

	/// Text of a `HostText` fiber as last rendered.
	pub fn text(&self) -> Option<&str> {
		self.memoized_props.as_text()
	}

	/// Element props as last rendered.
	pub fn props(&self) -> Option<&Props> {
		self.memoized_props.as_element()
	}
}

impl fmt::Debug for Fiber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Fiber")
			.field("tag", &self.tag)
			.field("type", &self.element_type)
			.field("key", &self.key)
			.field("flags", &self.flags)
			.field("index", &self.index)
			.field("state_node", &self.state_node)
			.finish_non_exhaustive()
	}
}

/// Owner of every fiber of every root.
#[derive(Default)]
pub struct FiberArena {
	fibers: SlotMap<FiberId, Fiber>,
}

impl FiberArena {
	/// An empty arena.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of live fibers.
	pub fn len(&self) -> usize {
		self.fibers.len()
	}

	/// True when no fiber is allocated.
	pub fn is_empty(&self) -> bool {
		self.fibers.is_empty()
	}

	/// Whether `id` still refers to a live fiber.
	pub fn contains(&self, id: FiberId) -> bool {
		self.fibers.contains_key(id)
	}

	/// Look up a fiber.
	pub fn get(&self, id: FiberId) -> Option<&Fiber> {
		self.fibers.get(id)
	}

	pub(crate) fn alloc(&mut self, fiber: Fiber) -> FiberId {
		self.fibers.insert(fiber)
	}

	/// `createFiber`.
	pub(crate) fn create_fiber(
		&mut self,
		tag: WorkTag,
		pending_props: FiberProps,
		key: Option<Key>,
	) -> FiberId {
		self.alloc(Fiber::new(tag, pending_props, key))
	}

	/// Fiber for an element description. Components start `Indeterminate`.
	pub(crate) fn create_fiber_from_vnode(&mut self, node: &VNode) -> FiberId {
		let tag = if node.element_type().is_component() {
			WorkTag::Indeterminate
		} else {
			WorkTag::HostComponent
		};
		let id = self.create_fiber(
			tag,
			FiberProps::Element(node.props().clone()),
			node.key().cloned(),
		);
		self[id].element_type = Some(node.element_type().clone());
		id
	}

	pub(crate) fn create_fiber_from_text(&mut self, text: Rc<str>) -> FiberId {
		self.create_fiber(WorkTag::HostText, FiberProps::Text(text), None)
	}

	/// The root fiber of a new root, with an empty shared update queue.
	pub(crate) fn create_host_root_fiber(&mut self, root: RootId, container: HostHandle) -> FiberId {
		let id = self.create_fiber(WorkTag::Root, FiberProps::None, None);
		let fiber = &mut self[id];
		fiber.state_node = StateNode::Root {
			id: root,
			container,
		};
		fiber.memoized_state = MemoizedState::Root(RootState::default());
		fiber.update_queue = FiberUpdateQueue::Root(Rc::new(RefCell::new(UpdateQueue::new())));
		id
	}

	/// Prepare the counterpart of `current` for a new render.
	///
	/// The alternate is reused when present: its flags and deletions from the
	/// previous render are cleared and `pending_props` refreshed. Otherwise a
	/// new fiber is allocated and linked both ways. Either way the fields a
	/// render starts from are copied over from `current`.
	pub(crate) fn create_work_in_progress(
		&mut self,
		current: FiberId,
		pending_props: FiberProps,
	) -> FiberId {
		let wip = match self[current].alternate {
			Some(wip) => {
				let fiber = &mut self[wip];
				fiber.pending_props = pending_props;
				fiber.flags = FiberFlags::empty();
				fiber.subtree_flags = FiberFlags::empty();
				fiber.deletions.clear();
				wip
			}
			None => {
				let source = &self[current];
				let mut fiber = Fiber::new(source.tag, pending_props, source.key.clone());
				fiber.element_type = source.element_type.clone();
				fiber.state_node = source.state_node;
				fiber.alternate = Some(current);
				let wip = self.alloc(fiber);
				self[current].alternate = Some(wip);
				wip
			}
		};

		let source = &self[current];
		let tag = source.tag;
		let child = source.child;
		let sibling = source.sibling;
		let index = source.index;
		let memoized_props = source.memoized_props.clone();
		let memoized_state = source.memoized_state.clone();
		let update_queue = source.update_queue.clone();

		let fiber = &mut self[wip];
		fiber.tag = tag;
		fiber.child = child;
		fiber.sibling = sibling;
		fiber.index = index;
		fiber.memoized_props = memoized_props;
		fiber.memoized_state = memoized_state;
		fiber.update_queue = update_queue;
		wip
	}

	/// Children of `parent` in sibling order.
	pub fn children(&self, parent: FiberId) -> Vec<FiberId> {
		let mut children = Vec::new();
		let mut next = self[parent].child;
		while let Some(child) = next {
			children.push(child);
			next = self[child].sibling;
		}
		children
	}

	/// Release `id`, its current descendants, and their alternates.
	pub(crate) fn release_subtree(&mut self, id: FiberId) {
		let mut stack = vec![id];
		while let Some(fiber_id) = stack.pop() {
			let Some(fiber) = self.fibers.remove(fiber_id) else {
				continue;
			};
			let mut next = fiber.child;
			while let Some(child) = next {
				stack.push(child);
				next = self.fibers.get(child).and_then(|child| child.sibling);
			}
			if let Some(alternate) = fiber.alternate {
				self.fibers.remove(alternate);
			}
		}
	}
}

impl Index<FiberId> for FiberArena {
	type Output = Fiber;

	fn index(&self, id: FiberId) -> &Fiber {
		self.fibers
			.get(id)
			.unwrap_or_else(|| panic!("fiber {id:?} was released"))
	}
}

impl IndexMut<FiberId> for FiberArena {
	fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
		self.fibers
			.get_mut(id)
			.unwrap_or_else(|| panic!("fiber {id:?} was released"))
	}
}

impl fmt::Debug for FiberArena {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FiberArena")
			.field("len", &self.fibers.len())
			.finish()
	}
}
