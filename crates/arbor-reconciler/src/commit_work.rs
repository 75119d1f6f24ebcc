//! Commit phase.
//!
//! A finished tree is committed in three passes:
//!
//! 1. **Mutation.** Children first: deletions, then placements, then prop
//!    and text updates. Layout destroys run here too, at their fiber, once
//!    its subtree is mutated and before later siblings are. A deleted
//!    subtree runs its layout destroys before its host nodes are detached.
//! 2. **Layout.** Dirty layout creates, children before parents.
//! 3. **Passive.** Destroys of deleted subtrees, then destroys of every dirty
//!    passive effect, then their creates.
//!
//! The finished tree becomes `current` between the mutation and layout
//! passes. Borrows of the arena, the host and the instance map are taken
//! per step and never held while an effect runs, so effects may dispatch
//! updates. Deleted fibers are released last.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::fiber::{FiberArena, FiberId, FiberUpdateQueue, RootId, WorkTag};
use crate::flags::{FiberFlags, HookFlags};
use crate::hooks::effect::Effect;
use crate::host::{HostHandle, HostRenderer};
use crate::runtime::{InstanceRecord, RuntimeInner};
use crate::vnode::ElementType;

impl RuntimeInner {
	pub(crate) fn commit_root(&self, root: RootId) {
		let finished = self
			.roots
			.borrow_mut()
			.get_mut(root)
			.and_then(|fiber_root| fiber_root.finished_work.take());
		let Some(finished) = finished else {
			return;
		};

		let mut mutation = MutationPass::new(self);
		mutation.commit_mutation_effects(finished);
		let mutation = mutation.finish();
		debug!(
			?root,
			deleted = mutation.deleted.len(),
			layout_destroys = mutation.layout_destroys,
			"mutation pass committed"
		);

		if let Some(fiber_root) = self.roots.borrow_mut().get_mut(root) {
			fiber_root.current = finished;
			fiber_root.callback_node = None;
		}

		let layout = collect_effects(
			&self.fibers.borrow(),
			finished,
			FiberFlags::LAYOUT_MASK,
			HookFlags::LAYOUT,
		);
		for effect in &layout {
			effect.mount();
		}

		for effect in &mutation.passive_deletions {
			effect.unmount();
		}
		let passive = collect_effects(
			&self.fibers.borrow(),
			finished,
			FiberFlags::PASSIVE,
			HookFlags::PASSIVE,
		);
		for effect in &passive {
			effect.unmount();
		}
		for effect in &passive {
			effect.mount();
		}
		debug!(
			?root,
			layout = layout.len(),
			passive = passive.len(),
			"effects committed"
		);

		{
			let mut fibers = self.fibers.borrow_mut();
			for &(parent, deleted) in &mutation.deleted {
				fibers.release_subtree(deleted);
				if fibers.contains(parent) {
					fibers[parent].deletions.clear();
				}
			}
		}

		let reschedule = self
			.roots
			.borrow()
			.get(root)
			.is_some_and(|fiber_root| fiber_root.has_pending_update);
		if reschedule {
			debug!(?root, "updates arrived during render, rescheduling");
			self.ensure_root_is_scheduled(root);
		}
	}
}

/// What the mutation pass leaves for the later passes.
struct MutationOutcome {
	/// Layout destroys already run during the pass.
	layout_destroys: usize,
	passive_deletions: Vec<Effect>,
	/// `(parent, deleted child)` pairs.
	deleted: Vec<(FiberId, FiberId)>,
}

struct MutationPass<'a> {
	runtime: &'a RuntimeInner,
	/// Host parents whose text content was already cleared.
	reset: HashSet<HostHandle>,
	layout_destroys: usize,
	passive_deletions: Vec<Effect>,
	deleted: Vec<(FiberId, FiberId)>,
}

impl<'a> MutationPass<'a> {
	fn new(runtime: &'a RuntimeInner) -> Self {
		Self {
			runtime,
			reset: HashSet::new(),
			layout_destroys: 0,
			passive_deletions: Vec::new(),
			deleted: Vec::new(),
		}
	}

	fn finish(self) -> MutationOutcome {
		MutationOutcome {
			layout_destroys: self.layout_destroys,
			passive_deletions: self.passive_deletions,
			deleted: self.deleted,
		}
	}

	fn sibling(&self, id: FiberId) -> Option<FiberId> {
		self.runtime.fibers.borrow()[id].sibling
	}

	/// Run layout destroys with no borrow held.
	fn run_layout_destroys(&mut self, id: FiberId, effects: Vec<Effect>) {
		if effects.is_empty() {
			return;
		}
		trace!(fiber = ?id, count = effects.len(), "layout destroys");
		self.layout_destroys += effects.len();
		for effect in &effects {
			effect.unmount();
		}
	}

	fn commit_mutation_effects(&mut self, id: FiberId) {
		let (deletions, walk_children, child) = {
			let fibers = self.runtime.fibers.borrow();
			let fiber = &fibers[id];
			(
				fiber.deletions.clone(),
				fiber.subtree_flags.intersects(FiberFlags::MUTATION_MASK),
				fiber.child,
			)
		};

		for deleted in deletions {
			self.commit_deletion(id, deleted);
		}

		if walk_children {
			let mut next = child;
			while let Some(child) = next {
				self.commit_mutation_effects(child);
				next = self.sibling(child);
			}
		}

		let (flags, tag, instance) = {
			let fibers = self.runtime.fibers.borrow();
			let fiber = &fibers[id];
			(fiber.flags, fiber.tag, fiber.state_node.host_handle())
		};

		if flags.contains(FiberFlags::PLACEMENT) {
			self.commit_placement(id);
		}

		match tag {
			WorkTag::HostComponent => {
				let Some(instance) = instance else {
					return;
				};
				if flags.contains(FiberFlags::UPDATE) {
					self.commit_host_update(id, instance);
				}
				if flags.contains(FiberFlags::CONTENT_RESET) && self.reset.insert(instance) {
					self.runtime.host.borrow_mut().reset_text_content(instance);
				}
			}
			WorkTag::HostText => {
				if flags.contains(FiberFlags::UPDATE)
					&& let Some(instance) = instance
				{
					self.commit_text_update(id, instance);
				}
			}
			WorkTag::FunctionComponent => {
				if flags.contains(FiberFlags::UPDATE) {
					let effects: Vec<Effect> = self.runtime.fibers.borrow()[id]
						.update_queue
						.effects()
						.iter()
						.filter(|effect| effect.fires(HookFlags::LAYOUT))
						.cloned()
						.collect();
					self.run_layout_destroys(id, effects);
				}
			}
			WorkTag::Root | WorkTag::Indeterminate => {}
		}
	}

	fn commit_host_update(&mut self, id: FiberId, instance: HostHandle) {
		let fibers = self.runtime.fibers.borrow();
		let fiber = &fibers[id];
		let tag = fiber
			.element_type
			.as_ref()
			.and_then(ElementType::host_tag)
			.unwrap_or_default();
		if let FiberUpdateQueue::HostPatch(patch) = &fiber.update_queue
			&& !patch.is_empty()
		{
			trace!(fiber = ?id, ?instance, changes = patch.changes().len(), "commit update");
			self.runtime.host.borrow_mut().commit_update(instance, tag, patch);
		}
		if let Some(props) = fiber.props() {
			self.runtime.instances.borrow_mut().insert(
				instance,
				InstanceRecord {
					fiber: id,
					props: props.clone(),
				},
			);
		}
	}

	fn commit_text_update(&mut self, id: FiberId, instance: HostHandle) {
		let fibers = self.runtime.fibers.borrow();
		let Some(text) = fibers[id].text() else {
			return;
		};
		trace!(fiber = ?id, ?instance, "commit text update");
		self.runtime.host.borrow_mut().commit_text_update(instance, text);
		if let Some(record) = self.runtime.instances.borrow_mut().get_mut(&instance) {
			record.fiber = id;
		}
	}

	fn commit_placement(&mut self, id: FiberId) {
		let fibers = self.runtime.fibers.borrow();
		let mut host = self.runtime.host.borrow_mut();
		let parent_fiber = get_host_parent_fiber(&fibers, id);
		let parent_node = &fibers[parent_fiber];
		let parent = parent_node
			.state_node
			.host_handle()
			.unwrap_or_else(|| panic!("host parent {parent_fiber:?} has no instance"));
		if parent_node.flags.contains(FiberFlags::CONTENT_RESET) && self.reset.insert(parent) {
			host.reset_text_content(parent);
		}

		let before = get_host_sibling(&fibers, id);
		trace!(fiber = ?id, ?parent, ?before, "commit placement");
		insert_or_append_placement_node(&fibers, &mut **host, id, before, parent);
	}

	fn commit_deletion(&mut self, parent: FiberId, deleted: FiberId) {
		let host_parent = {
			let fibers = self.runtime.fibers.borrow();
			let host_parent_fiber = if fibers[parent].is_host_parent() {
				parent
			} else {
				get_host_parent_fiber(&fibers, parent)
			};
			fibers[host_parent_fiber].state_node.host_handle()
		};
		trace!(fiber = ?deleted, ?host_parent, "commit deletion");
		self.commit_deletion_effects(host_parent, deleted);
		self.deleted.push((parent, deleted));
	}

	/// Run layout destroys of a deleted subtree, collect its passive ones,
	/// and remove its host nodes.
	///
	/// Only the topmost host nodes are detached from `host_parent`, after
	/// their descendants were visited. Their descendants leave with them.
	fn commit_deletion_effects(&mut self, host_parent: Option<HostHandle>, id: FiberId) {
		let (tag, child, instance, effects) = {
			let fibers = self.runtime.fibers.borrow();
			let fiber = &fibers[id];
			let effects = match fiber.tag {
				WorkTag::FunctionComponent => fiber.update_queue.effects().to_vec(),
				_ => Vec::new(),
			};
			(fiber.tag, fiber.child, fiber.state_node.host_handle(), effects)
		};

		let child_host_parent = match tag {
			WorkTag::HostComponent | WorkTag::HostText => None,
			WorkTag::FunctionComponent => {
				let (layout, passive): (Vec<Effect>, Vec<Effect>) = effects
					.into_iter()
					.filter(|effect| effect.has_kind(HookFlags::LAYOUT) || effect.has_kind(HookFlags::PASSIVE))
					.partition(|effect| effect.has_kind(HookFlags::LAYOUT));
				self.run_layout_destroys(id, layout);
				self.passive_deletions.extend(passive);
				host_parent
			}
			WorkTag::Root | WorkTag::Indeterminate => host_parent,
		};

		let mut next = child;
		while let Some(child) = next {
			self.commit_deletion_effects(child_host_parent, child);
			next = self.sibling(child);
		}

		if matches!(tag, WorkTag::HostComponent | WorkTag::HostText)
			&& let Some(instance) = instance
		{
			if let Some(parent) = host_parent {
				self.runtime.host.borrow_mut().remove_child(parent, instance);
			}
			self.runtime.instances.borrow_mut().remove(&instance);
		}
	}
}

fn insert_or_append_placement_node(
	fibers: &FiberArena,
	host: &mut dyn HostRenderer,
	id: FiberId,
	before: Option<HostHandle>,
	parent: HostHandle,
) {
	let fiber = &fibers[id];
	if fiber.is_host() {
		if let Some(instance) = fiber.state_node.host_handle() {
			match before {
				Some(before) => host.insert_before(parent, instance, before),
				None => host.append_child(parent, instance),
			}
		}
		return;
	}
	let mut next = fiber.child;
	while let Some(child) = next {
		insert_or_append_placement_node(fibers, host, child, before, parent);
		next = fibers[child].sibling;
	}
}

/// Nearest ancestor of `id` that can hold host children.
fn get_host_parent_fiber(fibers: &FiberArena, id: FiberId) -> FiberId {
	let mut node = fibers[id].parent;
	while let Some(parent) = node {
		if fibers[parent].is_host_parent() {
			return parent;
		}
		node = fibers[parent].parent;
	}
	panic!("fiber {id:?} has no host parent");
}

/// Host node that `id`'s host nodes must be inserted before, or `None` to
/// append.
///
/// Walks forward through siblings, climbing to the parent's siblings while
/// the parent is not a host node itself, and descends into function
/// components. Fibers that are being placed in this commit are not in the
/// host tree yet and are skipped.
fn get_host_sibling(fibers: &FiberArena, id: FiberId) -> Option<HostHandle> {
	let mut node = id;
	'siblings: loop {
		while fibers[node].sibling.is_none() {
			match fibers[node].parent {
				Some(parent) if !fibers[parent].is_host_parent() => node = parent,
				_ => return None,
			}
		}
		node = fibers[node].sibling?;

		while !fibers[node].is_host() {
			if fibers[node].flags.contains(FiberFlags::PLACEMENT) {
				continue 'siblings;
			}
			match fibers[node].child {
				Some(child) => node = child,
				None => continue 'siblings,
			}
		}

		if !fibers[node].flags.contains(FiberFlags::PLACEMENT) {
			return fibers[node].state_node.host_handle();
		}
	}
}

/// Effects of kind `kind` due in this commit, children before parents.
///
/// Subtrees whose flags do not intersect `mask` are skipped.
fn collect_effects(
	fibers: &FiberArena,
	root: FiberId,
	mask: FiberFlags,
	kind: HookFlags,
) -> Vec<Effect> {
	fn visit(fibers: &FiberArena, id: FiberId, mask: FiberFlags, kind: HookFlags, out: &mut Vec<Effect>) {
		let fiber = &fibers[id];
		if fiber.subtree_flags.intersects(mask) {
			let mut next = fiber.child;
			while let Some(child) = next {
				visit(fibers, child, mask, kind, out);
				next = fibers[child].sibling;
			}
		}
		if fiber.tag == WorkTag::FunctionComponent && fiber.flags.intersects(mask) {
			out.extend(
				fiber
					.update_queue
					.effects()
					.iter()
					.filter(|effect| effect.fires(kind))
					.cloned(),
			);
		}
	}

	let mut effects = Vec::new();
	visit(fibers, root, mask, kind, &mut effects);
	effects
}
