//! Child reconciliation.
//!
//! Given a work-in-progress parent, the first child of its current
//! counterpart, and a new [`Children`] description, build the new child list
//! and record what commit has to do: new or moved fibers get `PLACEMENT`,
//! removed fibers go on the parent's `deletions` with `CHILD_DELETION`.
//!
//! Lists use a two-pass diff. The first pass walks old and new entries in
//! lockstep while keys keep matching. Whatever remains is matched through a
//! key (or index) map. Moves are detected with `last_placed_index`: a reused
//! fiber whose old index is lower than the highest old index placed so far
//! has to move.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use crate::fiber::{FiberArena, FiberId, FiberProps, WorkTag};
use crate::flags::FiberFlags;
use crate::vnode::{Child, Children, Key, VNode};

/// Slot of an old fiber in the lookup map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MapKey {
	Key(Key),
	Index(usize),
}

pub(crate) struct ChildReconciler<'a> {
	fibers: &'a mut FiberArena,
	should_track_side_effects: bool,
}

impl<'a> ChildReconciler<'a> {
	/// `should_track_side_effects` is false only when mounting a subtree
	/// that has no current counterpart.
	pub(crate) fn new(fibers: &'a mut FiberArena, should_track_side_effects: bool) -> Self {
		Self {
			fibers,
			should_track_side_effects,
		}
	}

	/// Reconcile `new_child` against the old children starting at
	/// `current_first_child`. Returns the new first child.
	pub(crate) fn reconcile_child_fibers(
		&mut self,
		parent: FiberId,
		current_first_child: Option<FiberId>,
		new_child: &Children,
	) -> Option<FiberId> {
		match new_child {
			Children::Single(Child::Element(node)) => {
				let fiber = self.reconcile_single_element(parent, current_first_child, node);
				Some(self.place_single_child(fiber))
			}
			Children::Single(Child::Text(text)) if !text.is_empty() => {
				let fiber = self.reconcile_single_text_node(parent, current_first_child, text);
				Some(self.place_single_child(fiber))
			}
			Children::List(children) => {
				self.reconcile_children_array(parent, current_first_child, children)
			}
			Children::Single(_) => {
				self.delete_remaining_children(parent, current_first_child);
				None
			}
		}
	}

	fn delete_child(&mut self, parent: FiberId, child: FiberId) {
		if !self.should_track_side_effects {
			return;
		}
		let parent = &mut self.fibers[parent];
		parent.deletions.push(child);
		parent.flags |= FiberFlags::CHILD_DELETION;
	}

	fn delete_remaining_children(&mut self, parent: FiberId, current_first_child: Option<FiberId>) {
		if !self.should_track_side_effects {
			return;
		}
		let mut child = current_first_child;
		while let Some(current) = child {
			self.delete_child(parent, current);
			child = self.fibers[current].sibling;
		}
	}

	/// Work-in-progress clone of `fiber`, detached from its old siblings.
	fn use_fiber(&mut self, fiber: FiberId, pending_props: FiberProps) -> FiberId {
		let clone = self.fibers.create_work_in_progress(fiber, pending_props);
		let clone_fiber = &mut self.fibers[clone];
		clone_fiber.index = 0;
		clone_fiber.sibling = None;
		clone
	}

	fn adopt(&mut self, parent: FiberId, fiber: FiberId) -> FiberId {
		self.fibers[fiber].parent = Some(parent);
		fiber
	}

	fn place_single_child(&mut self, fiber: FiberId) -> FiberId {
		if self.should_track_side_effects && self.fibers[fiber].alternate.is_none() {
			self.fibers[fiber].flags |= FiberFlags::PLACEMENT;
		}
		fiber
	}

	fn place_child(&mut self, fiber: FiberId, last_placed_index: usize, new_index: usize) -> usize {
		self.fibers[fiber].index = new_index;
		if !self.should_track_side_effects {
			return last_placed_index;
		}
		match self.fibers[fiber].alternate {
			Some(current) => {
				let old_index = self.fibers[current].index;
				if old_index < last_placed_index {
					trace!(?fiber, old_index, new_index, "child moved");
					self.fibers[fiber].flags |= FiberFlags::PLACEMENT;
					last_placed_index
				} else {
					old_index
				}
			}
			None => {
				self.fibers[fiber].flags |= FiberFlags::PLACEMENT;
				last_placed_index
			}
		}
	}

	fn reconcile_single_element(
		&mut self,
		parent: FiberId,
		current_first_child: Option<FiberId>,
		element: &VNode,
	) -> FiberId {
		let key = element.key();
		let mut child = current_first_child;
		while let Some(current) = child {
			if self.fibers[current].key.as_ref() == key {
				if self.fibers[current].element_type.as_ref() == Some(element.element_type()) {
					let sibling = self.fibers[current].sibling;
					self.delete_remaining_children(parent, sibling);
					let existing =
						self.use_fiber(current, FiberProps::Element(element.props().clone()));
					return self.adopt(parent, existing);
				}
				// Same key, different type: nothing after it can match either.
				self.delete_remaining_children(parent, Some(current));
				break;
			}
			self.delete_child(parent, current);
			child = self.fibers[current].sibling;
		}

		let created = self.fibers.create_fiber_from_vnode(element);
		self.adopt(parent, created)
	}

	fn reconcile_single_text_node(
		&mut self,
		parent: FiberId,
		current_first_child: Option<FiberId>,
		text: &Rc<str>,
	) -> FiberId {
		if let Some(current) = current_first_child
			&& self.fibers[current].tag == WorkTag::HostText
		{
			let sibling = self.fibers[current].sibling;
			self.delete_remaining_children(parent, sibling);
			let existing = self.use_fiber(current, FiberProps::Text(text.clone()));
			return self.adopt(parent, existing);
		}
		self.delete_remaining_children(parent, current_first_child);
		let created = self.fibers.create_fiber_from_text(text.clone());
		self.adopt(parent, created)
	}

	fn create_child(&mut self, parent: FiberId, child: &Child) -> Option<FiberId> {
		let created = match child {
			Child::Text(text) if !text.is_empty() => self.fibers.create_fiber_from_text(text.clone()),
			Child::Element(node) => self.fibers.create_fiber_from_vnode(node),
			_ => return None,
		};
		Some(self.adopt(parent, created))
	}

	fn update_text_node(&mut self, parent: FiberId, current: Option<FiberId>, text: &Rc<str>) -> FiberId {
		let fiber = match current {
			Some(current) if self.fibers[current].tag == WorkTag::HostText => {
				self.use_fiber(current, FiberProps::Text(text.clone()))
			}
			_ => self.fibers.create_fiber_from_text(text.clone()),
		};
		self.adopt(parent, fiber)
	}

	fn update_element(&mut self, parent: FiberId, current: Option<FiberId>, element: &VNode) -> FiberId {
		let fiber = match current {
			Some(current)
				if self.fibers[current].element_type.as_ref() == Some(element.element_type()) =>
			{
				self.use_fiber(current, FiberProps::Element(element.props().clone()))
			}
			_ => self.fibers.create_fiber_from_vnode(element),
		};
		self.adopt(parent, fiber)
	}

	/// Reuse or replace `old` for `new_child` when their keys agree.
	/// `None` means the slots do not line up and the first pass must stop.
	fn update_slot(&mut self, parent: FiberId, old: Option<FiberId>, new_child: &Child) -> Option<FiberId> {
		let key = old.and_then(|old| self.fibers[old].key.clone());
		match new_child {
			Child::Text(text) if !text.is_empty() => {
				// Text has no key; a keyed old fiber cannot hold it.
				if key.is_some() {
					return None;
				}
				Some(self.update_text_node(parent, old, text))
			}
			Child::Element(node) if node.key() == key.as_ref() => {
				Some(self.update_element(parent, old, node))
			}
			_ => None,
		}
	}

	fn update_from_map(
		&mut self,
		existing: &HashMap<MapKey, FiberId>,
		parent: FiberId,
		new_index: usize,
		new_child: &Child,
	) -> Option<FiberId> {
		match new_child {
			Child::Text(text) if !text.is_empty() => {
				let matched = existing.get(&MapKey::Index(new_index)).copied();
				Some(self.update_text_node(parent, matched, text))
			}
			Child::Element(node) => {
				let map_key = node
					.key()
					.cloned()
					.map_or(MapKey::Index(new_index), MapKey::Key);
				let matched = existing.get(&map_key).copied();
				Some(self.update_element(parent, matched, node))
			}
			_ => None,
		}
	}

	fn map_key_of(&self, fiber: FiberId) -> MapKey {
		let fiber = &self.fibers[fiber];
		match &fiber.key {
			Some(key) => MapKey::Key(key.clone()),
			None => MapKey::Index(fiber.index),
		}
	}

	fn map_remaining_children(&self, current_first_child: Option<FiberId>) -> HashMap<MapKey, FiberId> {
		let mut existing = HashMap::new();
		let mut child = current_first_child;
		while let Some(current) = child {
			existing.insert(self.map_key_of(current), current);
			child = self.fibers[current].sibling;
		}
		existing
	}

	fn append(&mut self, first: &mut Option<FiberId>, previous: &mut Option<FiberId>, fiber: FiberId) {
		match *previous {
			None => *first = Some(fiber),
			Some(previous) => self.fibers[previous].sibling = Some(fiber),
		}
		*previous = Some(fiber);
	}

	fn reconcile_children_array(
		&mut self,
		parent: FiberId,
		current_first_child: Option<FiberId>,
		new_children: &[Child],
	) -> Option<FiberId> {
		let mut resulting_first_child = None;
		let mut previous_new_fiber = None;
		let mut old_fiber = current_first_child;
		let mut last_placed_index = 0;
		let mut new_index = 0;

		// First pass: walk both lists while the slots line up.
		while let Some(old) = old_fiber {
			if new_index >= new_children.len() {
				break;
			}
			// An old index ahead of the new one means an empty entry left a gap.
			let (slot, next_old_fiber) = if self.fibers[old].index > new_index {
				(None, Some(old))
			} else {
				(Some(old), self.fibers[old].sibling)
			};

			let Some(new_fiber) = self.update_slot(parent, slot, &new_children[new_index]) else {
				break;
			};
			if self.should_track_side_effects
				&& let Some(slot) = slot
				&& self.fibers[new_fiber].alternate.is_none()
			{
				// Matched the slot but could not reuse the fiber.
				self.delete_child(parent, slot);
			}
			last_placed_index = self.place_child(new_fiber, last_placed_index, new_index);
			self.append(&mut resulting_first_child, &mut previous_new_fiber, new_fiber);
			old_fiber = next_old_fiber;
			new_index += 1;
		}

		if new_index == new_children.len() {
			self.delete_remaining_children(parent, old_fiber);
			return resulting_first_child;
		}

		if old_fiber.is_none() {
			for (index, child) in new_children.iter().enumerate().skip(new_index) {
				let Some(new_fiber) = self.create_child(parent, child) else {
					continue;
				};
				last_placed_index = self.place_child(new_fiber, last_placed_index, index);
				self.append(&mut resulting_first_child, &mut previous_new_fiber, new_fiber);
			}
			return resulting_first_child;
		}

		// Second pass: match the remainder by key, or by index when unkeyed.
		let mut existing = self.map_remaining_children(old_fiber);
		for (index, child) in new_children.iter().enumerate().skip(new_index) {
			let Some(new_fiber) = self.update_from_map(&existing, parent, index, child) else {
				continue;
			};
			if self.should_track_side_effects
				&& let Some(current) = self.fibers[new_fiber].alternate
			{
				let map_key = self.map_key_of(current);
				existing.remove(&map_key);
			}
			last_placed_index = self.place_child(new_fiber, last_placed_index, index);
			self.append(&mut resulting_first_child, &mut previous_new_fiber, new_fiber);
		}

		if self.should_track_side_effects {
			let leftovers: HashSet<FiberId> = existing.into_values().collect();
			let mut child = old_fiber;
			while let Some(current) = child {
				if leftovers.contains(&current) {
					self.delete_child(parent, current);
				}
				child = self.fibers[current].sibling;
			}
		}

		resulting_first_child
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::props::Props;
	use rstest::rstest;

	fn keyed(keys: &[&str]) -> Children {
		Children::list(
			keys.iter()
				.map(|key| VNode::element("li").key(*key).text(*key).build()),
		)
	}

	/// Mount `first` under a fresh parent, then reconcile `second` against
	/// it and return the work-in-progress parent.
	fn reconcile_twice(arena: &mut FiberArena, first: &Children, second: &Children) -> FiberId {
		let parent = arena.create_fiber(
			WorkTag::HostComponent,
			FiberProps::Element(Props::empty()),
			None,
		);
		let mounted = ChildReconciler::new(arena, false).reconcile_child_fibers(parent, None, first);
		arena[parent].child = mounted;

		let wip = arena.create_work_in_progress(parent, FiberProps::Element(Props::empty()));
		let current_first = arena[parent].child;
		let child = ChildReconciler::new(arena, true).reconcile_child_fibers(wip, current_first, second);
		arena[wip].child = child;
		wip
	}

	fn summary(arena: &FiberArena, parent: FiberId) -> Vec<(String, bool)> {
		arena
			.children(parent)
			.into_iter()
			.map(|id| {
				let fiber = &arena[id];
				let name = fiber
					.key
					.as_ref()
					.map(|key| key.to_string())
					.or_else(|| fiber.pending_props.as_text().map(str::to_string))
					.unwrap_or_default();
				(name, fiber.flags.contains(FiberFlags::PLACEMENT))
			})
			.collect()
	}

	fn deleted_keys(arena: &FiberArena, parent: FiberId) -> Vec<String> {
		arena[parent]
			.deletions
			.iter()
			.map(|id| arena[*id].key.as_ref().map(Key::to_string).unwrap_or_default())
			.collect()
	}

	#[rstest]
	fn test_mount_does_not_track_placement() {
		let mut arena = FiberArena::new();
		let parent = arena.create_fiber(WorkTag::HostComponent, FiberProps::None, None);
		let first = ChildReconciler::new(&mut arena, false).reconcile_child_fibers(
			parent,
			None,
			&keyed(&["a", "b"]),
		);
		arena[parent].child = first;

		assert_eq!(
			summary(&arena, parent),
			vec![("a".to_string(), false), ("b".to_string(), false)]
		);
		assert_eq!(arena[arena.children(parent)[1]].index, 1);
	}

	#[rstest]
	#[case(&["a", "b", "c"], &["a", "b", "c"], &[])]
	#[case(&["a", "b", "c"], &["c", "a", "b"], &["a", "b"])]
	#[case(&["a", "b", "c"], &["b", "c", "a"], &["a"])]
	#[case(&["a", "b", "c"], &["a", "c", "b"], &["b"])]
	#[case(&["a", "b"], &["a", "x", "b"], &["x"])]
	fn test_keyed_moves_follow_last_placed_index(
		#[case] before: &[&str],
		#[case] after: &[&str],
		#[case] placed: &[&str],
	) {
		let mut arena = FiberArena::new();
		let wip = reconcile_twice(&mut arena, &keyed(before), &keyed(after));

		let result = summary(&arena, wip);
		let order: Vec<&str> = result.iter().map(|(key, _)| key.as_str()).collect();
		let flagged: Vec<&str> = result
			.iter()
			.filter(|(_, placed)| *placed)
			.map(|(key, _)| key.as_str())
			.collect();

		assert_eq!(order, after);
		assert_eq!(flagged, placed);
		assert!(arena[wip].deletions.is_empty());
	}

	#[rstest]
	fn test_removed_key_is_deleted_and_survivor_not_placed() {
		let mut arena = FiberArena::new();
		let wip = reconcile_twice(&mut arena, &keyed(&["1", "2"]), &keyed(&["2"]));

		assert_eq!(deleted_keys(&arena, wip), vec!["1"]);
		assert!(arena[wip].flags.contains(FiberFlags::CHILD_DELETION));
		assert_eq!(summary(&arena, wip), vec![("2".to_string(), false)]);
	}

	#[rstest]
	fn test_reused_fiber_is_alternate_of_old() {
		let mut arena = FiberArena::new();
		let parent_before = keyed(&["a", "b"]);
		let wip = reconcile_twice(&mut arena, &parent_before, &keyed(&["b", "a"]));

		for id in arena.children(wip) {
			let alternate = arena[id].alternate.expect("reused fiber has an alternate");
			assert_eq!(arena[alternate].key, arena[id].key);
		}
	}

	#[rstest]
	fn test_type_change_replaces_fiber() {
		let mut arena = FiberArena::new();
		let before = Children::from(VNode::element("div").key("k").build());
		let after = Children::from(VNode::element("span").key("k").build());
		let wip = reconcile_twice(&mut arena, &before, &after);

		let children = arena.children(wip);
		assert_eq!(children.len(), 1);
		assert!(arena[children[0]].alternate.is_none());
		assert!(arena[children[0]].flags.contains(FiberFlags::PLACEMENT));
		assert_eq!(deleted_keys(&arena, wip), vec!["k"]);
	}

	#[rstest]
	fn test_single_text_child_is_reused() {
		let mut arena = FiberArena::new();
		let wip = reconcile_twice(
			&mut arena,
			&Children::list(["x".to_string()]),
			&Children::from("y"),
		);

		let children = arena.children(wip);
		assert_eq!(children.len(), 1);
		assert_eq!(arena[children[0]].tag, WorkTag::HostText);
		assert!(arena[children[0]].alternate.is_some());
		assert!(arena[wip].deletions.is_empty());
	}

	#[rstest]
	#[case(Children::from(""))]
	#[case(Children::none())]
	#[case(Children::list([Child::Empty, Child::from(""), Child::from(false)]))]
	fn test_empty_children_produce_no_fibers(#[case] children: Children) {
		let mut arena = FiberArena::new();
		let wip = reconcile_twice(&mut arena, &keyed(&["a"]), &children);

		assert!(arena.children(wip).is_empty());
		assert_eq!(deleted_keys(&arena, wip), vec!["a"]);
	}

	#[rstest]
	fn test_empty_entry_leaves_index_gap() {
		let mut arena = FiberArena::new();
		let a = || Child::from(VNode::element("a").build());
		let b = || Child::from(VNode::element("b").build());
		let wip = reconcile_twice(
			&mut arena,
			&Children::List(vec![a(), Child::Empty, b()]),
			&Children::List(vec![a(), Child::Empty, b()]),
		);

		let children = arena.children(wip);
		assert_eq!(children.len(), 2);
		assert_eq!(arena[children[1]].index, 2);
		assert!(children.iter().all(|id| arena[*id].alternate.is_some()));
		assert!(arena[wip].deletions.is_empty());
	}
}
