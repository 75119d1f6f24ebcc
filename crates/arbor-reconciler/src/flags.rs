//! Effect flag bitsets for fibers and hook effects.

use bitflags::bitflags;

bitflags! {
	/// Pending work recorded on a fiber during render and consumed by commit.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct FiberFlags: u32 {
		/// The fiber's host nodes must be inserted (new fiber or moved fiber).
		const PLACEMENT = 0b0000_0010;
		/// Host props changed, a text node changed, or layout effects are dirty.
		const UPDATE = 0b0000_0100;
		/// Text content of a host element must be cleared before children are placed.
		const CONTENT_RESET = 0b0001_0000;
		/// The `deletions` list is non-empty.
		const CHILD_DELETION = 0b0010_0000;
		/// At least one passive effect is dirty.
		const PASSIVE = 0b1000_0000_0000;
	}
}

impl FiberFlags {
	/// Flags the mutation pass acts on.
	pub const MUTATION_MASK: FiberFlags = FiberFlags::PLACEMENT
		.union(FiberFlags::UPDATE)
		.union(FiberFlags::CHILD_DELETION)
		.union(FiberFlags::CONTENT_RESET);

	/// Flags the layout pass acts on.
	pub const LAYOUT_MASK: FiberFlags = FiberFlags::UPDATE;

	/// Flags the passive pass acts on. Deletions are included because a
	/// deleted subtree may own passive effects that need unmounting.
	pub const PASSIVE_MASK: FiberFlags = FiberFlags::PASSIVE.union(FiberFlags::CHILD_DELETION);
}

bitflags! {
	/// Flags on an effect record.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct HookFlags: u8 {
		/// The effect must fire during this commit.
		const HAS_EFFECT = 0b0001;
		/// Reserved for insertion effects.
		const INSERTION = 0b0010;
		/// `use_layout_effect`.
		const LAYOUT = 0b0100;
		/// `use_effect`.
		const PASSIVE = 0b1000;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_mutation_mask_covers_host_mutations() {
		assert!(FiberFlags::MUTATION_MASK.contains(FiberFlags::PLACEMENT));
		assert!(FiberFlags::MUTATION_MASK.contains(FiberFlags::UPDATE));
		assert!(FiberFlags::MUTATION_MASK.contains(FiberFlags::CHILD_DELETION));
		assert!(!FiberFlags::MUTATION_MASK.contains(FiberFlags::PASSIVE));
	}

	#[rstest]
	fn test_effect_flags_match_dirty_check() {
		let dirty = HookFlags::HAS_EFFECT | HookFlags::PASSIVE;
		let clean = HookFlags::PASSIVE;
		let wanted = HookFlags::HAS_EFFECT | HookFlags::PASSIVE;
		assert!(dirty.contains(wanted));
		assert!(!clean.contains(wanted));
		assert_eq!(HookFlags::HAS_EFFECT.bits(), 1);
		assert_eq!(HookFlags::PASSIVE.bits(), 8);
	}
}
