//! Effect hooks.
//!
//! Effects run after commit. `use_effect` effects run in the passive pass,
//! after every host mutation of the commit; `use_layout_effect` effects run
//! in the layout pass right after the mutation pass. An effect re-runs only
//! when its deps changed, or on every render when it has none.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{Hook, HookState, RenderContext};
use crate::flags::{FiberFlags, HookFlags};

/// Cleanup stored by an effect and run before it fires again or on unmount.
pub(crate) type Destroy = Box<dyn FnOnce()>;
type CreateFn = Box<dyn FnOnce() -> Option<Destroy>>;

/// Cleanup returned from an effect.
pub struct Cleanup(Destroy);

impl Cleanup {
	/// Wrap a cleanup function.
	pub fn new<F>(cleanup: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self(Box::new(cleanup))
	}
}

impl fmt::Debug for Cleanup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Cleanup(..)")
	}
}

/// Return types accepted from an effect function.
pub trait IntoCleanup {
	/// Convert into an optional cleanup.
	fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
	fn into_cleanup(self) -> Option<Cleanup> {
		None
	}
}

impl IntoCleanup for Cleanup {
	fn into_cleanup(self) -> Option<Cleanup> {
		Some(self)
	}
}

impl IntoCleanup for Option<Cleanup> {
	fn into_cleanup(self) -> Option<Cleanup> {
		self
	}
}

/// Dependency value of an effect or memo.
///
/// Deps compare with `PartialEq`. Use a tuple to depend on several values;
/// `Deps::new(())` never changes, so the effect runs once.
#[derive(Clone)]
pub struct Deps {
	value: Rc<dyn Any>,
	eq: fn(&dyn Any, &dyn Any) -> bool,
}

fn deps_eq<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
	match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
		(Some(a), Some(b)) => a == b,
		_ => false,
	}
}

impl Deps {
	/// Deps holding `value`.
	pub fn new<T: PartialEq + 'static>(value: T) -> Self {
		Self {
			value: Rc::new(value),
			eq: deps_eq::<T>,
		}
	}

	/// Deps that never change.
	pub fn empty() -> Self {
		Self::new(())
	}

	/// Whether both deps hold equal values of the same type.
	pub fn same_as(&self, other: &Deps) -> bool {
		(self.eq)(&*self.value, &*other.value)
	}
}

impl fmt::Debug for Deps {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Deps(..)")
	}
}

/// `None` deps are never equal, so the effect fires every render.
pub(crate) fn are_hook_inputs_equal(next: Option<&Deps>, prev: Option<&Deps>) -> bool {
	match (next, prev) {
		(Some(next), Some(prev)) => next.same_as(prev),
		_ => false,
	}
}

/// One effect record of a render.
///
/// `inst` holds the cleanup of the last run and is shared by every record
/// of the same hook, so a later render can destroy what an earlier one
/// created.
#[derive(Clone)]
pub(crate) struct Effect {
	pub(crate) tag: HookFlags,
	pub(crate) create: Rc<RefCell<Option<CreateFn>>>,
	pub(crate) inst: Rc<RefCell<Option<Destroy>>>,
	pub(crate) deps: Option<Deps>,
}

impl Effect {
	/// Whether this record fires for a pass keyed by `kind`.
	pub(crate) fn fires(&self, kind: HookFlags) -> bool {
		self.tag.contains(kind | HookFlags::HAS_EFFECT)
	}

	pub(crate) fn has_kind(&self, kind: HookFlags) -> bool {
		self.tag.contains(kind)
	}

	/// Run the create function and store its cleanup.
	pub(crate) fn mount(&self) {
		let create = self.create.borrow_mut().take();
		if let Some(create) = create {
			let destroy = create();
			*self.inst.borrow_mut() = destroy;
		}
	}

	/// Run and clear the stored cleanup.
	pub(crate) fn unmount(&self) {
		let destroy = self.inst.borrow_mut().take();
		if let Some(destroy) = destroy {
			destroy();
		}
	}
}

impl fmt::Debug for Effect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Effect")
			.field("tag", &self.tag)
			.field("deps", &self.deps)
			.finish_non_exhaustive()
	}
}

impl RenderContext {
	/// Run `create` after the commit's host mutations are done.
	///
	/// # Arguments
	///
	/// * `create` - Effect body; may return a [`Cleanup`]
	/// * `deps` - Re-run only when these change; `None` re-runs every render
	pub fn use_effect<F, C>(&mut self, create: F, deps: Option<Deps>)
	where
		F: FnOnce() -> C + 'static,
		C: IntoCleanup,
	{
		self.effect_impl(FiberFlags::PASSIVE, HookFlags::PASSIVE, create, deps);
	}

	/// Like [`use_effect`](Self::use_effect), but fires in the layout pass,
	/// before any passive effect of the same commit.
	pub fn use_layout_effect<F, C>(&mut self, create: F, deps: Option<Deps>)
	where
		F: FnOnce() -> C + 'static,
		C: IntoCleanup,
	{
		self.effect_impl(FiberFlags::UPDATE, HookFlags::LAYOUT, create, deps);
	}

	fn effect_impl<F, C>(
		&mut self,
		fiber_flags: FiberFlags,
		hook_flags: HookFlags,
		create: F,
		deps: Option<Deps>,
	) where
		F: FnOnce() -> C + 'static,
		C: IntoCleanup,
	{
		let create: CreateFn =
			Box::new(move || create().into_cleanup().map(|cleanup| cleanup.0));
		let create = Rc::new(RefCell::new(Some(create)));

		let previous = self.current_hook().map(|hook| match &hook.memoized_state {
			HookState::Effect(effect) => effect.clone(),
			_ => panic!("hook order changed: expected an effect hook"),
		});

		let (inst, dirty) = match previous {
			None => (Rc::new(RefCell::new(None)), true),
			Some(previous) => {
				let dirty = !are_hook_inputs_equal(deps.as_ref(), previous.deps.as_ref());
				(previous.inst, dirty)
			}
		};

		let tag = if dirty {
			self.flags |= fiber_flags;
			HookFlags::HAS_EFFECT | hook_flags
		} else {
			hook_flags
		};

		let effect = Effect {
			tag,
			create,
			inst,
			deps,
		};
		self.push_effect(effect.clone());
		self.push_hook(Hook {
			memoized_state: HookState::Effect(effect),
			queue: None,
		});
	}
}
