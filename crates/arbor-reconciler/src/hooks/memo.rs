//! `use_ref` and `use_memo`.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::{Hook, HookState, RenderContext};
use crate::hooks::Deps;

impl RenderContext {
	/// A mutable cell that keeps its identity across renders.
	///
	/// Writing to it does not schedule a render.
	pub fn use_ref<T, F>(&mut self, init: F) -> Rc<RefCell<T>>
	where
		T: 'static,
		F: FnOnce() -> T,
	{
		let cell: Rc<dyn Any> = match self.current_hook() {
			None => Rc::new(RefCell::new(init())),
			Some(hook) => match &hook.memoized_state {
				HookState::Ref(cell) => cell.clone(),
				_ => panic!("hook order changed: expected a ref hook"),
			},
		};
		self.push_hook(Hook {
			memoized_state: HookState::Ref(cell.clone()),
			queue: None,
		});
		cell.downcast::<RefCell<T>>()
			.unwrap_or_else(|_| panic!("ref hook changed type between renders"))
	}

	/// Recompute `compute` only when `deps` changed since the last render.
	pub fn use_memo<T, F>(&mut self, compute: F, deps: Deps) -> Rc<T>
	where
		T: 'static,
		F: FnOnce() -> T,
	{
		let previous = self.current_hook().map(|hook| match &hook.memoized_state {
			HookState::Memo { value, deps } => (value.clone(), deps.clone()),
			_ => panic!("hook order changed: expected a memo hook"),
		});

		let value: Rc<dyn Any> = match previous {
			Some((value, previous_deps)) if deps.same_as(&previous_deps) => value,
			_ => Rc::new(compute()),
		};
		self.push_hook(Hook {
			memoized_state: HookState::Memo {
				value: value.clone(),
				deps,
			},
			queue: None,
		});
		value
			.downcast::<T>()
			.unwrap_or_else(|_| panic!("memo hook changed type between renders"))
	}
}
