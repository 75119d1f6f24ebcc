//! Hooks runtime.
//!
//! A function component receives a [`RenderContext`] and calls hooks on it.
//! The context decides between mount and update behaviour once, when it is
//! created: a fiber whose alternate already holds a hook list renders in
//! update mode and binds the *n*-th hook call to the *n*-th previous record.
//!
//! Hook calls must happen in the same order on every render. A render that
//! calls more or fewer hooks than the previous one panics.
//!
//! ## Example
//!
//! ```
//! use arbor_reconciler::hooks::Deps;
//! use arbor_reconciler::vnode::{Children, Component, VNode};
//!
//! let counter = Component::new("Counter", |_props, cx| {
//!     let (count, set_count) = cx.use_state(|| 0);
//!     cx.use_effect(move || println!("count is {count}"), Some(Deps::new(count)));
//!     VNode::element("button")
//!         .on("onClick", move |_| set_count.update(|n| n + 1))
//!         .text(count.to_string())
//!         .build()
//!         .into()
//! });
//! # let _ = counter;
//! ```

pub mod effect;
pub mod memo;
pub mod state;

pub use effect::{Cleanup, Deps, IntoCleanup};
pub use state::{Dispatch, StateAction, StateSetter};

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::fiber::FiberId;
use crate::flags::FiberFlags;
use crate::runtime::RuntimeInner;
use effect::Effect;
use state::HookQueue;

/// Which hook implementations are active for a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatcher {
	Mount,
	Update,
}

/// Value held by one hook record.
#[derive(Clone)]
pub(crate) enum HookState {
	Value(Rc<dyn Any>),
	Effect(Effect),
	Ref(Rc<dyn Any>),
	Memo { value: Rc<dyn Any>, deps: Deps },
}

/// One record per hook call, in call order.
#[derive(Clone)]
pub(crate) struct Hook {
	pub(crate) memoized_state: HookState,
	pub(crate) queue: Option<Rc<RefCell<HookQueue>>>,
}

impl fmt::Debug for Hook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = match self.memoized_state {
			HookState::Value(_) => "state",
			HookState::Effect(_) => "effect",
			HookState::Ref(_) => "ref",
			HookState::Memo { .. } => "memo",
		};
		write!(f, "Hook({kind})")
	}
}

/// Per-render hook context handed to a function component.
pub struct RenderContext {
	runtime: Weak<RuntimeInner>,
	fiber: FiberId,
	dispatcher: Dispatcher,
	current_hooks: Vec<Hook>,
	hooks: Vec<Hook>,
	effects: Vec<Effect>,
	flags: FiberFlags,
}

/// What a finished render leaves on its fiber.
pub(crate) struct RenderedHooks {
	pub(crate) hooks: Vec<Hook>,
	pub(crate) effects: Vec<Effect>,
	pub(crate) flags: FiberFlags,
}

impl RenderContext {
	/// Context for rendering `fiber`. `current_hooks` is `Some` when the
	/// fiber has rendered before.
	pub(crate) fn new(
		runtime: Weak<RuntimeInner>,
		fiber: FiberId,
		current_hooks: Option<Vec<Hook>>,
	) -> Self {
		let (dispatcher, current_hooks) = match current_hooks {
			Some(hooks) => (Dispatcher::Update, hooks),
			None => (Dispatcher::Mount, Vec::new()),
		};
		Self {
			runtime,
			fiber,
			dispatcher,
			current_hooks,
			hooks: Vec::new(),
			effects: Vec::new(),
			flags: FiberFlags::empty(),
		}
	}

	/// Whether this is the component's first render.
	pub fn is_mount(&self) -> bool {
		self.dispatcher == Dispatcher::Mount
	}

	pub(crate) fn fiber(&self) -> FiberId {
		self.fiber
	}

	pub(crate) fn runtime(&self) -> Weak<RuntimeInner> {
		self.runtime.clone()
	}

	/// The previous record bound to the next hook call, in update mode.
	fn current_hook(&self) -> Option<&Hook> {
		match self.dispatcher {
			Dispatcher::Mount => None,
			Dispatcher::Update => {
				let index = self.hooks.len();
				Some(self.current_hooks.get(index).unwrap_or_else(|| {
					panic!("rendered more hooks than during the previous render (hook #{index})")
				}))
			}
		}
	}

	fn push_hook(&mut self, hook: Hook) {
		self.hooks.push(hook);
	}

	fn push_effect(&mut self, effect: Effect) {
		self.effects.push(effect);
	}

	/// Consume the context once the component returned.
	pub(crate) fn finish(self) -> RenderedHooks {
		if self.dispatcher == Dispatcher::Update && self.hooks.len() != self.current_hooks.len() {
			panic!(
				"rendered fewer hooks than expected: {} of {}",
				self.hooks.len(),
				self.current_hooks.len()
			);
		}
		RenderedHooks {
			hooks: self.hooks,
			effects: self.effects,
			flags: self.flags,
		}
	}
}

impl fmt::Debug for RenderContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderContext")
			.field("fiber", &self.fiber)
			.field("dispatcher", &self.dispatcher)
			.field("hooks", &self.hooks.len())
			.finish()
	}
}
