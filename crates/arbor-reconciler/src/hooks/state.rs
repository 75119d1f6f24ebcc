//! State hooks: `use_state` and `use_reducer`.
//!
//! Each state hook owns a [`HookQueue`] shared by the fiber and its
//! alternate. Dispatching never touches the queue's pending list directly:
//! the update goes to the runtime's concurrent update buffer and is spliced
//! in when the next render starts, so several dispatches in one task render
//! once.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use super::{Hook, HookState, RenderContext};
use crate::fiber::FiberId;
use crate::runtime::RuntimeInner;
use crate::update_queue::UpdateQueue;

pub(crate) type ErasedReducer = Rc<dyn Fn(&dyn Any, &dyn Any) -> Rc<dyn Any>>;
type StateEq = fn(&dyn Any, &dyn Any) -> bool;

/// A dispatched action, possibly with a precomputed result.
#[derive(Clone)]
pub(crate) struct HookUpdate {
	pub(crate) action: Rc<dyn Any>,
	pub(crate) eager_state: Option<Rc<dyn Any>>,
	pub(crate) eager_reducer: Option<ErasedReducer>,
	/// Computed eagerly to the current state, so no render was scheduled.
	pub(crate) bailed_out: bool,
}

/// Queue of a state hook.
pub(crate) struct HookQueue {
	pub(crate) pending: UpdateQueue<HookUpdate>,
	pub(crate) last_rendered_reducer: Option<ErasedReducer>,
	pub(crate) last_rendered_state: Option<Rc<dyn Any>>,
	pub(crate) state_eq: StateEq,
	/// Updates sitting in the concurrent buffer for this queue that
	/// scheduled a render. Bailed-out updates are not counted.
	pub(crate) buffered: usize,
	/// Fiber the hook was mounted on; dispatches are bound to it.
	pub(crate) fiber: FiberId,
}

impl fmt::Debug for HookQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookQueue")
			.field("pending", &self.pending.len())
			.field("buffered", &self.buffered)
			.finish_non_exhaustive()
	}
}

fn state_eq<S: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
	match (a.downcast_ref::<S>(), b.downcast_ref::<S>()) {
		(Some(a), Some(b)) => a == b,
		_ => false,
	}
}

fn erase_reducer<S, A, R>(reducer: R) -> ErasedReducer
where
	S: 'static,
	A: 'static,
	R: Fn(&S, &A) -> S + 'static,
{
	Rc::new(move |state: &dyn Any, action: &dyn Any| {
		let state = state
			.downcast_ref::<S>()
			.expect("hook state changed type between renders");
		let action = action
			.downcast_ref::<A>()
			.expect("hook action dispatched with the wrong type");
		Rc::new(reducer(state, action)) as Rc<dyn Any>
	})
}

/// Sends actions to a reducer hook.
///
/// The handle stays the same across renders and can be moved into event
/// handlers and effects. Dispatching after the component unmounted is a
/// no-op with a warning.
pub struct Dispatch<A> {
	fiber: FiberId,
	queue: Rc<RefCell<HookQueue>>,
	runtime: Weak<RuntimeInner>,
	_action: PhantomData<fn(A)>,
}

impl<A> Clone for Dispatch<A> {
	fn clone(&self) -> Self {
		Self {
			fiber: self.fiber,
			queue: self.queue.clone(),
			runtime: self.runtime.clone(),
			_action: PhantomData,
		}
	}
}

impl<A: 'static> Dispatch<A> {
	/// Queue `action` and schedule a render unless it provably changes nothing.
	pub fn dispatch(&self, action: A) {
		let Some(runtime) = self.runtime.upgrade() else {
			warn!("dispatch after the runtime was dropped");
			return;
		};
		runtime.dispatch_hook_action(self.fiber, &self.queue, Rc::new(action));
	}

	/// True when both handles feed the same hook.
	pub fn ptr_eq(&self, other: &Dispatch<A>) -> bool {
		Rc::ptr_eq(&self.queue, &other.queue)
	}
}

impl<A> fmt::Debug for Dispatch<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dispatch").field("fiber", &self.fiber).finish()
	}
}

/// Action accepted by a [`StateSetter`].
pub enum StateAction<T> {
	/// Replace the state.
	Set(T),
	/// Compute the next state from the previous one.
	Update(Rc<dyn Fn(&T) -> T>),
}

fn basic_state_reducer<T: Clone>(state: &T, action: &StateAction<T>) -> T {
	match action {
		StateAction::Set(value) => value.clone(),
		StateAction::Update(update) => update(state),
	}
}

/// Setter returned by [`RenderContext::use_state`].
pub struct StateSetter<T> {
	dispatch: Dispatch<StateAction<T>>,
}

impl<T> Clone for StateSetter<T> {
	fn clone(&self) -> Self {
		Self {
			dispatch: self.dispatch.clone(),
		}
	}
}

impl<T: 'static> StateSetter<T> {
	/// Replace the state with `value`.
	pub fn set(&self, value: T) {
		self.dispatch.dispatch(StateAction::Set(value));
	}

	/// Derive the next state from the previous one.
	pub fn update<F>(&self, update: F)
	where
		F: Fn(&T) -> T + 'static,
	{
		self.dispatch.dispatch(StateAction::Update(Rc::new(update)));
	}

	/// True when both setters feed the same hook.
	pub fn ptr_eq(&self, other: &StateSetter<T>) -> bool {
		self.dispatch.ptr_eq(&other.dispatch)
	}
}

impl<T> fmt::Debug for StateSetter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("StateSetter").field(&self.dispatch).finish()
	}
}

impl RenderContext {
	/// Local state.
	///
	/// `init` runs only on the first render. Setting a value equal to the
	/// current one does not schedule a render.
	pub fn use_state<T, F>(&mut self, init: F) -> (T, StateSetter<T>)
	where
		T: Clone + PartialEq + 'static,
		F: FnOnce() -> T,
	{
		let (state, dispatch) = match self.current_hook() {
			None => {
				let reducer = erase_reducer(basic_state_reducer::<T>);
				self.mount_reducer(init(), reducer)
			}
			Some(hook) => {
				let reducer = hook
					.queue
					.as_ref()
					.and_then(|queue| queue.borrow().last_rendered_reducer.clone())
					.expect("state hook without a reducer");
				self.update_reducer::<StateAction<T>>(reducer)
			}
		};
		let value = state
			.downcast_ref::<T>()
			.expect("hook state changed type between renders")
			.clone();
		(value, StateSetter { dispatch })
	}

	/// State driven by a reducer.
	///
	/// The reducer passed on each render is the one used to process that
	/// render's updates.
	pub fn use_reducer<S, A, R>(&mut self, reducer: R, initial: S) -> (Rc<S>, Dispatch<A>)
	where
		S: PartialEq + 'static,
		A: 'static,
		R: Fn(&S, &A) -> S + 'static,
	{
		let reducer = erase_reducer(reducer);
		let (state, dispatch) = if self.is_mount() {
			self.mount_reducer(initial, reducer)
		} else {
			self.update_reducer::<A>(reducer)
		};
		let state = state
			.downcast::<S>()
			.unwrap_or_else(|_| panic!("hook state changed type between renders"));
		(state, dispatch)
	}

	fn mount_reducer<S, A>(&mut self, initial: S, reducer: ErasedReducer) -> (Rc<dyn Any>, Dispatch<A>)
	where
		S: PartialEq + 'static,
		A: 'static,
	{
		let state: Rc<dyn Any> = Rc::new(initial);
		let queue = Rc::new(RefCell::new(HookQueue {
			pending: UpdateQueue::new(),
			last_rendered_reducer: Some(reducer),
			last_rendered_state: Some(state.clone()),
			state_eq: state_eq::<S>,
			buffered: 0,
			fiber: self.fiber(),
		}));
		let dispatch = Dispatch {
			fiber: self.fiber(),
			queue: queue.clone(),
			runtime: self.runtime(),
			_action: PhantomData,
		};

		self.push_hook(Hook {
			memoized_state: HookState::Value(state.clone()),
			queue: Some(queue),
		});
		(state, dispatch)
	}

	fn update_reducer<A: 'static>(&mut self, reducer: ErasedReducer) -> (Rc<dyn Any>, Dispatch<A>) {
		let hook = self
			.current_hook()
			.cloned()
			.expect("update render without a previous hook");
		let HookState::Value(mut state) = hook.memoized_state else {
			panic!("hook order changed: expected a state hook");
		};
		let queue = hook.queue.expect("state hook without a queue");

		let updates = queue.borrow_mut().pending.drain();
		let count = updates.len();
		for update in updates {
			state = match (update.eager_state, update.eager_reducer) {
				(Some(eager), Some(eager_reducer)) if Rc::ptr_eq(&eager_reducer, &reducer) => eager,
				_ => reducer(&*state, &*update.action),
			};
		}
		if count > 0 {
			trace!(fiber = ?self.fiber(), updates = count, "processed state updates");
		}

		let fiber = {
			let mut queue = queue.borrow_mut();
			queue.last_rendered_reducer = Some(reducer);
			queue.last_rendered_state = Some(state.clone());
			queue.fiber
		};
		let dispatch = Dispatch {
			fiber,
			queue: queue.clone(),
			runtime: self.runtime(),
			_action: PhantomData,
		};

		self.push_hook(Hook {
			memoized_state: HookState::Value(state.clone()),
			queue: Some(queue),
		});
		(state, dispatch)
	}
}

impl RuntimeInner {
	/// Enqueue a hook update and schedule its root.
	///
	/// When nothing that scheduled a render is queued for the hook, the next
	/// state is computed right away from the last rendered reducer. If it
	/// equals the current state the update is buffered without scheduling a
	/// render, and it does not block the same check for later dispatches.
	pub(crate) fn dispatch_hook_action(
		&self,
		fiber: FiberId,
		queue: &Rc<RefCell<HookQueue>>,
		action: Rc<dyn Any>,
	) {
		if !self.fibers.borrow().contains(fiber) {
			warn!(?fiber, "state update on an unmounted component");
			return;
		}

		let mut update = HookUpdate {
			action,
			eager_state: None,
			eager_reducer: None,
			bailed_out: false,
		};

		let eager = {
			let queue = queue.borrow();
			if queue.buffered == 0 && queue.pending.iter().all(|update| update.bailed_out) {
				queue
					.last_rendered_reducer
					.clone()
					.zip(queue.last_rendered_state.clone())
					.map(|(reducer, state)| (reducer, state, queue.state_eq))
			} else {
				None
			}
		};

		if let Some((reducer, current, eq)) = eager {
			let eager_state = reducer(&*current, &*update.action);
			let unchanged = eq(&*eager_state, &*current);
			update.eager_state = Some(eager_state);
			update.eager_reducer = Some(reducer);
			if unchanged {
				trace!(?fiber, "state unchanged, skipping render");
				update.bailed_out = true;
				self.concurrent_updates.enqueue_hook(fiber, queue.clone(), update);
				return;
			}
		}

		self.concurrent_updates.enqueue_hook(fiber, queue.clone(), update);
		match self.get_root_for_updated_fiber(fiber) {
			Some(root) => self.schedule_update_on_fiber(root),
			None => warn!(?fiber, "state update on a component detached from any root"),
		}
	}
}
