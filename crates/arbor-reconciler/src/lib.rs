//! Arbor Reconciler - fiber reconciliation, hooks and commit for arbor
//!
//! This crate turns declarative view descriptions ([`vnode::VNode`]) into a
//! tree of host instances and keeps that tree up to date with as few host
//! mutations as possible.
//!
//! ## Pipeline
//!
//! - An update ([`Root::render`], or a hook setter) is buffered and its root
//!   is scheduled on an [`arbor_scheduler::Scheduler`], at most one task per root.
//! - The task runs the work loop over a work-in-progress copy of the fiber
//!   tree. Function components render, children are reconciled by key, and
//!   host prop patches are computed. With time slicing the loop yields back
//!   to the scheduler between fibers.
//! - The finished tree is committed: host mutations first, then layout
//!   effects, then passive effects.
//! - Native events fired on a root container are dispatched to the handlers
//!   in the tree, capture phase first.
//!
//! Hosts plug in through [`host::HostRenderer`]. [`host::memory::MemoryHost`]
//! is an in-memory implementation for headless use and tests.
//!
//! ## Example
//!
//! ```
//! use arbor_reconciler::host::memory::{MemoryEvent, MemoryHost};
//! use arbor_reconciler::vnode::{Component, VNode};
//! use arbor_reconciler::Runtime;
//! use arbor_scheduler::{ManualClock, Scheduler};
//!
//! let counter = Component::new("Counter", |_props, cx| {
//!     let (count, set_count) = cx.use_state(|| 0);
//!     VNode::element("button")
//!         .attr("id", "inc")
//!         .on("onClick", move |_| set_count.update(|n| n + 1))
//!         .text(count.to_string())
//!         .build()
//!         .into()
//! });
//!
//! let host = MemoryHost::new();
//! let container = host.create_container();
//! let runtime = Runtime::new(host.clone(), Scheduler::new(ManualClock::new()));
//! let root = runtime.create_root(container);
//!
//! root.render(VNode::component(&counter).build());
//! runtime.flush();
//!
//! let button = host.find_by_id("inc").unwrap();
//! host.dispatch_event(button, MemoryEvent::new("click"));
//! runtime.flush();
//!
//! assert_eq!(host.inner_html(container), r#"<button id="inc">1</button>"#);
//! ```

mod begin_work;
mod child_fiber;
mod commit_work;
mod complete_work;
mod concurrent_updates;
mod update_queue;
mod work_loop;

pub mod config;
pub mod error;
pub mod events;
pub mod fiber;
pub mod flags;
pub mod hooks;
pub mod host;
pub mod props;
pub mod root;
pub mod runtime;
pub mod vnode;

pub use config::RuntimeConfig;
pub use error::{ArborError, ArborResult};
pub use events::{EventHandler, SyntheticEvent};
pub use fiber::{Fiber, FiberArena, FiberId, RootId, StateNode, WorkTag};
pub use flags::{FiberFlags, HookFlags};
pub use hooks::{Cleanup, Deps, Dispatch, RenderContext, StateSetter};
pub use host::{HostHandle, HostRenderer, PropChange, PropPatch};
pub use props::{PropValue, Props};
pub use root::Root;
pub use runtime::{Runtime, RuntimeBuilder};
pub use vnode::{Child, Children, Component, ElementType, Key, VNode, create_element};
