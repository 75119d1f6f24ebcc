//! # Arbor
//!
//! A retained-mode UI runtime. Describe a tree with [`VNode`]s and function
//! [`Component`]s, and Arbor keeps a host tree in sync with it.
//!
//! ## Crates
//!
//! - [`scheduler`] (`arbor-scheduler`): priority-ordered, time-sliced task
//!   scheduling with an injectable clock.
//! - [`reconciler`] (`arbor-reconciler`): fibers, keyed child reconciliation,
//!   hooks, the work loop, commit, and event delegation.
//!
//! ## Core Principles
//!
//! - **Identity across renders**: host instances are reused by position and
//!   key, and moved rather than recreated when a keyed list is reordered.
//! - **Minimal host mutation**: only changed props, texts and positions reach
//!   the host.
//! - **Cooperative**: rendering yields to the scheduler between fibers, so a
//!   large tree never blocks the host for longer than one frame.
//!
//! ## Quick Example
//!
//! ```
//! use arbor::prelude::*;
//!
//! let list = Component::new("List", |props, _cx| {
//!     let items = props.get_str("items").unwrap_or_default().to_string();
//!     VNode::element("ul")
//!         .children(items.split(',').map(|item| {
//!             VNode::element("li").key(item).text(item).build()
//!         }))
//!         .build()
//!         .into()
//! });
//!
//! let host = MemoryHost::new();
//! let container = host.create_container();
//! let runtime = Runtime::new(host.clone(), Scheduler::new(ManualClock::new()));
//! let root = runtime.create_root(container);
//!
//! root.render(VNode::component(&list).attr("items", "a,b").build());
//! runtime.flush();
//! assert_eq!(host.inner_html(container), "<ul><li>a</li><li>b</li></ul>");
//!
//! root.render(VNode::component(&list).attr("items", "b,a").build());
//! runtime.flush();
//! assert_eq!(host.inner_html(container), "<ul><li>b</li><li>a</li></ul>");
//! ```
//!
//! ## Configuration
//!
//! [`RuntimeConfig`] loads from TOML:
//!
//! ```
//! use arbor::prelude::*;
//!
//! let config = RuntimeConfig::from_toml_str(
//!     r#"
//!     default_update_priority = "user_blocking"
//!     time_slicing = false
//!
//!     [scheduler]
//!     frame_interval_ms = 8
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.scheduler.frame_interval_ms, 8);
//! assert!(!config.time_slicing);
//! ```

pub use arbor_reconciler as reconciler;
pub use arbor_scheduler as scheduler;

pub use arbor_reconciler::{
	ArborError, ArborResult, Child, Children, Cleanup, Component, Deps, Dispatch, EventHandler,
	HostHandle, HostRenderer, Key, PropValue, Props, RenderContext, Root, Runtime, RuntimeBuilder,
	RuntimeConfig, StateSetter, SyntheticEvent, VNode, create_element,
};
pub use arbor_scheduler::{
	Clock, ManualClock, Priority, Scheduler, SchedulerConfig, SchedulerError, SystemClock,
};

/// Re-exports for building and driving components.
pub mod prelude {
	pub use crate::reconciler::host::memory::{MemoryEvent, MemoryHost};
	pub use crate::{
		Children, Cleanup, Component, Deps, EventHandler, HostHandle, HostRenderer, Key, Priority,
		RenderContext, Root, Runtime, RuntimeConfig, Scheduler, StateSetter, SyntheticEvent, VNode,
	};
	pub use crate::{ManualClock, SystemClock};
}

#[cfg(test)]
mod tests {
	use super::prelude::*;
	use rstest::rstest;

	#[rstest]
	fn test_prelude_renders_through_memory_host() {
		let host = MemoryHost::new();
		let container = host.create_container();
		let runtime = Runtime::new(host.clone(), Scheduler::new(ManualClock::new()));

		runtime
			.create_root(container)
			.render(VNode::element("h1").text("arbor").build());
		runtime.flush();

		assert_eq!(host.inner_html(container), "<h1>arbor</h1>");
	}
}
