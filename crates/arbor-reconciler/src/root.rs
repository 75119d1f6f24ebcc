//! Root handles.

use std::fmt;
use std::rc::Rc;

use crate::fiber::{FiberId, RootId};
use crate::host::HostHandle;
use crate::runtime::RuntimeInner;
use crate::vnode::Children;

/// Handle to a tree rendered into one host container.
#[derive(Clone)]
pub struct Root {
	id: RootId,
	runtime: Rc<RuntimeInner>,
}

impl Root {
	pub(crate) fn new(id: RootId, runtime: Rc<RuntimeInner>) -> Self {
		Self { id, runtime }
	}

	/// Root id.
	pub fn id(&self) -> RootId {
		self.id
	}

	/// Replace the root's description. The render is scheduled, not run.
	///
	/// Several calls before the render starts collapse into one render of
	/// the last description. Ignored with a warning after [`unmount`](Self::unmount).
	pub fn render(&self, children: impl Into<Children>) {
		self.runtime.update_container(self.id, children.into());
	}

	/// Render nothing and stop accepting renders.
	///
	/// Effect cleanups of the removed tree run when the scheduled render commits.
	pub fn unmount(&self) {
		self.runtime.unmount_root(self.id);
	}

	/// Whether [`unmount`](Self::unmount) was called.
	pub fn is_unmounted(&self) -> bool {
		self.runtime.is_unmounted(self.id)
	}

	/// Host container the root renders into.
	pub fn container(&self) -> Option<HostHandle> {
		self.runtime.container_of(self.id)
	}

	/// Root fiber of the committed tree.
	pub fn current_fiber(&self) -> Option<FiberId> {
		self.runtime.current_fiber(self.id)
	}
}

impl fmt::Debug for Root {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Root").field("id", &self.id).finish()
	}
}
