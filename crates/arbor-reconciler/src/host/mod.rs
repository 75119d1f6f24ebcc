//! Host renderer contract.
//!
//! The reconciler never constructs host objects. Everything it does to the
//! host tree goes through [`HostRenderer`], which a platform layer
//! implements. [`memory::MemoryHost`] is an in-memory implementation for
//! headless rendering and tests.

pub mod memory;

use std::fmt;
use std::rc::Rc;

use crate::events::NativeEvent;
use crate::props::{PropValue, Props};

/// Opaque handle to a host instance or container, allocated by the host.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostHandle(u64);

impl HostHandle {
	/// Wrap a host-allocated id.
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	/// The host-allocated id.
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Debug for HostHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Root-level listener the runtime registers on a container.
pub type NativeListener = Rc<dyn Fn(&dyn NativeEvent)>;

/// One change in a [`PropPatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropChange {
	/// Set an attribute to a new value.
	Set {
		/// Attribute name.
		name: Rc<str>,
		/// New value.
		value: PropValue,
	},
	/// Remove an attribute.
	Remove {
		/// Attribute name.
		name: Rc<str>,
	},
	/// Set (`Some`) or clear (`None`) one inline style property.
	Style {
		/// Style property name.
		property: String,
		/// New value.
		value: Option<String>,
	},
	/// Replace the text content of a text-only element.
	TextContent(Rc<str>),
}

/// Ordered list of changes computed in the complete phase and applied in commit.
///
/// An empty patch is meaningful: it marks an element whose listeners changed,
/// so the runtime refreshes its cached props without touching the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropPatch {
	changes: Vec<PropChange>,
}

impl PropPatch {
	/// An empty patch.
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a change.
	pub fn push(&mut self, change: PropChange) {
		self.changes.push(change);
	}

	/// The changes in order.
	pub fn changes(&self) -> &[PropChange] {
		&self.changes
	}

	/// True when no host change is needed.
	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}
}

/// Operations the reconciler needs from a host.
///
/// All handles are allocated by the host. Containers are ordinary handles.
pub trait HostRenderer {
	/// Create an element and apply its initial props, including text content
	/// when [`is_text_only_child`](Self::is_text_only_child) holds.
	fn create_instance(&mut self, element_type: &str, props: &Props) -> HostHandle;

	/// Create a text node.
	fn create_text_instance(&mut self, text: &str) -> HostHandle;

	/// Append `child` as the last child of `parent`.
	fn append_child(&mut self, parent: HostHandle, child: HostHandle);

	/// Insert `child` into `parent` before `before`. If `child` already has a
	/// parent it is moved.
	fn insert_before(&mut self, parent: HostHandle, child: HostHandle, before: HostHandle);

	/// Detach `child` from `parent`.
	fn remove_child(&mut self, parent: HostHandle, child: HostHandle);

	/// Apply a patch from [`diff_props`](Self::diff_props).
	fn commit_update(&mut self, instance: HostHandle, element_type: &str, patch: &PropPatch);

	/// Replace the contents of a text node.
	fn commit_text_update(&mut self, instance: HostHandle, text: &str);

	/// Clear the text content of an element.
	fn reset_text_content(&mut self, instance: HostHandle);

	/// Attach a root-level listener to a container.
	fn add_event_listener(
		&mut self,
		target: HostHandle,
		event_type: &str,
		capture: bool,
		listener: NativeListener,
	);

	/// Compute the changes between two prop sets, or `None` if nothing changed.
	fn diff_props(&self, _element_type: &str, old: &Props, new: &Props) -> Option<PropPatch> {
		diff_props(old, new)
	}

	/// Whether `props` renders its only child as text content instead of a child node.
	fn is_text_only_child(&self, _element_type: &str, props: &Props) -> bool {
		props.text_content().is_some()
	}
}

/// Default prop diff.
///
/// - Attributes removed in `new` become [`PropChange::Remove`].
/// - Attributes added or changed become [`PropChange::Set`].
/// - Styles are diffed per property.
/// - A changed text-only child becomes [`PropChange::TextContent`].
/// - A changed listener yields at least an empty patch, so the cached props
///   get refreshed at commit.
pub fn diff_props(old: &Props, new: &Props) -> Option<PropPatch> {
	if Props::ptr_eq(old, new) {
		return None;
	}

	let mut patch = PropPatch::new();
	let mut listeners_changed = false;

	for (name, old_value) in old.attributes() {
		if new.get(name).is_some() {
			continue;
		}
		match old_value {
			PropValue::Style(style) => {
				for property in style.keys() {
					patch.push(PropChange::Style {
						property: property.clone(),
						value: None,
					});
				}
			}
			PropValue::Handler(_) => listeners_changed = true,
			_ => patch.push(PropChange::Remove {
				name: Rc::from(name),
			}),
		}
	}

	for (name, new_value) in new.attributes() {
		let old_value = old.get(name);
		if old_value == Some(new_value) {
			continue;
		}
		match new_value {
			PropValue::Style(next) => {
				let previous = match old_value {
					Some(PropValue::Style(previous)) => Some(previous),
					_ => None,
				};
				if let Some(previous) = previous {
					for property in previous.keys() {
						if !next.contains_key(property) {
							patch.push(PropChange::Style {
								property: property.clone(),
								value: None,
							});
						}
					}
				}
				for (property, value) in next.iter() {
					if previous.and_then(|previous| previous.get(property)) != Some(value) {
						patch.push(PropChange::Style {
							property: property.clone(),
							value: Some(value.clone()),
						});
					}
				}
			}
			PropValue::Handler(_) => listeners_changed = true,
			_ => patch.push(PropChange::Set {
				name: Rc::from(name),
				value: new_value.clone(),
			}),
		}
	}

	if let Some(text) = new.text_content()
		&& old.text_content() != Some(text)
	{
		patch.push(PropChange::TextContent(Rc::from(text)));
	}

	if patch.is_empty() && !listeners_changed {
		None
	} else {
		Some(patch)
	}
}
