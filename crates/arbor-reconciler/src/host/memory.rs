//! In-memory host renderer.
//!
//! `MemoryHost` keeps a DOM-like node tree in memory, records every mutation
//! the reconciler performs, and can dispatch events to the root-level
//! listeners the runtime registers. Clones share the same document, so a
//! caller can keep a handle for inspection after giving one to the runtime.
//!
//! ## Example
//!
//! ```
//! use arbor_reconciler::host::memory::MemoryHost;
//! use arbor_reconciler::vnode::VNode;
//! use arbor_reconciler::Runtime;
//! use arbor_scheduler::{ManualClock, Scheduler};
//!
//! let host = MemoryHost::new();
//! let container = host.create_container();
//! let runtime = Runtime::new(host.clone(), Scheduler::new(ManualClock::new()));
//! let root = runtime.create_root(container);
//! root.render(VNode::element("p").text("hi").build());
//! runtime.flush();
//! assert_eq!(host.inner_html(container), "<p>hi</p>");
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::events::{EventFieldValue, NativeEvent};
use crate::host::{HostHandle, HostRenderer, NativeListener, PropChange, PropPatch};
use crate::props::{PropValue, Props};

/// A mutation recorded by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
	/// `create_instance`.
	CreateElement {
		/// New instance.
		instance: HostHandle,
		/// Element tag.
		tag: String,
	},
	/// `create_text_instance`.
	CreateText {
		/// New text node.
		instance: HostHandle,
		/// Initial text.
		text: String,
	},
	/// `append_child`.
	AppendChild {
		/// Parent instance or container.
		parent: HostHandle,
		/// Appended node.
		child: HostHandle,
	},
	/// `insert_before`.
	InsertBefore {
		/// Parent instance or container.
		parent: HostHandle,
		/// Inserted node.
		child: HostHandle,
		/// Anchor node.
		before: HostHandle,
	},
	/// `remove_child`.
	RemoveChild {
		/// Parent instance or container.
		parent: HostHandle,
		/// Removed node.
		child: HostHandle,
	},
	/// `commit_update`.
	CommitUpdate {
		/// Updated instance.
		instance: HostHandle,
		/// Applied patch.
		patch: PropPatch,
	},
	/// `commit_text_update`.
	CommitTextUpdate {
		/// Updated text node.
		instance: HostHandle,
		/// New text.
		text: String,
	},
	/// `reset_text_content`.
	ResetTextContent {
		/// Cleared instance.
		instance: HostHandle,
	},
}

impl HostOp {
	/// True for operations that attach a node to a parent.
	pub fn is_placement(&self) -> bool {
		matches!(self, HostOp::AppendChild { .. } | HostOp::InsertBefore { .. })
	}
}

#[derive(Debug, Clone)]
enum NodeKind {
	Container,
	Element(String),
	Text(String),
}

#[derive(Debug, Clone)]
struct MemoryNode {
	kind: NodeKind,
	attributes: BTreeMap<String, String>,
	style: BTreeMap<String, String>,
	children: Vec<HostHandle>,
	parent: Option<HostHandle>,
}

impl MemoryNode {
	fn new(kind: NodeKind) -> Self {
		Self {
			kind,
			attributes: BTreeMap::new(),
			style: BTreeMap::new(),
			children: Vec::new(),
			parent: None,
		}
	}
}

struct RegisteredListener {
	target: HostHandle,
	event_type: String,
	capture: bool,
	listener: NativeListener,
}

#[derive(Default)]
struct MemoryDocument {
	nodes: Vec<MemoryNode>,
	ops: Vec<HostOp>,
	listeners: Vec<RegisteredListener>,
}

impl MemoryDocument {
	fn alloc(&mut self, node: MemoryNode) -> HostHandle {
		self.nodes.push(node);
		HostHandle::new(self.nodes.len() as u64)
	}

	fn node(&self, handle: HostHandle) -> &MemoryNode {
		let index = handle.get() as usize;
		assert!(
			index >= 1 && index <= self.nodes.len(),
			"unknown host handle {handle:?}"
		);
		&self.nodes[index - 1]
	}

	fn node_mut(&mut self, handle: HostHandle) -> &mut MemoryNode {
		let index = handle.get() as usize;
		assert!(
			index >= 1 && index <= self.nodes.len(),
			"unknown host handle {handle:?}"
		);
		&mut self.nodes[index - 1]
	}

	fn detach(&mut self, child: HostHandle) {
		if let Some(parent) = self.node(child).parent {
			self.node_mut(parent).children.retain(|&node| node != child);
			self.node_mut(child).parent = None;
		}
	}

	fn set_text_content(&mut self, instance: HostHandle, text: &str) {
		for child in std::mem::take(&mut self.node_mut(instance).children) {
			self.node_mut(child).parent = None;
		}
		if !text.is_empty() {
			let mut node = MemoryNode::new(NodeKind::Text(text.to_string()));
			node.parent = Some(instance);
			let text_node = self.alloc(node);
			self.node_mut(instance).children.push(text_node);
		}
	}

	fn apply_attribute(&mut self, instance: HostHandle, name: &str, value: &PropValue) {
		let node = self.node_mut(instance);
		match value {
			PropValue::Style(style) => {
				node.style = style
					.iter()
					.map(|(property, value)| (property.clone(), value.clone()))
					.collect();
			}
			PropValue::Handler(_) => {}
			other => match other.to_attribute() {
				Some(attribute) => {
					node.attributes.insert(name.to_string(), attribute);
				}
				None => {
					node.attributes.remove(name);
				}
			},
		}
	}

	fn serialize(&self, handle: HostHandle, out: &mut String) {
		let node = self.node(handle);
		match &node.kind {
			NodeKind::Text(text) => out.push_str(&escape(text)),
			NodeKind::Container => {
				for &child in &node.children {
					self.serialize(child, out);
				}
			}
			NodeKind::Element(tag) => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in &node.attributes {
					out.push_str(&format!(" {name}=\"{}\"", escape(value)));
				}
				if !node.style.is_empty() {
					let declarations: Vec<String> = node
						.style
						.iter()
						.map(|(property, value)| format!("{property}: {value}"))
						.collect();
					out.push_str(&format!(" style=\"{}\"", declarations.join("; ")));
				}
				out.push('>');
				for &child in &node.children {
					self.serialize(child, out);
				}
				out.push_str(&format!("</{tag}>"));
			}
		}
	}
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
}

/// In-memory [`HostRenderer`].
#[derive(Clone, Default)]
pub struct MemoryHost {
	document: Rc<RefCell<MemoryDocument>>,
}

impl MemoryHost {
	/// An empty document.
	pub fn new() -> Self {
		Self::default()
	}

	/// Allocate a container node to render a root into.
	pub fn create_container(&self) -> HostHandle {
		self.document
			.borrow_mut()
			.alloc(MemoryNode::new(NodeKind::Container))
	}

	/// Serialized children of `handle`.
	pub fn inner_html(&self, handle: HostHandle) -> String {
		let document = self.document.borrow();
		let mut out = String::new();
		for &child in &document.node(handle).children {
			document.serialize(child, &mut out);
		}
		out
	}

	/// Children of `handle` in order.
	pub fn children(&self, handle: HostHandle) -> Vec<HostHandle> {
		self.document.borrow().node(handle).children.clone()
	}

	/// Parent of `handle`, if attached.
	pub fn parent(&self, handle: HostHandle) -> Option<HostHandle> {
		self.document.borrow().node(handle).parent
	}

	/// Tag of an element, `None` for text nodes and containers.
	pub fn tag(&self, handle: HostHandle) -> Option<String> {
		match &self.document.borrow().node(handle).kind {
			NodeKind::Element(tag) => Some(tag.clone()),
			_ => None,
		}
	}

	/// Attribute value of an element.
	pub fn attribute(&self, handle: HostHandle, name: &str) -> Option<String> {
		self.document
			.borrow()
			.node(handle)
			.attributes
			.get(name)
			.cloned()
	}

	/// Inline style property of an element.
	pub fn style(&self, handle: HostHandle, property: &str) -> Option<String> {
		self.document
			.borrow()
			.node(handle)
			.style
			.get(property)
			.cloned()
	}

	/// Concatenated text of `handle` and its descendants.
	pub fn text_content(&self, handle: HostHandle) -> String {
		fn collect(document: &MemoryDocument, handle: HostHandle, out: &mut String) {
			let node = document.node(handle);
			if let NodeKind::Text(text) = &node.kind {
				out.push_str(text);
			}
			for &child in &node.children {
				collect(document, child, out);
			}
		}
		let document = self.document.borrow();
		let mut out = String::new();
		collect(&document, handle, &mut out);
		out
	}

	/// First attached element whose `name` attribute equals `value`.
	pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<HostHandle> {
		let document = self.document.borrow();
		(1..=document.nodes.len() as u64)
			.map(HostHandle::new)
			.find(|&handle| {
				let node = document.node(handle);
				node.parent.is_some() && node.attributes.get(name).map(String::as_str) == Some(value)
			})
	}

	/// Shorthand for `find_by_attribute("id", id)`.
	pub fn find_by_id(&self, id: &str) -> Option<HostHandle> {
		self.find_by_attribute("id", id)
	}

	/// Every mutation recorded so far.
	pub fn ops(&self) -> Vec<HostOp> {
		self.document.borrow().ops.clone()
	}

	/// Forget recorded mutations.
	pub fn clear_ops(&self) {
		self.document.borrow_mut().ops.clear();
	}

	/// Number of root-level listeners registered on `target`.
	pub fn listener_count(&self, target: HostHandle) -> usize {
		self.document
			.borrow()
			.listeners
			.iter()
			.filter(|registered| registered.target == target)
			.count()
	}

	/// Dispatch `event` at `target`.
	///
	/// Capture listeners run from the outermost ancestor down, then bubble
	/// listeners from `target` up. The two passes are independent: stopping
	/// propagation in one does not skip the other.
	pub fn dispatch_event(&self, target: HostHandle, event: MemoryEvent) -> MemoryEvent {
		event.target.set(Some(target));

		let path: Vec<HostHandle> = {
			let document = self.document.borrow();
			let mut path = vec![target];
			let mut node = document.node(target).parent;
			while let Some(parent) = node {
				path.push(parent);
				node = document.node(parent).parent;
			}
			path
		};

		for capture in [true, false] {
			event.propagation_stopped.set(false);
			let ordered: Vec<HostHandle> = if capture {
				path.iter().rev().copied().collect()
			} else {
				path.clone()
			};
			for node in ordered {
				let listeners: Vec<NativeListener> = self
					.document
					.borrow()
					.listeners
					.iter()
					.filter(|registered| {
						registered.target == node
							&& registered.capture == capture
							&& registered.event_type == event.event_type
					})
					.map(|registered| registered.listener.clone())
					.collect();
				for listener in listeners {
					listener(&event);
				}
				if event.propagation_stopped.get() {
					break;
				}
			}
		}
		event
	}
}

impl HostRenderer for MemoryHost {
	fn create_instance(&mut self, element_type: &str, props: &Props) -> HostHandle {
		let mut document = self.document.borrow_mut();
		let instance = document.alloc(MemoryNode::new(NodeKind::Element(element_type.to_string())));
		for (name, value) in props.attributes() {
			document.apply_attribute(instance, name, value);
		}
		if let Some(text) = props.text_content() {
			document.set_text_content(instance, text);
		}
		document.ops.push(HostOp::CreateElement {
			instance,
			tag: element_type.to_string(),
		});
		instance
	}

	fn create_text_instance(&mut self, text: &str) -> HostHandle {
		let mut document = self.document.borrow_mut();
		let instance = document.alloc(MemoryNode::new(NodeKind::Text(text.to_string())));
		document.ops.push(HostOp::CreateText {
			instance,
			text: text.to_string(),
		});
		instance
	}

	fn append_child(&mut self, parent: HostHandle, child: HostHandle) {
		let mut document = self.document.borrow_mut();
		document.detach(child);
		document.node_mut(parent).children.push(child);
		document.node_mut(child).parent = Some(parent);
		document.ops.push(HostOp::AppendChild { parent, child });
	}

	fn insert_before(&mut self, parent: HostHandle, child: HostHandle, before: HostHandle) {
		let mut document = self.document.borrow_mut();
		document.detach(child);
		let position = document
			.node(parent)
			.children
			.iter()
			.position(|&node| node == before)
			.unwrap_or_else(|| panic!("{before:?} is not a child of {parent:?}"));
		document.node_mut(parent).children.insert(position, child);
		document.node_mut(child).parent = Some(parent);
		document.ops.push(HostOp::InsertBefore {
			parent,
			child,
			before,
		});
	}

	fn remove_child(&mut self, parent: HostHandle, child: HostHandle) {
		let mut document = self.document.borrow_mut();
		assert_eq!(
			document.node(child).parent,
			Some(parent),
			"{child:?} is not a child of {parent:?}"
		);
		document.detach(child);
		document.ops.push(HostOp::RemoveChild { parent, child });
	}

	fn commit_update(&mut self, instance: HostHandle, _element_type: &str, patch: &PropPatch) {
		let mut document = self.document.borrow_mut();
		for change in patch.changes() {
			match change {
				PropChange::Set { name, value } => document.apply_attribute(instance, name, value),
				PropChange::Remove { name } => {
					document.node_mut(instance).attributes.remove(name.as_ref());
				}
				PropChange::Style { property, value } => {
					let style = &mut document.node_mut(instance).style;
					match value {
						Some(value) => {
							style.insert(property.clone(), value.clone());
						}
						None => {
							style.remove(property);
						}
					}
				}
				PropChange::TextContent(text) => document.set_text_content(instance, text),
			}
		}
		document.ops.push(HostOp::CommitUpdate {
			instance,
			patch: patch.clone(),
		});
	}

	fn commit_text_update(&mut self, instance: HostHandle, text: &str) {
		let mut document = self.document.borrow_mut();
		document.node_mut(instance).kind = NodeKind::Text(text.to_string());
		document.ops.push(HostOp::CommitTextUpdate {
			instance,
			text: text.to_string(),
		});
	}

	fn reset_text_content(&mut self, instance: HostHandle) {
		let mut document = self.document.borrow_mut();
		document.set_text_content(instance, "");
		document.ops.push(HostOp::ResetTextContent { instance });
	}

	fn add_event_listener(
		&mut self,
		target: HostHandle,
		event_type: &str,
		capture: bool,
		listener: NativeListener,
	) {
		self.document.borrow_mut().listeners.push(RegisteredListener {
			target,
			event_type: event_type.to_string(),
			capture,
			listener,
		});
	}
}

/// Event dispatched through [`MemoryHost::dispatch_event`].
///
/// ## Example
///
/// ```
/// use arbor_reconciler::host::memory::MemoryEvent;
///
/// let event = MemoryEvent::new("click").number("clientX", 12.0).flag("shiftKey", true);
/// assert_eq!(event.event_type(), "click");
/// ```
#[derive(Debug)]
pub struct MemoryEvent {
	event_type: String,
	target: Cell<Option<HostHandle>>,
	fields: BTreeMap<String, EventFieldValue>,
	time_stamp: f64,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
}

impl MemoryEvent {
	/// A new event of type `event_type`.
	pub fn new(event_type: &str) -> Self {
		Self {
			event_type: event_type.to_string(),
			target: Cell::new(None),
			fields: BTreeMap::new(),
			time_stamp: 0.0,
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
		}
	}

	/// Set a numeric field.
	pub fn number(mut self, name: &str, value: f64) -> Self {
		self.fields
			.insert(name.to_string(), EventFieldValue::Number(value));
		self
	}

	/// Set a boolean field.
	pub fn flag(mut self, name: &str, value: bool) -> Self {
		self.fields.insert(name.to_string(), EventFieldValue::Bool(value));
		self
	}

	/// Set a string field.
	pub fn text(mut self, name: &str, value: &str) -> Self {
		self.fields
			.insert(name.to_string(), EventFieldValue::Text(Rc::from(value)));
		self
	}

	/// Set the time stamp.
	pub fn at(mut self, time_stamp: f64) -> Self {
		self.time_stamp = time_stamp;
		self
	}

	/// Event type.
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	/// Whether a listener cancelled the default action.
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

impl NativeEvent for MemoryEvent {
	fn event_type(&self) -> &str {
		&self.event_type
	}

	fn target(&self) -> Option<HostHandle> {
		self.target.get()
	}

	fn field(&self, name: &str) -> Option<EventFieldValue> {
		self.fields.get(name).cloned()
	}

	fn time_stamp(&self) -> f64 {
		self.time_stamp
	}

	fn prevent_default(&self) -> bool {
		self.default_prevented.set(true);
		true
	}

	fn stop_propagation(&self) -> bool {
		self.propagation_stopped.set(true);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vnode::Children;
	use rstest::rstest;

	fn element(host: &mut MemoryHost, tag: &str, id: &str) -> HostHandle {
		let mut attributes = BTreeMap::new();
		attributes.insert(Rc::from("id"), PropValue::from(id));
		host.create_instance(tag, &Props::new(attributes, Children::none()))
	}

	#[rstest]
	fn test_append_insert_and_remove() {
		let mut host = MemoryHost::new();
		let container = host.create_container();
		let a = element(&mut host, "li", "a");
		let b = element(&mut host, "li", "b");
		let c = element(&mut host, "li", "c");

		host.append_child(container, a);
		host.append_child(container, c);
		host.insert_before(container, b, c);
		assert_eq!(host.children(container), vec![a, b, c]);

		// Inserting an attached node moves it.
		host.insert_before(container, c, a);
		assert_eq!(host.children(container), vec![c, a, b]);

		host.remove_child(container, a);
		assert_eq!(host.children(container), vec![c, b]);
		assert_eq!(host.parent(a), None);
	}

	#[rstest]
	fn test_serializes_attributes_style_and_text() {
		let mut host = MemoryHost::new();
		let container = host.create_container();

		let mut style = BTreeMap::new();
		style.insert("color".to_string(), "red".to_string());
		let mut attributes = BTreeMap::new();
		attributes.insert(Rc::from("title"), PropValue::from("a<b"));
		attributes.insert(Rc::from("style"), PropValue::Style(Rc::new(style)));
		let p = host.create_instance("p", &Props::new(attributes, Children::from("hi")));
		host.append_child(container, p);

		assert_eq!(
			host.inner_html(container),
			"<p title=\"a&lt;b\" style=\"color: red\">hi</p>"
		);
		assert_eq!(host.text_content(container), "hi");
	}

	#[rstest]
	fn test_commit_update_applies_patch() {
		let mut host = MemoryHost::new();
		let div = element(&mut host, "div", "x");

		let mut patch = PropPatch::new();
		patch.push(PropChange::Remove {
			name: Rc::from("id"),
		});
		patch.push(PropChange::Set {
			name: Rc::from("lang"),
			value: PropValue::from("en"),
		});
		patch.push(PropChange::TextContent(Rc::from("text")));
		host.commit_update(div, "div", &patch);

		assert_eq!(host.attribute(div, "id"), None);
		assert_eq!(host.attribute(div, "lang").as_deref(), Some("en"));
		assert_eq!(host.text_content(div), "text");
	}

	#[rstest]
	fn test_dispatch_runs_capture_then_bubble() {
		let mut host = MemoryHost::new();
		let container = host.create_container();
		let button = element(&mut host, "button", "b");
		host.append_child(container, button);

		let log = Rc::new(RefCell::new(Vec::new()));
		for capture in [false, true] {
			let log = log.clone();
			host.add_event_listener(
				container,
				"click",
				capture,
				Rc::new(move |event: &dyn NativeEvent| {
					log.borrow_mut().push((capture, event.target()));
				}),
			);
		}

		host.dispatch_event(button, MemoryEvent::new("click"));
		assert_eq!(
			*log.borrow(),
			vec![(true, Some(button)), (false, Some(button))]
		);
		assert_eq!(host.listener_count(container), 2);
	}
}
