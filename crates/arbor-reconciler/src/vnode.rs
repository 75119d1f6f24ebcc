//! View descriptions.
//!
//! A [`VNode`] is an immutable description of one desired view node: what it
//! is ([`ElementType`]), an optional reconciliation [`Key`], and its
//! [`Props`]. Nested content lives in `props.children` as [`Children`].
//!
//! ## Building descriptions
//!
//! ```
//! use arbor_reconciler::vnode::{VNode, create_element};
//! use arbor_reconciler::props::PropValue;
//!
//! let item = VNode::element("li").key("a").attr("class", "item").text("A").build();
//! assert_eq!(item.key().map(|key| key.as_str()), Some("a"));
//!
//! // The factory strips the reserved `key` and `ref` props.
//! let node = create_element(
//!     "li",
//!     [("key", PropValue::from("b")), ("ref", PropValue::from("r")), ("id", PropValue::from("x"))],
//!     "B",
//! );
//! assert_eq!(node.key().map(|key| key.as_str()), Some("b"));
//! assert!(node.props().get("ref").is_none());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::events::{EventHandler, SyntheticEvent};
use crate::hooks::RenderContext;
use crate::props::{PropValue, Props};

/// Reconciliation key identifying a child among its siblings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Rc<str>);

impl Key {
	/// The key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", self.0)
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Key {
	fn from(value: &str) -> Self {
		Key(Rc::from(value))
	}
}

impl From<String> for Key {
	fn from(value: String) -> Self {
		Key(Rc::from(value))
	}
}

impl From<i64> for Key {
	fn from(value: i64) -> Self {
		Key(Rc::from(value.to_string()))
	}
}

impl From<usize> for Key {
	fn from(value: usize) -> Self {
		Key(Rc::from(value.to_string()))
	}
}

type RenderFn = dyn Fn(&Props, &mut RenderContext) -> Children;

/// A function component.
///
/// Components compare by identity: two `Component` values are the same type
/// only if one is a clone of the other. Create each component once and reuse
/// it across renders.
///
/// ## Example
///
/// ```
/// use arbor_reconciler::vnode::{Children, Component, VNode};
///
/// let greeting = Component::new("Greeting", |props, _cx| {
///     let name = props.get_str("name").unwrap_or("world").to_string();
///     VNode::element("p").text(format!("Hello, {name}")).build().into()
/// });
/// let node = VNode::component(&greeting).attr("name", "arbor").build();
/// assert!(node.element_type().is_component());
/// ```
#[derive(Clone)]
pub struct Component {
	name: Rc<str>,
	render: Rc<RenderFn>,
}

impl Component {
	/// Wrap a render function.
	pub fn new<F>(name: &str, render: F) -> Self
	where
		F: Fn(&Props, &mut RenderContext) -> Children + 'static,
	{
		Self {
			name: Rc::from(name),
			render: Rc::new(render),
		}
	}

	/// Display name used in logs.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// True when both values refer to the same component.
	pub fn ptr_eq(&self, other: &Component) -> bool {
		Rc::ptr_eq(&self.render, &other.render)
	}

	pub(crate) fn render(&self, props: &Props, cx: &mut RenderContext) -> Children {
		(self.render)(props, cx)
	}
}

impl fmt::Debug for Component {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<{}>", self.name)
	}
}

/// What a view node is.
#[derive(Clone)]
pub enum ElementType {
	/// A host element tag such as `div`.
	Host(Rc<str>),
	/// A function component.
	Component(Component),
}

impl ElementType {
	/// True for function components.
	pub fn is_component(&self) -> bool {
		matches!(self, ElementType::Component(_))
	}

	/// Host tag, if this is a host element.
	pub fn host_tag(&self) -> Option<&str> {
		match self {
			ElementType::Host(tag) => Some(tag),
			ElementType::Component(_) => None,
		}
	}

	/// Tag or component name, for logging.
	pub fn name(&self) -> &str {
		match self {
			ElementType::Host(tag) => tag,
			ElementType::Component(component) => component.name(),
		}
	}
}

impl PartialEq for ElementType {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(ElementType::Host(a), ElementType::Host(b)) => a == b,
			(ElementType::Component(a), ElementType::Component(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl fmt::Debug for ElementType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ElementType::Host(tag) => write!(f, "{tag}"),
			ElementType::Component(component) => write!(f, "{component:?}"),
		}
	}
}

impl From<&str> for ElementType {
	fn from(tag: &str) -> Self {
		ElementType::Host(Rc::from(tag))
	}
}

impl From<&Component> for ElementType {
	fn from(component: &Component) -> Self {
		ElementType::Component(component.clone())
	}
}

impl From<Component> for ElementType {
	fn from(component: Component) -> Self {
		ElementType::Component(component)
	}
}

/// Immutable view description.
#[derive(Clone)]
pub struct VNode {
	inner: Rc<VNodeInner>,
}

struct VNodeInner {
	element_type: ElementType,
	key: Option<Key>,
	props: Props,
}

impl VNode {
	/// Create a node from already normalized parts.
	pub fn new(element_type: ElementType, key: Option<Key>, props: Props) -> Self {
		Self {
			inner: Rc::new(VNodeInner {
				element_type,
				key,
				props,
			}),
		}
	}

	/// Start building a host element.
	pub fn element(tag: &str) -> ElementBuilder {
		ElementBuilder::new(ElementType::from(tag))
	}

	/// Start building a function component element.
	pub fn component(component: &Component) -> ElementBuilder {
		ElementBuilder::new(ElementType::from(component))
	}

	/// What this node is.
	pub fn element_type(&self) -> &ElementType {
		&self.inner.element_type
	}

	/// Reconciliation key.
	pub fn key(&self) -> Option<&Key> {
		self.inner.key.as_ref()
	}

	/// Props, including children.
	pub fn props(&self) -> &Props {
		&self.inner.props
	}
}

impl fmt::Debug for VNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("VNode");
		debug.field("type", &self.inner.element_type);
		if let Some(key) = &self.inner.key {
			debug.field("key", key);
		}
		debug.field("props", &self.inner.props).finish()
	}
}

/// One entry of a child list.
#[derive(Clone, Debug, Default)]
pub enum Child {
	/// Renders nothing (`null`, booleans, `None`).
	#[default]
	Empty,
	/// A string or number, rendered as a text node. The empty string renders nothing.
	Text(Rc<str>),
	/// A nested element.
	Element(VNode),
}

impl From<VNode> for Child {
	fn from(node: VNode) -> Self {
		Child::Element(node)
	}
}

impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Child::Text(Rc::from(text))
	}
}

impl From<String> for Child {
	fn from(text: String) -> Self {
		Child::Text(Rc::from(text))
	}
}

impl From<bool> for Child {
	fn from(_: bool) -> Self {
		Child::Empty
	}
}

macro_rules! child_from_number {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Child {
				fn from(value: $ty) -> Self {
					Child::Text(Rc::from(value.to_string()))
				}
			}

			impl From<$ty> for Children {
				fn from(value: $ty) -> Self {
					Children::Single(Child::from(value))
				}
			}
		)*
	};
}

child_from_number!(i32, i64, u32, u64, usize, f64);

impl<T: Into<Child>> From<Option<T>> for Child {
	fn from(value: Option<T>) -> Self {
		value.map_or(Child::Empty, Into::into)
	}
}

/// Children description: a single child or a flat list.
///
/// Nested lists are not representable; a list entry is always a [`Child`].
#[derive(Clone, Debug)]
pub enum Children {
	/// A single child (possibly empty).
	Single(Child),
	/// An ordered list of children.
	List(Vec<Child>),
}

impl Children {
	/// No children.
	pub fn none() -> Self {
		Children::Single(Child::Empty)
	}

	/// A list built from anything convertible to [`Child`].
	pub fn list<I, C>(children: I) -> Self
	where
		I: IntoIterator<Item = C>,
		C: Into<Child>,
	{
		Children::List(children.into_iter().map(Into::into).collect())
	}

	/// True when nothing would be rendered.
	pub fn is_empty(&self) -> bool {
		match self {
			Children::Single(Child::Empty) => true,
			Children::Single(_) => false,
			Children::List(children) => children.iter().all(|child| matches!(child, Child::Empty)),
		}
	}
}

impl Default for Children {
	fn default() -> Self {
		Children::none()
	}
}

impl From<Child> for Children {
	fn from(child: Child) -> Self {
		Children::Single(child)
	}
}

impl From<VNode> for Children {
	fn from(node: VNode) -> Self {
		Children::Single(Child::Element(node))
	}
}

impl From<&str> for Children {
	fn from(text: &str) -> Self {
		Children::Single(Child::from(text))
	}
}

impl From<String> for Children {
	fn from(text: String) -> Self {
		Children::Single(Child::from(text))
	}
}

impl From<Option<VNode>> for Children {
	fn from(node: Option<VNode>) -> Self {
		Children::Single(Child::from(node))
	}
}

impl From<Vec<Child>> for Children {
	fn from(children: Vec<Child>) -> Self {
		Children::List(children)
	}
}

impl From<Vec<VNode>> for Children {
	fn from(children: Vec<VNode>) -> Self {
		Children::list(children)
	}
}

impl From<()> for Children {
	fn from(_: ()) -> Self {
		Children::none()
	}
}

/// Normalize a description literal into a [`VNode`].
///
/// The reserved props are removed from `config`: `key` becomes the node's
/// key, and `ref` is dropped.
///
/// # Arguments
///
/// * `element_type` - Host tag or component
/// * `config` - Attributes, possibly containing `key` or `ref`
/// * `children` - Nested content, stored as `props.children`
pub fn create_element<T, I, N>(element_type: T, config: I, children: impl Into<Children>) -> VNode
where
	T: Into<ElementType>,
	I: IntoIterator<Item = (N, PropValue)>,
	N: AsRef<str>,
{
	let mut key = None;
	let mut attributes = BTreeMap::new();
	for (name, value) in config {
		match name.as_ref() {
			"key" => key = value.to_attribute().map(Key::from),
			"ref" => {}
			other => {
				attributes.insert(Rc::from(other), value);
			}
		}
	}
	VNode::new(
		element_type.into(),
		key,
		Props::new(attributes, children.into()),
	)
}

/// Fluent builder for [`VNode`].
///
/// ## Example
///
/// ```
/// use arbor_reconciler::vnode::VNode;
///
/// let list = VNode::element("ul")
///     .attr("id", "list")
///     .children(["a", "b"].map(|key| VNode::element("li").key(key).text(key).build()))
///     .build();
/// assert_eq!(list.props().get_str("id"), Some("list"));
/// ```
pub struct ElementBuilder {
	element_type: ElementType,
	key: Option<Key>,
	attributes: BTreeMap<Rc<str>, PropValue>,
	style: BTreeMap<String, String>,
	children: Vec<Child>,
	single: Option<Children>,
}

impl ElementBuilder {
	fn new(element_type: ElementType) -> Self {
		Self {
			element_type,
			key: None,
			attributes: BTreeMap::new(),
			style: BTreeMap::new(),
			children: Vec::new(),
			single: None,
		}
	}

	/// Set the reconciliation key.
	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// Set an attribute. `key` and `ref` are handled like [`create_element`] does.
	pub fn attr(mut self, name: &str, value: impl Into<PropValue>) -> Self {
		let value = value.into();
		match name {
			"key" => self.key = value.to_attribute().map(Key::from),
			"ref" => {}
			_ => {
				self.attributes.insert(Rc::from(name), value);
			}
		}
		self
	}

	/// Set one inline style declaration.
	pub fn style(mut self, property: &str, value: &str) -> Self {
		self.style.insert(property.to_string(), value.to_string());
		self
	}

	/// Register an event listener prop such as `onClick` or `onClickCapture`.
	pub fn on<F>(mut self, prop: &str, handler: F) -> Self
	where
		F: Fn(&SyntheticEvent<'_>) + 'static,
	{
		self.attributes
			.insert(Rc::from(prop), PropValue::Handler(EventHandler::new(handler)));
		self
	}

	/// Make the only child a string, so the element renders it as text content.
	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.children.clear();
		self.single = Some(Children::from(text.into()));
		self
	}

	/// Append one child to the child list.
	pub fn child(mut self, child: impl Into<Child>) -> Self {
		self.single = None;
		self.children.push(child.into());
		self
	}

	/// Append several children to the child list.
	pub fn children<I, C>(mut self, children: I) -> Self
	where
		I: IntoIterator<Item = C>,
		C: Into<Child>,
	{
		self.single = None;
		self.children.extend(children.into_iter().map(Into::into));
		self
	}

	/// Finish the node.
	pub fn build(mut self) -> VNode {
		if !self.style.is_empty() {
			self.attributes
				.insert(Rc::from("style"), PropValue::Style(Rc::new(self.style)));
		}
		let children = match self.single {
			Some(children) => children,
			None if self.children.is_empty() => Children::none(),
			None => Children::List(self.children),
		};
		VNode::new(
			self.element_type,
			self.key,
			Props::new(self.attributes, children),
		)
	}
}
