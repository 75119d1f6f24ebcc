//! Property maps carried by view descriptions.
//!
//! Props are immutable and cheap to clone. Two renders that pass the same
//! `Props` value can be detected with [`Props::ptr_eq`], which the complete
//! phase uses to skip diffing untouched host elements.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::events::EventHandler;
use crate::vnode::{Child, Children};

/// A single property value.
#[derive(Clone)]
pub enum PropValue {
	/// String attribute.
	Str(Rc<str>),
	/// Integer attribute.
	Int(i64),
	/// Floating point attribute.
	Float(f64),
	/// Boolean attribute; `false` removes it from the host element.
	Bool(bool),
	/// Inline style declarations, keyed by property name.
	Style(Rc<BTreeMap<String, String>>),
	/// Event listener, read live by the event system. Never written to the host.
	Handler(EventHandler),
}

impl PropValue {
	/// Render the value as a host attribute string. Returns `None` for
	/// values that are not attributes (handlers, styles, `false`).
	pub fn to_attribute(&self) -> Option<String> {
		match self {
			PropValue::Str(value) => Some(value.to_string()),
			PropValue::Int(value) => Some(value.to_string()),
			PropValue::Float(value) => Some(value.to_string()),
			PropValue::Bool(true) => Some(String::new()),
			PropValue::Bool(false) | PropValue::Style(_) | PropValue::Handler(_) => None,
		}
	}

	/// Whether this value is an event listener.
	pub fn is_handler(&self) -> bool {
		matches!(self, PropValue::Handler(_))
	}
}

impl PartialEq for PropValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(PropValue::Str(a), PropValue::Str(b)) => a == b,
			(PropValue::Int(a), PropValue::Int(b)) => a == b,
			(PropValue::Float(a), PropValue::Float(b)) => a == b,
			(PropValue::Bool(a), PropValue::Bool(b)) => a == b,
			(PropValue::Style(a), PropValue::Style(b)) => Rc::ptr_eq(a, b) || a == b,
			(PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl fmt::Debug for PropValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PropValue::Str(value) => write!(f, "{value:?}"),
			PropValue::Int(value) => write!(f, "{value}"),
			PropValue::Float(value) => write!(f, "{value}"),
			PropValue::Bool(value) => write!(f, "{value}"),
			PropValue::Style(style) => f.debug_map().entries(style.iter()).finish(),
			PropValue::Handler(_) => f.write_str("<handler>"),
		}
	}
}

impl From<&str> for PropValue {
	fn from(value: &str) -> Self {
		PropValue::Str(Rc::from(value))
	}
}

impl From<String> for PropValue {
	fn from(value: String) -> Self {
		PropValue::Str(Rc::from(value))
	}
}

impl From<Rc<str>> for PropValue {
	fn from(value: Rc<str>) -> Self {
		PropValue::Str(value)
	}
}

impl From<i64> for PropValue {
	fn from(value: i64) -> Self {
		PropValue::Int(value)
	}
}

impl From<i32> for PropValue {
	fn from(value: i32) -> Self {
		PropValue::Int(i64::from(value))
	}
}

impl From<f64> for PropValue {
	fn from(value: f64) -> Self {
		PropValue::Float(value)
	}
}

impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		PropValue::Bool(value)
	}
}

impl From<EventHandler> for PropValue {
	fn from(handler: EventHandler) -> Self {
		PropValue::Handler(handler)
	}
}

/// Immutable property map plus the nested children description.
#[derive(Clone, Default)]
pub struct Props {
	inner: Rc<PropsInner>,
}

#[derive(Default)]
struct PropsInner {
	attributes: BTreeMap<Rc<str>, PropValue>,
	children: Children,
}

impl Props {
	/// Build props from attributes and children.
	pub fn new(attributes: BTreeMap<Rc<str>, PropValue>, children: Children) -> Self {
		Self {
			inner: Rc::new(PropsInner {
				attributes,
				children,
			}),
		}
	}

	/// Props with no attributes and no children.
	pub fn empty() -> Self {
		Self::default()
	}

	/// True when both values are the same allocation.
	pub fn ptr_eq(a: &Props, b: &Props) -> bool {
		Rc::ptr_eq(&a.inner, &b.inner)
	}

	/// Look up an attribute.
	pub fn get(&self, name: &str) -> Option<&PropValue> {
		self.inner.attributes.get(name)
	}

	/// String value of an attribute, if it is a string.
	pub fn get_str(&self, name: &str) -> Option<&str> {
		match self.get(name) {
			Some(PropValue::Str(value)) => Some(value),
			_ => None,
		}
	}

	/// Event listener registered under `name` (e.g. `onClick`, `onClickCapture`).
	pub fn handler(&self, name: &str) -> Option<EventHandler> {
		match self.get(name) {
			Some(PropValue::Handler(handler)) => Some(handler.clone()),
			_ => None,
		}
	}

	/// All attributes in name order.
	pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropValue)> {
		self.inner
			.attributes
			.iter()
			.map(|(name, value)| (name.as_ref(), value))
	}

	/// Number of attributes, not counting children.
	pub fn len(&self) -> usize {
		self.inner.attributes.len()
	}

	/// True when there are no attributes.
	pub fn is_empty(&self) -> bool {
		self.inner.attributes.is_empty()
	}

	/// Nested children description.
	pub fn children(&self) -> &Children {
		&self.inner.children
	}

	/// The text when the only child is a string or number.
	pub fn text_content(&self) -> Option<&str> {
		match &self.inner.children {
			Children::Single(Child::Text(text)) => Some(text),
			_ => None,
		}
	}
}

impl fmt::Debug for Props {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Props")
			.field("attributes", &self.inner.attributes)
			.field("children", &self.inner.children)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::events::SyntheticEvent;
	use rstest::rstest;

	fn props(pairs: &[(&str, PropValue)]) -> Props {
		let attributes = pairs
			.iter()
			.map(|(name, value)| (Rc::from(*name), value.clone()))
			.collect();
		Props::new(attributes, Children::default())
	}

	#[rstest]
	#[case(PropValue::from("x"), Some("x"))]
	#[case(PropValue::from(3), Some("3"))]
	#[case(PropValue::from(true), Some(""))]
	#[case(PropValue::from(false), None)]
	fn test_to_attribute(#[case] value: PropValue, #[case] expected: Option<&str>) {
		assert_eq!(value.to_attribute().as_deref(), expected);
	}

	#[rstest]
	fn test_handlers_compare_by_identity() {
		let handler = EventHandler::new(|_: &SyntheticEvent<'_>| {});
		let same = PropValue::Handler(handler.clone());
		let other = PropValue::Handler(EventHandler::new(|_: &SyntheticEvent<'_>| {}));

		assert_eq!(PropValue::Handler(handler), same);
		assert_ne!(same, other);
	}

	#[rstest]
	fn test_text_content_only_for_single_text_child() {
		let text = Props::new(BTreeMap::new(), Children::from("hello"));
		assert_eq!(text.text_content(), Some("hello"));

		let number = Props::new(BTreeMap::new(), Children::from(42));
		assert_eq!(number.text_content(), Some("42"));

		assert_eq!(props(&[]).text_content(), None);
	}

	#[rstest]
	fn test_ptr_eq_distinguishes_clones_from_copies() {
		let a = props(&[("id", PropValue::from("a"))]);
		let clone = a.clone();
		let copy = props(&[("id", PropValue::from("a"))]);

		assert!(Props::ptr_eq(&a, &clone));
		assert!(!Props::ptr_eq(&a, &copy));
	}
}
