//! Synthetic events and the native event boundary.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::host::HostHandle;

/// A value read from a native event field.
#[derive(Debug, Clone, PartialEq)]
pub enum EventFieldValue {
	/// Numeric field such as a coordinate.
	Number(f64),
	/// String field such as a key name.
	Text(Rc<str>),
	/// Boolean field such as a modifier key.
	Bool(bool),
}

impl EventFieldValue {
	/// Numeric value, if this is a number.
	pub fn as_number(&self) -> Option<f64> {
		match self {
			EventFieldValue::Number(value) => Some(*value),
			_ => None,
		}
	}

	/// Boolean value, if this is a boolean.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			EventFieldValue::Bool(value) => Some(*value),
			_ => None,
		}
	}

	/// String value, if this is text.
	pub fn as_text(&self) -> Option<&str> {
		match self {
			EventFieldValue::Text(value) => Some(value),
			_ => None,
		}
	}
}

/// An event delivered by the host to a root-level listener.
///
/// `prevent_default` and `stop_propagation` return whether the host
/// supports them; the synthetic event records the request either way.
pub trait NativeEvent {
	/// Native event name, such as `click`.
	fn event_type(&self) -> &str;

	/// Host instance the event originated from.
	fn target(&self) -> Option<HostHandle>;

	/// Read a named field (`clientX`, `key`, ...).
	fn field(&self, name: &str) -> Option<EventFieldValue>;

	/// Time the event was created, in milliseconds.
	fn time_stamp(&self) -> f64 {
		0.0
	}

	/// Cancel the host's default action.
	fn prevent_default(&self) -> bool {
		false
	}

	/// Stop native propagation.
	fn stop_propagation(&self) -> bool {
		false
	}
}

/// Fields every synthetic event copies.
pub const EVENT_INTERFACE: &[&str] = &["eventPhase", "bubbles", "cancelable", "isTrusted"];

/// Pointer coordinates, buttons and modifiers.
pub const MOUSE_EVENT_INTERFACE: &[&str] = &[
	"clientX", "clientY", "pageX", "pageY", "screenX", "screenY", "button", "buttons", "altKey",
	"ctrlKey", "metaKey", "shiftKey",
];

/// Key identity and modifiers.
pub const KEYBOARD_EVENT_INTERFACE: &[&str] = &[
	"key", "code", "location", "repeat", "altKey", "ctrlKey", "metaKey", "shiftKey",
];

/// The element gaining or losing focus.
pub const FOCUS_EVENT_INTERFACE: &[&str] = &["relatedTarget"];

/// Field set copied for a native event type.
pub fn interface_for(native_event: &str) -> &'static [&'static str] {
	match native_event {
		"click" | "contextmenu" | "dblclick" | "mousedown" | "mouseup" | "mousemove"
		| "mouseover" | "mouseout" | "pointerdown" | "pointerup" | "pointermove" | "wheel" => {
			MOUSE_EVENT_INTERFACE
		}
		"keydown" | "keyup" | "keypress" => KEYBOARD_EVENT_INTERFACE,
		"focusin" | "focusout" => FOCUS_EVENT_INTERFACE,
		_ => &[],
	}
}

/// Event object handed to listeners.
///
/// One synthetic event is created per phase, so stopping propagation during
/// capture does not affect the bubble pass of the same native event.
pub struct SyntheticEvent<'a> {
	registration_name: &'a str,
	event_type: &'a str,
	target: Option<HostHandle>,
	current_target: Cell<Option<HostHandle>>,
	time_stamp: f64,
	fields: BTreeMap<&'static str, EventFieldValue>,
	native: &'a dyn NativeEvent,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
}

impl<'a> SyntheticEvent<'a> {
	/// Wrap `native`, copying the fields of its interface.
	pub fn new(registration_name: &'a str, event_type: &'a str, native: &'a dyn NativeEvent) -> Self {
		let fields = EVENT_INTERFACE
			.iter()
			.chain(interface_for(event_type))
			.filter_map(|name| native.field(name).map(|value| (*name, value)))
			.collect();

		Self {
			registration_name,
			event_type,
			target: native.target(),
			current_target: Cell::new(None),
			time_stamp: native.time_stamp(),
			fields,
			native,
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
		}
	}

	/// Registration name, e.g. `onClick`.
	pub fn registration_name(&self) -> &str {
		self.registration_name
	}

	/// Native event name, e.g. `click`.
	pub fn event_type(&self) -> &str {
		self.event_type
	}

	/// Host instance the event originated from.
	pub fn target(&self) -> Option<HostHandle> {
		self.target
	}

	/// Host instance whose listener is running.
	pub fn current_target(&self) -> Option<HostHandle> {
		self.current_target.get()
	}

	pub(crate) fn set_current_target(&self, target: Option<HostHandle>) {
		self.current_target.set(target);
	}

	/// Native time stamp.
	pub fn time_stamp(&self) -> f64 {
		self.time_stamp
	}

	/// A copied interface field.
	pub fn field(&self, name: &str) -> Option<&EventFieldValue> {
		self.fields.get(name)
	}

	/// Numeric interface field, e.g. `clientX`.
	pub fn number(&self, name: &str) -> Option<f64> {
		self.field(name).and_then(EventFieldValue::as_number)
	}

	/// The wrapped native event.
	pub fn native_event(&self) -> &dyn NativeEvent {
		self.native
	}

	/// Cancel the default action.
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
		self.native.prevent_default();
	}

	/// Whether `prevent_default` was called.
	pub fn is_default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	/// Skip the remaining listeners of this phase.
	pub fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
		self.native.stop_propagation();
	}

	/// Whether `stop_propagation` was called.
	pub fn is_propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}
}

impl fmt::Debug for SyntheticEvent<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SyntheticEvent")
			.field("registration_name", &self.registration_name)
			.field("event_type", &self.event_type)
			.field("target", &self.target)
			.field("current_target", &self.current_target.get())
			.field("fields", &self.fields)
			.finish()
	}
}

type HandlerFn = dyn Fn(&SyntheticEvent<'_>);

/// An event listener stored in props.
///
/// Handlers compare by identity; see [`EventHandler::ptr_eq`].
#[derive(Clone)]
pub struct EventHandler(Rc<HandlerFn>);

impl EventHandler {
	/// Wrap a listener function.
	pub fn new<F>(handler: F) -> Self
	where
		F: Fn(&SyntheticEvent<'_>) + 'static,
	{
		Self(Rc::new(handler))
	}

	/// Invoke the listener.
	pub fn call(&self, event: &SyntheticEvent<'_>) {
		(self.0)(event)
	}

	/// True when both handlers are the same allocation.
	pub fn ptr_eq(&self, other: &EventHandler) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for EventHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("EventHandler(..)")
	}
}
