//! Event delegation.
//!
//! The runtime attaches one capture and one bubble listener per supported
//! native event to each root container. When the host fires one, the
//! runtime walks from the target's fiber up to the root, collects the
//! matching handlers from the live props of every host ancestor, and calls
//! them with a [`SyntheticEvent`] in capture or bubble order.

pub mod dispatch;
pub mod registry;
pub mod synthetic;

pub use registry::{EventRegistry, event_priority};
pub use synthetic::{
	EVENT_INTERFACE, EventFieldValue, EventHandler, FOCUS_EVENT_INTERFACE, KEYBOARD_EVENT_INTERFACE,
	MOUSE_EVENT_INTERFACE, NativeEvent, SyntheticEvent, interface_for,
};
