//! Registration of logical events and their native dependencies.

use std::collections::{BTreeSet, HashMap};

use arbor_scheduler::Priority;

/// Native events handled by the simple event plugin, paired with the suffix
/// of their registration name (`click` becomes `onClick`).
const SIMPLE_EVENTS: &[(&str, &str)] = &[
	("click", "Click"),
	("contextmenu", "ContextMenu"),
	("dblclick", "DoubleClick"),
	("mousedown", "MouseDown"),
	("mouseup", "MouseUp"),
	("mousemove", "MouseMove"),
	("mouseover", "MouseOver"),
	("mouseout", "MouseOut"),
	("pointerdown", "PointerDown"),
	("pointerup", "PointerUp"),
	("pointermove", "PointerMove"),
	("keydown", "KeyDown"),
	("keyup", "KeyUp"),
	("keypress", "KeyPress"),
	("input", "Input"),
	("change", "Change"),
	("focusin", "Focus"),
	("focusout", "Blur"),
	("submit", "Submit"),
	("wheel", "Wheel"),
	("touchstart", "TouchStart"),
	("touchend", "TouchEnd"),
];

/// Maps logical (registration) event names to native event names.
///
/// Each two-phase registration name `onX` also registers `onXCapture`.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
	all_native_events: BTreeSet<String>,
	registration_name_dependencies: HashMap<String, Vec<String>>,
	top_level_event_to_registration_name: HashMap<String, String>,
}

impl EventRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry with every simple event registered.
	pub fn with_simple_events() -> Self {
		let mut registry = Self::new();
		registry.register_simple_events();
		registry
	}

	/// Register every entry of the simple event plugin.
	pub fn register_simple_events(&mut self) {
		for (native, suffix) in SIMPLE_EVENTS {
			self.register_simple_event(native, &format!("on{suffix}"));
		}
	}

	/// Register a native event that maps one-to-one onto a logical event.
	pub fn register_simple_event(&mut self, native_event: &str, registration_name: &str) {
		self.top_level_event_to_registration_name
			.insert(native_event.to_string(), registration_name.to_string());
		self.register_two_phase_event(registration_name, &[native_event]);
	}

	/// Register `registration_name` and its capture variant as depending on
	/// `dependencies`.
	pub fn register_two_phase_event(&mut self, registration_name: &str, dependencies: &[&str]) {
		self.register_direct_event(registration_name, dependencies);
		self.register_direct_event(&format!("{registration_name}Capture"), dependencies);
	}

	/// Register a single registration name.
	pub fn register_direct_event(&mut self, registration_name: &str, dependencies: &[&str]) {
		let dependencies: Vec<String> = dependencies.iter().map(|name| name.to_string()).collect();
		self.all_native_events.extend(dependencies.iter().cloned());
		self.registration_name_dependencies
			.insert(registration_name.to_string(), dependencies);
	}

	/// Every native event some registration depends on, in name order.
	pub fn all_native_events(&self) -> impl Iterator<Item = &str> {
		self.all_native_events.iter().map(String::as_str)
	}

	/// Native events a registration name depends on.
	pub fn dependencies(&self, registration_name: &str) -> Option<&[String]> {
		self.registration_name_dependencies
			.get(registration_name)
			.map(Vec::as_slice)
	}

	/// Registration name for a native event, e.g. `click` to `onClick`.
	pub fn registration_name(&self, native_event: &str) -> Option<&str> {
		self.top_level_event_to_registration_name
			.get(native_event)
			.map(String::as_str)
	}
}

/// Update priority for work triggered while dispatching `native_event`.
///
/// Discrete and continuous user input get `UserBlocking`; everything else
/// uses `Normal`.
pub fn event_priority(native_event: &str) -> Priority {
	match native_event {
		"click" | "contextmenu" | "dblclick" | "mousedown" | "mouseup" | "pointerdown"
		| "pointerup" | "keydown" | "keyup" | "keypress" | "input" | "change" | "focusin"
		| "focusout" | "submit" | "touchstart" | "touchend" | "mousemove" | "mouseover"
		| "mouseout" | "pointermove" | "wheel" => Priority::UserBlocking,
		_ => Priority::Normal,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_two_phase_registration_adds_capture_variant() {
		let mut registry = EventRegistry::new();
		registry.register_two_phase_event("onPress", &["pointerdown", "pointerup"]);

		assert_eq!(
			registry.dependencies("onPress"),
			Some(&["pointerdown".to_string(), "pointerup".to_string()][..])
		);
		assert!(registry.dependencies("onPressCapture").is_some());
		assert_eq!(
			registry.all_native_events().collect::<Vec<_>>(),
			vec!["pointerdown", "pointerup"]
		);
	}

	#[rstest]
	#[case("click", "onClick")]
	#[case("dblclick", "onDoubleClick")]
	#[case("focusout", "onBlur")]
	fn test_simple_events_map_native_names(#[case] native: &str, #[case] registration_name: &str) {
		let registry = EventRegistry::with_simple_events();
		assert_eq!(registry.registration_name(native), Some(registration_name));
	}

	#[rstest]
	fn test_unknown_event_has_no_registration() {
		let registry = EventRegistry::with_simple_events();
		assert_eq!(registry.registration_name("transitionend"), None);
		assert_eq!(event_priority("transitionend"), Priority::Normal);
		assert_eq!(event_priority("click"), Priority::UserBlocking);
	}
}
