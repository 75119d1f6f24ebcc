//! Integration tests for child reconciliation and the commit phase, observed
//! through the in-memory host.

use std::collections::HashMap;

use arbor_reconciler::host::memory::{HostOp, MemoryHost};
use arbor_reconciler::vnode::{Child, Component, VNode};
use arbor_reconciler::{HostHandle, PropChange, Root, Runtime};
use arbor_scheduler::{ManualClock, Scheduler};
use proptest::prelude::*;
use rstest::rstest;

struct Fixture {
	host: MemoryHost,
	container: HostHandle,
	runtime: Runtime,
	root: Root,
}

impl Fixture {
	fn new() -> Self {
		let host = MemoryHost::new();
		let container = host.create_container();
		let runtime = Runtime::new(host.clone(), Scheduler::new(ManualClock::new()));
		let root = runtime.create_root(container);
		Self {
			host,
			container,
			runtime,
			root,
		}
	}

	fn render(&self, node: VNode) {
		self.root.render(node);
		self.runtime.flush();
	}

	fn html(&self) -> String {
		self.host.inner_html(self.container)
	}

	/// The `ul` rendered by [`keyed_list`].
	fn list(&self) -> HostHandle {
		self.host.children(self.container)[0]
	}

	/// Text of each `li` mapped to its host handle.
	fn items(&self) -> HashMap<String, HostHandle> {
		self.host
			.children(self.list())
			.into_iter()
			.map(|item| (self.host.text_content(item), item))
			.collect()
	}
}

fn keyed_list(keys: &[&str]) -> VNode {
	VNode::element("ul")
		.children(keys.iter().map(|key| VNode::element("li").key(*key).text(*key).build()))
		.build()
}

fn list_html(keys: &[&str]) -> String {
	let items: String = keys.iter().map(|key| format!("<li>{key}</li>")).collect();
	format!("<ul>{items}</ul>")
}

fn placements(ops: &[HostOp]) -> Vec<HostHandle> {
	ops.iter()
		.filter_map(|op| match op {
			HostOp::AppendChild { child, .. } | HostOp::InsertBefore { child, .. } => Some(*child),
			_ => None,
		})
		.collect()
}

#[rstest]
fn test_initial_mount_builds_host_tree() {
	let fixture = Fixture::new();
	fixture.render(
		VNode::element("div")
			.attr("id", "app")
			.style("color", "red")
			.child(VNode::element("h1").text("Title").build())
			.child("plain text")
			.build(),
	);

	assert_eq!(
		fixture.html(),
		r#"<div id="app" style="color: red"><h1>Title</h1>plain text</div>"#
	);
	// One placement of the whole tree into the container.
	let container_appends = fixture
		.host
		.ops()
		.iter()
		.filter(|op| matches!(op, HostOp::AppendChild { parent, .. } if *parent == fixture.container))
		.count();
	assert_eq!(container_appends, 1);
}

#[rstest]
#[case(&["a", "b", "c"], &["c", "a", "b"], &["a", "b"])]
#[case(&["a", "b", "c"], &["b", "c", "a"], &["a"])]
#[case(&["a", "b", "c"], &["a", "b", "c"], &[])]
#[case(&["a", "b", "c", "d"], &["d", "c", "b", "a"], &["c", "b", "a"])]
fn test_keyed_reorder_moves_instances(
	#[case] before: &[&str],
	#[case] after: &[&str],
	#[case] moved: &[&str],
) {
	let fixture = Fixture::new();
	fixture.render(keyed_list(before));
	let items = fixture.items();
	fixture.host.clear_ops();

	fixture.render(keyed_list(after));

	assert_eq!(fixture.html(), list_html(after));
	assert_eq!(fixture.items(), items, "instances follow their keys");
	let ops = fixture.host.ops();
	assert!(
		!ops.iter().any(|op| matches!(op, HostOp::CreateElement { .. } | HostOp::RemoveChild { .. })),
		"a pure reorder creates and removes nothing: {ops:?}"
	);
	let expected: Vec<HostHandle> = moved.iter().map(|key| items[*key]).collect();
	assert_eq!(placements(&ops), expected);
}

#[rstest]
fn test_removed_keys_are_deleted() {
	let fixture = Fixture::new();
	fixture.render(keyed_list(&["a", "b", "c"]));
	let items = fixture.items();
	fixture.host.clear_ops();

	fixture.render(keyed_list(&["a", "c"]));

	assert_eq!(fixture.html(), list_html(&["a", "c"]));
	assert_eq!(
		fixture.host.ops(),
		vec![HostOp::RemoveChild {
			parent: fixture.list(),
			child: items["b"],
		}]
	);
	assert_eq!(fixture.host.parent(items["b"]), None);
	assert_eq!(fixture.runtime.fiber_for_instance(items["b"]), None);
}

#[rstest]
fn test_new_key_inserted_before_existing_sibling() {
	let fixture = Fixture::new();
	fixture.render(keyed_list(&["a", "c"]));
	let items = fixture.items();
	fixture.host.clear_ops();

	fixture.render(keyed_list(&["a", "b", "c"]));

	assert_eq!(fixture.html(), list_html(&["a", "b", "c"]));
	let inserted = fixture.items()["b"];
	assert!(fixture.host.ops().contains(&HostOp::InsertBefore {
		parent: fixture.list(),
		child: inserted,
		before: items["c"],
	}));
}

#[rstest]
fn test_type_change_replaces_instance() {
	let fixture = Fixture::new();
	fixture.render(VNode::element("div").child(VNode::element("span").build()).build());
	let div = fixture.host.children(fixture.container)[0];
	let span = fixture.host.children(div)[0];

	fixture.render(VNode::element("div").child(VNode::element("em").build()).build());

	assert_eq!(fixture.html(), "<div><em></em></div>");
	assert_eq!(fixture.host.children(fixture.container)[0], div);
	assert_ne!(fixture.host.children(div)[0], span);
	assert_eq!(fixture.host.parent(span), None);
}

#[rstest]
fn test_unkeyed_children_are_matched_by_position() {
	let fixture = Fixture::new();
	let render = |labels: &[&str]| {
		VNode::element("ol")
			.children(labels.iter().map(|label| VNode::element("li").attr("title", *label).build()))
			.build()
	};
	fixture.render(render(&["x", "y"]));
	let before = fixture.host.children(fixture.list());
	fixture.host.clear_ops();

	fixture.render(render(&["y", "x", "z"]));

	let after = fixture.host.children(fixture.list());
	assert_eq!(&after[..2], &before[..]);
	assert_eq!(fixture.host.attribute(after[0], "title").as_deref(), Some("y"));
	let updates = fixture
		.host
		.ops()
		.iter()
		.filter(|op| matches!(op, HostOp::CommitUpdate { .. }))
		.count();
	assert_eq!(updates, 2);
}

#[rstest]
fn test_text_node_updates_in_place() {
	let fixture = Fixture::new();
	let greeting = |name: &str| {
		VNode::element("p")
			.child("Hello, ")
			.child(name.to_string())
			.build()
	};
	fixture.render(greeting("Ada"));
	let p = fixture.host.children(fixture.container)[0];
	let name_node = fixture.host.children(p)[1];
	fixture.host.clear_ops();

	fixture.render(greeting("Grace"));

	assert_eq!(fixture.html(), "<p>Hello, Grace</p>");
	assert_eq!(
		fixture.host.ops(),
		vec![HostOp::CommitTextUpdate {
			instance: name_node,
			text: "Grace".to_string(),
		}]
	);
}

#[rstest]
fn test_text_only_child_switches_to_elements() {
	let fixture = Fixture::new();
	fixture.render(VNode::element("p").text("loading").build());
	let p = fixture.host.children(fixture.container)[0];
	fixture.host.clear_ops();

	fixture.render(VNode::element("p").child(VNode::element("b").build()).build());

	assert_eq!(fixture.html(), "<p><b></b></p>");
	let ops = fixture.host.ops();
	let reset = ops
		.iter()
		.position(|op| *op == HostOp::ResetTextContent { instance: p })
		.expect("text content reset");
	let placed = ops.iter().position(HostOp::is_placement).expect("child placed");
	assert!(reset < placed, "content reset before placement: {ops:?}");

	fixture.render(VNode::element("p").text("done").build());
	assert_eq!(fixture.html(), "<p>done</p>");
}

#[rstest]
fn test_attribute_and_style_patches() {
	let fixture = Fixture::new();
	fixture.render(
		VNode::element("div")
			.attr("class", "a")
			.attr("title", "t")
			.style("color", "red")
			.style("margin", "0")
			.build(),
	);
	let div = fixture.host.children(fixture.container)[0];
	fixture.host.clear_ops();

	fixture.render(
		VNode::element("div")
			.attr("class", "b")
			.style("color", "blue")
			.build(),
	);

	assert_eq!(fixture.host.attribute(div, "class").as_deref(), Some("b"));
	assert_eq!(fixture.host.attribute(div, "title"), None);
	assert_eq!(fixture.host.style(div, "color").as_deref(), Some("blue"));
	assert_eq!(fixture.host.style(div, "margin"), None);
	let ops = fixture.host.ops();
	let [HostOp::CommitUpdate { instance, patch }] = ops.as_slice() else {
		panic!("expected a single update, got {ops:?}");
	};
	assert_eq!(*instance, div);
	assert!(patch.changes().contains(&PropChange::Remove {
		name: "title".into()
	}));
}

#[rstest]
fn test_component_children_are_placed_at_host_level() {
	let pair = Component::new("Pair", |props, _| {
		let label = props.get_str("label").unwrap_or_default().to_string();
		vec![
			VNode::element("dt").text(label.clone()).build(),
			VNode::element("dd").text(label).build(),
		]
		.into()
	});
	let fixture = Fixture::new();
	let render = |labels: &[&str]| {
		VNode::element("dl")
			.child(VNode::element("hr").build())
			.children(
				labels
					.iter()
					.map(|label| VNode::component(&pair).key(*label).attr("label", *label).build()),
			)
			.child(VNode::element("hr").build())
			.build()
	};
	fixture.render(render(&["x"]));
	fixture.render(render(&["w", "x"]));

	assert_eq!(
		fixture.html(),
		"<dl><hr></hr><dt>w</dt><dd>w</dd><dt>x</dt><dd>x</dd><hr></hr></dl>"
	);

	fixture.render(render(&["x", "w"]));
	assert_eq!(
		fixture.html(),
		"<dl><hr></hr><dt>x</dt><dd>x</dd><dt>w</dt><dd>w</dd><hr></hr></dl>"
	);

	fixture.render(render(&["w"]));
	assert_eq!(fixture.html(), "<dl><hr></hr><dt>w</dt><dd>w</dd><hr></hr></dl>");
}

#[rstest]
fn test_empty_children_render_nothing() {
	let fixture = Fixture::new();
	fixture.render(
		VNode::element("div")
			.child(Child::Empty)
			.child(false)
			.child(None::<VNode>)
			.build(),
	);
	assert_eq!(fixture.html(), "<div></div>");
}

#[rstest]
fn test_unmount_removes_tree_and_releases_fibers() {
	let fixture = Fixture::new();
	fixture.render(keyed_list(&["a", "b"]));
	fixture.render(keyed_list(&["b", "a", "c"]));

	fixture.root.unmount();
	fixture.runtime.flush();

	assert_eq!(fixture.html(), "");
	assert!(fixture.root.is_unmounted());
	// Only the root fiber and its alternate remain.
	assert_eq!(fixture.runtime.fiber_count(), 2);

	fixture.root.render(keyed_list(&["a"]));
	assert!(!fixture.runtime.scheduler().has_pending_work());
}

#[rstest]
fn test_roots_render_independently() {
	let host = MemoryHost::new();
	let runtime = Runtime::new(host.clone(), Scheduler::new(ManualClock::new()));
	let left = host.create_container();
	let right = host.create_container();
	let left_root = runtime.create_root(left);
	let right_root = runtime.create_root(right);

	left_root.render(keyed_list(&["l"]));
	right_root.render(keyed_list(&["r1", "r2"]));
	runtime.flush();

	assert_eq!(host.inner_html(left), list_html(&["l"]));
	assert_eq!(host.inner_html(right), list_html(&["r1", "r2"]));
}

fn key_orders() -> impl Strategy<Value = Vec<String>> {
	let keys: Vec<String> = (0..8).map(|key| format!("k{key}")).collect();
	proptest::sample::subsequence(keys, 0..=8).prop_shuffle()
}

proptest! {
	#[test]
	fn prop_keyed_lists_preserve_order_and_identity(before in key_orders(), after in key_orders()) {
		let fixture = Fixture::new();
		let before: Vec<&str> = before.iter().map(String::as_str).collect();
		let after: Vec<&str> = after.iter().map(String::as_str).collect();

		fixture.render(keyed_list(&before));
		let old_items = fixture.items();
		fixture.render(keyed_list(&after));

		prop_assert_eq!(fixture.html(), list_html(&after));
		let new_items = fixture.items();
		for key in &after {
			if let Some(old) = old_items.get(*key) {
				prop_assert_eq!(new_items[*key], *old);
			}
		}
		for (key, old) in &old_items {
			if !after.contains(&key.as_str()) {
				prop_assert_eq!(fixture.host.parent(*old), None);
			}
		}
	}
}
