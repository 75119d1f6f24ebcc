//! Integration tests for state, effect, ref and memo hooks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbor_reconciler::hooks::{Cleanup, Deps, StateSetter};
use arbor_reconciler::host::memory::{MemoryEvent, MemoryHost};
use arbor_reconciler::vnode::{Children, Component, VNode};
use arbor_reconciler::{HostHandle, Root, Runtime};
use arbor_scheduler::{ManualClock, Scheduler};
use rstest::rstest;

type Log = Rc<RefCell<Vec<String>>>;

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

	fn click(&self, id: &str) {
		let target = self.host.find_by_id(id).expect("element to click");
		self.host.dispatch_event(target, MemoryEvent::new("click"));
	}
}

fn drain(log: &Log) -> Vec<String> {
	std::mem::take(&mut *log.borrow_mut())
}

/// A counter exposing its setter and render count.
struct Counter {
	component: Component,
	setter: Rc<RefCell<Option<StateSetter<i32>>>>,
	renders: Rc<Cell<usize>>,
}

fn counter() -> Counter {
	let setter = Rc::new(RefCell::new(None));
	let renders = Rc::new(Cell::new(0));
	let component = Component::new("Counter", {
		let setter = setter.clone();
		let renders = renders.clone();
		move |_props, cx| {
			renders.set(renders.get() + 1);
			let (count, set_count) = cx.use_state(|| 0);
			*setter.borrow_mut() = Some(set_count.clone());
			VNode::element("button")
				.attr("id", "inc")
				.on("onClick", move |_| {
					set_count.update(|n| n + 1);
					set_count.update(|n| n + 1);
					set_count.update(|n| n + 1);
				})
				.text(count.to_string())
				.build()
				.into()
		}
	});
	Counter {
		component,
		setter,
		renders,
	}
}

#[rstest]
fn test_updates_in_one_handler_render_once() {
	let fixture = Fixture::new();
	let counter = counter();
	fixture.render(VNode::component(&counter.component).build());
	assert_eq!(counter.renders.get(), 1);

	fixture.click("inc");
	assert_eq!(fixture.runtime.scheduler().pending_tasks(), 1);
	fixture.runtime.flush();

	assert_eq!(fixture.html(), r#"<button id="inc">3</button>"#);
	assert_eq!(counter.renders.get(), 2);
}

#[rstest]
fn test_setting_equal_state_does_not_schedule() {
	let fixture = Fixture::new();
	let counter = counter();
	fixture.render(VNode::component(&counter.component).build());
	let setter = counter.setter.borrow().clone().unwrap();

	setter.set(0);

	assert!(!fixture.runtime.scheduler().has_pending_work());
	fixture.runtime.flush();
	assert_eq!(counter.renders.get(), 1);

	// The bailed-out update does not get in the way of the next one.
	setter.set(7);
	fixture.runtime.flush();
	assert_eq!(fixture.html(), r#"<button id="inc">7</button>"#);
	assert_eq!(counter.renders.get(), 2);
}

#[rstest]
#[case::set_twice(vec![0, 0])]
#[case::set_many(vec![0, 0, 0, 0])]
fn test_repeated_equal_state_never_schedules(#[case] values: Vec<i32>) {
	let fixture = Fixture::new();
	let counter = counter();
	fixture.render(VNode::component(&counter.component).build());
	let setter = counter.setter.borrow().clone().unwrap();

	for value in values {
		setter.set(value);
		assert!(!fixture.runtime.scheduler().has_pending_work());
	}
	fixture.runtime.flush();

	assert_eq!(counter.renders.get(), 1);
	assert_eq!(fixture.html(), r#"<button id="inc">0</button>"#);
}

#[rstest]
fn test_equal_state_after_a_render_of_another_root_still_bails_out() {
	let fixture = Fixture::new();
	let counter = counter();
	fixture.render(VNode::component(&counter.component).build());
	let setter = counter.setter.borrow().clone().unwrap();
	let other = fixture.runtime.create_root(fixture.host.create_container());

	setter.set(0);
	// Starting a render splices the bailed-out update into the hook queue.
	other.render(VNode::element("p").build());
	fixture.runtime.flush();
	setter.set(0);

	assert!(!fixture.runtime.scheduler().has_pending_work());
	assert_eq!(counter.renders.get(), 1);
}

#[rstest]
fn test_setter_identity_is_stable() {
	let fixture = Fixture::new();
	let counter = counter();
	fixture.render(VNode::component(&counter.component).build());
	let first = counter.setter.borrow().clone().unwrap();

	first.set(1);
	fixture.runtime.flush();
	let second = counter.setter.borrow().clone().unwrap();

	assert!(first.ptr_eq(&second));
}

#[rstest]
fn test_reducer_processes_actions_in_order() {
	#[derive(Debug)]
	enum Action {
		Push(char),
		Clear,
	}

	let dispatch = Rc::new(RefCell::new(None));
	let editor = Component::new("Editor", {
		let dispatch = dispatch.clone();
		move |_props, cx| {
			let (text, send) = cx.use_reducer(
				|text: &String, action: &Action| match action {
					Action::Push(c) => format!("{text}{c}"),
					Action::Clear => String::new(),
				},
				String::from(">"),
			);
			*dispatch.borrow_mut() = Some(send);
			VNode::element("pre").text(text.as_str()).build().into()
		}
	});
	let fixture = Fixture::new();
	fixture.render(VNode::component(&editor).build());
	let send = dispatch.borrow().clone().unwrap();

	send.dispatch(Action::Push('a'));
	send.dispatch(Action::Clear);
	send.dispatch(Action::Push('b'));
	send.dispatch(Action::Push('c'));
	fixture.runtime.flush();

	assert_eq!(fixture.html(), "<pre>bc</pre>");
}

#[rstest]
fn test_effects_follow_deps_and_clean_up_first() {
	let log: Log = Rc::default();
	let tracker = Component::new("Tracker", {
		let log = log.clone();
		move |props, cx| {
			let id = props.get_str("id").unwrap_or_default().to_string();
			let log = log.clone();
			let effect_id = id.clone();
			cx.use_effect(
				move || {
					log.borrow_mut().push(format!("subscribe {effect_id}"));
					let log = log.clone();
					Cleanup::new(move || log.borrow_mut().push(format!("unsubscribe {effect_id}")))
				},
				Some(Deps::new(id)),
			);
			Children::none()
		}
	});
	let fixture = Fixture::new();
	let render = |id: &str, label: &str| {
		VNode::component(&tracker)
			.attr("id", id)
			.attr("label", label)
			.build()
	};

	fixture.render(render("a", "first"));
	assert_eq!(drain(&log), vec!["subscribe a"]);

	fixture.render(render("a", "second"));
	assert!(drain(&log).is_empty(), "unchanged deps do not re-run the effect");

	fixture.render(render("b", "second"));
	assert_eq!(drain(&log), vec!["unsubscribe a", "subscribe b"]);

	fixture.root.unmount();
	fixture.runtime.flush();
	assert_eq!(drain(&log), vec!["unsubscribe b"]);
}

#[rstest]
fn test_effect_without_deps_runs_every_commit() {
	let runs = Rc::new(Cell::new(0));
	let always = Component::new("Always", {
		let runs = runs.clone();
		move |_props, cx| {
			let runs = runs.clone();
			cx.use_effect(move || runs.set(runs.get() + 1), None);
			Children::none()
		}
	});
	let fixture = Fixture::new();
	for _ in 0..3 {
		fixture.render(VNode::component(&always).build());
	}
	assert_eq!(runs.get(), 3);
}

#[rstest]
fn test_effects_see_committed_host_tree() {
	let seen = Rc::new(RefCell::new(String::new()));
	let fixture = Fixture::new();
	let probe = Component::new("Probe", {
		let seen = seen.clone();
		let host = fixture.host.clone();
		let container = fixture.container;
		move |_props, cx| {
			let seen = seen.clone();
			let host = host.clone();
			cx.use_effect(
				move || *seen.borrow_mut() = host.inner_html(container),
				Some(Deps::empty()),
			);
			VNode::element("span").text("mounted").build().into()
		}
	});

	fixture.render(VNode::component(&probe).build());

	assert_eq!(*seen.borrow(), "<span>mounted</span>");
}

#[rstest]
fn test_layout_cleanup_sees_host_tree_mid_mutation() {
	let seen: Log = Rc::default();
	let fixture = Fixture::new();
	let anchor = Component::new("Anchor", {
		let seen = seen.clone();
		let host = fixture.host.clone();
		let container = fixture.container;
		move |props, cx| {
			let n = props.get_str("n").unwrap_or_default().to_string();
			let seen = seen.clone();
			let host = host.clone();
			cx.use_layout_effect(
				move || Cleanup::new(move || seen.borrow_mut().push(host.inner_html(container))),
				Some(Deps::new(n)),
			);
			VNode::element("a").build().into()
		}
	});
	let page = |n: Option<&str>, with_sibling: bool| {
		let mut div = VNode::element("div");
		if let Some(n) = n {
			div = div.child(VNode::component(&anchor).key("anchor").attr("n", n).build());
		}
		if with_sibling {
			div = div.child(VNode::element("b").key("sibling").build());
		}
		div.build()
	};

	fixture.render(page(Some("1"), false));
	fixture.render(page(Some("2"), true));
	// Runs at the updated fiber, before its later sibling is placed.
	assert_eq!(drain(&seen), vec!["<div><a></a></div>"]);

	fixture.render(page(None, true));
	// Runs before the deleted subtree leaves the host tree.
	assert_eq!(drain(&seen), vec!["<div><a></a><b></b></div>"]);
	assert_eq!(fixture.html(), "<div><b></b></div>");
}

#[rstest]
fn test_layout_effects_run_before_passive_effects() {
	let log: Log = Rc::default();
	let component = |name: &'static str, log: Log| {
		Component::new(name, move |props, cx| {
			let log_layout = log.clone();
			let log_passive = log.clone();
			cx.use_layout_effect(
				move || {
					log_layout.borrow_mut().push(format!("layout {name}"));
					let log = log_layout.clone();
					Cleanup::new(move || log.borrow_mut().push(format!("layout cleanup {name}")))
				},
				None,
			);
			cx.use_effect(
				move || log_passive.borrow_mut().push(format!("passive {name}")),
				None,
			);
			props.children().clone()
		})
	};
	let parent = component("parent", log.clone());
	let child = component("child", log.clone());
	let fixture = Fixture::new();
	let tree = || {
		VNode::component(&parent)
			.child(VNode::component(&child).build())
			.build()
	};

	fixture.render(tree());
	assert_eq!(
		drain(&log),
		vec!["layout child", "layout parent", "passive child", "passive parent"]
	);

	fixture.render(tree());
	assert_eq!(
		drain(&log),
		vec![
			"layout cleanup child",
			"layout cleanup parent",
			"layout child",
			"layout parent",
			"passive child",
			"passive parent",
		]
	);
}

#[rstest]
fn test_removed_subtree_runs_all_cleanups() {
	let log: Log = Rc::default();
	let leaf = Component::new("Leaf", {
		let log = log.clone();
		move |props, cx| {
			let name = props.get_str("name").unwrap_or_default().to_string();
			let passive_log = log.clone();
			let passive_name = name.clone();
			cx.use_effect(
				move || {
					Cleanup::new(move || passive_log.borrow_mut().push(format!("passive {passive_name}")))
				},
				Some(Deps::empty()),
			);
			let layout_log = log.clone();
			let layout_name = name.clone();
			cx.use_layout_effect(
				move || Cleanup::new(move || layout_log.borrow_mut().push(format!("layout {layout_name}"))),
				Some(Deps::empty()),
			);
			VNode::element("i").text(name).build().into()
		}
	});
	let fixture = Fixture::new();
	let leaves = |names: &[&str]| {
		VNode::element("div")
			.children(
				names
					.iter()
					.map(|name| VNode::component(&leaf).key(*name).attr("name", *name).build()),
			)
			.build()
	};

	fixture.render(leaves(&["x", "y"]));
	fixture.render(leaves(&["y"]));

	assert_eq!(fixture.html(), "<div><i>y</i></div>");
	assert_eq!(drain(&log), vec!["layout x", "passive x"]);

	fixture.root.unmount();
	fixture.runtime.flush();
	assert_eq!(fixture.html(), "");
	assert_eq!(drain(&log), vec!["layout y", "passive y"]);
}

#[rstest]
fn test_ref_persists_and_memo_follows_deps() {
	let computations = Rc::new(Cell::new(0));
	let snapshots = Rc::new(RefCell::new(Vec::new()));
	let stats = Component::new("Stats", {
		let computations = computations.clone();
		let snapshots = snapshots.clone();
		move |props, cx| {
			let renders = cx.use_ref(|| 0_u32);
			*renders.borrow_mut() += 1;

			let size = props.get_str("size").unwrap_or_default().len();
			let computations = computations.clone();
			let doubled = cx.use_memo(
				move || {
					computations.set(computations.get() + 1);
					size * 2
				},
				Deps::new(size),
			);
			snapshots.borrow_mut().push((*renders.borrow(), *doubled));
			Children::none()
		}
	});
	let fixture = Fixture::new();

	fixture.render(VNode::component(&stats).attr("size", "ab").build());
	fixture.render(VNode::component(&stats).attr("size", "cd").build());
	fixture.render(VNode::component(&stats).attr("size", "xyz").build());

	assert_eq!(*snapshots.borrow(), vec![(1, 4), (2, 4), (3, 6)]);
	assert_eq!(computations.get(), 2);
}

#[rstest]
fn test_state_survives_sibling_reorder() {
	let item = Component::new("Item", |props, cx| {
		let label = props.get_str("label").unwrap_or_default().to_string();
		let (clicks, set_clicks) = cx.use_state(|| 0);
		VNode::element("li")
			.attr("id", label.as_str())
			.on("onClick", move |_| set_clicks.update(|n| n + 1))
			.text(format!("{label}:{clicks}"))
			.build()
			.into()
	});
	let fixture = Fixture::new();
	let list = |labels: &[&str]| {
		VNode::element("ul")
			.children(
				labels
					.iter()
					.map(|label| VNode::component(&item).key(*label).attr("label", *label).build()),
			)
			.build()
	};

	fixture.render(list(&["a", "b"]));
	fixture.click("b");
	fixture.runtime.flush();
	fixture.render(list(&["b", "a"]));

	assert_eq!(fixture.html(), "<ul><li id=\"b\">b:1</li><li id=\"a\">a:0</li></ul>");
}

#[rstest]
fn test_dispatch_after_unmount_is_ignored() {
	let fixture = Fixture::new();
	let counter = counter();
	fixture.render(VNode::component(&counter.component).build());
	let setter = counter.setter.borrow().clone().unwrap();

	fixture.root.unmount();
	fixture.runtime.flush();
	setter.set(42);

	assert!(!fixture.runtime.scheduler().has_pending_work());
	assert_eq!(counter.renders.get(), 1);
}

#[rstest]
#[should_panic(expected = "rendered fewer hooks than expected")]
fn test_conditional_hook_panics() {
	let flaky = Component::new("Flaky", |props, cx| {
		if props.get_str("with_state").is_some() {
			let _ = cx.use_state(|| 0);
		}
		Children::none()
	});
	let fixture = Fixture::new();
	fixture.render(VNode::component(&flaky).attr("with_state", "yes").build());
	fixture.render(VNode::component(&flaky).build());
}
