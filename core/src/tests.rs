//! Render pipeline tests over the in-memory document.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use futures::{
    FutureExt,
    channel::mpsc,
    executor::{LocalPool, LocalSpawner},
};

use crate::{
    attribute::{AttrValue, Attribute},
    dsl::*,
    modifier::{Key, StaticVNode},
    patch::{
        Host, Listener,
        memory::{MemoryHost, MemoryNode},
    },
    prelude::*,
    receiver::AttributeStreamReceiver,
};

struct Harness {
    pool: LocalPool,
    host: MemoryHost,
    root: MemoryNode,
    context: RenderContext,
    errors: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    fn new() -> Self {
        let pool = LocalPool::new();
        let scheduler: Rc<LocalSpawner> = Rc::new(pool.spawner());
        let host = MemoryHost::new();
        let root = host.root();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let context = RenderContext::new(
            Rc::clone(&scheduler),
            DomPatcher::new(host.clone(), scheduler),
        )
        .with_error_sink({
            let errors = Rc::clone(&errors);
            move |error| errors.borrow_mut().push(error.to_string())
        });
        Self {
            pool,
            host,
            root,
            context,
            errors,
        }
    }

    fn mount(&self, tree: impl Into<Effect<VTree>>) -> Mounted {
        render(&self.context, &self.root.to_element(), tree)
            .now_or_never()
            .expect("ready tree mounts synchronously")
            .expect("mount succeeds")
    }

    fn run(&mut self) {
        self.pool.run_until_stalled();
    }

    fn mounted_node(&self) -> MemoryNode {
        self.root.children()[0].clone()
    }
}

fn record(log: &Rc<RefCell<Vec<String>>>, entry: &str) {
    log.borrow_mut().push(entry.to_string());
}

#[test]
fn static_tree_renders_every_modifier_kind() {
    let harness = Harness::new();
    let tree = div().with([
        Modifier::from(attr("id").set("app")),
        Modifier::from(class("a")),
        Modifier::from(class("b")),
        Modifier::from(attr("hidden").set(false)),
        Modifier::from(attr("draggable").set(true)),
        Modifier::from(prop("value").set(3)),
        Modifier::from(style("color").set("red")),
        Modifier::from("hello"),
        Modifier::from(span().with(["inner"])),
    ]);
    let _mounted = harness.mount(tree);

    let node = harness.mounted_node();
    assert_eq!(
        node.to_html(),
        "<div class=\"a b\" draggable id=\"app\" style=\"color: red;\">hello<span>inner</span></div>"
    );
    assert_eq!(node.property("value"), Some(3.into()));
}

#[test]
fn static_conversion_is_structurally_repeatable() {
    let harness = Harness::new();
    let tree = div().with([
        Modifier::from(attr("id").set("x")),
        Modifier::from(on("click").call(|_: Event| {})),
        Modifier::from(on_insert(|_| {})),
        Modifier::from(ul().with([li().with(["one"]), li().with(["two"])])),
    ]);
    let first = tree.to_vnode(&harness.context).unwrap();
    let second = tree.to_vnode(&harness.context).unwrap();
    assert_eq!(first, second);
}

#[test]
fn failing_effect_prevents_mounting() {
    let harness = Harness::new();
    let tree = div().apply(vec![
        Effect::ready(Modifier::from("kept")),
        Effect::fail(Error::effect("lookup failed")),
    ]);
    let result = render(&harness.context, &harness.root.to_element(), tree).now_or_never();
    assert!(matches!(result, Some(Err(Error::Effect(_)))));
    assert!(harness.root.children().is_empty());
}

#[test]
fn update_patches_in_place() {
    let harness = Harness::new();
    let mounted = harness.mount(div().with([
        Modifier::from(attr("id").set("one")),
        Modifier::from(attr("title").set("gone soon")),
        Modifier::from("text"),
    ]));
    let node = harness.mounted_node();

    mounted
        .update(&div().with([Modifier::from(attr("id").set("two")), Modifier::from("changed")]))
        .unwrap();

    assert_eq!(harness.mounted_node(), node);
    assert_eq!(node.to_html(), "<div id=\"two\">changed</div>");
}

#[test]
fn child_stream_patches_only_its_slot() {
    let mut harness = Harness::new();
    let handler = Handler::with_seeds(["first"]);
    let _mounted = harness.mount(div().with([
        Modifier::from(span().with(["before"])),
        Modifier::from(child_stream(handler.observable())),
        Modifier::from("after"),
    ]));
    let node = harness.mounted_node();
    let span = node.children()[0].clone();
    assert_eq!(node.text_content(), "beforeafter");

    harness.run();
    assert_eq!(node.text_content(), "beforefirstafter");

    handler.push("second");
    harness.run();
    assert_eq!(node.text_content(), "beforesecondafter");
    assert_eq!(node.children()[0], span);
    assert_eq!(node.children().len(), 3);
}

#[test]
fn children_stream_keeps_keyed_nodes_when_reordered() {
    let mut harness = Harness::new();
    let handler = Handler::<Vec<&'static str>>::with_seeds([vec!["a", "b", "c"]]);
    let items = handler.observable().map(|names| {
        names
            .into_iter()
            .map(|name| li().with([Modifier::from(key(name)), Modifier::from(name)]))
            .collect::<Vec<_>>()
    });
    let _mounted = harness.mount(ul().with([children_stream(items)]));
    harness.run();

    let list = harness.mounted_node();
    assert_eq!(list.text_content(), "abc");
    let before = list.children();

    handler.push(vec!["c", "a", "b"]);
    harness.run();
    assert_eq!(list.text_content(), "cab");
    let after = list.children();
    assert_eq!(after[0], before[2]);
    assert_eq!(after[1], before[0]);
    assert_eq!(after[2], before[1]);

    handler.push(vec!["b"]);
    harness.run();
    assert_eq!(list.to_html(), "<ul><li>b</li></ul>");
    assert_eq!(list.children()[0], before[1]);
}

#[test]
fn unmounting_stops_stream_writes() {
    let mut harness = Harness::new();
    let handler = Handler::with_seeds(["first"]);
    let mounted = harness.mount(div().with([child_stream(handler.observable())]));
    harness.run();
    assert_eq!(handler.subscriber_count(), 1);

    mounted.unmount().unwrap();
    harness.run();
    let writes = harness.host.writes();

    assert_eq!(handler.push("late"), Ack::Continue);
    harness.run();
    assert_eq!(harness.host.writes(), writes);
    assert_eq!(handler.subscriber_count(), 0);
    assert!(harness.root.children().is_empty());
}

#[test]
fn removing_a_reactive_child_cancels_its_subscription() {
    let mut harness = Harness::new();
    let handler = Handler::with_seeds(["live"]);
    let view = |with_stream: bool| {
        let section = section().with([child_stream(handler.observable())]);
        div().with([Modifier::from(p().with(["static"])), Modifier::from(with_stream.then_some(section))])
    };
    let mounted = harness.mount(view(true));
    harness.run();
    assert_eq!(harness.mounted_node().text_content(), "staticlive");

    mounted.update(&view(false)).unwrap();
    harness.run();
    let writes = harness.host.writes();
    handler.push("ignored");
    harness.run();

    assert_eq!(harness.host.writes(), writes);
    assert_eq!(harness.mounted_node().text_content(), "static");
    assert_eq!(handler.subscriber_count(), 0);
}

#[test]
fn nested_reactive_nodes_survive_parent_emissions() {
    let mut harness = Harness::new();
    let outer = Handler::<&'static str>::default();
    let inner = Handler::<&'static str>::default();
    let _mounted = harness.mount(div().with([
        Modifier::from(child_stream(outer.observable())),
        Modifier::from(section().with([child_stream(inner.observable())])),
    ]));
    harness.run();
    let root = harness.mounted_node();
    let section = root.children()[0].clone();

    inner.push("x");
    harness.run();
    outer.push("y");
    harness.run();
    assert_eq!(root.to_html(), "<div>y<section>x</section></div>");
    assert_eq!(root.children()[1], section);

    inner.push("z");
    harness.run();
    assert_eq!(root.to_html(), "<div>y<section>z</section></div>");
}

#[test]
fn attribute_stream_overrides_the_static_value() {
    let mut harness = Harness::new();
    let titles = Handler::with_seeds(["live"]);
    let _mounted = harness.mount(div().with([
        Modifier::from(attr("title").set("static")),
        Modifier::from(attr("title").stream(titles.observable())),
        Modifier::from(style("color").stream(Observable::from_values(["blue"]))),
    ]));
    let node = harness.mounted_node();
    assert_eq!(node.attribute("title").as_deref(), Some("static"));

    harness.run();
    assert_eq!(node.attribute("title").as_deref(), Some("live"));
    assert_eq!(node.style("color").as_deref(), Some("blue"));

    titles.push("later");
    harness.run();
    assert_eq!(node.attribute("title").as_deref(), Some("later"));
}

#[test]
fn stream_error_keeps_last_render_and_stops_updates() {
    let mut harness = Harness::new();
    let (sender, receiver) = mpsc::unbounded::<Result<Effect<StaticVNode>>>();
    let nodes = Observable::from_stream(receiver);
    let _mounted = harness.mount(div().with([crate::receiver::ChildStreamReceiver::new(nodes)]));

    sender.unbounded_send(Ok(Effect::ready("a".into()))).unwrap();
    harness.run();
    sender.unbounded_send(Err(Error::stream("upstream closed"))).unwrap();
    harness.run();
    let _ = sender.unbounded_send(Ok(Effect::ready("b".into())));
    harness.run();

    assert_eq!(harness.mounted_node().text_content(), "a");
    assert_eq!(harness.errors.borrow().len(), 1);
    assert!(harness.errors.borrow()[0].contains("upstream closed"));
}

#[test]
fn pending_stream_nodes_apply_in_arrival_order() {
    let mut harness = Harness::new();
    let (sender, receiver) = mpsc::unbounded::<Result<Effect<Vec<StaticVNode>>>>();
    let (slow_sender, slow) = futures::channel::oneshot::channel::<&'static str>();
    let _mounted = harness.mount(div().with([crate::receiver::ChildrenStreamReceiver::new(
        Observable::from_stream(receiver),
    )]));

    sender
        .unbounded_send(Ok(Effect::pending(async move {
            let text = slow.await.map_err(Error::effect)?;
            Ok::<_, Error>(vec![StaticVNode::from(text)])
        })))
        .unwrap();
    sender
        .unbounded_send(Ok(Effect::ready(vec!["second".into()])))
        .unwrap();
    harness.run();
    assert_eq!(harness.mounted_node().text_content(), "");

    slow_sender.send("first").unwrap();
    harness.run();
    assert_eq!(harness.mounted_node().text_content(), "second");
}

#[test]
fn lifecycle_hooks_and_styles_follow_the_node() {
    let mut harness = Harness::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let view = |label: &'static str| {
        let log = Rc::clone(&log);
        div().with([
            Modifier::from(style("opacity").set("0")),
            Modifier::from(style("opacity").delayed("1")),
            Modifier::from(style("opacity").remove("0.5")),
            Modifier::from(style("display").destroy("none")),
            Modifier::from(on_insert({
                let log = Rc::clone(&log);
                move |_| record(&log, "insert")
            })),
            Modifier::from(on_prepatch({
                let log = Rc::clone(&log);
                move |(old, new)| {
                    assert_eq!(old, new);
                    record(&log, "prepatch");
                }
            })),
            Modifier::from(on_update({
                let log = Rc::clone(&log);
                move |_| record(&log, "update")
            })),
            Modifier::from(on_postpatch({
                let log = Rc::clone(&log);
                move |_| record(&log, "postpatch")
            })),
            Modifier::from(on_destroy(move |_| record(&log, "destroy"))),
            Modifier::from(label),
        ])
    };

    let mounted = harness.mount(view("one"));
    let node = harness.mounted_node();
    assert_eq!(node.style("opacity").as_deref(), Some("1"));

    mounted.update(&view("two")).unwrap();
    mounted.unmount().unwrap();
    harness.run();

    assert_eq!(
        &*log.borrow(),
        &["insert", "prepatch", "update", "postpatch", "destroy"]
    );
    assert_eq!(node.style("opacity").as_deref(), Some("0.5"));
    assert_eq!(node.style("display").as_deref(), Some("none"));
    assert_eq!(node.text_content(), "two");
}

#[test]
fn emitters_dispatch_and_are_released_with_the_node() {
    let harness = Harness::new();
    let clicks = Handler::<Event>::default();
    let mut seen = clicks.subscribe();
    let log = Rc::new(RefCell::new(Vec::new()));
    let view = |label: &'static str| {
        let log = Rc::clone(&log);
        button().with([
            Modifier::from(on("click").to(clicks.clone())),
            Modifier::from(on("click").call(move |_: Event| record(&log, label))),
        ])
    };
    let mounted = harness.mount(view("first"));
    let node = harness.mounted_node();

    node.dispatch("click", 1_u8);
    assert!(matches!(
        futures::StreamExt::next(&mut seen).now_or_never(),
        Some(Some(Ok(event))) if event.payload::<u8>() == Some(&1)
    ));

    mounted.update(&view("second")).unwrap();
    assert_eq!(node.listener_count("click"), 1);
    node.dispatch("click", 2_u8);
    assert_eq!(&*log.borrow(), &["first", "second"]);

    mounted.unmount().unwrap();
    assert_eq!(node.listener_count("click"), 0);
}

/// A [`MemoryHost`] whose text creation can be switched off.
#[derive(Clone, Default)]
struct FailingHost {
    inner: MemoryHost,
    fail_text: Rc<Cell<bool>>,
}

impl Host for FailingHost {
    type Node = MemoryNode;

    fn create_element(&self, tag: &str) -> Result<MemoryNode> {
        self.inner.create_element(tag)
    }

    fn create_text(&self, text: &str) -> Result<MemoryNode> {
        if self.fail_text.get() {
            return Err(Error::host("create_text", "text creation switched off"));
        }
        self.inner.create_text(text)
    }

    fn set_text(&self, node: &MemoryNode, text: &str) -> Result<()> {
        self.inner.set_text(node, text)
    }

    fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) -> Result<()> {
        self.inner.set_attribute(node, name, value)
    }

    fn remove_attribute(&self, node: &MemoryNode, name: &str) -> Result<()> {
        self.inner.remove_attribute(node, name)
    }

    fn set_property(&self, node: &MemoryNode, name: &str, value: &AttrValue) -> Result<()> {
        self.inner.set_property(node, name, value)
    }

    fn remove_property(&self, node: &MemoryNode, name: &str) -> Result<()> {
        self.inner.remove_property(node, name)
    }

    fn set_style(&self, node: &MemoryNode, name: &str, value: &str) -> Result<()> {
        self.inner.set_style(node, name, value)
    }

    fn remove_style(&self, node: &MemoryNode, name: &str) -> Result<()> {
        self.inner.remove_style(node, name)
    }

    fn insert_before(
        &self,
        parent: &MemoryNode,
        child: &MemoryNode,
        reference: Option<&MemoryNode>,
    ) -> Result<()> {
        self.inner.insert_before(parent, child, reference)
    }

    fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<()> {
        self.inner.remove_child(parent, child)
    }

    fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
        self.inner.parent(node)
    }

    fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
        self.inner.next_sibling(node)
    }

    fn listen(
        &self,
        node: &MemoryNode,
        event: &str,
        handler: Rc<dyn Fn(Event)>,
    ) -> Result<Listener> {
        self.inner.listen(node, event, handler)
    }
}

#[test]
fn failed_emission_still_tears_down_nested_reactive_nodes() {
    let mut pool = LocalPool::new();
    let scheduler: Rc<LocalSpawner> = Rc::new(pool.spawner());
    let host = FailingHost::default();
    let root = host.inner.root();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let context = RenderContext::new(
        Rc::clone(&scheduler),
        DomPatcher::new(host.clone(), scheduler),
    )
    .with_error_sink({
        let errors = Rc::clone(&errors);
        move |error| errors.borrow_mut().push(error.to_string())
    });

    let outer = Handler::<StaticVNode>::default();
    let inner = Handler::<&'static str>::default();
    let mounted = render(
        &context,
        &root.to_element(),
        div().with([child_stream(outer.observable())]),
    )
    .now_or_never()
    .expect("ready tree mounts synchronously")
    .expect("mount succeeds");
    pool.run_until_stalled();

    outer.push(section().with([child_stream(inner.observable())]).into());
    pool.run_until_stalled();
    inner.push("x");
    pool.run_until_stalled();
    assert_eq!(root.children()[0].to_html(), "<div><section>x</section></div>");
    assert_eq!(inner.subscriber_count(), 1);

    host.fail_text.set(true);
    outer.push("t".into());
    pool.run_until_stalled();
    host.fail_text.set(false);
    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].contains("create_text"));

    mounted.unmount().unwrap();
    pool.run_until_stalled();
    let writes = host.inner.writes();

    inner.push("late");
    pool.run_until_stalled();
    assert_eq!(host.inner.writes(), writes);
    assert_eq!(inner.subscriber_count(), 0);
    assert!(root.children().is_empty());
}

#[test]
fn optional_modifiers_compose_through_apply() {
    let harness = Harness::new();
    let highlighted = false;
    let tree = div().apply(modifiers![
        Some(key("row")),
        None::<Key>,
        highlighted.then_some(class("highlighted")),
        Some("label"),
    ]);
    let _mounted = harness.mount(tree);

    assert_eq!(harness.mounted_node().to_html(), "<div>label</div>");
}

#[test]
fn delayed_styles_follow_later_renders() {
    let harness = Harness::new();
    let view = |delayed: Option<&'static str>| {
        div().with([
            Modifier::from(style("color").set("red")),
            Modifier::from(delayed.map(|value| style("opacity").delayed(value))),
        ])
    };
    let mounted = harness.mount(view(Some("1")));
    let node = harness.mounted_node();
    assert_eq!(node.style("opacity").as_deref(), Some("1"));

    mounted.update(&view(Some("0.5"))).unwrap();
    assert_eq!(node.style("opacity").as_deref(), Some("0.5"));

    let writes = harness.host.writes();
    mounted.update(&view(Some("0.5"))).unwrap();
    assert_eq!(harness.host.writes(), writes);

    mounted.update(&view(None)).unwrap();
    assert_eq!(node.style("opacity"), None);
    assert_eq!(node.style("color").as_deref(), Some("red"));
}

#[test]
fn attribute_stream_writes_under_its_own_title() {
    let mut harness = Harness::new();
    let _mounted = harness.mount(div().with([AttributeStreamReceiver::new(
        "title",
        Observable::from_values([Attribute::attr("alt", "streamed")]),
    )]));
    harness.run();

    let node = harness.mounted_node();
    assert_eq!(node.attribute("title").as_deref(), Some("streamed"));
    assert_eq!(node.attribute("alt"), None);
}
