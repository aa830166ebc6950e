//! End-to-end rendering through the facade crate.

use std::rc::Rc;

use futures::executor::LocalPool;
use waterdom::prelude::*;

#[test]
fn handler_driven_counter_renders_and_unmounts() {
    let mut pool = LocalPool::new();
    let scheduler = Rc::new(pool.spawner());
    let host = MemoryHost::new();
    let root = host.root();
    let context = RenderContext::new(Rc::clone(&scheduler), DomPatcher::new(host.clone(), scheduler));

    let clicks = Handler::<Event>::default();
    let label = clicks
        .observable()
        .map(|event: Event| format!("last event: {}", event.kind()));
    let tree = div().apply(modifiers![
        class("counter"),
        button().with([Modifier::from(on("click").to(clicks.clone())), Modifier::from("+1")]),
        child_stream(label),
    ]);

    let mounted = render(&context, &root.to_element(), tree)
        .now_or_never()
        .unwrap()
        .unwrap();
    pool.run_until_stalled();

    let counter = root.children()[0].clone();
    let button = counter.children()[0].clone();
    assert_eq!(counter.to_html(), "<div class=\"counter\"><button>+1</button></div>");

    button.dispatch("click", ());
    pool.run_until_stalled();
    assert_eq!(
        counter.to_html(),
        "<div class=\"counter\"><button>+1</button>last event: click</div>"
    );

    mounted.unmount().unwrap();
    pool.run_until_stalled();
    assert!(root.children().is_empty());
    assert_eq!(clicks.subscriber_count(), 0);
    assert_eq!(button.listener_count("click"), 0);
}

#[test]
fn log_config_reaches_the_facade() {
    let config = LogConfig::from_json(r#"{ "filter": "waterdom_core=debug" }"#).unwrap();
    assert_eq!(config.filter, "waterdom_core=debug");
    waterdom::log::info!(filter = %config.filter, "configuration parsed");
}
