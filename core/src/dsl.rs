//! Builder functions for modifiers and tags.
//!
//! ```
//! use waterdom_core::{Event, Handler, dsl::*, modifiers};
//!
//! let clicks = Handler::<Event>::default();
//! let view = div().apply(modifiers![
//!     attr("id").set("counter"),
//!     class("card"),
//!     style("opacity").set("0"),
//!     style("opacity").delayed("1"),
//!     on("click").to(clicks.clone()),
//!     child_stream(clicks.observable().map(|_| "clicked")),
//! ]);
//! assert!(view.is_ready());
//! ```

use alloc::rc::Rc;

use crate::{
    Element, Event, Str,
    attribute::{AccumAttr, AccumStyle, AttrValue, Attribute, Style, join_with},
    emitter::Emitter,
    hook::{Hook, LifecycleHook},
    modifier::{Key, KeyValue, StaticVNode},
    observable::{Observable, Observer, from_fn},
    receiver::{AttributeStreamReceiver, ChildStreamReceiver, ChildrenStreamReceiver},
    vtree::VTree,
};

/// Builds attributes titled `title`.
#[derive(Debug, Clone)]
pub struct AttrBuilder {
    title: Str,
}

/// Starts an attribute.
pub fn attr(title: impl Into<Str>) -> AttrBuilder {
    AttrBuilder {
        title: title.into(),
    }
}

impl AttrBuilder {
    /// A plain value.
    pub fn set(self, value: impl Into<AttrValue>) -> Attribute {
        Attribute::attr(self.title, value)
    }

    /// A value folded into earlier declarations with `f(previous, value)`.
    pub fn accum(
        self,
        value: impl Into<AttrValue>,
        f: impl Fn(&AttrValue, &AttrValue) -> AttrValue + 'static,
    ) -> AccumAttr {
        AccumAttr::new(self.title, value, f)
    }

    /// A value driven by `values`.
    pub fn stream<V: Into<AttrValue> + 'static>(self, values: Observable<V>) -> AttributeStreamReceiver {
        let title = self.title.clone();
        AttributeStreamReceiver::new(
            self.title,
            values.map(move |value| Attribute::attr(title.clone(), value)),
        )
    }
}

/// Adds `name` to the `class` attribute.
pub fn class(name: impl Into<AttrValue>) -> AccumAttr {
    AccumAttr::new("class", name, join_with(" "))
}

/// Builds properties titled `title`.
#[derive(Debug, Clone)]
pub struct PropBuilder {
    title: Str,
}

/// Starts a property.
pub fn prop(title: impl Into<Str>) -> PropBuilder {
    PropBuilder {
        title: title.into(),
    }
}

impl PropBuilder {
    /// A fixed value.
    pub fn set(self, value: impl Into<AttrValue>) -> Attribute {
        Attribute::prop(self.title, value)
    }

    /// A value driven by `values`.
    pub fn stream<V: Into<AttrValue> + 'static>(self, values: Observable<V>) -> AttributeStreamReceiver {
        let title = self.title.clone();
        AttributeStreamReceiver::new(
            self.title,
            values.map(move |value| Attribute::prop(title.clone(), value)),
        )
    }
}

/// Builds styles titled `title`.
#[derive(Debug, Clone)]
pub struct StyleBuilder {
    title: Str,
}

/// Starts a style declaration.
pub fn style(title: impl Into<Str>) -> StyleBuilder {
    StyleBuilder {
        title: title.into(),
    }
}

impl StyleBuilder {
    /// Applied on creation and every patch.
    pub fn set(self, value: impl Into<Str>) -> Style {
        Style::Basic {
            title: self.title,
            value: value.into(),
        }
    }

    /// Applied after insertion.
    pub fn delayed(self, value: impl Into<Str>) -> Style {
        Style::Delayed {
            title: self.title,
            value: value.into(),
        }
    }

    /// Applied before removal.
    pub fn remove(self, value: impl Into<Str>) -> Style {
        Style::Remove {
            title: self.title,
            value: value.into(),
        }
    }

    /// Applied on destruction.
    pub fn destroy(self, value: impl Into<Str>) -> Style {
        Style::Destroy {
            title: self.title,
            value: value.into(),
        }
    }

    /// Folded into earlier declarations with `f(previous, value)`.
    pub fn accum(self, value: impl Into<Str>, f: impl Fn(&Str, &Str) -> Str + 'static) -> AccumStyle {
        AccumStyle::new(self.title, value, f)
    }

    /// A value driven by `values`.
    pub fn stream<V: Into<Str> + 'static>(self, values: Observable<V>) -> AttributeStreamReceiver {
        let title = self.title.clone();
        AttributeStreamReceiver::new(
            self.title,
            values.map(move |value| {
                Attribute::style(Style::Basic {
                    title: title.clone(),
                    value: value.into(),
                })
            }),
        )
    }
}

/// Sibling identity.
pub fn key(value: impl Into<KeyValue>) -> Key {
    Key(value.into())
}

/// Observes the element after insertion.
pub fn on_insert(f: impl Fn(Element) + 'static) -> Hook {
    Hook::Insert(LifecycleHook::new(from_fn(f)))
}

/// Observes `(old, new)` before a patch.
pub fn on_prepatch(f: impl Fn((Element, Element)) + 'static) -> Hook {
    Hook::PrePatch(LifecycleHook::new(from_fn(f)))
}

/// Observes `(old, new)` while the element is updated.
pub fn on_update(f: impl Fn((Element, Element)) + 'static) -> Hook {
    Hook::Update(LifecycleHook::new(from_fn(f)))
}

/// Observes `(old, new)` after a patch.
pub fn on_postpatch(f: impl Fn((Element, Element)) + 'static) -> Hook {
    Hook::PostPatch(LifecycleHook::new(from_fn(f)))
}

/// Observes the element before removal.
pub fn on_destroy(f: impl Fn(Element) + 'static) -> Hook {
    Hook::Destroy(LifecycleHook::new(from_fn(f)))
}

/// Builds an [`Emitter`], mapping events to `T` first.
pub struct EmitterBuilder<T> {
    event_type: Str,
    map: Rc<dyn Fn(Event) -> T>,
}

impl<T> core::fmt::Debug for EmitterBuilder<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmitterBuilder")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

/// Starts an emitter for events of type `event_type`.
pub fn on(event_type: impl Into<Str>) -> EmitterBuilder<Event> {
    EmitterBuilder {
        event_type: event_type.into(),
        map: Rc::new(|event: Event| event),
    }
}

impl<T: 'static> EmitterBuilder<T> {
    /// Maps values before they are emitted.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> EmitterBuilder<U> {
        let map = self.map;
        EmitterBuilder {
            event_type: self.event_type,
            map: Rc::new(move |event: Event| f(map(event))),
        }
    }

    /// Emits into `observer`.
    pub fn to(self, observer: impl Observer<T> + 'static) -> Emitter {
        let map = self.map;
        Emitter::new(self.event_type, move |event| observer.on_next(map(event)))
    }

    /// Emits into a closure.
    pub fn call(self, f: impl Fn(T) + 'static) -> Emitter {
        self.to(from_fn(f))
    }
}

/// A child replaced by every value of `nodes`.
pub fn child_stream<N: Into<StaticVNode> + 'static>(nodes: Observable<N>) -> ChildStreamReceiver {
    ChildStreamReceiver::from_nodes(nodes)
}

/// Children replaced by every list emitted by `nodes`.
pub fn children_stream<I>(nodes: Observable<I>) -> ChildrenStreamReceiver
where
    I: IntoIterator + 'static,
    I::Item: Into<StaticVNode>,
{
    ChildrenStreamReceiver::from_nodes(nodes)
}

macro_rules! tags {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("Creates a `<", stringify!($name), ">` node.")]
            #[must_use]
            pub fn $name() -> VTree {
                VTree::new(stringify!($name))
            }
        )*
    };
}

tags! {
    a, article, aside, button, code, div, em, footer, form, h1, h2, h3, header,
    img, input, label, li, nav, ol, p, pre, section, select, span, strong, table,
    tbody, td, textarea, th, thead, tr, ul,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Effect, Modifier, handler::Handler, observable::Ack};
    use futures::{FutureExt, StreamExt};

    #[test]
    fn class_accumulates_with_spaces() {
        let data = div().with([class("a"), class("b")]).separate().vnode_data();
        assert_eq!(data.attrs["class"], AttrValue::from("a b"));
    }

    #[test]
    fn mapped_emitter_feeds_a_handler() {
        let handler = Handler::<usize>::default();
        let mut values = handler.subscribe();
        let emitter = on("input").map(|event: Event| event.kind().len()).to(handler.clone());
        let ack = emitter.trigger(Event::new("input", ())).now_or_never();
        assert!(matches!(ack, Some(Ok(Ack::Continue))));
        assert!(matches!(values.next().now_or_never(), Some(Some(Ok(5)))));
    }

    #[test]
    fn stream_builders_mark_the_tree_reactive() {
        let tree = div().with([
            Modifier::from(attr("title").stream(Observable::from_values(["x"]))),
            Modifier::from(style("color").set("red")),
        ]);
        assert!(tree.separate().has_stream());
        let tree = span().with([child_stream(Observable::from_values(["x"]))]);
        assert!(tree.separate().has_stream());
        let _: Effect<VTree> = ul().apply([key(1)]);
    }
}
