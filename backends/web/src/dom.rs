use std::rc::Rc;

use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use waterdom_core::{
    Event, Result,
    attribute::AttrValue,
    patch::{Host, Listener},
};
use web_sys::{Document, Element, EventTarget, HtmlElement, Node, Window};

use crate::error::WebError;

/// The element a [`WebApp`](crate::WebApp) mounts into.
#[derive(Debug, Clone)]
pub struct DomRoot {
    document: Document,
    element: Element,
}

impl DomRoot {
    /// Creates a [`DomRoot`] pointing at the provided element id, or at a
    /// fresh `<div>` appended to `<body>`.
    ///
    /// # Errors
    ///
    /// Returns an error outside of a browser or if the element is missing.
    pub fn new(root_id: Option<&str>) -> Result<Self, WebError> {
        let window: Window = web_sys::window().ok_or(WebError::DomUnavailable)?;
        let document: Document = window.document().ok_or(WebError::DomUnavailable)?;

        let element = if let Some(id) = root_id {
            document
                .get_element_by_id(id)
                .ok_or_else(|| WebError::RootNotFound(id.to_string()))?
        } else {
            let body = document.body().ok_or(WebError::DomUnavailable)?;
            let host = document.create_element("div")?;
            host.set_id("waterdom-root");
            body.append_child(&host)?;
            host
        };

        Ok(Self { document, element })
    }

    /// Returns the owning document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Returns the mounting point as a container handle for the patch layer.
    #[must_use]
    pub fn container(&self) -> waterdom_core::Element {
        waterdom_core::Element::new(Node::from(self.element.clone()))
    }

    /// Clears the mounting element.
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM rejects a removal.
    pub fn clear(&self) -> Result<(), WebError> {
        while let Some(child) = self.element.first_child() {
            self.element.remove_child(&child)?;
        }
        Ok(())
    }

    /// Sets the CSS class name for the root element.
    pub fn set_class_name(&self, class_name: &str) {
        self.element.set_class_name(class_name);
    }
}

/// A [`Host`] over the browser document.
#[derive(Debug, Clone)]
pub struct WebHost {
    document: Document,
}

impl WebHost {
    /// Creates nodes in `document`.
    #[must_use]
    pub const fn new(document: Document) -> Self {
        Self { document }
    }

    /// Uses the document of the current window.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::DomUnavailable`] outside of a browser.
    pub fn from_window() -> Result<Self, WebError> {
        let window = web_sys::window().ok_or(WebError::DomUnavailable)?;
        Ok(Self::new(window.document().ok_or(WebError::DomUnavailable)?))
    }
}

fn js(op: &'static str) -> impl Fn(JsValue) -> waterdom_core::Error {
    move |value| WebError::from(value).into_host(op)
}

fn element<'a>(node: &'a Node, op: &'static str) -> Result<&'a Element> {
    node.dyn_ref::<Element>()
        .ok_or_else(|| waterdom_core::Error::host(op, "not an element"))
}

fn html_element<'a>(node: &'a Node, op: &'static str) -> Result<&'a HtmlElement> {
    node.dyn_ref::<HtmlElement>()
        .ok_or_else(|| waterdom_core::Error::host(op, "no inline style"))
}

fn to_js(value: &AttrValue) -> JsValue {
    match value {
        AttrValue::Str(value) => JsValue::from_str(value),
        AttrValue::Bool(value) => JsValue::from_bool(*value),
        AttrValue::Number(value) => JsValue::from_f64(*value),
    }
}

struct ListenerGuard {
    target: EventTarget,
    event: String,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Err(error) = self
            .target
            .remove_event_listener_with_callback(&self.event, self.closure.as_ref().unchecked_ref())
        {
            tracing::warn!(event = %self.event, error = %WebError::from(error), "failed to remove listener");
        }
    }
}

impl Host for WebHost {
    type Node = Node;

    fn create_element(&self, tag: &str) -> Result<Node> {
        self.document
            .create_element(tag)
            .map(Node::from)
            .map_err(js("create_element"))
    }

    fn create_text(&self, text: &str) -> Result<Node> {
        Ok(self.document.create_text_node(text).into())
    }

    fn set_text(&self, node: &Node, text: &str) -> Result<()> {
        if node.node_type() != Node::TEXT_NODE {
            return Err(waterdom_core::Error::host("set_text", "not a text node"));
        }
        node.set_text_content(Some(text));
        Ok(())
    }

    fn set_attribute(&self, node: &Node, name: &str, value: &str) -> Result<()> {
        element(node, "set_attribute")?
            .set_attribute(name, value)
            .map_err(js("set_attribute"))
    }

    fn remove_attribute(&self, node: &Node, name: &str) -> Result<()> {
        element(node, "remove_attribute")?
            .remove_attribute(name)
            .map_err(js("remove_attribute"))
    }

    fn set_property(&self, node: &Node, name: &str, value: &AttrValue) -> Result<()> {
        Reflect::set(node, &JsValue::from_str(name), &to_js(value))
            .map(|_| ())
            .map_err(js("set_property"))
    }

    fn remove_property(&self, node: &Node, name: &str) -> Result<()> {
        Reflect::delete_property(node.unchecked_ref::<Object>(), &JsValue::from_str(name))
            .map(|_| ())
            .map_err(js("remove_property"))
    }

    fn set_style(&self, node: &Node, name: &str, value: &str) -> Result<()> {
        html_element(node, "set_style")?
            .style()
            .set_property(name, value)
            .map_err(js("set_style"))
    }

    fn remove_style(&self, node: &Node, name: &str) -> Result<()> {
        html_element(node, "remove_style")?
            .style()
            .remove_property(name)
            .map(|_| ())
            .map_err(js("remove_style"))
    }

    fn insert_before(&self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<()> {
        parent
            .insert_before(child, reference)
            .map(|_| ())
            .map_err(js("insert_before"))
    }

    fn remove_child(&self, parent: &Node, child: &Node) -> Result<()> {
        parent
            .remove_child(child)
            .map(|_| ())
            .map_err(js("remove_child"))
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn next_sibling(&self, node: &Node) -> Option<Node> {
        node.next_sibling()
    }

    fn listen(&self, node: &Node, event: &str, handler: Rc<dyn Fn(Event)>) -> Result<Listener> {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |native: web_sys::Event| {
            handler(Event::new(native.type_(), native));
        });
        let target: EventTarget = node.clone().into();
        target
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .map_err(js("listen"))?;
        Ok(Listener::new(ListenerGuard {
            target,
            event: event.to_string(),
            closure,
        }))
    }
}
