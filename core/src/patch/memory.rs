//! An in-memory document for tests.
//!
//! Every node operation that changes the document bumps a shared write
//! counter, so tests can assert that a torn-down subtree is never written to.

use alloc::{
    collections::BTreeMap,
    format,
    rc::{Rc, Weak},
    string::{String, ToString},
    vec::Vec,
};
use core::{
    cell::{Cell, RefCell},
    fmt::{self, Debug, Write as _},
};

use super::{Host, Listener};
use crate::{Element, Error, Event, Result, attribute::AttrValue};

type Handler = Rc<dyn Fn(Event)>;

struct RegisteredListener {
    id: u64,
    event: String,
    handler: Handler,
}

enum Content {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        properties: BTreeMap<String, AttrValue>,
        styles: BTreeMap<String, String>,
        listeners: Vec<RegisteredListener>,
    },
    Text(String),
}

struct NodeInner {
    content: Content,
    children: Vec<MemoryNode>,
    parent: Weak<RefCell<NodeInner>>,
}

/// A node of the in-memory document. Clones share the node.
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<NodeInner>>);

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryNode {}

impl Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

impl MemoryNode {
    fn new(content: Content) -> Self {
        Self(Rc::new(RefCell::new(NodeInner {
            content,
            children: Vec::new(),
            parent: Weak::new(),
        })))
    }

    fn element(tag: &str) -> Self {
        Self::new(Content::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            properties: BTreeMap::new(),
            styles: BTreeMap::new(),
            listeners: Vec::new(),
        })
    }

    /// Returns the node behind an element handle.
    #[must_use]
    pub fn from_element(element: &Element) -> Option<Self> {
        element.downcast_ref::<Self>().cloned()
    }

    /// Wraps the node in an element handle, e.g. to use it as a mount container.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element::new(self.clone())
    }

    /// Serializes the subtree. Attributes come first, then a `style` attribute
    /// built from the inline styles; properties are not serialized.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let inner = self.0.borrow();
        match &inner.content {
            Content::Text(text) => out.push_str(text),
            Content::Element {
                tag,
                attributes,
                styles,
                ..
            } => {
                let _ = write!(out, "<{tag}");
                for (name, value) in attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{value}\"");
                    }
                }
                if !styles.is_empty() {
                    let style: Vec<String> = styles
                        .iter()
                        .map(|(name, value)| format!("{name}: {value};"))
                        .collect();
                    let _ = write!(out, " style=\"{}\"", style.join(" "));
                }
                out.push('>');
                for child in &inner.children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    /// Concatenated text of the subtree.
    #[must_use]
    pub fn text_content(&self) -> String {
        let inner = self.0.borrow();
        match &inner.content {
            Content::Text(text) => text.clone(),
            Content::Element { .. } => inner.children.iter().map(Self::text_content).collect(),
        }
    }

    /// Tag name, or `None` for text nodes.
    #[must_use]
    pub fn tag(&self) -> Option<String> {
        match &self.0.borrow().content {
            Content::Element { tag, .. } => Some(tag.clone()),
            Content::Text(_) => None,
        }
    }

    /// Value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.0.borrow().content {
            Content::Element { attributes, .. } => attributes.get(name).cloned(),
            Content::Text(_) => None,
        }
    }

    /// Value of a property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<AttrValue> {
        match &self.0.borrow().content {
            Content::Element { properties, .. } => properties.get(name).cloned(),
            Content::Text(_) => None,
        }
    }

    /// Value of an inline style.
    #[must_use]
    pub fn style(&self, name: &str) -> Option<String> {
        match &self.0.borrow().content {
            Content::Element { styles, .. } => styles.get(name).cloned(),
            Content::Text(_) => None,
        }
    }

    /// Child nodes in document order.
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        self.0.borrow().children.clone()
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        match &self.0.borrow().content {
            Content::Element { listeners, .. } => listeners
                .iter()
                .filter(|listener| listener.event == event)
                .count(),
            Content::Text(_) => 0,
        }
    }

    /// Delivers an event with `payload` to every listener of `event`.
    pub fn dispatch<P: 'static>(&self, event: &str, payload: P) {
        let handlers: Vec<Handler> = match &self.0.borrow().content {
            Content::Element { listeners, .. } => listeners
                .iter()
                .filter(|listener| listener.event == event)
                .map(|listener| Rc::clone(&listener.handler))
                .collect(),
            Content::Text(_) => Vec::new(),
        };
        let event = Event::new(String::from(event), payload);
        for handler in handlers {
            handler(event.clone());
        }
    }

    fn parent(&self) -> Option<Self> {
        self.0.borrow().parent.upgrade().map(Self)
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.0.borrow_mut().children.retain(|child| child != self);
        }
        self.0.borrow_mut().parent = Weak::new();
    }
}

struct ListenerGuard {
    node: Weak<RefCell<NodeInner>>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Some(node) = self.node.upgrade() else {
            return;
        };
        let Ok(mut inner) = node.try_borrow_mut() else {
            return;
        };
        if let Content::Element { listeners, .. } = &mut inner.content {
            listeners.retain(|listener| listener.id != self.id);
        }
    }
}

/// A [`Host`] over [`MemoryNode`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    writes: Rc<Cell<usize>>,
    next_listener: Rc<Cell<u64>>,
}

impl MemoryHost {
    /// Creates a host with a zeroed write counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached `div` to mount trees into.
    #[must_use]
    pub fn root(&self) -> MemoryNode {
        MemoryNode::element("div")
    }

    /// Number of document writes performed so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    fn write(&self) {
        self.writes.set(self.writes.get() + 1);
    }
}

fn with_element<T>(
    node: &MemoryNode,
    op: &'static str,
    f: impl FnOnce(
        &mut BTreeMap<String, String>,
        &mut BTreeMap<String, AttrValue>,
        &mut BTreeMap<String, String>,
    ) -> T,
) -> Result<T> {
    match &mut node.0.borrow_mut().content {
        Content::Element {
            attributes,
            properties,
            styles,
            ..
        } => Ok(f(attributes, properties, styles)),
        Content::Text(_) => Err(Error::host(op, "not an element")),
    }
}

impl Host for MemoryHost {
    type Node = MemoryNode;

    fn create_element(&self, tag: &str) -> Result<MemoryNode> {
        if tag.is_empty() {
            return Err(Error::host("create_element", "empty tag"));
        }
        self.write();
        Ok(MemoryNode::element(tag))
    }

    fn create_text(&self, text: &str) -> Result<MemoryNode> {
        self.write();
        Ok(MemoryNode::new(Content::Text(text.to_string())))
    }

    fn set_text(&self, node: &MemoryNode, text: &str) -> Result<()> {
        match &mut node.0.borrow_mut().content {
            Content::Text(content) => {
                text.clone_into(content);
                self.write();
                Ok(())
            }
            Content::Element { .. } => Err(Error::host("set_text", "not a text node")),
        }
    }

    fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) -> Result<()> {
        self.write();
        with_element(node, "set_attribute", |attributes, _, _| {
            attributes.insert(name.to_string(), value.to_string());
        })
    }

    fn remove_attribute(&self, node: &MemoryNode, name: &str) -> Result<()> {
        self.write();
        with_element(node, "remove_attribute", |attributes, _, _| {
            attributes.remove(name);
        })
    }

    fn set_property(&self, node: &MemoryNode, name: &str, value: &AttrValue) -> Result<()> {
        self.write();
        with_element(node, "set_property", |_, properties, _| {
            properties.insert(name.to_string(), value.clone());
        })
    }

    fn remove_property(&self, node: &MemoryNode, name: &str) -> Result<()> {
        self.write();
        with_element(node, "remove_property", |_, properties, _| {
            properties.remove(name);
        })
    }

    fn set_style(&self, node: &MemoryNode, name: &str, value: &str) -> Result<()> {
        self.write();
        with_element(node, "set_style", |_, _, styles| {
            styles.insert(name.to_string(), value.to_string());
        })
    }

    fn remove_style(&self, node: &MemoryNode, name: &str) -> Result<()> {
        self.write();
        with_element(node, "remove_style", |_, _, styles| {
            styles.remove(name);
        })
    }

    fn insert_before(
        &self,
        parent: &MemoryNode,
        child: &MemoryNode,
        reference: Option<&MemoryNode>,
    ) -> Result<()> {
        if matches!(parent.0.borrow().content, Content::Text(_)) {
            return Err(Error::host("insert_before", "text nodes have no children"));
        }
        if reference == Some(child) {
            return Ok(());
        }
        child.detach();
        let mut inner = parent.0.borrow_mut();
        let index = match reference {
            Some(reference) => inner
                .children
                .iter()
                .position(|node| node == reference)
                .ok_or_else(|| Error::host("insert_before", "reference is not a child"))?,
            None => inner.children.len(),
        };
        inner.children.insert(index, child.clone());
        drop(inner);
        child.0.borrow_mut().parent = Rc::downgrade(&parent.0);
        self.write();
        Ok(())
    }

    fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) -> Result<()> {
        if child.parent().as_ref() != Some(parent) {
            return Err(Error::host("remove_child", "node is not a child"));
        }
        child.detach();
        self.write();
        Ok(())
    }

    fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
        node.parent()
    }

    fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
        let parent = node.parent()?;
        let inner = parent.0.borrow();
        let index = inner.children.iter().position(|child| child == node)?;
        inner.children.get(index + 1).cloned()
    }

    fn listen(
        &self,
        node: &MemoryNode,
        event: &str,
        handler: Rc<dyn Fn(Event)>,
    ) -> Result<Listener> {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        match &mut node.0.borrow_mut().content {
            Content::Element { listeners, .. } => listeners.push(RegisteredListener {
                id,
                event: event.to_string(),
                handler,
            }),
            Content::Text(_) => return Err(Error::host("listen", "not an element")),
        }
        Ok(Listener::new(ListenerGuard {
            node: Rc::downgrade(&node.0),
            id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_moves_attached_nodes() {
        let host = MemoryHost::new();
        let root = host.root();
        let a = host.create_text("a").unwrap();
        let b = host.create_text("b").unwrap();
        host.insert_before(&root, &a, None).unwrap();
        host.insert_before(&root, &b, None).unwrap();
        host.insert_before(&root, &b, Some(&a)).unwrap();
        assert_eq!(root.text_content(), "ba");
        assert_eq!(host.next_sibling(&b), Some(a.clone()));
        assert_eq!(host.parent(&a), Some(root));
    }

    #[test]
    fn dropping_the_guard_removes_the_listener() {
        let host = MemoryHost::new();
        let node = host.create_element("button").unwrap();
        let hits = Rc::new(Cell::new(0));
        let guard = host
            .listen(&node, "click", {
                let hits = Rc::clone(&hits);
                Rc::new(move |_| hits.set(hits.get() + 1))
            })
            .unwrap();
        node.dispatch("click", ());
        drop(guard);
        node.dispatch("click", ());
        assert_eq!(hits.get(), 1);
        assert_eq!(node.listener_count("click"), 0);
    }

    #[test]
    fn serializes_attributes_and_styles() {
        let host = MemoryHost::new();
        let node = host.create_element("input").unwrap();
        host.set_attribute(&node, "disabled", "").unwrap();
        host.set_attribute(&node, "id", "name").unwrap();
        host.set_style(&node, "color", "red").unwrap();
        assert_eq!(
            node.to_html(),
            "<input disabled id=\"name\" style=\"color: red;\"></input>"
        );
    }
}
