//! The patch layer.
//!
//! [`Patch`] is the seam between reconciliation and the document. The bundled
//! implementation, [`DomPatcher`], diffs [`VNode`]s and drives any [`Host`]:
//! a browser document in `waterdom-web`, or the in-memory document in
//! [`memory`] for tests.
//!
//! Children are reconciled pairwise from both ends, falling back to a search by
//! sameness. Nodes whose subtree belongs to a reactive owner are kept as they
//! are when their parent is patched; the owner keeps them current.

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use alloc::{boxed::Box, collections::BTreeMap, rc::Rc, vec::Vec};
use core::{
    any::{Any, type_name},
    cell::RefCell,
    fmt::{self, Debug},
};

use crate::{
    Effect, Element, Error, Event, Result, Str,
    attribute::AttrValue,
    emitter::Emitter,
    hook::LifecycleHook,
    observable::Ack,
    runtime::Scheduler,
    vnode::{ElementVNode, VNode, VNodeData, same_owner},
};

/// Applies node descriptors to a document.
pub trait Patch {
    /// Creates `vnode` and appends it to `container`. Returns the node with its
    /// elements attached.
    ///
    /// # Errors
    ///
    /// Fails if the container is foreign to the host or the host rejects an
    /// operation.
    fn mount(&self, container: &Element, vnode: VNode) -> Result<VNode>;

    /// Updates the document so that `old` now looks like `new`.
    ///
    /// # Errors
    ///
    /// Fails if `old` was never mounted or the host rejects an operation.
    fn patch(&self, old: VNode, new: VNode) -> Result<VNode>;

    /// Removes a mounted node from the document and tears down its subtree.
    ///
    /// # Errors
    ///
    /// Fails if the host cannot remove the node.
    fn unmount(&self, vnode: VNode) -> Result<()>;

    /// Tears down a subtree without touching the document: destroy styles and
    /// hooks are applied, listeners removed and reactive owners notified.
    fn release(&self, vnode: &VNode);
}

impl Debug for dyn Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

/// Native node operations of a document.
pub trait Host {
    /// Handle to a native node.
    type Node: Clone + 'static;

    /// Creates an element.
    ///
    /// # Errors
    ///
    /// Fails if the host rejects the tag.
    fn create_element(&self, tag: &str) -> Result<Self::Node>;

    /// Creates a text node.
    ///
    /// # Errors
    ///
    /// Fails if the host cannot create text nodes.
    fn create_text(&self, text: &str) -> Result<Self::Node>;

    /// Replaces the content of a text node.
    ///
    /// # Errors
    ///
    /// Fails if `node` is not a text node.
    fn set_text(&self, node: &Self::Node, text: &str) -> Result<()>;

    /// Sets an attribute.
    ///
    /// # Errors
    ///
    /// Fails if the host rejects the name.
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<()>;

    /// Removes an attribute.
    ///
    /// # Errors
    ///
    /// Fails if `node` is not an element.
    fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<()>;

    /// Sets a property of the native object.
    ///
    /// # Errors
    ///
    /// Fails if the property cannot be written.
    fn set_property(&self, node: &Self::Node, name: &str, value: &AttrValue) -> Result<()>;

    /// Deletes a property of the native object.
    ///
    /// # Errors
    ///
    /// Fails if the property cannot be deleted.
    fn remove_property(&self, node: &Self::Node, name: &str) -> Result<()>;

    /// Sets an inline style.
    ///
    /// # Errors
    ///
    /// Fails if `node` has no inline style.
    fn set_style(&self, node: &Self::Node, name: &str, value: &str) -> Result<()>;

    /// Removes an inline style.
    ///
    /// # Errors
    ///
    /// Fails if `node` has no inline style.
    fn remove_style(&self, node: &Self::Node, name: &str) -> Result<()>;

    /// Inserts `child` into `parent` before `reference`, or at the end. Moves
    /// the child if it is already attached.
    ///
    /// # Errors
    ///
    /// Fails if `reference` is not a child of `parent`.
    fn insert_before(
        &self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<()>;

    /// Detaches `child` from `parent`.
    ///
    /// # Errors
    ///
    /// Fails if `child` is not a child of `parent`.
    fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    /// The parent of `node`, if attached.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// The sibling following `node`, if any.
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Registers `handler` for events of type `event`. The listener stays
    /// registered until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Fails if `node` cannot receive events.
    fn listen(&self, node: &Self::Node, event: &str, handler: Rc<dyn Fn(Event)>)
    -> Result<Listener>;
}

/// Keeps a native event listener registered. Dropping it removes the listener.
pub struct Listener {
    _guard: Box<dyn Any>,
}

impl Listener {
    /// Wraps the host specific registration. `guard` must unregister the
    /// listener when dropped.
    pub fn new(guard: impl Any) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").finish_non_exhaustive()
    }
}

struct ListenerEntry {
    emitters: Rc<RefCell<Vec<Emitter>>>,
    _listener: Listener,
}

/// Native listeners of one element, one per event type.
///
/// Patching swaps the emitters behind a registered listener instead of
/// re-registering it.
#[derive(Default)]
pub(crate) struct ListenerTable {
    entries: RefCell<BTreeMap<Str, ListenerEntry>>,
}

impl Debug for ListenerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.borrow().keys()).finish()
    }
}

impl ListenerTable {
    fn update<H: Host>(
        &self,
        host: &H,
        node: &H::Node,
        on: &BTreeMap<Str, Vec<Emitter>>,
        scheduler: &Rc<dyn Scheduler>,
    ) -> Result<()> {
        let stale: Vec<ListenerEntry> = {
            let mut entries = self.entries.borrow_mut();
            let removed: Vec<Str> = entries
                .keys()
                .filter(|event| !on.contains_key(*event))
                .cloned()
                .collect();
            removed
                .iter()
                .filter_map(|event| entries.remove(event))
                .collect()
        };
        drop(stale);

        for (event, emitters) in on {
            if let Some(entry) = self.entries.borrow().get(event) {
                entry.emitters.borrow_mut().clone_from(emitters);
                continue;
            }
            let shared = Rc::new(RefCell::new(emitters.clone()));
            let listener = host.listen(node, event, {
                let shared = Rc::clone(&shared);
                let scheduler = Rc::clone(scheduler);
                Rc::new(move |event: Event| dispatch(&shared, &scheduler, &event))
            })?;
            self.entries.borrow_mut().insert(
                event.clone(),
                ListenerEntry {
                    emitters: shared,
                    _listener: listener,
                },
            );
        }
        Ok(())
    }

    fn clear(&self) {
        let entries = core::mem::take(&mut *self.entries.borrow_mut());
        drop(entries);
    }
}

fn dispatch(emitters: &RefCell<Vec<Emitter>>, scheduler: &Rc<dyn Scheduler>, event: &Event) {
    let emitters = emitters.borrow().clone();
    for emitter in emitters {
        settle(scheduler, emitter.trigger(event.clone()), event.kind());
    }
}

fn settle(scheduler: &Rc<dyn Scheduler>, ack: Effect<Ack>, source: &str) {
    match ack {
        Effect::Ready(Ok(_)) => {}
        Effect::Ready(Err(error)) => {
            tracing::error!(%error, source, "observer rejected value");
        }
        Effect::Pending(ack) => {
            let source: Str = Str::Owned(source.into());
            scheduler.spawn(Box::pin(async move {
                if let Err(error) = ack.await {
                    tracing::error!(%error, %source, "observer rejected value");
                }
            }));
        }
    }
}

/// Diffs [`VNode`]s onto a [`Host`].
pub struct DomPatcher<H: Host> {
    host: H,
    scheduler: Rc<dyn Scheduler>,
}

impl<H: Host> Debug for DomPatcher<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomPatcher")
            .field("host", &type_name::<H>())
            .finish_non_exhaustive()
    }
}

type InsertQueue = Vec<ElementVNode>;

impl<H: Host> DomPatcher<H> {
    /// Creates a patcher. Asynchronous acknowledgments of emitters and hooks
    /// are driven on `scheduler`.
    pub fn new(host: H, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            host,
            scheduler: Rc::new(scheduler),
        }
    }

    /// The underlying host.
    pub const fn host(&self) -> &H {
        &self.host
    }

    fn node(element: &Element) -> Result<H::Node> {
        element
            .downcast_ref::<H::Node>()
            .cloned()
            .ok_or(Error::ForeignElement)
    }

    fn node_of(vnode: &VNode) -> Result<H::Node> {
        vnode.elm().ok_or(Error::NotMounted).and_then(Self::node)
    }

    fn fire<T: Clone>(&self, hooks: &[LifecycleHook<T>], value: &T) {
        for hook in hooks {
            settle(&self.scheduler, hook.fire(value.clone()), "hook");
        }
    }

    fn create(&self, vnode: &mut VNode, queue: &mut InsertQueue) -> Result<H::Node> {
        match vnode {
            VNode::Text(text) => {
                let node = self.host.create_text(&text.text)?;
                text.elm = Some(Element::new(node.clone()));
                Ok(node)
            }
            VNode::Element(element) => {
                let node = self.host.create_element(&element.tag)?;
                for child in &mut element.children {
                    let child = self.create(child, queue)?;
                    self.host.insert_before(&node, &child, None)?;
                }
                element.elm = Some(Element::new(node.clone()));
                self.update_data(&node, &VNodeData::default(), &element.data)?;
                self.update_listeners(&node, element)?;
                queue.push(element.clone());
                Ok(node)
            }
        }
    }

    fn flush(&self, queue: InsertQueue) {
        for vnode in queue {
            let Some(elm) = vnode.elm.clone() else {
                continue;
            };
            if let Ok(node) = Self::node(&elm) {
                self.apply_styles(&node, &vnode.data.delayed_style, "delayed");
            }
            self.fire(&vnode.data.hooks.insert, &elm);
            if let Some(owner) = &vnode.owner {
                owner.inserted(&vnode);
            }
        }
    }

    fn apply_styles(&self, node: &H::Node, styles: &BTreeMap<Str, Str>, moment: &str) {
        for (name, value) in styles {
            if let Err(error) = self.host.set_style(node, name, value) {
                tracing::warn!(%error, %name, moment, "failed to apply style");
            }
        }
    }

    fn write_attribute(&self, node: &H::Node, name: &str, value: &AttrValue) -> Result<()> {
        match value {
            AttrValue::Bool(false) => self.host.remove_attribute(node, name),
            AttrValue::Bool(true) => self.host.set_attribute(node, name, ""),
            AttrValue::Str(text) => self.host.set_attribute(node, name, text),
            AttrValue::Number(_) => self.host.set_attribute(node, name, &value.to_string()),
        }
    }

    fn update_data(&self, node: &H::Node, old: &VNodeData, new: &VNodeData) -> Result<()> {
        for name in old.attrs.keys().filter(|name| !new.attrs.contains_key(*name)) {
            self.host.remove_attribute(node, name)?;
        }
        for (name, value) in &new.attrs {
            if old.attrs.get(name) != Some(value) {
                self.write_attribute(node, name, value)?;
            }
        }

        for name in old.props.keys().filter(|name| !new.props.contains_key(*name)) {
            self.host.remove_property(node, name)?;
        }
        for (name, value) in &new.props {
            if old.props.get(name) != Some(value) {
                self.host.set_property(node, name, value)?;
            }
        }

        for name in old.style.keys().filter(|name| !new.style.contains_key(*name)) {
            self.host.remove_style(node, name)?;
        }
        for (name, value) in &new.style {
            if old.style.get(name) != Some(value) {
                self.host.set_style(node, name, value)?;
            }
        }

        // Delayed styles win over plain ones once the node is in the document.
        for name in old.delayed_style.keys().filter(|name| {
            !new.delayed_style.contains_key(*name) && !new.style.contains_key(*name)
        }) {
            self.host.remove_style(node, name)?;
        }
        for (name, value) in &new.delayed_style {
            if old.delayed_style.get(name) != Some(value) || old.style.get(name) != new.style.get(name) {
                self.host.set_style(node, name, value)?;
            }
        }
        Ok(())
    }

    fn update_listeners(&self, node: &H::Node, element: &mut ElementVNode) -> Result<()> {
        if element.listeners.is_none() && element.data.on.is_empty() {
            return Ok(());
        }
        let table = element.listeners.get_or_insert_with(Rc::default);
        table.update(&self.host, node, &element.data.on, &self.scheduler)
    }

    fn destroy(&self, vnode: &VNode) {
        let VNode::Element(element) = vnode else {
            return;
        };
        if let Some(elm) = &element.elm {
            if let Ok(node) = Self::node(elm) {
                self.apply_styles(&node, &element.data.destroy_style, "destroy");
            }
            self.fire(&element.data.hooks.destroy, elm);
        }
        if let Some(listeners) = &element.listeners {
            listeners.clear();
        }
        match &element.owner {
            Some(owner) => owner.destroyed(element),
            None => {
                for child in &element.children {
                    self.destroy(child);
                }
            }
        }
    }

    fn remove(&self, parent: &H::Node, vnode: &VNode) -> Result<()> {
        let node = Self::node_of(vnode)?;
        if let VNode::Element(element) = vnode {
            self.apply_styles(&node, &element.data.remove_style, "remove");
        }
        self.destroy(vnode);
        self.host.remove_child(parent, &node)
    }

    fn replace(&self, old: &VNode, mut new: VNode, queue: &mut InsertQueue) -> Result<VNode> {
        let old_node = Self::node_of(old)?;
        let node = self.create(&mut new, queue)?;
        if let Some(parent) = self.host.parent(&old_node) {
            self.host.insert_before(&parent, &node, Some(&old_node))?;
            self.remove(&parent, old)?;
        } else {
            tracing::warn!("replacing a detached node");
            self.destroy(old);
        }
        Ok(new)
    }

    fn patch_vnode(&self, old: VNode, new: VNode, queue: &mut InsertQueue) -> Result<VNode> {
        match (old, new) {
            (VNode::Text(old), VNode::Text(mut new)) => {
                let elm = old.elm.ok_or(Error::NotMounted)?;
                if old.text != new.text {
                    self.host.set_text(&Self::node(&elm)?, &new.text)?;
                }
                new.elm = Some(elm);
                Ok(VNode::Text(new))
            }
            (VNode::Element(old), VNode::Element(mut new)) => {
                self.patch_element(old, &mut new, queue)?;
                Ok(VNode::Element(new))
            }
            (old, new) => self.replace(&old, new, queue),
        }
    }

    fn patch_element(
        &self,
        old: ElementVNode,
        new: &mut ElementVNode,
        queue: &mut InsertQueue,
    ) -> Result<()> {
        let elm = old.elm.clone().ok_or(Error::NotMounted)?;
        let node = Self::node(&elm)?;
        new.elm = Some(elm.clone());
        let pair = (elm.clone(), elm);

        self.fire(&new.data.hooks.prepatch, &pair);
        self.update_data(&node, &old.data, &new.data)?;
        new.listeners = old.listeners;
        self.update_listeners(&node, new)?;
        self.fire(&new.data.hooks.update, &pair);
        self.update_children(&node, old.children, &mut new.children, queue)?;
        self.fire(&new.data.hooks.postpatch, &pair);
        Ok(())
    }

    /// Patches a child in place. A child still owned by the same reactive
    /// owner is kept as is.
    fn reconcile(&self, old: VNode, new: &mut VNode, queue: &mut InsertQueue) -> Result<()> {
        let kept = match (&old, &*new) {
            (VNode::Element(a), VNode::Element(b)) => {
                a.owner.is_some() && same_owner(a.owner.as_ref(), b.owner.as_ref())
            }
            _ => false,
        };
        if kept {
            *new = old;
            return Ok(());
        }
        let next = core::mem::replace(new, VNode::text(""));
        *new = self.patch_vnode(old, next, queue)?;
        Ok(())
    }

    fn update_children(
        &self,
        parent: &H::Node,
        old: Vec<VNode>,
        new: &mut [VNode],
        queue: &mut InsertQueue,
    ) -> Result<()> {
        let mut old: Vec<Option<VNode>> = old.into_iter().map(Some).collect();
        let (mut old_start, mut old_end) = (0, old.len());
        let (mut new_start, mut new_end) = (0, new.len());

        while old_start < old_end && new_start < new_end {
            let Some(old_first) = &old[old_start] else {
                old_start += 1;
                continue;
            };
            let Some(old_last) = &old[old_end - 1] else {
                old_end -= 1;
                continue;
            };

            if old_first.is_same(&new[new_start]) {
                let vnode = take(&mut old[old_start])?;
                self.reconcile(vnode, &mut new[new_start], queue)?;
                old_start += 1;
                new_start += 1;
            } else if old_last.is_same(&new[new_end - 1]) {
                let vnode = take(&mut old[old_end - 1])?;
                self.reconcile(vnode, &mut new[new_end - 1], queue)?;
                old_end -= 1;
                new_end -= 1;
            } else if old_first.is_same(&new[new_end - 1]) {
                let reference = self.host.next_sibling(&Self::node_of(old_last)?);
                let vnode = take(&mut old[old_start])?;
                self.reconcile(vnode, &mut new[new_end - 1], queue)?;
                let node = Self::node_of(&new[new_end - 1])?;
                self.host.insert_before(parent, &node, reference.as_ref())?;
                old_start += 1;
                new_end -= 1;
            } else if old_last.is_same(&new[new_start]) {
                let reference = Self::node_of(old_first)?;
                let vnode = take(&mut old[old_end - 1])?;
                self.reconcile(vnode, &mut new[new_start], queue)?;
                let node = Self::node_of(&new[new_start])?;
                self.host.insert_before(parent, &node, Some(&reference))?;
                old_end -= 1;
                new_start += 1;
            } else {
                let reference = Self::node_of(old_first)?;
                let found = (old_start..old_end).find(|&index| {
                    old[index]
                        .as_ref()
                        .is_some_and(|vnode| vnode.is_same(&new[new_start]))
                });
                let node = if let Some(index) = found {
                    let vnode = take(&mut old[index])?;
                    self.reconcile(vnode, &mut new[new_start], queue)?;
                    Self::node_of(&new[new_start])?
                } else {
                    self.create(&mut new[new_start], queue)?
                };
                self.host.insert_before(parent, &node, Some(&reference))?;
                new_start += 1;
            }
        }

        if new_start < new_end {
            let reference = match new.get(new_end) {
                Some(vnode) => Some(Self::node_of(vnode)?),
                None => None,
            };
            for vnode in &mut new[new_start..new_end] {
                let node = self.create(vnode, queue)?;
                self.host.insert_before(parent, &node, reference.as_ref())?;
            }
        }
        for vnode in old[old_start..old_end].iter_mut().filter_map(Option::take) {
            self.remove(parent, &vnode)?;
        }
        Ok(())
    }
}

fn take(slot: &mut Option<VNode>) -> Result<VNode> {
    slot.take().ok_or(Error::NotMounted)
}

impl<H: Host> Patch for DomPatcher<H> {
    fn mount(&self, container: &Element, mut vnode: VNode) -> Result<VNode> {
        let container = Self::node(container)?;
        let mut queue = Vec::new();
        let node = self.create(&mut vnode, &mut queue)?;
        self.host.insert_before(&container, &node, None)?;
        self.flush(queue);
        Ok(vnode)
    }

    fn patch(&self, old: VNode, mut new: VNode) -> Result<VNode> {
        if let Some(slot) = old.slot() {
            new.set_slot(slot);
        }
        let mut queue = Vec::new();
        let patched = if old.is_same(&new) {
            self.patch_vnode(old, new, &mut queue)?
        } else {
            self.replace(&old, new, &mut queue)?
        };
        self.flush(queue);
        Ok(patched)
    }

    fn unmount(&self, vnode: VNode) -> Result<()> {
        let node = Self::node_of(&vnode)?;
        match self.host.parent(&node) {
            Some(parent) => self.remove(&parent, &vnode),
            None => {
                self.destroy(&vnode);
                Ok(())
            }
        }
    }

    fn release(&self, vnode: &VNode) {
        self.destroy(vnode);
    }
}
