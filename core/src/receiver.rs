//! Stream receivers and the reactive nodes that own them.
//!
//! A receiver is a placeholder whose content comes from an [`Observable`]. The
//! element declaring receivers converts into a node owned by a
//! [`ReactiveNode`], which subscribes once the element is inserted and patches
//! only that element on every emission. Its subscription lives in a [`Scope`]
//! that is cancelled when the patch layer destroys the element.

use alloc::{
    rc::{Rc, Weak},
    vec,
    vec::Vec,
};
use core::{
    cell::RefCell,
    fmt::{self, Debug},
};

use futures::{
    StreamExt,
    stream::{self, LocalBoxStream},
};

use crate::{
    Effect, Error, Result, Str,
    attribute::Attribute,
    modifier::{ChildVNode, StaticVNode, StreamVNode},
    observable::Observable,
    runtime::{RenderContext, Scope, Subscription},
    separated::SeparatedModifiers,
    vnode::{ElementVNode, SubtreeOwner, VNode},
};

/// A single child supplied by a stream. Every emission replaces the child.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildStreamReceiver {
    stream: Observable<Effect<StaticVNode>>,
}

impl ChildStreamReceiver {
    /// Wraps a stream of possibly asynchronous nodes.
    #[must_use]
    pub const fn new(stream: Observable<Effect<StaticVNode>>) -> Self {
        Self { stream }
    }

    /// Wraps a stream of ready nodes.
    #[must_use]
    pub fn from_nodes<N: Into<StaticVNode> + 'static>(stream: Observable<N>) -> Self {
        Self::new(stream.map(|node| Effect::ready(node.into())))
    }

    /// The underlying stream.
    #[must_use]
    pub const fn stream(&self) -> &Observable<Effect<StaticVNode>> {
        &self.stream
    }
}

/// An ordered list of children supplied by a stream. Every emission replaces
/// the whole list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildrenStreamReceiver {
    stream: Observable<Effect<Vec<StaticVNode>>>,
}

impl ChildrenStreamReceiver {
    /// Wraps a stream of possibly asynchronous node lists.
    #[must_use]
    pub const fn new(stream: Observable<Effect<Vec<StaticVNode>>>) -> Self {
        Self { stream }
    }

    /// Wraps a stream of ready node lists.
    #[must_use]
    pub fn from_nodes<I>(stream: Observable<I>) -> Self
    where
        I: IntoIterator + 'static,
        I::Item: Into<StaticVNode>,
    {
        Self::new(stream.map(|nodes| Effect::ready(nodes.into_iter().map(Into::into).collect())))
    }

    /// The underlying stream.
    #[must_use]
    pub const fn stream(&self) -> &Observable<Effect<Vec<StaticVNode>>> {
        &self.stream
    }
}

/// An attribute whose value is supplied by a stream.
///
/// The latest emission is applied after the static attributes of the element,
/// so it overrides a plain attribute of the same title and folds onto an
/// accumulating one. Emissions are always applied under the receiver's title,
/// whatever title they carry.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeStreamReceiver {
    title: Str,
    stream: Observable<Attribute>,
}

impl AttributeStreamReceiver {
    /// Binds `stream` to the attribute `title`.
    pub fn new(title: impl Into<Str>, stream: Observable<Attribute>) -> Self {
        Self {
            title: title.into(),
            stream,
        }
    }

    /// Title of the driven attribute.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The underlying stream.
    #[must_use]
    pub const fn stream(&self) -> &Observable<Attribute> {
        &self.stream
    }
}

enum Update {
    Children {
        slot: usize,
        nodes: Effect<Vec<StaticVNode>>,
    },
    Attribute {
        index: usize,
        attribute: Attribute,
    },
}

/// The binding between an element declaring receivers and the document.
///
/// Children are kept per declaration slot: static slots are converted once,
/// stream slots start empty and are replaced by every emission.
pub(crate) struct ReactiveNode {
    this: Weak<Self>,
    tag: Str,
    base: SeparatedModifiers,
    slots: RefCell<Vec<Vec<VNode>>>,
    attributes: RefCell<Vec<Option<Attribute>>>,
    current: RefCell<Option<VNode>>,
    scope: Scope,
    context: RenderContext,
}

impl Debug for ReactiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveNode")
            .field("tag", &self.tag)
            .field("subscriptions", &self.scope.len())
            .finish_non_exhaustive()
    }
}

impl ReactiveNode {
    /// Converts the static children and returns the initial node.
    pub(crate) fn create(
        tag: Str,
        base: SeparatedModifiers,
        context: &RenderContext,
    ) -> Result<VNode> {
        let slots = base
            .children
            .iter()
            .map(|child| match child {
                ChildVNode::Static(node) => Ok(vec![node.to_vnode(context)?]),
                ChildVNode::Stream(_) => Ok(Vec::new()),
            })
            .collect::<Result<Vec<_>>>()?;
        let attributes = vec![None; base.attribute_receivers.len()];
        let node = Rc::new_cyclic(|this| Self {
            this: Weak::clone(this),
            tag,
            base,
            slots: RefCell::new(slots),
            attributes: RefCell::new(attributes),
            current: RefCell::new(None),
            scope: Scope::new(),
            context: context.clone(),
        });
        Ok(node.build())
    }

    fn build(&self) -> VNode {
        let latest: Vec<Attribute> = self.attributes.borrow().iter().flatten().cloned().collect();
        let children = self
            .slots
            .borrow()
            .iter()
            .enumerate()
            .flat_map(|(slot, nodes)| {
                nodes.iter().cloned().map(move |mut node| {
                    node.set_slot(slot);
                    node
                })
            })
            .collect();
        let mut vnode = VNode::element(self.tag.clone(), self.base.vnode_data_with(&latest), children);
        if let VNode::Element(element) = &mut vnode {
            element.owner = self
                .this
                .upgrade()
                .map(|owner| owner as Rc<dyn SubtreeOwner>);
        }
        vnode
    }

    fn updates(&self) -> LocalBoxStream<'static, Result<Update>> {
        let mut streams: Vec<LocalBoxStream<'static, Result<Update>>> = Vec::new();
        for (slot, child) in self.base.children.iter().enumerate() {
            match child {
                ChildVNode::Stream(StreamVNode::Child(receiver)) => streams.push(
                    receiver
                        .stream()
                        .subscribe()
                        .map(move |item| {
                            item.map(|node| Update::Children {
                                slot,
                                nodes: node.map(|node| vec![node]),
                            })
                        })
                        .boxed_local(),
                ),
                ChildVNode::Stream(StreamVNode::Children(receiver)) => streams.push(
                    receiver
                        .stream()
                        .subscribe()
                        .map(move |item| item.map(|nodes| Update::Children { slot, nodes }))
                        .boxed_local(),
                ),
                ChildVNode::Static(_) => {}
            }
        }
        for (index, receiver) in self.base.attribute_receivers.iter().enumerate() {
            let title = receiver.title.clone();
            streams.push(
                receiver
                    .stream()
                    .subscribe()
                    .map(move |item| {
                        item.map(|attribute| Update::Attribute {
                            index,
                            attribute: attribute.retitled(title.clone()),
                        })
                    })
                    .boxed_local(),
            );
        }
        stream::select_all(streams).boxed_local()
    }

    async fn run(this: Weak<Self>, mut updates: LocalBoxStream<'static, Result<Update>>) {
        while let Some(item) = updates.next().await {
            let outcome = match item {
                Ok(Update::Children { slot, nodes }) => {
                    let nodes = nodes.await;
                    let Some(node) = live(&this) else { return };
                    nodes.and_then(|nodes| node.replace_slot(slot, &nodes))
                }
                Ok(Update::Attribute { index, attribute }) => {
                    let Some(node) = live(&this) else { return };
                    node.replace_attribute(index, attribute)
                }
                Err(error) => Err(error),
            };
            if let Err(error) = outcome {
                if let Some(node) = live(&this) {
                    node.context.report_error(&error);
                }
                return;
            }
        }
    }

    fn replace_slot(&self, slot: usize, nodes: &[StaticVNode]) -> Result<()> {
        let nodes = nodes
            .iter()
            .map(|node| node.to_vnode(&self.context))
            .collect::<Result<Vec<_>>>()?;
        tracing::trace!(tag = %self.tag, slot, len = nodes.len(), "stream children emitted");
        let mut slots = self.slots.borrow_mut();
        let entry = slots
            .get_mut(slot)
            .ok_or_else(|| Error::stream("emission for an unknown child slot"))?;
        *entry = nodes;
        drop(slots);
        self.repatch()
    }

    fn replace_attribute(&self, index: usize, attribute: Attribute) -> Result<()> {
        tracing::trace!(tag = %self.tag, title = ?attribute.title(), "stream attribute emitted");
        let mut attributes = self.attributes.borrow_mut();
        let entry = attributes
            .get_mut(index)
            .ok_or_else(|| Error::stream("emission for an unknown attribute stream"))?;
        *entry = Some(attribute);
        drop(attributes);
        self.repatch()
    }

    fn repatch(&self) -> Result<()> {
        // `current` stays the last mounted tree until a patch succeeds, so a
        // failed patch still lets teardown reach every nested owner.
        let old = self.current.borrow().clone().ok_or(Error::NotMounted)?;
        let patched = self.context.patcher().patch(old, self.build())?;
        *self.current.borrow_mut() = Some(patched);
        Ok(())
    }
}

fn live(node: &Weak<ReactiveNode>) -> Option<Rc<ReactiveNode>> {
    node.upgrade().filter(|node| !node.scope.is_cancelled())
}

impl SubtreeOwner for ReactiveNode {
    fn inserted(&self, vnode: &ElementVNode) {
        *self.current.borrow_mut() = Some(VNode::Element(vnode.clone()));
        if self.scope.is_cancelled() || !self.scope.is_empty() {
            return;
        }
        tracing::debug!(
            tag = %self.tag,
            children = self.base.children.iter().filter(|child| child.is_stream()).count(),
            attributes = self.base.attribute_receivers.len(),
            "subscribing reactive node"
        );
        let task = Self::run(Weak::clone(&self.this), self.updates());
        self.scope
            .add(Subscription::spawn(self.context.scheduler(), task));
    }

    fn destroyed(&self, vnode: &ElementVNode) {
        tracing::debug!(tag = %self.tag, "tearing down reactive node");
        self.scope.cancel();
        let current = self.current.borrow_mut().take();
        let children = match &current {
            Some(VNode::Element(current)) => &current.children,
            _ => &vnode.children,
        };
        for child in children {
            self.context.patcher().release(child);
        }
    }
}
