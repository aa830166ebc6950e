//! Virtual tree nodes.
//!
//! A [`VTree`] is an immutable tag plus an ordered list of [`Modifier`]s.
//! Composition appends modifiers and returns a new value; it may have to wait
//! for modifiers produced asynchronously, hence [`VTree::apply`] returns an
//! [`Effect`]. Conversion into a [`VNode`] happens only at render time.

use alloc::vec::Vec;

use crate::{
    Effect, Result, Str,
    modifier::{ChildVNode, Modifier, StaticVNode},
    receiver::ReactiveNode,
    runtime::RenderContext,
    separated::SeparatedModifiers,
    vnode::VNode,
};

/// A tag name decorated with modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct VTree {
    tag: Str,
    modifiers: Vec<Modifier>,
}

impl VTree {
    /// Creates a node without modifiers.
    pub fn new(tag: impl Into<Str>) -> Self {
        Self {
            tag: tag.into(),
            modifiers: Vec::new(),
        }
    }

    /// Tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Modifiers in declaration order.
    #[must_use]
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Appends `modifiers` once every one of them has resolved.
    ///
    /// The result stays ready when every modifier is ready. The first failing
    /// modifier, in declaration order, fails the whole composition.
    pub fn apply<I>(self, modifiers: I) -> Effect<Self>
    where
        I: IntoIterator,
        I::Item: Into<Effect<Modifier>>,
    {
        Effect::sequence(modifiers.into_iter().map(Into::into)).map(move |resolved| self.with(resolved))
    }

    /// Appends modifiers that are already resolved.
    #[must_use]
    pub fn with(mut self, modifiers: impl IntoIterator<Item = impl Into<Modifier>>) -> Self {
        self.modifiers.extend(modifiers.into_iter().map(Into::into));
        self
    }

    /// Classifies the modifiers.
    #[must_use]
    pub fn separate(&self) -> SeparatedModifiers {
        SeparatedModifiers::from_modifiers(&self.modifiers)
    }

    /// Converts the node into the patch layer's representation.
    ///
    /// A node with stream receivers becomes a reactive node: it subscribes
    /// once inserted and is patched on its own afterwards.
    ///
    /// # Errors
    ///
    /// Conversion of plain nodes cannot fail; the error is reserved for hosts
    /// and receivers that fail while the subtree is prepared.
    pub fn to_vnode(&self, context: &RenderContext) -> Result<VNode> {
        let separated = self.separate();
        if separated.has_stream() {
            return ReactiveNode::create(self.tag.clone(), separated, context);
        }
        let children = separated
            .children
            .iter()
            .filter_map(|child| match child {
                ChildVNode::Static(node) => Some(node.to_vnode(context)),
                ChildVNode::Stream(_) => None,
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(VNode::element(
            self.tag.clone(),
            separated.vnode_data(),
            children,
        ))
    }
}

impl Effect<VTree> {
    /// Chains [`VTree::apply`] onto a tree that may still be resolving.
    pub fn apply<I>(self, modifiers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Effect<Modifier>>,
    {
        let modifiers: Vec<Effect<Modifier>> = modifiers.into_iter().map(Into::into).collect();
        self.and_then(move |tree| tree.apply(modifiers))
    }
}

impl StaticVNode {
    /// Converts a static child.
    ///
    /// # Errors
    ///
    /// Propagates errors of [`VTree::to_vnode`].
    pub fn to_vnode(&self, context: &RenderContext) -> Result<VNode> {
        match self {
            Self::Text(text) => Ok(VNode::text(text.0.clone())),
            Self::Tree(tree) => tree.to_vnode(context),
        }
    }
}

/// Creates a node named `tag`.
pub fn tag(name: impl Into<Str>) -> VTree {
    VTree::new(name)
}
