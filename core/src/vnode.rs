//! The native node descriptor consumed by the patch layer.

use alloc::{collections::BTreeMap, rc::Rc, vec::Vec};
use core::fmt::{self, Debug};

use crate::{
    Element, Str,
    attribute::AttrValue,
    emitter::Emitter,
    hook::Hooks,
    modifier::KeyValue,
    patch::ListenerTable,
};

/// Everything the patch layer needs to know about an element besides its tag
/// and children. Maps are keyed by title; the classifier has already resolved
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VNodeData {
    /// DOM attributes.
    pub attrs: BTreeMap<Str, AttrValue>,
    /// DOM properties.
    pub props: BTreeMap<Str, AttrValue>,
    /// Styles applied on creation and patch.
    pub style: BTreeMap<Str, Str>,
    /// Styles applied after insertion.
    pub delayed_style: BTreeMap<Str, Str>,
    /// Styles applied right before removal.
    pub remove_style: BTreeMap<Str, Str>,
    /// Styles applied on destruction.
    pub destroy_style: BTreeMap<Str, Str>,
    /// Sibling identity.
    pub key: Option<KeyValue>,
    /// Emitters grouped by event type.
    pub on: BTreeMap<Str, Vec<Emitter>>,
    /// Lifecycle hooks.
    pub hooks: Hooks,
}

/// Takes over a subtree whose children change on their own.
///
/// The patch layer keeps an owned node as is when its parent is patched, and
/// leaves the teardown of its children to the owner.
pub(crate) trait SubtreeOwner {
    fn inserted(&self, vnode: &ElementVNode);
    fn destroyed(&self, vnode: &ElementVNode);
}

/// An element node.
#[derive(Clone)]
pub struct ElementVNode {
    /// Tag name.
    pub tag: Str,
    /// Attributes, styles, emitters and hooks.
    pub data: VNodeData,
    /// Child nodes in document order.
    pub children: Vec<VNode>,
    pub(crate) elm: Option<Element>,
    pub(crate) slot: Option<usize>,
    pub(crate) owner: Option<Rc<dyn SubtreeOwner>>,
    pub(crate) listeners: Option<Rc<ListenerTable>>,
}

impl Debug for ElementVNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementVNode")
            .field("tag", &self.tag)
            .field("data", &self.data)
            .field("children", &self.children)
            .field("elm", &self.elm)
            .field("slot", &self.slot)
            .field("reactive", &self.owner.is_some())
            .finish_non_exhaustive()
    }
}

impl PartialEq for ElementVNode {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.data == other.data
            && self.children == other.children
            && self.elm == other.elm
            && self.slot == other.slot
            && same_owner(self.owner.as_ref(), other.owner.as_ref())
    }
}

pub(crate) fn same_owner(
    a: Option<&Rc<dyn SubtreeOwner>>,
    b: Option<&Rc<dyn SubtreeOwner>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
        _ => false,
    }
}

impl ElementVNode {
    /// The element, once mounted.
    #[must_use]
    pub const fn elm(&self) -> Option<&Element> {
        self.elm.as_ref()
    }

    /// Returns `true` if the children of this node are driven by streams.
    #[must_use]
    pub const fn is_reactive(&self) -> bool {
        self.owner.is_some()
    }
}

/// A text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextVNode {
    /// Text content.
    pub text: Str,
    pub(crate) elm: Option<Element>,
    pub(crate) slot: Option<usize>,
}

/// A node as understood by the patch layer.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    /// Element node.
    Element(ElementVNode),
    /// Text node.
    Text(TextVNode),
}

impl VNode {
    /// Creates an element node.
    pub fn element(tag: impl Into<Str>, data: VNodeData, children: Vec<Self>) -> Self {
        Self::Element(ElementVNode {
            tag: tag.into(),
            data,
            children,
            elm: None,
            slot: None,
            owner: None,
            listeners: None,
        })
    }

    /// Creates a text node.
    pub fn text(text: impl Into<Str>) -> Self {
        Self::Text(TextVNode {
            text: text.into(),
            elm: None,
            slot: None,
        })
    }

    /// The native element, once mounted.
    #[must_use]
    pub const fn elm(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => element.elm.as_ref(),
            Self::Text(text) => text.elm.as_ref(),
        }
    }

    /// The element node, if this is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&ElementVNode> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// The node key, if any.
    #[must_use]
    pub const fn key(&self) -> Option<&KeyValue> {
        match self {
            Self::Element(element) => element.data.key.as_ref(),
            Self::Text(_) => None,
        }
    }

    pub(crate) const fn slot(&self) -> Option<usize> {
        match self {
            Self::Element(element) => element.slot,
            Self::Text(text) => text.slot,
        }
    }

    pub(crate) fn set_slot(&mut self, slot: usize) {
        match self {
            Self::Element(element) => element.slot = Some(slot),
            Self::Text(text) => text.slot = Some(slot),
        }
    }

    /// Whether the patch layer may patch `self` into `other` instead of replacing it.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.slot == b.slot,
            (Self::Element(a), Self::Element(b)) => {
                a.tag == b.tag
                    && a.data.key == b.data.key
                    && a.slot == b.slot
                    && same_owner(a.owner.as_ref(), b.owner.as_ref())
            }
            _ => false,
        }
    }
}
