//! The modifier algebra.
//!
//! A [`Modifier`] is anything that decorates a [`VTree`]. The set of variants is
//! closed; the classifier in [`separated`](crate::separated) matches on it
//! exhaustively, and new kinds of decoration only need handling there.

use alloc::vec::Vec;

use crate::{
    Effect, Str,
    attribute::{AccumAttr, AccumStyle, Attribute, Prop, Style},
    emitter::Emitter,
    hook::Hook,
    receiver::{AttributeStreamReceiver, ChildStreamReceiver, ChildrenStreamReceiver},
    vtree::VTree,
};

/// Value of a node key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum KeyValue {
    /// String key.
    Str(Str),
    /// Integer key.
    Int(i64),
    /// Unsigned key above `i64::MAX`.
    UInt(u64),
}

impl From<&'static str> for KeyValue {
    fn from(value: &'static str) -> Self {
        Self::Str(Str::Borrowed(value))
    }
}

impl From<alloc::string::String> for KeyValue {
    fn from(value: alloc::string::String) -> Self {
        Self::Str(Str::Owned(value))
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for KeyValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Int)
    }
}

impl From<usize> for KeyValue {
    fn from(value: usize) -> Self {
        // usize is at most 64 bits on every supported target.
        u64::try_from(value).map_or(Self::UInt(u64::MAX), Self::from)
    }
}

/// Identity of a node among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(pub KeyValue);

/// A modifier that lands in the node's data.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Attribute, property or style.
    Attribute(Attribute),
    /// Lifecycle hook.
    Hook(Hook),
    /// Node key.
    Key(Key),
}

/// Raw text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringModifier(pub Str);

/// A group of modifiers applied as one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeModifier {
    /// The grouped modifiers, in order.
    pub modifiers: Vec<Modifier>,
}

/// A text child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringVNode(pub Str);

/// A child known at composition time.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticVNode {
    /// Text node.
    Text(StringVNode),
    /// Element subtree.
    Tree(VTree),
}

/// A child whose content is driven by a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamVNode {
    /// A single child replaced on every emission.
    Child(ChildStreamReceiver),
    /// A list of children replaced on every emission.
    Children(ChildrenStreamReceiver),
}

/// Any child of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildVNode {
    /// Stream-driven child.
    Stream(StreamVNode),
    /// Static child.
    Static(StaticVNode),
}

impl ChildVNode {
    /// Returns `true` for stream-driven children.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

/// Everything that can decorate a [`VTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// Attribute, hook or key.
    Property(Property),
    /// Child node.
    Child(ChildVNode),
    /// Event emitter.
    Emitter(Emitter),
    /// Attribute whose value comes from a stream.
    AttributeStream(AttributeStreamReceiver),
    /// Nested group, classified as if spliced in place.
    Composite(CompositeModifier),
    /// Raw text.
    String(StringModifier),
    /// Explicit no-op.
    Empty,
}

impl Modifier {
    /// Groups modifiers into one.
    pub fn composite(modifiers: impl IntoIterator<Item = impl Into<Self>>) -> Self {
        Self::Composite(CompositeModifier {
            modifiers: modifiers.into_iter().map(Into::into).collect(),
        })
    }
}

macro_rules! impl_into_modifier {
    ($($ty:ty => |$value:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Modifier {
                fn from($value: $ty) -> Self {
                    $body
                }
            }

            impl From<$ty> for Effect<Modifier> {
                fn from(value: $ty) -> Self {
                    Effect::ready(Modifier::from(value))
                }
            }
        )*
    };
}

impl_into_modifier! {
    Property => |value| Self::Property(value),
    Attribute => |value| Self::Property(Property::Attribute(value)),
    Style => |value| Self::Property(Property::Attribute(Attribute::from(value))),
    Prop => |value| Self::Property(Property::Attribute(Attribute::from(value))),
    AccumAttr => |value| Self::Property(Property::Attribute(Attribute::from(value))),
    AccumStyle => |value| Self::Property(Property::Attribute(Attribute::from(value))),
    Hook => |value| Self::Property(Property::Hook(value)),
    Key => |value| Self::Property(Property::Key(value)),
    Emitter => |value| Self::Emitter(value),
    AttributeStreamReceiver => |value| Self::AttributeStream(value),
    ChildVNode => |value| Self::Child(value),
    StaticVNode => |value| Self::Child(ChildVNode::Static(value)),
    StreamVNode => |value| Self::Child(ChildVNode::Stream(value)),
    ChildStreamReceiver => |value| Self::Child(ChildVNode::Stream(StreamVNode::Child(value))),
    ChildrenStreamReceiver => |value| Self::Child(ChildVNode::Stream(StreamVNode::Children(value))),
    VTree => |value| Self::Child(ChildVNode::Static(StaticVNode::Tree(value))),
    StringModifier => |value| Self::String(value),
    CompositeModifier => |value| Self::Composite(value),
    &'static str => |value| Self::String(StringModifier(Str::Borrowed(value))),
    alloc::string::String => |value| Self::String(StringModifier(Str::Owned(value))),
    Vec<Modifier> => |value| Self::Composite(CompositeModifier { modifiers: value }),
}

impl<M: Into<Modifier>> From<Option<M>> for Modifier {
    fn from(value: Option<M>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl<M: Into<Modifier>> From<Option<M>> for Effect<Modifier> {
    fn from(value: Option<M>) -> Self {
        Self::ready(Modifier::from(value))
    }
}

impl From<VTree> for StaticVNode {
    fn from(value: VTree) -> Self {
        Self::Tree(value)
    }
}

impl From<&'static str> for StaticVNode {
    fn from(value: &'static str) -> Self {
        Self::Text(StringVNode(Str::Borrowed(value)))
    }
}

impl From<alloc::string::String> for StaticVNode {
    fn from(value: alloc::string::String) -> Self {
        Self::Text(StringVNode(Str::Owned(value)))
    }
}

/// Collects modifier-like values into a `Vec<Effect<Modifier>>` for
/// [`VTree::apply`].
///
/// ```
/// use waterdom_core::{dsl::*, modifiers, Event, Modifier};
///
/// let highlighted = true;
/// let tree = div().apply(modifiers![
///     attr("id").set("app"),
///     "hello",
///     on("click").call(|_: Event| ()),
///     highlighted.then_some(class("highlighted")),
///     None::<Modifier>,
/// ]);
/// let tree = tree.now_or_never().expect("every modifier is ready")?;
/// assert_eq!(tree.modifiers().len(), 5);
/// # Ok::<(), waterdom_core::Error>(())
/// ```
#[macro_export]
macro_rules! modifiers {
    ($($modifier:expr),* $(,)?) => {
        ::std::vec![$($crate::Effect::<$crate::Modifier>::from($modifier)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_become_empty_modifiers() {
        assert_eq!(Modifier::from(None::<Key>), Modifier::Empty);
        assert_eq!(
            Modifier::from(Some(Key(KeyValue::from(3)))),
            Modifier::Property(Property::Key(Key(KeyValue::Int(3))))
        );
    }

    #[test]
    fn optional_modifiers_pass_through_the_macro() {
        let effects = modifiers![Some(Key(KeyValue::from(1))), None::<Key>];
        let resolved: Vec<Modifier> = effects
            .into_iter()
            .map(|effect| effect.now_or_never().unwrap().unwrap())
            .collect();
        assert_eq!(
            resolved,
            [Modifier::Property(Property::Key(Key(KeyValue::Int(1)))), Modifier::Empty]
        );
    }

    #[test]
    fn large_unsigned_keys_stay_distinct() {
        assert_eq!(KeyValue::from(7_usize), KeyValue::Int(7));
        assert_eq!(KeyValue::from(u64::MAX), KeyValue::UInt(u64::MAX));
        assert_ne!(KeyValue::from(u64::MAX), KeyValue::from(u64::MAX - 1));
        assert_ne!(KeyValue::from(u64::MAX - 1), KeyValue::Int(i64::MAX));
    }

    #[test]
    fn strings_become_string_modifiers() {
        assert_eq!(
            Modifier::from("hi"),
            Modifier::String(StringModifier("hi".into()))
        );
    }

    #[test]
    fn macro_accepts_ready_and_pending_values() {
        let effects = modifiers![
            "text",
            Effect::<Modifier>::pending(async { Ok(Modifier::Empty) }),
            Key(KeyValue::from("k")),
        ];
        assert_eq!(effects.len(), 3);
        assert!(effects[0].is_ready());
        assert!(!effects[1].is_ready());
    }
}
