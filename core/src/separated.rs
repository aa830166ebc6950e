//! Classification of a node's modifiers into the groups the patch layer expects.
//!
//! One pass over the modifiers, declaration order preserved inside every
//! group. Composite modifiers are spliced in place. Duplicate titles are only
//! resolved when the groups are folded into [`VNodeData`]: plain attributes,
//! props, styles and keys are last-write-wins, accumulating attributes and
//! styles fold into the value accumulated so far.

use alloc::{collections::BTreeMap, vec::Vec};

use crate::{
    Str,
    attribute::{Attr, AttrValue, Attribute, Prop, Style, TitledAttribute},
    emitter::Emitter,
    hook::Hooks,
    modifier::{ChildVNode, Key, Modifier, Property, StaticVNode, StringVNode},
    receiver::AttributeStreamReceiver,
    vnode::VNodeData,
};

/// Attributes, hooks and keys of a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeparatedProperties {
    /// DOM attributes.
    pub attrs: Vec<Attr>,
    /// DOM properties.
    pub props: Vec<Prop>,
    /// Styles of every kind.
    pub styles: Vec<Style>,
    /// Keys; the last one wins.
    pub keys: Vec<Key>,
    /// Lifecycle hooks by step.
    pub hooks: Hooks,
}

impl SeparatedProperties {
    fn push_attribute(&mut self, attribute: &Attribute) {
        match attribute {
            Attribute::Empty => {}
            Attribute::Titled(TitledAttribute::Attr(attr)) => self.attrs.push(attr.clone()),
            Attribute::Titled(TitledAttribute::Prop(prop)) => self.props.push(prop.clone()),
            Attribute::Titled(TitledAttribute::Style(style)) => self.styles.push(style.clone()),
        }
    }
}

/// A node's modifiers partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeparatedModifiers {
    /// Attributes, hooks and keys.
    pub properties: SeparatedProperties,
    /// Event emitters.
    pub emitters: Vec<Emitter>,
    /// Stream-driven attributes.
    pub attribute_receivers: Vec<AttributeStreamReceiver>,
    /// Children, static and stream-driven, in declaration order. Raw text
    /// modifiers become text children.
    pub children: Vec<ChildVNode>,
}

impl SeparatedModifiers {
    /// Classifies `modifiers`.
    pub fn from_modifiers<'a>(modifiers: impl IntoIterator<Item = &'a Modifier>) -> Self {
        let mut separated = Self::default();
        for modifier in modifiers {
            separated.push(modifier);
        }
        separated
    }

    fn push(&mut self, modifier: &Modifier) {
        match modifier {
            Modifier::Property(Property::Attribute(attribute)) => {
                self.properties.push_attribute(attribute);
            }
            Modifier::Property(Property::Hook(hook)) => self.properties.hooks.push(hook),
            Modifier::Property(Property::Key(key)) => self.properties.keys.push(key.clone()),
            Modifier::Child(child) => self.children.push(child.clone()),
            Modifier::Emitter(emitter) => self.emitters.push(emitter.clone()),
            Modifier::AttributeStream(receiver) => {
                self.attribute_receivers.push(receiver.clone());
            }
            Modifier::Composite(composite) => {
                for modifier in &composite.modifiers {
                    self.push(modifier);
                }
            }
            Modifier::String(text) => self
                .children
                .push(ChildVNode::Static(StaticVNode::Text(StringVNode(text.0.clone())))),
            Modifier::Empty => {}
        }
    }

    /// Returns `true` if any child or attribute is driven by a stream.
    #[must_use]
    pub fn has_stream(&self) -> bool {
        !self.attribute_receivers.is_empty() || self.children.iter().any(ChildVNode::is_stream)
    }

    /// Folds the groups into patch data.
    #[must_use]
    pub fn vnode_data(&self) -> VNodeData {
        self.vnode_data_with(&[])
    }

    /// Folds the groups into patch data, applying `latest` after the static
    /// attributes as if they had been declared last.
    #[must_use]
    pub fn vnode_data_with(&self, latest: &[Attribute]) -> VNodeData {
        let mut properties = self.properties.clone();
        for attribute in latest {
            properties.push_attribute(attribute);
        }

        let mut data = VNodeData::default();
        for attr in &properties.attrs {
            fold_attr(&mut data.attrs, attr);
        }
        for prop in &properties.props {
            data.props.insert(prop.title.clone(), prop.value.clone());
        }
        for style in &properties.styles {
            fold_style(&mut data, style);
        }
        data.key = properties.keys.last().map(|key| key.0.clone());
        for emitter in &self.emitters {
            data.on
                .entry(Str::Owned(emitter.event_type().into()))
                .or_default()
                .push(emitter.clone());
        }
        data.hooks = properties.hooks;
        data
    }
}

fn fold_attr(attrs: &mut BTreeMap<Str, AttrValue>, attr: &Attr) {
    match attr {
        Attr::Basic { title, value } => {
            attrs.insert(title.clone(), value.clone());
        }
        Attr::Accum(accum) => {
            let value = attrs
                .get(&accum.title)
                .map_or_else(|| accum.value.clone(), |previous| accum.accumulate(previous));
            attrs.insert(accum.title.clone(), value);
        }
    }
}

fn fold_style(data: &mut VNodeData, style: &Style) {
    match style {
        Style::Basic { title, value } => {
            data.style.insert(title.clone(), value.clone());
        }
        Style::Delayed { title, value } => {
            data.delayed_style.insert(title.clone(), value.clone());
        }
        Style::Remove { title, value } => {
            data.remove_style.insert(title.clone(), value.clone());
        }
        Style::Destroy { title, value } => {
            data.destroy_style.insert(title.clone(), value.clone());
        }
        Style::Accum(accum) => {
            let value = data
                .style
                .get(&accum.title)
                .map_or_else(|| accum.value.clone(), |previous| accum.accumulate(previous));
            data.style.insert(accum.title.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Element,
        attribute::{AccumAttr, AccumStyle, join_with},
        hook::{Hook, InsertHook},
        modifier::KeyValue,
        observable::from_fn,
    };
    use alloc::format;

    fn classify(modifiers: &[Modifier]) -> VNodeData {
        SeparatedModifiers::from_modifiers(modifiers).vnode_data()
    }

    #[test]
    fn plain_attributes_are_last_write_wins() {
        let data = classify(&[
            Attribute::attr("id", "first").into(),
            Attribute::attr("title", "kept").into(),
            Attribute::attr("id", "second").into(),
        ]);
        assert_eq!(data.attrs.len(), 2);
        assert_eq!(data.attrs["id"], AttrValue::from("second"));
        assert_eq!(data.attrs["title"], AttrValue::from("kept"));
    }

    #[test]
    fn classification_is_repeatable() {
        let modifiers = [
            Attribute::attr("id", "a").into(),
            Attribute::prop("value", "v").into(),
            Attribute::attr("id", "b").into(),
        ];
        assert_eq!(classify(&modifiers), classify(&modifiers));
    }

    #[test]
    fn accumulating_style_folds_in_declaration_order() {
        let concat = |a: &Str, b: &Str| Str::Owned(format!("{a} {b}"));
        let data = classify(&[
            AccumStyle::new("transform", "rotate(1deg)", concat).into(),
            AccumStyle::new("transform", "scale(2)", concat).into(),
        ]);
        assert_eq!(data.style["transform"], "rotate(1deg) scale(2)");
    }

    #[test]
    fn accumulating_attr_folds_onto_basic_value() {
        let data = classify(&[
            Attribute::attr("class", "a").into(),
            AccumAttr::new("class", "b", join_with(" ")).into(),
            AccumAttr::new("class", "c", join_with(" ")).into(),
        ]);
        assert_eq!(data.attrs["class"], AttrValue::from("a b c"));
    }

    #[test]
    fn composite_classifies_like_spliced_sequence() {
        let inner: Vec<Modifier> = vec![
            Attribute::attr("id", "inner").into(),
            Style::Basic { title: "color".into(), value: "red".into() }.into(),
            "text".into(),
        ];
        let mut spliced = vec![Attribute::attr("id", "outer").into()];
        spliced.extend(inner.iter().cloned());
        spliced.push(Key(KeyValue::from(1)).into());

        let nested = [
            Attribute::attr("id", "outer").into(),
            Modifier::from(inner),
            Key(KeyValue::from(1)).into(),
        ];
        assert_eq!(
            SeparatedModifiers::from_modifiers(&nested),
            SeparatedModifiers::from_modifiers(&spliced)
        );
        assert_eq!(classify(&nested), classify(&spliced));
    }

    #[test]
    fn styles_are_split_by_lifecycle_moment() {
        let data = classify(&[
            Style::Basic { title: "opacity".into(), value: "0".into() }.into(),
            Style::Delayed { title: "opacity".into(), value: "1".into() }.into(),
            Style::Remove { title: "opacity".into(), value: "0".into() }.into(),
            Style::Destroy { title: "display".into(), value: "none".into() }.into(),
        ]);
        assert_eq!(data.style["opacity"], "0");
        assert_eq!(data.delayed_style["opacity"], "1");
        assert_eq!(data.remove_style["opacity"], "0");
        assert_eq!(data.destroy_style["display"], "none");
    }

    #[test]
    fn last_key_wins_and_emitters_group_by_type() {
        let click = Emitter::new("click", |_| crate::Effect::ready(crate::observable::Ack::Continue));
        let input = Emitter::new("input", |_| crate::Effect::ready(crate::observable::Ack::Continue));
        let insert = InsertHook::new(from_fn(|_: Element| {}));
        let separated = SeparatedModifiers::from_modifiers(&[
            Key(KeyValue::from("a")).into(),
            click.clone().into(),
            Hook::Insert(insert.clone()).into(),
            input.clone().into(),
            Key(KeyValue::from("b")).into(),
            click.clone().into(),
        ]);
        let data = separated.vnode_data();
        assert_eq!(data.key, Some(KeyValue::from("b")));
        assert_eq!(data.on["click"], vec![click.clone(), click]);
        assert_eq!(data.on["input"], vec![input]);
        assert_eq!(data.hooks.insert, vec![insert]);
        assert!(!separated.has_stream());
    }

    #[test]
    fn latest_stream_attributes_override_static_ones() {
        let separated =
            SeparatedModifiers::from_modifiers(&[Attribute::attr("title", "static").into()]);
        let data = separated.vnode_data_with(&[Attribute::attr("title", "live")]);
        assert_eq!(data.attrs["title"], AttrValue::from("live"));
    }

    #[test]
    fn strings_and_empty_modifiers() {
        let separated =
            SeparatedModifiers::from_modifiers(&[Modifier::Empty, "a".into(), Modifier::Empty]);
        assert_eq!(
            separated.children,
            vec![ChildVNode::Static(StaticVNode::Text(StringVNode("a".into())))]
        );
        assert_eq!(separated.vnode_data(), VNodeData::default());
    }
}
