//! Attributes, properties and styles.
//!
//! Every titled variant is keyed by its title when the classifier folds a
//! node's modifiers into patch data. Plain variants overwrite earlier values of
//! the same title; accumulating variants combine with them instead.

use alloc::{rc::Rc, string::ToString};
use core::{
    any::type_name,
    fmt::{self, Debug, Display},
};

use crate::Str;

/// Value of an attribute or property.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttrValue {
    /// A string.
    Str(Str),
    /// A boolean. `false` removes an attribute, `true` sets it empty.
    Bool(bool),
    /// A number.
    Number(f64),
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&'static str> for AttrValue {
    fn from(value: &'static str) -> Self {
        Self::Str(Str::Borrowed(value))
    }
}

impl From<alloc::string::String> for AttrValue {
    fn from(value: alloc::string::String) -> Self {
        Self::Str(Str::Owned(value))
    }
}

impl From<Str> for AttrValue {
    fn from(value: Str) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

type Accumulate<V> = Rc<dyn Fn(&V, &V) -> V>;

/// An attribute folded into earlier declarations of the same title.
#[derive(Clone)]
pub struct AccumAttr {
    /// Attribute name.
    pub title: Str,
    /// Value declared by this modifier.
    pub value: AttrValue,
    accumulate: Accumulate<AttrValue>,
}

impl AccumAttr {
    /// Creates an accumulating attribute; `accumulate(previous, current)` merges values.
    pub fn new(
        title: impl Into<Str>,
        value: impl Into<AttrValue>,
        accumulate: impl Fn(&AttrValue, &AttrValue) -> AttrValue + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            accumulate: Rc::new(accumulate),
        }
    }

    /// Merges this declaration into the value accumulated so far.
    #[must_use]
    pub fn accumulate(&self, previous: &AttrValue) -> AttrValue {
        (self.accumulate)(previous, &self.value)
    }
}

impl Debug for AccumAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccumAttr")
            .field("title", &self.title)
            .field("value", &self.value)
            .field("accumulate", &type_name::<Accumulate<AttrValue>>())
            .finish()
    }
}

impl PartialEq for AccumAttr {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.value == other.value
            && Rc::ptr_eq(&self.accumulate, &other.accumulate)
    }
}

/// A DOM attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    /// Overwrites earlier values of the same title.
    Basic {
        /// Attribute name.
        title: Str,
        /// Attribute value.
        value: AttrValue,
    },
    /// Folds into earlier values of the same title.
    Accum(AccumAttr),
}

impl Attr {
    /// Attribute name.
    #[must_use]
    pub fn title(&self) -> &Str {
        match self {
            Self::Basic { title, .. } => title,
            Self::Accum(accum) => &accum.title,
        }
    }

    fn title_mut(&mut self) -> &mut Str {
        match self {
            Self::Basic { title, .. } => title,
            Self::Accum(accum) => &mut accum.title,
        }
    }
}

/// A DOM property, set on the element object rather than as markup.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    /// Property name.
    pub title: Str,
    /// Property value.
    pub value: AttrValue,
}

/// A style declaration folded into earlier declarations of the same title.
#[derive(Clone)]
pub struct AccumStyle {
    /// CSS property name.
    pub title: Str,
    /// Value declared by this modifier.
    pub value: Str,
    accumulate: Accumulate<Str>,
}

impl AccumStyle {
    /// Creates an accumulating style; `accumulate(previous, current)` merges values.
    pub fn new(
        title: impl Into<Str>,
        value: impl Into<Str>,
        accumulate: impl Fn(&Str, &Str) -> Str + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            accumulate: Rc::new(accumulate),
        }
    }

    /// Merges this declaration into the value accumulated so far.
    #[must_use]
    pub fn accumulate(&self, previous: &Str) -> Str {
        (self.accumulate)(previous, &self.value)
    }
}

impl Debug for AccumStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccumStyle")
            .field("title", &self.title)
            .field("value", &self.value)
            .field("accumulate", &type_name::<Accumulate<Str>>())
            .finish()
    }
}

impl PartialEq for AccumStyle {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.value == other.value
            && Rc::ptr_eq(&self.accumulate, &other.accumulate)
    }
}

/// A CSS declaration and the lifecycle moment it applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    /// Applied on creation and every patch.
    Basic {
        /// CSS property name.
        title: Str,
        /// CSS value.
        value: Str,
    },
    /// Applied once the element has been inserted.
    Delayed {
        /// CSS property name.
        title: Str,
        /// CSS value.
        value: Str,
    },
    /// Applied right before the element is removed from its parent.
    Remove {
        /// CSS property name.
        title: Str,
        /// CSS value.
        value: Str,
    },
    /// Applied when the element is destroyed.
    Destroy {
        /// CSS property name.
        title: Str,
        /// CSS value.
        value: Str,
    },
    /// Folds into earlier basic declarations of the same title.
    Accum(AccumStyle),
}

impl Style {
    /// CSS property name.
    #[must_use]
    pub fn title(&self) -> &Str {
        match self {
            Self::Basic { title, .. }
            | Self::Delayed { title, .. }
            | Self::Remove { title, .. }
            | Self::Destroy { title, .. } => title,
            Self::Accum(accum) => &accum.title,
        }
    }

    fn title_mut(&mut self) -> &mut Str {
        match self {
            Self::Basic { title, .. }
            | Self::Delayed { title, .. }
            | Self::Remove { title, .. }
            | Self::Destroy { title, .. } => title,
            Self::Accum(accum) => &mut accum.title,
        }
    }
}

/// An attribute, property or style carrying a non-empty title.
#[derive(Debug, Clone, PartialEq)]
pub enum TitledAttribute {
    /// DOM attribute.
    Attr(Attr),
    /// DOM property.
    Prop(Prop),
    /// CSS declaration.
    Style(Style),
}

impl TitledAttribute {
    /// The merge key of this attribute.
    #[must_use]
    pub fn title(&self) -> &Str {
        match self {
            Self::Attr(attr) => attr.title(),
            Self::Prop(prop) => &prop.title,
            Self::Style(style) => style.title(),
        }
    }

    fn title_mut(&mut self) -> &mut Str {
        match self {
            Self::Attr(attr) => attr.title_mut(),
            Self::Prop(prop) => &mut prop.title,
            Self::Style(style) => style.title_mut(),
        }
    }
}

/// Anything settable on an element's attributes, properties or style.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Contributes nothing.
    Empty,
    /// A titled attribute.
    Titled(TitledAttribute),
}

impl Attribute {
    /// Wraps `titled`, degrading to [`Attribute::Empty`] when its title is empty.
    #[must_use]
    pub fn titled(titled: TitledAttribute) -> Self {
        if titled.title().is_empty() {
            tracing::warn!(attribute = ?titled, "dropping attribute with an empty title");
            return Self::Empty;
        }
        Self::Titled(titled)
    }

    /// A plain attribute.
    pub fn attr(title: impl Into<Str>, value: impl Into<AttrValue>) -> Self {
        Self::titled(TitledAttribute::Attr(Attr::Basic {
            title: title.into(),
            value: value.into(),
        }))
    }

    /// A property.
    pub fn prop(title: impl Into<Str>, value: impl Into<AttrValue>) -> Self {
        Self::titled(TitledAttribute::Prop(Prop {
            title: title.into(),
            value: value.into(),
        }))
    }

    /// A style declaration.
    #[must_use]
    pub fn style(style: Style) -> Self {
        Self::titled(TitledAttribute::Style(style))
    }

    /// The same attribute under another title. [`Attribute::Empty`] stays
    /// empty.
    #[must_use]
    pub fn retitled(self, title: impl Into<Str>) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Titled(mut titled) => {
                *titled.title_mut() = title.into();
                Self::titled(titled)
            }
        }
    }

    /// The title, or `None` for [`Attribute::Empty`].
    #[must_use]
    pub fn title(&self) -> Option<&Str> {
        match self {
            Self::Empty => None,
            Self::Titled(titled) => Some(titled.title()),
        }
    }
}

impl From<AccumAttr> for Attribute {
    fn from(value: AccumAttr) -> Self {
        Self::titled(TitledAttribute::Attr(Attr::Accum(value)))
    }
}

impl From<AccumStyle> for Attribute {
    fn from(value: AccumStyle) -> Self {
        Self::style(Style::Accum(value))
    }
}

impl From<Style> for Attribute {
    fn from(value: Style) -> Self {
        Self::style(value)
    }
}

impl From<Prop> for Attribute {
    fn from(value: Prop) -> Self {
        Self::titled(TitledAttribute::Prop(value))
    }
}

/// Joins two attribute values with a separator, as `class` accumulation does.
#[must_use]
pub fn join_with(separator: &'static str) -> impl Fn(&AttrValue, &AttrValue) -> AttrValue {
    move |previous, current| {
        let mut joined = previous.to_string();
        joined.push_str(separator);
        joined.push_str(&current.to_string());
        AttrValue::from(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_titles_degrade_to_empty_attribute() {
        assert_eq!(Attribute::attr("", "x"), Attribute::Empty);
        assert_eq!(Attribute::style(Style::Basic { title: "".into(), value: "red".into() }), Attribute::Empty);
        assert_eq!(Attribute::attr("id", "x").title().map(|t| &**t), Some("id"));
    }

    #[test]
    fn retitling_keeps_the_kind_and_value() {
        assert_eq!(Attribute::attr("b", "x").retitled("a"), Attribute::attr("a", "x"));
        assert_eq!(
            Attribute::style(Style::Delayed { title: "top".into(), value: "0".into() }).retitled("left"),
            Attribute::style(Style::Delayed { title: "left".into(), value: "0".into() })
        );
        assert_eq!(Attribute::Empty.retitled("a"), Attribute::Empty);
        assert_eq!(Attribute::prop("value", 1).retitled(""), Attribute::Empty);
    }

    #[test]
    fn accumulation_folds_previous_then_current() {
        let class = AccumAttr::new("class", "b", join_with(" "));
        assert_eq!(class.accumulate(&AttrValue::from("a")), AttrValue::from("a b"));
    }

    #[test]
    fn bool_and_number_values_display_plainly() {
        assert_eq!(AttrValue::from(true).to_string(), "true");
        assert_eq!(AttrValue::from(3).to_string(), "3");
        assert_eq!(AttrValue::from(1.5).to_string(), "1.5");
    }
}
