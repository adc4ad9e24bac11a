//! Immutable tree descriptors consumed by the preparation engine.
//!
//! A tree is built out of [`Node`]s. Only [`Node::Element`] carries a type; every
//! other variant is a plain value (or a sequence of nodes) that contributes nothing
//! to preparation beyond the elements it contains.
//!
//! ```
//! use preparable_core::Node;
//!
//! let tree = Node::host("ul")
//!     .prop("class", "menu")
//!     .children([Node::host("li").child("one").build(), Node::host("li").child("two").build()])
//!     .build();
//!
//! assert_eq!(tree.flatten().len(), 1);
//! ```

use core::fmt::{self, Debug};
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::component::{CompositeType, FunctionType};

/// One position in a tree.
#[derive(Clone, Default)]
pub enum Node {
    /// Nothing at all.
    #[default]
    Empty,
    /// A plain value such as text or a number. Any JSON value is accepted here,
    /// including objects that resemble elements: they are never interpreted.
    Value(Value),
    /// A typed element.
    Element(Element),
    /// An ordered sequence of nodes, flattened away during preparation.
    Fragment(Vec<Node>),
}

impl Node {
    /// Starts building a host element for the given tag.
    pub fn host(tag: impl Into<Rc<str>>) -> ElementBuilder {
        ElementBuilder::new(ElementType::Host(tag.into()))
    }

    /// Starts building a function element.
    pub fn function(ty: FunctionType) -> ElementBuilder {
        ElementBuilder::new(ElementType::Function(ty))
    }

    /// Starts building a composite element.
    pub fn composite(ty: CompositeType) -> ElementBuilder {
        ElementBuilder::new(ElementType::Composite(ty))
    }

    /// Returns the element if this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Returns `true` for [`Node::Empty`] and for an empty fragment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Fragment(items) => items.iter().all(Self::is_empty),
            _ => false,
        }
    }

    /// Collects the element nodes reachable from this node without crossing an
    /// element boundary: fragments are walked recursively, plain values skipped.
    #[must_use]
    pub fn flatten(&self) -> Vec<&Self> {
        let mut acc = Vec::new();
        self.flatten_into(&mut acc);
        acc
    }

    fn flatten_into<'a>(&'a self, acc: &mut Vec<&'a Self>) {
        match self {
            Self::Element(_) => acc.push(self),
            Self::Fragment(items) => {
                for item in items {
                    item.flatten_into(acc);
                }
            }
            Self::Empty | Self::Value(_) => {}
        }
    }

    /// Cheap equality: plain values by value, elements by identity.
    #[must_use]
    pub fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Element(a), Self::Element(b)) => a.ptr_eq(b),
            (Self::Fragment(a), Self::Fragment(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.shallow_eq(b))
            }
            _ => false,
        }
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Value(value) => write!(f, "{value}"),
            Self::Element(element) => Debug::fmt(element, f),
            Self::Fragment(items) => f.debug_list().entries(items).finish(),
        }
    }
}

impl From<()> for Node {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}

impl From<ElementBuilder> for Node {
    fn from(value: ElementBuilder) -> Self {
        value.build()
    }
}

impl From<Vec<Self>> for Node {
    fn from(value: Vec<Self>) -> Self {
        Self::Fragment(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl<T: Into<Self>> FromIterator<T> for Node {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Fragment(iter.into_iter().map(Into::into).collect())
    }
}

/// The type of an element, fixed when the element is built.
#[derive(Clone)]
pub enum ElementType {
    /// A native node identified by its tag. Opaque to the engine.
    Host(Rc<str>),
    /// A stateless function of its props.
    Function(FunctionType),
    /// A stateful node subject to lifecycle emulation and dependency resolution.
    Composite(CompositeType),
}

impl ElementType {
    /// A human readable name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Host(tag) => tag,
            Self::Function(ty) => ty.name(),
            Self::Composite(ty) => ty.name(),
        }
    }
}

impl Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(tag) => write!(f, "Host({tag})"),
            Self::Function(ty) => write!(f, "Function({})", ty.name()),
            Self::Composite(ty) => write!(f, "Composite({})", ty.name()),
        }
    }
}

/// An immutable, reference-counted element descriptor.
///
/// Cloning an element is cheap and preserves its identity, which is what
/// [`Node::shallow_eq`] compares.
#[derive(Clone)]
pub struct Element(Rc<ElementInner>);

struct ElementInner {
    ty: ElementType,
    props: Props,
}

impl Element {
    /// Creates a new element.
    #[must_use]
    pub fn new(ty: ElementType, props: Props) -> Self {
        Self(Rc::new(ElementInner { ty, props }))
    }

    /// The element type.
    #[must_use]
    pub fn ty(&self) -> &ElementType {
        &self.0.ty
    }

    /// The element props.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// Returns `true` if both handles point to the same element.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("type", self.ty())
            .field("props", self.props())
            .finish()
    }
}

/// Named values of an element, plus its reserved `children` field.
#[derive(Clone, Default)]
pub struct Props {
    values: IndexMap<String, Value>,
    children: Node,
}

impl Props {
    /// Creates empty props.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Looks up a string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Iterates over named values in insertion order. `children` is not included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of named values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no named values and no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.is_empty()
    }

    /// The reserved `children` field.
    #[must_use]
    pub const fn children(&self) -> &Node {
        &self.children
    }

    /// Replaces the children.
    pub fn set_children(&mut self, children: impl Into<Node>) {
        self.children = children.into();
    }

    /// Returns a copy with every value of `other` applied on top of `self`.
    /// Children come from `other` when it has any.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in &other.values {
            merged.values.insert(key.clone(), value.clone());
        }
        if !other.children.is_empty() {
            merged.children = other.children.clone();
        }
        merged
    }

    /// Shallow comparison used by re-render guards: same keys regardless of
    /// order, equal values, children compared by element identity.
    #[must_use]
    pub fn shallow_eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .all(|(key, value)| other.values.get(key) == Some(value))
            && self.children.shallow_eq(&other.children)
    }
}

impl Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        map.entries(self.values.iter());
        if !self.children.is_empty() {
            map.entry(&"children", &self.children);
        }
        map.finish()
    }
}

/// Fluent construction of an [`Element`].
#[derive(Debug)]
#[must_use]
pub struct ElementBuilder {
    ty: ElementType,
    props: Props,
    children: Vec<Node>,
}

impl ElementBuilder {
    /// Starts a builder for the given type.
    pub fn new(ty: ElementType) -> Self {
        Self {
            ty,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Sets a named value.
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key, value);
        self
    }

    /// Replaces every named value with `props`.
    ///
    /// The children of `props` are kept unless [`child`](Self::child) or
    /// [`children`](Self::children) is called on this builder, whose children
    /// then replace them.
    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Appends one child.
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Appends several children.
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Builds the element.
    #[must_use]
    pub fn element(mut self) -> Element {
        match self.children.len() {
            0 => {}
            1 => self.props.children = self.children.remove(0),
            _ => self.props.children = Node::Fragment(self.children),
        }
        Element::new(self.ty, self.props)
    }

    /// Builds the element wrapped in a [`Node`].
    #[must_use]
    pub fn build(self) -> Node {
        Node::Element(self.element())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_skips_values_and_walks_fragments() {
        let a = Node::host("a").build();
        let b = Node::host("b").build();
        let tree = Node::Fragment(vec![
            "text".into(),
            a.clone(),
            Node::Fragment(vec![Node::Empty, b.clone(), Node::from(3_i64)]),
        ]);

        let flat = tree.flatten();
        assert_eq!(flat.len(), 2);
        assert!(flat[0].shallow_eq(&a));
        assert!(flat[1].shallow_eq(&b));
    }

    #[test]
    fn flatten_does_not_descend_into_elements() {
        let tree = Node::host("div")
            .child(Node::host("span").build())
            .build();
        assert_eq!(tree.flatten().len(), 1);
    }

    #[test]
    fn single_child_is_not_wrapped_in_a_fragment() {
        let node = Node::host("p").child("hi").element();
        assert!(matches!(node.props().children(), Node::Value(v) if v == "hi"));

        let node = Node::host("p").child("a").child("b").element();
        assert!(matches!(node.props().children(), Node::Fragment(items) if items.len() == 2));
    }

    #[test]
    fn builder_children_replace_children_of_given_props() {
        let mut props = Props::new().with("id", 1);
        props.set_children(Node::from("from props"));

        let kept = Node::host("p").props(props.clone()).element();
        assert!(matches!(kept.props().children(), Node::Value(v) if v == "from props"));

        let replaced = Node::host("p").child("from builder").props(props).element();
        assert!(matches!(replaced.props().children(), Node::Value(v) if v == "from builder"));
        assert_eq!(replaced.props().get("id"), Some(&Value::from(1)));
    }

    #[test]
    fn props_shallow_eq_ignores_key_order() {
        let a = Props::new().with("x", 1).with("y", "two");
        let b = Props::new().with("y", "two").with("x", 1);
        assert!(a.shallow_eq(&b));
        assert!(!a.shallow_eq(&b.clone().with("z", true)));
    }

    #[test]
    fn props_shallow_eq_compares_children_by_identity() {
        let child = Node::host("i").build();
        let mut a = Props::new();
        a.set_children(child.clone());
        let mut b = Props::new();
        b.set_children(child);
        assert!(a.shallow_eq(&b));

        b.set_children(Node::host("i").build());
        assert!(!a.shallow_eq(&b));
    }

    #[test]
    fn merged_props_override_left_to_right() {
        let base = Props::new().with("a", 1).with("b", 2);
        let merged = base.merged(&Props::new().with("b", 3));
        assert_eq!(merged.get("a"), Some(&Value::from(1)));
        assert_eq!(merged.get("b"), Some(&Value::from(3)));
        assert_eq!(merged.iter().map(|(k, _)| k).collect::<Vec<_>>(), ["a", "b"]);
    }
}
