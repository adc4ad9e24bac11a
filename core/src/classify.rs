//! Deciding how a node is expanded.
//!
//! Classification is total: anything that is not a typed element is a plain value
//! and contributes nothing, so malformed input never aborts a pass. The checks run
//! in order of cost and frequency: plain values first (most leaves), then host
//! tags, then function and composite types.

use crate::{CompositeType, Element, ElementType, FunctionType, Node};

/// The kind of a node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Empty, a primitive, or any other non-element value.
    Plain,
    /// A sequence of nodes.
    Fragment,
    /// A native node, opaque to the engine.
    Host,
    /// A stateless function node.
    Function,
    /// A stateful node with lifecycle emulation.
    Composite,
}

/// A classified node, borrowing what its expansion needs.
#[derive(Debug, Clone, Copy)]
pub enum Classified<'a> {
    /// Contributes nothing.
    Plain,
    /// Expands to its own items.
    Fragment(&'a Node),
    /// Expands to its `children` prop.
    Host(&'a Element),
    /// Expands to the function's output.
    Function(&'a Element, &'a FunctionType),
    /// Expands through lifecycle emulation.
    Composite(&'a Element, &'a CompositeType),
}

impl Classified<'_> {
    /// The payload-free kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Plain => NodeKind::Plain,
            Self::Fragment(_) => NodeKind::Fragment,
            Self::Host(_) => NodeKind::Host,
            Self::Function(..) => NodeKind::Function,
            Self::Composite(..) => NodeKind::Composite,
        }
    }
}

/// Classifies a node.
#[must_use]
pub fn classify(node: &Node) -> Classified<'_> {
    let element = match node {
        Node::Empty | Node::Value(_) => return Classified::Plain,
        Node::Fragment(_) => return Classified::Fragment(node),
        Node::Element(element) => element,
    };
    match element.ty() {
        ElementType::Host(_) => Classified::Host(element),
        ElementType::Function(ty) => Classified::Function(element, ty),
        ElementType::Composite(ty) => Classified::Composite(element, ty),
    }
}
