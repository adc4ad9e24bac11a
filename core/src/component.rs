//! Node types that can appear in an [`Element`](crate::Element).
//!
//! - [`FunctionType`]: a stateless function from props to children.
//! - [`CompositeType`]: a stateful [`Component`] constructed per preparation pass,
//!   optionally carrying a dependency [`Resolver`] and a re-render guard.

use core::any::type_name;
use core::fmt::{self, Debug};
use std::borrow::Cow;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::{Context, Node, Props, Resolver};

/// Component-local state, compared by pure re-render guards.
pub type State = IndexMap<String, Value>;

/// A stateful node.
///
/// Every hook except [`render`](Self::render) is optional. A failing hook aborts
/// preparation of the subtree it belongs to.
///
/// ```
/// use preparable_core::{Component, Context, Node, Props};
///
/// struct Greeting {
///     name: String,
/// }
///
/// impl Component for Greeting {
///     fn create(props: &Props, _context: &Context) -> anyhow::Result<Self> {
///         let name = props.get_str("name").unwrap_or("world").to_owned();
///         Ok(Self { name })
///     }
///
///     fn render(&mut self) -> anyhow::Result<Node> {
///         Ok(Node::host("p").child(format!("Hello, {}!", self.name)).build())
///     }
/// }
/// ```
pub trait Component: 'static {
    /// Constructs a fresh instance from props and the context it is rendered in.
    ///
    /// # Errors
    ///
    /// Fails the preparation pass for this subtree.
    fn create(props: &Props, context: &Context) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Called once, right after construction.
    ///
    /// # Errors
    ///
    /// Fails the preparation pass for this subtree.
    fn will_mount(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Produces the children of this instance.
    ///
    /// # Errors
    ///
    /// Fails the preparation pass for this subtree.
    fn render(&mut self) -> anyhow::Result<Node>;

    /// The context handed to the children, or `None` to pass `context` through.
    fn child_context(&self, context: &Context) -> Option<Context> {
        let _ = context;
        None
    }

    /// Called when the instance is torn down.
    ///
    /// # Errors
    ///
    /// Reported to the caller of the preparation pass.
    fn will_unmount(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called before re-rendering with new props.
    ///
    /// # Errors
    ///
    /// Aborts the update.
    fn receive_props(&mut self, props: &Props) -> anyhow::Result<()> {
        let _ = props;
        Ok(())
    }

    /// Local state, if the component keeps any.
    fn state(&self) -> Option<&State> {
        None
    }
}

type Constructor = dyn Fn(&Props, &Context) -> anyhow::Result<Box<dyn Component>>;

/// Decides whether an instance should re-render, given
/// `(props, state, next_props, next_state)`.
pub type UpdateGuard = Rc<dyn Fn(&Props, Option<&State>, &Props, Option<&State>) -> bool>;

/// The type of a composite element.
///
/// Cloning is cheap. Decorators in [`crate::decorate`] return new types derived
/// from an existing one.
#[derive(Clone)]
pub struct CompositeType {
    name: Cow<'static, str>,
    construct: Rc<Constructor>,
    resolver: Option<Resolver>,
    update_guard: Option<UpdateGuard>,
}

impl CompositeType {
    /// The composite type of a [`Component`] implementation.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            name: Cow::Borrowed(short_type_name::<C>()),
            construct: Rc::new(|props, context| {
                C::create(props, context).map(|component| Box::new(component) as Box<dyn Component>)
            }),
            resolver: None,
            update_guard: None,
        }
    }

    /// Overrides the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dependency resolver, if this type is preparable.
    #[must_use]
    pub const fn resolver(&self) -> Option<&Resolver> {
        self.resolver.as_ref()
    }

    /// Returns `true` if this type declares a dependency.
    #[must_use]
    pub const fn is_preparable(&self) -> bool {
        self.resolver.is_some()
    }

    /// The re-render guard, if any.
    #[must_use]
    pub const fn update_guard(&self) -> Option<&UpdateGuard> {
        self.update_guard.as_ref()
    }

    pub(crate) fn set_resolver(&mut self, resolver: Resolver) {
        self.resolver = Some(resolver);
    }

    pub(crate) fn set_update_guard(&mut self, guard: UpdateGuard) {
        self.update_guard = Some(guard);
    }

    pub(crate) fn construct(
        &self,
        props: &Props,
        context: &Context,
    ) -> anyhow::Result<Box<dyn Component>> {
        (self.construct)(props, context)
    }
}

impl Debug for CompositeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeType")
            .field("name", &self.name)
            .field("preparable", &self.is_preparable())
            .field("guarded", &self.update_guard.is_some())
            .finish_non_exhaustive()
    }
}

type RenderFn = dyn Fn(&Props) -> anyhow::Result<Node>;

/// The type of a function element: invoked once with its props, never carries a
/// dependency.
#[derive(Clone)]
pub struct FunctionType {
    name: Cow<'static, str>,
    render: Rc<RenderFn>,
}

impl FunctionType {
    /// Wraps a render function.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, render: F) -> Self
    where
        F: Fn(&Props) -> anyhow::Result<Node> + 'static,
    {
        Self {
            name: name.into(),
            render: Rc::new(render),
        }
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function.
    ///
    /// # Errors
    ///
    /// Returns the error raised by the function.
    pub fn call(&self, props: &Props) -> anyhow::Result<Node> {
        (self.render)(props)
    }
}

impl Debug for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod widgets {
        pub struct Panel;
    }

    impl Component for widgets::Panel {
        fn create(_props: &Props, _context: &Context) -> anyhow::Result<Self> {
            Ok(Self)
        }

        fn render(&mut self) -> anyhow::Result<Node> {
            Ok(Node::Empty)
        }
    }

    #[test]
    fn composite_type_uses_short_name() {
        let ty = CompositeType::of::<widgets::Panel>();
        assert_eq!(ty.name(), "Panel");
        assert!(!ty.is_preparable());
        assert_eq!(ty.named("Sidebar").name(), "Sidebar");
    }

    #[test]
    fn function_type_forwards_props() {
        let ty = FunctionType::new("Echo", |props| Ok(props.children().clone()));
        let mut props = Props::new();
        props.set_children("hi");
        assert!(ty.call(&props).unwrap().shallow_eq(&Node::from("hi")));
    }
}
