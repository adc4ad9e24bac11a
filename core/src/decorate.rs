//! Decorators deriving new composite types from existing ones.
//!
//! ```
//! use preparable_core::{
//!     Component, CompositeType, Context, Node, PendingDependency, Props, pure, with_dependency,
//! };
//!
//! struct Feed;
//!
//! impl Component for Feed {
//!     fn create(_: &Props, _: &Context) -> anyhow::Result<Self> {
//!         Ok(Self)
//!     }
//!
//!     fn render(&mut self) -> anyhow::Result<Node> {
//!         Ok(Node::host("ol").build())
//!     }
//! }
//!
//! let fetch_feed = with_dependency(|_props, _context| {
//!     Ok(PendingDependency::deferred(async { Ok(()) }))
//! });
//! let feed = pure(fetch_feed(CompositeType::of::<Feed>()));
//!
//! assert!(feed.is_preparable());
//! assert_eq!(feed.name(), "Pure(Preparable(Feed))");
//! ```

use std::rc::Rc;

use crate::{CompositeType, Context, PendingDependency, Props, Resolver, State};

impl CompositeType {
    /// Derives a type whose dependency is `resolver`. If `self` already declares
    /// one, both are invoked (inherited first) and the derived dependency
    /// completes once both have.
    #[must_use]
    pub fn preparable(mut self, resolver: Resolver) -> Self {
        let resolver = match self.resolver().cloned() {
            Some(inherited) => inherited.and(resolver),
            None => resolver,
        };
        self.set_resolver(resolver);
        let name = format!("Preparable({})", self.name());
        self.named(name)
    }

    /// Derives a type that skips re-rendering when props and state are shallowly
    /// equal.
    #[must_use]
    pub fn pure(mut self) -> Self {
        self.set_update_guard(Rc::new(pure_should_update));
        let name = format!("Pure({})", self.name());
        self.named(name)
    }
}

/// Returns a decorator attaching `resolve` as the dependency of a composite type,
/// composing with any dependency the type already has.
pub fn with_dependency<F>(resolve: F) -> impl Fn(CompositeType) -> CompositeType
where
    F: Fn(&Props, &Context) -> anyhow::Result<PendingDependency> + 'static,
{
    let resolver = Resolver::new(resolve);
    move |ty| ty.preparable(resolver.clone())
}

/// Returns a decorator attaching a shallow-equality re-render guard.
pub fn with_pure_render_guard() -> impl Fn(CompositeType) -> CompositeType {
    CompositeType::pure
}

/// Shorthand for `with_pure_render_guard()(ty)`.
#[must_use]
pub fn pure(ty: CompositeType) -> CompositeType {
    ty.pure()
}

/// Shallow equality of two optional states.
#[must_use]
pub fn shallow_equal_state(a: Option<&State>, b: Option<&State>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
        }
        _ => false,
    }
}

fn pure_should_update(
    props: &Props,
    state: Option<&State>,
    next_props: &Props,
    next_state: Option<&State>,
) -> bool {
    !(props.shallow_eq(next_props) && shallow_equal_state(state, next_state))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::Value;

    use super::*;
    use crate::{Component, Instance, Node};

    struct Counter {
        renders: Rc<Cell<u32>>,
        state: State,
    }

    impl Component for Counter {
        fn create(_: &Props, context: &Context) -> anyhow::Result<Self> {
            let renders = context
                .get_shared::<Cell<u32>>("renders")
                .unwrap_or_default();
            let mut state = State::new();
            state.insert("open".into(), Value::Bool(false));
            Ok(Self { renders, state })
        }

        fn render(&mut self) -> anyhow::Result<Node> {
            self.renders.set(self.renders.get() + 1);
            Ok(Node::Empty)
        }

        fn state(&self) -> Option<&State> {
            Some(&self.state)
        }
    }

    #[test]
    fn pure_guard_skips_equal_props() {
        let renders = Rc::new(Cell::new(0_u32));
        let mut context = Context::new();
        context.insert_shared("renders", renders.clone());
        let ty = with_pure_render_guard()(CompositeType::of::<Counter>());
        let props = Props::new().with("id", 7);

        let mut instance = Instance::instantiate(&ty, &props, &context).unwrap();
        instance.render(&context).unwrap();
        assert_eq!(renders.get(), 1);

        assert!(instance.update(Props::new().with("id", 7), &context).unwrap().is_none());
        assert_eq!(renders.get(), 1);

        assert!(instance.update(Props::new().with("id", 8), &context).unwrap().is_some());
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn pure_guard_compares_state() {
        let ty = pure(CompositeType::of::<Counter>());
        let props = Props::new();
        let instance = Instance::instantiate(&ty, &props, &Context::new()).unwrap();

        let mut opened = State::new();
        opened.insert("open".into(), Value::Bool(true));
        assert!(instance.should_update(&props, Some(&opened)));

        let mut closed = State::new();
        closed.insert("open".into(), Value::Bool(false));
        assert!(!instance.should_update(&props, Some(&closed)));
    }

    #[test]
    fn shallow_state_equality() {
        assert!(shallow_equal_state(None, None));
        assert!(!shallow_equal_state(Some(&State::new()), None));
        assert!(shallow_equal_state(Some(&State::new()), Some(&State::new())));
    }

    #[test]
    fn decorating_twice_composes_resolvers() {
        let calls = Rc::new(Cell::new(0_u32));
        let counted = |calls: &Rc<Cell<u32>>| {
            let calls = calls.clone();
            with_dependency(move |_, _| {
                calls.set(calls.get() + 1);
                Ok(PendingDependency::Ready)
            })
        };

        let ty = counted(&calls)(counted(&calls)(CompositeType::of::<Counter>()));
        let pending = ty
            .resolver()
            .unwrap()
            .resolve(&Props::new(), &Context::new())
            .unwrap();

        assert!(pending.is_ready());
        assert_eq!(calls.get(), 2);
        assert_eq!(ty.name(), "Preparable(Preparable(Counter))");
    }
}
