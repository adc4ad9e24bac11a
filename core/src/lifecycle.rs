//! Lifecycle emulation for composite nodes, without a host renderer.
//!
//! An [`Instance`] lives for one preparation pass: it is instantiated (`create`
//! then `will_mount`), rendered once, and disposed (`will_unmount`). Instantiation
//! and rendering are always sequential and synchronous relative to each other.

use core::fmt::{self, Debug};

use crate::{Component, CompositeType, Context, Hook, Node, PrepareError, Props, State};

/// Ephemeral state of one composite node.
pub struct Instance {
    ty: CompositeType,
    props: Props,
    component: Box<dyn Component>,
}

impl Instance {
    /// Constructs the component and runs its `will_mount` hook.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if construction or `will_mount` fails.
    pub fn instantiate(
        ty: &CompositeType,
        props: &Props,
        context: &Context,
    ) -> Result<Self, PrepareError> {
        let mut component = ty
            .construct(props, context)
            .map_err(|source| PrepareError::lifecycle(ty.name(), Hook::Create, source))?;
        component
            .will_mount()
            .map_err(|source| PrepareError::lifecycle(ty.name(), Hook::WillMount, source))?;
        Ok(Self {
            ty: ty.clone(),
            props: props.clone(),
            component,
        })
    }

    /// Renders the instance, returning its children and the context they should
    /// be prepared with.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if `render` fails.
    pub fn render(&mut self, context: &Context) -> Result<(Node, Context), PrepareError> {
        let children = self
            .component
            .render()
            .map_err(|source| PrepareError::lifecycle(self.ty.name(), Hook::Render, source))?;
        let child_context = self
            .component
            .child_context(context)
            .unwrap_or_else(|| context.clone());
        Ok((children, child_context))
    }

    /// Runs the `will_unmount` hook and drops the instance.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if `will_unmount` fails.
    pub fn dispose(mut self) -> Result<(), PrepareError> {
        self.component
            .will_unmount()
            .map_err(|source| PrepareError::lifecycle(self.ty.name(), Hook::WillUnmount, source))
    }

    /// Whether new props (and state) warrant a re-render. Without a guard on the
    /// type, always `true`.
    #[must_use]
    pub fn should_update(&self, next_props: &Props, next_state: Option<&State>) -> bool {
        self.ty.update_guard().is_none_or(|guard| {
            guard(&self.props, self.component.state(), next_props, next_state)
        })
    }

    /// Feeds new props to the instance and re-renders it, unless the type's guard
    /// says the output cannot change. Returns `None` when the render was skipped.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if `receive_props` or `render` fails.
    pub fn update(
        &mut self,
        next_props: Props,
        context: &Context,
    ) -> Result<Option<(Node, Context)>, PrepareError> {
        if !self.should_update(&next_props, self.component.state()) {
            tracing::trace!(component = self.ty.name(), "re-render skipped");
            self.props = next_props;
            return Ok(None);
        }
        self.component
            .receive_props(&next_props)
            .map_err(|source| PrepareError::lifecycle(self.ty.name(), Hook::ReceiveProps, source))?;
        self.props = next_props;
        self.render(context).map(Some)
    }

    /// The display name of the instance's type.
    #[must_use]
    pub fn name(&self) -> &str {
        self.ty.name()
    }

    /// The props the instance was last given.
    #[must_use]
    pub const fn props(&self) -> &Props {
        &self.props
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.ty.name())
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}
