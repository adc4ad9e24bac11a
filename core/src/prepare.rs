//! The preparation engine.
//!
//! [`Preparer::prepare`] walks a tree depth-first and pre-order. For every
//! composite node it resolves the node's own dependency, then instantiates and
//! renders it, then recurses into what it rendered with the context it produced.
//!
//! The walk stays synchronous for as long as it can. A [`Step`] is either a value
//! that is already available or a future for it, and futures are only created
//! where a dependency is actually deferred:
//!
//! - no deferred dependency anywhere: [`Step::Ready`], no allocation of futures;
//! - exactly one deferred subtree among a node's children: that subtree's future
//!   is returned as is;
//! - several: they are joined, failing on the first error.
//!
//! Siblings are always started left to right, each with the context produced by
//! their parent's render step. Once several are waiting, the order in which they
//! complete is unspecified.

use core::fmt::{self, Debug};
use core::future::IntoFuture;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture, TryFutureExt};

use crate::classify::{Classified, classify};
use crate::{
    CompositeType, Context, Element, Instance, Node, PendingDependency, PrepareError, Stats,
};

/// When the `will_unmount` hook of a composite instance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum UnmountTiming {
    /// Right after the instance rendered, before any descendant is prepared.
    #[default]
    AfterRender,
    /// Once the instance's whole subtree has settled, successfully or not.
    AfterSubtree,
}

/// Tunables of a [`Preparer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct PrepareOptions {
    /// Placement of the unmount hook relative to descendant preparation.
    pub unmount: UnmountTiming,
    /// Log the synchronous/asynchronous satisfaction counts at `info` level when a
    /// pass completes. They are always logged at `debug`.
    pub log_counts: bool,
}

impl PrepareOptions {
    /// Sets [`PrepareOptions::unmount`].
    #[must_use]
    pub const fn unmount(mut self, timing: UnmountTiming) -> Self {
        self.unmount = timing;
        self
    }

    /// Sets [`PrepareOptions::log_counts`].
    #[must_use]
    pub const fn log_counts(mut self, enabled: bool) -> Self {
        self.log_counts = enabled;
        self
    }
}

/// A value that is either available now or will be.
///
/// Awaiting a step (it implements [`IntoFuture`]) is the uniform way to consume
/// it; [`Step::is_ready`] tells whether that would allocate.
pub enum Step<T> {
    /// Available synchronously.
    Ready(T),
    /// Available once the future completes.
    Deferred(LocalBoxFuture<'static, Result<T, PrepareError>>),
}

impl<T: 'static> Step<T> {
    /// Returns `true` if no asynchronous work is involved.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Chains a possibly asynchronous continuation, staying synchronous when
    /// both `self` and the continuation are.
    ///
    /// # Errors
    ///
    /// Returns the continuation's error when `self` is ready.
    pub fn then<U, F>(self, continuation: F) -> Result<Step<U>, PrepareError>
    where
        U: 'static,
        F: FnOnce(T) -> Result<Step<U>, PrepareError> + 'static,
    {
        match self {
            Self::Ready(value) => continuation(value),
            Self::Deferred(future) => Ok(Step::Deferred(
                async move { continuation(future.await?)?.await }.boxed_local(),
            )),
        }
    }
}

impl Step<()> {
    /// Joins the steps of sibling subtrees.
    pub fn join_all(steps: Vec<Self>) -> Self {
        let mut deferred: Vec<_> = steps
            .into_iter()
            .filter_map(|step| match step {
                Self::Ready(()) => None,
                Self::Deferred(future) => Some(future),
            })
            .collect();
        match deferred.len() {
            0 => Self::Ready(()),
            1 => Self::Deferred(deferred.remove(0)),
            _ => Self::Deferred(future::try_join_all(deferred).map_ok(drop).boxed_local()),
        }
    }
}

impl<T: 'static> IntoFuture for Step<T> {
    type Output = Result<T, PrepareError>;
    type IntoFuture = LocalBoxFuture<'static, Result<T, PrepareError>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(value) => future::ready(Ok(value)).boxed_local(),
            Self::Deferred(future) => future,
        }
    }
}

impl<T: Debug> Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// What one node expanded to.
#[derive(Debug)]
pub struct Expansion {
    /// The nodes to prepare next.
    pub children: Node,
    /// The context to prepare them with.
    pub context: Context,
    instance: Option<Instance>,
}

impl Expansion {
    /// An expansion with no live instance attached.
    #[must_use]
    pub const fn new(children: Node, context: Context) -> Self {
        Self {
            children,
            context,
            instance: None,
        }
    }

    /// Returns `true` if the expansion still holds an instance to dispose, which
    /// only happens under [`UnmountTiming::AfterSubtree`].
    #[must_use]
    pub const fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    /// Disposes the attached instance, if any.
    ///
    /// # Errors
    ///
    /// Returns the error of the `will_unmount` hook.
    pub fn dispose(&mut self) -> Result<(), PrepareError> {
        self.instance.take().map_or(Ok(()), Instance::dispose)
    }
}

/// Runs preparation passes.
///
/// Cloning a preparer shares its [`Stats`]: passes running at the same time
/// through clones reset and add to the same counters. Use
/// [`Preparer::detached`] for a preparer that counts on its own.
#[derive(Debug, Clone, Default)]
pub struct Preparer {
    options: PrepareOptions,
    stats: Stats,
}

impl Preparer {
    /// A preparer with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A preparer with the given options.
    #[must_use]
    pub fn with_options(options: PrepareOptions) -> Self {
        Self {
            options,
            stats: Stats::new(),
        }
    }

    /// A preparer with the same options and its own counters.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self::with_options(self.options)
    }

    /// The options in use.
    #[must_use]
    pub const fn options(&self) -> &PrepareOptions {
        &self.options
    }

    /// Counters of the most recent pass.
    #[must_use]
    pub const fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Prepares a whole tree, resetting the counters first.
    ///
    /// Callers must not assume a shape for the result: await it either way.
    ///
    /// ```
    /// # futures::executor::block_on(async {
    /// use preparable_core::{Context, Node, Preparer};
    ///
    /// let tree = Node::host("main").build();
    /// Preparer::new().prepare(&tree, &Context::new())?.await?;
    /// # Ok::<(), preparable_core::PrepareError>(())
    /// # }).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Synchronous failures are returned directly; failures of deferred work are
    /// returned by the step once awaited.
    pub fn prepare(&self, root: &Node, context: &Context) -> Result<Step<()>, PrepareError> {
        self.stats.reset();
        let step = self.prepare_subtree(root, context)?;
        let preparer = self.clone();
        match step {
            Step::Ready(()) => {
                preparer.report();
                Ok(Step::Ready(()))
            }
            Step::Deferred(future) => Ok(Step::Deferred(
                future
                    .inspect(move |_| preparer.report())
                    .boxed_local(),
            )),
        }
    }

    fn report(&self) {
        let stats = self.stats.snapshot();
        if self.options.log_counts {
            tracing::info!(
                synchronous = stats.synchronous,
                asynchronous = stats.asynchronous,
                "tree prepared"
            );
        } else {
            tracing::debug!(
                synchronous = stats.synchronous,
                asynchronous = stats.asynchronous,
                "tree prepared"
            );
        }
    }

    /// Prepares `node` and everything below it.
    ///
    /// # Errors
    ///
    /// See [`Preparer::prepare`].
    pub fn prepare_subtree(&self, node: &Node, context: &Context) -> Result<Step<()>, PrepareError> {
        let expansion = self.prepare_node(node, context)?;
        let preparer = self.clone();
        expansion.then(move |expansion| preparer.recur_on_children(expansion))
    }

    /// Satisfies the own dependency of `node` (not its descendants') and expands
    /// it one level.
    ///
    /// Under [`UnmountTiming::AfterSubtree`] a composite expansion keeps its
    /// instance alive; the caller is responsible for [`Expansion::dispose`].
    ///
    /// # Errors
    ///
    /// See [`Preparer::prepare`].
    pub fn prepare_node(
        &self,
        node: &Node,
        context: &Context,
    ) -> Result<Step<Expansion>, PrepareError> {
        match classify(node) {
            Classified::Plain => {
                self.stats.record_plain();
                Ok(Step::Ready(Expansion::new(Node::Empty, context.clone())))
            }
            Classified::Fragment(fragment) => Ok(Step::Ready(Expansion::new(
                fragment.clone(),
                context.clone(),
            ))),
            Classified::Host(element) => {
                self.stats.record_host();
                tracing::trace!(tag = element.ty().name(), "host node");
                Ok(Step::Ready(Expansion::new(
                    element.props().children().clone(),
                    context.clone(),
                )))
            }
            Classified::Function(element, ty) => {
                self.stats.record_function();
                tracing::trace!(function = ty.name(), "function node");
                let children = ty
                    .call(element.props())
                    .map_err(|source| PrepareError::function(ty.name(), source))?;
                Ok(Step::Ready(Expansion::new(children, context.clone())))
            }
            Classified::Composite(element, ty) => self.prepare_composite(element, ty, context),
        }
    }

    fn prepare_composite(
        &self,
        element: &Element,
        ty: &CompositeType,
        context: &Context,
    ) -> Result<Step<Expansion>, PrepareError> {
        match satisfy(element, ty, context)? {
            PendingDependency::Ready => {
                self.stats.record_synchronous();
                tracing::debug!(component = ty.name(), "dependency satisfied synchronously");
                self.create_render_dispose(element, ty, context).map(Step::Ready)
            }
            PendingDependency::Deferred(dependency) => {
                self.stats.record_asynchronous();
                tracing::debug!(component = ty.name(), "waiting for dependency");
                let preparer = self.clone();
                let element = element.clone();
                let ty = ty.clone();
                let context = context.clone();
                Ok(Step::Deferred(
                    async move {
                        dependency
                            .await
                            .map_err(|source| PrepareError::dependency(ty.name(), source))?;
                        tracing::debug!(component = ty.name(), "dependency settled");
                        preparer.create_render_dispose(&element, &ty, &context)
                    }
                    .boxed_local(),
                ))
            }
        }
    }

    fn create_render_dispose(
        &self,
        element: &Element,
        ty: &CompositeType,
        context: &Context,
    ) -> Result<Expansion, PrepareError> {
        let mut instance = Instance::instantiate(ty, element.props(), context)?;
        let (children, child_context) = instance.render(context)?;
        let mut expansion = Expansion::new(children, child_context);
        match self.options.unmount {
            UnmountTiming::AfterRender => instance.dispose()?,
            UnmountTiming::AfterSubtree => expansion.instance = Some(instance),
        }
        Ok(expansion)
    }

    fn recur_on_children(&self, mut expansion: Expansion) -> Result<Step<()>, PrepareError> {
        let instance = expansion.instance.take();
        let children = self.prepare_children(&expansion.children, &expansion.context);
        match instance {
            None => children,
            Some(instance) => dispose_after(instance, children),
        }
    }

    fn prepare_children(&self, children: &Node, context: &Context) -> Result<Step<()>, PrepareError> {
        let steps = children
            .flatten()
            .into_iter()
            .map(|child| self.prepare_subtree(child, context))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Step::join_all(steps))
    }
}

fn satisfy(
    element: &Element,
    ty: &CompositeType,
    context: &Context,
) -> Result<PendingDependency, PrepareError> {
    ty.resolver().map_or(Ok(PendingDependency::Ready), |resolver| {
        resolver
            .resolve(element.props(), context)
            .map_err(|source| PrepareError::dependency(ty.name(), source))
    })
}

fn dispose_after(
    instance: Instance,
    subtree: Result<Step<()>, PrepareError>,
) -> Result<Step<()>, PrepareError> {
    match subtree {
        Ok(Step::Ready(())) => instance.dispose().map(Step::Ready),
        Ok(Step::Deferred(future)) => {
            let pending = PendingUnmount(Some(instance));
            Ok(Step::Deferred(
                async move {
                    let settled = future.await;
                    pending.settle(settled)
                }
                .boxed_local(),
            ))
        }
        Err(error) => finish(instance, Err(error)).map(Step::Ready),
    }
}

/// An instance waiting for its subtree.
///
/// A subtree is abandoned when a sibling fails first and the join drops it; the
/// instance is then unmounted on drop.
struct PendingUnmount(Option<Instance>);

impl PendingUnmount {
    fn settle(mut self, settled: Result<(), PrepareError>) -> Result<(), PrepareError> {
        match self.0.take() {
            Some(instance) => finish(instance, settled),
            None => settled,
        }
    }
}

impl Drop for PendingUnmount {
    fn drop(&mut self) {
        if let Some(instance) = self.0.take() {
            let name = instance.name().to_owned();
            tracing::debug!(component = %name, "subtree abandoned");
            if let Err(unmount) = instance.dispose() {
                tracing::warn!(component = %name, error = %unmount, "unmount failed after an abandoned subtree");
            }
        }
    }
}

fn finish(instance: Instance, settled: Result<(), PrepareError>) -> Result<(), PrepareError> {
    match settled {
        Ok(()) => instance.dispose(),
        Err(error) => {
            let name = instance.name().to_owned();
            if let Err(unmount) = instance.dispose() {
                tracing::warn!(component = %name, error = %unmount, "unmount failed after an aborted subtree");
            }
            Err(error)
        }
    }
}
