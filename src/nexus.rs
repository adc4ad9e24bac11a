//! Binding collections and their scoped installation.
//!
//! A [`Nexus`] maps binding names to store-like [`Binding`]s. While an application
//! is prefetched, rendered or mounted, its nexus is the *current* one on the
//! calling thread. Installation is always scoped: [`NexusScope`] restores the
//! previous value when dropped, whether the guarded work succeeded, failed or
//! panicked.
//!
//! Across suspension points the nexus is re-installed on every poll by
//! [`WithNexus`], so two unrelated passes interleaved on one thread each observe
//! their own nexus.

use core::cell::RefCell;
use core::fmt::{self, Debug};
use core::marker::PhantomData;
use core::pin::Pin;
use core::task::{Context as TaskContext, Poll};
use std::future::Future;
use std::rc::Rc;

use indexmap::IndexMap;
use pin_project_lite::pin_project;
use preparable_core::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// Key under which the nexus of the running pass is stored in the [`Context`].
pub const NEXUS_CONTEXT_KEY: &str = "preparable.nexus";

/// A store or dispatcher able to record what it fetched during a prefetch pass
/// and to serve those results back during a render.
pub trait Binding {
    /// Starts recording fetched results.
    fn start_prefetching(&self);
    /// Stops recording and returns everything fetched since
    /// [`start_prefetching`](Self::start_prefetching).
    fn stop_prefetching(&self) -> Value;
    /// Makes previously prefetched results available synchronously.
    fn start_injecting(&self, data: Value);
    /// Stops serving injected results.
    fn stop_injecting(&self);
}

/// An ordered collection of named bindings.
#[derive(Clone, Default)]
pub struct Nexus {
    bindings: IndexMap<String, Rc<dyn Binding>>,
}

impl Nexus {
    /// Creates an empty nexus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, binding: impl Binding + 'static) -> Self {
        self.insert(name, Rc::new(binding));
        self
    }

    /// Adds or replaces a binding.
    pub fn insert(&mut self, name: impl Into<String>, binding: Rc<dyn Binding>) {
        self.bindings.insert(name.into(), binding);
    }

    /// Looks up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rc<dyn Binding>> {
        self.bindings.get(name)
    }

    /// Returns `true` if a binding is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bindings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<dyn Binding>)> {
        self.bindings.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The nexus of the pass a context belongs to.
    #[must_use]
    pub fn from_context(context: &Context) -> Option<Rc<Self>> {
        context.get_shared(NEXUS_CONTEXT_KEY)
    }

    /// Returns `context` with this nexus stored under [`NEXUS_CONTEXT_KEY`].
    #[must_use]
    pub fn attach(&self, context: &Context) -> Context {
        let mut context = context.clone();
        context.insert_shared(NEXUS_CONTEXT_KEY, Rc::new(self.clone()));
        context
    }
}

impl Debug for Nexus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.bindings.keys()).finish()
    }
}

/// Results of a prefetch pass, keyed by binding name.
///
/// Serializable so that a server can embed it in its response and a client can
/// hand it back to [`App::mount`](crate::App::mount).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefetchedData(IndexMap<String, Value>);

impl PrefetchedData {
    /// Creates empty data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The data recorded by one binding.
    #[must_use]
    pub fn get(&self, binding: &str) -> Option<&Value> {
        self.0.get(binding)
    }

    /// Records the data of one binding.
    pub fn insert(&mut self, binding: impl Into<String>, data: Value) {
        self.0.insert(binding.into(), data);
    }

    /// Number of bindings with data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no binding recorded anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Nexus>> = const { RefCell::new(None) };
}

/// The nexus installed on this thread, if any.
#[must_use]
pub fn current_nexus() -> Option<Nexus> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Runs `f` with `nexus` installed as the current one.
pub fn with_nexus<R>(nexus: &Nexus, f: impl FnOnce() -> R) -> R {
    let _scope = NexusScope::enter(nexus.clone());
    f()
}

/// Installs a nexus as the current one until dropped.
#[must_use = "the nexus is uninstalled as soon as the scope is dropped"]
pub struct NexusScope {
    previous: Option<Nexus>,
    _thread_bound: PhantomData<Rc<()>>,
}

impl NexusScope {
    /// Installs `nexus`, remembering whatever was current before.
    pub fn enter(nexus: Nexus) -> Self {
        let previous = CURRENT.with(|current| current.replace(Some(nexus)));
        Self {
            previous,
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for NexusScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

impl Debug for NexusScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NexusScope")
            .field("previous", &self.previous)
            .finish()
    }
}

pin_project! {
    /// A future that runs every poll of its inner future with a nexus installed.
    #[derive(Debug)]
    #[must_use = "futures do nothing unless polled"]
    pub struct WithNexus<F> {
        nexus: Nexus,
        #[pin]
        inner: F,
    }
}

impl<F> WithNexus<F> {
    /// Wraps `inner`.
    pub const fn new(nexus: Nexus, inner: F) -> Self {
        Self { nexus, inner }
    }
}

impl<F: Future> Future for WithNexus<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _scope = NexusScope::enter(this.nexus.clone());
        this.inner.poll(cx)
    }
}

/// Every binding of a nexus recording, until finished or dropped.
#[derive(Debug)]
pub(crate) struct PrefetchSession<'a> {
    nexus: &'a Nexus,
    active: bool,
}

impl<'a> PrefetchSession<'a> {
    pub(crate) fn start(nexus: &'a Nexus) -> Self {
        for (name, binding) in nexus.iter() {
            tracing::trace!(binding = name, "start prefetching");
            binding.start_prefetching();
        }
        Self {
            nexus,
            active: true,
        }
    }

    pub(crate) fn finish(mut self) -> PrefetchedData {
        self.active = false;
        let mut data = PrefetchedData::new();
        for (name, binding) in self.nexus.iter() {
            data.insert(name, binding.stop_prefetching());
        }
        data
    }
}

impl Drop for PrefetchSession<'_> {
    fn drop(&mut self) {
        if self.active {
            for (name, binding) in self.nexus.iter() {
                tracing::debug!(binding = name, "discarding prefetched data");
                drop(binding.stop_prefetching());
            }
        }
    }
}

/// Every binding of a nexus serving prefetched data, until dropped.
#[derive(Debug)]
pub(crate) struct InjectionSession<'a> {
    nexus: &'a Nexus,
}

impl<'a> InjectionSession<'a> {
    pub(crate) fn start(nexus: &'a Nexus, data: &PrefetchedData) -> Result<Self, Error> {
        if let Some((name, _)) = nexus.iter().find(|(name, _)| data.get(name).is_none()) {
            return Err(Error::MissingPrefetchedData {
                binding: name.to_owned(),
            });
        }
        for (name, binding) in nexus.iter() {
            if let Some(value) = data.get(name) {
                binding.start_injecting(value.clone());
            }
        }
        Ok(Self { nexus })
    }
}

impl Drop for InjectionSession<'_> {
    fn drop(&mut self) {
        for (_, binding) in self.nexus.iter() {
            binding.stop_injecting();
        }
    }
}
