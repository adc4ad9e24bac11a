//! The capability protocol: how a composite type declares an asynchronous data
//! dependency.
//!
//! A [`CompositeType`](crate::CompositeType) either carries a [`Resolver`] or it
//! does not. Absence costs one `Option` check during preparation. When present,
//! the resolver is called with the element's props and context before the element
//! is rendered and returns a [`PendingDependency`]:
//!
//! - [`PendingDependency::Ready`]: nothing to wait for, the element stays on the
//!   synchronous path.
//! - [`PendingDependency::Deferred`]: in-flight work; the element is rendered once
//!   it completes.
//!
//! A resolver returning `Err` synchronously fails the pass immediately.

use core::fmt::{self, Debug};
use core::future::{Future, IntoFuture};
use std::rc::Rc;

use futures::future::{self, LocalBoxFuture, TryFutureExt};
use futures::FutureExt;

use crate::{Context, Props};

/// Result of calling a [`Resolver`].
pub enum PendingDependency {
    /// Already satisfied.
    Ready,
    /// Satisfied once the future completes successfully.
    Deferred(LocalBoxFuture<'static, anyhow::Result<()>>),
}

impl PendingDependency {
    /// A dependency with nothing left to do.
    #[must_use]
    pub const fn ready() -> Self {
        Self::Ready
    }

    /// Wraps in-flight work.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        Self::Deferred(future.boxed_local())
    }

    /// Returns `true` when there is nothing to wait for.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Completes once both dependencies have completed, failing with whichever
    /// fails first. Two ready dependencies stay ready.
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::Ready, other) | (other, Self::Ready) => other,
            (Self::Deferred(a), Self::Deferred(b)) => {
                Self::Deferred(future::try_join(a, b).map_ok(|((), ())| ()).boxed_local())
            }
        }
    }

    /// Joins any number of dependencies. Only allocates a combinator when more
    /// than one of them is deferred.
    pub fn all(dependencies: impl IntoIterator<Item = Self>) -> Self {
        let mut deferred: Vec<_> = dependencies
            .into_iter()
            .filter_map(|dependency| match dependency {
                Self::Ready => None,
                Self::Deferred(future) => Some(future),
            })
            .collect();
        match deferred.len() {
            0 => Self::Ready,
            1 => Self::Deferred(deferred.remove(0)),
            _ => Self::Deferred(future::try_join_all(deferred).map_ok(drop).boxed_local()),
        }
    }
}

impl Default for PendingDependency {
    fn default() -> Self {
        Self::Ready
    }
}

impl Debug for PendingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl IntoFuture for PendingDependency {
    type Output = anyhow::Result<()>;
    type IntoFuture = LocalBoxFuture<'static, anyhow::Result<()>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready => future::ready(Ok(())).boxed_local(),
            Self::Deferred(future) => future,
        }
    }
}

type ResolveFn = dyn Fn(&Props, &Context) -> anyhow::Result<PendingDependency>;

/// A shared dependency-resolution function.
#[derive(Clone)]
pub struct Resolver(Rc<ResolveFn>);

impl Resolver {
    /// Wraps a resolution function.
    pub fn new<F>(resolve: F) -> Self
    where
        F: Fn(&Props, &Context) -> anyhow::Result<PendingDependency> + 'static,
    {
        Self(Rc::new(resolve))
    }

    /// Calls the resolver.
    ///
    /// # Errors
    ///
    /// Returns whatever synchronous error the resolution function raised.
    pub fn resolve(&self, props: &Props, context: &Context) -> anyhow::Result<PendingDependency> {
        (self.0)(props, context)
    }

    /// A resolver that calls `self`, then `other`, and completes once both have.
    /// A synchronous failure of `self` skips `other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::new(move |props, context| {
            let first = self.resolve(props, context)?;
            let second = other.resolve(props, context)?;
            Ok(first.join(second))
        })
    }
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::channel::oneshot;
    use futures::executor::block_on;

    use super::*;

    fn deferred_ok() -> PendingDependency {
        PendingDependency::deferred(async { Ok(()) })
    }

    #[test]
    fn joining_ready_dependencies_stays_synchronous() {
        assert!(PendingDependency::Ready.join(PendingDependency::Ready).is_ready());
        assert!(PendingDependency::all([PendingDependency::Ready, PendingDependency::Ready]).is_ready());
        assert!(PendingDependency::all([]).is_ready());
    }

    #[test]
    fn joining_with_one_deferred_yields_it() {
        assert!(!PendingDependency::Ready.join(deferred_ok()).is_ready());
        assert!(!deferred_ok().join(PendingDependency::Ready).is_ready());
        block_on(PendingDependency::all([PendingDependency::Ready, deferred_ok()]).into_future()).unwrap();
    }

    #[test]
    fn joined_failure_propagates() {
        let (tx, rx) = oneshot::channel::<()>();
        let pending = PendingDependency::deferred(async move {
            rx.await?;
            Ok(())
        })
        .join(PendingDependency::deferred(async { Err(anyhow::anyhow!("offline")) }));

        let error = block_on(pending.into_future()).unwrap_err();
        assert_eq!(error.to_string(), "offline");
        drop(tx);
    }

    #[test]
    fn combined_resolver_calls_both_in_order() {
        let calls = Rc::new(Cell::new(0_u8));
        let first = {
            let calls = calls.clone();
            Resolver::new(move |_, _| {
                assert_eq!(calls.replace(1), 0);
                Ok(PendingDependency::Ready)
            })
        };
        let second = {
            let calls = calls.clone();
            Resolver::new(move |_, _| {
                assert_eq!(calls.replace(2), 1);
                Ok(PendingDependency::Ready)
            })
        };

        let pending = first.and(second).resolve(&Props::new(), &Context::new()).unwrap();
        assert!(pending.is_ready());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn combined_resolver_stops_at_synchronous_failure() {
        let called = Rc::new(Cell::new(false));
        let failing = Resolver::new(|_, _| Err(anyhow::anyhow!("bad props")));
        let second = {
            let called = called.clone();
            Resolver::new(move |_, _| {
                called.set(true);
                Ok(PendingDependency::Ready)
            })
        };

        assert!(failing.and(second).resolve(&Props::new(), &Context::new()).is_err());
        assert!(!called.get());
    }
}
