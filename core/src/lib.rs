//! # preparable-core
//!
//! The tree preparation engine. A declarative tree is made of [`Node`]s; composite
//! nodes may declare an asynchronous data dependency through their
//! [`CompositeType::resolver`]. [`Preparer::prepare`] walks the tree depth-first,
//! satisfies every dependency, emulates the component lifecycle and recurses into
//! the rendered children, so that a later render pass never has to wait for data.
//!
//! Trees with no asynchronous dependency are prepared entirely on the synchronous
//! path and never allocate a future:
//!
//! ```
//! use preparable_core::{Context, Node, Preparer};
//!
//! let tree = Node::host("div").child("hello").build();
//! let preparation = Preparer::new().prepare(&tree, &Context::new()).unwrap();
//! assert!(preparation.is_ready());
//! ```

#![allow(clippy::future_not_send)]
#![allow(clippy::multiple_crate_versions)]

pub mod classify;
pub mod component;
pub mod context;
pub mod decorate;
pub mod dependency;
pub mod error;
pub mod lifecycle;
pub mod node;
pub mod prepare;
pub mod stats;


#[doc(inline)]
pub use classify::{Classified, NodeKind, classify};
#[doc(inline)]
pub use component::{Component, CompositeType, FunctionType, State, UpdateGuard};
#[doc(inline)]
pub use context::Context;
#[doc(inline)]
pub use decorate::{pure, shallow_equal_state, with_dependency, with_pure_render_guard};
#[doc(inline)]
pub use dependency::{PendingDependency, Resolver};
#[doc(inline)]
pub use error::{Hook, PrepareError};
#[doc(inline)]
pub use lifecycle::Instance;
#[doc(inline)]
pub use node::{Element, ElementBuilder, ElementType, Node, Props};
#[doc(inline)]
pub use prepare::{Expansion, PrepareOptions, Preparer, Step, UnmountTiming};
#[doc(inline)]
pub use stats::{Stats, StatsSnapshot};
