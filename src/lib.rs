#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::future_not_send)]

pub mod app;
pub mod config;
mod error;
pub mod logging;
pub mod nexus;

pub mod prelude {
    //! A collection of commonly used traits and types for easy importing.
    //!
    //! # Example
    //!
    //! ```rust
    //! use preparable::prelude::*;
    //!
    //! let app = App::new(Node::host("main").build(), Nexus::new());
    //! let data = futures::executor::block_on(app.prefetch()).unwrap();
    //! assert!(data.is_empty());
    //! ```
    pub use super::{
        App, Binding, Config, Error, MountHandle, Nexus, PrefetchedData, RenderMode, Renderer,
        current_nexus,
    };
    pub use preparable_core::{
        Component, CompositeType, Context, FunctionType, Node, PendingDependency, Preparer, Props,
        pure, with_dependency, with_pure_render_guard,
    };
}

#[doc(inline)]
pub use app::{
    App, MountHandle, Prerendered, RenderMode, Renderer, mount, prefetch, prerender,
    prerender_static,
};
#[doc(inline)]
pub use config::{Config, LogConfig};
pub use error::Error;
#[doc(inline)]
pub use nexus::{
    Binding, NEXUS_CONTEXT_KEY, Nexus, NexusScope, PrefetchedData, WithNexus, current_nexus,
    with_nexus,
};

pub use preparable_core::{
    Component, CompositeType, Context, Element, ElementType, FunctionType, Node, PendingDependency,
    PrepareError, PrepareOptions, Preparer, Props, Resolver, Step, UnmountTiming, pure,
    with_dependency, with_pure_render_guard,
};
