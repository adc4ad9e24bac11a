//! Failures of a preparation pass.
//!
//! Every variant is scoped to the pass that raised it; nothing here is fatal to
//! the process. User code reports failures as [`anyhow::Error`], which the engine
//! wraps with the name of the node it was preparing.

use core::fmt;

use thiserror::Error;

/// A lifecycle hook of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// [`Component::create`](crate::Component::create).
    Create,
    /// [`Component::will_mount`](crate::Component::will_mount).
    WillMount,
    /// [`Component::render`](crate::Component::render).
    Render,
    /// [`Component::receive_props`](crate::Component::receive_props).
    ReceiveProps,
    /// [`Component::will_unmount`](crate::Component::will_unmount).
    WillUnmount,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::WillMount => "will_mount",
            Self::Render => "render",
            Self::ReceiveProps => "receive_props",
            Self::WillUnmount => "will_unmount",
        })
    }
}

/// Why a subtree could not be prepared.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// The dependency resolver failed, synchronously or once awaited.
    #[error("failed to resolve the dependency of `{component}`")]
    Dependency {
        /// Display name of the composite type.
        component: String,
        /// Error raised by the resolver.
        source: anyhow::Error,
    },
    /// A lifecycle hook failed.
    #[error("`{hook}` of `{component}` failed")]
    Lifecycle {
        /// Display name of the composite type.
        component: String,
        /// The failing hook.
        hook: Hook,
        /// Error raised by the hook.
        source: anyhow::Error,
    },
    /// A function node failed.
    #[error("function node `{name}` failed")]
    Function {
        /// Display name of the function type.
        name: String,
        /// Error raised by the function.
        source: anyhow::Error,
    },
}

impl PrepareError {
    pub(crate) fn dependency(component: &str, source: anyhow::Error) -> Self {
        Self::Dependency {
            component: component.to_owned(),
            source,
        }
    }

    pub(crate) fn lifecycle(component: &str, hook: Hook, source: anyhow::Error) -> Self {
        Self::Lifecycle {
            component: component.to_owned(),
            hook,
            source,
        }
    }

    pub(crate) fn function(name: &str, source: anyhow::Error) -> Self {
        Self::Function {
            name: name.to_owned(),
            source,
        }
    }

    /// Name of the node that failed.
    #[must_use]
    pub fn node_name(&self) -> &str {
        match self {
            Self::Dependency { component, .. } | Self::Lifecycle { component, .. } => component,
            Self::Function { name, .. } => name,
        }
    }

    /// The hook that failed, for lifecycle failures.
    #[must_use]
    pub const fn hook(&self) -> Option<Hook> {
        match self {
            Self::Lifecycle { hook, .. } => Some(*hook),
            _ => None,
        }
    }

    /// The underlying error raised by user code.
    #[must_use]
    pub const fn cause(&self) -> &anyhow::Error {
        match self {
            Self::Dependency { source, .. }
            | Self::Lifecycle { source, .. }
            | Self::Function { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn messages_name_the_failing_node() {
        let error = PrepareError::lifecycle("Profile", Hook::WillMount, anyhow::anyhow!("boom"));
        assert_eq!(error.to_string(), "`will_mount` of `Profile` failed");
        assert_eq!(error.node_name(), "Profile");
        assert_eq!(error.hook(), Some(Hook::WillMount));
        assert_eq!(error.source().map(ToString::to_string).as_deref(), Some("boom"));
    }

    #[test]
    fn dependency_failure_keeps_cause() {
        let error = PrepareError::dependency("Feed", anyhow::anyhow!("timeout"));
        assert_eq!(error.cause().to_string(), "timeout");
        assert!(error.hook().is_none());
    }
}
