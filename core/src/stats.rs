//! Counters describing the most recent preparation pass.
//!
//! These exist for diagnostics and performance tracking only: the engine's
//! behavior never depends on them.

use core::cell::Cell;
use std::rc::Rc;

/// Shared, cheaply clonable counters.
#[derive(Debug, Clone, Default)]
pub struct Stats(Rc<Counters>);

#[derive(Debug, Default)]
struct Counters {
    synchronous: Cell<usize>,
    asynchronous: Cell<usize>,
    hosts: Cell<usize>,
    functions: Cell<usize>,
    plain: Cell<usize>,
}

fn bump(cell: &Cell<usize>) {
    cell.set(cell.get() + 1);
}

impl Stats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.0.synchronous.set(0);
        self.0.asynchronous.set(0);
        self.0.hosts.set(0);
        self.0.functions.set(0);
        self.0.plain.set(0);
    }

    /// Reads the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            synchronous: self.0.synchronous.get(),
            asynchronous: self.0.asynchronous.get(),
            hosts: self.0.hosts.get(),
            functions: self.0.functions.get(),
            plain: self.0.plain.get(),
        }
    }

    pub(crate) fn record_synchronous(&self) {
        bump(&self.0.synchronous);
    }

    pub(crate) fn record_asynchronous(&self) {
        bump(&self.0.asynchronous);
    }

    pub(crate) fn record_host(&self) {
        bump(&self.0.hosts);
    }

    pub(crate) fn record_function(&self) {
        bump(&self.0.functions);
    }

    pub(crate) fn record_plain(&self) {
        bump(&self.0.plain);
    }
}

/// A point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    /// Composite nodes whose dependency was absent or already satisfied.
    pub synchronous: usize,
    /// Composite nodes that had to wait for a deferred dependency.
    pub asynchronous: usize,
    /// Host nodes visited.
    pub hosts: usize,
    /// Function nodes invoked.
    pub functions: usize,
    /// Plain values visited as a node in their own right.
    pub plain: usize,
}

impl StatsSnapshot {
    /// Composite nodes prepared, whichever path they took.
    #[must_use]
    pub const fn composites(&self) -> usize {
        self.synchronous + self.asynchronous
    }
}
