//! Ordered payload filters.
//!
//! Filters are user callbacks that inspect a payload before dispatch. They
//! can mutate it in place or suppress it entirely. The client keeps two
//! independent chains, one for notices and one for events.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Outcome of a single filter callback.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Keep going: later filters still run and the payload stays eligible
    /// for dispatch.
    Pass,
    /// Stop: the payload is discarded and later filters do not run.
    Suppress,
}

type BoxedFilter<T> = Arc<dyn Fn(&mut T) -> Verdict + Send + Sync>;

/// An ordered list of user callbacks that may mutate or suppress a payload.
///
/// Filters run in registration order. The first filter returning
/// [`Verdict::Suppress`] stops the chain; mutations applied by earlier
/// filters are kept either way. Registering a filter never replaces an
/// existing one.
pub struct FilterChain<T> {
    filters: RwLock<Vec<BoxedFilter<T>>>,
}

impl<T> FilterChain<T> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            filters: RwLock::new(Vec::new()),
        }
    }

    /// Appends a filter to the end of the chain.
    pub fn register<F>(&self, filter: F)
    where
        F: Fn(&mut T) -> Verdict + Send + Sync + 'static,
    {
        self.filters.write().push(Arc::new(filter));
    }

    /// Runs all filters against the payload in registration order.
    ///
    /// The registered list is snapshotted up front, so filters may register
    /// further filters without deadlocking; those only apply to subsequent
    /// payloads.
    pub fn apply(&self, payload: &mut T) -> Verdict {
        let filters: Vec<_> = self.filters.read().clone();

        for filter in filters {
            if filter(payload) == Verdict::Suppress {
                return Verdict::Suppress;
            }
        }

        Verdict::Pass
    }

    /// Returns the number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    /// Returns `true` if no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.filters.read().is_empty()
    }
}

impl<T> Default for FilterChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FilterChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.len())
            .finish()
    }
}
