//! Which render target is active in which driver context.
//!
//! Render targets share driver contexts, and each target caches the state it
//! last applied. A target's cache is only trustworthy while no other target
//! has drawn in that context since, so every target records itself here when
//! it becomes active and checks the record before trusting its cache.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use state::InitCell;

use crate::driver::ContextId;

/// Process-unique render target identity; `0` is never assigned.
pub type TargetId = u64;

static GLOBAL: InitCell<Arc<ActiveTargetRegistry>> = InitCell::new();

/// Outcome of [`ActiveTargetRegistry::set_active`], from the target's side.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transition {
    /// First target recorded for the context; nothing about the context's
    /// state is known.
    Recorded,
    /// Replaced a different target; the cache may be stale.
    Switched,
    /// This target was already active; the cache is still valid.
    Unchanged,
    /// The context's record was erased.
    Cleared,
}

#[derive(Debug)]
struct Inner {
    next_id: TargetId,
    active: HashMap<ContextId, TargetId>,
}

/// Context → active target map plus the target identity counter.
///
/// All access goes through one re-entrant lock.
#[derive(Debug)]
pub struct ActiveTargetRegistry {
    inner: ReentrantMutex<RefCell<Inner>>,
}

impl ActiveTargetRegistry {
    pub fn new() -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(Inner {
                next_id: 1,
                active: HashMap::new(),
            })),
        }
    }

    /// The process-wide registry used by targets unless another is injected.
    pub fn global() -> Arc<ActiveTargetRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ActiveTargetRegistry::new())))
    }

    /// Hands out the next target identity.
    pub fn allocate_id(&self) -> TargetId {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    pub fn active_target(&self, context: ContextId) -> Option<TargetId> {
        let guard = self.inner.lock();
        let target = guard.borrow().active.get(&context).copied();
        target
    }

    #[inline]
    pub fn is_active(&self, context: ContextId, target: TargetId) -> bool {
        self.active_target(context) == Some(target)
    }

    /// Records (`active`) or erases (`!active`) the context's active target.
    ///
    /// Deactivation erases the context's record whichever target holds it.
    pub fn set_active(&self, context: ContextId, target: TargetId, active: bool) -> Transition {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();

        if !active {
            inner.active.remove(&context);
            return Transition::Cleared;
        }

        match inner.active.insert(context, target) {
            None => Transition::Recorded,
            Some(previous) if previous == target => Transition::Unchanged,
            Some(_) => Transition::Switched,
        }
    }
}

impl Default for ActiveTargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
