//! Keyed collection of live sessions.

use std::sync::Arc;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::PlanId;

/// A session owned by one plan.
pub trait PlanSession: Send {
    /// Plan the session belongs to.
    fn plan(&self) -> PlanId;

    /// Marks the session as removed; handles still held elsewhere must
    /// reject further operations.
    fn mark_removed(&mut self);

    /// Whether the session was removed.
    fn is_removed(&self) -> bool;
}

/// Shared handle to a session.
pub type SessionHandle<S> = Arc<Mutex<S>>;

/// Plan-to-session map with a lock per session.
///
/// The map lock is only held for lookups, inserts and removals. Sessions are
/// built outside it, so a slow mesh extraction for one plan does not block
/// other plans; when two callers race to create the same plan the first
/// insert wins and the other session is dropped.
///
/// There is no eviction: sessions live until [`remove`](Self::remove).
///
/// # Example
///
/// ```
/// use plan_session::{PlanSession, SessionRegistry};
///
/// struct Counter { plan: u64, hits: u32, removed: bool }
///
/// impl PlanSession for Counter {
///     fn plan(&self) -> u64 { self.plan }
///     fn mark_removed(&mut self) { self.removed = true; }
///     fn is_removed(&self) -> bool { self.removed }
/// }
///
/// let registry = SessionRegistry::new();
/// let (handle, created) = registry
///     .get_or_try_insert_with(3, || Ok::<_, ()>(Counter { plan: 3, hits: 0, removed: false }))
///     .unwrap();
/// assert!(created);
/// handle.lock().hits += 1;
///
/// let stale = registry.remove(3).unwrap();
/// assert!(stale.lock().is_removed());
/// assert!(registry.get(3).is_none());
/// ```
#[derive(Debug)]
pub struct SessionRegistry<S> {
    sessions: RwLock<HashMap<PlanId, SessionHandle<S>>>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl<S: PlanSession> SessionRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the plan's session.
    #[must_use]
    pub fn get(&self, plan: PlanId) -> Option<SessionHandle<S>> {
        self.sessions.read().get(&plan).cloned()
    }

    /// Whether the plan has a session.
    #[must_use]
    pub fn contains(&self, plan: PlanId) -> bool {
        self.sessions.read().contains_key(&plan)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Plans with a live session, sorted.
    #[must_use]
    pub fn plan_ids(&self) -> Vec<PlanId> {
        let mut ids: Vec<PlanId> = self.sessions.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the plan's session, creating it with `create` if absent.
    ///
    /// The flag is `true` when this call inserted the session.
    ///
    /// # Errors
    ///
    /// Returns the error of `create`; nothing is inserted in that case.
    pub fn get_or_try_insert_with<E, F>(
        &self,
        plan: PlanId,
        create: F,
    ) -> Result<(SessionHandle<S>, bool), E>
    where
        F: FnOnce() -> Result<S, E>,
    {
        if let Some(existing) = self.get(plan) {
            return Ok((existing, false));
        }

        let session = create()?;

        match self.sessions.write().entry(plan) {
            Entry::Occupied(entry) => {
                debug!(plan, "Session created concurrently, keeping the first");
                Ok((Arc::clone(entry.get()), false))
            }
            Entry::Vacant(entry) => {
                let handle = Arc::new(Mutex::new(session));
                entry.insert(Arc::clone(&handle));
                Ok((handle, true))
            }
        }
    }

    /// Removes the plan's session and marks it removed. Returns the handle
    /// that was removed, if any.
    pub fn remove(&self, plan: PlanId) -> Option<SessionHandle<S>> {
        let handle = self.sessions.write().remove(&plan)?;
        handle.lock().mark_removed();
        info!(plan, "Session removed");
        Some(handle)
    }
}
