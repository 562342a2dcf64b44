//! # Typed in-memory entity cache
//!
//! The remote tables are the source of truth; an [`EntityCache`] only mirrors
//! what the last fetch returned so list pages can be filtered and re-rendered
//! without another round trip. One cache exists per entity type, each holding
//! the same state a list page needs:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `items` | Entities in display order |
//! | `loading` | A fetch is in flight |
//! | `error` | Message from the last failed fetch |
//! | `selected` | Id of the entity opened in a detail view |
//!
//! Writes follow "last response wins": [`EntityCache::finish_fetch`] replaces
//! the whole list, and local mutations (`prepend`, `push`, `update`, `remove`)
//! apply the result of a successful remote call. [`ClientCache`] bundles the
//! caches of one signed-in user; [`ClientCache::status`] reports the
//! bookkeeping fields of every slice without the items.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Appointment, BlogPost, Group, GroupPost, NoteView, TherapistProfile};

/// Anything with a stable identity that can live in an [`EntityCache`].
pub trait Entity: Clone {
    fn id(&self) -> Uuid;
}

impl Entity for NoteView {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for BlogPost {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for TherapistProfile {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Appointment {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Group {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for GroupPost {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Bookkeeping of one cache slice.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceStatus {
    pub len: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub selected: Option<Uuid>,
}

/// [`SliceStatus`] for each slice of a [`ClientCache`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub notes: SliceStatus,
    pub posts: SliceStatus,
    pub therapists: SliceStatus,
    pub appointments: SliceStatus,
    pub groups: SliceStatus,
    pub group_posts: SliceStatus,
}

#[derive(Debug)]
struct Slice<T> {
    items: Vec<T>,
    loading: bool,
    error: Option<String>,
    selected: Option<Uuid>,
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            selected: None,
        }
    }
}

/// Cache for one entity type. Clones share the same state.
#[derive(Debug)]
pub struct EntityCache<T> {
    inner: Arc<Mutex<Slice<T>>>,
}

impl<T> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Slice::default())),
        }
    }
}

impl<T: Entity> EntityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Slice<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin_fetch(&self) {
        self.state().loading = true;
    }

    /// Replace the cached list with a fresh response. A selection that is no
    /// longer present is cleared.
    pub fn finish_fetch(&self, items: Vec<T>) {
        let mut state = self.state();
        state.loading = false;
        state.error = None;
        if let Some(selected) = state.selected {
            if !items.iter().any(|i| i.id() == selected) {
                state.selected = None;
            }
        }
        state.items = items;
    }

    /// Record a failed fetch; the previous items stay visible.
    pub fn fail_fetch(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Cache load failed: {}", message);
        let mut state = self.state();
        state.loading = false;
        state.error = Some(message);
    }

    /// Insert at the front (newest-first lists: notes, posts).
    pub fn prepend(&self, item: T) {
        self.state().items.insert(0, item);
    }

    /// Append at the end (chronological lists: appointments, groups).
    pub fn push(&self, item: T) {
        self.state().items.push(item);
    }

    /// Replace the entity with the same id. Returns false and changes nothing
    /// when the id is not cached.
    pub fn update(&self, item: T) -> bool {
        let mut state = self.state();
        match state.items.iter_mut().find(|i| i.id() == item.id()) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: Uuid) -> Option<T> {
        let mut state = self.state();
        let index = state.items.iter().position(|i| i.id() == id)?;
        if state.selected == Some(id) {
            state.selected = None;
        }
        Some(state.items.remove(index))
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.state().items.iter().find(|i| i.id() == id).cloned()
    }

    /// First cached entity matching `pred`, for lookups by another key.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.state().items.iter().find(|i| pred(i)).cloned()
    }

    pub fn select(&self, id: Option<Uuid>) {
        self.state().selected = id;
    }

    pub fn selected(&self) -> Option<T> {
        let state = self.state();
        let id = state.selected?;
        state.items.iter().find(|i| i.id() == id).cloned()
    }

    /// Snapshot of the cached items.
    pub fn items(&self) -> Vec<T> {
        self.state().items.clone()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn clear(&self) {
        *self.state() = Slice::default();
    }

    pub fn status(&self) -> SliceStatus {
        let state = self.state();
        SliceStatus {
            len: state.items.len(),
            loading: state.loading,
            error: state.error.clone(),
            selected: state.selected,
        }
    }
}

/// All entity caches for one signed-in user.
#[derive(Clone, Debug, Default)]
pub struct ClientCache {
    pub notes: EntityCache<NoteView>,
    pub posts: EntityCache<BlogPost>,
    pub therapists: EntityCache<TherapistProfile>,
    pub appointments: EntityCache<Appointment>,
    pub groups: EntityCache<Group>,
    pub group_posts: EntityCache<GroupPost>,
    joined_groups: Arc<Mutex<HashSet<Uuid>>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn joined(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.joined_groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn joined_groups(&self) -> HashSet<Uuid> {
        self.joined().clone()
    }

    pub fn set_joined_groups(&self, ids: impl IntoIterator<Item = Uuid>) {
        *self.joined() = ids.into_iter().collect();
    }

    pub fn mark_joined(&self, group_id: Uuid) {
        self.joined().insert(group_id);
    }

    pub fn mark_left(&self, group_id: Uuid) {
        self.joined().remove(&group_id);
    }

    pub fn is_member(&self, group_id: Uuid) -> bool {
        self.joined().contains(&group_id)
    }

    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            notes: self.notes.status(),
            posts: self.posts.status(),
            therapists: self.therapists.status(),
            appointments: self.appointments.status(),
            groups: self.groups.status(),
            group_posts: self.group_posts.status(),
        }
    }

    /// Drop everything, e.g. on sign-out.
    pub fn clear(&self) {
        self.notes.clear();
        self.posts.clear();
        self.therapists.clear();
        self.appointments.clear();
        self.groups.clear();
        self.group_posts.clear();
        self.joined().clear();
    }
}
