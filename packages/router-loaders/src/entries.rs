//! Per-router loader bookkeeping.
//!
//! Every router owns one [`LoaderEntries`] map, keyed by loader identity. Entries are created on
//! first access and live as long as the router. Loaders are usually defined once for the whole
//! program, so the map stays bounded by the number of loaders; [`LoaderEntries::remove`] drops an
//! entry explicitly when a loader is torn down for good.

use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use rustc_hash::FxHashMap;

use crate::{
    error::LoaderError,
    loader::{DataLoader, LoadFuture, LoaderId},
    navigation::{Navigation, NavigationId},
};

/// The entries of every loader used with one router.
#[derive(Default)]
pub struct LoaderEntries {
    entries: RefCell<FxHashMap<LoaderId, Rc<LoaderEntry>>>,
    commits: Rc<Cell<u64>>,
}

impl LoaderEntries {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry of `loader`, created if it does not exist yet.
    pub fn entry(&self, loader: &DataLoader) -> Rc<LoaderEntry> {
        self.entries
            .borrow_mut()
            .entry(loader.id())
            .or_insert_with(|| Rc::new(LoaderEntry::new(self.commits.clone())))
            .clone()
    }

    /// The entry of `loader`, if it was ever used.
    pub fn get(&self, loader: &DataLoader) -> Option<Rc<LoaderEntry>> {
        self.entries.borrow().get(&loader.id()).cloned()
    }

    /// Forget the entry of `loader`. An in-flight load for it will drop its result.
    pub fn remove(&self, loader: &DataLoader) -> Option<Rc<LoaderEntry>> {
        self.entries.borrow_mut().remove(&loader.id())
    }

    /// How many loaders have an entry.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no loader has an entry yet.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// How many values were published across all entries.
    pub fn commits(&self) -> u64 {
        self.commits.get()
    }

    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl fmt::Debug for LoaderEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderEntries")
            .field("entries", &self.len())
            .field("commits", &self.commits())
            .finish()
    }
}

/// The state of one loader on one router.
pub struct LoaderEntry {
    pending_to: Cell<Option<NavigationId>>,
    pending_load: RefCell<Option<LoadFuture>>,
    staged: RefCell<Option<Result<Rc<dyn Any>, LoaderError>>>,
    data: RefCell<Option<Rc<dyn Any>>>,
    error: RefCell<Option<LoaderError>>,
    version: Cell<u64>,
    commits: Rc<Cell<u64>>,
}

impl LoaderEntry {
    fn new(commits: Rc<Cell<u64>>) -> Self {
        Self {
            pending_to: Cell::new(None),
            pending_load: RefCell::new(None),
            staged: RefCell::new(None),
            data: RefCell::new(None),
            error: RefCell::new(None),
            version: Cell::new(0),
            commits,
        }
    }

    /// The navigation this entry is currently loading for.
    pub fn pending_to(&self) -> Option<NavigationId> {
        self.pending_to.get()
    }

    /// Whether a load is in flight.
    pub fn has_pending_load(&self) -> bool {
        self.pending_load.borrow().is_some()
    }

    /// The last published value, if it is a `T`.
    pub fn data<T: Clone + 'static>(&self) -> Option<T> {
        self.data
            .borrow()
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// The error of the last committed load, if it failed.
    pub fn error(&self) -> Option<LoaderError> {
        self.error.borrow().clone()
    }

    /// The router-wide commit number of the last publish, `0` if nothing was published yet.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Publish the value staged for `to`.
    ///
    /// Does nothing and returns `false` if the entry is not loading for `to` anymore.
    pub fn commit(&self, to: &Navigation) -> bool {
        self.commit_for(to.id())
    }

    pub(crate) fn commit_for(&self, id: NavigationId) -> bool {
        if !self.is_pending_for(id) {
            tracing::trace!(navigation = %id, "ignoring commit for a navigation the entry is not loading for");
            return false;
        }

        self.pending_to.set(None);
        self.pending_load.borrow_mut().take();

        let Some(staged) = self.staged.borrow_mut().take() else {
            return true;
        };
        match staged {
            Ok(value) => {
                *self.data.borrow_mut() = Some(value);
                *self.error.borrow_mut() = None;
            }
            Err(error) => *self.error.borrow_mut() = Some(error),
        }

        let version = self.commits.get() + 1;
        self.commits.set(version);
        self.version.set(version);
        true
    }

    pub(crate) fn is_pending_for(&self, id: NavigationId) -> bool {
        self.pending_to.get() == Some(id)
    }

    pub(crate) fn pending_load_for(&self, id: NavigationId) -> Option<LoadFuture> {
        if !self.is_pending_for(id) {
            return None;
        }
        self.pending_load.borrow().clone()
    }

    pub(crate) fn set_pending(&self, id: NavigationId, load: LoadFuture) {
        self.pending_to.set(Some(id));
        *self.pending_load.borrow_mut() = Some(load);
        self.staged.borrow_mut().take();
    }

    pub(crate) fn stage(&self, value: Result<Rc<dyn Any>, LoaderError>) {
        *self.staged.borrow_mut() = Some(value);
    }

    /// Forget the load of navigation `id` if the entry is still waiting for it.
    pub(crate) fn release(&self, id: NavigationId) -> bool {
        if !self.is_pending_for(id) {
            return false;
        }
        self.clear_pending();
        true
    }

    /// Forget the in-flight load without publishing anything.
    pub(crate) fn clear_pending(&self) {
        self.pending_to.set(None);
        self.pending_load.borrow_mut().take();
        self.staged.borrow_mut().take();
    }
}

impl fmt::Debug for LoaderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderEntry")
            .field("pending_to", &self.pending_to.get())
            .field("has_pending_load", &self.has_pending_load())
            .field("version", &self.version.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        loader::{define_loader, LoaderOptions, LoaderValue},
        navigation::Location,
    };
    use futures_util::FutureExt;

    fn navigation(id: u64) -> Navigation {
        Navigation::new(
            NavigationId(id),
            Location::default(),
            Location::parse("/next").unwrap(),
            Vec::new(),
        )
    }

    fn pending() -> LoadFuture {
        async { Ok(()) }.boxed_local().shared()
    }

    #[test]
    fn entries_are_created_once_per_loader() {
        let entries = LoaderEntries::new();
        let loader = define_loader("user", LoaderOptions::default(), |_| async {
            Ok(LoaderValue::data(()))
        });

        assert!(entries.get(&loader).is_none());
        let first = loader.entry(&entries);
        let second = entries.entry(&loader);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(entries.len(), 1);

        assert!(entries.remove(&loader).is_some());
        assert!(entries.is_empty());
    }

    #[test]
    fn commits_only_apply_to_the_pending_navigation() {
        let entries = LoaderEntries::new();
        let loader = define_loader("user", LoaderOptions::default(), |_| async {
            Ok(LoaderValue::data(()))
        });
        let entry = entries.entry(&loader);
        let (stale, current) = (navigation(1), navigation(2));

        entry.set_pending(current.id(), pending());
        entry.stage(Ok(Rc::new(7u32)));

        assert!(!entry.commit(&stale));
        assert_eq!(entry.data::<u32>(), None);
        assert_eq!(entry.pending_to(), Some(current.id()));

        assert!(entry.commit(&current));
        assert_eq!(entry.data::<u32>(), Some(7));
        assert_eq!(entry.data::<String>(), None);
        assert_eq!(entry.pending_to(), None);
        assert!(!entry.has_pending_load());
        assert_eq!(entry.version(), 1);
        assert_eq!(entries.commits(), 1);
    }

    #[test]
    fn clearing_drops_the_staged_value() {
        let entries = LoaderEntries::new();
        let loader = define_loader("user", LoaderOptions::default(), |_| async {
            Ok(LoaderValue::data(()))
        });
        let entry = entries.entry(&loader);
        let to = navigation(3);

        entry.set_pending(to.id(), pending());
        entry.stage(Ok(Rc::new("stale")));
        entry.clear_pending();

        assert!(!entry.commit(&to));
        assert_eq!(entry.data::<&str>(), None);
        assert_eq!(entry.version(), 0);
    }
}
