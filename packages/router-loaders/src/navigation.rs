//! Types relating to navigation.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use url::Url;

use crate::{
    abort::AbortSignal, entries::LoaderEntries, error::NavigationError, loader::DataLoader,
    navigation_result::NavigationResult, route::RouteRecord, set::LoaderSet,
};

const BASE: &str = "dioxus://index.html/";

/// A location inside the application, made of a path and an optional query and fragment.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Location {
    url: Url,
}

impl Location {
    /// Parse a path like `/users/1?tab=posts`. Relative paths are resolved against the root.
    pub fn parse(path: &str) -> Result<Self, NavigationError> {
        if path.starts_with("//") {
            return Err(NavigationError::External(path.to_string()));
        }

        Self::base()
            .join(path)
            .map(|url| Self { url })
            .map_err(|source| NavigationError::InvalidLocation {
                location: path.to_string(),
                source,
            })
    }

    fn base() -> Url {
        // the base is a constant, parsing it cannot fail
        Url::parse(BASE).expect("the base url is valid")
    }

    /// The path of the location, always starting with `/`.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// The query string, if present.
    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// The fragment, if present.
    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment()
    }
}

impl Default for Location {
    fn default() -> Self {
        Self { url: Self::base() }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())?;
        if let Some(query) = self.query() {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = self.fragment() {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({self})")
    }
}

/// Identifies one navigation attempt. Unique per router.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigationId(pub(crate) u64);

impl fmt::Display for NavigationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One attempt to move the router from its current location to a target location.
///
/// A navigation is cheap to clone, every clone refers to the same attempt.
#[derive(Clone)]
pub struct Navigation {
    inner: Rc<NavigationInner>,
}

struct NavigationInner {
    id: NavigationId,
    from: Location,
    to: Location,
    matched: Vec<RouteRecord>,
    meta: RefCell<NavigationMeta>,
}

/// Loader bookkeeping attached to a navigation by the pending-navigation tracker.
#[derive(Default)]
struct NavigationMeta {
    loaders: Option<LoaderSet>,
    signal: Option<AbortSignal>,
    entries: Option<Rc<LoaderEntries>>,
    results: Vec<NavigationResult>,
}

impl Navigation {
    pub(crate) fn new(
        id: NavigationId,
        from: Location,
        to: Location,
        matched: Vec<RouteRecord>,
    ) -> Self {
        Self {
            inner: Rc::new(NavigationInner {
                id,
                from,
                to,
                matched,
                meta: RefCell::new(NavigationMeta::default()),
            }),
        }
    }

    /// The id of this navigation.
    pub fn id(&self) -> NavigationId {
        self.inner.id
    }

    /// Where the router was when this navigation started.
    pub fn from(&self) -> &Location {
        &self.inner.from
    }

    /// Where this navigation is going.
    pub fn to(&self) -> &Location {
        &self.inner.to
    }

    /// The matched route records, from the root to the leaf.
    pub fn matched(&self) -> &[RouteRecord] {
        &self.inner.matched
    }

    /// The signal aborted when this navigation is superseded, fails or errors.
    ///
    /// [`None`] until the data loaders saw the navigation start.
    pub fn signal(&self) -> Option<AbortSignal> {
        self.inner.meta.borrow().signal.clone()
    }

    /// The merged loaders of every matched record, in commit order.
    pub fn loaders(&self) -> Vec<DataLoader> {
        self.inner
            .meta
            .borrow()
            .loaders
            .as_ref()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The loader entries of the router this navigation belongs to.
    pub fn entries(&self) -> Option<Rc<LoaderEntries>> {
        self.inner.meta.borrow().entries.clone()
    }

    /// Every navigation result returned by a loader during this navigation, in arrival order.
    pub fn navigation_results(&self) -> Vec<NavigationResult> {
        self.inner.meta.borrow().results.clone()
    }

    pub(crate) fn attach_loader_state(&self, signal: AbortSignal, entries: Rc<LoaderEntries>) {
        let mut meta = self.inner.meta.borrow_mut();
        meta.signal = Some(signal);
        meta.loaders = Some(LoaderSet::default());
        meta.entries = Some(entries);
        meta.results.clear();
    }

    pub(crate) fn merge_loaders(&self, loaders: impl IntoIterator<Item = DataLoader>) {
        self.inner
            .meta
            .borrow_mut()
            .loaders
            .get_or_insert_with(LoaderSet::default)
            .extend(loaders);
    }

    pub(crate) fn push_navigation_result(&self, result: NavigationResult) {
        self.inner.meta.borrow_mut().results.push(result);
    }

    pub(crate) fn downgrade(&self) -> WeakNavigation {
        WeakNavigation {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl PartialEq for Navigation {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Navigation {}

impl fmt::Debug for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigation")
            .field("id", &self.inner.id)
            .field("from", &self.inner.from)
            .field("to", &self.inner.to)
            .finish_non_exhaustive()
    }
}

/// A navigation handle that does not keep the navigation alive.
#[derive(Clone)]
pub(crate) struct WeakNavigation {
    inner: Weak<NavigationInner>,
}

impl WeakNavigation {
    pub(crate) fn upgrade(&self) -> Option<Navigation> {
        self.inner.upgrade().map(|inner| Navigation { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_resolve_against_the_root() {
        let location = Location::parse("users/1?tab=posts#top").unwrap();
        assert_eq!(location.path(), "/users/1");
        assert_eq!(location.query(), Some("tab=posts"));
        assert_eq!(location.fragment(), Some("top"));
        assert_eq!(location.to_string(), "/users/1?tab=posts#top");
        assert_eq!(Location::default().to_string(), "/");
    }

    #[test]
    fn protocol_relative_paths_are_rejected() {
        assert!(matches!(
            Location::parse("//evil.com"),
            Err(NavigationError::External(_))
        ));
    }

    #[test]
    fn navigations_compare_by_identity() {
        let a = Navigation::new(
            NavigationId(1),
            Location::default(),
            Location::default(),
            Vec::new(),
        );
        let b = Navigation::new(
            NavigationId(1),
            Location::default(),
            Location::default(),
            Vec::new(),
        );
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(a.signal().is_none());
        assert!(a.loaders().is_empty());
    }
}
