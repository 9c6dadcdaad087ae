//! A small in-memory router exposing the navigation hooks the data loaders plug into.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use futures_util::future::LocalBoxFuture;
use rustc_hash::FxHashSet;

use crate::{
    error::{FailureKind, NavigationError, NavigationFailure},
    navigation::{Location, Navigation, NavigationId},
    navigation_result::NavigationDecision,
    route::{Route, RouteRecord},
};

/// The future returned by a navigation guard.
pub type GuardFuture = LocalBoxFuture<'static, Result<NavigationDecision, NavigationError>>;

type Guard = Rc<dyn Fn(&Navigation) -> GuardFuture>;
type SettleHook = Rc<dyn Fn(&Navigation, Option<&NavigationFailure>)>;
type ErrorHook = Rc<dyn Fn(&Navigation, &NavigationError)>;

/// Identifies a registered hook so it can be removed again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookId(usize);

/// Where a guard is inserted among the guards of the same phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookOrder {
    /// Run before every guard registered so far.
    First,

    /// Run after every guard registered so far.
    Last,
}

/// An in-memory router.
///
/// A navigation goes through three phases: every before-dispatch guard, then every
/// before-finalize guard, then the after-settle hooks. Guards run one after another; a guard
/// that returns something other than [`NavigationDecision::Continue`] stops the navigation.
/// A navigation that is not the latest one anymore when a guard finishes is cancelled.
///
/// Navigating to the location of the last successful navigation is reported as a
/// [`FailureKind::Duplicated`] failure without running any guard.
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

struct RouterInner {
    records: Vec<(RouteRecord, Option<usize>)>,
    current: RefCell<Option<Location>>,
    pending: Cell<Option<NavigationId>>,
    next_navigation: Cell<u64>,
    next_hook: Cell<usize>,
    before_dispatch: RefCell<Vec<(HookId, Guard)>>,
    before_finalize: RefCell<Vec<(HookId, Guard)>>,
    after_settle: RefCell<Vec<(HookId, SettleHook)>>,
    on_error: RefCell<Vec<(HookId, ErrorHook)>>,
    plugins: RefCell<FxHashSet<&'static str>>,
}

impl Router {
    /// Create a router at `/` from a route tree.
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Self {
        let mut records = Vec::new();
        for route in routes {
            flatten(route, "", None, &mut records);
        }

        Self {
            inner: Rc::new(RouterInner {
                records,
                current: RefCell::new(None),
                pending: Cell::new(None),
                next_navigation: Cell::new(0),
                next_hook: Cell::new(0),
                before_dispatch: RefCell::default(),
                before_finalize: RefCell::default(),
                after_settle: RefCell::default(),
                on_error: RefCell::default(),
                plugins: RefCell::default(),
            }),
        }
    }

    /// The location of the last successful navigation, `/` before the first one.
    pub fn current(&self) -> Location {
        self.inner.current.borrow().clone().unwrap_or_default()
    }

    /// The id of the latest navigation, while it has not settled.
    pub fn pending_navigation(&self) -> Option<NavigationId> {
        self.inner.pending.get()
    }

    /// Every record of the route tree, parents before their children.
    pub fn records(&self) -> impl Iterator<Item = &RouteRecord> + '_ {
        self.inner.records.iter().map(|(record, _)| record)
    }

    /// The records matching `location`, from the root to the leaf.
    pub fn resolve(&self, location: &Location) -> Option<Vec<RouteRecord>> {
        let path = normalize(location.path());
        let mut index = self
            .inner
            .records
            .iter()
            .position(|(record, _)| record.path() == path)?;

        let mut matched = Vec::new();
        loop {
            let (record, parent) = &self.inner.records[index];
            matched.push(record.clone());
            match parent {
                Some(parent) => index = *parent,
                None => break,
            }
        }
        matched.reverse();
        Some(matched)
    }

    /// Navigate to `path`.
    ///
    /// Resolves once the navigation settled. Failures are returned as
    /// [`NavigationError::Failure`]; a redirect resolves with the outcome of the redirected
    /// navigation.
    pub async fn push(&self, path: &str) -> Result<(), NavigationError> {
        let to = Location::parse(path)?;
        let matched = self
            .resolve(&to)
            .ok_or_else(|| NavigationError::NoMatch(to.clone()))?;

        let id = NavigationId(self.inner.next_navigation.get());
        self.inner.next_navigation.set(id.0 + 1);
        let navigation = Navigation::new(id, self.current(), to, matched);
        self.inner.pending.set(Some(id));

        tracing::debug!(navigation = %id, from = %navigation.from(), to = %navigation.to(), "navigating");

        if self.inner.current.borrow().as_ref() == Some(navigation.to()) {
            return Err(self.fail(&navigation, FailureKind::Duplicated).into());
        }

        match self.run_guards(&navigation).await {
            Ok(NavigationDecision::Continue) => {
                *self.inner.current.borrow_mut() = Some(navigation.to().clone());
                if self.inner.pending.get() == Some(id) {
                    self.inner.pending.set(None);
                }
                self.trigger_after_settle(&navigation, None);
                Ok(())
            }
            Ok(NavigationDecision::Abort) => {
                Err(self.fail(&navigation, FailureKind::Aborted).into())
            }
            Ok(NavigationDecision::Redirect(target)) => {
                self.fail(&navigation, FailureKind::Redirected(target.clone()));
                Box::pin(self.push(&target)).await
            }
            Err(NavigationError::Failure(failure)) => {
                self.trigger_after_settle(&navigation, Some(&failure));
                Err(failure.into())
            }
            Err(error) => {
                tracing::debug!(navigation = %id, %error, "navigation errored");
                self.trigger_error(&navigation, &error);
                Err(error)
            }
        }
    }

    /// Register a guard that runs when a navigation starts.
    pub fn before_dispatch(
        &self,
        order: HookOrder,
        guard: impl Fn(&Navigation) -> GuardFuture + 'static,
    ) -> HookId {
        let id = self.next_hook_id();
        let guard: Guard = Rc::new(guard);
        insert(&self.inner.before_dispatch, order, (id, guard));
        id
    }

    /// Register a guard that runs right before a navigation is finalized.
    pub fn before_finalize(
        &self,
        order: HookOrder,
        guard: impl Fn(&Navigation) -> GuardFuture + 'static,
    ) -> HookId {
        let id = self.next_hook_id();
        let guard: Guard = Rc::new(guard);
        insert(&self.inner.before_finalize, order, (id, guard));
        id
    }

    /// Register a hook called once a navigation settled, with its failure if it failed.
    pub fn after_settle(
        &self,
        hook: impl Fn(&Navigation, Option<&NavigationFailure>) + 'static,
    ) -> HookId {
        let id = self.next_hook_id();
        let hook: SettleHook = Rc::new(hook);
        self.inner.after_settle.borrow_mut().push((id, hook));
        id
    }

    /// Register a hook called when a guard of a navigation errors.
    pub fn on_error(&self, hook: impl Fn(&Navigation, &NavigationError) + 'static) -> HookId {
        let id = self.next_hook_id();
        let hook: ErrorHook = Rc::new(hook);
        self.inner.on_error.borrow_mut().push((id, hook));
        id
    }

    /// Remove a hook. Returns `false` if it was already removed.
    pub fn remove_hook(&self, id: HookId) -> bool {
        fn remove<T>(hooks: &RefCell<Vec<(HookId, T)>>, id: HookId) -> bool {
            let mut hooks = hooks.borrow_mut();
            let before = hooks.len();
            hooks.retain(|(hook, _)| *hook != id);
            hooks.len() != before
        }

        remove(&self.inner.before_dispatch, id)
            || remove(&self.inner.before_finalize, id)
            || remove(&self.inner.after_settle, id)
            || remove(&self.inner.on_error, id)
    }

    /// Record that a plugin was installed. Returns `false` if it already was.
    pub fn install_plugin(&self, name: &'static str) -> bool {
        self.inner.plugins.borrow_mut().insert(name)
    }

    /// Forget that a plugin was installed.
    pub fn uninstall_plugin(&self, name: &'static str) -> bool {
        self.inner.plugins.borrow_mut().remove(name)
    }

    pub(crate) fn downgrade(&self) -> WeakRouter {
        WeakRouter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    async fn run_guards(&self, navigation: &Navigation) -> Result<NavigationDecision, NavigationError> {
        for phase in [&self.inner.before_dispatch, &self.inner.before_finalize] {
            let guards: Vec<Guard> = phase.borrow().iter().map(|(_, guard)| guard.clone()).collect();
            for guard in guards {
                let decision = guard(navigation).await?;
                self.ensure_latest(navigation)?;
                if decision != NavigationDecision::Continue {
                    return Ok(decision);
                }
            }
        }

        self.ensure_latest(navigation)?;
        Ok(NavigationDecision::Continue)
    }

    fn ensure_latest(&self, navigation: &Navigation) -> Result<(), NavigationFailure> {
        if self.inner.pending.get() == Some(navigation.id()) {
            return Ok(());
        }
        Err(NavigationFailure::new(FailureKind::Cancelled, navigation))
    }

    fn fail(&self, navigation: &Navigation, kind: FailureKind) -> NavigationFailure {
        let failure = NavigationFailure::new(kind, navigation);
        tracing::debug!(navigation = %navigation.id(), %failure, "navigation failed");
        if self.inner.pending.get() == Some(navigation.id()) {
            self.inner.pending.set(None);
        }
        self.trigger_after_settle(navigation, Some(&failure));
        failure
    }

    fn trigger_after_settle(&self, navigation: &Navigation, failure: Option<&NavigationFailure>) {
        let hooks: Vec<SettleHook> = self
            .inner
            .after_settle
            .borrow()
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect();
        for hook in hooks {
            hook(navigation, failure);
        }
    }

    fn trigger_error(&self, navigation: &Navigation, error: &NavigationError) {
        if self.inner.pending.get() == Some(navigation.id()) {
            self.inner.pending.set(None);
        }
        let hooks: Vec<ErrorHook> = self
            .inner
            .on_error
            .borrow()
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect();
        for hook in hooks {
            hook(navigation, error);
        }
    }

    fn next_hook_id(&self) -> HookId {
        let id = self.inner.next_hook.get();
        self.inner.next_hook.set(id + 1);
        HookId(id)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("current", &self.current())
            .field("pending", &self.inner.pending.get())
            .field("records", &self.inner.records.len())
            .finish_non_exhaustive()
    }
}

/// A router handle that does not keep the router alive.
#[derive(Clone)]
pub(crate) struct WeakRouter {
    inner: Weak<RouterInner>,
}

impl WeakRouter {
    pub(crate) fn upgrade(&self) -> Option<Router> {
        self.inner.upgrade().map(|inner| Router { inner })
    }
}

fn insert<T>(hooks: &RefCell<Vec<(HookId, T)>>, order: HookOrder, hook: (HookId, T)) {
    let mut hooks = hooks.borrow_mut();
    match order {
        HookOrder::First => hooks.insert(0, hook),
        HookOrder::Last => hooks.push(hook),
    }
}

fn flatten(
    route: Route,
    parent_path: &str,
    parent: Option<usize>,
    records: &mut Vec<(RouteRecord, Option<usize>)>,
) {
    let path = if route.path.starts_with('/') {
        normalize(&route.path)
    } else {
        normalize(&format!("{parent_path}/{}", route.path))
    };

    let index = records.len();
    records.push((
        RouteRecord::new(path.clone(), route.components, route.loaders),
        parent,
    ));
    for child in route.children {
        flatten(child, &path, Some(index), records);
    }
}

/// Collapse repeated slashes and drop the trailing one, `/` stays `/`.
fn normalize(path: &str) -> String {
    let segments: Vec<_> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn router() -> Router {
        Router::new([
            Route::new("/"),
            Route::new("/users/").child(Route::new("profile").child(Route::new("/settings"))),
        ])
    }

    fn paths(records: &[RouteRecord]) -> Vec<&str> {
        records.iter().map(|record| record.path()).collect()
    }

    #[test]
    fn nested_routes_resolve_from_the_root() {
        let router = router();
        let matched = router
            .resolve(&Location::parse("/users/profile/").unwrap())
            .unwrap();
        assert_eq!(paths(&matched), ["/users", "/users/profile"]);

        let matched = router
            .resolve(&Location::parse("/settings").unwrap())
            .unwrap();
        assert_eq!(paths(&matched), ["/users", "/users/profile", "/settings"]);

        assert!(router
            .resolve(&Location::parse("/missing").unwrap())
            .is_none());
    }

    #[tokio::test]
    async fn guards_run_in_order() {
        let router = router();
        let calls = Rc::new(RefCell::new(Vec::new()));

        for (name, order) in [("dispatch-last", HookOrder::Last), ("dispatch-first", HookOrder::First)] {
            let calls = calls.clone();
            router.before_dispatch(order, move |_| {
                calls.borrow_mut().push(name);
                async { Ok(NavigationDecision::Continue) }.boxed_local()
            });
        }
        let finalize = {
            let calls = calls.clone();
            router.before_finalize(HookOrder::Last, move |_| {
                calls.borrow_mut().push("finalize");
                async { Ok(NavigationDecision::Continue) }.boxed_local()
            })
        };
        {
            let calls = calls.clone();
            router.after_settle(move |_, failure| {
                assert!(failure.is_none());
                calls.borrow_mut().push("settle");
            });
        }

        router.push("/users").await.unwrap();
        assert_eq!(
            *calls.borrow(),
            ["dispatch-first", "dispatch-last", "finalize", "settle"]
        );
        assert_eq!(router.current().path(), "/users");
        assert_eq!(router.pending_navigation(), None);

        assert!(router.remove_hook(finalize));
        assert!(!router.remove_hook(finalize));
    }

    #[tokio::test]
    async fn duplicates_skip_the_guards() {
        let router = router();
        let guarded = Rc::new(Cell::new(0));
        {
            let guarded = guarded.clone();
            router.before_dispatch(HookOrder::Last, move |_| {
                guarded.set(guarded.get() + 1);
                async { Ok(NavigationDecision::Continue) }.boxed_local()
            });
        }

        router.push("/users").await.unwrap();
        let error = router.push("/users").await.unwrap_err();
        assert!(error.failure().unwrap().is_duplicate());
        assert_eq!(guarded.get(), 1);
    }

    #[tokio::test]
    async fn redirects_and_aborts() {
        let router = router();
        router.before_dispatch(HookOrder::Last, |to| {
            let decision = match to.to().path() {
                "/users" => NavigationDecision::Redirect("/settings".into()),
                "/users/profile" => NavigationDecision::Abort,
                _ => NavigationDecision::Continue,
            };
            async move { Ok(decision) }.boxed_local()
        });

        router.push("/users").await.unwrap();
        assert_eq!(router.current().path(), "/settings");

        let error = router.push("/users/profile").await.unwrap_err();
        assert_eq!(error.failure().unwrap().kind(), &FailureKind::Aborted);
        assert_eq!(router.current().path(), "/settings");

        assert!(matches!(
            router.push("/nowhere").await,
            Err(NavigationError::NoMatch(_))
        ));
    }

    #[test]
    fn plugins_install_once() {
        let router = router();
        assert!(router.install_plugin("loaders"));
        assert!(!router.install_plugin("loaders"));
        assert!(router.uninstall_plugin("loaders"));
        assert!(router.install_plugin("loaders"));
    }
}
