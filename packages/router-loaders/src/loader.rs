//! Data loaders and the context they run in.

use std::{
    any::Any,
    fmt,
    future::Future,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use futures_util::future::{FutureExt, LocalBoxFuture, Shared};

use crate::{
    abort::AbortSignal,
    config::Runtime,
    context::AppContext,
    entries::{LoaderEntries, LoaderEntry},
    error::LoaderError,
    navigation::Navigation,
    navigation_result::NavigationResult,
    router::Router,
};

/// An in-flight load. Cloning it does not start the load again.
pub type LoadFuture = Shared<LocalBoxFuture<'static, Result<(), LoaderError>>>;

type LoadFn = Rc<dyn Fn(LoadContext) -> LocalBoxFuture<'static, anyhow::Result<LoaderValue>>>;

/// A process-unique loader identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoaderId(u64);

impl LoaderId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// When a loader publishes the value it loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// As soon as the load finishes.
    Immediate,

    /// Once every non-lazy loader of the navigation finished, in navigation order.
    #[default]
    AfterLoad,
}

/// How and where a loader runs.
///
/// ```rust
/// # use dioxus_router_loaders::prelude::*;
/// let options = LoaderOptions::default()
///     .commit(CommitMode::Immediate)
///     .lazy(true);
/// assert!(options.lazy);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderOptions {
    /// When the loaded value is published. Defaults to [`CommitMode::AfterLoad`].
    pub commit: CommitMode,

    /// Only run the loader on a server runtime. Defaults to `false`.
    pub server_only: bool,

    /// Don't hold the navigation back while the loader runs on a client runtime. Defaults to
    /// `false`.
    pub lazy: bool,
}

impl LoaderOptions {
    /// Set the commit mode.
    pub fn commit(self, commit: CommitMode) -> Self {
        Self { commit, ..self }
    }

    /// Mark the loader as server-only.
    pub fn server_only(self, server_only: bool) -> Self {
        Self {
            server_only,
            ..self
        }
    }

    /// Mark the loader as lazy.
    pub fn lazy(self, lazy: bool) -> Self {
        Self { lazy, ..self }
    }
}

/// What a loader function resolves to.
#[derive(Clone)]
pub enum LoaderValue {
    /// Data to publish on commit.
    Data(Rc<dyn Any>),

    /// A request to redirect or abort the navigation instead of publishing data.
    Navigate(NavigationResult),
}

impl LoaderValue {
    /// Wrap loaded data.
    pub fn data<T: 'static>(value: T) -> Self {
        Self::Data(Rc::new(value))
    }
}

impl From<NavigationResult> for LoaderValue {
    fn from(result: NavigationResult) -> Self {
        Self::Navigate(result)
    }
}

impl fmt::Debug for LoaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(_) => f.write_str("Data(..)"),
            Self::Navigate(result) => f.debug_tuple("Navigate").field(result).finish(),
        }
    }
}

/// Everything a loader needs while it runs.
///
/// Loaders get their capabilities from here rather than from ambient state, each top-level load
/// receives a fresh context.
#[derive(Clone)]
pub struct LoadContext {
    pub(crate) router: Router,
    pub(crate) navigation: Navigation,
    pub(crate) signal: AbortSignal,
    pub(crate) entries: Rc<LoaderEntries>,
    pub(crate) runtime: Runtime,
    pub(crate) app: AppContext,
}

impl LoadContext {
    /// The router the navigation runs on.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The navigation being loaded for.
    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    /// Aborted when the navigation is superseded, fails or errors.
    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    /// The entries of the router.
    pub fn entries(&self) -> &Rc<LoaderEntries> {
        &self.entries
    }

    /// The runtime the loaders run on.
    pub fn runtime(&self) -> Runtime {
        self.runtime
    }

    /// Values provided by the application.
    pub fn app(&self) -> &AppContext {
        &self.app
    }
}

/// A unit of asynchronous data fetching attached to routes.
///
/// Loaders are compared by identity: two loaders defined by two calls to [`define_loader`] are
/// different even if they share a name.
#[derive(Clone)]
pub struct DataLoader {
    inner: Rc<LoaderInner>,
}

struct LoaderInner {
    id: LoaderId,
    name: String,
    options: LoaderOptions,
    load: LoadFn,
}

/// Define a data loader.
///
/// ```rust
/// # use dioxus_router_loaders::prelude::*;
/// let user = define_loader("user", LoaderOptions::default(), |ctx| async move {
///     let id = ctx.navigation().to().path().trim_start_matches("/users/").to_string();
///     Ok(LoaderValue::data(id))
/// });
/// assert_eq!(user.name(), "user");
/// ```
pub fn define_loader<F, Fut>(name: impl Into<String>, options: LoaderOptions, load: F) -> DataLoader
where
    F: Fn(LoadContext) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<LoaderValue>> + 'static,
{
    DataLoader {
        inner: Rc::new(LoaderInner {
            id: LoaderId::next(),
            name: name.into(),
            options,
            load: Rc::new(move |context| load(context).boxed_local()),
        }),
    }
}

impl DataLoader {
    /// The identity of this loader.
    pub fn id(&self) -> LoaderId {
        self.inner.id
    }

    /// The name given to [`define_loader`].
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The options given to [`define_loader`].
    pub fn options(&self) -> LoaderOptions {
        self.inner.options
    }

    /// The entry of this loader in `entries`, created on first access.
    pub fn entry(&self, entries: &LoaderEntries) -> Rc<LoaderEntry> {
        entries.entry(self)
    }

    /// Load for the context's navigation.
    ///
    /// A load already in flight for the same navigation is reused. The result is staged on the
    /// entry and published right away for [`CommitMode::Immediate`] loaders and lazy loaders on a
    /// client runtime, otherwise whoever awaits the load commits it. Results for a navigation the
    /// entry stopped waiting for are dropped.
    pub fn load(&self, context: LoadContext) -> LoadFuture {
        let id = context.navigation.id();
        let entry = context.entries.entry(self);
        if let Some(pending) = entry.pending_load_for(id) {
            tracing::trace!(loader = %self.name(), navigation = %id, "reusing in-flight load");
            return pending;
        }

        let options = self.options();
        let commit_now = options.commit == CommitMode::Immediate
            || (options.lazy && !context.runtime.is_server());
        let name = self.inner.name.clone();
        let target = context.navigation.downgrade();
        let weak_entry = Rc::downgrade(&entry);

        tracing::trace!(loader = %name, navigation = %id, "starting load");
        let load = (self.inner.load)(context);

        let pending = async move {
            let result = load.await;

            let Some(entry) = weak_entry.upgrade() else {
                return Ok(());
            };
            if !entry.is_pending_for(id) {
                tracing::debug!(loader = %name, navigation = %id, "dropping the result of a stale load");
                return Ok(());
            }

            match result {
                Ok(LoaderValue::Data(value)) => entry.stage(Ok(value)),
                Ok(LoaderValue::Navigate(result)) => {
                    if let Some(navigation) = target.upgrade() {
                        navigation.push_navigation_result(result);
                    }
                }
                Err(cause) => {
                    let error = LoaderError::new(name, cause);
                    tracing::debug!(%error, navigation = %id, "load failed");
                    entry.stage(Err(error.clone()));
                    entry.commit_for(id);
                    return Err(error);
                }
            }

            if commit_now {
                entry.commit_for(id);
            }
            Ok(())
        }
        .boxed_local()
        .shared();

        entry.set_pending(id, pending.clone());
        pending
    }
}

impl PartialEq for DataLoader {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for DataLoader {}

impl fmt::Debug for DataLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoader")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}
