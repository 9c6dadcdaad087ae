//! Installing the data loaders on a router.

use std::rc::Rc;

use crate::{
    background::BackgroundTasks,
    config::DataLoaderConfig,
    entries::LoaderEntries,
    navigation::Navigation,
    pending::PendingNavigation,
    router::{HookId, HookOrder, Router, WeakRouter},
};

const PLUGIN: &str = "dioxus-router-loaders";

/// The per-router state shared by the navigation hooks.
pub(crate) struct LoaderCoordinator {
    pub(crate) router: WeakRouter,
    pub(crate) entries: Rc<LoaderEntries>,
    pub(crate) pending: PendingNavigation,
    pub(crate) background: BackgroundTasks,
    pub(crate) config: DataLoaderConfig,
}

/// Run the data loaders of every navigation of `router`.
///
/// Loaders are discovered before any other guard runs and executed after every other guard
/// accepted the navigation. Calling this twice on the same router does nothing the second time,
/// the returned handle is inert.
///
/// ```rust
/// # use dioxus_router_loaders::prelude::*;
/// let router = Router::new([Route::new("/")]);
/// let loaders = setup(&router, DataLoaderConfig::default());
/// assert!(loaders.is_installed());
/// assert!(!setup(&router, DataLoaderConfig::default()).is_installed());
/// loaders.teardown();
/// ```
pub fn setup(router: &Router, config: DataLoaderConfig) -> DataLoaderHandle {
    if !router.install_plugin(PLUGIN) {
        tracing::warn!("The data loaders are already installed on this router, ignoring the second setup");
        return DataLoaderHandle {
            router: router.downgrade(),
            entries: Rc::new(LoaderEntries::new()),
            installed: None,
        };
    }

    let coordinator = Rc::new(LoaderCoordinator {
        router: router.downgrade(),
        entries: Rc::new(LoaderEntries::new()),
        pending: PendingNavigation::default(),
        background: BackgroundTasks::default(),
        config,
    });

    let hooks = vec![
        router.before_dispatch(HookOrder::First, {
            let coordinator = coordinator.clone();
            move |to| coordinator.discover(to)
        }),
        router.before_finalize(HookOrder::Last, {
            let coordinator = coordinator.clone();
            move |to| coordinator.execute(to)
        }),
        router.after_settle({
            let coordinator = coordinator.clone();
            move |to, failure| coordinator.after_settle(to, failure)
        }),
        router.on_error({
            let coordinator = coordinator.clone();
            move |to, error| coordinator.on_error(to, error)
        }),
    ];
    tracing::debug!(runtime = ?coordinator.config.runtime, "installed the data loaders");

    DataLoaderHandle {
        router: router.downgrade(),
        entries: coordinator.entries.clone(),
        installed: Some((coordinator, hooks)),
    }
}

/// Returned by [`setup`].
pub struct DataLoaderHandle {
    router: WeakRouter,
    entries: Rc<LoaderEntries>,
    installed: Option<(Rc<LoaderCoordinator>, Vec<HookId>)>,
}

impl DataLoaderHandle {
    /// The entries of every loader that ran on the router.
    pub fn entries(&self) -> Rc<LoaderEntries> {
        self.entries.clone()
    }

    /// The navigation whose loaders were started last, until a duplicate navigation releases it.
    pub fn pending_navigation(&self) -> Option<Navigation> {
        let (coordinator, _) = self.installed.as_ref()?;
        coordinator.pending.current()
    }

    /// Drive the lazy loads started without a [`spawner`](DataLoaderConfig::spawner) until
    /// every one of them finished.
    ///
    /// Resolves at once on an inert handle or when nothing runs in the background.
    pub async fn run_background(&self) {
        if let Some((coordinator, _)) = &self.installed {
            coordinator.background.run().await;
        }
    }

    /// How many lazy loads are waiting for [`run_background`](Self::run_background).
    pub fn background_tasks(&self) -> usize {
        self.installed
            .as_ref()
            .map_or(0, |(coordinator, _)| coordinator.background.len())
    }

    /// Whether this handle owns the hooks, `false` for a repeated [`setup`].
    pub fn is_installed(&self) -> bool {
        self.installed.is_some()
    }

    /// Remove the hooks from the router and forget every entry.
    ///
    /// The pending navigation is aborted; its loaders keep running but their results are dropped.
    /// Lazy loads waiting for [`run_background`](Self::run_background) are dropped.
    pub fn teardown(self) {
        let Some((coordinator, hooks)) = self.installed else {
            return;
        };

        if let Some(router) = self.router.upgrade() {
            for hook in hooks {
                router.remove_hook(hook);
            }
            router.uninstall_plugin(PLUGIN);
        }
        coordinator.pending.clear();
        coordinator.background.clear();
        coordinator.entries.clear();
        tracing::debug!("removed the data loaders");
    }
}

impl std::fmt::Debug for DataLoaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLoaderHandle")
            .field("installed", &self.is_installed())
            .field("entries", &self.entries)
            .finish()
    }
}
