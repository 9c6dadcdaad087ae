use std::rc::Rc;

use futures_util::future::LocalBoxFuture;

use crate::{
    context::AppContext,
    navigation_result::{NavigationDecision, NavigationResult},
};

/// Where the loaders run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Runtime {
    /// In the client. Lazy loaders run in the background and server-only loaders are skipped.
    #[default]
    Client,

    /// On the server. Every loader is awaited.
    Server,
}

impl Runtime {
    /// Returns `true` on the server.
    pub fn is_server(self) -> bool {
        self == Self::Server
    }
}

/// Runs a future in the background on the current thread.
pub type Spawner = Rc<dyn Fn(LocalBoxFuture<'static, ()>)>;

/// Picks what to do when loaders returned [`NavigationResult`]s.
pub type SelectNavigationResult = Rc<dyn Fn(&[NavigationResult]) -> NavigationDecision>;

/// Configuration for [`setup`](crate::setup).
///
/// This implements [`Default`] and follows the builder pattern, so you can use it like this:
/// ```rust
/// # use dioxus_router_loaders::prelude::*;
/// let cfg = DataLoaderConfig::default()
///     .runtime(Runtime::Server)
///     .select_navigation_result(|results| {
///         results
///             .last()
///             .map(|result| result.value().clone())
///             .unwrap_or_default()
///     });
/// ```
#[derive(Clone)]
pub struct DataLoaderConfig {
    pub(crate) runtime: Runtime,
    pub(crate) app: AppContext,
    pub(crate) spawner: Option<Spawner>,
    pub(crate) select_navigation_result: SelectNavigationResult,
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            runtime: Runtime::default(),
            app: AppContext::default(),
            spawner: default_spawner(),
            select_navigation_result: Rc::new(select_first),
        }
    }
}

impl DataLoaderConfig {
    /// The runtime the loaders run on.
    ///
    /// Defaults to [`Runtime::Client`].
    pub fn runtime(self, runtime: Runtime) -> Self {
        Self { runtime, ..self }
    }

    /// The application context handed to every loader.
    ///
    /// Defaults to an empty context.
    pub fn app_context(self, app: AppContext) -> Self {
        Self { app, ..self }
    }

    /// How lazy loaders are run in the background.
    ///
    /// Defaults to `wasm_bindgen_futures::spawn_local` on wasm. Elsewhere lazy loads are kept by
    /// the loaders themselves and make progress while
    /// [`DataLoaderHandle::run_background`](crate::DataLoaderHandle::run_background) is awaited.
    ///
    /// Inside a tokio `LocalSet`:
    /// ```rust
    /// # use dioxus_router_loaders::prelude::*;
    /// let cfg = DataLoaderConfig::default().spawner(|task| {
    ///     tokio::task::spawn_local(task);
    /// });
    /// ```
    pub fn spawner(self, spawner: impl Fn(LocalBoxFuture<'static, ()>) + 'static) -> Self {
        let spawner: Spawner = Rc::new(spawner);
        Self {
            spawner: Some(spawner),
            ..self
        }
    }

    /// Called once per navigation with every [`NavigationResult`] its loaders returned, if there
    /// was at least one. The returned decision is handed to the router.
    ///
    /// Defaults to the first result.
    pub fn select_navigation_result(
        self,
        select: impl Fn(&[NavigationResult]) -> NavigationDecision + 'static,
    ) -> Self {
        Self {
            select_navigation_result: Rc::new(select),
            ..self
        }
    }
}

fn select_first(results: &[NavigationResult]) -> NavigationDecision {
    results
        .first()
        .map(|result| result.value().clone())
        .unwrap_or_default()
}

#[cfg(not(target_arch = "wasm32"))]
fn default_spawner() -> Option<Spawner> {
    None
}

#[cfg(target_arch = "wasm32")]
fn default_spawner() -> Option<Spawner> {
    let spawner: Spawner =
        Rc::new(|task: LocalBoxFuture<'static, ()>| wasm_bindgen_futures::spawn_local(task));
    Some(spawner)
}
