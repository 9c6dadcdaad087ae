use futures_util::future::{join_all, FutureExt};
use tracing::Instrument;

use crate::{
    error::NavigationError,
    loader::{CommitMode, LoadContext},
    navigation::Navigation,
    navigation_result::NavigationDecision,
    plugin::LoaderCoordinator,
    router::GuardFuture,
};

impl LoaderCoordinator {
    /// Run the loaders discovered for `to` and publish what they loaded.
    ///
    /// Every loader gets its own [`LoadContext`]. Lazy loaders on a client runtime are spawned
    /// and never hold the navigation back. The other ones are awaited together, then the
    /// after-load ones are committed in the order they were discovered in. If the navigation
    /// returned navigation results, the configured selector decides what happens next.
    ///
    /// When a loader fails or the navigation was aborted, the after-load entries still waiting
    /// for this navigation are released without publishing anything.
    pub(crate) fn execute(&self, to: &Navigation) -> GuardFuture {
        let (Some(router), Some(signal)) = (self.router.upgrade(), to.signal()) else {
            return async { Ok(NavigationDecision::Continue) }.boxed_local();
        };

        let runtime = self.config.runtime;
        let span = tracing::debug_span!("load", navigation = %to.id(), to = %to.to());
        let mut awaited = Vec::new();
        let mut owed = Vec::new();

        for loader in to.loaders() {
            let options = loader.options();
            if options.server_only && !runtime.is_server() {
                tracing::trace!(parent: &span, loader = %loader.name(), "skipping server-only loader");
                continue;
            }

            let load = loader.load(LoadContext {
                router: router.clone(),
                navigation: to.clone(),
                signal: signal.clone(),
                entries: self.entries.clone(),
                runtime,
                app: self.config.app.clone(),
            });

            if options.lazy && !runtime.is_server() {
                let name = loader.name().to_string();
                let task = async move {
                    if let Err(error) = load.await {
                        tracing::warn!(loader = %name, %error, "lazy loader failed");
                    }
                }
                .instrument(span.clone())
                .boxed_local();
                match &self.config.spawner {
                    Some(spawn) => spawn(task),
                    None => self.background.spawn(task),
                }
                continue;
            }

            if options.commit == CommitMode::AfterLoad {
                owed.push(loader);
            }
            awaited.push(load);
        }

        let select = self.config.select_navigation_result.clone();
        let entries = self.entries.clone();
        let to = to.clone();

        async move {
            // Every load runs to the end, the first error in merge order fails the navigation.
            let failed = join_all(awaited).await.into_iter().find_map(Result::err);
            let release = || {
                for loader in &owed {
                    if let Some(entry) = entries.get(loader) {
                        entry.release(to.id());
                    }
                }
            };

            if let Some(error) = failed {
                release();
                return Err(NavigationError::Loader(error));
            }

            if signal.is_aborted() {
                tracing::debug!(reason = ?signal.reason(), "not committing the loaders of an aborted navigation");
                release();
                return Ok(NavigationDecision::Continue);
            }

            let mut committed = 0;
            for loader in &owed {
                if loader.entry(&entries).commit(&to) {
                    committed += 1;
                }
            }
            tracing::trace!(committed, "committed the loaders");

            let results = to.navigation_results();
            if results.is_empty() {
                return Ok(NavigationDecision::Continue);
            }
            let decision = select(&results);
            tracing::debug!(results = results.len(), ?decision, "loaders returned navigation results");
            Ok(decision)
        }
        .instrument(span)
        .boxed_local()
    }
}
