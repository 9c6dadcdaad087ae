use futures_util::{future::join_all, FutureExt};

use crate::{
    navigation::Navigation, navigation_result::NavigationDecision, plugin::LoaderCoordinator,
    router::GuardFuture,
};

impl LoaderCoordinator {
    /// Collect the loaders of every record matched by `to`.
    ///
    /// The previous pending navigation is superseded before anything is resolved. Records whose
    /// loaders are unknown resolve their lazy components concurrently; once all of them settled
    /// the loaders are merged from the root record to the leaf.
    pub(crate) fn discover(&self, to: &Navigation) -> GuardFuture {
        self.pending.start(to, &self.entries);

        let discoveries: Vec<_> = to
            .matched()
            .iter()
            .filter_map(|record| record.discover())
            .collect();
        let to = to.clone();

        async move {
            if !discoveries.is_empty() {
                tracing::trace!(navigation = %to.id(), records = discoveries.len(), "waiting for lazy components");
            }
            for resolved in join_all(discoveries).await {
                resolved?;
            }

            for record in to.matched() {
                to.merge_loaders(record.loaders());
            }
            tracing::trace!(navigation = %to.id(), loaders = to.loaders().len(), "discovered the loaders");
            Ok(NavigationDecision::Continue)
        }
        .boxed_local()
    }
}
