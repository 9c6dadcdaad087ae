use crate::{
    abort::AbortReason,
    error::{NavigationError, NavigationFailure},
    navigation::Navigation,
    plugin::LoaderCoordinator,
};

impl LoaderCoordinator {
    /// Abort the loaders of a navigation that failed.
    ///
    /// Duplicated navigations never reach the loaders, so the loaders still waiting on the pending
    /// navigation are released as well.
    pub(crate) fn after_settle(&self, to: &Navigation, failure: Option<&NavigationFailure>) {
        let Some(failure) = failure else {
            return;
        };

        tracing::trace!(navigation = %to.id(), %failure, "aborting the loaders of a failed navigation");
        self.pending
            .on_failure_or_error(to, AbortReason::Failed(failure.clone()));
        if failure.is_duplicate() {
            self.pending.on_duplicate_failure(&self.entries);
        }
    }

    /// Abort the loaders of a navigation that errored, recording the error as the reason.
    pub(crate) fn on_error(&self, to: &Navigation, error: &NavigationError) {
        self.pending
            .on_failure_or_error(to, AbortReason::Errored(error.to_string()));
    }
}
