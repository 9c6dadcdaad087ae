use std::{cell::RefCell, rc::Rc};

use crate::{
    abort::{AbortReason, AbortSignal},
    entries::LoaderEntries,
    navigation::Navigation,
};

/// Tracks the navigation whose loaders are currently running on one router.
#[derive(Default)]
pub(crate) struct PendingNavigation {
    slot: RefCell<Option<Navigation>>,
}

impl PendingNavigation {
    /// The navigation currently owning the loaders.
    pub(crate) fn current(&self) -> Option<Navigation> {
        self.slot.borrow().clone()
    }

    /// Make `to` the pending navigation and give it a fresh signal and loader set.
    ///
    /// The previous pending navigation is replaced first, then its signal is aborted.
    pub(crate) fn start(&self, to: &Navigation, entries: &Rc<LoaderEntries>) {
        to.attach_loader_state(AbortSignal::new(), entries.clone());
        let previous = self.slot.replace(Some(to.clone()));

        if let Some(signal) = previous
            .filter(|previous| previous != to)
            .and_then(|previous| previous.signal())
        {
            let superseded = signal.abort(Some(AbortReason::Superseded { by: to.to().clone() }));
            if superseded {
                tracing::debug!(navigation = %to.id(), to = %to.to(), "superseded the pending navigation");
            }
        }
    }

    /// Release the entries of the pending navigation after the router ignored a duplicate.
    ///
    /// Routers drop duplicate navigations without finalizing them, so the loaders of the pending
    /// navigation would otherwise keep waiting for it forever.
    pub(crate) fn on_duplicate_failure(&self, entries: &LoaderEntries) {
        let Some(pending) = self.slot.borrow_mut().take() else {
            return;
        };

        for loader in pending.loaders() {
            if let Some(entry) = entries.get(&loader) {
                entry.clear_pending();
            }
        }
        tracing::trace!(navigation = %pending.id(), "released the entries of the pending navigation");
    }

    /// Abort the signal of `to`, if it has one.
    pub(crate) fn on_failure_or_error(&self, to: &Navigation, reason: AbortReason) {
        if let Some(signal) = to.signal() {
            signal.abort(Some(reason));
        }
    }

    /// Forget the pending navigation, aborting its signal.
    pub(crate) fn clear(&self) {
        if let Some(signal) = self.slot.take().and_then(|pending| pending.signal()) {
            signal.abort(None);
        }
    }
}
