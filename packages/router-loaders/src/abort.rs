use std::{cell::RefCell, fmt, rc::Rc};

use tokio_util::sync::CancellationToken;

use crate::{error::NavigationFailure, navigation::Location};

/// Why an [`AbortSignal`] was aborted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// A newer navigation started while this one was pending.
    Superseded {
        /// Where the newer navigation is going.
        by: Location,
    },

    /// The navigation settled with a failure.
    Failed(NavigationFailure),

    /// The navigation errored. Holds the rendered error.
    Errored(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Superseded { by } => write!(f, "superseded by a navigation to `{by}`"),
            Self::Failed(failure) => write!(f, "{failure}"),
            Self::Errored(error) => write!(f, "{error}"),
        }
    }
}

/// A broadcast cancellation request for the loaders of one navigation.
///
/// Cancellation is cooperative: aborting the signal never stops a running load. Loaders are
/// expected to check [`AbortSignal::is_aborted`] or race their work against
/// [`AbortSignal::aborted`] themselves.
#[derive(Clone, Default)]
pub struct AbortSignal {
    inner: Rc<SignalInner>,
}

#[derive(Default)]
struct SignalInner {
    token: CancellationToken,
    reason: RefCell<Option<AbortReason>>,
}

impl AbortSignal {
    /// Create a signal that is not aborted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the signal.
    ///
    /// Only the first call has an effect, later reasons are dropped. Returns `true` if this call
    /// aborted the signal.
    pub fn abort(&self, reason: Option<AbortReason>) -> bool {
        if self.is_aborted() {
            return false;
        }

        *self.inner.reason.borrow_mut() = reason;
        self.inner.token.cancel();
        true
    }

    /// Returns `true` once the signal has been aborted.
    pub fn is_aborted(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// The reason passed to the call that aborted the signal.
    pub fn reason(&self) -> Option<AbortReason> {
        self.inner.reason.borrow().clone()
    }

    /// Wait until the signal is aborted.
    pub async fn aborted(&self) {
        self.inner.token.cancelled().await
    }
}

impl PartialEq for AbortSignal {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .field("reason", &self.inner.reason.borrow())
            .finish()
    }
}
