//! Errors and failures produced while navigating.

use std::{fmt, rc::Rc};

use crate::navigation::{Location, Navigation};

/// The reason a navigation was stopped by the router without an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// A guard (or a loader through a [`NavigationResult`](crate::NavigationResult)) aborted the
    /// navigation.
    Aborted,

    /// A newer navigation started before this one could finish.
    Cancelled,

    /// The navigation targets the location the router is already at.
    Duplicated,

    /// A guard redirected the navigation to another path.
    Redirected(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => f.write_str("was aborted"),
            Self::Cancelled => f.write_str("was cancelled by a newer navigation"),
            Self::Duplicated => f.write_str("targets the current location"),
            Self::Redirected(to) => write!(f, "was redirected to `{to}`"),
        }
    }
}

/// A navigation that settled without reaching its target.
///
/// Failures are expected outcomes of routing and are reported to the after-settle hooks. They
/// are different from [`NavigationError`]s, which are reported to the error hooks.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("navigation from `{from}` to `{to}` {kind}")]
pub struct NavigationFailure {
    kind: FailureKind,
    from: Location,
    to: Location,
}

impl NavigationFailure {
    pub(crate) fn new(kind: FailureKind, navigation: &Navigation) -> Self {
        Self {
            kind,
            from: navigation.from().clone(),
            to: navigation.to().clone(),
        }
    }

    /// Why the navigation failed.
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// The location the router was at when the navigation started.
    pub fn from(&self) -> &Location {
        &self.from
    }

    /// The location the navigation tried to reach.
    pub fn to(&self) -> &Location {
        &self.to
    }

    /// Returns `true` if the router ignored this navigation because it was a duplicate.
    pub fn is_duplicate(&self) -> bool {
        self.kind == FailureKind::Duplicated
    }
}

/// A data loader's `load` failed.
///
/// The cause is shared so the same in-flight load can report its failure to every awaiter.
#[derive(Clone, Debug, thiserror::Error)]
#[error("loader `{loader}` failed: {cause}")]
pub struct LoaderError {
    loader: String,
    cause: Rc<anyhow::Error>,
}

impl LoaderError {
    pub(crate) fn new(loader: impl Into<String>, cause: anyhow::Error) -> Self {
        Self {
            loader: loader.into(),
            cause: Rc::new(cause),
        }
    }

    /// The name of the loader that failed.
    pub fn loader(&self) -> &str {
        &self.loader
    }

    /// The error returned by the loader.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

/// A lazy route component could not be resolved.
#[derive(Clone, Debug, thiserror::Error)]
#[error("failed to resolve component `{component}` of route `{route}`: {cause}")]
pub struct ModuleError {
    route: String,
    component: String,
    cause: Rc<anyhow::Error>,
}

impl ModuleError {
    pub(crate) fn new(
        route: impl Into<String>,
        component: impl Into<String>,
        cause: anyhow::Error,
    ) -> Self {
        Self {
            route: route.into(),
            component: component.into(),
            cause: Rc::new(cause),
        }
    }

    /// The path of the route record the component belongs to.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// The name of the component slot that failed to resolve.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// The error returned by the component's import function.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

/// Everything that can go wrong while navigating.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// The navigation settled without reaching its target.
    #[error(transparent)]
    Failure(#[from] NavigationFailure),

    /// A lazy component could not be resolved while discovering loaders.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// A data loader failed.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// No route matches the target location.
    #[error("no route matches `{0}`")]
    NoMatch(Location),

    /// The target could not be parsed as a location.
    #[error("invalid location `{location}`")]
    InvalidLocation {
        /// The rejected input.
        location: String,
        /// Why it was rejected.
        #[source]
        source: url::ParseError,
    },

    /// The target points outside of the application.
    #[error("cannot navigate to external location `{0}`")]
    External(String),

    /// A navigation guard returned an error.
    #[error("navigation guard failed: {0}")]
    Guard(anyhow::Error),
}

impl NavigationError {
    /// The failure, if the navigation failed rather than errored.
    pub fn failure(&self) -> Option<&NavigationFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for NavigationError {
    fn from(error: anyhow::Error) -> Self {
        Self::Guard(error)
    }
}
