/// What a navigation guard wants the router to do with the navigation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Keep going.
    #[default]
    Continue,

    /// Stop the navigation and navigate to this path instead.
    Redirect(String),

    /// Stop the navigation and stay where the router is.
    Abort,
}

/// A value a loader returns instead of data to change the outcome of the navigation.
///
/// The loaders never pick between several results themselves, every result is handed to
/// [`DataLoaderConfig::select_navigation_result`](crate::DataLoaderConfig::select_navigation_result).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationResult {
    value: NavigationDecision,
}

impl NavigationResult {
    /// Wrap an arbitrary decision.
    pub fn new(value: NavigationDecision) -> Self {
        Self { value }
    }

    /// Redirect the navigation to `path`.
    pub fn redirect(path: impl Into<String>) -> Self {
        Self::new(NavigationDecision::Redirect(path.into()))
    }

    /// Abort the navigation.
    pub fn abort() -> Self {
        Self::new(NavigationDecision::Abort)
    }

    /// The wrapped decision.
    pub fn value(&self) -> &NavigationDecision {
        &self.value
    }

    /// Unwrap the decision.
    pub fn into_value(self) -> NavigationDecision {
        self.value
    }
}

impl From<NavigationDecision> for NavigationResult {
    fn from(value: NavigationDecision) -> Self {
        Self::new(value)
    }
}
