//! Route definitions and the records the router builds from them.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use futures_util::future::{join_all, FutureExt, LocalBoxFuture, Shared};

use crate::{
    component::{LazyComponent, RouteComponent},
    error::ModuleError,
    loader::DataLoader,
    set::LoaderSet,
};

/// The name of the component slot filled by [`Route::component`].
pub const DEFAULT_VIEW: &str = "default";

/// A route definition handed to [`Router::new`](crate::Router::new).
///
/// ```rust
/// # use dioxus_router_loaders::prelude::*;
/// let routes = Route::new("/users")
///     .component(ComponentDescriptor::new("Users"))
///     .child(Route::new("profile").component(RouteComponent::lazy(|| async {
///         Ok(ModuleNamespace::new())
///     })));
/// ```
#[derive(Clone, Debug)]
pub struct Route {
    pub(crate) path: String,
    pub(crate) components: Vec<(String, RouteComponent)>,
    pub(crate) loaders: Vec<DataLoader>,
    pub(crate) children: Vec<Route>,
}

impl Route {
    /// A route matching `path`. Child paths are relative to their parent unless they start with
    /// `/`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            components: Vec::new(),
            loaders: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the component of the default view.
    pub fn component(self, component: impl Into<RouteComponent>) -> Self {
        self.named_component(DEFAULT_VIEW, component)
    }

    /// Set the component of a named view.
    pub fn named_component(
        mut self,
        name: impl Into<String>,
        component: impl Into<RouteComponent>,
    ) -> Self {
        let name = name.into();
        let component = component.into();
        match self.components.iter_mut().find(|(slot, _)| *slot == name) {
            Some((_, slot)) => *slot = component,
            None => self.components.push((name, component)),
        }
        self
    }

    /// Attach a loader to the route itself, independently of its components.
    pub fn loader(mut self, loader: DataLoader) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Add a nested route.
    pub fn child(mut self, route: Route) -> Self {
        self.children.push(route);
        self
    }
}

/// The outcome of resolving the lazy components of one record, shared by every navigation
/// waiting for it.
pub(crate) type RecordDiscovery = Shared<LocalBoxFuture<'static, Result<(), ModuleError>>>;

/// A node of the route tree, shared by every navigation that matches it.
///
/// The loaders of a record are discovered the first time a navigation goes through it and are
/// remembered for the lifetime of the record.
#[derive(Clone)]
pub struct RouteRecord {
    inner: Rc<RecordInner>,
}

struct RecordInner {
    path: String,
    components: Vec<(String, RouteComponent)>,
    loaders: Vec<DataLoader>,
    memo: RefCell<LoaderMemo>,
}

#[derive(Default)]
enum LoaderMemo {
    #[default]
    Undiscovered,
    Discovering {
        loaders: LoaderSet,
        done: RecordDiscovery,
    },
    Ready(LoaderSet),
}

impl RouteRecord {
    pub(crate) fn new(
        path: String,
        components: Vec<(String, RouteComponent)>,
        loaders: Vec<DataLoader>,
    ) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                path,
                components,
                loaders,
                memo: RefCell::new(LoaderMemo::Undiscovered),
            }),
        }
    }

    /// The full path of the record.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// The component slots of the record.
    pub fn components(&self) -> &[(String, RouteComponent)] {
        &self.inner.components
    }

    /// The loaders declared on the route definition.
    pub fn static_loaders(&self) -> &[DataLoader] {
        &self.inner.loaders
    }

    /// Whether the loaders of every component of this record are known.
    pub fn is_discovered(&self) -> bool {
        matches!(*self.inner.memo.borrow(), LoaderMemo::Ready(_))
    }

    /// The loaders known for this record so far: the static ones followed by the ones exported
    /// by its lazy components once they resolved.
    pub fn loaders(&self) -> LoaderSet {
        match &*self.inner.memo.borrow() {
            LoaderMemo::Undiscovered => self.inner.loaders.iter().cloned().collect(),
            LoaderMemo::Discovering { loaders, .. } | LoaderMemo::Ready(loaders) => {
                loaders.clone()
            }
        }
    }

    /// Start discovering the loaders of this record.
    ///
    /// Returns [`None`] if they are already known. If another navigation is already resolving the
    /// components of this record, its resolution is shared instead of importing them again.
    pub(crate) fn discover(&self) -> Option<RecordDiscovery> {
        let mut memo = self.inner.memo.borrow_mut();
        if let LoaderMemo::Discovering { done, .. } = &*memo {
            return Some(done.clone());
        }
        if matches!(*memo, LoaderMemo::Ready(_)) {
            return None;
        }

        let loaders: LoaderSet = self.inner.loaders.iter().cloned().collect();
        let lazy: Vec<(String, LazyComponent)> = self
            .inner
            .components
            .iter()
            .filter_map(|(name, component)| Some((name.clone(), component.as_lazy()?.clone())))
            .collect();

        if lazy.is_empty() {
            *memo = LoaderMemo::Ready(loaders);
            return None;
        }

        tracing::trace!(route = %self.path(), components = lazy.len(), "resolving lazy components");
        let imports = join_all(lazy.iter().map(|(_, component)| component.import()));
        let record = Rc::downgrade(&self.inner);
        let path = self.inner.path.clone();

        let done = async move {
            let modules = imports.await;

            let mut discovered = Vec::new();
            let mut failure = None;
            for ((name, _), module) in lazy.iter().zip(modules) {
                match module {
                    Ok(module) => discovered.extend(module.loaders().cloned()),
                    Err(cause) if failure.is_none() => {
                        failure = Some(ModuleError::new(path.as_str(), name.as_str(), cause))
                    }
                    Err(_) => {}
                }
            }

            finish_discovery(&record, failure.is_none().then_some(discovered));
            match failure {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
        .boxed_local()
        .shared();

        *memo = LoaderMemo::Discovering {
            loaders,
            done: done.clone(),
        };
        Some(done)
    }
}

/// Publish the discovered loaders, or forget the attempt so the next navigation retries it.
fn finish_discovery(record: &Weak<RecordInner>, discovered: Option<Vec<DataLoader>>) {
    let Some(record) = record.upgrade() else {
        return;
    };

    let mut memo = record.memo.borrow_mut();
    let state = std::mem::take(&mut *memo);
    *memo = match (state, discovered) {
        (LoaderMemo::Discovering { mut loaders, .. }, Some(discovered)) => {
            loaders.extend(discovered);
            LoaderMemo::Ready(loaders)
        }
        (LoaderMemo::Discovering { .. }, None) => LoaderMemo::Undiscovered,
        (state, _) => state,
    };
}

impl fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRecord")
            .field("path", &self.inner.path)
            .field("components", &self.inner.components.len())
            .field("loaders", &self.loaders())
            .finish()
    }
}

impl PartialEq for RouteRecord {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
