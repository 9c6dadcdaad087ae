#![doc = include_str!("../README.md")]
#![doc(html_logo_url = "https://avatars.githubusercontent.com/u/79236386")]
#![doc(html_favicon_url = "https://avatars.githubusercontent.com/u/79236386")]
#![deny(missing_docs)]

mod abort;
mod background;
mod component;
mod config;
mod context;
mod entries;
mod error;
mod loader;
mod navigation;
mod navigation_result;
mod route;
mod router;
mod set;

mod discovery;
mod execution;
mod pending;
mod plugin;
mod reconcile;

pub use abort::*;
pub use component::*;
pub use config::*;
pub use context::*;
pub use entries::*;
pub use error::*;
pub use loader::*;
pub use navigation::{Location, Navigation, NavigationId};
pub use navigation_result::*;
pub use plugin::{setup, DataLoaderHandle};
pub use route::{Route, RouteRecord, DEFAULT_VIEW};
pub use router::{GuardFuture, HookId, HookOrder, Router};
pub use set::*;

/// A collection of useful items most applications might need.
pub mod prelude {
    pub use crate::abort::{AbortReason, AbortSignal};
    pub use crate::component::{
        is_async_component, ComponentDescriptor, LazyComponent, ModuleNamespace, RouteComponent,
    };
    pub use crate::config::{DataLoaderConfig, Runtime};
    pub use crate::context::AppContext;
    pub use crate::error::{FailureKind, NavigationError, NavigationFailure};
    pub use crate::loader::{define_loader, CommitMode, DataLoader, LoadContext, LoaderOptions, LoaderValue};
    pub use crate::navigation::{Location, Navigation};
    pub use crate::navigation_result::{NavigationDecision, NavigationResult};
    pub use crate::plugin::setup;
    pub use crate::route::Route;
    pub use crate::router::{HookOrder, Router};
}
