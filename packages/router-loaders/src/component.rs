//! Route components and the modules lazy components resolve to.

use std::{any::Any, fmt, future::Future, rc::Rc};

use futures_util::future::{FutureExt, LocalBoxFuture};

use crate::loader::DataLoader;

/// The future returned by a [`LazyComponent`]'s import function.
pub type ModuleFuture = LocalBoxFuture<'static, anyhow::Result<ModuleNamespace>>;

/// A component that is ready to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentDescriptor {
    name: &'static str,
}

impl ComponentDescriptor {
    /// Describe a component by name.
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// The name of the component.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A component that has to be imported before it can render.
///
/// The import function is only called when a navigation first goes through the route it belongs
/// to. The exports of the resolved module are scanned for data loaders.
#[derive(Clone)]
pub struct LazyComponent {
    import: Rc<dyn Fn() -> ModuleFuture>,
}

impl LazyComponent {
    /// Wrap an import function.
    pub fn new<F, Fut>(import: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<ModuleNamespace>> + 'static,
    {
        Self {
            import: Rc::new(move || import().boxed_local()),
        }
    }

    /// Start importing the module.
    pub fn import(&self) -> ModuleFuture {
        (self.import)()
    }
}

impl fmt::Debug for LazyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyComponent")
    }
}

/// What a route record stores in a component slot.
#[derive(Clone, Debug)]
pub enum RouteComponent {
    /// An already resolved component.
    Resolved(ComponentDescriptor),

    /// A component resolved on first use.
    Lazy(LazyComponent),
}

impl RouteComponent {
    /// Create a lazy component from an import function.
    pub fn lazy<F, Fut>(import: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<ModuleNamespace>> + 'static,
    {
        Self::Lazy(LazyComponent::new(import))
    }

    /// The lazy component, if this slot still needs to be imported.
    pub fn as_lazy(&self) -> Option<&LazyComponent> {
        match self {
            Self::Lazy(lazy) => Some(lazy),
            Self::Resolved(_) => None,
        }
    }
}

impl From<ComponentDescriptor> for RouteComponent {
    fn from(component: ComponentDescriptor) -> Self {
        Self::Resolved(component)
    }
}

impl From<LazyComponent> for RouteComponent {
    fn from(component: LazyComponent) -> Self {
        Self::Lazy(component)
    }
}

/// Returns `true` if the component has to be imported before its loaders can be discovered.
pub fn is_async_component(component: &RouteComponent) -> bool {
    component.as_lazy().is_some()
}

/// A single export of a resolved module.
#[derive(Clone)]
pub enum ModuleExport {
    /// A component.
    Component(ComponentDescriptor),

    /// A data loader.
    Loader(DataLoader),

    /// Anything else.
    Value(Rc<dyn Any>),
}

impl ModuleExport {
    /// The data loader, if this export is one.
    pub fn as_loader(&self) -> Option<&DataLoader> {
        match self {
            Self::Loader(loader) => Some(loader),
            _ => None,
        }
    }
}

impl From<DataLoader> for ModuleExport {
    fn from(loader: DataLoader) -> Self {
        Self::Loader(loader)
    }
}

impl From<ComponentDescriptor> for ModuleExport {
    fn from(component: ComponentDescriptor) -> Self {
        Self::Component(component)
    }
}

impl fmt::Debug for ModuleExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(component) => f.debug_tuple("Component").field(component).finish(),
            Self::Loader(loader) => f.debug_tuple("Loader").field(&loader.name()).finish(),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// The named exports of a resolved module, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct ModuleNamespace {
    exports: Vec<(String, ModuleExport)>,
}

impl ModuleNamespace {
    /// Create a module without exports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an export.
    pub fn export(mut self, name: impl Into<String>, value: impl Into<ModuleExport>) -> Self {
        self.exports.push((name.into(), value.into()));
        self
    }

    /// Look up an export by name.
    pub fn get(&self, name: &str) -> Option<&ModuleExport> {
        self.exports
            .iter()
            .find(|(export, _)| export == name)
            .map(|(_, value)| value)
    }

    /// Every data loader the module exports, in declaration order.
    pub fn loaders(&self) -> impl Iterator<Item = &DataLoader> + '_ {
        self.exports.iter().filter_map(|(_, value)| value.as_loader())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{define_loader, LoaderOptions, LoaderValue};

    #[test]
    fn only_lazy_components_are_async() {
        let resolved = RouteComponent::from(ComponentDescriptor::new("Home"));
        let lazy = RouteComponent::lazy(|| async { Ok(ModuleNamespace::new()) });

        assert!(!is_async_component(&resolved));
        assert!(is_async_component(&lazy));
    }

    #[test]
    fn namespaces_expose_their_loaders_in_order() {
        let user = define_loader("user", LoaderOptions::default(), |_| async {
            Ok(LoaderValue::data(1))
        });
        let posts = define_loader("posts", LoaderOptions::default(), |_| async {
            Ok(LoaderValue::data(2))
        });

        let module = ModuleNamespace::new()
            .export("default", ComponentDescriptor::new("UserPage"))
            .export("useUser", user)
            .export("PAGE_SIZE", ModuleExport::Value(Rc::new(20usize)))
            .export("usePosts", posts);

        let names: Vec<_> = module.loaders().map(|loader| loader.name()).collect();
        assert_eq!(names, ["user", "posts"]);
        assert!(matches!(
            module.get("default"),
            Some(ModuleExport::Component(component)) if component.name() == "UserPage"
        ));
        assert!(module.get("missing").is_none());
    }
}
