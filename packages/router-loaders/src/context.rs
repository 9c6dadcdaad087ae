use std::{
    any::{Any, TypeId},
    cell::RefCell,
    rc::Rc,
};

use rustc_hash::FxHashMap;

/// Values the application makes available to every data loader.
///
/// Loaders receive the context explicitly through [`LoadContext::app`](crate::LoadContext::app)
/// instead of reaching for ambient state. One value is stored per type, like
/// `provide_context`/`consume_context` in a component tree.
#[derive(Clone, Default)]
pub struct AppContext {
    values: Rc<RefCell<FxHashMap<TypeId, Rc<dyn Any>>>>,
}

impl AppContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide a value, replacing any value of the same type.
    pub fn provide<T: 'static>(&self, value: T) {
        self.values
            .borrow_mut()
            .insert(TypeId::of::<T>(), Rc::new(value));
    }

    /// Clone out the value of type `T`, if one was provided.
    pub fn consume<T: Clone + 'static>(&self) -> Option<T> {
        self.values
            .borrow()
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Whether a value of type `T` was provided.
    pub fn has<T: 'static>(&self) -> bool {
        self.values.borrow().contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("values", &self.values.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct ApiBase(&'static str);

    #[test]
    fn provided_values_are_shared_between_clones() {
        let app = AppContext::new();
        let loader_view = app.clone();

        assert!(!loader_view.has::<ApiBase>());
        app.provide(ApiBase("https://api.example.com"));
        assert_eq!(
            loader_view.consume::<ApiBase>(),
            Some(ApiBase("https://api.example.com"))
        );

        app.provide(ApiBase("http://localhost"));
        assert_eq!(
            loader_view.consume::<ApiBase>(),
            Some(ApiBase("http://localhost"))
        );
        assert_eq!(loader_view.consume::<u32>(), None);
    }
}
