#![allow(dead_code)]

use std::{cell::RefCell, future::Future, rc::Rc, time::Duration};

use dioxus_router_loaders::prelude::*;
use tracing_subscriber::EnvFilter;

/// Run `future` on a current-thread runtime inside a `LocalSet`, so tasks can be spawned locally.
pub fn run<F: Future>(future: F) -> F::Output {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    tokio::task::LocalSet::new().block_on(&runtime, future)
}

pub async fn sleep(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// A shared, ordered record of events.
#[derive(Clone, Default)]
pub struct Events(Rc<RefCell<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

/// A loader that waits `ms` milliseconds, logs `name` to `events` and loads `name`.
pub fn delayed(name: &'static str, options: LoaderOptions, ms: u64, events: &Events) -> DataLoader {
    let events = events.clone();
    define_loader(name, options, move |_| {
        let events = events.clone();
        async move {
            sleep(ms).await;
            events.push(name);
            Ok(LoaderValue::data(name))
        }
    })
}

pub fn names(loaders: &[DataLoader]) -> Vec<String> {
    loaders.iter().map(|loader| loader.name().to_string()).collect()
}
