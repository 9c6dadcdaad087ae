use std::{cell::Cell, rc::Rc};

use dioxus_router_loaders::prelude::*;
use futures_util::FutureExt;
use pretty_assertions::assert_eq;

mod common;
use common::{delayed, names, run, sleep, Events};

/// A lazy component that waits `ms` milliseconds before exporting `loader`.
fn lazy(loader: &DataLoader, ms: u64, imports: &Events) -> RouteComponent {
    let (loader, imports) = (loader.clone(), imports.clone());
    RouteComponent::lazy(move || {
        let (loader, imports) = (loader.clone(), imports.clone());
        async move {
            sleep(ms).await;
            imports.push(loader.name());
            Ok(ModuleNamespace::new()
                .export("default", ComponentDescriptor::new("Page"))
                .export("useData", loader))
        }
    })
}

fn record_merged_loaders(router: &Router) -> Events {
    let merged = Events::default();
    router.after_settle({
        let merged = merged.clone();
        move |to, _| merged.push(names(&to.loaders()).join(","))
    });
    merged
}

#[test]
fn merge_order_follows_the_matched_records() {
    run(async {
        for (root_ms, child_ms) in [(30, 5), (5, 30)] {
            let (events, imports) = (Events::default(), Events::default());
            let (root, child) = (
                delayed("root", LoaderOptions::default(), 0, &events),
                delayed("child", LoaderOptions::default(), 0, &events),
            );

            let router = Router::new([Route::new("/")
                .component(lazy(&root, root_ms, &imports))
                .child(Route::new("child").component(lazy(&child, child_ms, &imports)))]);
            let merged = record_merged_loaders(&router);
            setup(&router, DataLoaderConfig::default());

            router.push("/child").await.unwrap();

            let imported: &[&str] = if root_ms > child_ms {
                &["child", "root"]
            } else {
                &["root", "child"]
            };
            assert_eq!(imports.take(), imported);
            assert_eq!(merged.take(), ["root,child"]);
        }
    });
}

#[test]
fn static_loaders_come_first_and_duplicates_collapse() {
    run(async {
        let events = Events::default();
        let (declared, exported) = (
            delayed("declared", LoaderOptions::default(), 0, &events),
            delayed("exported", LoaderOptions::default(), 0, &events),
        );

        let router = Router::new([Route::new("/")
            .component(lazy(&exported, 0, &Events::default()))
            .loader(declared.clone())
            .loader(exported.clone())]);
        let merged = record_merged_loaders(&router);
        setup(&router, DataLoaderConfig::default());

        router.push("/").await.unwrap();
        assert_eq!(merged.take(), ["declared,exported"]);
    });
}

#[test]
fn records_are_discovered_once() {
    run(async {
        let (events, imports) = (Events::default(), Events::default());
        let page = delayed("page", LoaderOptions::default(), 0, &events);

        let router = Router::new([
            Route::new("/"),
            Route::new("/page").component(lazy(&page, 5, &imports)),
        ]);
        setup(&router, DataLoaderConfig::default());

        router.push("/page").await.unwrap();
        router.push("/").await.unwrap();
        router.push("/page").await.unwrap();

        assert_eq!(imports.take(), ["page"]);
        assert_eq!(events.take(), ["page", "page"]);
        assert!(router.records().all(|record| record.is_discovered()));
    });
}

#[test]
fn failed_discovery_fails_the_navigation_and_is_retried() {
    run(async {
        let attempts = Rc::new(Cell::new(0));
        let router = Router::new([
            Route::new("/"),
            Route::new("/flaky").component(RouteComponent::lazy({
                let attempts = attempts.clone();
                move || {
                    attempts.set(attempts.get() + 1);
                    let attempt = attempts.get();
                    async move {
                        if attempt == 1 {
                            anyhow::bail!("failed to fetch the chunk");
                        }
                        Ok(ModuleNamespace::new())
                    }
                }
            })),
        ]);
        setup(&router, DataLoaderConfig::default());

        match router.push("/flaky").await {
            Err(NavigationError::Module(error)) => assert_eq!(error.route(), "/flaky"),
            other => panic!("expected a module error, got {other:?}"),
        }
        assert_eq!(router.current().path(), "/");

        router.push("/flaky").await.unwrap();
        assert_eq!(router.current().path(), "/flaky");
        assert_eq!(attempts.get(), 2);
    });
}

#[test]
fn the_previous_navigation_is_aborted_before_discovery() {
    run(async {
        let started: Rc<std::cell::RefCell<Vec<Navigation>>> = Rc::default();
        let aborted_before_import = Rc::new(Cell::new(None));

        let router = Router::new([
            Route::new("/slow").component(RouteComponent::lazy(|| async {
                sleep(30).await;
                Ok(ModuleNamespace::new())
            })),
            Route::new("/fast").component(RouteComponent::lazy({
                let started = started.clone();
                let aborted_before_import = aborted_before_import.clone();
                move || {
                    let first = started.borrow()[0].signal().unwrap();
                    aborted_before_import.set(Some(first.is_aborted()));
                    async { Ok(ModuleNamespace::new()) }
                }
            })),
        ]);
        setup(&router, DataLoaderConfig::default());
        router.before_dispatch(HookOrder::First, {
            let started = started.clone();
            move |to| {
                started.borrow_mut().push(to.clone());
                async { Ok(NavigationDecision::Continue) }.boxed_local()
            }
        });

        let (slow, fast) = futures_util::future::join(router.push("/slow"), async {
            sleep(5).await;
            router.push("/fast").await
        })
        .await;

        assert_eq!(aborted_before_import.get(), Some(true));
        assert_eq!(slow.unwrap_err().failure().unwrap().kind(), &FailureKind::Cancelled);
        fast.unwrap();

        let first = started.borrow()[0].signal().unwrap();
        assert_eq!(
            first.reason(),
            Some(AbortReason::Superseded {
                by: Location::parse("/fast").unwrap()
            })
        );
    });
}
