use futures::executor::LocalPool;
use route_preload::testing::MockLoader;
use route_preload::{LoadError, PreloadCoordinator, PreloadState, PreloadStatus, RouteDescriptor};
use std::cell::Cell;
use std::rc::Rc;

fn coordinator_with(loader: &Rc<MockLoader>, pool: &LocalPool, paths: &[&str]) -> PreloadCoordinator {
    let coordinator = PreloadCoordinator::new(loader.clone(), pool.spawner());
    for path in paths {
        coordinator.register_route(RouteDescriptor::new(*path));
    }
    coordinator
}

#[test]
fn concurrent_requests_share_one_load() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::holding());
    let c = coordinator_with(&loader, &pool, &["/courses"]);

    c.request_preload("/courses");
    c.request_preload("/courses");
    pool.run_until_stalled();
    c.request_preload("/courses");

    assert_eq!(loader.call_count("/courses"), 1);
    assert!(c.is_loading("/courses"));

    assert!(loader.resolve("/courses"));
    pool.run_until_stalled();
    c.request_preload("/courses");
    pool.run_until_stalled();
    assert_eq!(loader.call_count("/courses"), 1);
}

#[test]
fn routes_sharing_a_chunk_share_one_load() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::holding());
    let c = PreloadCoordinator::new(loader.clone(), pool.spawner());
    c.register_route(RouteDescriptor::new("/dashboard/student").with_chunk("dashboard"));
    c.register_route(RouteDescriptor::new("/dashboard/instructor").with_chunk("dashboard"));

    c.request_preload_many(["/dashboard/student", "/dashboard/instructor"]);
    pool.run_until_stalled();
    assert_eq!(loader.calls(), vec!["dashboard"]);
    assert!(c.is_loading("/dashboard/instructor"));
}

#[test]
fn success_moves_one_route_from_pending_to_preloaded() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::resolving());
    let c = coordinator_with(&loader, &pool, &["/a", "/b"]);
    let before = c.status();

    c.request_preload("/a");
    pool.run_until_stalled();

    assert!(c.is_preloaded("/a"));
    assert!(!c.is_loading("/a"));
    let after = c.status();
    assert_eq!(after.total, before.total);
    assert_eq!(after.preloaded_count, before.preloaded_count + 1);
    assert_eq!(after.pending_count, before.pending_count - 1);
}

#[test]
fn failure_reverts_to_pending_and_allows_retry() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::holding());
    let c = coordinator_with(&loader, &pool, &["/guide"]);

    c.request_preload("/guide");
    pool.run_until_stalled();
    assert_eq!(c.state("/guide"), Some(PreloadState::Loading));

    assert!(loader.reject("/guide", LoadError::Network("offline".into())));
    pool.run_until_stalled();
    assert!(!c.is_preloaded("/guide"));
    assert!(!c.is_loading("/guide"));
    assert_eq!(c.state("/guide"), Some(PreloadState::Pending));

    c.request_preload("/guide");
    assert_eq!(loader.call_count("/guide"), 2);
    assert!(loader.resolve("/guide"));
    pool.run_until_stalled();
    assert!(c.is_preloaded("/guide"));
}

#[test]
fn mixed_outcomes_settle_independently() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::resolving());
    loader.fail("/b");
    let c = coordinator_with(&loader, &pool, &["/a", "/b", "/c"]);

    c.request_preload_many(["/a", "/b"]);
    pool.run_until_stalled();

    assert_eq!(
        c.status(),
        PreloadStatus {
            total: 3,
            preloaded_count: 1,
            loading_count: 0,
            pending_count: 2,
        }
    );
}

#[test]
fn clear_preloaded_makes_routes_eligible_again() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::resolving());
    let c = coordinator_with(&loader, &pool, &["/a", "/b"]);
    c.request_preload_many(["/a", "/b"]);
    pool.run_until_stalled();
    assert_eq!(c.status().preloaded_count, 2);

    c.clear_preloaded();
    assert_eq!(c.status().preloaded_count, 0);
    assert_eq!(c.status().pending_count, 2);

    c.request_preload("/a");
    pool.run_until_stalled();
    assert_eq!(loader.call_count("/a"), 2);
    assert!(c.is_preloaded("/a"));
}

#[test]
fn clear_does_not_cancel_in_flight_loads() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::holding());
    let c = coordinator_with(&loader, &pool, &["/trust"]);

    c.request_preload("/trust");
    c.clear_preloaded();
    assert!(c.is_loading("/trust"));

    assert!(loader.resolve("/trust"));
    pool.run_until_stalled();
    assert!(c.is_preloaded("/trust"));
}

#[test]
fn counts_always_partition_total() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::holding());
    let c = coordinator_with(&loader, &pool, &["/1", "/2", "/3", "/4"]);

    let check = |c: &PreloadCoordinator| {
        let s = c.status();
        assert_eq!(s.preloaded_count + s.loading_count + s.pending_count, s.total);
    };

    check(&c);
    c.request_preload_many(["/1", "/2", "/3"]);
    check(&c);
    loader.resolve("/1");
    loader.reject("/2", LoadError::Script("syntax".into()));
    pool.run_until_stalled();
    check(&c);
    assert_eq!(c.status().loading_count, 1);
    c.clear_preloaded();
    check(&c);
}

#[test]
fn dropped_coordinator_ignores_late_completion() {
    let mut pool = LocalPool::new();
    let loader = Rc::new(MockLoader::holding());
    let c = coordinator_with(&loader, &pool, &["/a"]);
    let notified = Rc::new(Cell::new(0usize));
    let counter = notified.clone();
    let subscription = c.subscribe(move |_| counter.set(counter.get() + 1));

    c.request_preload("/a");
    assert_eq!(notified.get(), 1);
    drop(c);

    assert!(loader.resolve("/a"));
    pool.run_until_stalled();
    assert_eq!(loader.in_flight(), 0);
    assert_eq!(notified.get(), 1);
    drop(subscription);
}
