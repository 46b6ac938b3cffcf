use crate::*;

use routesync_core::{sync_once, update, Decision, Device, Tools};

fn tools() -> Tools {
    Tools::default()
}

/// Peer X owns next-hop 10.0.1.5, so 10.0.2.0/24 is added to X.
#[tokio::test]
async fn test_promote_onto_nexthop_owner() {
    let dev = FakeDevice::new("wg0")
        .with_peer("X", "10.0.1.0/24")
        .with_peer("Y", "10.0.8.0/24")
        .with_routes("10.0.2.0/24 via 10.0.1.5 proto bird metric 32");

    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();
    let report = sync_once(&mut device, &dev, &tools(), None).await.unwrap();

    assert_eq!((report.demoted, report.promoted), (0, 1));
    assert_eq!(dev.allowed_ips("X").as_deref(), Some("10.0.1.0/24,10.0.2.0/24"));
    assert_eq!(dev.allowed_ips("Y").as_deref(), Some("10.0.8.0/24"));
}

/// The destination moves from stale holder X to owner Y.
#[tokio::test]
async fn test_move_from_stale_holder_to_owner() {
    let dev = FakeDevice::new("wg0")
        .with_peer("X", "10.0.2.0/24,10.0.1.0/24")
        .with_peer("Y", "10.0.9.0/24")
        .with_routes("10.0.2.0/24 via 10.0.9.1 proto bird");

    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();
    let report = sync_once(&mut device, &dev, &tools(), None).await.unwrap();

    assert_eq!((report.demoted, report.promoted), (1, 1));
    assert_eq!(
        *dev.sets.borrow(),
        vec!["X 10.0.1.0/24", "Y 10.0.9.0/24,10.0.2.0/24"]
    );
    assert_eq!(dev.allowed_ips("X").as_deref(), Some("10.0.1.0/24"));
    assert_eq!(dev.allowed_ips("Y").as_deref(), Some("10.0.9.0/24,10.0.2.0/24"));
}

/// Nobody owns the next-hop: nothing is written.
#[tokio::test]
async fn test_unowned_nexthop_is_left_alone() {
    let dev = FakeDevice::new("wg0")
        .with_peer("X", "10.0.1.0/24")
        .with_routes("10.0.2.0/24 via 192.168.50.1 proto bird");

    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();
    let report = sync_once(&mut device, &dev, &tools(), None).await.unwrap();

    assert!(!report.changed());
    assert!(dev.sets.borrow().is_empty());
}

/// Running again over the device we just updated produces no writes.
#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let dev = FakeDevice::new("wg0")
        .with_peer("X", "10.0.2.0/24,10.0.1.0/24")
        .with_peer("Y", "10.0.9.0/24")
        .with_routes(
            "10.0.2.0/24 via 10.0.9.1 proto bird\n\
             10.0.3.0/24 via 10.0.1.7 proto bird\n\
             fd00:2::/64 via 10.0.1.7 proto bird",
        );

    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();
    let first = sync_once(&mut device, &dev, &tools(), None).await.unwrap();
    assert!(first.changed());
    let writes = dev.sets.borrow().len();

    let second = sync_once(&mut device, &dev, &tools(), None).await.unwrap();
    assert!(!second.changed());
    assert_eq!(dev.sets.borrow().len(), writes);
}

/// External edits are picked up by the next pass's peer refresh.
#[tokio::test]
async fn test_external_change_is_healed() {
    let dev = FakeDevice::new("wg0")
        .with_peer("X", "10.0.1.0/24")
        .with_routes("10.0.2.0/24 via 10.0.1.5");

    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();
    sync_once(&mut device, &dev, &tools(), None).await.unwrap();
    assert_eq!(dev.allowed_ips("X").as_deref(), Some("10.0.1.0/24,10.0.2.0/24"));

    // Someone strips the route by hand.
    dev.peers
        .borrow_mut()
        .insert("X".to_string(), "10.0.1.0/24".to_string());

    let report = sync_once(&mut device, &dev, &tools(), None).await.unwrap();
    assert_eq!(report.promoted, 1);
    assert_eq!(dev.allowed_ips("X").as_deref(), Some("10.0.1.0/24,10.0.2.0/24"));
}

/// A peer removed from the device disappears from the store; an update
/// still aimed at it fails with CommandFailure instead of panicking.
#[tokio::test]
async fn test_removed_peer_update_is_command_failure() {
    let dev = FakeDevice::new("wg0")
        .with_peer("X", "10.0.1.0/24")
        .with_peer("Y", "10.0.9.0/24");

    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();
    assert!(device.peer("Y").is_some());

    dev.remove_peer("Y");
    device.refresh_peers(&dev, &tools()).await.unwrap();
    assert!(device.peer("Y").is_none());

    let stale = Decision::Promote {
        peer: "Y".to_string(),
        range: "10.0.2.0/24".parse().unwrap(),
    };
    let err = update::apply(&mut device, &dev, &tools(), &stale)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommandFailure { .. }));
    assert!(dev.sets.borrow().is_empty());
}

/// A failed route query fails the pass; the next pass recovers.
#[tokio::test]
async fn test_route_query_failure_then_recovery() {
    let dev = FakeDevice::new("wg0")
        .with_peer("X", "10.0.1.0/24")
        .with_routes("10.0.2.0/24 via 10.0.1.5");
    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();

    *dev.fail_routes.borrow_mut() = Some("RTNETLINK answers: Operation not permitted".into());
    assert!(sync_once(&mut device, &dev, &tools(), None).await.is_err());
    assert!(dev.sets.borrow().is_empty());

    *dev.fail_routes.borrow_mut() = None;
    let report = sync_once(&mut device, &dev, &tools(), None).await.unwrap();
    assert_eq!(report.promoted, 1);
}

/// A failed `wg set` is counted, the pass still completes, and the next
/// pass retries once the device accepts writes again.
#[tokio::test]
async fn test_failed_update_is_retried_next_pass() {
    let dev = FakeDevice::new("wg0")
        .with_peer("X", "10.0.1.0/24")
        .with_routes("10.0.2.0/24 via 10.0.1.5\n10.0.3.0/24 via 10.0.1.6");
    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();

    *dev.fail_sets.borrow_mut() = Some("Invalid argument".into());
    let report = sync_once(&mut device, &dev, &tools(), None).await.unwrap();
    assert_eq!(report.failures, 2);
    assert_eq!(dev.allowed_ips("X").as_deref(), Some("10.0.1.0/24"));

    *dev.fail_sets.borrow_mut() = None;
    let report = sync_once(&mut device, &dev, &tools(), None).await.unwrap();
    assert_eq!(report.promoted, 2);
    assert_eq!(
        dev.allowed_ips("X").as_deref(),
        Some("10.0.1.0/24,10.0.2.0/24,10.0.3.0/24")
    );
}

/// Overlapping owners resolve to the lowest key and are reported.
#[tokio::test]
async fn test_ambiguous_owner_is_deterministic() {
    let dev = FakeDevice::new("wg0")
        .with_peer("B", "10.0.0.0/16")
        .with_peer("A", "10.0.1.0/24")
        .with_routes("10.0.2.0/24 via 10.0.1.5");
    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();

    let report = sync_once(&mut device, &dev, &tools(), None).await.unwrap();
    assert_eq!(report.inconsistencies, 1);
    assert_eq!(*dev.sets.borrow(), vec!["A 10.0.1.0/24,10.0.2.0/24"]);
}

/// The proto filter is passed through to the route query.
#[tokio::test]
async fn test_proto_filter_reaches_route_query() {
    let dev = FakeDevice::new("wg0").with_peer("X", "10.0.1.0/24");
    let mut device = Device::init("wg0", &dev, &tools()).await.unwrap();

    let seen = RefCell::new(Vec::new());
    struct Recording<'a> {
        inner: &'a FakeDevice,
        seen: &'a RefCell<Vec<String>>,
    }
    impl CommandRunner for Recording<'_> {
        async fn run(&self, argv: &[String]) -> routesync_core::Result<String> {
            self.seen.borrow_mut().push(argv.join(" "));
            self.inner.run(argv).await
        }
    }

    let runner = Recording { inner: &dev, seen: &seen };
    sync_once(&mut device, &runner, &tools(), Some("bird")).await.unwrap();
    assert_eq!(
        seen.borrow()[0],
        "ip -o route show table all dev wg0 proto bird"
    );
}
