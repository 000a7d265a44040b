mod common;

use classgrab_capture::acquire::acquire;
use classgrab_capture::inject::ControlInjector;
use classgrab_common::{BackendKind, CaptureError};
use classgrab_config::BackendConfig;
use common::*;

fn all_orderings() -> Vec<Vec<BackendKind>> {
    let [a, b, c] = BackendKind::PREFERENCE;
    vec![
        vec![a, b, c],
        vec![a, c, b],
        vec![b, a, c],
        vec![b, c, a],
        vec![c, a, b],
        vec![c, b, a],
    ]
}

#[tokio::test]
async fn first_available_backend_wins_for_every_ordering() {
    for order in all_orderings() {
        for mask in 1u8..8 {
            let mut connector = FakeConnector::default();
            for (i, kind) in BackendKind::PREFERENCE.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    connector = connector.with(*kind, FakeBrowser::default().shared());
                }
            }
            let preference: Vec<_> = order.iter().copied().map(BackendConfig::new).collect();

            let session = match acquire(&connector, &preference).await {
                Ok(session) => session,
                Err(err) => panic!("{order:?}/{mask:#05b}: {err}"),
            };

            let expected = *order
                .iter()
                .find(|k| connector.available.contains_key(*k))
                .unwrap();
            assert_eq!(session.backend(), expected, "{order:?}/{mask:#05b}");

            let tried = connector.attempts();
            assert_eq!(tried.last(), Some(&expected));
            assert_eq!(&tried[..], &order[..tried.len()], "no backend skipped");
        }
    }
}

#[tokio::test]
async fn disabled_backends_are_not_attempted() {
    let connector = FakeConnector::default()
        .with(BackendKind::Edge, FakeBrowser::default().shared())
        .with(BackendKind::Chrome, FakeBrowser::default().shared());
    let mut edge = BackendConfig::new(BackendKind::Edge);
    edge.enabled = false;
    let preference = vec![edge, BackendConfig::new(BackendKind::Chrome)];

    let session = match acquire(&connector, &preference).await {
        Ok(session) => session,
        Err(err) => panic!("{err}"),
    };
    assert_eq!(session.backend(), BackendKind::Chrome);
    assert_eq!(connector.attempts(), vec![BackendKind::Chrome]);
}

#[tokio::test]
async fn empty_preference_is_driver_unavailable() {
    let connector = FakeConnector::default();
    match acquire(&connector, &[]).await {
        Err(CaptureError::DriverUnavailable { attempts }) => assert!(attempts.is_empty()),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("nothing to acquire"),
    }
}

#[tokio::test]
async fn injecting_twice_leaves_one_control() {
    let browser = FakeBrowser::default().shared();
    let mut session = FakeSession {
        kind: BackendKind::Edge,
        browser: browser.clone(),
    };
    let injector = ControlInjector::new("Capture", "Capturing...");

    injector.inject(&mut session).await;
    injector.inject(&mut session).await;

    assert_eq!(browser.lock().unwrap().controls, 1);
}

#[tokio::test]
async fn signal_stays_set_until_navigation() {
    let browser = FakeBrowser::default().shared();
    let mut session = FakeSession {
        kind: BackendKind::Edge,
        browser: browser.clone(),
    };
    let injector = ControlInjector::new("Capture", "Capturing...");

    injector.inject(&mut session).await;
    assert!(!injector.signalled(&mut session).await);

    browser.lock().unwrap().signal = true;
    for _ in 0..3 {
        injector.inject(&mut session).await;
        assert!(injector.signalled(&mut session).await);
    }

    browser.lock().unwrap().reload();
    assert!(!injector.signalled(&mut session).await);
    injector.inject(&mut session).await;
    assert_eq!(browser.lock().unwrap().controls, 1);
}
