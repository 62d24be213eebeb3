//! End-to-end session behavior through the public API, with scripted
//! capabilities standing in for the camera, catalog, OCR and speech.

use shopassist::camera::capture::MockCamera;
use shopassist::camera::scanner::{DetectionEvent, MockCodeSource, Symbology};
use shopassist::catalog::MockCatalog;
use shopassist::ocr::MockRecognizer;
use shopassist::session::{Session, SessionUpdate, spawn_session};
use shopassist::speech::RecordingSpeech;
use shopassist::ShopAssistError;
use std::sync::Arc;

fn ean(code: &str) -> DetectionEvent {
    DetectionEvent::new(code, Symbology::Ean13)
}

#[tokio::test]
async fn one_lookup_per_scan_until_rearmed() {
    let catalog = Arc::new(MockCatalog::new().with_name("Acme Juice").with_name("Cola"));
    let speech = Arc::new(RecordingSpeech::new());
    let session = Session::new(
        catalog.clone(),
        Arc::new(MockRecognizer::default()),
        speech.clone(),
    );
    let (handle, task) = spawn_session(session);

    let source = MockCodeSource::new(vec![
        vec![ean("5000112637922"), ean("0000000000000")],
        vec![ean("5000112637922")],
        vec![ean("4006381333931")],
    ]);
    handle
        .forward_codes(Box::new(source))
        .await
        .unwrap()
        .unwrap();

    let (state, _) = handle.snapshot().await.unwrap();
    assert!(state.scanned);
    assert_eq!(state.product_name, "Acme Juice");
    assert_eq!(catalog.lookups(), vec!["5000112637922"]);

    handle.rescan().await.unwrap();
    let (state, _) = handle.snapshot().await.unwrap();
    assert!(!state.scanned);

    assert!(handle.submit_codes(vec![ean("4006381333931")]));
    let (state, _) = handle.snapshot().await.unwrap();
    assert_eq!(state.product_name, "Cola");

    handle.shutdown().await;
    task.await.unwrap();
    assert_eq!(
        speech.phrases(),
        vec!["Product name is Acme Juice", "Product name is Cola"]
    );
}

#[tokio::test]
async fn failed_lookup_shows_and_speaks_placeholder() {
    let catalog = Arc::new(MockCatalog::new().with_error(ShopAssistError::LookupTransport {
        message: "catalog returned HTTP status 404".to_string(),
    }));
    let speech = Arc::new(RecordingSpeech::new());
    let (tx, rx) = crossbeam_channel::unbounded();
    let session = Session::new(catalog, Arc::new(MockRecognizer::default()), speech.clone())
        .with_update_sender(tx);
    let (handle, task) = spawn_session(session);

    assert!(handle.submit_codes(vec![ean("123")]));
    let (state, _) = handle.snapshot().await.unwrap();
    assert_eq!(state.product_name, "Error fetching product");

    handle.shutdown().await;
    drop(handle);
    drop(task.await.unwrap());

    assert_eq!(speech.phrases(), vec!["Error fetching product"]);
    let updates: Vec<SessionUpdate> = rx.iter().collect();
    assert_eq!(
        updates,
        vec![
            SessionUpdate::Detected(ean("123")),
            SessionUpdate::ProductName("Error fetching product".to_string()),
        ]
    );
}

#[tokio::test]
async fn capture_flow_joins_blocks_and_tracks_photo() {
    let speech = Arc::new(RecordingSpeech::new());
    let session = Session::new(
        Arc::new(MockCatalog::new()),
        Arc::new(MockRecognizer::new(&["Milk", "2% Fat"])),
        speech.clone(),
    )
    .with_camera(Arc::new(MockCamera::new("/tmp/shelf.jpg")));
    let (handle, _task) = spawn_session(session);

    assert_eq!(handle.recognize().await.unwrap(), "Milk\n2% Fat");
    let (state, has_camera) = handle.snapshot().await.unwrap();
    assert!(has_camera);
    assert_eq!(state.ocr_text.as_deref(), Some("Milk\n2% Fat"));
    assert_eq!(
        state.image_path.as_deref(),
        Some(std::path::Path::new("/tmp/shelf.jpg"))
    );
    assert_eq!(speech.phrases(), vec!["Recognized text is: Milk\n2% Fat"]);
}

#[tokio::test]
async fn blank_photo_reports_no_text() {
    let speech = Arc::new(RecordingSpeech::new());
    let session = Session::new(
        Arc::new(MockCatalog::new()),
        Arc::new(MockRecognizer::new(&[])),
        speech.clone(),
    )
    .with_camera(Arc::new(MockCamera::new("/tmp/blank.jpg")));
    let (handle, _task) = spawn_session(session);

    assert_eq!(handle.recognize().await.unwrap(), "No text detected.");
    let (state, _) = handle.snapshot().await.unwrap();
    assert_eq!(state.ocr_text.as_deref(), Some("No text detected."));
    assert_eq!(speech.phrases(), vec!["No text detected."]);
}

#[tokio::test]
async fn capture_failure_alerts_and_keeps_previous_text() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let speech = Arc::new(RecordingSpeech::new());
    let mut session = Session::new(
        Arc::new(MockCatalog::new()),
        Arc::new(MockRecognizer::new(&["Oat Drink"])),
        speech.clone(),
    )
    .with_camera(Arc::new(MockCamera::new("/tmp/a.jpg")))
    .with_update_sender(tx);

    session.recognize_text().await.unwrap();
    session.bind_camera(Some(Arc::new(MockCamera::new("/tmp/b.jpg").with_failure())));
    assert!(session.recognize_text().await.is_err());

    assert_eq!(session.state().ocr_text.as_deref(), Some("Oat Drink"));
    assert_eq!(speech.phrases(), vec!["Recognized text is: Oat Drink"]);
    drop(session);

    let alerts: Vec<SessionUpdate> = rx
        .iter()
        .filter(|u| matches!(u, SessionUpdate::Alert { .. }))
        .collect();
    assert_eq!(
        alerts,
        vec![SessionUpdate::Alert {
            title: "Error".to_string(),
            message: "Failed to process OCR.".to_string(),
        }]
    );
}
