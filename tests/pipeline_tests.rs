//! End-to-end tests for the file -> encode -> display cycle

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use mtb_display::{
    hal::{HeadlessRenderer, MockDwell, MockEvent, MockRenderer, SleepDwell},
    CycleOutcome, DisplayConfig, DisplayController, EncodeError, EncodeFailurePolicy, FileSource,
    Payload, PayloadOrigin, Renderer, SourceError,
};

fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("mtb-pipeline-{}-{}", std::process::id(), name));
    fs::write(&path, contents).unwrap();
    path
}

fn incompressible(len: usize) -> Vec<u8> {
    let mut x: u64 = 0x2545_F491_4F6C_DD1D;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x >> 24) as u8
        })
        .collect()
}

fn mock_controller(config: &DisplayConfig) -> DisplayController<MockRenderer, MockDwell> {
    let renderer = MockRenderer::new();
    let dwell = MockDwell::sharing(&renderer);
    let mut controller = DisplayController::new(renderer, dwell, config);
    controller.init().unwrap();
    controller
}

// ============================================================================
// File payloads
// ============================================================================

#[test]
fn ticket_file_is_shown_centered_then_cleared() {
    let path = temp_file("ticket", b"TICKET-0001");
    let payloads: Vec<Payload> = FileSource::new([&path])
        .collect::<Result<_, _>>()
        .unwrap();

    let config = DisplayConfig::default()
        .with_delay_secs(0.1)
        .with_module_size(2);
    let mut controller = mock_controller(&config);

    let stats = controller.process_all(&payloads).unwrap();
    assert_eq!(stats.displayed, 1);

    let events = controller.renderer().events();
    let MockEvent::Show {
        origin,
        width,
        height,
    } = events[1].clone()
    else {
        panic!("expected show, got {:?}", events[1]);
    };
    assert!((origin.x - (480 - (origin.x + width as i32))).abs() <= 1);
    assert!((origin.y - (320 - (origin.y + height as i32))).abs() <= 1);
    assert_eq!(events[2], MockEvent::Dwell(Duration::from_secs_f32(0.1)));
    assert_eq!(events[3], MockEvent::Clear);
    assert!(controller.renderer().surface().is_blank());

    fs::remove_file(path).unwrap();
}

#[test]
fn files_are_shown_in_order() {
    let a = temp_file("order-a", b"first");
    let b = temp_file("order-b", b"second");
    let payloads: Vec<Payload> = FileSource::new([&a, &b])
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(payloads[0].origin(), &PayloadOrigin::File(a.clone()));
    assert_eq!(payloads[1].origin(), &PayloadOrigin::File(b.clone()));

    let mut controller = mock_controller(&DisplayConfig::default());
    controller.process_all(&payloads).unwrap();
    assert_eq!(controller.renderer().show_count(), 2);
    assert_eq!(controller.renderer().clear_count(), 2);

    fs::remove_file(a).unwrap();
    fs::remove_file(b).unwrap();
}

#[test]
fn missing_file_fails_before_any_cycle() {
    let good = temp_file("missing-good", b"ok");
    let missing = std::env::temp_dir().join("mtb-pipeline-does-not-exist");

    let result: Result<Vec<Payload>, SourceError> = FileSource::new([&good, &missing]).collect();
    assert!(matches!(result, Err(SourceError::Io { .. })));

    fs::remove_file(good).unwrap();
}

#[test]
fn empty_file_is_rejected() {
    let path = temp_file("empty", b"");
    let result: Result<Vec<Payload>, SourceError> = FileSource::new([&path]).collect();
    assert!(matches!(result, Err(SourceError::Empty(_))));
    fs::remove_file(path).unwrap();
}

// ============================================================================
// Encode failures
// ============================================================================

#[test]
fn oversized_payload_is_skipped_and_display_continues() {
    let origin = || PayloadOrigin::Topic("service/v1/Validate/reader".into());
    let payloads = [
        Payload::new(origin(), incompressible(50 * 1024)).unwrap(),
        Payload::new(origin(), b"next".to_vec()).unwrap(),
    ];

    let mut controller = mock_controller(&DisplayConfig::default());
    let first = controller.process(&payloads[0]).unwrap();
    assert!(matches!(
        first,
        CycleOutcome::Skipped(EncodeError::Capacity { .. })
    ));
    assert!(controller.renderer().surface().is_blank());

    let second = controller.process(&payloads[1]).unwrap();
    assert!(matches!(second, CycleOutcome::Displayed(_)));

    let kinds: Vec<_> = controller
        .renderer()
        .events()
        .iter()
        .map(MockEvent::kind)
        .collect();
    assert_eq!(kinds, vec!["init", "show", "dwell", "clear"]);
}

#[test]
fn strict_mode_stops_on_oversized_payload() {
    let config = DisplayConfig::default().with_encode_failure(EncodeFailurePolicy::Abort);
    let mut controller = mock_controller(&config);
    let payload = Payload::new(PayloadOrigin::Topic("t".into()), incompressible(50 * 1024)).unwrap();

    assert!(controller.process(&payload).is_err());
    assert_eq!(controller.renderer().show_count(), 0);
}

// ============================================================================
// Real dwell
// ============================================================================

#[test]
fn sleep_dwell_holds_symbol_for_delay() {
    let config = DisplayConfig::default().with_delay_secs(0.1);
    let mut controller = DisplayController::new(HeadlessRenderer::new(), SleepDwell, &config);
    controller.init().unwrap();

    let payload = Payload::new(PayloadOrigin::Topic("t".into()), b"TICKET-0001".to_vec()).unwrap();
    let start = Instant::now();
    controller.process(&payload).unwrap();

    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(controller.renderer().surface().is_blank());
}

#[test]
fn boxed_renderer_runs_cycle() {
    let renderer: Box<dyn Renderer + Send> = Box::new(HeadlessRenderer::new());
    let mut controller =
        DisplayController::new(renderer, MockDwell::new(), &DisplayConfig::default());
    controller.init().unwrap();

    let payload = Payload::new(PayloadOrigin::Topic("t".into()), b"boxed".to_vec()).unwrap();
    assert!(matches!(
        controller.process(&payload).unwrap(),
        CycleOutcome::Displayed(_)
    ));
    assert_eq!(controller.dwell().waited, vec![Duration::from_secs(1)]);
}
