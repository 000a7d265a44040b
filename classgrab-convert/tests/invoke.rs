#![cfg(unix)]
//! Converter invocation against shell-script fakes. Tests are serialised: a
//! concurrent fork can keep a freshly written script open and fail exec with
//! ETXTBSY.

use classgrab_config::ConverterConfig;
use classgrab_convert::{ConvertError, Converter, StartDate};
use serial_test::serial;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Counts warning-level events.
#[derive(Clone, Default)]
struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Install an executable shell script named `name` under `dir/bin`.
fn fake_converter(dir: &Path, name: &str, body: &str) {
    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let path = bin.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn converter(tmp: &TempDir, program: &str) -> Converter {
    let cfg = ConverterConfig {
        program: program.into(),
        search_dirs: vec![PathBuf::from("bin")],
        calendar: PathBuf::from("schedule.ics"),
    };
    Converter::from_config(&cfg, Path::new("exp.html"), tmp.path(), tmp.path())
}

fn date(s: &str) -> StartDate {
    s.parse().unwrap()
}

#[tokio::test]
#[serial]
async fn success_produces_calendar() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("exp.html"), "<html></html>").unwrap();
    fake_converter(
        tmp.path(),
        "conv-ok",
        r#"test -f exp.html || exit 3
printf 'BEGIN:VCALENDAR\nX-START:%s\nEND:VCALENDAR\n' "$1" > schedule.ics"#,
    );

    let outcome = converter(&tmp, "conv-ok")
        .convert(&date("2026-03-01"))
        .await
        .unwrap();

    assert_eq!(outcome.calendar, tmp.path().join("schedule.ics"));
    let ics = std::fs::read_to_string(&outcome.calendar).unwrap();
    assert!(ics.contains("X-START:2026-03-01"));
}

#[tokio::test]
#[serial]
async fn failure_surfaces_stderr_verbatim() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("exp.html"), "<html></html>").unwrap();
    fake_converter(tmp.path(), "conv-fail", "echo '无法打开 exp.html' >&2\nexit 1");

    let err = converter(&tmp, "conv-fail")
        .convert(&date("2026-03-01"))
        .await
        .unwrap_err();

    match err {
        ConvertError::Failed { message, .. } => assert_eq!(message, "无法打开 exp.html\n"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn failure_without_stderr_falls_back_to_stdout() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("exp.html"), "<html></html>").unwrap();
    fake_converter(tmp.path(), "conv-quiet", "echo 'no courses found'\nexit 2");

    let err = converter(&tmp, "conv-quiet")
        .convert(&date("2026-03-01"))
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::Failed { ref message, .. } if message == "no courses found\n"));
}

#[tokio::test]
#[serial]
async fn zero_exit_without_calendar_is_an_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("exp.html"), "<html></html>").unwrap();
    fake_converter(tmp.path(), "conv-lazy", "exit 0");

    let err = converter(&tmp, "conv-lazy")
        .convert(&date("2026-03-01"))
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::MissingCalendar(_)));
}

#[tokio::test]
#[serial]
async fn missing_artifact_is_checked_before_launch() {
    let tmp = TempDir::new().unwrap();
    fake_converter(tmp.path(), "conv-ok", "touch launched");

    let err = converter(&tmp, "conv-ok")
        .convert(&date("2026-03-01"))
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::MissingArtifact(_)));
    assert!(!tmp.path().join("launched").exists());
}

#[tokio::test]
#[serial]
async fn unknown_program_is_not_found() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("exp.html"), "<html></html>").unwrap();

    let err = converter(&tmp, "classgrab-no-such-converter")
        .convert(&date("2026-03-01"))
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn non_sunday_start_is_passed_through_without_warning() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("exp.html"), "<html></html>").unwrap();
    fake_converter(
        tmp.path(),
        "conv-monday",
        r#"printf 'X-START:%s\n' "$1" > schedule.ics"#,
    );

    let warnings = WarnCounter::default();
    let _guard = tracing_subscriber::registry()
        .with(warnings.clone())
        .set_default();

    let outcome = converter(&tmp, "conv-monday")
        .convert(&date("2026-03-02"))
        .await
        .unwrap();

    let ics = std::fs::read_to_string(&outcome.calendar).unwrap();
    assert!(ics.contains("X-START:2026-03-02"));
    assert_eq!(warnings.0.load(Ordering::SeqCst), 0);
}
