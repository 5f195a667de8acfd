use domain::{DeviceConfig, FieldValue, RawFrame};
use ems_device::{
    AcquisitionError, Device, DeviceError, ReplayClock, ReplayDevice, ReplayReader, ReplaySettings,
};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const STEP: Duration = Duration::from_secs(600);

fn frame(vvv: &str) -> String {
    format!("({vvv} 000 50.0 065 28.0 240.3 50.0 330.3 030 10101101)")
}

fn telemetry_file(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tempfile");
    for line in lines {
        writeln!(file, "{line}").expect("write");
    }
    file
}

fn device() -> DeviceConfig {
    DeviceConfig::new("myinv", "12345", "my_home", "COM")
}

fn vvv(record: &domain::Record) -> Option<f64> {
    record.field("VVV").and_then(FieldValue::as_f64)
}

#[tokio::test]
async fn cursor_mode_skips_alternate_frames() {
    let lines: Vec<String> = (1..=5).map(|i| frame(&format!("{i}.0"))).collect();
    let file = telemetry_file(&lines);
    let mut replay = ReplayDevice::from_file(device(), file.path(), ReplaySettings::default());

    let first = replay.get_data().await.expect("first");
    let second = replay.get_data().await.expect("second");
    let third = replay.get_data().await.expect("third");
    assert_eq!(vvv(&first), Some(1.0));
    assert_eq!(vvv(&second), Some(3.0));
    assert_eq!(vvv(&third), Some(5.0));
    assert_eq!(replay.cursor(), Some(6));

    let err = replay.get_data().await.expect_err("exhausted");
    assert!(matches!(
        err,
        DeviceError::Acquisition(AcquisitionError::EndOfSource { cursor: 6, .. })
    ));
    assert_eq!(replay.cursor(), Some(6));
}

#[tokio::test]
async fn stride_is_configurable() {
    let lines: Vec<String> = (1..=3).map(|i| frame(&format!("{i}.0"))).collect();
    let file = telemetry_file(&lines);
    let settings = ReplaySettings {
        stride: 1,
        ..ReplaySettings::default()
    };
    let mut replay = ReplayDevice::from_file(device(), file.path(), settings);

    for expected in [1.0, 2.0, 3.0] {
        let record = replay.get_data().await.expect("record");
        assert_eq!(vvv(&record), Some(expected));
    }
}

#[tokio::test]
async fn blank_lines_do_not_consume_a_slot() {
    let lines = vec![
        frame("1.0"),
        String::new(),
        "   ".to_string(),
        frame("2.0"),
        String::new(),
        frame("3.0"),
    ];
    let file = telemetry_file(&lines);
    let mut replay = ReplayDevice::from_file(device(), file.path(), ReplaySettings::default());

    assert_eq!(vvv(&replay.get_data().await.expect("first")), Some(1.0));
    assert_eq!(vvv(&replay.get_data().await.expect("second")), Some(3.0));
}

#[tokio::test]
async fn timestamps_advance_by_exactly_one_step() {
    let lines: Vec<String> = (1..=6).map(|i| frame(&format!("{i}.0"))).collect();
    let file = telemetry_file(&lines);
    let mut replay = ReplayDevice::from_file(device(), file.path(), ReplaySettings::default())
        .with_clock(ReplayClock::starting_at(0, STEP));

    let mut previous = None;
    for _ in 0..3 {
        let record = replay.get_data().await.expect("record");
        if let Some(previous) = previous {
            assert_eq!(record.ts_ms - previous, 600_000);
        }
        previous = Some(record.ts_ms);
    }
    assert_eq!(previous, Some(1_800_000));
}

#[tokio::test]
async fn missing_source_is_an_acquisition_error() {
    let mut replay = ReplayDevice::from_file(
        device(),
        "/nonexistent/telemetry.txt",
        ReplaySettings::default(),
    );
    let err = replay.get_data().await.expect_err("missing");
    assert!(matches!(err, DeviceError::Acquisition(AcquisitionError::Io(_))));
}

#[tokio::test]
async fn injected_frame_is_consumed_once() {
    let mut replay = ReplayDevice::injected(device(), ReplaySettings::default())
        .with_clock(ReplayClock::starting_at(1_000, STEP));

    replay.set_fake_frame(frame("237.0")).expect("inject");
    let record = replay.get_data().await.expect("record");
    assert_eq!(vvv(&record), Some(237.0));
    assert_eq!(record.ts_ms, 601_000);
    assert_eq!(record.measurement, "myinv");
    assert_eq!(replay.cursor(), None);

    let err = replay.get_data().await.expect_err("no frame");
    assert!(matches!(
        err,
        DeviceError::Acquisition(AcquisitionError::NoFrame(_))
    ));
}

#[tokio::test]
async fn inject_through_device_trait() {
    let mut replay: Box<dyn Device> =
        Box::new(ReplayDevice::injected(device(), ReplaySettings::default()));
    replay
        .inject_frame(RawFrame::from(frame("230.5")))
        .expect("inject");
    let raw = replay.acquire_raw().await.expect("raw");
    assert_eq!(raw.as_str(), frame("230.5"));
}

#[tokio::test]
async fn malformed_frame_keeps_raw_text() {
    let mut replay = ReplayDevice::injected(device(), ReplaySettings::default());
    replay.set_fake_frame("237.0 000 50.0").expect("inject");
    let err = replay.get_data().await.expect_err("malformed");
    match err {
        DeviceError::MalformedFrame { device, frame, .. } => {
            assert_eq!(device, "myinv");
            assert_eq!(frame, "237.0 000 50.0");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn reader_yields_trimmed_non_blank_lines() {
    let lines = vec![String::new(), "  a b  ".to_string(), String::new(), "c".to_string()];
    let file = telemetry_file(&lines);
    let mut reader = ReplayReader::open(file.path()).await.expect("open");
    let mut frames = Vec::new();
    while let Some(frame) = reader.next_frame().await.expect("read") {
        frames.push(frame.into_inner());
    }
    assert_eq!(frames, vec!["a b".to_string(), "c".to_string()]);
}
