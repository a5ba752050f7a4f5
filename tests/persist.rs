// Integration tests for overlap-list persistence and error-log export.

mod helpers;

use helpers::square;
use overlapkit::io::{load_overlaps, persist_overlaps, write_error_log};
use overlapkit::{ErrorLogEntry, ImageId, OverlapOptions, OverlapSet};

fn decomposed() -> OverlapSet {
    let mut set = OverlapSet::from_footprints(
        [
            (ImageId::from("A"), square(0.0, 0.0, 1.0, 1.0)),
            (ImageId::from("B"), square(0.5, 0.25, 1.5, 1.0 / 3.0 + 1.0)),
            (ImageId::from("C"), square(0.1, 0.1, 0.2, 0.2)),
        ],
        OverlapOptions::default(),
    );
    set.decompose().unwrap();
    set
}

#[test]
fn round_trip_through_text_file() {
    let set = decomposed();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlaps.txt");

    persist_overlaps(&set, &path, false).unwrap();
    let loaded = load_overlaps(&path, OverlapOptions::default()).unwrap();

    assert_eq!(loaded.records(), set.records());
}

#[test]
fn round_trip_through_gzip() {
    let set = decomposed();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlaps.txt.gz");

    persist_overlaps(&set, &path, false).unwrap();
    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);

    let loaded = load_overlaps(&path, OverlapOptions::default()).unwrap();
    assert_eq!(loaded.records(), set.records());
}

#[test]
fn persist_refuses_to_overwrite() {
    let set = decomposed();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlaps.txt");

    persist_overlaps(&set, &path, false).unwrap();
    assert!(persist_overlaps(&set, &path, false).is_err());
    persist_overlaps(&set, &path, true).unwrap();
}

#[test]
fn error_log_exports_as_json() {
    let mut set = OverlapSet::from_footprints(
        [
            (ImageId::from("A"), square(0.0, 0.0, 1.0, 1.0)),
            (ImageId::from("B"), square(0.0, 0.0, f64::NAN, 1.0)),
        ],
        OverlapOptions { continue_on_error: true },
    );
    set.set_filename(ImageId::from("A"), "a.cub");
    set.decompose().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.json");
    write_error_log(set.error_log(), &path, false).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let back: Vec<ErrorLogEntry> = serde_json::from_str(&text).unwrap();
    assert_eq!(back, set.error_log());

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value[0]["ids"], serde_json::json!(["A", "B"]));
    assert_eq!(value[0]["filenames"], serde_json::json!(["a.cub"]));
    assert_eq!(value[0]["record_indices"], serde_json::json!([0, 1]));
}
