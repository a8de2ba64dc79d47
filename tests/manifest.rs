//! Manifest reader integration tests.

use std::fs;

use framepack::manifest::{self, FrameSource, SourceLayout};
use framepack::{LabelDict, ManifestError};

#[test]
fn csv_manifest_with_kinetics_headers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("train.csv");
    fs::write(
        &path,
        "label,youtube_id,time_start,time_end,split\n\
         jumping,abc123,10,20,train\n\
         walking,def456,5,15,train\n",
    )
    .expect("write manifest");

    let records = manifest::read_manifest(&path).expect("read");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "abc123");
    assert_eq!(records[0].label, "jumping");
    assert_eq!(records[0].start_time, Some(10));
    assert_eq!(records[0].qualified_id(), "abc123_000010_000020");
}

#[test]
fn csv_manifest_without_markers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("train.csv");
    fs::write(&path, "id,label\nclip_a,jumping\nclip_b,walking\n").expect("write manifest");

    let records = manifest::read_manifest(&path).expect("read");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].qualified_id(), "clip_b");
    assert_eq!(records[1].start_time, None);
}

#[test]
fn json_manifest_array() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("train.json");
    fs::write(
        &path,
        r#"[
            {"id": "clip_a", "label": "jumping", "start_time": 1, "end_time": 9},
            {"id": "clip_b", "label": "walking"}
        ]"#,
    )
    .expect("write manifest");

    let records = manifest::read_manifest(&path).expect("read");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].qualified_id(), "clip_a_000001_000009");
    assert_eq!(records[1].qualified_id(), "clip_b");
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("train.yaml");
    fs::write(&path, "nope").expect("write");

    let error = manifest::read_manifest(&path).expect_err("must fail");
    assert!(matches!(error, ManifestError::UnsupportedFormat { .. }));
}

#[test]
fn entries_bind_to_the_chosen_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("train.csv");
    fs::write(&path, "id,label\nclip_a,jumping\n").expect("write manifest");
    let records = manifest::read_manifest(&path).expect("read");

    let frames = manifest::to_entries(
        &records,
        &SourceLayout::PreExtractedFrames {
            frames_root: "/data/frames".into(),
        },
    );
    assert_eq!(
        frames[0].source,
        FrameSource::PreExtractedDir("/data/frames/jumping/clip_a".into())
    );

    let videos = manifest::to_entries(
        &records,
        &SourceLayout::SourceVideos {
            videos_root: "/data/videos".into(),
        },
    );
    assert_eq!(
        videos[0].source,
        FrameSource::VideoFile("/data/videos/clip_a".into())
    );
}

#[test]
fn label_dictionary_round_trips_through_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("label2idx.json");

    let csv = dir.path().join("train.csv");
    fs::write(&csv, "id,label\na,walk\nb,jump\nc,walk\n").expect("write manifest");
    let records = manifest::read_manifest(&csv).expect("read");
    let entries = manifest::to_entries(
        &records,
        &SourceLayout::SourceVideos {
            videos_root: "/videos".into(),
        },
    );

    let dict = LabelDict::from_entries(&entries);
    dict.save(&path).expect("save");
    let loaded = LabelDict::load(&path).expect("load");

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.index_of("jump"), dict.index_of("jump"));
    assert_eq!(loaded.index_of("walk"), dict.index_of("walk"));
}
