//! Binary packager integration tests.
//!
//! These exercise the on-disk laws: records tile the data file exactly,
//! reading back through the meta file reproduces the packaged frames
//! byte-for-byte, conflicts leave existing files untouched, and repeated
//! overwrite builds are byte-identical.

use std::{
    fs,
    path::{Path, PathBuf},
};

use framepack::{
    Chunk, ChunkPackager, ChunkReader, Entry, FrameResolver, FrameSource, LabelDict,
    PackagingError, data_file_path, meta_file_path, resize_by_short_edge,
};

const SHORT_EDGE: u32 = 24;

fn write_frame(path: &Path, width: u32, height: u32, shade: u8) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([shade, (x % 256) as u8, (y % 256) as u8])
    });
    img.save(path).expect("write frame fixture");
}

/// Create a frame directory with `frames` images and return its entry.
fn make_entry(root: &Path, id: &str, label: &str, frames: usize) -> Entry {
    let dir = root.join(label).join(id);
    fs::create_dir_all(&dir).expect("mkdir");
    for index in 0..frames {
        write_frame(&dir.join(format!("{index:02}.png")), 32, 20, index as u8);
    }
    Entry {
        id: id.to_string(),
        label: label.to_string(),
        source: FrameSource::PreExtractedDir(dir),
    }
}

/// The bytes the packager is expected to store for an entry's frames.
fn expected_frames(entry: &Entry) -> Vec<Vec<u8>> {
    let FrameSource::PreExtractedDir(dir) = &entry.source else {
        panic!("fixture entries use frame dirs");
    };
    let mut paths: Vec<PathBuf> = dir
        .read_dir()
        .expect("read_dir")
        .map(|e| e.expect("entry").path())
        .collect();
    paths.sort();
    paths
        .iter()
        .map(|path| {
            let bytes = fs::read(path).expect("read frame");
            resize_by_short_edge(&bytes, SHORT_EDGE).expect("resize")
        })
        .collect()
}

#[test]
fn records_tile_the_data_file_exactly() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let chunk = Chunk {
        chunk_id: 0,
        entries: vec![
            make_entry(dataset.path(), "clip_a", "jump", 3),
            make_entry(dataset.path(), "clip_b", "walk", 2),
        ],
    };
    let resolver = FrameResolver::new(SHORT_EDGE);
    let summary = ChunkPackager::new(&resolver)
        .package(&chunk, out.path())
        .expect("package");
    assert_eq!(summary.records_written, 5);
    assert!(summary.entries_skipped.is_empty());

    let reader = ChunkReader::open(out.path(), 0).expect("open");
    let records = reader.records();
    assert_eq!(records.len(), 5);

    let mut expected_offset = 0u64;
    for record in records {
        assert_eq!(record.byte_offset, expected_offset, "no gaps, no overlaps");
        expected_offset += record.byte_length as u64;
    }
    let data_size = fs::metadata(data_file_path(out.path(), 0))
        .expect("stat")
        .len();
    assert_eq!(expected_offset, data_size, "records cover the whole file");
}

#[test]
fn read_back_reproduces_packaged_frames() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let entry = make_entry(dataset.path(), "clip_a", "jump", 3);
    let expected = expected_frames(&entry);
    let chunk = Chunk {
        chunk_id: 7,
        entries: vec![entry],
    };

    let resolver = FrameResolver::new(SHORT_EDGE);
    ChunkPackager::new(&resolver)
        .package(&chunk, out.path())
        .expect("package");

    let mut reader = ChunkReader::open(out.path(), 7).expect("open");
    assert_eq!(reader.len(), 3);
    for (index, expected_bytes) in expected.iter().enumerate() {
        let stored = reader.frame(index).expect("frame");
        assert_eq!(&stored, expected_bytes, "frame {index} round-trips");
    }

    let sum: u64 = reader
        .records()
        .iter()
        .map(|record| record.byte_length as u64)
        .sum();
    let total: usize = expected.iter().map(Vec::len).sum();
    assert_eq!(sum, total as u64);
}

#[test]
fn labels_index_through_the_dictionary() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let entries = vec![
        make_entry(dataset.path(), "clip_a", "walk", 1),
        make_entry(dataset.path(), "clip_b", "jump", 1),
    ];
    let dict = LabelDict::from_entries(&entries);
    let chunk = Chunk {
        chunk_id: 0,
        entries,
    };

    let resolver = FrameResolver::new(SHORT_EDGE);
    ChunkPackager::new(&resolver)
        .with_labels(&dict)
        .package(&chunk, out.path())
        .expect("package");

    let reader = ChunkReader::open(out.path(), 0).expect("open");
    assert_eq!(reader.records()[0].label_index, dict.index_of("walk").unwrap());
    assert_eq!(reader.records()[1].label_index, dict.index_of("jump").unwrap());
}

#[test]
fn unindexed_packaging_writes_minus_one() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let chunk = Chunk {
        chunk_id: 0,
        entries: vec![make_entry(dataset.path(), "clip_a", "jump", 1)],
    };
    let resolver = FrameResolver::new(SHORT_EDGE);
    ChunkPackager::new(&resolver)
        .package(&chunk, out.path())
        .expect("package");

    let reader = ChunkReader::open(out.path(), 0).expect("open");
    assert_eq!(reader.records()[0].label_index, framepack::UNINDEXED_LABEL);
}

#[test]
fn bad_entry_is_skipped_and_chunk_continues() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let missing = Entry {
        id: "ghost".to_string(),
        label: "jump".to_string(),
        source: FrameSource::PreExtractedDir(dataset.path().join("jump").join("ghost")),
    };
    let chunk = Chunk {
        chunk_id: 0,
        entries: vec![
            make_entry(dataset.path(), "clip_a", "jump", 2),
            missing,
            make_entry(dataset.path(), "clip_b", "jump", 1),
        ],
    };

    let resolver = FrameResolver::new(SHORT_EDGE);
    let summary = ChunkPackager::new(&resolver)
        .package(&chunk, out.path())
        .expect("package");

    assert_eq!(summary.records_written, 3, "good entries still packaged");
    assert_eq!(summary.entries_skipped.len(), 1);
    let (skipped_id, reason) = &summary.entries_skipped[0];
    assert_eq!(skipped_id, "ghost");
    assert!(
        reason.contains("no frames and no source video"),
        "reason should explain the skip: {reason}",
    );
}

#[test]
fn entry_grouping_is_recoverable_from_contiguous_runs() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let first = make_entry(dataset.path(), "clip_a", "jump", 2);
    let second = make_entry(dataset.path(), "clip_b", "walk", 3);
    let expected_second = expected_frames(&second);
    let chunk = Chunk {
        chunk_id: 0,
        entries: vec![first, second],
    };

    let resolver = FrameResolver::new(SHORT_EDGE);
    ChunkPackager::new(&resolver)
        .package(&chunk, out.path())
        .expect("package");

    let mut reader = ChunkReader::open(out.path(), 0).expect("open");
    let frames = reader.entry_frames("clip_b").expect("entry frames");
    assert_eq!(frames, expected_second);
    assert!(reader.entry_frames("absent").expect("lookup").is_empty());
}

#[test]
fn path_conflict_leaves_existing_files_untouched() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let data_path = data_file_path(out.path(), 0);
    let meta_path = meta_file_path(out.path(), 0);
    fs::write(&data_path, b"sentinel-data").expect("write");
    fs::write(&meta_path, b"sentinel-meta").expect("write");

    let chunk = Chunk {
        chunk_id: 0,
        entries: vec![make_entry(dataset.path(), "clip_a", "jump", 1)],
    };
    let resolver = FrameResolver::new(SHORT_EDGE);
    let error = ChunkPackager::new(&resolver)
        .package(&chunk, out.path())
        .expect_err("conflict expected");
    assert!(matches!(error, PackagingError::PathConflict { .. }));

    assert_eq!(fs::read(&data_path).expect("read"), b"sentinel-data");
    assert_eq!(fs::read(&meta_path).expect("read"), b"sentinel-meta");
}

#[test]
fn conflict_is_detected_when_only_the_meta_file_exists() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let meta_path = meta_file_path(out.path(), 0);
    fs::write(&meta_path, b"sentinel-meta").expect("write");

    let chunk = Chunk {
        chunk_id: 0,
        entries: vec![make_entry(dataset.path(), "clip_a", "jump", 1)],
    };
    let resolver = FrameResolver::new(SHORT_EDGE);
    let error = ChunkPackager::new(&resolver)
        .package(&chunk, out.path())
        .expect_err("conflict expected");
    assert!(matches!(error, PackagingError::PathConflict { .. }));

    // The data file must not have been created before the check fired.
    assert!(!data_file_path(out.path(), 0).exists());
    assert_eq!(fs::read(&meta_path).expect("read"), b"sentinel-meta");
}

#[test]
fn overwrite_rebuild_is_byte_identical() {
    let dataset = tempfile::tempdir().expect("tempdir");
    let out = tempfile::tempdir().expect("tempdir");

    let chunk = Chunk {
        chunk_id: 0,
        entries: vec![
            make_entry(dataset.path(), "clip_a", "jump", 2),
            make_entry(dataset.path(), "clip_b", "walk", 2),
        ],
    };
    let resolver = FrameResolver::new(SHORT_EDGE);

    ChunkPackager::new(&resolver)
        .package(&chunk, out.path())
        .expect("first build");
    let first_data = fs::read(data_file_path(out.path(), 0)).expect("read");
    let first_meta = fs::read(meta_file_path(out.path(), 0)).expect("read");

    ChunkPackager::new(&resolver)
        .with_overwrite(true)
        .package(&chunk, out.path())
        .expect("rebuild");
    let second_data = fs::read(data_file_path(out.path(), 0)).expect("read");
    let second_meta = fs::read(meta_file_path(out.path(), 0)).expect("read");

    assert_eq!(first_data, second_data);
    assert_eq!(first_meta, second_meta);
}
