//! Binary packaging of chunks.
//!
//! Each chunk is serialized into an output pair: `data{chunk_id}.bin`
//! holds the raw frame bytes back-to-back with no separators, and
//! `meta{chunk_id}.bin` holds one fixed-shape [`BinaryRecord`] per stored
//! frame. Frame boundaries are recoverable only through the meta file;
//! records appear in entry arrival order, then frame order within the
//! entry, and tile the data file exactly.
//!
//! Record wire format (little-endian, no padding):
//!
//! ```text
//! label_index : i32
//! id_len      : u16
//! entry_id    : id_len bytes of UTF-8
//! byte_offset : u64
//! byte_length : u32
//! ```
//!
//! [`ChunkWriter`] owns the open/append/close lifecycle of one pair;
//! [`ChunkPackager`] drives the per-entry resolve-and-write loop;
//! [`ChunkReader`] is the read-back side used for inspection and
//! verification.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use crate::error::PackagingError;
use crate::labels::{LabelDict, UNINDEXED_LABEL};
use crate::plan::Chunk;
use crate::resolve::FrameResolver;

/// Path of a chunk's data file under `output_dir`.
pub fn data_file_path(output_dir: &Path, chunk_id: usize) -> PathBuf {
    output_dir.join(format!("data{chunk_id}.bin"))
}

/// Path of a chunk's meta file under `output_dir`.
pub fn meta_file_path(output_dir: &Path, chunk_id: usize) -> PathBuf {
    output_dir.join(format!("meta{chunk_id}.bin"))
}

/// One index record describing one stored frame.
///
/// `(byte_offset, byte_length)` is a contiguous slice of the co-located
/// data file; slicing the data file at every record reproduces the frames
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    /// Index of the entry's label in the label dictionary, or
    /// [`UNINDEXED_LABEL`] when packaging ran without one.
    pub label_index: i32,
    /// Id of the entry this frame belongs to. Records of one entry are
    /// consecutive and in frame order.
    pub entry_id: String,
    /// Offset of the frame's first byte in the data file.
    pub byte_offset: u64,
    /// Length of the frame in bytes.
    pub byte_length: u32,
}

impl BinaryRecord {
    /// Serialize this record onto `writer`.
    ///
    /// The entry id must fit a `u16` length prefix; the packager enforces
    /// that before any bytes are written.
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        debug_assert!(self.entry_id.len() <= u16::MAX as usize);
        writer.write_all(&self.label_index.to_le_bytes())?;
        writer.write_all(&(self.entry_id.len() as u16).to_le_bytes())?;
        writer.write_all(self.entry_id.as_bytes())?;
        writer.write_all(&self.byte_offset.to_le_bytes())?;
        writer.write_all(&self.byte_length.to_le_bytes())?;
        Ok(())
    }

    /// Read one record, or `None` at a clean end of stream.
    ///
    /// End-of-stream in the middle of a record is an
    /// [`io::ErrorKind::UnexpectedEof`] error.
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut label_buf = [0u8; 4];
        if !fill_or_eof(reader, &mut label_buf)? {
            return Ok(None);
        }
        let label_index = i32::from_le_bytes(label_buf);

        let mut len_buf = [0u8; 2];
        reader.read_exact(&mut len_buf)?;
        let id_len = u16::from_le_bytes(len_buf) as usize;

        let mut id_buf = vec![0u8; id_len];
        reader.read_exact(&mut id_buf)?;
        let entry_id = String::from_utf8(id_buf)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;

        let mut offset_buf = [0u8; 8];
        reader.read_exact(&mut offset_buf)?;
        let mut length_buf = [0u8; 4];
        reader.read_exact(&mut length_buf)?;

        Ok(Some(Self {
            label_index,
            entry_id,
            byte_offset: u64::from_le_bytes(offset_buf),
            byte_length: u32::from_le_bytes(length_buf),
        }))
    }
}

/// Fill `buf` completely, or return `false` if the stream ended before the
/// first byte.
fn fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "record truncated",
                ));
            }
            Ok(n) => filled += n,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(true)
}

/// Append-only writer for one chunk's `data`/`meta` pair.
///
/// Both files are buffered; a frame's bytes always go to the data file
/// before the record describing them goes to the meta file, so the meta
/// file never points at bytes that failed to write. The files are closed
/// on drop regardless of the exit path; call [`finish`](ChunkWriter::finish)
/// on the success path to flush and surface any deferred I/O error.
pub struct ChunkWriter {
    chunk_id: usize,
    data: BufWriter<File>,
    meta: BufWriter<File>,
    offset: u64,
    records_written: u64,
}

impl ChunkWriter {
    /// Create the output pair for `chunk_id` under `output_dir`.
    ///
    /// With `overwrite_existing` unset, a pre-existing data *or* meta file
    /// is a [`PackagingError::PathConflict`], raised before either file is
    /// created — existing files are left untouched.
    pub fn create(
        output_dir: &Path,
        chunk_id: usize,
        overwrite_existing: bool,
    ) -> Result<Self, PackagingError> {
        let data_path = data_file_path(output_dir, chunk_id);
        let meta_path = meta_file_path(output_dir, chunk_id);

        if !overwrite_existing {
            for path in [&data_path, &meta_path] {
                if path.exists() {
                    return Err(PackagingError::PathConflict { path: path.clone() });
                }
            }
        }

        let data = open_output(&data_path, overwrite_existing)?;
        let meta = open_output(&meta_path, overwrite_existing)?;

        Ok(Self {
            chunk_id,
            data: BufWriter::new(data),
            meta: BufWriter::new(meta),
            offset: 0,
            records_written: 0,
        })
    }

    /// The chunk this writer belongs to.
    pub fn chunk_id(&self) -> usize {
        self.chunk_id
    }

    /// Records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Append one frame: bytes to the data file, then its record to the
    /// meta file.
    pub fn write_frame(
        &mut self,
        label_index: i32,
        entry_id: &str,
        frame: &[u8],
    ) -> Result<(), PackagingError> {
        self.data.write_all(frame)?;

        let record = BinaryRecord {
            label_index,
            entry_id: entry_id.to_string(),
            byte_offset: self.offset,
            byte_length: frame.len() as u32,
        };
        record.write_to(&mut self.meta)?;

        self.offset += frame.len() as u64;
        self.records_written += 1;
        Ok(())
    }

    /// Flush both files (data first, then meta) and return the record
    /// count.
    pub fn finish(mut self) -> Result<u64, PackagingError> {
        self.data.flush()?;
        self.data.get_ref().sync_all()?;
        self.meta.flush()?;
        self.meta.get_ref().sync_all()?;
        Ok(self.records_written)
    }
}

fn open_output(path: &Path, overwrite_existing: bool) -> Result<File, PackagingError> {
    let result = if overwrite_existing {
        File::create(path)
    } else {
        OpenOptions::new().write(true).create_new(true).open(path)
    };
    result.map_err(|source| {
        if source.kind() == io::ErrorKind::AlreadyExists {
            PackagingError::PathConflict {
                path: path.to_path_buf(),
            }
        } else {
            PackagingError::Create {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Summary of one successfully packaged chunk.
#[derive(Debug, Clone)]
pub struct PackagingSummary {
    /// The chunk this summary describes.
    pub chunk_id: usize,
    /// Records (frames) written to the output pair.
    pub records_written: u64,
    /// Entries skipped with the reason each was skipped, in arrival order.
    pub entries_skipped: Vec<(String, String)>,
}

/// Packages chunks into output pairs.
///
/// Borrows its collaborators: the resolver (shared by all workers) and the
/// optional label dictionary. Entry-level failures are recorded in the
/// summary and never abort the chunk; only output-file I/O failures do.
pub struct ChunkPackager<'a> {
    resolver: &'a FrameResolver,
    labels: Option<&'a LabelDict>,
    overwrite_existing: bool,
}

impl<'a> ChunkPackager<'a> {
    /// Create a packager around `resolver` with no label dictionary and
    /// no overwriting.
    pub fn new(resolver: &'a FrameResolver) -> Self {
        Self {
            resolver,
            labels: None,
            overwrite_existing: false,
        }
    }

    /// Map labels through `labels` instead of writing [`UNINDEXED_LABEL`].
    #[must_use]
    pub fn with_labels(mut self, labels: &'a LabelDict) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Replace pre-existing output files instead of failing on them.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite_existing: bool) -> Self {
        self.overwrite_existing = overwrite_existing;
        self
    }

    /// Package one chunk into `output_dir`.
    ///
    /// # Errors
    ///
    /// Only chunk-fatal conditions ([`PackagingError`]) surface here:
    /// conflicts, create failures, and write/flush failures. A failed
    /// entry is a line in the summary, not an error.
    pub fn package(
        &self,
        chunk: &Chunk,
        output_dir: &Path,
    ) -> Result<PackagingSummary, PackagingError> {
        let mut writer = ChunkWriter::create(output_dir, chunk.chunk_id, self.overwrite_existing)?;
        let mut entries_skipped: Vec<(String, String)> = Vec::new();

        for entry in &chunk.entries {
            let label_index = match self.labels {
                Some(dict) => match dict.index_of(&entry.label) {
                    Some(index) => index,
                    None => {
                        // Normally caught at plan level; packaging a chunk
                        // directly can still hit it.
                        entries_skipped.push((
                            entry.id.clone(),
                            format!("label {:?} not in dictionary", entry.label),
                        ));
                        continue;
                    }
                },
                None => UNINDEXED_LABEL,
            };

            if entry.id.len() > u16::MAX as usize {
                entries_skipped.push((
                    entry.id.clone(),
                    format!("entry id is {} bytes, limit is {}", entry.id.len(), u16::MAX),
                ));
                continue;
            }

            let frames = match self.resolver.resolve(entry) {
                Ok(frames) => frames,
                Err(error) => {
                    log::warn!("Chunk {}: skipping entry {}: {error}", chunk.chunk_id, entry.id);
                    entries_skipped.push((entry.id.clone(), error.to_string()));
                    continue;
                }
            };

            for frame in frames {
                match frame {
                    Ok(bytes) => writer.write_frame(label_index, &entry.id, &bytes)?,
                    Err(error) => {
                        // Records already written for this entry describe
                        // real bytes and stay; the entry is still reported.
                        log::warn!(
                            "Chunk {}: skipping rest of entry {}: {error}",
                            chunk.chunk_id,
                            entry.id
                        );
                        entries_skipped.push((entry.id.clone(), error.to_string()));
                        break;
                    }
                }
            }
        }

        let records_written = writer.finish()?;
        log::debug!(
            "Chunk {}: {records_written} records written, {} entries skipped",
            chunk.chunk_id,
            entries_skipped.len()
        );

        Ok(PackagingSummary {
            chunk_id: chunk.chunk_id,
            records_written,
            entries_skipped,
        })
    }
}

/// Read-back side of a chunk's output pair.
///
/// Parses the meta file eagerly (records are small) and serves frame bytes
/// from the data file by record position.
pub struct ChunkReader {
    chunk_id: usize,
    records: Vec<BinaryRecord>,
    data: File,
}

impl ChunkReader {
    /// Open the pair for `chunk_id` under `output_dir`.
    pub fn open(output_dir: &Path, chunk_id: usize) -> Result<Self, PackagingError> {
        let meta_path = meta_file_path(output_dir, chunk_id);
        let meta = File::open(&meta_path).map_err(|source| PackagingError::Create {
            path: meta_path.clone(),
            source,
        })?;

        let mut reader = BufReader::new(meta);
        let mut records = Vec::new();
        loop {
            match BinaryRecord::read_from(&mut reader) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break,
                Err(error) => {
                    return Err(PackagingError::MalformedMeta {
                        path: meta_path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        let data_path = data_file_path(output_dir, chunk_id);
        let data = File::open(&data_path).map_err(|source| PackagingError::Create {
            path: data_path,
            source,
        })?;

        Ok(Self {
            chunk_id,
            records,
            data,
        })
    }

    /// The chunk this reader belongs to.
    pub fn chunk_id(&self) -> usize {
        self.chunk_id
    }

    /// All records, in storage order.
    pub fn records(&self) -> &[BinaryRecord] {
        &self.records
    }

    /// Number of stored frames.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the chunk holds no frames.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Read the frame bytes for the record at `index`.
    pub fn frame(&mut self, index: usize) -> Result<Vec<u8>, PackagingError> {
        let record = self
            .records
            .get(index)
            .ok_or(PackagingError::RecordOutOfRange {
                index,
                count: self.records.len(),
            })?;
        let mut bytes = vec![0u8; record.byte_length as usize];
        self.data.seek(SeekFrom::Start(record.byte_offset))?;
        self.data.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Read all frames of `entry_id`, in frame order.
    ///
    /// Entry grouping is not stored explicitly; it is re-derived from the
    /// invariant that an entry's records form one contiguous run.
    pub fn entry_frames(&mut self, entry_id: &str) -> Result<Vec<Vec<u8>>, PackagingError> {
        let start = match self
            .records
            .iter()
            .position(|record| record.entry_id == entry_id)
        {
            Some(start) => start,
            None => return Ok(Vec::new()),
        };
        let end = self.records[start..]
            .iter()
            .take_while(|record| record.entry_id == entry_id)
            .count()
            + start;

        (start..end).map(|index| self.frame(index)).collect()
    }
}
