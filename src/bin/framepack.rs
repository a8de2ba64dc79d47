use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framepack::{
    BuildOptions, BuildReport, ChunkProgress, ChunkReader, DatasetPacker, LABEL_DICT_FILE,
    LabelDict, ProgressCallback,
    manifest::{self, SourceLayout},
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framepack pack-frames train.csv --frames frames/ --out chunks/ --chunk-size 100 --labels\n  framepack pack-videos train.csv --videos videos/ --out chunks/ --scratch-dir /dev/shm --progress\n  framepack inspect chunks/ --chunk 0 --json\n  framepack completions zsh > _framepack";

#[derive(Debug, Parser)]
#[command(
    name = "framepack",
    version,
    about = "Pack labeled video-frame datasets into chunked binary files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while packaging.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing chunk files.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Debug, Parser, Clone)]
struct PackOptions {
    /// Manifest file (.csv with headers, or .json array).
    manifest: PathBuf,

    /// Output directory for the chunk pairs.
    #[arg(long, short)]
    out: PathBuf,

    /// Entries per chunk.
    #[arg(long, default_value_t = 100)]
    chunk_size: usize,

    /// Parallel packaging workers. Defaults to the CPU count.
    #[arg(long)]
    workers: Option<usize>,

    /// Target short-edge length for stored frames, in pixels.
    #[arg(long, default_value_t = 224)]
    short_edge: u32,

    /// Shuffle entries with this seed before chunking.
    #[arg(long)]
    seed: Option<u64>,

    /// Build a label dictionary from the manifest, index records through
    /// it, and dump it next to the chunks as label2idx.json.
    #[arg(long)]
    labels: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pack entries whose frames were extracted ahead of time.
    #[command(
        about = "Pack pre-extracted frame directories into chunk files",
        after_help = "Expects frames under <frames>/<label>/<id>[_<start>_<end>]/"
    )]
    PackFrames {
        #[command(flatten)]
        pack: PackOptions,

        /// Root of the pre-extracted frame tree.
        #[arg(long)]
        frames: PathBuf,
    },

    /// Pack entries by bursting frames from source videos with ffmpeg.
    #[command(
        about = "Burst source videos and pack the frames into chunk files",
        after_help = "Expects videos under <videos>/<id> (extension optional in the manifest)"
    )]
    PackVideos {
        #[command(flatten)]
        pack: PackOptions,

        /// Root of the source video files.
        #[arg(long)]
        videos: PathBuf,

        /// Directory for burst scratch space (e.g. /dev/shm).
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },

    /// Print the index records of one chunk.
    #[command(about = "Print a chunk's index records")]
    Inspect {
        /// Directory holding the chunk pairs.
        dir: PathBuf,

        /// Chunk id to inspect.
        #[arg(long, default_value_t = 0)]
        chunk: usize,

        /// Output records as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Progress bar adapter over the orchestrator callback.
///
/// The bar is sized lazily from the first snapshot because the chunk count
/// is only known once planning has run.
struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_chunk_complete(&self, progress: &ChunkProgress) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new(progress.total as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{bar:40} {pos}/{len} chunks {msg}")
            {
                bar.set_style(style);
            }
            bar
        });
        bar.set_position(progress.completed as u64);
        if progress.failed {
            bar.set_message(format!("chunk {} failed", progress.chunk_id));
        }
        if progress.completed == progress.total {
            bar.finish();
        }
    }
}

fn build_options(pack: &PackOptions, global: &GlobalOptions) -> BuildOptions {
    let mut options = BuildOptions::new()
        .with_chunk_size(pack.chunk_size)
        .with_target_short_edge(pack.short_edge)
        .with_overwrite_existing(global.overwrite);
    if let Some(workers) = pack.workers {
        options = options.with_worker_count(workers);
    }
    if let Some(seed) = pack.seed {
        options = options.with_shuffle_seed(seed);
    }
    options
}

fn run_pack(
    pack: &PackOptions,
    global: &GlobalOptions,
    layout: SourceLayout,
    scratch_dir: Option<&PathBuf>,
) -> Result<BuildReport, Box<dyn std::error::Error>> {
    let records = manifest::read_manifest(&pack.manifest)?;
    let entries = manifest::to_entries(&records, &layout);
    eprintln!(
        "{} {} entries from {}",
        "read".cyan().bold(),
        entries.len(),
        pack.manifest.display()
    );

    let mut options = build_options(pack, global);
    if let Some(scratch) = scratch_dir {
        options = options.with_scratch_root(scratch);
    }

    let mut packer = DatasetPacker::new(options);
    if pack.labels {
        let dict = LabelDict::from_entries(&entries);
        fs::create_dir_all(&pack.out)?;
        let dict_path = pack.out.join(LABEL_DICT_FILE);
        dict.save(&dict_path)?;
        eprintln!(
            "{} {} labels to {}",
            "wrote".cyan().bold(),
            dict.len(),
            dict_path.display()
        );
        packer = packer.with_labels(dict);
    }
    if global.progress {
        packer = packer.with_progress(Arc::new(TerminalProgress::new()));
    }

    Ok(packer.pack(entries, &pack.out)?)
}

fn print_report(report: &BuildReport) {
    println!(
        "Chunks: {} ok, {} failed",
        report.outcomes.len() - report.chunks_failed,
        report.chunks_failed,
    );
    println!("Records written: {}", report.records_written);
    println!("Entries skipped: {}", report.entries_skipped);

    for (chunk_id, entry_id, reason) in report.skipped_entries() {
        eprintln!(
            "{} chunk {chunk_id}: skipped {entry_id}: {reason}",
            "warning:".yellow().bold(),
        );
    }
    for outcome in &report.outcomes {
        if let Err(error) = &outcome.result {
            eprintln!(
                "{} chunk {} failed: {error}",
                "error:".red().bold(),
                outcome.chunk_id,
            );
        }
    }
    if !report.is_complete() {
        eprintln!(
            "{} re-run chunks {:?} (with --overwrite) to repair the build",
            "hint:".cyan().bold(),
            report.failed_chunk_ids(),
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match &cli.command {
        Commands::PackFrames { pack, frames } => {
            let layout = SourceLayout::PreExtractedFrames {
                frames_root: frames.clone(),
            };
            let report = run_pack(pack, &cli.global, layout, None)?;
            print_report(&report);
            if !report.is_complete() {
                return Err(format!("{} chunk(s) failed", report.chunks_failed).into());
            }
        }
        Commands::PackVideos {
            pack,
            videos,
            scratch_dir,
        } => {
            let layout = SourceLayout::SourceVideos {
                videos_root: videos.clone(),
            };
            let report = run_pack(pack, &cli.global, layout, scratch_dir.as_ref())?;
            print_report(&report);
            if !report.is_complete() {
                return Err(format!("{} chunk(s) failed", report.chunks_failed).into());
            }
        }
        Commands::Inspect { dir, chunk, json } => {
            let reader = ChunkReader::open(dir, *chunk)?;
            if *json {
                let records: Vec<_> = reader
                    .records()
                    .iter()
                    .map(|record| {
                        json!({
                            "entry_id": record.entry_id,
                            "label_index": record.label_index,
                            "byte_offset": record.byte_offset,
                            "byte_length": record.byte_length,
                        })
                    })
                    .collect();
                let payload = json!({
                    "chunk_id": chunk,
                    "records": records,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Chunk {}: {} records", chunk, reader.len());
                for (index, record) in reader.records().iter().enumerate() {
                    println!(
                        "{index:6}  {:<32}  label {:>5}  [{} + {}]",
                        record.entry_id,
                        record.label_index,
                        record.byte_offset,
                        record.byte_length,
                    );
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "framepack", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
