use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use smtl::catalog::{self, Catalog, Upsert};
use smtl::simfile::SimfileFormat;
use smtl::{NumericPolicy, ParseOptions, ParsedSong, Song};

#[derive(Parser)]
#[command(name = "smtl")]
#[command(about = "Converts StepMania simfiles into chart event timelines", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct ParseArgs {
    /// Keep non-numeric BPMS/STOPS components as NaN instead of failing
    #[arg(long)]
    keep_invalid_numbers: bool,
}

impl ParseArgs {
    const fn options(self) -> ParseOptions {
        ParseOptions {
            numeric_policy: if self.keep_invalid_numbers {
                NumericPolicy::Keep
            } else {
                NumericPolicy::Reject
            },
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Parse one simfile and print the song as JSON
    Convert {
        file: PathBuf,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
        #[command(flatten)]
        parse: ParseArgs,
    },
    /// Print one line per chart
    Summary {
        file: PathBuf,
        #[command(flatten)]
        parse: ParseArgs,
    },
    /// Import every simfile under a directory into a catalog
    Import {
        dir: PathBuf,
        /// Output directory for catalog.json, songs.json and songs/
        #[arg(short, long)]
        out: PathBuf,
        /// Parser threads (defaults to one per core)
        #[arg(short, long)]
        jobs: Option<usize>,
        #[command(flatten)]
        parse: ParseArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smtl=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Convert { file, pretty, parse } => convert(&file, pretty, parse.options()),
        Command::Summary { file, parse } => summary(&file, parse.options()),
        Command::Import {
            dir,
            out,
            jobs,
            parse,
        } => import(&dir, &out, jobs, parse.options()),
    }
}

fn parse_one(path: &Path, options: ParseOptions) -> Result<Song> {
    let ParsedSong { song, warnings } = smtl::parse_file(path, options)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if !warnings.is_empty() {
        warn!("{}: {} warning(s)", path.display(), warnings.len());
    }
    Ok(song)
}

fn convert(path: &Path, pretty: bool, options: ParseOptions) -> Result<()> {
    let song = parse_one(path, options)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, &song)?;
    } else {
        serde_json::to_writer(&mut out, &song)?;
    }
    writeln!(out)?;
    Ok(())
}

fn summary(path: &Path, options: ParseOptions) -> Result<()> {
    let song = parse_one(path, options)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{} - {}", song.title, song.artist)?;
    for (step_type, charts) in &song.charts {
        for (difficulty, chart) in charts {
            let bpm = chart
                .bpm_display
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            writeln!(
                out,
                "  {step_type:<16} {difficulty:<12} level {:>5} combo {:>5} bpm {bpm:<12} events {}",
                chart.level,
                chart.combo,
                chart.events.len()
            )?;
        }
    }
    Ok(())
}

fn find_simfiles(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .and_then(SimfileFormat::from_extension)
                .is_some()
        })
        .collect();
    files.sort();
    files
}

fn import(dir: &Path, out: &Path, jobs: Option<usize>, options: ParseOptions) -> Result<()> {
    let files = find_simfiles(dir);
    info!("Found {} simfiles under {}", files.len(), dir.display());

    let songs_dir = out.join("songs");
    fs::create_dir_all(&songs_dir)
        .with_context(|| format!("failed to create {}", songs_dir.display()))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.unwrap_or(0))
        .build()?;
    // Every file gets its own parser; results come back in path order.
    let parsed: Vec<(&PathBuf, Result<Song>)> =
        pool.install(|| files.par_iter().map(|p| (p, parse_one(p, options))).collect());

    let catalog_path = out.join("catalog.json");
    let mut catalog = Catalog::load(&catalog_path)?;
    let mut inserted = 0usize;
    let mut failed = 0usize;

    for (path, result) in parsed {
        info!("Importing {}", path.display());
        let song = match result {
            Ok(song) => song,
            Err(e) => {
                error!("{e:#}");
                failed += 1;
                continue;
            }
        };

        match catalog.upsert(&song)? {
            Upsert::Inserted => {
                inserted += 1;
                info!("Inserted {} - {}", song.title, song.artist);
            }
            Upsert::Updated => info!("Updated existing record {} - {}", song.title, song.artist),
        }

        if let Err(e) = catalog::write_chart_artifacts(&song, &songs_dir) {
            error!("Failed to write charts for {}: {e}", path.display());
        }
    }

    catalog.save(&catalog_path)?;
    catalog::write_song_list(&catalog, &out.join("songs.json"))?;

    info!(
        "Done, {inserted} imported, {failed} failed, {} total",
        catalog.len()
    );
    Ok(())
}
