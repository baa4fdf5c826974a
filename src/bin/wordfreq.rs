use std::fs;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use wordfreq::{CountConfig, WordCounter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Parallel word frequency counter", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, action = ArgAction::Count)]
    quiet: u8,

    /// Text file to count
    path: PathBuf,

    /// Number of workers (at least 1)
    #[arg(value_name = "N", value_parser = parse_workers)]
    workers: usize,

    /// Cap on spawned threads; remaining chunks run on the main thread
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Read buffer size per worker handle
    #[arg(long, value_name = "BYTES")]
    read_buffer: Option<usize>,

    /// Write run metrics as JSON
    #[arg(long, value_name = "PATH")]
    metrics: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage errors exit with 1; help and version exit cleanly.
            let code = i32::from(err.use_stderr());
            let _ = err.print();
            process::exit(code);
        }
    };
    init_logging(cli.verbose, cli.quiet);
    run(cli)
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn parse_workers(value: &str) -> std::result::Result<usize, String> {
    let workers: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number of workers"))?;
    if workers == 0 {
        return Err("bad number of workers, must be > 0".into());
    }
    Ok(workers)
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg = CountConfig::builder()
        .workers(cli.workers)
        .thread_budget(cli.threads);
    if let Some(bytes) = cli.read_buffer {
        cfg = cfg.read_buffer_size(bytes);
    }
    let cfg = cfg.build()?;

    let spinner = if cli.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} counting words... {elapsed}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let counter = WordCounter::new(cfg);
    let counted = counter.count_path(&cli.path);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let artifacts =
        counted.with_context(|| format!("failed to count words in {}", cli.path.display()))?;

    info!(
        "elapsed {:.6?} over {} chunk(s), {} fallback",
        artifacts.metrics.total_duration,
        artifacts.metrics.chunks.len(),
        artifacts.metrics.fallback_chunks()
    );

    if let Some(path) = &cli.metrics {
        let json = artifacts.metrics.to_json(true)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    artifacts
        .write_report(&mut out)
        .context("failed to write report")?;
    Ok(())
}
