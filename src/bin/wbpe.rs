use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde_json::json;
use wbpe::config::num_merges_from_signed;
use wbpe::corpus::load_text_corpus;
use wbpe::serialization::read_vocab_tsv;
use wbpe::{CountingStrategy, IngestConfig, Trainer, TrainerConfig, VocabOrder, VocabPolicy};

const DEFAULT_OUTPUT: &str = "vocab.txt";

#[derive(Parser, Debug)]
#[command(author, version, about = "Word-level BPE vocabulary trainer", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a vocabulary from text files
    Train(TrainArgs),
    /// Inspect a vocabulary file
    Info(InfoArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrderArg {
    Lexicographic,
    FirstSeen,
    Creation,
}

impl From<OrderArg> for VocabOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Lexicographic => VocabOrder::Lexicographic,
            OrderArg::FirstSeen => VocabOrder::FirstSeen,
            OrderArg::Creation => VocabOrder::Creation,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CountingArg {
    Incremental,
    Recount,
}

impl From<CountingArg> for CountingStrategy {
    fn from(value: CountingArg) -> Self {
        match value {
            CountingArg::Incremental => CountingStrategy::Incremental,
            CountingArg::Recount => CountingStrategy::Recount,
        }
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the vocabulary
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// JSON training configuration; flags override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of merge rounds
    #[arg(long, value_name = "COUNT", allow_negative_numbers = true)]
    merges: Option<i64>,

    /// Minimum pair count for a merge
    #[arg(long, value_name = "COUNT")]
    min_frequency: Option<u64>,

    /// Start-of-word marker
    #[arg(long, value_name = "TEXT", conflicts_with = "no_start_marker")]
    start_marker: Option<String>,

    /// Do not prepend a start-of-word marker
    #[arg(long)]
    no_start_marker: bool,

    /// End-of-word marker
    #[arg(long, value_name = "TEXT")]
    end_marker: Option<String>,

    /// Glue the end marker onto each word's last character
    #[arg(long)]
    attach_end_marker: bool,

    /// Remove the end marker from symbols when writing
    #[arg(long)]
    strip_end_marker: bool,

    /// Index ordering of the written vocabulary
    #[arg(long, value_enum, default_value_t = OrderArg::Lexicographic)]
    order: OrderArg,

    /// Pair counting strategy
    #[arg(long, value_enum)]
    counting: Option<CountingArg>,

    /// Read at most this many bytes of corpus
    #[arg(long, value_name = "BYTES")]
    max_bytes: Option<usize>,

    /// Read at most this many lines of corpus
    #[arg(long, value_name = "LINES")]
    max_lines: Option<usize>,

    /// Replace invalid UTF-8 instead of failing
    #[arg(long)]
    lossy: bool,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,

    /// Also write the ordered merge list
    #[arg(long, value_name = "PATH")]
    merges_output: Option<PathBuf>,

    /// Also write the vocabulary as JSON
    #[arg(long, value_name = "PATH")]
    json_output: Option<PathBuf>,

    /// Write training metrics as JSON
    #[arg(long, value_name = "PATH")]
    metrics_output: Option<PathBuf>,

    /// Disable per-round logging/progress
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Vocabulary file to inspect
    vocab: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Info(args) => run_info(args),
    }
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

fn trainer_config(args: &TrainArgs) -> Result<TrainerConfig> {
    let mut cfg = match &args.config {
        Some(path) => TrainerConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TrainerConfig::default(),
    };
    if let Some(merges) = args.merges {
        cfg.num_merges = num_merges_from_signed(merges)?;
    }
    if let Some(min_frequency) = args.min_frequency {
        cfg.min_frequency = min_frequency;
    }
    if args.no_start_marker {
        cfg.start_marker = None;
    } else if let Some(marker) = &args.start_marker {
        cfg.start_marker = Some(marker.clone());
    }
    if let Some(marker) = &args.end_marker {
        cfg.end_marker = marker.clone();
    }
    if args.attach_end_marker {
        cfg.attach_end_marker = true;
    }
    if let Some(counting) = args.counting {
        cfg.counting = counting.into();
    }
    if args.no_progress {
        cfg.show_progress = false;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn run_train(args: TrainArgs) -> Result<()> {
    let trainer_cfg = trainer_config(&args)?;
    let ingest_cfg = IngestConfig::builder()
        .recursive(!args.no_recursive)
        .follow_symlinks(args.follow_symlinks)
        .max_bytes(args.max_bytes)
        .max_lines(args.max_lines)
        .lossy_utf8(args.lossy)
        .build();
    let policy = VocabPolicy::builder()
        .order(args.order.into())
        .strip_end_marker(args.strip_end_marker)
        .build();

    let corpus = load_text_corpus(&args.inputs, &ingest_cfg)
        .with_context(|| "failed to load text corpus")?;
    info!(
        "loaded corpus of {:.2} MiB from {} input(s)",
        bytes_to_mebibytes(corpus.len()),
        args.inputs.len()
    );

    let progress = if args.no_progress || trainer_cfg.num_merges == 0 {
        None
    } else {
        let pb = ProgressBar::new(trainer_cfg.num_merges as u64);
        let style = ProgressStyle::with_template(
            "{spinner} merges {pos}/{len} [{bar:40}] {elapsed} {msg}",
        )
        .context("invalid progress template")?
        .progress_chars("=> ");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let trainer = Trainer::new(trainer_cfg);
    let start = Instant::now();
    let artifacts = trainer.train_with_observer(&corpus, |round| {
        if let Some(pb) = &progress {
            pb.set_message(format!("{} + {} ({})", round.left, round.right, round.frequency));
            pb.inc(1);
        }
    })?;
    drop(corpus);
    if let Some(pb) = progress {
        pb.finish_with_message("training complete");
    }
    let elapsed = start.elapsed();

    artifacts
        .model
        .save_vocab(&args.output, &policy)
        .with_context(|| format!("failed to save vocabulary to {}", args.output.display()))?;
    if let Some(path) = &args.merges_output {
        artifacts
            .model
            .save_merges(path)
            .with_context(|| format!("failed to save merges to {}", path.display()))?;
    }
    if let Some(path) = &args.json_output {
        artifacts
            .model
            .save_vocab_json(path, &policy)
            .with_context(|| format!("failed to save JSON vocabulary to {}", path.display()))?;
    }
    if let Some(path) = &args.metrics_output {
        let report = serde_json::to_string_pretty(&artifacts.metrics)?;
        fs::write(path, report)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    let merges = artifacts.model.merges().len();
    let vocab_size = artifacts.model.vocab_size();
    info!(
        "training complete: merges={merges} vocab={vocab_size} duration={elapsed:.2?} stop={:?} compression={:.3}",
        artifacts.metrics.stop_reason,
        artifacts.metrics.compression_ratio()
    );
    println!(
        "✅ wrote vocabulary with {} symbols ({} merges) to {}",
        vocab_size,
        merges,
        args.output.display()
    );
    println!(
        "   words {} | distinct {} | duration {:.2?} | stop {:?}",
        artifacts.metrics.total_words,
        artifacts.metrics.initial_distinct_words,
        elapsed,
        artifacts.metrics.stop_reason
    );

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let records = read_vocab_tsv(&args.vocab)
        .with_context(|| format!("failed to read {}", args.vocab.display()))?;

    let symbols = records.len();
    let composite = records
        .iter()
        .filter(|(_, symbol)| symbol.chars().count() > 1)
        .count();
    let longest = records
        .iter()
        .map(|(_, symbol)| symbol.as_str())
        .max_by_key(|symbol| symbol.chars().count())
        .unwrap_or_default();
    let contiguous = records
        .iter()
        .enumerate()
        .all(|(position, (index, _))| position == *index);
    let summary = json!({
        "path": args.vocab.display().to_string(),
        "symbols": symbols,
        "composite_symbols": composite,
        "longest_symbol": longest,
        "contiguous_indices": contiguous,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Symbols          : {symbols}");
        println!("Composite symbols: {composite}");
        println!("Longest symbol   : {longest:?}");
        println!("Contiguous ids   : {contiguous}");
    }

    Ok(())
}

fn bytes_to_mebibytes(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
