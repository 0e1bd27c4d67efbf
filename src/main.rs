mod cli;

use anyhow::Context;
use cli::{Cli, Command, CreateArgs, GenerateArgs, LogLevel};
use std::fmt as stdfmt;
use std::io::{BufReader, IsTerminal, stderr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Event, Level, Subscriber, error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use twig::{
    BuildConfig, CancelToken, CompareConfig, ConflictPolicy, DEFAULT_IGNORE_PATTERNS,
    FormatConfig, Formatter, ScanConfig, Snapshot, Twig, parse_reader,
};

struct TwigExitCode;

impl TwigExitCode {
    /// Exit code used when `compare` finds differences.
    fn differences() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code used for other errors (I/O errors, invalid arguments, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level);

    // Change working directory if -C was specified
    if let Some(directory) = cli.directory
        && let Err(e) = std::env::set_current_dir(&directory)
    {
        error!(
            "Failed to change directory to {}: {}",
            directory.display(),
            e
        );
        return TwigExitCode::any_error();
    }

    let cancel = CancelToken::new();

    let result: anyhow::Result<ExitCode> = match cli.command {
        Command::Generate(args) => handle_generate(&cancel, args),
        Command::Create(args) => handle_create(&cancel, args),
        Command::Compare {
            left,
            right,
            detect_moves,
            json,
        } => handle_compare(&cancel, &left, &right, detect_moves, json),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err:#}");
            TwigExitCode::any_error()
        }
    }
}

fn scan_config_from_args(args: &GenerateArgs) -> ScanConfig {
    let mut ignore_patterns: Vec<String> = if args.no_default_ignores {
        Vec::new()
    } else {
        DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect()
    };
    ignore_patterns.extend(args.ignore.iter().cloned());

    ScanConfig {
        max_depth: args.depth,
        show_hidden: args.all,
        ignore_patterns,
        dirs_only: args.dirs_only,
        show_hash: args.hash || args.flat_hashes,
        max_files: args.max_files,
        max_hash_size: args.max_hash_size,
        parallel: args.threads,
        progress: None,
    }
}

fn format_config_from_args(args: &GenerateArgs) -> FormatConfig {
    FormatConfig {
        dir_slash: !args.no_dir_slash,
        show_hash: args.hash,
        show_size: args.size,
        show_date: args.date,
    }
}

fn handle_generate(cancel: &CancelToken, args: GenerateArgs) -> anyhow::Result<ExitCode> {
    let twig = Twig::new()
        .with_scan_config(scan_config_from_args(&args))
        .with_format_config(format_config_from_args(&args));
    let formatter = Formatter::new(format_config_from_args(&args));

    let generated = twig.generate(cancel, &args.path)?;

    if args.json {
        let stats = args.stats.then_some(&generated.stats);
        print!("{}", formatter.format_json(&generated.root, stats)?);
    } else if args.json_stream {
        formatter.format_json_stream(
            std::io::stdout().lock(),
            &generated.root,
            Some(&generated.stats),
        )?;
    } else if args.flat_hashes {
        print!("{}", formatter.format_flat_hashes(&generated.root));
    } else {
        print!("{}", generated.output);
        if args.stats {
            println!();
            println!(
                "{} directories, {} files",
                generated.stats.total_dirs, generated.stats.total_files
            );
        }
    }

    if let Some(output) = &args.output {
        let snapshot = Snapshot::new(generated.root, Some(generated.stats));
        snapshot
            .save(output)
            .with_context(|| format!("Failed to save snapshot to {}", output.display()))?;
        info!("Saved snapshot to {}", output.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn build_config_from_args(args: &CreateArgs) -> BuildConfig {
    let conflict = if args.abort_on_conflict {
        ConflictPolicy::Abort
    } else if args.skip_existing {
        ConflictPolicy::SkipExisting
    } else {
        ConflictPolicy::Merge
    };

    BuildConfig {
        dry_run: args.dry_run,
        conflict,
    }
}

fn handle_create(cancel: &CancelToken, args: CreateArgs) -> anyhow::Result<ExitCode> {
    let input = args.input.as_path();
    let root = if input == Path::new("-") {
        parse_reader(std::io::stdin().lock())?
    } else {
        let file = std::fs::File::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        parse_reader(BufReader::new(file))?
    };

    let target = args
        .target
        .clone()
        .unwrap_or_else(|| PathBuf::from(&root.name));

    let twig = Twig::new().with_build_config(build_config_from_args(&args));
    let result = twig.build(cancel, &root, &target)?;

    for path in &result.created {
        println!("{}", path.display());
    }
    for path in &result.skipped {
        info!("Skipped existing {}", path.display());
    }

    if args.dry_run {
        info!("DRY RUN - nothing was created");
    }

    Ok(ExitCode::SUCCESS)
}

fn handle_compare(
    cancel: &CancelToken,
    left: &Path,
    right: &Path,
    detect_moves: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let twig = Twig::new()
        .with_scan_config(ScanConfig {
            show_hash: true,
            ..ScanConfig::default()
        })
        .with_compare_config(CompareConfig { detect_moves });

    let result = twig.compare_paths(cancel, left, right)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.is_empty() {
        info!("No differences");
    } else {
        for change in &result.changes {
            println!("{}", change.render_line());
        }
        println!();
        println!("{}", result.summary);
    }

    if result.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(TwigExitCode::differences())
    }
}

/// `--log-level` wins, then `-v`, then `RUST_LOG`, then warnings only.
fn init_tracing(verbose: u8, log_level: Option<LogLevel>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = LevelFormatter { stderr_is_terminal };

    let filter = match (log_level, verbose) {
        (Some(level), _) => EnvFilter::new(level.as_filter()),
        (None, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        (None, 1) => EnvFilter::new("info"),
        (None, _) => EnvFilter::new("debug"),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Symbol prefixes on a terminal, plain `LEVEL:` prefixes otherwise.
struct LevelFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for LevelFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::TRACE => write!(writer, "· ")?,
                Level::DEBUG => write!(writer, "🔍 ")?,
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::TRACE => writer.write_str("TRACE: ")?,
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => {}
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
