//! oxbonnie - multi-worker storage benchmark.

use anyhow::{Context, Result};
use clap::Parser;
use oxbonnie::{
    cli::Cli,
    output::{self, Report},
    platform::{self, PlatformCacheClearer},
    progress::RunProgress,
    signal,
};
use oxbonnie_core::{BenchError, Benchmark, BenchmarkConfig, ErrorCategory};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Log lines go through indicatif so they appear above the spinner
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });

    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(indicatif_layer.get_stderr_writer()),
        )
        .with(indicatif_layer)
        .with(filter)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_interrupt(&e) => {
            eprintln!("Interrupted");
            ExitCode::from(signal::INTERRUPTED_EXIT_CODE)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let interrupt = signal::install_interrupt_flag().context("Failed to install signal handlers")?;
    let color = !cli.no_color && std::io::stdout().is_terminal();

    let physical_memory = cli.resolve_physical_memory(platform::total_physical_memory())?;
    let base_dir = cli.base_dir();
    let free_space = match platform::available_disk_space(&base_dir) {
        Ok(free) => Some(free),
        Err(e) => {
            tracing::warn!(
                "Could not determine free space of {}: {}",
                base_dir.display(),
                e
            );
            None
        }
    };

    // Removed on drop, including on error and interrupt
    let work_dir = tempfile::Builder::new()
        .prefix("oxbonnie.")
        .tempdir_in(&base_dir)
        .with_context(|| format!("Failed to create working directory in {}", base_dir.display()))?;

    let config = cli
        .into_config(work_dir.path().to_path_buf(), physical_memory, free_space)
        .context("Invalid configuration")?;

    tracing::info!("Cores: {}", platform::available_cores());
    tracing::info!("Workers: {}", config.workers);
    tracing::info!("Physical memory: {}", output::format_size(physical_memory));
    tracing::info!("Benchmark directory: {}", work_dir.path().display());

    if !cli.json {
        print_banner(&config, color);
    }

    let started_at = chrono::Utc::now();
    let progress = RunProgress::new(!cli.json && std::io::stderr().is_terminal(), color);
    let benchmark = Benchmark::new(config, PlatformCacheClearer).with_interrupt(interrupt);

    let results = benchmark.run_with_observer(&|report| {
        progress.stage_finished(report);
        tracing::info!("{}", output::stage_detail(report));
        if !cli.json
            && let Some(line) = output::stage_line(report)
        {
            progress.println(&line);
        }
    });
    progress.finish();
    let results = results.context("Benchmark failed")?;

    if cli.json {
        let report = Report::new(benchmark.config(), started_at, &results);
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else if results.len() > 1 {
        println!();
        for line in output::summary_lines(&results) {
            println!("{line}");
        }
    }

    work_dir
        .close()
        .context("Failed to remove working directory")?;
    Ok(())
}

/// Print a compact one-line banner with configuration summary.
fn print_banner(config: &BenchmarkConfig, color: bool) {
    use owo_colors::OwoColorize;

    let summary = format!(
        "{} workers, {} total, IOPS for {}",
        config.workers,
        output::format_size(config.aggregate_size),
        output::format_duration(config.iops_duration)
    );

    if color {
        println!("{}: {}", "oxbonnie".cyan().bold(), summary);
    } else {
        println!("oxbonnie: {summary}");
    }
}

fn is_interrupt(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<BenchError>())
        .any(|e| e.category() == ErrorCategory::Interrupted)
}
