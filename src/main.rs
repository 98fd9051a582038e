use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notice_relay::cli::{Cli, Commands};
use notice_relay::config::Config;
use notice_relay::services::{build_runner, FetchFailure, RunReport};
use notice_relay::storage::{FailureLogRepository, FileFailureLog, FileHistoryRepository, FileStorage, HistoryRepository};

fn main() {
    Config::load_dotenv();
    init_tracing();

    if let Err(e) = run() {
        error!(error = %format!("{:#}", e), "run aborted");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notice_relay=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()
        .with_config_file(cli.config)
        .with_dump_dir(cli.dump_dir);

    match cli.command {
        Commands::Run {
            dry_run,
            skip_notify,
        } => cmd_run(&config, dry_run, skip_notify),
        Commands::List => cmd_list(&config),
        Commands::Failures { limit } => cmd_failures(&config, limit),
    }
}

fn cmd_run(config: &Config, dry_run: bool, skip_notify: bool) -> anyhow::Result<()> {
    let settings = config
        .load_settings()
        .with_context(|| format!("cannot load config from {}", config.config_file))?;
    let mut runner = build_runner(config, &settings)?;

    println!("Fetching {} sources...\n", runner.sources().len());

    if dry_run {
        let (notices, failures) = runner.scan();
        print_fetch_failures(&failures);

        if notices.is_empty() {
            println!("No new notices.");
            return Ok(());
        }

        for notice in notices.iter().rev() {
            let dispatchers: Vec<String> = notice
                .dispatchers()
                .iter()
                .map(|d| d.name().to_string())
                .collect();
            println!(
                "  [DRY RUN] {} <- {} -> {}",
                notice.content,
                notice.source_names().join(", "),
                dispatchers.join(", ")
            );
        }
        println!("\nDry run complete. Would dispatch {} notices.", notices.len());
        return Ok(());
    }

    let report = if skip_notify {
        println!("Running in skip-notify mode: new notices are recorded without sending.\n");
        runner.mark_seen()?
    } else {
        runner.run()?
    };

    print_report(&report, skip_notify);
    Ok(())
}

fn print_fetch_failures(failures: &[FetchFailure]) {
    if failures.is_empty() {
        return;
    }

    println!("Failed to fetch {} sources:", failures.len());
    for failure in failures {
        println!("  ! {}: {}", failure.source, failure.error);
    }
    println!();
}

fn print_report(report: &RunReport, skip_notify: bool) {
    print_fetch_failures(&report.fetch_failures);

    if report.found == 0 {
        println!("No new notices.");
        return;
    }

    if skip_notify {
        println!("Marked {} notices as sent.", report.found);
    } else {
        println!(
            "Dispatched {} of {} new notices ({} with failed deliveries).",
            report.delivered, report.found, report.failed
        );
    }
}

fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let settings = config
        .load_settings()
        .with_context(|| format!("cannot load config from {}", config.config_file))?;
    let history = FileHistoryRepository::new(FileStorage::open(&config.dump_dir));

    println!("Configured sources:\n");
    for source in &settings.notice_sources {
        let stored = history.load(&source.name)?;
        println!("  {} [{}]", source.name, source.reader);
        println!("    URL: {}", source.url);
        println!("    Dispatchers: {}", source.dispatchers.join(", "));
        println!(
            "    History: {}/{}",
            stored.len(),
            settings.max_dump_for(source)
        );
        println!();
    }

    Ok(())
}

fn cmd_failures(config: &Config, limit: Option<usize>) -> anyhow::Result<()> {
    let log = FileFailureLog::new(FileStorage::open(&config.dump_dir));
    let records = log.read_all()?;

    if records.is_empty() {
        println!("No failed deliveries.");
        return Ok(());
    }

    let skip = limit.map_or(0, |n| records.len().saturating_sub(n));
    println!("Failed deliveries ({} total):\n", records.len());
    for record in records.iter().skip(skip) {
        let when = record
            .logged_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {} [{}] {}", when, record.content.date, record.content.title);
        println!("    Link: {}", record.content.link);
        println!("    Failed: {}", record.failed_dispatchers.join(", "));
        println!();
    }

    Ok(())
}
