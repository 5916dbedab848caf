/*!
 * Command-line interface for context-builder
 */

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use context_builder::chunker::{available_report_name, export_chunked, split_scan_result};
use context_builder::config::{Args, Config, Settings};
use context_builder::error::Result;
use context_builder::report::{format_token_count, render_tree, scan_tokens, Reporter};
use context_builder::scanner::Scanner;
use context_builder::session::SessionStore;
use context_builder::utils::default_report_name;
use context_builder::writer::export;

fn init_logging(config: &Config) {
    let default_level = if config.silent {
        "error"
    } else if config.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = if config.verbose || config.silent {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn spinner(config: &Config) -> ProgressBar {
    if config.silent {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim.white}")
    {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

fn run(config: Config) -> Result<ExitCode> {
    let progress = spinner(&config);
    progress.set_prefix("📂 Scanning");
    progress.set_message(config.target_dir.display().to_string());

    let start_time = Instant::now();
    let scan = match Scanner::new(config.max_file_size_mb).scan(&config.target_dir) {
        Ok(scan) => scan,
        Err(e) => {
            progress.finish_and_clear();
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    progress.finish_and_clear();
    tracing::debug!("Scan finished in {:.4?}", start_time.elapsed());

    let reporter = Reporter::new();
    let exported = match config.redactor() {
        Some(redactor) => {
            let (redacted, findings) = redactor.redact(&scan);
            if !config.silent {
                println!("\n{}", reporter.generate_findings(&findings));
            }
            redacted
        }
        None => scan,
    };

    if config.preview {
        if !config.silent {
            reporter.print_preview(&exported);
            if config.include_tree {
                println!("\n{}", render_tree(&exported));
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&exported.root));
    let requested = config.output_name.clone().unwrap_or_else(default_report_name);
    let parts = config
        .split_mb
        .map_or(1, |max_chunk_mb| split_scan_result(&exported, max_chunk_mb).len());
    let filename = available_report_name(&output_dir, &requested, config.format, parts);
    if filename != requested && !config.silent {
        println!("⚠️  {} is taken in {}, writing {}", requested, output_dir.display(), filename);
    }

    let written = match config.split_mb {
        Some(max_chunk_mb) => export_chunked(
            &exported,
            &filename,
            config.format,
            Some(&output_dir),
            config.include_tree,
            max_chunk_mb,
        )?,
        None => {
            let path = export(
                &exported,
                &filename,
                config.format,
                Some(&output_dir),
                config.include_tree,
            )?;

            if config.save_session {
                let sessions_root = config
                    .sessions_root
                    .clone()
                    .unwrap_or_else(|| Settings::load(&Settings::default_path()).sessions_root);
                let store = SessionStore::new(sessions_root);
                if let Err(e) = store.save(&exported, Some(&output_dir), Some(&path)) {
                    tracing::warn!("Could not save session: {}", e);
                }
            }
            vec![path]
        }
    };

    if !config.silent {
        println!("\n✅  EXTRACTION COMPLETE");
        for path in &written {
            println!("  📄 {}", path.display());
        }
        println!(
            "  📦 {} files, ~{} tokens, {} skipped, {} errors",
            exported.files.len(),
            format_token_count(scan_tokens(&exported)),
            exported.skipped.len(),
            exported.errors.len()
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    if let Some(shell) = args.generate {
        clap_complete::generate(shell, &mut Args::command(), "context-builder", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    // Create and validate configuration
    let config = match Config::from_args(args).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);

    match run(config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
