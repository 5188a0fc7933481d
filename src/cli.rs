//! CLI implementation for utagent

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use utagent::analyze::CoverageDiffAnalyzer;
use utagent::config::Config;
use utagent::coverage::JacocoXmlParser;
use utagent::git::GitCli;
use utagent::llm_cache::LlmResponseCache;
use utagent::parse_cache::ParseCache;

// Exit codes (anyhow errors from main exit 1)
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// `coverage --check` found uncovered new code
    UncoveredNewCode = 2,
}

#[derive(Parser)]
#[command(name = "utagent")]
#[command(about = "Incremental unit-test augmentation for Java projects")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or clear the parse and LLM caches
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Analyze coverage of code changed since a base ref
    Coverage {
        /// Base ref to diff against (config `base_ref`, then HEAD)
        #[arg(long)]
        base_ref: Option<String>,
        /// Emit the full result as JSON on stdout
        #[arg(long)]
        json: bool,
        /// Exit nonzero when any changed line is uncovered
        #[arg(long)]
        check: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Entry counts and on-disk size per cache
    Stats,
    /// Delete all cache entries
    Clear,
}

pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = Config::load(&cli.project);
    let cache_config = config.cache_config(&cli.project);

    match cli.command {
        Commands::Cache { action } => {
            let parse_cache = ParseCache::new(cache_config.clone());
            let llm_cache = LlmResponseCache::new(cache_config);
            match action {
                CacheAction::Stats => {
                    for (label, stats) in
                        [("parse", parse_cache.stats()), ("llm", llm_cache.stats())]
                    {
                        println!(
                            "{label:>5} cache: {} entries, {} bytes ({})",
                            stats.entry_count,
                            stats.total_size_bytes,
                            stats.directory.display()
                        );
                    }
                }
                CacheAction::Clear => {
                    parse_cache.clear();
                    llm_cache.clear();
                    println!("Caches cleared");
                }
            }
            Ok(ExitCode::Success as i32)
        }
        Commands::Coverage {
            base_ref,
            json,
            check,
        } => {
            let base_ref = base_ref
                .or(config.base_ref)
                .unwrap_or_else(|| Config::DEFAULT_BASE_REF.to_string());
            let analyzer = CoverageDiffAnalyzer::new(
                GitCli::new(&cli.project),
                JacocoXmlParser,
                &cli.project,
            );
            let result = analyzer.analyze_incremental(&base_ref);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if !result.has_changes() {
                println!("No Java changes since {base_ref}");
            } else {
                println!(
                    "New-code coverage since {base_ref}: {:.1}% ({}/{} changed lines covered)",
                    result.new_code_coverage * 100.0,
                    result.covered_changed_lines,
                    result.total_changed_lines
                );
                for file in &result.files {
                    let marker = if file.coverage.is_some() { "+" } else { "-" };
                    println!(
                        "  {marker} {} ({} changed lines)",
                        file.file.display(),
                        file.changed_lines.len()
                    );
                }
            }

            if check && result.covered_changed_lines < result.total_changed_lines {
                return Ok(ExitCode::UncoveredNewCode as i32);
            }
            Ok(ExitCode::Success as i32)
        }
    }
}
