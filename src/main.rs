//! routecheck - LLM gateway routing validation harness
//!
//! Sends one self-identification prompt per virtual key through an
//! OpenAI-compatible gateway and checks that each answer names the
//! provider the key is supposed to route to.
//!
//! ## Features
//!
//! - Two transport styles: OpenAI SDK (flat `choices`) and raw HTTP
//!   (`content` blocks)
//! - Cases from built-in defaults, a config file, or the gateway's `keys.json`
//! - Sequential or parallel execution, multiple rounds with a consistency check
//! - Table, JSON, CSV and summary output; stored runs with export
//!
//! ## Usage
//!
//! ```bash
//! # Probe the default cases against a local gateway
//! routecheck run --url http://localhost:8080
//!
//! # Derive cases from the gateway's own key map
//! routecheck run --keys-file ./keys.json --parallel
//!
//! # Repeat to catch flapping routes
//! routecheck run --rounds 5 --format summary
//!
//! # Inspect a stored run
//! routecheck results list
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info};

mod cli;
mod config;
mod error;
mod executor;
mod http;
mod models;
mod output;
mod probes;
mod response;
mod results;
mod utils;
mod validator;

use cli::Args;
use config::{ConfigFile, EnvConfig, HarnessConfig};
use executor::{ParallelExecutor, TestRunner};
use models::{Provider, TestCase};
use output::{OutputFormat, ResultFormatter};
use results::{ExportFormat, ResultsStorage, RunConfig, StoredRun};
use utils::logger::{init_logger, LogLevel};

/// Exit status when any case did not pass
const EXIT_FAILED: u8 = 1;
/// Exit status when the run could not start or finish
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let env = EnvConfig::load();

    let verbose = args.verbose || env.verbose.unwrap_or(false);
    init_logger(LogLevel::resolve(verbose, env.log_level.as_deref()));

    let gateway_command = args.command.touches_gateway();

    let outcome = match args.command {
        cli::Command::Run(run_args) => run_routing(run_args, &env).await,
        cli::Command::List(list_args) => list_cases(list_args, &env).map(|_| ExitCode::SUCCESS),
        cli::Command::Config(config_args) => {
            manage_config(config_args, &env).map(|_| ExitCode::SUCCESS)
        }
        cli::Command::Results(results_args) => {
            show_results(results_args).map(|_| ExitCode::SUCCESS)
        }
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n✗ {e:#}");
            if gateway_command {
                print_guidance();
            }
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn print_guidance() {
    eprintln!();
    eprintln!("Check that:");
    eprintln!("  - the gateway is running and reachable at the configured URL");
    eprintln!("  - the URL includes the scheme, e.g. http://localhost:8080");
    eprintln!("  - the virtual keys are configured in the gateway's keys.json");
    eprintln!("  - the config file is valid (routecheck config validate)");
    eprintln!();
    eprintln!("Run with --verbose for request details.");
}

/// Merge file, environment and flags into the settings for this run
fn resolve_settings(
    args: &cli::RunArgs,
    file: &ConfigFile,
    env: &EnvConfig,
) -> Result<HarnessConfig> {
    let mut settings = file.settings.clone();
    settings.apply_env(env);

    if let Some(url) = &args.url {
        settings.gateway_url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        settings.timeout_secs = timeout;
    }
    if let Some(max_tokens) = args.max_tokens {
        settings.max_tokens = max_tokens;
    }
    if let Some(keys_file) = &args.keys_file {
        settings.keys_file = Some(keys_file.clone());
    }
    if let Some(concurrent) = args.concurrent {
        settings.max_concurrent = concurrent;
    }
    if args.parallel {
        settings.parallel = true;
    }
    if args.insecure {
        settings.accept_invalid_certs = true;
    }

    settings.validate()?;
    Ok(settings)
}

async fn run_routing(args: cli::RunArgs, env: &EnvConfig) -> Result<ExitCode> {
    let config_path = args.config.clone().or_else(|| env.config_file.clone());
    let file = ConfigFile::load_from(config_path.as_deref())?;
    let settings = resolve_settings(&args, &file, env)?;

    let format_name = args
        .format
        .clone()
        .or_else(|| env.format.clone())
        .unwrap_or_else(|| "table".to_string());
    let format = OutputFormat::from_str(&format_name)
        .ok_or_else(|| anyhow!("Unknown output format: {format_name}"))?;
    let mut formatter = ResultFormatter::new(format);
    if args.no_color {
        formatter = formatter.no_color();
    }

    let cases = config::resolve_cases(&file, settings.keys_file.as_deref())?;
    let cases = config::select_cases(cases, &args.cases)?;

    // Client construction problems are configuration errors, not case failures
    http::HttpClient::build(settings.timeout_secs, settings.accept_invalid_certs)
        .context("Failed to construct HTTP client")?;

    let target = settings.to_target();
    info!(
        "Validating routing at {} ({} case(s), {} round(s){})",
        target.base(),
        cases.len(),
        args.rounds,
        if settings.parallel { ", parallel" } else { "" }
    );

    let (summaries, report) = if settings.parallel {
        ParallelExecutor::new(settings.max_concurrent)
            .run_rounds(&target, &cases, args.rounds)
            .await?
    } else {
        TestRunner::new(target, cases).run_rounds(args.rounds).await
    };

    println!("{}", formatter.format_run(&summaries, &report));

    let all_passed = summaries.iter().all(|s| s.is_all_passed());

    if args.save {
        let run = StoredRun::new(summaries, report, RunConfig::from(&settings));
        ResultsStorage::default_dir().save(&run)?;
        eprintln!("Saved run {}", run.id);
    }

    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    })
}

fn list_cases(args: cli::ListArgs, env: &EnvConfig) -> Result<()> {
    let config_path = args.config.or_else(|| env.config_file.clone());
    let file = ConfigFile::load_from(config_path.as_deref())?;
    let keys_file = args
        .keys_file
        .or_else(|| env.keys_file.clone())
        .or_else(|| file.settings.keys_file.clone());
    let cases = config::resolve_cases(&file, keys_file.as_deref())?;

    println!("\nRouting Cases ({} total)\n", cases.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for case in &cases {
        if args.detailed {
            print_case_detail(case);
        } else {
            println!(
                "  {:16} {:10} key {}",
                case.name, case.expected_provider, case.virtual_key
            );
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("\nKnown Provider Profiles:\n");
    for provider in Provider::all() {
        println!(
            "  - {:10} model {:28} via {:8} markers [{}]",
            provider.name(),
            provider.default_model(),
            provider.default_transport().name(),
            provider.default_markers().join(", ")
        );
    }
    println!();

    Ok(())
}

fn print_case_detail(case: &TestCase) {
    println!("  {}", case.name);
    println!("    Provider:  {}", case.expected_provider);
    println!("    Model:     {}", case.model_id);
    println!("    Transport: {}", case.transport);
    println!("    Key:       {}", case.virtual_key);
    println!(
        "    Markers:   {}",
        case.expected_markers
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
}

fn manage_config(args: cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to point at your gateway and virtual keys.");
        }

        cli::ConfigAction::Show { config, format } => {
            let config_path = config.or_else(|| env.config_file.clone());
            let mut resolved = ConfigFile::load_from(config_path.as_deref())?;
            resolved.settings.apply_env(env);

            let output = if format == "json" {
                serde_json::to_string_pretty(&resolved)?
            } else {
                serde_yaml::to_string(&resolved)?
            };
            println!("{output}");

            if env.has_any() {
                println!();
                env.print_summary();
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(|| ConfigFile::find().map(|p| p.to_string_lossy().to_string()))
                .ok_or_else(|| anyhow!("No configuration file found"))?;

            let config = ConfigFile::load(&path)?;
            println!(
                "✓ Configuration file is valid: {path} ({} case(s))",
                config.cases.len()
            );
        }

        cli::ConfigAction::Env => {
            config::env::print_env_help();
        }
    }

    Ok(())
}

fn show_results(args: cli::ResultsArgs) -> Result<()> {
    let storage = match &args.dir {
        Some(dir) => ResultsStorage::new(config::file::expand_path(dir)),
        None => ResultsStorage::default_dir(),
    };
    debug!("Results directory: {}", storage.base_dir().display());

    match args.action {
        cli::ResultsAction::List => {
            let runs = storage.list()?;
            if runs.is_empty() {
                println!("No stored runs in {}", storage.base_dir().display());
                return Ok(());
            }

            println!(
                "{:22} {:20} {:>6} {:>8}  {}",
                "ID", "Started", "Rounds", "Pass", "Gateway"
            );
            println!("{:-<80}", "");
            for run in runs {
                println!(
                    "{:22} {:20} {:>6} {:>7.1}%  {}{}",
                    run.id,
                    run.started_at.format("%Y-%m-%d %H:%M:%S"),
                    run.rounds,
                    run.pass_rate,
                    run.gateway_url,
                    if run.all_passed { "" } else { "  ✗" }
                );
            }
        }

        cli::ResultsAction::Show { id, format } => {
            let run = storage.load(&id)?;
            let format = OutputFormat::from_str(&format)
                .ok_or_else(|| anyhow!("Unknown output format: {format}"))?;
            println!(
                "{}",
                ResultFormatter::new(format).format_run(&run.summaries, &run.consistency)
            );
        }

        cli::ResultsAction::Export { id, path, format } => {
            let run = storage.load(&id)?;
            let dest = Path::new(&path);
            let export_format = match format {
                Some(f) => ExportFormat::from_str(&f)
                    .ok_or_else(|| anyhow!("Unknown export format: {f}"))?,
                None => ExportFormat::from_extension(dest).unwrap_or(ExportFormat::Json),
            };

            storage.export(&run, dest, export_format)?;
            println!("✓ Exported run {id} to {path}");
        }

        cli::ResultsAction::Delete { id } => {
            storage.load(&id)?;
            storage.delete(&id)?;
            println!("✓ Deleted run {id}");
        }
    }

    Ok(())
}
