//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// LLM gateway routing validation harness
#[derive(Parser, Debug)]
#[command(name = "routecheck")]
#[command(version)]
#[command(about = "Check that an LLM gateway routes each virtual key to the right provider")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe the gateway and validate routing
    Run(RunArgs),

    /// List configured cases and known provider profiles
    List(ListArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// View stored results
    Results(ResultsArgs),
}

impl Command {
    /// Commands whose failures point at the gateway or its virtual keys
    pub fn touches_gateway(&self) -> bool {
        matches!(self, Command::Run(_) | Command::List(_))
    }
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Gateway base URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Only run the named case (repeatable)
    #[arg(short = 'C', long = "case")]
    pub cases: Vec<String>,

    /// Configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Gateway keys.json to derive cases from
    #[arg(short, long)]
    pub keys_file: Option<String>,

    /// Per-request timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// max_tokens sent on the raw HTTP path
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Number of rounds
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub rounds: u32,

    /// Run cases concurrently
    #[arg(short, long)]
    pub parallel: bool,

    /// Number of concurrent cases (when parallel)
    #[arg(short, long)]
    pub concurrent: Option<usize>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Save results for later inspection
    #[arg(short, long)]
    pub save: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show model, transport and markers per case
    #[arg(short, long)]
    pub detailed: bool,

    /// Configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Gateway keys.json to derive cases from
    #[arg(short, long)]
    pub keys_file: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a starter configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./routecheck.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the resolved configuration
    Show {
        /// Configuration file
        #[arg(long)]
        config: Option<String>,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (default: first one found)
        file: Option<String>,
    },

    /// Show environment variable help
    Env,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    #[command(subcommand)]
    pub action: ResultsAction,

    /// Results directory (default: platform data dir)
    #[arg(long, global = true)]
    pub dir: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ResultsAction {
    /// List stored runs
    List,

    /// Show a stored run
    Show {
        /// Run ID
        id: String,

        /// Output format (table, json, json-pretty, csv, summary)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Export a stored run to JSON or CSV
    Export {
        /// Run ID
        id: String,

        /// Destination file; format follows the extension
        path: String,

        /// Force a format (json, csv)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Delete a stored run
    Delete {
        /// Run ID
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["routecheck", "list", "--detailed"]);
        match args.command {
            Command::List(list_args) => {
                assert!(list_args.detailed);
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "routecheck",
            "-v",
            "run",
            "--url",
            "http://gateway:8080",
            "--case",
            "deepseek",
            "--case",
            "anthropic",
            "--rounds",
            "3",
            "--parallel",
            "--format",
            "json",
        ]);
        assert!(args.verbose);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.url.as_deref(), Some("http://gateway:8080"));
                assert_eq!(run.cases, vec!["deepseek", "anthropic"]);
                assert_eq!(run.rounds, 3);
                assert!(run.parallel);
                assert_eq!(run.format.as_deref(), Some("json"));
                assert!(run.timeout.is_none());
                assert!(!run.save);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_defaults() {
        let args = Args::parse_from(["routecheck", "run"]);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.rounds, 1);
                assert!(run.cases.is_empty());
                assert!(!run.parallel);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_gateway_guidance_scope() {
        let gateway = |argv: &[&str]| Args::parse_from(argv).command.touches_gateway();
        assert!(gateway(&["routecheck", "run"]));
        assert!(gateway(&["routecheck", "list"]));
        assert!(!gateway(&["routecheck", "config", "init"]));
        assert!(!gateway(&["routecheck", "results", "show", "20250101_120000_0042"]));
        assert!(!gateway(&["routecheck", "results", "list"]));
    }

    #[test]
    fn test_zero_rounds_rejected() {
        assert!(Args::try_parse_from(["routecheck", "run", "--rounds", "0"]).is_err());
    }

    #[test]
    fn test_results_export() {
        let args = Args::parse_from([
            "routecheck",
            "results",
            "export",
            "20250101_120000_0042",
            "out.csv",
        ]);
        match args.command {
            Command::Results(results) => match results.action {
                ResultsAction::Export { id, path, format } => {
                    assert_eq!(id, "20250101_120000_0042");
                    assert_eq!(path, "out.csv");
                    assert!(format.is_none());
                }
                _ => panic!("Expected Export action"),
            },
            _ => panic!("Expected Results command"),
        }
    }
}
