//! `ROUTECHECK_*` environment overrides
//!
//! Sit between the config file and command-line flags in precedence.
//! Empty values count as unset.

use std::env;

const ENV_PREFIX: &str = "ROUTECHECK";

/// Suffix and help text for every variable the harness reads
const VARIABLES: &[(&str, &str)] = &[
    ("URL", "Gateway base URL (default http://localhost:8080)"),
    ("TIMEOUT", "Per-request timeout in seconds (default 30)"),
    ("MAX_TOKENS", "max_tokens sent on the raw HTTP path (default 1024)"),
    ("CONFIG", "Path to configuration file"),
    ("KEYS_FILE", "Gateway keys.json to derive test cases from"),
    ("FORMAT", "Output format (table, json, json-pretty, csv, summary)"),
    ("PARALLEL", "Run cases concurrently (true/false)"),
    ("VERBOSE", "Enable verbose output (true/false)"),
    ("LOG_LEVEL", "Log level (trace, debug, info, warn, error)"),
];

#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    pub gateway_url: Option<String>,
    pub timeout: Option<u64>,
    pub max_tokens: Option<u32>,
    pub config_file: Option<String>,
    pub keys_file: Option<String>,
    pub format: Option<String>,
    pub parallel: Option<bool>,
    pub verbose: Option<bool>,
    pub log_level: Option<String>,
}

impl EnvConfig {
    pub fn load() -> Self {
        Self {
            gateway_url: get_env("URL"),
            timeout: get_env_parse("TIMEOUT"),
            max_tokens: get_env_parse("MAX_TOKENS"),
            config_file: get_env("CONFIG"),
            keys_file: get_env("KEYS_FILE"),
            format: get_env("FORMAT"),
            parallel: get_env_bool("PARALLEL"),
            verbose: get_env_bool("VERBOSE"),
            log_level: get_env("LOG_LEVEL"),
        }
    }

    /// Values in `VARIABLES` order, rendered for display
    fn values(&self) -> [Option<String>; 9] {
        fn show<T: ToString>(v: &Option<T>) -> Option<String> {
            v.as_ref().map(ToString::to_string)
        }
        [
            self.gateway_url.clone(),
            show(&self.timeout),
            show(&self.max_tokens),
            self.config_file.clone(),
            self.keys_file.clone(),
            self.format.clone(),
            show(&self.parallel),
            show(&self.verbose),
            self.log_level.clone(),
        ]
    }

    pub fn has_any(&self) -> bool {
        self.values().iter().any(Option::is_some)
    }

    /// Print the variables that are set
    pub fn print_summary(&self) {
        println!("Environment overrides:");
        for ((name, _), value) in VARIABLES.iter().zip(self.values()) {
            if let Some(value) = value {
                println!("  {:24} {}", format!("{ENV_PREFIX}_{name}"), value);
            }
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Unparseable values are ignored
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

#[cfg(test)]
/// Scoped variable overrides for tests
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_{name}"), value.to_string()));
        self
    }

    pub fn gateway_url(self, url: &str) -> Self {
        self.var("URL", url)
    }

    pub fn timeout(self, secs: u64) -> Self {
        self.var("TIMEOUT", secs)
    }

    pub fn keys_file(self, path: &str) -> Self {
        self.var("KEYS_FILE", path)
    }

    pub fn parallel(self, parallel: bool) -> Self {
        self.var("PARALLEL", parallel)
    }

    /// Set the variables for the lifetime of the returned guard
    pub fn apply_scoped(self) -> EnvGuard {
        let previous = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        for (key, value) in &self.vars {
            env::set_var(key, value);
        }

        EnvGuard { previous }
    }
}

#[cfg(test)]
impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
/// Restores the previous values when dropped
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    for (name, help) in VARIABLES {
        println!("  {:24} {}", format!("{ENV_PREFIX}_{name}"), help);
    }
    println!("  {:24} Full tracing filter, overrides the log level", "RUST_LOG");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_URL=http://gateway.internal:8080");
    println!("  routecheck run");
}
