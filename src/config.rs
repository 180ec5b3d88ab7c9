//! Process-wide settings, fixed once the service starts.

use std::time::Duration;

use clap::Parser;

/// Service settings shared read-only with every handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Timeout applied to cached route responses.
    pub cache_default_timeout: Duration,
    /// How long `/heavy` sleeps before answering.
    pub heavy_delay: Duration,
    /// Verbose logging. The binary sets it from `PULSE_DEBUG`.
    pub debug: bool,
    /// Test mode; like `debug`, only affects logging. Set by [`Config::testing`].
    pub testing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_default_timeout: Duration::from_secs(60),
            heavy_delay: Duration::from_secs(65),
            debug: false,
            testing: false,
        }
    }
}

impl Config {
    /// Short timeouts for test suites: one-second cache entries and a
    /// near-instant `/heavy`.
    pub fn testing() -> Self {
        Self {
            cache_default_timeout: Duration::from_secs(1),
            heavy_delay: Duration::from_millis(10),
            testing: true,
            ..Self::default()
        }
    }

    /// Production defaults with `debug` taken from the `PULSE_DEBUG` environment variable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    ///
    /// `PULSE_DEBUG` turns debug on for `1`, `true`, `yes` or `on`, case-insensitively.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup("PULSE_DEBUG").is_some_and(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        });
        Self {
            debug,
            ..Self::default()
        }
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.debug || self.testing {
            "debug"
        } else {
            "info"
        }
    }
}

/// Command-line flags: the listen address only.
#[derive(Parser, Debug, Clone)]
#[command(name = "pulse")]
#[command(about = "Demo JSON service with a timeout-based response cache")]
#[command(version)]
pub struct Cli {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, short, default_value_t = 5000)]
    pub port: u16,
}

impl Cli {
    /// `host:port` string accepted by [`Server::bind`](crate::server::Server::bind).
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
