//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Measure the DNS, TCP, TLS and time-to-first-byte breakdown of a URL
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tripper", version, about)]
pub struct Args {
    /// URL to probe [default: https://www.google.com]
    #[arg(long, env = "TRIPPER_URL")]
    pub url: Option<String>,

    /// Output a JSON result
    #[arg(long)]
    pub json: bool,

    /// Print request lifecycle events to stderr
    #[arg(long)]
    pub debug: bool,

    /// Optional YAML configuration file
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Leave failed probes out of the averages instead of aborting the run
    #[arg(long)]
    pub exclude_failed: bool,

    /// Comma separated name servers used for DNS lookups (system resolver when empty)
    #[arg(long, env = "DNS_HOSTS", value_delimiter = ',')]
    pub dns_hosts: Vec<String>,
}
