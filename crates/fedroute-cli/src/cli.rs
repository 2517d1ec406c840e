//! CLI argument definitions for fedroute.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `routes` | Show or save the routing table for a selection |
//! | `stations` | Fetch station metadata from every routed provider |
//! | `waveforms` | Fetch waveform data from every routed provider |
//! | `providers` | Describe the data centers known to the routing service |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--routing-url` | `FEDROUTE_ROUTING_URL` or the IRIS catalog | Routing service base URL |
//! | `--workers` | `FEDROUTE_MAX_WORKERS` or `5` | Concurrent provider requests |
//! | `--sequential` | `false` | Query providers one at a time |
//! | `--timeout-ms` | `FEDROUTE_TIMEOUT_MS` or `120000` | Provider request timeout |
//! | `--log-level` | `warn` | Log filter when `RUST_LOG` is unset |
//! | `--pretty` | `false` | Pretty-print the JSON report |
//!
//! # Exit Codes
//!
//! `0` everything satisfied, `1` some request lines unsatisfied, `2` invalid
//! input, `3` routing service failure, `4` every provider failed, `5` report
//! serialization, `10` I/O.
//!
//! # Examples
//!
//! ```bash
//! fedroute routes --network IU --station ANMO --param level=station
//! fedroute stations -n "A?" -s "OK*" -p level=station -p format=text --pretty
//! fedroute waveforms --bulk request.txt --reroute --output data/waveforms.mseed
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Federated FDSN routing client
///
/// Asks the federated catalog which data centers hold the requested data,
/// then sends each data center its share of the request.
#[derive(Debug, Parser)]
#[command(name = "fedroute", author, version, about = "Federated FDSN routing client")]
pub struct Cli {
    /// Routing service base URL.
    #[arg(long, global = true)]
    pub routing_url: Option<String>,

    /// Maximum number of providers queried concurrently.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Query providers one at a time, in routing order.
    #[arg(long, global = true, default_value_t = false)]
    pub sequential: bool,

    /// Provider request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the routing table for a selection.
    ///
    /// # Examples
    ///
    ///   fedroute routes -n IU -s ANMO
    ///   fedroute routes --bulk request.txt --raw --save routes.txt
    Routes(RoutesArgs),

    /// Fetch station metadata from every routed provider.
    Stations(FetchArgs),

    /// Fetch waveforms from every routed provider.
    Waveforms(FetchArgs),

    /// Describe data centers known to the routing service.
    Providers(ProvidersArgs),
}

/// Selection shared by every routed command.
#[derive(Debug, Args)]
pub struct SelectionArgs {
    #[arg(short = 'n', long)]
    pub network: Option<String>,

    #[arg(short = 's', long)]
    pub station: Option<String>,

    /// Location code; an empty value selects the blank location.
    #[arg(short = 'l', long)]
    pub location: Option<String>,

    #[arg(short = 'c', long)]
    pub channel: Option<String>,

    #[arg(long)]
    pub starttime: Option<String>,

    #[arg(long)]
    pub endtime: Option<String>,

    /// Extra `key=value` parameter; repeatable.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Bulk request file with one `NET STA LOC CHA START END` line per row;
    /// `-` reads standard input.
    #[arg(long, value_name = "FILE")]
    pub bulk: Option<String>,
}

#[derive(Debug, Args)]
pub struct RoutesArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Print the routing response text instead of the parsed table.
    #[arg(long, default_value_t = false)]
    pub raw: bool,

    /// Also write the routing response text to this file.
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Only query these providers (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Never query these providers (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Retry unsatisfied lines through a second routing round.
    #[arg(long, default_value_t = false)]
    pub reroute: bool,

    /// Route to every provider holding the data, not just the primary one.
    #[arg(long, default_value_t = false)]
    pub include_overlaps: bool,

    /// Reuse a saved routing response instead of querying the routing service.
    #[arg(long, value_name = "FILE")]
    pub routes: Option<PathBuf>,

    /// Stream each provider's response to `<dir>/<provider>-<basename>`.
    #[arg(long, value_name = "FILE", conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write the returned data to stdout and the report to stderr.
    #[arg(long, default_value_t = false)]
    pub stdout: bool,
}

#[derive(Debug, Args)]
pub struct ProvidersArgs {
    /// Only describe these providers.
    pub names: Vec<String>,

    /// Refresh even if metadata was loaded or refreshing gave up.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,
}
