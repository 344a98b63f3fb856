use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dnssec_chain::config::parse_resolver;
use dnssec_chain::{CancelToken, ChainConfig, ChainError, ChainWalker, ConfigError, TrustStatus, report};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const EXIT_INPUT_ERROR: u8 = 64;
const EXIT_SOFTWARE: u8 = 70;
const EXIT_CANCELLED: u8 = 130;

/// Validate the DNSSEC chain of trust from the root zone down to a domain
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Domain name to validate
    domain: String,

    /// Resolver address, `ip` or `ip:port`; repeat for fallbacks
    #[arg(short, long = "resolver", value_name = "ADDR")]
    resolvers: Vec<String>,

    /// Timeout for each query (milliseconds)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Extra attempts per query, rotating through resolvers
    #[arg(long)]
    retries: Option<u32>,

    /// Record type checked at the target
    #[arg(long, value_name = "TYPE")]
    probe: Option<String>,

    /// Compare the DNSKEY set across each zone's authoritative servers
    #[arg(long)]
    consistency: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `dnssec_chain=trace`; defaults to RUST_LOG or `info`
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<ChainConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ChainConfig::from_file(path)?,
        None => ChainConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;

    if !args.resolvers.is_empty() {
        config.resolvers = args
            .resolvers
            .iter()
            .map(|r| parse_resolver(r))
            .collect::<Result<_, _>>()?;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if args.consistency {
        config.check_consistency = true;
    }
    if let Some(probe) = &args.probe {
        config.probe_type = probe.parse().map_err(|message| ConfigError::InvalidValue {
            field: "probe_type",
            message,
        })?;
    }

    config.validate()?;
    Ok(config)
}

fn status_exit_code(status: TrustStatus) -> u8 {
    match status {
        TrustStatus::Secure => 0,
        TrustStatus::Insecure => 1,
        TrustStatus::Bogus => 2,
        TrustStatus::Indeterminate => 3,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let walker = match build_config(&args).and_then(ChainWalker::from_config) {
        Ok(walker) => walker,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_INPUT_ERROR);
        }
    };

    let (handle, cancel) = CancelToken::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling validation");
            handle.cancel();
        }
    });

    let result = match walker.validate(&args.domain, &cancel).await {
        Ok(result) => result,
        Err(ChainError::Cancelled) => {
            eprintln!("cancelled");
            return ExitCode::from(EXIT_CANCELLED);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_INPUT_ERROR);
        }
    };

    if args.json {
        match report::to_json(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to serialize result: {}", e);
                return ExitCode::from(EXIT_SOFTWARE);
            }
        }
    } else {
        print!("{}", report::render_text(&result));
    }

    ExitCode::from(status_exit_code(result.overall_status))
}
