//! parse_proxy_v2 - print the contents of a PROXY protocol v2 header
//!
//! Usage:
//!   # Parse a header piped on stdin
//!   parse_proxy_v2 < header.bin
//!
//!   # Accept one connection on port 8443 and parse what it sends first
//!   parse_proxy_v2 8443
//!
//! Exits 0 when the header is valid and describes a TCP connection, 1
//! otherwise.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use proxy_v2_inspect::acquire::{acquire, Source};
use proxy_v2_inspect::config::{Config, OutputFormat};
use proxy_v2_inspect::parse_proxy_v2;
use proxy_v2_inspect::report::{
    exit_ok, render_error, render_error_json, render_json, render_text,
};

#[derive(Debug, Parser)]
#[command(name = "parse_proxy_v2", version, about = "Parse a PROXY protocol v2 header")]
struct Cli {
    /// Listen on this port and parse the first connection; reads stdin when omitted
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Seconds to wait for the header (0 waits forever)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Log filter, e.g. "info" or "proxy_v2_inspect=debug"
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR:\tinvalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(timeout) = cli.timeout {
        config.input.timeout = timeout;
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    init_tracing(&config.log.level);

    let source = match cli.port {
        None => Source::Stdin,
        Some(port) => match config.input.bind_address.parse::<IpAddr>() {
            Ok(ip) => Source::Listen(SocketAddr::new(ip, port)),
            Err(e) => {
                eprintln!(
                    "ERROR:\tinvalid bind address {:?}: {}",
                    config.input.bind_address, e
                );
                return ExitCode::FAILURE;
            }
        },
    };

    let buf = match acquire(source, config.input.timeout_duration()).await {
        Ok(buf) => buf,
        Err(e) => {
            error!("Failed to acquire PROXY header: {}", e);
            println!("ERROR:\t{}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Acquired {} bytes", buf.len());

    report(&buf, config.output.format)
}

/// Parse, print and map the outcome to an exit status
fn report(buf: &[u8], format: OutputFormat) -> ExitCode {
    let result = parse_proxy_v2(buf);

    match &result {
        Ok(info) => {
            let rendered = match format {
                OutputFormat::Text => Ok(render_text(info)),
                OutputFormat::Json => render_json(info).map(|json| json + "\n"),
            };
            match rendered {
                Ok(out) => print!("{}", out),
                Err(e) => {
                    error!("Failed to render report: {}", e);
                    return ExitCode::FAILURE;
                }
            }

            if !info.is_fully_supported() {
                warn!(
                    "{} header parsed but unsupported",
                    info.header.protocol_name()
                );
            }
        }
        Err(e) => {
            warn!(kind = e.kind(), "PROXY v2 parse failed: {}", e);
            match format {
                OutputFormat::Text => println!("{}", render_error(e, buf)),
                OutputFormat::Json => match render_error_json(e, buf) {
                    Ok(json) => println!("{}", json),
                    Err(_) => println!("{}", render_error(e, buf)),
                },
            }
        }
    }

    if exit_ok(&result) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
