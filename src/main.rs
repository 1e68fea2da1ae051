//! Command-line entry point.
//!
//! One-shot form: `site_grader <host>` prints a single JSON report to
//! stdout. Exit codes: 0 for any completed scan (grade F included), 1 for
//! an invalid host, 2 for a network failure.
//!
//! Server form: `site_grader serve --port N` runs the HTTP API.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use site_grader::app::init_logger_with;
use site_grader::config::{Config, LogFormat, LogLevel, BASE_URL_ENV, DB_PATH_ENV};
use site_grader::retriever::{Retrieve, Retriever};
use site_grader::scanner;
use site_grader::service::ScanService;
use site_grader::site::Site;
use site_grader::storage;
use site_grader::ScanError;

#[derive(Parser, Debug)]
#[command(
    name = "site_grader",
    version,
    about = "Scan a website's HTTP security headers and grade the result"
)]
struct Cli {
    /// Host to scan, e.g. `example.com` or `example.com:8443/app`
    host: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,

    /// Per-probe timeout in seconds
    #[arg(long, default_value_t = 10)]
    probe_timeout: u64,

    /// Overall scan cap in seconds
    #[arg(long, default_value_t = 30)]
    scan_timeout: u64,

    /// Maximum redirect hops on the HTTPS probe
    #[arg(long, default_value_t = 20)]
    max_redirects: usize,

    /// Allow hosts that resolve to loopback or private ranges
    #[arg(long)]
    allow_private: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 57001)]
        port: u16,

        /// SQLite database path; `SITE_GRADER_DB_PATH` overrides the default
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Cooldown between retrievals for one site, in seconds
        #[arg(long, default_value_t = 60)]
        cooldown: u64,

        /// Cache age accepted by GET /api/v2/analyze, in seconds
        #[arg(long, default_value_t = 86400)]
        get_cache_age: u64,
    },
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            probe_timeout: Duration::from_secs(self.probe_timeout),
            scan_timeout: Duration::from_secs(self.scan_timeout),
            max_redirects: self.max_redirects,
            allow_private: self.allow_private,
            base_url: std::env::var(BASE_URL_ENV).ok(),
            ..Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger_with(cli.log_level.into(), cli.log_format);

    match &cli.command {
        Some(Command::Serve {
            port,
            db_path,
            cooldown,
            get_cache_age,
        }) => {
            let mut config = cli.config();
            config.cooldown = Duration::from_secs(*cooldown);
            config.get_cache_age = Duration::from_secs(*get_cache_age);
            if let Ok(path) = std::env::var(DB_PATH_ENV) {
                config.db_path = PathBuf::from(path);
            }
            if let Some(path) = db_path {
                config.db_path = path.clone();
            }

            match serve(*port, config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{e:#}");
                    ExitCode::FAILURE
                }
            }
        }
        None => {
            let Some(host) = cli.host.as_deref() else {
                eprintln!("usage: site_grader <host> | site_grader serve [--port N]");
                return ExitCode::from(1);
            };
            scan_once(host, cli.config()).await
        }
    }
}

async fn serve(port: u16, config: Config) -> anyhow::Result<()> {
    let pool = storage::init_db_pool_with_path(&config.db_path)
        .await
        .context("Failed to initialize database pool")?;
    storage::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let retriever =
        Arc::new(Retriever::new(config.clone()).context("Failed to initialize retriever")?);
    let service = Arc::new(ScanService::new(retriever, pool, config));

    site_grader::api::serve(port, service).await
}

async fn scan_once(host: &str, config: Config) -> ExitCode {
    let site = match Site::from_input(host) {
        Ok(site) => site,
        Err(e) => {
            eprintln!("{}", json!({ "error": e.code(), "message": e.to_string() }));
            return ExitCode::from(1);
        }
    };

    let retriever = match Retriever::new(config) {
        Ok(retriever) => retriever,
        Err(e) => {
            eprintln!("{}", json!({ "error": "scan-failed", "message": e.to_string() }));
            return ExitCode::from(2);
        }
    };

    let started = chrono::Utc::now();
    match retriever.retrieve(&site, CancellationToken::new()).await {
        Ok(requests) => {
            let results = scanner::run_battery(&requests, &HashMap::new());
            let report = scanner::build_report(&requests, results, started);
            println!("{}", report.to_cli_json());
            ExitCode::SUCCESS
        }
        Err(ScanError::Validation(e)) => {
            eprintln!("{}", json!({ "error": e.code(), "message": e.to_string() }));
            ExitCode::from(1)
        }
        Err(ScanError::Retrieval(e)) => {
            let report = scanner::error_report(&site.site_key(), &e, started);
            println!("{}", report.to_cli_json());
            ExitCode::from(2)
        }
    }
}
