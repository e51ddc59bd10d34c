//! resilient-fetch command line.
//!
//! # Architecture Overview
//!
//! ```text
//!     get / watch
//!         │
//!         ▼
//!   ┌──────────────┐   hit    ┌──────────────┐
//!   │   fetcher    │─────────▶│    cache     │
//!   │ (cache-aside)│◀─────────│ memory/none  │
//!   └──────┬───────┘  stale   └──────────────┘
//!          │ miss
//!          ▼
//!   ┌──────────────┐          ┌──────────────┐
//!   │ breaker gate │─────────▶│  transport   │────▶ upstream
//!   │ per endpoint │          │  (reqwest)   │
//!   └──────────────┘          └──────────────┘
//!
//!   events → TracingSink → tracing subscriber + Prometheus exporter
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use uuid::Uuid;

use resilient_fetch::lifecycle::{signals, startup};
use resilient_fetch::observability::TracingSink;
use resilient_fetch::{FetchFailure, FetchRequest, FetchResponse, ResilientFetcher, Shutdown};

#[derive(Parser)]
#[command(name = "resilient-fetch")]
#[command(about = "Fetch HTTP content through a cache with stale fallback and circuit breaking", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL once
    Get(RequestArgs),
    /// Fetch a URL repeatedly through one fetcher
    Watch {
        #[command(flatten)]
        request: RequestArgs,

        /// Pause between fetches
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many fetches (runs until Ctrl+C when omitted)
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Args, Clone)]
struct RequestArgs {
    /// Absolute URL, or `cache` for a cache-only read of --cache-key
    url: String,

    /// Skip the cache for this call
    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    ttl_ms: Option<i64>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long)]
    cache_key: Option<String>,

    /// Correlation id; a random one is generated when omitted
    #[arg(long)]
    tracer: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl RequestArgs {
    fn to_request(&self) -> FetchRequest {
        let mut request = FetchRequest::new(self.url.clone())
            .tracer(self.tracer.clone().unwrap_or_else(|| Uuid::new_v4().to_string()));
        if self.no_cache {
            request = request.no_cache();
        }
        if let Some(ttl) = self.ttl_ms {
            request = request.cache_ttl_ms(ttl);
        }
        if let Some(timeout) = self.timeout_ms {
            request = request.timeout_ms(timeout);
        }
        if let Some(key) = &self.cache_key {
            request = request.cache_key(key.clone());
        }
        request
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match startup::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = startup::init_observability(&config.observability) {
        eprintln!("error: failed to initialize observability: {}", e);
        return ExitCode::from(2);
    }

    tracing::debug!(
        engine = ?config.cache.engine,
        circuit_breaker = config.circuit_breaker.is_some(),
        timeout_ms = config.request.timeout_ms,
        "Configuration loaded"
    );

    let fetcher = match ResilientFetcher::from_config(&config, Arc::new(TracingSink::new())) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build fetcher");
            return ExitCode::FAILURE;
        }
    };

    let code = match cli.command {
        Commands::Get(args) => {
            let result = fetcher.fetch(args.to_request()).await;
            print_result(&result, args.json)
        }
        Commands::Watch {
            request,
            interval_ms,
            count,
        } => watch(&fetcher, &request, Duration::from_millis(interval_ms), count).await,
    };

    fetcher.disconnect().await;
    code
}

async fn watch(fetcher: &ResilientFetcher, args: &RequestArgs, interval: Duration, count: Option<u64>) -> ExitCode {
    let shutdown = Arc::new(Shutdown::new());
    let mut rx = shutdown.subscribe();
    let listener = signals::spawn_ctrl_c_listener(shutdown.clone());

    let mut code = ExitCode::SUCCESS;
    let mut iteration = 0u64;
    while has_more(count, iteration) && !shutdown.is_triggered() {
        iteration += 1;
        let result = fetcher.fetch(args.to_request()).await;
        if result.is_err() {
            code = ExitCode::FAILURE;
        }
        print_result(&result, args.json);
        if !has_more(count, iteration) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = rx.recv() => break,
        }
    }

    listener.abort();
    tracing::info!(fetches = iteration, "Watch finished");
    code
}

/// True while `done` fetches leave room under the optional `--count`.
fn has_more(count: Option<u64>, done: u64) -> bool {
    count.map_or(true, |c| done < c)
}

fn print_result(result: &Result<FetchResponse, FetchFailure>, as_json: bool) -> ExitCode {
    match result {
        Ok(response) => {
            if as_json {
                println!("{}", json!(response));
            } else {
                println!("{}", response.content);
            }
            if response.status_code == 200 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(failure) => {
            if as_json {
                println!(
                    "{}",
                    json!({
                        "status_code": failure.status_code(),
                        "message": failure.message(),
                        "headers": failure.headers(),
                        "stale": failure.stale().map(|s| json!({
                            "content": s.content,
                            "headers": s.headers,
                            "stale": true,
                        })),
                    })
                );
            } else {
                eprintln!("error ({}): {}", failure.status_code(), failure.message());
                if let Some(stale) = failure.stale() {
                    eprintln!("serving stale content");
                    println!("{}", stale.content);
                }
            }
            ExitCode::FAILURE
        }
    }
}
