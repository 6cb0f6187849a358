//! `httpapi`: issue ad-hoc calls through a declared contract.
//!
//! The target URL becomes the client's base address; every request goes
//! through the same chain an embedding program would build:
//!
//! ```text
//!   trace ─▶ headers ─▶ retry ─▶ [cache] ─▶ transport
//! ```
//!
//! ```text
//! httpapi https://example.com/items -H "accept: application/json"
//! httpapi https://example.com/items -X post -d '{"name":"pen"}'
//! httpapi https://example.com/ --repeat 20 --config client.toml
//! ```

use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;

use httpapi::config::{load_config, ClientConfig};
use httpapi::http::middleware::{CacheInterceptor, HeadersInterceptor, TraceInterceptor};
use httpapi::observability::{logging::init_logging, metrics::init_metrics};
use httpapi::resilience::RetryInterceptor;
use httpapi::{ApiContract, ApiResponse, ClientOptions, HttpApi, PendingCall};

httpapi::http_api! {
    /// A single resource addressed by the client's base address.
    struct Endpoint {
        fn get() -> pending ApiResponse = GET "";
        fn head() -> pending ApiResponse = HEAD "";
        fn delete() -> pending ApiResponse = DELETE "";
        fn post(body payload: &Value) -> pending ApiResponse = POST "";
        fn put(body payload: &Value) -> pending ApiResponse = PUT "";
        fn patch(body payload: &Value) -> pending ApiResponse = PATCH "";
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Verb {
    Get,
    Head,
    Delete,
    Post,
    Put,
    Patch,
}

#[derive(Parser)]
#[command(name = "httpapi")]
#[command(about = "Call an HTTP endpoint through an interceptor chain", long_about = None)]
struct Cli {
    /// Target URL.
    url: String,

    #[arg(short = 'X', long, value_enum, default_value = "get")]
    method: Verb,

    /// JSON request body.
    #[arg(short, long)]
    data: Option<String>,

    /// Extra header, as `name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// TOML client configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum attempts per call, overriding the configuration.
    #[arg(long)]
    retries: Option<u32>,

    /// Per-call timeout in seconds, overriding the configuration.
    #[arg(long)]
    timeout: Option<u64>,

    /// Number of concurrent calls to issue.
    #[arg(long, default_value_t = 1)]
    repeat: usize,

    /// Serve repeated GETs from the response cache.
    #[arg(long)]
    cache: bool,

    /// Print response headers.
    #[arg(short, long)]
    include: bool,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    init_logging(&config.observability);

    if let Some(addr) = cli.metrics_address {
        if config.observability.metrics_enabled {
            init_metrics(addr);
        }
    }

    config.base_address = Some(cli.url.clone());
    if let Some(attempts) = cli.retries {
        config.retries.max_attempts = attempts;
    }
    if let Some(secs) = cli.timeout {
        config.timeouts.request_secs = secs;
    }

    let mut headers = HeadersInterceptor::new();
    for raw in &cli.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header `{}` is not `name: value`", raw))?;
        headers = headers.with_header(name.trim(), value.trim())?;
    }

    let mut options = ClientOptions::new(config.clone())
        .with_interceptor(TraceInterceptor::new())
        .with_interceptor(headers)
        .with_interceptor(RetryInterceptor::new(&config.retries));
    if cli.cache {
        options = options.with_interceptor(CacheInterceptor::from_config(&config.cache));
    }

    let endpoint: Endpoint = HttpApi::create_with_options(options)?;
    tracing::info!(url = %cli.url, method = ?cli.method, repeat = cli.repeat, "Issuing calls");

    let body = match cli.data.as_deref() {
        Some(raw) => serde_json::from_str(raw)?,
        None => Value::Null,
    };

    let calls = (0..cli.repeat.max(1)).map(|_| send(&endpoint, cli.method, &body));
    let results = futures_util::future::join_all(calls).await;

    let mut failures = 0;
    for result in results {
        match result {
            Ok(response) => print_response(&response, cli.include),
            Err(e) => {
                failures += 1;
                eprintln!("Error: {}", e);
            }
        }
    }

    endpoint.dispose();

    if failures > 0 {
        return Err(format!("{} call(s) failed", failures).into());
    }
    Ok(())
}

fn send(endpoint: &Endpoint, verb: Verb, body: &Value) -> PendingCall<ApiResponse> {
    match verb {
        Verb::Get => endpoint.get(),
        Verb::Head => endpoint.head(),
        Verb::Delete => endpoint.delete(),
        Verb::Post => endpoint.post(body),
        Verb::Put => endpoint.put(body),
        Verb::Patch => endpoint.patch(body),
    }
}

fn print_response(response: &ApiResponse, include: bool) {
    println!("{}", response.status);
    if include {
        for (name, value) in &response.headers {
            println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
        println!();
    }
    if !response.body.is_empty() {
        println!("{}", response.text());
    }
}
